//! Connection parameters and host URI parsing.

use crate::error::{Error, Result};
use std::time::Duration;

/// Default MySQL port.
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

/// Connection parameters.
#[derive(Debug, Clone)]
pub struct ConnectParams {
    /// Host URI in the driver's convention, e.g. `tcp://localhost:3306` or
    /// `sqlite::memory:`.
    pub host: String,
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
    /// Schema selected after connecting. Empty keeps the server default.
    pub database: String,
    /// Connection timeout (default: 20 seconds).
    pub connect_timeout: Duration,
}

impl ConnectParams {
    /// Create new connection parameters.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            database: database.into(),
            connect_timeout: Duration::from_secs(20),
        }
    }

    /// Set the connection timeout.
    ///
    /// # Example
    ///
    /// ```
    /// use db_session::ConnectParams;
    /// use std::time::Duration;
    ///
    /// let params = ConnectParams::new("tcp://localhost:3306", "user", "password", "test")
    ///     .with_connect_timeout(Duration::from_secs(5));
    /// ```
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Parse the host URI into an endpoint.
    pub fn endpoint(&self) -> Result<Endpoint> {
        Endpoint::parse(&self.host)
    }
}

/// Where a connection goes, as understood by the bundled drivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// MySQL-compatible server over TCP.
    MySql { host: String, port: u16 },
    /// SQLite database, kept as the full `sqlite:` URL.
    Sqlite { url: String },
}

impl Endpoint {
    /// Parse a host URI.
    ///
    /// Accepted forms: `tcp://host[:port]`, `mysql://host[:port]`,
    /// `host[:port]` (all MySQL, default port 3306) and `sqlite:...`.
    pub fn parse(uri: &str) -> Result<Self> {
        let uri = uri.trim();
        if uri.starts_with("sqlite:") {
            return Ok(Endpoint::Sqlite {
                url: uri.to_string(),
            });
        }

        let addr_part = match uri.split_once("://") {
            Some(("tcp" | "mysql", rest)) => rest,
            Some((scheme, _)) => {
                return Err(Error::invalid_connect_string(format!(
                    "Unsupported scheme: {}",
                    scheme
                )))
            }
            None => uri,
        };
        let addr_part = addr_part.strip_suffix('/').unwrap_or(addr_part);

        if addr_part.contains('/') {
            return Err(Error::invalid_connect_string(
                "Unexpected path in host; pass the schema as the database argument",
            ));
        }

        let (host, port) = if let Some((h, p)) = addr_part.rsplit_once(':') {
            let port = p
                .parse::<u16>()
                .map_err(|_| Error::invalid_connect_string(format!("Invalid port: {}", p)))?;
            (h, port)
        } else {
            (addr_part, DEFAULT_MYSQL_PORT)
        };

        if host.is_empty() {
            return Err(Error::invalid_connect_string("Missing host"));
        }

        Ok(Endpoint::MySql {
            host: host.to_string(),
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tcp_uri() {
        let endpoint = Endpoint::parse("tcp://localhost:3306").unwrap();
        assert_eq!(
            endpoint,
            Endpoint::MySql {
                host: "localhost".to_string(),
                port: 3306
            }
        );

        let endpoint = Endpoint::parse("mysql://db.internal:3307/").unwrap();
        assert_eq!(
            endpoint,
            Endpoint::MySql {
                host: "db.internal".to_string(),
                port: 3307
            }
        );
    }

    #[test]
    fn test_parse_default_port() {
        let endpoint = Endpoint::parse("127.0.0.1").unwrap();
        assert_eq!(
            endpoint,
            Endpoint::MySql {
                host: "127.0.0.1".to_string(),
                port: DEFAULT_MYSQL_PORT
            }
        );
    }

    #[test]
    fn test_parse_sqlite() {
        assert_eq!(
            Endpoint::parse("sqlite::memory:").unwrap(),
            Endpoint::Sqlite {
                url: "sqlite::memory:".to_string()
            }
        );
        assert_eq!(
            Endpoint::parse("sqlite://data/app.db").unwrap(),
            Endpoint::Sqlite {
                url: "sqlite://data/app.db".to_string()
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            Endpoint::parse("postgres://localhost:5432"),
            Err(Error::InvalidConnectString { .. })
        ));
        assert!(matches!(
            Endpoint::parse("tcp://localhost:notaport"),
            Err(Error::InvalidConnectString { .. })
        ));
        assert!(matches!(
            Endpoint::parse("tcp://localhost:3306/shop"),
            Err(Error::InvalidConnectString { .. })
        ));
        assert!(matches!(
            Endpoint::parse("tcp://:3306"),
            Err(Error::InvalidConnectString { .. })
        ));
    }

    #[test]
    fn test_connect_params_default_timeout() {
        let params = ConnectParams::new("tcp://localhost:3306", "user", "password", "test");
        assert_eq!(params.connect_timeout, Duration::from_secs(20));
        assert_eq!(params.database, "test");
    }

    #[test]
    fn test_connect_params_custom_timeout() {
        let params = ConnectParams::new("tcp://localhost:3306", "user", "password", "test")
            .with_connect_timeout(Duration::from_secs(5));
        assert_eq!(params.connect_timeout, Duration::from_secs(5));
    }
}
