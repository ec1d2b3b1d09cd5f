//! High-level session API.

use crate::connect::ConnectParams;
use crate::cursor::Cursor;
use crate::driver::{default_driver, Connection, Driver, PreparedStatement};
use crate::error::{Error, Result};
use crate::params::{BindMode, Param};
use std::sync::Arc;
use tracing::{debug, warn};

/// A database session: one driver handle and at most one connection.
///
/// Queries against a session without a connection return `Ok(None)` rather
/// than failing, so a session built with [`Session::open`] can be used
/// unconditionally. Use [`Session::connect`] to get the connection failure
/// instead.
///
/// Sessions built with [`Session::new`], [`Session::with_driver`] or
/// [`Session::open`] bind in [`BindMode::Lenient`]: a parameter of an
/// unsupported type leaves its placeholder unbound without failing the bind.
/// Sessions built with [`Session::connect`] bind in [`BindMode::Strict`].
///
/// Every operation blocks until the driver completes it.
///
/// # Example
///
/// ```no_run
/// use db_session::{params, Session};
///
/// let mut session = Session::open("tcp://localhost:3306", "user", "password", "database");
///
/// let sql = "SELECT * FROM SEQUENCE_TABLE(100) AS SEQ LIMIT ?, ?";
/// if let Some(mut cursor) = session.query_with(sql, &params![10, 10]).unwrap() {
///     while cursor.next().unwrap() {
///         println!("{}", cursor.get_string(1).unwrap());
///     }
/// };
/// ```
pub struct Session {
    // Dropped before the driver.
    connection: Option<Box<dyn Connection>>,
    driver: Option<Arc<dyn Driver>>,
    bind_mode: BindMode,
}

impl Session {
    /// Create a session holding only the default driver, without a connection.
    pub fn new() -> Self {
        let driver = default_driver()
            .map_err(|e| warn!(error = %e, "driver unavailable"))
            .ok();
        Self::from_parts(driver, None, BindMode::Lenient)
    }

    /// Create a session over `driver`, without a connection.
    pub fn with_driver(driver: Arc<dyn Driver>) -> Self {
        Self::from_parts(Some(driver), None, BindMode::Lenient)
    }

    /// Connect with the default driver and select `database`.
    ///
    /// Failures are not reported: the session is returned without a
    /// connection and its queries yield `Ok(None)`.
    pub fn open(host: &str, user: &str, password: &str, database: &str) -> Self {
        let params = ConnectParams::new(host, user, password, database);
        match default_driver() {
            Ok(driver) => Self::open_with_params(driver, &params),
            Err(e) => {
                warn!(error = %e, "driver unavailable");
                Self::from_parts(None, None, BindMode::Lenient)
            }
        }
    }

    /// Connect over `driver` with explicit parameters, leaving the session
    /// unconnected on failure.
    pub fn open_with_params(driver: Arc<dyn Driver>, params: &ConnectParams) -> Self {
        let connection = establish(driver.as_ref(), params)
            .map_err(|e| warn!(host = %params.host, error = %e, "connection not established"))
            .ok();
        Self::from_parts(Some(driver), connection, BindMode::Lenient)
    }

    /// Connect with the default driver and select `database`, returning the
    /// failure if any step fails.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use db_session::Session;
    ///
    /// let mut session = Session::connect("tcp://localhost:3306", "user", "password", "shop")?;
    /// assert!(session.is_connected());
    /// # Ok::<(), db_session::Error>(())
    /// ```
    pub fn connect(host: &str, user: &str, password: &str, database: &str) -> Result<Self> {
        let params = ConnectParams::new(host, user, password, database);
        Self::connect_with_params(default_driver()?, &params)
    }

    /// Connect over `driver` with explicit parameters.
    pub fn connect_with_params(driver: Arc<dyn Driver>, params: &ConnectParams) -> Result<Self> {
        let connection = establish(driver.as_ref(), params)?;
        Ok(Self::from_parts(
            Some(driver),
            Some(connection),
            BindMode::Strict,
        ))
    }

    fn from_parts(
        driver: Option<Arc<dyn Driver>>,
        connection: Option<Box<dyn Connection>>,
        bind_mode: BindMode,
    ) -> Self {
        Self {
            connection,
            driver,
            bind_mode,
        }
    }

    /// Set the binding policy, builder style.
    pub fn with_bind_mode(mut self, mode: BindMode) -> Self {
        self.bind_mode = mode;
        self
    }

    /// Set the binding policy for subsequent parameterized calls.
    pub fn set_bind_mode(&mut self, mode: BindMode) {
        self.bind_mode = mode;
    }

    /// Get the binding policy.
    pub fn bind_mode(&self) -> BindMode {
        self.bind_mode
    }

    /// Get the driver handle, if one was acquired.
    pub fn driver(&self) -> Option<&Arc<dyn Driver>> {
        self.driver.as_ref()
    }

    /// Check whether the session holds a connection.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Check whether the held connection still answers.
    pub fn ping(&mut self) -> bool {
        match self.connection.as_deref_mut() {
            Some(connection) => connection.is_valid(),
            None => false,
        }
    }

    /// Execute a query without parameters.
    ///
    /// Returns `Ok(None)` when the session has no connection. Driver failures
    /// are returned as errors.
    pub fn query<'s>(&'s mut self, sql: &'s str) -> Result<Option<Cursor<'s>>> {
        let Some(connection) = self.connection.as_deref_mut() else {
            debug!(sql, "query skipped: no connection");
            return Ok(None);
        };

        debug!(sql, "query");
        let statement = connection.create_statement()?;
        let rows = statement.execute_query(sql)?;
        Ok(Some(Cursor::new(rows)))
    }

    /// Execute a query with positional parameters.
    ///
    /// The Nth value binds to the Nth `?`. Returns `Ok(None)` when the
    /// session has no connection.
    pub fn query_with<'s>(
        &'s mut self,
        sql: &'s str,
        params: &[Param],
    ) -> Result<Option<Cursor<'s>>> {
        let bind_mode = self.bind_mode;
        let Some(connection) = self.connection.as_deref_mut() else {
            debug!(sql, "query skipped: no connection");
            return Ok(None);
        };

        let mut statement = connection.prepare_statement(sql)?;
        debug!(
            sql,
            params = params.len(),
            placeholders = ?statement.parameter_count(),
            "prepared query"
        );
        bind_params(statement.as_mut(), params, bind_mode)?;
        let rows = statement.execute_query()?;
        Ok(Some(Cursor::new(rows)))
    }

    /// Execute a statement that returns no rows.
    ///
    /// Returns the affected row count, or `Ok(None)` without a connection.
    pub fn execute(&mut self, sql: &str) -> Result<Option<u64>> {
        let Some(connection) = self.connection.as_deref_mut() else {
            debug!(sql, "execute skipped: no connection");
            return Ok(None);
        };

        debug!(sql, "execute");
        let affected = connection.create_statement()?.execute_update(sql)?;
        Ok(Some(affected))
    }

    /// Execute a statement that returns no rows, with positional parameters.
    pub fn execute_with(&mut self, sql: &str, params: &[Param]) -> Result<Option<u64>> {
        let bind_mode = self.bind_mode;
        let Some(connection) = self.connection.as_deref_mut() else {
            debug!(sql, "execute skipped: no connection");
            return Ok(None);
        };

        let mut statement = connection.prepare_statement(sql)?;
        debug!(
            sql,
            params = params.len(),
            placeholders = ?statement.parameter_count(),
            "prepared execute"
        );
        bind_params(statement.as_mut(), params, bind_mode)?;
        Ok(Some(statement.execute_update()?))
    }

    /// Close the connection, reporting errors from the driver.
    pub fn close(mut self) -> Result<()> {
        match self.connection.take() {
            Some(connection) => connection.close(),
            None => Ok(()),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("driver", &self.driver.as_ref().map(|d| d.name().to_string()))
            .field("connected", &self.is_connected())
            .field("bind_mode", &self.bind_mode)
            .finish()
    }
}

/// Connect and select the schema.
fn establish(driver: &dyn Driver, params: &ConnectParams) -> Result<Box<dyn Connection>> {
    debug!(driver = driver.name(), host = %params.host, "connecting");
    let mut connection = driver.connect(params)?;
    if !params.database.is_empty() {
        debug!(schema = %params.database, "selecting schema");
        connection.set_schema(&params.database)?;
    }
    Ok(connection)
}

/// Bind `params` by position (1-based).
fn bind_params<'c>(
    statement: &mut (dyn PreparedStatement<'c> + 'c),
    params: &[Param],
    mode: BindMode,
) -> Result<()> {
    for (offset, param) in params.iter().enumerate() {
        let index = offset + 1;
        match param {
            Param::Integer(v) => statement.set_int(index, *v)?,
            Param::Double(v) => statement.set_double(index, *v)?,
            Param::Float(v) => statement.set_double(index, f64::from(*v))?,
            Param::Boolean(v) => statement.set_boolean(index, *v)?,
            Param::Text(v) => statement.set_string(index, v)?,
            Param::Unsupported { type_name } => match mode {
                BindMode::Strict => {
                    return Err(Error::UnsupportedParameter {
                        position: index,
                        type_name: type_name.clone(),
                    })
                }
                BindMode::Lenient => {
                    warn!(position = index, type_name = %type_name, "parameter left unbound");
                }
            },
        }
    }
    Ok(())
}
