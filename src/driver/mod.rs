//! Driver boundary.
//!
//! The session never talks to a database directly. It goes through the traits
//! in this module, which mirror the primitives of a classic SQL client
//! driver: connect, select schema, create or prepare a statement, bind by
//! position, execute, and walk a forward-only result set reading columns as
//! text.
//!
//! [`SqlxDriver`] is the bundled implementation, serving MySQL-compatible
//! servers and SQLite on top of `sqlx`.

mod mysql;
mod rows;
mod sqlite;

use crate::connect::{ConnectParams, Endpoint};
use crate::error::{Error, Result};
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

/// A database driver able to open connections.
pub trait Driver: Send + Sync {
    /// Short driver name for diagnostics.
    fn name(&self) -> &str;

    /// Open a connection to `params.host` as `params.username`.
    ///
    /// Schema selection is a separate step, see [`Connection::set_schema`].
    fn connect(&self, params: &ConnectParams) -> Result<Box<dyn Connection>>;
}

/// An open connection.
pub trait Connection: Send {
    /// Make `schema` the default for unqualified names.
    fn set_schema(&mut self, schema: &str) -> Result<()>;

    /// Create a plain, non-prepared statement.
    fn create_statement(&mut self) -> Result<Box<dyn Statement<'_> + '_>>;

    /// Prepare `sql` with positional `?` placeholders.
    fn prepare_statement<'c>(
        &'c mut self,
        sql: &'c str,
    ) -> Result<Box<dyn PreparedStatement<'c> + 'c>>;

    /// Check whether the connection is still usable.
    fn is_valid(&mut self) -> bool;

    /// Close the connection, reporting errors from the server goodbye.
    fn close(self: Box<Self>) -> Result<()>;
}

/// A plain statement, consumed by execution.
pub trait Statement<'c> {
    /// Execute a query and open a result set over its rows.
    fn execute_query(self: Box<Self>, sql: &'c str) -> Result<Box<dyn ResultSet + 'c>>;

    /// Execute a statement that returns no rows; yields the affected row count.
    fn execute_update(self: Box<Self>, sql: &str) -> Result<u64>;
}

/// A prepared statement with 1-based positional parameters.
pub trait PreparedStatement<'c> {
    /// Number of placeholders, when the driver reports it.
    fn parameter_count(&self) -> Option<usize>;

    /// Bind a 32-bit integer.
    fn set_int(&mut self, index: usize, value: i32) -> Result<()>;

    /// Bind a double.
    fn set_double(&mut self, index: usize, value: f64) -> Result<()>;

    /// Bind a boolean.
    fn set_boolean(&mut self, index: usize, value: bool) -> Result<()>;

    /// Bind a string.
    fn set_string(&mut self, index: usize, value: &str) -> Result<()>;

    /// Execute and open a result set over the rows.
    fn execute_query(self: Box<Self>) -> Result<Box<dyn ResultSet + 'c>>;

    /// Execute a statement that returns no rows; yields the affected row count.
    fn execute_update(self: Box<Self>) -> Result<u64>;
}

/// Forward-only result set.
pub trait ResultSet {
    /// Advance to the next row. Returns `false` once the rows are exhausted.
    fn next(&mut self) -> Result<bool>;

    /// Text of column `column` (1-based) in the current row, `None` for NULL.
    fn value(&self, column: usize) -> Result<Option<String>>;

    /// Column names, when known.
    fn column_names(&self) -> &[String];

    /// Number of rows advanced over so far.
    fn row_count(&self) -> u64;
}

/// A value stored in a prepared statement's parameter slot.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BoundValue {
    Int(i32),
    Double(f64),
    Boolean(bool),
    Text(String),
}

/// Positional parameter slots of a prepared statement.
///
/// A slot left empty fails execution with [`Error::UnboundParameter`] on
/// every backend. SQLite on its own would bind the gap as NULL while MySQL
/// rejects it; the check here gives both the same outcome.
#[derive(Debug)]
pub(crate) struct ParameterSlots {
    slots: Vec<Option<BoundValue>>,
    expected: Option<usize>,
}

impl ParameterSlots {
    pub(crate) fn new(expected: Option<usize>) -> Self {
        Self {
            slots: vec![None; expected.unwrap_or(0)],
            expected,
        }
    }

    pub(crate) fn expected(&self) -> Option<usize> {
        self.expected
    }

    /// Store `value` at 1-based `index`.
    pub(crate) fn set(&mut self, index: usize, value: BoundValue) -> Result<()> {
        let in_range = match self.expected {
            Some(count) => (1..=count).contains(&index),
            None => index >= 1,
        };
        if !in_range {
            return Err(Error::ParameterIndexOutOfBounds {
                index,
                count: self.expected.unwrap_or(self.slots.len()),
            });
        }

        if index > self.slots.len() {
            self.slots.resize(index, None);
        }
        self.slots[index - 1] = Some(value);
        Ok(())
    }

    /// Take the bound values in order, failing on the first gap.
    pub(crate) fn into_values(self) -> Result<Vec<BoundValue>> {
        self.slots
            .into_iter()
            .enumerate()
            .map(|(offset, slot)| slot.ok_or(Error::UnboundParameter { position: offset + 1 }))
            .collect()
    }
}

/// Placeholder count from a `sqlx` statement description.
pub(crate) fn parameter_count<T>(parameters: Option<sqlx::Either<&[T], usize>>) -> Option<usize> {
    parameters.map(|p| match p {
        sqlx::Either::Left(types) => types.len(),
        sqlx::Either::Right(count) => count,
    })
}

/// The bundled driver: MySQL and SQLite through `sqlx`.
///
/// Owns a current-thread `tokio` runtime and blocks on it for every driver
/// call, so all operations are synchronous from the caller's view. Must not
/// be used from inside another async runtime.
pub struct SqlxDriver {
    runtime: Arc<Runtime>,
}

impl SqlxDriver {
    /// Acquire a driver instance.
    pub fn new() -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::DriverUnavailable {
                message: e.to_string(),
            })?;

        Ok(Self {
            runtime: Arc::new(runtime),
        })
    }
}

impl Driver for SqlxDriver {
    fn name(&self) -> &str {
        "sqlx"
    }

    fn connect(&self, params: &ConnectParams) -> Result<Box<dyn Connection>> {
        match params.endpoint()? {
            Endpoint::MySql { host, port } => {
                let conn = mysql::MySqlHandle::connect(self.runtime.clone(), &host, port, params)?;
                Ok(Box::new(conn))
            }
            Endpoint::Sqlite { url } => {
                let conn = sqlite::SqliteHandle::connect(self.runtime.clone(), &url, params)?;
                Ok(Box::new(conn))
            }
        }
    }
}

/// Acquire the default driver.
pub fn default_driver() -> Result<Arc<dyn Driver>> {
    Ok(Arc::new(SqlxDriver::new()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_bind_in_any_order() {
        let mut slots = ParameterSlots::new(Some(3));
        slots.set(3, BoundValue::Text("c".into())).unwrap();
        slots.set(1, BoundValue::Int(1)).unwrap();
        slots.set(2, BoundValue::Boolean(true)).unwrap();

        assert_eq!(
            slots.into_values().unwrap(),
            vec![
                BoundValue::Int(1),
                BoundValue::Boolean(true),
                BoundValue::Text("c".into())
            ]
        );
    }

    #[test]
    fn test_slots_rebind_overwrites() {
        let mut slots = ParameterSlots::new(Some(1));
        slots.set(1, BoundValue::Int(1)).unwrap();
        slots.set(1, BoundValue::Double(2.0)).unwrap();
        assert_eq!(slots.into_values().unwrap(), vec![BoundValue::Double(2.0)]);
    }

    #[test]
    fn test_slots_index_out_of_bounds() {
        let mut slots = ParameterSlots::new(Some(2));
        assert!(matches!(
            slots.set(0, BoundValue::Int(0)),
            Err(Error::ParameterIndexOutOfBounds { index: 0, count: 2 })
        ));
        assert!(matches!(
            slots.set(3, BoundValue::Int(0)),
            Err(Error::ParameterIndexOutOfBounds { index: 3, count: 2 })
        ));
    }

    #[test]
    fn test_slots_gap_is_unbound() {
        let mut slots = ParameterSlots::new(Some(3));
        slots.set(1, BoundValue::Int(1)).unwrap();
        slots.set(3, BoundValue::Int(3)).unwrap();
        assert!(matches!(
            slots.into_values(),
            Err(Error::UnboundParameter { position: 2 })
        ));
    }

    #[test]
    fn test_slots_unknown_count_grow() {
        let mut slots = ParameterSlots::new(None);
        assert_eq!(slots.expected(), None);
        slots.set(2, BoundValue::Int(2)).unwrap();
        assert!(matches!(
            slots.into_values(),
            Err(Error::UnboundParameter { position: 1 })
        ));
    }

    #[test]
    fn test_parameter_count() {
        let types: [u8; 2] = [0, 0];
        assert_eq!(parameter_count(Some(sqlx::Either::Left(&types[..]))), Some(2));
        assert_eq!(parameter_count::<u8>(Some(sqlx::Either::Right(4))), Some(4));
        assert_eq!(parameter_count::<u8>(None), None);
    }
}
