//! SQLite through `sqlx`.

use super::rows::SqlxResultSet;
use super::{
    parameter_count, BoundValue, Connection, ParameterSlots, PreparedStatement, ResultSet,
    Statement,
};
use crate::connect::ConnectParams;
use crate::error::{Error, Result};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column as _, ConnectOptions as _, Database, Executor, Row, TypeInfo, ValueRef};
use std::str::FromStr;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::time::timeout;
use tracing::debug;

/// An open SQLite connection plus the runtime that drives it.
pub(crate) struct SqliteHandle {
    // Dropped before the runtime.
    conn: SqliteConnection,
    runtime: Arc<Runtime>,
}

impl SqliteHandle {
    /// Open `url`. Credentials are ignored; SQLite has none.
    pub(crate) fn connect(runtime: Arc<Runtime>, url: &str, params: &ConnectParams) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?;

        debug!(url, "opening SQLite database");

        let conn = runtime
            .block_on(async { timeout(params.connect_timeout, options.connect()).await })
            .map_err(|_| Error::ConnectionTimeout {
                host: url.to_string(),
                timeout: params.connect_timeout,
            })??;

        Ok(Self { conn, runtime })
    }
}

impl Connection for SqliteHandle {
    /// SQLite has no `USE`; the schema must already be one of the attached
    /// databases (`main`, `temp` or an `ATTACH`ed name).
    fn set_schema(&mut self, schema: &str) -> Result<()> {
        let found = self.runtime.block_on(
            sqlx::query::<Sqlite>("SELECT name FROM pragma_database_list WHERE name = ?1")
                .bind(schema)
                .fetch_optional(&mut self.conn),
        )?;

        match found {
            Some(_) => Ok(()),
            None => Err(Error::UnknownSchema {
                schema: schema.to_string(),
            }),
        }
    }

    fn create_statement(&mut self) -> Result<Box<dyn Statement<'_> + '_>> {
        Ok(Box::new(PlainStatement {
            conn: &mut self.conn,
            runtime: &self.runtime,
        }))
    }

    fn prepare_statement<'c>(
        &'c mut self,
        sql: &'c str,
    ) -> Result<Box<dyn PreparedStatement<'c> + 'c>> {
        let (expected, columns) = {
            let statement = self
                .runtime
                .block_on(Executor::prepare(&mut self.conn, sql))?;
            let expected = parameter_count(sqlx::Statement::parameters(&statement));
            let columns = sqlx::Statement::columns(&statement)
                .iter()
                .map(|column| column.name().to_string())
                .collect::<Vec<_>>();
            (expected, columns)
        };

        Ok(Box::new(SqlitePrepared {
            conn: &mut self.conn,
            runtime: &self.runtime,
            sql,
            slots: ParameterSlots::new(expected),
            columns,
        }))
    }

    fn is_valid(&mut self) -> bool {
        self.runtime
            .block_on(sqlx::Connection::ping(&mut self.conn))
            .is_ok()
    }

    fn close(self: Box<Self>) -> Result<()> {
        let Self { conn, runtime } = *self;
        runtime.block_on(sqlx::Connection::close(conn))?;
        Ok(())
    }
}

struct PlainStatement<'c> {
    conn: &'c mut SqliteConnection,
    runtime: &'c Runtime,
}

impl<'c> Statement<'c> for PlainStatement<'c> {
    fn execute_query(self: Box<Self>, sql: &'c str) -> Result<Box<dyn ResultSet + 'c>> {
        let Self { conn, runtime } = *self;
        let rows = sqlx::raw_sql(sql).fetch(conn);
        let result_set = SqlxResultSet::<Sqlite>::open(runtime, rows, Vec::new(), render_value)?;
        Ok(Box::new(result_set))
    }

    fn execute_update(self: Box<Self>, sql: &str) -> Result<u64> {
        let Self { conn, runtime } = *self;
        let done = runtime.block_on(sqlx::raw_sql(sql).execute(conn))?;
        Ok(done.rows_affected())
    }
}

struct SqlitePrepared<'c> {
    conn: &'c mut SqliteConnection,
    runtime: &'c Runtime,
    sql: &'c str,
    slots: ParameterSlots,
    columns: Vec<String>,
}

type SqliteQuery<'q> = Query<'q, Sqlite, <Sqlite as Database>::Arguments<'q>>;

fn bind_values(sql: &str, values: Vec<BoundValue>) -> SqliteQuery<'_> {
    values
        .into_iter()
        .fold(sqlx::query::<Sqlite>(sql), |query, value| match value {
            BoundValue::Int(v) => query.bind(v),
            BoundValue::Double(v) => query.bind(v),
            BoundValue::Boolean(v) => query.bind(v),
            BoundValue::Text(v) => query.bind(v),
        })
}

impl<'c> PreparedStatement<'c> for SqlitePrepared<'c> {
    fn parameter_count(&self) -> Option<usize> {
        self.slots.expected()
    }

    fn set_int(&mut self, index: usize, value: i32) -> Result<()> {
        self.slots.set(index, BoundValue::Int(value))
    }

    fn set_double(&mut self, index: usize, value: f64) -> Result<()> {
        self.slots.set(index, BoundValue::Double(value))
    }

    fn set_boolean(&mut self, index: usize, value: bool) -> Result<()> {
        self.slots.set(index, BoundValue::Boolean(value))
    }

    fn set_string(&mut self, index: usize, value: &str) -> Result<()> {
        self.slots.set(index, BoundValue::Text(value.to_string()))
    }

    fn execute_query(self: Box<Self>) -> Result<Box<dyn ResultSet + 'c>> {
        let Self {
            conn,
            runtime,
            sql,
            slots,
            columns,
        } = *self;
        let rows = bind_values(sql, slots.into_values()?).fetch(conn);
        let result_set = SqlxResultSet::<Sqlite>::open(runtime, rows, columns, render_value)?;
        Ok(Box::new(result_set))
    }

    fn execute_update(self: Box<Self>) -> Result<u64> {
        let Self {
            conn,
            runtime,
            sql,
            slots,
            ..
        } = *self;
        let done = runtime.block_on(bind_values(sql, slots.into_values()?).execute(conn))?;
        Ok(done.rows_affected())
    }
}

/// Column text by the value's storage class.
fn render_value(row: &SqliteRow, index: usize) -> Result<Option<String>> {
    let value = row.try_get_raw(index)?;
    if value.is_null() {
        return Ok(None);
    }
    let type_info = value.type_info().into_owned();

    let text = match type_info.name() {
        "INTEGER" | "BOOLEAN" => row.try_get_unchecked::<i64, _>(index)?.to_string(),
        "REAL" => row.try_get_unchecked::<f64, _>(index)?.to_string(),
        "BLOB" => {
            String::from_utf8_lossy(&row.try_get_unchecked::<Vec<u8>, _>(index)?).into_owned()
        }
        _ => row.try_get_unchecked::<String, _>(index)?,
    };

    Ok(Some(text))
}
