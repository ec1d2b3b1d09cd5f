//! MySQL-compatible servers through `sqlx`.

use super::rows::SqlxResultSet;
use super::{
    parameter_count, BoundValue, Connection, ParameterSlots, PreparedStatement, ResultSet,
    Statement,
};
use crate::connect::ConnectParams;
use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use sqlx::mysql::types::MySqlTime;
use sqlx::mysql::{MySql, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column as _, ConnectOptions as _, Database, Executor, Row, TypeInfo, ValueRef};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::time::timeout;
use tracing::debug;

/// An open MySQL connection plus the runtime that drives it.
pub(crate) struct MySqlHandle {
    // Dropped before the runtime.
    conn: MySqlConnection,
    runtime: Arc<Runtime>,
}

impl MySqlHandle {
    pub(crate) fn connect(
        runtime: Arc<Runtime>,
        host: &str,
        port: u16,
        params: &ConnectParams,
    ) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(host)
            .port(port)
            .username(&params.username)
            .password(&params.password);

        debug!(host, port, user = %params.username, "connecting to MySQL");

        let conn = runtime
            .block_on(async { timeout(params.connect_timeout, options.connect()).await })
            .map_err(|_| Error::ConnectionTimeout {
                host: format!("{}:{}", host, port),
                timeout: params.connect_timeout,
            })??;

        Ok(Self { conn, runtime })
    }
}

/// Quote an identifier with backticks.
fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

impl Connection for MySqlHandle {
    fn set_schema(&mut self, schema: &str) -> Result<()> {
        let sql = format!("USE {}", quote_identifier(schema));
        self.runtime
            .block_on(sqlx::raw_sql(&sql).execute(&mut self.conn))?;
        Ok(())
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

        Ok(Box::new(MySqlPrepared {
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
    conn: &'c mut MySqlConnection,
    runtime: &'c Runtime,
}

impl<'c> Statement<'c> for PlainStatement<'c> {
    fn execute_query(self: Box<Self>, sql: &'c str) -> Result<Box<dyn ResultSet + 'c>> {
        let Self { conn, runtime } = *self;
        let rows = sqlx::raw_sql(sql).fetch(conn);
        let result_set = SqlxResultSet::<MySql>::open(runtime, rows, Vec::new(), render_text)?;
        Ok(Box::new(result_set))
    }

    fn execute_update(self: Box<Self>, sql: &str) -> Result<u64> {
        let Self { conn, runtime } = *self;
        let done = runtime.block_on(sqlx::raw_sql(sql).execute(conn))?;
        Ok(done.rows_affected())
    }
}

struct MySqlPrepared<'c> {
    conn: &'c mut MySqlConnection,
    runtime: &'c Runtime,
    sql: &'c str,
    slots: ParameterSlots,
    columns: Vec<String>,
}

type MySqlQuery<'q> = Query<'q, MySql, <MySql as Database>::Arguments<'q>>;

fn bind_values(sql: &str, values: Vec<BoundValue>) -> MySqlQuery<'_> {
    values
        .into_iter()
        .fold(sqlx::query::<MySql>(sql), |query, value| match value {
            BoundValue::Int(v) => query.bind(v),
            BoundValue::Double(v) => query.bind(v),
            BoundValue::Boolean(v) => query.bind(v),
            BoundValue::Text(v) => query.bind(v),
        })
}

impl<'c> PreparedStatement<'c> for MySqlPrepared<'c> {
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
        let result_set = SqlxResultSet::<MySql>::open(runtime, rows, columns, render_binary)?;
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

/// Column text of a text-protocol row: the server already sent every value
/// as text.
fn render_text(row: &MySqlRow, index: usize) -> Result<Option<String>> {
    let value = row.try_get_raw(index)?;
    if value.is_null() {
        return Ok(None);
    }
    let bytes = row.try_get_unchecked::<Vec<u8>, _>(index)?;
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

/// Column text of a binary-protocol row, formatted the way the server prints
/// the same value over the text protocol.
fn render_binary(row: &MySqlRow, index: usize) -> Result<Option<String>> {
    let value = row.try_get_raw(index)?;
    if value.is_null() {
        return Ok(None);
    }
    let type_info = value.type_info().into_owned();

    let text = match type_info.name() {
        "BOOLEAN" => {
            let flag = row.try_get_unchecked::<bool, _>(index)?;
            String::from(if flag { "1" } else { "0" })
        }
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            row.try_get_unchecked::<i64, _>(index)?.to_string()
        }
        name if name.ends_with(" UNSIGNED") => row.try_get_unchecked::<u64, _>(index)?.to_string(),
        "FLOAT" => row.try_get_unchecked::<f32, _>(index)?.to_string(),
        "DOUBLE" => row.try_get_unchecked::<f64, _>(index)?.to_string(),
        "DATE" if is_zero_temporal(row, index)? => ZERO_DATE.to_string(),
        "DATE" => row
            .try_get_unchecked::<NaiveDate, _>(index)?
            .format("%Y-%m-%d")
            .to_string(),
        "DATETIME" | "TIMESTAMP" if is_zero_temporal(row, index)? => {
            format!("{} 00:00:00", ZERO_DATE)
        }
        "DATETIME" | "TIMESTAMP" => format_datetime(&row.try_get_unchecked::<NaiveDateTime, _>(index)?),
        "TIME" => format_time(&row.try_get_unchecked::<MySqlTime, _>(index)?),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            String::from_utf8_lossy(&row.try_get_unchecked::<Vec<u8>, _>(index)?).into_owned()
        }
        _ => row.try_get_unchecked::<String, _>(index)?,
    };

    Ok(Some(text))
}

const ZERO_DATE: &str = "0000-00-00";

/// A binary DATE or DATETIME with every field zero is sent as a bare
/// zero length byte.
fn is_zero_temporal(row: &MySqlRow, index: usize) -> Result<bool> {
    let raw = row.try_get_unchecked::<Vec<u8>, _>(index)?;
    Ok(raw.first().map_or(true, |&length| length == 0))
}

fn format_datetime(value: &NaiveDateTime) -> String {
    if value.nanosecond() == 0 {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}

/// `[-]HH:MM:SS[.ffffff]`, hours up to 838.
fn format_time(value: &MySqlTime) -> String {
    let sign = if value.is_negative() { "-" } else { "" };
    let mut text = format!(
        "{}{:02}:{:02}:{:02}",
        sign,
        value.hours(),
        value.minutes(),
        value.seconds()
    );
    if value.microseconds() != 0 {
        text.push_str(&format!(".{:06}", value.microseconds()));
    }
    text
}
