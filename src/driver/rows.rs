//! Result set over a `sqlx` row stream.

use super::ResultSet;
use crate::error::{Error, Result};
use futures::stream::BoxStream;
use futures::TryStreamExt;
use sqlx::{Column, Database, Row};
use tokio::runtime::Runtime;

/// Renders column `index` (0-based) of a row as text.
pub(crate) type RenderFn<DB> = fn(&<DB as Database>::Row, usize) -> Result<Option<String>>;

/// Lazy result set holding the connection borrow for its lifetime.
///
/// The first row is fetched when the set is opened so execution errors
/// surface from the execute call; the rest are pulled one at a time.
pub(crate) struct SqlxResultSet<'c, DB: Database> {
    runtime: &'c Runtime,
    rows: BoxStream<'c, std::result::Result<DB::Row, sqlx::Error>>,
    /// Prefetched row not yet handed out.
    pending: Option<DB::Row>,
    current: Option<DB::Row>,
    columns: Vec<String>,
    render: RenderFn<DB>,
    rows_fetched: u64,
    exhausted: bool,
}

impl<'c, DB: Database> SqlxResultSet<'c, DB> {
    pub(crate) fn open(
        runtime: &'c Runtime,
        mut rows: BoxStream<'c, std::result::Result<DB::Row, sqlx::Error>>,
        columns: Vec<String>,
        render: RenderFn<DB>,
    ) -> Result<Self> {
        let pending = runtime.block_on(rows.try_next())?;

        let columns = match (&pending, columns.is_empty()) {
            (Some(row), true) => column_names::<DB>(row),
            _ => columns,
        };

        Ok(Self {
            runtime,
            exhausted: pending.is_none(),
            rows,
            pending,
            current: None,
            columns,
            render,
            rows_fetched: 0,
        })
    }

    fn current_row(&self) -> Result<&DB::Row> {
        self.current.as_ref().ok_or(Error::NoCurrentRow)
    }
}

fn column_names<DB: Database>(row: &DB::Row) -> Vec<String> {
    row.columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect()
}

impl<'c, DB: Database> ResultSet for SqlxResultSet<'c, DB> {
    fn next(&mut self) -> Result<bool> {
        let row = match self.pending.take() {
            Some(row) => Some(row),
            None if self.exhausted => None,
            None => self.runtime.block_on(self.rows.try_next())?,
        };

        match row {
            Some(row) => {
                self.rows_fetched += 1;
                self.current = Some(row);
                Ok(true)
            }
            None => {
                self.exhausted = true;
                self.current = None;
                Ok(false)
            }
        }
    }

    fn value(&self, column: usize) -> Result<Option<String>> {
        let row = self.current_row()?;
        let count = row.len();
        if column == 0 || column > count {
            return Err(Error::ColumnIndexOutOfBounds {
                index: column,
                count,
            });
        }
        (self.render)(row, column - 1)
    }

    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn row_count(&self) -> u64 {
        self.rows_fetched
    }
}
