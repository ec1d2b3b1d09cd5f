//! Cursor over query results.
//!
//! A [`Cursor`] wraps the driver's forward-only result set. It mutably
//! borrows the session that produced it, so only one cursor is live per
//! session and it can never outlive the connection.

use crate::driver::ResultSet;
use crate::error::Result;
use std::sync::Arc;

/// Forward-only cursor over result rows.
///
/// # Example
///
/// ```no_run
/// use db_session::Session;
///
/// let mut session = Session::open("tcp://localhost:3306", "user", "password", "shop");
///
/// if let Some(mut cursor) = session.query("SELECT name FROM products").unwrap() {
///     while cursor.next().unwrap() {
///         println!("{}", cursor.get_string(1).unwrap());
///     }
/// };
/// ```
pub struct Cursor<'s> {
    rows: Box<dyn ResultSet + 's>,
}

impl<'s> Cursor<'s> {
    pub(crate) fn new(rows: Box<dyn ResultSet + 's>) -> Self {
        Self { rows }
    }

    /// Advance to the next row. Returns `false` when no rows remain.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<bool> {
        self.rows.next()
    }

    /// Text of column `column` (1-based) in the current row.
    ///
    /// NULL reads as an empty string; use [`Cursor::get_opt_string`] or
    /// [`Cursor::is_null`] to tell the two apart.
    pub fn get_string(&self, column: usize) -> Result<String> {
        Ok(self.rows.value(column)?.unwrap_or_default())
    }

    /// Text of column `column` (1-based), `None` for NULL.
    pub fn get_opt_string(&self, column: usize) -> Result<Option<String>> {
        self.rows.value(column)
    }

    /// Check if column `column` (1-based) is NULL in the current row.
    pub fn is_null(&self, column: usize) -> Result<bool> {
        Ok(self.rows.value(column)?.is_none())
    }

    /// Column names. Empty when the driver could not describe the result and
    /// no row has been read.
    pub fn columns(&self) -> &[String] {
        self.rows.column_names()
    }

    /// Get the number of columns.
    pub fn num_columns(&self) -> usize {
        self.rows.column_names().len()
    }

    /// Number of rows advanced over so far.
    pub fn rowcount(&self) -> u64 {
        self.rows.row_count()
    }

    /// Snapshot of the current row.
    pub fn current_row(&self) -> Result<Row> {
        let column_names: Arc<[String]> = self.rows.column_names().into();
        self.snapshot(column_names)
    }

    fn snapshot(&self, column_names: Arc<[String]>) -> Result<Row> {
        let values = (1..=column_names.len())
            .map(|column| self.rows.value(column))
            .collect::<Result<Vec<_>>>()?;
        Ok(Row::new(values, column_names))
    }

    /// Read all remaining rows.
    pub fn fetch_all(&mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        let mut column_names: Option<Arc<[String]>> = None;
        while self.next()? {
            let names = column_names
                .get_or_insert_with(|| self.rows.column_names().into())
                .clone();
            rows.push(self.snapshot(names)?);
        }
        Ok(rows)
    }

    /// Turn the cursor into an iterator of rows.
    ///
    /// Iteration stops after the first error.
    pub fn into_rows(self) -> Rows<'s> {
        Rows {
            cursor: self,
            failed: false,
        }
    }
}

/// Iterator over the rows of a [`Cursor`].
pub struct Rows<'s> {
    cursor: Cursor<'s>,
    failed: bool,
}

impl Iterator for Rows<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let row = match self.cursor.next() {
            Ok(true) => self.cursor.current_row(),
            Ok(false) => return None,
            Err(e) => Err(e),
        };
        self.failed = row.is_err();
        Some(row)
    }
}

/// A row of query results as text.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<Option<String>>,
    column_names: Arc<[String]>,
}

impl Row {
    /// Create a new row with values and shared column names.
    pub fn new(values: Vec<Option<String>>, column_names: Arc<[String]>) -> Self {
        Self {
            values,
            column_names,
        }
    }

    /// Get value by column index (0-based). `None` for NULL or out of range.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }

    /// Get value by column name (case-insensitive).
    pub fn get_by_name(&self, name: &str) -> Option<&str> {
        self.column_names
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|idx| self.get(idx))
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get all values.
    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }

    /// Get column names.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }
}

impl IntoIterator for Row {
    type Item = Option<String>;
    type IntoIter = std::vec::IntoIter<Option<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
