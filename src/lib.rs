//! Database session with typed parameter binding.
//!
//! A thin, blocking facade over a SQL client driver: open a connection,
//! optionally bind positional parameters into a prepared statement, execute,
//! and walk the rows through a forward-only cursor.
//!
//! # Example
//!
//! ```no_run
//! use db_session::{params, Session};
//!
//! // Connection failures leave the session unconnected; queries then return None.
//! let mut session = Session::open("tcp://localhost:3306", "user", "password", "database");
//!
//! if let Some(mut cursor) = session.query("SELECT * FROM SEQUENCE_TABLE(100) AS SEQ LIMIT 0, 10")? {
//!     while cursor.next()? {
//!         println!("{}", cursor.get_string(1)?);
//!     }
//! }
//!
//! let sql = "SELECT * FROM SEQUENCE_TABLE(100) AS SEQ LIMIT ?, ?";
//! if let Some(mut cursor) = session.query_with(sql, &params![10, 10])? {
//!     while cursor.next()? {
//!         println!("{}", cursor.get_string(1)?);
//!     }
//! }
//! # Ok::<(), db_session::Error>(())
//! ```

pub mod connect;
pub mod cursor;
pub mod driver;
pub mod error;
pub mod params;
pub mod session;

// Re-export main types
pub use connect::{ConnectParams, Endpoint};
pub use cursor::{Cursor, Row, Rows};
pub use driver::{Driver, SqlxDriver};
pub use error::{Error, Result};
pub use params::{BindMode, Param};
pub use session::Session;
