//! SQLite backend for the Cloak claims store.
//!
//! All database work goes through [`tokio_rusqlite`], which owns the
//! connection on a background thread so store calls never block the async
//! runtime.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
