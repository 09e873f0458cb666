//! # sqlx-sqlite-wrapper
//!
//! Thin data-access layer over SQLx for SQLite. It runs parameterized SQL
//! with JSON bind values, returns rows as ordered column-to-value maps, and
//! answers schema questions (column list, primary key) for a table.
//!
//! ## Core Types
//!
//! - **[`DatabaseWrapper`]**: cloneable handle exposing `execute`, `fetch_all`,
//!   `columns` and `primary_key`
//! - **[`SqliteDatabase`]**: the read pool plus single writer behind it
//! - **[`SqliteDatabaseConfig`]**: pool sizing and timeouts
//! - **[`WriteGuard`]**: exclusive hold on the writer connection
//! - **[`Error`]**: error type for all of the above
//!
//! ## Example
//!
//! ```no_run
//! use serde_json::json;
//! use sqlx_sqlite_wrapper::DatabaseWrapper;
//!
//! # async fn run() -> sqlx_sqlite_wrapper::Result<()> {
//! let db = DatabaseWrapper::connect("app.db", None).await?;
//! db.execute("CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY, name TEXT)", vec![])
//!    .await?;
//! db.execute("INSERT INTO users (name) VALUES ($1)", vec![json!("Ada")]).await?;
//!
//! let rows = db.fetch_all("SELECT id, name FROM users", vec![]).await?;
//! assert_eq!(rows[0]["name"], json!("Ada"));
//! assert_eq!(db.primary_key("users").await?.as_deref(), Some("id"));
//! # Ok(())
//! # }
//! ```

mod config;
mod database;
mod decode;
mod error;
mod schema;
mod wrapper;
mod write_guard;

pub use config::SqliteDatabaseConfig;
pub use database::SqliteDatabase;
pub use error::{Error, Result};
pub use schema::TableInfo;
pub use wrapper::{DatabaseWrapper, JsonRow, WriteQueryResult};
pub use write_guard::WriteGuard;
