//! Error types for sqlx-sqlite-wrapper

use thiserror::Error;

/// Errors that may occur while talking to the database
#[derive(Error, Debug)]
pub enum Error {
   /// IO error when accessing or removing database files
   #[error("IO error: {0}")]
   Io(#[from] std::io::Error),

   /// Error from the sqlx library (connectivity, SQL syntax, constraints)
   #[error("Sqlx error: {0}")]
   Sqlx(#[from] sqlx::Error),

   /// Database has been closed and cannot be used
   #[error("Database has been closed")]
   DatabaseClosed,

   /// SQLite storage class that has no JSON mapping
   #[error("unsupported datatype: {0}")]
   UnsupportedDatatype(String),

   /// `PRAGMA table_info` returned nothing for the table
   #[error("table not found: {0}")]
   TableNotFound(String),
}

/// A type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
