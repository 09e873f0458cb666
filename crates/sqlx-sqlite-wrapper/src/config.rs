//! Configuration for the SQLite connection pools

use std::time::Duration;

/// Pool settings used by [`SqliteDatabase::connect`](crate::SqliteDatabase::connect)
///
/// # Examples
///
/// ```
/// use sqlx_sqlite_wrapper::SqliteDatabaseConfig;
/// use std::time::Duration;
///
/// let config = SqliteDatabaseConfig {
///     max_read_connections: 2,
///     busy_timeout: Duration::from_secs(1),
///     ..Default::default()
/// };
/// assert_eq!(config.idle_timeout, Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct SqliteDatabaseConfig {
   /// Maximum number of pooled connections used for SELECT statements
   ///
   /// Default: 6
   pub max_read_connections: u32,

   /// Idle connections are closed after this long
   ///
   /// Default: 30 seconds
   pub idle_timeout: Duration,

   /// How long a statement waits on a locked database before failing
   /// with `SQLITE_BUSY`
   ///
   /// Default: 5 seconds
   pub busy_timeout: Duration,
}

impl Default for SqliteDatabaseConfig {
   fn default() -> Self {
      Self {
         max_read_connections: 6,
         idle_timeout: Duration::from_secs(30),
         busy_timeout: Duration::from_secs(5),
      }
   }
}
