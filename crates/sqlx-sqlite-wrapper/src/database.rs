//! SQLite database with a read pool and a single serialized writer

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::debug;

use crate::config::SqliteDatabaseConfig;
use crate::error::{Error, Result};
use crate::write_guard::WriteGuard;

/// SQLite database file opened through two sqlx pools.
///
/// - **`read_pool`**: up to `max_read_connections` connections for SELECTs
/// - **`write_conn`**: a pool capped at one connection, so writes are
///   serialized by the pool itself
///
/// WAL journaling is enabled when the writer connects, which lets readers
/// keep working while a write is in flight.
#[derive(Debug)]
pub struct SqliteDatabase {
   read_pool: Pool<Sqlite>,
   write_conn: Pool<Sqlite>,
   closed: AtomicBool,
   path: PathBuf,
}

impl SqliteDatabase {
   /// Open (creating if missing) the database file at `path`.
   pub async fn connect(
      path: impl AsRef<Path>,
      config: Option<SqliteDatabaseConfig>,
   ) -> Result<Arc<Self>> {
      let config = config.unwrap_or_default();
      let path = path.as_ref().to_path_buf();

      let options = SqliteConnectOptions::new()
         .filename(&path)
         .busy_timeout(config.busy_timeout);

      // The writer goes first: it creates the file and switches it to WAL
      let write_conn = SqlitePoolOptions::new()
         .max_connections(1)
         .min_connections(1)
         .idle_timeout(config.idle_timeout)
         .connect_with(
            options
               .clone()
               .create_if_missing(true)
               .journal_mode(SqliteJournalMode::Wal),
         )
         .await?;

      let read_pool = SqlitePoolOptions::new()
         .max_connections(config.max_read_connections.max(1))
         .idle_timeout(config.idle_timeout)
         .connect_with(options)
         .await?;

      debug!("Connected to SQLite database at {}", path.display());

      Ok(Arc::new(Self {
         read_pool,
         write_conn,
         closed: AtomicBool::new(false),
         path,
      }))
   }

   /// Path of the underlying database file
   pub fn path(&self) -> &Path {
      &self.path
   }

   /// Pool for read statements
   pub fn read_pool(&self) -> Result<&Pool<Sqlite>> {
      self.ensure_open()?;
      Ok(&self.read_pool)
   }

   /// Wait for the single write connection and hold it until the guard drops
   pub async fn acquire_writer(&self) -> Result<WriteGuard> {
      self.ensure_open()?;
      let conn = self.write_conn.acquire().await?;
      Ok(WriteGuard::new(conn))
   }

   /// Close both pools. Later calls fail with [`Error::DatabaseClosed`].
   pub async fn close(&self) -> Result<()> {
      if self.closed.swap(true, Ordering::SeqCst) {
         return Ok(());
      }

      self.read_pool.close().await;
      self.write_conn.close().await;
      debug!("Closed SQLite database at {}", self.path.display());
      Ok(())
   }

   /// Close the database and delete its file along with WAL side files
   pub async fn remove(&self) -> Result<()> {
      self.close().await?;

      for suffix in ["", "-wal", "-shm"] {
         let mut file = self.path.clone().into_os_string();
         file.push(suffix);

         match tokio::fs::remove_file(&file).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::Io(e)),
         }
      }

      debug!("Removed SQLite database at {}", self.path.display());
      Ok(())
   }

   fn ensure_open(&self) -> Result<()> {
      if self.closed.load(Ordering::SeqCst) {
         return Err(Error::DatabaseClosed);
      }
      Ok(())
   }
}
