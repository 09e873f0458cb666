use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row, Sqlite};
use tracing::trace;

use crate::SqliteDatabaseConfig;
use crate::database::SqliteDatabase;
use crate::decode::to_json;
use crate::error::Result;
use crate::schema::{TableInfo, query_table_info};

/// One fetched row: column name to decoded value, in select-list order
pub type JsonRow = IndexMap<String, JsonValue>;

/// Outcome of an INSERT, UPDATE or DELETE.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteQueryResult {
   /// Rows touched by the statement
   pub rows_affected: u64,
   /// ROWID of the last inserted row (0 when nothing was inserted)
   pub last_insert_id: i64,
}

/// Cheaply cloneable handle that runs parameterized SQL with JSON bind
/// values and hands rows back as [`JsonRow`]s.
#[derive(Debug, Clone)]
pub struct DatabaseWrapper {
   inner: Arc<SqliteDatabase>,
}

impl DatabaseWrapper {
   /// Open the database file at `path`
   pub async fn connect(
      path: impl AsRef<Path>,
      config: Option<SqliteDatabaseConfig>,
   ) -> Result<Self> {
      let inner = SqliteDatabase::connect(path, config).await?;
      Ok(Self { inner })
   }

   /// Wrap an already connected database
   pub fn from_database(inner: Arc<SqliteDatabase>) -> Self {
      Self { inner }
   }

   /// The pooled database behind this wrapper
   pub fn inner(&self) -> &Arc<SqliteDatabase> {
      &self.inner
   }

   /// Run a write statement on the serialized writer
   pub async fn execute(&self, query: &str, values: Vec<JsonValue>) -> Result<WriteQueryResult> {
      trace!(sql = query, binds = values.len(), "execute");

      let mut writer = self.inner.acquire_writer().await?;
      let result = bind_values(sqlx::query(query), values)
         .execute(&mut *writer)
         .await?;

      Ok(WriteQueryResult {
         rows_affected: result.rows_affected(),
         last_insert_id: result.last_insert_rowid(),
      })
   }

   /// Run a SELECT on the read pool; no matches gives an empty vector
   pub async fn fetch_all(&self, query: &str, values: Vec<JsonValue>) -> Result<Vec<JsonRow>> {
      trace!(sql = query, binds = values.len(), "fetch_all");

      let pool = self.inner.read_pool()?;
      let rows = bind_values(sqlx::query(query), values)
         .fetch_all(pool)
         .await?;

      decode_rows(rows)
   }

   /// Column names and primary key of `table`
   pub async fn table_info(&self, table: &str) -> Result<TableInfo> {
      query_table_info(self.inner.read_pool()?, table).await
   }

   /// Column names of `table`, in declaration order
   pub async fn columns(&self, table: &str) -> Result<Vec<String>> {
      Ok(self.table_info(table).await?.columns)
   }

   /// Leading primary key column of `table`, or `None` for keyless tables
   pub async fn primary_key(&self, table: &str) -> Result<Option<String>> {
      let info = self.table_info(table).await?;
      Ok(info.primary_key_column().map(str::to_string))
   }

   /// Close the pools
   pub async fn close(self) -> Result<()> {
      self.inner.close().await
   }

   /// Close the pools and delete the database files
   pub async fn remove(self) -> Result<()> {
      self.inner.remove().await
   }
}

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

fn bind_values(mut query: SqliteQuery<'_>, values: Vec<JsonValue>) -> SqliteQuery<'_> {
   for value in values {
      query = bind_value(query, value);
   }
   query
}

/// Bind one JSON value using the closest SQLite storage class.
fn bind_value(query: SqliteQuery<'_>, value: JsonValue) -> SqliteQuery<'_> {
   match value {
      JsonValue::Null => query.bind(None::<String>),
      JsonValue::Bool(flag) => query.bind(flag),
      JsonValue::String(text) => query.bind(text),
      JsonValue::Number(number) => {
         if let Some(int) = number.as_i64() {
            query.bind(int)
         } else if let Some(uint) = number.as_u64() {
            // Past i64::MAX only a REAL can hold it
            query.bind(uint as f64)
         } else {
            query.bind(number.as_f64().unwrap_or_default())
         }
      }
      // Arrays and objects are stored as their JSON text
      other => query.bind(other.to_string()),
   }
}

fn decode_rows(rows: Vec<SqliteRow>) -> Result<Vec<JsonRow>> {
   let mut decoded = Vec::with_capacity(rows.len());
   for row in rows {
      let mut value = JsonRow::with_capacity(row.columns().len());
      for (i, column) in row.columns().iter().enumerate() {
         value.insert(column.name().to_string(), to_json(row.try_get_raw(i)?)?);
      }
      decoded.push(value);
   }
   Ok(decoded)
}
