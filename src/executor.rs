use std::future::Future;

use serde_json::Value as JsonValue;
use sqlx_sqlite_wrapper::{DatabaseWrapper, JsonRow};

use crate::Result;

/// Data-access collaborator the engine runs its SQL through.
///
/// Each call is expected to be atomic and independently consistent; the
/// engine never spans a transaction across calls.
pub trait QueryExecutor: Send + Sync {
   /// Run `sql` with positional bind `values`; no matches is an empty vector.
   fn query(
      &self,
      sql: &str,
      values: &[JsonValue],
   ) -> impl Future<Output = Result<Vec<JsonRow>>> + Send;

   /// Column names of `table`, in declaration order.
   fn columns_of(&self, table: &str) -> impl Future<Output = Result<Vec<String>>> + Send;

   /// Primary key column of `table`, `None` when it has none.
   fn primary_key_of(&self, table: &str) -> impl Future<Output = Result<Option<String>>> + Send;
}

impl QueryExecutor for DatabaseWrapper {
   async fn query(&self, sql: &str, values: &[JsonValue]) -> Result<Vec<JsonRow>> {
      Ok(self.fetch_all(sql, values.to_vec()).await?)
   }

   async fn columns_of(&self, table: &str) -> Result<Vec<String>> {
      Ok(self.columns(table).await?)
   }

   async fn primary_key_of(&self, table: &str) -> Result<Option<String>> {
      Ok(self.primary_key(table).await?)
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::Error;
   use serde_json::json;
   use tempfile::TempDir;

   async fn wrapper(dir: &TempDir) -> DatabaseWrapper {
      let db = DatabaseWrapper::connect(dir.path().join("exec.db"), None)
         .await
         .unwrap();
      db.execute(
         "CREATE TABLE tags (id INTEGER PRIMARY KEY, label TEXT NOT NULL)",
         vec![],
      )
      .await
      .unwrap();
      db.execute("INSERT INTO tags (label) VALUES ('a'), ('b')", vec![])
         .await
         .unwrap();
      db
   }

   #[tokio::test]
   async fn wrapper_answers_as_executor() {
      let dir = TempDir::new().unwrap();
      let db = wrapper(&dir).await;

      let rows = QueryExecutor::query(&db, "SELECT label FROM tags WHERE id = $1", &[json!(2)])
         .await
         .unwrap();
      assert_eq!(rows.len(), 1);
      assert_eq!(rows[0]["label"], json!("b"));

      assert_eq!(db.columns_of("tags").await.unwrap(), vec!["id", "label"]);
      assert_eq!(db.primary_key_of("tags").await.unwrap().as_deref(), Some("id"));
   }

   #[tokio::test]
   async fn wrapper_failures_become_query_execution() {
      let dir = TempDir::new().unwrap();
      let db = wrapper(&dir).await;

      let err = QueryExecutor::query(&db, "SELEC nonsense", &[]).await.unwrap_err();
      assert!(matches!(err, Error::QueryExecution(_)));

      let err = db.columns_of("missing").await.unwrap_err();
      assert_eq!(err.error_code(), "TABLE_NOT_FOUND");
   }
}
