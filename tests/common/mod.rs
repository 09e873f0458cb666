use serde_json::json;
use sqlx_sqlite_datatable::SearchResult;
use sqlx_sqlite_wrapper::DatabaseWrapper;
use tempfile::TempDir;

pub async fn create_test_db() -> (DatabaseWrapper, TempDir) {
   let _ = tracing_subscriber::fmt()
      .with_max_level(tracing::Level::TRACE)
      .with_test_writer()
      .try_init();

   let temp_dir = TempDir::new().expect("Failed to create temp directory");
   let db = DatabaseWrapper::connect(temp_dir.path().join("test.db"), None)
      .await
      .expect("Failed to connect to test database");

   (db, temp_dir)
}

/// Seed 7 posts by 3 users.
///
/// ```text
/// id | title           | category | score | author_id
/// ---|-----------------|----------|-------|----------
///  1 | Rust ownership  | science  | 95    | 1 (ada)
///  2 | Async Rust      | science  | 80    | 2 (grace)
///  3 | Tokio internals | tech     | 90    | 1 (ada)
///  4 | SQLite tuning   | tech     | 85    | 3 (linus)
///  5 | Trusting Rust   | tech     | 70    | 2 (grace)
///  6 | Watercolor      | art      | 88    | 3 (linus)
///  7 | Oil painting    | art      | 60    | 1 (ada)
/// ```
pub async fn seed_posts(db: &DatabaseWrapper) {
   db.execute(
      "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
      vec![],
   )
   .await
   .unwrap();
   db.execute(
      "CREATE TABLE posts (id INTEGER PRIMARY KEY, title TEXT NOT NULL, category TEXT NOT NULL, score INTEGER NOT NULL, author_id INTEGER NOT NULL REFERENCES users (id))",
      vec![],
   )
   .await
   .unwrap();

   for (id, name) in [(1, "ada"), (2, "grace"), (3, "linus")] {
      db.execute(
         "INSERT INTO users (id, name) VALUES ($1, $2)",
         vec![json!(id), json!(name)],
      )
      .await
      .unwrap();
   }

   let posts = [
      (1, "Rust ownership", "science", 95, 1),
      (2, "Async Rust", "science", 80, 2),
      (3, "Tokio internals", "tech", 90, 1),
      (4, "SQLite tuning", "tech", 85, 3),
      (5, "Trusting Rust", "tech", 70, 2),
      (6, "Watercolor", "art", 88, 3),
      (7, "Oil painting", "art", 60, 1),
   ];

   for (id, title, category, score, author_id) in posts {
      db.execute(
         "INSERT INTO posts (id, title, category, score, author_id) VALUES ($1, $2, $3, $4, $5)",
         vec![
            json!(id),
            json!(title),
            json!(category),
            json!(score),
            json!(author_id),
         ],
      )
      .await
      .unwrap();
   }
}

/// Extract the `id` column from each row for concise assertions.
pub fn row_ids(result: &SearchResult) -> Vec<i64> {
   result
      .rows
      .iter()
      .map(|row| row["id"].as_i64().expect("id should be an integer"))
      .collect()
}
