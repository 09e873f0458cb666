use serde_json::json;
use sqlx_sqlite_wrapper::{DatabaseWrapper, Error, SqliteDatabaseConfig};
use tempfile::TempDir;

async fn create_test_db() -> (DatabaseWrapper, TempDir) {
   let temp_dir = TempDir::new().expect("Failed to create temp directory");
   let config = SqliteDatabaseConfig {
      max_read_connections: 2,
      ..Default::default()
   };
   let db = DatabaseWrapper::connect(temp_dir.path().join("test.db"), Some(config))
      .await
      .expect("Failed to connect to test database");

   (db, temp_dir)
}

// ─── Introspection ───

#[tokio::test]
async fn columns_follow_declaration_order() {
   let (db, _temp) = create_test_db().await;
   db.execute(
      "CREATE TABLE posts (id INTEGER PRIMARY KEY, title TEXT, category TEXT, score INTEGER)",
      vec![],
   )
   .await
   .unwrap();

   let columns = db.columns("posts").await.unwrap();
   assert_eq!(columns, vec!["id", "title", "category", "score"]);
   assert_eq!(db.primary_key("posts").await.unwrap().as_deref(), Some("id"));

   db.remove().await.unwrap();
}

#[tokio::test]
async fn composite_key_reports_leading_column() {
   let (db, _temp) = create_test_db().await;
   db.execute(
      "CREATE TABLE memberships (team TEXT, member TEXT, role TEXT, PRIMARY KEY (member, team))",
      vec![],
   )
   .await
   .unwrap();

   let info = db.table_info("memberships").await.unwrap();
   assert_eq!(info.primary_key, vec!["member", "team"]);
   assert_eq!(db.primary_key("memberships").await.unwrap().as_deref(), Some("member"));

   db.remove().await.unwrap();
}

#[tokio::test]
async fn keyless_table_has_no_primary_key() {
   let (db, _temp) = create_test_db().await;
   db.execute("CREATE TABLE logs (message TEXT)", vec![]).await.unwrap();

   assert_eq!(db.primary_key("logs").await.unwrap(), None);

   db.remove().await.unwrap();
}

#[tokio::test]
async fn unknown_table_is_reported() {
   let (db, _temp) = create_test_db().await;

   let err = db.columns("missing").await.unwrap_err();
   assert!(matches!(err, Error::TableNotFound(ref t) if t == "missing"));

   db.remove().await.unwrap();
}

// ─── Lifecycle ───

#[tokio::test]
async fn closed_database_rejects_queries() {
   let (db, _temp) = create_test_db().await;
   let handle = db.clone();

   db.close().await.unwrap();

   let err = handle.fetch_all("SELECT 1", vec![]).await.unwrap_err();
   assert!(matches!(err, Error::DatabaseClosed));
}

#[tokio::test]
async fn remove_deletes_database_file() {
   let (db, temp) = create_test_db().await;
   db.execute("CREATE TABLE t (id INTEGER)", vec![]).await.unwrap();

   let path = temp.path().join("test.db");
   assert!(path.exists());

   db.remove().await.unwrap();
   assert!(!path.exists());
}

#[tokio::test]
async fn syntax_errors_surface_as_sqlx_errors() {
   let (db, _temp) = create_test_db().await;

   let err = db.fetch_all("SELEC nonsense", vec![json!(1)]).await.unwrap_err();
   assert!(matches!(err, Error::Sqlx(_)));

   db.remove().await.unwrap();
}
