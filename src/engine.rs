//! Pagination Engine: counts, windows and the final fetch for both entry
//! points.
//!
//! The engine is stateless. It holds the injected executor and an
//! immutable [`SearchConfig`]; everything a call produces comes back in its
//! [`SearchResult`], so one engine can serve concurrent requests.

use std::future::{Future, IntoFuture};
use std::pin::Pin;

use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx_sqlite_wrapper::JsonRow;
use tracing::{debug, trace};

use crate::clause::assemble;
use crate::config::SearchConfig;
use crate::executor::QueryExecutor;
use crate::pagination::{PageState, RecordState, Window};
use crate::params::SearchParams;
use crate::predicate::{Schema, compile, referenced_tables};
use crate::sql::{
   count_query, grouped_count_query, normalize, quote_column, quote_identifier,
   validate_base_query, validate_identifier,
};
use crate::{Error, Result};

/// Rows of one page plus the bookkeeping around them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
   pub rows: Vec<JsonRow>,
   pub pages: PageState,
   pub records: RecordState,
   /// Rows in the table, ignoring every filter
   pub total_records: u64,
   /// Rows matching the assembled WHERE clause
   pub total_filtered_records: u64,
}

impl SearchResult {
   /// DataTables name for [`total_filtered_records`](Self::total_filtered_records)
   pub fn total_display_records(&self) -> u64 {
      self.total_filtered_records
   }
}

/// Filters, orders and paginates caller-supplied SELECT statements.
#[derive(Debug, Clone)]
pub struct SearchEngine<E> {
   executor: E,
   config: SearchConfig,
}

impl<E: QueryExecutor> SearchEngine<E> {
   pub fn new(executor: E) -> Self {
      Self::with_config(executor, SearchConfig::default())
   }

   pub fn with_config(executor: E, config: SearchConfig) -> Self {
      Self { executor, config }
   }

   pub fn executor(&self) -> &E {
      &self.executor
   }

   pub fn config(&self) -> &SearchConfig {
      &self.config
   }

   /// Page through an already complete statement.
   ///
   /// The statement is not augmented from request parameters; its own
   /// placeholders are bound with [`ExecuteQueryBuilder::values`]. The
   /// filtered count is `COUNT(DISTINCT alias.<distinct column>)` over the
   /// statement, where the distinct column comes from
   /// [`SearchConfig::distinct_column_for`].
   ///
   /// Fails with [`Error::PageOutOfRange`] when `page` lies past the last
   /// page of a non-empty result.
   pub fn execute_query<'a>(
      &'a self,
      table: &str,
      alias: &str,
      query: &str,
      page: u64,
      limit: u64,
   ) -> ExecuteQueryBuilder<'a, E> {
      ExecuteQueryBuilder {
         engine: self,
         table: table.to_string(),
         alias: alias.to_string(),
         query: query.to_string(),
         values: Vec::new(),
         page,
         limit,
      }
   }

   /// Filter, order and paginate `query` from datatable-style request
   /// parameters.
   ///
   /// See [`SearchParams`](crate::SearchParams) for the recognized keys.
   /// The window comes from [`RawSearchBuilder::window`] when set, else
   /// from `displayStart`/`displayLength`, else from `page`/`ipp`, else the
   /// whole filtered set is returned as one page.
   pub fn raw_search<'a>(
      &'a self,
      query: &str,
      table: &str,
      params: &'a SearchParams,
   ) -> RawSearchBuilder<'a, E> {
      RawSearchBuilder {
         engine: self,
         query: query.to_string(),
         table: table.to_string(),
         params,
         values: Vec::new(),
         window: None,
         joins: Vec::new(),
      }
   }

   /// Run a `... AS total` query and read the count back.
   async fn count(&self, sql: &str, values: &[JsonValue]) -> Result<u64> {
      trace!(sql, binds = values.len(), "count");

      let rows = self.executor.query(sql, values).await?;
      rows
         .first()
         .and_then(|row| row.get("total"))
         .and_then(JsonValue::as_u64)
         .ok_or_else(|| Error::MissingCount {
            query: sql.to_string(),
         })
   }

   /// Unfiltered row count of `table`, by primary key when it has one.
   async fn table_total(&self, table: &str) -> Result<u64> {
      let target = match self.executor.primary_key_of(table).await? {
         Some(pk) => quote_identifier(&pk),
         None => "*".to_string(),
      };
      let sql = format!(
         "SELECT COUNT({}) AS total FROM {}",
         target,
         quote_identifier(table)
      );
      self.count(&sql, &[]).await
   }
}

/// Builder returned by [`SearchEngine::execute_query`]
pub struct ExecuteQueryBuilder<'a, E> {
   engine: &'a SearchEngine<E>,
   table: String,
   alias: String,
   query: String,
   values: Vec<JsonValue>,
   page: u64,
   limit: u64,
}

impl<'a, E: QueryExecutor> ExecuteQueryBuilder<'a, E> {
   /// Values for the statement's own placeholders
   pub fn values(mut self, values: Vec<JsonValue>) -> Self {
      self.values = values;
      self
   }

   pub async fn execute(self) -> Result<SearchResult> {
      let engine = self.engine;
      let config = &engine.config;

      validate_identifier(&self.table)?;
      validate_identifier(&self.alias)?;
      let query = normalize(&self.query);
      validate_base_query(query)?;
      let window = Window::page(self.page, self.limit, config)?;

      let distinct = config.distinct_column_for(&self.table);
      validate_identifier(distinct)?;
      let target = format!("DISTINCT {}", quote_column(Some(&self.alias), distinct));
      let filtered = engine
         .count(&count_query(query, &target)?, &self.values)
         .await?;
      let total = engine.table_total(&self.table).await?;

      let plan = window.plan(filtered)?;
      let sql = match plan.limit_clause(config.query_limit_syntax) {
         Some(limit) => format!("{} {}", query, limit),
         None => query.to_string(),
      };

      trace!(sql = %sql, "execute_query");
      let rows = engine.executor.query(&sql, &self.values).await?;
      let records = plan.records(rows.len() as u64, filtered);

      debug!(
         table = %self.table,
         page = self.page,
         filtered,
         total,
         amount = records.amount,
         "execute_query done"
      );

      Ok(SearchResult {
         rows,
         pages: plan.pages,
         records,
         total_records: total,
         total_filtered_records: filtered,
      })
   }
}

impl<'a, E: QueryExecutor> IntoFuture for ExecuteQueryBuilder<'a, E> {
   type Output = Result<SearchResult>;
   type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'a>>;

   fn into_future(self) -> Self::IntoFuture {
      Box::pin(self.execute())
   }
}

/// Builder returned by [`SearchEngine::raw_search`]
pub struct RawSearchBuilder<'a, E> {
   engine: &'a SearchEngine<E>,
   query: String,
   table: String,
   params: &'a SearchParams,
   values: Vec<JsonValue>,
   window: Option<(u64, u64)>,
   joins: Vec<String>,
}

impl<'a, E: QueryExecutor> RawSearchBuilder<'a, E> {
   /// Values for the statement's own placeholders. Compiled predicates are
   /// numbered after them.
   pub fn values(mut self, values: Vec<JsonValue>) -> Self {
      self.values = values;
      self
   }

   /// Fetch `count` rows starting at row `offset`, overriding any window
   /// the parameters ask for. The parameters themselves are left as they
   /// are.
   pub fn window(mut self, count: u64, offset: u64) -> Self {
      self.window = Some((count, offset));
      self
   }

   /// Let unqualified `fe_`/`o_`/`q_`/`qb_`/`qe_` keys name columns of a
   /// table joined into the statement.
   pub fn join_table(mut self, table: impl Into<String>) -> Self {
      self.joins.push(table.into());
      self
   }

   pub async fn execute(self) -> Result<SearchResult> {
      let engine = self.engine;
      let config = &engine.config;
      let params = self.params;

      validate_identifier(&self.table)?;
      let base = normalize(&self.query);
      validate_base_query(base)?;

      let window = match self.window {
         Some((count, offset)) => Window::rows(count, offset, config)?,
         None => Window::from_params(params, config)?,
      };

      let schema = self.schema().await?;
      let compiled = compile(&schema, params, self.values.len())?;
      let assembled = assemble(base, &compiled)?;

      let mut binds = self.values.clone();
      binds.extend(compiled.binds);

      let filtered = engine
         .count(&grouped_count_query(&assembled.filtered)?, &binds)
         .await?;
      let total = if params.truthy("total_filtered").is_some() {
         engine
            .count(&grouped_count_query(base)?, &self.values)
            .await?
      } else {
         engine.table_total(&self.table).await?
      };

      let plan = window.plan(filtered)?;
      let sql = match plan.limit_clause(config.search_limit_syntax) {
         Some(limit) => format!("{} {}", assembled.ordered, limit),
         None => assembled.ordered,
      };

      trace!(sql = %sql, binds = binds.len(), "raw_search");
      let rows = engine.executor.query(&sql, &binds).await?;
      let records = plan.records(rows.len() as u64, filtered);

      debug!(
         table = %self.table,
         filtered,
         total,
         amount = records.amount,
         page = ?plan.pages.current,
         "raw_search done"
      );

      Ok(SearchResult {
         rows,
         pages: plan.pages,
         records,
         total_records: total,
         total_filtered_records: filtered,
      })
   }

   /// Column Sets of the primary table, the declared joins and every table
   /// a dotted key names.
   async fn schema(&self) -> Result<Schema> {
      let executor = &self.engine.executor;
      let mut schema = Schema::new(&self.table, executor.columns_of(&self.table).await?);

      for join in &self.joins {
         validate_identifier(join)?;
         if *join != self.table {
            schema = schema.join(join, executor.columns_of(join).await?);
         }
      }

      for table in referenced_tables(self.params)? {
         if !schema.contains_table(&table) {
            let columns = executor.columns_of(&table).await?;
            schema = schema.reference(table, columns);
         }
      }

      Ok(schema)
   }
}

impl<'a, E: QueryExecutor> IntoFuture for RawSearchBuilder<'a, E> {
   type Output = Result<SearchResult>;
   type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'a>>;

   fn into_future(self) -> Self::IntoFuture {
      Box::pin(self.execute())
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use indexmap::IndexMap;
   use serde_json::json;
   use std::sync::Mutex;

   /// Executor that answers count queries with a fixed total, returns
   /// `rows` for everything else and records what it was asked to run.
   struct Recording {
      total: u64,
      rows: usize,
      columns: IndexMap<String, Vec<String>>,
      primary_key: Option<String>,
      seen: Mutex<Vec<(String, Vec<JsonValue>)>>,
   }

   impl Recording {
      fn new(total: u64, rows: usize) -> Self {
         let mut columns = IndexMap::new();
         columns.insert(
            "posts".to_string(),
            vec!["id".into(), "title".into(), "category".into()],
         );
         columns.insert("users".to_string(), vec!["id".into(), "name".into()]);

         Self {
            total,
            rows,
            columns,
            primary_key: Some("id".into()),
            seen: Mutex::new(Vec::new()),
         }
      }

      fn seen(&self) -> Vec<(String, Vec<JsonValue>)> {
         self.seen.lock().unwrap().clone()
      }
   }

   impl QueryExecutor for Recording {
      async fn query(&self, sql: &str, values: &[JsonValue]) -> Result<Vec<JsonRow>> {
         self
            .seen
            .lock()
            .unwrap()
            .push((sql.to_string(), values.to_vec()));

         if sql.contains("AS total") {
            let mut row = JsonRow::new();
            row.insert("total".into(), json!(self.total));
            return Ok(vec![row]);
         }
         Ok((0..self.rows)
            .map(|i| {
               let mut row = JsonRow::new();
               row.insert("id".into(), json!(i + 1));
               row
            })
            .collect())
      }

      async fn columns_of(&self, table: &str) -> Result<Vec<String>> {
         self.columns.get(table).cloned().ok_or_else(|| {
            Error::QueryExecution(sqlx_sqlite_wrapper::Error::TableNotFound(table.into()))
         })
      }

      async fn primary_key_of(&self, _table: &str) -> Result<Option<String>> {
         Ok(self.primary_key.clone())
      }
   }

   // ─── execute_query ───

   #[tokio::test]
   async fn execute_query_counts_distinct_and_appends_limit() {
      let engine = SearchEngine::new(Recording::new(25, 10));

      let result = engine
         .execute_query("posts", "p", "SELECT p.* FROM posts p WHERE p.category = $1;", 2, 10)
         .values(vec![json!("tech")])
         .await
         .unwrap();

      let seen = engine.executor().seen();
      assert_eq!(
         seen[0].0,
         r#"SELECT COUNT(DISTINCT "p"."id") AS total FROM posts p WHERE p.category = $1"#
      );
      assert_eq!(seen[0].1, vec![json!("tech")]);
      assert_eq!(seen[1].0, r#"SELECT COUNT("id") AS total FROM "posts""#);
      assert_eq!(
         seen[2].0,
         "SELECT p.* FROM posts p WHERE p.category = $1 LIMIT 10 OFFSET 10"
      );

      assert_eq!(result.pages.prev, Some(1));
      assert_eq!(result.pages.next, Some(3));
      assert_eq!(result.pages.last, Some(3));
      assert_eq!((result.records.from, result.records.to), (11, 20));
      assert_eq!(result.total_records, 25);
      assert_eq!(result.total_display_records(), 25);
   }

   #[tokio::test]
   async fn execute_query_uses_distinct_override() {
      let engine = SearchEngine::new(Recording::new(3, 3));

      engine
         .execute_query("actions", "a", "SELECT a.* FROM actions a GROUP BY a.kind", 1, 10)
         .await
         .unwrap();

      assert_eq!(
         engine.executor().seen()[0].0,
         r#"SELECT COUNT(DISTINCT "a"."id_user") AS total FROM actions a"#
      );
   }

   #[tokio::test]
   async fn execute_query_page_past_end() {
      let engine = SearchEngine::new(Recording::new(25, 0));

      let err = engine
         .execute_query("posts", "posts", "SELECT * FROM posts", 4, 10)
         .await
         .unwrap_err();

      assert!(matches!(err, Error::PageOutOfRange { page: 4, last: 3 }));
      // Counts ran, the fetch did not
      assert!(engine.executor().seen().iter().all(|(sql, _)| sql.contains("AS total")));
   }

   #[tokio::test]
   async fn execute_query_guards_run_before_io() {
      let engine = SearchEngine::new(Recording::new(25, 0));

      let err = engine
         .execute_query("posts", "posts", "SELECT * FROM posts", 1, 0)
         .await
         .unwrap_err();
      assert!(matches!(err, Error::InvalidPageSize));

      let err = engine
         .execute_query("posts", "posts", "SELECT * FROM posts LIMIT 5", 1, 10)
         .await
         .unwrap_err();
      assert!(matches!(err, Error::InvalidBaseQuery(_)));

      let err = engine
         .execute_query("posts", "p; DROP TABLE posts", "SELECT * FROM posts", 1, 10)
         .await
         .unwrap_err();
      assert!(matches!(err, Error::InvalidColumnName { .. }));

      assert!(engine.executor().seen().is_empty());
   }

   #[tokio::test]
   async fn missing_total_is_an_error() {
      struct Silent;

      impl QueryExecutor for Silent {
         async fn query(&self, _sql: &str, _values: &[JsonValue]) -> Result<Vec<JsonRow>> {
            Ok(Vec::new())
         }
         async fn columns_of(&self, _table: &str) -> Result<Vec<String>> {
            Ok(vec!["id".into()])
         }
         async fn primary_key_of(&self, _table: &str) -> Result<Option<String>> {
            Ok(None)
         }
      }

      let err = SearchEngine::new(Silent)
         .execute_query("posts", "posts", "SELECT * FROM posts", 1, 10)
         .await
         .unwrap_err();
      assert_eq!(err.error_code(), "MISSING_COUNT");
   }

   // ─── raw_search ───

   #[tokio::test]
   async fn raw_search_without_params_only_adds_limit() {
      let engine = SearchEngine::new(Recording::new(4, 4));
      let params = SearchParams::new()
         .with("displayStart", "0")
         .with("displayLength", "10");

      engine
         .raw_search("SELECT * FROM posts", "posts", &params)
         .await
         .unwrap();

      let seen = engine.executor().seen();
      assert_eq!(seen[0].0, "SELECT COUNT(*) AS total FROM posts");
      assert_eq!(seen[2].0, "SELECT * FROM posts LIMIT 0, 10");
   }

   #[tokio::test]
   async fn raw_search_binds_after_caller_values() {
      let engine = SearchEngine::new(Recording::new(2, 2));
      let params = SearchParams::new()
         .with("f_category", "tech")
         .with("q_title", "rust")
         .with("o_title", "desc");

      engine
         .raw_search("SELECT * FROM posts WHERE id > $1", "posts", &params)
         .values(vec![json!(0)])
         .await
         .unwrap();

      let seen = engine.executor().seen();
      let filter = r#"(("posts"."category" = $2) AND ("title" LIKE $3))"#;

      assert_eq!(
         seen[0].0,
         format!("SELECT COUNT(*) AS total FROM posts WHERE {} AND (id > $1)", filter)
      );
      assert_eq!(seen[0].1, vec![json!(0), json!("tech"), json!("%rust%")]);
      assert_eq!(
         seen[2].0,
         format!(r#"SELECT * FROM posts WHERE {} AND (id > $1) ORDER BY "title" DESC"#, filter)
      );
   }

   #[tokio::test]
   async fn raw_search_total_filtered_counts_caller_query() {
      let engine = SearchEngine::new(Recording::new(7, 0));
      let params = SearchParams::new()
         .with("total_filtered", "1")
         .with("f_category", "tech");

      engine
         .raw_search("SELECT * FROM posts WHERE id > $1", "posts", &params)
         .values(vec![json!(3)])
         .await
         .unwrap();

      let seen = engine.executor().seen();
      assert_eq!(seen[1].0, "SELECT COUNT(*) AS total FROM posts WHERE id > $1");
      assert_eq!(seen[1].1, vec![json!(3)]);
   }

   #[tokio::test]
   async fn raw_search_explicit_window_wins() {
      let engine = SearchEngine::new(Recording::new(50, 5));
      let params = SearchParams::new()
         .with("displayStart", "0")
         .with("displayLength", "100");

      let result = engine
         .raw_search("SELECT * FROM posts", "posts", &params)
         .window(5, 10)
         .await
         .unwrap();

      assert!(engine.executor().seen()[2].0.ends_with("LIMIT 10, 5"));
      assert_eq!(result.pages.current, Some(3));
      assert_eq!((result.records.from, result.records.to), (11, 15));
      // Caller's parameters are untouched
      assert_eq!(params.get("displayLength"), Some("100"));
   }

   #[tokio::test]
   async fn raw_search_loads_referenced_and_joined_tables() {
      let engine = SearchEngine::new(Recording::new(1, 1));
      let params = SearchParams::new()
         .with("o_users.name", "asc")
         .with("fe_name", "ada");

      engine
         .raw_search(
            "SELECT posts.* FROM posts JOIN users ON users.id = posts.id",
            "posts",
            &params,
         )
         .join_table("users")
         .await
         .unwrap();

      let fetched = &engine.executor().seen()[2].0;
      assert!(fetched.contains(r#"WHERE (("name" = $1))"#));
      assert!(fetched.ends_with(r#"ORDER BY "users"."name" ASC"#));
   }

   #[tokio::test]
   async fn raw_search_unknown_dotted_table() {
      let engine = SearchEngine::new(Recording::new(1, 1));
      let params = SearchParams::new().with("q_ghosts.name", "x");

      let err = engine
         .raw_search("SELECT * FROM posts", "posts", &params)
         .await
         .unwrap_err();
      assert_eq!(err.error_code(), "TABLE_NOT_FOUND");
   }

   #[tokio::test]
   async fn raw_search_result_serializes_camel_case() {
      let engine = SearchEngine::new(Recording::new(1, 1));

      let result = engine
         .raw_search("SELECT * FROM posts", "posts", &SearchParams::new())
         .await
         .unwrap();
      let json = serde_json::to_value(&result).unwrap();

      assert_eq!(json["totalFilteredRecords"], 1);
      assert_eq!(json["pages"]["self"], 1);
      assert_eq!(json["records"]["perPage"], 1);
   }
}
