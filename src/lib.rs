//! # sqlx-sqlite-datatable
//!
//! Turns the flat, string-valued parameters a grid UI sends (filters, sort
//! columns, free-text search, page window) into a `WHERE`/`ORDER BY`/`LIMIT`
//! augmentation of a caller-supplied `SELECT`, runs it, and returns the page
//! of rows together with page and record bookkeeping.
//!
//! ## Core Types
//!
//! - **[`SearchEngine`]**: stateless entry point with `execute_query` and
//!   `raw_search`
//! - **[`SearchParams`]**: the request parameter map
//! - **[`SearchResult`]**: rows plus [`PageState`], [`RecordState`] and totals
//! - **[`SearchConfig`]**: distinct-count column, LIMIT syntax, page size cap
//! - **[`QueryExecutor`]**: data-access seam, implemented for
//!   [`sqlx_sqlite_wrapper::DatabaseWrapper`]
//! - **[`Error`]**: error type for all of the above
//!
//! ## Safety
//!
//! Values are always bound as placeholders. Identifiers taken from
//! parameter names are checked against the table's introspected columns
//! before they are quoted into SQL; unknown ones fail with
//! [`Error::MalformedColumnReference`].
//!
//! ## Example
//!
//! ```no_run
//! use sqlx_sqlite_datatable::{SearchEngine, SearchParams};
//! use sqlx_sqlite_wrapper::DatabaseWrapper;
//!
//! # async fn run() -> sqlx_sqlite_datatable::Result<()> {
//! let db = DatabaseWrapper::connect("app.db", None).await?;
//! let engine = SearchEngine::new(db);
//!
//! let params = SearchParams::new()
//!    .with("f_category", "tech")
//!    .with("q_title", "rust")
//!    .with("o_score", "desc")
//!    .with("page", "1")
//!    .with("ipp", "20");
//!
//! let result = engine
//!    .raw_search("SELECT id, title, score FROM posts", "posts", &params)
//!    .await?;
//!
//! println!(
//!    "{} of {} rows, page {:?} of {:?}",
//!    result.records.amount, result.total_filtered_records, result.pages.current, result.pages.last
//! );
//! # Ok(())
//! # }
//! ```

mod clause;
mod config;
mod engine;
mod error;
mod executor;
mod pagination;
mod params;
mod predicate;
mod sql;

pub use config::{LimitSyntax, SearchConfig};
pub use engine::{ExecuteQueryBuilder, RawSearchBuilder, SearchEngine, SearchResult};
pub use error::{Error, Result};
pub use executor::QueryExecutor;
pub use pagination::{PageState, RecordState};
pub use params::{Comparison, ParamKey, SearchParams};
pub use predicate::SortDirection;
