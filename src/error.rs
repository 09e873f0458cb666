/// Result type alias for search operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for filtering, ordering and paginating queries.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Failure reported by the data-access layer (connectivity, SQL syntax,
   /// constraint violations). Never retried here.
   #[error(transparent)]
   QueryExecution(#[from] sqlx_sqlite_wrapper::Error),

   /// Requested page lies beyond the last page of a non-empty result.
   #[error("page {page} is out of range (last page is {last})")]
   PageOutOfRange { page: u64, last: u64 },

   /// A parameter names a column that the table does not have.
   #[error("column reference '{field}' does not match a known column")]
   MalformedColumnReference { field: String },

   /// Identifier contains characters that cannot be interpolated into SQL.
   ///
   /// Each dotted segment must match `[a-zA-Z_][a-zA-Z0-9_]*`.
   #[error("invalid identifier '{name}': must match [a-zA-Z_][a-zA-Z0-9_]*")]
   InvalidColumnName { name: String },

   /// Sort direction other than `asc` or `desc` (any case).
   #[error("invalid sort direction '{value}': expected ASC or DESC")]
   InvalidSortDirection { value: String },

   /// A numeric parameter could not be parsed.
   #[error("parameter '{name}' has invalid value '{value}'")]
   InvalidParameter { name: String, value: String },

   /// Page size is zero or exceeds the configured maximum.
   #[error("page size must be greater than zero and within the configured maximum")]
   InvalidPageSize,

   /// Pages are numbered from 1.
   #[error("page number must be at least 1")]
   InvalidPageNumber,

   /// Base statement cannot be augmented.
   #[error("invalid base query: {0}")]
   InvalidBaseQuery(String),

   /// A count query came back without a numeric `total` column.
   #[error("count query returned no total: {query}")]
   MissingCount { query: String },
}

impl Error {
   /// Extract a structured error code from the error type.
   pub fn error_code(&self) -> String {
      match self {
         Error::QueryExecution(sqlx_sqlite_wrapper::Error::Sqlx(e)) => {
            if let Some(code) = e.as_database_error().and_then(|db_err| db_err.code()) {
               return format!("SQLITE_{}", code);
            }
            "QUERY_EXECUTION_FAILURE".to_string()
         }
         Error::QueryExecution(sqlx_sqlite_wrapper::Error::TableNotFound(_)) => {
            "TABLE_NOT_FOUND".to_string()
         }
         Error::QueryExecution(_) => "QUERY_EXECUTION_FAILURE".to_string(),
         Error::PageOutOfRange { .. } => "PAGE_OUT_OF_RANGE".to_string(),
         Error::MalformedColumnReference { .. } => "MALFORMED_COLUMN_REFERENCE".to_string(),
         Error::InvalidColumnName { .. } => "INVALID_COLUMN_NAME".to_string(),
         Error::InvalidSortDirection { .. } => "INVALID_SORT_DIRECTION".to_string(),
         Error::InvalidParameter { .. } => "INVALID_PARAMETER".to_string(),
         Error::InvalidPageSize => "INVALID_PAGE_SIZE".to_string(),
         Error::InvalidPageNumber => "INVALID_PAGE_NUMBER".to_string(),
         Error::InvalidBaseQuery(_) => "INVALID_BASE_QUERY".to_string(),
         Error::MissingCount { .. } => "MISSING_COUNT".to_string(),
      }
   }

   pub(crate) fn invalid_parameter(name: &str, value: &str) -> Self {
      Error::InvalidParameter {
         name: name.to_string(),
         value: value.to_string(),
      }
   }
}
