//! Engine configuration

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// How a page window is written into SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LimitSyntax {
   /// `LIMIT <count> OFFSET <offset>`
   LimitOffset,
   /// `LIMIT <offset>, <count>` (MySQL two-argument form, also accepted by SQLite)
   OffsetComma,
}

impl LimitSyntax {
   pub(crate) fn render(self, count: u64, offset: u64) -> String {
      match self {
         LimitSyntax::LimitOffset => format!("LIMIT {} OFFSET {}", count, offset),
         LimitSyntax::OffsetComma => format!("LIMIT {}, {}", offset, count),
      }
   }
}

/// Settings shared by every call on a [`SearchEngine`](crate::SearchEngine).
///
/// # Examples
///
/// ```
/// use sqlx_sqlite_datatable::{LimitSyntax, SearchConfig};
///
/// let config = SearchConfig {
///     search_limit_syntax: LimitSyntax::LimitOffset,
///     max_page_size: Some(500),
///     ..Default::default()
/// };
/// assert_eq!(config.distinct_column_for("actions"), "id_user");
/// assert_eq!(config.distinct_column_for("posts"), "id");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
   /// Column counted with `COUNT(DISTINCT alias.<column>)` by
   /// `execute_query`
   ///
   /// Default: `id`
   pub distinct_column: String,

   /// Per-table replacements for `distinct_column`
   ///
   /// Default: `actions` counts `id_user`
   pub distinct_overrides: IndexMap<String, String>,

   /// LIMIT form appended by `execute_query`
   ///
   /// Default: [`LimitSyntax::LimitOffset`]
   pub query_limit_syntax: LimitSyntax,

   /// LIMIT form appended by `raw_search`
   ///
   /// Default: [`LimitSyntax::OffsetComma`]
   pub search_limit_syntax: LimitSyntax,

   /// Largest page size a caller may request, if any
   ///
   /// Default: unbounded
   pub max_page_size: Option<u64>,
}

impl SearchConfig {
   /// Column used for the distinct count of `table`.
   pub fn distinct_column_for(&self, table: &str) -> &str {
      self
         .distinct_overrides
         .get(table)
         .map_or(self.distinct_column.as_str(), String::as_str)
   }

   pub(crate) fn check_page_size(&self, size: u64) -> crate::Result<u64> {
      if size == 0 || self.max_page_size.is_some_and(|max| size > max) {
         return Err(crate::Error::InvalidPageSize);
      }
      Ok(size)
   }
}

impl Default for SearchConfig {
   fn default() -> Self {
      let mut distinct_overrides = IndexMap::new();
      distinct_overrides.insert("actions".to_string(), "id_user".to_string());

      Self {
         distinct_column: "id".to_string(),
         distinct_overrides,
         query_limit_syntax: LimitSyntax::LimitOffset,
         search_limit_syntax: LimitSyntax::OffsetComma,
         max_page_size: None,
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn limit_syntax_renders_both_forms() {
      assert_eq!(LimitSyntax::LimitOffset.render(10, 20), "LIMIT 10 OFFSET 20");
      assert_eq!(LimitSyntax::OffsetComma.render(10, 20), "LIMIT 20, 10");
   }

   #[test]
   fn page_size_guard() {
      let config = SearchConfig {
         max_page_size: Some(100),
         ..Default::default()
      };

      assert_eq!(config.check_page_size(100).unwrap(), 100);
      assert!(config.check_page_size(0).is_err());
      assert!(config.check_page_size(101).is_err());
      assert!(SearchConfig::default().check_page_size(1_000_000).is_ok());
   }

   #[test]
   fn config_deserializes_from_camel_case() {
      let config: SearchConfig = serde_json::from_str(
         r#"{
            "distinctColumn": "uuid",
            "distinctOverrides": {},
            "queryLimitSyntax": "offsetComma",
            "searchLimitSyntax": "limitOffset",
            "maxPageSize": 50
         }"#,
      )
      .unwrap();

      assert_eq!(config.distinct_column_for("actions"), "uuid");
      assert_eq!(config.query_limit_syntax, LimitSyntax::OffsetComma);
      assert_eq!(config.max_page_size, Some(50));
   }
}
