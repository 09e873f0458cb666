//! Table introspection through `PRAGMA table_info`.

use serde::Serialize;
use sqlx::{Pool, Row, Sqlite};

use crate::error::{Error, Result};

/// Column layout of one table, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
   /// Every column name, in `cid` order
   pub columns: Vec<String>,
   /// Primary key columns, ordered by their position inside the key
   pub primary_key: Vec<String>,
}

impl TableInfo {
   /// First column of the primary key, if the table declares one
   pub fn primary_key_column(&self) -> Option<&str> {
      self.primary_key.first().map(String::as_str)
   }
}

pub(crate) async fn query_table_info(pool: &Pool<Sqlite>, table: &str) -> Result<TableInfo> {
   // PRAGMA table_info returns: cid, name, type, notnull, dflt_value, pk
   // pk is 0 for non-key columns, otherwise the 1-based position in the key
   let pragma = format!("PRAGMA table_info({})", quote_identifier(table));
   let rows = sqlx::query(&pragma).fetch_all(pool).await?;

   if rows.is_empty() {
      return Err(Error::TableNotFound(table.to_string()));
   }

   let mut columns = Vec::with_capacity(rows.len());
   let mut keyed: Vec<(i64, String)> = Vec::new();

   for row in &rows {
      let name: String = row.try_get("name")?;
      let pk: i64 = row.try_get("pk")?;
      if pk > 0 {
         keyed.push((pk, name.clone()));
      }
      columns.push(name);
   }

   keyed.sort_by_key(|(position, _)| *position);

   Ok(TableInfo {
      columns,
      primary_key: keyed.into_iter().map(|(_, name)| name).collect(),
   })
}

fn quote_identifier(name: &str) -> String {
   format!("\"{}\"", name.replace('"', "\"\""))
}
