//! Request parameters and the typed keys recognized in them.
//!
//! [`SearchParams`] is the flat, string-valued map a grid UI sends in its
//! query string. Key names select behavior through anchored prefixes that
//! [`ParamKey::parse`] turns into a closed set of variants; everything else
//! in the map is ignored by the compiler.
//!
//! | key              | meaning                                   |
//! |------------------|-------------------------------------------|
//! | `f_<col>`        | `table.col = v`                           |
//! | `f_lte_<col>`    | `table.col <= v`                          |
//! | `f_gte_<col>`    | `table.col >= v`                          |
//! | `f_lt_<col>`     | `table.col < v`                           |
//! | `f_gt_<col>`     | `table.col > v`                           |
//! | `f_not_<col>`    | `table.col <> v`                          |
//! | `fe_<col>`       | `col = v`, no table qualifier             |
//! | `o_<col>`        | `ORDER BY col v`                          |
//! | `q_<col>`        | `col LIKE '%v%'` (OR group)               |
//! | `qb_<col>`       | `col LIKE 'v%'` (OR group)                |
//! | `qe_<col>`       | `col LIKE '%v'` (OR group)                |

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Comparison operator carried by an `f_*` filter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
   Eq,
   Lte,
   Gte,
   Lt,
   Gt,
   NotEq,
}

impl Comparison {
   /// SQL spelling of the operator
   pub fn operator(self) -> &'static str {
      match self {
         Comparison::Eq => "=",
         Comparison::Lte => "<=",
         Comparison::Gte => ">=",
         Comparison::Lt => "<",
         Comparison::Gt => ">",
         Comparison::NotEq => "<>",
      }
   }
}

/// Longest prefixes first so `f_lte_x` never falls through to `f_`.
const FILTER_PREFIXES: &[(&str, Comparison)] = &[
   ("f_lte_", Comparison::Lte),
   ("f_gte_", Comparison::Gte),
   ("f_not_", Comparison::NotEq),
   ("f_lt_", Comparison::Lt),
   ("f_gt_", Comparison::Gt),
   ("f_", Comparison::Eq),
];

/// A parameter name that drives predicate or ordering generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKey<'a> {
   /// `f_*`: comparison against a column of the searched table
   Filter { op: Comparison, field: &'a str },
   /// `fe_*`: equality without a table qualifier
   UnqualifiedEq { field: &'a str },
   /// `o_*`: custom ordering
   Order { field: &'a str },
   /// `q_*`: contains
   Contains { field: &'a str },
   /// `qb_*`: begins with
   BeginsWith { field: &'a str },
   /// `qe_*`: ends with
   EndsWith { field: &'a str },
}

impl<'a> ParamKey<'a> {
   /// Classify `key` by its leading prefix.
   ///
   /// Matching is anchored at the start of the key: `xf_name` is not a
   /// filter. Keys whose field part is empty are not recognized.
   pub fn parse(key: &'a str) -> Option<Self> {
      let parsed = if let Some((op, field)) = FILTER_PREFIXES
         .iter()
         .find_map(|(prefix, op)| key.strip_prefix(*prefix).map(|field| (*op, field)))
      {
         ParamKey::Filter { op, field }
      } else if let Some(field) = key.strip_prefix("fe_") {
         ParamKey::UnqualifiedEq { field }
      } else if let Some(field) = key.strip_prefix("o_") {
         ParamKey::Order { field }
      } else if let Some(field) = key.strip_prefix("qb_") {
         ParamKey::BeginsWith { field }
      } else if let Some(field) = key.strip_prefix("qe_") {
         ParamKey::EndsWith { field }
      } else if let Some(field) = key.strip_prefix("q_") {
         ParamKey::Contains { field }
      } else {
         return None;
      };

      if parsed.field().is_empty() {
         return None;
      }
      Some(parsed)
   }

   /// Column reference named by the key
   pub fn field(&self) -> &'a str {
      match *self {
         ParamKey::Filter { field, .. }
         | ParamKey::UnqualifiedEq { field }
         | ParamKey::Order { field }
         | ParamKey::Contains { field }
         | ParamKey::BeginsWith { field }
         | ParamKey::EndsWith { field } => field,
      }
   }
}

/// DataTables 1.9 spelled its parameters with type prefixes; both
/// spellings are accepted and the plain one wins.
const LEGACY_NAMES: &[(&str, &str)] = &[
   ("searchable_", "bSearchable_"),
   ("search_", "sSearch_"),
   ("sortCol_", "iSortCol_"),
   ("sortable_", "bSortable_"),
   ("sortDir_", "sSortDir_"),
   ("sortingCols", "iSortingCols"),
   ("search", "sSearch"),
   ("displayStart", "iDisplayStart"),
   ("displayLength", "iDisplayLength"),
];

fn legacy_name(name: &str) -> Option<String> {
   LEGACY_NAMES.iter().find_map(|(plain, legacy)| {
      if plain.ends_with('_') {
         name
            .strip_prefix(*plain)
            .map(|rest| format!("{}{}", legacy, rest))
      } else if name == *plain {
         Some(legacy.to_string())
      } else {
         None
      }
   })
}

/// Flat request parameters, in the order they arrived.
///
/// Deserializes transparently from a string map, so a decoded query string
/// can be handed over as-is. Values may be absent (`null`).
///
/// ```
/// use sqlx_sqlite_datatable::SearchParams;
///
/// let params = SearchParams::new()
///    .with("f_category", "tech")
///    .with("o_score", "desc");
///
/// assert_eq!(params.get("f_category"), Some("tech"));
/// assert_eq!(params.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchParams(IndexMap<String, Option<String>>);

impl SearchParams {
   pub fn new() -> Self {
      Self::default()
   }

   /// Builder-style insert
   pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
      self.insert(key, Some(value.into()));
      self
   }

   /// Insert or replace a value; replacing keeps the original position.
   pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
      self.0.insert(key.into(), value);
   }

   /// Remove a key, keeping the order of the remaining ones.
   pub fn remove(&mut self, key: &str) -> Option<String> {
      self.0.shift_remove(key).flatten()
   }

   /// Value of `key`, if present and not null
   pub fn get(&self, key: &str) -> Option<&str> {
      self.0.get(key).and_then(|v| v.as_deref())
   }

   pub fn len(&self) -> usize {
      self.0.len()
   }

   pub fn is_empty(&self) -> bool {
      self.0.is_empty()
   }

   /// Entries in arrival order
   pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
      self.0.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
   }

   /// Value of `key` when it is non-empty and not `"0"`.
   pub(crate) fn truthy(&self, key: &str) -> Option<&str> {
      self.get(key).filter(|v| is_truthy(v))
   }

   /// Datatable parameter, falling back to its legacy spelling.
   pub(crate) fn datatable(&self, name: &str) -> Option<&str> {
      self
         .get(name)
         .or_else(|| legacy_name(name).and_then(|legacy| self.get(&legacy)))
   }

   /// Datatable parameter that must be exactly `"true"`
   pub(crate) fn datatable_flag(&self, name: &str) -> bool {
      self.datatable(name) == Some("true")
   }

   /// Numeric datatable parameter. Absent or empty is `None`.
   pub(crate) fn datatable_number(&self, name: &str) -> Result<Option<i64>> {
      parse_number(name, self.datatable(name))
   }

   /// Numeric plain parameter. Absent or empty is `None`.
   pub(crate) fn number(&self, name: &str) -> Result<Option<i64>> {
      parse_number(name, self.get(name))
   }
}

fn parse_number(name: &str, value: Option<&str>) -> Result<Option<i64>> {
   match value.map(str::trim) {
      None | Some("") => Ok(None),
      Some(raw) => raw
         .parse::<i64>()
         .map(Some)
         .map_err(|_| Error::invalid_parameter(name, raw)),
   }
}

pub(crate) fn is_truthy(value: &str) -> bool {
   !value.is_empty() && value != "0"
}

impl<K, V> FromIterator<(K, V)> for SearchParams
where
   K: Into<String>,
   V: Into<String>,
{
   fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
      Self(
         iter
            .into_iter()
            .map(|(k, v)| (k.into(), Some(v.into())))
            .collect(),
      )
   }
}
