//! Predicate Compiler: request parameters to WHERE and ORDER BY fragments.
//!
//! Compilation is pure. The engine introspects every table a request can
//! reference up front and passes the Column Sets in as a [`Schema`], so
//! every identifier is checked against a known column before it reaches
//! SQL. Values never reach SQL text; they are bound as numbered
//! placeholders.

use std::str::FromStr;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::params::{ParamKey, SearchParams, is_truthy};
use crate::sql::{quote_column, validate_identifier};
use crate::{Error, Result};

/// Direction of one ORDER BY term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
   Asc,
   Desc,
}

impl SortDirection {
   pub fn as_sql(self) -> &'static str {
      match self {
         SortDirection::Asc => "ASC",
         SortDirection::Desc => "DESC",
      }
   }
}

impl FromStr for SortDirection {
   type Err = Error;

   /// Accepts `asc`/`desc` in any case, ignoring surrounding whitespace.
   fn from_str(value: &str) -> Result<Self> {
      match value.trim().to_ascii_uppercase().as_str() {
         "ASC" => Ok(SortDirection::Asc),
         "DESC" => Ok(SortDirection::Desc),
         _ => Err(Error::InvalidSortDirection {
            value: value.to_string(),
         }),
      }
   }
}

/// Column Sets visible to one compilation.
#[derive(Debug, Clone)]
pub(crate) struct Schema {
   table: String,
   joined: Vec<String>,
   columns: IndexMap<String, Vec<String>>,
}

impl Schema {
   pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
      let table = table.into();
      let mut all = IndexMap::new();
      all.insert(table.clone(), columns);

      Self {
         table,
         joined: Vec::new(),
         columns: all,
      }
   }

   /// Table whose columns may be named without a qualifier.
   pub fn join(mut self, table: impl Into<String>, columns: Vec<String>) -> Self {
      let table = table.into();
      if !self.joined.contains(&table) {
         self.joined.push(table.clone());
      }
      self.columns.insert(table, columns);
      self
   }

   /// Table reachable only through dotted `table.column` references.
   pub fn reference(mut self, table: impl Into<String>, columns: Vec<String>) -> Self {
      self.columns.entry(table.into()).or_insert(columns);
      self
   }

   pub fn contains_table(&self, table: &str) -> bool {
      self.columns.contains_key(table)
   }

   fn primary_columns(&self) -> &[String] {
      self
         .columns
         .get(&self.table)
         .map(Vec::as_slice)
         .unwrap_or_default()
   }

   fn has_column(&self, table: &str, column: &str) -> bool {
      self
         .columns
         .get(table)
         .is_some_and(|columns| columns.iter().any(|c| c == column))
   }
}

/// Output of [`compile`]: fragments plus the values their placeholders
/// refer to, in placeholder order.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct CompiledPredicates {
   pub and_group: Vec<String>,
   pub or_group: Vec<String>,
   pub order: Vec<String>,
   pub binds: Vec<JsonValue>,
}

impl CompiledPredicates {
   pub fn is_empty(&self) -> bool {
      self.and_group.is_empty() && self.or_group.is_empty() && self.order.is_empty()
   }
}

/// Tables named by the table part of active dotted keys (`o_users.name`),
/// in first-seen order.
pub(crate) fn referenced_tables(params: &SearchParams) -> Result<Vec<String>> {
   let mut tables: Vec<String> = Vec::new();

   for (key, value) in params.iter() {
      if !value.is_some_and(is_truthy) {
         continue;
      }
      let Some(parsed) = ParamKey::parse(key) else {
         continue;
      };
      if matches!(parsed, ParamKey::Filter { .. }) {
         continue;
      }
      if let Some((table, _)) = parsed.field().split_once('.') {
         validate_identifier(parsed.field())?;
         if !tables.iter().any(|t| t == table) {
            tables.push(table.to_string());
         }
      }
   }

   Ok(tables)
}

struct Compiler<'a> {
   schema: &'a Schema,
   first_placeholder: usize,
   out: CompiledPredicates,
}

/// Compile `params` against `schema`.
///
/// Placeholders start at `$<bind_offset + 1>` so they follow the caller's
/// own bind values.
pub(crate) fn compile(
   schema: &Schema,
   params: &SearchParams,
   bind_offset: usize,
) -> Result<CompiledPredicates> {
   let mut compiler = Compiler {
      schema,
      first_placeholder: bind_offset + 1,
      out: CompiledPredicates::default(),
   };

   compiler.column_search(params);
   compiler.filters(params)?;
   compiler.default_order(params)?;
   compiler.custom_order(params)?;
   compiler.free_text(params)?;

   Ok(compiler.out)
}

impl Compiler<'_> {
   fn bind(&mut self, value: impl Into<String>) -> String {
      let placeholder = format!("${}", self.first_placeholder + self.out.binds.len());
      self.out.binds.push(JsonValue::String(value.into()));
      placeholder
   }

   /// Primary-table column, always qualified. Dotted names are refused.
   fn qualified(&self, field: &str) -> Result<String> {
      validate_identifier(field)?;
      if field.contains('.') || !self.schema.has_column(&self.schema.table, field) {
         return Err(malformed(field));
      }
      Ok(quote_column(Some(&self.schema.table), field))
   }

   /// `table.column` against that table's columns, or a bare column of the
   /// primary or a joined table, emitted unqualified.
   fn flexible(&self, field: &str) -> Result<String> {
      validate_identifier(field)?;

      match field.split_once('.') {
         Some((table, column)) => {
            if column.contains('.') || !self.schema.has_column(table, column) {
               return Err(malformed(field));
            }
            Ok(quote_column(Some(table), column))
         }
         None => {
            let known = std::iter::once(&self.schema.table)
               .chain(&self.schema.joined)
               .any(|table| self.schema.has_column(table, field));
            if !known {
               return Err(malformed(field));
            }
            Ok(quote_column(None, field))
         }
      }
   }

   /// Column at `index` in the primary Column Set.
   fn positional(&self, index: i64) -> Result<String> {
      let column = usize::try_from(index)
         .ok()
         .and_then(|i| self.schema.primary_columns().get(i))
         .ok_or_else(|| malformed(&index.to_string()))?;
      Ok(quote_column(Some(&self.schema.table), column))
   }

   fn every_column_like(&mut self, placeholder: &str) {
      let schema = self.schema;
      let table = &schema.table;
      let terms = schema
         .primary_columns()
         .iter()
         .map(|column| format!("{} LIKE {}", quote_column(Some(table), column), placeholder));
      self.out.or_group.extend(terms);
   }

   // ─── AND group ───

   fn column_search(&mut self, params: &SearchParams) {
      let columns = self.schema.primary_columns().to_vec();

      for (i, column) in columns.iter().enumerate() {
         if !params.datatable_flag(&format!("searchable_{}", i)) {
            continue;
         }
         let Some(value) = params
            .datatable(&format!("search_{}", i))
            .filter(|v| is_truthy(v))
         else {
            continue;
         };

         let placeholder = self.bind(format!("%{}%", value));
         let column = quote_column(Some(&self.schema.table), column);
         self.out.and_group.push(format!("{} LIKE {}", column, placeholder));
      }
   }

   fn filters(&mut self, params: &SearchParams) -> Result<()> {
      for (key, value) in params.iter() {
         let Some(value) = value.filter(|v| is_truthy(v)) else {
            continue;
         };

         let predicate = match ParamKey::parse(key) {
            Some(ParamKey::Filter { op, field }) => {
               let column = self.qualified(field)?;
               format!("{} {} {}", column, op.operator(), self.bind(value))
            }
            Some(ParamKey::UnqualifiedEq { field }) => {
               let column = self.flexible(field)?;
               format!("{} = {}", column, self.bind(value))
            }
            _ => continue,
         };
         self.out.and_group.push(predicate);
      }
      Ok(())
   }

   // ─── ORDER BY ───

   /// Positional datatable sorting: `sortCol_i` names a column index,
   /// honored when `sortable_<index>` is `"true"`.
   fn default_order(&mut self, params: &SearchParams) -> Result<()> {
      if params.datatable("sortCol_0").is_none() {
         return Ok(());
      }

      // Each column sorts at most once, which bounds the loop
      let sorting = params.datatable_number("sortingCols")?.unwrap_or(0).max(0);
      let sorting = sorting.min(self.schema.primary_columns().len() as i64);

      for i in 0..sorting {
         let Some(index) = params.datatable_number(&format!("sortCol_{}", i))? else {
            continue;
         };
         if !params.datatable_flag(&format!("sortable_{}", index)) {
            continue;
         }

         let column = self.positional(index)?;
         let direction = match params.datatable(&format!("sortDir_{}", i)) {
            Some(dir) if !dir.trim().is_empty() => dir.parse()?,
            _ => SortDirection::Asc,
         };
         self.out.order.push(format!("{} {}", column, direction.as_sql()));
      }
      Ok(())
   }

   fn custom_order(&mut self, params: &SearchParams) -> Result<()> {
      for (key, value) in params.iter() {
         let Some(value) = value.filter(|v| is_truthy(v)) else {
            continue;
         };
         let Some(ParamKey::Order { field }) = ParamKey::parse(key) else {
            continue;
         };

         let column = self.flexible(field)?;
         let direction: SortDirection = value.parse()?;
         self.out.order.push(format!("{} {}", column, direction.as_sql()));
      }
      Ok(())
   }

   // ─── OR group ───

   /// `search` and `q` cover every column; `q_`/`qb_`/`qe_` one column each.
   /// All of them add to the same OR group.
   fn free_text(&mut self, params: &SearchParams) -> Result<()> {
      if let Some(search) = params.datatable("search").filter(|v| is_truthy(v)) {
         let placeholder = self.bind(format!("%{}%", search));
         self.every_column_like(&placeholder);
      }

      if let Some(q) = params.truthy("q") {
         let placeholder = self.bind(format!("{}%", q));
         self.every_column_like(&placeholder);
      }

      for (key, value) in params.iter() {
         let Some(value) = value.filter(|v| is_truthy(v)) else {
            continue;
         };

         let (field, pattern) = match ParamKey::parse(key) {
            Some(ParamKey::Contains { field }) => (field, format!("%{}%", value)),
            Some(ParamKey::BeginsWith { field }) => (field, format!("{}%", value)),
            Some(ParamKey::EndsWith { field }) => (field, format!("%{}", value)),
            _ => continue,
         };

         let column = self.flexible(field)?;
         let placeholder = self.bind(pattern);
         self.out.or_group.push(format!("{} LIKE {}", column, placeholder));
      }
      Ok(())
   }
}

fn malformed(field: &str) -> Error {
   Error::MalformedColumnReference {
      field: field.to_string(),
   }
}
