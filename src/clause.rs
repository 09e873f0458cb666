//! Clause Assembler: combines compiled predicate groups into one boolean
//! expression and splices it, plus ordering, into the base statement.

use crate::Result;
use crate::predicate::CompiledPredicates;
use crate::sql::{prepend_order_by, splice_where};

/// Base statement with the compiled predicates applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Assembled {
   /// Filtered, unordered. Counts are derived from this.
   pub filtered: String,
   /// Filtered and ordered. Rows are fetched from this.
   pub ordered: String,
}

/// `((and AND ...) AND (or OR ...))`, with absent groups left out.
pub(crate) fn boolean_expression(compiled: &CompiledPredicates) -> Option<String> {
   let mut groups = Vec::with_capacity(2);

   if !compiled.and_group.is_empty() {
      groups.push(format!("({})", compiled.and_group.join(" AND ")));
   }
   if !compiled.or_group.is_empty() {
      groups.push(format!("({})", compiled.or_group.join(" OR ")));
   }

   if groups.is_empty() {
      None
   } else {
      Some(format!("({})", groups.join(" AND ")))
   }
}

pub(crate) fn assemble(base: &str, compiled: &CompiledPredicates) -> Result<Assembled> {
   if compiled.is_empty() {
      return Ok(Assembled {
         filtered: base.to_string(),
         ordered: base.to_string(),
      });
   }

   let filtered = match boolean_expression(compiled) {
      Some(expression) => splice_where(base, &expression)?,
      None => base.to_string(),
   };
   let ordered = prepend_order_by(&filtered, &compiled.order);

   Ok(Assembled { filtered, ordered })
}
