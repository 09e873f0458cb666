//! Clause-level surgery on caller-supplied SELECT statements.
//!
//! The engine never parses SQL. It locates the top-level clause keywords
//! (`SELECT`, `FROM`, `WHERE`, `GROUP BY`, `HAVING`, `ORDER BY`, `LIMIT`) with
//! a byte scanner that steps over string literals, quoted identifiers,
//! comments and parenthesized subexpressions, then splices text at those
//! positions.
//!
//! Positions are byte offsets into the original statement. The scanner
//! uppercases with [`str::to_ascii_uppercase`], which never changes byte
//! length, so offsets found in the uppercased copy slice the original.

use crate::{Error, Result};

/// Byte range of a keyword occurrence: `start` is its first byte, `end` is
/// one past its last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
   pub start: usize,
   pub end: usize,
}

/// First top-level occurrence of each clause keyword.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Clauses {
   pub select: Option<Span>,
   pub from: Option<Span>,
   pub where_: Option<Span>,
   pub group_by: Option<Span>,
   pub having: Option<Span>,
   pub order_by: Option<Span>,
   pub limit: Option<Span>,
}

const SELECT: &[&[u8]] = &[b"SELECT"];
const FROM: &[&[u8]] = &[b"FROM"];
const WHERE: &[&[u8]] = &[b"WHERE"];
const GROUP_BY: &[&[u8]] = &[b"GROUP", b"BY"];
const HAVING: &[&[u8]] = &[b"HAVING"];
const ORDER_BY: &[&[u8]] = &[b"ORDER", b"BY"];
const LIMIT: &[&[u8]] = &[b"LIMIT"];

impl Clauses {
   pub fn locate(query: &str) -> Self {
      let mut clauses = Clauses::default();

      scan_top_level::<()>(query, |bytes, i| {
         let slots: [(&mut Option<Span>, &[&[u8]]); 7] = [
            (&mut clauses.select, SELECT),
            (&mut clauses.from, FROM),
            (&mut clauses.where_, WHERE),
            (&mut clauses.group_by, GROUP_BY),
            (&mut clauses.having, HAVING),
            (&mut clauses.order_by, ORDER_BY),
            (&mut clauses.limit, LIMIT),
         ];

         for (slot, words) in slots {
            if slot.is_none()
               && let Some(end) = keyword_at(bytes, i, words)
            {
               *slot = Some(Span { start: i, end });
               break;
            }
         }
         None
      });

      clauses
   }

   /// Start of the earliest `GROUP BY`, `HAVING`, `ORDER BY` or `LIMIT` at
   /// or after `from`.
   pub fn tail_start(&self, from: usize) -> Option<usize> {
      [self.group_by, self.having, self.order_by, self.limit]
         .into_iter()
         .flatten()
         .map(|span| span.start)
         .filter(|start| *start >= from)
         .min()
   }

   /// Byte range of the select list, between `SELECT` and `FROM`.
   fn select_list(&self) -> Result<(usize, usize)> {
      match (self.select, self.from) {
         (Some(select), Some(from)) if select.end <= from.start => Ok((select.end, from.start)),
         _ => Err(Error::InvalidBaseQuery(
            "expected a top-level SELECT ... FROM statement".to_string(),
         )),
      }
   }
}

fn is_ident_byte(byte: u8) -> bool {
   byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Match `words` as a standalone keyword starting at `i` in the uppercased
/// bytes, allowing any run of whitespace between words. Returns the end
/// offset on a match.
fn keyword_at(bytes: &[u8], i: usize, words: &[&[u8]]) -> Option<usize> {
   if i > 0 && is_ident_byte(bytes[i - 1]) {
      return None;
   }

   let mut pos = i;
   for (n, word) in words.iter().enumerate() {
      if n > 0 {
         let gap = pos;
         while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
         }
         if pos == gap {
            return None;
         }
      }
      if !bytes[pos..].starts_with(word) {
         return None;
      }
      pos += word.len();
   }

   if pos < bytes.len() && is_ident_byte(bytes[pos]) {
      return None;
   }
   Some(pos)
}

/// Index of the byte closing a quoted section opened at `i`. Doubled
/// closers are escapes (`''`, `""`, ``` `` ```).
fn skip_quoted(bytes: &[u8], i: usize, close: u8) -> usize {
   let mut j = i + 1;
   while j < bytes.len() {
      if bytes[j] == close {
         if close != b']' && j + 1 < bytes.len() && bytes[j + 1] == close {
            j += 2;
            continue;
         }
         return j;
      }
      j += 1;
   }
   j
}

fn skip_line_comment(bytes: &[u8], i: usize) -> usize {
   let mut j = i + 2;
   while j < bytes.len() && bytes[j] != b'\n' {
      j += 1;
   }
   j
}

fn skip_block_comment(bytes: &[u8], i: usize) -> usize {
   let mut j = i + 2;
   while j + 1 < bytes.len() {
      if bytes[j] == b'*' && bytes[j + 1] == b'/' {
         return j + 1;
      }
      j += 1;
   }
   bytes.len().saturating_sub(1)
}

/// Call `on_position` at every byte that sits at paren depth 0 outside of
/// quotes and comments, until it returns `Some`.
fn scan_top_level<T>(query: &str, mut on_position: impl FnMut(&[u8], usize) -> Option<T>) -> Option<T> {
   let upper = query.to_ascii_uppercase();
   let bytes = upper.as_bytes();
   let len = bytes.len();
   let mut depth: i32 = 0;
   let mut i = 0;

   while i < len {
      match bytes[i] {
         b'(' => depth += 1,
         b')' => depth -= 1,
         b'\'' => i = skip_quoted(bytes, i, b'\''),
         b'"' => i = skip_quoted(bytes, i, b'"'),
         b'`' => i = skip_quoted(bytes, i, b'`'),
         b'[' => i = skip_quoted(bytes, i, b']'),
         b'-' if i + 1 < len && bytes[i + 1] == b'-' => i = skip_line_comment(bytes, i),
         b'/' if i + 1 < len && bytes[i + 1] == b'*' => i = skip_block_comment(bytes, i),
         _ if depth == 0 => {
            if let Some(found) = on_position(bytes, i) {
               return Some(found);
            }
         }
         _ => {}
      }
      i += 1;
   }

   None
}

// ─── identifiers ───

/// Check that `name` is safe to interpolate: every dotted segment matches
/// `[a-zA-Z_][a-zA-Z0-9_]*`.
pub(crate) fn validate_identifier(name: &str) -> Result<()> {
   let valid = !name.is_empty()
      && name.split('.').all(|segment| {
         let mut chars = segment.chars();
         chars
            .next()
            .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
            && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
      });

   if !valid {
      return Err(Error::InvalidColumnName {
         name: name.to_string(),
      });
   }
   Ok(())
}

/// Double-quote an identifier, doubling embedded quotes.
pub(crate) fn quote_identifier(name: &str) -> String {
   format!("\"{}\"", name.replace('"', "\"\""))
}

/// `"table"."column"`, or `"column"` without a table.
pub(crate) fn quote_column(table: Option<&str>, column: &str) -> String {
   match table {
      Some(table) => format!("{}.{}", quote_identifier(table), quote_identifier(column)),
      None => quote_identifier(column),
   }
}

// ─── statement surgery ───

/// Strip trailing whitespace and semicolons.
pub(crate) fn normalize(query: &str) -> &str {
   query.trim().trim_end_matches(';').trim_end()
}

/// Reject statements the engine cannot extend: anything without a
/// top-level `SELECT ... FROM`, and anything carrying its own top-level
/// `LIMIT` (the engine appends the page window itself).
pub(crate) fn validate_base_query(query: &str) -> Result<()> {
   let clauses = Clauses::locate(query);
   clauses.select_list()?;

   if clauses.limit.is_some() {
      return Err(Error::InvalidBaseQuery(
         "top-level LIMIT is not allowed; the page window is appended automatically".to_string(),
      ));
   }
   Ok(())
}

fn join_tail(head: &str, tail: &str) -> String {
   if tail.is_empty() {
      head.to_string()
   } else {
      format!("{} {}", head, tail)
   }
}

/// Add `condition` to the statement's top-level WHERE.
///
/// An existing `WHERE cond` becomes `WHERE condition AND (cond)`. Without
/// one, `WHERE condition` goes in front of the first `GROUP BY`, `HAVING`,
/// `ORDER BY` or `LIMIT`, or at the end.
pub(crate) fn splice_where(query: &str, condition: &str) -> Result<String> {
   let clauses = Clauses::locate(query);

   match clauses.where_ {
      Some(span) => {
         let end = clauses.tail_start(span.end).unwrap_or(query.len());
         let existing = query[span.end..end].trim();
         if existing.is_empty() {
            return Err(Error::InvalidBaseQuery("WHERE without a condition".to_string()));
         }

         let head = format!(
            "{}WHERE {} AND ({})",
            &query[..span.start],
            condition,
            existing
         );
         Ok(join_tail(&head, query[end..].trim()))
      }
      None => {
         let at = clauses.tail_start(0).unwrap_or(query.len());
         let head = format!("{} WHERE {}", query[..at].trim_end(), condition);
         Ok(join_tail(&head, query[at..].trim()))
      }
   }
}

/// Put `terms` in front of the statement's ordering. A caller's own
/// top-level `ORDER BY` is kept as the tie-breaker.
pub(crate) fn prepend_order_by(query: &str, terms: &[String]) -> String {
   if terms.is_empty() {
      return query.to_string();
   }

   let ours = terms.join(", ");
   let clauses = Clauses::locate(query);

   match clauses.order_by {
      Some(span) => {
         let end = clauses.limit.map_or(query.len(), |limit| limit.start);
         let theirs = query[span.end..end].trim();
         let head = format!("{}ORDER BY {}, {}", &query[..span.start], ours, theirs);
         join_tail(&head, query[end..].trim())
      }
      None => format!("{} ORDER BY {}", query, ours),
   }
}

/// Replace the select list with `COUNT(<target>) AS total` and drop
/// everything from the first top-level `GROUP BY`/`HAVING`/`ORDER BY`/`LIMIT`.
pub(crate) fn count_query(query: &str, target: &str) -> Result<String> {
   let clauses = Clauses::locate(query);
   let (list_start, list_end) = clauses.select_list()?;
   let end = clauses.tail_start(list_end).unwrap_or(query.len());

   Ok(format!(
      "{} COUNT({}) AS total {}",
      query[..list_start].trim_end(),
      target,
      query[list_end..end].trim()
   ))
}

/// Count rows the statement would return, honoring its grouping.
///
/// Without `GROUP BY` the select list is replaced by `COUNT(*)`. A grouped
/// statement is wrapped as a subquery so `HAVING`, NULL groups and
/// select-list aliases count the same way they return rows.
pub(crate) fn grouped_count_query(query: &str) -> Result<String> {
   let clauses = Clauses::locate(query);
   clauses.select_list()?;

   let Some(group_by) = clauses.group_by else {
      return count_query(query, "*");
   };

   let end = clauses.tail_start(group_by.end).unwrap_or(query.len());
   if query[group_by.end..end].trim().is_empty() {
      return Err(Error::InvalidBaseQuery("GROUP BY without expressions".to_string()));
   }

   let grouped_end = [clauses.order_by, clauses.limit]
      .into_iter()
      .flatten()
      .map(|span| span.start)
      .min()
      .unwrap_or(query.len());

   Ok(format!(
      "SELECT COUNT(*) AS total FROM ({}) AS grouped",
      query[..grouped_end].trim_end()
   ))
}
