//! Mapping of SQLite values onto JSON

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value as JsonValue;
use sqlx::sqlite::SqliteValueRef;
use sqlx::{Decode, Sqlite, TypeInfo, ValueRef};

use crate::error::{Error, Result};

fn decode<'r, T: Decode<'r, Sqlite>>(value: SqliteValueRef<'r>) -> Result<T> {
   T::decode(value).map_err(|e| Error::Sqlx(sqlx::Error::Decode(e)))
}

/// Convert one column value of a fetched row to JSON.
///
/// Dispatch is on the runtime storage class, not the declared column
/// type, so `COUNT(*)` and expression columns decode the same way as
/// table columns. Blobs become standard base64 strings; non-finite reals
/// become `null`.
pub(crate) fn to_json(value: SqliteValueRef<'_>) -> Result<JsonValue> {
   if value.is_null() {
      return Ok(JsonValue::Null);
   }

   let type_name = value.type_info().name().to_string();

   match type_name.as_str() {
      "TEXT" | "DATE" | "TIME" | "DATETIME" => Ok(JsonValue::String(decode::<String>(value)?)),
      "INTEGER" | "BOOLEAN" => Ok(JsonValue::from(decode::<i64>(value)?)),
      "REAL" | "NUMERIC" => {
         let number = decode::<f64>(value)?;
         Ok(serde_json::Number::from_f64(number)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null))
      }
      "BLOB" => Ok(JsonValue::String(STANDARD.encode(decode::<Vec<u8>>(value)?))),
      _ => Err(Error::UnsupportedDatatype(type_name)),
   }
}
