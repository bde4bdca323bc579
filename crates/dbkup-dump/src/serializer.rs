//! Cell value to SQL literal

use dbkup_core::{SqlDialect, Value};
use std::borrow::Cow;

/// Render a cell as a literal for an `INSERT ... VALUES` list.
///
/// `NULL` stays bare. Every other value, numbers and booleans included, is
/// stringified and emitted as an escaped, single-quoted string. Binary
/// values become hex literals (`X'..'`) so the dump remains valid UTF-8.
///
/// # Example
/// ```
/// use dbkup_core::{SqlDialect, Value};
/// use dbkup_dump::serialize_value;
///
/// assert_eq!(serialize_value(&Value::Null, SqlDialect::MySql), "NULL");
/// assert_eq!(serialize_value(&Value::Int(42), SqlDialect::MySql), "'42'");
/// assert_eq!(serialize_value(&Value::from("it's"), SqlDialect::MySql), r"'it\'s'");
/// ```
pub fn serialize_value(value: &Value, dialect: SqlDialect) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bytes(bytes) => format!("X'{}'", hex::encode_upper(bytes)),
        other => {
            let text = text_form(other);
            format!("'{}'", dialect.escape_string(&text))
        }
    }
}

/// String representation of a non-null, non-binary value
fn text_form(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Text(s) => Cow::Borrowed(s),
        Value::Int(v) => Cow::Owned(v.to_string()),
        Value::Float(v) => Cow::Owned(v.to_string()),
        Value::Bool(true) => Cow::Borrowed("1"),
        Value::Bool(false) => Cow::Borrowed("0"),
        Value::Null | Value::Bytes(_) => Cow::Borrowed(""),
    }
}
