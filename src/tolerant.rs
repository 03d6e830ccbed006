//! Lenient deserializers for fields whose stored shape drifted over time.
//!
//! Profiles written by older dashboards kept `isClassTeacher` as either a
//! boolean or the string `"true"`, and `classesTaught` as either a list or a
//! JSON-encoded list. These helpers normalize both shapes at load time so the
//! rest of the crate only sees `bool` and `Vec<String>`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// `true`, `"true"` (any case) and `1` are true; everything else is false.
pub fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    Ok(v.as_ref().map(truthy).unwrap_or(false))
}

pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        Value::Number(n) => n.as_i64() == Some(1),
        _ => false,
    }
}

/// A list of strings, or a string holding a JSON list. Anything unparseable
/// becomes an empty list.
pub fn list_or_json_string<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    Ok(v.as_ref().map(string_list).unwrap_or_default())
}

pub fn string_list(v: &Value) -> Vec<String> {
    match v {
        Value::Array(items) => items
            .iter()
            .filter_map(|i| i.as_str())
            .map(|s| s.to_string())
            .collect(),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(inner @ Value::Array(_)) => string_list(&inner),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Ids were numbers in some collections; keep them as strings everywhere.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    Ok(match v {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

/// Splits the dashboard's `"P.5A, P.6B"` form input into class codes.
pub fn split_class_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(|c| c.to_string())
        .collect()
}
