//! `application/x-www-form-urlencoded` encoding of structured payloads.
//!
//! Nested values are flattened with bracket keys: `{"a": {"b": 1}, "c": [true, null]}`
//! becomes `a[b]=1&c[0]=1`, with `null` values left out.

use serde_json::Value;

use super::{FieldValue, Payload};
use crate::MessageError;

/// Encodes `payload` as a form body.
///
/// # Errors
///
/// Returns [`MessageError::UnexpectedBody`] unless the payload is a field list, an object or
/// an array.
pub(crate) fn encode(payload: &Payload) -> Result<String, MessageError> {
    let pairs = match payload {
        Payload::Fields(fields) => fields_to_pairs(fields),
        Payload::Structured(value @ (Value::Object(_) | Value::Array(_))) => {
            let mut pairs = Vec::new();
            flatten(None, value, &mut pairs);
            pairs
        }
        other => {
            return Err(MessageError::unexpected_body(format!(
                "content must be a field list, an object or an array, given {}",
                kind_name(other)
            )));
        }
    };

    serde_urlencoded::to_string(&pairs).map_err(|e| MessageError::encoding(format!("form encoding failed: {e}")))
}

/// Encodes plain pairs, used for request-target query strings.
pub(crate) fn encode_pairs(pairs: &[(String, String)]) -> Result<String, MessageError> {
    serde_urlencoded::to_string(pairs).map_err(|e| MessageError::encoding(format!("form encoding failed: {e}")))
}

/// Decodes a query string into ordered pairs.
pub(crate) fn decode_pairs(query: &str) -> Result<Vec<(String, String)>, MessageError> {
    serde_urlencoded::from_str(query).map_err(|e| MessageError::invalid_format(format!("invalid query string {query:?}: {e}")))
}

fn fields_to_pairs(fields: &[(String, FieldValue)]) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(fields.len());
    for (name, value) in fields {
        match value {
            FieldValue::Text(text) => pairs.push((name.clone(), text.clone())),
            FieldValue::List(values) => {
                pairs.extend(values.iter().enumerate().map(|(i, value)| (format!("{name}[{i}]"), value.clone())));
            }
        }
    }
    pairs
}

fn flatten(prefix: Option<&str>, value: &Value, pairs: &mut Vec<(String, String)>) {
    let key = |name: &str| match prefix {
        Some(prefix) => format!("{prefix}[{name}]"),
        None => name.to_string(),
    };

    match value {
        Value::Object(map) => map.iter().for_each(|(name, value)| flatten(Some(&key(name)), value, pairs)),
        Value::Array(values) => values.iter().enumerate().for_each(|(i, value)| flatten(Some(&key(&i.to_string())), value, pairs)),
        Value::Null => {}
        scalar => {
            if let Some(prefix) = prefix {
                pairs.push((prefix.to_string(), scalar_to_string(scalar)));
            }
        }
    }
}

/// Renders a scalar the way form fields carry it: booleans as `1`/`0`, strings unquoted.
pub(crate) fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => String::from(if *b { "1" } else { "0" }),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn kind_name(payload: &Payload) -> &'static str {
    match payload {
        Payload::Empty => "empty",
        Payload::Text(_) => "text",
        Payload::Fields(_) => "fields",
        Payload::Structured(Value::Null) => "null",
        Payload::Structured(Value::Bool(_)) => "boolean",
        Payload::Structured(Value::Number(_)) => "number",
        Payload::Structured(Value::String(_)) => "string",
        Payload::Structured(Value::Array(_)) => "array",
        Payload::Structured(Value::Object(_)) => "object",
    }
}
