use serde_json::Value;

use super::error::MailChimpError;

/// Fails with [`MailChimpError::Remote`] if the response is an error object.
///
/// Only objects carrying a `code` key count; booleans, arrays and plain
/// member payloads pass through.
pub fn raise_if_error(response: &Value) -> Result<(), MailChimpError> {
    let Some(object) = response.as_object() else {
        return Ok(());
    };
    let Some(code) = object.get("code") else {
        return Ok(());
    };

    let code = match code {
        Value::Number(n) => n.as_i64().unwrap_or_default(),
        Value::String(s) => s.parse().unwrap_or_default(),
        _ => 0,
    };
    let message = match object.get("error") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };

    tracing::error!(code, %message, "MailChimp API returned an error");
    Err(MailChimpError::Remote { message, code })
}

/// Truthiness of a JSON value: null, false, zero, and empty strings,
/// arrays and objects are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// The string value under `key`, if present and truthy.
pub(crate) fn truthy_str<'a>(object: &'a Value, key: &str) -> Option<&'a str> {
    object
        .get(key)
        .filter(|v| is_truthy(v))
        .and_then(Value::as_str)
}
