//! Classification of raw backend responses
//!
//! Intermediaries sometimes answer with an HTML error page or nothing at all,
//! so a body is sorted into one of these shapes before any field is read.

use serde_json::{Map, Value};
use crate::backend::RawResponse;

pub type Payload = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseClass {
    /// 2xx with a JSON object body
    Ok(Payload),
    /// Non-2xx with a JSON object body
    HttpError { status: u16, payload: Payload },
    /// Zero-length body
    Empty,
    /// An HTML document where JSON was expected
    Markup { status: u16 },
    /// Body that does not parse as JSON
    NonJson,
    /// Valid JSON that is not an object
    Malformed,
}

impl ResponseClass {
    pub fn classify(response: &RawResponse) -> Self {
        let body = response.body.as_str();

        if is_markup(body) {
            return ResponseClass::Markup { status: response.status };
        }

        if body.is_empty() {
            return ResponseClass::Empty;
        }

        let value: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(_) => return ResponseClass::NonJson,
        };

        match value {
            Value::Object(payload) if response.is_success() => ResponseClass::Ok(payload),
            Value::Object(payload) => ResponseClass::HttpError {
                status: response.status,
                payload,
            },
            _ => ResponseClass::Malformed,
        }
    }

    /// The JSON object, whatever the status
    pub fn payload(&self) -> Option<&Payload> {
        match self {
            ResponseClass::Ok(payload) | ResponseClass::HttpError { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

fn is_markup(body: &str) -> bool {
    let trimmed = body.trim_start();
    starts_with_ignore_case(trimmed, "<!DOCTYPE") || starts_with_ignore_case(trimmed, "<html")
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// A field's text; missing, empty, and non-string values all read as absent
pub fn string_field(payload: &Payload, field: &str) -> Option<String> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Whether the field is literally `true`
pub fn flag_field(payload: &Payload, field: &str) -> bool {
    payload.get(field).and_then(Value::as_bool).unwrap_or(false)
}

/// First non-empty string among the named payload fields
pub fn first_message(payload: &Payload, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| string_field(payload, field))
}
