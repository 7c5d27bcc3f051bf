//! Turning vault responses into a single field value
//!
//! The encoding returned by `bw serve` is not stable across versions, so a body
//! is first classified as [`Payload::Structured`] or [`Payload::PlainText`] and
//! then searched with an ordered, per-field list of candidate keys.

use serde_json::{Map, Value};

use crate::types::{FieldKind, RawResponse};

/// Key that wraps values at every level of a `bw serve` envelope
const ENVELOPE_KEY: &str = "data";

/// A decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A JSON object
    Structured(Map<String, Value>),
    /// Anything else, searched line by line
    PlainText(String),
}

impl Payload {
    /// Classify a response body.
    ///
    /// A JSON content type, or a body starting with `{` or `[`, triggers a
    /// decode attempt; a body that fails to decode is treated as plain text.
    pub fn decode(response: &RawResponse) -> Self {
        let text = response.body.trim();
        let json_type = response
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"));

        if json_type || text.starts_with('{') || text.starts_with('[') {
            match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(map)) => return Payload::Structured(map),
                // Intentional: a bare JSON string yields its content, not the quoted text
                Ok(Value::String(s)) => return Payload::PlainText(s),
                Ok(_) | Err(_) => {}
            }
        }
        Payload::PlainText(text.to_string())
    }

    /// Find the value for `field`, or `None` when the body does not carry one
    pub fn extract(&self, field: &FieldKind) -> Option<String> {
        match self {
            Payload::Structured(map) => {
                let candidates = field.candidate_keys();
                search(map, &candidates)
                    .or_else(|| match field {
                        FieldKind::Password => login_password(map),
                        _ => None,
                    })
                    .map(str::to_string)
            }
            Payload::PlainText(text) => first_line(text),
        }
    }
}

/// Extract `field` from a response; absence is an empty string, never an error
pub fn extract_value(field: &FieldKind, response: &RawResponse) -> String {
    Payload::decode(response)
        .extract(field)
        .unwrap_or_default()
}

fn non_empty(value: Option<&Value>) -> Option<&str> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
        _ => None,
    }
}

fn search<'a>(map: &'a Map<String, Value>, candidates: &[&str]) -> Option<&'a str> {
    for key in candidates {
        match map.get(*key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.as_str()),
            Some(Value::Object(inner)) => {
                // One level of nesting only
                let found = candidates
                    .iter()
                    .find_map(|inner_key| non_empty(inner.get(*inner_key)))
                    .or_else(|| non_empty(inner.get(ENVELOPE_KEY)));
                if found.is_some() {
                    return found;
                }
            }
            _ => {}
        }
    }
    None
}

// Full item objects keep the password under `login.password`, either at the
// top level or inside the `data` envelope.
fn login_password(map: &Map<String, Value>) -> Option<&str> {
    fn from_login(map: &Map<String, Value>) -> Option<&str> {
        match map.get("login") {
            Some(Value::Object(login)) => non_empty(login.get("password")),
            _ => None,
        }
    }

    from_login(map).or_else(|| match map.get(ENVELOPE_KEY) {
        Some(Value::Object(inner)) => from_login(inner),
        _ => None,
    })
}

fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}
