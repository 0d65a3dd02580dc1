//! Wire-level request and response envelopes.
//!
//! Every inbound HTTP request is parsed into a [`RequestEnvelope`] before it
//! enters the middleware chain; envelopes are immutable once built and
//! discarded when the request completes. Responses are either a success
//! payload returned by the handler verbatim, or the fixed error shape built
//! from [`ResponseEnvelope::error`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parsed inbound request: headers, method name, and the opaque argument
/// object the handler interprets.
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    headers: HashMap<String, String>,
    pub method: String,
    pub arguments: Value,
}

impl RequestEnvelope {
    /// Build an envelope from a method name, raw header pairs, and the
    /// request body's `arguments` object. Header names are lowercased so
    /// lookups are case-insensitive.
    pub fn new<I, K, V>(method: impl Into<String>, headers: I, arguments: Value) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v.into()))
                .collect(),
            method: method.into(),
            arguments,
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// JSON body of a protocol request: `{ "arguments": { ... } }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub arguments: Value,
}

/// One segment of response content. Only `text` segments exist today, but
/// the wire shape keeps the `type` tag for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSegment {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl ContentSegment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: text.into(),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Outbound response payload: ordered content segments, with `isError` set
/// only on the error shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "isError", default, skip_serializing_if = "is_false")]
    pub is_error: bool,
    pub content: Vec<ContentSegment>,
}

impl ResponseEnvelope {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            is_error: false,
            content: vec![ContentSegment::text(text)],
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            is_error: true,
            content: vec![ContentSegment::text(message)],
        }
    }
}
