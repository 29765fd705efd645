// ── Mutation acknowledgement ──

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What a mutation endpoint answered.
///
/// Mutation responses vary between endpoints (the updated resource, a bare
/// message, or nothing at all), so they are kept as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl Ack {
    /// Split a response body into message and payload.
    pub fn from_body(body: Value) -> Self {
        match body {
            Value::Object(mut map) if map.contains_key("data") || map.contains_key("message") => {
                let message = map
                    .remove("message")
                    .and_then(|m| m.as_str().map(str::to_owned));
                let data = map.remove("data").unwrap_or(Value::Null);
                Self { message, data }
            }
            other => Self {
                message: None,
                data: other,
            },
        }
    }
}
