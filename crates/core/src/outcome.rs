//! Structured task outcome.
//!
//! Every agent invocation, queued or HTTP-triggered, resolves to one of these.
//! The JSON shape is `{"status": "success", ...payload}` or
//! `{"status": "error", "message": "..."}`; an error never carries a partial
//! payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::AgentError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Success {
        #[serde(flatten)]
        payload: Map<String, JsonValue>,
    },
    Error {
        message: String,
    },
}

impl TaskOutcome {
    /// Build a success outcome from a JSON object payload.
    ///
    /// Non-object payloads are wrapped under a `"result"` key so the wire
    /// shape stays a flat object.
    pub fn success(payload: JsonValue) -> Self {
        let payload = match payload {
            JsonValue::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("result".to_string(), other);
                map
            }
        };
        Self::Success { payload }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Read a payload field (success outcomes only).
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        match self {
            Self::Success { payload } => payload.get(key),
            Self::Error { .. } => None,
        }
    }
}

impl From<AgentError> for TaskOutcome {
    fn from(err: AgentError) -> Self {
        Self::error(err.to_string())
    }
}
