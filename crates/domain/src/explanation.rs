use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use supplymesh_core::ExplanationId;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

/// A generated natural-language explanation. Read-mostly once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub id: ExplanationId,
    pub query: String,
    /// The context bag the explanation was generated from.
    pub context: JsonValue,
    pub text: String,
    pub confidence: ConfidenceLevel,
    /// Agent names consulted while producing the answer (provenance).
    pub data_sources: Vec<String>,
    pub tokens_used: u32,
    pub response_time_ms: u32,
    pub created_at: DateTime<Utc>,
}

impl Explanation {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        query: impl Into<String>,
        context: JsonValue,
        text: impl Into<String>,
        confidence: ConfidenceLevel,
        data_sources: Vec<String>,
        tokens_used: u32,
        response_time_ms: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ExplanationId::new(),
            query: query.into(),
            context,
            text: text.into(),
            confidence,
            data_sources,
            tokens_used,
            response_time_ms,
            created_at,
        }
    }
}
