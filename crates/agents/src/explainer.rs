//! Explainer agent.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use tracing::info;

use supplymesh_core::{AgentResult, TaskOutcome};
use supplymesh_domain::{Explanation, Metric};
use supplymesh_storage::EntityStore;

use crate::agent::{Agent, names};
use crate::models::{ExplanationModel, TemplateExplanationModel};

#[derive(Debug, Clone, Deserialize)]
pub struct ExplainerInput {
    pub query: String,
    /// Context bag; domain keywords in its keys select the explanation.
    #[serde(default)]
    pub context: JsonValue,
}

/// Turns a query plus context bag into one stored Explanation, with a
/// provenance list of the agents whose data fed the answer.
pub struct ExplainerAgent<M = TemplateExplanationModel> {
    model: M,
}

impl Default for ExplainerAgent {
    fn default() -> Self {
        Self {
            model: TemplateExplanationModel,
        }
    }
}

impl<M: ExplanationModel> ExplainerAgent<M> {
    pub fn with_model(model: M) -> Self {
        Self { model }
    }
}

impl<M: ExplanationModel> Agent for ExplainerAgent<M> {
    type Input = ExplainerInput;

    fn name(&self) -> &'static str {
        names::EXPLAINER
    }

    fn execute(
        &self,
        store: &dyn EntityStore,
        input: ExplainerInput,
        as_of: DateTime<Utc>,
    ) -> AgentResult<TaskOutcome> {
        let generated = self.model.generate(&input.query, &input.context);

        let explanation = Explanation::new(
            input.query,
            input.context,
            generated.text.clone(),
            generated.confidence,
            generated.data_sources,
            generated.tokens_used,
            generated.response_time_ms,
            as_of,
        );
        let explanation_id = store.insert_explanation(explanation)?;

        store.append_metric(Metric::response_time(
            self.name(),
            f64::from(generated.response_time_ms),
            as_of,
        ))?;

        info!(
            agent = %self.name(),
            explanation_id = %explanation_id,
            tokens_used = generated.tokens_used,
            "explanation generated"
        );

        Ok(TaskOutcome::success(json!({
            "explanation_id": explanation_id,
            "explanation_text": generated.text,
            "tokens_used": generated.tokens_used,
        })))
    }
}
