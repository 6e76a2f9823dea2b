//! Vision inspector agent.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use supplymesh_core::{AgentResult, StoreId, TaskOutcome};
use supplymesh_domain::{Inspection, InspectionType, Metric};
use supplymesh_storage::EntityStore;

use crate::agent::{Agent, names};
use crate::models::{BaselineDetectionModel, DetectionModel, hash_fraction_in};

#[derive(Debug, Clone, Deserialize)]
pub struct VisionInspectorInput {
    pub store_id: StoreId,
    pub image_reference: String,
}

/// Runs a detection model over one store image and records the result.
/// `action_required` and priority fall out of the anomaly list.
pub struct VisionInspectorAgent<M = BaselineDetectionModel> {
    model: M,
}

impl Default for VisionInspectorAgent {
    fn default() -> Self {
        Self {
            model: BaselineDetectionModel,
        }
    }
}

impl<M: DetectionModel> VisionInspectorAgent<M> {
    pub fn with_model(model: M) -> Self {
        Self { model }
    }
}

impl<M: DetectionModel> Agent for VisionInspectorAgent<M> {
    type Input = VisionInspectorInput;

    fn name(&self) -> &'static str {
        names::VISION_INSPECTOR
    }

    fn execute(
        &self,
        store: &dyn EntityStore,
        input: VisionInspectorInput,
        as_of: DateTime<Utc>,
    ) -> AgentResult<TaskOutcome> {
        store.store(input.store_id)?;

        let report = self.model.inspect(input.store_id, &input.image_reference);
        let objects_detected = report.objects.len();
        let anomalies_found = report.anomalies.len();

        let inspection = Inspection::new(
            input.store_id,
            input.image_reference,
            InspectionType::ShelfStock,
            report.objects,
            report.anomalies,
            as_of,
        );
        let action_required = inspection.action_required;
        let inspection_id = store.insert_inspection(inspection)?;

        let latency = hash_fraction_in(
            &[inspection_id.as_uuid().as_bytes(), b"latency"],
            1500.0,
            3000.0,
        );
        store.append_metric(Metric::response_time(self.name(), latency, as_of))?;

        info!(
            agent = %self.name(),
            inspection_id = %inspection_id,
            objects_detected,
            anomalies_found,
            action_required,
            "inspection recorded"
        );

        Ok(TaskOutcome::success(json!({
            "inspection_id": inspection_id,
            "objects_detected": objects_detected,
            "anomalies_found": anomalies_found,
            "action_required": action_required,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DetectionReport, FixedDetectionModel};
    use supplymesh_core::AgentError;
    use supplymesh_domain::{AnomalyTag, InspectionPriority, Store, StoreType};
    use supplymesh_storage::InMemoryEntityStore;

    fn seeded() -> (InMemoryEntityStore, StoreId) {
        let store = InMemoryEntityStore::new();
        let location = Store::new("HSR Layout", StoreType::Store, 1000, Utc::now());
        let store_id = location.id;
        store.insert_store(location).unwrap();
        (store, store_id)
    }

    #[test]
    fn anomalies_flag_the_inspection_for_action() {
        let (store, store_id) = seeded();
        let agent = VisionInspectorAgent::with_model(FixedDetectionModel {
            report: DetectionReport {
                objects: vec![],
                anomalies: vec![AnomalyTag::EmptyShelfSection],
            },
        });

        let outcome = agent
            .execute(
                &store,
                VisionInspectorInput {
                    store_id,
                    image_reference: "/inspections/shelf_001.jpg".to_string(),
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(outcome.get("action_required"), Some(&json!(true)));

        let flagged = store.inspections_requiring_action().unwrap();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].priority, InspectionPriority::High);
    }

    #[test]
    fn clean_inspection_needs_no_action() {
        let (store, store_id) = seeded();
        let agent = VisionInspectorAgent::with_model(FixedDetectionModel::default());

        let outcome = agent
            .execute(
                &store,
                VisionInspectorInput {
                    store_id,
                    image_reference: "/inspections/shelf_002.jpg".to_string(),
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(outcome.get("action_required"), Some(&json!(false)));
        assert!(store.inspections_requiring_action().unwrap().is_empty());
    }

    #[test]
    fn unknown_store_is_not_found() {
        let (store, _) = seeded();
        let err = VisionInspectorAgent::default()
            .execute(
                &store,
                VisionInspectorInput {
                    store_id: StoreId::new(),
                    image_reference: "/inspections/shelf_003.jpg".to_string(),
                },
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, AgentError::NotFound(_)));
    }
}
