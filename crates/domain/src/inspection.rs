use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use supplymesh_core::{InspectionId, StoreId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionType {
    ShelfStock,
    Spoilage,
    Placement,
    Cleanliness,
    Security,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionPriority {
    Low,
    Medium,
    High,
    Urgent,
}

/// Known anomaly tags the detection model can raise.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyTag {
    EmptyShelfSection,
    MisplacedProducts,
    PriceTagMissing,
    SpoiledProducts,
    CleanlinessIssue,
}

/// One object found in an inspected image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    pub label: String,
    pub confidence: f64,
    /// [x, y, width, height] in image pixels.
    pub bbox: [u32; 4],
}

/// Result of one vision inspection of a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inspection {
    pub id: InspectionId,
    pub store_id: StoreId,
    pub image_reference: String,
    pub inspection_type: InspectionType,
    pub detected_objects: Vec<DetectedObject>,
    pub anomalies: Vec<AnomalyTag>,
    pub action_required: bool,
    pub priority: InspectionPriority,
    pub created_at: DateTime<Utc>,
}

impl Inspection {
    /// `action_required` and `priority` are derived from the anomaly list,
    /// never supplied by the caller.
    pub fn new(
        store_id: StoreId,
        image_reference: impl Into<String>,
        inspection_type: InspectionType,
        detected_objects: Vec<DetectedObject>,
        anomalies: Vec<AnomalyTag>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let action_required = !anomalies.is_empty();
        let priority = if action_required {
            InspectionPriority::High
        } else {
            InspectionPriority::Low
        };
        Self {
            id: InspectionId::new(),
            store_id,
            image_reference: image_reference.into(),
            inspection_type,
            detected_objects,
            anomalies,
            action_required,
            priority,
            created_at,
        }
    }
}
