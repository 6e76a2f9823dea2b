//! Injectable model capabilities.
//!
//! Each agent's actual computation (demand forecasting, route estimation,
//! disruption detection, vision, text generation) sits behind one of these
//! traits. The baseline implementations are deterministic: instead of an RNG
//! they perturb a hash of their inputs, so the same input always produces
//! the same output and tests need no clock or RNG mocking. Swap in a real
//! model without touching the pipeline.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Value as JsonValue, json};

use supplymesh_core::StoreId;
use supplymesh_domain::{
    AnomalyTag, ConfidenceLevel, DetectedObject, DisruptionEvent, Severity, TrafficConditions,
};

use crate::agent::names;

/// FNV-1a over a list of byte slices.
fn fnv1a(parts: &[&[u8]]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for part in parts {
        for &byte in *part {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x100_0000_01b3);
        }
    }
    hash
}

/// Map a hash to [0, 1).
fn fraction(hash: u64) -> f64 {
    (hash >> 11) as f64 / (1u64 << 53) as f64
}

/// Deterministic stand-in for a random draw in [lo, hi).
pub fn hash_fraction_in(parts: &[&[u8]], lo: f64, hi: f64) -> f64 {
    lo + fraction(fnv1a(parts)) * (hi - lo)
}

fn pick<'a, T>(hash: u64, choices: &'a [T]) -> &'a T {
    &choices[(hash % choices.len() as u64) as usize]
}

// --- demand ---

#[derive(Debug, Clone, PartialEq)]
pub struct DemandPrediction {
    pub demand: u32,
    pub confidence: f64,
    pub external_factors: JsonValue,
}

/// Demand forecasting capability.
pub trait DemandModel: Send + Sync {
    fn predict(
        &self,
        store_id: StoreId,
        product_id: supplymesh_core::ProductId,
        forecast_date: NaiveDate,
    ) -> DemandPrediction;
}

/// Hash-perturbed baseline: demand in [10, 100], confidence in [0.75, 0.95],
/// external factors on roughly 30% of inputs (a cricket match multiplies
/// demand by 1.5).
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineDemandModel;

impl DemandModel for BaselineDemandModel {
    fn predict(
        &self,
        store_id: StoreId,
        product_id: supplymesh_core::ProductId,
        forecast_date: NaiveDate,
    ) -> DemandPrediction {
        let date = forecast_date.to_string();
        let seed = &[
            store_id.as_uuid().as_bytes() as &[u8],
            product_id.as_uuid().as_bytes(),
            date.as_bytes(),
        ];
        let hash = fnv1a(seed);

        let mut demand = 10 + (hash % 91) as u32;
        let confidence = hash_fraction_in(&[&hash.to_le_bytes(), b"confidence"], 0.75, 0.95);

        let factors_hash = fnv1a(&[&hash.to_le_bytes(), b"factors"]);
        let external_factors = if fraction(factors_hash) > 0.7 {
            let weather = pick(factors_hash, &["sunny", "rainy", "cloudy"]);
            let event = pick(factors_hash >> 8, &["cricket_match", "festival", "normal"]);
            let traffic = pick(factors_hash >> 16, &["light", "medium", "heavy"]);
            if *event == "cricket_match" {
                demand = (demand as f64 * 1.5) as u32;
            }
            json!({"weather": weather, "event": event, "traffic": traffic})
        } else {
            json!({})
        };

        DemandPrediction {
            demand,
            confidence,
            external_factors,
        }
    }
}

/// Always predicts the same figures. For simulations and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedDemandModel {
    pub demand: u32,
    pub confidence: f64,
}

impl DemandModel for FixedDemandModel {
    fn predict(
        &self,
        _store_id: StoreId,
        _product_id: supplymesh_core::ProductId,
        _forecast_date: NaiveDate,
    ) -> DemandPrediction {
        DemandPrediction {
            demand: self.demand,
            confidence: self.confidence,
            external_factors: json!({}),
        }
    }
}

// --- routing ---

#[derive(Debug, Clone, PartialEq)]
pub struct RouteEstimate {
    pub distance_km: f64,
    pub duration_hours: f64,
    /// Smallest currency unit.
    pub cost: u64,
    pub traffic: TrafficConditions,
}

/// Route estimation capability.
pub trait RouteEstimator: Send + Sync {
    fn estimate(&self, start: StoreId, end: StoreId) -> RouteEstimate;
}

/// Baseline estimate: distance in [5, 50) km, duration = distance / 30 km/h
/// scaled by a traffic factor in [1.0, 1.5), cost at 15.0 per km.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineRouteEstimator;

const AVERAGE_SPEED_KMH: f64 = 30.0;
const COST_PER_KM: f64 = 15.0;

impl RouteEstimator for BaselineRouteEstimator {
    fn estimate(&self, start: StoreId, end: StoreId) -> RouteEstimate {
        let seed = &[
            start.as_uuid().as_bytes() as &[u8],
            end.as_uuid().as_bytes(),
        ];
        let hash = fnv1a(seed);

        let distance = hash_fraction_in(&[&hash.to_le_bytes(), b"distance"], 5.0, 50.0);
        let traffic_factor = hash_fraction_in(&[&hash.to_le_bytes(), b"traffic"], 1.0, 1.5);
        let duration = distance / AVERAGE_SPEED_KMH * traffic_factor;
        let cost = distance * COST_PER_KM;

        RouteEstimate {
            distance_km: (distance * 10.0).round() / 10.0,
            duration_hours: (duration * 10.0).round() / 10.0,
            cost: (cost * 100.0).round() as u64,
            traffic: *pick(
                hash >> 24,
                &[
                    TrafficConditions::Light,
                    TrafficConditions::Medium,
                    TrafficConditions::Heavy,
                ],
            ),
        }
    }
}

// --- disruptions ---

#[derive(Debug, Clone, PartialEq)]
pub struct DisruptionReport {
    pub event_type: DisruptionEvent,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    /// Window length from detection time.
    pub duration_hours: i64,
}

/// External disruption detection capability (weather APIs, traffic feeds...).
pub trait DisruptionFeed: Send + Sync {
    /// Zero or one disruption per poll.
    fn poll(&self, as_of: DateTime<Utc>) -> Option<DisruptionReport>;
}

struct CatalogEntry {
    event_type: DisruptionEvent,
    title: &'static str,
    description: &'static str,
    severity: Severity,
}

const DISRUPTION_CATALOG: [CatalogEntry; 5] = [
    CatalogEntry {
        event_type: DisruptionEvent::Weather,
        title: "Heavy rainfall expected",
        description: "IMD predicts heavy rainfall in Bangalore",
        severity: Severity::Medium,
    },
    CatalogEntry {
        event_type: DisruptionEvent::Traffic,
        title: "Accident on Outer Ring Road",
        description: "Multi-vehicle accident causing delays",
        severity: Severity::High,
    },
    CatalogEntry {
        event_type: DisruptionEvent::Strike,
        title: "Transport workers strike",
        description: "City bus drivers on strike",
        severity: Severity::High,
    },
    CatalogEntry {
        event_type: DisruptionEvent::Festival,
        title: "Ganesh Chaturthi celebrations",
        description: "Festival processions affecting traffic",
        severity: Severity::Medium,
    },
    CatalogEntry {
        event_type: DisruptionEvent::SportsEvent,
        title: "India vs Pakistan cricket match",
        description: "High viewership expected to affect demand",
        severity: Severity::Low,
    },
];

/// Baseline feed: roughly one poll in five reports a disruption, drawn from
/// a small fixed catalog, with a window of 2 to 12 hours.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineDisruptionFeed;

impl DisruptionFeed for BaselineDisruptionFeed {
    fn poll(&self, as_of: DateTime<Utc>) -> Option<DisruptionReport> {
        let ts = as_of.timestamp_micros().to_le_bytes();
        let hash = fnv1a(&[&ts, b"disruption"]);
        if fraction(hash) <= 0.8 {
            return None;
        }

        let entry = pick(hash >> 8, &DISRUPTION_CATALOG);
        Some(DisruptionReport {
            event_type: entry.event_type,
            title: entry.title.to_string(),
            description: entry.description.to_string(),
            severity: entry.severity,
            duration_hours: 2 + ((hash >> 16) % 11) as i64,
        })
    }
}

/// Always reports the same disruption. For simulations and tests.
#[derive(Debug, Clone)]
pub struct StaticDisruptionFeed {
    pub report: DisruptionReport,
}

impl StaticDisruptionFeed {
    pub fn new(report: DisruptionReport) -> Self {
        Self { report }
    }

    /// A medium-severity weather disruption with a 6-hour window.
    pub fn weather() -> Self {
        Self::new(DisruptionReport {
            event_type: DisruptionEvent::Weather,
            title: "Heavy rainfall expected".to_string(),
            description: "IMD predicts heavy rainfall in Bangalore".to_string(),
            severity: Severity::Medium,
            duration_hours: 6,
        })
    }
}

impl DisruptionFeed for StaticDisruptionFeed {
    fn poll(&self, _as_of: DateTime<Utc>) -> Option<DisruptionReport> {
        Some(self.report.clone())
    }
}

// --- vision ---

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetectionReport {
    pub objects: Vec<DetectedObject>,
    pub anomalies: Vec<AnomalyTag>,
}

/// Vision inspection capability.
pub trait DetectionModel: Send + Sync {
    fn inspect(&self, store_id: StoreId, image_reference: &str) -> DetectionReport;
}

const OBJECT_LABELS: [&str; 5] = ["product_box", "empty_shelf", "price_tag", "customer", "staff"];

const ANOMALY_TAGS: [AnomalyTag; 5] = [
    AnomalyTag::EmptyShelfSection,
    AnomalyTag::MisplacedProducts,
    AnomalyTag::PriceTagMissing,
    AnomalyTag::SpoiledProducts,
    AnomalyTag::CleanlinessIssue,
];

/// Baseline detector: each known label appears with ~40% probability per
/// image, anomalies on ~30% of images (one or two tags).
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineDetectionModel;

impl DetectionModel for BaselineDetectionModel {
    fn inspect(&self, store_id: StoreId, image_reference: &str) -> DetectionReport {
        let mut objects = Vec::new();
        for label in OBJECT_LABELS {
            let hash = fnv1a(&[
                store_id.as_uuid().as_bytes(),
                image_reference.as_bytes(),
                label.as_bytes(),
            ]);
            if fraction(hash) <= 0.6 {
                continue;
            }
            let confidence = hash_fraction_in(&[&hash.to_le_bytes(), b"confidence"], 0.7, 0.98);
            objects.push(DetectedObject {
                label: label.to_string(),
                confidence: (confidence * 100.0).round() / 100.0,
                bbox: [
                    (hash % 500) as u32,
                    ((hash >> 16) % 400) as u32,
                    100 + ((hash >> 32) % 100) as u32,
                    100 + ((hash >> 48) % 50) as u32,
                ],
            });
        }

        let anomaly_hash = fnv1a(&[
            store_id.as_uuid().as_bytes(),
            image_reference.as_bytes(),
            b"anomalies",
        ]);
        let anomalies = if fraction(anomaly_hash) > 0.7 {
            let first = (anomaly_hash % 5) as usize;
            let mut tags = vec![ANOMALY_TAGS[first]];
            if (anomaly_hash >> 8) % 2 == 0 {
                tags.push(ANOMALY_TAGS[(first + 1) % 5]);
            }
            tags
        } else {
            Vec::new()
        };

        DetectionReport { objects, anomalies }
    }
}

/// Reports a fixed detection result. For tests.
#[derive(Debug, Clone, Default)]
pub struct FixedDetectionModel {
    pub report: DetectionReport,
}

impl DetectionModel for FixedDetectionModel {
    fn inspect(&self, _store_id: StoreId, _image_reference: &str) -> DetectionReport {
        self.report.clone()
    }
}

// --- explanation ---

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedExplanation {
    pub text: String,
    pub confidence: ConfidenceLevel,
    /// Agent names consulted (provenance).
    pub data_sources: Vec<String>,
    pub tokens_used: u32,
    pub response_time_ms: u32,
}

/// Text generation capability.
pub trait ExplanationModel: Send + Sync {
    fn generate(&self, query: &str, context: &JsonValue) -> GeneratedExplanation;
}

/// Template-based generation: the first matching domain keyword in the
/// context bag (fixed precedence) selects a canned explanation, and a
/// serialized view of the context is appended.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateExplanationModel;

const TEMPLATES: [(&str, &str); 5] = [
    (
        "rebalance",
        "The rebalancing action was triggered by predictive analytics showing an 85% probability of stockout in the next 48 hours.",
    ),
    (
        "route",
        "The route optimization considers real-time traffic data, fuel costs, and delivery priorities to minimize total delivery time.",
    ),
    (
        "disruption",
        "External disruptions are automatically detected through multiple data sources including weather APIs, traffic feeds, and news monitoring.",
    ),
    (
        "inspection",
        "Computer vision analysis identified potential issues that require human verification and corrective action.",
    ),
    (
        "inventory",
        "The inventory levels show a concerning trend with several products approaching critical thresholds. Our AI forecasting suggests immediate action is needed.",
    ),
];

const GENERAL_TEMPLATE: &str =
    "I analyzed the available data and coordinated with other AI agents to provide this comprehensive response.";

impl TemplateExplanationModel {
    fn base_text(context: &JsonValue) -> &'static str {
        let Some(bag) = context.as_object() else {
            return GENERAL_TEMPLATE;
        };
        for (keyword, template) in TEMPLATES {
            if bag.keys().any(|k| k.contains(keyword)) {
                return template;
            }
        }
        GENERAL_TEMPLATE
    }
}

impl ExplanationModel for TemplateExplanationModel {
    fn generate(&self, query: &str, context: &JsonValue) -> GeneratedExplanation {
        let base = Self::base_text(context);
        let text = if context.as_object().is_some_and(|bag| !bag.is_empty()) {
            let serialized =
                serde_json::to_string_pretty(context).unwrap_or_else(|_| context.to_string());
            format!("{base} Based on the following data: {serialized}")
        } else {
            base.to_string()
        };

        let hash = fnv1a(&[query.as_bytes(), text.as_bytes()]);
        GeneratedExplanation {
            text,
            confidence: ConfidenceLevel::High,
            data_sources: vec![
                names::FORECAST.to_string(),
                names::REBALANCER.to_string(),
                names::ROUTE_PLANNER.to_string(),
            ],
            tokens_used: 100 + (hash % 401) as u32,
            response_time_ms: 1500 + ((hash >> 16) % 2001) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use supplymesh_core::ProductId;

    #[test]
    fn baseline_demand_is_deterministic_and_bounded() {
        let model = BaselineDemandModel;
        let store = StoreId::new();
        let product = ProductId::new();
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        let a = model.predict(store, product, date);
        let b = model.predict(store, product, date);
        assert_eq!(a, b);
        assert!(a.demand >= 10);
        // 1.5x event multiplier on a base of at most 100.
        assert!(a.demand <= 150);
        assert!((0.75..0.95).contains(&a.confidence));
    }

    #[test]
    fn baseline_route_estimate_matches_cost_model() {
        let estimator = BaselineRouteEstimator;
        let est = estimator.estimate(StoreId::new(), StoreId::new());

        assert!((5.0..=50.0).contains(&est.distance_km));
        // duration >= distance at free-flow speed, <= 1.5x that.
        let free_flow = est.distance_km / AVERAGE_SPEED_KMH;
        assert!(est.duration_hours >= (free_flow * 10.0).floor() / 10.0 - 0.11);
        assert!(est.duration_hours <= free_flow * 1.5 + 0.11);
        // cost within rounding of 15.0/km.
        let expected = (est.distance_km * COST_PER_KM * 100.0).round();
        assert!((est.cost as f64 - expected).abs() <= COST_PER_KM * 100.0 * 0.11);
    }

    #[test]
    fn disruption_feed_is_deterministic_per_instant() {
        let feed = BaselineDisruptionFeed;
        let at = Utc::now();
        assert_eq!(feed.poll(at), feed.poll(at));

        if let Some(report) = feed.poll(at) {
            assert!((2..=12).contains(&report.duration_hours));
        }
    }

    #[test]
    fn template_precedence_prefers_rebalance() {
        let model = TemplateExplanationModel;
        let generated = model.generate(
            "why was stock moved?",
            &json!({"route_id": "r1", "rebalance_id": "a1"}),
        );
        assert!(generated.text.starts_with("The rebalancing action"));
        assert!(generated.text.contains("Based on the following data:"));
    }

    #[test]
    fn empty_context_uses_general_template() {
        let model = TemplateExplanationModel;
        let generated = model.generate("status?", &json!({}));
        assert_eq!(generated.text, GENERAL_TEMPLATE);
        assert!(generated.tokens_used >= 100 && generated.tokens_used <= 500);
        assert!(generated.response_time_ms >= 1500 && generated.response_time_ms <= 3500);
    }

    #[test]
    fn detection_report_uses_known_labels() {
        let model = BaselineDetectionModel;
        let report = model.inspect(StoreId::new(), "/inspections/shelf_001.jpg");
        for object in &report.objects {
            assert!(OBJECT_LABELS.contains(&object.label.as_str()));
            assert!((0.7..=0.98).contains(&object.confidence));
        }
        assert!(report.anomalies.len() <= 2);
    }
}
