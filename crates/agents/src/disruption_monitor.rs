//! Disruption monitor agent.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::info;

use supplymesh_core::{AgentResult, TaskOutcome};
use supplymesh_domain::{Disruption, Metric};
use supplymesh_storage::EntityStore;

use crate::agent::{Agent, names};
use crate::models::{BaselineDisruptionFeed, DisruptionFeed};

/// Polls an external feed and records zero or one Disruption per run.
///
/// Associating the disruption with affected routes is not this agent's job;
/// a workflow that knows which routes matter does that afterwards.
pub struct DisruptionMonitorAgent<F = BaselineDisruptionFeed> {
    feed: F,
}

impl Default for DisruptionMonitorAgent {
    fn default() -> Self {
        Self {
            feed: BaselineDisruptionFeed,
        }
    }
}

impl<F: DisruptionFeed> DisruptionMonitorAgent<F> {
    pub fn with_feed(feed: F) -> Self {
        Self { feed }
    }
}

impl<F: DisruptionFeed> Agent for DisruptionMonitorAgent<F> {
    type Input = ();

    fn name(&self) -> &'static str {
        names::DISRUPTION_MONITOR
    }

    fn execute(
        &self,
        store: &dyn EntityStore,
        _input: (),
        as_of: DateTime<Utc>,
    ) -> AgentResult<TaskOutcome> {
        let mut disruptions_found: u32 = 0;
        let mut disruption_id = None;

        if let Some(report) = self.feed.poll(as_of) {
            let disruption = Disruption::new(
                report.event_type,
                report.title,
                report.description,
                report.severity,
                as_of,
                Some(as_of + Duration::hours(report.duration_hours)),
                as_of,
            );
            let id = store.insert_disruption(disruption)?;
            disruptions_found = 1;
            disruption_id = Some(id);

            info!(
                agent = %self.name(),
                disruption_id = %id,
                event_type = ?report.event_type,
                severity = ?report.severity,
                "disruption recorded"
            );
        }

        store.append_metric(Metric::throughput(
            self.name(),
            disruptions_found,
            "disruptions",
            as_of,
        ))?;

        Ok(TaskOutcome::success(json!({
            "disruptions_found": disruptions_found,
            "disruption_id": disruption_id,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StaticDisruptionFeed;
    use supplymesh_domain::{DisruptionEvent, MetricType};
    use supplymesh_storage::InMemoryEntityStore;

    #[test]
    fn static_feed_records_one_active_disruption() {
        let store = InMemoryEntityStore::new();
        let agent = DisruptionMonitorAgent::with_feed(StaticDisruptionFeed::weather());
        let as_of = Utc::now();

        let outcome = agent.execute(&store, (), as_of).unwrap();
        assert_eq!(outcome.get("disruptions_found"), Some(&json!(1)));

        let active = store.active_disruptions(as_of).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].event_type, DisruptionEvent::Weather);
        // Window is [as_of, as_of + 6h]; inactive afterwards.
        assert!(store
            .active_disruptions(as_of + Duration::hours(7))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn every_run_emits_a_throughput_metric() {
        let store = InMemoryEntityStore::new();
        let agent = DisruptionMonitorAgent::default();
        let as_of = Utc::now();

        agent.execute(&store, (), as_of).unwrap();

        let metrics = store
            .metrics_in_range(
                names::DISRUPTION_MONITOR,
                Some(MetricType::Throughput),
                as_of - Duration::minutes(1),
                as_of,
            )
            .unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].unit, "disruptions");
    }
}
