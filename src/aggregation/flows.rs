use super::{accumulator::UsageAccumulators, rows::normalize_email};
use crate::models::{FlowCounts, RawFlowRow};

/// Flow event names the upstream is queried for. Variants exist because
/// different SDK versions emitted different spellings.
pub const FLOW_EVENT_NAMES: &[&str] = &[
    "flow_started",
    "flow_completed",
    "flow_failed",
    "Flow Started",
    "Flow Completed",
    "Flow Failed",
    "$flow_started",
    "$flow_completed",
    "$flow_failed",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowCategory {
    Started,
    Completed,
    Failed,
}

impl FlowCategory {
    fn counter(self, flows: &mut FlowCounts) -> &mut u64 {
        match self {
            FlowCategory::Started => &mut flows.started,
            FlowCategory::Completed => &mut flows.completed,
            FlowCategory::Failed => &mut flows.failed,
        }
    }
}

/// Ordered substring rules; the first matching rule wins.
#[derive(Debug, Clone)]
pub struct FlowClassifier {
    rules: Vec<(&'static str, FlowCategory)>,
}

impl Default for FlowClassifier {
    fn default() -> Self {
        Self {
            rules: vec![
                ("started", FlowCategory::Started),
                ("completed", FlowCategory::Completed),
                ("failed", FlowCategory::Failed),
            ],
        }
    }
}

impl FlowClassifier {
    pub fn classify(&self, event_name: &str) -> Option<FlowCategory> {
        let name = event_name.trim();
        let name = name.strip_prefix('$').unwrap_or(name).to_lowercase();
        self.rules
            .iter()
            .find(|(pattern, _)| name.contains(pattern))
            .map(|&(_, category)| category)
    }

    /// Adds flow counts onto existing accumulators.
    ///
    /// Rows for emails with no usage accumulator are dropped; flows never
    /// create users.
    pub fn merge_flows(
        &self,
        accumulators: &mut UsageAccumulators,
        rows: &[RawFlowRow],
    ) -> FlowMergeStats {
        let mut stats = FlowMergeStats::default();

        for row in rows {
            let Some(category) = self.classify(&row.event_name) else {
                stats.unclassified += 1;
                continue;
            };
            let acc = match normalize_email(&row.email) {
                Some(email) => accumulators.get_mut(&email),
                None => None,
            };
            let Some(acc) = acc else {
                stats.unknown_users += 1;
                continue;
            };
            let counter = category.counter(&mut acc.flows);
            *counter = counter.saturating_add(row.count);
            stats.merged += 1;
        }

        stats
    }
}

/// Outcome counters from [`FlowClassifier::merge_flows`], for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowMergeStats {
    pub merged: usize,
    pub unknown_users: usize,
    pub unclassified: usize,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{aggregation::RowAggregator, models::RawUsageRow};

    #[rstest]
    #[case("flow_started", Some(FlowCategory::Started))]
    #[case("Flow Completed", Some(FlowCategory::Completed))]
    #[case("$flow_failed", Some(FlowCategory::Failed))]
    #[case("FLOW_STARTED", Some(FlowCategory::Started))]
    #[case("$pageview", None)]
    // Both keywords present: rule order decides.
    #[case("started_then_failed", Some(FlowCategory::Started))]
    fn test_classify(#[case] name: &str, #[case] expected: Option<FlowCategory>) {
        assert_eq!(FlowClassifier::default().classify(name), expected);
    }

    #[test]
    fn test_every_queried_name_is_classified() {
        let classifier = FlowClassifier::default();
        for name in FLOW_EVENT_NAMES {
            assert!(classifier.classify(name).is_some(), "{name} unclassified");
        }
    }

    #[test]
    fn test_merges_into_known_user_and_drops_unknown() {
        let mut accs = RowAggregator::default()
            .aggregate(&[RawUsageRow::new("alice@acme.com", "2025-01-10", 100, 30)]);

        let stats = FlowClassifier::default().merge_flows(
            &mut accs,
            &[
                RawFlowRow::new("alice@acme.com", "flow_started", 5),
                RawFlowRow::new("alice@acme.com", "flow_completed", 4),
                RawFlowRow::new("alice@acme.com", "flow_failed", 1),
                RawFlowRow::new("ghost@acme.com", "flow_started", 9),
            ],
        );

        let alice = accs.get("alice@acme.com").unwrap();
        assert_eq!(
            alice.flows,
            FlowCounts {
                started: 5,
                completed: 4,
                failed: 1
            }
        );
        assert!(accs.get("ghost@acme.com").is_none());
        assert_eq!(accs.len(), 1);
        assert_eq!(stats.merged, 3);
        assert_eq!(stats.unknown_users, 1);
    }

    #[test]
    fn test_spelling_variants_accumulate() {
        let rows = [RawUsageRow::new("bob@acme.com", "2025-01-10", 1, 1)];
        let mut accs = RowAggregator::default().aggregate(&rows);

        FlowClassifier::default().merge_flows(
            &mut accs,
            &[
                RawFlowRow::new("Bob@Acme.com ", "flow_started", 2),
                RawFlowRow::new("bob@acme.com", "Flow Started", 3),
                RawFlowRow::new("bob@acme.com", "$flow_started", 4),
            ],
        );

        assert_eq!(accs.get("bob@acme.com").unwrap().flows.started, 9);
    }
}
