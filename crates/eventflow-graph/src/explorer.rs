//! Construction of aggregate node and edge lists from an event log.

use eventflow_core::{EdgeList, EdgeRecord, EdgeSchema, EventRecord, NodeList, NodeRecord, NodeSchema};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Occurrence count metric.
pub const EVENTS_METRIC: &str = "events";
/// Distinct case count metric.
pub const CASES_METRIC: &str = "cases";

/// Source of fresh node and edge lists for a (possibly relabeled) log.
pub trait Explorer {
    /// One row per distinct event name.
    fn create_node_list(&self, log: &[EventRecord]) -> NodeList;

    /// One row per distinct `(source, target)` transition.
    fn create_edge_list(&self, log: &[EventRecord]) -> EdgeList;

    /// Declared metric columns of the node list.
    fn node_list_columns(&self) -> Vec<String>;

    fn node_list_default_column(&self) -> &str;

    fn edge_list_default_column(&self) -> &str;

    fn custom_metric_columns(&self) -> &[String];

    fn event_column(&self) -> &str;

    fn node_schema(&self) -> NodeSchema {
        NodeSchema::new(
            self.event_column(),
            &self.node_list_columns(),
            self.node_list_default_column(),
        )
    }

    fn edge_schema(&self) -> EdgeSchema {
        EdgeSchema::new(self.node_list_columns(), self.edge_list_default_column())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    pub event_col: String,
    pub default_node_metric: String,
    pub default_edge_metric: String,
    /// Columns of `EventRecord::extra` summed into node and edge metrics.
    pub custom_metrics: Vec<String>,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            event_col: "event".to_string(),
            default_node_metric: EVENTS_METRIC.to_string(),
            default_edge_metric: EVENTS_METRIC.to_string(),
            custom_metrics: Vec::new(),
        }
    }
}

#[derive(Default)]
struct MetricAccumulator<'a> {
    events: f64,
    cases: HashSet<&'a str>,
    custom: BTreeMap<&'a str, f64>,
}

impl<'a> MetricAccumulator<'a> {
    fn record(&mut self, event: &'a EventRecord, custom_columns: &'a [String]) {
        self.events += 1.0;
        self.cases.insert(event.case_id.as_str());
        for column in custom_columns {
            let value = event.extra.get(column).copied().unwrap_or(0.0);
            *self.custom.entry(column.as_str()).or_insert(0.0) += value;
        }
    }

    fn into_metrics(self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();
        metrics.insert(EVENTS_METRIC.to_string(), self.events);
        metrics.insert(CASES_METRIC.to_string(), self.cases.len() as f64);
        for (column, value) in self.custom {
            metrics.insert(column.to_string(), value);
        }
        metrics
    }
}

/// Explorer that counts events and consecutive transitions within each case.
#[derive(Debug, Clone, Default)]
pub struct TransitionExplorer {
    config: ExplorerConfig,
}

impl TransitionExplorer {
    pub fn new(config: ExplorerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    /// Events of every case, ordered by timestamp. Ties keep log order.
    fn case_sequences(log: &[EventRecord]) -> BTreeMap<&str, Vec<&EventRecord>> {
        let mut cases: BTreeMap<&str, Vec<&EventRecord>> = BTreeMap::new();
        for event in log {
            cases.entry(event.case_id.as_str()).or_default().push(event);
        }
        for events in cases.values_mut() {
            events.sort_by_key(|event| event.timestamp);
        }
        cases
    }
}

impl Explorer for TransitionExplorer {
    fn create_node_list(&self, log: &[EventRecord]) -> NodeList {
        let mut per_event: BTreeMap<&str, MetricAccumulator> = BTreeMap::new();
        for event in log {
            per_event
                .entry(event.event.as_str())
                .or_default()
                .record(event, &self.config.custom_metrics);
        }

        let records = per_event.into_iter().map(|(name, acc)| NodeRecord {
            metrics: acc.into_metrics(),
            ..NodeRecord::new(name)
        });
        NodeList::from_records(self.node_schema(), records)
    }

    fn create_edge_list(&self, log: &[EventRecord]) -> EdgeList {
        let mut per_transition: BTreeMap<(&str, &str), MetricAccumulator> = BTreeMap::new();
        for events in Self::case_sequences(log).values() {
            for pair in events.windows(2) {
                let (from, to) = (pair[0], pair[1]);
                per_transition
                    .entry((from.event.as_str(), to.event.as_str()))
                    .or_default()
                    .record(to, &self.config.custom_metrics);
            }
        }

        let edges = per_transition
            .into_iter()
            .map(|((source, target), acc)| EdgeRecord {
                metrics: acc.into_metrics(),
                ..EdgeRecord::new(source, target)
            })
            .collect();
        EdgeList::new(self.edge_schema(), edges)
    }

    fn node_list_columns(&self) -> Vec<String> {
        let mut columns = vec![EVENTS_METRIC.to_string(), CASES_METRIC.to_string()];
        columns.extend(self.config.custom_metrics.iter().cloned());
        columns
    }

    fn node_list_default_column(&self) -> &str {
        &self.config.default_node_metric
    }

    fn edge_list_default_column(&self) -> &str {
        &self.config.default_edge_metric
    }

    fn custom_metric_columns(&self) -> &[String] {
        &self.config.custom_metrics
    }

    fn event_column(&self) -> &str {
        &self.config.event_col
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    pub(crate) fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).unwrap()
    }

    pub(crate) fn event(name: &str, case: &str, seconds: i64) -> EventRecord {
        EventRecord::new(name, case, at(seconds))
    }

    #[test]
    fn test_node_list_counts_events_and_cases() {
        let log = vec![
            event("A", "u1", 1),
            event("B", "u1", 2),
            event("A", "u1", 3),
            event("A", "u2", 1),
        ];
        let nodes = TransitionExplorer::default().create_node_list(&log);

        assert_eq!(nodes.len(), 2);
        let a = nodes.get("A").unwrap();
        assert_eq!(a.metric(EVENTS_METRIC), Some(3.0));
        assert_eq!(a.metric(CASES_METRIC), Some(2.0));
        assert!(a.active);
        assert_eq!(nodes.schema().default_metric(), EVENTS_METRIC);
    }

    #[test]
    fn test_edges_follow_timestamps_within_cases() {
        // Out of order in the log; transitions never cross cases.
        let log = vec![
            event("B", "u1", 20),
            event("A", "u1", 10),
            event("C", "u2", 5),
            event("A", "u2", 1),
        ];
        let edges = TransitionExplorer::default().create_edge_list(&log);
        let pairs: Vec<(&str, &str)> = edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect();

        assert_eq!(pairs, vec![("A", "B"), ("A", "C")]);
        assert!(edges.iter().all(|e| e.metric(EVENTS_METRIC) == Some(1.0)));
    }

    #[test]
    fn test_custom_metrics_are_summed() {
        let config = ExplorerConfig {
            custom_metrics: vec!["revenue".to_string()],
            ..Default::default()
        };
        let log = vec![
            event("view", "u1", 1),
            event("buy", "u1", 2).with_extra("revenue", 10.0),
            event("view", "u2", 1),
            event("buy", "u2", 2).with_extra("revenue", 5.0),
        ];
        let explorer = TransitionExplorer::new(config);
        let nodes = explorer.create_node_list(&log);
        let edges = explorer.create_edge_list(&log);

        assert_eq!(nodes.get("buy").unwrap().metric("revenue"), Some(15.0));
        assert_eq!(nodes.get("view").unwrap().metric("revenue"), Some(0.0));
        assert_eq!(edges.iter().next().unwrap().metric("revenue"), Some(15.0));
        assert_eq!(edges.iter().next().unwrap().metric(CASES_METRIC), Some(2.0));
        assert_eq!(
            explorer.node_list_columns(),
            vec!["events".to_string(), "cases".to_string(), "revenue".to_string()]
        );
    }
}
