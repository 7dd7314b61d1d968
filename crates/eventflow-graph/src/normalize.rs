//! Metric scales shared by one payload build.

use eventflow_core::{DEFAULT_METRIC_KEY, EdgeList, NodeList, ScaleError, Threshold};
use std::collections::BTreeMap;

/// Smallest visual degree of a node circle.
pub const MIN_VISUAL_DEGREE: f64 = 4.0;
/// Span added on top of [`MIN_VISUAL_DEGREE`] for the largest node.
pub const VISUAL_DEGREE_SPAN: f64 = 30.0;

fn max_abs(values: impl Iterator<Item = f64>) -> f64 {
    values.map(f64::abs).fold(0.0, f64::max)
}

fn max_signed(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.filter(|v| !v.is_nan()).reduce(f64::max)
}

fn checked_scale(metric: &str, scale: Option<f64>) -> Result<f64, ScaleError> {
    match scale {
        Some(scale) if scale != 0.0 && scale.is_finite() => Ok(scale),
        _ => Err(ScaleError::zero_scale(metric)),
    }
}

/// Per-metric scales of the current node and edge lists, computed once per
/// recomputation pass so every value of a payload uses the same scale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScaleTable {
    node_abs: BTreeMap<String, f64>,
    node_max: BTreeMap<String, f64>,
    edge_abs: BTreeMap<String, f64>,
    node_default: String,
    edge_default: String,
}

impl ScaleTable {
    pub fn from_lists(nodes: &NodeList, edges: &EdgeList) -> Self {
        let mut table = Self {
            node_default: nodes.schema().default_metric().to_string(),
            edge_default: edges.schema().default_metric.clone(),
            ..Default::default()
        };

        for metric in nodes.schema().metric_columns() {
            table
                .node_abs
                .insert(metric.to_string(), max_abs(nodes.metric_values(metric)));
            if let Some(max) = max_signed(nodes.metric_values(metric)) {
                table.node_max.insert(metric.to_string(), max);
            }
        }
        for metric in &edges.schema().metrics {
            table
                .edge_abs
                .insert(metric.clone(), max_abs(edges.metric_values(metric)));
        }

        table
    }

    pub fn node_default_metric(&self) -> &str {
        &self.node_default
    }

    pub fn edge_default_metric(&self) -> &str {
        &self.edge_default
    }

    /// Maximum absolute node value of a declared metric.
    pub fn node_scale(&self, metric: &str) -> Option<f64> {
        self.node_abs.get(metric).copied()
    }

    pub fn edge_scale(&self, metric: &str) -> Option<f64> {
        self.edge_abs.get(metric).copied()
    }

    /// Edge value divided by the metric's maximum magnitude, in `[-1, 1]`.
    pub fn normalize_edge(&self, metric: &str, value: f64) -> Result<f64, ScaleError> {
        let scale = checked_scale(metric, self.edge_scale(metric))?;
        Ok(value / scale)
    }

    /// Node circle size: `|value| / |max| * 30 + 4`.
    pub fn visual_degree(&self, metric: &str, value: f64) -> Result<f64, ScaleError> {
        let max = checked_scale(metric, self.node_max.get(metric).map(|max| max.abs()))?;
        Ok(value.abs() / max * VISUAL_DEGREE_SPAN + MIN_VISUAL_DEGREE)
    }

    /// Maps raw node thresholds to the normalized scale. The reserved
    /// `default` key scales against the node default column. Keys that name
    /// no declared column are dropped.
    pub fn normalize_node_thresholds(&self, raw: &Threshold) -> Result<Threshold, ScaleError> {
        let mut normalized = Threshold::new();
        for (key, &value) in raw {
            let column = if key == DEFAULT_METRIC_KEY {
                self.node_default.as_str()
            } else {
                key.as_str()
            };
            let Some(scale) = self.node_scale(column) else {
                tracing::debug!("Ignoring node threshold for undeclared metric '{}'", key);
                continue;
            };
            normalized.insert(key.clone(), value / checked_scale(column, Some(scale))?);
        }
        Ok(normalized)
    }

    /// Maps raw link thresholds to the normalized scale. The `default` key
    /// and the node default column name both scale against the edge default
    /// column, which is tracked independently of the node default.
    pub fn normalize_link_thresholds(&self, raw: &Threshold) -> Result<Threshold, ScaleError> {
        let mut normalized = Threshold::new();
        for (key, &value) in raw {
            let column = if key == DEFAULT_METRIC_KEY || *key == self.node_default {
                self.edge_default.as_str()
            } else {
                key.as_str()
            };
            let Some(scale) = self.edge_scale(column) else {
                tracing::debug!("Ignoring link threshold for undeclared metric '{}'", key);
                continue;
            };
            normalized.insert(key.clone(), value / checked_scale(column, Some(scale))?);
        }
        Ok(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventflow_core::{EdgeRecord, EdgeSchema, NodeRecord, NodeSchema};
    use proptest::prelude::*;

    fn lists(node_values: &[f64], edge_values: &[f64]) -> (NodeList, EdgeList) {
        let metrics = vec!["events".to_string(), "cases".to_string()];
        let nodes = NodeList::from_records(
            NodeSchema::new("event", &metrics, "events"),
            node_values.iter().enumerate().map(|(i, &v)| {
                NodeRecord::new(format!("n{i}"))
                    .with_metric("events", v)
                    .with_metric("cases", 0.0)
            }),
        );
        let edges = EdgeList::new(
            EdgeSchema::new(metrics, "cases"),
            edge_values
                .iter()
                .enumerate()
                .map(|(i, &v)| {
                    EdgeRecord::new(format!("n{i}"), "n0")
                        .with_metric("events", v * 2.0)
                        .with_metric("cases", v)
                })
                .collect(),
        );
        (nodes, edges)
    }

    #[test]
    fn test_default_node_threshold_scales_against_default_column() {
        let (nodes, edges) = lists(&[10.0, 4.0, -2.0], &[1.0]);
        let table = ScaleTable::from_lists(&nodes, &edges);
        let raw = Threshold::from([("default".to_string(), 5.0)]);

        let normalized = table.normalize_node_thresholds(&raw).unwrap();
        assert_eq!(normalized["default"], 0.5);
    }

    #[test]
    fn test_link_threshold_on_node_default_uses_edge_default() {
        let (nodes, edges) = lists(&[1.0], &[4.0, 8.0]);
        let table = ScaleTable::from_lists(&nodes, &edges);
        // Node default is `events`, edge default is `cases` (max 8).
        let raw = Threshold::from([("events".to_string(), 2.0), ("default".to_string(), 4.0)]);

        let normalized = table.normalize_link_thresholds(&raw).unwrap();
        assert_eq!(normalized["events"], 0.25);
        assert_eq!(normalized["default"], 0.5);
    }

    #[test]
    fn test_zero_scale_is_an_error_only_when_requested() {
        let (nodes, edges) = lists(&[3.0, 1.0], &[1.0]);
        let table = ScaleTable::from_lists(&nodes, &edges);

        assert!(table.normalize_node_thresholds(&Threshold::new()).is_ok());
        let raw = Threshold::from([("cases".to_string(), 1.0)]);
        assert_eq!(
            table.normalize_node_thresholds(&raw),
            Err(ScaleError::zero_scale("cases"))
        );
    }

    #[test]
    fn test_undeclared_threshold_keys_are_ignored() {
        let (nodes, edges) = lists(&[3.0], &[1.0]);
        let table = ScaleTable::from_lists(&nodes, &edges);
        let raw = Threshold::from([("revenue".to_string(), 1.0)]);

        assert!(table.normalize_node_thresholds(&raw).unwrap().is_empty());
        assert!(table.normalize_link_thresholds(&raw).unwrap().is_empty());
    }

    #[test]
    fn test_visual_degree_range() {
        let (nodes, edges) = lists(&[10.0, 5.0, 0.0], &[1.0]);
        let table = ScaleTable::from_lists(&nodes, &edges);

        assert_eq!(table.visual_degree("events", 10.0).unwrap(), 34.0);
        assert_eq!(table.visual_degree("events", 5.0).unwrap(), 19.0);
        assert_eq!(table.visual_degree("events", 0.0).unwrap(), 4.0);
        assert!(table.visual_degree("cases", 0.0).is_err());
    }

    proptest! {
        #[test]
        fn prop_edge_normalization_is_bounded(
            values in proptest::collection::vec(-1000.0f64..1000.0, 1..20)
        ) {
            prop_assume!(values.iter().any(|v| v.abs() > 1e-9));
            let (nodes, edges) = lists(&[1.0], &values);
            let table = ScaleTable::from_lists(&nodes, &edges);

            let normalized: Vec<f64> = values
                .iter()
                .map(|&v| table.normalize_edge("cases", v).unwrap())
                .collect();

            prop_assert!(normalized.iter().all(|n| n.abs() <= 1.0));
            prop_assert!(normalized.iter().any(|n| n.abs() == 1.0));
        }
    }
}
