use crate::explorer::Explorer;
use eventflow_core::{EdgeList, EventRecord, NodeList, NodeRecord};
use std::collections::{HashMap, HashSet};

/// Node and edge lists rebuilt from the raw log.
#[derive(Debug, Clone, PartialEq)]
pub struct Recomputation {
    pub nodes: NodeList,
    pub edges: EdgeList,
}

/// Rebuilds metrics after hide/group edits.
///
/// Grouping is resolved one level deep: a node grouped under a node that is
/// itself grouped is relabeled to its direct parent only.
pub struct GraphRecomputer<'a, E: Explorer + ?Sized> {
    explorer: &'a E,
}

impl<'a, E: Explorer + ?Sized> GraphRecomputer<'a, E> {
    pub fn new(explorer: &'a E) -> Self {
        Self { explorer }
    }

    /// Active group members mapped to their parent. Parents that are not in
    /// the node list, and self references, are ignored.
    fn group_parents(nodes: &NodeList) -> HashMap<&str, &str> {
        let mut grouped = HashMap::new();
        for node in nodes {
            let Some(parent) = node.group_parent() else {
                continue;
            };
            if parent == node.name || !nodes.contains(parent) {
                tracing::debug!(
                    "Ignoring grouping of '{}' under unresolved parent '{}'",
                    node.name,
                    parent
                );
                continue;
            }
            grouped.insert(node.name.as_str(), parent);
        }
        grouped
    }

    /// Drops events of inactive nodes and relabels grouped events once.
    fn relabel_log(log: &[EventRecord], nodes: &NodeList) -> Vec<EventRecord> {
        let active: HashSet<&str> = nodes
            .iter()
            .filter(|node| node.active)
            .map(|node| node.name.as_str())
            .collect();
        let grouped = Self::group_parents(nodes);

        log.iter()
            .filter(|event| active.contains(event.event.as_str()))
            .map(|event| {
                let mut event = event.clone();
                if let Some(parent) = grouped.get(event.event.as_str()) {
                    event.event = parent.to_string();
                }
                event
            })
            .collect()
    }

    fn merge_metrics(&self, node: &NodeRecord, fresh: &NodeList, columns: &[String]) -> NodeRecord {
        let mut merged = node.clone();
        let Some(recomputed) = fresh.get(&node.name) else {
            // No surviving events: previous metrics stay in place.
            return merged;
        };
        for column in columns {
            match recomputed.metric(column) {
                Some(value) => {
                    merged.metrics.insert(column.clone(), value);
                }
                None => {
                    merged.metrics.remove(column);
                }
            }
        }
        merged
    }

    pub fn recompute(&self, log: &[EventRecord], nodes: &NodeList) -> Recomputation {
        let relabeled = Self::relabel_log(log, nodes);
        let fresh_nodes = self.explorer.create_node_list(&relabeled);
        let edges = self.explorer.create_edge_list(&relabeled);

        let columns = self.explorer.node_list_columns();
        let merged = NodeList::from_records(
            nodes.schema().clone(),
            nodes
                .iter()
                .map(|node| self.merge_metrics(node, &fresh_nodes, &columns)),
        );

        tracing::info!(
            "Recomputed graph from {} of {} events: {} nodes, {} edges",
            relabeled.len(),
            log.len(),
            merged.len(),
            edges.len()
        );

        Recomputation {
            nodes: merged,
            edges,
        }
    }
}
