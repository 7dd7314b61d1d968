use crate::layout::Positions;
use crate::normalize::ScaleTable;
use eventflow_core::{EdgeList, NodeClass, NodeList, NodeParams, ScaleError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Degree {
    /// Circle size derived from the raw value.
    pub degree: f64,
    pub source: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weight {
    pub weight_norm: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedNode {
    /// Position in this payload only; rebuilds may renumber nodes.
    pub index: usize,
    pub name: String,
    pub degree: BTreeMap<String, Degree>,
    pub changed_name: Option<String>,
    #[serde(rename = "type")]
    pub node_type: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub active: bool,
    pub alias: Option<String>,
    pub parent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedLink {
    #[serde(rename = "sourceIndex")]
    pub source_index: usize,
    #[serde(rename = "targetIndex")]
    pub target_index: usize,
    pub weights: BTreeMap<String, Weight>,
    #[serde(rename = "type")]
    pub link_type: String,
}

/// Renderable nodes and links.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphPayload {
    pub nodes: Vec<PreparedNode>,
    pub links: Vec<PreparedLink>,
}

impl GraphPayload {
    pub fn node(&self, name: &str) -> Option<&PreparedNode> {
        self.nodes.iter().find(|node| node.name == name)
    }

    /// Links as `(source name, target name)` pairs.
    pub fn link_names(&self) -> Vec<(&str, &str)> {
        self.links
            .iter()
            .filter_map(|link| {
                let source = self.nodes.get(link.source_index)?;
                let target = self.nodes.get(link.target_index)?;
                Some((source.name.as_str(), target.name.as_str()))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PayloadBuild {
    pub payload: GraphPayload,
    /// Edges dropped because an endpoint is not in the node list.
    pub dropped_edges: usize,
}

/// Serializes node and edge lists into the front-end payload.
pub struct PayloadBuilder<'a> {
    scales: &'a ScaleTable,
    node_params: Option<&'a NodeParams>,
    positions: Option<&'a Positions>,
}

impl<'a> PayloadBuilder<'a> {
    pub fn new(scales: &'a ScaleTable) -> Self {
        Self {
            scales,
            node_params: None,
            positions: None,
        }
    }

    /// Classifies nodes and edges. Without params every node is `suit_node`
    /// and every link is `suit`.
    pub fn with_node_params(mut self, node_params: &'a NodeParams) -> Self {
        self.node_params = Some(node_params);
        self
    }

    pub fn with_positions(mut self, positions: &'a Positions) -> Self {
        self.positions = Some(positions);
        self
    }

    fn node_class(&self, name: &str) -> NodeClass {
        self.node_params
            .map_or(NodeClass::Suit, |params| params.class_of(name))
    }

    fn link_type(&self, source: &str, target: &str) -> &'static str {
        self.node_params
            .map_or(NodeClass::Suit.as_str(), |params| params.edge_type(source, target))
    }

    fn prepare_nodes(&self, nodes: &NodeList) -> Result<Vec<PreparedNode>, ScaleError> {
        let metrics: Vec<&str> = nodes.schema().metric_columns().collect();
        let mut prepared = Vec::with_capacity(nodes.len());

        for (index, node) in nodes.iter().enumerate() {
            let mut degree = BTreeMap::new();
            for &metric in &metrics {
                let Some(source) = node.metric(metric) else {
                    continue;
                };
                degree.insert(
                    metric.to_string(),
                    Degree {
                        degree: self.scales.visual_degree(metric, source)?,
                        source,
                    },
                );
            }

            let position = self.positions.and_then(|positions| positions.get(&node.name));
            prepared.push(PreparedNode {
                index,
                name: node.name.clone(),
                degree,
                changed_name: node.changed_name.clone(),
                node_type: self.node_class(&node.name).node_type(),
                x: position.map(|p| p.x),
                y: position.map(|p| p.y),
                active: node.active,
                alias: node.alias.clone(),
                parent: node.parent.clone(),
            });
        }

        Ok(prepared)
    }

    /// Weight breakdown of one edge. The default edge metric is published
    /// under the node default column name so one metric key drives both
    /// nodes and links; the remaining edge metrics keep their own names.
    fn weights(&self, metrics: &BTreeMap<String, f64>) -> Result<BTreeMap<String, Weight>, ScaleError> {
        let edge_default = self.scales.edge_default_metric();
        let node_default = self.scales.node_default_metric();
        let mut weights = BTreeMap::new();

        if let Some(&weight) = metrics.get(edge_default) {
            weights.insert(
                node_default.to_string(),
                Weight {
                    weight_norm: self.scales.normalize_edge(edge_default, weight)?,
                    weight,
                },
            );
        }
        for (metric, &weight) in metrics {
            if metric == edge_default || metric == node_default {
                continue;
            }
            weights.insert(
                metric.clone(),
                Weight {
                    weight_norm: self.scales.normalize_edge(metric, weight)?,
                    weight,
                },
            );
        }

        Ok(weights)
    }

    pub fn build(&self, nodes: &NodeList, edges: &EdgeList) -> Result<PayloadBuild, ScaleError> {
        let prepared_nodes = self.prepare_nodes(nodes)?;
        let index_by_name: HashMap<&str, usize> = prepared_nodes
            .iter()
            .map(|node| (node.name.as_str(), node.index))
            .collect();

        let mut links = Vec::with_capacity(edges.len());
        let mut dropped_edges = 0;
        for edge in edges {
            let (Some(&source_index), Some(&target_index)) = (
                index_by_name.get(edge.source.as_str()),
                index_by_name.get(edge.target.as_str()),
            ) else {
                tracing::debug!(
                    "Dropping edge {} -> {}: endpoint missing from node list",
                    edge.source,
                    edge.target
                );
                dropped_edges += 1;
                continue;
            };

            links.push(PreparedLink {
                source_index,
                target_index,
                weights: self.weights(&edge.metrics)?,
                link_type: self.link_type(&edge.source, &edge.target).to_string(),
            });
        }

        Ok(PayloadBuild {
            payload: GraphPayload {
                nodes: prepared_nodes,
                links,
            },
            dropped_edges,
        })
    }
}
