use eventflow_core::EdgeList;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::{Add, AddAssign, Index, Mul, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeIndex(pub usize);

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeIndex(pub usize);

impl fmt::Display for EdgeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub source: NodeIndex,
    pub target: NodeIndex,
    pub weight: f64,
}

/// Weighted directed graph over event names.
///
/// Nodes are numbered in first-seen order, which keeps layouts reproducible
/// for a given edge order.
#[derive(Debug, Default, Clone)]
pub struct FlowGraph {
    names: Vec<String>,
    node_map: HashMap<String, NodeIndex>,
    edges: Vec<FlowEdge>,
    edge_map: HashMap<(NodeIndex, NodeIndex), EdgeIndex>,
}

impl FlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph from `(source, target, metric)` triples of an edge list.
    /// Edges where the metric is unset get a zero weight.
    pub fn from_edge_list(edges: &EdgeList, weight_metric: &str) -> Self {
        let mut graph = Self::new();
        for edge in edges {
            let weight = edge.metric(weight_metric).unwrap_or(0.0);
            graph.add_edge(&edge.source, &edge.target, weight);
        }
        graph
    }

    pub fn add_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(name) {
            return idx;
        }
        let idx = NodeIndex(self.names.len());
        self.names.push(name.to_string());
        self.node_map.insert(name.to_string(), idx);
        idx
    }

    /// Adds an edge, creating missing endpoints. A repeated pair keeps the
    /// latest weight.
    pub fn add_edge(&mut self, source: &str, target: &str, weight: f64) -> EdgeIndex {
        let source = self.add_node(source);
        let target = self.add_node(target);

        if let Some(&idx) = self.edge_map.get(&(source, target)) {
            self.edges[idx.0].weight = weight;
            return idx;
        }

        let idx = EdgeIndex(self.edges.len());
        self.edges.push(FlowEdge {
            source,
            target,
            weight,
        });
        self.edge_map.insert((source, target), idx);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.names.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        (0..self.names.len()).map(NodeIndex)
    }

    pub fn edges(&self) -> &[FlowEdge] {
        &self.edges
    }

    pub fn node_index(&self, name: &str) -> Option<NodeIndex> {
        self.node_map.get(name).copied()
    }

    pub fn node_name(&self, index: NodeIndex) -> Option<&str> {
        self.names.get(index.0).map(String::as_str)
    }

    /// Dense weight matrix, `matrix[i][j]` is the weight of `i -> j`.
    pub fn adjacency_matrix(&self) -> Vec<Vec<f64>> {
        let n = self.names.len();
        let mut matrix = vec![vec![0.0; n]; n];
        for edge in &self.edges {
            matrix[edge.source.0][edge.target.0] = edge.weight;
        }
        matrix
    }
}

impl Index<NodeIndex> for FlowGraph {
    type Output = str;
    fn index(&self, index: NodeIndex) -> &Self::Output {
        &self.names[index.0]
    }
}

impl Index<EdgeIndex> for FlowGraph {
    type Output = FlowEdge;
    fn index(&self, index: EdgeIndex) -> &Self::Output {
        &self.edges[index.0]
    }
}
