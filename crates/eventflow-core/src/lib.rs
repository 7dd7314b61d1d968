use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;

pub mod error;
pub mod node_type;
pub mod protocol;
pub mod schema;

pub use error::{Axis, ScaleError};
pub use node_type::{NodeClass, NodeParams, UnknownNodeClass};
pub use protocol::SessionRequest;
pub use schema::{EdgeSchema, FieldDescriptor, FieldKind, NodeSchema};

/// Per-metric cutoff values keyed by metric name.
pub type Threshold = BTreeMap<String, f64>;

/// Threshold key that always refers to the designated default metric.
pub const DEFAULT_METRIC_KEY: &str = "default";

/// One observed event of the sequence log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event: String,
    pub case_id: String,
    pub timestamp: DateTime<Utc>,
    /// Optional custom metric columns carried by the event.
    #[serde(default)]
    pub extra: BTreeMap<String, f64>,
}

impl EventRecord {
    pub fn new(event: impl Into<String>, case_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            event: event.into(),
            case_id: case_id.into(),
            timestamp,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_extra(mut self, column: impl Into<String>, value: f64) -> Self {
        self.extra.insert(column.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    pub active: bool,
    /// Node this one is grouped under for recomputation.
    pub parent: Option<String>,
    pub alias: Option<String>,
    /// Display-only rename chosen by the user.
    pub changed_name: Option<String>,
    /// Raw metric values; a declared metric may be unset.
    pub metrics: BTreeMap<String, f64>,
}

impl NodeRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
            parent: None,
            alias: None,
            changed_name: None,
            metrics: BTreeMap::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_metric(mut self, metric: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(metric.into(), value);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn metric(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).copied()
    }

    /// Parent name if this node takes part in grouping.
    pub fn group_parent(&self) -> Option<&str> {
        if self.active {
            self.parent.as_deref()
        } else {
            None
        }
    }
}

/// The current set of event-type nodes, keyed by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeList {
    schema: NodeSchema,
    nodes: BTreeMap<String, NodeRecord>,
}

impl NodeList {
    pub fn new(schema: NodeSchema) -> Self {
        Self {
            schema,
            nodes: BTreeMap::new(),
        }
    }

    pub fn from_records(schema: NodeSchema, records: impl IntoIterator<Item = NodeRecord>) -> Self {
        let mut list = Self::new(schema);
        for record in records {
            list.insert(record);
        }
        list
    }

    pub fn schema(&self) -> &NodeSchema {
        &self.schema
    }

    /// Replaces the record stored under the record's name.
    pub fn insert(&mut self, record: NodeRecord) -> Option<NodeRecord> {
        self.nodes.insert(record.name.clone(), record)
    }

    pub fn get(&self, name: &str) -> Option<&NodeRecord> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> btree_map::Values<'_, String, NodeRecord> {
        self.nodes.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Set values of one metric column, skipping nodes where it is unset.
    pub fn metric_values<'a>(&'a self, metric: &'a str) -> impl Iterator<Item = f64> + 'a {
        self.nodes.values().filter_map(move |node| node.metric(metric))
    }
}

impl<'a> IntoIterator for &'a NodeList {
    type Item = &'a NodeRecord;
    type IntoIter = btree_map::Values<'a, String, NodeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One observed transition between two event names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    pub metrics: BTreeMap<String, f64>,
}

impl EdgeRecord {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            metrics: BTreeMap::new(),
        }
    }

    pub fn with_metric(mut self, metric: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(metric.into(), value);
        self
    }

    pub fn metric(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeList {
    schema: EdgeSchema,
    edges: Vec<EdgeRecord>,
}

impl EdgeList {
    pub fn new(schema: EdgeSchema, edges: Vec<EdgeRecord>) -> Self {
        Self { schema, edges }
    }

    pub fn schema(&self) -> &EdgeSchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EdgeRecord> {
        self.edges.iter()
    }

    pub fn metric_values<'a>(&'a self, metric: &'a str) -> impl Iterator<Item = f64> + 'a {
        self.edges.iter().filter_map(move |edge| edge.metric(metric))
    }
}

impl<'a> IntoIterator for &'a EdgeList {
    type Item = &'a EdgeRecord;
    type IntoIter = std::slice::Iter<'a, EdgeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A manually placed node position in canvas pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutPosition {
    pub name: String,
    pub x: f64,
    pub y: f64,
}

impl LayoutPosition {
    pub fn new(name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            name: name.into(),
            x,
            y,
        }
    }
}

/// Display toggles and raw thresholds persisted by the front end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_weights: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_percents: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_nodes_names: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_all_edges_for_targets: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_nodes_without_links: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes_threshold: Option<Threshold>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links_threshold: Option<Threshold>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DegreeEdit {
    pub source: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree: Option<f64>,
}

/// A node as sent back by the front end after a user edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEdit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    pub name: String,
    pub active: bool,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    /// `None` when the field is absent, `Some(None)` for an explicit null.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub changed_name: Option<Option<String>>,
    #[serde(default)]
    pub degree: BTreeMap<String, DegreeEdit>,
}

impl NodeEdit {
    pub fn new(name: impl Into<String>, active: bool) -> Self {
        Self {
            index: None,
            name: name.into(),
            active,
            parent: None,
            alias: None,
            changed_name: None,
            degree: BTreeMap::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_degree(mut self, metric: impl Into<String>, source: f64) -> Self {
        self.degree.insert(
            metric.into(),
            DegreeEdit {
                source,
                degree: None,
            },
        );
        self
    }
}
