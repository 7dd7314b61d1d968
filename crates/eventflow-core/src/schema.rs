use crate::{NodeEdit, NodeRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    EventName,
    Active,
    Alias,
    Parent,
    ChangedName,
    Metric,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Declared columns of a node list, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSchema {
    fields: Vec<FieldDescriptor>,
    default_metric: String,
}

impl NodeSchema {
    pub fn new(event_column: &str, metrics: &[String], default_metric: &str) -> Self {
        let mut fields = Vec::with_capacity(metrics.len() + 5);
        fields.push(FieldDescriptor::new(event_column, FieldKind::EventName));
        fields.extend(
            metrics
                .iter()
                .map(|metric| FieldDescriptor::new(metric.as_str(), FieldKind::Metric)),
        );
        fields.push(FieldDescriptor::new("active", FieldKind::Active));
        fields.push(FieldDescriptor::new("alias", FieldKind::Alias));
        fields.push(FieldDescriptor::new("parent", FieldKind::Parent));
        fields.push(FieldDescriptor::new("changed_name", FieldKind::ChangedName));

        Self {
            fields,
            default_metric: default_metric.to_string(),
        }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn event_column(&self) -> &str {
        self.fields
            .iter()
            .find(|field| field.kind == FieldKind::EventName)
            .map(|field| field.name.as_str())
            .unwrap_or("event")
    }

    pub fn metric_columns(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|field| field.kind == FieldKind::Metric)
            .map(|field| field.name.as_str())
    }

    pub fn has_metric(&self, metric: &str) -> bool {
        self.metric_columns().any(|column| column == metric)
    }

    pub fn default_metric(&self) -> &str {
        &self.default_metric
    }

    /// Builds a fresh record for a node that has no prior row.
    ///
    /// Every declared field is looked up in the edit; fields the edit does not
    /// carry stay unset and edit metrics that are not declared are ignored.
    pub fn build_record(&self, edit: &NodeEdit) -> NodeRecord {
        let mut record = NodeRecord {
            name: String::new(),
            active: false,
            parent: None,
            alias: None,
            changed_name: None,
            metrics: Default::default(),
        };

        for field in &self.fields {
            match field.kind {
                FieldKind::EventName => record.name = edit.name.clone(),
                FieldKind::Active => record.active = edit.active,
                FieldKind::Alias => record.alias = edit.alias.clone(),
                FieldKind::Parent => record.parent = edit.parent.clone(),
                FieldKind::ChangedName => record.changed_name = edit.changed_name.clone().flatten(),
                FieldKind::Metric => {
                    if let Some(degree) = edit.degree.get(&field.name) {
                        record.metrics.insert(field.name.clone(), degree.source);
                    }
                }
            }
        }

        record
    }
}

/// Declared metric columns of an edge list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSchema {
    pub default_metric: String,
    pub metrics: Vec<String>,
}

impl EdgeSchema {
    pub fn new(metrics: Vec<String>, default_metric: &str) -> Self {
        Self {
            default_metric: default_metric.to_string(),
            metrics,
        }
    }

    pub fn has_metric(&self, metric: &str) -> bool {
        self.metrics.iter().any(|column| column == metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> NodeSchema {
        NodeSchema::new("event", &["events".to_string(), "cases".to_string()], "events")
    }

    #[test]
    fn test_schema_field_order() {
        let kinds: Vec<FieldKind> = schema().fields().iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FieldKind::EventName,
                FieldKind::Metric,
                FieldKind::Metric,
                FieldKind::Active,
                FieldKind::Alias,
                FieldKind::Parent,
                FieldKind::ChangedName,
            ]
        );
        assert_eq!(schema().event_column(), "event");
        assert!(schema().has_metric("cases"));
        assert!(!schema().has_metric("active"));
    }

    #[test]
    fn test_build_record_fills_declared_fields_only() {
        let mut edit = NodeEdit::new("group_1", true)
            .with_degree("events", 12.0)
            .with_degree("revenue", 99.0);
        edit.alias = Some("Group".to_string());

        let record = schema().build_record(&edit);

        assert_eq!(record.name, "group_1");
        assert!(record.active);
        assert_eq!(record.alias.as_deref(), Some("Group"));
        assert_eq!(record.changed_name, None);
        assert_eq!(record.metric("events"), Some(12.0));
        // Declared but not sent.
        assert_eq!(record.metric("cases"), None);
        // Sent but not declared.
        assert_eq!(record.metric("revenue"), None);
    }
}
