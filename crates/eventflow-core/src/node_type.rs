use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Rendering class of an event node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeClass {
    NiceTarget,
    BadTarget,
    Source,
    Suit,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid node class label: {0}")]
pub struct UnknownNodeClass(pub String);

impl NodeClass {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeClass::NiceTarget => "nice_target",
            NodeClass::BadTarget => "bad_target",
            NodeClass::Source => "source",
            NodeClass::Suit => "suit",
        }
    }

    /// Front-end node type, e.g. `nice_target_node`.
    pub fn node_type(self) -> String {
        format!("{}_node", self.as_str())
    }
}

impl TryFrom<&str> for NodeClass {
    type Error = UnknownNodeClass;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "nice_target" | "green" => Ok(NodeClass::NiceTarget),
            "bad_target" | "red" => Ok(NodeClass::BadTarget),
            "source" => Ok(NodeClass::Source),
            "suit" => Ok(NodeClass::Suit),
            _ => Err(UnknownNodeClass(value.to_string())),
        }
    }
}

/// Classification of event names; unlisted names are `suit`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeParams(BTreeMap<String, NodeClass>);

impl NodeParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds params from user supplied labels (`green`/`red` are accepted as
    /// legacy aliases of the target classes).
    pub fn from_targets<'a>(
        targets: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, UnknownNodeClass> {
        let mut params = Self::new();
        for (event, label) in targets {
            params.insert(event, NodeClass::try_from(label)?);
        }
        Ok(params)
    }

    pub fn from_events(
        positive_target: Option<&str>,
        negative_target: Option<&str>,
        source: Option<&str>,
    ) -> Self {
        let mut params = Self::new();
        let configured = [
            (positive_target, NodeClass::NiceTarget),
            (negative_target, NodeClass::BadTarget),
            (source, NodeClass::Source),
        ];
        for (event, class) in configured {
            if let Some(event) = event {
                params.insert(event, class);
            }
        }
        params
    }

    pub fn insert(&mut self, event: impl Into<String>, class: NodeClass) {
        self.0.insert(event.into(), class);
    }

    pub fn get(&self, event: &str) -> Option<NodeClass> {
        self.0.get(event).copied()
    }

    pub fn class_of(&self, event: &str) -> NodeClass {
        self.get(event).unwrap_or(NodeClass::Suit)
    }

    /// Edges leaving a source event are styled as `source`; every other
    /// edge takes the class of its target.
    pub fn edge_type(&self, source: &str, target: &str) -> &'static str {
        if self.get(source) == Some(NodeClass::Source) {
            return NodeClass::Source.as_str();
        }
        self.class_of(target).as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_color_labels() {
        let params = NodeParams::from_targets([("buy", "green"), ("churn", "red")]).unwrap();
        assert_eq!(params.get("buy"), Some(NodeClass::NiceTarget));
        assert_eq!(params.get("churn"), Some(NodeClass::BadTarget));
        assert_eq!(params.class_of("view"), NodeClass::Suit);
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        let err = NodeParams::from_targets([("buy", "purple")]).unwrap_err();
        assert_eq!(err, UnknownNodeClass("purple".to_string()));
    }

    #[test]
    fn test_edge_type() {
        let params = NodeParams::from_events(Some("buy"), Some("churn"), Some("start"));
        assert_eq!(params.edge_type("start", "buy"), "source");
        assert_eq!(params.edge_type("view", "buy"), "nice_target");
        assert_eq!(params.edge_type("view", "churn"), "bad_target");
        assert_eq!(params.edge_type("view", "cart"), "suit");
        assert_eq!(NodeClass::Suit.node_type(), "suit_node");
    }
}
