use crate::{GraphSettings, LayoutPosition, NodeEdit};
use serde::{Deserialize, Serialize};

/// Messages delivered by the front-end transport, one at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum SessionRequest {
    SaveNodelist(Vec<NodeEdit>),
    Recalculate(Vec<NodeEdit>),
    SaveLayout(Vec<LayoutPosition>),
    SaveGraphSettings(GraphSettings),
}
