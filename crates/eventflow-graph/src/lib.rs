pub mod explorer;
pub mod graph;
pub mod layout;
pub mod normalize;
pub mod payload;
pub mod recompute;

pub use explorer::{CASES_METRIC, EVENTS_METRIC, Explorer, ExplorerConfig, TransitionExplorer};
pub use graph::{EdgeIndex, FlowEdge, FlowGraph, NodeIndex, Vec2};
pub use layout::{
    Canvas, LayoutEngine, LayoutOverride, Layouter, Positions, SpringLayoutConfig, SpringLayouter,
    fit_to_canvas,
};
pub use normalize::ScaleTable;
pub use payload::{
    Degree, GraphPayload, PayloadBuild, PayloadBuilder, PreparedLink, PreparedNode, Weight,
};
pub use recompute::{GraphRecomputer, Recomputation};
