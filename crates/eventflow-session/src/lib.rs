use eventflow_core::{
    EdgeList, EventRecord, GraphSettings, LayoutPosition, NodeEdit, NodeList, NodeParams,
    ScaleError, SessionRequest, Threshold,
};
use eventflow_graph::{
    Canvas, Explorer, GraphPayload, GraphRecomputer, LayoutEngine, LayoutOverride,
    PayloadBuilder, PreparedLink, PreparedNode, ScaleTable, SpringLayoutConfig,
    TransitionExplorer,
};
use serde::{Deserialize, Serialize};

pub mod config;
pub mod event_log;
pub mod export;

pub use config::{LogColumns, SessionConfig, TargetEvents};
pub use event_log::{events_from_rows, load_event_log};
pub use export::{export_snapshot, snapshot_file_name};

/// Per-render overrides of the stored display settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOptions {
    pub canvas: Canvas,
    pub targets: Option<NodeParams>,
    pub show_weights: Option<bool>,
    pub show_percents: Option<bool>,
    pub show_nodes_names: Option<bool>,
    pub show_all_edges_for_targets: Option<bool>,
    pub show_nodes_without_links: Option<bool>,
    /// Raw thresholds used when the stored settings carry none.
    pub nodes_threshold: Option<Threshold>,
    pub links_threshold: Option<Threshold>,
}

/// Everything a rendering template needs for one full graph view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderPayload {
    pub nodes: Vec<PreparedNode>,
    pub links: Vec<PreparedLink>,
    pub node_params: NodeParams,
    pub settings: GraphSettings,
    pub nodes_threshold: Option<Threshold>,
    pub links_threshold: Option<Threshold>,
    /// Metric names shared by node sizes and link weights.
    pub metric_columns: Vec<String>,
    /// Whether a manual layout was applied.
    pub layout_dump: bool,
    pub width: f64,
    pub height: f64,
}

/// Live state of one graph visualization.
///
/// The session is the only owner of its node list, edge list and layout
/// override. Requests are handled one at a time and every payload handed out
/// is an independent copy.
pub struct GraphSession<E: Explorer = TransitionExplorer> {
    explorer: E,
    log: Vec<EventRecord>,
    nodes: NodeList,
    edges: EdgeList,
    layout: Option<LayoutOverride>,
    settings: GraphSettings,
    spring: SpringLayoutConfig,
    node_params: NodeParams,
}

impl GraphSession<TransitionExplorer> {
    pub fn from_config(config: &SessionConfig, log: Vec<EventRecord>) -> Self {
        let explorer = TransitionExplorer::new(config.explorer.clone());
        Self::from_log(explorer, log)
            .with_spring_config(config.spring)
            .with_node_params(config.targets.node_params())
    }
}

impl<E: Explorer> GraphSession<E> {
    pub fn new(explorer: E, log: Vec<EventRecord>, nodes: NodeList, edges: EdgeList) -> Self {
        Self {
            explorer,
            log,
            nodes,
            edges,
            layout: None,
            settings: GraphSettings::default(),
            spring: SpringLayoutConfig::default(),
            node_params: NodeParams::default(),
        }
    }

    /// Starts a session with the explorer's initial node and edge lists.
    pub fn from_log(explorer: E, log: Vec<EventRecord>) -> Self {
        let nodes = explorer.create_node_list(&log);
        let edges = explorer.create_edge_list(&log);
        Self::new(explorer, log, nodes, edges)
    }

    pub fn with_layout(mut self, positions: &[LayoutPosition]) -> Self {
        self.apply_layout_edits(positions);
        self
    }

    pub fn with_settings(mut self, settings: GraphSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_spring_config(mut self, spring: SpringLayoutConfig) -> Self {
        self.spring = spring;
        self
    }

    pub fn with_node_params(mut self, node_params: NodeParams) -> Self {
        self.node_params = node_params;
        self
    }

    pub fn nodes(&self) -> &NodeList {
        &self.nodes
    }

    pub fn edges(&self) -> &EdgeList {
        &self.edges
    }

    pub fn layout(&self) -> Option<&LayoutOverride> {
        self.layout.as_ref()
    }

    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    fn apply_edits_to(nodes: &mut NodeList, edits: &[NodeEdit]) {
        for edit in edits {
            let record = match nodes.get(&edit.name) {
                Some(existing) => {
                    let mut record = existing.clone();
                    record.active = edit.active;
                    record.parent = edit.parent.clone();
                    if let Some(changed_name) = &edit.changed_name {
                        record.changed_name = changed_name.clone();
                    }
                    for (metric, degree) in &edit.degree {
                        if nodes.schema().has_metric(metric) {
                            record.metrics.insert(metric.clone(), degree.source);
                        } else {
                            tracing::debug!(
                                "Ignoring undeclared metric '{}' in edit of '{}'",
                                metric,
                                edit.name
                            );
                        }
                    }
                    record
                }
                None => {
                    tracing::debug!("Inserting node '{}' created by the client", edit.name);
                    nodes.schema().build_record(edit)
                }
            };
            nodes.insert(record);
        }
    }

    /// Merges client edits into the node list without recomputing.
    pub fn apply_node_edits(&mut self, edits: &[NodeEdit]) {
        Self::apply_edits_to(&mut self.nodes, edits);
    }

    /// Replaces the manual layout with exactly these positions.
    pub fn apply_layout_edits(&mut self, positions: &[LayoutPosition]) {
        self.layout = Some(LayoutOverride::from_positions(positions));
    }

    /// Replaces the stored settings wholesale.
    pub fn apply_settings(&mut self, settings: GraphSettings) {
        self.settings = settings;
    }

    fn normalized_thresholds(
        scales: &ScaleTable,
        nodes_threshold: Option<&Threshold>,
        links_threshold: Option<&Threshold>,
    ) -> Result<(Option<Threshold>, Option<Threshold>), ScaleError> {
        let nodes = nodes_threshold
            .map(|raw| scales.normalize_node_thresholds(raw))
            .transpose()?;
        let links = links_threshold
            .map(|raw| scales.normalize_link_thresholds(raw))
            .transpose()?;
        Ok((nodes, links))
    }

    /// Applies the edits and rebuilds nodes and links from the raw log.
    ///
    /// Links are all styled `suit` and no layout is computed. On error the
    /// session keeps its previous node list, edge list and edits.
    pub fn recalculate(&mut self, edits: &[NodeEdit]) -> Result<GraphPayload, ScaleError> {
        let mut staged = self.nodes.clone();
        Self::apply_edits_to(&mut staged, edits);

        let recomputed = GraphRecomputer::new(&self.explorer).recompute(&self.log, &staged);
        let scales = ScaleTable::from_lists(&recomputed.nodes, &recomputed.edges);
        Self::normalized_thresholds(
            &scales,
            self.settings.nodes_threshold.as_ref(),
            self.settings.links_threshold.as_ref(),
        )?;
        let build = PayloadBuilder::new(&scales).build(&recomputed.nodes, &recomputed.edges)?;

        self.nodes = recomputed.nodes;
        self.edges = recomputed.edges;
        tracing::info!(
            "Recalculated {} nodes and {} links ({} edges dropped)",
            build.payload.nodes.len(),
            build.payload.links.len(),
            build.dropped_edges
        );
        Ok(build.payload)
    }

    fn merged_settings(&self, options: &RenderOptions) -> GraphSettings {
        let mut settings = self.settings.clone();
        let toggles = [
            (&mut settings.show_weights, options.show_weights),
            (&mut settings.show_percents, options.show_percents),
            (&mut settings.show_nodes_names, options.show_nodes_names),
            (
                &mut settings.show_all_edges_for_targets,
                options.show_all_edges_for_targets,
            ),
            (
                &mut settings.show_nodes_without_links,
                options.show_nodes_without_links,
            ),
        ];
        for (stored, requested) in toggles {
            if requested.is_some() {
                *stored = requested;
            }
        }
        settings
    }

    /// Full view: layout, classification and normalized thresholds.
    ///
    /// Stored thresholds take precedence over the ones in `options`.
    pub fn render(&self, options: &RenderOptions) -> Result<RenderPayload, ScaleError> {
        let settings = self.merged_settings(options);
        let node_params = options.targets.as_ref().unwrap_or(&self.node_params);
        let scales = ScaleTable::from_lists(&self.nodes, &self.edges);

        let (nodes_threshold, links_threshold) = Self::normalized_thresholds(
            &scales,
            settings
                .nodes_threshold
                .as_ref()
                .or(options.nodes_threshold.as_ref()),
            settings
                .links_threshold
                .as_ref()
                .or(options.links_threshold.as_ref()),
        )?;

        let engine = LayoutEngine::spring(self.spring, options.canvas);
        let positions = engine.compute(
            &self.edges,
            &self.edges.schema().default_metric,
            self.layout.as_ref(),
        )?;

        let build = PayloadBuilder::new(&scales)
            .with_node_params(node_params)
            .with_positions(&positions)
            .build(&self.nodes, &self.edges)?;

        tracing::info!(
            "Rendered graph with {} nodes and {} links",
            build.payload.nodes.len(),
            build.payload.links.len()
        );

        Ok(RenderPayload {
            nodes: build.payload.nodes,
            links: build.payload.links,
            node_params: node_params.clone(),
            settings,
            nodes_threshold,
            links_threshold,
            metric_columns: self
                .nodes
                .schema()
                .metric_columns()
                .map(str::to_string)
                .collect(),
            layout_dump: self.layout.is_some(),
            width: options.canvas.width,
            height: options.canvas.height,
        })
    }

    /// Dispatches one transport message. Only recalculation yields a payload.
    pub fn handle(&mut self, request: SessionRequest) -> Result<Option<GraphPayload>, ScaleError> {
        match request {
            SessionRequest::SaveNodelist(edits) => {
                self.apply_node_edits(&edits);
                Ok(None)
            }
            SessionRequest::Recalculate(edits) => self.recalculate(&edits).map(Some),
            SessionRequest::SaveLayout(positions) => {
                self.apply_layout_edits(&positions);
                Ok(None)
            }
            SessionRequest::SaveGraphSettings(settings) => {
                self.apply_settings(settings);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use eventflow_core::NodeRecord;

    fn event(name: &str, case: &str, seconds: i64) -> EventRecord {
        EventRecord::new(name, case, Utc.timestamp_opt(seconds, 0).unwrap())
    }

    fn session() -> GraphSession {
        let log = vec![
            event("start", "u1", 1),
            event("view", "u1", 2),
            event("buy", "u1", 3),
            event("start", "u2", 1),
            event("view", "u2", 2),
            event("exit", "u2", 3),
        ];
        GraphSession::from_log(TransitionExplorer::default(), log)
    }

    #[test]
    fn test_apply_node_edits_updates_existing_row() {
        let mut session = session();
        let mut edit = NodeEdit::new("view", false)
            .with_parent("start")
            .with_degree("events", 42.0)
            .with_degree("unknown", 1.0);
        edit.changed_name = Some(Some("Browse".to_string()));

        session.apply_node_edits(&[edit]);

        let view = session.nodes().get("view").unwrap();
        assert!(!view.active);
        assert_eq!(view.parent.as_deref(), Some("start"));
        assert_eq!(view.changed_name.as_deref(), Some("Browse"));
        assert_eq!(view.metric("events"), Some(42.0));
        assert_eq!(view.metric("unknown"), None);
    }

    #[test]
    fn test_absent_changed_name_keeps_previous_value() {
        let mut session = session();
        let mut rename = NodeEdit::new("view", true);
        rename.changed_name = Some(Some("Browse".to_string()));
        session.apply_node_edits(&[rename]);

        session.apply_node_edits(&[NodeEdit::new("view", true)]);
        assert_eq!(
            session.nodes().get("view").unwrap().changed_name.as_deref(),
            Some("Browse")
        );

        let mut clear = NodeEdit::new("view", true);
        clear.changed_name = Some(None);
        session.apply_node_edits(&[clear]);
        assert_eq!(session.nodes().get("view").unwrap().changed_name, None);
    }

    #[test]
    fn test_apply_node_edits_inserts_client_node() {
        let mut session = session();
        session.apply_node_edits(&[NodeEdit::new("funnel", true).with_degree("events", 3.0)]);

        let funnel = session.nodes().get("funnel").unwrap();
        assert_eq!(funnel.metric("events"), Some(3.0));
        assert_eq!(funnel.metric("cases"), None);
        assert_eq!(session.nodes().len(), 5);
    }

    #[test]
    fn test_layout_edits_replace_previous_override() {
        let mut session = session();
        session.apply_layout_edits(&[
            LayoutPosition::new("start", 1.0, 2.0),
            LayoutPosition::new("view", 3.0, 4.0),
        ]);
        session.apply_layout_edits(&[LayoutPosition::new("buy", 5.0, 6.0)]);

        let layout = session.layout().unwrap();
        assert_eq!(layout.len(), 1);
        assert!(layout.get("start").is_none());
    }

    #[test]
    fn test_settings_are_overwritten_wholesale() {
        let mut session = session();
        session.apply_settings(GraphSettings {
            show_weights: Some(true),
            nodes_threshold: Some(Threshold::from([("default".to_string(), 1.0)])),
            ..Default::default()
        });
        session.apply_settings(GraphSettings {
            show_percents: Some(false),
            ..Default::default()
        });

        assert_eq!(session.settings().show_weights, None);
        assert_eq!(session.settings().nodes_threshold, None);
        assert_eq!(session.settings().show_percents, Some(false));
    }

    #[test]
    fn test_recalculate_groups_and_styles_links_as_suit() {
        let mut session = session();
        let payload = session
            .recalculate(&[NodeEdit::new("buy", true).with_parent("exit")])
            .unwrap();

        let links = payload.link_names();
        assert!(links.contains(&("view", "exit")));
        assert!(links.iter().all(|&(s, t)| s != "buy" && t != "buy"));
        assert!(payload.links.iter().all(|l| l.link_type == "suit"));
        assert!(payload.nodes.iter().all(|n| n.x.is_none()));
        let view_exit = session
            .edges()
            .iter()
            .find(|e| e.source == "view" && e.target == "exit")
            .unwrap();
        assert_eq!(view_exit.metric("events"), Some(2.0));
    }

    #[test]
    fn test_recalculate_failure_leaves_state_unchanged() {
        let explorer = TransitionExplorer::default();
        let log = vec![event("A", "u1", 1), event("B", "u1", 2)];
        let nodes = NodeList::from_records(
            explorer.node_schema(),
            [NodeRecord::new("A"), NodeRecord::new("B")],
        );
        let edges = explorer.create_edge_list(&log);
        let mut session = GraphSession::new(explorer, log, nodes, edges).with_settings(
            GraphSettings {
                links_threshold: Some(Threshold::from([("default".to_string(), 1.0)])),
                ..Default::default()
            },
        );
        let nodes_before = session.nodes().clone();
        let edges_before = session.edges().clone();

        // Hiding B leaves no transitions, so the link scale collapses to zero.
        let result = session.recalculate(&[NodeEdit::new("B", false)]);

        assert_eq!(result, Err(ScaleError::zero_scale("events")));
        assert_eq!(session.nodes(), &nodes_before);
        assert_eq!(session.edges(), &edges_before);
        assert!(session.nodes().get("B").unwrap().active);
    }

    #[test]
    fn test_render_applies_layout_classification_and_thresholds() {
        let mut session = session()
            .with_node_params(NodeParams::from_events(Some("buy"), Some("exit"), Some("start")));
        session.apply_layout_edits(&[LayoutPosition::new("view", 12.0, 34.0)]);
        session.apply_settings(GraphSettings {
            show_weights: Some(false),
            nodes_threshold: Some(Threshold::from([("default".to_string(), 1.0)])),
            ..Default::default()
        });

        let options = RenderOptions {
            show_weights: Some(true),
            nodes_threshold: Some(Threshold::from([("default".to_string(), 2.0)])),
            links_threshold: Some(Threshold::from([("events".to_string(), 1.0)])),
            ..Default::default()
        };
        let rendered = session.render(&options).unwrap();

        assert!(rendered.layout_dump);
        assert_eq!(rendered.settings.show_weights, Some(true));
        // Stored threshold wins; `start` and `view` both have 2 events.
        assert_eq!(rendered.nodes_threshold.unwrap()["default"], 0.5);
        assert_eq!(rendered.links_threshold.unwrap()["events"], 0.5);

        let view = rendered.nodes.iter().find(|n| n.name == "view").unwrap();
        assert_eq!((view.x, view.y), (Some(12.0), Some(34.0)));
        let canvas = options.canvas;
        for node in rendered.nodes.iter().filter(|n| n.name != "view") {
            let (x, y) = (node.x.unwrap(), node.y.unwrap());
            assert!(canvas.contains(eventflow_graph::Vec2::new(x, y)));
        }
        let start = rendered.nodes.iter().find(|n| n.name == "start").unwrap();
        assert_eq!(start.node_type, "source_node");
        assert!(rendered.links.iter().any(|l| l.link_type == "source"));
        assert!(rendered.links.iter().any(|l| l.link_type == "nice_target"));
        assert_eq!(rendered.metric_columns, vec!["events", "cases"]);
    }

    #[test]
    fn test_handle_dispatches_requests() {
        let mut session = session();
        let saved = session
            .handle(SessionRequest::SaveLayout(vec![LayoutPosition::new("buy", 1.0, 1.0)]))
            .unwrap();
        assert!(saved.is_none());
        assert!(session.layout().is_some());

        let recalculated = session
            .handle(SessionRequest::Recalculate(vec![NodeEdit::new("exit", false)]))
            .unwrap()
            .unwrap();
        assert!(recalculated
            .link_names()
            .iter()
            .all(|&(s, t)| s != "exit" && t != "exit"));
    }
}
