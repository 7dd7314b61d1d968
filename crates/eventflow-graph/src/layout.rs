use crate::graph::{FlowGraph, NodeIndex, Vec2};
use eventflow_core::{Axis, EdgeList, LayoutPosition, ScaleError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Final node positions in canvas pixels, keyed by node name.
pub type Positions = BTreeMap<String, Vec2>;

pub trait Layouter {
    /// Raw positions in the layouter's own coordinate space.
    fn execute(&self, graph: &FlowGraph) -> HashMap<NodeIndex, Vec2>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringLayoutConfig {
    /// Optimal distance between nodes.
    pub k: f64,
    pub iterations: usize,
    /// Stop once the mean displacement of an iteration drops below this.
    pub threshold: f64,
    pub seed: u64,
}

impl Default for SpringLayoutConfig {
    fn default() -> Self {
        Self {
            k: 0.1,
            iterations: 300,
            threshold: 1e-4,
            seed: 0,
        }
    }
}

/// Fruchterman-Reingold spring simulation with a seeded start.
///
/// Attraction along an edge is proportional to its weight; every pair of
/// nodes repels. The temperature cools linearly from a tenth of the initial
/// extent, so a fixed seed always yields the same layout.
#[derive(Debug, Clone, Default)]
pub struct SpringLayouter {
    pub config: SpringLayoutConfig,
}

impl SpringLayouter {
    const MIN_DISTANCE: f64 = 0.01;
    const MIN_DISPLACEMENT: f64 = 0.01;
    const STALLED_DISPLACEMENT: f64 = 0.1;

    pub fn new(config: SpringLayoutConfig) -> Self {
        Self { config }
    }

    fn initial_positions(&self, node_count: usize) -> Vec<Vec2> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        (0..node_count)
            .map(|_| Vec2::new(rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0)))
            .collect()
    }

    fn initial_temperature(positions: &[Vec2]) -> f64 {
        let (min, max) = bounding_box(positions.iter().copied());
        (max.x - min.x).max(max.y - min.y) * 0.1
    }

    /// Net force on every node for the current positions.
    fn displacements(&self, positions: &[Vec2], adjacency: &[Vec<f64>]) -> Vec<Vec2> {
        let k = self.config.k;
        positions
            .par_iter()
            .enumerate()
            .map(|(i, &pi)| {
                let mut displacement = Vec2::ZERO;
                for (j, &pj) in positions.iter().enumerate() {
                    if i == j {
                        continue;
                    }
                    let delta = pi - pj;
                    let distance = delta.length().max(Self::MIN_DISTANCE);
                    let force = k * k / (distance * distance) - adjacency[i][j] * distance / k;
                    displacement += delta * force;
                }
                displacement
            })
            .collect()
    }
}

impl Layouter for SpringLayouter {
    fn execute(&self, graph: &FlowGraph) -> HashMap<NodeIndex, Vec2> {
        let node_count = graph.node_count();
        let mut positions = self.initial_positions(node_count);

        if node_count > 1 {
            let adjacency = graph.adjacency_matrix();
            let mut temperature = Self::initial_temperature(&positions);
            let cooling = temperature / (self.config.iterations as f64 + 1.0);

            for iteration in 0..self.config.iterations {
                let displacements = self.displacements(&positions, &adjacency);

                let mut moved_squared = 0.0;
                for (position, displacement) in positions.iter_mut().zip(displacements) {
                    let mut length = displacement.length();
                    if length < Self::MIN_DISPLACEMENT {
                        length = Self::STALLED_DISPLACEMENT;
                    }
                    let step = displacement * (temperature / length);
                    moved_squared += step.x * step.x + step.y * step.y;
                    *position += step;
                }
                temperature -= cooling;

                if moved_squared.sqrt() / (node_count as f64) < self.config.threshold {
                    tracing::debug!("Spring layout converged after {} iterations", iteration + 1);
                    break;
                }
            }
        }

        graph.node_indices().zip(positions).collect()
    }
}

/// Drawing area; computed positions keep a fixed margin from its border.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}

impl Canvas {
    pub const MARGIN_X: f64 = 75.0;
    pub const MARGIN_Y: f64 = 50.0;

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= Self::MARGIN_X
            && point.x <= self.width - Self::MARGIN_X
            && point.y >= Self::MARGIN_Y
            && point.y <= self.height - Self::MARGIN_Y
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(960.0, 900.0)
    }
}

/// Manually dragged node positions, stored verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutOverride(BTreeMap<String, Vec2>);

impl LayoutOverride {
    pub fn from_positions(positions: &[LayoutPosition]) -> Self {
        Self(
            positions
                .iter()
                .map(|p| (p.name.clone(), Vec2::new(p.x, p.y)))
                .collect(),
        )
    }

    pub fn get(&self, name: &str) -> Option<Vec2> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Vec2)> {
        self.0.iter().map(|(name, pos)| (name.as_str(), *pos))
    }
}

fn bounding_box(points: impl Iterator<Item = Vec2>) -> (Vec2, Vec2) {
    let mut min = Vec2::new(f64::INFINITY, f64::INFINITY);
    let mut max = Vec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in points {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    (min, max)
}

/// Min-max rescales every position into the canvas minus its margins.
pub fn fit_to_canvas(
    positions: &HashMap<NodeIndex, Vec2>,
    canvas: Canvas,
) -> Result<HashMap<NodeIndex, Vec2>, ScaleError> {
    if positions.is_empty() {
        return Ok(HashMap::new());
    }

    let (min, max) = bounding_box(positions.values().copied());
    let span = max - min;
    if !(span.x > 0.0 && span.x.is_finite()) {
        return Err(ScaleError::DegenerateLayout { axis: Axis::X });
    }
    if !(span.y > 0.0 && span.y.is_finite()) {
        return Err(ScaleError::DegenerateLayout { axis: Axis::Y });
    }

    let inner_width = canvas.width - 2.0 * Canvas::MARGIN_X;
    let inner_height = canvas.height - 2.0 * Canvas::MARGIN_Y;
    Ok(positions
        .iter()
        .map(|(&idx, &p)| {
            let x = (p.x - min.x) / span.x * inner_width + Canvas::MARGIN_X;
            let y = (p.y - min.y) / span.y * inner_height + Canvas::MARGIN_Y;
            (idx, Vec2::new(x, y))
        })
        .collect())
}

/// Computes canvas positions for the nodes of an edge list.
pub struct LayoutEngine<L: Layouter = SpringLayouter> {
    layouter: L,
    canvas: Canvas,
}

impl LayoutEngine<SpringLayouter> {
    pub fn spring(config: SpringLayoutConfig, canvas: Canvas) -> Self {
        Self::new(SpringLayouter::new(config), canvas)
    }
}

impl<L: Layouter> LayoutEngine<L> {
    pub fn new(layouter: L, canvas: Canvas) -> Self {
        Self { layouter, canvas }
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Lays out the graph weighted by `weight_metric`, fits it to the canvas
    /// and then places every overridden node at its stored position.
    pub fn compute(
        &self,
        edges: &EdgeList,
        weight_metric: &str,
        overrides: Option<&LayoutOverride>,
    ) -> Result<Positions, ScaleError> {
        let graph = FlowGraph::from_edge_list(edges, weight_metric);
        let raw = self.layouter.execute(&graph);
        let fitted = fit_to_canvas(&raw, self.canvas)?;

        let mut positions: Positions = fitted
            .into_iter()
            .filter_map(|(idx, pos)| graph.node_name(idx).map(|name| (name.to_string(), pos)))
            .collect();

        if let Some(overrides) = overrides {
            for (name, pos) in overrides.iter() {
                positions.insert(name.to_string(), pos);
            }
        }

        tracing::debug!(
            "Computed layout for {} nodes ({} manual)",
            positions.len(),
            overrides.map_or(0, LayoutOverride::len)
        );
        Ok(positions)
    }
}
