use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
        }
    }
}

/// A rescale that would divide by zero.
///
/// Fatal to the request that triggered it: the rendered graph cannot recover
/// from non-finite weights or coordinates.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScaleError {
    #[error("Cannot normalize metric '{metric}': maximum absolute value is zero")]
    ZeroScale { metric: String },
    #[error("Layout bounding box has zero extent along the {axis} axis")]
    DegenerateLayout { axis: Axis },
}

impl ScaleError {
    pub fn zero_scale(metric: impl Into<String>) -> Self {
        Self::ZeroScale {
            metric: metric.into(),
        }
    }
}
