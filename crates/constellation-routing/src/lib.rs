//! Constellation Routing Engine
//!
//! Computes routing across a LEO constellation for one simulated instant:
//!
//! - Link feasibility from look-angle stability and range ([`link`])
//! - Time-sliced ISL topology over every satellite pair ([`topology`])
//! - All-pairs shortest paths with a predecessor ("medium") matrix,
//!   distance-weighted or hop-count ([`shortest_path`])
//! - Path reconstruction and id-level route queries ([`route`], [`station`])
//! - Export to adjacency files and petgraph ([`export`])
//!
//! Every query rebuilds the topology from scratch; constellation geometry
//! changes continuously, so nothing is cached across time instants.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use orbital_mechanics::{OrbitalError, SatId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod export;
pub mod link;
pub mod matrix;
pub mod route;
pub mod shortest_path;
pub mod station;
pub mod tolerance;
pub mod topology;

pub use link::{LinkAssessment, LinkEvaluator};
pub use matrix::{AdjacencyMatrix, SquareMatrix};
pub use route::{Route, RouteTable};
pub use shortest_path::ShortestPaths;
pub use station::StationRoute;
pub use tolerance::AerTolerance;
pub use topology::{FaultPolicy, LinkCriteria, LinkFault, Topology, TopologyStats};

/// Routing errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoutingError {
    #[error("Invalid tolerance: {0}")]
    InvalidTolerance(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error(transparent)]
    Orbital(#[from] OrbitalError),
    #[error("Link evaluation {a} <-> {b} failed: {source}")]
    LinkEvaluation {
        a: SatId,
        b: SatId,
        #[source]
        source: OrbitalError,
    },
    #[error("Query cancelled")]
    Cancelled,
    #[error("Corrupt predecessor matrix while reconstructing {from} -> {to}")]
    CorruptPredecessors { from: usize, to: usize },
    #[error("Matrix of size {found} does not match constellation of {expected} satellites")]
    DimensionMismatch { expected: usize, found: usize },
}

pub type Result<T> = std::result::Result<T, RoutingError>;

/// Edge-cost interpretation for the shortest-path pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostModel {
    /// Edge cost is the slant range in km
    #[default]
    Distance,
    /// Every feasible edge costs 1
    HopCount,
}

impl CostModel {
    pub fn edge_cost(&self, range_km: f64) -> f64 {
        match self {
            CostModel::Distance => range_km,
            CostModel::HopCount => 1.0,
        }
    }
}

impl std::str::FromStr for CostModel {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "distance" | "shortest" => Ok(CostModel::Distance),
            "hops" | "hop_count" | "hopcount" => Ok(CostModel::HopCount),
            other => Err(RoutingError::InvalidParameter(format!(
                "unknown cost model '{}'",
                other
            ))),
        }
    }
}

/// Per-query cancellation flag shared between a caller and a running query.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(RoutingError::Cancelled)
        } else {
            Ok(())
        }
    }
}
