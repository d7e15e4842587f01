//! Time-sliced ISL topology.
//!
//! One build evaluates every unordered satellite pair once, in parallel, and
//! records the slant range of each feasible link. Both cost models are
//! derived from the same build through [`Topology::adjacency`].

use std::time::Instant;

use orbital_mechanics::{ConstellationShape, LookAngleSource, OrbitalError, SatId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::link::LinkEvaluator;
use crate::matrix::AdjacencyMatrix;
use crate::tolerance::AerTolerance;
use crate::{CancelToken, CostModel, Result, RoutingError};

/// What to do when the propagation service fails for a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Leave the pair unlinked and keep a [`LinkFault`] diagnostic
    #[default]
    Record,
    /// Fail the whole build on the first fault (in index order)
    Abort,
}

/// Link admission parameters for one query.
#[derive(Debug, Clone)]
pub struct LinkCriteria {
    pub tolerance: AerTolerance,
    /// Pointing/re-acquisition time the geometry must stay stable for
    pub acquisition_delay_s: f64,
    pub fault_policy: FaultPolicy,
}

/// A pair that could not be evaluated, distinct from a rejected link.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkFault {
    pub a: SatId,
    pub b: SatId,
    pub error: OrbitalError,
}

enum PairOutcome {
    Linked(f64),
    Rejected,
    Fault(OrbitalError),
}

/// Feasible ISLs of the whole constellation at one instant.
#[derive(Debug, Clone)]
pub struct Topology {
    shape: ConstellationShape,
    time_s: f64,
    /// Slant range of every feasible link, `INFINITY` elsewhere
    ranges: AdjacencyMatrix,
    rejected: usize,
    faults: Vec<LinkFault>,
}

impl Topology {
    pub fn build<S: LookAngleSource + ?Sized>(
        shape: &ConstellationShape,
        source: &S,
        criteria: &LinkCriteria,
        t_s: f64,
        cancel: &CancelToken,
    ) -> Result<Self> {
        if !t_s.is_finite() {
            return Err(RoutingError::InvalidParameter(format!("query time {}", t_s)));
        }
        let evaluator = LinkEvaluator::new(source, &criteria.tolerance, criteria.acquisition_delay_s)?;
        let n = shape.total();
        let started = Instant::now();

        let ids: Vec<SatId> = shape.ids().collect();

        let rows: Vec<Vec<PairOutcome>> = (0..n)
            .into_par_iter()
            .map(|i| -> Result<Vec<PairOutcome>> {
                cancel.check()?;
                Ok((i + 1..n)
                    .map(|j| match evaluator.assess(ids[i], ids[j], t_s) {
                        Ok(link) if link.feasible => PairOutcome::Linked(link.range_km),
                        Ok(_) => PairOutcome::Rejected,
                        Err(e) => PairOutcome::Fault(e),
                    })
                    .collect())
            })
            .collect::<Result<_>>()?;

        let mut ranges = AdjacencyMatrix::disconnected(n);
        let mut rejected = 0;
        let mut faults = Vec::new();

        for (i, row) in rows.into_iter().enumerate() {
            for (offset, outcome) in row.into_iter().enumerate() {
                let j = i + 1 + offset;
                match outcome {
                    PairOutcome::Linked(range_km) => ranges.connect(i, j, range_km)?,
                    PairOutcome::Rejected => rejected += 1,
                    PairOutcome::Fault(error) => {
                        let (a, b) = (ids[i], ids[j]);
                        if criteria.fault_policy == FaultPolicy::Abort {
                            return Err(RoutingError::LinkEvaluation { a, b, source: error });
                        }
                        warn!(%a, %b, %error, "link evaluation failed, pair left unlinked");
                        faults.push(LinkFault { a, b, error });
                    }
                }
            }
        }

        let topology = Self {
            shape: *shape,
            time_s: t_s,
            ranges,
            rejected,
            faults,
        };

        info!(
            t = t_s,
            satellites = n,
            links = topology.link_count(),
            rejected = topology.rejected,
            faults = topology.faults.len(),
            "Topology built"
        );
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Topology build time");

        Ok(topology)
    }

    /// Wraps a hand-fed range matrix, e.g. from a recorded snapshot.
    pub fn from_ranges(shape: &ConstellationShape, time_s: f64, ranges: AdjacencyMatrix) -> Result<Self> {
        if ranges.size() != shape.total() {
            return Err(RoutingError::DimensionMismatch {
                expected: shape.total(),
                found: ranges.size(),
            });
        }
        Ok(Self {
            shape: *shape,
            time_s,
            ranges,
            rejected: 0,
            faults: Vec::new(),
        })
    }

    /// Edge costs under `model`; a fresh matrix every call.
    pub fn adjacency(&self, model: CostModel) -> AdjacencyMatrix {
        match model {
            CostModel::Distance => self.ranges.clone(),
            CostModel::HopCount => self.ranges.map_links(|range_km| model.edge_cost(range_km)),
        }
    }

    pub fn shape(&self) -> &ConstellationShape {
        &self.shape
    }

    pub fn size(&self) -> usize {
        self.ranges.size()
    }

    pub fn time_s(&self) -> f64 {
        self.time_s
    }

    pub fn faults(&self) -> &[LinkFault] {
        &self.faults
    }

    pub fn link_count(&self) -> usize {
        self.ranges.link_count()
    }

    pub fn is_linked(&self, a: SatId, b: SatId) -> Result<bool> {
        Ok(self.ranges.is_linked(self.shape.index_of(a)?, self.shape.index_of(b)?))
    }

    pub fn range_km(&self, a: SatId, b: SatId) -> Result<Option<f64>> {
        let (i, j) = (self.shape.index_of(a)?, self.shape.index_of(b)?);
        Ok(self.ranges.is_linked(i, j).then(|| self.ranges.cost(i, j)))
    }

    pub fn neighbours(&self, id: SatId) -> Result<Vec<SatId>> {
        let i = self.shape.index_of(id)?;
        (0..self.size())
            .filter(|&j| self.ranges.is_linked(i, j))
            .map(|j| Ok(self.shape.sat_id(j)?))
            .collect()
    }

    pub fn stats(&self) -> TopologyStats {
        let n = self.size();
        let ranges: Vec<f64> = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .filter(|&(i, j)| self.ranges.is_linked(i, j))
            .map(|(i, j)| self.ranges.cost(i, j))
            .collect();

        let mean_range_km = if ranges.is_empty() {
            None
        } else {
            Some(ranges.iter().sum::<f64>() / ranges.len() as f64)
        };

        TopologyStats {
            time_s: self.time_s,
            satellites: n,
            feasible_links: ranges.len(),
            rejected_pairs: self.rejected,
            faulted_pairs: self.faults.len(),
            min_range_km: ranges.iter().copied().reduce(f64::min),
            max_range_km: ranges.iter().copied().reduce(f64::max),
            mean_range_km,
        }
    }
}

/// Topology statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopologyStats {
    pub time_s: f64,
    pub satellites: usize,
    pub feasible_links: usize,
    pub rejected_pairs: usize,
    pub faulted_pairs: usize,
    pub min_range_km: Option<f64>,
    pub max_range_km: Option<f64>,
    pub mean_range_km: Option<f64>,
}
