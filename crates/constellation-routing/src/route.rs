//! Routes in satellite-id terms.

use orbital_mechanics::{ConstellationShape, SatId};
use serde::Serialize;
use tracing::info;

use crate::shortest_path::ShortestPaths;
use crate::topology::Topology;
use crate::{CancelToken, CostModel, Result};

/// Best path between two satellites.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub from: SatId,
    pub to: SatId,
    /// Satellites in traversal order, endpoints included; empty if unreachable
    pub hops: Vec<SatId>,
    /// Total path cost, `None` if unreachable
    pub cost: Option<f64>,
}

impl Route {
    pub fn is_reachable(&self) -> bool {
        !self.hops.is_empty()
    }

    /// Number of links traversed.
    pub fn hop_count(&self) -> Option<usize> {
        self.is_reachable().then(|| self.hops.len() - 1)
    }
}

/// All-pairs routing result for one instant and one cost model.
#[derive(Debug, Clone)]
pub struct RouteTable {
    shape: ConstellationShape,
    cost_model: CostModel,
    time_s: f64,
    paths: ShortestPaths,
}

impl RouteTable {
    pub fn compute(topology: &Topology, cost_model: CostModel, cancel: &CancelToken) -> Result<Self> {
        let paths = ShortestPaths::compute(&topology.adjacency(cost_model), cancel)?;

        let n = paths.size();
        let reachable_pairs = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .filter(|&(i, j)| paths.is_reachable(i, j))
            .count();
        info!(
            t = topology.time_s(),
            cost_model = ?cost_model,
            reachable_pairs,
            "Route table computed"
        );

        Ok(Self {
            shape: *topology.shape(),
            cost_model,
            time_s: topology.time_s(),
            paths,
        })
    }

    pub fn shape(&self) -> &ConstellationShape {
        &self.shape
    }

    pub fn cost_model(&self) -> CostModel {
        self.cost_model
    }

    pub fn time_s(&self) -> f64 {
        self.time_s
    }

    pub fn paths(&self) -> &ShortestPaths {
        &self.paths
    }

    pub fn distance(&self, from: SatId, to: SatId) -> Result<Option<f64>> {
        let (i, j) = (self.shape.index_of(from)?, self.shape.index_of(to)?);
        Ok(self.paths.is_reachable(i, j).then(|| self.paths.distance(i, j)))
    }

    pub fn route(&self, from: SatId, to: SatId) -> Result<Route> {
        let (i, j) = (self.shape.index_of(from)?, self.shape.index_of(to)?);
        let hops = self
            .paths
            .path(i, j)?
            .into_iter()
            .map(|k| self.shape.sat_id(k))
            .collect::<orbital_mechanics::Result<Vec<_>>>()?;

        Ok(Route {
            from,
            to,
            cost: (!hops.is_empty()).then(|| self.paths.distance(i, j)),
            hops,
        })
    }

    /// Every pair with `from <= to` in index order.
    pub fn all_routes(&self) -> Result<Vec<Route>> {
        let ids: Vec<SatId> = self.shape.ids().collect();
        let mut routes = Vec::with_capacity(ids.len() * (ids.len() + 1) / 2);
        for (i, &from) in ids.iter().enumerate() {
            for &to in &ids[i..] {
                routes.push(self.route(from, to)?);
            }
        }
        Ok(routes)
    }
}
