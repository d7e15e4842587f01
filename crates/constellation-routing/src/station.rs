//! Station-to-station routing over the constellation.
//!
//! Each station reaches the network through any satellite in its coverage
//! list. Every (uplink, downlink) combination is routed through the table and
//! the cheapest reachable one wins; ties go to fewer hops, then to the
//! earlier combination (uplinks outer, downlinks inner).

use orbital_mechanics::SatId;
use serde::Serialize;
use tracing::debug;

use crate::route::{Route, RouteTable};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationRoute {
    pub uplinks: Vec<SatId>,
    pub downlinks: Vec<SatId>,
    /// Reachable uplink/downlink routes in evaluation order
    pub candidates: Vec<Route>,
    pub best: Option<Route>,
}

impl StationRoute {
    pub fn plan(table: &RouteTable, uplinks: &[SatId], downlinks: &[SatId]) -> Result<Self> {
        let mut candidates = Vec::new();
        for &up in uplinks {
            for &down in downlinks {
                let route = table.route(up, down)?;
                if route.is_reachable() {
                    candidates.push(route);
                }
            }
        }

        let mut best: Option<&Route> = None;
        for candidate in &candidates {
            let better = match best {
                None => true,
                Some(current) => ranks_before(candidate, current),
            };
            if better {
                best = Some(candidate);
            }
        }
        let best = best.cloned();

        debug!(
            uplinks = uplinks.len(),
            downlinks = downlinks.len(),
            candidates = candidates.len(),
            reachable = best.is_some(),
            "Station route planned"
        );

        Ok(Self {
            uplinks: uplinks.to_vec(),
            downlinks: downlinks.to_vec(),
            candidates,
            best,
        })
    }

    pub fn is_reachable(&self) -> bool {
        self.best.is_some()
    }
}

/// Strictly better: lower cost, or equal cost and fewer hops.
fn ranks_before(a: &Route, b: &Route) -> bool {
    let cost = |r: &Route| r.cost.unwrap_or(f64::INFINITY);
    if cost(a) != cost(b) {
        return cost(a) < cost(b);
    }
    a.hops.len() < b.hops.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::AdjacencyMatrix;
    use crate::topology::Topology;
    use crate::{CancelToken, CostModel};
    use orbital_mechanics::ConstellationShape;

    /// Chain 0-1-2-3 with a long 0-3 shortcut; 4 and 5 isolated.
    fn table(cost_model: CostModel) -> RouteTable {
        let shape = ConstellationShape::new(2, 3, 6).unwrap();
        let ranges =
            AdjacencyMatrix::from_edges(6, [(0, 1, 1000.0), (1, 2, 1000.0), (2, 3, 1000.0), (0, 3, 3500.0)])
                .unwrap();
        let topology = Topology::from_ranges(&shape, 0.0, ranges).unwrap();
        RouteTable::compute(&topology, cost_model, &CancelToken::new()).unwrap()
    }

    #[test]
    fn test_best_is_cheapest_candidate() {
        let table = table(CostModel::Distance);
        let plan = StationRoute::plan(
            &table,
            &[SatId::new(0, 0), SatId::new(1, 1)],
            &[SatId::new(0, 2), SatId::new(1, 0)],
        )
        .unwrap();

        // (1,1) is isolated, so only the two routes from (0,0) remain
        assert_eq!(plan.candidates.len(), 2);
        let best = plan.best.unwrap();
        assert_eq!(best.to, SatId::new(0, 2));
        assert_eq!(best.cost, Some(2000.0));
    }

    #[test]
    fn test_hop_model_picks_fewest_hops() {
        let table = table(CostModel::HopCount);
        // 0 -> 3 is one hop directly; 1 -> 3 is two hops
        let plan = StationRoute::plan(
            &table,
            &[SatId::new(0, 1), SatId::new(0, 0)],
            &[SatId::new(1, 0)],
        )
        .unwrap();
        let best = plan.best.unwrap();
        assert_eq!(best.from, SatId::new(0, 0));
        assert_eq!(best.hop_count(), Some(1));
    }

    #[test]
    fn test_equal_routes_keep_first_pair() {
        let table = table(CostModel::HopCount);
        // 1 -> 0 and 1 -> 2 are both one hop
        let plan = StationRoute::plan(
            &table,
            &[SatId::new(0, 1)],
            &[SatId::new(0, 2), SatId::new(0, 0)],
        )
        .unwrap();
        assert_eq!(plan.best.unwrap().to, SatId::new(0, 2));
    }

    #[test]
    fn test_no_coverage_or_no_path() {
        let table = table(CostModel::Distance);
        let empty = StationRoute::plan(&table, &[], &[SatId::new(0, 0)]).unwrap();
        assert!(!empty.is_reachable());

        let islands = StationRoute::plan(&table, &[SatId::new(1, 1)], &[SatId::new(1, 2)]).unwrap();
        assert!(islands.candidates.is_empty());
        assert!(islands.best.is_none());
    }
}
