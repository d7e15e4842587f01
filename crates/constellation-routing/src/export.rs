//! Topology export: the plain adjacency file read by downstream tooling, and
//! a petgraph graph for ad-hoc analysis.
//!
//! File layout:
//!
//! ```text
//! 0-0 0-1 0-2 ...
//! 0-0 0 1 0 ...
//! 0-1 1 0 1 ...
//! ```

use std::io::{self, Write};

use orbital_mechanics::SatId;
use petgraph::graph::{NodeIndex, UnGraph};

use crate::topology::Topology;
use crate::CostModel;

pub fn write_adjacency_matrix<W: Write>(topology: &Topology, mut out: W) -> io::Result<()> {
    let ids: Vec<SatId> = topology.shape().ids().collect();
    let n = ids.len();
    let adjacency = topology.adjacency(CostModel::HopCount);

    let header: Vec<String> = ids.iter().map(SatId::to_string).collect();
    writeln!(out, "{}", header.join(" "))?;

    for (i, id) in ids.iter().enumerate() {
        write!(out, "{}", id)?;
        for j in 0..n {
            write!(out, " {}", u8::from(adjacency.is_linked(i, j)))?;
        }
        writeln!(out)?;
    }
    out.flush()
}

impl Topology {
    /// Undirected graph with one node per satellite (node index == satellite
    /// index) and one edge per feasible link, weighted under `model`.
    pub fn to_graph(&self, model: CostModel) -> UnGraph<SatId, f64> {
        let n = self.size();
        let adjacency = self.adjacency(model);
        let mut graph = UnGraph::with_capacity(n, adjacency.link_count());

        for id in self.shape().ids() {
            graph.add_node(id);
        }
        for i in 0..n {
            for j in i + 1..n {
                if adjacency.is_linked(i, j) {
                    graph.add_edge(NodeIndex::new(i), NodeIndex::new(j), adjacency.cost(i, j));
                }
            }
        }
        graph
    }
}
