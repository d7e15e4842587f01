//! All-pairs shortest paths with a predecessor ("medium") matrix.
//!
//! Floyd–Warshall over intermediate nodes `k = 0..n`. During phase `k`,
//! row `k` and column `k` cannot change (the diagonal is 0 and costs are
//! non-negative), so every other row is relaxed independently in parallel
//! and the result is bit-identical to a sequential pass. Improvements must be
//! strict, so ties keep whichever path was found first in `k` order.

use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;

use crate::matrix::{AdjacencyMatrix, SquareMatrix};
use crate::{CancelToken, Result, RoutingError};

#[derive(Debug, Clone, PartialEq)]
pub struct ShortestPaths {
    dist: SquareMatrix<f64>,
    /// Last intermediate hop on the best path; `None` for direct edges,
    /// self-pairs and unreachable pairs
    medium: SquareMatrix<Option<usize>>,
}

impl ShortestPaths {
    pub fn compute(adjacency: &AdjacencyMatrix, cancel: &CancelToken) -> Result<Self> {
        let n = adjacency.size();
        let started = Instant::now();

        let mut dist = adjacency.costs().clone();
        let mut medium = SquareMatrix::filled(n, None);

        for k in 0..n {
            cancel.check()?;
            let via_k: Vec<f64> = dist.row(k).to_vec();

            dist.as_mut_slice()
                .par_chunks_mut(n)
                .zip(medium.as_mut_slice().par_chunks_mut(n))
                .for_each(|(dist_row, medium_row)| {
                    let to_k = dist_row[k];
                    if !to_k.is_finite() {
                        return;
                    }
                    for j in 0..n {
                        let candidate = to_k + via_k[j];
                        if candidate < dist_row[j] {
                            dist_row[j] = candidate;
                            medium_row[j] = Some(k);
                        }
                    }
                });
        }

        debug!(
            satellites = n,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "All-pairs shortest paths computed"
        );

        Ok(Self { dist, medium })
    }

    /// Wraps externally produced matrices, e.g. a recorded result.
    pub fn from_parts(dist: SquareMatrix<f64>, medium: SquareMatrix<Option<usize>>) -> Result<Self> {
        if dist.size() != medium.size() {
            return Err(RoutingError::DimensionMismatch {
                expected: dist.size(),
                found: medium.size(),
            });
        }
        Ok(Self { dist, medium })
    }

    pub fn size(&self) -> usize {
        self.dist.size()
    }

    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.dist[(i, j)]
    }

    pub fn predecessor(&self, i: usize, j: usize) -> Option<usize> {
        self.medium[(i, j)]
    }

    pub fn is_reachable(&self, i: usize, j: usize) -> bool {
        self.dist[(i, j)].is_finite()
    }

    pub fn distances(&self) -> &SquareMatrix<f64> {
        &self.dist
    }

    pub fn predecessors(&self) -> &SquareMatrix<Option<usize>> {
        &self.medium
    }

    /// Ordered node indices from `from` to `to`, inclusive.
    ///
    /// `[from]` for a self-pair, empty when `to` is unreachable. The split
    /// at `medium[i][j]` runs on an explicit stack; more than `n` nodes or
    /// `2n` splits means the predecessor matrix is corrupted.
    pub fn path(&self, from: usize, to: usize) -> Result<Vec<usize>> {
        let n = self.size();
        if from >= n || to >= n {
            return Err(RoutingError::DimensionMismatch {
                expected: n,
                found: from.max(to) + 1,
            });
        }
        if from == to {
            return Ok(vec![from]);
        }
        if !self.is_reachable(from, to) {
            return Ok(Vec::new());
        }

        let corrupt = || RoutingError::CorruptPredecessors { from, to };

        let mut path = vec![from];
        let mut stack = vec![(from, to)];
        let mut splits = 0;

        while let Some((i, j)) = stack.pop() {
            match self.medium[(i, j)] {
                None => {
                    path.push(j);
                    if path.len() > n {
                        return Err(corrupt());
                    }
                }
                Some(k) => {
                    splits += 1;
                    if k >= n || k == i || k == j || splits > 2 * n {
                        return Err(corrupt());
                    }
                    // (i, k) must be expanded before (k, j)
                    stack.push((k, j));
                    stack.push((i, k));
                }
            }
        }

        Ok(path)
    }

    /// Hops on the best path, `None` when unreachable.
    pub fn hop_count(&self, from: usize, to: usize) -> Result<Option<usize>> {
        let path = self.path(from, to)?;
        Ok((!path.is_empty()).then(|| path.len() - 1))
    }
}
