//! Dense row-major square matrices addressed by satellite index.

use std::ops::{Index, IndexMut};

use serde::{Serialize, Serializer};

use crate::{Result, RoutingError};

#[derive(Debug, Clone, PartialEq)]
pub struct SquareMatrix<T> {
    n: usize,
    cells: Vec<T>,
}

impl<T: Clone> SquareMatrix<T> {
    pub fn filled(n: usize, value: T) -> Self {
        Self {
            n,
            cells: vec![value; n * n],
        }
    }
}

impl<T> SquareMatrix<T> {
    pub fn size(&self) -> usize {
        self.n
    }

    pub fn row(&self, i: usize) -> &[T] {
        &self.cells[i * self.n..(i + 1) * self.n]
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.cells
    }

    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        (0..self.n).map(move |i| self.row(i))
    }
}

impl<T> Index<(usize, usize)> for SquareMatrix<T> {
    type Output = T;

    fn index(&self, (i, j): (usize, usize)) -> &T {
        &self.cells[i * self.n + j]
    }
}

impl<T> IndexMut<(usize, usize)> for SquareMatrix<T> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        &mut self.cells[i * self.n + j]
    }
}

/// Serialized as a list of rows.
impl<T: Serialize> Serialize for SquareMatrix<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.rows())
    }
}

/// Symmetric link-cost matrix for one time instant.
///
/// Off-diagonal cells hold the edge cost of a feasible link or
/// `f64::INFINITY` when no link exists. The diagonal is always 0.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjacencyMatrix {
    costs: SquareMatrix<f64>,
}

impl AdjacencyMatrix {
    /// No links at all.
    pub fn disconnected(n: usize) -> Self {
        let mut costs = SquareMatrix::filled(n, f64::INFINITY);
        for i in 0..n {
            costs[(i, i)] = 0.0;
        }
        Self { costs }
    }

    pub fn from_edges(n: usize, edges: impl IntoIterator<Item = (usize, usize, f64)>) -> Result<Self> {
        let mut matrix = Self::disconnected(n);
        for (i, j, cost) in edges {
            matrix.connect(i, j, cost)?;
        }
        Ok(matrix)
    }

    /// Sets the symmetric cost of the link between `i` and `j`.
    pub fn connect(&mut self, i: usize, j: usize, cost: f64) -> Result<()> {
        let n = self.size();
        if i >= n || j >= n {
            return Err(RoutingError::DimensionMismatch {
                expected: n,
                found: i.max(j) + 1,
            });
        }
        if i == j {
            return Err(RoutingError::InvalidParameter(format!(
                "self-link on index {}",
                i
            )));
        }
        if !cost.is_finite() || cost < 0.0 {
            return Err(RoutingError::InvalidParameter(format!(
                "link cost {} between {} and {} must be finite and non-negative",
                cost, i, j
            )));
        }
        self.costs[(i, j)] = cost;
        self.costs[(j, i)] = cost;
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.costs.size()
    }

    pub fn cost(&self, i: usize, j: usize) -> f64 {
        self.costs[(i, j)]
    }

    pub fn is_linked(&self, i: usize, j: usize) -> bool {
        i != j && self.costs[(i, j)].is_finite()
    }

    /// Number of undirected links.
    pub fn link_count(&self) -> usize {
        let n = self.size();
        (0..n)
            .map(|i| (i + 1..n).filter(|&j| self.is_linked(i, j)).count())
            .sum()
    }

    pub fn costs(&self) -> &SquareMatrix<f64> {
        &self.costs
    }

    /// Same links, with every link cost replaced by `f(cost)`.
    pub fn map_links(&self, f: impl Fn(f64) -> f64) -> Self {
        let n = self.size();
        let mut mapped = self.clone();
        for i in 0..n {
            for j in 0..n {
                if self.is_linked(i, j) {
                    mapped.costs[(i, j)] = f(self.costs[(i, j)]);
                }
            }
        }
        mapped
    }
}
