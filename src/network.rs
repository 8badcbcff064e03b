//! Connectivity - Dense weighted adjacency shared by every run
//!
//! Row i holds the outgoing weights of node i. The matrix is never mutated
//! by the engine; conditioning returns a new matrix.

use crate::error::{HtcError, Result};
use serde::{Deserialize, Serialize};

/// Dense N×N non-negative weight matrix (row-major)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawConnectivity")]
pub struct Connectivity {
    /// Number of nodes
    n: usize,
    /// Row-major weights, length n*n
    weights: Vec<f64>,
}

#[derive(Deserialize)]
struct RawConnectivity {
    n: usize,
    weights: Vec<f64>,
}

impl TryFrom<RawConnectivity> for Connectivity {
    type Error = HtcError;

    fn try_from(raw: RawConnectivity) -> Result<Self> {
        Self::from_flat(raw.n, raw.weights)
    }
}

impl Connectivity {
    /// Build from a flat row-major buffer of length n*n
    pub fn from_flat(n: usize, weights: Vec<f64>) -> Result<Self> {
        if weights.len() != n * n {
            return Err(HtcError::shape(&[n, n], &[weights.len()]));
        }
        if let Some(w) = weights.iter().find(|w| !(**w >= 0.0)) {
            return Err(HtcError::InvalidParameter(format!(
                "connectivity weights must be non-negative, got {}",
                w
            )));
        }
        Ok(Self { n, weights })
    }

    /// Build from rows; every row must have length equal to the row count
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n = rows.len();
        let mut weights = Vec::with_capacity(n * n);
        for row in rows {
            if row.len() != n {
                return Err(HtcError::shape(&[n, n], &[n, row.len()]));
            }
            weights.extend_from_slice(row);
        }
        Self::from_flat(n, weights)
    }

    /// All-to-all network with uniform weight and no self-loops
    pub fn fully_connected(n: usize, weight: f64) -> Result<Self> {
        let mut weights = vec![weight; n * n];
        for i in 0..n {
            weights[i * n + i] = 0.0;
        }
        Self::from_flat(n, weights)
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Weight of edge i → j
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.weights[i * self.n + j]
    }

    /// Outgoing weights of node i
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.weights[i * self.n..(i + 1) * self.n]
    }

    /// Flat row-major weights
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Row sums
    pub fn row_sums(&self) -> Vec<f64> {
        (0..self.n).map(|i| self.row(i).iter().sum()).collect()
    }

    /// Indices of rows that sum to zero (isolated nodes)
    pub fn zero_rows(&self) -> Vec<usize> {
        self.row_sums()
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == 0.0)
            .map(|(i, _)| i)
            .collect()
    }

    /// Mean of all n*n entries
    pub fn mean_weight(&self) -> f64 {
        if self.weights.is_empty() {
            return 0.0;
        }
        self.weights.iter().sum::<f64>() / self.weights.len() as f64
    }

    /// Divide every row by its sum.
    ///
    /// All-zero rows become NaN rows; guard isolated nodes upstream with
    /// [`Connectivity::zero_rows`].
    pub fn normalize(&self) -> Connectivity {
        let sums = self.row_sums();
        let zero = sums.iter().filter(|&&s| s == 0.0).count();
        if zero > 0 {
            log::warn!("normalize: {} of {} rows sum to zero, entries become NaN", zero, self.n);
        }

        let mut weights = self.weights.clone();
        for (i, sum) in sums.iter().enumerate() {
            for w in &mut weights[i * self.n..(i + 1) * self.n] {
                *w /= sum;
            }
        }
        Connectivity { n: self.n, weights }
    }

    /// Weighted active input `input[i] = Σ_j W[i,j] * active[j]` for one run.
    ///
    /// `active` and `out` must both have length n.
    pub fn weighted_input(&self, active: &[u8], out: &mut [f64]) {
        debug_assert_eq!(active.len(), self.n);
        debug_assert_eq!(out.len(), self.n);
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self
                .row(i)
                .iter()
                .zip(active)
                .filter(|(_, a)| **a != 0)
                .map(|(&w, _)| w)
                .sum();
        }
    }
}
