//! Time-series containers
//!
//! - [`SeriesMatrix`]: dense rows × cols of f64. Activity traces are
//!   runs × steps; per-node traces handed to the statistics are steps × N.
//! - [`NodeHistory`]: runs × steps × N record of 0/1 activity.

use crate::error::{HtcError, Result};
use serde::{Deserialize, Serialize};

/// Dense row-major matrix of real samples
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSeriesMatrix")]
pub struct SeriesMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

#[derive(Deserialize)]
struct RawSeriesMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl TryFrom<RawSeriesMatrix> for SeriesMatrix {
    type Error = HtcError;

    fn try_from(raw: RawSeriesMatrix) -> Result<Self> {
        Self::from_flat(raw.rows, raw.cols, raw.data)
    }
}

impl SeriesMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Build from a flat row-major buffer
    pub fn from_flat(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(HtcError::shape(&[rows, cols], &[data.len()]));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build from equally long rows
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(HtcError::shape(&[cols], &[row.len()]));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.cols + c]
    }

    #[inline]
    pub fn set(&mut self, r: usize, c: usize, value: f64) {
        self.data[r * self.cols + c] = value;
    }

    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Copy of column c
    pub fn column(&self, c: usize) -> Vec<f64> {
        (0..self.rows).map(|r| self.get(r, c)).collect()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mean over every entry (0 for an empty matrix)
    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }

    /// Matrix with the columns reordered: column k of the result is
    /// column `order[k]` of self
    pub fn permute_columns(&self, order: &[usize]) -> Result<Self> {
        if order.len() != self.cols || order.iter().any(|&c| c >= self.cols) {
            return Err(HtcError::shape(&[self.cols], &[order.len()]));
        }
        let mut out = Self::zeros(self.rows, self.cols);
        for r in 0..self.rows {
            for (k, &c) in order.iter().enumerate() {
                out.set(r, k, self.get(r, c));
            }
        }
        Ok(out)
    }
}

/// Per-node 0/1 activity of every run and step
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNodeHistory")]
pub struct NodeHistory {
    runs: usize,
    steps: usize,
    nodes: usize,
    bits: Vec<u8>,
}

#[derive(Deserialize)]
struct RawNodeHistory {
    runs: usize,
    steps: usize,
    nodes: usize,
    bits: Vec<u8>,
}

impl TryFrom<RawNodeHistory> for NodeHistory {
    type Error = HtcError;

    fn try_from(raw: RawNodeHistory) -> Result<Self> {
        let RawNodeHistory { runs, steps, nodes, bits } = raw;
        if bits.len() != runs * steps * nodes {
            return Err(HtcError::shape(&[runs, steps, nodes], &[bits.len()]));
        }
        if let Some(b) = bits.iter().find(|b| **b > 1) {
            return Err(HtcError::InvalidParameter(format!(
                "node activity must be 0 or 1, got {}",
                b
            )));
        }
        Ok(Self { runs, steps, nodes, bits })
    }
}

impl NodeHistory {
    pub fn zeros(runs: usize, steps: usize, nodes: usize) -> Self {
        Self {
            runs,
            steps,
            nodes,
            bits: vec![0; runs * steps * nodes],
        }
    }

    /// Build from `[run][step][node]` nested vectors
    pub fn from_nested(data: &[Vec<Vec<u8>>]) -> Result<Self> {
        let runs = data.len();
        let steps = data.first().map_or(0, Vec::len);
        let nodes = data
            .first()
            .and_then(|r| r.first())
            .map_or(0, Vec::len);
        let mut h = Self::zeros(runs, steps, nodes);
        for (r, run) in data.iter().enumerate() {
            if run.len() != steps {
                return Err(HtcError::shape(&[steps], &[run.len()]));
            }
            for (t, row) in run.iter().enumerate() {
                if row.len() != nodes {
                    return Err(HtcError::shape(&[nodes], &[row.len()]));
                }
                h.step_mut(r, t).copy_from_slice(row);
            }
        }
        Ok(h)
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn nodes(&self) -> usize {
        self.nodes
    }

    /// Indicator of one run at one step
    pub fn step_row(&self, run: usize, step: usize) -> &[u8] {
        let start = (run * self.steps + step) * self.nodes;
        &self.bits[start..start + self.nodes]
    }

    pub(crate) fn step_mut(&mut self, run: usize, step: usize) -> &mut [u8] {
        let start = (run * self.steps + step) * self.nodes;
        &mut self.bits[start..start + self.nodes]
    }

    /// One run as a steps × N real matrix
    pub fn run_series(&self, run: usize) -> SeriesMatrix {
        let start = run * self.steps * self.nodes;
        let data = self.bits[start..start + self.steps * self.nodes]
            .iter()
            .map(|&b| b as f64)
            .collect();
        SeriesMatrix {
            rows: self.steps,
            cols: self.nodes,
            data,
        }
    }

    /// Fraction of steps each node of a run was active
    pub fn activation_rates(&self, run: usize) -> Vec<f64> {
        let mut rates = vec![0.0; self.nodes];
        if self.steps == 0 {
            return rates;
        }
        for t in 0..self.steps {
            for (rate, &b) in rates.iter_mut().zip(self.step_row(run, t)) {
                *rate += b as f64;
            }
        }
        for rate in &mut rates {
            *rate /= self.steps as f64;
        }
        rates
    }
}
