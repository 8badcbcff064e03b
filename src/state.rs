//! Node states - The three HTC states and batched state matrices
//!
//! Every node is strictly one of `{-1, 0, +1}`:
//!
//! - **Refractory** (-1): recovering, cannot be activated
//! - **Inactive** (0): susceptible, can be activated
//! - **Active** (+1): fires for exactly one step
//!
//! A [`StateMatrix`] holds one row of N nodes per independent run.
//! An [`ActiveMask`] is the 0/1 indicator of the Active cells of a
//! state matrix, with the same runs × N layout.
//!
//! # Example
//! ```
//! use htcsim::{NodeState, StateMatrix};
//!
//! let state = StateMatrix::from_rows(&[vec![1, 0, -1], vec![0, 0, 1]]).unwrap();
//! assert_eq!(state.get(0, 0), NodeState::Active);
//! assert_eq!(state.active_mask().count_run(1), 1);
//! ```

use crate::error::{HtcError, Result};
use serde::{Deserialize, Serialize};

/// HTC node state - strictly {-1, 0, +1}
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i8)]
pub enum NodeState {
    /// Recovering after activity
    Refractory = -1,
    /// Susceptible to activation
    #[default]
    Inactive = 0,
    /// Firing this step
    Active = 1,
}

impl NodeState {
    /// Convert to i8
    #[inline]
    pub const fn as_i8(self) -> i8 {
        self as i8
    }

    /// Try to convert from i8, returns None for invalid values
    #[inline]
    pub const fn from_i8(value: i8) -> Option<Self> {
        match value {
            -1 => Some(Self::Refractory),
            0 => Some(Self::Inactive),
            1 => Some(Self::Active),
            _ => None,
        }
    }

    /// Is this node firing?
    #[inline]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl From<NodeState> for i8 {
    fn from(s: NodeState) -> i8 {
        s.as_i8()
    }
}

impl TryFrom<i8> for NodeState {
    type Error = HtcError;

    fn try_from(value: i8) -> Result<Self> {
        NodeState::from_i8(value).ok_or_else(|| {
            HtcError::InvalidParameter(format!("node state must be -1, 0, or +1, got {}", value))
        })
    }
}

/// Batched HTC state, shape runs × nodes (row-major)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStateMatrix")]
pub struct StateMatrix {
    runs: usize,
    nodes: usize,
    cells: Vec<NodeState>,
}

#[derive(Deserialize)]
struct RawStateMatrix {
    runs: usize,
    nodes: usize,
    cells: Vec<NodeState>,
}

impl TryFrom<RawStateMatrix> for StateMatrix {
    type Error = HtcError;

    fn try_from(raw: RawStateMatrix) -> Result<Self> {
        Self::from_cells(raw.runs, raw.nodes, raw.cells)
    }
}

impl StateMatrix {
    /// All nodes Inactive
    pub fn inactive(runs: usize, nodes: usize) -> Self {
        Self {
            runs,
            nodes,
            cells: vec![NodeState::Inactive; runs * nodes],
        }
    }

    /// Build from a flat row-major buffer
    pub fn from_cells(runs: usize, nodes: usize, cells: Vec<NodeState>) -> Result<Self> {
        if cells.len() != runs * nodes {
            return Err(HtcError::shape(&[runs * nodes], &[cells.len()]));
        }
        Ok(Self { runs, nodes, cells })
    }

    /// Build from raw i8 rows, one per run
    pub fn from_rows(rows: &[Vec<i8>]) -> Result<Self> {
        let runs = rows.len();
        let nodes = rows.first().map_or(0, Vec::len);
        let mut cells = Vec::with_capacity(runs * nodes);
        for row in rows {
            if row.len() != nodes {
                return Err(HtcError::shape(&[nodes], &[row.len()]));
            }
            for &v in row {
                cells.push(NodeState::try_from(v)?);
            }
        }
        Ok(Self { runs, nodes, cells })
    }

    /// Number of runs (rows)
    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Number of nodes (columns)
    pub fn nodes(&self) -> usize {
        self.nodes
    }

    /// Shape as [runs, nodes]
    pub fn shape(&self) -> [usize; 2] {
        [self.runs, self.nodes]
    }

    /// State of one cell
    #[inline]
    pub fn get(&self, run: usize, node: usize) -> NodeState {
        self.cells[run * self.nodes + node]
    }

    /// Set one cell
    #[inline]
    pub fn set(&mut self, run: usize, node: usize, state: NodeState) {
        self.cells[run * self.nodes + node] = state;
    }

    /// One run's nodes
    pub fn row(&self, run: usize) -> &[NodeState] {
        &self.cells[run * self.nodes..(run + 1) * self.nodes]
    }

    /// Flat row-major cells
    pub fn cells(&self) -> &[NodeState] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [NodeState] {
        &mut self.cells
    }

    /// Raw i8 rows, one per run
    pub fn to_rows(&self) -> Vec<Vec<i8>> {
        (0..self.runs)
            .map(|r| self.row(r).iter().map(|s| s.as_i8()).collect())
            .collect()
    }

    /// Count cells in a given state for one run
    pub fn count(&self, run: usize, state: NodeState) -> usize {
        self.row(run).iter().filter(|&&s| s == state).count()
    }

    /// 0/1 indicator of Active cells
    pub fn active_mask(&self) -> ActiveMask {
        ActiveMask {
            runs: self.runs,
            nodes: self.nodes,
            bits: self.cells.iter().map(|s| s.is_active() as u8).collect(),
        }
    }
}

/// Active-node indicator, shape runs × nodes, values in {0, 1}
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActiveMask {
    runs: usize,
    nodes: usize,
    bits: Vec<u8>,
}

impl ActiveMask {
    pub(crate) fn zeros(runs: usize, nodes: usize) -> Self {
        Self {
            runs,
            nodes,
            bits: vec![0; runs * nodes],
        }
    }

    /// Number of runs
    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Number of nodes
    pub fn nodes(&self) -> usize {
        self.nodes
    }

    /// One run's indicator
    pub fn row(&self, run: usize) -> &[u8] {
        &self.bits[run * self.nodes..(run + 1) * self.nodes]
    }

    /// Flat row-major indicator
    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    pub(crate) fn bits_mut(&mut self) -> &mut [u8] {
        &mut self.bits
    }

    /// Active node count for one run
    pub fn count_run(&self, run: usize) -> usize {
        self.row(run).iter().map(|&b| b as usize).sum()
    }

    /// Fraction of active nodes for one run
    pub fn fraction_run(&self, run: usize) -> f64 {
        if self.nodes == 0 {
            return 0.0;
        }
        self.count_run(run) as f64 / self.nodes as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_state_roundtrip_values() {
        for v in [-1i8, 0, 1] {
            let s = NodeState::from_i8(v).unwrap();
            assert_eq!(s.as_i8(), v);
        }
        assert!(NodeState::from_i8(2).is_none());
        assert!(NodeState::try_from(-2).is_err());
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let err = StateMatrix::from_rows(&[vec![0, 1], vec![0]]).unwrap_err();
        assert!(matches!(err, HtcError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_active_mask_counts() {
        let s = StateMatrix::from_rows(&[vec![1, 1, -1, 0], vec![0, 0, 0, 1]]).unwrap();
        let mask = s.active_mask();
        assert_eq!(mask.row(0), &[1, 1, 0, 0]);
        assert_eq!(mask.count_run(0), 2);
        assert!((mask.fraction_run(1) - 0.25).abs() < 1e-12);
        assert_eq!(s.count(0, NodeState::Refractory), 1);
    }

    #[test]
    fn test_state_matrix_deserialize_validates_shape() {
        let s = StateMatrix::from_rows(&[vec![1, 0, -1]]).unwrap();
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(serde_json::from_str::<StateMatrix>(&json).unwrap(), s);

        let bad = r#"{"runs":2,"nodes":3,"cells":["Active","Inactive"]}"#;
        assert!(serde_json::from_str::<StateMatrix>(bad).is_err());
    }
}
