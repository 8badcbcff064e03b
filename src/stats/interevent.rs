//! Inter-event intervals - gaps between activations of the same node

use super::Moments;
use crate::error::{HtcError, Result};
use crate::histogram::SizeHistogram;
use crate::series::{NodeHistory, SeriesMatrix};
use serde::{Deserialize, Serialize};

/// Gaps between consecutive activations of the same node
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IntereventStats {
    pub mean: f64,
    pub std: f64,
    /// Gap length (steps) → occurrence
    pub histogram: SizeHistogram,
}

/// Append the gaps of one node's 0/1 series. Fewer than two activations
/// count as one gap of the full series length.
fn node_gaps(series: impl Iterator<Item = bool>, len: usize, out: &mut Vec<usize>) {
    let mut last: Option<usize> = None;
    let mut gaps = 0;
    for (t, active) in series.enumerate() {
        if !active {
            continue;
        }
        if let Some(prev) = last {
            out.push(t - prev);
            gaps += 1;
        }
        last = Some(t);
    }
    if gaps == 0 {
        out.push(len);
    }
}

fn summarize(gaps: Vec<usize>) -> Result<IntereventStats> {
    let as_f64: Vec<f64> = gaps.iter().map(|&g| g as f64).collect();
    let Moments { mean, std } = Moments::from_slice(&as_f64)?;
    Ok(IntereventStats {
        mean,
        std,
        histogram: gaps.into_iter().collect(),
    })
}

/// Inter-event intervals of every node (column) of a steps × N 0/1 matrix
pub fn interevent(traces: &SeriesMatrix) -> Result<IntereventStats> {
    if traces.cols() == 0 {
        return Err(HtcError::EmptyInput("inter-event intervals of no nodes"));
    }
    let steps = traces.rows();
    let mut gaps = Vec::new();
    for c in 0..traces.cols() {
        node_gaps((0..steps).map(|t| traces.get(t, c) != 0.0), steps, &mut gaps);
    }
    summarize(gaps)
}

/// Inter-event intervals of every node of every run, pooled
pub fn interevent_history(history: &NodeHistory) -> Result<IntereventStats> {
    if history.runs() == 0 || history.nodes() == 0 {
        return Err(HtcError::EmptyInput("inter-event intervals of no nodes"));
    }
    let steps = history.steps();
    let mut gaps = Vec::new();
    for r in 0..history.runs() {
        for node in 0..history.nodes() {
            node_gaps((0..steps).map(|t| history.step_row(r, t)[node] != 0), steps, &mut gaps);
        }
    }
    summarize(gaps)
}
