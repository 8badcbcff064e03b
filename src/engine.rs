//! HTC Engine - One synchronous step of the three-state rule for a batch of runs
//!
//! Shapes per step:
//!
//! - state `S`: runs × N
//! - active indicator `s`: runs × N, `s = [S == Active]`
//! - weighted input: runs × N, `input[r, i] = Σ_j W[i, j] s[r, j]`
//! - draws: runs × N uniform(0,1), one per cell
//!
//! Transition of every cell uses only the previous step:
//!
//! | from | to | probability |
//! |------|----|-------------|
//! | Inactive | Active | `pA = r1 + (1 - r1) [input > T]` |
//! | Active | Refractory | 1 |
//! | Refractory | Inactive | `r2` |
//!
//! Runs are updated in parallel. Each run reads only its own row and its
//! own draws (or stream), so output does not depend on the thread count.

use crate::error::{HtcError, Result};
use crate::network::Connectivity;
use crate::random::{init_state_streams, RunStreams};
use crate::state::{ActiveMask, NodeState, StateMatrix};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// HTC model parameters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HtcParams {
    /// Activation threshold on weighted active input
    pub threshold: f64,
    /// Spontaneous activation probability (external stimulus)
    pub r1: f64,
    /// Refractory recovery probability
    pub r2: f64,
}

impl Default for HtcParams {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            r1: 0.001,
            r2: 0.2,
        }
    }
}

impl HtcParams {
    pub fn new(threshold: f64, r1: f64, r2: f64) -> Self {
        Self { threshold, r1, r2 }
    }

    /// Same parameters with the threshold multiplied by `mean_weight`
    /// (threshold for an unnormalized matrix)
    pub fn scaled(&self, mean_weight: f64) -> Self {
        Self {
            threshold: self.threshold * mean_weight,
            ..*self
        }
    }

    /// Check probabilities are in [0, 1] and the threshold is finite
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() {
            return Err(HtcError::InvalidParameter(format!(
                "threshold must be finite, got {}",
                self.threshold
            )));
        }
        for (name, p) in [("r1", self.r1), ("r2", self.r2)] {
            if !(0.0..=1.0).contains(&p) {
                return Err(HtcError::InvalidParameter(format!(
                    "{} must be in [0, 1], got {}",
                    name, p
                )));
            }
        }
        Ok(())
    }

    /// Probability that an Inactive node with the given input activates
    #[inline]
    pub fn activation_probability(&self, input: f64) -> f64 {
        let above = (input > self.threshold) as u8 as f64;
        self.r1 + (1.0 - self.r1) * above
    }
}

/// Next state of one cell given its weighted input and a uniform draw
#[inline]
pub fn transition(prev: NodeState, input: f64, draw: f64, params: &HtcParams) -> NodeState {
    match prev {
        NodeState::Inactive => {
            if draw < params.activation_probability(input) {
                NodeState::Active
            } else {
                NodeState::Inactive
            }
        }
        NodeState::Active => NodeState::Refractory,
        NodeState::Refractory => {
            if draw < params.r2 {
                NodeState::Inactive
            } else {
                NodeState::Refractory
            }
        }
    }
}

/// Per-run working buffers, reused across steps
#[derive(Clone, Debug)]
struct RunScratch {
    active: Vec<u8>,
    input: Vec<f64>,
    draws: Vec<f64>,
}

impl RunScratch {
    fn new(n: usize) -> Self {
        Self {
            active: vec![0; n],
            input: vec![0.0; n],
            draws: vec![0.0; n],
        }
    }

    /// Advance one run's row with the given draws. All slices have length N.
    fn advance(
        &mut self,
        prev: &[NodeState],
        w: &Connectivity,
        params: &HtcParams,
        draws: &[f64],
        next: &mut [NodeState],
        mask: &mut [u8],
    ) {
        for (a, s) in self.active.iter_mut().zip(prev) {
            *a = s.is_active() as u8;
        }
        w.weighted_input(&self.active, &mut self.input);

        for i in 0..prev.len() {
            let s = transition(prev[i], self.input[i], draws[i], params);
            next[i] = s;
            mask[i] = s.is_active() as u8;
        }
    }

    /// Advance one run's row drawing N uniforms from `rng` in node order
    fn advance_with<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        prev: &[NodeState],
        w: &Connectivity,
        params: &HtcParams,
        next: &mut [NodeState],
        mask: &mut [u8],
    ) {
        let mut draws = std::mem::take(&mut self.draws);
        for d in draws.iter_mut() {
            *d = rng.gen();
        }
        self.advance(prev, w, params, &draws, next, mask);
        self.draws = draws;
    }
}

fn check_network(state: &StateMatrix, w: &Connectivity) -> Result<()> {
    if state.nodes() != w.len() {
        return Err(HtcError::shape(&[state.runs(), w.len()], &state.shape()));
    }
    Ok(())
}

/// One step with caller-supplied draws (runs × N, row-major).
///
/// Deterministic: identical inputs give bit-identical outputs.
pub fn step_with_draws(
    state: &StateMatrix,
    w: &Connectivity,
    params: &HtcParams,
    draws: &[f64],
) -> Result<(StateMatrix, ActiveMask)> {
    check_network(state, w)?;
    let [runs, n] = state.shape();
    if draws.len() != runs * n {
        return Err(HtcError::shape(&[runs * n], &[draws.len()]));
    }

    let mut next = StateMatrix::inactive(runs, n);
    let mut mask = ActiveMask::zeros(runs, n);
    if n == 0 {
        return Ok((next, mask));
    }

    next.cells_mut()
        .par_chunks_mut(n)
        .zip(mask.bits_mut().par_chunks_mut(n))
        .zip(state.cells().par_chunks(n))
        .zip(draws.par_chunks(n))
        .for_each_init(
            || RunScratch::new(n),
            |scratch, (((next_row, mask_row), prev_row), draw_row)| {
                scratch.advance(prev_row, w, params, draw_row, next_row, mask_row);
            },
        );

    Ok((next, mask))
}

/// One step drawing N uniforms per run from that run's own stream.
///
/// Equivalent to filling row r of the draws with `streams[r]` in node order
/// and calling [`step_with_draws`].
pub fn step<R: Rng + Send>(
    state: &StateMatrix,
    w: &Connectivity,
    params: &HtcParams,
    streams: &mut [R],
) -> Result<(StateMatrix, ActiveMask)> {
    check_network(state, w)?;
    let [runs, n] = state.shape();
    if streams.len() != runs {
        return Err(HtcError::shape(&[runs], &[streams.len()]));
    }

    let mut next = StateMatrix::inactive(runs, n);
    let mut mask = ActiveMask::zeros(runs, n);
    if n == 0 {
        return Ok((next, mask));
    }

    next.cells_mut()
        .par_chunks_mut(n)
        .zip(mask.bits_mut().par_chunks_mut(n))
        .zip(state.cells().par_chunks(n))
        .zip(streams.par_iter_mut())
        .for_each_init(
            || RunScratch::new(n),
            |scratch, (((next_row, mask_row), prev_row), rng)| {
                scratch.advance_with(rng, prev_row, w, params, next_row, mask_row);
            },
        );

    Ok((next, mask))
}

/// A batch of independent runs over one shared network
///
/// Owns the current state, the per-run streams and the step buffers; the
/// connectivity is borrowed read-only.
#[derive(Clone, Debug)]
pub struct HtcBatch<'w> {
    connectivity: &'w Connectivity,
    params: HtcParams,
    state: StateMatrix,
    next: StateMatrix,
    mask: ActiveMask,
    streams: RunStreams,
    scratch: Vec<RunScratch>,
    timestep: u64,
}

impl<'w> HtcBatch<'w> {
    /// Seed `runs` streams and draw the initial state with
    /// `ceil(fraction * N)` active nodes per run
    pub fn new(
        connectivity: &'w Connectivity,
        params: HtcParams,
        runs: usize,
        fraction: f64,
        seed: u64,
    ) -> Result<Self> {
        params.validate()?;
        let n = connectivity.len();
        let mut streams = RunStreams::new(seed, runs);
        let state = init_state_streams(streams.as_mut_slice(), n, fraction)?;
        let mask = state.active_mask();
        Ok(Self {
            connectivity,
            params,
            next: StateMatrix::inactive(runs, n),
            state,
            mask,
            streams,
            scratch: vec![RunScratch::new(n); runs],
            timestep: 0,
        })
    }

    /// Advance every run by one step and return the new active indicator
    pub fn step(&mut self) -> Result<&ActiveMask> {
        let n = self.connectivity.len();
        if n > 0 {
            let (w, params) = (self.connectivity, &self.params);
            self.next
                .cells_mut()
                .par_chunks_mut(n)
                .zip(self.mask.bits_mut().par_chunks_mut(n))
                .zip(self.state.cells().par_chunks(n))
                .zip(self.streams.as_mut_slice().par_iter_mut())
                .zip(self.scratch.par_iter_mut())
                .for_each(|((((next_row, mask_row), prev_row), rng), scratch)| {
                    scratch.advance_with(rng, prev_row, w, params, next_row, mask_row);
                });
        }
        std::mem::swap(&mut self.state, &mut self.next);
        self.timestep += 1;
        Ok(&self.mask)
    }

    /// Split into one independently steppable [`RunLane`] per run
    pub fn into_lanes(self) -> Vec<RunLane<'w>> {
        let Self {
            connectivity,
            params,
            state,
            mask,
            streams,
            scratch,
            timestep,
            ..
        } = self;
        let n = connectivity.len();
        streams
            .into_streams()
            .into_iter()
            .zip(scratch)
            .enumerate()
            .map(|(r, (rng, scratch))| RunLane {
                connectivity,
                params,
                state: state.row(r).to_vec(),
                next: vec![NodeState::Inactive; n],
                mask: mask.row(r).to_vec(),
                rng,
                scratch,
                timestep,
            })
            .collect()
    }

    /// Current state
    pub fn state(&self) -> &StateMatrix {
        &self.state
    }

    /// Current active indicator
    pub fn mask(&self) -> &ActiveMask {
        &self.mask
    }

    /// Model parameters
    pub fn params(&self) -> &HtcParams {
        &self.params
    }

    /// Shared network
    pub fn connectivity(&self) -> &'w Connectivity {
        self.connectivity
    }

    /// Steps taken since construction
    pub fn timestep(&self) -> u64 {
        self.timestep
    }

    /// Number of runs
    pub fn runs(&self) -> usize {
        self.state.runs()
    }
}

/// One run of a batch, stepped on its own.
///
/// Follows the same trajectory as row r of the [`HtcBatch`] it came from.
#[derive(Clone, Debug)]
pub struct RunLane<'w> {
    connectivity: &'w Connectivity,
    params: HtcParams,
    state: Vec<NodeState>,
    next: Vec<NodeState>,
    mask: Vec<u8>,
    rng: ChaCha8Rng,
    scratch: RunScratch,
    timestep: u64,
}

impl RunLane<'_> {
    /// Advance by one step and return the new active indicator
    pub fn step(&mut self) -> &[u8] {
        self.scratch.advance_with(
            &mut self.rng,
            &self.state,
            self.connectivity,
            &self.params,
            &mut self.next,
            &mut self.mask,
        );
        std::mem::swap(&mut self.state, &mut self.next);
        self.timestep += 1;
        &self.mask
    }

    /// Current state
    pub fn state(&self) -> &[NodeState] {
        &self.state
    }

    /// Current active indicator
    pub fn mask(&self) -> &[u8] {
        &self.mask
    }

    /// Steps taken since the batch was constructed
    pub fn timestep(&self) -> u64 {
        self.timestep
    }
}
