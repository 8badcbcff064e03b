//! Random fields - power-law samples, initial states, per-run streams
//!
//! Every run of a batch draws from its own [`ChaCha8Rng`] stream derived
//! from one seed, so a batch gives the same numbers whether runs are
//! processed sequentially or in parallel.

use crate::error::{HtcError, Result};
use crate::state::{NodeState, StateMatrix};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Draw `size` samples with pdf(x) ∝ x^g on [a, b].
///
/// Inverse-CDF sampling from uniform(0,1) draws. `g = -1` requires the
/// logarithmic form and is rejected.
pub fn power_law<R: Rng + ?Sized>(rng: &mut R, a: f64, b: f64, g: f64, size: usize) -> Result<Vec<f64>> {
    if g == -1.0 {
        return Err(HtcError::InvalidParameter("g must be different from -1".to_string()));
    }
    if !(a >= 0.0 && b > a) {
        return Err(HtcError::InvalidParameter(format!(
            "power-law support must satisfy 0 <= a < b, got [{}, {}]",
            a, b
        )));
    }
    if g < -1.0 && a == 0.0 {
        return Err(HtcError::InvalidParameter(format!(
            "power-law with g = {} is not normalizable from a = 0",
            g
        )));
    }

    let g1 = g + 1.0;
    let (ag, bg) = (a.powf(g1), b.powf(g1));
    Ok((0..size)
        .map(|_| {
            let r: f64 = rng.gen();
            (ag + (bg - ag) * r).powf(1.0 / g1)
        })
        .collect())
}

/// Unshuffled initial row: `ceil(fraction * n)` Active, then Inactive,
/// then Refractory. Inactive gets the extra node of an odd remainder.
fn initial_row(n: usize, fraction: f64) -> Result<Vec<NodeState>> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(HtcError::InvalidParameter(format!(
            "initial active fraction must be in [0, 1], got {}",
            fraction
        )));
    }
    let n_active = ((fraction * n as f64).ceil() as usize).min(n);
    let rest = n - n_active;
    let n_refractory = rest / 2;
    let n_inactive = rest - n_refractory;

    let mut row = Vec::with_capacity(n);
    row.extend(std::iter::repeat(NodeState::Active).take(n_active));
    row.extend(std::iter::repeat(NodeState::Inactive).take(n_inactive));
    row.extend(std::iter::repeat(NodeState::Refractory).take(n_refractory));
    Ok(row)
}

/// Initial state for `runs` trials of `n` nodes, shuffled per run from one
/// generator.
pub fn init_state<R: Rng + ?Sized>(rng: &mut R, n: usize, runs: usize, fraction: f64) -> Result<StateMatrix> {
    let template = initial_row(n, fraction)?;
    let mut cells = Vec::with_capacity(runs * n);
    for _ in 0..runs {
        let mut row = template.clone();
        row.shuffle(rng);
        cells.extend(row);
    }
    StateMatrix::from_cells(runs, n, cells)
}

/// Initial state where run r is shuffled with `streams[r]`.
pub fn init_state_streams<R: Rng>(streams: &mut [R], n: usize, fraction: f64) -> Result<StateMatrix> {
    let template = initial_row(n, fraction)?;
    let runs = streams.len();
    let mut cells = Vec::with_capacity(runs * n);
    for rng in streams.iter_mut() {
        let mut row = template.clone();
        row.shuffle(rng);
        cells.extend(row);
    }
    StateMatrix::from_cells(runs, n, cells)
}

/// One independent random stream per run, all derived from a single seed.
#[derive(Clone, Debug)]
pub struct RunStreams {
    seed: u64,
    streams: Vec<ChaCha8Rng>,
}

impl RunStreams {
    /// Stream r = ChaCha8 seeded with `seed`, stream id r
    pub fn new(seed: u64, runs: usize) -> Self {
        let streams = (0..runs)
            .map(|r| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                rng.set_stream(r as u64);
                rng
            })
            .collect();
        log::debug!("Seeded {} run streams from seed {}", runs, seed);
        Self { seed, streams }
    }

    /// Seed the streams were derived from
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of streams
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Mutable access to the per-run generators
    pub fn as_mut_slice(&mut self) -> &mut [ChaCha8Rng] {
        &mut self.streams
    }

    /// Hand the generators out, one per run
    pub fn into_streams(self) -> Vec<ChaCha8Rng> {
        self.streams
    }
}
