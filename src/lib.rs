//! # htcsim - Excitable Network Dynamics
//!
//! Stochastic three-state excitable network (Haimovici-Tagliazucchi-Chialvo)
//! over a weighted connectivity graph, and the statistics used to tell its
//! sub-critical, critical and super-critical regimes apart.
//!
//! ## Core Components
//!
//! - **NodeState**: Refractory (-1), Inactive (0), Active (+1)
//! - **Connectivity**: dense N×N weights, row normalization
//! - **Engine**: synchronous HTC update of a batch of independent runs
//! - **Clusters**: connected components of the active subnetwork
//! - **Avalanches**: threshold crossings and spline-area sizes
//! - **Stats**: susceptibility, entropy, power spectrum, inter-event
//!   intervals, dynamical range, critical threshold
//!
//! ## Transition Rule
//!
//! | from | to | probability |
//! |------|----|-------------|
//! | Inactive | Active | `r1 + (1 - r1) [Σ_j W_ij s_j > T]` |
//! | Active | Refractory | 1 |
//! | Refractory | Inactive | `r2` |
//!
//! ## Example
//!
//! ```no_run
//! use htcsim::{Connectivity, HtcParams, Simulation, SimulationConfig};
//! use htcsim::avalanche::extract_batch;
//!
//! let w = Connectivity::fully_connected(64, 1.0)?.normalize();
//! let params = HtcParams::new(0.05, 0.001, 0.2);
//!
//! let sim = Simulation::new(SimulationConfig::with_runs_and_steps(10, 2000))?;
//! let out = sim.run(&w, &params)?;
//!
//! let avalanches = extract_batch(&out.activity, out.activity.mean());
//! let summary = out.summary()?;
//! println!("{} avalanches, <A> = {:.3}", avalanches.len(), summary.mean_activity);
//! # Ok::<(), htcsim::HtcError>(())
//! ```

// Node states and batched state matrices
mod state;
pub use state::{ActiveMask, NodeState, StateMatrix};

// Random fields and per-run streams
pub mod random;
pub use random::{init_state, init_state_streams, power_law, RunStreams};

// Connectivity conditioning
pub mod network;
pub use network::Connectivity;

// HTC update rule
pub mod engine;
pub use engine::{step, step_with_draws, transition, HtcBatch, HtcParams, RunLane};

// Size histograms
mod histogram;
pub use histogram::SizeHistogram;

// Active-subnetwork clusters
pub mod cluster;
pub use cluster::{compute_clusters, ClusterRecord, DisjointSet};

// Avalanche extraction
pub mod avalanche;
pub use avalanche::{extract_avalanches, find_crossings, Avalanche, Crossings};

// Trace containers
mod series;
pub use series::{NodeHistory, SeriesMatrix};

// Activity statistics
pub mod stats;

// Run-batch driver
pub mod simulation;
pub use simulation::{
    stimulated_activity, ClusterSeries, ConfigSummary, Simulation, SimulationConfig,
    SimulationOutput,
};

// Error types
mod error;
pub use error::{HtcError, Result};
