//! # Activity Statistics
//!
//! Derived signatures of HTC activity traces.
//!
//! ## Measures
//!
//! - **Susceptibility**: mean/std of pairwise covariance between node series
//! - **Correlation**: same with Pearson correlation
//! - **Entropy**: mean binary entropy of node activation, per run
//! - **Power spectrum**: one-sided periodogram, averaged over runs
//! - **Inter-event intervals**: gaps between consecutive activations
//! - **Dynamical range / critical threshold**: read off a parameter sweep
//!
//! Every measure is a pure function of an already-produced trace.
//! Boundary values that would give NaN (p ∈ {0,1} in entropy, constant
//! series in correlation) are replaced by 0 before any reduction.

mod moments;
pub use moments::Moments;

mod covariance;
pub use covariance::{correlation, susceptibility};

mod entropy;
pub use entropy::{binary_entropy, entropy, run_entropy};

mod spectrum;
pub use spectrum::{avg_power_spectrum, power_spectrum, Spectrum};

mod interevent;
pub use interevent::{interevent, interevent_history, IntereventStats};

mod sweep;
pub use sweep::{
    dynamical_range, find_nearest, CriticalThreshold, DynamicalRange, ResponseBounds, SweepResult,
};
