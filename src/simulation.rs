//! Simulation - one configuration's full run batch over time
//!
//! A [`Simulation`] is the unit of work an external sweep hands to a worker:
//! one (network, parameters) point, all runs, all steps. Runs are advanced
//! in parallel inside each step; the sweep itself is not scheduled here.
//!
//! Recorded per step (after the update):
//!
//! - activity fraction of every run (always)
//! - per-node 0/1 activity (`record_nodes`)
//! - largest / second-largest active cluster and pooled cluster sizes
//!   (`clusters`)

use crate::cluster::{compute_clusters, ClusterRecord};
use crate::engine::{HtcBatch, HtcParams, RunLane};
use crate::error::{HtcError, Result};
use crate::histogram::SizeHistogram;
use crate::network::Connectivity;
use crate::series::{NodeHistory, SeriesMatrix};
use crate::stats::{entropy, Moments};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Run-batch configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Independent runs per batch
    pub runs: usize,
    /// Updates per run
    pub steps: usize,
    /// Fraction of nodes active at t = 0
    pub initial_active_fraction: f64,
    /// Seed of the per-run random streams
    pub seed: u64,
    /// Keep the runs × steps × N node activity
    pub record_nodes: bool,
    /// Compute active clusters at every step
    pub clusters: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            runs: 100,
            steps: 1000,
            initial_active_fraction: 0.1,
            seed: 0,
            record_nodes: false,
            clusters: false,
        }
    }
}

impl SimulationConfig {
    pub fn with_runs_and_steps(runs: usize, steps: usize) -> Self {
        Self {
            runs,
            steps,
            ..Default::default()
        }
    }

    /// Default sizes with node history and cluster analysis enabled
    pub fn analysis() -> Self {
        Self {
            record_nodes: true,
            clusters: true,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.runs == 0 || self.steps == 0 {
            return Err(HtcError::InvalidParameter(format!(
                "runs and steps must be positive, got {} runs x {} steps",
                self.runs, self.steps
            )));
        }
        if !(0.0..=1.0).contains(&self.initial_active_fraction) {
            return Err(HtcError::InvalidParameter(format!(
                "initial active fraction must be in [0, 1], got {}",
                self.initial_active_fraction
            )));
        }
        Ok(())
    }
}

/// Cluster sizes over a run batch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawClusterSeries")]
pub struct ClusterSeries {
    runs: usize,
    steps: usize,
    /// runs × steps, row-major
    largest: Vec<usize>,
    /// runs × steps, row-major
    second_largest: Vec<usize>,
    /// Component sizes pooled over every run and step
    sizes: SizeHistogram,
}

#[derive(Deserialize)]
struct RawClusterSeries {
    runs: usize,
    steps: usize,
    largest: Vec<usize>,
    second_largest: Vec<usize>,
    sizes: SizeHistogram,
}

impl TryFrom<RawClusterSeries> for ClusterSeries {
    type Error = HtcError;

    fn try_from(raw: RawClusterSeries) -> Result<Self> {
        let expected = raw.runs * raw.steps;
        for series in [&raw.largest, &raw.second_largest] {
            if series.len() != expected {
                return Err(HtcError::shape(&[raw.runs, raw.steps], &[series.len()]));
            }
        }
        Ok(Self {
            runs: raw.runs,
            steps: raw.steps,
            largest: raw.largest,
            second_largest: raw.second_largest,
            sizes: raw.sizes,
        })
    }
}

impl ClusterSeries {
    fn new(runs: usize, steps: usize) -> Self {
        Self {
            runs,
            steps,
            largest: vec![0; runs * steps],
            second_largest: vec![0; runs * steps],
            sizes: SizeHistogram::new(),
        }
    }

    fn record(&mut self, run: usize, step: usize, rec: &ClusterRecord) {
        let idx = run * self.steps + step;
        self.largest[idx] = rec.largest;
        self.second_largest[idx] = rec.second_largest;
        self.sizes.merge(&rec.sizes);
    }

    /// Largest cluster of one run at one step
    pub fn largest(&self, run: usize, step: usize) -> usize {
        self.largest[run * self.steps + step]
    }

    /// Second-largest cluster of one run at one step
    pub fn second_largest(&self, run: usize, step: usize) -> usize {
        self.second_largest[run * self.steps + step]
    }

    /// Pooled component-size histogram
    pub fn sizes(&self) -> &SizeHistogram {
        &self.sizes
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    fn mean(values: &[usize]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<usize>() as f64 / values.len() as f64
    }

    /// Mean largest cluster over runs and steps
    pub fn mean_largest(&self) -> f64 {
        Self::mean(&self.largest)
    }

    /// Mean second-largest cluster over runs and steps
    pub fn mean_second_largest(&self) -> f64 {
        Self::mean(&self.second_largest)
    }
}

/// Everything recorded by one run batch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    /// Number of nodes of the network
    pub nodes: usize,
    /// Activity fraction, runs × steps
    pub activity: SeriesMatrix,
    /// Node activity, when recorded
    pub history: Option<NodeHistory>,
    /// Cluster sizes, when computed
    pub clusters: Option<ClusterSeries>,
}

/// Scalar description of one configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfigSummary {
    /// Mean activity fraction over runs and steps
    pub mean_activity: f64,
    /// Std of the activity fraction over runs and steps
    pub activity_std: f64,
    /// Mean largest cluster / N
    pub s1: Option<f64>,
    /// Mean second-largest cluster / N
    pub s2: Option<f64>,
    /// Pooled cluster-size histogram
    pub cluster_sizes: Option<SizeHistogram>,
    /// Ensemble node entropy
    pub entropy: Option<Moments>,
}

impl SimulationOutput {
    /// Reduce the recorded traces to per-configuration scalars
    pub fn summary(&self) -> Result<ConfigSummary> {
        let activity = Moments::from_slice(self.activity.data())?;
        let n = self.nodes.max(1) as f64;
        let entropy = self.history.as_ref().map(entropy).transpose()?;

        Ok(ConfigSummary {
            mean_activity: activity.mean,
            activity_std: activity.std,
            s1: self.clusters.as_ref().map(|c| c.mean_largest() / n),
            s2: self.clusters.as_ref().map(|c| c.mean_second_largest() / n),
            cluster_sizes: self.clusters.as_ref().map(|c| c.sizes().clone()),
            entropy,
        })
    }
}

/// Recordings of a single run
struct RunTrace {
    activity: Vec<f64>,
    /// steps × N, empty unless node activity is recorded
    nodes: Vec<u8>,
    /// One record per step, empty unless clusters are computed
    clusters: Vec<ClusterRecord>,
}

impl RunTrace {
    fn record(
        mut lane: RunLane<'_>,
        w: &Connectivity,
        steps: usize,
        record_nodes: bool,
        clusters: bool,
    ) -> Result<Self> {
        let n = w.len();
        let mut trace = RunTrace {
            activity: Vec::with_capacity(steps),
            nodes: Vec::with_capacity(if record_nodes { steps * n } else { 0 }),
            clusters: Vec::with_capacity(if clusters { steps } else { 0 }),
        };
        for _ in 0..steps {
            let mask = lane.step();
            let active = mask.iter().filter(|&&b| b != 0).count();
            trace.activity.push(if n == 0 { 0.0 } else { active as f64 / n as f64 });
            if record_nodes {
                trace.nodes.extend_from_slice(mask);
            }
            if clusters {
                trace.clusters.push(compute_clusters(w, mask)?);
            }
        }
        Ok(trace)
    }
}

/// Run-batch driver for one configuration
#[derive(Clone, Debug)]
pub struct Simulation {
    config: SimulationConfig,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Initialize, advance `steps` times and collect the recordings
    pub fn run(&self, w: &Connectivity, params: &HtcParams) -> Result<SimulationOutput> {
        let SimulationConfig {
            runs,
            steps,
            initial_active_fraction,
            seed,
            record_nodes,
            clusters,
        } = self.config;
        let n = w.len();

        log::debug!(
            "Simulating {} runs x {} steps on {} nodes (T={}, r1={}, r2={}, seed={})",
            runs,
            steps,
            n,
            params.threshold,
            params.r1,
            params.r2,
            seed
        );

        // One task per run, covering the whole trajectory
        let lanes = HtcBatch::new(w, *params, runs, initial_active_fraction, seed)?.into_lanes();
        let traces = lanes
            .into_par_iter()
            .map(|lane| RunTrace::record(lane, w, steps, record_nodes, clusters))
            .collect::<Result<Vec<RunTrace>>>()?;

        let mut activity = SeriesMatrix::zeros(runs, steps);
        let mut history = record_nodes.then(|| NodeHistory::zeros(runs, steps, n));
        let mut cluster_series = clusters.then(|| ClusterSeries::new(runs, steps));
        for (r, trace) in traces.iter().enumerate() {
            for (t, &a) in trace.activity.iter().enumerate() {
                activity.set(r, t, a);
            }
            if let Some(h) = history.as_mut() {
                for t in 0..steps {
                    h.step_mut(r, t).copy_from_slice(&trace.nodes[t * n..(t + 1) * n]);
                }
            }
            if let Some(series) = cluster_series.as_mut() {
                for (t, rec) in trace.clusters.iter().enumerate() {
                    series.record(r, t, rec);
                }
            }
        }

        log::debug!("Finished {} steps, mean activity {:.4}", steps, activity.mean());

        Ok(SimulationOutput {
            nodes: n,
            activity,
            history,
            clusters: cluster_series,
        })
    }
}

/// Mean activity of a run batch: one excitatory-response value of a
/// stimulus sweep
pub fn stimulated_activity(w: &Connectivity, params: &HtcParams, config: &SimulationConfig) -> Result<f64> {
    let config = SimulationConfig {
        record_nodes: false,
        clusters: false,
        ..config.clone()
    };
    Ok(Simulation::new(config)?.run(w, params)?.activity.mean())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::NodeState;

    fn small_config(runs: usize, steps: usize) -> SimulationConfig {
        SimulationConfig {
            initial_active_fraction: 0.2,
            seed: 2024,
            ..SimulationConfig::with_runs_and_steps(runs, steps)
        }
    }

    #[test]
    fn test_config_validate() {
        assert!(SimulationConfig::default().validate().is_ok());
        assert!(SimulationConfig::with_runs_and_steps(0, 10).validate().is_err());
        let bad = SimulationConfig {
            initial_active_fraction: -0.1,
            ..Default::default()
        };
        assert!(Simulation::new(bad).is_err());
    }

    #[test]
    fn test_three_node_scenario() {
        let w = Connectivity::fully_connected(3, 1.0).unwrap().normalize();
        assert_eq!(w.row(0), &[0.0, 0.5, 0.5]);
        let params = HtcParams::new(0.5, 0.0, 1.0);

        let mut batch = HtcBatch::new(&w, params, 1, 1.0 / 3.0, 5).unwrap();
        assert_eq!(batch.state().count(0, NodeState::Active), 1);
        for _ in 0..5 {
            batch.step().unwrap();
            assert!(batch.state().cells().iter().all(|s| (-1..=1).contains(&s.as_i8())));
        }

        // Input 0.5 never exceeds T = 0.5 and r1 = 0: activity dies out
        let config = SimulationConfig {
            initial_active_fraction: 1.0 / 3.0,
            ..SimulationConfig::with_runs_and_steps(1, 5)
        };
        let out = Simulation::new(config).unwrap().run(&w, &params).unwrap();
        assert_eq!(out.activity.rows(), 1);
        assert_eq!(out.activity.cols(), 5);
        assert!(out.activity.data().iter().all(|&a| a == 0.0));
    }

    #[test]
    fn test_same_seed_same_output() {
        let w = Connectivity::fully_connected(12, 1.0).unwrap().normalize();
        let params = HtcParams::new(0.1, 0.05, 0.3);
        let sim = Simulation::new(SimulationConfig {
            record_nodes: true,
            clusters: true,
            ..small_config(6, 40)
        })
        .unwrap();
        let a = sim.run(&w, &params).unwrap();
        let b = sim.run(&w, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_run_matches_batch_stepping() {
        let w = Connectivity::fully_connected(10, 1.0).unwrap().normalize();
        let params = HtcParams::new(0.12, 0.03, 0.4);
        let config = SimulationConfig {
            record_nodes: true,
            ..small_config(5, 25)
        };
        let out = Simulation::new(config.clone()).unwrap().run(&w, &params).unwrap();
        let history = out.history.as_ref().unwrap();

        let mut batch = HtcBatch::new(&w, params, 5, config.initial_active_fraction, config.seed).unwrap();
        for t in 0..25 {
            let mask = batch.step().unwrap();
            for r in 0..5 {
                assert_eq!(out.activity.get(r, t), mask.fraction_run(r));
                assert_eq!(history.step_row(r, t), mask.row(r));
            }
        }
    }

    #[test]
    fn test_recordings_are_consistent() {
        let w = Connectivity::fully_connected(10, 1.0).unwrap().normalize();
        let params = HtcParams::new(0.15, 0.05, 0.5);
        let sim = Simulation::new(SimulationConfig {
            record_nodes: true,
            clusters: true,
            ..small_config(4, 30)
        })
        .unwrap();
        let out = sim.run(&w, &params).unwrap();
        let history = out.history.as_ref().unwrap();
        let clusters = out.clusters.as_ref().unwrap();

        for r in 0..4 {
            for t in 0..30 {
                let active: usize = history.step_row(r, t).iter().map(|&b| b as usize).sum();
                assert!((out.activity.get(r, t) - active as f64 / 10.0).abs() < 1e-12);
                // All-to-all: every active node sits in one cluster
                assert_eq!(clusters.largest(r, t), active);
                assert_eq!(clusters.second_largest(r, t), 0);
            }
        }

        let summary = out.summary().unwrap();
        assert_eq!(summary.s2, Some(0.0));
        assert!(summary.s1.unwrap() <= 1.0);
        let e = summary.entropy.unwrap();
        assert!(e.mean.is_finite() && e.mean >= 0.0 && e.mean <= 1.0);
        assert!(summary.cluster_sizes.unwrap().weighted_sum() > 0);
    }

    #[test]
    fn test_output_deserialize_validates_clusters() {
        let w = Connectivity::fully_connected(6, 1.0).unwrap().normalize();
        let sim = Simulation::new(SimulationConfig {
            record_nodes: true,
            clusters: true,
            ..small_config(2, 5)
        })
        .unwrap();
        let out = sim.run(&w, &HtcParams::new(0.2, 0.1, 0.5)).unwrap();
        let json = serde_json::to_string(&out).unwrap();
        assert_eq!(serde_json::from_str::<SimulationOutput>(&json).unwrap(), out);

        let bad = r#"{"runs":2,"steps":5,"largest":[1],"second_largest":[0],"sizes":{"counts":{}}}"#;
        assert!(serde_json::from_str::<ClusterSeries>(bad).is_err());
    }

    #[test]
    fn test_summary_without_recordings() {
        let w = Connectivity::fully_connected(8, 1.0).unwrap().normalize();
        let out = Simulation::new(small_config(3, 20))
            .unwrap()
            .run(&w, &HtcParams::default())
            .unwrap();
        assert!(out.history.is_none());
        let summary = out.summary().unwrap();
        assert!(summary.s1.is_none());
        assert!(summary.entropy.is_none());
        assert!(summary.mean_activity >= 0.0 && summary.mean_activity <= 1.0);
    }

    #[test]
    fn test_stimulus_raises_activity() {
        let w = Connectivity::fully_connected(20, 1.0).unwrap().normalize();
        let config = small_config(8, 200);
        let quiet = stimulated_activity(&w, &HtcParams::new(0.9, 0.0, 0.3), &config).unwrap();
        let driven = stimulated_activity(&w, &HtcParams::new(0.9, 0.2, 0.3), &config).unwrap();
        assert_eq!(quiet, 0.0);
        assert!(driven > 0.0);
    }
}
