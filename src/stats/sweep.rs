//! Sweep analysis - dynamical range and critical threshold
//!
//! A [`SweepResult`] collects what an external orchestrator measured over
//! a grid of thresholds × stimuli, for the raw matrix and for its
//! row-normalized version.

use crate::avalanche::hline_intersection;
use crate::error::{HtcError, Result};
use serde::{Deserialize, Serialize};

/// Response fractions bracketing the dynamical range
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseBounds {
    /// Lower fraction of the [min, max] response range
    pub low: f64,
    /// Upper fraction of the [min, max] response range
    pub high: f64,
}

impl Default for ResponseBounds {
    fn default() -> Self {
        Self { low: 0.1, high: 0.9 }
    }
}

impl ResponseBounds {
    /// 15% / 85% bracket
    pub fn narrow() -> Self {
        Self { low: 0.15, high: 0.85 }
    }
}

/// Index of the value closest to `target`
pub fn find_nearest(values: &[f64], target: f64) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .min_by(|a, b| (a.1 - target).abs().total_cmp(&(b.1 - target).abs()))
        .map(|(i, _)| i)
}

/// Index of the maximum, NaN entries skipped
fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Indices i where `level` lies strictly between response[i] < response[i+1]
fn upward_brackets(response: &[f64], level: f64) -> impl Iterator<Item = usize> + '_ {
    response
        .windows(2)
        .enumerate()
        .filter(move |(_, w)| level > w[0] && level < w[1])
        .map(|(i, _)| i)
}

/// Dynamical range in dB of one response curve: `10 log10(s_high / s_low)`.
///
/// `s_low` is interpolated at the last upward crossing of the low level and
/// `s_high` at the first upward crossing of the high level.
pub fn dynamical_range(stimuli: &[f64], response: &[f64], bounds: ResponseBounds) -> Result<f64> {
    if stimuli.len() != response.len() {
        return Err(HtcError::shape(&[stimuli.len()], &[response.len()]));
    }
    if response.len() < 2 {
        return Err(HtcError::EmptyInput("dynamical range needs at least two stimuli"));
    }

    let a_max = response.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let a_min = response.iter().copied().fold(f64::INFINITY, f64::min);
    let a_low = (a_max - a_min) * bounds.low + a_min;
    let a_high = (a_max - a_min) * bounds.high + a_min;

    let i_low = upward_brackets(response, a_low).last().ok_or_else(|| {
        HtcError::DegenerateSeries(format!("response never rises through {}", a_low))
    })?;
    let i_high = upward_brackets(response, a_high).next().ok_or_else(|| {
        HtcError::DegenerateSeries(format!("response never rises through {}", a_high))
    })?;

    let s_low = hline_intersection(
        stimuli[i_low],
        response[i_low],
        stimuli[i_low + 1],
        response[i_low + 1],
        a_low,
    );
    let s_high = hline_intersection(
        stimuli[i_high],
        response[i_high],
        stimuli[i_high + 1],
        response[i_high + 1],
        a_high,
    );

    let ratio = s_high / s_low;
    if !(ratio > 0.0 && ratio.is_finite()) {
        return Err(HtcError::UndefinedRatio(format!(
            "stimulus ratio {} / {} has no logarithm",
            s_high, s_low
        )));
    }
    Ok(10.0 * ratio.log10())
}

/// Dynamical range per threshold
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DynamicalRange {
    /// Raw matrix
    pub raw: Vec<f64>,
    /// Row-normalized matrix
    pub normalized: Vec<f64>,
}

/// Threshold maximizing the cluster susceptibility
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CriticalThreshold {
    /// Raw matrix, in weight units (scaled by the mean weight)
    pub raw: f64,
    /// Row-normalized matrix
    pub normalized: f64,
}

/// Measurements of a threshold × stimulus sweep
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSweepResult")]
pub struct SweepResult {
    thresholds: Vec<f64>,
    stimuli: Vec<f64>,
    excitatory_response: Vec<Vec<f64>>,
    excitatory_response_normalized: Vec<Vec<f64>>,
    cluster_susceptibility: Vec<f64>,
    cluster_susceptibility_normalized: Vec<f64>,
    mean_weight: f64,
}

#[derive(Deserialize)]
struct RawSweepResult {
    thresholds: Vec<f64>,
    stimuli: Vec<f64>,
    excitatory_response: Vec<Vec<f64>>,
    excitatory_response_normalized: Vec<Vec<f64>>,
    cluster_susceptibility: Vec<f64>,
    cluster_susceptibility_normalized: Vec<f64>,
    mean_weight: f64,
}

impl TryFrom<RawSweepResult> for SweepResult {
    type Error = HtcError;

    fn try_from(raw: RawSweepResult) -> Result<Self> {
        Self::new(
            raw.thresholds,
            raw.stimuli,
            raw.excitatory_response,
            raw.excitatory_response_normalized,
            raw.cluster_susceptibility,
            raw.cluster_susceptibility_normalized,
            raw.mean_weight,
        )
    }
}

impl SweepResult {
    /// Response rows are indexed by threshold, columns by stimulus.
    /// Susceptibilities are indexed by threshold.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        thresholds: Vec<f64>,
        stimuli: Vec<f64>,
        excitatory_response: Vec<Vec<f64>>,
        excitatory_response_normalized: Vec<Vec<f64>>,
        cluster_susceptibility: Vec<f64>,
        cluster_susceptibility_normalized: Vec<f64>,
        mean_weight: f64,
    ) -> Result<Self> {
        let (nt, ns) = (thresholds.len(), stimuli.len());
        for response in [&excitatory_response, &excitatory_response_normalized] {
            if response.len() != nt {
                return Err(HtcError::shape(&[nt, ns], &[response.len()]));
            }
            if let Some(row) = response.iter().find(|r| r.len() != ns) {
                return Err(HtcError::shape(&[ns], &[row.len()]));
            }
        }
        for s2 in [&cluster_susceptibility, &cluster_susceptibility_normalized] {
            if s2.len() != nt {
                return Err(HtcError::shape(&[nt], &[s2.len()]));
            }
        }
        Ok(Self {
            thresholds,
            stimuli,
            excitatory_response,
            excitatory_response_normalized,
            cluster_susceptibility,
            cluster_susceptibility_normalized,
            mean_weight,
        })
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn stimuli(&self) -> &[f64] {
        &self.stimuli
    }

    pub fn excitatory_response(&self) -> &[Vec<f64>] {
        &self.excitatory_response
    }

    pub fn excitatory_response_normalized(&self) -> &[Vec<f64>] {
        &self.excitatory_response_normalized
    }

    pub fn cluster_susceptibility(&self) -> &[f64] {
        &self.cluster_susceptibility
    }

    pub fn cluster_susceptibility_normalized(&self) -> &[f64] {
        &self.cluster_susceptibility_normalized
    }

    pub fn mean_weight(&self) -> f64 {
        self.mean_weight
    }

    /// Dynamical range of every threshold's response curve
    pub fn dynamical_range(&self, bounds: ResponseBounds) -> Result<DynamicalRange> {
        let per_row = |rows: &[Vec<f64>]| {
            rows.iter()
                .map(|r| dynamical_range(&self.stimuli, r, bounds))
                .collect::<Result<Vec<f64>>>()
        };
        Ok(DynamicalRange {
            raw: per_row(&self.excitatory_response)?,
            normalized: per_row(&self.excitatory_response_normalized)?,
        })
    }

    /// Threshold at the maximum of the cluster susceptibility S2
    pub fn critical_threshold(&self) -> Result<CriticalThreshold> {
        let raw = argmax(&self.cluster_susceptibility)
            .ok_or(HtcError::EmptyInput("critical threshold of an empty S2"))?;
        let normalized = argmax(&self.cluster_susceptibility_normalized)
            .ok_or(HtcError::EmptyInput("critical threshold of an empty S2"))?;
        Ok(CriticalThreshold {
            raw: self.thresholds[raw] * self.mean_weight,
            normalized: self.thresholds[normalized],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear() -> (Vec<f64>, Vec<f64>) {
        let stimuli: Vec<f64> = (1..=11).map(|s| s as f64).collect();
        let response: Vec<f64> = (0..=10).map(|a| a as f64).collect();
        (stimuli, response)
    }

    #[test]
    fn test_dynamical_range_linear() {
        let (s, a) = linear();
        // Quadratic so the 10% / 90% levels fall strictly between samples
        let a: Vec<f64> = a.iter().map(|x| x * x / 10.0 + x * 0.01).collect();
        let d = dynamical_range(&s, &a, ResponseBounds::default()).unwrap();
        assert!(d > 0.0);
    }

    #[test]
    fn test_dynamical_range_value() {
        let stimuli = vec![1.0, 2.0, 4.0, 8.0, 16.0];
        let response = vec![0.0, 0.5, 1.5, 3.5, 5.0];
        // 20% / 80% of [0, 5]: levels 1.0 and 4.0
        let d = dynamical_range(&stimuli, &response, ResponseBounds { low: 0.2, high: 0.8 }).unwrap();
        // s_low between (2, 0.5) and (4, 1.5): 3; s_high between (8, 3.5) and (16, 5): 8 + 8/3
        let expected = 10.0 * ((8.0 + 8.0 / 3.0) / 3.0f64).log10();
        assert!((d - expected).abs() < 1e-10);
    }

    #[test]
    fn test_dynamical_range_flat_is_degenerate() {
        let err = dynamical_range(&[1.0, 2.0, 3.0], &[0.5, 0.5, 0.5], ResponseBounds::default()).unwrap_err();
        assert!(matches!(err, HtcError::DegenerateSeries(_)));
    }

    #[test]
    fn test_dynamical_range_negative_stimulus_ratio() {
        let err = dynamical_range(&[-2.0, -1.0, 1.0], &[0.0, 0.5, 1.0], ResponseBounds::default()).unwrap_err();
        assert!(matches!(err, HtcError::UndefinedRatio(_)));
    }

    #[test]
    fn test_critical_threshold() {
        let sweep = SweepResult::new(
            vec![0.1, 0.2, 0.3],
            vec![1.0, 2.0],
            vec![vec![0.0, 1.0]; 3],
            vec![vec![0.0, 1.0]; 3],
            vec![0.1, 0.7, 0.2],
            vec![0.9, f64::NAN, 0.3],
            2.0,
        )
        .unwrap();
        let tc = sweep.critical_threshold().unwrap();
        assert!((tc.raw - 0.4).abs() < 1e-12);
        assert!((tc.normalized - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_sweep_dynamical_range_per_threshold() {
        let stimuli = vec![1.0, 2.0, 4.0, 8.0, 16.0];
        let response = vec![0.0, 0.5, 1.5, 3.5, 5.0];
        let sweep = SweepResult::new(
            vec![0.1, 0.2],
            stimuli.clone(),
            vec![response.clone(), response.clone()],
            vec![response.clone(), response.clone()],
            vec![0.0, 0.0],
            vec![0.0, 0.0],
            1.0,
        )
        .unwrap();
        let bounds = ResponseBounds { low: 0.2, high: 0.8 };
        let dr = sweep.dynamical_range(bounds).unwrap();
        let single = dynamical_range(&stimuli, &response, bounds).unwrap();
        assert_eq!(dr.raw, vec![single, single]);
        assert_eq!(dr.normalized.len(), 2);
    }

    #[test]
    fn test_sweep_shape_validation() {
        let bad = SweepResult::new(
            vec![0.1, 0.2],
            vec![1.0],
            vec![vec![0.0]],
            vec![vec![0.0], vec![0.0]],
            vec![0.0, 0.0],
            vec![0.0, 0.0],
            1.0,
        );
        assert!(matches!(bad, Err(HtcError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_deserialize_validates_shape() {
        let sweep = SweepResult::new(
            vec![0.1],
            vec![1.0, 2.0],
            vec![vec![0.0, 1.0]],
            vec![vec![0.0, 1.0]],
            vec![0.5],
            vec![0.5],
            1.0,
        )
        .unwrap();
        let json = serde_json::to_string(&sweep).unwrap();
        assert_eq!(serde_json::from_str::<SweepResult>(&json).unwrap(), sweep);

        let bad = r#"{
            "thresholds": [0.1],
            "stimuli": [1.0, 2.0],
            "excitatory_response": [[0.0, 1.0]],
            "excitatory_response_normalized": [[0.0, 1.0]],
            "cluster_susceptibility": [0.0, 5.0],
            "cluster_susceptibility_normalized": [0.5],
            "mean_weight": 1.0
        }"#;
        assert!(serde_json::from_str::<SweepResult>(bad).is_err());
    }

    #[test]
    fn test_find_nearest() {
        assert_eq!(find_nearest(&[0.0, 0.4, 1.0], 0.6), Some(1));
        assert_eq!(find_nearest(&[], 0.6), None);
    }
}
