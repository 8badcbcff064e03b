//! Node entropy - binary entropy of per-node activation rates

use super::Moments;
use crate::error::{HtcError, Result};
use crate::series::NodeHistory;

/// Binary entropy in bits; 0 at p = 0 and p = 1
#[inline]
pub fn binary_entropy(p: f64) -> f64 {
    if p <= 0.0 || p >= 1.0 || p.is_nan() {
        return 0.0;
    }
    -(p * p.log2() + (1.0 - p) * (1.0 - p).log2())
}

/// Mean node entropy of one run from its per-node activation rates
pub fn run_entropy(rates: &[f64]) -> Result<f64> {
    if rates.is_empty() {
        return Err(HtcError::EmptyInput("entropy of a run with no nodes"));
    }
    Ok(rates.iter().map(|&p| binary_entropy(p)).sum::<f64>() / rates.len() as f64)
}

/// Ensemble entropy: mean/std over runs of the mean node entropy
pub fn entropy(history: &NodeHistory) -> Result<Moments> {
    let per_run = (0..history.runs())
        .map(|r| run_entropy(&history.activation_rates(r)))
        .collect::<Result<Vec<f64>>>()?;
    Moments::from_slice(&per_run)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_entropy_boundaries() {
        assert_eq!(binary_entropy(0.0), 0.0);
        assert_eq!(binary_entropy(1.0), 0.0);
        assert!((binary_entropy(0.5) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_saturated_nodes_contribute_zero() {
        // Node 0 always active, node 1 never, node 2 half the time
        let steps: Vec<Vec<u8>> = (0..4).map(|t| vec![1, 0, (t % 2) as u8]).collect();
        let h = NodeHistory::from_nested(&[steps.clone(), steps]).unwrap();
        let e = entropy(&h).unwrap();
        assert!((e.mean - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(e.std, 0.0);
        assert!(e.mean.is_finite());
    }

    #[test]
    fn test_empty_history() {
        let h = NodeHistory::zeros(0, 10, 4);
        assert!(entropy(&h).is_err());
    }
}
