//! Moments - mean and population standard deviation

use crate::error::{HtcError, Result};
use serde::{Deserialize, Serialize};

/// Mean and population standard deviation
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Moments {
    pub mean: f64,
    pub std: f64,
}

impl Moments {
    /// Moments of a non-empty sample
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(HtcError::EmptyInput("moments of an empty sample"));
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        Ok(Self { mean, std: var.sqrt() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moments() {
        let m = Moments::from_slice(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((m.mean - 5.0).abs() < 1e-12);
        assert!((m.std - 2.0).abs() < 1e-12);
        assert!(Moments::from_slice(&[]).is_err());
    }
}
