//! Pairwise co-fluctuation of node series
//!
//! Input is a steps × N matrix: column i is the time series of node i.

use super::Moments;
use crate::error::{HtcError, Result};
use crate::series::SeriesMatrix;

/// N×N sample covariance (ddof = 1), row-major
fn covariance_matrix(traces: &SeriesMatrix) -> Result<Vec<f64>> {
    let (steps, n) = (traces.rows(), traces.cols());
    if steps < 2 || n < 2 {
        return Err(HtcError::DimensionMismatch {
            expected: vec![2, 2],
            actual: vec![steps, n],
        });
    }

    let mut means = vec![0.0; n];
    for t in 0..steps {
        for (m, &x) in means.iter_mut().zip(traces.row(t)) {
            *m += x;
        }
    }
    for m in &mut means {
        *m /= steps as f64;
    }

    let mut cov = vec![0.0; n * n];
    let mut centered = vec![0.0; n];
    for t in 0..steps {
        for (c, (&x, &m)) in centered.iter_mut().zip(traces.row(t).iter().zip(&means)) {
            *c = x - m;
        }
        for i in 0..n {
            let ci = centered[i];
            if ci == 0.0 {
                continue;
            }
            for j in i..n {
                cov[i * n + j] += ci * centered[j];
            }
        }
    }

    let denom = (steps - 1) as f64;
    for i in 0..n {
        for j in i..n {
            let v = cov[i * n + j] / denom;
            cov[i * n + j] = v;
            cov[j * n + i] = v;
        }
    }
    Ok(cov)
}

/// Strict upper triangle of a row-major n×n matrix
fn upper_triangle(m: &[f64], n: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        out.extend_from_slice(&m[i * n + i + 1..(i + 1) * n]);
    }
    out
}

/// Mean and std of the pairwise covariances between the N columns
pub fn susceptibility(traces: &SeriesMatrix) -> Result<Moments> {
    let cov = covariance_matrix(traces)?;
    Moments::from_slice(&upper_triangle(&cov, traces.cols()))
}

/// Mean and std of the pairwise Pearson correlations between the N columns.
///
/// A pair involving a constant column contributes 0.
pub fn correlation(traces: &SeriesMatrix) -> Result<Moments> {
    let n = traces.cols();
    let mut cov = covariance_matrix(traces)?;
    let sd: Vec<f64> = (0..n).map(|i| cov[i * n + i].sqrt()).collect();
    for i in 0..n {
        for j in 0..n {
            let denom = sd[i] * sd[j];
            cov[i * n + j] = if denom > 0.0 { cov[i * n + j] / denom } else { 0.0 };
        }
    }
    Moments::from_slice(&upper_triangle(&cov, n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SeriesMatrix {
        SeriesMatrix::from_rows(&[
            vec![1.0, 0.0, 1.0, 0.0],
            vec![0.0, 1.0, 1.0, 0.0],
            vec![1.0, 1.0, 0.0, 1.0],
            vec![0.0, 0.0, 1.0, 1.0],
            vec![1.0, 0.0, 0.0, 0.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_covariance_of_identical_columns() {
        // Two copies of [0, 1, 2]: sample variance 1
        let m = SeriesMatrix::from_rows(&[vec![0.0, 0.0], vec![1.0, 1.0], vec![2.0, 2.0]]).unwrap();
        let s = susceptibility(&m).unwrap();
        assert!((s.mean - 1.0).abs() < 1e-12);
        assert_eq!(s.std, 0.0);
    }

    #[test]
    fn test_permutation_invariance() {
        let m = sample();
        let base = susceptibility(&m).unwrap();
        let permuted = susceptibility(&m.permute_columns(&[2, 0, 3, 1]).unwrap()).unwrap();
        assert!((base.mean - permuted.mean).abs() < 1e-12);
        assert!((base.std - permuted.std).abs() < 1e-12);
    }

    #[test]
    fn test_correlation_bounds_and_constant_column() {
        let m = SeriesMatrix::from_rows(&[
            vec![0.0, 0.0, 5.0],
            vec![1.0, 2.0, 5.0],
            vec![2.0, 4.0, 5.0],
        ])
        .unwrap();
        // Pairs: (0,1) = 1, (0,2) = 0, (1,2) = 0
        let c = correlation(&m).unwrap();
        assert!((c.mean - 1.0 / 3.0).abs() < 1e-12);
        assert!(c.mean.is_finite() && c.std.is_finite());

        let r = correlation(&sample()).unwrap();
        assert!(r.mean >= -1.0 && r.mean <= 1.0);
    }

    #[test]
    fn test_too_small() {
        let one_step = SeriesMatrix::from_rows(&[vec![1.0, 2.0]]).unwrap();
        assert!(susceptibility(&one_step).is_err());
        let one_col = SeriesMatrix::from_rows(&[vec![1.0], vec![2.0]]).unwrap();
        assert!(correlation(&one_col).is_err());
    }
}
