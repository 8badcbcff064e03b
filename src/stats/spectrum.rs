//! Periodogram power spectra
//!
//! One-sided, boxcar window, mean removed, "spectrum" scaling:
//! `P[k] = |X[k]|² / n²`, doubled for every bin except DC and (for even n)
//! Nyquist. The bins of one series sum to its population variance.

use crate::error::{HtcError, Result};
use crate::series::SeriesMatrix;
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Frequency axis and power per bin
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    /// Bin frequencies k / (n dt), k = 0..=n/2
    pub frequencies: Vec<f64>,
    /// Power per bin
    pub power: Vec<f64>,
}

impl Spectrum {
    /// Sum of all bins
    pub fn total_power(&self) -> f64 {
        self.power.iter().sum()
    }

    /// Frequency of the strongest non-DC bin
    pub fn peak_frequency(&self) -> Option<f64> {
        self.power
            .iter()
            .enumerate()
            .skip(1)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .and_then(|(k, _)| self.frequencies.get(k).copied())
    }
}

fn check_input(n: usize, dt: f64) -> Result<()> {
    if n == 0 {
        return Err(HtcError::EmptyInput("power spectrum of an empty series"));
    }
    if !(dt > 0.0 && dt.is_finite()) {
        return Err(HtcError::InvalidParameter(format!("dt must be positive, got {}", dt)));
    }
    Ok(())
}

fn frequencies(n: usize, dt: f64) -> Vec<f64> {
    (0..=n / 2).map(|k| k as f64 / (n as f64 * dt)).collect()
}

fn periodogram(fft: &Arc<dyn Fft<f64>>, series: &[f64]) -> Vec<f64> {
    let n = series.len();
    let mean = series.iter().sum::<f64>() / n as f64;
    let mut buffer: Vec<Complex64> = series.iter().map(|&x| Complex64::new(x - mean, 0.0)).collect();
    fft.process(&mut buffer);

    let scale = 1.0 / (n as f64 * n as f64);
    let bins = n / 2 + 1;
    let mut power: Vec<f64> = buffer[..bins].iter().map(|c| c.norm_sqr() * scale).collect();

    let last_doubled = if n % 2 == 0 { bins - 1 } else { bins };
    for p in power.iter_mut().take(last_doubled).skip(1) {
        *p *= 2.0;
    }
    power
}

/// Periodogram of one series sampled every `dt`
pub fn power_spectrum(series: &[f64], dt: f64) -> Result<Spectrum> {
    check_input(series.len(), dt)?;
    let fft = FftPlanner::<f64>::new().plan_fft_forward(series.len());
    Ok(Spectrum {
        frequencies: frequencies(series.len(), dt),
        power: periodogram(&fft, series),
    })
}

/// Periodogram of every run (row) of a runs × steps trace, averaged over
/// runs. Returns the frequency axis with the averaged power.
pub fn avg_power_spectrum(trace: &SeriesMatrix, dt: f64) -> Result<Spectrum> {
    let (runs, n) = (trace.rows(), trace.cols());
    if runs == 0 {
        return Err(HtcError::EmptyInput("power spectrum of a trace with no runs"));
    }
    check_input(n, dt)?;

    let fft = FftPlanner::<f64>::new().plan_fft_forward(n);
    let mut power = vec![0.0; n / 2 + 1];
    for r in 0..runs {
        for (acc, p) in power.iter_mut().zip(periodogram(&fft, trace.row(r))) {
            *acc += p;
        }
    }
    for p in &mut power {
        *p /= runs as f64;
    }

    Ok(Spectrum {
        frequencies: frequencies(n, dt),
        power,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn variance(x: &[f64]) -> f64 {
        let m = x.iter().sum::<f64>() / x.len() as f64;
        x.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / x.len() as f64
    }

    #[test]
    fn test_total_power_equals_variance() {
        for n in [16usize, 17] {
            let x: Vec<f64> = (0..n).map(|i| ((i * 7919) % 13) as f64 * 0.1).collect();
            let s = power_spectrum(&x, 1.0).unwrap();
            assert_eq!(s.power.len(), n / 2 + 1);
            assert!((s.total_power() - variance(&x)).abs() < 1e-10);
            assert!(s.power[0].abs() < 1e-20);
        }
    }

    #[test]
    fn test_sine_peak() {
        let n = 64;
        let dt = 0.5;
        // 8 cycles over the window: frequency 8 / (n dt) = 0.25
        let x: Vec<f64> = (0..n).map(|i| (2.0 * PI * 8.0 * i as f64 / n as f64).sin()).collect();
        let s = power_spectrum(&x, dt).unwrap();
        assert!((s.peak_frequency().unwrap() - 0.25).abs() < 1e-12);
        assert!((s.frequencies[1] - 1.0 / 32.0).abs() < 1e-12);
    }

    #[test]
    fn test_average_over_runs() {
        let a: Vec<f64> = (0..8).map(|i| (i % 2) as f64).collect();
        let trace = SeriesMatrix::from_rows(&[a.clone(), vec![0.0; 8]]).unwrap();
        let avg = avg_power_spectrum(&trace, 1.0).unwrap();
        let single = power_spectrum(&a, 1.0).unwrap();
        assert_eq!(avg.frequencies, single.frequencies);
        for (p, q) in avg.power.iter().zip(&single.power) {
            assert!((p - q / 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_invalid_input() {
        assert!(power_spectrum(&[], 1.0).is_err());
        assert!(power_spectrum(&[1.0, 2.0], 0.0).is_err());
        let empty = SeriesMatrix::zeros(0, 4);
        assert!(avg_power_spectrum(&empty, 1.0).is_err());
    }
}
