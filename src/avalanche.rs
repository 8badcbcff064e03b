//! Avalanches - excursions of an activity series above a reference level
//!
//! Crossing times are refined to fractional sample positions by linear
//! interpolation between the two bracketing samples. The size of an
//! avalanche is the area under the degree-1 spline through
//! `(start, y*)`, every integer sample strictly inside, and `(stop, y*)`.
//!
//! # Example
//! ```
//! use htcsim::avalanche::extract_avalanches;
//!
//! let avalanches = extract_avalanches(&[0.0, 2.0, 0.0, 2.0, 0.0], 1.0);
//! assert_eq!(avalanches.len(), 2);
//! assert!((avalanches[0].duration - 1.0).abs() < 1e-12);
//! ```

use crate::series::SeriesMatrix;
use serde::{Deserialize, Serialize};

/// x at which the line through (x1, y1) and (x2, y2) meets y = y_star
pub fn hline_intersection(x1: f64, y1: f64, x2: f64, y2: f64, y_star: f64) -> f64 {
    if y1 == y2 {
        log::warn!("hline_intersection: the y's are equal ({})", y1);
    }
    (x1 - x2) / (y1 - y2) * (y_star - y2) + x2
}

/// Matched start/stop crossing times, `starts[k] < stops[k]`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Crossings {
    pub starts: Vec<f64>,
    pub stops: Vec<f64>,
}

impl Crossings {
    /// Number of matched pairs
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    /// True when the series has no complete excursion above the level
    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// (start, stop) pairs
    pub fn pairs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.starts.iter().copied().zip(self.stops.iter().copied())
    }
}

/// One excursion above the reference level
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Avalanche {
    /// Area under the activity curve between the crossings
    pub size: f64,
    /// stop - start, in samples
    pub duration: f64,
}

/// Upward and downward crossings of `y_star`, paired in time order.
///
/// A stop with no open start (including a leading stop) is dropped, as is
/// a start never closed by a stop (including a trailing start). A start
/// followed by another start replaces it, so an excursion that only touches
/// `y_star` on the way down is discarded. A series that never
/// completes an excursion yields an empty result.
pub fn find_crossings(series: &[f64], y_star: f64) -> Crossings {
    let mut crossings = Crossings::default();
    let mut open: Option<usize> = None;

    for (i, pair) in series.windows(2).enumerate() {
        let (a, b) = (pair[0], pair[1]);
        if a < y_star && y_star < b {
            open = Some(i);
        } else if a > y_star && y_star > b {
            if let Some(s) = open.take() {
                crossings
                    .starts
                    .push(hline_intersection(s as f64, series[s], (s + 1) as f64, series[s + 1], y_star));
                crossings
                    .stops
                    .push(hline_intersection(i as f64, a, (i + 1) as f64, b, y_star));
            }
        }
    }

    crossings
}

/// Integral of the piecewise-linear interpolant through `knots` (sorted by x)
fn linear_spline_integral(knots: &[(f64, f64)]) -> f64 {
    knots
        .windows(2)
        .map(|k| (k[1].0 - k[0].0) * (k[0].1 + k[1].1) * 0.5)
        .sum()
}

/// Size and duration of every excursion of `series` above `y_star`
pub fn extract_avalanches(series: &[f64], y_star: f64) -> Vec<Avalanche> {
    find_crossings(series, y_star)
        .pairs()
        .map(|(start, stop)| {
            // Integer samples strictly inside (start, stop)
            let first = start.floor() as usize + 1;
            let mut knots = Vec::with_capacity((stop as usize).saturating_sub(first) + 3);
            knots.push((start, y_star));
            let mut t = first;
            while (t as f64) < stop {
                knots.push((t as f64, series[t]));
                t += 1;
            }
            knots.push((stop, y_star));

            Avalanche {
                size: linear_spline_integral(&knots),
                duration: stop - start,
            }
        })
        .collect()
}

/// Avalanches of every run (row) of a runs × steps trace, in run order
pub fn extract_batch(trace: &SeriesMatrix, y_star: f64) -> Vec<Avalanche> {
    (0..trace.rows())
        .flat_map(|r| extract_avalanches(trace.row(r), y_star))
        .collect()
}
