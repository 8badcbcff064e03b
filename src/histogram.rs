//! Size histograms - ordered size → count mapping
//!
//! Used for cluster sizes and inter-event gaps.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered multiset of integer sizes
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeHistogram {
    counts: BTreeMap<usize, usize>,
}

impl SizeHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of `size`
    pub fn record(&mut self, size: usize) {
        self.record_n(size, 1);
    }

    /// Record `n` occurrences of `size`
    pub fn record_n(&mut self, size: usize, n: usize) {
        if n > 0 {
            *self.counts.entry(size).or_insert(0) += n;
        }
    }

    /// Add every entry of another histogram
    pub fn merge(&mut self, other: &SizeHistogram) {
        for (&size, &n) in &other.counts {
            self.record_n(size, n);
        }
    }

    /// Occurrences of `size`
    pub fn count(&self, size: usize) -> usize {
        self.counts.get(&size).copied().unwrap_or(0)
    }

    /// Number of recorded items
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Σ size × count
    pub fn weighted_sum(&self) -> usize {
        self.counts.iter().map(|(s, n)| s * n).sum()
    }

    /// Distinct sizes recorded
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// (size, count) pairs in ascending size order
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.counts.iter().map(|(&s, &n)| (s, n))
    }

    /// Parallel arrays of sizes and counts, sorted by size
    pub fn to_sorted_arrays(&self) -> (Vec<usize>, Vec<usize>) {
        self.iter().unzip()
    }

    /// Largest recorded size
    pub fn max_size(&self) -> Option<usize> {
        self.counts.keys().next_back().copied()
    }
}

impl FromIterator<usize> for SizeHistogram {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut h = SizeHistogram::new();
        for size in iter {
            h.record(size);
        }
        h
    }
}
