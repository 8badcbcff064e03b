//! Cluster analysis - connected components of the active subnetwork
//!
//! An edge (i, j) survives when `W[i,j] * active[i] * active[j] > 0`.
//! Surviving edges are treated as undirected and merged with a union-find.
//! Only active nodes are counted, so the component sizes of one instant sum
//! to its number of active nodes.

use crate::error::{HtcError, Result};
use crate::histogram::SizeHistogram;
use crate::network::Connectivity;
use serde::{Deserialize, Serialize};

/// Disjoint-set forest with union by size and path compression
#[derive(Clone, Debug)]
pub struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    /// `n` singleton sets
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    /// Representative of the set containing `x`
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    /// Merge the sets of `a` and `b`; returns false if already joined
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        let (big, small) = if self.size[ra] >= self.size[rb] { (ra, rb) } else { (rb, ra) };
        self.parent[small] = big;
        self.size[big] += self.size[small];
        true
    }

    /// Size of the set containing `x`
    pub fn set_size(&mut self, x: usize) -> usize {
        let r = self.find(x);
        self.size[r]
    }
}

/// Component structure of the active subnetwork at one instant
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRecord {
    /// Biggest component size (0 when nothing is active)
    pub largest: usize,
    /// Second biggest component size (0 with fewer than two components)
    pub second_largest: usize,
    /// Component size → occurrence
    pub sizes: SizeHistogram,
}

impl ClusterRecord {
    /// Number of components
    pub fn components(&self) -> usize {
        self.sizes.total()
    }

    /// Number of active nodes covered
    pub fn active_nodes(&self) -> usize {
        self.sizes.weighted_sum()
    }
}

/// Connected components of the graph induced by `active` on `w`.
///
/// `active` is one run's 0/1 indicator, length N.
pub fn compute_clusters(w: &Connectivity, active: &[u8]) -> Result<ClusterRecord> {
    let n = w.len();
    if active.len() != n {
        return Err(HtcError::shape(&[n], &[active.len()]));
    }

    let mut forest = DisjointSet::new(n);
    for i in (0..n).filter(|&i| active[i] != 0) {
        for (j, &wij) in w.row(i).iter().enumerate() {
            if active[j] != 0 && wij > 0.0 {
                forest.union(i, j);
            }
        }
    }

    let mut component_sizes = Vec::new();
    for i in 0..n {
        if active[i] != 0 && forest.find(i) == i {
            component_sizes.push(forest.set_size(i));
        }
    }
    component_sizes.sort_unstable_by(|a, b| b.cmp(a));

    Ok(ClusterRecord {
        largest: component_sizes.first().copied().unwrap_or(0),
        second_largest: component_sizes.get(1).copied().unwrap_or(0),
        sizes: component_sizes.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two triangles {0,1,2} and {3,4,5} joined by the edge 2 → 3
    fn two_triangles() -> Connectivity {
        let mut rows = vec![vec![0.0; 6]; 6];
        for &(i, j) in &[(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3), (2, 3)] {
            rows[i][j] = 1.0;
        }
        Connectivity::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_disjoint_set() {
        let mut ds = DisjointSet::new(5);
        assert!(ds.union(0, 1));
        assert!(ds.union(3, 4));
        assert!(!ds.union(1, 0));
        assert!(ds.union(1, 4));
        assert_eq!(ds.set_size(3), 4);
        assert_eq!(ds.set_size(2), 1);
        assert_eq!(ds.find(0), ds.find(4));
    }

    #[test]
    fn test_bridge_joins_when_both_ends_active() {
        let w = two_triangles();
        let all = compute_clusters(&w, &[1, 1, 1, 1, 1, 1]).unwrap();
        assert_eq!(all.largest, 6);
        assert_eq!(all.second_largest, 0);
        assert_eq!(all.components(), 1);

        // Directed edge 2 → 3 counts in both directions
        let split = compute_clusters(&w, &[1, 1, 0, 1, 1, 1]).unwrap();
        assert_eq!(split.largest, 3);
        assert_eq!(split.second_largest, 2);
    }

    #[test]
    fn test_sizes_sum_to_active_count() {
        let w = two_triangles();
        let active = [1, 0, 1, 0, 1, 1];
        let rec = compute_clusters(&w, &active).unwrap();
        assert_eq!(rec.active_nodes(), 4);
        // {0,2} via 2 → 0, {4,5}
        assert_eq!(rec.sizes.count(2), 2);
    }

    #[test]
    fn test_no_active_nodes() {
        let w = two_triangles();
        let rec = compute_clusters(&w, &[0; 6]).unwrap();
        assert_eq!(rec.largest, 0);
        assert_eq!(rec.second_largest, 0);
        assert!(rec.sizes.is_empty());
    }

    #[test]
    fn test_isolated_actives_are_singletons() {
        let w = Connectivity::from_rows(&[vec![0.0; 3], vec![0.0; 3], vec![0.0; 3]]).unwrap();
        let rec = compute_clusters(&w, &[1, 1, 1]).unwrap();
        assert_eq!(rec.largest, 1);
        assert_eq!(rec.second_largest, 1);
        assert_eq!(rec.sizes.count(1), 3);
    }

    #[test]
    fn test_length_mismatch() {
        let w = two_triangles();
        assert!(compute_clusters(&w, &[1, 1]).is_err());
    }
}
