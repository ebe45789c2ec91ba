//! Average-linkage agglomerative hierarchical clustering
//!
//! Merging works on a flat list of candidate pairs holding one entry per
//! unordered pair of live nodes. After each merge the list is rebuilt: pairs
//! that do not touch the merged nodes are carried over unchanged and one new
//! pair is appended for every remaining live node, its linkage read from the
//! fixed distance matrix. The next pair to merge is the first minimum of the
//! rebuilt list.

use crate::cluster::RawClustering;
use crate::data::preprocessing::mean_of_rows;
use crate::distance::DistanceMatrix;
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// A node of the merge tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AhcNode {
    /// Singletons use the curve index, merged nodes count up from `Row`
    pub id: usize,

    /// Original curve indices subsumed by this node
    pub elements: Vec<usize>,
}

/// Mergeable pair of live nodes
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CandidatePair {
    pub first: usize,
    pub second: usize,
    pub distance: f32,
}

/// In-progress agglomeration over one distance matrix
pub(crate) struct Merger<'a> {
    distances: &'a DistanceMatrix,
    live: BTreeMap<usize, AhcNode>,
    pairs: Vec<CandidatePair>,
    best: Option<usize>,
    next_id: usize,
}

impl<'a> Merger<'a> {
    /// One singleton per curve and every `(i, j), i < j` pair as a candidate
    pub(crate) fn new(distances: &'a DistanceMatrix) -> Self {
        let rows = distances.size();
        let live = (0..rows)
            .map(|i| (i, AhcNode { id: i, elements: vec![i] }))
            .collect();

        let mut pairs = Vec::with_capacity(rows * rows.saturating_sub(1) / 2);
        for i in 0..rows {
            for j in (i + 1)..rows {
                pairs.push(CandidatePair {
                    first: i,
                    second: j,
                    distance: distances.get(i, j),
                });
            }
        }

        let best = first_minimum(&pairs);

        Self {
            distances,
            live,
            pairs,
            best,
            next_id: rows,
        }
    }

    pub(crate) fn live_count(&self) -> usize {
        self.live.len()
    }

    pub(crate) fn live(&self) -> impl Iterator<Item = &AhcNode> {
        self.live.values()
    }

    pub(crate) fn pairs(&self) -> &[CandidatePair] {
        &self.pairs
    }

    /// Merge the closest pair; returns the new node id, or `None` with fewer than two live nodes
    pub(crate) fn merge_closest(&mut self) -> Option<usize> {
        let popped = self.pairs[self.best?];

        let first = self.live.remove(&popped.first)?;
        let second = self.live.remove(&popped.second)?;

        let mut elements = first.elements;
        elements.extend(second.elements);
        let id = self.next_id;
        self.next_id += 1;

        let remaining = self.live.len();
        let mut rebuilt = Vec::with_capacity((remaining + 1) * remaining / 2);

        // Pairs untouched by the merge carry over in their current order
        rebuilt.extend(self.pairs.iter().copied().filter(|pair| {
            pair.first != popped.first
                && pair.first != popped.second
                && pair.second != popped.first
                && pair.second != popped.second
        }));

        // Linkage from every live node to the new one
        let distances = self.distances;
        let links: Vec<CandidatePair> = self
            .live
            .values()
            .collect::<Vec<_>>()
            .par_iter()
            .map(|node| CandidatePair {
                first: node.id,
                second: id,
                distance: distances.linkage(&elements, &node.elements),
            })
            .collect();

        rebuilt.extend(links);

        debug_assert_eq!(rebuilt.len(), (remaining + 1) * remaining / 2);

        self.live.insert(id, AhcNode { id, elements });
        self.best = first_minimum(&rebuilt);
        self.pairs = rebuilt;

        Some(id)
    }

    /// Live nodes ascending by size, ties by ascending id
    pub(crate) fn into_nodes(self) -> Vec<AhcNode> {
        let mut nodes: Vec<AhcNode> = self.live.into_values().collect();
        nodes.sort_by(|a, b| {
            a.elements
                .len()
                .cmp(&b.elements.len())
                .then(a.id.cmp(&b.id))
        });
        nodes
    }
}

/// Index of the first smallest candidate; `None` only when there are no candidates
fn first_minimum(pairs: &[CandidatePair]) -> Option<usize> {
    let mut best = None;
    let mut min = f32::MAX;
    for (i, pair) in pairs.iter().enumerate() {
        if pair.distance < min {
            min = pair.distance;
            best = Some(i);
        }
    }
    // All-infinite or NaN distances still merge in scan order
    best.or(if pairs.is_empty() { None } else { Some(0) })
}

/// Agglomerate until `target` nodes remain.
///
/// A target at or above the number of curves performs no merge; a target of
/// zero is treated as one.
pub fn merge(distances: &DistanceMatrix, target: usize) -> Vec<AhcNode> {
    let target = target.max(1);
    let mut merger = Merger::new(distances);

    log::info!(
        "Hierarchical merging {} curves into {} groups",
        merger.live_count(),
        target
    );

    while merger.live_count() > target {
        if merger.merge_closest().is_none() {
            break;
        }
    }

    merger.into_nodes()
}

/// Turn sorted merge nodes into a raw clustering over `coordinates`.
///
/// Raw cluster `g` is the `g`-th node; its centroid is the mean of its
/// members' rows.
pub fn label_nodes(nodes: &[AhcNode], coordinates: ArrayView2<f32>) -> RawClustering {
    let dim = coordinates.ncols();
    let mut centroids = Array2::zeros((nodes.len(), dim));

    // Sequential sums keep centroids bit-identical across runs
    for (g, node) in nodes.iter().enumerate() {
        centroids
            .row_mut(g)
            .assign(&mean_of_rows(coordinates, &node.elements));
    }

    RawClustering {
        members: nodes.iter().map(|n| n.elements.clone()).collect(),
        centroids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Norm;
    use ndarray::array;

    fn blobs() -> Array2<f32> {
        array![[0.0f32, 0.0], [0.0, 1.0], [1.0, 0.0], [10.0, 10.0], [10.0, 11.0], [11.0, 10.0]]
    }

    fn synthetic_matrix(n: usize) -> DistanceMatrix {
        let rows = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        if i == j {
                            0.0
                        } else {
                            let (a, b) = (i.min(j), i.max(j));
                            ((a * 7 + b * 13) % 17) as f32 + 1.0
                        }
                    })
                    .collect()
            })
            .collect();
        DistanceMatrix::from_rows(rows).unwrap()
    }

    fn brute_linkage(m: &DistanceMatrix, a: &[usize], b: &[usize]) -> f32 {
        let mut total = 0.0f64;
        for &x in a {
            for &y in b {
                total += m.get(x, y) as f64;
            }
        }
        (total / (a.len() * b.len()) as f64) as f32
    }

    #[test]
    fn linkage_matches_brute_force_after_every_merge() {
        let matrix = synthetic_matrix(9);
        let mut merger = Merger::new(&matrix);

        while merger.live_count() > 1 {
            let id = merger.merge_closest().unwrap();
            let nodes: BTreeMap<usize, Vec<usize>> =
                merger.live().map(|n| (n.id, n.elements.clone())).collect();

            let live = nodes.len();
            assert_eq!(merger.pairs().len(), live * (live - 1) / 2);

            for pair in merger.pairs() {
                assert!(nodes.contains_key(&pair.first) && nodes.contains_key(&pair.second));
                if pair.second == id {
                    let expected = brute_linkage(&matrix, &nodes[&id], &nodes[&pair.first]);
                    assert!((pair.distance - expected).abs() < 1e-5);
                }
            }
        }
    }

    #[test]
    fn live_nodes_partition_curves() {
        let matrix = synthetic_matrix(11);
        let mut merger = Merger::new(&matrix);

        while merger.live_count() > 3 {
            merger.merge_closest();
            let mut all: Vec<usize> = merger.live().flat_map(|n| n.elements.clone()).collect();
            all.sort_unstable();
            assert_eq!(all, (0..11).collect::<Vec<_>>());
        }
    }

    #[test]
    fn merges_two_blobs() {
        let data = blobs();
        let metric = Norm::Euclidean.prepare(data.view(), 1);
        let matrix = DistanceMatrix::compute(&metric);

        let nodes = merge(&matrix, 2);
        assert_eq!(nodes.len(), 2);

        let mut groups: Vec<Vec<usize>> = nodes
            .iter()
            .map(|n| {
                let mut e = n.elements.clone();
                e.sort_unstable();
                e
            })
            .collect();
        groups.sort();
        assert_eq!(groups, vec![vec![0, 1, 2], vec![3, 4, 5]]);
        assert!(nodes.iter().all(|n| n.id >= 6));
    }

    #[test]
    fn first_minimum_pair_merges_first() {
        // (0,1) and (2,3) tie; the scan finds (0,1) first
        let matrix = DistanceMatrix::from_rows(vec![
            vec![0.0, 1.0, 5.0, 5.0],
            vec![1.0, 0.0, 5.0, 5.0],
            vec![5.0, 5.0, 0.0, 1.0],
            vec![5.0, 5.0, 1.0, 0.0],
        ])
        .unwrap();
        let mut merger = Merger::new(&matrix);
        merger.merge_closest();

        let merged: Vec<&AhcNode> = merger.live().filter(|n| n.id == 4).collect();
        assert_eq!(merged[0].elements, vec![0, 1]);
    }

    #[test]
    fn target_at_or_above_rows_keeps_singletons() {
        let matrix = synthetic_matrix(4);
        let nodes = merge(&matrix, 4);
        assert_eq!(nodes.iter().map(|n| n.id).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert_eq!(merge(&matrix, 10).len(), 4);
    }

    #[test]
    fn result_sorted_by_size_then_id() {
        let matrix = synthetic_matrix(10);
        let nodes = merge(&matrix, 4);
        for w in nodes.windows(2) {
            let (a, b) = (&w[0], &w[1]);
            assert!(
                a.elements.len() < b.elements.len()
                    || (a.elements.len() == b.elements.len() && a.id < b.id)
            );
        }
    }

    #[test]
    fn overflowing_distances_still_reach_target() {
        // Squared differences overflow f32, so every linkage is infinite
        let data = array![[0.0f32], [1.0e20], [-1.0e20]];
        let metric = Norm::Euclidean.prepare(data.view(), 1);
        let matrix = DistanceMatrix::compute(&metric);

        let nodes = merge(&matrix, 1);
        assert_eq!(nodes.len(), 1);
        let mut all = nodes[0].elements.clone();
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2]);
    }

    #[test]
    fn first_minimum_falls_back_to_scan_order() {
        let pairs = vec![
            CandidatePair { first: 0, second: 1, distance: f32::INFINITY },
            CandidatePair { first: 0, second: 2, distance: f32::INFINITY },
        ];
        assert_eq!(first_minimum(&pairs), Some(0));
        assert_eq!(first_minimum(&[]), None);
    }

    #[test]
    fn labeling_is_bit_identical_across_runs() {
        let data = Array2::from_shape_fn((200, 4), |(i, j)| ((i * 37 + j * 11) % 97) as f32 * 0.013);
        let nodes = vec![AhcNode { id: 400, elements: (0..200).collect() }];
        let first = label_nodes(&nodes, data.view());
        for _ in 0..5 {
            assert_eq!(label_nodes(&nodes, data.view()), first);
        }
    }

    #[test]
    fn labels_nodes_with_mean_centroids() {
        let data = blobs();
        let nodes = vec![
            AhcNode { id: 7, elements: vec![3, 4, 5] },
            AhcNode { id: 8, elements: vec![0, 1, 2] },
        ];
        let raw = label_nodes(&nodes, data.view());

        assert_eq!(raw.members, vec![vec![3, 4, 5], vec![0, 1, 2]]);
        assert!((raw.centroids[[1, 0]] - 1.0 / 3.0).abs() < 1e-6);
        assert!((raw.centroids[[0, 1]] - 31.0 / 3.0).abs() < 1e-5);
    }
}
