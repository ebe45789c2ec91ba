//! Shared post-processing of a raw clustering

use crate::cluster::metrics::balanced_entropy;
use crate::cluster::{ClusterOutput, MeanCentroid, RawClustering, Representative};
use crate::distance::Dissimilarity;
use ndarray::{Array2, ArrayView1, ArrayView2};
use rayon::prelude::*;

/// Basis and mean used to map reduced centroids back to curve space
#[derive(Debug, Clone, Copy)]
pub struct Projection<'a> {
    /// `pc_number × Column`
    pub basis: ArrayView2<'a, f32>,
    /// `Column`
    pub mean: ArrayView1<'a, f32>,
}

/// Relabel clusters by ascending size and derive labels, per-curve sizes,
/// representatives, original-space centroids and balanced entropy.
///
/// `metric` measures the space the clustering ran in; it picks the closest
/// and furthest member of every cluster.
pub fn finalize<M: Dissimilarity + ?Sized>(
    raw: &RawClustering,
    metric: &M,
    projection: Option<Projection<'_>>,
) -> ClusterOutput {
    let sizes: Vec<usize> = raw.members.iter().map(Vec::len).collect();
    let total: usize = sizes.iter().sum();

    let relabel = ascending_order(&sizes);
    let group_count = relabel.iter().flatten().count();
    let entropy = balanced_entropy(&sizes, total);

    // Raw id of every curve
    let mut raw_labels = vec![0usize; total];
    for (c, members) in raw.members.iter().enumerate() {
        for &i in members {
            raw_labels[i] = c;
        }
    }

    let (labels, curve_sizes): (Vec<usize>, Vec<usize>) = raw_labels
        .par_iter()
        .map(|&c| (relabel[c].unwrap_or(0), sizes[c]))
        .unzip();

    let mut closest = Vec::with_capacity(group_count);
    let mut furthest = Vec::with_capacity(group_count);
    for (c, members) in raw.members.iter().enumerate() {
        let Some(cluster) = relabel[c] else { continue };
        let (near, far) = extremes(metric, raw.centroids.row(c), members);
        closest.push(Representative { index: near, cluster });
        furthest.push(Representative { index: far, cluster });
    }

    let original: Array2<f32> = match projection {
        Some(p) => raw.centroids.dot(&p.basis) + &p.mean,
        None => raw.centroids.clone(),
    };
    let centroids = relabel
        .iter()
        .enumerate()
        .filter_map(|(c, id)| {
            id.map(|cluster| MeanCentroid {
                coordinates: original.row(c).to_vec(),
                cluster,
            })
        })
        .collect();

    log::info!("There are {} groups generated", group_count);

    ClusterOutput {
        labels,
        sizes: curve_sizes,
        closest,
        furthest,
        centroids,
        entropy,
        group_count,
    }
}

/// New id of every raw cluster: ascending by size, ties by raw id; empty clusters get none
pub fn ascending_order(sizes: &[usize]) -> Vec<Option<usize>> {
    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by_key(|&c| (sizes[c], c));

    let mut relabel = vec![None; sizes.len()];
    let mut next = 0;
    for c in order {
        if sizes[c] > 0 {
            relabel[c] = Some(next);
            next += 1;
        }
    }
    relabel
}

/// First member closest to and first member furthest from `centroid`
fn extremes<M: Dissimilarity + ?Sized>(
    metric: &M,
    centroid: ArrayView1<f32>,
    members: &[usize],
) -> (usize, usize) {
    let first = members[0];
    let d0 = metric.to_row(centroid, first);
    let (mut near, mut near_d) = (first, d0);
    let (mut far, mut far_d) = (first, d0);

    for &i in &members[1..] {
        let d = metric.to_row(centroid, i);
        if d < near_d {
            near = i;
            near_d = d;
        }
        if d > far_d {
            far = i;
            far_d = d;
        }
    }

    (near, far)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Norm;
    use ndarray::array;

    fn blobs() -> Array2<f32> {
        array![[0.0f32, 0.0], [0.0, 1.0], [1.0, 0.0], [10.0, 10.0], [10.0, 11.0], [11.0, 10.0]]
    }

    fn raw_split() -> RawClustering {
        RawClustering {
            members: vec![vec![3, 4, 5], vec![], vec![0, 1]],
            centroids: array![[31.0f32 / 3.0, 31.0 / 3.0], [99.0, 99.0], [0.0, 0.5]],
        }
    }

    #[test]
    fn relabels_by_ascending_size() {
        assert_eq!(ascending_order(&[3, 0, 2]), vec![Some(1), None, Some(0)]);
        assert_eq!(ascending_order(&[2, 2, 1]), vec![Some(1), Some(2), Some(0)]);
    }

    #[test]
    fn labels_sizes_and_representatives() {
        let data = blobs();
        let metric = Norm::Euclidean.prepare(data.view(), 1);
        let mut raw = raw_split();
        raw.members[2].push(2);
        raw.centroids.row_mut(2).assign(&array![1.0f32 / 3.0, 1.0 / 3.0]);

        let out = finalize(&raw, &metric, None);

        // Equal sizes: ties broken by raw id
        assert_eq!(out.labels, vec![1, 1, 1, 0, 0, 0]);
        assert_eq!(out.sizes, vec![3; 6]);
        assert_eq!(out.group_count, 2);
        assert!((out.entropy - 1.0).abs() < 1e-6);

        assert_eq!(out.closest, vec![
            Representative { index: 3, cluster: 0 },
            Representative { index: 0, cluster: 1 },
        ]);
        // (0,1) and (1,0) tie for furthest; member order decides
        assert_eq!(out.furthest[1], Representative { index: 1, cluster: 1 });
        assert_eq!(out.centroids.len(), 2);
        assert_eq!(out.centroids[0].cluster, 0);
    }

    #[test]
    fn single_group_has_zero_entropy() {
        let data = blobs();
        let metric = Norm::Euclidean.prepare(data.view(), 1);
        let raw = RawClustering {
            members: vec![vec![], (0..6).collect()],
            centroids: Array2::zeros((2, 2)),
        };
        let out = finalize(&raw, &metric, None);
        assert_eq!(out.entropy, 0.0);
        assert_eq!(out.labels, vec![0; 6]);
    }

    #[test]
    fn projects_centroids_back() {
        let data = array![[1.0f32], [3.0]];
        let metric = Norm::Euclidean.prepare(data.view(), 1);
        let raw = RawClustering {
            members: vec![vec![0, 1]],
            centroids: array![[2.0f32]],
        };
        let basis = array![[0.6f32, 0.8]];
        let mean = array![10.0f32, 20.0];
        let projection = Projection {
            basis: basis.view(),
            mean: mean.view(),
        };

        let out = finalize(&raw, &metric, Some(projection));
        let c = &out.centroids[0].coordinates;
        assert!((c[0] - 11.2).abs() < 1e-5);
        assert!((c[1] - 21.6).abs() < 1e-5);
    }

    #[test]
    fn finalizing_twice_is_identical() {
        let data = blobs();
        let metric = Norm::Euclidean.prepare(data.view(), 1);
        let mut raw = raw_split();
        raw.members[2].push(2);

        assert_eq!(finalize(&raw, &metric, None), finalize(&raw, &metric, None));
    }
}
