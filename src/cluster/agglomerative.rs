//! Agglomerative (bottom-up hierarchical) clustering.
//!
//! The merge tree is built with the nearest-neighbor chain algorithm over a
//! condensed distance matrix, updating distances with the Lance–Williams
//! recurrence. All four supported linkages are reducible, so the chain
//! produces the same tree as the naive closest-pair search in O(n²) time.
//!
//! Merges are reported in scipy's convention: leaves are `0..n`, the i-th
//! merge creates node `n + i`, and merges are sorted by height.

use crate::error::{BookrecError, Result};
use crate::primitives::{euclidean, Matrix};
use crate::traits::UnsupervisedEstimator;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Inter-cluster distance used when merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Linkage {
    /// Minimum pairwise distance
    Single,
    /// Maximum pairwise distance
    Complete,
    /// Mean pairwise distance (UPGMA)
    Average,
    /// Minimum increase of within-cluster variance
    Ward,
}

/// One merge of the dendrogram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Merge {
    /// Smaller node id of the merged pair
    pub left: usize,
    /// Larger node id of the merged pair
    pub right: usize,
    /// Linkage distance at which the pair merged
    pub distance: f64,
    /// Number of leaves under the new node
    pub size: usize,
}

/// Agglomerative clustering with a configurable linkage.
///
/// # Examples
///
/// ```
/// use bookrec::cluster::{AgglomerativeClustering, Linkage};
/// use bookrec::prelude::*;
///
/// let data = Matrix::from_vec(4, 1, vec![0.0, 0.1, 5.0, 5.1]).expect("valid matrix");
/// let mut hc = AgglomerativeClustering::new(2, Linkage::Ward);
/// hc.fit(&data).expect("fit succeeds");
///
/// assert_eq!(hc.labels(), &[0, 0, 1, 1]);
/// assert_eq!(hc.dendrogram().len(), 3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgglomerativeClustering {
    n_clusters: usize,
    linkage: Linkage,
    max_samples: usize,
    labels: Option<Vec<usize>>,
    centroids: Option<Matrix<f32>>,
    dendrogram: Option<Vec<Merge>>,
}

impl AgglomerativeClustering {
    /// Default ceiling on the number of samples.
    pub const DEFAULT_MAX_SAMPLES: usize = 10_000;

    /// Creates a new clusterer.
    #[must_use]
    pub fn new(n_clusters: usize, linkage: Linkage) -> Self {
        Self {
            n_clusters,
            linkage,
            max_samples: Self::DEFAULT_MAX_SAMPLES,
            labels: None,
            centroids: None,
            dendrogram: None,
        }
    }

    /// Sets the largest input accepted by [`fit`](UnsupervisedEstimator::fit).
    ///
    /// The condensed distance matrix needs `n (n - 1) / 2` entries, so
    /// larger inputs are refused up front.
    #[must_use]
    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }

    /// Linkage in use.
    #[must_use]
    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// Returns true if the model has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.dendrogram.is_some()
    }

    /// Cluster labels of the training data, numbered by first appearance.
    ///
    /// # Panics
    ///
    /// Panics if model is not fitted.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        self.labels
            .as_deref()
            .expect("Model not fitted. Call fit() first.")
    }

    /// Mean of each cluster in the training data.
    ///
    /// # Panics
    ///
    /// Panics if model is not fitted.
    #[must_use]
    pub fn centroids(&self) -> &Matrix<f32> {
        self.centroids
            .as_ref()
            .expect("Model not fitted. Call fit() first.")
    }

    /// Full merge history, sorted by height.
    ///
    /// # Panics
    ///
    /// Panics if model is not fitted.
    #[must_use]
    pub fn dendrogram(&self) -> &[Merge] {
        self.dendrogram
            .as_deref()
            .expect("Model not fitted. Call fit() first.")
    }

    /// Cuts the fitted tree into `k` clusters.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is not fitted or `k` is not in
    /// `1..=n_samples`.
    pub fn cut(&self, k: usize) -> Result<Vec<usize>> {
        let merges = self
            .dendrogram
            .as_deref()
            .ok_or_else(|| BookrecError::not_fitted("AgglomerativeClustering"))?;
        let n = merges.len() + 1;
        if k == 0 || k > n {
            return Err(BookrecError::invalid_k(k, n));
        }
        Ok(cut_tree(merges, k))
    }
}

impl UnsupervisedEstimator for AgglomerativeClustering {
    type Labels = Vec<usize>;

    /// Builds the full dendrogram and cuts it at `n_clusters`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is empty, `n_clusters` is not in
    /// `1..=n_samples`, or the input exceeds the sample ceiling.
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
        let n_samples = x.n_rows();
        if n_samples == 0 {
            return Err(BookrecError::empty_input("hierarchical clustering input"));
        }
        if self.n_clusters == 0 || self.n_clusters > n_samples {
            return Err(BookrecError::invalid_k(self.n_clusters, n_samples));
        }
        if n_samples > self.max_samples {
            warn!(
                n_samples,
                max_samples = self.max_samples,
                "input too large for hierarchical clustering"
            );
            return Err(BookrecError::Clustering(format!(
                "hierarchical clustering accepts at most {} samples, got {n_samples}",
                self.max_samples
            )));
        }

        let merges = linkage_tree(x, self.linkage);
        let labels = cut_tree(&merges, self.n_clusters);
        let centroids = cluster_means(x, &labels, self.n_clusters)?;

        debug!(
            n_samples,
            k = self.n_clusters,
            linkage = ?self.linkage,
            top_height = merges.last().map_or(0.0, |m| m.distance),
            "fitted agglomerative clustering"
        );

        self.dendrogram = Some(merges);
        self.labels = Some(labels);
        self.centroids = Some(centroids);
        Ok(())
    }

    /// Assigns new points to the nearest cluster mean.
    fn predict(&self, x: &Matrix<f32>) -> Vec<usize> {
        let centroids = self.centroids();
        x.rows()
            .map(|point| {
                let mut best = (0, f32::INFINITY);
                for (k, centroid) in centroids.rows().enumerate() {
                    let d = euclidean(point, centroid);
                    if d < best.1 {
                        best = (k, d);
                    }
                }
                best.0
            })
            .collect()
    }
}

/// Index of pair `(i, j)`, `i < j`, in a condensed distance matrix.
fn condensed_index(n: usize, i: usize, j: usize) -> usize {
    debug_assert!(i < j);
    n * i - i * (i + 1) / 2 + (j - i - 1)
}

/// Lance–Williams update: distance from `k` to the union of `i` and `j`.
fn lance_williams(
    linkage: Linkage,
    d_ik: f64,
    d_jk: f64,
    d_ij: f64,
    n_i: f64,
    n_j: f64,
    n_k: f64,
) -> f64 {
    match linkage {
        Linkage::Single => d_ik.min(d_jk),
        Linkage::Complete => d_ik.max(d_jk),
        Linkage::Average => (n_i * d_ik + n_j * d_jk) / (n_i + n_j),
        Linkage::Ward => {
            let total = n_i + n_j + n_k;
            (((n_i + n_k) * d_ik * d_ik + (n_j + n_k) * d_jk * d_jk - n_k * d_ij * d_ij) / total)
                .max(0.0)
                .sqrt()
        }
    }
}

/// Builds the complete merge tree of `x`.
fn linkage_tree(x: &Matrix<f32>, linkage: Linkage) -> Vec<Merge> {
    let n = x.n_rows();
    if n < 2 {
        return Vec::new();
    }

    let mut dist = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            dist.push(f64::from(euclidean(x.row(i), x.row(j))));
        }
    }
    let d = |dist: &[f64], a: usize, b: usize| {
        if a < b {
            dist[condensed_index(n, a, b)]
        } else {
            dist[condensed_index(n, b, a)]
        }
    };

    let mut active = vec![true; n];
    let mut size = vec![1usize; n];
    let mut chain: Vec<usize> = Vec::with_capacity(n);
    // (absorbed point, surviving point, height)
    let mut raw: Vec<(usize, usize, f64)> = Vec::with_capacity(n - 1);

    for _ in 0..(n - 1) {
        if chain.is_empty() {
            if let Some(first) = active.iter().position(|&a| a) {
                chain.push(first);
            }
        }

        let (a, b, height) = loop {
            let current = chain[chain.len() - 1];
            let previous = chain.len().checked_sub(2).map(|p| chain[p]);

            // ties keep the previous chain element so the chain terminates
            let (mut nearest, mut best) = match previous {
                Some(p) => (p, d(&dist, current, p)),
                None => (usize::MAX, f64::INFINITY),
            };
            for other in 0..n {
                if !active[other] || other == current {
                    continue;
                }
                let candidate = d(&dist, current, other);
                if candidate < best {
                    best = candidate;
                    nearest = other;
                }
            }

            if Some(nearest) == previous {
                chain.truncate(chain.len() - 2);
                break (current.min(nearest), current.max(nearest), best);
            }
            chain.push(nearest);
        };

        let (n_a, n_b) = (size[a] as f64, size[b] as f64);
        for k in 0..n {
            if !active[k] || k == a || k == b {
                continue;
            }
            let updated = lance_williams(
                linkage,
                d(&dist, a, k),
                d(&dist, b, k),
                height,
                n_a,
                n_b,
                size[k] as f64,
            );
            let idx = if b < k {
                condensed_index(n, b, k)
            } else {
                condensed_index(n, k, b)
            };
            dist[idx] = updated;
        }
        active[a] = false;
        size[b] += size[a];
        raw.push((a, b, height));
    }

    raw.sort_by(|x, y| x.2.total_cmp(&y.2));
    relabel(n, &raw)
}

/// Turns point-level merges into scipy-style node ids.
fn relabel(n: usize, raw: &[(usize, usize, f64)]) -> Vec<Merge> {
    let mut parent: Vec<usize> = (0..n).collect();
    let mut node: Vec<usize> = (0..n).collect();
    let mut size = vec![1usize; n];

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    raw.iter()
        .enumerate()
        .map(|(step, &(a, b, distance))| {
            let (ra, rb) = (find(&mut parent, a), find(&mut parent, b));
            let (id_a, id_b) = (node[ra], node[rb]);
            parent[ra] = rb;
            size[rb] += size[ra];
            node[rb] = n + step;
            Merge {
                left: id_a.min(id_b),
                right: id_a.max(id_b),
                distance,
                size: size[rb],
            }
        })
        .collect()
}

/// Replays the first `n - k` merges and labels leaves by first appearance.
fn cut_tree(merges: &[Merge], k: usize) -> Vec<usize> {
    let n = merges.len() + 1;
    let applied = n - k;
    let mut parent: Vec<Option<usize>> = vec![None; n + applied];
    for (step, merge) in merges.iter().take(applied).enumerate() {
        parent[merge.left] = Some(n + step);
        parent[merge.right] = Some(n + step);
    }

    let mut label_of_root: Vec<Option<usize>> = vec![None; n + applied];
    let mut next = 0;
    (0..n)
        .map(|leaf| {
            let mut root = leaf;
            while let Some(p) = parent[root] {
                root = p;
            }
            *label_of_root[root].get_or_insert_with(|| {
                next += 1;
                next - 1
            })
        })
        .collect()
}

/// Mean of the rows in each cluster.
pub(crate) fn cluster_means(x: &Matrix<f32>, labels: &[usize], k: usize) -> Result<Matrix<f32>> {
    let n_features = x.n_cols();
    let mut sums = vec![0.0_f64; k * n_features];
    let mut counts = vec![0usize; k];
    for (row, &label) in x.rows().zip(labels) {
        counts[label] += 1;
        for (j, &v) in row.iter().enumerate() {
            sums[label * n_features + j] += f64::from(v);
        }
    }
    let data = sums
        .iter()
        .enumerate()
        .map(|(idx, s)| {
            let count = counts[idx / n_features.max(1)];
            if count == 0 {
                0.0
            } else {
                (s / count as f64) as f32
            }
        })
        .collect();
    Matrix::from_vec(k, n_features, data)
}

#[cfg(test)]
#[path = "tests_agglomerative_contract.rs"]
mod tests_agglomerative_contract;
