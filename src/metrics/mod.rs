//! Clustering quality metrics.
//!
//! Includes inertia (within-cluster sum of squares) and the silhouette
//! coefficient, both over Euclidean distance.

use crate::primitives::{euclidean, squared_euclidean, Matrix};

/// Sum of squared distances from each reader vector to its cluster centroid.
///
/// Accumulated in f64.
///
/// ```
/// use bookrec::metrics::inertia;
/// use bookrec::primitives::Matrix;
///
/// // two readers per cluster, each 1.0 from its centroid
/// let readers = Matrix::from_vec(4, 1, vec![-1.0, 1.0, 9.0, 11.0]).expect("4x1");
/// let centroids = Matrix::from_vec(2, 1, vec![0.0, 10.0]).expect("2x1");
/// assert_eq!(inertia(&readers, &centroids, &[0, 0, 1, 1]), 4.0);
/// ```
#[must_use]
pub fn inertia(data: &Matrix<f32>, centroids: &Matrix<f32>, labels: &[usize]) -> f32 {
    let total: f64 = labels
        .iter()
        .enumerate()
        .map(|(i, &label)| f64::from(squared_euclidean(data.row(i), centroids.row(label))))
        .sum();
    total as f32
}

fn silhouette_coefficient(a_i: f64, b_i: f64) -> f64 {
    let max_ab = a_i.max(b_i);
    if max_ab == 0.0 {
        0.0
    } else {
        (b_i - a_i) / max_ab
    }
}

/// Silhouette value of every point: `(b - a) / max(a, b)`, with `a` the mean
/// distance to the rest of its own cluster and `b` the lowest mean distance
/// to another non-empty cluster.
///
/// A point alone in its cluster scores 0. With fewer than two points or
/// fewer than two non-empty clusters every value is 0.
///
/// # Panics
///
/// Panics if `labels` is shorter than the number of rows.
#[must_use]
pub fn silhouette_samples(data: &Matrix<f32>, labels: &[usize]) -> Vec<f32> {
    let n_samples = data.n_rows();
    let n_clusters = labels[..n_samples].iter().max().map_or(0, |&m| m + 1);

    let mut sizes = vec![0usize; n_clusters];
    for &label in &labels[..n_samples] {
        sizes[label] += 1;
    }
    let populated = sizes.iter().filter(|&&s| s > 0).count();
    if n_samples < 2 || populated < 2 {
        return vec![0.0; n_samples];
    }

    (0..n_samples)
        .map(|i| {
            let own = labels[i];
            if sizes[own] == 1 {
                return 0.0;
            }

            // distance sums from point i to every cluster
            let mut sums = vec![0.0_f64; n_clusters];
            let point = data.row(i);
            for (j, other) in data.rows().enumerate() {
                if j != i {
                    sums[labels[j]] += f64::from(euclidean(point, other));
                }
            }

            let a_i = sums[own] / (sizes[own] - 1) as f64;
            let b_i = sums
                .iter()
                .zip(&sizes)
                .enumerate()
                .filter(|&(c, (_, &size))| c != own && size > 0)
                .map(|(_, (sum, &size))| sum / size as f64)
                .fold(f64::INFINITY, f64::min);

            silhouette_coefficient(a_i, b_i) as f32
        })
        .collect()
}

/// Mean of [`silhouette_samples`], in `[-1, 1]`; higher means tighter,
/// better separated clusters.
///
/// ```
/// use bookrec::metrics::silhouette_score;
/// use bookrec::primitives::Matrix;
///
/// let readers = Matrix::from_vec(4, 1, vec![0.0, 0.2, 8.0, 8.2]).expect("4x1");
/// assert!(silhouette_score(&readers, &[0, 0, 1, 1]) > 0.9);
/// // mixing the two groups scores below zero
/// assert!(silhouette_score(&readers, &[0, 1, 0, 1]) < 0.0);
/// ```
#[must_use]
pub fn silhouette_score(data: &Matrix<f32>, labels: &[usize]) -> f32 {
    let samples = silhouette_samples(data, labels);
    if samples.is_empty() {
        return 0.0;
    }
    let total: f64 = samples.iter().map(|&s| f64::from(s)).sum();
    (total / samples.len() as f64) as f32
}

#[cfg(test)]
#[path = "tests_clustering_contract.rs"]
mod tests_clustering_contract;
