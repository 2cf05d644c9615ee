//! K-Means clustering algorithm.
//!
//! Lloyd iterations from seeded k-means++ starts, repeated `n_init` times;
//! the run with the lowest inertia wins.

use crate::error::{BookrecError, Result};
use crate::metrics::inertia;
use crate::primitives::{squared_euclidean, Matrix};
use crate::traits::UnsupervisedEstimator;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Seeded k-means over reader embeddings.
///
/// # Algorithm
///
/// 1. Initialize centroids using k-means++ (D² sampling from a seeded RNG)
/// 2. Assign each sample to nearest centroid
/// 3. Update centroids as mean of assigned samples, reseeding any empty
///    cluster with the point farthest from its centroid
/// 4. Repeat until labels are stable, centroids move less than `tol`, or
///    `max_iter` is reached
///
/// Steps 1–4 run `n_init` times and the lowest-inertia run is kept.
///
/// # Examples
///
/// ```
/// use bookrec::prelude::*;
///
/// // 1-D embedding: two tight groups of readers
/// let embedding = Matrix::from_vec(6, 1, vec![0.0, 0.3, 0.1, 7.0, 7.4, 7.2])
///     .expect("6x1 matrix");
///
/// let mut kmeans = KMeans::new(2).with_random_state(0);
/// kmeans.fit(&embedding).expect("2 < 6 readers");
///
/// let labels = kmeans.labels();
/// assert!(labels[..3].iter().all(|&l| l == labels[0]));
/// assert!(labels[3..].iter().all(|&l| l != labels[0]));
/// assert!(kmeans.inertia() < 0.2);
/// ```
///
/// # Performance
///
/// - Time complexity: O(n_init · nkdi) where n=samples, k=clusters, d=features, i=iterations
/// - Space complexity: O(nk)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeans {
    /// Number of clusters.
    n_clusters: usize,
    /// Maximum iterations per run.
    max_iter: usize,
    /// Convergence tolerance on centroid movement.
    tol: f32,
    /// Number of independent restarts.
    n_init: usize,
    /// Random seed for initialization.
    random_state: Option<u64>,
    /// Cluster centroids after fitting.
    centroids: Option<Matrix<f32>>,
    /// Labels for training data.
    labels: Option<Vec<usize>>,
    /// Sum of squared distances (inertia).
    inertia: f32,
    /// Number of iterations run by the kept restart.
    n_iter: usize,
}

impl Default for KMeans {
    fn default() -> Self {
        Self::new(8)
    }
}

/// Outcome of one Lloyd run.
struct Run {
    centroids: Matrix<f32>,
    labels: Vec<usize>,
    inertia: f32,
    n_iter: usize,
}

impl KMeans {
    /// Creates a new K-Means with the specified number of clusters.
    #[must_use]
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            max_iter: 300,
            tol: 1e-4,
            n_init: 10,
            random_state: None,
            centroids: None,
            labels: None,
            inertia: 0.0,
            n_iter: 0,
        }
    }

    /// Sets the maximum number of iterations.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the convergence tolerance.
    #[must_use]
    pub fn with_tol(mut self, tol: f32) -> Self {
        self.tol = tol;
        self
    }

    /// Sets the number of restarts.
    #[must_use]
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    /// Sets the random seed for reproducibility.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Number of clusters.
    #[must_use]
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Returns the cluster centroids.
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

    /// Returns the training labels.
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

    /// Returns the inertia (within-cluster sum of squares).
    #[must_use]
    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    /// Returns the number of iterations run.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Returns true if the model has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.centroids.is_some()
    }

    /// Initializes centroids using k-means++.
    fn kmeans_plusplus_init(&self, x: &Matrix<f32>, rng: &mut StdRng) -> Vec<Vec<f32>> {
        let n_samples = x.n_rows();
        let mut centroids: Vec<Vec<f32>> = Vec::with_capacity(self.n_clusters);
        centroids.push(x.row(rng.gen_range(0..n_samples)).to_vec());

        let mut min_distances: Vec<f64> = x
            .rows()
            .map(|row| f64::from(squared_euclidean(row, &centroids[0])))
            .collect();

        while centroids.len() < self.n_clusters {
            let total: f64 = min_distances.iter().sum();
            let next = if total > 0.0 {
                // Select point with probability proportional to D²
                let target = rng.gen::<f64>() * total;
                let mut cumulative = 0.0;
                let mut chosen = None;
                for (i, &d) in min_distances.iter().enumerate() {
                    cumulative += d;
                    if d > 0.0 && cumulative > target {
                        chosen = Some(i);
                        break;
                    }
                }
                chosen.unwrap_or_else(|| {
                    min_distances
                        .iter()
                        .rposition(|&d| d > 0.0)
                        .unwrap_or(n_samples - 1)
                })
            } else {
                // every point coincides with a centroid already
                rng.gen_range(0..n_samples)
            };

            let centroid = x.row(next).to_vec();
            for (i, row) in x.rows().enumerate() {
                let d = f64::from(squared_euclidean(row, &centroid));
                if d < min_distances[i] {
                    min_distances[i] = d;
                }
            }
            centroids.push(centroid);
        }

        centroids
    }

    /// Assigns each sample to the nearest centroid; ties go to the lower index.
    fn assign_labels(x: &Matrix<f32>, centroids: &[Vec<f32>]) -> Vec<usize> {
        x.rows()
            .map(|point| {
                let mut min_dist = f32::INFINITY;
                let mut min_cluster = 0;
                for (k, centroid) in centroids.iter().enumerate() {
                    let dist = squared_euclidean(point, centroid);
                    if dist < min_dist {
                        min_dist = dist;
                        min_cluster = k;
                    }
                }
                min_cluster
            })
            .collect()
    }

    /// Updates centroids as the mean of assigned samples.
    ///
    /// An empty cluster takes the point farthest from its current centroid,
    /// drawn from a cluster that can spare it.
    fn update_centroids(
        &self,
        x: &Matrix<f32>,
        labels: &mut [usize],
        old: &[Vec<f32>],
    ) -> Vec<Vec<f32>> {
        let n_features = x.n_cols();
        let mut sums = vec![vec![0.0_f64; n_features]; self.n_clusters];
        let mut counts = vec![0usize; self.n_clusters];

        for (row, &label) in x.rows().zip(labels.iter()) {
            counts[label] += 1;
            for (s, &v) in sums[label].iter_mut().zip(row) {
                *s += f64::from(v);
            }
        }

        for k in 0..self.n_clusters {
            if counts[k] > 0 {
                continue;
            }
            let farthest = x
                .rows()
                .enumerate()
                .filter(|(i, _)| counts[labels[*i]] > 1)
                .map(|(i, row)| (i, squared_euclidean(row, &old[labels[i]])))
                .fold(None, |best: Option<(usize, f32)>, (i, d)| match best {
                    Some((_, bd)) if bd >= d => best,
                    _ => Some((i, d)),
                });
            if let Some((i, _)) = farthest {
                let from = labels[i];
                trace!(cluster = k, point = i, "reseeding empty cluster");
                for (j, &v) in x.row(i).iter().enumerate() {
                    sums[from][j] -= f64::from(v);
                    sums[k][j] = f64::from(v);
                }
                counts[from] -= 1;
                counts[k] = 1;
                labels[i] = k;
            }
        }

        sums.into_iter()
            .zip(&counts)
            .zip(old)
            .map(|((sum, &count), previous)| {
                if count == 0 {
                    previous.clone()
                } else {
                    sum.iter().map(|s| (s / count as f64) as f32).collect()
                }
            })
            .collect()
    }

    /// Checks if centroids have converged.
    fn centroids_converged(&self, old: &[Vec<f32>], new: &[Vec<f32>]) -> bool {
        old.iter()
            .zip(new)
            .all(|(a, b)| squared_euclidean(a, b) <= self.tol * self.tol)
    }

    fn single_run(&self, x: &Matrix<f32>, rng: &mut StdRng) -> Result<Run> {
        let mut centroids = self.kmeans_plusplus_init(x, rng);
        let mut labels = Self::assign_labels(x, &centroids);
        let mut n_iter = 0;

        for iter in 0..self.max_iter {
            n_iter = iter + 1;
            let new_centroids = self.update_centroids(x, &mut labels, &centroids);
            let converged = self.centroids_converged(&centroids, &new_centroids);
            centroids = new_centroids;

            let new_labels = Self::assign_labels(x, &centroids);
            let stable = new_labels == labels;
            labels = new_labels;
            if stable || converged {
                break;
            }
        }
        // the last assignment may postdate the last update
        let centroids = self.update_centroids(x, &mut labels, &centroids);

        let n_features = x.n_cols();
        let centroids = Matrix::from_vec(
            self.n_clusters,
            n_features,
            centroids.into_iter().flatten().collect(),
        )?;
        let inertia = inertia(x, &centroids, &labels);
        Ok(Run {
            centroids,
            labels,
            inertia,
            n_iter,
        })
    }
}

impl UnsupervisedEstimator for KMeans {
    type Labels = Vec<usize>;

    /// Fits the K-Means model to data.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Data is empty
    /// - Data has fewer samples than clusters
    /// - `n_clusters` or `n_init` is zero
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
        let n_samples = x.n_rows();

        if n_samples == 0 {
            return Err(BookrecError::empty_input("k-means input"));
        }
        if self.n_clusters == 0 || n_samples < self.n_clusters {
            return Err(BookrecError::invalid_k(self.n_clusters, n_samples));
        }
        if self.n_init == 0 {
            return Err(BookrecError::Clustering(
                "n_init must be at least 1".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.random_state.unwrap_or(0));
        let mut best: Option<Run> = None;
        for restart in 0..self.n_init {
            let run = self.single_run(x, &mut rng)?;
            trace!(restart, inertia = run.inertia, n_iter = run.n_iter, "k-means restart");
            if best.as_ref().map_or(true, |b| run.inertia < b.inertia) {
                best = Some(run);
            }
        }

        let best = best.ok_or_else(|| BookrecError::Clustering("no k-means run".to_string()))?;
        debug!(
            k = self.n_clusters,
            inertia = best.inertia,
            n_iter = best.n_iter,
            "fitted k-means"
        );
        self.inertia = best.inertia;
        self.n_iter = best.n_iter;
        self.labels = Some(best.labels);
        self.centroids = Some(best.centroids);
        Ok(())
    }

    /// Predicts cluster labels for new data.
    fn predict(&self, x: &Matrix<f32>) -> Vec<usize> {
        let centroids: Vec<Vec<f32>> = self.centroids().rows().map(<[f32]>::to_vec).collect();
        Self::assign_labels(x, &centroids)
    }
}

#[cfg(test)]
#[path = "tests_kmeans_contract.rs"]
mod tests_kmeans_contract;
