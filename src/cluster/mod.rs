//! Clustering algorithms and the strategies built on them.
//!
//! Includes K-Means clustering with k-means++ initialization and
//! agglomerative clustering with Ward, single, complete and average linkage.
//! [`CentroidStrategy`] and [`HierarchicalStrategy`] adapt them to the
//! [`ClusterStrategy`] seam so the pipeline and the cluster-count selector
//! can use either one.

mod agglomerative;
mod kmeans;

pub use agglomerative::{AgglomerativeClustering, Linkage, Merge};
pub use kmeans::KMeans;

use crate::embedding::Embedding;
use crate::error::{BookrecError, Result};
use crate::metrics::{inertia, silhouette_score};
use crate::primitives::Matrix;
use crate::traits::{ClusterStrategy, UnsupervisedEstimator};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// The available clustering strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// k-means
    #[default]
    Centroid,
    /// Ward agglomerative clustering
    Hierarchical,
}

impl StrategyKind {
    /// Name used in configuration, logs and artifacts.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Centroid => "centroid",
            Self::Hierarchical => "hierarchical",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = BookrecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "centroid" | "kmeans" | "k-means" => Ok(Self::Centroid),
            "hierarchical" | "ward" | "agglomerative" => Ok(Self::Hierarchical),
            other => Err(BookrecError::Configuration(format!(
                "unknown clustering strategy '{other}'"
            ))),
        }
    }
}

/// Users partitioned into `k` clusters.
///
/// Labels follow the embedding's user order. Centroids are the member means
/// in embedding space for every strategy.
#[derive(Debug, Clone)]
pub struct ClusterAssignment {
    users: Vec<u64>,
    labels: Vec<usize>,
    k: usize,
    strategy: String,
    centroids: Matrix<f32>,
    inertia: f32,
    index: HashMap<u64, usize>,
}

impl ClusterAssignment {
    /// Assembles an assignment from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`BookrecError::Clustering`] if lengths disagree, a label is
    /// out of range, or the centroid matrix does not have `k` rows.
    pub fn from_parts(
        users: Vec<u64>,
        labels: Vec<usize>,
        k: usize,
        strategy: impl Into<String>,
        centroids: Matrix<f32>,
        inertia: f32,
    ) -> Result<Self> {
        if users.len() != labels.len() {
            return Err(BookrecError::Clustering(format!(
                "{} users but {} labels",
                users.len(),
                labels.len()
            )));
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= k) {
            return Err(BookrecError::Clustering(format!(
                "label {bad} out of range for k = {k}"
            )));
        }
        if centroids.n_rows() != k {
            return Err(BookrecError::Clustering(format!(
                "{} centroids for k = {k}",
                centroids.n_rows()
            )));
        }
        let index = users.iter().enumerate().map(|(row, &u)| (u, row)).collect();
        Ok(Self {
            users,
            labels,
            k,
            strategy: strategy.into(),
            centroids,
            inertia,
            index,
        })
    }

    /// Builds an assignment from labels, deriving centroids and inertia from
    /// the embedding.
    ///
    /// # Errors
    ///
    /// Returns an error if the labels do not match the embedding.
    pub fn from_labels(
        embedding: &Embedding,
        labels: Vec<usize>,
        k: usize,
        strategy: impl Into<String>,
    ) -> Result<Self> {
        if labels.len() != embedding.n_users() {
            return Err(BookrecError::Clustering(format!(
                "{} labels for {} users",
                labels.len(),
                embedding.n_users()
            )));
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= k) {
            return Err(BookrecError::Clustering(format!(
                "label {bad} out of range for k = {k}"
            )));
        }
        let centroids = agglomerative::cluster_means(embedding.vectors(), &labels, k)?;
        let total = inertia(embedding.vectors(), &centroids, &labels);
        Self::from_parts(
            embedding.users().to_vec(),
            labels,
            k,
            strategy,
            centroids,
            total,
        )
    }

    /// User ids in embedding order.
    #[must_use]
    pub fn users(&self) -> &[u64] {
        &self.users
    }

    /// Cluster label per user, in `[0, k)`.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Number of clusters.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Name of the producing strategy.
    #[must_use]
    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    /// Cluster means, one row per label.
    #[must_use]
    pub fn centroids(&self) -> &Matrix<f32> {
        &self.centroids
    }

    /// Within-cluster sum of squared distances.
    #[must_use]
    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    /// Label of a user, if clustered.
    #[must_use]
    pub fn label_of(&self, user_id: u64) -> Option<usize> {
        self.index.get(&user_id).map(|&row| self.labels[row])
    }

    /// Users carrying `label`, in embedding order.
    #[must_use]
    pub fn members(&self, label: usize) -> Vec<u64> {
        self.users
            .iter()
            .zip(&self.labels)
            .filter(|&(_, &l)| l == label)
            .map(|(&u, _)| u)
            .collect()
    }

    /// Number of users per label.
    #[must_use]
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// Rejects `k` outside `2..n_users`.
fn check_k(k: usize, n_users: usize) -> Result<()> {
    if k < 2 || k >= n_users {
        return Err(BookrecError::invalid_k(k, n_users));
    }
    Ok(())
}

/// k-means behind the [`ClusterStrategy`] seam.
///
/// # Examples
///
/// ```
/// use bookrec::cluster::CentroidStrategy;
/// use bookrec::embedding::Embedding;
/// use bookrec::primitives::Matrix;
/// use bookrec::traits::ClusterStrategy;
///
/// let vectors = Matrix::from_vec(4, 1, vec![0.0, 0.2, 9.0, 9.1]).expect("valid matrix");
/// let embedding = Embedding::new(vec![1, 2, 3, 4], vectors).expect("one row per user");
///
/// let assignment = CentroidStrategy::new(0).fit(&embedding, 2).expect("2 < 4 users");
/// assert_eq!(assignment.label_of(1), assignment.label_of(2));
/// assert_ne!(assignment.label_of(1), assignment.label_of(4));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CentroidStrategy {
    seed: u64,
    n_init: usize,
    max_iter: usize,
    tol: f32,
}

impl CentroidStrategy {
    /// Fewest restarts the strategy will run.
    pub const MIN_RESTARTS: usize = 10;

    /// Creates the strategy with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            n_init: Self::MIN_RESTARTS,
            max_iter: 300,
            tol: 1e-4,
        }
    }

    /// Sets the number of restarts; values below [`Self::MIN_RESTARTS`] are raised.
    #[must_use]
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(Self::MIN_RESTARTS);
        self
    }

    /// Sets the iteration cap per restart.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the centroid-shift tolerance.
    #[must_use]
    pub fn with_tol(mut self, tol: f32) -> Self {
        self.tol = tol;
        self
    }

    /// Restarts per fit.
    #[must_use]
    pub fn n_init(&self) -> usize {
        self.n_init
    }
}

impl ClusterStrategy for CentroidStrategy {
    fn name(&self) -> &'static str {
        StrategyKind::Centroid.as_str()
    }

    fn fit(&self, embedding: &Embedding, k: usize) -> Result<ClusterAssignment> {
        check_k(k, embedding.n_users())?;
        let mut kmeans = KMeans::new(k)
            .with_random_state(self.seed)
            .with_n_init(self.n_init)
            .with_max_iter(self.max_iter)
            .with_tol(self.tol);
        kmeans.fit(embedding.vectors())?;

        ClusterAssignment::from_labels(embedding, kmeans.labels().to_vec(), k, self.name())
    }
}

/// Agglomerative clustering behind the [`ClusterStrategy`] seam.
///
/// Ward linkage unless configured otherwise. Inputs with more than
/// `max_samples` users are refused before any distance is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HierarchicalStrategy {
    linkage: Linkage,
    max_samples: usize,
}

impl Default for HierarchicalStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl HierarchicalStrategy {
    /// Ward linkage with the default sample ceiling.
    #[must_use]
    pub fn new() -> Self {
        Self {
            linkage: Linkage::Ward,
            max_samples: AgglomerativeClustering::DEFAULT_MAX_SAMPLES,
        }
    }

    /// Sets the linkage.
    #[must_use]
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    /// Sets the sample ceiling.
    #[must_use]
    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }

    /// Fits and returns the full model, dendrogram included.
    ///
    /// # Errors
    ///
    /// Same as [`ClusterStrategy::fit`].
    pub fn fit_model(&self, embedding: &Embedding, k: usize) -> Result<AgglomerativeClustering> {
        check_k(k, embedding.n_users())?;
        let mut model =
            AgglomerativeClustering::new(k, self.linkage).with_max_samples(self.max_samples);
        model.fit(embedding.vectors())?;
        Ok(model)
    }
}

impl ClusterStrategy for HierarchicalStrategy {
    fn name(&self) -> &'static str {
        StrategyKind::Hierarchical.as_str()
    }

    fn fit(&self, embedding: &Embedding, k: usize) -> Result<ClusterAssignment> {
        let model = self.fit_model(embedding, k)?;
        ClusterAssignment::from_labels(embedding, model.labels().to_vec(), k, self.name())
    }
}

/// Quality of one strategy at one `k`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyScore {
    /// Strategy name
    pub strategy: String,
    /// Cluster count
    pub k: usize,
    /// Mean silhouette
    pub silhouette: f32,
    /// Within-cluster sum of squares
    pub inertia: f32,
    /// Users per cluster
    pub cluster_sizes: Vec<usize>,
}

/// Fits every strategy at the same `k` and scores them with the same
/// silhouette routine.
///
/// # Errors
///
/// Returns the first strategy error.
pub fn compare_strategies(
    embedding: &Embedding,
    k: usize,
    strategies: &[&dyn ClusterStrategy],
) -> Result<Vec<StrategyScore>> {
    strategies
        .iter()
        .map(|strategy| {
            let assignment = strategy.fit(embedding, k)?;
            let silhouette = silhouette_score(embedding.vectors(), assignment.labels());
            debug!(strategy = strategy.name(), k, silhouette, "scored strategy");
            Ok(StrategyScore {
                strategy: strategy.name().to_string(),
                k,
                silhouette,
                inertia: assignment.inertia(),
                cluster_sizes: assignment.cluster_sizes(),
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(|scores| {
            info!(k, strategies = scores.len(), "compared clustering strategies");
            scores
        })
}
