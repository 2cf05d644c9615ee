//! Core traits for estimators, transformers and clustering strategies.
//!
//! These traits define the seams between pipeline stages.

use crate::cluster::ClusterAssignment;
use crate::embedding::Embedding;
use crate::error::Result;
use crate::primitives::Matrix;

/// A model fitted on a dense matrix that labels its rows.
///
/// ```
/// use bookrec::prelude::*;
///
/// // three readers near the origin, three far away
/// let embedding = Matrix::from_vec(6, 2, vec![
///     0.0, 0.0,   0.2, 0.1,   0.1, 0.3,
///     6.0, 6.0,   6.1, 5.8,   5.9, 6.2,
/// ]).expect("6x2 matrix");
///
/// let mut model = AgglomerativeClustering::new(2, Linkage::Ward);
/// model.fit(&embedding).expect("2 < 6 readers");
/// let labels = model.predict(&embedding);
/// assert_eq!(labels[0], labels[2]);
/// assert_ne!(labels[0], labels[5]);
/// ```
pub trait UnsupervisedEstimator {
    /// Per-row output of [`predict`](Self::predict).
    type Labels;

    /// Learns from the rows of `x`.
    ///
    /// # Errors
    ///
    /// Returns an error for empty input or a cluster count the data cannot
    /// support.
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()>;

    /// Predicts cluster assignments for data.
    fn predict(&self, x: &Matrix<f32>) -> Self::Labels;
}

/// Trait for fitted projections.
///
/// The input type is generic so one reducer can accept both the sparse
/// preference matrix and dense test fixtures. A fitted transformer must
/// produce the same output for the same input on every call.
pub trait Transformer<X: ?Sized = Matrix<f32>> {
    /// Learns the projection.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot support the projection.
    fn fit(&mut self, x: &X) -> Result<()>;

    /// Projects `x` with the learned parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the transformer is not fitted or shapes mismatch.
    fn transform(&self, x: &X) -> Result<Matrix<f32>>;

    /// [`fit`](Self::fit) followed by [`transform`](Self::transform) on the
    /// same input.
    ///
    /// # Errors
    ///
    /// Returns the first error of either step.
    fn fit_transform(&mut self, x: &X) -> Result<Matrix<f32>> {
        self.fit(x)?;
        self.transform(x)
    }
}

/// A way of partitioning an embedding into `k` clusters.
///
/// Both the centroid (k-means) and hierarchical (Ward) strategies implement
/// this so they can be swapped in the pipeline and scored by the same
/// cluster-count selector.
pub trait ClusterStrategy {
    /// Short name used in logs and in the model artifact.
    fn name(&self) -> &'static str;

    /// Partitions the embedding into exactly `k` clusters.
    ///
    /// # Errors
    ///
    /// Returns [`BookrecError::Clustering`](crate::error::BookrecError::Clustering)
    /// if `k < 2` or `k >= embedding.n_users()`.
    fn fit(&self, embedding: &Embedding, k: usize) -> Result<ClusterAssignment>;
}
