//! Matrix decomposition for dimensionality reduction.
//!
//! [`Pca`] projects the sparse preference matrix onto its leading principal
//! components. The matrix is never densified: the covariance operator
//! `C v = (Xᵀ(X v) − n μ (μᵀ v)) / (n − 1)` is applied row by row, and its
//! top eigenvectors are found with block subspace iteration followed by a
//! Rayleigh–Ritz step. Orthonormalization (QR) and the small projected
//! eigenproblem go through `nalgebra`.
//!
//! # Example
//!
//! ```
//! use bookrec::decomposition::Pca;
//! use bookrec::primitives::Matrix;
//! use bookrec::traits::Transformer;
//!
//! let data = Matrix::from_vec(4, 3, vec![
//!     1.0, 0.0, 0.0,
//!     1.0, 1.0, 0.0,
//!     0.0, 1.0, 1.0,
//!     0.0, 0.0, 1.0,
//! ]).expect("valid matrix dimensions");
//!
//! let mut pca = Pca::new(2).with_random_state(0);
//! let embedded = pca.fit_transform(&data).expect("2 <= min(4, 3)");
//! assert_eq!(embedded.shape(), (4, 2));
//! ```

use crate::error::{BookrecError, Result};
use crate::primitives::{CsrMatrix, Matrix};
use crate::traits::Transformer;
use nalgebra::{DMatrix, SymmetricEigen};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Extra block columns carried during iteration to speed up convergence.
const OVERSAMPLE: usize = 8;

/// Principal Component Analysis fitted by subspace iteration.
///
/// Components are ordered by decreasing explained variance. The sign of
/// each component is fixed so that its largest-magnitude loading is
/// positive, which makes repeated fits comparable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pca {
    /// Number of components to keep.
    n_components: usize,
    /// Iteration cap for the subspace iteration.
    max_iter: usize,
    /// Relative tolerance on the leading Ritz values.
    tol: f64,
    /// Seed for the starting block.
    random_state: u64,
    /// Mean of each feature (computed during fit).
    mean: Option<Vec<f64>>,
    /// Principal axes, `n_components × n_features`.
    components: Option<Matrix<f64>>,
    /// Variance explained by each component.
    explained_variance: Option<Vec<f64>>,
    /// Ratio of variance explained by each component.
    explained_variance_ratio: Option<Vec<f64>>,
    /// Iterations run by the last fit.
    n_iter: usize,
}

impl Pca {
    /// Creates a new PCA reducer keeping `n_components` dimensions.
    #[must_use]
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            max_iter: 1000,
            tol: 1e-10,
            random_state: 0,
            mean: None,
            components: None,
            explained_variance: None,
            explained_variance_ratio: None,
            n_iter: 0,
        }
    }

    /// Sets the iteration cap.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the convergence tolerance.
    #[must_use]
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Sets the seed of the starting block.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Number of components.
    #[must_use]
    pub fn n_components(&self) -> usize {
        self.n_components
    }

    /// Returns true once fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.components.is_some()
    }

    /// Per-feature mean used for centering.
    #[must_use]
    pub fn mean(&self) -> Option<&[f64]> {
        self.mean.as_deref()
    }

    /// Principal axes, one row per component.
    #[must_use]
    pub fn components(&self) -> Option<&Matrix<f64>> {
        self.components.as_ref()
    }

    /// Variance explained by each component.
    #[must_use]
    pub fn explained_variance(&self) -> Option<&[f64]> {
        self.explained_variance.as_deref()
    }

    /// Fraction of the total variance explained by each component.
    #[must_use]
    pub fn explained_variance_ratio(&self) -> Option<&[f64]> {
        self.explained_variance_ratio.as_deref()
    }

    /// Iterations used by the last fit.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    fn fitted(&self) -> Result<(&[f64], &Matrix<f64>)> {
        match (&self.mean, &self.components) {
            (Some(mean), Some(components)) => Ok((mean, components)),
            _ => Err(BookrecError::not_fitted("PCA")),
        }
    }

    /// Reconstructs feature-space rows from component scores.
    ///
    /// # Errors
    ///
    /// Returns an error if PCA is not fitted or the width is wrong.
    pub fn inverse_transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let (mean, components) = self.fitted()?;
        let (n_samples, width) = x.shape();
        if width != self.n_components {
            return Err(BookrecError::Configuration(format!(
                "input has {width} components, expected {}",
                self.n_components
            )));
        }

        let n_features = mean.len();
        let mut result = Vec::with_capacity(n_samples * n_features);
        for row in x.rows() {
            for (j, &m) in mean.iter().enumerate() {
                let mut value = m;
                for (c, &score) in row.iter().enumerate() {
                    value += f64::from(score) * components.get(c, j);
                }
                result.push(value as f32);
            }
        }
        Matrix::from_vec(n_samples, n_features, result)
    }

    fn fit_sparse(&mut self, x: &CsrMatrix) -> Result<()> {
        let (n_samples, n_features) = x.shape();
        let max = n_samples.min(n_features);
        if self.n_components == 0 || self.n_components > max {
            return Err(BookrecError::Dimensionality {
                requested: self.n_components,
                max,
            });
        }

        let n = n_samples as f64;
        let mean: Vec<f64> = x
            .column_sums()
            .into_iter()
            .map(|s| f64::from(s) / n)
            .collect();
        let denom = (n - 1.0).max(1.0);
        let total_variance: f64 = x
            .column_sq_sums()
            .iter()
            .zip(&mean)
            .map(|(sq, m)| (sq - n * m * m).max(0.0))
            .sum::<f64>()
            / denom;

        let op = CovarianceOperator { x, mean: &mean, denom };
        let block = (self.n_components + OVERSAMPLE).min(n_features);

        let mut rng = StdRng::seed_from_u64(self.random_state);
        let start = DMatrix::from_fn(n_features, block, |_, _| rng.gen_range(-1.0..1.0));
        let mut q = orthonormal_basis(start);

        let mut ritz = vec![f64::INFINITY; self.n_components];
        let mut converged = false;
        self.n_iter = 0;
        for iter in 0..self.max_iter {
            let z = op.apply_block(&q);
            let (values, rotation) = rayleigh_ritz(&q, &z);

            // measured against the leading value so null directions settle too
            let scale = values[0].abs().max(f64::MIN_POSITIVE);
            let shift = values
                .iter()
                .zip(&ritz)
                .take(self.n_components)
                .map(|(new, old)| (new - old).abs() / scale)
                .fold(0.0, f64::max);
            ritz = values[..self.n_components].to_vec();
            self.n_iter = iter + 1;

            // next block spans C·Q, ordered by Ritz value
            q = orthonormal_basis(z * rotation);

            if shift < self.tol {
                converged = true;
                break;
            }
        }
        if !converged {
            warn!(
                max_iter = self.max_iter,
                "PCA subspace iteration hit its iteration cap"
            );
        }

        // final Rayleigh–Ritz on the converged block
        let z = op.apply_block(&q);
        let (values, rotation) = rayleigh_ritz(&q, &z);
        let axes = q * rotation;
        let mut components_data = Vec::with_capacity(self.n_components * n_features);
        for c in 0..self.n_components {
            let mut axis: Vec<f64> = axes.column(c).iter().copied().collect();
            fix_sign(&mut axis);
            components_data.extend(axis);
        }

        let explained_variance: Vec<f64> = values[..self.n_components]
            .iter()
            .map(|v| v.max(0.0))
            .collect();
        let explained_variance_ratio = explained_variance
            .iter()
            .map(|v| {
                if total_variance > 0.0 {
                    v / total_variance
                } else {
                    0.0
                }
            })
            .collect();

        let components = Matrix::from_vec(self.n_components, n_features, components_data)?;

        debug!(
            n_iter = self.n_iter,
            variance = ?explained_variance,
            "fitted PCA"
        );

        self.mean = Some(mean);
        self.components = Some(components);
        self.explained_variance = Some(explained_variance);
        self.explained_variance_ratio = Some(explained_variance_ratio);
        Ok(())
    }

    fn transform_sparse(&self, x: &CsrMatrix) -> Result<Matrix<f32>> {
        let (mean, components) = self.fitted()?;
        let (n_samples, n_features) = x.shape();
        if n_features != mean.len() {
            return Err(BookrecError::Configuration(format!(
                "input has {n_features} features, PCA was fitted on {}",
                mean.len()
            )));
        }

        // X_pca = (X - mean) @ componentsᵀ, with the mean term folded into an offset
        let offsets: Vec<f64> = (0..self.n_components)
            .map(|c| components.row(c).iter().zip(mean).map(|(w, m)| w * m).sum())
            .collect();

        let mut result = Vec::with_capacity(n_samples * self.n_components);
        for i in 0..n_samples {
            for (c, offset) in offsets.iter().enumerate() {
                let axis = components.row(c);
                let dot: f64 = x.row_iter(i).map(|(k, v)| f64::from(v) * axis[k]).sum();
                result.push((dot - offset) as f32);
            }
        }
        Matrix::from_vec(n_samples, self.n_components, result)
    }
}

impl Transformer<CsrMatrix> for Pca {
    fn fit(&mut self, x: &CsrMatrix) -> Result<()> {
        self.fit_sparse(x)
    }

    fn transform(&self, x: &CsrMatrix) -> Result<Matrix<f32>> {
        self.transform_sparse(x)
    }
}

impl Transformer<Matrix<f32>> for Pca {
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
        self.fit_sparse(&CsrMatrix::from_dense(x))
    }

    fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        self.transform_sparse(&CsrMatrix::from_dense(x))
    }
}

/// The sample covariance of a sparse matrix, applied without densifying.
struct CovarianceOperator<'a> {
    x: &'a CsrMatrix,
    mean: &'a [f64],
    denom: f64,
}

impl CovarianceOperator<'_> {
    fn apply(&self, v: &[f64]) -> Vec<f64> {
        let mu_v: f64 = self.mean.iter().zip(v).map(|(m, x)| m * x).sum();

        // t = (X - 1μᵀ) v
        let t: Vec<f64> = (0..self.x.n_rows())
            .map(|i| {
                self.x
                    .row_iter(i)
                    .map(|(k, val)| f64::from(val) * v[k])
                    .sum::<f64>()
                    - mu_v
            })
            .collect();
        let t_sum: f64 = t.iter().sum();

        // (X - 1μᵀ)ᵀ t = Xᵀ t - μ Σt
        let mut out: Vec<f64> = self.mean.iter().map(|m| -m * t_sum).collect();
        for (i, &ti) in t.iter().enumerate() {
            for (k, val) in self.x.row_iter(i) {
                out[k] += f64::from(val) * ti;
            }
        }
        for o in &mut out {
            *o /= self.denom;
        }
        out
    }

    /// Applies the operator to every column of `block`.
    fn apply_block(&self, block: &DMatrix<f64>) -> DMatrix<f64> {
        let columns: Vec<Vec<f64>> = block
            .column_iter()
            .map(|col| {
                let v: Vec<f64> = col.iter().copied().collect();
                self.apply(&v)
            })
            .collect();
        DMatrix::from_iterator(block.nrows(), block.ncols(), columns.into_iter().flatten())
    }
}

/// Orthonormal basis of the column span, via Householder QR.
fn orthonormal_basis(block: DMatrix<f64>) -> DMatrix<f64> {
    block.qr().q()
}

/// Projects the operator onto span(Q) and diagonalizes `Qᵀ C Q`.
///
/// Returns the Ritz values sorted descending and the matching eigenvectors
/// as the columns of the rotation matrix.
fn rayleigh_ritz(q: &DMatrix<f64>, z: &DMatrix<f64>) -> (Vec<f64>, DMatrix<f64>) {
    let projected = q.transpose() * z;
    // symmetrize to absorb round-off
    let projected = (&projected + projected.transpose()) * 0.5;
    let eigen = SymmetricEigen::new(projected);

    // Sort by eigenvalue (descending)
    let mut order: Vec<usize> = (0..eigen.eigenvalues.len()).collect();
    order.sort_by(|&a, &b| {
        eigen.eigenvalues[b]
            .total_cmp(&eigen.eigenvalues[a])
            .then(a.cmp(&b))
    });

    let values = order.iter().map(|&i| eigen.eigenvalues[i]).collect();
    let rotation = DMatrix::from_fn(eigen.eigenvectors.nrows(), order.len(), |r, c| {
        eigen.eigenvectors[(r, order[c])]
    });
    (values, rotation)
}

/// Flips an axis so that its largest-magnitude loading is positive.
fn fix_sign(axis: &mut [f64]) {
    let mut pivot = 0.0_f64;
    for &w in axis.iter() {
        if w.abs() > pivot.abs() {
            pivot = w;
        }
    }
    if pivot < 0.0 {
        for w in axis.iter_mut() {
            *w = -*w;
        }
    }
}

#[cfg(test)]
#[path = "tests_pca_contract.rs"]
mod tests_pca_contract;
