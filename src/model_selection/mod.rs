//! Cluster-count selection.
//!
//! This module provides tools for:
//! - An elbow survey of k-means inertia over a range of cluster counts
//! - A silhouette survey over a shortlist, with any [`ClusterStrategy`]
//! - Picking the shortlisted `k` with the highest silhouette
//!
//! The elbow curve is diagnostic; the silhouette decides.

use crate::cluster::CentroidStrategy;
use crate::embedding::Embedding;
use crate::error::{BookrecError, Result};
use crate::metrics::silhouette_score;
use crate::traits::ClusterStrategy;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Inertia of the centroid strategy at one `k`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElbowPoint {
    /// Cluster count
    pub k: usize,
    /// Within-cluster sum of squares
    pub inertia: f32,
}

/// Mean silhouette at one `k`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SilhouettePoint {
    /// Cluster count
    pub k: usize,
    /// Mean silhouette coefficient
    pub score: f32,
}

/// Result of a full selection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionReport {
    /// Elbow curve over the candidate range
    pub elbow: Vec<ElbowPoint>,
    /// Silhouette per shortlisted k
    pub silhouettes: Vec<SilhouettePoint>,
    /// Shortlisted k with the highest silhouette
    pub best_k: usize,
}

impl SelectionReport {
    /// Silhouette of the chosen k.
    #[must_use]
    pub fn best_score(&self) -> Option<f32> {
        self.silhouettes
            .iter()
            .find(|p| p.k == self.best_k)
            .map(|p| p.score)
    }
}

/// Highest-scoring k; ties go to the smaller k.
#[must_use]
pub fn best_k(points: &[SilhouettePoint]) -> Option<usize> {
    let mut best: Option<SilhouettePoint> = None;
    for &point in points {
        best = match best {
            Some(b) if b.score > point.score || (b.score == point.score && b.k <= point.k) => {
                Some(b)
            }
            _ => Some(point),
        };
    }
    best.map(|p| p.k)
}

/// Surveys candidate cluster counts for an embedding.
///
/// # Examples
///
/// ```
/// use bookrec::embedding::Embedding;
/// use bookrec::model_selection::ClusterCountSelector;
/// use bookrec::primitives::Matrix;
///
/// let vectors = Matrix::from_vec(6, 1, vec![0.0, 0.1, 5.0, 5.1, 10.0, 10.1])
///     .expect("valid matrix");
/// let embedding = Embedding::new((1..=6).collect(), vectors).expect("one row per user");
///
/// let report = ClusterCountSelector::new(0)
///     .select(&embedding, &[2, 3, 4], &[2, 3, 4])
///     .expect("valid shortlist");
/// assert_eq!(report.best_k, 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterCountSelector {
    centroid: CentroidStrategy,
}

impl ClusterCountSelector {
    /// Creates a selector whose k-means runs use `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            centroid: CentroidStrategy::new(seed),
        }
    }

    /// Uses a configured centroid strategy for the elbow and default survey.
    #[must_use]
    pub fn with_centroid_strategy(mut self, centroid: CentroidStrategy) -> Self {
        self.centroid = centroid;
        self
    }

    /// Keeps the candidates a strategy can fit, warning about the rest.
    fn valid_candidates(ks: &[usize], n_users: usize, stage: &str) -> Vec<usize> {
        ks.iter()
            .copied()
            .filter(|&k| {
                let ok = k >= 2 && k < n_users;
                if !ok {
                    warn!(k, n_users, stage, "skipping infeasible cluster count");
                }
                ok
            })
            .collect()
    }

    /// Inertia of the centroid strategy for each valid candidate.
    ///
    /// # Errors
    ///
    /// Returns the first clustering error.
    pub fn elbow(&self, embedding: &Embedding, candidates: &[usize]) -> Result<Vec<ElbowPoint>> {
        Self::valid_candidates(candidates, embedding.n_users(), "elbow")
            .into_iter()
            .map(|k| {
                let assignment = self.centroid.fit(embedding, k)?;
                debug!(k, inertia = assignment.inertia(), "elbow point");
                Ok(ElbowPoint {
                    k,
                    inertia: assignment.inertia(),
                })
            })
            .collect()
    }

    /// Mean silhouette of `strategy` for each valid shortlisted k.
    ///
    /// # Errors
    ///
    /// Returns [`BookrecError::Clustering`] if no shortlisted k is feasible,
    /// or the first clustering error.
    pub fn silhouette_survey(
        &self,
        embedding: &Embedding,
        shortlist: &[usize],
        strategy: &dyn ClusterStrategy,
    ) -> Result<Vec<SilhouettePoint>> {
        let ks = Self::valid_candidates(shortlist, embedding.n_users(), "silhouette");
        if ks.is_empty() {
            return Err(BookrecError::Clustering(format!(
                "no feasible cluster count in {shortlist:?} for {} users",
                embedding.n_users()
            )));
        }

        ks.into_iter()
            .map(|k| {
                let assignment = strategy.fit(embedding, k)?;
                let score = silhouette_score(embedding.vectors(), assignment.labels());
                debug!(k, score, strategy = strategy.name(), "silhouette point");
                Ok(SilhouettePoint { k, score })
            })
            .collect()
    }

    /// Elbow survey plus a centroid-strategy silhouette survey.
    ///
    /// # Errors
    ///
    /// See [`silhouette_survey`](Self::silhouette_survey).
    pub fn select(
        &self,
        embedding: &Embedding,
        candidates: &[usize],
        shortlist: &[usize],
    ) -> Result<SelectionReport> {
        self.select_with(embedding, candidates, shortlist, &self.centroid)
    }

    /// Elbow survey plus a silhouette survey with `strategy`.
    ///
    /// # Errors
    ///
    /// See [`silhouette_survey`](Self::silhouette_survey).
    pub fn select_with(
        &self,
        embedding: &Embedding,
        candidates: &[usize],
        shortlist: &[usize],
        strategy: &dyn ClusterStrategy,
    ) -> Result<SelectionReport> {
        let elbow = self.elbow(embedding, candidates)?;
        let silhouettes = self.silhouette_survey(embedding, shortlist, strategy)?;
        let best_k = best_k(&silhouettes)
            .ok_or_else(|| BookrecError::Clustering("empty silhouette survey".to_string()))?;

        info!(
            best_k,
            surveyed = silhouettes.len(),
            strategy = strategy.name(),
            "selected cluster count"
        );
        Ok(SelectionReport {
            elbow,
            silhouettes,
            best_k,
        })
    }
}

#[cfg(test)]
#[path = "tests_selector_contract.rs"]
mod tests_selector_contract;
