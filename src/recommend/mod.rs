//! Cluster-popularity recommendations.
//!
//! A user's recommendations are the items most often liked by the other
//! members of their cluster, minus the items the user already liked.
//!
//! # Quick Start
//!
//! ```
//! use bookrec::cluster::ClusterAssignment;
//! use bookrec::data::RatingRecord;
//! use bookrec::preference::PreferenceBuilder;
//! use bookrec::primitives::Matrix;
//! use bookrec::recommend::Recommender;
//!
//! let ratings = vec![
//!     RatingRecord::new(1, "A", 9), RatingRecord::new(1, "X", 1),
//!     RatingRecord::new(2, "A", 9), RatingRecord::new(2, "B", 9), RatingRecord::new(2, "X", 1),
//! ];
//! let matrix = PreferenceBuilder::new().build(&ratings).expect("both users like something");
//!
//! // both users in one cluster
//! let centroids = Matrix::from_vec(1, 1, vec![0.0]).expect("valid matrix");
//! let assignment = ClusterAssignment::from_parts(vec![1, 2], vec![0, 0], 1, "manual", centroids, 0.0)
//!     .expect("consistent parts");
//!
//! let recs = Recommender::new(10).recommend(1, &assignment, &matrix).expect("user 1 is clustered");
//! assert_eq!(recs.len(), 1);
//! assert_eq!(recs[0].item_id, "B");
//! ```

use crate::cluster::ClusterAssignment;
use crate::data::ItemLookup;
use crate::error::{BookrecError, Result};
use crate::preference::PreferenceMatrix;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// An unseen item and how many cluster members liked it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Item id (ISBN)
    pub item_id: String,
    /// Number of cluster members who liked the item
    pub popularity: usize,
}

/// A recommendation joined with catalog metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedBook {
    /// Item id (ISBN)
    pub item_id: String,
    /// Number of cluster members who liked the item
    pub popularity: usize,
    /// Title, if the catalog knows the item
    pub title: Option<String>,
    /// Author, if the catalog knows the item
    pub author: Option<String>,
    /// Publication year, if the catalog knows the item
    pub year: Option<i32>,
}

/// Ranks items by popularity within the target user's cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recommender {
    top_n: usize,
}

impl Default for Recommender {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Recommender {
    /// Creates a recommender returning at most `top_n` items.
    #[must_use]
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }

    /// Maximum list length.
    #[must_use]
    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Number of members of cluster `label` who liked each item column.
    #[must_use]
    pub fn cluster_popularity(
        assignment: &ClusterAssignment,
        matrix: &PreferenceMatrix,
        label: usize,
    ) -> Vec<usize> {
        let mut counts = vec![0usize; matrix.n_items()];
        for member in assignment.members(label) {
            if let Some(liked) = matrix.liked_items(member) {
                for &col in liked {
                    counts[col] += 1;
                }
            }
        }
        counts
    }

    /// Top items liked within the user's cluster that the user has not liked.
    ///
    /// Sorted by popularity descending, then item id ascending. Items nobody
    /// in the cluster liked are never returned.
    ///
    /// # Errors
    ///
    /// Returns [`BookrecError::NotFound`] if the user has no cluster label.
    pub fn recommend(
        &self,
        user_id: u64,
        assignment: &ClusterAssignment,
        matrix: &PreferenceMatrix,
    ) -> Result<Vec<Recommendation>> {
        let label = assignment
            .label_of(user_id)
            .ok_or(BookrecError::NotFound { user_id })?;

        let counts = Self::cluster_popularity(assignment, matrix, label);
        let seen: HashSet<usize> = matrix
            .liked_items(user_id)
            .map(|cols| cols.iter().copied().collect())
            .unwrap_or_default();

        // columns are in ascending item id order, so the column index breaks ties
        let mut ranked: Vec<(usize, usize)> = counts
            .iter()
            .enumerate()
            .filter(|&(col, &count)| count > 0 && !seen.contains(&col))
            .map(|(col, &count)| (col, count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(self.top_n);

        debug!(
            user_id,
            cluster = label,
            returned = ranked.len(),
            "recommended items"
        );

        let items = matrix.items();
        Ok(ranked
            .into_iter()
            .map(|(col, popularity)| Recommendation {
                item_id: items[col].clone(),
                popularity,
            })
            .collect())
    }

    /// [`recommend`](Self::recommend) joined with catalog metadata.
    ///
    /// # Errors
    ///
    /// Same as [`recommend`](Self::recommend).
    pub fn recommend_with_details(
        &self,
        user_id: u64,
        assignment: &ClusterAssignment,
        matrix: &PreferenceMatrix,
        catalog: &dyn ItemLookup,
    ) -> Result<Vec<RecommendedBook>> {
        Ok(self
            .recommend(user_id, assignment, matrix)?
            .into_iter()
            .map(|rec| {
                let book = catalog.lookup(&rec.item_id);
                RecommendedBook {
                    title: book.map(|b| b.title.clone()),
                    author: book.map(|b| b.author.clone()),
                    year: book.map(|b| b.year),
                    item_id: rec.item_id,
                    popularity: rec.popularity,
                }
            })
            .collect())
    }
}

#[cfg(test)]
#[path = "tests_recommender_contract.rs"]
mod tests_recommender_contract;
