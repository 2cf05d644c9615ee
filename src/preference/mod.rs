//! Implicit preference extraction.
//!
//! Readers use the rating scale differently, so raw scores are not compared
//! across users. Instead a book is *liked* when a reader rated it strictly
//! above their own mean rating. The liked pairs are pivoted into a sparse
//! binary user × book matrix.
//!
//! A reader with a single rating (or only equal ratings) never rates anything
//! above their own mean and therefore has no row in the matrix.
//!
//! # Example
//!
//! ```
//! use bookrec::data::RatingRecord;
//! use bookrec::preference::PreferenceBuilder;
//!
//! let ratings = vec![
//!     RatingRecord::new(1, "A", 9),
//!     RatingRecord::new(1, "B", 3),
//!     RatingRecord::new(2, "B", 8),
//!     RatingRecord::new(2, "C", 2),
//!     RatingRecord::new(3, "A", 5), // single rating: dropped
//! ];
//!
//! let matrix = PreferenceBuilder::new().build(&ratings).expect("non-empty input");
//! assert_eq!(matrix.users(), &[1, 2]);
//! assert_eq!(matrix.items(), &["A".to_string(), "B".to_string()]);
//! assert_eq!(matrix.liked_item_ids(1), Some(vec!["A"]));
//! ```

use crate::data::RatingRecord;
use crate::error::{BookrecError, Result};
use crate::primitives::{CsrMatrix, Matrix};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

/// Per-user rating summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// The reader
    pub user_id: u64,
    /// Arithmetic mean of all of the reader's ratings
    pub mean_rating: f64,
    /// Number of ratings the mean was taken over
    pub n_ratings: usize,
}

impl UserProfile {
    /// Whether a rating counts as liked for this user.
    ///
    /// Strictly greater than the mean; a rating equal to the mean is not
    /// liked.
    #[must_use]
    pub fn likes(&self, rating: i32) -> bool {
        f64::from(rating) > self.mean_rating
    }
}

/// Computes the mean rating of every user in `records`.
///
/// Profiles are keyed and ordered by user id.
#[must_use]
pub fn user_profiles(records: &[RatingRecord]) -> BTreeMap<u64, UserProfile> {
    let mut totals: BTreeMap<u64, (i64, usize)> = BTreeMap::new();
    for record in records {
        let entry = totals.entry(record.user_id).or_insert((0, 0));
        entry.0 += i64::from(record.rating);
        entry.1 += 1;
    }

    totals
        .into_iter()
        .map(|(user_id, (sum, count))| {
            let profile = UserProfile {
                user_id,
                mean_rating: sum as f64 / count as f64,
                n_ratings: count,
            };
            (user_id, profile)
        })
        .collect()
}

/// Builds a [`PreferenceMatrix`] from rating records.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferenceBuilder;

impl PreferenceBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Derives liked entries and pivots them into a sparse binary matrix.
    ///
    /// Rows are users in ascending id order and columns are items in
    /// ascending id order; only users and items that take part in at least
    /// one liked entry appear.
    ///
    /// # Errors
    ///
    /// Returns [`BookrecError::Configuration`] if `records` is empty or no
    /// record is liked.
    pub fn build(&self, records: &[RatingRecord]) -> Result<PreferenceMatrix> {
        if records.is_empty() {
            return Err(BookrecError::empty_input("no rating records to pivot"));
        }

        let profiles = user_profiles(records);

        let mut liked: BTreeMap<u64, BTreeSet<&str>> = BTreeMap::new();
        for record in records {
            let likes = profiles
                .get(&record.user_id)
                .is_some_and(|profile| profile.likes(record.rating));
            if likes {
                liked
                    .entry(record.user_id)
                    .or_default()
                    .insert(record.item_id.as_str());
            }
        }

        if liked.is_empty() {
            return Err(BookrecError::empty_input(
                "no rating exceeds its user's mean rating",
            ));
        }

        let items: Vec<String> = liked
            .values()
            .flatten()
            .copied()
            .collect::<BTreeSet<&str>>()
            .into_iter()
            .map(str::to_string)
            .collect();
        let item_index: HashMap<&str, usize> = items
            .iter()
            .enumerate()
            .map(|(col, item)| (item.as_str(), col))
            .collect();

        let users: Vec<u64> = liked.keys().copied().collect();
        let rows: Vec<Vec<(usize, f32)>> = liked
            .values()
            .map(|set| set.iter().map(|item| (item_index[item], 1.0)).collect())
            .collect();
        let csr = CsrMatrix::from_rows(items.len(), &rows)?;

        let dropped = profiles.len() - users.len();
        if dropped > 0 {
            debug!(dropped, "users without any above-mean rating dropped");
        }
        info!(
            records = records.len(),
            users = users.len(),
            items = items.len(),
            liked = csr.nnz(),
            "built preference matrix"
        );

        Ok(PreferenceMatrix::new(users, items, csr, profiles))
    }
}

/// Sparse binary user × item "liked" matrix.
#[derive(Debug, Clone)]
pub struct PreferenceMatrix {
    users: Vec<u64>,
    items: Vec<String>,
    csr: CsrMatrix,
    profiles: BTreeMap<u64, UserProfile>,
    user_index: HashMap<u64, usize>,
}

impl PreferenceMatrix {
    fn new(
        users: Vec<u64>,
        items: Vec<String>,
        csr: CsrMatrix,
        profiles: BTreeMap<u64, UserProfile>,
    ) -> Self {
        let user_index = users
            .iter()
            .enumerate()
            .map(|(row, &user)| (user, row))
            .collect();
        Self {
            users,
            items,
            csr,
            profiles,
            user_index,
        }
    }

    /// User ids, one per row, ascending.
    #[must_use]
    pub fn users(&self) -> &[u64] {
        &self.users
    }

    /// Item ids, one per column, ascending.
    #[must_use]
    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Number of rows.
    #[must_use]
    pub fn n_users(&self) -> usize {
        self.users.len()
    }

    /// Number of columns.
    #[must_use]
    pub fn n_items(&self) -> usize {
        self.items.len()
    }

    /// The underlying sparse matrix.
    #[must_use]
    pub fn csr(&self) -> &CsrMatrix {
        &self.csr
    }

    /// Row index of a user, if the user liked anything.
    #[must_use]
    pub fn row_of(&self, user_id: u64) -> Option<usize> {
        self.user_index.get(&user_id).copied()
    }

    /// Column indices of the items a user liked.
    #[must_use]
    pub fn liked_items(&self, user_id: u64) -> Option<&[usize]> {
        self.row_of(user_id).map(|row| self.csr.row_indices(row))
    }

    /// Ids of the items a user liked, ascending.
    #[must_use]
    pub fn liked_item_ids(&self, user_id: u64) -> Option<Vec<&str>> {
        self.liked_items(user_id)
            .map(|cols| cols.iter().map(|&c| self.items[c].as_str()).collect())
    }

    /// Number of liked items per row.
    #[must_use]
    pub fn row_sums(&self) -> Vec<usize> {
        (0..self.n_users())
            .map(|row| self.csr.row_indices(row).len())
            .collect()
    }

    /// Rating summary of any user present in the input, including users
    /// dropped from the matrix.
    #[must_use]
    pub fn profile(&self, user_id: u64) -> Option<&UserProfile> {
        self.profiles.get(&user_id)
    }

    /// All rating summaries, ordered by user id.
    #[must_use]
    pub fn profiles(&self) -> &BTreeMap<u64, UserProfile> {
        &self.profiles
    }

    /// Dense copy of the matrix. Only sensible for small inputs.
    #[must_use]
    pub fn to_dense(&self) -> Matrix<f32> {
        self.csr.to_dense()
    }
}

#[cfg(test)]
#[path = "tests_preference_contract.rs"]
mod tests_preference_contract;
