//! Low-dimensional user embeddings.

use crate::error::{BookrecError, Result};
use crate::primitives::Matrix;
use std::collections::HashMap;

/// Dense per-user vectors produced by the reducer.
///
/// Row `i` of [`vectors`](Embedding::vectors) belongs to `users()[i]`; the
/// order matches the preference matrix rows it was derived from.
///
/// # Examples
///
/// ```
/// use bookrec::embedding::Embedding;
/// use bookrec::primitives::Matrix;
///
/// let vectors = Matrix::from_vec(2, 2, vec![0.0, 1.0, 1.0, 0.0]).unwrap();
/// let embedding = Embedding::new(vec![10, 20], vectors).unwrap();
/// assert_eq!(embedding.dim(), 2);
/// assert_eq!(embedding.vector_of(20), Some(&[1.0, 0.0][..]));
/// ```
#[derive(Debug, Clone)]
pub struct Embedding {
    users: Vec<u64>,
    vectors: Matrix<f32>,
    index: HashMap<u64, usize>,
}

impl Embedding {
    /// Pairs a user index with its vectors.
    ///
    /// # Errors
    ///
    /// Returns an error if the user count differs from the row count or a
    /// user appears twice.
    pub fn new(users: Vec<u64>, vectors: Matrix<f32>) -> Result<Self> {
        if users.len() != vectors.n_rows() {
            return Err(BookrecError::Configuration(format!(
                "{} users but {} embedding rows",
                users.len(),
                vectors.n_rows()
            )));
        }
        let mut index = HashMap::with_capacity(users.len());
        for (row, &user) in users.iter().enumerate() {
            if index.insert(user, row).is_some() {
                return Err(BookrecError::Configuration(format!(
                    "user {user} appears twice in the embedding"
                )));
            }
        }
        Ok(Self {
            users,
            vectors,
            index,
        })
    }

    /// User ids in row order.
    #[must_use]
    pub fn users(&self) -> &[u64] {
        &self.users
    }

    /// The `n_users × dim` matrix.
    #[must_use]
    pub fn vectors(&self) -> &Matrix<f32> {
        &self.vectors
    }

    /// Number of embedded users.
    #[must_use]
    pub fn n_users(&self) -> usize {
        self.users.len()
    }

    /// Embedding dimensionality.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.vectors.n_cols()
    }

    /// Row index of a user.
    #[must_use]
    pub fn row_of(&self, user_id: u64) -> Option<usize> {
        self.index.get(&user_id).copied()
    }

    /// The vector of a user.
    #[must_use]
    pub fn vector_of(&self, user_id: u64) -> Option<&[f32]> {
        self.row_of(user_id).map(|row| self.vectors.row(row))
    }
}
