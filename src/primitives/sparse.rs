//! Compressed sparse row storage.
//!
//! The preference matrix has one row per reader and one column per book, and
//! almost every cell is zero. `CsrMatrix` keeps only the non-zero entries so
//! the reducer can work on the full catalog without densifying it.

use super::Matrix;
use crate::error::{BookrecError, Result};
use serde::{Deserialize, Serialize};

/// A sparse matrix in compressed sparse row (CSR) layout.
///
/// Row `i` owns `indices[indptr[i]..indptr[i + 1]]` (strictly increasing
/// column indices) and the matching `values`.
///
/// # Examples
///
/// ```
/// use bookrec::primitives::CsrMatrix;
///
/// let m = CsrMatrix::from_rows(3, &[vec![(0, 1.0), (2, 1.0)], vec![(1, 1.0)]])
///     .expect("valid rows");
/// assert_eq!(m.shape(), (2, 3));
/// assert_eq!(m.nnz(), 3);
/// assert_eq!(m.row_indices(0), &[0, 2]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<f32>,
}

impl CsrMatrix {
    /// Builds a matrix from per-row `(column, value)` entries.
    ///
    /// Entries within a row may come in any order; duplicate columns are
    /// summed and explicit zeros are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if a column index is out of range.
    pub fn from_rows(n_cols: usize, rows: &[Vec<(usize, f32)>]) -> Result<Self> {
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::new();
        let mut values = Vec::new();
        indptr.push(0);

        for (i, row) in rows.iter().enumerate() {
            let mut entries = row.clone();
            entries.sort_by_key(|&(col, _)| col);

            let mut last: Option<usize> = None;
            for (col, value) in entries {
                if col >= n_cols {
                    return Err(BookrecError::Configuration(format!(
                        "row {i} references column {col}, matrix has {n_cols} columns"
                    )));
                }
                if last == Some(col) {
                    if let Some(v) = values.last_mut() {
                        *v += value;
                    }
                } else {
                    indices.push(col);
                    values.push(value);
                    last = Some(col);
                }
            }

            // drop explicit zeros left behind (including sums that cancelled)
            let start = indptr[i];
            let mut write = start;
            for read in start..indices.len() {
                if values[read] != 0.0 {
                    indices[write] = indices[read];
                    values[write] = values[read];
                    write += 1;
                }
            }
            indices.truncate(write);
            values.truncate(write);
            indptr.push(indices.len());
        }

        Ok(Self {
            n_rows: rows.len(),
            n_cols,
            indptr,
            indices,
            values,
        })
    }

    /// Converts a dense matrix, keeping only its non-zero cells.
    #[must_use]
    pub fn from_dense(dense: &Matrix<f32>) -> Self {
        let (n_rows, n_cols) = dense.shape();
        let mut indptr = Vec::with_capacity(n_rows + 1);
        let mut indices = Vec::new();
        let mut values = Vec::new();
        indptr.push(0);

        for row in dense.rows() {
            for (j, &v) in row.iter().enumerate() {
                if v != 0.0 {
                    indices.push(j);
                    values.push(v);
                }
            }
            indptr.push(indices.len());
        }
        // zero-width rows are skipped by Matrix::rows
        while indptr.len() < n_rows + 1 {
            indptr.push(indices.len());
        }

        Self {
            n_rows,
            n_cols,
            indptr,
            indices,
            values,
        }
    }

    /// Returns the shape as (rows, cols).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Number of stored (non-zero) entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Column indices of the non-zero entries in row `i`.
    #[must_use]
    pub fn row_indices(&self, i: usize) -> &[usize] {
        &self.indices[self.indptr[i]..self.indptr[i + 1]]
    }

    /// Values of the non-zero entries in row `i`.
    #[must_use]
    pub fn row_values(&self, i: usize) -> &[f32] {
        &self.values[self.indptr[i]..self.indptr[i + 1]]
    }

    /// Iterates `(column, value)` pairs of row `i`.
    pub fn row_iter(&self, i: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.row_indices(i)
            .iter()
            .copied()
            .zip(self.row_values(i).iter().copied())
    }

    /// Value at (row, col), zero when not stored.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        let cols = self.row_indices(row);
        cols.binary_search(&col)
            .map_or(0.0, |pos| self.row_values(row)[pos])
    }

    /// Sum of each row.
    #[must_use]
    pub fn row_sums(&self) -> Vec<f32> {
        (0..self.n_rows)
            .map(|i| self.row_values(i).iter().sum())
            .collect()
    }

    /// Sum of each column.
    #[must_use]
    pub fn column_sums(&self) -> Vec<f32> {
        let mut sums = vec![0.0; self.n_cols];
        for (&col, &v) in self.indices.iter().zip(&self.values) {
            sums[col] += v;
        }
        sums
    }

    /// Sum of squares of each column.
    #[must_use]
    pub fn column_sq_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.n_cols];
        for (&col, &v) in self.indices.iter().zip(&self.values) {
            sums[col] += f64::from(v) * f64::from(v);
        }
        sums
    }

    /// Expands to a dense matrix.
    #[must_use]
    pub fn to_dense(&self) -> Matrix<f32> {
        let mut dense = Matrix::zeros(self.n_rows, self.n_cols);
        for i in 0..self.n_rows {
            for (j, v) in self.row_iter(i) {
                dense.set(i, j, v);
            }
        }
        dense
    }
}
