//! bookrec: cluster readers by their implicit book preferences and recommend
//! what their cluster liked.
//!
//! A rating counts as a *like* when it is strictly above the reader's own mean
//! rating. The liked matrix is reduced with PCA, readers are clustered in the
//! reduced space (k-means or Ward agglomerative), the cluster count is chosen
//! by silhouette, and each reader is recommended the items most popular among
//! the other members of their cluster.
//!
//! # Quick Start
//!
//! ```
//! use bookrec::prelude::*;
//!
//! let x = Matrix::from_vec(6, 2, vec![
//!     0.0, 0.0,
//!     0.1, 0.0,
//!     0.0, 0.1,
//!     5.0, 5.0,
//!     5.1, 5.0,
//!     5.0, 5.1,
//! ]).expect("6x2 matrix");
//!
//! let mut kmeans = KMeans::new(2).with_random_state(42);
//! kmeans.fit(&x).expect("2 < 6 points");
//!
//! let labels = kmeans.predict(&x);
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[3]);
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: dense [`Matrix`] and sparse [`CsrMatrix`]
//! - [`data`]: rating records, book and reader catalogs, CSV loading
//! - [`preference`]: the binary liked matrix
//! - [`decomposition`]: PCA on sparse input
//! - [`cluster`]: k-means, agglomerative clustering, cluster strategies
//! - [`metrics`]: inertia and silhouette
//! - [`model_selection`]: elbow and silhouette surveys over k
//! - [`recommend`]: cluster-popularity recommendations
//! - [`serialization`]: versioned JSON model artifacts
//! - [`pipeline`]: the end-to-end batch run

pub mod cluster;
pub mod config;
pub mod data;
pub mod decomposition;
pub mod embedding;
pub mod error;
pub mod metrics;
pub mod model_selection;
pub mod pipeline;
pub mod preference;
pub mod prelude;
pub mod primitives;
pub mod recommend;
pub mod serialization;
pub mod traits;

pub use error::{BookrecError, Result};
pub use primitives::{CsrMatrix, Matrix};
pub use traits::{ClusterStrategy, Transformer, UnsupervisedEstimator};
