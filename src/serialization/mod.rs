//! Model artifact serialization.
//!
//! A fitted run is stored as one versioned JSON document:
//! ```text
//! {
//!   "format_version": 1,
//!   "pca":       { mean, components, explained variance, ... },
//!   "k": 4, "strategy": "centroid", "inertia": 12.5,
//!   "centroids": { k × d matrix },
//!   "labels":    [ one per user ],
//!   "users":     [ row order of the preference matrix ],
//!   "items":     [ column order of the preference matrix ]
//! }
//! ```
//!
//! Example:
//! ```rust
//! use bookrec::config::PipelineConfig;
//! use bookrec::data::RatingRecord;
//! use bookrec::pipeline::Pipeline;
//! use bookrec::serialization::ModelArtifact;
//!
//! let ratings: Vec<RatingRecord> = (0..6u64)
//!     .flat_map(|u| {
//!         let liked = if u < 3 { "A" } else { "B" };
//!         vec![RatingRecord::new(u, liked, 9), RatingRecord::new(u, "Z", 1)]
//!     })
//!     .collect();
//! let config = PipelineConfig { embedding_dim: 1, fixed_k: Some(2), ..PipelineConfig::default() };
//! let fitted = Pipeline::new(config).run(&ratings).expect("pipeline runs");
//!
//! let json = fitted.to_artifact().expect("fitted").to_json_string().expect("serializes");
//! let restored = ModelArtifact::from_json_str(&json).expect("same version");
//! assert_eq!(restored.k, 2);
//! assert_eq!(restored.users.len(), 6);
//! ```

use crate::cluster::ClusterAssignment;
use crate::decomposition::Pca;
use crate::embedding::Embedding;
use crate::error::{BookrecError, Result};
use crate::preference::PreferenceMatrix;
use crate::primitives::Matrix;
use crate::traits::Transformer;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Newest artifact layout this build reads and writes.
pub const FORMAT_VERSION: u32 = 1;

/// Everything needed to reproduce a fitted run's clustering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Layout version
    pub format_version: u32,
    /// Fitted projection
    pub pca: Pca,
    /// Number of clusters
    pub k: usize,
    /// Name of the producing strategy
    pub strategy: String,
    /// Within-cluster sum of squares
    pub inertia: f32,
    /// Cluster means in embedding space
    pub centroids: Matrix<f32>,
    /// Cluster label per user
    pub labels: Vec<usize>,
    /// User ids in preference-matrix row order
    pub users: Vec<u64>,
    /// Item ids in preference-matrix column order
    pub items: Vec<String>,
}

impl ModelArtifact {
    /// Captures a fitted projection and its cluster assignment.
    ///
    /// # Errors
    ///
    /// Returns an error if the projection is not fitted.
    pub fn new(pca: &Pca, assignment: &ClusterAssignment, items: &[String]) -> Result<Self> {
        if !pca.is_fitted() {
            return Err(BookrecError::not_fitted("PCA"));
        }
        Ok(Self {
            format_version: FORMAT_VERSION,
            pca: pca.clone(),
            k: assignment.k(),
            strategy: assignment.strategy().to_string(),
            inertia: assignment.inertia(),
            centroids: assignment.centroids().clone(),
            labels: assignment.labels().to_vec(),
            users: assignment.users().to_vec(),
            items: items.to_vec(),
        })
    }

    /// Rebuilds the cluster assignment.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored parts are inconsistent.
    pub fn assignment(&self) -> Result<ClusterAssignment> {
        ClusterAssignment::from_parts(
            self.users.clone(),
            self.labels.clone(),
            self.k,
            self.strategy.clone(),
            self.centroids.clone(),
            self.inertia,
        )
    }

    /// Projects a preference matrix with the stored PCA, without refitting.
    ///
    /// # Errors
    ///
    /// Returns [`BookrecError::Configuration`] if the matrix columns differ
    /// from the stored item order.
    pub fn embed(&self, matrix: &PreferenceMatrix) -> Result<Embedding> {
        if matrix.items() != self.items.as_slice() {
            return Err(BookrecError::Configuration(
                "preference matrix items differ from the artifact's item order".to_string(),
            ));
        }
        let vectors = self.pca.transform(matrix.csr())?;
        Embedding::new(matrix.users().to_vec(), vectors)
    }

    /// Renders the artifact as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses an artifact, rejecting newer layouts before reading the body.
    ///
    /// # Errors
    ///
    /// Returns [`BookrecError::UnsupportedVersion`] for a newer layout and
    /// [`BookrecError::Serialization`] for malformed JSON.
    pub fn from_json_str(s: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct Header {
            format_version: u32,
        }

        let header: Header = serde_json::from_str(s)?;
        if header.format_version > FORMAT_VERSION {
            return Err(BookrecError::UnsupportedVersion {
                found: header.format_version,
                supported: FORMAT_VERSION,
            });
        }
        Ok(serde_json::from_str(s)?)
    }

    /// Writes the artifact to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = self.to_json_string()?;
        fs::write(path.as_ref(), json)?;
        info!(path = %path.as_ref().display(), k = self.k, "saved model artifact");
        Ok(())
    }

    /// Reads an artifact from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }
}
