//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use bookrec::prelude::*;
//! ```

pub use crate::cluster::{
    AgglomerativeClustering, CentroidStrategy, ClusterAssignment, HierarchicalStrategy, KMeans,
    Linkage, StrategyKind,
};
pub use crate::config::PipelineConfig;
pub use crate::data::{BookCatalog, CsvSource, RatingRecord, ReaderCatalog};
pub use crate::decomposition::Pca;
pub use crate::embedding::Embedding;
pub use crate::error::{BookrecError, Result};
pub use crate::metrics::{inertia, silhouette_score};
pub use crate::model_selection::ClusterCountSelector;
pub use crate::pipeline::{FittedPipeline, Pipeline};
pub use crate::preference::{PreferenceBuilder, PreferenceMatrix};
pub use crate::primitives::{CsrMatrix, Matrix};
pub use crate::recommend::{Recommendation, Recommender};
pub use crate::serialization::ModelArtifact;
pub use crate::traits::{ClusterStrategy, Transformer, UnsupervisedEstimator};
