//! The end-to-end batch pipeline.
//!
//! Stages run in a fixed order and each one takes its inputs by reference
//! and returns a new artifact:
//!
//! ```text
//! ratings ─▶ PreferenceMatrix ─▶ (Pca, Embedding) ─▶ SelectionReport ─▶ ClusterAssignment ─▶ Recommendations
//! ```
//!
//! Every stage is callable on its own; [`Pipeline::run`] chains them.
//!
//! # Example
//!
//! ```
//! use bookrec::config::PipelineConfig;
//! use bookrec::data::RatingRecord;
//! use bookrec::pipeline::Pipeline;
//!
//! let mut ratings = Vec::new();
//! for user in 0..8u64 {
//!     let (liked, also) = if user < 4 { ("A", "B") } else { ("C", "D") };
//!     ratings.push(RatingRecord::new(user, liked, 9));
//!     if user % 2 == 0 {
//!         ratings.push(RatingRecord::new(user, also, 9));
//!     }
//!     ratings.push(RatingRecord::new(user, "Z", 1));
//! }
//!
//! let config = PipelineConfig {
//!     embedding_dim: 2,
//!     k_candidates: vec![2, 3],
//!     shortlist: vec![2, 3],
//!     ..PipelineConfig::default()
//! };
//! let fitted = Pipeline::new(config).run(&ratings).expect("pipeline runs");
//!
//! let recs = fitted.recommend(1).expect("user 1 is clustered");
//! assert!(recs.iter().all(|r| r.item_id != "A"));
//! ```

use crate::cluster::{
    compare_strategies, CentroidStrategy, ClusterAssignment, HierarchicalStrategy, StrategyKind,
    StrategyScore,
};
use crate::config::PipelineConfig;
use crate::data::{self, BookCatalog, ItemLookup, RatingRecord, ReaderCatalog};
use crate::decomposition::Pca;
use crate::embedding::Embedding;
use crate::error::Result;
use crate::model_selection::{ClusterCountSelector, SelectionReport};
use crate::preference::{PreferenceBuilder, PreferenceMatrix};
use crate::recommend::{Recommendation, RecommendedBook, Recommender};
use crate::serialization::ModelArtifact;
use crate::traits::{ClusterStrategy, Transformer};
use tracing::info;

/// A configured, not yet fitted pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Creates a pipeline.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// k-means as configured.
    #[must_use]
    pub fn centroid_strategy(&self) -> CentroidStrategy {
        CentroidStrategy::new(self.config.random_seed)
            .with_n_init(self.config.n_init)
            .with_max_iter(self.config.max_iter)
    }

    /// Ward clustering as configured.
    #[must_use]
    pub fn hierarchical_strategy(&self) -> HierarchicalStrategy {
        HierarchicalStrategy::new().with_max_samples(self.config.hierarchical_max_samples)
    }

    /// The strategy named by `config.strategy`.
    #[must_use]
    pub fn strategy(&self) -> Box<dyn ClusterStrategy> {
        match self.config.strategy {
            StrategyKind::Centroid => Box::new(self.centroid_strategy()),
            StrategyKind::Hierarchical => Box::new(self.hierarchical_strategy()),
        }
    }

    /// Applies the catalog filters to raw ratings.
    ///
    /// # Errors
    ///
    /// Returns an error if no rating survives.
    pub fn clean(
        &self,
        books: &BookCatalog,
        readers: &ReaderCatalog,
        ratings: &[RatingRecord],
    ) -> Result<Vec<RatingRecord>> {
        data::clean(books, readers, ratings, &self.config)
    }

    /// Stage 1: the binary liked matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing is liked.
    pub fn build_preferences(&self, ratings: &[RatingRecord]) -> Result<PreferenceMatrix> {
        PreferenceBuilder::new().build(ratings)
    }

    /// Stage 2: fits PCA once and embeds every user.
    ///
    /// # Errors
    ///
    /// Returns an error if `embedding_dim` exceeds what the matrix supports.
    pub fn reduce(&self, matrix: &PreferenceMatrix) -> Result<(Pca, Embedding)> {
        let mut pca = Pca::new(self.config.embedding_dim).with_random_state(self.config.random_seed);
        let vectors = pca.fit_transform(matrix.csr())?;
        let embedding = Embedding::new(matrix.users().to_vec(), vectors)?;
        info!(
            users = embedding.n_users(),
            dim = embedding.dim(),
            explained = ?pca.explained_variance_ratio(),
            "reduced preference matrix"
        );
        Ok((pca, embedding))
    }

    /// Stage 3: elbow and silhouette surveys.
    ///
    /// # Errors
    ///
    /// Returns an error if no shortlisted k is feasible.
    pub fn select_k(&self, embedding: &Embedding) -> Result<SelectionReport> {
        let strategy = self.strategy();
        ClusterCountSelector::new(self.config.random_seed)
            .with_centroid_strategy(self.centroid_strategy())
            .select_with(
                embedding,
                &self.config.k_candidates,
                &self.config.shortlist,
                strategy.as_ref(),
            )
    }

    /// Stage 4: partitions users with the configured strategy.
    ///
    /// # Errors
    ///
    /// Returns an error if `k` is infeasible for the strategy.
    pub fn assign(&self, embedding: &Embedding, k: usize) -> Result<ClusterAssignment> {
        let assignment = self.strategy().fit(embedding, k)?;
        info!(
            k,
            strategy = assignment.strategy(),
            inertia = assignment.inertia(),
            sizes = ?assignment.cluster_sizes(),
            "assigned clusters"
        );
        Ok(assignment)
    }

    /// Stage 5: recommendations for one user.
    ///
    /// # Errors
    ///
    /// Returns an error if the user is not clustered.
    pub fn recommend(
        &self,
        user_id: u64,
        assignment: &ClusterAssignment,
        matrix: &PreferenceMatrix,
    ) -> Result<Vec<Recommendation>> {
        Recommender::new(self.config.top_n).recommend(user_id, assignment, matrix)
    }

    /// Runs stages 1 to 4. Selection is skipped when `fixed_k` is set.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before any stage runs, then the first
    /// stage error.
    pub fn run(&self, ratings: &[RatingRecord]) -> Result<FittedPipeline> {
        self.config.validate()?;
        let matrix = self.build_preferences(ratings)?;
        let (pca, embedding) = self.reduce(&matrix)?;
        let (selection, k) = match self.config.fixed_k {
            Some(k) => (None, k),
            None => {
                let report = self.select_k(&embedding)?;
                let k = report.best_k;
                (Some(report), k)
            }
        };
        let assignment = self.assign(&embedding, k)?;

        Ok(FittedPipeline {
            config: self.config.clone(),
            matrix,
            pca,
            embedding,
            selection,
            assignment,
        })
    }

    /// Cleans raw catalogs and runs the pipeline.
    ///
    /// # Errors
    ///
    /// Returns the first stage error.
    pub fn run_from_catalogs(
        &self,
        books: &BookCatalog,
        readers: &ReaderCatalog,
        ratings: &[RatingRecord],
    ) -> Result<FittedPipeline> {
        self.config.validate()?;
        let cleaned = self.clean(books, readers, ratings)?;
        self.run(&cleaned)
    }
}

/// Every artifact of a completed run.
#[derive(Debug, Clone)]
pub struct FittedPipeline {
    config: PipelineConfig,
    matrix: PreferenceMatrix,
    pca: Pca,
    embedding: Embedding,
    selection: Option<SelectionReport>,
    assignment: ClusterAssignment,
}

impl FittedPipeline {
    /// The liked matrix.
    #[must_use]
    pub fn matrix(&self) -> &PreferenceMatrix {
        &self.matrix
    }

    /// The fitted projection.
    #[must_use]
    pub fn pca(&self) -> &Pca {
        &self.pca
    }

    /// Per-user vectors.
    #[must_use]
    pub fn embedding(&self) -> &Embedding {
        &self.embedding
    }

    /// Survey results, absent when k was fixed.
    #[must_use]
    pub fn selection(&self) -> Option<&SelectionReport> {
        self.selection.as_ref()
    }

    /// Final clusters.
    #[must_use]
    pub fn assignment(&self) -> &ClusterAssignment {
        &self.assignment
    }

    /// Chosen cluster count.
    #[must_use]
    pub fn k(&self) -> usize {
        self.assignment.k()
    }

    /// Recommendations for one user.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`](crate::error::BookrecError::NotFound) for
    /// users without a cluster.
    pub fn recommend(&self, user_id: u64) -> Result<Vec<Recommendation>> {
        Recommender::new(self.config.top_n).recommend(user_id, &self.assignment, &self.matrix)
    }

    /// Recommendations joined with catalog metadata.
    ///
    /// # Errors
    ///
    /// Same as [`recommend`](Self::recommend).
    pub fn recommend_with_details(
        &self,
        user_id: u64,
        catalog: &dyn ItemLookup,
    ) -> Result<Vec<RecommendedBook>> {
        Recommender::new(self.config.top_n).recommend_with_details(
            user_id,
            &self.assignment,
            &self.matrix,
            catalog,
        )
    }

    /// Scores both strategies at the chosen k.
    ///
    /// # Errors
    ///
    /// Returns the first strategy error, e.g. the hierarchical ceiling.
    pub fn compare_strategies(&self) -> Result<Vec<StrategyScore>> {
        let pipeline = Pipeline::new(self.config.clone());
        let centroid = pipeline.centroid_strategy();
        let hierarchical = pipeline.hierarchical_strategy();
        compare_strategies(&self.embedding, self.k(), &[&centroid, &hierarchical])
    }

    /// Versioned artifact of this run.
    ///
    /// # Errors
    ///
    /// Returns an error if the projection is not fitted.
    pub fn to_artifact(&self) -> Result<ModelArtifact> {
        ModelArtifact::new(&self.pca, &self.assignment, self.matrix.items())
    }
}
