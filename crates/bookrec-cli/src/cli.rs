//! Command-line arguments.

use bookrec::cluster::StrategyKind;
use bookrec::config::PipelineConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bookrec")]
#[command(about = "Cluster readers by implicit book preferences and recommend what their cluster liked")]
#[command(version, propagate_version = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub(crate) verbose: u8,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Recommend books for one reader
    Recommend {
        #[command(flatten)]
        data: DataArgs,

        /// Reader to recommend for
        #[arg(long)]
        user: u64,

        /// Length of the list (overrides the config)
        #[arg(long)]
        top_n: Option<usize>,
    },

    /// Print the elbow curve and silhouette scores over k
    Survey {
        #[command(flatten)]
        data: DataArgs,
    },

    /// Score both clustering strategies at the chosen k
    Compare {
        #[command(flatten)]
        data: DataArgs,
    },

    /// Fit the pipeline and save a model artifact
    Fit {
        #[command(flatten)]
        data: DataArgs,

        /// Artifact path
        #[arg(short, long, default_value = "bookrec-model.json")]
        output: PathBuf,
    },
}

/// Inputs shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub(crate) struct DataArgs {
    /// Books CSV (ISBN, Book-Title, Book-Author, Year-Of-Publication, ...)
    #[arg(long, env = "BOOKREC_BOOKS")]
    pub(crate) books: PathBuf,

    /// Users CSV (User-ID, Location, Age)
    #[arg(long, env = "BOOKREC_USERS")]
    pub(crate) users: PathBuf,

    /// Ratings CSV (User-ID, ISBN, Book-Rating)
    #[arg(long, env = "BOOKREC_RATINGS")]
    pub(crate) ratings: PathBuf,

    /// TOML configuration file
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,

    /// Random seed (overrides the config)
    #[arg(long)]
    pub(crate) seed: Option<u64>,

    /// Pin the cluster count and skip selection
    #[arg(short, long)]
    pub(crate) k: Option<usize>,

    /// Clustering strategy: centroid or hierarchical
    #[arg(long)]
    pub(crate) strategy: Option<StrategyKind>,
}

impl DataArgs {
    /// Loads the config file, if any, and applies flag overrides.
    pub(crate) fn pipeline_config(&self) -> bookrec::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_path(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.random_seed = seed;
        }
        if let Some(k) = self.k {
            config.fixed_k = Some(k);
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        config.validate()?;
        Ok(config)
    }
}
