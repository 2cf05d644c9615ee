//! Run configuration.
//!
//! All knobs of a reproducible run live in [`PipelineConfig`]. Defaults match
//! the reference analysis; any field may be overridden from a TOML file:
//!
//! ```toml
//! embedding_dim = 3
//! shortlist = [3, 4, 5, 6, 7, 8]
//! fixed_k = 4
//! random_seed = 0
//! strategy = "hierarchical"
//! ```

use crate::cluster::StrategyKind;
use crate::error::{BookrecError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for one batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Earliest publication year kept (inclusive)
    pub min_year: i32,
    /// Latest publication year kept (inclusive)
    pub max_year: i32,
    /// Youngest reader age kept (inclusive)
    pub min_age: u32,
    /// Oldest reader age kept (inclusive)
    pub max_age: u32,
    /// Only the first N rating rows are considered, when set
    pub max_ratings: Option<usize>,
    /// Number of PCA components
    pub embedding_dim: usize,
    /// Cluster counts surveyed for the elbow curve
    pub k_candidates: Vec<usize>,
    /// Cluster counts scored by silhouette; the best one is chosen
    pub shortlist: Vec<usize>,
    /// Pins k and skips selection
    pub fixed_k: Option<usize>,
    /// Length of a recommendation list
    pub top_n: usize,
    /// Seed for every stochastic step
    pub random_seed: u64,
    /// k-means restarts
    pub n_init: usize,
    /// k-means iteration cap per restart
    pub max_iter: usize,
    /// Strategy used for the final assignment
    pub strategy: StrategyKind,
    /// Largest user count the hierarchical strategy accepts
    pub hierarchical_max_samples: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_year: 1950,
            max_year: 2016,
            min_age: 15,
            max_age: 100,
            max_ratings: None,
            embedding_dim: 3,
            k_candidates: (2..=25).collect(),
            shortlist: (3..=8).collect(),
            fixed_k: None,
            top_n: 10,
            random_seed: 0,
            n_init: 10,
            max_iter: 300,
            strategy: StrategyKind::Centroid,
            hierarchical_max_samples: 10_000,
        }
    }
}

impl PipelineConfig {
    /// Parses a TOML document; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`BookrecError::Configuration`] if the document is malformed or
    /// fails validation.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Renders the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| BookrecError::Serialization(e.to_string()))
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`BookrecError::Configuration`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(BookrecError::Configuration(msg));

        if self.min_year > self.max_year {
            return fail(format!(
                "min_year {} exceeds max_year {}",
                self.min_year, self.max_year
            ));
        }
        if self.min_age > self.max_age {
            return fail(format!(
                "min_age {} exceeds max_age {}",
                self.min_age, self.max_age
            ));
        }
        if self.embedding_dim == 0 {
            return fail("embedding_dim must be at least 1".to_string());
        }
        if self.k_candidates.is_empty() {
            return fail("k_candidates must not be empty".to_string());
        }
        if self.shortlist.is_empty() && self.fixed_k.is_none() {
            return fail("shortlist must not be empty unless fixed_k is set".to_string());
        }
        if let Some(k) = self.fixed_k {
            if k < 2 {
                return fail(format!("fixed_k = {k}, expected at least 2"));
            }
        }
        if self.top_n == 0 {
            return fail("top_n must be at least 1".to_string());
        }
        if self.n_init == 0 {
            return fail("n_init must be at least 1".to_string());
        }
        if self.max_iter == 0 {
            return fail("max_iter must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_reference_run() {
        let config = PipelineConfig::default();
        assert_eq!(config.embedding_dim, 3);
        assert_eq!(config.k_candidates.first(), Some(&2));
        assert_eq!(config.k_candidates.last(), Some(&25));
        assert_eq!(config.shortlist, vec![3, 4, 5, 6, 7, 8]);
        assert_eq!(config.top_n, 10);
        assert!(config.fixed_k.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = PipelineConfig::from_toml_str("fixed_k = 4\nstrategy = \"hierarchical\"\n")
            .expect("valid toml");
        assert_eq!(config.fixed_k, Some(4));
        assert_eq!(config.strategy, StrategyKind::Hierarchical);
        assert_eq!(config.min_year, 1950);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = PipelineConfig {
            fixed_k: Some(5),
            max_ratings: Some(400_000),
            random_seed: 7,
            ..PipelineConfig::default()
        };
        let text = config.to_toml_string().expect("serializes");
        let parsed = PipelineConfig::from_toml_str(&text).expect("parses");
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        let bad_years = PipelineConfig {
            min_year: 2020,
            max_year: 2000,
            ..PipelineConfig::default()
        };
        assert!(bad_years.validate().is_err());

        let bad_dim = PipelineConfig {
            embedding_dim: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            bad_dim.validate(),
            Err(BookrecError::Configuration(_))
        ));

        let bad_k = PipelineConfig {
            fixed_k: Some(1),
            ..PipelineConfig::default()
        };
        assert!(bad_k.validate().is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let result = PipelineConfig::from_toml_str("embedding_dim = \"three\"");
        assert!(matches!(result, Err(BookrecError::Configuration(_))));
    }

    #[test]
    fn test_from_path() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "top_n = 5").expect("write");
        let config = PipelineConfig::from_path(file.path()).expect("loads");
        assert_eq!(config.top_n, 5);
    }
}
