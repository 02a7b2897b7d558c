//! Configuration types for the analysis engine.
//!
//! The defaults reproduce the dashboard's established limits (8 numerical
//! columns profiled, 5 categorical, 4 scatter pairs, ...). Use the builder to
//! override them.

use serde::{Deserialize, Serialize};

/// Configuration for an analysis run.
///
/// Use [`AnalysisConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use lex_insight::config::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .max_numeric_columns(4)
///     .sample_seed(7)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Number of numerical columns (in column order) that get a univariate profile.
    /// Default: 8
    pub max_numeric_columns: usize,

    /// Number of categorical columns (in column order) that get a frequency profile.
    /// Default: 5
    pub max_categorical_columns: usize,

    /// Number of numerical columns scanned for outliers.
    /// Default: 5
    pub max_anomaly_columns: usize,

    /// Number of distinct column pairs taken from the ranked correlation list.
    /// Default: 4
    pub max_correlation_pairs: usize,

    /// Number of most frequent values shown per categorical column.
    /// Default: 10
    pub top_categories: usize,

    /// Categorical charts with at most this many values are rendered as pies.
    /// Default: 6
    pub pie_max_slices: usize,

    /// Maximum number of points in a scatter plot.
    /// Default: 200
    pub scatter_sample_size: usize,

    /// Pairs with a weaker absolute correlation are not plotted.
    /// Default: 0.2
    pub min_correlation: f64,

    /// Pairs at or above this absolute correlation are treated as duplicates of
    /// the same column.
    /// Default: 0.999
    pub self_correlation_cutoff: f64,

    /// Absolute z-score above which a value is an outlier.
    /// Default: 3.0
    pub zscore_threshold: f64,

    /// IQR multiplier for the outlier fence.
    /// Default: 1.5
    pub iqr_multiplier: f64,

    /// Seed for scatter sampling. `None` seeds from OS entropy.
    /// Default: None
    pub sample_seed: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_numeric_columns: 8,
            max_categorical_columns: 5,
            max_anomaly_columns: 5,
            max_correlation_pairs: 4,
            top_categories: 10,
            pie_max_slices: 6,
            scatter_sample_size: 200,
            min_correlation: 0.2,
            self_correlation_cutoff: 0.999,
            zscore_threshold: 3.0,
            iqr_multiplier: 1.5,
            sample_seed: None,
        }
    }
}

impl AnalysisConfig {
    /// Create a new configuration builder.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(0.0..=1.0).contains(&self.min_correlation) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "min_correlation".to_string(),
                value: self.min_correlation,
            });
        }

        if !(self.self_correlation_cutoff > 0.0 && self.self_correlation_cutoff <= 1.0) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "self_correlation_cutoff".to_string(),
                value: self.self_correlation_cutoff,
            });
        }

        if !(self.zscore_threshold.is_finite() && self.zscore_threshold > 0.0) {
            return Err(ConfigValidationError::NonPositive {
                field: "zscore_threshold".to_string(),
                value: self.zscore_threshold,
            });
        }

        if !(self.iqr_multiplier.is_finite() && self.iqr_multiplier >= 0.0) {
            return Err(ConfigValidationError::NonPositive {
                field: "iqr_multiplier".to_string(),
                value: self.iqr_multiplier,
            });
        }

        if self.top_categories == 0 {
            return Err(ConfigValidationError::ZeroLimit("top_categories".to_string()));
        }

        if self.scatter_sample_size == 0 {
            return Err(ConfigValidationError::ZeroLimit(
                "scatter_sample_size".to_string(),
            ));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid value for '{field}': {value} (must be a finite positive number)")]
    NonPositive { field: String, value: f64 },

    #[error("Invalid limit for '{0}': must be at least 1")]
    ZeroLimit(String),
}

impl From<ConfigValidationError> for crate::error::AnalysisError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::AnalysisError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`AnalysisConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    /// Set how many numerical columns get a univariate profile.
    pub fn max_numeric_columns(mut self, limit: usize) -> Self {
        self.config.max_numeric_columns = limit;
        self
    }

    /// Set how many categorical columns get a frequency profile.
    pub fn max_categorical_columns(mut self, limit: usize) -> Self {
        self.config.max_categorical_columns = limit;
        self
    }

    /// Set how many numerical columns are scanned for outliers.
    pub fn max_anomaly_columns(mut self, limit: usize) -> Self {
        self.config.max_anomaly_columns = limit;
        self
    }

    /// Set how many correlation pairs are considered for scatter plots.
    pub fn max_correlation_pairs(mut self, limit: usize) -> Self {
        self.config.max_correlation_pairs = limit;
        self
    }

    /// Set how many of the most frequent values are kept per categorical column.
    pub fn top_categories(mut self, limit: usize) -> Self {
        self.config.top_categories = limit;
        self
    }

    /// Set the largest category count still drawn as a pie chart.
    pub fn pie_max_slices(mut self, limit: usize) -> Self {
        self.config.pie_max_slices = limit;
        self
    }

    /// Set the maximum number of sampled points per scatter plot.
    pub fn scatter_sample_size(mut self, size: usize) -> Self {
        self.config.scatter_sample_size = size;
        self
    }

    /// Set the minimum absolute correlation for a pair to be plotted.
    ///
    /// # Arguments
    /// * `threshold` - Value between 0.0 and 1.0
    pub fn min_correlation(mut self, threshold: f64) -> Self {
        self.config.min_correlation = threshold;
        self
    }

    /// Set the absolute correlation at which two columns count as the same column.
    pub fn self_correlation_cutoff(mut self, cutoff: f64) -> Self {
        self.config.self_correlation_cutoff = cutoff;
        self
    }

    /// Set the z-score threshold for outliers.
    pub fn zscore_threshold(mut self, threshold: f64) -> Self {
        self.config.zscore_threshold = threshold;
        self
    }

    /// Set the IQR fence multiplier.
    pub fn iqr_multiplier(mut self, multiplier: f64) -> Self {
        self.config.iqr_multiplier = multiplier;
        self
    }

    /// Fix the scatter sampling seed for reproducible reports.
    pub fn sample_seed(mut self, seed: u64) -> Self {
        self.config.sample_seed = Some(seed);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `AnalysisConfig` or an error if validation fails.
    pub fn build(self) -> Result<AnalysisConfig, ConfigValidationError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
