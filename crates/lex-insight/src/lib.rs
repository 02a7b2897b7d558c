//! Automated Exploratory Data Analysis
//!
//! Turns a tabular dataset into a dashboard-ready report: summary statistics,
//! data-quality metrics, chart specifications and narrative insights.
//!
//! # Overview
//!
//! An analysis run executes these stages, in order:
//!
//! - **Quality Audit**: missingness, duplicate rows and a 0-100 health score
//! - **Column Classification**: numerical vs categorical, by dtype
//! - **Univariate Profiles**: moments, quartiles, histograms and value frequencies
//! - **Bivariate Analysis**: Pearson correlations with sampled scatter plots
//! - **Anomaly Detection**: z-score and IQR fencing per numerical column
//!
//! The result is a [`Report`], or a single-key `{"error": ...}` document when
//! the dataset cannot be analyzed.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_insight::{Analyzer, DatasetLoader, OutputEncoding, encode_output};
//!
//! let df = DatasetLoader::load("sales.csv")?;
//! let output = Analyzer::builder().build()?.run(&df);
//!
//! // Strict JSON: NaN and infinities are written as null.
//! println!("{}", encode_output(&output, OutputEncoding::Utf8, false)?);
//! ```
//!
//! # Configuration
//!
//! Column limits, thresholds and the sampling seed live in [`AnalysisConfig`]:
//!
//! ```rust,ignore
//! use lex_insight::{AnalysisConfig, Analyzer};
//!
//! let config = AnalysisConfig::builder()
//!     .max_numeric_columns(4)
//!     .zscore_threshold(2.5)
//!     .sample_seed(42)   // reproducible scatter plots
//!     .build()?;
//!
//! let report = Analyzer::builder().config(config).build()?.analyze(&df)?;
//! ```

pub mod anomalies;
pub mod config;
pub mod correlation;
pub mod error;
pub mod loader;
pub mod profiler;
pub mod quality;
pub mod reporting;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use anomalies::{AnomalyDetector, ColumnAnomalies};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, ConfigValidationError};
pub use correlation::{BivariateAnalyzer, CorrelationMatrix, CorrelationPair};
pub use error::{AnalysisError, Result as AnalysisResult, ResultExt};
pub use loader::DatasetLoader;
pub use profiler::{ColumnClassifier, ColumnPartition, UnivariateProfiler};
pub use quality::QualityAuditor;
pub use reporting::{Analyzer, AnalyzerBuilder, NumericValue, OutputEncoding, encode_output};
pub use types::{
    AnalysisOutput, ColumnKind, ColumnProfile, DatasetOverview, Insight, Kpi, QualityAudit,
    Report, Visualization,
};
