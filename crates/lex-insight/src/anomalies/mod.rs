//! Outlier detection for numerical columns.
//!
//! Two independent methods run per column: a z-score test against the
//! population mean and std, and Tukey fencing around the quartiles. Their
//! counts are reported side by side and never deduplicated.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::error::{Result, ResultExt};
use crate::profiler::statistics::{abs_zscores, quantile_sorted, sorted};
use crate::types::Insight;
use crate::utils::non_null_f64;

/// Outlier counts for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnAnomalies {
    pub column: String,
    /// Values with `|z|` above the threshold.
    pub zscore_outliers: usize,
    /// Values outside `[lower_fence, upper_fence]`.
    pub iqr_outliers: usize,
    pub lower_fence: f64,
    pub upper_fence: f64,
}

impl ColumnAnomalies {
    /// Narrative findings; a method that flagged nothing contributes none.
    pub fn to_insights(&self) -> Vec<Insight> {
        let mut insights = Vec::new();

        if self.zscore_outliers > 0 {
            insights.push(Insight::new(
                format!("Outliers in {}", self.column),
                format!(
                    "Found {} unusual records that are significantly different from the average in {}.",
                    self.zscore_outliers, self.column
                ),
            ));
        }

        if self.iqr_outliers > 0 {
            insights.push(Insight::new(
                format!("Data Fencing: {}", self.column),
                format!(
                    "IQR analysis detected {} points that fall outside the typical range for {}.",
                    self.iqr_outliers, self.column
                ),
            ));
        }

        insights
    }
}

/// Scans numerical columns for outliers.
pub struct AnomalyDetector<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> AnomalyDetector<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    /// Run both tests on the first `max_anomaly_columns` numerical columns.
    /// Columns without values are skipped.
    pub fn detect(&self, df: &DataFrame, numerical: &[String]) -> Result<Vec<ColumnAnomalies>> {
        let mut results = Vec::new();

        for name in numerical.iter().take(self.config.max_anomaly_columns) {
            let values = non_null_f64(df, name).context(format!("Reading column '{}'", name))?;
            match self.scan(name, &values) {
                Some(anomalies) => {
                    debug!(
                        "Column '{}': {} z-score outliers, {} outside [{}, {}]",
                        name,
                        anomalies.zscore_outliers,
                        anomalies.iqr_outliers,
                        anomalies.lower_fence,
                        anomalies.upper_fence
                    );
                    results.push(anomalies);
                }
                None => debug!("Skipping outlier scan of '{}': no values", name),
            }
        }

        Ok(results)
    }

    /// Both tests over the non-missing values of one column.
    pub fn scan(&self, name: &str, values: &[f64]) -> Option<ColumnAnomalies> {
        let ordered = sorted(values);
        let q1 = quantile_sorted(&ordered, 0.25)?;
        let q3 = quantile_sorted(&ordered, 0.75)?;
        let iqr = q3 - q1;
        let lower_fence = q1 - self.config.iqr_multiplier * iqr;
        let upper_fence = q3 + self.config.iqr_multiplier * iqr;

        // Zero variance leaves every z-score undefined; nothing is flagged.
        let zscore_outliers = abs_zscores(values)
            .map(|scores| {
                scores
                    .iter()
                    .filter(|z| **z > self.config.zscore_threshold)
                    .count()
            })
            .unwrap_or(0);

        let iqr_outliers = values
            .iter()
            .filter(|v| **v < lower_fence || **v > upper_fence)
            .count();

        Some(ColumnAnomalies {
            column: name.to_string(),
            zscore_outliers,
            iqr_outliers,
            lower_fence,
            upper_fence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(values: &[f64]) -> ColumnAnomalies {
        let config = AnalysisConfig::default();
        AnomalyDetector::new(&config).scan("v", values).unwrap()
    }

    #[test]
    fn test_iqr_fence_flags_single_spike() {
        let anomalies = scan(&[1.0, 1.0, 1.0, 1.0, 100.0]);
        assert_eq!(anomalies.lower_fence, 1.0);
        assert_eq!(anomalies.upper_fence, 1.0);
        assert_eq!(anomalies.iqr_outliers, 1);
        // Five points cap |z| at 2.
        assert_eq!(anomalies.zscore_outliers, 0);
    }

    #[test]
    fn test_zscore_flags_spike_in_longer_series() {
        let mut values = vec![1.0; 20];
        values.push(100.0);
        let anomalies = scan(&values);
        assert_eq!(anomalies.zscore_outliers, 1);
        assert_eq!(anomalies.iqr_outliers, 1);

        let insights = anomalies.to_insights();
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].title, "Outliers in v");
        assert!(insights[0].text.contains("Found 1 unusual records"));
        assert_eq!(insights[1].title, "Data Fencing: v");
    }

    #[test]
    fn test_constant_column_flags_nothing() {
        let anomalies = scan(&[4.0, 4.0, 4.0]);
        assert_eq!(anomalies.zscore_outliers, 0);
        assert_eq!(anomalies.iqr_outliers, 0);
        assert!(anomalies.to_insights().is_empty());
    }

    #[test]
    fn test_uniform_values_have_no_outliers() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        let anomalies = scan(&values);
        assert_eq!(anomalies.zscore_outliers, 0);
        assert_eq!(anomalies.iqr_outliers, 0);
        assert_eq!(anomalies.lower_fence, 3.25 - 1.5 * 4.5);
    }

    #[test]
    fn test_detect_respects_column_limit_and_skips_empty() {
        let df = df![
            "empty" => [None::<f64>, None, None],
            "a" => [1.0, 2.0, 3.0], "b" => [1.0, 2.0, 3.0], "c" => [1.0, 2.0, 3.0],
            "d" => [1.0, 2.0, 3.0], "e" => [1.0, 2.0, 3.0],
        ]
        .unwrap();
        let columns: Vec<String> = ["empty", "a", "b", "c", "d", "e"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let config = AnalysisConfig::default();
        let results = AnomalyDetector::new(&config).detect(&df, &columns).unwrap();

        let scanned: Vec<&str> = results.iter().map(|r| r.column.as_str()).collect();
        assert_eq!(scanned, vec!["a", "b", "c", "d"]);
    }
}
