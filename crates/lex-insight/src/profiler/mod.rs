//! Column profiling for dataset analysis.
//!
//! This module provides:
//! - Column classification (numerical vs categorical)
//! - Statistical helpers (moments, quantiles, histograms, entropy)
//! - Univariate profiles with their charts and insights

pub mod statistics;
mod univariate;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::utils::is_analyzed_as_numeric;

pub use univariate::{UnivariateOutput, UnivariateProfiler, bucket_labels, skew_label};

/// Column names split by how they are analyzed. Both lists keep column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPartition {
    pub numerical: Vec<String>,
    pub categorical: Vec<String>,
}

impl ColumnPartition {
    /// Total number of classified columns.
    pub fn len(&self) -> usize {
        self.numerical.len() + self.categorical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numerical.is_empty() && self.categorical.is_empty()
    }
}

/// Splits dataset columns into numerical and categorical sets.
pub struct ColumnClassifier;

impl ColumnClassifier {
    /// Classify every column by its dtype.
    ///
    /// Values are never inspected: a string column holding digits stays
    /// categorical.
    pub fn classify(df: &DataFrame) -> ColumnPartition {
        let mut partition = ColumnPartition::default();

        for column in df.get_columns() {
            let name = column.name().to_string();
            if is_analyzed_as_numeric(column.dtype()) {
                partition.numerical.push(name);
            } else {
                partition.categorical.push(name);
            }
        }

        partition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_partitions_every_column_once() {
        let df = df![
            "age" => [30i64, 40, 50],
            "city" => ["a", "b", "c"],
            "score" => [1.5, 2.5, 3.5],
            "active" => [true, false, true],
        ]
        .unwrap();

        let partition = ColumnClassifier::classify(&df);
        assert_eq!(partition.numerical, vec!["age", "score"]);
        assert_eq!(partition.categorical, vec!["city", "active"]);
        assert_eq!(partition.len(), df.width());
        assert!(
            partition
                .numerical
                .iter()
                .all(|n| !partition.categorical.contains(n))
        );
    }

    #[test]
    fn test_numeric_looking_text_stays_categorical() {
        let df = df!["zip" => ["10001", "94105", "60601"]].unwrap();
        let partition = ColumnClassifier::classify(&df);
        assert!(partition.numerical.is_empty());
        assert_eq!(partition.categorical, vec!["zip"]);
    }

    #[test]
    fn test_empty_frame() {
        let partition = ColumnClassifier::classify(&DataFrame::empty());
        assert!(partition.is_empty());
    }
}
