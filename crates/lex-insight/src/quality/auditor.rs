use crate::error::{AnalysisError, Result, ResultExt};
use crate::types::{MissingCounts, QualityAudit};
use crate::utils::missing_count;
use polars::prelude::*;
use tracing::debug;

pub struct QualityAuditor;

impl QualityAuditor {
    /// Audit missingness and duplicate rows.
    ///
    /// `score = clamp(100 - (mean missing % + duplicate %), 0, 100)`, rounded
    /// to one decimal. A dataset without rows has no defined score and is
    /// rejected.
    pub fn audit(df: &DataFrame) -> Result<QualityAudit> {
        let rows = df.height();
        if rows == 0 {
            return Err(AnalysisError::EmptyDataset);
        }

        let mut missing = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            let count = missing_count(column)
                .context(format!("Counting missing values in '{}'", column.name()))?;
            missing.push((column.name().to_string(), count));
        }
        let missing = MissingCounts(missing);

        let missing_percent_mean = if missing.is_empty() {
            0.0
        } else {
            missing
                .0
                .iter()
                .map(|(_, count)| *count as f64 / rows as f64 * 100.0)
                .sum::<f64>()
                / missing.len() as f64
        };

        let duplicate_row_count = Self::duplicate_rows(df)?;
        let duplicate_percent = duplicate_row_count as f64 / rows as f64 * 100.0;

        let raw_score = (100.0 - (missing_percent_mean + duplicate_percent)).clamp(0.0, 100.0);
        let score = (raw_score * 10.0).round() / 10.0;
        let total_missing = missing.total();

        debug!(
            "Quality audit: score {:.1}, {} missing cells, {} duplicate rows",
            score, total_missing, duplicate_row_count
        );

        Ok(QualityAudit {
            score,
            details: format!(
                "Missingness: {} total ({:.1}%), Duplicates: {} rows.",
                total_missing, missing_percent_mean, duplicate_row_count
            ),
            missing,
            missing_percent_mean,
            duplicate_row_count,
            total_missing,
            raw_score,
        })
    }

    /// Rows identical to an earlier row across every column.
    fn duplicate_rows(df: &DataFrame) -> Result<usize> {
        if df.width() == 0 {
            return Ok(0);
        }
        let unique = df
            .unique::<&str, &str>(None, UniqueKeepStrategy::First, None)
            .context("Finding duplicate rows")?;
        Ok(df.height() - unique.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_dataset_scores_100() {
        let df = df![
            "a" => [1i64, 2, 3, 4],
            "b" => ["w", "x", "y", "z"],
        ]
        .unwrap();

        let audit = QualityAuditor::audit(&df).unwrap();
        assert_eq!(audit.score, 100.0);
        assert_eq!(audit.total_missing, 0);
        assert_eq!(audit.duplicate_row_count, 0);
        assert_eq!(
            audit.details,
            "Missingness: 0 total (0.0%), Duplicates: 0 rows."
        );
    }

    #[test]
    fn test_missing_and_duplicates_lower_the_score() {
        let df = df![
            "a" => [Some(1i64), Some(1), None, Some(4)],
            "b" => [Some("x"), Some("x"), Some("y"), None],
        ]
        .unwrap();

        let audit = QualityAuditor::audit(&df).unwrap();
        assert_eq!(audit.missing.get("a"), Some(1));
        assert_eq!(audit.missing.get("b"), Some(1));
        assert_eq!(audit.total_missing, 2);
        assert_eq!(audit.missing_percent_mean, 25.0);
        assert_eq!(audit.duplicate_row_count, 1);
        assert_eq!(audit.score, 50.0);
    }

    #[test]
    fn test_score_is_clamped_at_zero() {
        let df = df![
            "a" => [None::<f64>, None, None],
            "b" => [None::<f64>, None, None],
        ]
        .unwrap();

        let audit = QualityAuditor::audit(&df).unwrap();
        assert_eq!(audit.duplicate_row_count, 2);
        assert_eq!(audit.score, 0.0);
        assert!((0.0..=100.0).contains(&audit.raw_score));
    }

    #[test]
    fn test_score_rounds_to_one_decimal() {
        let df = df!["a" => [Some(1i64), Some(2), None]].unwrap();
        let audit = QualityAuditor::audit(&df).unwrap();
        assert_eq!(audit.score, 66.7);
        assert!((audit.raw_score - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_nan_counts_as_missing() {
        let df = df!["v" => [1.0, f64::NAN, 3.0, 4.0]].unwrap();
        let audit = QualityAuditor::audit(&df).unwrap();
        assert_eq!(audit.total_missing, 1);
        assert_eq!(audit.score, 75.0);
    }

    #[test]
    fn test_empty_dataset_is_an_error() {
        let df = df!["a" => Vec::<i64>::new()].unwrap();
        assert!(matches!(
            QualityAuditor::audit(&df),
            Err(AnalysisError::EmptyDataset)
        ));
    }
}
