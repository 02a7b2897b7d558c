//! Report assembly: runs every analysis stage in a fixed order and builds the
//! dashboard report from their outputs.

use polars::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, error, info};

use crate::anomalies::AnomalyDetector;
use crate::config::{AnalysisConfig, ConfigValidationError};
use crate::correlation::BivariateAnalyzer;
use crate::error::Result;
use crate::profiler::{ColumnClassifier, ColumnPartition, UnivariateProfiler};
use crate::quality::QualityAuditor;
use crate::types::{
    AnalysisOutput, DatasetOverview, Insight, Kpi, MarketTrends, QualityAudit, Report, Trend,
};
use crate::utils::format_thousands;

/// Scores above this mark the integrity KPI as trending up.
const HEALTHY_SCORE: f64 = 90.0;

/// The analysis engine.
///
/// Use [`Analyzer::builder()`] to create an analyzer with a custom
/// configuration.
///
/// # Example
///
/// ```rust,ignore
/// use lex_insight::{AnalysisConfig, Analyzer};
///
/// let output = Analyzer::builder()
///     .config(AnalysisConfig::builder().sample_seed(7).build()?)
///     .build()?
///     .run(&dataframe);
///
/// println!("{}", serde_json::to_string(&output)?);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalysisConfig,
}

static_assertions::assert_impl_all!(Analyzer: Send, Sync);

impl Analyzer {
    /// Create a new analyzer builder.
    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::default()
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze a dataset, returning the error document instead of failing.
    ///
    /// Never returns a partial report.
    pub fn run(&self, df: &DataFrame) -> AnalysisOutput {
        match self.analyze(df) {
            Ok(report) => AnalysisOutput::Report(Box::new(report)),
            Err(e) => {
                error!("Analysis failed: {}", e);
                AnalysisOutput::error(e.to_string())
            }
        }
    }

    /// Analyze a dataset.
    ///
    /// Stages run in order: quality audit, numerical profiles, categorical
    /// profiles, correlations, anomalies.
    ///
    /// # Errors
    ///
    /// Returns `Err(AnalysisError::EmptyDataset)` for a dataset without rows.
    pub fn analyze(&self, df: &DataFrame) -> Result<Report> {
        let rows = df.height();
        let columns = df.width();
        info!("Analyzing dataset: {} rows x {} columns", rows, columns);

        let audit = QualityAuditor::audit(df)?;
        let partition = ColumnClassifier::classify(df);
        debug!(
            "{} numerical and {} categorical columns",
            partition.numerical.len(),
            partition.categorical.len()
        );

        let profiler = UnivariateProfiler::new(&self.config);
        let numeric = profiler.profile_numeric(df, &partition.numerical)?;
        let categorical = profiler.profile_categorical(df, &partition.categorical)?;

        let mut rng = self.sampling_rng();
        let bivariate =
            BivariateAnalyzer::new(&self.config).analyze(df, &partition.numerical, &mut rng)?;

        let anomalies: Vec<Insight> = AnomalyDetector::new(&self.config)
            .detect(df, &partition.numerical)?
            .iter()
            .flat_map(|column| column.to_insights())
            .collect();

        let mut visualizations = numeric.visualizations;
        visualizations.extend(categorical.visualizations);
        visualizations.extend(bivariate.visualizations);

        let mut statistical_insights = numeric.insights;
        statistical_insights.extend(categorical.insights);

        let mut column_profiles = numeric.profiles;
        column_profiles.extend(categorical.profiles);

        info!(
            "Report ready: {} charts, {} insights, {} anomaly findings",
            visualizations.len(),
            statistical_insights.len() + bivariate.insights.len(),
            anomalies.len()
        );

        Ok(Report {
            dashboard_title: format!("Data Analysis: {} Attributes & {} Records", columns, rows),
            executive_summary: executive_summary(rows, columns, &audit, &partition),
            dataset_overview: DatasetOverview {
                rows,
                columns,
                numerical_columns: partition.numerical.len(),
                categorical_columns: partition.categorical.len(),
                density: density(audit.total_missing, rows, columns),
            },
            kpis: kpis(rows, columns, &audit, &partition),
            data_quality_audit: audit,
            statistical_insights,
            market_trends: MarketTrends {
                overview: format!(
                    "Multi-variable analysis across {} dimensions and {} segments.",
                    partition.numerical.len(),
                    partition.categorical.len()
                ),
                details: bivariate.insights,
            },
            anomalies,
            visualizations,
            key_features: key_features(&partition),
            column_profiles,
        })
    }

    /// One random source per run: seeded when configured, else from OS entropy.
    fn sampling_rng(&self) -> StdRng {
        match self.config.sample_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Builder for [`Analyzer`].
#[derive(Default)]
pub struct AnalyzerBuilder {
    config: Option<AnalysisConfig>,
}

impl AnalyzerBuilder {
    pub fn config(mut self, config: AnalysisConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the analyzer, validating the configuration.
    pub fn build(self) -> std::result::Result<Analyzer, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        Ok(Analyzer { config })
    }
}

fn executive_summary(
    rows: usize,
    columns: usize,
    audit: &QualityAudit,
    partition: &ColumnPartition,
) -> String {
    let mut summary = format!(
        "Analyzed {} records across {} attributes. The dataset is {:.1}% healthy with {} numerical and {} categorical columns.",
        rows,
        columns,
        audit.score,
        partition.numerical.len(),
        partition.categorical.len()
    );

    let groups: Vec<String> = [&partition.numerical, &partition.categorical]
        .iter()
        .map(|names| names.iter().take(2).cloned().collect::<Vec<_>>().join(", "))
        .filter(|group| !group.is_empty())
        .collect();
    if !groups.is_empty() {
        summary.push_str(&format!(
            " Key patterns were identified in {}.",
            groups.join(" and ")
        ));
    }

    summary
}

/// Share of non-missing cells.
fn density(total_missing: usize, rows: usize, columns: usize) -> f64 {
    let cells = rows * columns;
    if cells == 0 {
        return 1.0;
    }
    1.0 - total_missing as f64 / cells as f64
}

fn key_features(partition: &ColumnPartition) -> Vec<String> {
    partition
        .numerical
        .iter()
        .take(3)
        .chain(partition.categorical.iter().take(2))
        .cloned()
        .collect()
}

fn kpis(rows: usize, columns: usize, audit: &QualityAudit, partition: &ColumnPartition) -> Vec<Kpi> {
    vec![
        Kpi {
            label: "Total Records".to_string(),
            value: format_thousands(rows),
            change: "Rows".to_string(),
            trend: Trend::Neutral,
            icon: "activity".to_string(),
        },
        Kpi {
            label: "Data Integrity".to_string(),
            value: format!("{:.1}%", audit.score),
            change: "Health Score".to_string(),
            trend: if audit.raw_score > HEALTHY_SCORE {
                Trend::Up
            } else {
                Trend::Neutral
            },
            icon: "trending-up".to_string(),
        },
        Kpi {
            label: "Total Attributes".to_string(),
            value: columns.to_string(),
            change: format!(
                "{} numbers, {} categories",
                partition.numerical.len(),
                partition.categorical.len()
            ),
            trend: Trend::Neutral,
            icon: "layers".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChartType;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn seeded() -> Analyzer {
        Analyzer::builder()
            .config(AnalysisConfig::builder().sample_seed(11).build().unwrap())
            .build()
            .unwrap()
    }

    fn sales_frame() -> DataFrame {
        let units: Vec<i64> = (0..60).map(|i| 10 + i % 17).collect();
        let revenue: Vec<f64> = units
            .iter()
            .enumerate()
            .map(|(i, u)| *u as f64 * 9.5 + (i % 4) as f64 * 20.0)
            .collect();
        let region: Vec<&str> = (0..60)
            .map(|i| ["north", "south", "east"][i % 3])
            .collect();
        let year: Vec<&str> = (0..60).map(|i| ["2022", "2023"][i % 2]).collect();
        df![
            "units" => units,
            "revenue" => revenue,
            "region" => region,
            "sale_year" => year,
        ]
        .unwrap()
    }

    #[test]
    fn test_report_header_and_overview() {
        let report = seeded().analyze(&sales_frame()).unwrap();

        assert_eq!(report.dashboard_title, "Data Analysis: 4 Attributes & 60 Records");
        assert_eq!(report.dataset_overview.rows, 60);
        assert_eq!(report.dataset_overview.columns, 4);
        assert_eq!(report.dataset_overview.numerical_columns, 2);
        assert_eq!(report.dataset_overview.categorical_columns, 2);
        assert_eq!(report.dataset_overview.density, 1.0);
        assert_eq!(
            report.key_features,
            vec!["units", "revenue", "region", "sale_year"]
        );
        assert_eq!(
            report.executive_summary,
            "Analyzed 60 records across 4 attributes. The dataset is 100.0% healthy with \
             2 numerical and 2 categorical columns. Key patterns were identified in \
             units, revenue and region, sale_year."
        );
    }

    #[test]
    fn test_kpi_block() {
        let report = seeded().analyze(&sales_frame()).unwrap();

        assert_eq!(report.kpis.len(), 3);
        assert_eq!(report.kpis[0].label, "Total Records");
        assert_eq!(report.kpis[0].value, "60");
        assert_eq!(report.kpis[1].label, "Data Integrity");
        assert_eq!(report.kpis[1].value, "100.0%");
        assert_eq!(report.kpis[1].trend, Trend::Up);
        assert_eq!(report.kpis[2].change, "2 numbers, 2 categories");
    }

    #[test]
    fn test_stage_outputs_are_concatenated_in_order() {
        let report = seeded().analyze(&sales_frame()).unwrap();

        let ids: Vec<&str> = report.visualizations.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "hist_units",
                "box_units",
                "hist_revenue",
                "box_revenue",
                "cat_region",
                "cat_sale_year",
                "scatter_units_revenue",
            ]
        );
        let unique: HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());

        assert_eq!(report.statistical_insights.len(), 4);
        assert_eq!(report.market_trends.details.len(), 1);
        assert_eq!(report.column_profiles.len(), 4);
        assert_eq!(report.visualizations[6].chart_type, ChartType::Scatter);
    }

    #[test]
    fn test_seeded_runs_are_identical() {
        let df = sales_frame();
        assert_eq!(seeded().analyze(&df).unwrap(), seeded().analyze(&df).unwrap());
    }

    #[test]
    fn test_density_counts_missing_cells() {
        let df = df![
            "a" => [Some(1.0), None, Some(3.0), Some(4.0)],
            "b" => [Some("x"), Some("y"), None, Some("z")],
        ]
        .unwrap();
        let report = seeded().analyze(&df).unwrap();
        assert_eq!(report.dataset_overview.density, 0.75);
        assert_eq!(report.data_quality_audit.total_missing, 2);
        assert_eq!(report.kpis[1].trend, Trend::Neutral);
    }

    #[test]
    fn test_empty_dataset_becomes_error_document() {
        let df = df!["a" => Vec::<f64>::new()].unwrap();
        let output = seeded().run(&df);
        assert!(output.is_error());
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            serde_json::json!({"error": "Dataset is empty: no rows to analyze"})
        );
    }

    #[test]
    fn test_summary_without_numerical_columns() {
        let df = df!["color" => ["red", "blue", "red"]].unwrap();
        let report = seeded().analyze(&df).unwrap();
        assert!(report.executive_summary.ends_with("identified in color."));
        assert!(report.market_trends.details.is_empty());
        assert!(report.anomalies.is_empty());
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let config = AnalysisConfig {
            min_correlation: 2.0,
            ..AnalysisConfig::default()
        };
        assert!(Analyzer::builder().config(config).build().is_err());
    }
}
