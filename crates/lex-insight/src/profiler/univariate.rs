//! Per-column profiles with their charts and narrative insights.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use tracing::debug;

use super::statistics::{self, Histogram};
use crate::config::AnalysisConfig;
use crate::error::{Result, ResultExt};
use crate::types::{
    CategoricalStats, ChartType, ColumnKind, ColumnProfile, ColumnStats, Insight, Layout,
    NumericStats, PlotPoint, ThemeColor, Visualization,
};
use crate::utils::{non_null_f64, non_null_strings};

/// Column names that describe a moment or period in time.
static TIME_LIKE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)date|time|year").expect("Invalid regex: time-like name"));

/// Histograms switch to the finer bucket count at this many distinct values.
const FINE_BINS_MIN_DISTINCT: usize = 20;
const COARSE_BINS: usize = 10;
const FINE_BINS: usize = 15;

/// Integral histograms with at least this many buckets get range labels.
const RANGE_LABEL_MIN_BINS: usize = 12;

/// Profiles, charts and insights produced for a set of columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnivariateOutput {
    pub profiles: Vec<ColumnProfile>,
    pub visualizations: Vec<Visualization>,
    pub insights: Vec<Insight>,
}

impl UnivariateOutput {
    fn extend(&mut self, other: UnivariateOutput) {
        self.profiles.extend(other.profiles);
        self.visualizations.extend(other.visualizations);
        self.insights.extend(other.insights);
    }
}

/// Word describing how lopsided a distribution is.
pub fn skew_label(skew: Option<f64>) -> &'static str {
    match skew.map(f64::abs) {
        Some(s) if s > 1.0 => "high",
        Some(s) if s > 0.5 => "moderate",
        _ => "low",
    }
}

/// Axis labels for histogram buckets.
///
/// Integral data is labelled with whole numbers (`"lo-hi"` ranges once the
/// histogram is fine-grained), anything else with the left edge to one decimal.
pub fn bucket_labels(histogram: &Histogram, integral: bool) -> Vec<String> {
    let buckets = histogram.counts.len();
    let edges = &histogram.edges;

    (0..buckets)
        .map(|i| {
            if !integral {
                format!("{:.1}", edges[i])
            } else if buckets < RANGE_LABEL_MIN_BINS {
                format!("{}", edges[i].trunc() as i64)
            } else {
                format!(
                    "{}-{}",
                    edges[i].trunc() as i64,
                    edges[i + 1].trunc() as i64
                )
            }
        })
        .collect()
}

/// Builds univariate profiles for numerical and categorical columns.
pub struct UnivariateProfiler<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> UnivariateProfiler<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    /// Profile the first `max_numeric_columns` numerical columns.
    ///
    /// Columns with no non-missing values are skipped.
    pub fn profile_numeric(&self, df: &DataFrame, columns: &[String]) -> Result<UnivariateOutput> {
        let mut output = UnivariateOutput::default();

        for name in columns.iter().take(self.config.max_numeric_columns) {
            let values = non_null_f64(df, name).context(format!("Reading column '{}'", name))?;
            match Self::numeric_column(name, &values) {
                Some(column) => output.extend(column),
                None => debug!("Skipping numeric column '{}': no finite values", name),
            }
        }

        Ok(output)
    }

    /// Profile the first `max_categorical_columns` categorical columns.
    ///
    /// Columns with no non-missing values are skipped.
    pub fn profile_categorical(
        &self,
        df: &DataFrame,
        columns: &[String],
    ) -> Result<UnivariateOutput> {
        let mut output = UnivariateOutput::default();

        for name in columns.iter().take(self.config.max_categorical_columns) {
            let values =
                non_null_strings(df, name).context(format!("Reading column '{}'", name))?;
            match self.categorical_column(name, &values) {
                Some(column) => output.extend(column),
                None => debug!("Skipping categorical column '{}': no values", name),
            }
        }

        Ok(output)
    }

    fn numeric_column(name: &str, values: &[f64]) -> Option<UnivariateOutput> {
        let sorted = statistics::sorted(values);
        let mean = statistics::mean(values)?;
        let q1 = statistics::quantile_sorted(&sorted, 0.25)?;
        let median = statistics::quantile_sorted(&sorted, 0.5)?;
        let q3 = statistics::quantile_sorted(&sorted, 0.75)?;
        let min = *sorted.first()?;
        let max = *sorted.last()?;
        let std = statistics::sample_std(values);
        let skew = statistics::skewness(values);

        let stats = NumericStats {
            count: values.len(),
            mean,
            std,
            min,
            q1,
            median,
            q3,
            max,
            skew,
            kurtosis: statistics::kurtosis(values),
            coefficient_of_variation: statistics::coefficient_of_variation(std, mean),
        };

        let bins = if statistics::distinct_count(values) >= FINE_BINS_MIN_DISTINCT {
            FINE_BINS
        } else {
            COARSE_BINS
        };
        let histogram = Histogram::compute(values, bins)?;
        let labels = bucket_labels(&histogram, statistics::all_integral(values));

        let histogram_viz = Visualization {
            id: format!("hist_{}", name),
            chart_type: ChartType::Bar,
            title: format!("Distribution of {}", name),
            description: format!(
                "This histogram shows the spread of '{}'. The average is {:.1}. \
                 A '{}' skew means most data points are concentrated on one side of the scale.",
                name,
                mean,
                skew_label(skew)
            ),
            layout: Layout::Half,
            data: labels
                .into_iter()
                .zip(&histogram.counts)
                .map(|(label, count)| PlotPoint::category(label, *count))
                .collect(),
            theme_color: ThemeColor::Indigo,
        };

        let range_viz = Visualization {
            id: format!("box_{}", name),
            chart_type: ChartType::Bar,
            title: format!("Statistics Summary: {}", name),
            description: format!(
                "This chart breaks down {} into critical ranges. \
                 The middle 50% of your data sits between {:.1} (Q1) and {:.1} (Q3).",
                name, q1, q3
            ),
            layout: Layout::Half,
            data: vec![
                PlotPoint::category("Min (Lowest)", min),
                PlotPoint::category("Q1 (25th %)", q1),
                PlotPoint::category("Median (Middle)", median),
                PlotPoint::category("Q3 (75th %)", q3),
                PlotPoint::category("Max (Highest)", max),
            ],
            theme_color: ThemeColor::Purple,
        };

        let insight = Insight::new(
            format!("Summary for {}", name),
            format!(
                "On average, {} is {:.1}. Most values fall between {:.1} and {:.1}.",
                name, mean, q1, q3
            ),
        );

        Some(UnivariateOutput {
            profiles: vec![ColumnProfile {
                name: name.to_string(),
                kind: ColumnKind::Numeric,
                stats: ColumnStats::Numeric(stats),
            }],
            visualizations: vec![histogram_viz, range_viz],
            insights: vec![insight],
        })
    }

    fn categorical_column(&self, name: &str, values: &[String]) -> Option<UnivariateOutput> {
        let counts = value_counts(values);
        let entropy = statistics::shannon_entropy(
            &counts.iter().map(|(_, count)| *count).collect::<Vec<_>>(),
        )?;
        let unique_count = counts.len();
        let top_values: Vec<(String, usize)> = counts
            .into_iter()
            .take(self.config.top_categories)
            .collect();
        let (top_value, top_count) = top_values.first().cloned()?;

        let chart_type = if top_values.len() <= self.config.pie_max_slices {
            ChartType::Pie
        } else {
            ChartType::Bar
        };

        let mut description = format!(
            "This chart organizes your data into categories based on '{}'. ",
            name
        );
        if TIME_LIKE_NAME.is_match(name) {
            description.push_str("As this represents time or date, it shows the most active periods. ");
        }
        description.push_str(&format!(
            "The group '{}' is significantly active with {} records.",
            top_value, top_count
        ));

        let visualization = Visualization {
            id: format!("cat_{}", name),
            chart_type,
            title: format!("Groups by {}", name),
            description,
            layout: Layout::Half,
            data: top_values
                .iter()
                .map(|(value, count)| PlotPoint::category(value.clone(), *count))
                .collect(),
            theme_color: ThemeColor::Teal,
        };

        let insight = Insight::new(
            format!("Categorical: {}", name),
            format!(
                "Found {} unique types in {}. '{}' is the dominant group with {} records.",
                unique_count, name, top_value, top_count
            ),
        );

        Some(UnivariateOutput {
            profiles: vec![ColumnProfile {
                name: name.to_string(),
                kind: ColumnKind::Categorical,
                stats: ColumnStats::Categorical(CategoricalStats {
                    unique_count,
                    top_values,
                    entropy,
                }),
            }],
            visualizations: vec![visualization],
            insights: vec![insight],
        })
    }
}

/// Value frequencies, most frequent first. Equal counts keep the order in
/// which the values were first seen.
fn value_counts(values: &[String]) -> Vec<(String, usize)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();

    for value in values {
        match index.get(value.as_str()) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(value.as_str(), counts.len());
                counts.push((value.clone(), 1));
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}
