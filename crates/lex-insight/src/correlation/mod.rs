//! Bivariate analysis: Pearson correlation between numerical columns,
//! selection of the strongest pairs and sampled scatter plots for them.

use std::collections::HashSet;

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::error::{Result, ResultExt};
use crate::profiler::statistics::pearson;
use crate::types::{ChartType, Insight, Layout, PlotPoint, ThemeColor, Visualization};
use crate::utils::column_as_f64;

/// Square matrix of pairwise Pearson coefficients. Undefined entries are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    names: Vec<String>,
    values: Vec<f64>,
}

impl CorrelationMatrix {
    /// Correlate every pair of columns over the rows where both have a value.
    pub fn compute(names: Vec<String>, columns: &[Vec<Option<f64>>]) -> Self {
        let n = names.len();
        let mut values = vec![f64::NAN; n * n];

        for i in 0..n {
            for j in i..n {
                let (xs, ys) = complete_pairs(&columns[i], &columns[j]);
                let r = pearson(&xs, &ys).unwrap_or(f64::NAN);
                values[i * n + j] = r;
                values[j * n + i] = r;
            }
        }

        Self { names, values }
    }

    /// Correlation matrix of the named columns of a frame.
    pub fn from_frame(df: &DataFrame, names: &[String]) -> Result<Self> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            columns.push(column_as_f64(df, name).context(format!("Reading column '{}'", name))?);
        }
        Ok(Self::compute(names.to_vec(), &columns))
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.names.len() + j]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Two columns and their correlation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub column_a: String,
    pub column_b: String,
    pub r: f64,
}

impl CorrelationPair {
    pub fn strength(&self) -> &'static str {
        relationship_strength(self.r)
    }

    pub fn direction(&self) -> &'static str {
        relationship_direction(self.r)
    }
}

/// `strong` above 0.7, `moderate` above 0.4, `weak` otherwise.
pub fn relationship_strength(r: f64) -> &'static str {
    let r = r.abs();
    if r > 0.7 {
        "strong"
    } else if r > 0.4 {
        "moderate"
    } else {
        "weak"
    }
}

pub fn relationship_direction(r: f64) -> &'static str {
    if r > 0.0 { "direct" } else { "opposite" }
}

/// Pick the strongest distinct column pairs.
///
/// Entries are scanned row by row, dropping the diagonal, undefined values and
/// near-perfect coefficients (`|r| >= self_correlation_cutoff`, a column
/// duplicated under another name). The rest are ordered by signed value,
/// highest first, keeping scan order for ties, and the first
/// `max_correlation_pairs` unordered pairs are returned.
pub fn select_top_pairs(matrix: &CorrelationMatrix, config: &AnalysisConfig) -> Vec<CorrelationPair> {
    let n = matrix.len();
    let mut candidates: Vec<(usize, usize, f64)> = Vec::new();

    for i in 0..n {
        for j in 0..n {
            let r = matrix.get(i, j);
            if i != j && !r.is_nan() && r.abs() < config.self_correlation_cutoff {
                candidates.push((i, j, r));
            }
        }
    }

    candidates.sort_by(|a, b| b.2.total_cmp(&a.2));

    let mut seen = HashSet::new();
    let mut pairs = Vec::new();
    for (i, j, r) in candidates {
        if pairs.len() >= config.max_correlation_pairs {
            break;
        }
        if seen.insert((i.min(j), i.max(j))) {
            pairs.push(CorrelationPair {
                column_a: matrix.names()[i].clone(),
                column_b: matrix.names()[j].clone(),
                r,
            });
        }
    }

    pairs
}

/// Up to `limit` complete `(x, y)` rows drawn uniformly without replacement.
pub fn sample_points(
    xs: &[Option<f64>],
    ys: &[Option<f64>],
    limit: usize,
    rng: &mut StdRng,
) -> Vec<(f64, f64)> {
    let complete: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();

    let amount = limit.min(complete.len());
    complete.choose_multiple(rng, amount).copied().collect()
}

fn complete_pairs(xs: &[Option<f64>], ys: &[Option<f64>]) -> (Vec<f64>, Vec<f64>) {
    xs.iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .unzip()
}

/// Charts and insights for the selected pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BivariateOutput {
    pub pairs: Vec<CorrelationPair>,
    pub visualizations: Vec<Visualization>,
    pub insights: Vec<Insight>,
}

pub struct BivariateAnalyzer<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> BivariateAnalyzer<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    /// Correlate the numerical columns and plot the strongest pairs.
    ///
    /// Needs at least two numerical columns; returns an empty output otherwise.
    /// Selected pairs weaker than `min_correlation` are not plotted.
    pub fn analyze(
        &self,
        df: &DataFrame,
        numerical: &[String],
        rng: &mut StdRng,
    ) -> Result<BivariateOutput> {
        let mut output = BivariateOutput::default();
        if numerical.len() < 2 {
            debug!("Skipping correlation analysis: fewer than two numerical columns");
            return Ok(output);
        }

        let matrix = CorrelationMatrix::from_frame(df, numerical)?;

        for pair in select_top_pairs(&matrix, self.config) {
            if pair.r.abs() < self.config.min_correlation {
                debug!(
                    "Skipping pair {} / {}: r = {:.3}",
                    pair.column_a, pair.column_b, pair.r
                );
                continue;
            }

            let xs = column_as_f64(df, &pair.column_a)
                .context(format!("Reading column '{}'", pair.column_a))?;
            let ys = column_as_f64(df, &pair.column_b)
                .context(format!("Reading column '{}'", pair.column_b))?;
            let points = sample_points(&xs, &ys, self.config.scatter_sample_size, rng);

            output.visualizations.push(Self::scatter(&pair, points));
            output.insights.push(Insight::new(
                "Potential Link Found",
                format!(
                    "A {} relationship suggests {} and {} are linked. (Score: {:.2})",
                    pair.strength(),
                    pair.column_a,
                    pair.column_b,
                    pair.r
                ),
            ));
            output.pairs.push(pair);
        }

        Ok(output)
    }

    fn scatter(pair: &CorrelationPair, points: Vec<(f64, f64)>) -> Visualization {
        let direction = pair.direction();
        Visualization {
            id: format!("scatter_{}_{}", pair.column_a, pair.column_b),
            chart_type: ChartType::Scatter,
            title: format!("Link: {} vs {}", pair.column_a, pair.column_b),
            description: format!(
                "This scatter plot shows a {} {} connection. \
                 As {} changes, {} tends to move in the {} direction.",
                pair.strength(),
                direction,
                pair.column_a,
                pair.column_b,
                direction
            ),
            layout: Layout::Full,
            data: points
                .into_iter()
                .enumerate()
                .map(|(i, (x, y))| PlotPoint::scatter(x, y, format!("Item {}", i)))
                .collect(),
            theme_color: ThemeColor::Emerald,
        }
    }
}
