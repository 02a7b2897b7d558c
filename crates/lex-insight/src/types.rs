use crate::reporting::codec::{NumericValue, finite_or_null};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Whether a column is profiled as numbers or as labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; undefined for a single value.
    #[serde(serialize_with = "finite_or_null")]
    pub std: Option<f64>,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    #[serde(serialize_with = "finite_or_null")]
    pub skew: Option<f64>,
    #[serde(serialize_with = "finite_or_null")]
    pub kurtosis: Option<f64>,
    #[serde(serialize_with = "finite_or_null")]
    pub coefficient_of_variation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalStats {
    pub unique_count: usize,
    pub top_values: Vec<(String, usize)>,
    pub entropy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnStats {
    Numeric(NumericStats),
    Categorical(CategoricalStats),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
    pub stats: ColumnStats,
}

/// Per-column missing counts, serialized as a map in column order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "std::collections::BTreeMap<String, usize>")]
pub struct MissingCounts(pub Vec<(String, usize)>);

impl MissingCounts {
    pub fn get(&self, column: &str) -> Option<usize> {
        self.0
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, count)| *count)
    }

    pub fn total(&self) -> usize {
        self.0.iter().map(|(_, count)| count).sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<std::collections::BTreeMap<String, usize>> for MissingCounts {
    fn from(map: std::collections::BTreeMap<String, usize>) -> Self {
        Self(map.into_iter().collect())
    }
}

impl Serialize for MissingCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (column, count) in &self.0 {
            map.serialize_entry(column, count)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAudit {
    /// Health score in `[0, 100]`, rounded to one decimal.
    pub score: f64,
    pub details: String,
    pub missing: MissingCounts,
    pub missing_percent_mean: f64,
    pub duplicate_row_count: usize,
    pub total_missing: usize,
    /// Unrounded score, used for the KPI trend.
    #[serde(skip)]
    pub raw_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Pie,
    Scatter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Half,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeColor {
    Indigo,
    Purple,
    Teal,
    Emerald,
}

/// One plotted datum. Bar and pie charts carry `{name, value}`, scatter
/// plots carry `{x, y, name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlotPoint {
    Scatter {
        x: NumericValue,
        y: NumericValue,
        name: String,
    },
    Category {
        name: String,
        value: NumericValue,
    },
}

impl PlotPoint {
    pub fn category(name: impl Into<String>, value: impl Into<NumericValue>) -> Self {
        PlotPoint::Category {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn scatter(x: f64, y: f64, name: impl Into<String>) -> Self {
        PlotPoint::Scatter {
            x: NumericValue::Float(x),
            y: NumericValue::Float(y),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visualization {
    pub id: String,
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub title: String,
    pub description: String,
    pub layout: Layout,
    pub data: Vec<PlotPoint>,
    #[serde(rename = "themeColor")]
    pub theme_color: ThemeColor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub title: String,
    pub text: String,
}

impl Insight {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketTrends {
    pub overview: String,
    pub details: Vec<Insight>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kpi {
    pub label: String,
    pub value: String,
    pub change: String,
    pub trend: Trend,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetOverview {
    pub rows: usize,
    pub columns: usize,
    pub numerical_columns: usize,
    pub categorical_columns: usize,
    /// Share of non-missing cells, `1 - missing / (rows * columns)`.
    pub density: f64,
}

/// The complete analysis report handed to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub dashboard_title: String,
    pub executive_summary: String,
    pub dataset_overview: DatasetOverview,
    pub data_quality_audit: QualityAudit,
    pub statistical_insights: Vec<Insight>,
    pub market_trends: MarketTrends,
    pub anomalies: Vec<Insight>,
    pub visualizations: Vec<Visualization>,
    pub key_features: Vec<String>,
    pub kpis: Vec<Kpi>,
    pub column_profiles: Vec<ColumnProfile>,
}

static_assertions::assert_impl_all!(Report: Send, Sync);

/// What one run emits: the full report, or a single-key error document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisOutput {
    Error { error: String },
    Report(Box<Report>),
}

impl AnalysisOutput {
    pub fn error(message: impl Into<String>) -> Self {
        AnalysisOutput::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AnalysisOutput::Error { .. })
    }

    pub fn report(&self) -> Option<&Report> {
        match self {
            AnalysisOutput::Report(report) => Some(report),
            AnalysisOutput::Error { .. } => None,
        }
    }
}
