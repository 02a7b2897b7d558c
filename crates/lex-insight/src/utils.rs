//! Shared utilities for the analysis engine.
//!
//! Dtype classification and value extraction used by the profiler, the
//! correlation analyzer and the anomaly detector.

use crate::error::{AnalysisError, Result};
use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Category of a data type for analysis purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeCategory {
    /// Integer or floating point numbers
    Numeric,
    /// Date or datetime types
    Datetime,
    /// Boolean type
    Boolean,
    /// String/text type
    String,
    /// Column with no observed values at all
    Null,
    /// Other/unknown types
    Other,
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Datetime(_, _) | DataType::Date | DataType::Time
    )
}

/// Get the category of a DataType.
pub fn get_dtype_category(dtype: &DataType) -> DtypeCategory {
    if is_numeric_dtype(dtype) {
        DtypeCategory::Numeric
    } else if is_datetime_dtype(dtype) {
        DtypeCategory::Datetime
    } else if matches!(dtype, DataType::Boolean) {
        DtypeCategory::Boolean
    } else if matches!(dtype, DataType::String | DataType::Categorical(_, _)) {
        DtypeCategory::String
    } else if matches!(dtype, DataType::Null) {
        DtypeCategory::Null
    } else {
        DtypeCategory::Other
    }
}

/// Whether a column is analyzed as numbers.
///
/// An all-null column has no text to count either, so it is grouped with the
/// numerical columns, where the profiler skips it.
pub fn is_analyzed_as_numeric(dtype: &DataType) -> bool {
    matches!(
        get_dtype_category(dtype),
        DtypeCategory::Numeric | DtypeCategory::Null
    )
}

// =============================================================================
// Value Extraction Utilities
// =============================================================================

/// Look up a column, failing with `ColumnNotFound` for unknown names.
pub fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    df.column(name)
        .map_err(|_| AnalysisError::ColumnNotFound(name.to_string()))
}

/// Column values as floats, one entry per row, `None` for missing values.
///
/// NaN cells are reported as missing, matching how the quality audit counts
/// them.
pub fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = require_column(df, name)?.as_materialized_series();
    let floats = series.cast(&DataType::Float64)?;
    Ok(floats
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Non-missing column values as floats, in row order.
pub fn non_null_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    Ok(column_as_f64(df, name)?.into_iter().flatten().collect())
}

/// Non-missing column values rendered as strings, in row order.
pub fn non_null_strings(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let series = require_column(df, name)?.as_materialized_series();
    let strings = series.cast(&DataType::String)?;
    Ok(strings
        .str()?
        .into_iter()
        .flatten()
        .map(|s| s.to_string())
        .collect())
}

/// Missing cells in a column: nulls, plus NaN for float columns.
pub fn missing_count(column: &Column) -> PolarsResult<usize> {
    let nulls = column.null_count();
    if !matches!(column.dtype(), DataType::Float32 | DataType::Float64) {
        return Ok(nulls);
    }

    let float_series = column.as_materialized_series().cast(&DataType::Float64)?;
    let nans = float_series
        .f64()?
        .into_iter()
        .filter(|v| v.is_some_and(|x| x.is_nan()))
        .count();
    Ok(nulls + nans)
}

// =============================================================================
// Formatting Utilities
// =============================================================================

/// Format an integer with `,` thousands separators.
pub fn format_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// =============================================================================
// Tests
// =============================================================================
