//! Dataset loading for delimited text files and spreadsheet workbooks.
//!
//! The delimiter is sniffed from the header line. Files exported with a
//! locale that uses `;` are common enough that a parse yielding a single
//! column is retried with `;` before it is accepted. Workbooks are read from
//! their first sheet.

use std::borrow::Cow;
use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{AnalysisError, Result, ResultExt};

/// Delimiters considered when sniffing, in tie-break order.
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// File extensions read as delimited text.
const DELIMITED_EXTENSIONS: [&str; 3] = ["csv", "tsv", "txt"];

/// File extensions read as spreadsheet workbooks.
const WORKBOOK_EXTENSIONS: [&str; 2] = ["xls", "xlsx"];

/// Rows used for schema inference on the first attempt.
const INFER_SCHEMA_ROWS: usize = 100;

pub struct DatasetLoader;

impl DatasetLoader {
    /// Load a dataset file into a DataFrame.
    ///
    /// # Errors
    ///
    /// - `UnsupportedFormat` for anything but `.csv`, `.tsv`, `.txt`, `.xls`
    ///   and `.xlsx`
    /// - `Io` when the file cannot be read
    /// - `Workbook` when a workbook cannot be opened
    /// - `Polars` when no parsing strategy succeeds
    pub fn load(path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let df = match extension.as_deref() {
            Some(e) if DELIMITED_EXTENSIONS.contains(&e) => {
                let bytes = std::fs::read(path)?;
                let content = decode_text(&bytes, path);
                Self::parse(&content).context(format!("Loading {}", path.display()))?
            }
            Some(e) if WORKBOOK_EXTENSIONS.contains(&e) => {
                read_workbook(path).context(format!("Loading {}", path.display()))?
            }
            _ => {
                return Err(AnalysisError::UnsupportedFormat(format!(
                    "Unsupported file format: {}",
                    path.display()
                )));
            }
        };

        info!(
            "Loaded {}: {} rows x {} columns",
            path.display(),
            df.height(),
            df.width()
        );
        Ok(df)
    }

    /// Parse delimited text with a header row.
    pub fn parse(content: &str) -> Result<DataFrame> {
        let delimiter = sniff_delimiter(content);
        debug!("Sniffed delimiter {:?}", delimiter as char);
        Self::parse_with_delimiter(content, delimiter)
    }

    /// Parse with a known delimiter, retrying with `;` when only one column
    /// comes out.
    ///
    /// Records with more fields than the header are skipped. Text columns
    /// without a single value are read as empty float columns.
    pub fn parse_with_delimiter(content: &str, delimiter: u8) -> Result<DataFrame> {
        let mut df = read_with_fallbacks(content, delimiter)?;

        if df.width() == 1 && delimiter != b';' {
            match read_with_fallbacks(content, b';') {
                Ok(retried) if retried.width() > 1 => {
                    debug!("Single column with {:?}, using ';'", delimiter as char);
                    df = retried;
                }
                Ok(_) => {}
                Err(e) => warn!("Retry with ';' failed: {}", e),
            }
        }

        Ok(empty_text_as_float(df)?)
    }
}

/// Lossy UTF-8 decoding; warns when bytes had to be replaced.
fn decode_text<'a>(bytes: &'a [u8], path: &Path) -> Cow<'a, str> {
    let text = String::from_utf8_lossy(bytes);
    if let Cow::Owned(_) = text {
        warn!(
            "{} is not valid UTF-8, invalid bytes were replaced with U+FFFD",
            path.display()
        );
    }
    text
}

fn read_with_fallbacks(content: &str, delimiter: u8) -> PolarsResult<DataFrame> {
    let (content, skipped) = drop_overlong_records(content, delimiter);
    if skipped > 0 {
        warn!("Skipped {} lines with more fields than the header", skipped);
    }

    read_delimited(content.clone(), delimiter, Some(INFER_SCHEMA_ROWS))
        .or_else(|e| {
            debug!("Parsing with sampled schema failed: {}", e);
            // A value past the sampled rows may not fit the inferred type.
            read_delimited(content.clone(), delimiter, None)
        })
        .or_else(|e| {
            debug!("Standard parsing failed: {}", e);
            // Retry on content with doubled quotes collapsed and blank lines dropped.
            read_delimited(clean_content(&content), delimiter, None)
        })
}

fn read_delimited(
    content: String,
    delimiter: u8,
    infer_schema_rows: Option<usize>,
) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_infer_schema_length(infer_schema_rows)
        .with_has_header(true)
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(delimiter)
                .with_quote_char(Some(b'"'))
                .with_truncate_ragged_lines(true),
        )
        .into_reader_with_file_handle(Cursor::new(content))
        .finish()
}

/// Most frequent candidate delimiter in the first non-empty line, ignoring
/// quoted text. Defaults to `,`.
pub fn sniff_delimiter(content: &str) -> u8 {
    let Some(header) = content.lines().find(|line| !line.trim().is_empty()) else {
        return b',';
    };

    let mut counts = [0usize; CANDIDATE_DELIMITERS.len()];
    let mut in_quotes = false;
    for byte in header.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if !in_quotes
            && let Some(i) = CANDIDATE_DELIMITERS.iter().position(|d| *d == byte)
        {
            counts[i] += 1;
        }
    }

    // First maximum wins, so ties go to the earlier candidate.
    let best = (1..counts.len()).fold(0, |best, i| {
        if counts[i] > counts[best] { i } else { best }
    });
    CANDIDATE_DELIMITERS[best]
}

/// Records of delimited text, each with its line ending. Newlines inside
/// quotes do not end a record.
fn split_records(content: &str) -> Vec<&str> {
    let mut records = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;

    for (i, byte) in content.bytes().enumerate() {
        match byte {
            b'"' => in_quotes = !in_quotes,
            b'\n' if !in_quotes => {
                records.push(&content[start..=i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < content.len() {
        records.push(&content[start..]);
    }
    records
}

fn field_count(record: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    1 + record
        .bytes()
        .filter(|byte| {
            if *byte == b'"' {
                in_quotes = !in_quotes;
                false
            } else {
                !in_quotes && *byte == delimiter
            }
        })
        .count()
}

/// Drop records with more fields than the header. Returns the kept text and
/// the number of records dropped.
fn drop_overlong_records(content: &str, delimiter: u8) -> (String, usize) {
    let records = split_records(content);
    let Some(header) = records.iter().find(|record| !record.trim().is_empty()) else {
        return (content.to_string(), 0);
    };
    let limit = field_count(header, delimiter);

    let mut dropped = 0;
    let kept: String = records
        .iter()
        .filter(|record| {
            let keep = field_count(record, delimiter) <= limit;
            if !keep {
                dropped += 1;
            }
            keep
        })
        .copied()
        .collect();
    (kept, dropped)
}

fn clean_content(content: &str) -> String {
    content
        .replace("\"\"\"", "\"")
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Read text columns holding no value at all as `Float64`.
fn empty_text_as_float(df: DataFrame) -> PolarsResult<DataFrame> {
    if df.height() == 0 {
        return Ok(df);
    }

    let columns = df
        .take_columns()
        .into_iter()
        .map(|column| {
            if column.dtype() == &DataType::String && column.null_count() == column.len() {
                debug!("Column '{}' has no values, reading it as numeric", column.name());
                column.cast(&DataType::Float64)
            } else {
                Ok(column)
            }
        })
        .collect::<PolarsResult<Vec<_>>>()?;
    DataFrame::new(columns)
}

// =============================================================================
// Workbooks
// =============================================================================

/// Read the first sheet of a workbook, using its first row as the header.
fn read_workbook(path: &Path) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet = match workbook.worksheet_range_at(0) {
        Some(sheet) => sheet?,
        None => {
            return Err(AnalysisError::UnsupportedFormat(format!(
                "Workbook has no sheets: {}",
                path.display()
            )));
        }
    };
    Ok(sheet_to_frame(&sheet)?)
}

fn sheet_to_frame(sheet: &Range<Data>) -> PolarsResult<DataFrame> {
    let mut rows = sheet.rows();
    let Some(header) = rows.next() else {
        return Ok(DataFrame::empty());
    };
    let body: Vec<&[Data]> = rows.collect();

    let columns = header_names(header)
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let cells: Vec<Option<&Data>> = body
                .iter()
                .map(|row| row.get(i).filter(|cell| !matches!(cell, Data::Empty)))
                .collect();
            cells_to_column(name, &cells)
        })
        .collect();
    DataFrame::new(columns)
}

/// Header cell text; blank cells become `Unnamed: {i}` and repeated names get
/// a `.{n}` suffix.
fn header_names(header: &[Data]) -> Vec<String> {
    let mut seen = HashSet::new();
    header
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let base = match cell {
                Data::Empty => format!("Unnamed: {}", i),
                other => other.to_string(),
            };
            let mut name = base.clone();
            let mut suffix = 1;
            while !seen.insert(name.clone()) {
                name = format!("{}.{}", base, suffix);
                suffix += 1;
            }
            name
        })
        .collect()
}

/// One typed column from sheet cells: integers, floats, booleans, or text as
/// the cells allow. A column without values is an empty float column.
fn cells_to_column(name: String, cells: &[Option<&Data>]) -> Column {
    let values = || cells.iter().flatten();

    if values().all(|cell| matches!(cell, Data::Int(_))) && values().next().is_some() {
        let ints: Vec<Option<i64>> = cells
            .iter()
            .map(|cell| match cell {
                Some(Data::Int(v)) => Some(*v),
                _ => None,
            })
            .collect();
        Column::new(name.into(), ints)
    } else if values().all(|cell| matches!(cell, Data::Int(_) | Data::Float(_))) {
        let floats: Vec<Option<f64>> = cells
            .iter()
            .map(|cell| match cell {
                Some(Data::Int(v)) => Some(*v as f64),
                Some(Data::Float(v)) => Some(*v),
                _ => None,
            })
            .collect();
        Column::new(name.into(), floats)
    } else if values().all(|cell| matches!(cell, Data::Bool(_))) {
        let flags: Vec<Option<bool>> = cells
            .iter()
            .map(|cell| match cell {
                Some(Data::Bool(v)) => Some(*v),
                _ => None,
            })
            .collect();
        Column::new(name.into(), flags)
    } else {
        let text: Vec<Option<String>> = cells
            .iter()
            .map(|cell| cell.map(|c| c.to_string()))
            .collect();
        Column::new(name.into(), text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("a,b,c\n1,2,3"), b',');
        assert_eq!(sniff_delimiter("a;b;c\n1;2;3"), b';');
        assert_eq!(sniff_delimiter("a\tb\tc\n1\t2\t3"), b'\t');
        assert_eq!(sniff_delimiter("a|b\n1|2"), b'|');
        assert_eq!(sniff_delimiter("single\n1"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn test_sniff_ignores_quoted_text() {
        assert_eq!(sniff_delimiter("\"last, first\";\"city, state\";age\n"), b';');
    }

    #[test]
    fn test_parse_semicolon_file() {
        let df = DatasetLoader::parse("name;score\nada;90\ngrace;85\n").unwrap();
        assert_eq!(df.width(), 2);
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("score").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_single_column_retries_with_semicolon() {
        let df = DatasetLoader::parse_with_delimiter("a;b\n1;2\n3;4\n", b'\t').unwrap();
        assert_eq!(df.width(), 2);
        assert_eq!(df.get_column_names_str(), vec!["a", "b"]);
    }

    #[test]
    fn test_single_column_file_stays_single() {
        let df = DatasetLoader::parse("value\n1\n2\n").unwrap();
        assert_eq!(df.width(), 1);
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_overlong_lines_are_skipped() {
        let df = DatasetLoader::parse("a,b\n1,2\n3,4,5\n6,7\n").unwrap();
        assert_eq!(df.width(), 2);
        assert_eq!(df.height(), 2);
        let a: Vec<Option<i64>> = df.column("a").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(a, vec![Some(1), Some(6)]);
    }

    #[test]
    fn test_quoted_delimiters_do_not_count_as_fields() {
        let (kept, dropped) =
            drop_overlong_records("name,city\n\"Doe, Jane\",\"Paris\nFrance\"\nx,y,z\n", b',');
        assert_eq!(dropped, 1);
        assert_eq!(kept, "name,city\n\"Doe, Jane\",\"Paris\nFrance\"\n");
    }

    #[test]
    fn test_late_text_value_widens_column_type() {
        let mut content = String::from("id,code\n");
        for i in 0..150 {
            content.push_str(&format!("{},{}\n", i, i * 3));
        }
        content.push_str("150,N/A-7\n");

        let df = DatasetLoader::parse(&content).unwrap();
        assert_eq!(df.height(), 151);
        assert_eq!(df.column("id").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("code").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_empty_text_column_is_read_as_numeric() {
        let df = DatasetLoader::parse("a,b,c\n1,,x\n2,,y\n").unwrap();
        assert_eq!(df.column("b").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("b").unwrap().null_count(), 2);
        assert_eq!(df.column("c").unwrap().dtype(), &DataType::String);

        let partition = crate::profiler::ColumnClassifier::classify(&df);
        assert_eq!(partition.numerical, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(partition.categorical, vec!["c".to_string()]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let path = Path::new("latin1.csv");
        let text = decode_text(b"city\nZ\xfcrich\n", path);
        assert!(matches!(text, Cow::Owned(_)));
        assert_eq!(text, "city\nZ\u{FFFD}rich\n");

        let valid = decode_text("city\nZürich\n".as_bytes(), path);
        assert!(matches!(valid, Cow::Borrowed(_)));
    }

    #[test]
    fn test_sheet_cells_become_typed_columns() {
        let mut sheet: Range<Data> = Range::new((0, 0), (3, 4));
        let header = ["id", "score", "flag", "label", ""];
        for (col, name) in header.iter().enumerate() {
            if !name.is_empty() {
                sheet.set_value((0, col as u32), Data::String(name.to_string()));
            }
        }
        for row in 1..4u32 {
            sheet.set_value((row, 0), Data::Int(i64::from(row)));
            sheet.set_value((row, 1), Data::Float(f64::from(row) * 1.5));
            sheet.set_value((row, 2), Data::Bool(row % 2 == 0));
            sheet.set_value((row, 3), Data::String(format!("r{}", row)));
        }
        sheet.set_value((2, 1), Data::Int(4));
        sheet.set_value((3, 3), Data::Float(9.5));

        let df = sheet_to_frame(&sheet).unwrap();
        assert_eq!(
            df.get_column_names_str(),
            vec!["id", "score", "flag", "label", "Unnamed: 4"]
        );
        assert_eq!(df.height(), 3);
        assert_eq!(df.column("id").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("score").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("flag").unwrap().dtype(), &DataType::Boolean);
        assert_eq!(df.column("label").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("Unnamed: 4").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("Unnamed: 4").unwrap().null_count(), 3);
    }

    #[test]
    fn test_repeated_header_names_get_suffixes() {
        let header = vec![
            Data::String("x".to_string()),
            Data::String("x".to_string()),
            Data::String("x".to_string()),
        ];
        assert_eq!(header_names(&header), vec!["x", "x.1", "x.2"]);
    }

    #[test]
    fn test_header_only_file_has_no_rows() {
        let df = DatasetLoader::parse("a,b,c\n").unwrap();
        assert_eq!(df.width(), 3);
        assert_eq!(df.height(), 0);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = DatasetLoader::load("report.pdf").unwrap_err();
        assert_eq!(err.to_string(), "Unsupported file format: report.pdf");
        assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = DatasetLoader::load("does/not/exist.csv").unwrap_err();
        assert!(matches!(err, AnalysisError::Io(_)));
    }

    #[test]
    fn test_missing_workbook_is_workbook_error() {
        let err = DatasetLoader::load("does/not/exist.xlsx").unwrap_err();
        assert_eq!(err.error_code(), "WORKBOOK_ERROR");
    }
}
