//! Report assembly and output encoding.
//!
//! [`Analyzer`] runs the analysis stages and assembles the dashboard
//! [`Report`](crate::types::Report); the [`codec`] module turns reports into
//! strict JSON.
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_insight::reporting::{Analyzer, OutputEncoding, encode_output};
//!
//! let output = Analyzer::builder().build()?.run(&dataframe);
//! println!("{}", encode_output(&output, OutputEncoding::Utf8, false)?);
//! ```

mod assembler;
pub mod codec;

pub use assembler::{Analyzer, AnalyzerBuilder};
pub use codec::{NumericValue, OutputEncoding, encode_output, encode_strict, sanitize_value};
