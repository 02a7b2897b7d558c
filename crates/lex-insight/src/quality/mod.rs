//! Data quality auditing.
//!
//! Scores a dataset from its missingness and duplicate rows.

mod auditor;

pub use auditor::QualityAuditor;
