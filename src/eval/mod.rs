//! Comparison orchestration and reporting.
//!
//! - [`session::CompareSession`]: indexes, matches and measures two trees
//! - [`session::CompareConfig`]: configuration for a session
//! - [`report`]: rows, reports and run summaries
//! - [`table`]: fixed-width text rendering

pub mod report;
pub mod session;
pub mod table;

pub use report::{ComparisonReport, ReportRow, RowOutcome, RunSummary, write_json};
pub use session::{CompareConfig, CompareConfigBuilder, CompareSession};
pub use table::render_report;
