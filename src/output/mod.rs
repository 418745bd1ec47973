//! Output module for crawl reports
//!
//! This module handles:
//! - Generating markdown reports of crawl results
//! - Exporting full reports as JSON
//! - Computing and printing quality statistics

mod json;
mod markdown;
pub mod stats;
mod traits;

pub use json::write_json_report;
pub use markdown::{format_markdown_report, format_validation_result, generate_markdown_report};
pub use stats::{compute_statistics, load_statistics, print_statistics, QualityStatistics};
pub use traits::{OutputError, OutputResult};

use crate::config::OutputConfig;
use crate::crawler::CrawlReport;
use std::path::Path;

/// Writes every configured report file for a crawl
///
/// # Arguments
///
/// * `report` - The finished crawl report
/// * `output` - Output paths from the configuration
pub fn write_reports(report: &CrawlReport, output: &OutputConfig) -> OutputResult<()> {
    generate_markdown_report(report, Path::new(&output.report_path))?;
    tracing::info!("Wrote markdown report to {}", output.report_path);

    if let Some(json_path) = &output.json_path {
        write_json_report(report, Path::new(json_path))?;
        tracing::info!("Wrote JSON report to {}", json_path);
    }

    Ok(())
}
