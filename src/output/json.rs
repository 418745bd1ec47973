//! JSON export of crawl reports

use crate::crawler::CrawlReport;
use crate::output::traits::OutputResult;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Writes the full report as pretty-printed JSON
pub fn write_json_report(report: &CrawlReport, output_path: &Path) -> OutputResult<()> {
    let file = File::create(output_path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)?;
    Ok(())
}
