//! Markdown report generation
//!
//! This module generates human-readable markdown reports of crawl results,
//! including quality statistics, the best selectors found, and failures.

use crate::crawler::CrawlReport;
use crate::output::stats::compute_statistics;
use crate::output::traits::OutputResult;
use crate::quality::{CrossPageValidationResult, QualityBand, ScoredElement, SelectorStrategy};
use crate::ErrorDetail;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const ELEMENT_TABLE_LIMIT: usize = 50;

/// Writes a markdown report for a crawl
///
/// # Arguments
///
/// * `report` - The crawl report
/// * `output_path` - Path where the markdown file should be written
pub fn generate_markdown_report(report: &CrawlReport, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_report(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Escapes characters that would break a table cell
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Formats a crawl report as markdown
pub fn format_markdown_report(report: &CrawlReport) -> String {
    let mut md = String::new();

    md.push_str("# Selector-Scout Crawl Report\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Job ID**: {}\n", report.job_id));
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", report.finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {:.2} seconds\n",
        report.duration_ms() as f64 / 1000.0
    ));
    md.push_str(&format!(
        "- **Authenticated**: {}\n",
        if report.authentication_used { "yes" } else { "no" }
    ));
    md.push_str(&format!(
        "- **URLs**: {} of {} succeeded\n\n",
        report.successful_urls, report.total_urls
    ));

    if let Some(detail) = &report.job_error {
        md.push_str("## Job Failed\n\n");
        md.push_str(&format!("**{}**: {}\n\n", detail.category, detail.message));
        for suggestion in &detail.suggestions {
            md.push_str(&format!("- {}\n", suggestion));
        }
        md.push('\n');
    }

    if let Some(detail) = &report.auth_error {
        md.push_str("## Authentication\n\n");
        md.push_str(&format!(
            "Login failed, public pages were crawled instead: {}\n\n",
            detail.message
        ));
        for suggestion in &detail.suggestions {
            md.push_str(&format!("- {}\n", suggestion));
        }
        md.push('\n');
    }

    // Quality statistics
    let stats = compute_statistics(&report.elements);
    md.push_str("## Quality Breakdown\n\n");
    md.push_str("| Band | Elements |\n");
    md.push_str("|------|----------|\n");
    for band in QualityBand::all() {
        md.push_str(&format!(
            "| {} | {} |\n",
            band.label(),
            stats.by_band.get(band.label()).copied().unwrap_or(0)
        ));
    }
    md.push('\n');

    md.push_str("| Strategy | Elements |\n");
    md.push_str("|----------|----------|\n");
    for strategy in SelectorStrategy::all() {
        md.push_str(&format!(
            "| {} | {} |\n",
            strategy.label(),
            stats.by_strategy.get(strategy.label()).copied().unwrap_or(0)
        ));
    }
    md.push('\n');
    if let Some(avg) = stats.average_quality {
        md.push_str(&format!("Average quality: {:.2}\n\n", avg));
    }

    md.push_str(&format!(
        "- **Duplicates removed**: {}\n",
        report.duplicates_removed
    ));
    let rejected: usize = report.rejected_selectors.values().sum();
    md.push_str(&format!("- **Rejected selectors**: {}\n", rejected));
    if report.stored > 0 || report.duplicates_skipped > 0 {
        md.push_str(&format!(
            "- **Stored**: {} new, {} already known\n",
            report.stored, report.duplicates_skipped
        ));
    }
    md.push('\n');

    // Best selectors
    if !report.elements.is_empty() {
        let mut ranked: Vec<&ScoredElement> = report.elements.iter().collect();
        ranked.sort_by(|a, b| b.overall_quality().total_cmp(&a.overall_quality()));

        md.push_str(&format!(
            "## Top {} Selectors\n\n",
            ranked.len().min(ELEMENT_TABLE_LIMIT)
        ));
        md.push_str("| Selector | Tag | Quality | Band | State | Page |\n");
        md.push_str("|----------|-----|---------|------|-------|------|\n");
        for element in ranked.iter().take(ELEMENT_TABLE_LIMIT) {
            md.push_str(&format!(
                "| `{}` | {} | {:.2} | {} | {} | {} |\n",
                cell(element.selector()),
                element.element.tag_name,
                element.overall_quality(),
                element.quality_band(),
                element.discovery_state,
                cell(&element.page_url)
            ));
        }
        if ranked.len() > ELEMENT_TABLE_LIMIT {
            md.push_str(&format!(
                "\n... and {} more\n",
                ranked.len() - ELEMENT_TABLE_LIMIT
            ));
        }
        md.push('\n');
    }

    // Failures
    if !report.errors_by_url.is_empty() {
        md.push_str("## Failed URLs\n\n");
        md.push_str("| URL | Category | Attempts | Message |\n");
        md.push_str("|-----|----------|----------|---------|\n");
        for (url, detail) in &report.errors_by_url {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                cell(url),
                detail.category,
                detail.attempts,
                cell(&detail.message)
            ));
        }
        md.push('\n');

        // One suggestion list per distinct category
        let mut categories: Vec<&ErrorDetail> = Vec::new();
        for detail in report.errors_by_url.values() {
            if !categories.iter().any(|d| d.kind == detail.kind) {
                categories.push(detail);
            }
        }
        md.push_str("### Suggestions\n\n");
        for detail in categories {
            md.push_str(&format!("**{}**\n\n", detail.category));
            for suggestion in &detail.suggestions {
                md.push_str(&format!("- {}\n", suggestion));
            }
            md.push('\n');
        }
    }

    md
}

/// Formats a cross-page validation result as markdown
pub fn format_validation_result(result: &CrossPageValidationResult) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Validation of `{}`\n\n", result.selector));
    md.push_str(&format!(
        "- **Matched on**: {} of {} pages\n",
        result.valid_urls, result.total_urls
    ));
    md.push_str(&format!(
        "- **Unique on every page**: {}\n",
        if result.unique_on_all_pages { "yes" } else { "no" }
    ));
    md.push_str(&format!(
        "- **Average matches**: {:.2}\n\n",
        result.average_match_count
    ));

    if !result.match_counts.is_empty() {
        md.push_str("| URL | Matches |\n");
        md.push_str("|-----|---------|\n");
        for page in &result.match_counts {
            md.push_str(&format!("| {} | {} |\n", cell(&page.url), page.count));
        }
        md.push('\n');
    }

    if !result.inconsistent_pages.is_empty() {
        md.push_str("Missing on:\n\n");
        for url in &result.inconsistent_pages {
            md.push_str(&format!("- {}\n", url));
        }
        md.push('\n');
    }

    if !result.errors_by_url.is_empty() {
        md.push_str("Could not visit:\n\n");
        for (url, detail) in &result.errors_by_url {
            md.push_str(&format!("- {} ({}): {}\n", url, detail.category, detail.message));
        }
        md.push('\n');
    }

    md
}
