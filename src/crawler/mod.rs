//! Crawler module for authenticated element discovery
//!
//! This module contains the core crawling logic, including:
//! - Crawl jobs and the reports they produce
//! - Bounded retry with backoff and attempt history
//! - Progress events and sinks
//! - Overall crawl orchestration

mod job;
mod orchestrator;
mod progress;
mod retry;

pub use job::{check_url, AttemptOutcome, CrawlAttempt, CrawlJob, CrawlReport};
pub(crate) use job::unique_urls;
pub use orchestrator::CrawlOrchestrator;
pub use progress::{ChannelSink, ProgressEvent, ProgressPhase, ProgressSink, SinkError, TracingSink};
pub use retry::{AttemptOutput, RetryPolicy, RetryResult};

use crate::config::CrawlConfig;
use crate::driver::Driver;
use std::sync::Arc;

/// Runs a crawl job with default progress reporting
///
/// This is the main entry point for a one-off crawl. It will:
/// 1. Authenticate if the job carries a login flow
/// 2. Visit each URL under the retry policy
/// 3. Score, deduplicate and collect elements
///
/// # Arguments
///
/// * `driver` - The browser driver to open sessions with
/// * `config` - The crawler configuration
/// * `job` - URLs and optional auth flow
pub async fn crawl(driver: Arc<dyn Driver>, config: &CrawlConfig, job: &CrawlJob) -> CrawlReport {
    CrawlOrchestrator::new(driver, config).run(job).await
}
