//! Cross-page selector validation
//!
//! Checks whether one selector holds up across several pages: how many
//! pages it matches on, whether it is unique everywhere it matches, and
//! which pages it misses.

use crate::config::CrawlConfig;
use crate::crawler::{check_url, unique_urls, RetryPolicy};
use crate::driver::{with_timeout, BrowserSession, Driver, SessionGuard, SessionOptions};
use crate::{ErrorDetail, ErrorKind, Result, ScoutError};
use futures::FutureExt;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Matches found on one successfully visited page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMatchCount {
    pub url: String,
    pub count: usize,
}

/// Aggregate result of validating one selector
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossPageValidationResult {
    pub selector: String,
    pub total_urls: usize,

    /// Pages where the selector matched at least once
    pub valid_urls: usize,

    /// True when every matching page had exactly one match
    pub unique_on_all_pages: bool,

    /// Mean match count over the valid pages
    pub average_match_count: f64,

    /// Visited pages with zero matches, reported only if some page matched
    pub inconsistent_pages: Vec<String>,

    pub match_counts: Vec<PageMatchCount>,

    /// Pages that could not be visited
    pub errors_by_url: BTreeMap<String, ErrorDetail>,
}

impl CrossPageValidationResult {
    fn empty(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            total_urls: 0,
            valid_urls: 0,
            unique_on_all_pages: false,
            average_match_count: 0.0,
            inconsistent_pages: Vec::new(),
            match_counts: Vec::new(),
            errors_by_url: BTreeMap::new(),
        }
    }

    /// Share of pages the selector matched on
    pub fn coverage(&self) -> f64 {
        if self.total_urls == 0 {
            0.0
        } else {
            self.valid_urls as f64 / self.total_urls as f64
        }
    }

    fn summarize(
        selector: &str,
        total_urls: usize,
        match_counts: Vec<PageMatchCount>,
        errors_by_url: BTreeMap<String, ErrorDetail>,
    ) -> Self {
        let matching: Vec<&PageMatchCount> = match_counts.iter().filter(|m| m.count > 0).collect();
        let valid_urls = matching.len();

        let average_match_count = if valid_urls == 0 {
            0.0
        } else {
            matching.iter().map(|m| m.count).sum::<usize>() as f64 / valid_urls as f64
        };

        let inconsistent_pages = if valid_urls == 0 {
            Vec::new()
        } else {
            match_counts
                .iter()
                .filter(|m| m.count == 0)
                .map(|m| m.url.clone())
                .collect()
        };

        Self {
            selector: selector.to_string(),
            total_urls,
            valid_urls,
            unique_on_all_pages: valid_urls > 0 && matching.iter().all(|m| m.count == 1),
            average_match_count,
            inconsistent_pages,
            match_counts,
            errors_by_url,
        }
    }
}

/// Validates selectors across pages using one driver session
pub struct CrossPageValidator {
    driver: Arc<dyn Driver>,
    options: SessionOptions,
    navigation_timeout: Duration,
    step_timeout: Duration,
    retry: RetryPolicy,
}

async fn count_on_page(
    session: &mut dyn BrowserSession,
    url: String,
    selector: String,
    navigation_timeout: Duration,
    step_timeout: Duration,
) -> Result<usize> {
    with_timeout(
        &format!("load {}", url),
        navigation_timeout,
        session.navigate(&url, navigation_timeout),
    )
    .await?;
    with_timeout(
        &format!("evaluate {}", selector),
        step_timeout,
        session.evaluate_selector(&selector),
    )
    .await
}

impl CrossPageValidator {
    pub fn new(driver: Arc<dyn Driver>, config: &CrawlConfig) -> Self {
        Self {
            driver,
            options: SessionOptions::from(&config.browser),
            navigation_timeout: config.browser.navigation_timeout(),
            step_timeout: config.browser.step_timeout(),
            retry: RetryPolicy::from_config(&config.retry),
        }
    }

    /// Visits each URL in order and counts selector matches
    ///
    /// Pages that cannot be visited, including URLs that are not absolute
    /// http(s), are recorded in `errors_by_url` and excluded from the
    /// statistics. Repeated URLs are visited once. An empty URL list yields
    /// an empty result without opening a session.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error if the driver rejects the selector as
    /// malformed, and the driver's error if no session can be opened.
    pub async fn validate_across_pages(
        &self,
        selector: &str,
        urls: &[String],
    ) -> Result<CrossPageValidationResult> {
        if urls.is_empty() {
            return Ok(CrossPageValidationResult::empty(selector));
        }
        let urls = unique_urls(urls);

        let mut guard = SessionGuard::acquire(
            self.driver.as_ref(),
            &self.options,
            format!("validate {}", selector),
        )
        .await?;

        let outcome = self.visit_all(guard.session(), selector, &urls).await;

        if let Err(e) = guard.release().await {
            tracing::warn!("Failed to close validation session: {}", e);
        }

        let (match_counts, errors_by_url) = outcome?;
        let result = CrossPageValidationResult::summarize(selector, urls.len(), match_counts, errors_by_url);

        tracing::info!(
            "Selector {} matched on {}/{} pages (unique everywhere: {})",
            selector,
            result.valid_urls,
            result.total_urls,
            result.unique_on_all_pages
        );
        Ok(result)
    }

    async fn visit_all(
        &self,
        session: &mut dyn BrowserSession,
        selector: &str,
        urls: &[String],
    ) -> Result<(Vec<PageMatchCount>, BTreeMap<String, ErrorDetail>)> {
        let mut match_counts = Vec::new();
        let mut errors_by_url = BTreeMap::new();

        for url in urls {
            if let Err(e) = check_url(url) {
                tracing::warn!("Skipping {} during validation: {}", url, e);
                errors_by_url.insert(url.clone(), ErrorDetail::from_error(&e, 0));
                continue;
            }

            let attempt = self
                .retry
                .execute_with(url, session, |s, _| {
                    count_on_page(
                        s,
                        url.clone(),
                        selector.to_string(),
                        self.navigation_timeout,
                        self.step_timeout,
                    )
                    .boxed()
                })
                .await;

            let attempts = attempt.attempts.len() as u32;
            match (attempt.result, attempt.error) {
                (Some(count), _) => {
                    tracing::debug!("{} matched {} times on {}", selector, count, url);
                    match_counts.push(PageMatchCount {
                        url: url.clone(),
                        count,
                    });
                }
                (None, Some(e)) if e.kind() == ErrorKind::Validation => {
                    return Err(e);
                }
                (None, Some(e)) => {
                    tracing::warn!("Skipping {} during validation: {}", url, e);
                    errors_by_url.insert(url.clone(), ErrorDetail::from_error(&e, attempts));
                }
                (None, None) => {
                    errors_by_url.insert(
                        url.clone(),
                        ErrorDetail::from_error(
                            &ScoutError::Browser("no result from driver".to_string()),
                            attempts,
                        ),
                    );
                }
            }
        }

        Ok((match_counts, errors_by_url))
    }
}
