//! Crawl orchestration
//!
//! Runs a [`CrawlJob`] end to end:
//! 1. Authenticate once if the job carries a login flow
//! 2. Visit every URL in order, each visit under the retry policy
//! 3. Score candidates, drop zero-match selectors, deduplicate
//! 4. Store each URL's elements when a store is attached
//! 5. Return a [`CrawlReport`]
//!
//! An authenticated crawl reuses one session for every URL. If the login
//! flow fails, the job falls back to an unauthenticated crawl with a fresh
//! session per URL. Every session is released on every exit path.

use crate::auth::{AuthFlow, AuthFlowExecutor};
use crate::config::CrawlConfig;
use crate::crawler::job::{check_url, CrawlJob, CrawlReport};
use crate::crawler::progress::{ProgressEvent, ProgressPhase, ProgressSink, TracingSink};
use crate::crawler::retry::{AttemptOutput, RetryPolicy};
use crate::driver::{with_timeout, BrowserSession, Driver, SessionGuard, SessionOptions};
use crate::quality::{Deduplicator, PageContext, ScoredElement, SelectorQualityScorer};
use crate::state::DiscoveryState;
use crate::storage::ElementStore;
use crate::{ErrorDetail, ErrorKind, Result, ScoutError};
use chrono::Utc;
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;

/// Elements produced by one page visit
#[derive(Debug)]
struct PageVisit {
    elements: Vec<ScoredElement>,
    rejected: usize,
}

impl AttemptOutput for PageVisit {
    fn element_count(&self) -> Option<usize> {
        Some(self.elements.len())
    }
}

/// Everything a page visit needs, owned so each attempt can move it
#[derive(Debug, Clone)]
struct VisitContext {
    scorer: SelectorQualityScorer,
    navigation_timeout: Duration,
    step_timeout: Duration,
    discovery: DiscoveryState,
}

/// Mutable state accumulated while a job runs
struct JobRun<'j> {
    job: &'j CrawlJob,
    report: CrawlReport,
    dedupe: Deduplicator,
}

/// Loads one page and scores its candidates
async fn visit_page(
    session: &mut dyn BrowserSession,
    url: String,
    ctx: VisitContext,
) -> Result<PageVisit> {
    with_timeout(
        &format!("load {}", url),
        ctx.navigation_timeout,
        session.navigate(&url, ctx.navigation_timeout),
    )
    .await?;

    let candidates = with_timeout(
        "extract candidates",
        ctx.step_timeout,
        session.extract_candidates(),
    )
    .await?;

    let mut elements = Vec::with_capacity(candidates.len());
    let mut rejected = 0;

    for candidate in candidates {
        let matches = match with_timeout(
            &format!("evaluate {}", candidate.selector),
            ctx.step_timeout,
            session.evaluate_selector(&candidate.selector),
        )
        .await
        {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Validation => {
                tracing::debug!("Rejected malformed selector {}: {}", candidate.selector, e);
                rejected += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        let page = PageContext {
            match_count_on_page: matches,
        };
        match ctx.scorer.score(&candidate, &page) {
            Ok(metrics) => {
                let state = candidate.discovery_hint.unwrap_or(ctx.discovery);
                elements.push(ScoredElement::new(candidate, metrics, state, url.clone()));
            }
            Err(e) => {
                tracing::debug!("Rejected {}: {}", candidate.selector, e);
                rejected += 1;
            }
        }
    }

    tracing::debug!(
        "{}: {} scored, {} rejected",
        url,
        elements.len(),
        rejected
    );
    Ok(PageVisit { elements, rejected })
}

/// Coordinates authentication, page visits, scoring and storage for a job
pub struct CrawlOrchestrator {
    driver: Arc<dyn Driver>,
    options: SessionOptions,
    retry: RetryPolicy,
    auth: AuthFlowExecutor,
    scorer: SelectorQualityScorer,
    navigation_timeout: Duration,
    step_timeout: Duration,
    sink: Arc<dyn ProgressSink>,
    store: Option<Arc<dyn ElementStore>>,
}

impl CrawlOrchestrator {
    /// Creates an orchestrator that reports progress to the tracing log
    pub fn new(driver: Arc<dyn Driver>, config: &CrawlConfig) -> Self {
        Self {
            driver,
            options: SessionOptions::from(&config.browser),
            retry: RetryPolicy::from_config(&config.retry),
            auth: AuthFlowExecutor::from_config(config),
            scorer: SelectorQualityScorer::new(),
            navigation_timeout: config.browser.navigation_timeout(),
            step_timeout: config.browser.step_timeout(),
            sink: Arc::new(TracingSink),
            store: None,
        }
    }

    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Stores each URL's elements as it completes
    ///
    /// Only jobs with a project id are stored.
    pub fn with_store(mut self, store: Arc<dyn ElementStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Runs a crawl job to completion
    ///
    /// Never fails as a whole: per-URL failures land in `errors_by_url`,
    /// authentication failures in `auth_error`, and a job that could not
    /// open any session gets a `job_error`.
    pub async fn run(&self, job: &CrawlJob) -> CrawlReport {
        let unique = job.with_unique_urls();
        let job = &*unique;
        let mut run = JobRun {
            job,
            report: CrawlReport::new(job),
            dedupe: Deduplicator::new(),
        };
        let total = job.urls.len();

        self.emit(
            ProgressEvent::new(&job.id, ProgressPhase::JobStarted, format!("Crawling {} URLs", total))
                .with_position(0, total),
        )
        .await;

        if total > 0 {
            match &job.auth_flow {
                Some(flow) => {
                    if let Err(detail) = self.crawl_authenticated(flow, &mut run).await {
                        self.emit(
                            ProgressEvent::new(
                                &job.id,
                                ProgressPhase::Error,
                                format!(
                                    "Authentication failed, continuing without login: {}",
                                    detail.message
                                ),
                            )
                            .with_error(&detail),
                        )
                        .await;
                        run.report.auth_error = Some(detail);
                        self.crawl_unauthenticated(&mut run).await;
                    }
                }
                None => self.crawl_unauthenticated(&mut run).await,
            }
        }

        let mut report = run.report;
        report.finished_at = Utc::now();

        match &report.job_error {
            Some(detail) => {
                self.emit(
                    ProgressEvent::new(&job.id, ProgressPhase::Error, detail.message.clone())
                        .with_error(detail),
                )
                .await
            }
            None => {
                self.emit(
                    ProgressEvent::new(
                        &job.id,
                        ProgressPhase::JobCompleted,
                        format!(
                            "Crawled {}/{} URLs, {} elements",
                            report.successful_urls,
                            report.total_urls,
                            report.elements.len()
                        ),
                    )
                    .with_position(total, total),
                )
                .await
            }
        }

        report
    }

    /// Logs in once, then visits every URL in the same session
    ///
    /// Returns the failure detail if authentication did not succeed; no URL
    /// has been visited in that case.
    async fn crawl_authenticated(
        &self,
        flow: &AuthFlow,
        run: &mut JobRun<'_>,
    ) -> std::result::Result<(), ErrorDetail> {
        let job = run.job;
        flow.validate().map_err(|e| ErrorDetail::from_error(&e, 0))?;

        self.emit(ProgressEvent::new(
            &job.id,
            ProgressPhase::Authenticating,
            format!("Running auth flow '{}'", flow.id),
        ))
        .await;

        let mut guard = SessionGuard::acquire(
            self.driver.as_ref(),
            &self.options,
            format!("{} (authenticated)", job.id),
        )
        .await
        .map_err(|e| ErrorDetail::from_error(&e, 1))?;

        let target = job.urls.first().map(String::as_str).unwrap_or(&flow.login_url);
        let auth = self.auth.execute(guard.session(), flow, target).await;

        if !auth.success {
            self.release(guard).await;
            let detail = auth.error_detail().unwrap_or_else(|| {
                ErrorDetail::new(ErrorKind::Authentication, "authentication did not complete", 1)
            });
            return Err(detail);
        }

        run.report.authentication_used = true;
        self.emit(
            ProgressEvent::new(
                &job.id,
                ProgressPhase::Authenticated,
                format!("Authenticated with flow '{}'", flow.id),
            )
            .with_context("finalUrl", auth.final_url.unwrap_or_default()),
        )
        .await;

        for (index, url) in job.urls.iter().enumerate() {
            self.crawl_url(guard.session(), url, index, DiscoveryState::AfterLogin, run)
                .await;
        }

        self.release(guard).await;
        Ok(())
    }

    /// Visits every URL in its own session
    async fn crawl_unauthenticated(&self, run: &mut JobRun<'_>) {
        let job = run.job;
        let mut session_failures = 0;

        for (index, url) in job.urls.iter().enumerate() {
            let mut guard =
                match SessionGuard::acquire(self.driver.as_ref(), &self.options, url.clone()).await {
                    Ok(guard) => guard,
                    Err(e) => {
                        session_failures += 1;
                        let detail = ErrorDetail::from_error(&e, 1);
                        self.fail_url(run, url, index, detail).await;
                        continue;
                    }
                };

            self.crawl_url(guard.session(), url, index, DiscoveryState::Static, run)
                .await;
            self.release(guard).await;
        }

        if !job.urls.is_empty() && session_failures == job.urls.len() {
            run.report.job_error = Some(ErrorDetail::new(
                ErrorKind::Browser,
                format!("Could not open a browser session for any of {} URLs", session_failures),
                session_failures as u32,
            ));
        }
    }

    /// Visits one URL under the retry policy and records the outcome
    async fn crawl_url(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
        index: usize,
        discovery: DiscoveryState,
        run: &mut JobRun<'_>,
    ) {
        let job = run.job;
        let total = job.urls.len();

        self.emit(
            ProgressEvent::new(&job.id, ProgressPhase::UrlStarted, url)
                .with_position(index + 1, total),
        )
        .await;

        if let Err(e) = check_url(url) {
            self.fail_url(run, url, index, ErrorDetail::from_error(&e, 0))
                .await;
            return;
        }

        let ctx = VisitContext {
            scorer: self.scorer,
            navigation_timeout: self.navigation_timeout,
            step_timeout: self.step_timeout,
            discovery,
        };

        let outcome = self
            .retry
            .execute_with(url, session, |s, _| {
                visit_page(s, url.to_string(), ctx.clone()).boxed()
            })
            .await;

        let detail = outcome.error_detail();
        let recommendations = outcome.recommendations();
        run.report
            .attempts_by_url
            .insert(url.to_string(), outcome.attempts);

        let visit = match (outcome.result, detail) {
            (Some(visit), _) => visit,
            (None, Some(detail)) => {
                for advice in &recommendations {
                    tracing::info!("{}: {}", url, advice);
                }
                self.fail_url(run, url, index, detail).await;
                return;
            }
            (None, None) => {
                let detail = ErrorDetail::new(ErrorKind::Browser, "page visit produced no result", 0);
                self.fail_url(run, url, index, detail).await;
                return;
            }
        };

        run.report.successful_urls += 1;
        if visit.rejected > 0 {
            run.report
                .rejected_selectors
                .insert(url.to_string(), visit.rejected);
        }

        let (fresh, dropped) = run.dedupe.filter(visit.elements);
        run.report.duplicates_removed += dropped;

        self.emit(
            ProgressEvent::new(
                &job.id,
                ProgressPhase::UrlCompleted,
                format!("{}: {} new elements", url, fresh.len()),
            )
            .with_position(index + 1, total)
            .with_context("rejected", visit.rejected.to_string()),
        )
        .await;

        self.store_url_elements(run, url, &fresh).await;
        run.report.elements.extend(fresh);
    }

    async fn store_url_elements(&self, run: &mut JobRun<'_>, url: &str, elements: &[ScoredElement]) {
        let job = run.job;
        let (Some(store), Some(project)) = (&self.store, &job.project_id) else {
            return;
        };
        if elements.is_empty() {
            return;
        }

        match store
            .store_elements(project, job.scope_id.as_deref(), elements)
            .await
        {
            Ok(outcome) => {
                run.report.stored += outcome.stored;
                run.report.duplicates_skipped += outcome.duplicates_skipped;
                self.emit(
                    ProgressEvent::new(
                        &job.id,
                        ProgressPhase::ElementsStored,
                        format!(
                            "{}: stored {}, skipped {} duplicates",
                            url, outcome.stored, outcome.duplicates_skipped
                        ),
                    )
                    .with_context("url", url),
                )
                .await;
            }
            Err(e) => {
                let error = ScoutError::from(e);
                tracing::error!("Failed to store elements for {}: {}", url, error);
                self.emit(
                    ProgressEvent::new(&job.id, ProgressPhase::Error, error.to_string())
                        .with_error(&ErrorDetail::from_error(&error, 1))
                        .with_context("url", url),
                )
                .await;
            }
        }
    }

    async fn fail_url(&self, run: &mut JobRun<'_>, url: &str, index: usize, detail: ErrorDetail) {
        self.emit(
            ProgressEvent::new(&run.job.id, ProgressPhase::UrlFailed, detail.message.clone())
                .with_position(index + 1, run.job.urls.len())
                .with_context("url", url)
                .with_error(&detail),
        )
        .await;
        run.report.errors_by_url.insert(url.to_string(), detail);
    }

    async fn release(&self, guard: SessionGuard) {
        let label = guard.label().to_string();
        if let Err(e) = guard.release().await {
            tracing::warn!("Failed to close session for {}: {}", label, e);
        }
    }

    async fn emit(&self, event: ProgressEvent) {
        if let Err(e) = self.sink.emit(event).await {
            tracing::warn!("Dropped progress event: {}", e);
        }
    }
}
