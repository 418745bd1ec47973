//! Crawl job input and the report it produces

use crate::auth::AuthFlow;
use crate::quality::ScoredElement;
use crate::{ErrorDetail, ErrorKind, Result, ScoutError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use url::Url;

/// A unit of crawl work: URLs plus an optional login flow
#[derive(Debug, Clone)]
pub struct CrawlJob {
    pub id: String,
    pub urls: Vec<String>,
    pub auth_flow: Option<AuthFlow>,

    /// Project the discovered elements are stored under, if any
    pub project_id: Option<String>,

    /// Optional sub-scope within the project
    pub scope_id: Option<String>,
}

impl CrawlJob {
    /// Creates a job with a time-derived id
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            id: format!("job-{}", Utc::now().timestamp_millis()),
            urls,
            auth_flow: None,
            project_id: None,
            scope_id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_auth_flow(mut self, flow: AuthFlow) -> Self {
        self.auth_flow = Some(flow);
        self
    }

    pub fn with_project(mut self, project_id: impl Into<String>, scope_id: Option<String>) -> Self {
        self.project_id = Some(project_id.into());
        self.scope_id = scope_id;
        self
    }

    /// This job with repeated URLs dropped, first occurrence kept
    ///
    /// Reports are keyed by URL, so each URL is crawled once.
    pub fn with_unique_urls(&self) -> Cow<'_, CrawlJob> {
        match unique_urls(&self.urls) {
            Cow::Borrowed(_) => Cow::Borrowed(self),
            Cow::Owned(urls) => {
                tracing::debug!(
                    "Job {}: dropped {} repeated URLs",
                    self.id,
                    self.urls.len() - urls.len()
                );
                Cow::Owned(CrawlJob {
                    urls,
                    ..self.clone()
                })
            }
        }
    }
}

/// Removes repeated URLs while keeping order
pub(crate) fn unique_urls(urls: &[String]) -> Cow<'_, [String]> {
    let mut seen = HashSet::new();
    if urls.iter().all(|url| seen.insert(url.as_str())) {
        return Cow::Borrowed(urls);
    }
    let mut seen = HashSet::new();
    Cow::Owned(
        urls.iter()
            .filter(|url| seen.insert(url.as_str()))
            .cloned()
            .collect(),
    )
}

/// Rejects URLs that are not absolute http(s)
pub fn check_url(url: &str) -> Result<()> {
    let parsed =
        Url::parse(url).map_err(|e| ScoutError::Validation(format!("Invalid URL {}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ScoutError::Validation(format!(
            "Unsupported scheme '{}' in {}",
            other, url
        ))),
    }
}

/// Outcome of a single attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success {
        /// Elements produced by the attempt, when countable
        elements: Option<usize>,
    },
    Failure {
        kind: ErrorKind,
        message: String,
    },
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }
}

/// One recorded attempt at a URL
///
/// Attempts are appended to a history and never modified.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlAttempt {
    pub url: String,

    /// Zero-based attempt index
    pub attempt_number: u32,

    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub outcome: AttemptOutcome,
}

/// Aggregate result of a crawl job
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlReport {
    pub job_id: String,
    pub total_urls: usize,
    pub successful_urls: usize,

    /// Deduplicated elements in first-seen order
    pub elements: Vec<ScoredElement>,

    /// True only when the authenticated path was actually taken
    pub authentication_used: bool,

    pub errors_by_url: BTreeMap<String, ErrorDetail>,
    pub attempts_by_url: BTreeMap<String, Vec<CrawlAttempt>>,

    /// Candidates dropped per URL because their selector matched nothing
    pub rejected_selectors: BTreeMap<String, usize>,

    /// Why authentication failed before falling back to public pages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_error: Option<ErrorDetail>,

    /// Set when the job could not run at all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_error: Option<ErrorDetail>,

    /// Duplicate (selector, state) pairs dropped within this job
    pub duplicates_removed: usize,

    /// Rows written to the element store
    pub stored: usize,

    /// Rows the element store already held
    pub duplicates_skipped: usize,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlReport {
    /// Creates an empty report for a job
    pub fn new(job: &CrawlJob) -> Self {
        let now = Utc::now();
        Self {
            job_id: job.id.clone(),
            total_urls: job.urls.len(),
            successful_urls: 0,
            elements: Vec::new(),
            authentication_used: false,
            errors_by_url: BTreeMap::new(),
            attempts_by_url: BTreeMap::new(),
            rejected_selectors: BTreeMap::new(),
            auth_error: None,
            job_error: None,
            duplicates_removed: 0,
            stored: 0,
            duplicates_skipped: 0,
            started_at: now,
            finished_at: now,
        }
    }

    pub fn failed_urls(&self) -> usize {
        self.errors_by_url.len()
    }

    pub fn is_success(&self) -> bool {
        self.job_error.is_none()
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Total attempts across every URL
    pub fn total_attempts(&self) -> usize {
        self.attempts_by_url.values().map(|a| a.len()).sum()
    }
}
