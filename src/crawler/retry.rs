//! Bounded retry with backoff
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | Success | Stop, return result |
//! | Retryable kind, budget left | Sleep `retry_delays[attempt]`, retry |
//! | Retryable kind, budget spent | Stop, return failure |
//! | Non-retryable kind | Stop immediately |
//!
//! The last delay repeats when the delay list is shorter than the budget.
//! Every attempt is recorded, successful or not.

use crate::config::RetryConfig;
use crate::crawler::job::{AttemptOutcome, CrawlAttempt};
use crate::{ErrorDetail, ErrorKind, Result, ScoutError};
use chrono::Utc;
use futures::future::BoxFuture;
use std::collections::HashSet;
use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::time::Instant;

/// Lets the attempt history record how much a successful attempt produced
pub trait AttemptOutput {
    fn element_count(&self) -> Option<usize> {
        None
    }
}

impl AttemptOutput for () {}

impl AttemptOutput for usize {
    fn element_count(&self) -> Option<usize> {
        Some(*self)
    }
}

impl<T> AttemptOutput for Vec<T> {
    fn element_count(&self) -> Option<usize> {
        Some(self.len())
    }
}

/// Result of a retried operation
#[derive(Debug)]
pub struct RetryResult<T> {
    pub success: bool,
    pub result: Option<T>,

    /// Error from the final attempt when every attempt failed
    pub error: Option<ScoutError>,

    pub total_retries: u32,
    pub total_duration: Duration,

    /// Every attempt in chronological order
    pub attempts: Vec<CrawlAttempt>,
}

impl<T> RetryResult<T> {
    pub fn total_duration_ms(&self) -> u64 {
        self.total_duration.as_millis() as u64
    }

    /// Terminal error in contract form
    pub fn error_detail(&self) -> Option<ErrorDetail> {
        self.error
            .as_ref()
            .map(|e| ErrorDetail::from_error(e, self.attempts.len() as u32))
    }

    /// Advice derived from the pattern of failures
    ///
    /// Failures that all share one kind point at a systemic problem; mixed
    /// kinds point at transient trouble.
    pub fn recommendations(&self) -> Vec<String> {
        let kinds: Vec<ErrorKind> = self
            .attempts
            .iter()
            .filter_map(|a| a.outcome.error_kind())
            .collect();

        let Some(&last) = kinds.last() else {
            return Vec::new();
        };

        if self.success {
            return vec![format!(
                "Succeeded after {} retries; earlier failures were transient",
                self.total_retries
            )];
        }

        if kinds.len() == 1 && !last.can_retry() {
            return vec![format!(
                "{} is not retryable: fix the input rather than retrying",
                last
            )];
        }

        let mut distinct: Vec<ErrorKind> = kinds.clone();
        distinct.sort();
        distinct.dedup();

        if distinct.len() == 1 {
            let advice = match last {
                ErrorKind::Timeout => {
                    "Persistent timeout: investigate target availability".to_string()
                }
                ErrorKind::Network => {
                    "Persistent network failure: check that the host is up and reachable"
                        .to_string()
                }
                ErrorKind::Browser => {
                    "Persistent browser failure: check the driver installation and launch arguments"
                        .to_string()
                }
                ErrorKind::Ssl => {
                    "Persistent TLS failure: verify the site certificate".to_string()
                }
                other => format!("Persistent {} across {} attempts", other, kinds.len()),
            };
            vec![advice]
        } else {
            let names: Vec<&str> = distinct.iter().map(|k| k.category()).collect();
            vec![format!(
                "Mixed failures ({}) look transient: retry the crawl later",
                names.join(", ")
            )]
        }
    }
}

/// Bounded retry policy shared by every page visit of a job
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    retry_delays: Vec<Duration>,
    retryable: HashSet<ErrorKind>,
}

struct PendingAttempt {
    number: u32,
    started_at: chrono::DateTime<Utc>,
    clock: Instant,
}

/// Shared bookkeeping for both execute variants
struct Tracker<'p> {
    policy: &'p RetryPolicy,
    label: String,
    started: Instant,
    attempts: Vec<CrawlAttempt>,
}

impl<'p> Tracker<'p> {
    fn new(policy: &'p RetryPolicy, label: &str) -> Self {
        Self {
            policy,
            label: label.to_string(),
            started: Instant::now(),
            attempts: Vec::new(),
        }
    }

    fn begin(&self) -> PendingAttempt {
        PendingAttempt {
            number: self.attempts.len() as u32,
            started_at: Utc::now(),
            clock: Instant::now(),
        }
    }

    async fn finish<T: AttemptOutput>(
        &mut self,
        pending: PendingAttempt,
        outcome: Result<T>,
    ) -> ControlFlow<RetryResult<T>> {
        let duration_ms = pending.clock.elapsed().as_millis() as u64;

        match outcome {
            Ok(value) => {
                self.attempts.push(CrawlAttempt {
                    url: self.label.clone(),
                    attempt_number: pending.number,
                    started_at: pending.started_at,
                    duration_ms,
                    outcome: AttemptOutcome::Success {
                        elements: value.element_count(),
                    },
                });
                ControlFlow::Break(self.conclude(Some(value), None))
            }
            Err(error) => {
                let kind = error.kind();
                self.attempts.push(CrawlAttempt {
                    url: self.label.clone(),
                    attempt_number: pending.number,
                    started_at: pending.started_at,
                    duration_ms,
                    outcome: AttemptOutcome::Failure {
                        kind,
                        message: error.to_string(),
                    },
                });

                if !self.policy.should_retry(kind, pending.number) {
                    tracing::debug!(
                        "{}: giving up after attempt {} ({})",
                        self.label,
                        pending.number + 1,
                        kind
                    );
                    return ControlFlow::Break(self.conclude(None, Some(error)));
                }

                let delay = self.policy.delay_for(pending.number);
                tracing::warn!(
                    "{}: attempt {} failed ({}), retrying in {}ms",
                    self.label,
                    pending.number + 1,
                    error,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                ControlFlow::Continue(())
            }
        }
    }

    fn conclude<T>(&mut self, value: Option<T>, error: Option<ScoutError>) -> RetryResult<T> {
        let attempts = std::mem::take(&mut self.attempts);
        RetryResult {
            success: value.is_some(),
            result: value,
            error,
            total_retries: attempts.len().saturating_sub(1) as u32,
            total_duration: self.started.elapsed(),
            attempts,
        }
    }
}

impl RetryPolicy {
    /// Builds a policy; kinds that can never be retried are ignored
    pub fn new(
        max_retries: u32,
        retry_delays_ms: &[u64],
        retryable: impl IntoIterator<Item = ErrorKind>,
    ) -> Self {
        Self {
            max_retries,
            retry_delays: retry_delays_ms
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            retryable: retryable.into_iter().filter(|k| k.can_retry()).collect(),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            &config.retry_delays_ms,
            config.retryable.iter().copied(),
        )
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before the retry that follows attempt `attempt_number`
    pub fn delay_for(&self, attempt_number: u32) -> Duration {
        self.retry_delays
            .get(attempt_number as usize)
            .or(self.retry_delays.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    /// Returns true if a failure of `kind` on attempt `attempt_number` is retried
    pub fn should_retry(&self, kind: ErrorKind, attempt_number: u32) -> bool {
        self.retryable.contains(&kind) && attempt_number < self.max_retries
    }

    /// Runs `op` until it succeeds, fails terminally, or the budget is spent
    ///
    /// `op` receives the zero-based attempt number.
    ///
    /// # Example
    ///
    /// ```
    /// use selector_scout::crawler::RetryPolicy;
    /// use selector_scout::ErrorKind;
    ///
    /// # async fn example() {
    /// let policy = RetryPolicy::new(2, &[10, 20], ErrorKind::default_retryable());
    /// let result = policy.execute("ping", |_attempt| async { Ok(3usize) }).await;
    /// assert!(result.success);
    /// assert_eq!(result.attempts.len(), 1);
    /// # }
    /// ```
    pub async fn execute<T, F, Fut>(&self, label: &str, mut op: F) -> RetryResult<T>
    where
        T: AttemptOutput,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut tracker = Tracker::new(self, label);
        loop {
            let pending = tracker.begin();
            let outcome = op(pending.number).await;
            if let ControlFlow::Break(result) = tracker.finish(pending, outcome).await {
                return result;
            }
        }
    }

    /// Like [`execute`](Self::execute), lending `resource` to every attempt
    ///
    /// Used when each attempt needs mutable access to something the caller
    /// owns, such as a browser session.
    pub async fn execute_with<R, T, F>(&self, label: &str, resource: &mut R, mut op: F) -> RetryResult<T>
    where
        R: ?Sized,
        T: AttemptOutput,
        F: for<'a> FnMut(&'a mut R, u32) -> BoxFuture<'a, Result<T>>,
    {
        let mut tracker = Tracker::new(self, label);
        loop {
            let pending = tracker.begin();
            let outcome = op(&mut *resource, pending.number).await;
            if let ControlFlow::Break(result) = tracker.finish(pending, outcome).await {
                return result;
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
