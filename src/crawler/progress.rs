//! Progress reporting for crawl jobs
//!
//! The orchestrator emits a [`ProgressEvent`] at job start, around
//! authentication, per URL, after element storage and at job end. Sink
//! failures are logged and never affect the crawl.

use crate::ErrorDetail;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

/// Stage of a crawl job an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPhase {
    JobStarted,
    Authenticating,
    Authenticated,
    UrlStarted,
    UrlCompleted,
    UrlFailed,
    ElementsStored,
    JobCompleted,
    Error,
}

impl ProgressPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JobStarted => "job_started",
            Self::Authenticating => "authenticating",
            Self::Authenticated => "authenticated",
            Self::UrlStarted => "url_started",
            Self::UrlCompleted => "url_completed",
            Self::UrlFailed => "url_failed",
            Self::ElementsStored => "elements_stored",
            Self::JobCompleted => "job_completed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ProgressPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub job_id: String,
    pub phase: ProgressPhase,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
}

impl ProgressEvent {
    pub fn new(job_id: impl Into<String>, phase: ProgressPhase, message: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            phase,
            message: message.into(),
            current: None,
            total: None,
            context: BTreeMap::new(),
        }
    }

    /// Sets the 1-based position within the job
    pub fn with_position(mut self, current: usize, total: usize) -> Self {
        self.current = Some(current);
        self.total = Some(total);
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Attaches the category and suggestions of a failure
    pub fn with_error(self, detail: &ErrorDetail) -> Self {
        self.with_context("category", detail.category.clone())
            .with_context("attempts", detail.attempts.to_string())
            .with_context("suggestions", detail.suggestions.join("; "))
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Progress channel closed")]
    Closed,

    #[error("Progress sink failed: {0}")]
    Failed(String),
}

/// Destination for progress events
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn emit(&self, event: ProgressEvent) -> Result<(), SinkError>;
}

/// Writes events to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl ProgressSink for TracingSink {
    async fn emit(&self, event: ProgressEvent) -> Result<(), SinkError> {
        let position = match (event.current, event.total) {
            (Some(current), Some(total)) => format!(" [{}/{}]", current, total),
            _ => String::new(),
        };

        match event.phase {
            ProgressPhase::Error | ProgressPhase::UrlFailed => tracing::warn!(
                "{} {}{}: {}",
                event.job_id,
                event.phase,
                position,
                event.message
            ),
            _ => tracing::info!(
                "{} {}{}: {}",
                event.job_id,
                event.phase,
                position,
                event.message
            ),
        }
        Ok(())
    }
}

/// Forwards events over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ProgressSink for ChannelSink {
    async fn emit(&self, event: ProgressEvent) -> Result<(), SinkError> {
        self.tx.send(event).map_err(|_| SinkError::Closed)
    }
}
