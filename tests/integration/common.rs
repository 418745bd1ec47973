//! Scripted driver shared by the integration tests

use async_trait::async_trait;
use selector_scout::config::{CrawlConfig, OutputConfig};
use selector_scout::driver::{BrowserSession, CandidateElement, Driver, DriverAction, SessionOptions};
use selector_scout::{Result, ScoutError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a scripted URL does when visited
#[derive(Clone)]
pub enum PageScript {
    /// Loads and exposes candidates with their match counts
    Page(Vec<(CandidateElement, usize)>),
    /// Fails every navigation with a network error
    Unreachable,
}

#[derive(Default)]
pub struct Counters {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub navigations: AtomicUsize,
}

/// In-memory driver whose pages are a lookup table
pub struct ScriptedDriver {
    pages: Arc<HashMap<String, PageScript>>,
    pub counters: Arc<Counters>,
    fail_open: bool,
}

impl ScriptedDriver {
    pub fn new(pages: Vec<(&str, PageScript)>) -> Self {
        Self {
            pages: Arc::new(
                pages
                    .into_iter()
                    .map(|(url, script)| (url.to_string(), script))
                    .collect(),
            ),
            counters: Arc::new(Counters::default()),
            fail_open: false,
        }
    }

    /// A driver that can never open a session
    pub fn broken() -> Self {
        let mut driver = Self::new(Vec::new());
        driver.fail_open = true;
        driver
    }

    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Driver for ScriptedDriver {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn open_session(&self, _options: &SessionOptions) -> Result<Box<dyn BrowserSession>> {
        if self.fail_open {
            return Err(ScoutError::Browser("browser failed to launch".to_string()));
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            pages: self.pages.clone(),
            counters: self.counters.clone(),
            current: None,
            actions: Arc::new(Mutex::new(Vec::new())),
        }))
    }
}

pub struct ScriptedSession {
    pages: Arc<HashMap<String, PageScript>>,
    counters: Arc<Counters>,
    current: Option<String>,
    actions: Arc<Mutex<Vec<String>>>,
}

impl ScriptedSession {
    fn page(&self) -> Result<&Vec<(CandidateElement, usize)>> {
        let url = self
            .current
            .as_ref()
            .ok_or_else(|| ScoutError::Browser("no page loaded".to_string()))?;
        match self.pages.get(url) {
            Some(PageScript::Page(items)) => Ok(items),
            _ => Err(ScoutError::Browser(format!("nothing scripted for {}", url))),
        }
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<()> {
        self.counters.navigations.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(url) {
            Some(PageScript::Unreachable) => Err(ScoutError::Network {
                url: url.to_string(),
                message: "connection refused".to_string(),
            }),
            _ => {
                self.current = Some(url.to_string());
                Ok(())
            }
        }
    }

    async fn perform_action(&mut self, action: &DriverAction, _timeout: Duration) -> Result<()> {
        self.actions
            .lock()
            .map_err(|_| ScoutError::Browser("poisoned".to_string()))?
            .push(action.name().to_string());
        Ok(())
    }

    async fn evaluate_selector(&mut self, selector: &str) -> Result<usize> {
        let page = match self.page() {
            Ok(page) => page,
            Err(_) => return Ok(0),
        };
        Ok(page
            .iter()
            .find(|(candidate, _)| candidate.selector == selector)
            .map(|(_, count)| *count)
            .unwrap_or(0))
    }

    async fn extract_candidates(&mut self) -> Result<Vec<CandidateElement>> {
        Ok(self.page()?.iter().map(|(c, _)| c.clone()).collect())
    }

    fn current_url(&self) -> Option<String> {
        self.current.clone()
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn close(&mut self) -> Result<()> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn button(selector: &str) -> CandidateElement {
    CandidateElement::new(selector, "button").with_text("Go")
}

/// Default config with fast retries and throwaway output paths
pub fn test_config(max_retries: u32) -> CrawlConfig {
    let mut config = CrawlConfig::with_output(OutputConfig {
        database_path: "unused.db".to_string(),
        report_path: "unused.md".to_string(),
        json_path: None,
    });
    config.retry.max_retries = max_retries;
    config.retry.retry_delays_ms = vec![1000, 2000];
    config.browser.navigation_timeout_ms = 2000;
    config.browser.step_timeout_ms = 1000;
    config
}
