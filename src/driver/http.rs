//! Static HTML driver
//!
//! This module implements the driver port over plain HTTP:
//! - Building clients with a cookie store so a login persists across visits
//! - GET navigation with redirect following
//! - Form filling and submission on click
//! - Selector evaluation and candidate extraction with scraper
//! - Error classification into the crate's error taxonomy

use crate::driver::extract::extract_candidates_from_html;
use crate::driver::{BrowserSession, CandidateElement, Driver, DriverAction, SessionOptions};
use crate::{Result, ScoutError};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, Response};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::error::Error as _;
use std::time::Duration;
use url::Url;

const DEFAULT_USER_AGENT: &str = concat!("SelectorScout/", env!("CARGO_PKG_VERSION"));

/// Driver that opens [`HttpSession`]s
#[derive(Debug, Clone, Default)]
pub struct HttpDriver;

impl HttpDriver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Driver for HttpDriver {
    fn name(&self) -> &str {
        "http"
    }

    async fn open_session(&self, options: &SessionOptions) -> Result<Box<dyn BrowserSession>> {
        if !options.args.is_empty() {
            tracing::debug!(
                "Static driver ignores {} browser launch args",
                options.args.len()
            );
        }
        let client = build_http_client(options)
            .map_err(|e| ScoutError::Browser(format!("failed to build HTTP client: {}", e)))?;
        Ok(Box::new(HttpSession::new(client)))
    }
}

/// Builds an HTTP client with a cookie store and redirect following
///
/// # Example
///
/// ```
/// use selector_scout::config::BrowserConfig;
/// use selector_scout::driver::{build_http_client, SessionOptions};
///
/// let options = SessionOptions::from(&BrowserConfig::default());
/// let client = build_http_client(&options).unwrap();
/// ```
pub fn build_http_client(options: &SessionOptions) -> std::result::Result<Client, reqwest::Error> {
    let user_agent = options
        .user_agent
        .clone()
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

    Client::builder()
        .user_agent(user_agent)
        .cookie_store(true)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// A loaded document
#[derive(Debug, Clone)]
struct LoadedPage {
    url: Url,
    html: String,
}

/// What a click resolves to on a static page
#[derive(Debug)]
enum ClickTarget {
    Link(Url),
    Submit(FormSubmission),
    Inert,
}

#[derive(Debug)]
struct FormSubmission {
    post: bool,
    action: Url,
    fields: Vec<(String, String)>,
}

/// One cookie-carrying HTTP "browser context"
pub struct HttpSession {
    client: Client,
    page: Option<LoadedPage>,
    /// Values entered through fill/select/check, keyed by field name
    form_values: HashMap<String, String>,
    closed: bool,
}

impl HttpSession {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            page: None,
            form_values: HashMap::new(),
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(ScoutError::Browser("session is closed".to_string()));
        }
        Ok(())
    }

    fn loaded(&self) -> Result<&LoadedPage> {
        self.ensure_open()?;
        self.page
            .as_ref()
            .ok_or_else(|| ScoutError::Browser("no page loaded".to_string()))
    }

    fn resolve_url(&self, url: &str) -> Result<Url> {
        let parsed = match &self.page {
            Some(page) => page.url.join(url),
            None => Url::parse(url),
        };
        parsed.map_err(|e| ScoutError::Validation(format!("invalid URL '{}': {}", url, e)))
    }

    async fn load_response(&mut self, response: Response, timeout: Duration) -> Result<()> {
        let status = response.status();
        let final_url = response.url().clone();

        if !status.is_success() {
            return Err(ScoutError::Network {
                url: final_url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(final_url.as_str(), timeout, e))?;

        tracing::debug!("Loaded {} ({} bytes)", final_url, html.len());
        self.page = Some(LoadedPage {
            url: final_url,
            html,
        });
        self.form_values.clear();
        Ok(())
    }

    async fn get(&mut self, url: Url, timeout: Duration) -> Result<()> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(url.as_str(), timeout, e))?;
        self.load_response(response, timeout).await
    }

    async fn submit(&mut self, submission: FormSubmission, timeout: Duration) -> Result<()> {
        tracing::debug!(
            "Submitting form to {} ({} fields)",
            submission.action,
            submission.fields.len()
        );
        let request = if submission.post {
            self.client
                .post(submission.action.clone())
                .form(&submission.fields)
        } else {
            self.client
                .get(submission.action.clone())
                .query(&submission.fields)
        };

        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(submission.action.as_str(), timeout, e))?;
        self.load_response(response, timeout).await
    }

    fn record_value(&mut self, selector: &str, value: Option<&str>) -> Result<()> {
        let page = self.loaded()?;
        let (name, default_value) = with_first_match(&page.html, selector, |el| {
            (
                el.value().attr("name").map(str::to_string),
                el.value().attr("value").unwrap_or("on").to_string(),
            )
        })?;

        match name {
            Some(name) => {
                let value = value.map(str::to_string).unwrap_or(default_value);
                self.form_values.insert(name, value);
            }
            None => tracing::debug!("Element {} has no name; value not submitted", selector),
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for HttpSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        self.ensure_open()?;
        let target = self.resolve_url(url)?;
        self.get(target, timeout).await
    }

    async fn perform_action(&mut self, action: &DriverAction, timeout: Duration) -> Result<()> {
        match action {
            DriverAction::Fill { selector, value } | DriverAction::Select { selector, value } => {
                self.record_value(selector, Some(value))
            }
            DriverAction::Check { selector } => self.record_value(selector, None),
            DriverAction::WaitForSelector { selector } => {
                let count = count_matches(&self.loaded()?.html, selector)?;
                if count == 0 {
                    // A static document never changes, so waiting longer cannot help
                    return Err(ScoutError::Timeout {
                        operation: format!("wait for {}", selector),
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
                Ok(())
            }
            DriverAction::Click { selector } => {
                let target = {
                    let page = self.loaded()?;
                    click_target(page, selector, &self.form_values)?
                };
                match target {
                    ClickTarget::Link(url) => self.get(url, timeout).await,
                    ClickTarget::Submit(submission) => self.submit(submission, timeout).await,
                    ClickTarget::Inert => {
                        tracing::debug!("Click on {} has no static effect", selector);
                        Ok(())
                    }
                }
            }
        }
    }

    async fn evaluate_selector(&mut self, selector: &str) -> Result<usize> {
        count_matches(&self.loaded()?.html, selector)
    }

    async fn extract_candidates(&mut self) -> Result<Vec<CandidateElement>> {
        Ok(extract_candidates_from_html(&self.loaded()?.html))
    }

    fn current_url(&self) -> Option<String> {
        self.page.as_ref().map(|p| p.url.to_string())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        Err(ScoutError::Browser(
            "screenshots are not available from the static HTTP driver".to_string(),
        ))
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.page = None;
        self.form_values.clear();
        Ok(())
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| ScoutError::Validation(format!("invalid selector '{}': {:?}", selector, e)))
}

fn count_matches(html: &str, selector: &str) -> Result<usize> {
    let parsed = parse_selector(selector)?;
    let document = Html::parse_document(html);
    let count = document.select(&parsed).count();
    Ok(count)
}

fn with_first_match<T>(html: &str, selector: &str, f: impl FnOnce(ElementRef) -> T) -> Result<T> {
    let parsed = parse_selector(selector)?;
    let document = Html::parse_document(html);
    let el = document
        .select(&parsed)
        .next()
        .ok_or_else(|| ScoutError::SelectorNotFound {
            selector: selector.to_string(),
        })?;
    Ok(f(el))
}

fn click_target(
    page: &LoadedPage,
    selector: &str,
    values: &HashMap<String, String>,
) -> Result<ClickTarget> {
    let parsed = parse_selector(selector)?;
    let document = Html::parse_document(&page.html);
    let el = document
        .select(&parsed)
        .next()
        .ok_or_else(|| ScoutError::SelectorNotFound {
            selector: selector.to_string(),
        })?;

    if el.value().name() == "a" {
        if let Some(url) = el.value().attr("href").and_then(|h| page.url.join(h).ok()) {
            return Ok(ClickTarget::Link(url));
        }
    }

    if is_submit_control(&el) {
        let form = el
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|a| a.value().name() == "form");
        if let Some(form) = form {
            return Ok(ClickTarget::Submit(build_submission(page, form, &el, values)));
        }
    }

    Ok(ClickTarget::Inert)
}

fn is_submit_control(el: &ElementRef) -> bool {
    let kind = el.value().attr("type").map(|t| t.to_ascii_lowercase());
    match el.value().name() {
        "button" => matches!(kind.as_deref(), None | Some("submit")),
        "input" => matches!(kind.as_deref(), Some("submit") | Some("image")),
        _ => false,
    }
}

fn build_submission(
    page: &LoadedPage,
    form: ElementRef,
    submitter: &ElementRef,
    values: &HashMap<String, String>,
) -> FormSubmission {
    let post = form
        .value()
        .attr("method")
        .map(|m| m.eq_ignore_ascii_case("post"))
        .unwrap_or(false);
    let action = form
        .value()
        .attr("action")
        .filter(|a| !a.is_empty())
        .and_then(|a| page.url.join(a).ok())
        .unwrap_or_else(|| page.url.clone());

    let mut fields = Vec::new();
    if let Ok(controls) = Selector::parse("input, select, textarea") {
        for control in form.select(&controls) {
            if let Some(field) = field_value(&control, values) {
                fields.push(field);
            }
        }
    }

    if let Some(name) = submitter.value().attr("name") {
        let value = submitter.value().attr("value").unwrap_or("");
        fields.push((name.to_string(), value.to_string()));
    }

    FormSubmission {
        post,
        action,
        fields,
    }
}

fn field_value(control: &ElementRef, values: &HashMap<String, String>) -> Option<(String, String)> {
    let element = control.value();
    if element.attr("disabled").is_some() {
        return None;
    }
    let name = element.attr("name")?;
    let entered = values.get(name).cloned();

    match element.name() {
        "input" => {
            let kind = element.attr("type").unwrap_or("text").to_ascii_lowercase();
            match kind.as_str() {
                "submit" | "button" | "image" | "reset" | "file" => None,
                "checkbox" | "radio" => {
                    let own = element.attr("value").unwrap_or("on");
                    let selected = match &entered {
                        Some(v) => v == own,
                        None => element.attr("checked").is_some(),
                    };
                    selected.then(|| (name.to_string(), own.to_string()))
                }
                _ => Some((
                    name.to_string(),
                    entered.unwrap_or_else(|| element.attr("value").unwrap_or("").to_string()),
                )),
            }
        }
        "select" => {
            let value = entered.or_else(|| default_option(control))?;
            Some((name.to_string(), value))
        }
        "textarea" => Some((
            name.to_string(),
            entered.unwrap_or_else(|| control.text().collect()),
        )),
        _ => None,
    }
}

fn default_option(select: &ElementRef) -> Option<String> {
    let options = Selector::parse("option").ok()?;
    let all: Vec<ElementRef> = select.select(&options).collect();
    let chosen = all
        .iter()
        .find(|o| o.value().attr("selected").is_some())
        .or_else(|| all.first())?;
    Some(
        chosen
            .value()
            .attr("value")
            .map(str::to_string)
            .unwrap_or_else(|| chosen.text().collect::<String>().trim().to_string()),
    )
}

/// Maps a reqwest failure onto the error taxonomy
fn classify_reqwest_error(url: &str, timeout: Duration, error: reqwest::Error) -> ScoutError {
    if error.is_timeout() {
        return ScoutError::Timeout {
            operation: format!("load {}", url),
            timeout_ms: timeout.as_millis() as u64,
        };
    }

    let chain = error_chain(&error);
    let lowered = chain.to_ascii_lowercase();
    if lowered.contains("certificate") || lowered.contains("tls") || lowered.contains("ssl") {
        return ScoutError::Ssl {
            url: url.to_string(),
            message: chain,
        };
    }

    ScoutError::Network {
        url: url.to_string(),
        message: chain,
    }
}

fn error_chain(error: &reqwest::Error) -> String {
    let mut parts = vec![error.to_string()];
    let mut source = error.source();
    while let Some(inner) = source {
        parts.push(inner.to_string());
        source = inner.source();
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn page(html: &str) -> LoadedPage {
        LoadedPage {
            url: Url::parse("https://example.com/login").unwrap(),
            html: html.to_string(),
        }
    }

    const LOGIN_FORM: &str = r#"
        <form action="/session" method="post">
            <input type="hidden" name="csrf" value="tok">
            <input id="username" name="user">
            <input id="password" name="pass" type="password">
            <input type="checkbox" name="remember" value="yes">
            <select name="tenant"><option value="a">A</option><option value="b" selected>B</option></select>
            <button id="submit">Sign in</button>
        </form>
        <a id="help" href="/help">Help</a>
        <span id="inert">Text</span>
    "#;

    #[test]
    fn test_count_matches() {
        assert_eq!(count_matches(LOGIN_FORM, "input").unwrap(), 4);
        assert_eq!(count_matches(LOGIN_FORM, "#missing").unwrap(), 0);
    }

    #[test]
    fn test_invalid_selector_is_validation_error() {
        let err = count_matches(LOGIN_FORM, "button[[").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_click_submit_builds_post_with_values() {
        let mut values = HashMap::new();
        values.insert("user".to_string(), "alice".to_string());
        values.insert("pass".to_string(), "secret".to_string());

        let target = click_target(&page(LOGIN_FORM), "#submit", &values).unwrap();
        let ClickTarget::Submit(submission) = target else {
            panic!("expected a form submission");
        };

        assert!(submission.post);
        assert_eq!(submission.action.as_str(), "https://example.com/session");
        assert!(submission.fields.contains(&("csrf".to_string(), "tok".to_string())));
        assert!(submission.fields.contains(&("user".to_string(), "alice".to_string())));
        assert!(submission.fields.contains(&("pass".to_string(), "secret".to_string())));
        assert!(submission.fields.contains(&("tenant".to_string(), "b".to_string())));
        assert!(!submission.fields.iter().any(|(k, _)| k == "remember"));
    }

    #[test]
    fn test_checked_box_is_submitted() {
        let mut values = HashMap::new();
        values.insert("remember".to_string(), "yes".to_string());
        let target = click_target(&page(LOGIN_FORM), "#submit", &values).unwrap();
        let ClickTarget::Submit(submission) = target else {
            panic!("expected a form submission");
        };
        assert!(submission.fields.contains(&("remember".to_string(), "yes".to_string())));
    }

    #[test]
    fn test_click_link_and_inert() {
        let values = HashMap::new();
        match click_target(&page(LOGIN_FORM), "#help", &values).unwrap() {
            ClickTarget::Link(url) => assert_eq!(url.as_str(), "https://example.com/help"),
            other => panic!("unexpected target {:?}", other),
        }
        assert!(matches!(
            click_target(&page(LOGIN_FORM), "#inert", &values).unwrap(),
            ClickTarget::Inert
        ));
    }

    #[test]
    fn test_click_missing_element() {
        let err = click_target(&page(LOGIN_FORM), "#nope", &HashMap::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SelectorNotFound);
    }

    #[tokio::test]
    async fn test_actions_require_loaded_page() {
        let client = build_http_client(&SessionOptions {
            headless: true,
            args: vec![],
            user_agent: None,
        })
        .unwrap();
        let mut session = HttpSession::new(client);
        let err = session.evaluate_selector("body").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Browser);
        assert!(session.current_url().is_none());
    }
}
