//! End-to-end tests of the HTTP driver against wiremock servers

use crate::common::test_config;
use selector_scout::auth::parse_auth_flow;
use selector_scout::crawler::{CrawlJob, CrawlOrchestrator};
use selector_scout::driver::{Driver, HttpDriver};
use selector_scout::quality::CrossPageValidator;
use selector_scout::state::DiscoveryState;
use selector_scout::ErrorKind;
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LOGIN_PAGE: &str = r#"<html><body>
<form action="/session" method="post">
  <input type="hidden" name="csrf" value="t0k3n">
  <input id="username" name="username" type="text">
  <input id="password" name="password" type="password">
  <button id="submit" type="submit">Sign in</button>
</form>
</body></html>"#;

const DASHBOARD_PAGE: &str = r#"<html><body>
<nav id="main"><a href="/settings">Settings</a></nav>
<button data-testid="new-order">New order</button>
<button aria-label="Close banner">x</button>
</body></html>"#;

const SETTINGS_PAGE: &str = r#"<html><body>
<nav id="main"><a href="/dashboard">Dashboard</a></nav>
<input name="display-name" type="text">
</body></html>"#;

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

/// Login-walled app: pages need the session cookie set by POST /session
async fn start_app(password: &str) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(html(LOGIN_PAGE))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/session"))
        .and(body_string_contains("username=alice"))
        .and(body_string_contains(format!("password={}", password).as_str()))
        .and(body_string_contains("csrf=t0k3n"))
        .respond_with(
            ResponseTemplate::new(303)
                .insert_header("location", "/dashboard")
                .insert_header("set-cookie", "session=abc; Path=/"),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(html(LOGIN_PAGE))
        .with_priority(10)
        .mount(&server)
        .await;

    for (route, body) in [("/dashboard", DASHBOARD_PAGE), ("/settings", SETTINGS_PAGE)] {
        Mock::given(method("GET"))
            .and(path(route))
            .and(header("cookie", "session=abc"))
            .respond_with(html(body))
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/login"))
            .with_priority(10)
            .mount(&server)
            .await;
    }

    server
}

fn login_flow(base: &str) -> selector_scout::AuthFlow {
    parse_auth_flow(&format!(
        r##"
id = "mock-app"
login-url = "{base}/login"
authenticated-marker = "nav#main"

[credentials]
username = "alice"
password = "s3cret"

[[steps]]
type = "wait-for"
selector = "#username"

[[steps]]
type = "type"
selector = "#username"
value = "{{username}}"

[[steps]]
type = "type"
selector = "#password"
value = "{{password}}"

[[steps]]
type = "check"
selector = "#remember-me"
optional = true

[[steps]]
type = "click"
selector = "#submit"
"##
    ))
    .unwrap()
}

#[tokio::test]
async fn test_login_then_crawl_with_http_driver() {
    let server = start_app("s3cret").await;
    let base = server.uri();
    let driver: Arc<dyn Driver> = Arc::new(HttpDriver::new());
    let orchestrator = CrawlOrchestrator::new(driver, &test_config(0));

    let job = CrawlJob::new(vec![
        format!("{}/dashboard", base),
        format!("{}/settings", base),
    ])
    .with_auth_flow(login_flow(&base));

    let report = orchestrator.run(&job).await;

    assert!(report.auth_error.is_none(), "{:?}", report.auth_error);
    assert!(report.authentication_used);
    assert_eq!(report.successful_urls, 2);

    let order = report
        .elements
        .iter()
        .find(|e| e.selector() == "[data-testid=\"new-order\"]")
        .expect("test-id button discovered");
    assert_eq!(order.discovery_state, DiscoveryState::AfterLogin);
    assert_eq!(order.page_url, format!("{}/dashboard", base));
    assert_eq!(order.quality_metrics.uniqueness, 1.0);
    assert_eq!(order.quality_metrics.stability, 1.0);

    assert!(report
        .elements
        .iter()
        .any(|e| e.page_url.ends_with("/settings")));
}

#[tokio::test]
async fn test_unreachable_first_url_keeps_login() {
    let server = start_app("s3cret").await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let base = server.uri();
    let driver: Arc<dyn Driver> = Arc::new(HttpDriver::new());
    let orchestrator = CrawlOrchestrator::new(driver, &test_config(0));

    let broken = format!("{}/broken", base);
    let job = CrawlJob::new(vec![
        broken.clone(),
        format!("{}/dashboard", base),
        format!("{}/settings", base),
    ])
    .with_auth_flow(login_flow(&base));

    let report = orchestrator.run(&job).await;

    assert!(report.auth_error.is_none(), "{:?}", report.auth_error);
    assert!(report.authentication_used);
    assert_eq!(report.successful_urls, 2);
    assert_eq!(report.errors_by_url[broken.as_str()].kind, ErrorKind::Network);

    let dashboard: Vec<_> = report
        .elements
        .iter()
        .filter(|e| e.page_url.ends_with("/dashboard"))
        .collect();
    assert!(dashboard
        .iter()
        .any(|e| e.selector() == "[data-testid=\"new-order\"]"));
    assert!(dashboard
        .iter()
        .all(|e| e.discovery_state == DiscoveryState::AfterLogin));
}

#[tokio::test]
async fn test_wrong_password_falls_back_to_public_pages() {
    let server = start_app("a-different-password").await;
    let base = server.uri();
    let driver: Arc<dyn Driver> = Arc::new(HttpDriver::new());
    let orchestrator = CrawlOrchestrator::new(driver, &test_config(0));

    let job = CrawlJob::new(vec![format!("{}/dashboard", base)]).with_auth_flow(login_flow(&base));

    let report = orchestrator.run(&job).await;

    assert!(!report.authentication_used);
    let auth_error = report.auth_error.as_ref().expect("login must fail");
    assert_eq!(auth_error.category, "authentication_error");

    // The unauthenticated visit is redirected to the login form
    assert_eq!(report.successful_urls, 1);
    assert!(report
        .elements
        .iter()
        .all(|e| e.discovery_state == DiscoveryState::Static));
    assert!(report.elements.iter().any(|e| e.selector() == "#username"));
}

#[tokio::test]
async fn test_server_error_is_network_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let mut config = test_config(1);
    config.retry.retry_delays_ms = vec![10];
    let driver: Arc<dyn Driver> = Arc::new(HttpDriver::new());
    let orchestrator = CrawlOrchestrator::new(driver, &config);

    let url = format!("{}/broken", server.uri());
    let report = orchestrator.run(&CrawlJob::new(vec![url.clone()])).await;

    assert_eq!(report.successful_urls, 0);
    let failure = &report.errors_by_url[url.as_str()];
    assert_eq!(failure.kind, ErrorKind::Network);
    assert!(failure.message.contains("HTTP 500"));
    assert_eq!(failure.attempts, 2);
}

#[tokio::test]
async fn test_cross_page_validation_over_http() {
    let server = MockServer::start().await;
    let pages = [
        ("/one", r#"<nav id="main"></nav><p>one</p>"#),
        ("/two", r#"<nav id="main"></nav><p>two</p>"#),
        ("/three", r#"<p>no nav here</p>"#),
    ];
    for (route, body) in pages {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(html(body))
            .mount(&server)
            .await;
    }

    let driver: Arc<dyn Driver> = Arc::new(HttpDriver::new());
    let validator = CrossPageValidator::new(driver, &test_config(0));
    let urls: Vec<String> = ["/one", "/two", "/three"]
        .iter()
        .map(|p| format!("{}{}", server.uri(), p))
        .collect();

    let result = validator.validate_across_pages("nav#main", &urls).await.unwrap();

    assert_eq!(result.total_urls, 3);
    assert_eq!(result.valid_urls, 2);
    assert!(result.unique_on_all_pages);
    assert_eq!(result.average_match_count, 1.0);
    assert_eq!(result.inconsistent_pages, vec![urls[2].clone()]);

    let err = validator
        .validate_across_pages("nav[[", &urls)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_malformed_urls_do_not_stop_validation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/one"))
        .respond_with(html(r#"<nav id="main"></nav>"#))
        .expect(1)
        .mount(&server)
        .await;

    let driver: Arc<dyn Driver> = Arc::new(HttpDriver::new());
    let validator = CrossPageValidator::new(driver, &test_config(0));
    let one = format!("{}/one", server.uri());
    let urls = vec!["http://[bad".to_string(), one.clone(), "one".to_string()];

    let result = validator.validate_across_pages("nav#main", &urls).await.unwrap();

    assert_eq!(result.total_urls, 3);
    assert_eq!(result.valid_urls, 1);
    assert_eq!(result.match_counts.len(), 1);
    assert_eq!(result.match_counts[0].url, one);
    for bad in ["http://[bad", "one"] {
        let detail = &result.errors_by_url[bad];
        assert_eq!(detail.kind, ErrorKind::Validation);
        assert_eq!(detail.attempts, 0);
    }
}
