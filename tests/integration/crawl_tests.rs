//! Orchestrator tests against the scripted driver

use crate::common::{button, test_config, PageScript, ScriptedDriver};
use selector_scout::auth::parse_auth_flow;
use selector_scout::crawler::{ChannelSink, CrawlJob, CrawlOrchestrator, ProgressPhase};
use selector_scout::quality::CrossPageValidator;
use selector_scout::state::DiscoveryState;
use selector_scout::storage::{ElementStore, SqliteElementStore};
use selector_scout::ErrorKind;
use std::sync::Arc;

const A: &str = "https://app.test/a";
const B: &str = "https://app.test/b";
const C: &str = "https://app.test/c";
const LOGIN: &str = "https://app.test/login";

fn flow(login_url: &str) -> selector_scout::AuthFlow {
    parse_auth_flow(&format!(
        r##"
id = "app"
login-url = "{}"

[credentials]
username = "alice"
password = "s3cret"

[[steps]]
type = "type"
selector = "#username"
value = "{{username}}"

[[steps]]
type = "type"
selector = "#password"
value = "{{password}}"

[[steps]]
type = "click"
selector = "#submit"
"##,
        login_url
    ))
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_one_unreachable_url_among_three() {
    let driver = Arc::new(ScriptedDriver::new(vec![
        (A, PageScript::Page(vec![(button("#save"), 1)])),
        (B, PageScript::Unreachable),
        (C, PageScript::Page(vec![(button("#cancel"), 1)])),
    ]));
    let orchestrator = CrawlOrchestrator::new(driver.clone(), &test_config(2));
    let job = CrawlJob::new(vec![A.to_string(), B.to_string(), C.to_string()]);

    let report = orchestrator.run(&job).await;

    assert_eq!(report.total_urls, 3);
    assert_eq!(report.successful_urls, 2);
    assert!(report.job_error.is_none());
    assert!(!report.authentication_used);

    let failure = &report.errors_by_url[B];
    assert_eq!(failure.kind, ErrorKind::Network);
    assert_eq!(failure.category, "network_error");
    assert_eq!(failure.attempts, 3);
    assert!(!failure.suggestions.is_empty());
    assert_eq!(report.attempts_by_url[B].len(), 3);
    assert_eq!(report.attempts_by_url[A].len(), 1);

    assert_eq!(report.elements.len(), 2);
    assert!(report
        .elements
        .iter()
        .all(|e| e.discovery_state == DiscoveryState::Static));

    assert_eq!(driver.opened(), 3);
    assert_eq!(driver.closed(), driver.opened());
}

#[tokio::test]
async fn test_shared_submit_selector_is_kept_and_zero_match_rejected() {
    let driver = Arc::new(ScriptedDriver::new(vec![(
        A,
        PageScript::Page(vec![
            (
                button("button[type=submit]").with_attribute("type", "submit"),
                3,
            ),
            (button("#save"), 1),
            (button("#ghost"), 0),
        ]),
    )]));
    let orchestrator = CrawlOrchestrator::new(driver, &test_config(0));

    let report = orchestrator.run(&CrawlJob::new(vec![A.to_string()])).await;

    assert_eq!(report.successful_urls, 1);
    assert_eq!(report.elements.len(), 2);
    assert_eq!(report.rejected_selectors[A], 1);

    let submit = report
        .elements
        .iter()
        .find(|e| e.selector() == "button[type=submit]")
        .unwrap();
    assert!((submit.quality_metrics.uniqueness - 1.0 / 3.0).abs() < 1e-9);
    assert_eq!(submit.page_url, A);
    assert!(report.elements.iter().all(|e| e.selector() != "#ghost"));
}

#[tokio::test]
async fn test_repeated_url_is_crawled_once() {
    let driver = Arc::new(ScriptedDriver::new(vec![
        (A, PageScript::Page(vec![(button("#save"), 1)])),
        (B, PageScript::Page(vec![(button("#cancel"), 1)])),
    ]));
    let orchestrator = CrawlOrchestrator::new(driver.clone(), &test_config(0));
    let job = CrawlJob::new(vec![A.to_string(), B.to_string(), A.to_string()]);

    let report = orchestrator.run(&job).await;

    assert_eq!(report.total_urls, 2);
    assert_eq!(report.successful_urls, 2);
    assert_eq!(report.attempts_by_url[A].len(), 1);
    assert_eq!(report.total_attempts(), 2);
    assert_eq!(driver.opened(), 2);
}

#[tokio::test]
async fn test_duplicates_across_pages_keep_first() {
    let driver = Arc::new(ScriptedDriver::new(vec![
        (A, PageScript::Page(vec![(button("#nav"), 1), (button("#a-only"), 1)])),
        (B, PageScript::Page(vec![(button("#nav"), 1)])),
    ]));
    let orchestrator = CrawlOrchestrator::new(driver, &test_config(0));

    let report = orchestrator
        .run(&CrawlJob::new(vec![A.to_string(), B.to_string()]))
        .await;

    assert_eq!(report.elements.len(), 2);
    assert_eq!(report.duplicates_removed, 1);
    let nav = report.elements.iter().find(|e| e.selector() == "#nav").unwrap();
    assert_eq!(nav.page_url, A);
}

#[tokio::test]
async fn test_authenticated_crawl_reuses_one_session() {
    let driver = Arc::new(ScriptedDriver::new(vec![
        (LOGIN, PageScript::Page(vec![])),
        (A, PageScript::Page(vec![(button("#orders"), 1)])),
        (B, PageScript::Page(vec![(button("#settings"), 1)])),
    ]));
    let orchestrator = CrawlOrchestrator::new(driver.clone(), &test_config(0));
    let job = CrawlJob::new(vec![A.to_string(), B.to_string()]).with_auth_flow(flow(LOGIN));

    let report = orchestrator.run(&job).await;

    assert!(report.authentication_used);
    assert!(report.auth_error.is_none());
    assert_eq!(report.successful_urls, 2);
    assert!(report
        .elements
        .iter()
        .all(|e| e.discovery_state == DiscoveryState::AfterLogin));
    assert_eq!(driver.opened(), 1);
    assert_eq!(driver.closed(), 1);
}

#[tokio::test]
async fn test_auth_failure_falls_back_to_public_crawl() {
    let driver = Arc::new(ScriptedDriver::new(vec![
        (LOGIN, PageScript::Unreachable),
        (A, PageScript::Page(vec![(button("#public"), 1)])),
    ]));
    let orchestrator = CrawlOrchestrator::new(driver.clone(), &test_config(0));
    let job = CrawlJob::new(vec![A.to_string()]).with_auth_flow(flow(LOGIN));

    let report = orchestrator.run(&job).await;

    assert!(!report.authentication_used);
    let auth_error = report.auth_error.as_ref().unwrap();
    assert_eq!(auth_error.kind, ErrorKind::Authentication);
    assert!(auth_error.message.contains("login page"));

    assert_eq!(report.successful_urls, 1);
    assert_eq!(report.elements[0].discovery_state, DiscoveryState::Static);
    assert_eq!(driver.closed(), driver.opened());
}

#[tokio::test]
async fn test_no_session_at_all_sets_job_error() {
    let driver = Arc::new(ScriptedDriver::broken());
    let orchestrator = CrawlOrchestrator::new(driver, &test_config(0));

    let report = orchestrator
        .run(&CrawlJob::new(vec![A.to_string(), B.to_string()]))
        .await;

    assert_eq!(report.successful_urls, 0);
    assert_eq!(report.errors_by_url.len(), 2);
    let job_error = report.job_error.unwrap();
    assert_eq!(job_error.kind, ErrorKind::Browser);
}

#[tokio::test]
async fn test_invalid_url_is_validation_failure() {
    let driver = Arc::new(ScriptedDriver::new(vec![(
        A,
        PageScript::Page(vec![(button("#ok"), 1)]),
    )]));
    let orchestrator = CrawlOrchestrator::new(driver, &test_config(2));

    let report = orchestrator
        .run(&CrawlJob::new(vec!["not a url".to_string(), A.to_string()]))
        .await;

    assert_eq!(report.successful_urls, 1);
    assert_eq!(report.errors_by_url["not a url"].kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_empty_job_reports_nothing() {
    let driver = Arc::new(ScriptedDriver::new(vec![]));
    let orchestrator = CrawlOrchestrator::new(driver.clone(), &test_config(0));

    let report = orchestrator.run(&CrawlJob::new(vec![])).await;

    assert_eq!(report.total_urls, 0);
    assert_eq!(report.successful_urls, 0);
    assert!(report.job_error.is_none());
    assert_eq!(driver.opened(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_progress_events_cover_the_job() {
    let driver = Arc::new(ScriptedDriver::new(vec![
        (A, PageScript::Page(vec![(button("#save"), 1)])),
        (B, PageScript::Unreachable),
    ]));
    let (sink, mut rx) = ChannelSink::new();
    let orchestrator =
        CrawlOrchestrator::new(driver, &test_config(1)).with_progress_sink(Arc::new(sink));

    let job = CrawlJob::new(vec![A.to_string(), B.to_string()]).with_id("job-events");
    orchestrator.run(&job).await;
    drop(orchestrator);

    let mut phases = Vec::new();
    while let Ok(event) = rx.try_recv() {
        assert_eq!(event.job_id, "job-events");
        phases.push(event.phase);
    }

    assert_eq!(phases.first(), Some(&ProgressPhase::JobStarted));
    assert_eq!(phases.last(), Some(&ProgressPhase::JobCompleted));
    assert!(phases.contains(&ProgressPhase::UrlCompleted));
    assert!(phases.contains(&ProgressPhase::UrlFailed));
}

#[tokio::test]
async fn test_closed_progress_channel_does_not_fail_crawl() {
    let driver = Arc::new(ScriptedDriver::new(vec![(
        A,
        PageScript::Page(vec![(button("#save"), 1)]),
    )]));
    let (sink, rx) = ChannelSink::new();
    drop(rx);
    let orchestrator =
        CrawlOrchestrator::new(driver, &test_config(0)).with_progress_sink(Arc::new(sink));

    let report = orchestrator.run(&CrawlJob::new(vec![A.to_string()])).await;
    assert_eq!(report.successful_urls, 1);
}

#[tokio::test]
async fn test_store_counts_new_and_known_elements() {
    let driver = Arc::new(ScriptedDriver::new(vec![(
        A,
        PageScript::Page(vec![(button("#save"), 1), (button("#cancel"), 1)]),
    )]));
    let store = Arc::new(SqliteElementStore::new_in_memory().unwrap());
    let orchestrator = CrawlOrchestrator::new(driver, &test_config(0))
        .with_store(store.clone() as Arc<dyn ElementStore>);
    let job = CrawlJob::new(vec![A.to_string()]).with_project("shop", None);

    let first = orchestrator.run(&job).await;
    assert_eq!(first.stored, 2);
    assert_eq!(first.duplicates_skipped, 0);

    let second = orchestrator.run(&job).await;
    assert_eq!(second.stored, 0);
    assert_eq!(second.duplicates_skipped, 2);
    assert_eq!(store.count_elements(Some("shop")).unwrap(), 2);
}

#[tokio::test]
async fn test_cross_page_validation_with_no_urls() {
    let driver = Arc::new(ScriptedDriver::new(vec![]));
    let validator = CrossPageValidator::new(driver.clone(), &test_config(0));

    let result = validator.validate_across_pages("#anything", &[]).await.unwrap();

    assert_eq!(result.total_urls, 0);
    assert_eq!(result.valid_urls, 0);
    assert!(!result.unique_on_all_pages);
    assert_eq!(driver.opened(), 0);
}

#[tokio::test]
async fn test_cross_page_validation_records_unreachable_pages() {
    let driver = Arc::new(ScriptedDriver::new(vec![
        (A, PageScript::Page(vec![(button("#nav"), 1)])),
        (B, PageScript::Unreachable),
        (C, PageScript::Page(vec![])),
    ]));
    let validator = CrossPageValidator::new(driver.clone(), &test_config(0));
    let urls = vec![A.to_string(), B.to_string(), C.to_string()];

    let result = validator.validate_across_pages("#nav", &urls).await.unwrap();

    assert_eq!(result.total_urls, 3);
    assert_eq!(result.valid_urls, 1);
    assert!(result.unique_on_all_pages);
    assert_eq!(result.inconsistent_pages, vec![C.to_string()]);
    assert_eq!(result.errors_by_url[B].kind, ErrorKind::Network);
    assert_eq!(driver.closed(), 1);
}
