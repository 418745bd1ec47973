//! Integration tests for Selector-Scout
//!
//! `crawl_tests` drives the orchestrator through a scripted in-memory driver;
//! `http_tests` runs the real HTTP driver against wiremock servers.

mod common;
mod crawl_tests;
mod http_tests;
