//! Configuration module for Selector-Scout
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! All retry, timeout and browser-launch settings live in one [`CrawlConfig`]
//! value that is passed explicitly into the orchestrator.
//!
//! # Example
//!
//! ```no_run
//! use selector_scout::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scout.toml")).unwrap();
//! println!("Max retries: {}", config.retry.max_retries);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{AuthConfig, BrowserConfig, CrawlConfig, OutputConfig, RetryConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, hash_config, load_config, load_config_with_hash, parse_config};
