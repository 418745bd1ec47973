use crate::config::types::{AuthConfig, BrowserConfig, CrawlConfig, OutputConfig, RetryConfig};
use crate::ConfigError;

const MIN_TIMEOUT_MS: u64 = 100;
const MAX_RETRIES: u32 = 10;

/// Validates the entire configuration
pub fn validate(config: &CrawlConfig) -> Result<(), ConfigError> {
    validate_browser_config(&config.browser)?;
    validate_retry_config(&config.retry)?;
    validate_auth_config(&config.auth)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if config.navigation_timeout_ms < MIN_TIMEOUT_MS {
        return Err(ConfigError::Validation(format!(
            "navigation-timeout-ms must be >= {}ms, got {}ms",
            MIN_TIMEOUT_MS, config.navigation_timeout_ms
        )));
    }

    if config.step_timeout_ms < MIN_TIMEOUT_MS {
        return Err(ConfigError::Validation(format!(
            "step-timeout-ms must be >= {}ms, got {}ms",
            MIN_TIMEOUT_MS, config.step_timeout_ms
        )));
    }

    if config.args.iter().any(|arg| arg.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "browser args cannot contain empty entries".to_string(),
        ));
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_retries > MAX_RETRIES {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= {}, got {}",
            MAX_RETRIES, config.max_retries
        )));
    }

    if config.max_retries > 0 && config.retry_delays_ms.is_empty() {
        return Err(ConfigError::Validation(
            "retry-delays-ms must list at least one delay when max-retries > 0".to_string(),
        ));
    }

    // Structurally invalid input never self-resolves
    if let Some(kind) = config.retryable.iter().find(|k| !k.can_retry()) {
        return Err(ConfigError::Validation(format!(
            "'{}' errors cannot be retried",
            kind
        )));
    }

    Ok(())
}

fn validate_auth_config(config: &AuthConfig) -> Result<(), ConfigError> {
    if config.login_path_tokens.is_empty() {
        return Err(ConfigError::Validation(
            "login-path-tokens must contain at least one token".to_string(),
        ));
    }

    if config.login_path_tokens.iter().any(|t| t.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "login-path-tokens cannot contain empty tokens".to_string(),
        ));
    }

    if let Some(marker) = &config.authenticated_marker {
        if marker.trim().is_empty() {
            return Err(ConfigError::Validation(
                "authenticated-marker cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.report_path.is_empty() {
        return Err(ConfigError::Validation(
            "report-path cannot be empty".to_string(),
        ));
    }

    if matches!(&config.json_path, Some(p) if p.is_empty()) {
        return Err(ConfigError::Validation(
            "json-path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn valid_config() -> CrawlConfig {
        CrawlConfig::with_output(OutputConfig {
            database_path: "./elements.db".to_string(),
            report_path: "./report.md".to_string(),
            json_path: None,
        })
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_rejects_tiny_timeouts() {
        let mut config = valid_config();
        config.browser.navigation_timeout_ms = 10;
        assert!(validate(&config).is_err());

        let mut config = valid_config();
        config.browser.step_timeout_ms = 99;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_non_retryable_kinds() {
        let mut config = valid_config();
        config.retry.retryable = vec![ErrorKind::Timeout, ErrorKind::SelectorNotFound];
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("selector_not_found"));
    }

    #[test]
    fn test_zero_retries_needs_no_delays() {
        let mut config = valid_config();
        config.retry.max_retries = 0;
        config.retry.retry_delays_ms.clear();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_rejects_excessive_retries() {
        let mut config = valid_config();
        config.retry.max_retries = 11;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_empty_login_tokens() {
        let mut config = valid_config();
        config.auth.login_path_tokens.clear();
        assert!(validate(&config).is_err());

        let mut config = valid_config();
        config.auth.login_path_tokens = vec!["  ".to_string()];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_empty_output_paths() {
        let mut config = valid_config();
        config.output.report_path.clear();
        assert!(validate(&config).is_err());

        let mut config = valid_config();
        config.output.json_path = Some(String::new());
        assert!(validate(&config).is_err());
    }
}
