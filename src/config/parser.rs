use crate::config::types::CrawlConfig;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(CrawlConfig)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use selector_scout::config::load_config;
///
/// let config = load_config(Path::new("scout.toml")).unwrap();
/// println!("Navigation timeout: {}ms", config.browser.navigation_timeout_ms);
/// ```
pub fn load_config(path: &Path) -> Result<CrawlConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<CrawlConfig, ConfigError> {
    let config: CrawlConfig = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Hex-encoded SHA-256 of configuration text
///
/// Stored with every crawl run so results trace back to the exact settings
/// that produced them.
pub fn hash_config(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Hashes a configuration file without parsing it
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    Ok(hash_config(&std::fs::read_to_string(path)?))
}

/// Loads a configuration and the hash of the exact text it was parsed from
pub fn load_config_with_hash(path: &Path) -> Result<(CrawlConfig, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, hash_config(&content)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r##"
[browser]
headless = false
args = ["--no-sandbox"]
navigation-timeout-ms = 15000
step-timeout-ms = 5000

[retry]
max-retries = 3
retry-delays-ms = [1000, 2000]
retryable = ["network_error", "timeout_error"]

[auth]
login-path-tokens = ["/login"]
authenticated-marker = "#logout"

[output]
database-path = "./elements.db"
report-path = "./report.md"
"##;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert!(!config.browser.headless);
        assert_eq!(config.browser.navigation_timeout_ms, 15000);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(
            config.retry.retryable,
            vec![ErrorKind::Network, ErrorKind::Timeout]
        );
        assert_eq!(config.auth.authenticated_marker.as_deref(), Some("#logout"));
        assert!(config.output.json_path.is_none());
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = parse_config(
            r#"
[output]
database-path = "./elements.db"
report-path = "./report.md"
"#,
        )
        .unwrap();

        assert!(config.browser.headless);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.retry_delays_ms, vec![3000, 8000]);
        assert_eq!(config.retry.retryable, ErrorKind::default_retryable());
        assert!(config.auth.login_path_tokens.contains(&"/login".to_string()));
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/scout.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[retry]
max-retries = 2
retry-delays-ms = []

[output]
database-path = "./elements.db"
report-path = "./report.md"
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_hash_tracks_content() {
        let file = create_temp_config("[output]\ndatabase-path = \"a.db\"\nreport-path = \"r.md\"\n");

        let (_, loaded_hash) = load_config_with_hash(file.path()).unwrap();
        let file_hash = compute_config_hash(file.path()).unwrap();
        assert_eq!(loaded_hash, file_hash);
        assert_eq!(file_hash.len(), 64);

        assert_ne!(hash_config("retry = 1"), hash_config("retry = 2"));
    }
}
