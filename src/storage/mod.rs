//! Storage module for persisting discovered elements
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Idempotent element storage keyed by project, scope, selector and state
//! - Run history with the configuration hash each run used

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteElementStore;
pub use traits::{ElementStore, StorageError, StorageResult, StoreOutcome};

use crate::state::DiscoveryState;
use std::path::Path;

/// Initializes or opens an element store
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteElementStore)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_store(path: &Path) -> StorageResult<SqliteElementStore> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    SqliteElementStore::new(path)
}

/// An element as read back from the database
#[derive(Debug, Clone, PartialEq)]
pub struct StoredElement {
    pub selector: String,
    pub discovery_state: DiscoveryState,
    pub tag_name: String,
    pub page_url: String,
    pub strategy: String,
    pub overall_quality: f64,
    pub quality_band: String,
    pub discovered_at: String,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub job_id: String,
    pub project_id: Option<String>,
    pub started_at: String,
    pub finished_at: String,
    pub config_hash: String,
    pub total_urls: usize,
    pub successful_urls: usize,
    pub elements_found: usize,
    pub authentication_used: bool,
    pub status: RunStatus,
}

/// Status of a finished crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every URL succeeded
    Completed,
    /// Some URLs failed
    Partial,
    /// The job could not run
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "partial" => Some(Self::Partial),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_roundtrip() {
        for status in &[RunStatus::Completed, RunStatus::Partial, RunStatus::Failed] {
            let db_str = status.to_db_string();
            let parsed = RunStatus::from_db_string(db_str);
            assert_eq!(Some(*status), parsed);
        }
    }

    #[test]
    fn test_run_status_invalid() {
        assert_eq!(RunStatus::from_db_string("invalid"), None);
    }

    #[test]
    fn test_open_store_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("scout.db");
        let store = open_store(&path).unwrap();
        assert_eq!(store.count_elements(None).unwrap(), 0);
        assert!(path.exists());
    }
}
