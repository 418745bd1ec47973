//! Storage traits and error types

use crate::quality::ScoredElement;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Counts returned by a store call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreOutcome {
    pub stored: usize,
    pub duplicates_skipped: usize,
}

impl StoreOutcome {
    pub fn merge(&mut self, other: StoreOutcome) {
        self.stored += other.stored;
        self.duplicates_skipped += other.duplicates_skipped;
    }
}

/// Persistence port for discovered elements
///
/// Implementations must be idempotent on (project, scope, selector,
/// discovery state): storing the same element twice keeps one row.
#[async_trait]
pub trait ElementStore: Send + Sync {
    async fn store_elements(
        &self,
        project_id: &str,
        scope_id: Option<&str>,
        elements: &[ScoredElement],
    ) -> StorageResult<StoreOutcome>;
}
