//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ElementStore trait.

use crate::crawler::CrawlReport;
use crate::quality::ScoredElement;
use crate::state::DiscoveryState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ElementStore, StorageError, StorageResult, StoreOutcome};
use crate::storage::{RunRecord, RunStatus, StoredElement};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite element store
///
/// The connection sits behind a mutex so the store can be shared across
/// tasks through an `Arc<dyn ElementStore>`.
pub struct SqliteElementStore {
    conn: Mutex<Connection>,
}

impl SqliteElementStore {
    /// Opens or creates a database file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("connection lock poisoned".to_string()))
    }

    /// Inserts elements, skipping rows that already exist
    pub fn insert_elements(
        &self,
        project_id: &str,
        scope_id: Option<&str>,
        elements: &[ScoredElement],
    ) -> StorageResult<StoreOutcome> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        let scope = scope_id.unwrap_or("");
        let mut outcome = StoreOutcome::default();

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO elements (
                    project_id, scope_id, selector, discovery_state, tag_name, text_content,
                    attributes, page_url, strategy, uniqueness, stability, specificity,
                    accessibility, overall_quality, quality_band, discovered_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            )?;

            for element in elements {
                let metrics = &element.quality_metrics;
                let attributes = serde_json::to_string(&element.element.attributes)?;
                let inserted = stmt.execute(params![
                    project_id,
                    scope,
                    element.selector(),
                    element.discovery_state.to_db_string(),
                    element.element.tag_name,
                    element.element.text_content,
                    attributes,
                    element.page_url,
                    element.strategy().label(),
                    metrics.uniqueness,
                    metrics.stability,
                    metrics.specificity,
                    metrics.accessibility,
                    element.overall_quality(),
                    element.quality_band().label(),
                    now,
                ])?;

                if inserted == 1 {
                    outcome.stored += 1;
                } else {
                    outcome.duplicates_skipped += 1;
                }
            }
        }

        tx.commit()?;
        Ok(outcome)
    }

    /// Records a finished crawl job
    pub fn record_run(
        &self,
        report: &CrawlReport,
        project_id: Option<&str>,
        config_hash: &str,
    ) -> StorageResult<i64> {
        let status = if report.job_error.is_some() {
            RunStatus::Failed
        } else if report.successful_urls < report.total_urls {
            RunStatus::Partial
        } else {
            RunStatus::Completed
        };

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO runs (
                job_id, project_id, started_at, finished_at, config_hash, total_urls,
                successful_urls, elements_found, authentication_used, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                report.job_id,
                project_id,
                report.started_at.to_rfc3339(),
                report.finished_at.to_rfc3339(),
                config_hash,
                report.total_urls as i64,
                report.successful_urls as i64,
                report.elements.len() as i64,
                report.authentication_used,
                status.to_db_string(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Gets the most recent run
    pub fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let conn = self.conn()?;
        let run = conn
            .query_row(
                "SELECT id, job_id, project_id, started_at, finished_at, config_hash,
                        total_urls, successful_urls, elements_found, authentication_used, status
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(RunRecord {
                        id: row.get(0)?,
                        job_id: row.get(1)?,
                        project_id: row.get(2)?,
                        started_at: row.get(3)?,
                        finished_at: row.get(4)?,
                        config_hash: row.get(5)?,
                        total_urls: row.get::<_, i64>(6)? as usize,
                        successful_urls: row.get::<_, i64>(7)? as usize,
                        elements_found: row.get::<_, i64>(8)? as usize,
                        authentication_used: row.get(9)?,
                        status: RunStatus::from_db_string(&row.get::<_, String>(10)?)
                            .unwrap_or(RunStatus::Failed),
                    })
                },
            )
            .optional()?;
        Ok(run)
    }

    /// Counts stored elements, optionally for one project
    pub fn count_elements(&self, project_id: Option<&str>) -> StorageResult<u64> {
        let conn = self.conn()?;
        let count: i64 = match project_id {
            Some(project) => conn.query_row(
                "SELECT COUNT(*) FROM elements WHERE project_id = ?1",
                params![project],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM elements", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    /// Loads stored elements for a project and scope, best first
    pub fn load_elements(
        &self,
        project_id: &str,
        scope_id: Option<&str>,
    ) -> StorageResult<Vec<StoredElement>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT selector, discovery_state, tag_name, page_url, strategy,
                    overall_quality, quality_band, discovered_at
             FROM elements
             WHERE project_id = ?1 AND scope_id = ?2
             ORDER BY overall_quality DESC, id ASC",
        )?;

        let rows = stmt.query_map(params![project_id, scope_id.unwrap_or("")], |row| {
            Ok(StoredElement {
                selector: row.get(0)?,
                discovery_state: DiscoveryState::from_db_string(&row.get::<_, String>(1)?)
                    .unwrap_or(DiscoveryState::Static),
                tag_name: row.get(2)?,
                page_url: row.get(3)?,
                strategy: row.get(4)?,
                overall_quality: row.get(5)?,
                quality_band: row.get(6)?,
                discovered_at: row.get(7)?,
            })
        })?;

        let mut elements = Vec::new();
        for row in rows {
            elements.push(row?);
        }
        Ok(elements)
    }

    /// Counts elements per quality band
    pub fn band_counts(&self, project_id: Option<&str>) -> StorageResult<BTreeMap<String, u64>> {
        self.grouped_counts("quality_band", project_id)
    }

    /// Counts elements per selector strategy
    pub fn strategy_counts(&self, project_id: Option<&str>) -> StorageResult<BTreeMap<String, u64>> {
        self.grouped_counts("strategy", project_id)
    }

    fn grouped_counts(
        &self,
        column: &'static str,
        project_id: Option<&str>,
    ) -> StorageResult<BTreeMap<String, u64>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {col}, COUNT(*) FROM elements WHERE (?1 IS NULL OR project_id = ?1) GROUP BY {col}",
            col = column
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![project_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let (key, count) = row?;
            counts.insert(key, count);
        }
        Ok(counts)
    }
}

#[async_trait]
impl ElementStore for SqliteElementStore {
    async fn store_elements(
        &self,
        project_id: &str,
        scope_id: Option<&str>,
        elements: &[ScoredElement],
    ) -> StorageResult<StoreOutcome> {
        self.insert_elements(project_id, scope_id, elements)
    }
}
