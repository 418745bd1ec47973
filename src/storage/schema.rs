//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Selector-Scout database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id TEXT NOT NULL,
    project_id TEXT,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    total_urls INTEGER NOT NULL,
    successful_urls INTEGER NOT NULL,
    elements_found INTEGER NOT NULL,
    authentication_used INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_runs_job ON runs(job_id);

-- Discovered elements, one row per (project, scope, selector, state)
CREATE TABLE IF NOT EXISTS elements (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id TEXT NOT NULL,
    scope_id TEXT NOT NULL DEFAULT '',
    selector TEXT NOT NULL,
    discovery_state TEXT NOT NULL,
    tag_name TEXT NOT NULL,
    text_content TEXT NOT NULL,
    attributes TEXT NOT NULL,
    page_url TEXT NOT NULL,
    strategy TEXT NOT NULL,
    uniqueness REAL NOT NULL,
    stability REAL NOT NULL,
    specificity REAL NOT NULL,
    accessibility REAL NOT NULL,
    overall_quality REAL NOT NULL,
    quality_band TEXT NOT NULL,
    discovered_at TEXT NOT NULL,
    UNIQUE(project_id, scope_id, selector, discovery_state)
);

CREATE INDEX IF NOT EXISTS idx_elements_project ON elements(project_id);
CREATE INDEX IF NOT EXISTS idx_elements_band ON elements(quality_band);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
