//! SQLite-backed project store.
//!
//! Single-writer store for the `projects` table. The upsert is a single
//! atomic conditional insert keyed by `project_id`, so a re-observed project
//! can never produce a duplicate row even across interrupted runs.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::Result;
use crate::models::{ProjectEntity, ProjectRecord};

/// Aggregate store counters for the `info` command.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub total: i64,
    pub with_ley_vp: i64,
    pub last_updated: Option<String>,
}

/// Project persistence backed by a SQLite database.
pub struct ProjectStore {
    conn: Connection,
}

impl ProjectStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (used by tests and dry runs).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS projects (
                project_id      INTEGER PRIMARY KEY,
                detail_url      TEXT UNIQUE NOT NULL,
                name            TEXT NOT NULL,
                zone            TEXT,
                delivery_type   TEXT,
                delivery_torres TEXT,
                project_status  TEXT,
                price_from      TEXT,
                developer       TEXT,
                commission      TEXT,
                has_ley_vp      BOOLEAN NOT NULL DEFAULT 0,
                location        TEXT,
                image_url       TEXT,
                scraped_at      TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at      TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_projects_updated ON projects(updated_at);
            ",
        )?;
        Ok(())
    }

    /// Fetch the stored row for a project, if any.
    pub fn fetch(&self, project_id: i64) -> Result<Option<ProjectEntity>> {
        let entity = self
            .conn
            .query_row(
                "SELECT project_id, detail_url, name, zone, delivery_type, delivery_torres,
                        project_status, price_from, developer, commission,
                        has_ley_vp, location, image_url, scraped_at, updated_at
                   FROM projects WHERE project_id = ?1",
                params![project_id],
                |row| {
                    Ok(ProjectEntity {
                        project_id: row.get(0)?,
                        detail_url: row.get(1)?,
                        name: row.get(2)?,
                        zone: row.get(3)?,
                        delivery_type: row.get(4)?,
                        delivery_torres: row.get(5)?,
                        project_status: row.get(6)?,
                        price_from: row.get(7)?,
                        developer: row.get(8)?,
                        commission: row.get(9)?,
                        has_ley_vp: row.get(10)?,
                        location: row.get(11)?,
                        image_url: row.get(12)?,
                        scraped_at: row.get(13)?,
                        updated_at: row.get(14)?,
                    })
                },
            )
            .optional()?;
        Ok(entity)
    }

    /// Insert or update a project in one atomic statement.
    ///
    /// `scraped_at` keeps its first-insert value; `updated_at` is refreshed
    /// by every call. Callers gate on change detection so an unchanged
    /// project never reaches this method.
    pub fn upsert(&self, project_id: i64, record: &ProjectRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO projects (
                project_id, detail_url, name, zone, delivery_type, delivery_torres,
                project_status, price_from, developer, commission,
                has_ley_vp, location, image_url, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, CURRENT_TIMESTAMP)
            ON CONFLICT(project_id) DO UPDATE SET
                detail_url      = excluded.detail_url,
                name            = excluded.name,
                zone            = excluded.zone,
                delivery_type   = excluded.delivery_type,
                delivery_torres = excluded.delivery_torres,
                project_status  = excluded.project_status,
                price_from      = excluded.price_from,
                developer       = excluded.developer,
                commission      = excluded.commission,
                has_ley_vp      = excluded.has_ley_vp,
                location        = excluded.location,
                image_url       = excluded.image_url,
                updated_at      = CURRENT_TIMESTAMP",
            params![
                project_id,
                record.detail_url,
                record.name,
                record.zone,
                record.delivery_type,
                record.delivery_torres,
                record.project_status,
                record.price_from,
                record.developer,
                record.commission,
                i64::from(record.has_ley_vp),
                record.location,
                record.image_url,
            ],
        )?;
        Ok(())
    }

    /// Project IDs and image URLs for asset downloading.
    pub fn image_assets(&self) -> Result<Vec<(i64, String)>> {
        let mut statement = self.conn.prepare(
            "SELECT project_id, image_url FROM projects
              WHERE image_url IS NOT NULL ORDER BY project_id",
        )?;
        let rows = statement
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Total number of stored projects.
    pub fn count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Aggregate counters for reporting.
    pub fn stats(&self) -> Result<StoreStats> {
        let (total, with_ley_vp): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(has_ley_vp), 0) FROM projects",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let last_updated: Option<String> = self
            .conn
            .query_row("SELECT MAX(updated_at) FROM projects", [], |row| row.get(0))
            .optional()?
            .flatten();
        Ok(StoreStats {
            total,
            with_ley_vp,
            last_updated,
        })
    }
}
