// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Bundlecast.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Release persistence
//!
//! `ReleaseRepository` is the only way the rest of the crate touches
//! persisted releases; components receive it as an injected `Arc` at
//! startup. The SQLite implementation serializes access through the
//! connection mutex, which is all the atomicity a single-row insert or
//! update needs.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{OptionalExtension, params};

use crate::error::Result;
use crate::model::{NewRelease, Release};

pub trait ReleaseRepository: Send + Sync {
    /// Persist a new release with `is_active = true`. Hash and file name
    /// land in the same row insert, so readers never observe one without
    /// the other.
    fn insert(&self, release: NewRelease) -> Result<Release>;

    /// All active releases whose `app_version` matches exactly.
    fn active_for_app_version(&self, app_version: &str) -> Result<Vec<Release>>;

    /// Deactivate the first release matching `bundle_version`, across all
    /// app versions. Returns the updated record, or `None` if nothing
    /// matched.
    fn deactivate_by_bundle_version(&self, bundle_version: &str) -> Result<Option<Release>>;
}

#[derive(Debug)]
pub struct SqliteReleaseRepository {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteReleaseRepository {
    pub fn open(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = rusqlite::Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &rusqlite::Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS releases (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                app_version    TEXT NOT NULL,
                bundle_version TEXT NOT NULL,
                file_name      TEXT NOT NULL,
                file_hash      TEXT NOT NULL,
                force_update   INTEGER NOT NULL DEFAULT 0,
                is_active      INTEGER NOT NULL DEFAULT 1,
                description    TEXT,
                created_at     TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_releases_app_active
                ON releases(app_version, is_active);
            CREATE INDEX IF NOT EXISTS idx_releases_bundle
                ON releases(bundle_version);",
        )?;
        Ok(())
    }
}

fn row_to_release(row: &rusqlite::Row<'_>) -> rusqlite::Result<Release> {
    Ok(Release {
        id: row.get(0)?,
        app_version: row.get(1)?,
        bundle_version: row.get(2)?,
        file_name: row.get(3)?,
        file_hash: row.get(4)?,
        force_update: row.get(5)?,
        is_active: row.get(6)?,
        description: row.get(7)?,
        created_at: row.get(8)?,
    })
}

const RELEASE_COLUMNS: &str =
    "id, app_version, bundle_version, file_name, file_hash, force_update, is_active, description, created_at";

impl ReleaseRepository for SqliteReleaseRepository {
    fn insert(&self, release: NewRelease) -> Result<Release> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        let now = Utc::now();

        conn.execute(
            "INSERT INTO releases (app_version, bundle_version, file_name, file_hash, force_update, is_active, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7)",
            params![
                release.app_version,
                release.bundle_version,
                release.file_name,
                release.file_hash,
                release.force_update,
                release.description,
                now.to_rfc3339(),
            ],
        )?;

        Ok(Release {
            id: conn.last_insert_rowid(),
            app_version: release.app_version,
            bundle_version: release.bundle_version,
            file_name: release.file_name,
            file_hash: release.file_hash,
            force_update: release.force_update,
            is_active: true,
            description: release.description,
            created_at: now,
        })
    }

    fn active_for_app_version(&self, app_version: &str) -> Result<Vec<Release>> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {RELEASE_COLUMNS} FROM releases WHERE app_version = ?1 AND is_active = 1"
        ))?;

        let rows = stmt
            .query_map(params![app_version], row_to_release)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn deactivate_by_bundle_version(&self, bundle_version: &str) -> Result<Option<Release>> {
        let conn = self.conn.lock().expect("database mutex poisoned");

        // One row per call, even when the version string is reused across
        // app versions.
        let id: Option<i64> = conn
            .query_row(
                "SELECT id FROM releases WHERE bundle_version = ?1 ORDER BY id LIMIT 1",
                params![bundle_version],
                |row| row.get(0),
            )
            .optional()?;

        let Some(id) = id else {
            return Ok(None);
        };

        conn.execute(
            "UPDATE releases SET is_active = 0 WHERE id = ?1",
            params![id],
        )?;

        let release = conn.query_row(
            &format!("SELECT {RELEASE_COLUMNS} FROM releases WHERE id = ?1"),
            params![id],
            row_to_release,
        )?;

        Ok(Some(release))
    }
}
