//! Database schema migrations.
//!
//! Applied versions are recorded in `_migrations`; each pending SQL batch runs
//! once, in order, when a database is opened.

use std::num::ParseIntError;

use super::Error;
use tokio_rusqlite::{Connection, params, rusqlite};

/// Migration list: (version, SQL).
///
/// Versions are incrementing integers. Every batch uses CREATE IF NOT EXISTS.
const MIGRATIONS: &[(&str, &str)] = &[("1", include_str!("../../migrations/001_cache_stores.sql"))];

/// Highest applied migration version, 0 on a fresh database.
fn applied_version(conn: &rusqlite::Connection) -> Result<i64, Error> {
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))
        .map_err(Error::from)
}

/// Run any pending migrations.
///
/// # Errors
///
/// Returns an error if a migration SQL batch fails or a version is malformed.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(Error::from)?;

        let current = applied_version(conn)?;

        for (version, sql) in MIGRATIONS {
            let version_num: i64 = version
                .parse()
                .map_err(|e: ParseIntError| Error::MigrationFailed(e.to_string()))?;
            if version_num <= current {
                continue;
            }

            conn.execute_batch(sql)
                .map_err(|e| Error::MigrationFailed(format!("version {version_num}: {e}")))?;
            conn.execute(
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                params![version_num, chrono::Utc::now().to_rfc3339()],
            )
            .map_err(Error::from)?;
            tracing::debug!(version = version_num, "applied cache schema migration");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
