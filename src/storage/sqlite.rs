use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::models::CollectionReport;

/// Caches finished collection reports so a run inside the freshness window
/// can skip the API entirely.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let storage = Self { conn };
        storage.init_db()?;
        Ok(storage)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self { conn };
        storage.init_db()?;
        Ok(storage)
    }

    fn init_db(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS reports (
                id INTEGER PRIMARY KEY,
                owner TEXT UNIQUE NOT NULL,
                fetched_at TEXT NOT NULL,
                repository_count INTEGER NOT NULL,
                total_stars INTEGER NOT NULL,
                report_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_reports_owner ON reports(owner);
            "#,
        )?;

        Ok(())
    }

    pub fn save_report(&self, report: &CollectionReport) -> Result<()> {
        let report_json = serde_json::to_string(report)?;
        self.conn.execute(
            r#"
            INSERT INTO reports (owner, fetched_at, repository_count, total_stars, report_json)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(owner) DO UPDATE SET
                fetched_at = excluded.fetched_at,
                repository_count = excluded.repository_count,
                total_stars = excluded.total_stars,
                report_json = excluded.report_json
            "#,
            params![
                report.owner,
                report.fetched_at.to_rfc3339(),
                report.repository_count() as i64,
                report.total_stars as i64,
                report_json,
            ],
        )?;

        Ok(())
    }

    /// Loads the cached report for `owner` if it is younger than `max_age`.
    pub fn load_report(&self, owner: &str, max_age: Duration) -> Result<Option<CollectionReport>> {
        self.load_report_at(owner, max_age, Utc::now())
    }

    pub fn load_report_at(
        &self,
        owner: &str,
        max_age: Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<CollectionReport>> {
        let row = self
            .conn
            .query_row(
                "SELECT fetched_at, report_json FROM reports WHERE owner = ?1",
                params![owner],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        let Some((fetched_at, report_json)) = row else {
            return Ok(None);
        };

        let fetched_at = match DateTime::parse_from_rfc3339(&fetched_at) {
            Ok(ts) => ts.with_timezone(&Utc),
            Err(e) => {
                tracing::warn!("Ignoring cached report for {} with bad timestamp: {}", owner, e);
                return Ok(None);
            }
        };

        let age = now.signed_duration_since(fetched_at).to_std().unwrap_or_default();
        if age > max_age {
            tracing::info!("Cached report for {} is stale ({:?} old)", owner, age);
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&report_json)?))
    }

    pub fn delete_report(&self, owner: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM reports WHERE owner = ?1", params![owner])?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApiRepository, RepositoryRecord};
    use serde_json::json;

    fn report(fetched_at: DateTime<Utc>) -> CollectionReport {
        let repo: ApiRepository = serde_json::from_value(json!({
            "name": "widget",
            "full_name": "octo/widget",
            "description": "A widget",
            "language": "Rust",
            "stargazers_count": 4,
            "forks_count": 2,
            "has_issues": true
        }))
        .unwrap();
        let mut record = RepositoryRecord::from(repo);
        record.avg_resolution_seconds = Some(12.5);
        CollectionReport::new("octo", fetched_at, vec![record])
    }

    #[test]
    fn test_save_and_load_fresh_report() {
        let storage = Storage::in_memory().unwrap();
        let now = Utc::now();
        storage.save_report(&report(now)).unwrap();

        let loaded = storage
            .load_report_at("octo", Duration::from_secs(3600), now + chrono::Duration::minutes(5))
            .unwrap()
            .unwrap();
        assert_eq!(loaded.total_stars, 4);
        assert_eq!(loaded.repositories[0].avg_resolution_seconds, Some(12.5));
        assert!(!loaded.repositories[0].processed_details());
    }

    #[test]
    fn test_stale_report_is_ignored() {
        let storage = Storage::in_memory().unwrap();
        let now = Utc::now();
        storage.save_report(&report(now - chrono::Duration::hours(2))).unwrap();

        assert!(storage
            .load_report_at("octo", Duration::from_secs(3600), now)
            .unwrap()
            .is_none());
        assert!(storage.load_report_at("nobody", Duration::from_secs(3600), now).unwrap().is_none());
    }

    #[test]
    fn test_save_replaces_previous_report_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        let now = Utc::now();
        {
            let storage = Storage::new(&path).unwrap();
            storage.save_report(&report(now - chrono::Duration::minutes(10))).unwrap();
            storage.save_report(&report(now)).unwrap();
        }

        let storage = Storage::new(&path).unwrap();
        let loaded = storage.load_report_at("octo", Duration::from_secs(60), now).unwrap();
        assert!(loaded.is_some());
        assert!(storage.delete_report("octo").unwrap());
        assert!(!storage.delete_report("octo").unwrap());
    }
}
