use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::db::Database;
use crate::models::TrashedRecord;
use crate::utils::AppResult;

/// One row of the persisted trash history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashedHistoryEntry {
    pub id: i64,
    pub bundle_id: String,
    pub app_name: String,
    pub app_path: String,
    pub reclaimed_bytes: u64,
    pub removed_count: usize,
    pub failed_count: usize,
    pub trashed_at: String,
}

/// Fixed-width UTC form so stored timestamps sort as text.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl Database {
    pub fn record_trashed(&self, record: &TrashedRecord) -> AppResult<i64> {
        let identity = &record.profile.identity;
        let snapshot = serde_json::to_string(record)?;
        self.conn.execute(
            "INSERT INTO trashed_apps
                (bundle_id, app_name, app_path, reclaimed_bytes, removed_count, failed_count, trashed_at, snapshot)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                identity.bundle_id,
                identity.display_name,
                identity.app_path.to_string_lossy().to_string(),
                record.reclaimed_bytes as i64,
                record.removed_count as i64,
                record.failed_count as i64,
                timestamp(&record.trashed_at),
                snapshot,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent first.
    pub fn get_trashed_history(&self, limit: i64) -> AppResult<Vec<TrashedHistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, bundle_id, app_name, app_path, reclaimed_bytes,
                    removed_count, failed_count, trashed_at
             FROM trashed_apps
             ORDER BY trashed_at DESC, id DESC
             LIMIT ?1",
        )?;

        let entries = stmt
            .query_map([limit], |row| {
                Ok(TrashedHistoryEntry {
                    id: row.get(0)?,
                    bundle_id: row.get(1)?,
                    app_name: row.get(2)?,
                    app_path: row.get(3)?,
                    reclaimed_bytes: row.get::<_, i64>(4)?.max(0) as u64,
                    removed_count: row.get::<_, i64>(5)?.max(0) as usize,
                    failed_count: row.get::<_, i64>(6)?.max(0) as usize,
                    trashed_at: row.get(7)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(entries)
    }

    /// Full snapshots, most recent first. Rows whose snapshot can't be
    /// decoded are skipped.
    pub fn get_trashed_records(&self, limit: i64) -> AppResult<Vec<TrashedRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT snapshot FROM trashed_apps
             WHERE snapshot IS NOT NULL
             ORDER BY trashed_at DESC, id DESC
             LIMIT ?1",
        )?;

        let records = stmt
            .query_map([limit], |row| row.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .filter_map(|json| match serde_json::from_str::<TrashedRecord>(&json) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!("Skipping unreadable trash snapshot: {}", e);
                    None
                }
            })
            .collect();

        Ok(records)
    }

    pub fn trashed_since(&self, since: DateTime<Utc>) -> AppResult<u64> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(reclaimed_bytes), 0) FROM trashed_apps WHERE trashed_at >= ?1",
            [timestamp(&since)],
            |row| row.get(0),
        )?;
        Ok(total.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApplicationIdentity, ApplicationProfile};
    use chrono::Duration;

    fn record(name: &str, bytes: u64, at: DateTime<Utc>) -> TrashedRecord {
        TrashedRecord {
            profile: ApplicationProfile::new(ApplicationIdentity::new(
                format!("com.foo.{}", name.to_lowercase()),
                name,
                format!("/Applications/{}.app", name),
            )),
            reclaimed_bytes: bytes,
            removed_count: 2,
            failed_count: 1,
            trashed_at: at,
        }
    }

    #[test]
    fn history_is_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        db.record_trashed(&record("Old", 10, now - Duration::hours(2))).unwrap();
        db.record_trashed(&record("New", 20, now)).unwrap();

        let history = db.get_trashed_history(10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].app_name, "New");
        assert_eq!(history[0].reclaimed_bytes, 20);
        assert_eq!(history[0].failed_count, 1);
        assert_eq!(history[1].app_path, "/Applications/Old.app");

        assert_eq!(db.get_trashed_history(1).unwrap().len(), 1);
    }

    #[test]
    fn snapshots_decode_back_to_records() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        db.record_trashed(&record("MyApp", 30, now)).unwrap();

        let records = db.get_trashed_records(5).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].profile.identity.bundle_id, "com.foo.myapp");
        assert_eq!(records[0].reclaimed_bytes, 30);
    }

    #[test]
    fn reclaimed_total_respects_cutoff() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        db.record_trashed(&record("A", 10, now - Duration::days(3))).unwrap();
        db.record_trashed(&record("B", 5, now)).unwrap();
        assert_eq!(db.trashed_since(now - Duration::days(1)).unwrap(), 5);
        assert_eq!(db.trashed_since(now - Duration::days(7)).unwrap(), 15);
    }
}
