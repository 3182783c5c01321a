use crate::db::Database;
use crate::utils::AppResult;

const MIGRATIONS: &[&str] = &[
    // Migration 1: Initial schema
    "
    CREATE TABLE IF NOT EXISTS settings (
        key         TEXT PRIMARY KEY,
        value       TEXT NOT NULL,
        updated_at  TEXT DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS trashed_apps (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        bundle_id       TEXT NOT NULL,
        app_name        TEXT NOT NULL,
        app_path        TEXT NOT NULL,
        reclaimed_bytes INTEGER NOT NULL DEFAULT 0,
        removed_count   INTEGER NOT NULL DEFAULT 0,
        failed_count    INTEGER NOT NULL DEFAULT 0,
        trashed_at      TEXT NOT NULL
    );
    ",
    // Migration 2: Keep the full profile snapshot alongside each record
    "
    ALTER TABLE trashed_apps ADD COLUMN snapshot TEXT;
    CREATE INDEX IF NOT EXISTS idx_trashed_apps_trashed_at ON trashed_apps(trashed_at);
    ",
];

pub fn run_migrations(db: &mut Database) -> AppResult<()> {
    db.conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY,
            applied_at TEXT DEFAULT (datetime('now'))
        );",
    )?;

    let applied: i64 = db
        .conn
        .query_row("SELECT COALESCE(MAX(id), 0) FROM _migrations", [], |row| {
            row.get(0)
        })?;

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i64;
        if version > applied {
            db.conn.execute_batch(migration)?;
            db.conn.execute(
                "INSERT INTO _migrations (id) VALUES (?1)",
                [version],
            )?;
            log::info!("Applied migration {}", version);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_run_once() {
        let mut db = Database::open_in_memory().unwrap();
        run_migrations(&mut db).unwrap();
        let applied: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, MIGRATIONS.len() as i64);
    }
}
