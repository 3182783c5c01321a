pub mod history_repo;
pub mod migrations;
pub mod settings_repo;

use rusqlite::Connection;
use std::path::Path;

use crate::utils::AppResult;

pub struct Database {
    pub conn: Connection,
}

impl Database {
    pub fn new(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let mut db = Self { conn };
        migrations::run_migrations(&mut db)?;
        Ok(db)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        let mut db = Self { conn };
        migrations::run_migrations(&mut db)?;
        Ok(db)
    }

    /// `<data dir>/appsweep/appsweep.db`, or `None` without a data dir.
    pub fn default_path() -> Option<std::path::PathBuf> {
        dirs::data_dir().map(|d| d.join("appsweep").join("appsweep.db"))
    }
}
