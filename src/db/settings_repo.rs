use crate::db::Database;
use crate::models::SweepSettings;
use crate::utils::{AppError, AppResult};

const SETTINGS_KEY: &str = "sweep_settings";

impl Database {
    /// Stored settings, or the defaults when none were saved or the stored
    /// JSON is unreadable. Keys missing from the stored JSON take their
    /// default values.
    pub fn load_settings(&self) -> SweepSettings {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                [SETTINGS_KEY],
                |row| row.get(0),
            )
            .ok();

        match json {
            Some(j) => serde_json::from_str(&j).unwrap_or_else(|e| {
                log::warn!("Failed to parse settings, using defaults: {}", e);
                SweepSettings::default()
            }),
            None => SweepSettings::default(),
        }
    }

    pub fn save_settings(&self, settings: &SweepSettings) -> AppResult<()> {
        let json = serde_json::to_string(settings)
            .map_err(|e| AppError::Custom(format!("Failed to serialize settings: {}", e)))?;
        self.conn.execute(
            "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
            [SETTINGS_KEY, json.as_str()],
        )?;
        Ok(())
    }
}
