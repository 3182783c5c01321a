use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::db::Database;
use crate::models::SweepSettings;
use crate::utils::{AppError, AppResult};

pub async fn get_settings(db: &Arc<Mutex<Database>>) -> SweepSettings {
    db.lock().await.load_settings()
}

/// Changes one setting, addressed by its camelCase name as shown by
/// [`get_settings`], and saves the result.
///
/// `raw` is read as JSON (`3`, `true`, `["~/Tools"]`); anything that isn't
/// valid JSON is taken as a plain string. The updated settings must still
/// deserialize, so a value of the wrong type is rejected and nothing is saved.
pub async fn update_setting(
    db: &Arc<Mutex<Database>>,
    key: &str,
    raw: &str,
) -> AppResult<SweepSettings> {
    let db = db.lock().await;
    let mut json = serde_json::to_value(db.load_settings())?;
    let fields = json
        .as_object_mut()
        .ok_or_else(|| AppError::Custom("Settings are not an object".into()))?;
    if !fields.contains_key(key) {
        return Err(AppError::NotFound(format!("Unknown setting: {}", key)));
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    fields.insert(key.to_string(), value);

    let settings: SweepSettings = serde_json::from_value(json)
        .map_err(|e| AppError::Custom(format!("Invalid value for {}: {}", key, e)))?;
    db.save_settings(&settings)?;
    log::info!("Setting {} updated", key);
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Arc<Mutex<Database>> {
        Arc::new(Mutex::new(Database::open_in_memory().unwrap()))
    }

    #[tokio::test]
    async fn update_persists_typed_values() {
        let db = db();
        update_setting(&db, "ambiguousNameLen", "3").await.unwrap();
        update_setting(&db, "sentinelEnabled", "true").await.unwrap();
        update_setting(&db, "extraLocations", r#"["~/Tools"]"#).await.unwrap();

        let settings = get_settings(&db).await;
        assert_eq!(settings.ambiguous_name_len, 3);
        assert!(settings.sentinel_enabled);
        assert_eq!(settings.extra_locations, vec!["~/Tools".to_string()]);
        assert_eq!(settings.nested_depth, SweepSettings::default().nested_depth);
    }

    #[tokio::test]
    async fn unknown_keys_and_wrong_types_are_rejected() {
        let db = db();
        assert!(matches!(
            update_setting(&db, "noSuchThing", "1").await,
            Err(AppError::NotFound(_))
        ));
        assert!(update_setting(&db, "brewCleanup", "yes").await.is_err());
        assert!(update_setting(&db, "nestedDepth", "-1").await.is_err());
        assert_eq!(get_settings(&db).await, SweepSettings::default());
    }
}
