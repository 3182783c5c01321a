use plist::Value;
use std::path::Path;

use crate::utils::{AppError, AppResult};

pub fn read_info_plist(app_path: &Path) -> AppResult<plist::Dictionary> {
    read_plist_dict(&app_path.join("Contents/Info.plist"))
}

pub fn read_plist_dict(plist_path: &Path) -> AppResult<plist::Dictionary> {
    let val = Value::from_file(plist_path)?;
    val.into_dictionary()
        .ok_or_else(|| AppError::Custom(format!("{} is not a dictionary", plist_path.display())))
}

pub fn get_string(dict: &plist::Dictionary, key: &str) -> Option<String> {
    dict.get(key)?
        .as_string()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
