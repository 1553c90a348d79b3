use crate::infrastructure::error::InfraError;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";

pub const DEFAULT_MAX_HISTORY_ENTRIES: u64 = 100;
pub const DEFAULT_TAPS_REQUIRED: u64 = 5;
pub const DEFAULT_TAP_WINDOW_MS: u64 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevMenuSettings {
    pub taps_required: usize,
    pub tap_window_ms: u64,
}

fn default_app_config() -> serde_json::Value {
    serde_json::json!({
        "schema": 1,
        "appName": "DayMark",
        "maxHistoryEntries": DEFAULT_MAX_HISTORY_ENTRIES,
        "devMenu": {
            "tapsRequired": DEFAULT_TAPS_REQUIRED,
            "tapWindowMs": DEFAULT_TAP_WINDOW_MS
        }
    })
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&default_app_config())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn read_max_history_entries(config_dir: &Path) -> Result<usize, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    let value = app
        .get("maxHistoryEntries")
        .and_then(serde_json::Value::as_u64)
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_MAX_HISTORY_ENTRIES);
    Ok(value as usize)
}

pub fn read_dev_menu_settings(config_dir: &Path) -> Result<DevMenuSettings, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    let dev_menu = app.get("devMenu");
    let taps_required = dev_menu
        .and_then(|value| value.get("tapsRequired"))
        .and_then(serde_json::Value::as_u64)
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_TAPS_REQUIRED);
    let tap_window_ms = dev_menu
        .and_then(|value| value.get("tapWindowMs"))
        .and_then(serde_json::Value::as_u64)
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_TAP_WINDOW_MS);
    Ok(DevMenuSettings {
        taps_required: taps_required as usize,
        tap_window_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_CONFIG: AtomicUsize = AtomicUsize::new(0);

    struct TempConfigDir {
        path: PathBuf,
    }

    impl TempConfigDir {
        fn new() -> Self {
            let sequence = NEXT_TEMP_CONFIG.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "daymark-config-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp config dir");
            Self { path }
        }
    }

    impl Drop for TempConfigDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn defaults_written_once_and_readable() {
        let dir = TempConfigDir::new();
        ensure_default_configs(&dir.path).expect("write defaults");
        ensure_default_configs(&dir.path).expect("idempotent");

        assert_eq!(read_max_history_entries(&dir.path).expect("cap"), 100);
        let dev_menu = read_dev_menu_settings(&dir.path).expect("dev menu");
        assert_eq!(dev_menu.taps_required, 5);
        assert_eq!(dev_menu.tap_window_ms, 2000);
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let dir = TempConfigDir::new();
        fs::write(dir.path.join(APP_JSON), "{\"schema\":1}").expect("write config");

        assert_eq!(read_max_history_entries(&dir.path).expect("cap"), 100);
        assert_eq!(
            read_dev_menu_settings(&dir.path).expect("dev menu"),
            DevMenuSettings {
                taps_required: 5,
                tap_window_ms: 2000
            }
        );
    }

    #[test]
    fn unsupported_schema_is_rejected() {
        let dir = TempConfigDir::new();
        fs::write(dir.path.join(APP_JSON), "{\"schema\":2}").expect("write config");
        assert!(read_max_history_entries(&dir.path).is_err());
    }

    #[test]
    fn custom_cap_is_honored() {
        let dir = TempConfigDir::new();
        fs::write(
            dir.path.join(APP_JSON),
            "{\"schema\":1,\"maxHistoryEntries\":25}",
        )
        .expect("write config");
        assert_eq!(read_max_history_entries(&dir.path).expect("cap"), 25);
    }
}
