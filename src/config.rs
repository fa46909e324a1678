use crate::error::Result;
use crate::storage::write_text_file;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SETTINGS_FILE: &str = "settings.json";
pub const DEFAULT_WEBHOOK_URL: &str = "https://script.google.com/macros/s/AKfycbxLtCMGX5JUHO2ShKCr2aMYh-mwQ5B-peBcwEMIsBcRKXqMSUdgmTKF3jxvboV3c8wyHA/exec";
pub const DEFAULT_SUPPORT_PHONE: &str = "6285255002368";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardConfig {
    /// Blank disables the spreadsheet sync.
    pub webhook_url: String,
    pub support_phone: String,
    pub native_share: bool,
    pub http_timeout_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            webhook_url: DEFAULT_WEBHOOK_URL.to_string(),
            support_phone: DEFAULT_SUPPORT_PHONE.to_string(),
            native_share: true,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl DashboardConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    pub fn path(root: &Path) -> PathBuf {
        root.join(SETTINGS_FILE)
    }

    /// Missing or unreadable settings fall back to defaults key by key.
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        let parsed = match serde_json::from_str::<serde_json::Value>(raw.as_str()) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("Ignoring unreadable {SETTINGS_FILE}: {err}");
                json!({})
            }
        };
        Ok(serde_json::from_value(ensure_settings_shape(parsed))?)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        write_text_file(Self::path(root), content.as_str())
    }
}

fn ensure_settings_shape(value: serde_json::Value) -> serde_json::Value {
    let defaults = DashboardConfig::default();
    let mut out = if value.is_object() { value } else { json!({}) };
    let Some(obj) = out.as_object_mut() else {
        return json!(defaults);
    };
    if !obj.get("webhookUrl").is_some_and(|v| v.is_string()) {
        obj.insert("webhookUrl".to_string(), json!(defaults.webhook_url));
    }
    if !obj.get("supportPhone").is_some_and(|v| v.is_string()) {
        obj.insert("supportPhone".to_string(), json!(defaults.support_phone));
    }
    if !obj.get("nativeShare").is_some_and(|v| v.is_boolean()) {
        obj.insert("nativeShare".to_string(), json!(defaults.native_share));
    }
    if !obj.get("httpTimeoutSecs").is_some_and(|v| v.is_u64()) {
        obj.insert(
            "httpTimeoutSecs".to_string(),
            json!(defaults.http_timeout_secs),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            DashboardConfig::load(dir.path()).unwrap(),
            DashboardConfig::default()
        );
    }

    #[test]
    fn invalid_keys_are_replaced() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"webhookUrl":"","supportPhone":628,"httpTimeoutSecs":-3,"extra":1}"#,
        )
        .unwrap();
        let config = DashboardConfig::load(dir.path()).unwrap();
        assert_eq!(config.webhook_url, "");
        assert_eq!(config.support_phone, DEFAULT_SUPPORT_PHONE);
        assert!(config.native_share);
        assert_eq!(config.http_timeout_secs, DEFAULT_HTTP_TIMEOUT_SECS);
    }

    #[test]
    fn garbage_file_gives_defaults_and_save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), "not json").unwrap();
        let mut config = DashboardConfig::load(dir.path()).unwrap();
        assert_eq!(config, DashboardConfig::default());

        config.native_share = false;
        config.http_timeout_secs = 0;
        config.save(dir.path()).unwrap();
        let loaded = DashboardConfig::load(dir.path()).unwrap();
        assert!(!loaded.native_share);
        assert_eq!(loaded.http_timeout(), Duration::from_secs(1));
    }
}
