use std::{collections::HashMap, fs, path::Path, time::Duration};

use serde::Deserialize;

pub const CONFIG_FILE: &str = "catalog.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub catalog_base_url: String,
    pub request_timeout_secs: u64,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog_base_url: "https://next-ecommerce-api.vercel.app".into(),
            request_timeout_secs: 10,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Settings are loaded before logging is set up, so problems with ignored
/// values come back as messages for the caller to log once it can.
pub fn load_settings() -> (Settings, Vec<String>) {
    let mut settings = Settings::default();
    let mut warnings = Vec::new();
    apply_file(&mut settings, &mut warnings, Path::new(CONFIG_FILE));
    apply_env(&mut settings, &mut warnings, |key| std::env::var(key).ok());
    settings.catalog_base_url = normalize_base_url(&settings.catalog_base_url);
    (settings, warnings)
}

fn apply_file(settings: &mut Settings, warnings: &mut Vec<String>, path: &Path) {
    let Ok(raw) = fs::read_to_string(path) else {
        return;
    };
    match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
        Ok(file_cfg) => apply_table(settings, &file_cfg),
        Err(err) => warnings.push(format!(
            "ignoring unreadable config file {}: {err}",
            path.display()
        )),
    }
}

fn apply_table(settings: &mut Settings, file_cfg: &HashMap<String, toml::Value>) {
    if let Some(v) = file_cfg.get("catalog_base_url").and_then(toml::Value::as_str) {
        settings.catalog_base_url = v.to_string();
    }
    if let Some(v) = file_cfg
        .get("request_timeout_secs")
        .and_then(toml::Value::as_integer)
        .and_then(|secs| u64::try_from(secs).ok())
    {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.get("log_filter").and_then(toml::Value::as_str) {
        settings.log_filter = v.to_string();
    }
}

fn apply_env(
    settings: &mut Settings,
    warnings: &mut Vec<String>,
    var: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = var("CATALOG_BASE_URL") {
        settings.catalog_base_url = v;
    }
    if let Some(v) = var("APP__CATALOG_BASE_URL") {
        settings.catalog_base_url = v;
    }

    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.request_timeout_secs = parsed,
            Err(_) => warnings.push(format!(
                "ignoring non-numeric APP__REQUEST_TIMEOUT_SECS value {v:?}"
            )),
        }
    }

    if let Some(v) = var("RUST_LOG") {
        settings.log_filter = v;
    }
    if let Some(v) = var("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
}

/// Trims whitespace and trailing slashes and assumes https when no scheme is
/// given. An empty value falls back to the default catalog.
pub fn normalize_base_url(raw: &str) -> String {
    let raw = raw.trim().trim_end_matches('/');
    if raw.is_empty() {
        return Settings::default().catalog_base_url;
    }
    if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
