use std::{collections::HashMap, fs, time::Duration};

use board_core::{
    drag::{DEFAULT_DRAG_DISTANCE, DEFAULT_SUCCESS_FLASH},
    DragThreshold,
};
use serde::Deserialize;

pub const CONFIG_FILE: &str = "backlog.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub drag_threshold_x: f64,
    pub drag_threshold_y: f64,
    pub success_flash_ms: u64,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/backlog.db".into(),
            drag_threshold_x: DEFAULT_DRAG_DISTANCE,
            drag_threshold_y: DEFAULT_DRAG_DISTANCE,
            success_flash_ms: DEFAULT_SUCCESS_FLASH.as_millis() as u64,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn drag_threshold(&self) -> DragThreshold {
        DragThreshold::new(self.drag_threshold_x, self.drag_threshold_y)
    }

    pub fn success_flash(&self) -> Duration {
        Duration::from_millis(self.success_flash_ms)
    }

    fn apply(&mut self, key: &str, value: &str) {
        match key {
            "database_url" => self.database_url = value.to_string(),
            "drag_threshold_x" => set_parsed(&mut self.drag_threshold_x, key, value),
            "drag_threshold_y" => set_parsed(&mut self.drag_threshold_y, key, value),
            "success_flash_ms" => set_parsed(&mut self.success_flash_ms, key, value),
            "log_filter" => self.log_filter = value.to_string(),
            _ => {}
        }
    }
}

fn set_parsed<T: std::str::FromStr>(slot: &mut T, key: &str, value: &str) {
    match value.trim().parse::<T>() {
        Ok(parsed) => *slot = parsed,
        Err(_) => eprintln!("ignoring invalid {key} value '{value}'"),
    }
}

/// Defaults, then `backlog.toml` in the working directory, then environment.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(CONFIG_FILE) {
        apply_file(&mut settings, &raw);
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    if let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) {
        for (key, value) in &file_cfg {
            let value = match value {
                toml::Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            settings.apply(key, &value);
        }
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("DATABASE_URL") {
        settings.database_url = v;
    }
    for (var, key) in [
        ("APP__DATABASE_URL", "database_url"),
        ("APP__DRAG_THRESHOLD_X", "drag_threshold_x"),
        ("APP__DRAG_THRESHOLD_Y", "drag_threshold_y"),
        ("APP__SUCCESS_FLASH_MS", "success_flash_ms"),
        ("APP__LOG_FILTER", "log_filter"),
    ] {
        if let Some(v) = lookup(var) {
            settings.apply(key, &v);
        }
    }
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    storage::ensure_sqlite_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}
