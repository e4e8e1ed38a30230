use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;
use shared::protocol::{DEFAULT_PAGE_SIZE, DEFAULT_SEARCH_URL};

pub const DEFAULT_CONFIG_FILE: &str = "enact.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub search_url: String,
    pub search_page_size: u32,
    pub search_debounce_ms: u64,
    pub tick_ms: u64,
    pub frame_ms: u64,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_SEARCH_URL.into(),
            search_page_size: DEFAULT_PAGE_SIZE,
            search_debounce_ms: 1000,
            tick_ms: 10,
            frame_ms: 50,
            log_filter: "info".into(),
        }
    }
}

/// Defaults, then the settings file, then environment overrides. An explicit
/// `path` must exist; the default `enact.toml` is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = match path {
        Some(path) => read_settings(path)?,
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                read_settings(&default_path)?
            } else {
                Settings::default()
            }
        }
    };
    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn read_settings(path: &Path) -> anyhow::Result<Settings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
    parse_settings(&raw).with_context(|| format!("invalid settings file '{}'", path.display()))
}

pub fn parse_settings(raw: &str) -> anyhow::Result<Settings> {
    Ok(toml::from_str(raw)?)
}

pub fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("ENACT_SEARCH_URL") {
        settings.search_url = v;
    }
    if let Some(v) = lookup("APP__SEARCH_URL") {
        settings.search_url = v;
    }

    if let Some(v) = lookup("APP__SEARCH_PAGE_SIZE").and_then(|v| v.parse().ok()) {
        settings.search_page_size = v;
    }
    if let Some(v) = lookup("APP__SEARCH_DEBOUNCE_MS").and_then(|v| v.parse().ok()) {
        settings.search_debounce_ms = v;
    }
    if let Some(v) = lookup("APP__TICK_MS").and_then(|v| v.parse().ok()) {
        settings.tick_ms = v;
    }

    if let Some(v) = lookup("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
