//! Layered app settings: defaults, then `blog.toml`, then environment.

use std::{fs, io, path::Path};

use anyhow::Context;
use serde::Deserialize;

pub const SETTINGS_FILE: &str = "blog.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_url: String,
    pub author: Option<String>,
    pub window_title: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://blog.db".into(),
            author: None,
            window_title: "Blog".into(),
        }
    }
}

/// Defaults, then `blog.toml` in the working directory, then environment.
pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from(Path::new(SETTINGS_FILE))
}

pub fn load_settings_from(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => toml::from_str::<Settings>(&raw)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => Settings::default(),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read settings file '{}'", path.display()))
        }
    };

    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    Ok(settings)
}

fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("BLOG_DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = lookup("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = lookup("BLOG_AUTHOR") {
        settings.author = Some(v);
    }
    if let Some(v) = lookup("APP__AUTHOR") {
        settings.author = Some(v);
    }

    settings.author = settings
        .author
        .take()
        .map(|author| author.trim().to_string())
        .filter(|author| !author.is_empty());
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
