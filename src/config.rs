//! Configuration loader and validator for the Animal Family mini-app.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Environment variable overriding `backend.url`.
pub const ENV_BACKEND_URL: &str = "SUPABASE_URL";
/// Environment variable overriding `backend.anon_key`.
pub const ENV_BACKEND_KEY: &str = "SUPABASE_ANON_KEY";
/// Environment variable overriding `app.show_admin_nav` (`"true"` enables).
pub const ENV_SHOW_ADMIN_NAV: &str = "SHOW_ADMIN_NAV";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub backend: Backend,
    pub storage: Storage,
    #[serde(default)]
    pub app: App,
}

/// Hosted backend endpoint and public key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Backend {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub anon_key: String,
}

/// Object storage buckets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Storage {
    pub announcements_bucket: String,
    pub pets_bucket: String,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    /// Shows the admin navigation and unlocks the moderation page. This is a
    /// deploy-time toggle, not an access check.
    #[serde(default)]
    pub show_admin_nav: bool,
    #[serde(default = "default_home_feed_limit")]
    pub home_feed_limit: usize,
}

impl Default for App {
    fn default() -> Self {
        Self {
            show_admin_nav: false,
            home_feed_limit: default_home_feed_limit(),
        }
    }
}

fn default_home_feed_limit() -> usize {
    5
}

impl Config {
    /// Apply deploy-time environment overrides on top of the file values.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BACKEND_URL).filter(|v| !v.trim().is_empty()) {
            self.backend.url = url;
        }
        if let Some(key) = lookup(ENV_BACKEND_KEY).filter(|v| !v.trim().is_empty()) {
            self.backend.anon_key = key;
        }
        if let Some(flag) = lookup(ENV_SHOW_ADMIN_NAV) {
            self.app.show_admin_nav = flag.trim() == "true";
        }
    }
}

/// Load configuration from a YAML file, apply environment overrides and validate.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    cfg.apply_env();
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.backend.url.trim().is_empty() {
        return Err(ConfigError::Invalid("backend.url must be non-empty"));
    }
    if !cfg.backend.url.starts_with("http://") && !cfg.backend.url.starts_with("https://") {
        return Err(ConfigError::Invalid("backend.url must be an http(s) URL"));
    }
    if cfg.backend.anon_key.trim().is_empty() {
        return Err(ConfigError::Invalid("backend.anon_key must be non-empty"));
    }
    if cfg.storage.announcements_bucket.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "storage.announcements_bucket must be non-empty",
        ));
    }
    if cfg.storage.pets_bucket.trim().is_empty() {
        return Err(ConfigError::Invalid("storage.pets_bucket must be non-empty"));
    }
    if cfg.app.home_feed_limit == 0 {
        return Err(ConfigError::Invalid("app.home_feed_limit must be > 0"));
    }
    Ok(())
}

/// Returns the example YAML configuration.
pub fn example() -> &'static str {
    r#"backend:
  url: "https://YOUR_PROJECT.supabase.co"
  anon_key: "YOUR_PUBLIC_ANON_KEY"

storage:
  announcements_bucket: "announcements"
  pets_bucket: "announcements"

app:
  show_admin_nav: false
  home_feed_limit: 5
"#
}
