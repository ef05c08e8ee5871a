//! Bridge to the embedding Telegram WebApp runtime.
//!
//! A page gets its identity and theme through a [`Session`] bootstrapped from
//! a [`HostBridge`]. When the app is not embedded, [`NoHost`] stands in and
//! the session is anonymous: no identity, no backend write, default theme.
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::identity_sync;

/// User object from `initDataUnsafe.user`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TelegramUser {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl TelegramUser {
    pub fn id_string(&self) -> Option<String> {
        self.id.map(|id| id.to_string())
    }

    /// First and last name joined by a space, blanks skipped.
    pub fn full_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn display_first_name(&self) -> Option<&str> {
        self.first_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Host theme colours keyed by Telegram's `themeParams` names.
pub type ThemeParams = BTreeMap<String, String>;

/// Capabilities the embedding host provides.
pub trait HostBridge: Send + Sync {
    fn is_present(&self) -> bool {
        true
    }

    /// Tell the host the page is ready to be shown.
    fn ready(&self);

    fn init_user(&self) -> Option<TelegramUser>;

    fn theme_params(&self) -> ThemeParams;
}

/// Stand-in used when the page is not embedded in a host.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHost;

impl HostBridge for NoHost {
    fn is_present(&self) -> bool {
        false
    }

    fn ready(&self) {}

    fn init_user(&self) -> Option<TelegramUser> {
        None
    }

    fn theme_params(&self) -> ThemeParams {
        ThemeParams::new()
    }
}

/// Host built from the WebApp `initData` string and `themeParams` JSON.
///
/// The `hash` in `initData` is not checked here, so the identity is only as
/// trustworthy as whoever launched the process.
#[derive(Debug, Default)]
pub struct InitDataBridge {
    user: Option<TelegramUser>,
    theme: ThemeParams,
    ready_calls: AtomicUsize,
}

impl InitDataBridge {
    pub fn new(user: Option<TelegramUser>, theme: ThemeParams) -> Self {
        Self {
            user,
            theme,
            ready_calls: AtomicUsize::new(0),
        }
    }

    /// Accepts either the raw `initData` query string
    /// (`query_id=…&user=%7B…%7D&auth_date=…&hash=…`) or a bare user JSON object.
    pub fn from_init_data(init_data: &str, theme_json: Option<&str>) -> Result<Self> {
        let user = parse_init_user(init_data)?;
        let theme = match theme_json.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => parse_theme_params(raw)?,
            None => ThemeParams::new(),
        };
        Ok(Self::new(user, theme))
    }

    pub fn ready_calls(&self) -> usize {
        self.ready_calls.load(Ordering::SeqCst)
    }
}

impl HostBridge for InitDataBridge {
    fn ready(&self) {
        self.ready_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn init_user(&self) -> Option<TelegramUser> {
        self.user.clone()
    }

    fn theme_params(&self) -> ThemeParams {
        self.theme.clone()
    }
}

fn parse_init_user(init_data: &str) -> Result<Option<TelegramUser>> {
    let raw = init_data.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if raw.starts_with('{') {
        let user = serde_json::from_str(raw).context("invalid user JSON")?;
        return Ok(Some(user));
    }
    let url = Url::parse(&format!("tg://init/?{}", raw.trim_start_matches('?')))
        .context("invalid initData")?;
    let Some((_, encoded)) = url.query_pairs().find(|(k, _)| k == "user") else {
        return Ok(None);
    };
    let user = serde_json::from_str(&encoded).context("invalid user JSON in initData")?;
    Ok(Some(user))
}

fn parse_theme_params(raw: &str) -> Result<ThemeParams> {
    let map: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(raw).context("invalid themeParams JSON")?;
    Ok(map
        .into_iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
        .collect())
}

/// `themeParams` key → page colour variable.
pub const THEME_MAPPING: [(&str, &str); 5] = [
    ("bg_color", "--color-bg"),
    ("secondary_bg_color", "--color-card"),
    ("button_color", "--color-primary"),
    ("button_text_color", "--color-text"),
    ("hint_color", "--color-secondary"),
];

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#?([0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").expect("valid colour regex")
});

/// Page colour variables, starting from the pastel palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeVars {
    vars: BTreeMap<&'static str, String>,
}

impl Default for ThemeVars {
    fn default() -> Self {
        let vars = [
            ("--color-bg", "#fdf6f0"),
            ("--color-card", "#ffffff"),
            ("--color-primary", "#f29e8e"),
            ("--color-text", "#3d3d3d"),
            ("--color-secondary", "#cde7f0"),
            ("--color-accent", "#fde2c8"),
        ]
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect();
        Self { vars }
    }
}

impl ThemeVars {
    /// Overwrite the mapped variables for keys the host provides. Returns how
    /// many variables changed; absent or malformed keys keep the default.
    pub fn apply(&mut self, params: &ThemeParams) -> usize {
        let mut applied = 0;
        for (key, var) in THEME_MAPPING {
            let Some(value) = params.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) else {
                continue;
            };
            if !HEX_COLOR.is_match(value) {
                warn!(key, value, "ignoring malformed theme colour");
                continue;
            }
            self.vars
                .insert(var, format!("#{}", value.trim_start_matches('#')));
            applied += 1;
        }
        applied
    }

    pub fn get(&self, var: &str) -> Option<&str> {
        self.vars.get(var).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.vars.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// Identity and theme for one page visit.
#[derive(Debug, Default)]
pub struct Session {
    user: Option<TelegramUser>,
    theme: ThemeVars,
    sync: Option<JoinHandle<()>>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Read the host context. Must run inside a tokio runtime: when the host
    /// provides a user id, the `users` upsert is spawned in the background and
    /// never awaited here.
    pub fn bootstrap(bridge: &dyn HostBridge, backend: Arc<dyn Backend>) -> Self {
        if !bridge.is_present() {
            debug!("no host bridge; running anonymous");
            return Self::anonymous();
        }
        bridge.ready();

        let user = bridge.init_user();
        let sync = user
            .as_ref()
            .and_then(|u| identity_sync::spawn(backend, u));

        let mut theme = ThemeVars::default();
        let applied = theme.apply(&bridge.theme_params());
        info!(
            has_user = user.is_some(),
            theme_overrides = applied,
            "host session ready"
        );
        Self { user, theme, sync }
    }

    pub fn user(&self) -> Option<&TelegramUser> {
        self.user.as_ref()
    }

    /// Stringified host id, the key every per-user row is stored under.
    pub fn telegram_id(&self) -> Option<String> {
        self.user.as_ref().and_then(TelegramUser::id_string)
    }

    pub fn theme(&self) -> &ThemeVars {
        &self.theme
    }

    /// Detach the background identity sync so a short-lived process can wait
    /// for it before exiting. The render path never awaits it.
    pub fn take_background(&mut self) -> Option<JoinHandle<()>> {
        self.sync.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_init_data_query_string() {
        let raw = "query_id=AA&user=%7B%22id%22%3A42%2C%22first_name%22%3A%22Ann%22%2C%22username%22%3A%22ann%22%7D&auth_date=1700000000&hash=abc";
        let bridge = InitDataBridge::from_init_data(raw, None).unwrap();
        let user = bridge.init_user().unwrap();
        assert_eq!(user.id, Some(42));
        assert_eq!(user.first_name.as_deref(), Some("Ann"));
        assert_eq!(user.username.as_deref(), Some("ann"));
        assert!(bridge.theme_params().is_empty());
    }

    #[test]
    fn parses_bare_user_json_and_theme() {
        let bridge = InitDataBridge::from_init_data(
            r#"{"first_name":"Bob"}"#,
            Some(r#"{"bg_color":"17212b","hint_color":"708499","is_dark":true}"#),
        )
        .unwrap();
        let user = bridge.init_user().unwrap();
        assert_eq!(user.id, None);
        let theme = bridge.theme_params();
        assert_eq!(theme.get("bg_color").map(String::as_str), Some("17212b"));
        assert!(!theme.contains_key("is_dark"));
    }

    #[test]
    fn init_data_without_user_is_anonymous() {
        let bridge = InitDataBridge::from_init_data("auth_date=1&hash=x", None).unwrap();
        assert!(bridge.init_user().is_none());
        assert!(InitDataBridge::from_init_data("user=%7Bnope", None).is_err());
    }

    #[test]
    fn full_name_skips_blanks() {
        let u = TelegramUser {
            first_name: Some("Ann".into()),
            last_name: Some(" ".into()),
            ..Default::default()
        };
        assert_eq!(u.full_name(), "Ann");
        let u = TelegramUser {
            first_name: Some("Ann".into()),
            last_name: Some("Lee".into()),
            ..Default::default()
        };
        assert_eq!(u.full_name(), "Ann Lee");
        assert_eq!(TelegramUser::default().full_name(), "");
    }

    #[test]
    fn theme_applies_only_present_keys() {
        let mut vars = ThemeVars::default();
        let mut params = ThemeParams::new();
        params.insert("bg_color".into(), "17212b".into());
        params.insert("button_color".into(), "#5288c1".into());
        params.insert("hint_color".into(), "url(evil)".into());
        params.insert("link_color".into(), "ffffff".into());
        let applied = vars.apply(&params);
        assert_eq!(applied, 2);
        assert_eq!(vars.get("--color-bg"), Some("#17212b"));
        assert_eq!(vars.get("--color-primary"), Some("#5288c1"));
        assert_eq!(vars.get("--color-secondary"), ThemeVars::default().get("--color-secondary"));
        assert_eq!(vars.get("--color-card"), Some("#ffffff"));
    }

    #[test]
    fn no_host_is_absent() {
        let host = NoHost;
        assert!(!host.is_present());
        assert!(host.init_user().is_none());
        assert!(host.theme_params().is_empty());
    }
}
