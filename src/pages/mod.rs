//! Page controllers. Each screen owns its local state, reads on mount and
//! writes on user action; nothing is shared between pages.
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::backend::Backend;
use crate::bridge::Session;
use crate::config::Config;

pub mod admin;
pub mod announcements;
pub mod cabinet;
pub mod create;
pub mod home;

pub use admin::AdminPage;
pub use announcements::AnnouncementsPage;
pub use cabinet::CabinetPage;
pub use create::CreatePage;
pub use home::HomePage;

/// Blocking user-facing message.
pub trait Alerts: Send + Sync {
    fn alert(&self, message: &str);
}

/// Prints alerts to stderr for the command-line front-end. Stdout carries
/// only the rendered document.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleAlerts;

impl Alerts for ConsoleAlerts {
    fn alert(&self, message: &str) {
        info!(%message, "alert");
        eprintln!("{}", message);
    }
}

/// Keeps every alert, newest last.
#[derive(Debug, Default)]
pub struct RecordedAlerts {
    messages: Mutex<Vec<String>>,
}

impl RecordedAlerts {
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

impl Alerts for RecordedAlerts {
    fn alert(&self, message: &str) {
        if let Ok(mut m) = self.messages.lock() {
            m.push(message.to_string());
        }
    }
}

/// Read lifecycle: `Idle → Loading → {Loaded | Error}`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LoadState<T> {
    #[default]
    Idle,
    Loading,
    Loaded(T),
    Error(String),
}

impl<T> LoadState<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            LoadState::Loaded(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// Write lifecycle: `Idle → Submitting → {Done | Error}`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmitState {
    #[default]
    Idle,
    Submitting,
    Done,
    Error(String),
}

impl SubmitState {
    pub fn is_submitting(&self) -> bool {
        matches!(self, SubmitState::Submitting)
    }
}

/// What a page needs from the outside world.
#[derive(Clone)]
pub struct PageContext {
    pub backend: Arc<dyn Backend>,
    pub alerts: Arc<dyn Alerts>,
    pub session: Arc<Session>,
    pub config: Arc<Config>,
}

impl PageContext {
    pub fn new(
        backend: Arc<dyn Backend>,
        alerts: Arc<dyn Alerts>,
        session: Arc<Session>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            backend,
            alerts,
            session,
            config,
        }
    }

    pub fn alert(&self, message: &str) {
        self.alerts.alert(message);
    }

    pub fn show_admin(&self) -> bool {
        self.config.app.show_admin_nav
    }
}

/// Notice prefix shown in place of a list that failed to load.
pub const LOAD_FAILED: &str = "Не удалось загрузить объявления";

/// Alert text for a failed backend call: fixed prefix plus the service message.
pub(crate) fn failure_message(prefix: &str, err: &anyhow::Error) -> String {
    format!("{}: {}", prefix, err)
}
