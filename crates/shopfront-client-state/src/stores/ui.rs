use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapter::StoreAdapter;
use crate::domain::{DomainState, StateDomain, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    pub theme: Theme,
    pub locale: String,
    pub sidebar_collapsed: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            locale: "en-US".to_string(),
            sidebar_collapsed: false,
        }
    }
}

impl DomainState for UiState {
    const DOMAIN: StateDomain = StateDomain::Ui;

    fn validate(&self) -> Result<(), ValidationError> {
        if self.locale.trim().is_empty() {
            return Err(ValidationError::Field {
                domain: "ui",
                field: "locale",
                reason: "must not be empty",
            });
        }
        Ok(())
    }
}

/// Interface preferences: theme, locale, chrome layout.
#[derive(Debug)]
pub struct UiStore {
    adapter: Arc<StoreAdapter>,
    state: Mutex<UiState>,
}

impl UiStore {
    pub fn new(adapter: Arc<StoreAdapter>) -> Self {
        Self {
            adapter,
            state: Mutex::new(UiState::default()),
        }
    }

    pub fn state(&self) -> UiState {
        self.lock().clone()
    }

    pub fn set_theme(&self, theme: Theme) {
        let snapshot = {
            let mut state = self.lock();
            state.theme = theme;
            state.clone()
        };
        self.persist(&snapshot);
    }

    pub fn set_locale(&self, locale: &str) {
        let snapshot = {
            let mut state = self.lock();
            state.locale = locale.to_string();
            state.clone()
        };
        self.persist(&snapshot);
    }

    pub fn set_sidebar_collapsed(&self, collapsed: bool) {
        let snapshot = {
            let mut state = self.lock();
            state.sidebar_collapsed = collapsed;
            state.clone()
        };
        self.persist(&snapshot);
    }

    /// Reloads from durable storage; run at startup and whenever the context
    /// regains foreground focus.
    pub fn initialize(&self) {
        let persisted = self.adapter.read_state::<UiState>();
        *self.lock() = persisted;
    }

    /// Applies a payload observed from a sibling context.
    pub fn reconcile(&self, payload: Value) {
        match serde_json::from_value::<UiState>(payload) {
            Ok(incoming) if incoming.validate().is_ok() => {
                *self.lock() = incoming;
            }
            Ok(_) | Err(_) => {
                tracing::warn!(domain = "ui", "dropping invalid reconcile payload");
            }
        }
    }

    fn persist(&self, snapshot: &UiState) {
        if let Err(error) = self.adapter.write(snapshot) {
            tracing::warn!(domain = "ui", %error, "persist failed; in-memory state kept");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, UiState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
