//! Per-session metric visibility.
//!
//! Once a user has toggled a metric, that choice survives later fetches.
//! Metrics seen for the first time take their declared default. Entries
//! for metrics missing from the current fetch are kept, not dropped, so a
//! metric that disappears for one request comes back the way it was left.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("malformed preferences JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisibilityPreferences {
    choices: BTreeMap<String, bool>,
}

impl VisibilityPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    /// The stored choice, if any.
    pub fn get(&self, id: &str) -> Option<bool> {
        self.choices.get(id).copied()
    }

    /// Stored choice, else `default`.
    pub fn is_visible(&self, id: &str, default: bool) -> bool {
        self.get(id).unwrap_or(default)
    }

    pub fn set(&mut self, id: &str, visible: bool) {
        self.choices.insert(id.to_string(), visible);
    }

    /// Flip a metric and return its new state. An unseen metric flips from `default`.
    pub fn toggle(&mut self, id: &str, default: bool) -> bool {
        let visible = !self.is_visible(id, default);
        self.set(id, visible);
        visible
    }

    /// Record a choice for every metric in the current fetch, keeping
    /// earlier choices and falling back to each metric's default.
    pub fn reconcile<'a>(&mut self, current: impl IntoIterator<Item = (&'a str, bool)>) {
        for (id, default) in current {
            self.choices.entry(id.to_string()).or_insert(default);
        }
    }

    pub fn from_json(json: &str) -> Result<Self, PreferencesError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, PreferencesError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
