//! User settings, persisted separately from the node forest.

use crate::constants::{DEBOUNCE_MS, SETTINGS_KEY};
use crate::propagation::PropagationEngine;
use crate::script_engine::{EvalLimits, Evaluator};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunable behaviour of the editor and engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Quiet period after the last keystroke before an edit is evaluated
    pub debounce_ms: u64,
    /// Commit edits whose code runs but returns `undefined`
    pub accept_void_results: bool,
    /// Abort loops after this many iterations; `None` never aborts
    pub loop_iteration_limit: Option<u64>,
    /// Whether dark mode visuals are enabled
    pub dark_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debounce_ms: DEBOUNCE_MS,
            accept_void_results: false,
            loop_iteration_limit: None,
            dark_mode: true,
        }
    }
}

impl Settings {
    /// The debounce window as a duration.
    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Builds the propagation engine these settings describe.
    pub fn engine(&self) -> PropagationEngine {
        let limits = EvalLimits {
            loop_iteration_limit: self.loop_iteration_limit,
        };
        PropagationEngine::new(Evaluator::new(limits), self.accept_void_results)
    }

    /// Reads settings from eframe storage, falling back to defaults.
    pub fn load(storage: Option<&dyn eframe::Storage>) -> Self {
        let Some(text) = storage.and_then(|s| s.get_string(SETTINGS_KEY)) else {
            return Self::default();
        };
        serde_json::from_str(&text).unwrap_or_else(|err| {
            log::warn!("ignoring unreadable settings: {err}");
            Self::default()
        })
    }

    /// Writes settings to eframe storage.
    pub fn save(&self, storage: &mut dyn eframe::Storage) {
        match serde_json::to_string(self) {
            Ok(json) => storage.set_string(SETTINGS_KEY, json),
            Err(err) => log::warn!("failed to serialize settings: {err}"),
        }
    }
}
