//! Saving and restoring the application state.
//!
//! State is stored as JSON text in a single slot. Storage backends only move text;
//! encoding and decoding live in the provided methods of [`StateStorage`].

use crate::constants::STORAGE_KEY;
use crate::types::AppState;
use thiserror::Error;

/// Errors raised while persisting or restoring state.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The state could not be serialized
    #[error("failed to encode state: {0}")]
    Encode(#[source] serde_json::Error),
    /// The stored text is not a valid state
    #[error("failed to decode stored state: {0}")]
    Decode(#[source] serde_json::Error),
}

/// A single persisted state slot.
pub trait StateStorage {
    /// Returns the stored text, or `None` if nothing was saved yet.
    fn read(&self) -> Option<String>;

    /// Replaces the stored text.
    fn write(&mut self, text: String);

    /// Loads the stored state. `Ok(None)` means there is no prior session.
    fn load(&self) -> Result<Option<AppState>, PersistenceError> {
        self.read()
            .map(|text| AppState::from_json(&text).map_err(PersistenceError::Decode))
            .transpose()
    }

    /// Stores a complete snapshot of the state.
    fn save(&mut self, state: &AppState) -> Result<(), PersistenceError> {
        let text = state.to_json().map_err(PersistenceError::Encode)?;
        self.write(text);
        Ok(())
    }
}

/// In-process storage slot.
///
/// Used when the platform provides no persistent storage, and by tests to observe
/// what was written.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    text: Option<String>,
    writes: usize,
}

impl MemoryStorage {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a slot pre-filled with text.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            writes: 0,
        }
    }

    /// Number of writes since creation.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl StateStorage for MemoryStorage {
    fn read(&self) -> Option<String> {
        self.text.clone()
    }

    fn write(&mut self, text: String) {
        self.text = Some(text);
        self.writes += 1;
    }
}

/// Adapter storing the state in eframe's key-value storage.
pub struct EframeStorage<'a> {
    inner: &'a mut dyn eframe::Storage,
}

impl<'a> EframeStorage<'a> {
    /// Wraps eframe storage.
    pub fn new(inner: &'a mut dyn eframe::Storage) -> Self {
        Self { inner }
    }
}

impl StateStorage for EframeStorage<'_> {
    fn read(&self) -> Option<String> {
        self.inner.get_string(STORAGE_KEY)
    }

    fn write(&mut self, text: String) {
        self.inner.set_string(STORAGE_KEY, text);
        self.inner.flush();
    }
}

/// Loads the state stored by a previous session from read-only eframe storage.
pub fn load_from_eframe(
    storage: &dyn eframe::Storage,
) -> Result<Option<AppState>, PersistenceError> {
    storage
        .get_string(STORAGE_KEY)
        .map(|text| AppState::from_json(&text).map_err(PersistenceError::Decode))
        .transpose()
}
