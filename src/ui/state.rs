//! Application state management structures.
//!
//! This module contains the state the front end keeps next to the session: editor
//! buffers, pending debounced edits and the layout recorded during the last frame.

use crate::debounce::Debouncer;
use crate::examples::ExampleKind;
use crate::geometry::NodeLayout;
use crate::persistence::MemoryStorage;
use crate::propagation::{EditEvent, RejectReason};
use crate::session::{self, Session};
use crate::settings::Settings;
use crate::types::*;
use std::collections::HashMap;

/// Structural changes requested while drawing a frame.
///
/// Requests are collected during rendering and applied afterwards, once the tree is
/// no longer borrowed for drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiRequest {
    /// Append a pass-through child to the node
    AddChild(NodeId),
    /// Remove the node and its subtree
    Remove(NodeId),
    /// Append a new top-level pipeline
    AddRoot,
    /// Replace the forest with a built-in example
    LoadExample(ExampleKind),
}

/// State related to the code editors of the node cards.
pub struct EditorState {
    /// Text of each editor; may differ from the committed code while an edit is
    /// pending or after it was rejected
    pub buffers: HashMap<NodeId, String>,
    /// Edits waiting for their debounce window to close
    pub debouncer: Debouncer<NodeId, EditEvent>,
    /// Why the latest edit of a node was refused
    pub rejections: HashMap<NodeId, RejectReason>,
    /// Focus to restore into an editor on the next frame
    pub pending_focus: Option<Focus>,
}

impl EditorState {
    /// Creates editor state with the given debounce settings.
    pub fn new(settings: &Settings) -> Self {
        Self {
            buffers: HashMap::new(),
            debouncer: Debouncer::new(settings.debounce_delay()),
            rejections: HashMap::new(),
            pending_focus: None,
        }
    }

    /// Picks up settings changed at runtime. Edits already pending keep their deadline.
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.debouncer.set_delay(settings.debounce_delay());
    }

    /// Drops buffers and pending edits of nodes no longer in the forest.
    pub fn retain_nodes(&mut self, nodes: &[Node]) {
        let stale: Vec<NodeId> = self
            .buffers
            .keys()
            .chain(self.rejections.keys())
            .filter(|id| !crate::tree::contains(nodes, **id))
            .copied()
            .collect();
        for id in stale {
            self.buffers.remove(&id);
            self.rejections.remove(&id);
            self.debouncer.cancel(&id);
        }
    }
}

/// The main application structure containing the session and UI state.
///
/// This struct implements the `eframe::App` trait and handles all user interface
/// rendering and interaction logic.
pub struct NodeFlowApp {
    /// The node forest and its evaluations
    pub session: Session,
    /// User settings
    pub settings: Settings,
    /// Code editor state
    pub editors: EditorState,
    /// Input/output rectangles recorded during the last frame
    pub layouts: HashMap<NodeId, NodeLayout>,
    /// Storage used when the platform offers none
    pub fallback_storage: MemoryStorage,
}

impl Default for NodeFlowApp {
    fn default() -> Self {
        let settings = Settings::default();
        let session = Session::new(AppState::default(), settings.engine());
        Self::with_session(session, settings)
    }
}

impl NodeFlowApp {
    /// Creates the app, restoring settings and state saved by a previous run.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings = Settings::load(cc.storage);
        let session = session::restore_from_eframe(cc.storage, settings.engine());
        Self::with_session(session, settings)
    }

    /// Creates the app around an existing session.
    pub fn with_session(session: Session, settings: Settings) -> Self {
        let mut editors = EditorState::new(&settings);
        let focus = session.state().focus.clone();
        if focus.node_id.is_some() {
            editors.pending_focus = Some(focus);
        }
        Self {
            session,
            settings,
            editors,
            layouts: HashMap::new(),
            fallback_storage: MemoryStorage::new(),
        }
    }
}
