//! Core data types and structures for the node flow engine.
//!
//! This module defines the fundamental data structures used throughout the application:
//! the node forest, the focus record and the persisted application state.

use crate::constants::DEFAULT_NODE_CODE;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for nodes.
pub type NodeId = Uuid;

/// An ordered forest of nodes. Each top-level node starts an independent pipeline.
pub type Tree = Vec<Node>;

/// A single editable code fragment.
///
/// The output of a node becomes the `$input` of each of its children.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Node {
    /// Unique identifier for this node, fixed at creation
    pub id: NodeId,
    /// JavaScript source evaluated for this node
    pub code: String,
    /// Ordered children; order drives display numbering
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Node {
    /// Creates a new leaf node with a random ID.
    ///
    /// # Arguments
    ///
    /// * `code` - The JavaScript source for the node
    pub fn new(code: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), code)
    }

    /// Creates a new leaf node with an explicit ID.
    pub fn with_id(id: NodeId, code: impl Into<String>) -> Self {
        Self {
            id,
            code: code.into(),
            children: Vec::new(),
        }
    }

    /// Creates a leaf whose code forwards its input unchanged.
    pub fn pass_through() -> Self {
        Self::new(DEFAULT_NODE_CODE)
    }

    /// Builder-style helper appending a child.
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Returns true if the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Which editor holds the keyboard focus, and where its cursor sits.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Focus {
    /// Node whose editor was last edited
    pub node_id: Option<NodeId>,
    /// Cursor offset in characters
    pub position: Option<usize>,
}

impl Focus {
    /// Focus on a node with the given cursor offset.
    pub fn on(node_id: NodeId, position: Option<usize>) -> Self {
        Self {
            node_id: Some(node_id),
            position,
        }
    }
}

/// The complete persisted state: the node forest plus the focus record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppState {
    /// Editor focus at the time of the last committed mutation
    #[serde(default)]
    pub focus: Focus,
    /// The node forest
    pub nodes: Tree,
}

impl Default for AppState {
    /// Creates the built-in starter state.
    fn default() -> Self {
        Self::new(crate::examples::default_tree())
    }
}

impl AppState {
    /// Creates a state for the given forest with no focus.
    pub fn new(nodes: Tree) -> Self {
        Self {
            focus: Focus::default(),
            nodes,
        }
    }

    /// Serialize the state to a JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a state from a JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
