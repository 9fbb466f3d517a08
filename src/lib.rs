//! # Node Flow
//!
//! A live editor for trees of small JavaScript transformations. Every node holds a
//! snippet of code; its result becomes the `$input` of each of its children, so a
//! root-to-leaf path reads as a data pipeline.
//!
//! ## Features
//! - Sandboxed evaluation of node code with structured (JSON) results
//! - Debounced editing: an edit is only committed when its code runs and yields a value
//! - Recomputation of the edited node's whole subtree on commit
//! - Connectors drawn from each node's output to its children's inputs
//! - Automatic persistence of the forest and editor focus across restarts

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod debounce;
pub mod examples;
pub mod geometry;
pub mod persistence;
pub mod propagation;
pub mod script_engine;
pub mod session;
pub mod settings;
pub mod tree;
pub mod types;
pub mod ui;

// Re-export public types and functions
pub use propagation::{EditEvent, Evaluations, NodeState, PropagationEngine};
pub use script_engine::{evaluate, Evaluation};
pub use session::{EditOutcome, Session};
pub use settings::Settings;
pub use types::*;
pub use ui::NodeFlowApp;

/// Runs the node flow application with default settings.
///
/// This function initializes the egui application window and starts the main event loop.
///
/// # Returns
///
/// Returns `Ok(())` if the application runs successfully, or an `eframe::Error` if
/// initialization fails.
///
/// # Example
///
/// ```no_run
/// use node_flow::run_app;
///
/// fn main() -> Result<(), eframe::Error> {
///     run_app()
/// }
/// ```
pub fn run_app() -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Node Flow",
        options,
        Box::new(|cc| Ok(Box::new(NodeFlowApp::new(cc)))),
    )
}
