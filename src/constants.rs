//! Shared application-wide constants.
//! Centralizes tweakable values used by the engine, persistence and UI rendering.

// Evaluation
/// Code given to freshly added nodes; forwards the input unchanged.
pub const DEFAULT_NODE_CODE: &str = "return $input;";
/// Code given to freshly added top-level pipelines.
pub const DEFAULT_ROOT_CODE: &str = "return 0;";
/// Global name under which a node's input is exposed to its script.
pub const INPUT_BINDING: &str = "$input";
/// Maximum nesting depth when converting script results to JSON.
pub const MAX_VALUE_DEPTH: usize = 64;

// Editing
/// Delay (in milliseconds) between the last keystroke and the evaluation of an edit.
pub const DEBOUNCE_MS: u64 = 1000;

// Persistence
/// Storage key holding the serialized application state.
pub const STORAGE_KEY: &str = "flow-state";
/// Storage key holding the serialized user settings.
pub const SETTINGS_KEY: &str = "flow-settings";

// Node cards
/// Width of a node card in screen points.
pub const NODE_WIDTH: f32 = 240.0;
/// Horizontal gap between a node card and the column of its children.
pub const LEVEL_SPACING: f32 = 80.0;
/// Vertical gap between sibling cards.
pub const SIBLING_SPACING: f32 = 16.0;
/// Number of rows shown by each code editor.
pub const EDITOR_ROWS: usize = 3;

// Connectors
/// Stroke width of connector lines.
pub const CONNECTOR_STROKE_WIDTH: f32 = 1.0;
/// Radius of the markers drawn at both ends of a connector.
pub const ANCHOR_RADIUS: f32 = 2.0;
