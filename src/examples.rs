//! Built-in example pipelines that can be quickly loaded from the UI.
//!
//! The first example doubles as the default tree for a fresh session.

use crate::types::*;

/// Kinds of built-in examples available from the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExampleKind {
    /// A list of numbers squared by a single child
    Squares,
    /// One source fanned out into several independent transformations
    Branching,
    /// A text processing chain several levels deep
    TextChain,
}

/// Metadata for a single example.
pub struct ExampleInfo {
    /// Stable identifier for the example
    pub kind: ExampleKind,
    /// Human-friendly display name
    pub name: &'static str,
}

/// Returns all examples with their display names.
pub const fn all_examples() -> &'static [ExampleInfo] {
    const EXAMPLES: &[ExampleInfo] = &[
        ExampleInfo {
            kind: ExampleKind::Squares,
            name: "Squares",
        },
        ExampleInfo {
            kind: ExampleKind::Branching,
            name: "Branching (sum / max / evens)",
        },
        ExampleInfo {
            kind: ExampleKind::TextChain,
            name: "Text chain (split → count → top)",
        },
    ];
    EXAMPLES
}

/// Builds the forest for the given example kind. Every call yields fresh IDs.
pub fn build_example(kind: ExampleKind) -> Tree {
    match kind {
        ExampleKind::Squares => default_tree(),
        ExampleKind::Branching => build_branching(),
        ExampleKind::TextChain => build_text_chain(),
    }
}

/// The tree a fresh session starts with.
pub fn default_tree() -> Tree {
    vec![Node::new("return [2, 4, 6];").with_child(Node::new("return $input.map(n => n * n);"))]
}

fn build_branching() -> Tree {
    let source = Node::new("return [3, 8, 1, 6, 4];")
        .with_child(Node::new("return $input.reduce((a, b) => a + b, 0);"))
        .with_child(Node::new("return Math.max(...$input);"))
        .with_child(
            Node::new("return $input.filter(n => n % 2 === 0);")
                .with_child(Node::new("$input.length")),
        );
    vec![source]
}

fn build_text_chain() -> Tree {
    let top = Node::new(
        "return Object.entries($input)\n    .sort((a, b) => b[1] - a[1])\n    .slice(0, 3);",
    );
    let count = Node::new(
        "const counts = {};\nfor (const w of $input) counts[w] = (counts[w] || 0) + 1;\ncounts",
    )
    .with_child(top);
    let split = Node::new("return $input.toLowerCase().split(/\\W+/).filter(Boolean);")
        .with_child(count);
    let text = Node::new("return 'the quick brown fox jumps over the lazy dog the end';")
        .with_child(split);
    vec![text]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::{NodeState, PropagationEngine};
    use crate::tree;
    use serde_json::json;

    #[test]
    fn test_every_example_evaluates_cleanly() {
        let engine = PropagationEngine::default();
        for info in all_examples() {
            let nodes = build_example(info.kind);
            let evaluations = engine.evaluate_forest(&nodes);
            for id in tree::node_ids(&nodes) {
                let state = &evaluations.get(id).unwrap().state;
                assert!(
                    matches!(state, NodeState::Evaluated(_)),
                    "{}: node {id} ended in {state:?}",
                    info.name
                );
            }
        }
    }

    #[test]
    fn test_default_tree_squares() {
        let nodes = default_tree();
        let evaluations = PropagationEngine::default().evaluate_forest(&nodes);
        let child = nodes[0].children[0].id;
        assert_eq!(evaluations.output_of(child), Some(&json!([4, 16, 36])));
    }

    #[test]
    fn test_examples_get_fresh_ids() {
        let a = build_example(ExampleKind::Branching);
        let b = build_example(ExampleKind::Branching);
        assert_ne!(tree::node_ids(&a), tree::node_ids(&b));
    }
}
