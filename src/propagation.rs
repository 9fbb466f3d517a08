//! Re-evaluation and propagation of node outputs.
//!
//! Outputs flow strictly from parent to child. After an edit, the edited node's code
//! must pass the validation gate before it is committed; once committed, the node's
//! whole subtree is recomputed from scratch. Nothing is cached between passes.

use crate::script_engine::{Evaluation, Evaluator};
use crate::tree;
use crate::types::*;
use serde_json::Value;
use std::collections::HashMap;

/// The state a node reached in the latest propagation pass.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeState {
    /// The parent produced no value, so this node was not run
    Unevaluated,
    /// The code produced a value
    Evaluated(Value),
    /// The code ran but produced `undefined`
    Empty,
    /// The code failed with the given message
    Failed(String),
}

impl NodeState {
    /// The value this node forwards to its children, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            NodeState::Evaluated(value) => Some(value),
            _ => None,
        }
    }
}

impl From<Evaluation> for NodeState {
    fn from(evaluation: Evaluation) -> Self {
        match evaluation {
            Evaluation::Value(value) => NodeState::Evaluated(value),
            Evaluation::Void => NodeState::Empty,
            Evaluation::Failed(reason) => NodeState::Failed(reason),
        }
    }
}

/// What one node received and produced.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeEvaluation {
    /// The value bound to `$input`; `None` for top-level and unevaluated nodes
    pub input: Option<Value>,
    /// Outcome of running the node
    pub state: NodeState,
}

/// Per-node results of the latest propagation passes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluations {
    entries: HashMap<NodeId, NodeEvaluation>,
}

impl Evaluations {
    /// Looks up the evaluation of a node.
    pub fn get(&self, node_id: NodeId) -> Option<&NodeEvaluation> {
        self.entries.get(&node_id)
    }

    /// The input a node last received.
    pub fn input_of(&self, node_id: NodeId) -> Option<&Value> {
        self.get(node_id).and_then(|e| e.input.as_ref())
    }

    /// The value a node last produced.
    pub fn output_of(&self, node_id: NodeId) -> Option<&Value> {
        self.get(node_id).and_then(|e| e.state.value())
    }

    /// Records the evaluation of a node, replacing any previous one.
    pub fn insert(&mut self, node_id: NodeId, evaluation: NodeEvaluation) {
        self.entries.insert(node_id, evaluation);
    }

    /// Overwrites entries with those of a newer pass.
    pub fn merge(&mut self, newer: Evaluations) {
        self.entries.extend(newer.entries);
    }

    /// Drops the entries of the given nodes.
    pub fn remove_all(&mut self, node_ids: &[NodeId]) {
        for id in node_ids {
            self.entries.remove(id);
        }
    }

    /// Number of evaluated nodes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been evaluated.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An edit to one node's code, as emitted by the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditEvent {
    /// The edited node
    pub node_id: NodeId,
    /// Full text of the editor
    pub code: String,
    /// Cursor offset in characters
    pub cursor: Option<usize>,
}

/// Why an edit was not committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The proposed code failed
    Failed(String),
    /// The proposed code produced no value
    NoValue,
}

/// An edit that did not pass the validation gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// The node the edit targeted
    pub node_id: NodeId,
    /// Why the edit was refused
    pub reason: RejectReason,
}

/// Result of propagating an edit.
#[derive(Debug, Clone, PartialEq)]
pub enum Propagation {
    /// The edit was committed; `evaluations` covers the edited node's subtree
    Committed {
        /// Successor state with the new code and focus
        state: AppState,
        /// Fresh results for the edited node and all its descendants
        evaluations: Evaluations,
    },
    /// The edit was refused and the state left as it was
    Rejected(Rejection),
}

/// What a node receives from above.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Upstream<'a> {
    /// The node is top-level and receives no input
    Root,
    /// The parent's current value
    Value(&'a Value),
    /// The parent failed, produced nothing or was never evaluated
    NoValue,
}

impl<'a> Upstream<'a> {
    /// Looks up what `node_id` receives in the current forest and evaluations.
    pub fn of(tree: &[Node], evaluations: &'a Evaluations, node_id: NodeId) -> Self {
        match tree::find_parent(tree, node_id) {
            None => Upstream::Root,
            Some(parent) => evaluations
                .output_of(parent.id)
                .map_or(Upstream::NoValue, Upstream::Value),
        }
    }

    /// The value bound as the node's input, if any.
    pub fn input(&self) -> Option<&'a Value> {
        match *self {
            Upstream::Value(value) => Some(value),
            Upstream::Root | Upstream::NoValue => None,
        }
    }
}

/// Runs node code and cascades outputs down the forest.
#[derive(Debug, Clone, Default)]
pub struct PropagationEngine {
    evaluator: Evaluator,
    accept_void: bool,
}

impl PropagationEngine {
    /// Creates an engine.
    ///
    /// # Arguments
    ///
    /// * `evaluator` - Runs each node's code
    /// * `accept_void` - Whether edits producing `undefined` may be committed
    pub fn new(evaluator: Evaluator, accept_void: bool) -> Self {
        Self {
            evaluator,
            accept_void,
        }
    }

    /// The evaluator used for every node.
    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Evaluates every node of the forest. Top-level nodes receive no input.
    pub fn evaluate_forest(&self, tree: &[Node]) -> Evaluations {
        let mut evaluations = Evaluations::default();
        for root in tree {
            self.evaluate_subtree(root, None, &mut evaluations);
        }
        evaluations
    }

    /// Evaluates a node against `input`, then each child against the node's value.
    pub fn evaluate_subtree(&self, node: &Node, input: Option<&Value>, out: &mut Evaluations) {
        let state = NodeState::from(self.evaluator.evaluate(&node.code, input));
        self.record_subtree(node, input, state, out);
    }

    fn record_subtree(
        &self,
        node: &Node,
        input: Option<&Value>,
        state: NodeState,
        out: &mut Evaluations,
    ) {
        match state.value() {
            Some(value) => {
                for child in &node.children {
                    self.evaluate_subtree(child, Some(value), out);
                }
            }
            None => {
                for child in &node.children {
                    mark_unevaluated(child, out);
                }
            }
        }
        out.insert(
            node.id,
            NodeEvaluation {
                input: input.cloned(),
                state,
            },
        );
    }

    /// Validates, commits and propagates an edit.
    ///
    /// # Arguments
    ///
    /// * `state` - The current state; never modified
    /// * `edit` - The proposed code and cursor position
    /// * `upstream` - What the edited node's parent currently forwards
    ///
    /// # Returns
    ///
    /// The successor state with fresh evaluations for the edited subtree, or the
    /// reason the edit was refused. Below a parent without a value the edit is still
    /// gated, but the committed subtree stays unevaluated, as a full evaluation of
    /// the new state would leave it.
    pub fn propagate_edit(
        &self,
        state: &AppState,
        edit: &EditEvent,
        upstream: Upstream<'_>,
    ) -> Propagation {
        let input = upstream.input();
        let node_state = match self.evaluator.evaluate(&edit.code, input) {
            Evaluation::Value(value) => NodeState::Evaluated(value),
            Evaluation::Void if self.accept_void => NodeState::Empty,
            Evaluation::Void => {
                return Propagation::Rejected(Rejection {
                    node_id: edit.node_id,
                    reason: RejectReason::NoValue,
                })
            }
            Evaluation::Failed(reason) => {
                return Propagation::Rejected(Rejection {
                    node_id: edit.node_id,
                    reason: RejectReason::Failed(reason),
                })
            }
        };

        let nodes = tree::update_node_code(&state.nodes, edit.node_id, &edit.code);
        let mut evaluations = Evaluations::default();
        if let Some(node) = tree::find_node(&nodes, edit.node_id) {
            match upstream {
                Upstream::NoValue => mark_unevaluated(node, &mut evaluations),
                Upstream::Root | Upstream::Value(_) => {
                    self.record_subtree(node, input, node_state, &mut evaluations)
                }
            }
        }

        Propagation::Committed {
            state: AppState {
                focus: Focus::on(edit.node_id, edit.cursor),
                nodes,
            },
            evaluations,
        }
    }
}

fn mark_unevaluated(node: &Node, out: &mut Evaluations) {
    for child in &node.children {
        mark_unevaluated(child, out);
    }
    out.insert(
        node.id,
        NodeEvaluation {
            input: None,
            state: NodeState::Unevaluated,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chain() -> (AppState, NodeId, NodeId) {
        let child = Node::new("return $input * 2;");
        let child_id = child.id;
        let root = Node::new("return 2;").with_child(child);
        let root_id = root.id;
        (AppState::new(vec![root]), root_id, child_id)
    }

    fn edit(node_id: NodeId, code: &str) -> EditEvent {
        EditEvent {
            node_id,
            code: code.to_string(),
            cursor: Some(code.len()),
        }
    }

    #[test]
    fn test_forest_evaluation() {
        let (state, root, child) = chain();
        let evaluations = PropagationEngine::default().evaluate_forest(&state.nodes);

        assert_eq!(evaluations.output_of(root), Some(&json!(2)));
        assert_eq!(evaluations.input_of(root), None);
        assert_eq!(evaluations.input_of(child), Some(&json!(2)));
        assert_eq!(evaluations.output_of(child), Some(&json!(4)));
    }

    #[test]
    fn test_failed_parent_leaves_children_unevaluated() {
        let grandchild = Node::new("return 1;");
        let grandchild_id = grandchild.id;
        let child = Node::new("return 1;").with_child(grandchild);
        let child_id = child.id;
        let root = Node::new("throw new Error('no')").with_child(child);
        let root_id = root.id;

        let evaluations = PropagationEngine::default().evaluate_forest(&[root]);

        assert!(matches!(
            evaluations.get(root_id).unwrap().state,
            NodeState::Failed(_)
        ));
        assert_eq!(evaluations.get(child_id).unwrap().state, NodeState::Unevaluated);
        assert_eq!(
            evaluations.get(grandchild_id).unwrap().state,
            NodeState::Unevaluated
        );
    }

    #[test]
    fn test_commit_recomputes_subtree() {
        let (state, root, child) = chain();
        let engine = PropagationEngine::default();

        let propagation = engine.propagate_edit(&state, &edit(root, "return 5;"), Upstream::Root);
        let Propagation::Committed { state: next, evaluations } = propagation else {
            panic!("edit should be committed");
        };

        assert_eq!(tree::find_node(&next.nodes, root).unwrap().code, "return 5;");
        assert_eq!(next.focus, Focus::on(root, Some(9)));
        assert_eq!(evaluations.output_of(root), Some(&json!(5)));
        assert_eq!(evaluations.input_of(child), Some(&json!(5)));
        assert_eq!(evaluations.output_of(child), Some(&json!(10)));
    }

    #[test]
    fn test_failed_edit_is_rejected() {
        let (state, _, child) = chain();
        let input = json!(2);
        let propagation = PropagationEngine::default().propagate_edit(
            &state,
            &edit(child, "throw new Error('x')"),
            Upstream::Value(&input),
        );

        assert!(matches!(
            propagation,
            Propagation::Rejected(Rejection {
                reason: RejectReason::Failed(_),
                ..
            })
        ));
    }

    #[test]
    fn test_void_edit_is_rejected_by_default() {
        let (state, root, _) = chain();
        let propagation = PropagationEngine::default().propagate_edit(
            &state,
            &edit(root, "return;"),
            Upstream::Root,
        );

        assert_eq!(
            propagation,
            Propagation::Rejected(Rejection {
                node_id: root,
                reason: RejectReason::NoValue,
            })
        );
    }

    #[test]
    fn test_void_edit_commits_when_accepted() {
        let (state, root, child) = chain();
        let engine = PropagationEngine::new(Evaluator::default(), true);

        let Propagation::Committed { evaluations, .. } =
            engine.propagate_edit(&state, &edit(root, "return;"), Upstream::Root)
        else {
            panic!("void edit should be committed");
        };

        assert_eq!(evaluations.get(root).unwrap().state, NodeState::Empty);
        assert_eq!(evaluations.get(child).unwrap().state, NodeState::Unevaluated);
    }

    #[test]
    fn test_descendant_failure_keeps_commit() {
        let (state, root, child) = chain();
        let engine = PropagationEngine::default();

        let state = AppState::new(tree::update_node_code(
            &state.nodes,
            child,
            "if (typeof $input !== 'number') throw new Error('nan'); return $input;",
        ));
        let Propagation::Committed { state: next, evaluations } =
            engine.propagate_edit(&state, &edit(root, "return 'text';"), Upstream::Root)
        else {
            panic!("root edit should be committed");
        };

        assert_eq!(tree::find_node(&next.nodes, root).unwrap().code, "return 'text';");
        assert!(matches!(
            evaluations.get(child).unwrap().state,
            NodeState::Failed(_)
        ));
    }

    #[test]
    fn test_siblings_are_untouched() {
        let left = Node::new("return $input + 1;");
        let right = Node::new("return $input - 1;");
        let (left_id, right_id) = (left.id, right.id);
        let root = Node::new("return 10;").with_child(left).with_child(right);
        let state = AppState::new(vec![root]);
        let input = json!(10);

        let Propagation::Committed { evaluations, .. } = PropagationEngine::default()
            .propagate_edit(
                &state,
                &edit(left_id, "return $input + 100;"),
                Upstream::Value(&input),
            )
        else {
            panic!("edit should be committed");
        };

        assert_eq!(evaluations.output_of(left_id), Some(&json!(110)));
        assert!(evaluations.get(right_id).is_none());
    }

    #[test]
    fn test_middle_edit_feeds_new_value_downstream() {
        let leaf = Node::new("return $input + 1;");
        let leaf_id = leaf.id;
        let middle = Node::new("return $input * 2;").with_child(leaf);
        let middle_id = middle.id;
        let state = AppState::new(vec![Node::new("return 3;").with_child(middle)]);
        let engine = PropagationEngine::default();
        let evaluations = engine.evaluate_forest(&state.nodes);
        assert_eq!(evaluations.output_of(leaf_id), Some(&json!(7)));

        let upstream = Upstream::of(&state.nodes, &evaluations, middle_id);
        assert_eq!(upstream, Upstream::Value(&json!(3)));
        let Propagation::Committed { evaluations, .. } =
            engine.propagate_edit(&state, &edit(middle_id, "return $input * 10;"), upstream)
        else {
            panic!("edit should be committed");
        };

        assert_eq!(evaluations.output_of(middle_id), Some(&json!(30)));
        assert_eq!(evaluations.input_of(leaf_id), Some(&json!(30)));
        assert_eq!(evaluations.output_of(leaf_id), Some(&json!(31)));
    }

    #[test]
    fn test_edit_below_failed_parent_stays_unevaluated() {
        let leaf = Node::new("return $input + 1;");
        let leaf_id = leaf.id;
        let middle = Node::new("return 1;").with_child(leaf);
        let middle_id = middle.id;
        let state = AppState::new(vec![Node::new("throw new Error('no')").with_child(middle)]);
        let engine = PropagationEngine::default();
        let evaluations = engine.evaluate_forest(&state.nodes);

        let upstream = Upstream::of(&state.nodes, &evaluations, middle_id);
        assert_eq!(upstream, Upstream::NoValue);
        let Propagation::Committed { state: next, evaluations } =
            engine.propagate_edit(&state, &edit(middle_id, "return 6;"), upstream)
        else {
            panic!("edit should be committed");
        };

        assert_eq!(tree::find_node(&next.nodes, middle_id).unwrap().code, "return 6;");
        let fresh = engine.evaluate_forest(&next.nodes);
        for id in [middle_id, leaf_id] {
            assert_eq!(evaluations.get(id).unwrap().state, NodeState::Unevaluated);
            assert_eq!(evaluations.get(id), fresh.get(id));
        }
    }

    #[test]
    fn test_edit_below_failed_parent_is_still_gated() {
        let middle = Node::new("return 1;");
        let middle_id = middle.id;
        let state = AppState::new(vec![Node::new("throw new Error('no')").with_child(middle)]);

        let propagation = PropagationEngine::default().propagate_edit(
            &state,
            &edit(middle_id, "return $input.length;"),
            Upstream::NoValue,
        );

        assert!(matches!(propagation, Propagation::Rejected(_)));
    }

    #[test]
    fn test_merge_and_remove() {
        let (state, root, child) = chain();
        let engine = PropagationEngine::default();
        let mut evaluations = engine.evaluate_forest(&state.nodes);

        let mut newer = Evaluations::default();
        engine.evaluate_subtree(&Node::with_id(child, "return 0;"), Some(&json!(2)), &mut newer);
        evaluations.merge(newer);
        assert_eq!(evaluations.output_of(child), Some(&json!(0)));

        evaluations.remove_all(&[child]);
        assert_eq!(evaluations.len(), 1);
        assert!(evaluations.get(root).is_some());
    }
}
