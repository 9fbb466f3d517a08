//! The live editing session.
//!
//! A [`Session`] holds the current [`AppState`] and the evaluation table, and runs
//! every mutation to completion: evaluate, validate, commit, persist. The storage
//! collaborator is passed into each mutation rather than owned, so the caller decides
//! where snapshots go.

use crate::constants::DEFAULT_ROOT_CODE;
use crate::persistence::StateStorage;
use crate::propagation::*;
use crate::tree;
use crate::types::*;

/// Outcome of applying an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// The edit was committed and persisted
    Committed,
    /// The edit failed the validation gate; nothing changed
    Rejected(RejectReason),
    /// The edited node no longer exists
    UnknownNode,
}

/// Current state plus the results of evaluating it.
#[derive(Debug, Clone)]
pub struct Session {
    state: AppState,
    evaluations: Evaluations,
    engine: PropagationEngine,
}

impl Session {
    /// Starts a session on the given state and evaluates the whole forest.
    pub fn new(state: AppState, engine: PropagationEngine) -> Self {
        let evaluations = engine.evaluate_forest(&state.nodes);
        Self {
            state,
            evaluations,
            engine,
        }
    }

    /// Starts a session from storage, or from the default tree if storage holds no
    /// readable state.
    pub fn restore(storage: &dyn StateStorage, engine: PropagationEngine) -> Self {
        Self::new(restored_state(storage.load()), engine)
    }

    /// The current committed state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The current evaluation table.
    pub fn evaluations(&self) -> &Evaluations {
        &self.evaluations
    }

    /// Replaces the engine, e.g. after settings changed, and re-evaluates everything.
    pub fn set_engine(&mut self, engine: PropagationEngine) {
        self.engine = engine;
        self.evaluations = self.engine.evaluate_forest(&self.state.nodes);
    }

    /// Applies a debounced editor change.
    ///
    /// The edit is evaluated against the value the node's parent currently forwards.
    /// Only a committed edit changes the state and is persisted.
    pub fn apply_edit(&mut self, edit: EditEvent, storage: &mut dyn StateStorage) -> EditOutcome {
        if !tree::contains(&self.state.nodes, edit.node_id) {
            log::debug!("dropping edit for removed node {}", edit.node_id);
            return EditOutcome::UnknownNode;
        }

        let upstream = Upstream::of(&self.state.nodes, &self.evaluations, edit.node_id);
        match self.engine.propagate_edit(&self.state, &edit, upstream) {
            Propagation::Committed { state, evaluations } => {
                self.state = state;
                self.evaluations.merge(evaluations);
                self.persist(storage);
                EditOutcome::Committed
            }
            Propagation::Rejected(rejection) => {
                log::debug!(
                    "edit of node {} rejected: {:?}",
                    rejection.node_id,
                    rejection.reason
                );
                EditOutcome::Rejected(rejection.reason)
            }
        }
    }

    /// Appends a pass-through child to `parent_id` and focuses it.
    ///
    /// # Returns
    ///
    /// The new node's ID, or `None` if the parent does not exist.
    pub fn add_child(
        &mut self,
        parent_id: NodeId,
        storage: &mut dyn StateStorage,
    ) -> Option<NodeId> {
        if !tree::contains(&self.state.nodes, parent_id) {
            return None;
        }

        let child = Node::with_id(
            tree::fresh_id(&self.state.nodes),
            crate::constants::DEFAULT_NODE_CODE,
        );
        let child_id = child.id;
        let nodes = tree::insert_child(&self.state.nodes, parent_id, child);

        if let Some(child) = tree::find_node(&nodes, child_id) {
            match self.evaluations.output_of(parent_id).cloned() {
                Some(input) => {
                    self.engine
                        .evaluate_subtree(child, Some(&input), &mut self.evaluations)
                }
                None => self.evaluations.insert(
                    child_id,
                    NodeEvaluation {
                        input: None,
                        state: NodeState::Unevaluated,
                    },
                ),
            }
        }

        self.commit(
            AppState {
                focus: Focus::on(child_id, None),
                nodes,
            },
            storage,
        );
        Some(child_id)
    }

    /// Appends a new top-level pipeline and focuses it.
    pub fn add_root(&mut self, storage: &mut dyn StateStorage) -> NodeId {
        let root = Node::with_id(tree::fresh_id(&self.state.nodes), DEFAULT_ROOT_CODE);
        let root_id = root.id;
        self.engine.evaluate_subtree(&root, None, &mut self.evaluations);

        let mut nodes = self.state.nodes.clone();
        nodes.push(root);
        self.commit(
            AppState {
                focus: Focus::on(root_id, None),
                nodes,
            },
            storage,
        );
        root_id
    }

    /// Removes a node and its subtree.
    ///
    /// # Returns
    ///
    /// `true` if the node existed and was removed.
    pub fn remove_node(&mut self, node_id: NodeId, storage: &mut dyn StateStorage) -> bool {
        let removed = tree::subtree_ids(&self.state.nodes, node_id);
        if removed.is_empty() {
            return false;
        }

        let focus = match self.state.focus.node_id {
            Some(focused) if removed.contains(&focused) => Focus::default(),
            _ => self.state.focus.clone(),
        };
        self.evaluations.remove_all(&removed);
        self.commit(
            AppState {
                focus,
                nodes: tree::remove_node(&self.state.nodes, node_id),
            },
            storage,
        );
        true
    }

    /// Replaces the whole forest, e.g. with a built-in example.
    pub fn load_tree(&mut self, nodes: Tree, storage: &mut dyn StateStorage) {
        self.evaluations = self.engine.evaluate_forest(&nodes);
        self.commit(AppState::new(nodes), storage);
    }

    fn commit(&mut self, state: AppState, storage: &mut dyn StateStorage) {
        self.state = state;
        self.persist(storage);
    }

    fn persist(&self, storage: &mut dyn StateStorage) {
        if let Err(err) = storage.save(&self.state) {
            log::warn!("failed to persist state: {err}");
        }
    }
}

/// Chooses the starting state from a storage load result.
fn restored_state(
    loaded: Result<Option<AppState>, crate::persistence::PersistenceError>,
) -> AppState {
    match loaded {
        Ok(Some(state)) => {
            log::info!("restored {} node(s) from storage", tree::node_ids(&state.nodes).len());
            state
        }
        Ok(None) => AppState::default(),
        Err(err) => {
            log::warn!("{err}; starting from the default tree");
            AppState::default()
        }
    }
}

/// Starts a session from state saved in eframe storage, if any.
pub fn restore_from_eframe(
    storage: Option<&dyn eframe::Storage>,
    engine: PropagationEngine,
) -> Session {
    let loaded = match storage {
        Some(storage) => crate::persistence::load_from_eframe(storage),
        None => Ok(None),
    };
    Session::new(restored_state(loaded), engine)
}
