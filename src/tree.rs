//! Structural operations on the node forest.
//!
//! Every operation takes the whole forest and returns a new one. Targets are located
//! by depth-first search, so an unknown ID is never an error: the forest comes back
//! unchanged.

use crate::types::*;
use std::collections::HashSet;
use uuid::Uuid;

/// Replaces the code of the node with the given ID.
///
/// # Arguments
///
/// * `tree` - The forest to search
/// * `node_id` - The node whose code changes
/// * `code` - The new source text
pub fn update_node_code(tree: &[Node], node_id: NodeId, code: &str) -> Tree {
    tree.iter()
        .map(|node| {
            if node.id == node_id {
                Node {
                    code: code.to_string(),
                    ..node.clone()
                }
            } else {
                Node {
                    children: update_node_code(&node.children, node_id, code),
                    ..node.clone()
                }
            }
        })
        .collect()
}

/// Appends a pass-through child with a fresh ID to the given parent.
pub fn add_child(tree: &[Node], parent_id: NodeId) -> Tree {
    let child = Node::with_id(fresh_id(tree), crate::constants::DEFAULT_NODE_CODE);
    insert_child(tree, parent_id, child)
}

/// Appends a prepared node to the children of the given parent.
///
/// The caller is responsible for `child` carrying IDs not already in the forest.
pub fn insert_child(tree: &[Node], parent_id: NodeId, child: Node) -> Tree {
    let mut child = Some(child);
    insert_child_inner(tree, parent_id, &mut child)
}

fn insert_child_inner(tree: &[Node], parent_id: NodeId, child: &mut Option<Node>) -> Tree {
    tree.iter()
        .map(|node| {
            let mut node = node.clone();
            if node.id == parent_id {
                // IDs are unique, so the first match is the only one
                if let Some(child) = child.take() {
                    node.children.push(child);
                }
            } else if child.is_some() {
                node.children = insert_child_inner(&node.children, parent_id, child);
            }
            node
        })
        .collect()
}

/// Removes the node with the given ID together with its whole subtree.
pub fn remove_node(tree: &[Node], node_id: NodeId) -> Tree {
    tree.iter()
        .filter(|node| node.id != node_id)
        .map(|node| Node {
            children: remove_node(&node.children, node_id),
            ..node.clone()
        })
        .collect()
}

/// Finds a node anywhere in the forest.
pub fn find_node(tree: &[Node], node_id: NodeId) -> Option<&Node> {
    tree.iter().find_map(|node| {
        if node.id == node_id {
            Some(node)
        } else {
            find_node(&node.children, node_id)
        }
    })
}

/// Returns true if the forest contains the node.
pub fn contains(tree: &[Node], node_id: NodeId) -> bool {
    find_node(tree, node_id).is_some()
}

/// Finds the parent of a node. Top-level nodes have no parent.
pub fn find_parent(tree: &[Node], node_id: NodeId) -> Option<&Node> {
    tree.iter().find_map(|node| {
        if node.children.iter().any(|child| child.id == node_id) {
            Some(node)
        } else {
            find_parent(&node.children, node_id)
        }
    })
}

/// All node IDs in depth-first pre-order.
pub fn node_ids(tree: &[Node]) -> Vec<NodeId> {
    let mut ids = Vec::new();
    collect_ids(tree, &mut ids);
    ids
}

fn collect_ids(tree: &[Node], ids: &mut Vec<NodeId>) {
    for node in tree {
        ids.push(node.id);
        collect_ids(&node.children, ids);
    }
}

/// IDs of a node and all its descendants; empty if the node is absent.
pub fn subtree_ids(tree: &[Node], node_id: NodeId) -> Vec<NodeId> {
    find_node(tree, node_id)
        .map(|node| node_ids(std::slice::from_ref(node)))
        .unwrap_or_default()
}

/// Number of parent→child edges in the forest.
pub fn edge_count(tree: &[Node]) -> usize {
    tree.iter()
        .map(|node| node.children.len() + edge_count(&node.children))
        .sum()
}

/// Generates an ID not used anywhere in the forest.
pub fn fresh_id(tree: &[Node]) -> NodeId {
    let existing: HashSet<NodeId> = node_ids(tree).into_iter().collect();
    loop {
        let id = Uuid::new_v4();
        if !existing.contains(&id) {
            return id;
        }
    }
}
