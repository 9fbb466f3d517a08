//! Connector geometry derived from rendered layout.
//!
//! The renderer reports, for each node, the rectangle of its input area (the code
//! editor) and of its output area. From these the resolver builds a shadow tree of
//! anchor points and flattens it into one line segment per parent→child edge.

use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A point in the renderer's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate
    pub x: f32,
    /// Vertical coordinate
    pub y: f32,
}

impl Point {
    /// Creates a point.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl Rect {
    /// Creates a rectangle.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Midpoint of the left edge.
    pub fn left_mid(&self) -> Point {
        Point::new(self.x, self.y + self.height / 2.0)
    }

    /// Midpoint of the right edge.
    pub fn right_mid(&self) -> Point {
        Point::new(self.x + self.width, self.y + self.height / 2.0)
    }
}

/// Rendered rectangles of one node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeLayout {
    /// Area receiving the node's input
    pub input_rect: Rect,
    /// Area showing the node's output
    pub output_rect: Rect,
}

/// Supplies per-node layout after rendering.
pub trait LayoutSource {
    /// Layout of a node, or `None` if it was not rendered.
    fn layout_of(&self, node_id: NodeId) -> Option<NodeLayout>;
}

impl LayoutSource for HashMap<NodeId, NodeLayout> {
    fn layout_of(&self, node_id: NodeId) -> Option<NodeLayout> {
        self.get(&node_id).copied()
    }
}

/// A node of the shadow tree: anchors instead of code.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorNode {
    /// The node these anchors belong to
    pub id: NodeId,
    /// Left-middle of the input rectangle
    pub input_anchor: Point,
    /// Right-middle of the output rectangle
    pub output_anchor: Point,
    /// Anchors of the rendered children, in order
    pub children: Vec<AnchorNode>,
}

/// A straight connector from a parent's output anchor to a child's input anchor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConnectionSegment {
    /// Start x (parent output)
    pub x1: f32,
    /// Start y (parent output)
    pub y1: f32,
    /// End x (child input)
    pub x2: f32,
    /// End y (child input)
    pub y2: f32,
}

impl ConnectionSegment {
    /// Segment between two points.
    pub fn between(from: Point, to: Point) -> Self {
        Self {
            x1: from.x,
            y1: from.y,
            x2: to.x,
            y2: to.y,
        }
    }

    /// Start point.
    pub fn start(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    /// End point.
    pub fn end(&self) -> Point {
        Point::new(self.x2, self.y2)
    }
}

/// Builds the anchor shadow tree.
///
/// A node without layout is not on screen; it is skipped together with its subtree.
pub fn resolve_anchors(tree: &[Node], layouts: &impl LayoutSource) -> Vec<AnchorNode> {
    tree.iter()
        .filter_map(|node| {
            let layout = layouts.layout_of(node.id)?;
            Some(AnchorNode {
                id: node.id,
                input_anchor: layout.input_rect.left_mid(),
                output_anchor: layout.output_rect.right_mid(),
                children: resolve_anchors(&node.children, layouts),
            })
        })
        .collect()
}

/// Flattens the shadow tree into segments: a node's own edges first, then those of
/// each child subtree, siblings in tree order.
pub fn collect_segments(anchors: &[AnchorNode]) -> Vec<ConnectionSegment> {
    anchors
        .iter()
        .flat_map(|node| {
            node.children
                .iter()
                .map(move |child| {
                    ConnectionSegment::between(node.output_anchor, child.input_anchor)
                })
                .chain(collect_segments(&node.children))
        })
        .collect()
}

/// Resolves the full connector set for a rendered forest.
pub fn resolve_connections(tree: &[Node], layouts: &impl LayoutSource) -> Vec<ConnectionSegment> {
    collect_segments(&resolve_anchors(tree, layouts))
}
