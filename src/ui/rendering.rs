//! Rendering of node cards and connectors.
//!
//! Nodes are drawn as cards laid out left to right: each card is followed by the
//! column of its children. While drawing, every card reports the rectangle of its
//! code editor (input side) and of its output preview (output side); once the whole
//! forest is drawn those rectangles feed the connector geometry.

use super::state::{NodeFlowApp, UiRequest};
use crate::constants::*;
use crate::geometry::{self, ConnectionSegment, NodeLayout};
use crate::propagation::{EditEvent, NodeState, RejectReason};
use crate::types::*;
use eframe::egui;
use std::collections::HashMap;

impl NodeFlowApp {
    /// Draws the whole forest followed by the connectors between cards.
    ///
    /// # Arguments
    ///
    /// * `ui` - The egui UI inside the scrollable canvas
    /// * `now` - Input time in seconds, used to stamp edits for debouncing
    /// * `requests` - Collects structural changes requested by buttons
    pub fn draw_forest(&mut self, ui: &mut egui::Ui, now: f64, requests: &mut Vec<UiRequest>) {
        let nodes = self.session.state().nodes.clone();
        let mut layouts = HashMap::new();

        ui.vertical(|ui| {
            for (index, node) in nodes.iter().enumerate() {
                self.draw_subtree(ui, node, 1, index, now, &mut layouts, requests);
                ui.add_space(SIBLING_SPACING);
            }
        });

        let segments = geometry::resolve_connections(&nodes, &layouts);
        let color = ui.visuals().text_color();
        draw_connections(ui.painter(), &segments, color);
        self.layouts = layouts;
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_subtree(
        &mut self,
        ui: &mut egui::Ui,
        node: &Node,
        level: usize,
        index: usize,
        now: f64,
        layouts: &mut HashMap<NodeId, NodeLayout>,
        requests: &mut Vec<UiRequest>,
    ) {
        ui.horizontal_top(|ui| {
            self.draw_node_card(ui, node, level, index, now, layouts, requests);

            if !node.is_leaf() {
                ui.add_space(LEVEL_SPACING);
                ui.vertical(|ui| {
                    for (child_index, child) in node.children.iter().enumerate() {
                        let level = level + 1;
                        self.draw_subtree(ui, child, level, child_index, now, layouts, requests);
                        ui.add_space(SIBLING_SPACING);
                    }
                });
            }
        });
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_node_card(
        &mut self,
        ui: &mut egui::Ui,
        node: &Node,
        level: usize,
        index: usize,
        now: f64,
        layouts: &mut HashMap<NodeId, NodeLayout>,
        requests: &mut Vec<UiRequest>,
    ) {
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.set_width(NODE_WIDTH);
            ui.vertical(|ui| {
                ui.horizontal(|ui| {
                    ui.strong(format!("Node {level}.{index}"));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("🗑").on_hover_text("Remove node").clicked() {
                            requests.push(UiRequest::Remove(node.id));
                        }
                        if ui.small_button("+").on_hover_text("Add child").clicked() {
                            requests.push(UiRequest::AddChild(node.id));
                        }
                    });
                });

                let editor_rect = self.draw_code_editor(ui, node, now);

                ui.separator();

                let evaluation = self.session.evaluations().get(node.id);
                let input = evaluation
                    .and_then(|e| e.input.as_ref())
                    .filter(|input| !input.is_null());
                if let Some(input) = input {
                    ui.horizontal(|ui| {
                        ui.label("Input");
                        ui.code(input.to_string());
                    });
                }

                let state = evaluation.map(|e| &e.state).unwrap_or(&NodeState::Unevaluated);
                let output_rect = ui
                    .horizontal(|ui| {
                        ui.label("Output");
                        draw_output(ui, state);
                    })
                    .response
                    .rect;

                layouts.insert(
                    node.id,
                    NodeLayout {
                        input_rect: to_geometry_rect(editor_rect),
                        output_rect: to_geometry_rect(output_rect),
                    },
                );
            });
        });
    }

    /// Draws the code editor of a node and queues an edit when its text changes.
    ///
    /// # Returns
    ///
    /// The screen rectangle of the editor.
    fn draw_code_editor(&mut self, ui: &mut egui::Ui, node: &Node, now: f64) -> egui::Rect {
        let editor_id = editor_id(node.id);

        let restore = self
            .editors
            .pending_focus
            .as_ref()
            .filter(|focus| focus.node_id == Some(node.id))
            .map(|focus| focus.position);
        if let Some(Some(position)) = restore {
            set_cursor_position(ui, editor_id, position);
        }

        let buffer = self
            .editors
            .buffers
            .entry(node.id)
            .or_insert_with(|| node.code.clone());
        let response = ui.add(
            egui::TextEdit::multiline(buffer)
                .id(editor_id)
                .code_editor()
                .desired_rows(EDITOR_ROWS)
                .desired_width(f32::INFINITY),
        );

        if restore.is_some() {
            response.request_focus();
            self.editors.pending_focus = None;
        }

        if response.changed() {
            self.editors.rejections.remove(&node.id);
            self.editors.debouncer.push(
                node.id,
                EditEvent {
                    node_id: node.id,
                    code: buffer.clone(),
                    cursor: cursor_position(ui, editor_id),
                },
                now,
            );
        }

        if *buffer != node.code && !self.editors.debouncer.is_pending_for(&node.id) {
            let hint = match self.editors.rejections.get(&node.id) {
                Some(RejectReason::Failed(reason)) => format!("Not applied: {reason}"),
                Some(RejectReason::NoValue) => "Not applied: no value returned".to_string(),
                None => "Not applied".to_string(),
            };
            ui.label(egui::RichText::new(hint).small().color(ui.visuals().warn_fg_color));
        }

        response.rect
    }
}

fn draw_output(ui: &mut egui::Ui, state: &NodeState) {
    match state {
        NodeState::Evaluated(value) => {
            ui.code(value.to_string());
        }
        NodeState::Empty => {
            ui.weak("undefined");
        }
        NodeState::Failed(reason) => {
            ui.label(egui::RichText::new(reason).color(ui.visuals().error_fg_color));
        }
        NodeState::Unevaluated => {
            ui.weak("not evaluated");
        }
    }
}

/// Paints each segment as a line with a dot at both ends.
pub fn draw_connections(
    painter: &egui::Painter,
    segments: &[ConnectionSegment],
    color: egui::Color32,
) {
    let stroke = egui::Stroke::new(CONNECTOR_STROKE_WIDTH, color);
    for segment in segments {
        let start = egui::pos2(segment.x1, segment.y1);
        let end = egui::pos2(segment.x2, segment.y2);
        painter.line_segment([start, end], stroke);
        painter.circle_filled(start, ANCHOR_RADIUS, color);
        painter.circle_filled(end, ANCHOR_RADIUS, color);
    }
}

/// Stable egui ID of a node's code editor.
pub fn editor_id(node_id: NodeId) -> egui::Id {
    egui::Id::new(("node_editor", node_id))
}

fn cursor_position(ui: &egui::Ui, id: egui::Id) -> Option<usize> {
    ui.memory(|mem| {
        mem.data
            .get_temp::<egui::text_edit::TextEditState>(id)
            .and_then(|s| s.cursor.char_range())
            .map(|r| r.primary.index)
    })
}

fn set_cursor_position(ui: &mut egui::Ui, id: egui::Id, position: usize) {
    ui.memory_mut(|mem| {
        let state = mem
            .data
            .get_temp_mut_or_default::<egui::text_edit::TextEditState>(id);
        state
            .cursor
            .set_char_range(Some(egui::text::CCursorRange::one(egui::text::CCursor::new(
                position,
            ))));
    });
}

fn to_geometry_rect(rect: egui::Rect) -> geometry::Rect {
    geometry::Rect::new(rect.min.x, rect.min.y, rect.width(), rect.height())
}
