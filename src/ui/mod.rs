//! User interface for the node flow editor.
//!
//! This module contains the eframe application, the frame driver and the handling of
//! structural requests raised while drawing.
//!
//! # Module Organization
//!
//! - `state` - The main `NodeFlowApp` and editor bookkeeping
//! - `rendering` - Drawing node cards, editors and connectors

mod rendering;
mod state;


pub use rendering::{draw_connections, editor_id};
pub use state::{EditorState, NodeFlowApp, UiRequest};

use crate::examples;
use crate::persistence::{EframeStorage, StateStorage};
use crate::session::EditOutcome;
use eframe::egui;

impl eframe::App for NodeFlowApp {
    /// Persist settings between restarts. The forest itself is saved on every commit.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        self.settings.save(storage);
    }

    /// Main update function called by egui for each frame.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The egui context
    /// * `frame` - The eframe frame, providing persistent storage when available
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        let visuals = if self.settings.dark_mode {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        };
        ctx.set_visuals(visuals);

        match frame.storage_mut() {
            Some(storage) => {
                let mut storage = EframeStorage::new(storage);
                self.show(ctx, &mut storage);
            }
            None => {
                let mut storage = std::mem::take(&mut self.fallback_storage);
                self.show(ctx, &mut storage);
                self.fallback_storage = storage;
            }
        }
    }
}

impl NodeFlowApp {
    /// Runs one frame: applies due edits, draws the UI and applies the requests
    /// raised while drawing.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The egui context
    /// * `storage` - Where committed state is written
    pub fn show(&mut self, ctx: &egui::Context, storage: &mut dyn StateStorage) {
        let now = ctx.input(|i| i.time);
        self.apply_due_edits(now, storage);

        let mut requests = Vec::new();

        egui::TopBottomPanel::top("top_toolbar").show(ctx, |ui| {
            self.draw_toolbar(ui, &mut requests);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::both()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    self.draw_forest(ui, now, &mut requests);
                });
        });

        self.handle_requests(requests, storage);

        if let Some(remaining) = self.editors.debouncer.next_deadline_in(now) {
            ctx.request_repaint_after(remaining);
        }
    }

    /// Evaluates every edit whose debounce window has closed.
    pub fn apply_due_edits(&mut self, now: f64, storage: &mut dyn StateStorage) {
        for edit in self.editors.debouncer.poll(now) {
            let node_id = edit.node_id;
            let code = edit.code.clone();
            match self.session.apply_edit(edit, storage) {
                EditOutcome::Committed => {
                    self.editors.rejections.remove(&node_id);
                    self.editors.buffers.insert(node_id, code);
                }
                EditOutcome::Rejected(reason) => {
                    self.editors.rejections.insert(node_id, reason);
                }
                EditOutcome::UnknownNode => {
                    self.editors.buffers.remove(&node_id);
                }
            }
        }
    }

    /// Applies structural changes collected during a frame.
    pub fn handle_requests(&mut self, requests: Vec<UiRequest>, storage: &mut dyn StateStorage) {
        if requests.is_empty() {
            return;
        }

        for request in requests {
            match request {
                UiRequest::AddChild(parent_id) => {
                    if self.session.add_child(parent_id, storage).is_some() {
                        self.editors.pending_focus = Some(self.session.state().focus.clone());
                    }
                }
                UiRequest::Remove(node_id) => {
                    self.session.remove_node(node_id, storage);
                }
                UiRequest::AddRoot => {
                    self.session.add_root(storage);
                    self.editors.pending_focus = Some(self.session.state().focus.clone());
                }
                UiRequest::LoadExample(kind) => {
                    self.session.load_tree(examples::build_example(kind), storage);
                }
            }
        }

        self.editors.retain_nodes(&self.session.state().nodes);
    }

    fn draw_toolbar(&mut self, ui: &mut egui::Ui, requests: &mut Vec<UiRequest>) {
        ui.horizontal(|ui| {
            if ui.button("Add pipeline").clicked() {
                requests.push(UiRequest::AddRoot);
            }

            ui.menu_button("Examples", |ui| {
                for info in examples::all_examples() {
                    if ui.button(info.name).clicked() {
                        requests.push(UiRequest::LoadExample(info.kind));
                        ui.close();
                    }
                }
            });

            ui.separator();

            ui.checkbox(&mut self.settings.dark_mode, "Dark mode");

            ui.label("Delay");
            let delay = ui
                .add(
                    egui::DragValue::new(&mut self.settings.debounce_ms)
                        .range(0..=5000)
                        .speed(10)
                        .suffix(" ms"),
                )
                .on_hover_text("Quiet period after typing before an edit is evaluated");
            if delay.changed() {
                self.editors.apply_settings(&self.settings);
            }

            if ui
                .checkbox(&mut self.settings.accept_void_results, "Commit undefined results")
                .on_hover_text("Apply edits whose code runs but returns nothing")
                .changed()
            {
                self.session.set_engine(self.settings.engine());
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if self.editors.debouncer.is_pending() {
                    ui.weak("Evaluating…");
                } else if !self.editors.rejections.is_empty() {
                    ui.colored_label(
                        ui.visuals().warn_fg_color,
                        format!("{} edit(s) not applied", self.editors.rejections.len()),
                    );
                }
            });
        });
    }
}
