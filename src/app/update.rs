use eframe::egui;
use flowchart_editor::PointerButton;
use flowchart_editor::model::{BorderColor, FillColor, FlowType};
use flowchart_editor::scene::Mode;

use super::FlowchartApp;
use super::render::{
    border_name, color_row, draw_background, draw_in_progress, draw_scene, fill_name,
    flow_type_name, shape_button,
};

/// Scroll distance egui reports for one wheel notch.
const POINTS_PER_NOTCH: f32 = 50.0;

/// Vertical scroll that counts toward zoom: only a bare wheel zooms, so held
/// modifiers or pointer buttons leave it at zero.
fn zoom_scroll(modifiers: egui::Modifiers, buttons_down: bool, delta: f32) -> f32 {
    if modifiers.is_none() && !buttons_down {
        delta
    } else {
        0.0
    }
}

impl eframe::App for FlowchartApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_keys(ctx);
        self.top_bar(ctx);
        self.side_panel(ctx);
        self.status_bar(ctx);
        self.canvas(ctx);
    }
}

impl FlowchartApp {
    fn handle_keys(&mut self, ctx: &egui::Context) {
        let wants_keyboard = ctx.wants_keyboard_input();
        let mut copied = None;
        let mut escape = false;
        ctx.input_mut(|i| {
            // Cmd+C/X/V arrive as events rather than key presses.
            if !wants_keyboard {
                for event in &i.events {
                    match event {
                        egui::Event::Copy => copied = self.copy_selected(),
                        egui::Event::Cut => copied = self.cut_selected(),
                        egui::Event::Paste(text) => self.paste_text(Some(text.as_str())),
                        _ => {}
                    }
                }
            }

            if i.consume_key(egui::Modifiers::COMMAND | egui::Modifiers::SHIFT, egui::Key::S) {
                self.save_json_dialog();
            }
            if i.consume_key(egui::Modifiers::COMMAND, egui::Key::S) {
                self.save_to_path();
            }
            if i.consume_key(egui::Modifiers::COMMAND, egui::Key::O) {
                self.open_json_dialog();
            }
            escape = i.key_pressed(egui::Key::Escape);
            if !wants_keyboard {
                if i.consume_key(
                    egui::Modifiers::COMMAND | egui::Modifiers::SHIFT,
                    egui::Key::Z,
                ) || i.consume_key(egui::Modifiers::COMMAND, egui::Key::Y)
                {
                    self.redo();
                } else if i.consume_key(egui::Modifiers::COMMAND, egui::Key::Z) {
                    self.undo();
                }
                if i.consume_key(egui::Modifiers::NONE, egui::Key::Delete)
                    || i.consume_key(egui::Modifiers::NONE, egui::Key::Backspace)
                {
                    self.delete_selected();
                }
            }
        });
        if let Some(text) = copied {
            ctx.copy_text(text);
        }
        if escape {
            self.editor.escape();
        }

        // Shift held arms connector drawing; typing capitals must not.
        let shift = ctx.input(|i| i.modifiers.shift);
        if shift != self.shift_down && !(shift && wants_keyboard) {
            self.shift_down = shift;
            self.editor.shift_changed(shift);
        }
    }

    fn top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("New").clicked() {
                        self.new_document();
                        ui.close();
                    }
                    if ui.button("Open... (⌘O)").clicked() {
                        self.open_json_dialog();
                        ui.close();
                    }
                    if ui.button("Save (⌘S)").clicked() {
                        self.save_to_path();
                        ui.close();
                    }
                    if ui.button("Save as... (⌘⇧S)").clicked() {
                        self.save_json_dialog();
                        ui.close();
                    }
                    ui.separator();
                    if ui.button("Import image...").clicked() {
                        self.import_image_dialog();
                        ui.close();
                    }
                    if ui.button("Set background...").clicked() {
                        self.background_dialog();
                        ui.close();
                    }
                    let has_background = self.editor.scene().background().is_some();
                    if ui
                        .add_enabled(has_background, egui::Button::new("Clear background"))
                        .clicked()
                    {
                        self.editor.clear_background();
                        ui.close();
                    }
                    ui.separator();
                    ui.small(format!("Settings: {}", self.settings_path));
                    if ui.button("Save settings").clicked() {
                        self.persist_settings();
                        ui.close();
                    }
                    if ui.button("Reload settings").clicked() {
                        self.reload_settings();
                        ui.close();
                    }
                });
                ui.menu_button("Edit", |ui| {
                    if ui
                        .add_enabled(self.editor.can_undo(), egui::Button::new("Undo (⌘Z)"))
                        .clicked()
                    {
                        self.undo();
                        ui.close();
                    }
                    if ui
                        .add_enabled(self.editor.can_redo(), egui::Button::new("Redo (⌘⇧Z)"))
                        .clicked()
                    {
                        self.redo();
                        ui.close();
                    }
                    ui.separator();
                    self.clipboard_items(ui);
                });
                ui.menu_button("Insert", |ui| {
                    for flow_type in FlowType::ALL {
                        if ui.button(flow_type_name(flow_type)).clicked() {
                            let at = self.editor.viewport_center();
                            self.editor.insert_shape(flow_type, at);
                            ui.close();
                        }
                    }
                    ui.separator();
                    if ui.button("Label").clicked() {
                        let at = self.editor.viewport_center();
                        self.editor.insert_label(at);
                        ui.close();
                    }
                });
                ui.menu_button("Format", |ui| self.style_items(ui));
                ui.menu_button("View", |ui| {
                    let center = self.editor.viewport().center();
                    if ui.button("Zoom in").clicked() {
                        self.zoom_step(center, 1.0);
                        ui.close();
                    }
                    if ui.button("Zoom out").clicked() {
                        self.zoom_step(center, -1.0);
                        ui.close();
                    }
                });
            });
        });
    }

    fn clipboard_items(&mut self, ui: &mut egui::Ui) {
        let has_selection = !self.editor.scene().selected().is_empty();
        if ui.add_enabled(has_selection, egui::Button::new("Cut")).clicked() {
            if let Some(text) = self.cut_selected() {
                ui.ctx().copy_text(text);
            }
            ui.close();
        }
        if ui.add_enabled(has_selection, egui::Button::new("Copy")).clicked() {
            if let Some(text) = self.copy_selected() {
                ui.ctx().copy_text(text);
            }
            ui.close();
        }
        if ui
            .add_enabled(self.clipboard.is_some(), egui::Button::new("Paste"))
            .clicked()
        {
            self.paste_text(None);
            ui.close();
        }
        if ui.add_enabled(has_selection, egui::Button::new("Delete")).clicked() {
            self.delete_selected();
            ui.close();
        }
    }

    fn style_items(&mut self, ui: &mut egui::Ui) {
        ui.menu_button("Fill", |ui| {
            for fill in FillColor::ALL {
                if ui.button(fill_name(fill)).clicked() {
                    let result = self.editor.set_fill_color(fill);
                    self.report(result);
                    ui.close();
                }
            }
        });
        ui.menu_button("Border", |ui| {
            for border in BorderColor::ALL {
                if ui.button(border_name(border)).clicked() {
                    let result = self.editor.set_border_color(border);
                    self.report(result);
                    ui.close();
                }
            }
        });
    }

    fn side_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("palette").resizable(false).show(ctx, |ui| {
            let mode = self.editor.scene().mode();
            ui.heading("Shapes");
            ui.small("Click to arm, or drag onto the canvas");
            for flow_type in FlowType::ALL {
                ui.horizontal(|ui| {
                    let id = egui::Id::new(("palette", flow_type.code()));
                    ui.dnd_drag_source(id, i64::from(flow_type.code()), |ui| ui.label("⠿"));
                    if shape_button(ui, flow_type, mode) {
                        let next = if mode == Mode::InsertShape(flow_type) {
                            Mode::Idle
                        } else {
                            Mode::InsertShape(flow_type)
                        };
                        self.editor.set_mode(next);
                    }
                });
            }
            if ui.selectable_label(mode == Mode::InsertLabel, "Text label").clicked() {
                self.editor.set_mode(if mode == Mode::InsertLabel {
                    Mode::Idle
                } else {
                    Mode::InsertLabel
                });
            }
            ui.small("Hold Shift and drag between shapes to connect them");

            ui.separator();
            ui.heading("Label style");
            ui.horizontal(|ui| {
                ui.add(egui::Slider::new(&mut self.label_font.size, 6.0..=72.0).text("Size"));
            });
            ui.horizontal(|ui| {
                ui.checkbox(&mut self.label_font.bold, "Bold");
                ui.checkbox(&mut self.label_font.italic, "Italic");
            });
            if ui.button("Apply font").clicked() {
                let result = self.editor.set_label_font(self.label_font.clone());
                self.report(result);
            }
            if color_row(ui, &mut self.label_color) {
                let result = self.editor.set_label_color(self.label_color);
                self.report(result);
            }

            ui.separator();
            ui.heading("Find");
            let query = ui.text_edit_singleline(&mut self.find_query);
            if query.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                self.run_find();
            }
            ui.horizontal(|ui| {
                if ui.button("Find").clicked() {
                    self.run_find();
                }
                if ui.button("◀").clicked() && self.editor.find_previous().is_none() {
                    self.status = Some("No matches".to_string());
                }
                if ui.button("▶").clicked() && self.editor.find_next().is_none() {
                    self.status = Some("No matches".to_string());
                }
                if ui.button("All").clicked() {
                    let n = self.editor.select_all_matches();
                    self.status = Some(format!("Selected {n} match(es)"));
                }
            });
            ui.label("Replace with:");
            ui.text_edit_singleline(&mut self.replace_text);
            if ui.button("Replace selected").clicked() {
                self.replace_selected();
            }
        });
    }

    fn status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some(status) = &self.status {
                    ui.label(status);
                } else {
                    ui.label("Ready");
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let scene = self.editor.scene();
                    let objects = scene.shapes().len()
                        + scene.connectors().len()
                        + scene.labels().len()
                        + scene.pixmaps().len();
                    ui.label(format!("Zoom: {:.0}%", self.editor.view().zoom * 100.0));
                    ui.separator();
                    ui.label(format!("Objects: {objects}"));
                    ui.separator();
                    ui.label(format!("Selected: {}", scene.selected().len()));
                    ui.separator();
                    ui.label(mode_name(scene.mode()));
                });
            });
        });
    }

    fn canvas(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let (rect, response) =
                ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
            self.editor.set_viewport(rect);

            let (pointer, press_origin, toggle) = ctx.input(|i| {
                (
                    i.pointer.latest_pos(),
                    i.pointer.press_origin(),
                    i.modifiers.command || i.modifiers.ctrl,
                )
            });
            let pressed = |b: egui::PointerButton| ctx.input(|i| i.pointer.button_pressed(b));
            let released = |b: egui::PointerButton| ctx.input(|i| i.pointer.button_released(b));

            if response.hovered() {
                let start = press_origin.or(pointer);
                if let Some(p) = start.filter(|_| pressed(egui::PointerButton::Primary)) {
                    self.primary_down = true;
                    self.editor.pointer_pressed(PointerButton::Primary, p, toggle);
                }
                if let Some(p) = start.filter(|_| pressed(egui::PointerButton::Middle)) {
                    self.middle_down = true;
                    self.editor.pointer_pressed(PointerButton::Middle, p, false);
                }
            }
            if let Some(p) = pointer {
                if self.last_pointer != Some(p) {
                    self.last_pointer = Some(p);
                    if self.primary_down || self.middle_down {
                        self.editor.pointer_moved(p);
                    }
                }
            }
            if let Some(p) = pointer {
                if self.primary_down && released(egui::PointerButton::Primary) {
                    self.primary_down = false;
                    self.editor.pointer_released(PointerButton::Primary, p);
                }
                if self.middle_down && released(egui::PointerButton::Middle) {
                    self.middle_down = false;
                    self.editor.pointer_released(PointerButton::Middle, p);
                }
                if response.double_clicked() {
                    self.editor.double_clicked(p);
                }
                if let Some(code) = response.dnd_release_payload::<i64>() {
                    let at = self.editor.to_scene(p);
                    if self.editor.insert_shape_code(*code, at).is_none() {
                        self.status = Some(format!("Unknown shape code {code}"));
                    }
                }
            }

            let scroll = ctx.input(|i| {
                zoom_scroll(i.modifiers, i.pointer.any_down(), i.raw_scroll_delta.y)
            });
            if scroll != 0.0 && response.hovered() {
                self.scroll_accum += scroll;
            }
            if let Some(p) = pointer {
                while self.scroll_accum.abs() >= POINTS_PER_NOTCH {
                    let notch = self.scroll_accum.signum();
                    self.scroll_accum -= notch * POINTS_PER_NOTCH;
                    self.zoom_step(p, notch);
                }
            }

            let painter = ui.painter_at(rect);
            draw_background(&painter, rect, &self.editor, &mut self.textures);
            draw_scene(&painter, &self.editor, &mut self.textures);
            draw_in_progress(&painter, &self.editor, rect);

            self.inline_editor(ctx);

            response.context_menu(|ui| {
                self.clipboard_items(ui);
                ui.separator();
                self.style_items(ui);
            });

            if self.editor.is_panning() {
                ctx.set_cursor_icon(egui::CursorIcon::Grabbing);
            } else if self.editor.scene().mode() != Mode::Idle && response.hovered() {
                ctx.set_cursor_icon(egui::CursorIcon::Crosshair);
            }
        });
    }

    fn zoom_step(&mut self, screen: egui::Pos2, direction: f32) {
        if !self.editor.wheel(screen, direction) {
            self.status = Some("Zoom limit reached".to_string());
        }
    }

    /// Text box over the label being edited; every keystroke updates the draft.
    fn inline_editor(&mut self, ctx: &egui::Context) {
        let scene = self.editor.scene();
        let Some(label) = scene.editing_label().and_then(|id| scene.label(id)) else {
            return;
        };
        let id = label.id;
        let zoom = self.editor.view().zoom;
        let bounds = label.scene_bounds();
        let min = self.editor.to_screen(bounds.min);
        let width = (bounds.width() * zoom).max(80.0);
        let font = egui::FontId::proportional((label.font.size * zoom).max(6.0));
        let mut draft = label.shown_text().to_string();

        egui::Area::new(egui::Id::new("inline_label_edit"))
            .fixed_pos(min)
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                let frame = egui::Frame::new()
                    .fill(egui::Color32::from_rgba_unmultiplied(255, 255, 255, 240))
                    .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(90, 160, 255)))
                    .inner_margin(4.0);
                frame.show(ui, |ui| {
                    let response = ui.add(
                        egui::TextEdit::multiline(&mut draft)
                            .font(font)
                            .desired_width(width)
                            .desired_rows(1)
                            .frame(false),
                    );
                    if response.changed() {
                        self.editor.set_draft(id, draft.clone());
                    }
                    response.request_focus();
                });
            });
    }
}

fn mode_name(mode: Mode) -> &'static str {
    match mode {
        Mode::Idle => "Select",
        Mode::InsertShape(flow_type) => flow_type_name(flow_type),
        Mode::InsertConnector => "Connect",
        Mode::InsertLabel => "Label",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_a_bare_wheel_zooms() {
        assert_eq!(zoom_scroll(egui::Modifiers::NONE, false, 50.0), 50.0);
        assert_eq!(zoom_scroll(egui::Modifiers::COMMAND, false, 50.0), 0.0);
        assert_eq!(zoom_scroll(egui::Modifiers::SHIFT, false, -50.0), 0.0);
        assert_eq!(zoom_scroll(egui::Modifiers::NONE, true, 50.0), 0.0);
    }
}
