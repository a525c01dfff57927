use eframe::egui;
use flowchart_editor::document::{ClipboardPayload, DocumentRecord};
use flowchart_editor::settings;
use flowchart_editor::Result;

use super::FlowchartApp;

impl FlowchartApp {
    /// Shows an engine error as the status notice.
    pub(super) fn report<T>(&mut self, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.status = Some(e.to_string());
                None
            }
        }
    }

    /// Scene point new content lands on: the pointer if it is over the canvas.
    pub(super) fn drop_point(&self) -> egui::Pos2 {
        match self.last_pointer {
            Some(p) if self.editor.viewport().contains(p) => self.editor.to_scene(p),
            _ => self.editor.viewport_center(),
        }
    }

    pub(super) fn undo(&mut self) {
        let result = self.editor.undo();
        if self.report(result).is_some() {
            self.status = None;
        }
    }

    pub(super) fn redo(&mut self) {
        let result = self.editor.redo();
        if self.report(result).is_some() {
            self.status = None;
        }
    }

    pub(super) fn delete_selected(&mut self) {
        let removed = self.editor.delete_selection();
        if removed > 0 {
            self.status = Some(format!("Deleted {removed} item(s)"));
        }
    }

    pub(super) fn copy_selected(&mut self) -> Option<String> {
        let payload = self.editor.copy_selection();
        self.store_payload(&payload)
    }

    pub(super) fn cut_selected(&mut self) -> Option<String> {
        let payload = self.editor.cut_selection();
        self.store_payload(&payload)
    }

    fn store_payload(&mut self, payload: &ClipboardPayload) -> Option<String> {
        if payload.is_empty() {
            self.status = Some("Nothing selected to copy".to_string());
            return None;
        }
        let text = self.report(payload.to_text())?;
        self.status = Some(format!("Copied {} record(s)", payload.records.len()));
        self.clipboard = Some(text.clone());
        Some(text)
    }

    /// Pastes clipboard text, falling back to the last copy made in this window.
    pub(super) fn paste_text(&mut self, text: Option<&str>) {
        let Some(text) = text.map(str::to_string).or_else(|| self.clipboard.clone()) else {
            self.status = Some("Nothing in clipboard to paste".to_string());
            return;
        };
        let Some(payload) = self.report(ClipboardPayload::from_text(&text)) else {
            return;
        };
        let drop = self.drop_point();
        let ids = self.editor.paste(&payload, drop);
        self.status = Some(format!("Pasted {} item(s)", ids.len()));
    }

    pub(super) fn new_document(&mut self) {
        self.editor.load_document(DocumentRecord::default());
        self.status = Some("New document".to_string());
    }

    pub(super) fn save_to_path(&mut self) {
        let path = self.file_path.clone();
        let result = self.editor.save_to_path(&path);
        if self.report(result).is_some() {
            self.status = Some(format!("Saved {path}"));
        }
    }

    pub(super) fn save_json_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .set_file_name(&self.file_path)
            .add_filter("JSON", &["json"])
            .save_file()
        {
            self.file_path = path.display().to_string();
            self.save_to_path();
        }
    }

    pub(super) fn open_json_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .pick_file()
        {
            let path_str = path.display().to_string();
            let result = self.editor.load_from_path(&path);
            if let Some(skipped) = self.report(result) {
                self.file_path = path_str.clone();
                self.status = Some(if skipped == 0 {
                    format!("Loaded {path_str}")
                } else {
                    format!("Loaded {path_str} ({skipped} record(s) skipped)")
                });
            }
        }
    }

    pub(super) fn import_image_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG", &["png"])
            .pick_file()
        {
            let at = self.editor.viewport_center();
            let result = self.editor.import_pixmap(&path, at);
            if self.report(result).is_some() {
                self.status = Some(format!("Imported {}", path.display()));
            }
        }
    }

    pub(super) fn background_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG", &["png"])
            .pick_file()
        {
            let result = self.editor.set_background(&path);
            if self.report(result).is_some() {
                self.status = Some(format!("Background {}", path.display()));
            }
        }
    }

    pub(super) fn run_find(&mut self) {
        let found = self.editor.find_text(&self.find_query);
        self.status = Some(match found {
            0 => format!("No label reads \"{}\"", self.find_query),
            n => format!("{n} match(es)"),
        });
    }

    pub(super) fn replace_selected(&mut self) {
        let text = self.replace_text.clone();
        let result = self.editor.replace_selected_text(&text);
        if let Some(changed) = self.report(result) {
            self.status = Some(format!("Replaced {changed} label(s)"));
        }
    }

    pub(super) fn persist_settings(&mut self) {
        let mut snapshot = self.editor.settings().clone();
        snapshot.file_path = self.file_path.clone();
        snapshot.label_font = self.label_font.clone();
        let path = self.settings_path.clone();
        if self.report(settings::save_settings(&path, &snapshot)).is_some() {
            self.editor.apply_settings(snapshot);
            self.status = Some(format!("Settings saved to {path}"));
        }
    }

    pub(super) fn reload_settings(&mut self) {
        let settings = settings::load_settings(&self.settings_path)
            .or_else(|| settings::load_settings("flowchart.json"))
            .unwrap_or_default();
        self.file_path = settings.file_path.clone();
        self.label_font = settings.label_font.clone();
        self.editor.apply_settings(settings);
        self.status = Some("Settings reloaded".to_string());
    }
}
