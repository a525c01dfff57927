//! Host-facing entry point tying the scene, the view and the history together.
//!
//! Pointer entry points take screen positions inside the viewport; everything
//! else takes scene positions. Every operation drains the commands the scene
//! produced into the history.

use crate::command::Command;
use crate::document::{ClipboardPayload, DocumentRecord, EntityRecord};
use crate::error::{EditorError, Result};
use crate::history::History;
use crate::model::{
    Background, BorderColor, EntityId, FillColor, FlowType, FontSpec, Pixmap, Rgba,
};
use crate::scene::{Mode, Scene, SceneConfig};
use crate::settings::EditorSettings;
use crate::view::View;
use eframe::egui;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
}

#[derive(Clone, Copy, Debug)]
struct PanDrag {
    last: egui::Pos2,
    total: egui::Vec2,
}

#[derive(Clone, Debug, Default)]
struct FindState {
    query: String,
    matches: Vec<EntityId>,
    cursor: usize,
}

#[derive(Debug)]
pub struct Editor {
    scene: Scene,
    view: View,
    history: History,
    settings: EditorSettings,
    viewport: egui::Rect,
    pan_drag: Option<PanDrag>,
    find: FindState,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}

impl Editor {
    pub fn new(settings: EditorSettings) -> Self {
        let mut editor = Self {
            scene: Scene::new(SceneConfig::from(&settings)),
            view: View::default(),
            history: History::with_limit(settings.history_limit),
            settings,
            viewport: egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(1280.0, 800.0)),
            pan_drag: None,
            find: FindState::default(),
        };
        editor.sync_view_context();
        editor
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn apply_settings(&mut self, settings: EditorSettings) {
        self.scene.set_config(SceneConfig::from(&settings));
        self.history.set_limit(settings.history_limit);
        self.settings = settings;
    }

    pub fn viewport(&self) -> egui::Rect {
        self.viewport
    }

    /// Screen rectangle the canvas occupies.
    pub fn set_viewport(&mut self, viewport: egui::Rect) {
        if self.viewport != viewport {
            self.viewport = viewport;
            self.sync_view_context();
        }
    }

    pub fn to_scene(&self, screen: egui::Pos2) -> egui::Pos2 {
        self.view.screen_to_world(self.viewport.min, screen)
    }

    pub fn to_screen(&self, scene: egui::Pos2) -> egui::Pos2 {
        self.view.world_to_screen(self.viewport.min, scene)
    }

    /// Scene point at the middle of the viewport.
    pub fn viewport_center(&self) -> egui::Pos2 {
        self.to_scene(self.viewport.center())
    }

    fn sync_view_context(&mut self) {
        let visible = self.view.visible_world_rect(self.viewport);
        self.scene.set_view_context(visible, 6.0 / self.view.zoom);
    }

    /// Moves commands the scene produced into the history.
    fn flush(&mut self) {
        for command in self.scene.take_commands() {
            self.history.add(command);
        }
    }

    // ---- pointer and keys ----

    pub fn pointer_pressed(&mut self, button: PointerButton, screen: egui::Pos2, toggle: bool) {
        match button {
            PointerButton::Primary => {
                let p = self.to_scene(screen);
                self.scene.pointer_down(p, toggle);
                self.flush();
            }
            PointerButton::Middle => {
                self.pan_drag = Some(PanDrag {
                    last: screen,
                    total: egui::Vec2::ZERO,
                });
            }
        }
    }

    pub fn pointer_moved(&mut self, screen: egui::Pos2) {
        if let Some(drag) = &mut self.pan_drag {
            let delta = (screen - drag.last) / self.view.zoom;
            drag.last = screen;
            drag.total += delta;
            self.view.pan_by_world(delta);
            self.sync_view_context();
            return;
        }
        let p = self.to_scene(screen);
        self.scene.pointer_move(p);
        self.flush();
    }

    pub fn pointer_released(&mut self, button: PointerButton, screen: egui::Pos2) {
        match button {
            PointerButton::Primary => {
                let p = self.to_scene(screen);
                self.scene.pointer_up(p);
                self.flush();
            }
            PointerButton::Middle => {
                self.pointer_moved(screen);
                if let Some(drag) = self.pan_drag.take() {
                    if drag.total != egui::Vec2::ZERO {
                        self.history.add(Command::Pan { delta: drag.total });
                    }
                }
            }
        }
    }

    pub fn is_panning(&self) -> bool {
        self.pan_drag.is_some()
    }

    pub fn double_clicked(&mut self, screen: egui::Pos2) {
        let p = self.to_scene(screen);
        self.scene.double_click(p);
        self.flush();
    }

    pub fn shift_changed(&mut self, held: bool) {
        if held {
            self.scene.shift_pressed();
        } else {
            self.scene.shift_released();
        }
    }

    pub fn escape(&mut self) {
        self.scene.escape();
        self.flush();
    }

    pub fn delete_selection(&mut self) -> usize {
        let removed = self.scene.delete_selection();
        self.flush();
        removed
    }

    /// Zooms a single step about the pointer: in for a positive `direction`,
    /// out for a negative one. Callers split larger scrolls into notches.
    /// Returns `false` when the step would leave the allowed scale range.
    pub fn wheel(&mut self, screen: egui::Pos2, direction: f32) -> bool {
        if direction == 0.0 {
            return false;
        }
        let zoom_in = direction > 0.0;
        let step = self.settings.zoom_step;
        let factor = if zoom_in { step } else { 1.0 / step };
        let target = self.view.zoom * factor;
        if !(self.settings.min_scale..=self.settings.max_scale).contains(&target) {
            debug!(target, "zoom refused");
            return false;
        }
        let anchor = self.to_scene(screen);
        self.view.zoom_about_world_point(anchor, factor);
        self.history.add(Command::Zoom {
            zoom_in,
            multiplier: step,
            anchor,
        });
        self.sync_view_context();
        true
    }

    // ---- insertion ----

    pub fn set_mode(&mut self, mode: Mode) {
        self.scene.set_mode(mode);
    }

    pub fn insert_shape(&mut self, flow_type: FlowType, at: egui::Pos2) -> EntityId {
        let id = self.scene.add_shape(flow_type, at);
        self.flush();
        id
    }

    /// Insertion by toolbar code, as carried by a drag from the shape palette.
    pub fn insert_shape_code(&mut self, code: i64, at: egui::Pos2) -> Option<EntityId> {
        let Some(flow_type) = FlowType::from_code(code) else {
            warn!(code, "ignoring drop of unknown shape code");
            return None;
        };
        Some(self.insert_shape(flow_type, at))
    }

    pub fn insert_label(&mut self, at: egui::Pos2) -> EntityId {
        let id = self.scene.add_label(at);
        self.flush();
        id
    }

    pub fn connect(&mut self, start: EntityId, end: EntityId) -> Option<EntityId> {
        let id = self.scene.connect(start, end);
        self.flush();
        id
    }

    pub fn import_pixmap(&mut self, path: impl AsRef<Path>, at: egui::Pos2) -> Result<EntityId> {
        let path = path.as_ref().to_path_buf();
        let natural = image_size(&path)?;
        let id = self.scene.add_pixmap(Pixmap::new(path, natural, at));
        self.flush();
        Ok(id)
    }

    pub fn set_background(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        let natural = image_size(&path)?;
        self.scene.change_background(Some(Background { path, natural }));
        self.flush();
        Ok(())
    }

    pub fn clear_background(&mut self) {
        self.scene.change_background(None);
        self.flush();
    }

    // ---- selection edits ----

    pub fn select_only(&mut self, id: EntityId) {
        self.scene.select_only(id);
    }

    pub fn select_all_of(&mut self, ids: impl IntoIterator<Item = EntityId>) {
        self.scene.select_all_of(ids);
    }

    pub fn begin_edit(&mut self, label: EntityId) {
        self.scene.begin_edit(label);
        self.flush();
    }

    pub fn set_draft(&mut self, label: EntityId, text: String) {
        self.scene.set_draft(label, text);
    }

    pub fn set_fill_color(&mut self, fill: FillColor) -> Result<()> {
        let count = self.scene.recolor_selected(Some(fill), None);
        self.flush();
        require(count, "shape")
    }

    pub fn set_border_color(&mut self, border: BorderColor) -> Result<()> {
        let count = self.scene.recolor_selected(None, Some(border));
        self.flush();
        require(count, "shape")
    }

    pub fn set_label_font(&mut self, font: FontSpec) -> Result<()> {
        let count = self.scene.restyle_selected_labels(Some(font), None);
        self.flush();
        require(count, "label")
    }

    pub fn set_label_color(&mut self, color: Rgba) -> Result<()> {
        let count = self.scene.restyle_selected_labels(None, Some(color));
        self.flush();
        require(count, "label")
    }

    // ---- find and replace ----

    /// Collects labels whose text equals `query` and selects the first. An
    /// empty query matches nothing.
    pub fn find_text(&mut self, query: &str) -> usize {
        let matches: Vec<EntityId> = self
            .scene
            .labels()
            .iter()
            .filter(|l| !query.is_empty() && l.text == query)
            .map(|l| l.id)
            .collect();
        self.find = FindState {
            query: query.to_string(),
            matches,
            cursor: 0,
        };
        self.focus_match();
        self.find.matches.len()
    }

    pub fn find_next(&mut self) -> Option<EntityId> {
        self.step_match(1)
    }

    pub fn find_previous(&mut self) -> Option<EntityId> {
        self.step_match(-1)
    }

    pub fn select_all_matches(&mut self) -> usize {
        self.prune_matches();
        self.scene.select_all_of(self.find.matches.iter().copied());
        self.find.matches.len()
    }

    /// Sets the text of every selected label to `new` as one undoable step.
    pub fn replace_selected_text(&mut self, new: &str) -> Result<usize> {
        let count = self.scene.replace_selected_text(new);
        self.flush();
        if count == 0 && !self.scene.selected().iter().any(|id| self.scene.label(*id).is_some()) {
            return Err(EditorError::EmptySelection("label"));
        }
        Ok(count)
    }

    /// Drops matches deleted or edited away since the search.
    fn prune_matches(&mut self) {
        let scene = &self.scene;
        let query = &self.find.query;
        self.find
            .matches
            .retain(|id| scene.label(*id).is_some_and(|l| &l.text == query));
        if self.find.cursor >= self.find.matches.len() {
            self.find.cursor = 0;
        }
    }

    fn step_match(&mut self, step: isize) -> Option<EntityId> {
        self.prune_matches();
        let n = self.find.matches.len();
        if n == 0 {
            return None;
        }
        let n = n as isize;
        self.find.cursor = (self.find.cursor as isize + step).rem_euclid(n) as usize;
        self.focus_match()
    }

    fn focus_match(&mut self) -> Option<EntityId> {
        let id = self.find.matches.get(self.find.cursor).copied()?;
        self.scene.select_only(id);
        Some(id)
    }

    // ---- clipboard ----

    pub fn copy_selection(&self) -> ClipboardPayload {
        self.scene.copy_selection()
    }

    pub fn cut_selection(&mut self) -> ClipboardPayload {
        let payload = self.scene.copy_selection();
        self.delete_selection();
        payload
    }

    pub fn paste(&mut self, payload: &ClipboardPayload, drop: egui::Pos2) -> Vec<EntityId> {
        let ids = self.scene.paste(payload, drop);
        self.flush();
        ids
    }

    // ---- documents ----

    pub fn enumerate_entities(&self) -> DocumentRecord {
        self.scene.enumerate_entities()
    }

    pub fn rebuild_entity(&mut self, record: &EntityRecord) -> bool {
        let applied = self.scene.rebuild_entity(record);
        // Rebuilding is not an edit.
        self.scene.take_commands();
        applied
    }

    /// Replaces the scene and forgets all history. Returns skipped records.
    pub fn load_document(&mut self, doc: DocumentRecord) -> usize {
        let skipped = self.scene.load_document(doc);
        self.scene.take_commands();
        self.history.clear_all();
        self.find = FindState::default();
        skipped
    }

    pub fn save_to_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self.enumerate_entities().to_json()?;
        std::fs::write(path, text)?;
        self.mark_saved();
        info!(path = %path.display(), "saved document");
        Ok(())
    }

    pub fn load_from_path(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let doc = DocumentRecord::from_json(&text)?;
        let skipped = self.load_document(doc);
        info!(path = %path.display(), skipped, "opened document");
        Ok(skipped)
    }

    pub fn mark_saved(&mut self) {
        self.history.clear_all();
    }

    // ---- history ----

    pub fn undo(&mut self) -> Result<()> {
        self.scene.commit_edits_except(None);
        self.flush();
        self.history.undo(&mut self.scene, &mut self.view)?;
        self.sync_view_context();
        Ok(())
    }

    pub fn redo(&mut self) -> Result<()> {
        self.scene.commit_edits_except(None);
        self.flush();
        self.history.redo(&mut self.scene, &mut self.view)?;
        self.sync_view_context();
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }
}

fn require(count: usize, noun: &'static str) -> Result<()> {
    if count == 0 {
        return Err(EditorError::EmptySelection(noun));
    }
    Ok(())
}

fn image_size(path: &Path) -> Result<egui::Vec2> {
    match image::image_dimensions(path) {
        Ok((w, h)) => Ok(egui::vec2(w as f32, h as f32)),
        Err(source) => {
            warn!(path = %path.display(), error = %source, "failed to load image");
            Err(EditorError::AssetLoad {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_reports_nothing_to_undo() {
        let mut editor = Editor::default();
        assert!(matches!(editor.undo(), Err(EditorError::NothingToUndo)));
        assert!(matches!(editor.redo(), Err(EditorError::NothingToRedo)));
    }

    #[test]
    fn recolor_without_selection_is_an_error() {
        let mut editor = Editor::default();
        editor.insert_shape(FlowType::Process, egui::pos2(0.0, 0.0));
        editor.select_all_of(Vec::new());
        let err = editor.set_fill_color(FillColor::Red).expect_err("no selection");
        assert_eq!(err.to_string(), "No shape selected");
        assert_eq!(editor.history().undo_len(), 1);
    }

    #[test]
    fn missing_image_is_reported_without_entity() {
        let mut editor = Editor::default();
        let err = editor
            .import_pixmap("/nonexistent/picture.png", egui::pos2(0.0, 0.0))
            .expect_err("missing file");
        assert!(matches!(err, EditorError::AssetLoad { .. }));
        assert!(editor.scene().pixmaps().is_empty());
        assert!(!editor.can_undo());
    }

    #[test]
    fn zoom_outside_range_is_refused() {
        let mut editor = Editor::default();
        let at = egui::pos2(100.0, 100.0);
        let mut steps = 0;
        while editor.wheel(at, 1.0) {
            steps += 1;
        }
        assert!(editor.view().zoom <= editor.settings().max_scale);
        assert_eq!(editor.history().undo_len(), steps);
        assert!(!editor.wheel(at, 1.0));
    }

    #[test]
    fn middle_drag_pans_and_records_one_command() {
        let mut editor = Editor::default();
        editor.pointer_pressed(PointerButton::Middle, egui::pos2(10.0, 10.0), false);
        editor.pointer_moved(egui::pos2(20.0, 15.0));
        editor.pointer_moved(egui::pos2(30.0, 30.0));
        editor.pointer_released(PointerButton::Middle, egui::pos2(30.0, 30.0));
        assert_eq!(editor.view().pan_screen, egui::vec2(20.0, 20.0));
        assert_eq!(editor.history().undo_len(), 1);
        editor.undo().expect("undo pan");
        assert_eq!(editor.view().pan_screen, egui::Vec2::ZERO);
    }

    #[test]
    fn wheel_applies_one_step_per_call() {
        let mut editor = Editor::default();
        let at = egui::pos2(100.0, 100.0);
        let step = editor.settings().zoom_step;
        assert!(editor.wheel(at, 3.0));
        assert!((editor.view().zoom - step).abs() < 1e-5);
        assert!(editor.wheel(at, -0.5));
        assert!((editor.view().zoom - 1.0).abs() < 1e-5);
        assert!(!editor.wheel(at, 0.0));
        assert_eq!(editor.history().undo_len(), 2);
    }

    #[test]
    fn empty_query_finds_nothing() {
        let mut editor = Editor::default();
        let id = editor.insert_label(egui::pos2(0.0, 0.0));
        editor.select_all_of([id]);
        editor.replace_selected_text("").expect("label selected");
        assert_eq!(editor.scene().label(id).map(|l| l.text.as_str()), Some(""));
        editor.select_all_of(Vec::new());
        assert_eq!(editor.find_text(""), 0);
        assert!(editor.scene().selected().is_empty());
        assert_eq!(editor.select_all_matches(), 0);
    }

    #[test]
    fn applied_settings_resize_the_history() {
        let mut editor = Editor::default();
        for x in 0..5 {
            editor.insert_shape(FlowType::Process, egui::pos2(x as f32 * 300.0, 0.0));
        }
        assert_eq!(editor.history().undo_len(), 5);
        let mut settings = editor.settings().clone();
        settings.history_limit = 3;
        editor.apply_settings(settings);
        assert_eq!(editor.history().undo_len(), 3);
    }

    #[test]
    fn unknown_drop_code_is_ignored() {
        let mut editor = Editor::default();
        assert!(editor.insert_shape_code(11, egui::pos2(0.0, 0.0)).is_none());
        assert!(editor.insert_shape_code(4, egui::pos2(0.0, 0.0)).is_some());
        assert_eq!(editor.scene().shapes()[0].flow_type, FlowType::Decision);
    }
}
