use crate::command::Command;
use crate::error::{EditorError, Result};
use crate::scene::Scene;
use crate::view::View;
use tracing::debug;

/// Undo and redo stacks.
#[derive(Debug)]
pub struct History {
    undo: Vec<Command>,
    redo: Vec<Command>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_limit(200)
    }
}

impl History {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Changes the undo depth, dropping the oldest commands beyond it.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.max(1);
        self.trim();
    }

    /// Records an already-applied command. Any redo history is dropped.
    pub fn add(&mut self, command: Command) {
        debug!(command = command.name(), depth = self.undo.len() + 1, "push command");
        self.redo.clear();
        self.undo.push(command);
        self.trim();
    }

    fn trim(&mut self) {
        if self.undo.len() > self.limit {
            let overflow = self.undo.len() - self.limit;
            self.undo.drain(0..overflow);
        }
    }

    pub fn undo(&mut self, scene: &mut Scene, view: &mut View) -> Result<()> {
        let command = self.undo.pop().ok_or(EditorError::NothingToUndo)?;
        debug!(command = command.name(), "undo");
        command.undo(scene, view);
        self.redo.push(command);
        Ok(())
    }

    pub fn redo(&mut self, scene: &mut Scene, view: &mut View) -> Result<()> {
        let command = self.redo.pop().ok_or(EditorError::NothingToRedo)?;
        debug!(command = command.name(), "redo");
        command.redo(scene, view);
        self.undo.push(command);
        Ok(())
    }

    /// Empties both stacks; used to mark a save point.
    pub fn clear_all(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui;

    #[test]
    fn empty_stacks_report_errors_without_changes() {
        let mut history = History::default();
        let mut scene = Scene::default();
        let mut view = View::default();
        assert!(matches!(
            history.undo(&mut scene, &mut view),
            Err(EditorError::NothingToUndo)
        ));
        assert!(matches!(
            history.redo(&mut scene, &mut view),
            Err(EditorError::NothingToRedo)
        ));
        assert_eq!(view, View::default());
    }

    #[test]
    fn new_command_clears_redo() {
        let mut history = History::default();
        let mut scene = Scene::default();
        let mut view = View::default();
        let pan = Command::Pan {
            delta: egui::vec2(5.0, 0.0),
        };
        view.pan_by_world(egui::vec2(5.0, 0.0));
        history.add(pan.clone());
        history.undo(&mut scene, &mut view).expect("undo");
        assert_eq!(view.pan_screen, egui::Vec2::ZERO);
        assert!(history.can_redo());
        history.add(pan);
        assert!(!history.can_redo());
        assert_eq!(history.undo_len(), 1);
    }

    #[test]
    fn zoom_command_inverts() {
        let mut history = History::default();
        let mut scene = Scene::default();
        let mut view = View::default();
        let anchor = egui::pos2(120.0, 80.0);
        view.zoom_about_world_point(anchor, 1.25);
        history.add(Command::Zoom {
            zoom_in: true,
            multiplier: 1.25,
            anchor,
        });
        history.undo(&mut scene, &mut view).expect("undo");
        assert!((view.zoom - 1.0).abs() < 1e-5);
        history.redo(&mut scene, &mut view).expect("redo");
        assert!((view.zoom - 1.25).abs() < 1e-5);
    }

    #[test]
    fn limit_drops_oldest() {
        let mut history = History::with_limit(2);
        for i in 0..3 {
            history.add(Command::Pan {
                delta: egui::vec2(i as f32, 0.0),
            });
        }
        assert_eq!(history.undo_len(), 2);
    }

    #[test]
    fn lowering_the_limit_trims_existing_history() {
        let mut history = History::with_limit(5);
        for i in 0..4 {
            history.add(Command::Pan {
                delta: egui::vec2(i as f32, 0.0),
            });
        }
        history.set_limit(2);
        assert_eq!(history.undo_len(), 2);
        history.add(Command::Pan {
            delta: egui::vec2(9.0, 0.0),
        });
        assert_eq!(history.undo_len(), 2);
    }
}
