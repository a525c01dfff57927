use super::Scene;
use crate::command::{Command, FontChange, StyleChange, TextChange};
use crate::model::{Background, BorderColor, EntityId, FillColor, FontSpec, LabelState, Rgba};
use tracing::debug;

impl Scene {
    /// Label currently in edit mode, if any.
    pub fn editing_label(&self) -> Option<EntityId> {
        self.labels.iter().find(|l| l.is_editing()).map(|l| l.id)
    }

    /// Puts `id` into edit mode with its text as the draft and selects it.
    pub fn begin_edit(&mut self, id: EntityId) {
        self.commit_edits_except(Some(id));
        let Some(label) = self.labels.iter_mut().find(|l| l.id == id) else {
            return;
        };
        if !label.is_editing() {
            label.state = LabelState::Edit {
                draft: label.text.clone(),
            };
            debug!(%id, "label edit start");
        }
        self.select_only(id);
    }

    /// Replaces the draft of a label being edited.
    pub fn set_draft(&mut self, id: EntityId, text: String) {
        if let Some(label) = self.labels.iter_mut().find(|l| l.id == id) {
            if let LabelState::Edit { draft } = &mut label.state {
                *draft = text;
            }
        }
        self.recenter_label(id);
    }

    /// Leaves edit mode on every label but `keep`. Changed drafts become one
    /// `ReplaceText`.
    pub(crate) fn commit_edits_except(&mut self, keep: Option<EntityId>) {
        let mut left = Vec::new();
        let mut changes = Vec::new();
        for label in self.labels.iter_mut() {
            if Some(label.id) == keep {
                continue;
            }
            let LabelState::Edit { draft } = std::mem::take(&mut label.state) else {
                continue;
            };
            left.push(label.id);
            if draft != label.text {
                let old = std::mem::replace(&mut label.text, draft);
                changes.push(TextChange {
                    id: label.id,
                    old,
                    new: label.text.clone(),
                });
            }
        }
        for id in left {
            self.recenter_label(id);
        }
        if !changes.is_empty() {
            self.emit(Command::ReplaceText(changes));
        }
    }

    /// Removes the selection. Connectors touching a removed shape go with it,
    /// as do labels anchored to anything removed.
    pub fn delete_selection(&mut self) -> usize {
        self.commit_edits_except(None);
        let selected = &self.selected;
        let shapes: Vec<EntityId> = self
            .shapes
            .iter()
            .filter(|s| selected.contains(&s.id))
            .map(|s| s.id)
            .collect();
        let connectors: Vec<EntityId> = self
            .connectors
            .iter()
            .filter(|c| selected.contains(&c.id) || shapes.iter().any(|s| c.touches(*s)))
            .map(|c| c.id)
            .collect();
        let labels = self.labels.iter().filter(|l| {
            selected.contains(&l.id)
                || l.anchor.is_some_and(|a| {
                    shapes.contains(&a.id()) || connectors.contains(&a.id())
                })
        });
        let pixmaps = self.pixmaps.iter().filter(|p| selected.contains(&p.id));
        let ids: Vec<EntityId> = connectors
            .iter()
            .copied()
            .chain(labels.map(|l| l.id))
            .chain(shapes.iter().copied())
            .chain(pixmaps.map(|p| p.id))
            .collect();
        if ids.is_empty() {
            return 0;
        }
        let batch = self.batch_of(&ids);
        self.remove_batch(&batch);
        self.selected.clear();
        let count = batch.len();
        debug!(count, "deleted selection");
        self.emit(Command::Delete(batch));
        self.refresh();
        count
    }

    /// Sets fill and/or border on the selected shapes. Returns how many shapes
    /// were selected.
    pub fn recolor_selected(&mut self, fill: Option<FillColor>, border: Option<BorderColor>) -> usize {
        let selected = &self.selected;
        let mut count = 0;
        let mut changes = Vec::new();
        for shape in self.shapes.iter_mut().filter(|s| selected.contains(&s.id)) {
            count += 1;
            let old = (shape.fill, shape.border);
            let new = (fill.unwrap_or(old.0), border.unwrap_or(old.1));
            if new != old {
                (shape.fill, shape.border) = new;
                changes.push(StyleChange {
                    id: shape.id,
                    old,
                    new,
                });
            }
        }
        if !changes.is_empty() {
            self.emit(Command::Recolor(changes));
        }
        count
    }

    /// Sets font and/or color on the selected labels. Returns how many labels
    /// were selected.
    pub fn restyle_selected_labels(&mut self, font: Option<FontSpec>, color: Option<Rgba>) -> usize {
        let selected = &self.selected;
        let mut count = 0;
        let mut changes = Vec::new();
        for label in self.labels.iter_mut().filter(|l| selected.contains(&l.id)) {
            count += 1;
            let new_font = font.clone().unwrap_or_else(|| label.font.clone());
            let new_color = color.unwrap_or(label.color);
            if new_font == label.font && new_color == label.color {
                continue;
            }
            let old_font = std::mem::replace(&mut label.font, new_font.clone());
            let old_color = std::mem::replace(&mut label.color, new_color);
            changes.push(FontChange {
                id: label.id,
                old_font,
                old_color,
                new_font,
                new_color,
            });
        }
        let ids: Vec<EntityId> = changes.iter().map(|c| c.id).collect();
        for id in ids {
            self.recenter_label(id);
        }
        if !changes.is_empty() {
            self.emit(Command::FontOrColorChange(changes));
        }
        count
    }

    /// Gives every selected label the text `new`. Returns how many changed.
    pub fn replace_selected_text(&mut self, new: &str) -> usize {
        self.commit_edits_except(None);
        let selected = &self.selected;
        let changes: Vec<TextChange> = self
            .labels
            .iter()
            .filter(|l| selected.contains(&l.id) && l.text != new)
            .map(|l| TextChange {
                id: l.id,
                old: l.text.clone(),
                new: new.to_string(),
            })
            .collect();
        for c in &changes {
            self.set_label_text(c.id, c.new.clone());
        }
        let count = changes.len();
        if count > 0 {
            self.emit(Command::ReplaceText(changes));
        }
        count
    }

    pub fn change_background(&mut self, background: Option<Background>) {
        if self.background == background {
            return;
        }
        let old = std::mem::replace(&mut self.background, background.clone());
        self.emit(Command::BackgroundChange {
            old,
            new: background,
        });
    }
}
