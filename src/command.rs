//! Invertible records of every mutation.
//!
//! A command is pushed after its effect is already visible, so `redo` only
//! runs when replaying. Targets are resolved by id on each replay; a missing
//! id is skipped.

use crate::geometry::Transform;
use crate::model::{Background, BorderColor, Entity, EntityId, EntityKind, FillColor, FontSpec, Rgba};
use crate::scene::Scene;
use crate::view::View;
use eframe::egui;

/// Entities captured together with their index in their typed list, so that
/// putting them back restores list order exactly.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct EntityBatch {
    entries: Vec<(usize, Entity)>,
}

fn restore_rank(kind: EntityKind) -> u8 {
    match kind {
        EntityKind::Shape => 0,
        EntityKind::Pixmap => 1,
        EntityKind::Connector => 2,
        EntityKind::Label => 3,
    }
}

impl EntityBatch {
    pub fn new(mut entries: Vec<(usize, Entity)>) -> Self {
        entries.sort_by_key(|(idx, e)| (restore_rank(e.kind()), *idx));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entries.iter().map(|(_, e)| e.id())
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entries.iter().map(|(_, e)| e)
    }

    /// Insertion order: shapes and images first, dependents after.
    pub(crate) fn insertion_order(&self) -> impl Iterator<Item = &(usize, Entity)> {
        self.entries.iter()
    }

    /// Removal order: dependents first.
    pub(crate) fn removal_order(&self) -> impl Iterator<Item = &(usize, Entity)> {
        self.entries.iter().rev()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Displacement {
    pub id: EntityId,
    pub from: egui::Pos2,
    pub to: egui::Pos2,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StyleChange {
    pub id: EntityId,
    pub old: (FillColor, BorderColor),
    pub new: (FillColor, BorderColor),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextChange {
    pub id: EntityId,
    pub old: String,
    pub new: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FontChange {
    pub id: EntityId,
    pub old_font: FontSpec,
    pub old_color: Rgba,
    pub new_font: FontSpec,
    pub new_color: Rgba,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Pan {
        delta: egui::Vec2,
    },
    Zoom {
        zoom_in: bool,
        multiplier: f32,
        anchor: egui::Pos2,
    },
    Append(EntityBatch),
    Delete(EntityBatch),
    Move(Vec<Displacement>),
    TransformChange {
        id: EntityId,
        old: Transform,
        new: Transform,
    },
    Recolor(Vec<StyleChange>),
    ReplaceText(Vec<TextChange>),
    FontOrColorChange(Vec<FontChange>),
    BackgroundChange {
        old: Option<Background>,
        new: Option<Background>,
    },
    ResizeImage {
        id: EntityId,
        old: egui::Vec2,
        new: egui::Vec2,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Pan { .. } => "pan",
            Command::Zoom { .. } => "zoom",
            Command::Append(_) => "append",
            Command::Delete(_) => "delete",
            Command::Move(_) => "move",
            Command::TransformChange { .. } => "transform",
            Command::Recolor(_) => "recolor",
            Command::ReplaceText(_) => "replace text",
            Command::FontOrColorChange(_) => "font",
            Command::BackgroundChange { .. } => "background",
            Command::ResizeImage { .. } => "resize image",
        }
    }

    pub fn redo(&self, scene: &mut Scene, view: &mut View) {
        self.apply(scene, view, true);
    }

    pub fn undo(&self, scene: &mut Scene, view: &mut View) {
        self.apply(scene, view, false);
    }

    fn apply(&self, scene: &mut Scene, view: &mut View, forward: bool) {
        match self {
            Command::Pan { delta } => {
                view.pan_by_world(if forward { *delta } else { -*delta });
            }
            Command::Zoom {
                zoom_in,
                multiplier,
                anchor,
            } => {
                let factor = if *zoom_in == forward {
                    *multiplier
                } else {
                    1.0 / *multiplier
                };
                view.zoom_about_world_point(*anchor, factor);
            }
            Command::Append(batch) | Command::Delete(batch) => {
                let inserting = matches!(self, Command::Append(_)) == forward;
                if inserting {
                    scene.restore_batch(batch);
                } else {
                    scene.remove_batch(batch);
                }
            }
            Command::Move(moves) => {
                for m in moves {
                    scene.set_position(m.id, if forward { m.to } else { m.from });
                }
            }
            Command::TransformChange { id, old, new } => {
                scene.set_shape_transform(*id, if forward { *new } else { *old });
            }
            Command::Recolor(changes) => {
                for c in changes {
                    let (fill, border) = if forward { c.new } else { c.old };
                    scene.set_shape_colors(c.id, fill, border);
                }
            }
            Command::ReplaceText(changes) => {
                for c in changes {
                    let text = if forward { &c.new } else { &c.old };
                    scene.set_label_text(c.id, text.clone());
                }
            }
            Command::FontOrColorChange(changes) => {
                for c in changes {
                    if forward {
                        scene.set_label_style(c.id, c.new_font.clone(), c.new_color);
                    } else {
                        scene.set_label_style(c.id, c.old_font.clone(), c.old_color);
                    }
                }
            }
            Command::BackgroundChange { old, new } => {
                scene.set_background(if forward { new.clone() } else { old.clone() });
            }
            Command::ResizeImage { id, old, new } => {
                scene.set_pixmap_size(*id, if forward { *new } else { *old });
            }
        }
        scene.refresh();
    }
}
