use super::guides;
use super::{Corner, Gesture, Hit, Mode, MoveSession, Scene};
use crate::command::{Command, Displacement};
use crate::control_point::{self, ControlDrag};
use crate::model::{Anchor, EntityId, Label, Pixmap};
use eframe::egui;
use tracing::debug;

impl Scene {
    /// Primary button pressed at scene point `p`. `toggle` is the
    /// multi-select modifier.
    pub fn pointer_down(&mut self, p: egui::Pos2, toggle: bool) {
        match self.mode {
            Mode::InsertShape(flow_type) => {
                self.commit_edits_except(None);
                self.add_shape(flow_type, p);
                self.set_mode(Mode::Idle);
            }
            Mode::InsertConnector => {
                self.gesture = Some(Gesture::RubberLine { start: p, end: p });
            }
            Mode::InsertLabel => {
                self.commit_edits_except(None);
                let id = self.add_label(p);
                self.select_only(id);
                self.set_mode(Mode::Idle);
            }
            Mode::Idle => self.idle_pointer_down(p, toggle),
        }
        self.refresh();
    }

    fn idle_pointer_down(&mut self, p: egui::Pos2, toggle: bool) {
        let hit = self.hit_test(p).map(|h| self.redirect_anchored_label(h));
        let editing_hit = match hit {
            Some(Hit::Label(id)) if self.label(id).is_some_and(Label::is_editing) => Some(id),
            _ => None,
        };
        self.commit_edits_except(editing_hit);
        if editing_hit.is_some() {
            return;
        }

        match hit {
            Some(Hit::ControlPoint(shape, direction)) => {
                let Some(local) = self.shape(shape).and_then(|s| s.map_from_scene(p)) else {
                    return;
                };
                debug!(%shape, ?direction, "control drag start");
                self.gesture = Some(Gesture::Control(ControlDrag {
                    shape,
                    direction,
                    press: local,
                    current: local,
                }));
            }
            Some(Hit::PixmapCorner(id, corner)) => {
                let Some(size) = self.pixmap(id).map(|px| px.size) else {
                    return;
                };
                self.gesture = Some(Gesture::ResizePixmap {
                    id,
                    corner,
                    start_size: size,
                    last: p,
                });
            }
            Some(hit) => {
                let id = hit.id();
                if toggle {
                    self.toggle_selection(id);
                } else if !self.is_selected(id) {
                    self.select_only(id);
                }
                if self.is_selected(id) && self.position_of(id).is_some() {
                    self.begin_move(p, id);
                }
            }
            None => {
                if !toggle {
                    self.clear_selection();
                }
                self.gesture = Some(Gesture::RubberBand {
                    start: p,
                    current: p,
                    additive: toggle,
                });
            }
        }
        // Deselecting a label leaves its edit.
        self.commit_edits_except(None);
    }

    /// Pressing the text of an unselected shape label acts on the shape.
    fn redirect_anchored_label(&self, hit: Hit) -> Hit {
        let Hit::Label(id) = hit else {
            return hit;
        };
        match self.label(id) {
            Some(l) if !l.is_editing() && !self.is_selected(id) => match l.anchor {
                Some(Anchor::Shape(shape)) if self.shape(shape).is_some_and(|s| s.selectable) => {
                    Hit::Shape(shape)
                }
                _ => hit,
            },
            _ => hit,
        }
    }

    /// Position of an entity the user may drag: shapes, free labels, images.
    pub(crate) fn position_of(&self, id: EntityId) -> Option<egui::Pos2> {
        if let Some(s) = self.shape(id) {
            return s.movable.then_some(s.pos);
        }
        if let Some(l) = self.label(id) {
            return l.movable().then_some(l.pos);
        }
        self.pixmap(id).map(|p| p.pos)
    }

    fn begin_move(&mut self, press: egui::Pos2, lead: EntityId) {
        let selected = &self.selected;
        let starts: Vec<(EntityId, egui::Pos2)> = self
            .shapes
            .iter()
            .filter(|s| s.movable && selected.contains(&s.id))
            .map(|s| (s.id, s.pos))
            .chain(
                self.labels
                    .iter()
                    .filter(|l| l.movable() && selected.contains(&l.id))
                    .map(|l| (l.id, l.pos)),
            )
            .chain(
                self.pixmaps
                    .iter()
                    .filter(|p| selected.contains(&p.id))
                    .map(|p| (p.id, p.pos)),
            )
            .collect();
        let lead = self.shape(lead).map(|s| s.id);
        let candidates = if lead.is_some() {
            self.shapes
                .iter()
                .filter(|s| !selected.contains(&s.id) && s.scene_bounds().intersects(self.visible))
                .flat_map(guides::guides_for)
                .collect()
        } else {
            Vec::new()
        };
        debug!(count = starts.len(), guides = candidates.len(), "move session start");
        self.gesture = Some(Gesture::Move(MoveSession {
            press,
            starts,
            lead,
            candidates,
        }));
    }

    fn continue_move(&mut self, p: egui::Pos2) {
        let Some(Gesture::Move(session)) = &self.gesture else {
            return;
        };
        let delta = p - session.press;
        let mut snap = guides::Snap::default();
        if let Some(lead) = session.lead {
            let start = session.starts.iter().find(|(id, _)| *id == lead);
            if let (Some(shape), Some((_, start))) = (self.shape(lead), start) {
                let shift = (*start + delta) - shape.pos;
                let bounds = shape.scene_bounds().translate(shift);
                snap = guides::evaluate(
                    &session.candidates,
                    bounds,
                    self.config.snap_tolerance,
                    self.config.guide_reach,
                );
            }
        }
        let starts = session.starts.clone();
        for (id, start) in starts {
            self.set_position(id, start + delta + snap.offset);
        }
        self.active_guides = snap.shown;
        self.refresh();
    }

    fn finish_move(&mut self, session: MoveSession) {
        let moves: Vec<Displacement> = session
            .starts
            .iter()
            .filter_map(|(id, from)| {
                let to = self.position_of(*id)?;
                (to != *from).then_some(Displacement {
                    id: *id,
                    from: *from,
                    to,
                })
            })
            .collect();
        if !moves.is_empty() {
            self.emit(Command::Move(moves));
        }
    }

    fn finish_control(&mut self, drag: ControlDrag) {
        let Some(shape) = self.shape(drag.shape) else {
            return;
        };
        let old = shape.transform;
        let new = control_point::drag_transform(
            drag.direction,
            &old,
            shape.local_rect(),
            drag.press,
            drag.current,
            self.config.resize_margin,
        );
        if let Some(new) = new {
            self.set_shape_transform(drag.shape, new);
            self.emit(Command::TransformChange {
                id: drag.shape,
                old,
                new,
            });
        }
    }

    fn resize_pixmap_by(&mut self, id: EntityId, corner: Corner, d: egui::Vec2) {
        let Some(px) = self.pixmaps.iter_mut().find(|p| p.id == id) else {
            return;
        };
        let s = px.size;
        let proposed = match corner {
            Corner::TopLeft => s - d,
            Corner::TopRight => egui::vec2(s.x + d.x, s.y - d.y),
            Corner::BottomLeft => egui::vec2(s.x - d.x, s.y + d.y),
            Corner::BottomRight => s + d,
        };
        if proposed.x >= Pixmap::MIN_EDGE && proposed.y >= Pixmap::MIN_EDGE {
            px.size = px.fit_size(proposed);
        }
    }

    pub fn pointer_move(&mut self, p: egui::Pos2) {
        let control_local = match &self.gesture {
            Some(Gesture::Control(drag)) => {
                self.shape(drag.shape).and_then(|s| s.map_from_scene(p))
            }
            _ => None,
        };
        match &mut self.gesture {
            Some(Gesture::RubberLine { end, .. }) => *end = p,
            Some(Gesture::RubberBand { current, .. }) => *current = p,
            Some(Gesture::Control(drag)) => {
                if let Some(local) = control_local {
                    drag.current = local;
                }
            }
            Some(Gesture::ResizePixmap {
                id, corner, last, ..
            }) => {
                let (id, corner, delta) = (*id, *corner, p - *last);
                *last = p;
                self.resize_pixmap_by(id, corner, delta);
            }
            Some(Gesture::Move(_)) => self.continue_move(p),
            None => {}
        }
    }

    pub fn pointer_up(&mut self, p: egui::Pos2) {
        self.pointer_move(p);
        let Some(gesture) = self.gesture.take() else {
            return;
        };
        match gesture {
            Gesture::RubberLine { start, end } => {
                if let (Some(a), Some(b)) = (self.shape_at(start), self.shape_at(end)) {
                    self.connect(a, b);
                }
                if !self.shift_held {
                    self.set_mode(Mode::Idle);
                }
            }
            Gesture::RubberBand {
                start,
                current,
                additive,
            } => {
                let band = egui::Rect::from_two_pos(start, current);
                if band.width() > 0.0 && band.height() > 0.0 {
                    let hits = self.ids_in(band);
                    if !additive {
                        self.clear_selection();
                    }
                    self.selected.extend(hits);
                }
            }
            Gesture::Control(drag) => self.finish_control(drag),
            Gesture::ResizePixmap { id, start_size, .. } => {
                if let Some(size) = self.pixmap(id).map(|px| px.size) {
                    if size != start_size {
                        self.emit(Command::ResizeImage {
                            id,
                            old: start_size,
                            new: size,
                        });
                    }
                }
            }
            Gesture::Move(session) => self.finish_move(session),
        }
        self.active_guides.clear();
        self.refresh();
    }

    /// Double click at `p`: edit a label, or give a connector a label.
    pub fn double_click(&mut self, p: egui::Pos2) {
        match self.hit_test(p) {
            Some(Hit::Label(id)) => self.begin_edit(id),
            Some(Hit::Shape(id)) => {
                if let Some(label) = self.labels_of(id).first().copied() {
                    self.begin_edit(label);
                }
            }
            Some(Hit::Connector(id)) => {
                if let Some(label) = self.labels_of(id).first().copied() {
                    self.begin_edit(label);
                    return;
                }
                let label = Label::new(Label::DEFAULT_TEXT, self.config.label_font.clone(), p);
                let label_id = label.id;
                self.labels.push(label);
                self.anchor_label(label_id, Anchor::Connector(id));
                let batch = self.batch_of(&[label_id]);
                self.emit(Command::Append(batch));
                self.begin_edit(label_id);
            }
            _ => {}
        }
    }

    pub fn shift_pressed(&mut self) {
        self.shift_held = true;
        self.set_mode(Mode::InsertConnector);
    }

    /// Releasing Shift drops any pending rubber line without a command.
    pub fn shift_released(&mut self) {
        if !self.shift_held {
            return;
        }
        self.shift_held = false;
        if matches!(self.gesture, Some(Gesture::RubberLine { .. })) {
            debug!("discarding pending connector");
            self.gesture = None;
        }
        self.set_mode(Mode::Idle);
    }

    /// Leaves label editing, deselecting the edited labels, and cancels insert modes.
    pub fn escape(&mut self) {
        let editing: Vec<EntityId> = self
            .labels
            .iter()
            .filter(|l| l.is_editing() && self.selected.contains(&l.id))
            .map(|l| l.id)
            .collect();
        for id in &editing {
            self.selected.remove(id);
        }
        self.commit_edits_except(None);
        if matches!(self.gesture, Some(Gesture::RubberLine { .. })) {
            self.gesture = None;
        }
        if !self.shift_held {
            self.set_mode(Mode::Idle);
        }
    }

    /// Entities whose bounds touch `band`.
    fn ids_in(&self, band: egui::Rect) -> Vec<EntityId> {
        let shapes = self
            .shapes
            .iter()
            .filter(|s| s.selectable && s.scene_bounds().intersects(band))
            .map(|s| s.id);
        let connectors = self
            .connectors
            .iter()
            .filter(|c| {
                c.route
                    .is_some_and(|r| band.contains(r.start) || band.contains(r.end))
            })
            .map(|c| c.id);
        let labels = self
            .labels
            .iter()
            .filter(|l| l.scene_bounds().intersects(band))
            .map(|l| l.id);
        let pixmaps = self
            .pixmaps
            .iter()
            .filter(|p| p.scene_bounds().intersects(band))
            .map(|p| p.id);
        shapes.chain(connectors).chain(labels).chain(pixmaps).collect()
    }
}
