//! Entity ownership, hit-testing and the interaction state machine.
//!
//! The scene owns every shape, connector, label and image. Everything else
//! refers to entities by [`EntityId`] and resolves them here at use time.
//! Event handlers live in `input.rs`, alignment guides in `guides.rs` and the
//! selection-wide edits in `edit.rs`.

use crate::anchoring::{self, Listeners};
use crate::command::{Command, EntityBatch};
use crate::control_point::{self, ControlDrag, Direction};
use crate::geometry::{self, Transform};
use crate::model::{
    Anchor, Background, BorderColor, Connector, Entity, EntityId, EntityKind, FillColor, FlowType,
    FontSpec, Label, LabelState, Pixmap, Rgba, Shape,
};
use crate::routing;
use crate::settings::EditorSettings;
use eframe::egui;
use std::collections::HashSet;
use tracing::debug;

mod edit;
mod guides;
mod input;

pub use guides::{Axis, Guide};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Idle,
    InsertShape(FlowType),
    InsertConnector,
    InsertLabel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    fn handle_rect(self, bounds: egui::Rect) -> egui::Rect {
        let s = egui::Vec2::splat(Pixmap::HANDLE);
        let min = match self {
            Corner::TopLeft => bounds.left_top(),
            Corner::TopRight => bounds.right_top() - egui::vec2(Pixmap::HANDLE, 0.0),
            Corner::BottomLeft => bounds.left_bottom() - egui::vec2(0.0, Pixmap::HANDLE),
            Corner::BottomRight => bounds.right_bottom() - s,
        };
        egui::Rect::from_min_size(min, s)
    }
}

/// Topmost thing under a scene point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hit {
    ControlPoint(EntityId, Direction),
    PixmapCorner(EntityId, Corner),
    Label(EntityId),
    Connector(EntityId),
    Shape(EntityId),
    Pixmap(EntityId),
}

impl Hit {
    pub fn id(self) -> EntityId {
        match self {
            Hit::ControlPoint(id, _)
            | Hit::PixmapCorner(id, _)
            | Hit::Label(id)
            | Hit::Connector(id)
            | Hit::Shape(id)
            | Hit::Pixmap(id) => id,
        }
    }
}

/// Tunables the state machine reads on every event.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneConfig {
    pub snap_tolerance: f32,
    pub guide_reach: f32,
    pub resize_margin: f32,
    pub arrow_size: f32,
    pub label_font: FontSpec,
    pub connector_color: Rgba,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::from(&EditorSettings::default())
    }
}

impl From<&EditorSettings> for SceneConfig {
    fn from(s: &EditorSettings) -> Self {
        Self {
            snap_tolerance: s.snap_tolerance,
            guide_reach: s.guide_reach,
            resize_margin: s.resize_margin,
            arrow_size: s.arrow_size,
            label_font: s.label_font.clone(),
            connector_color: s.connector_color,
        }
    }
}

#[derive(Clone, Debug)]
struct MoveSession {
    press: egui::Pos2,
    starts: Vec<(EntityId, egui::Pos2)>,
    lead: Option<EntityId>,
    candidates: Vec<Guide>,
}

#[derive(Clone, Debug)]
enum Gesture {
    RubberLine {
        start: egui::Pos2,
        end: egui::Pos2,
    },
    RubberBand {
        start: egui::Pos2,
        current: egui::Pos2,
        additive: bool,
    },
    Move(MoveSession),
    Control(ControlDrag),
    ResizePixmap {
        id: EntityId,
        corner: Corner,
        start_size: egui::Vec2,
        last: egui::Pos2,
    },
}

#[derive(Debug)]
pub struct Scene {
    shapes: Vec<Shape>,
    connectors: Vec<Connector>,
    labels: Vec<Label>,
    pixmaps: Vec<Pixmap>,
    background: Option<Background>,
    selected: HashSet<EntityId>,
    listeners: Listeners,
    mode: Mode,
    shift_held: bool,
    gesture: Option<Gesture>,
    active_guides: Vec<Guide>,
    visible: egui::Rect,
    hit_slop: f32,
    config: SceneConfig,
    outbox: Vec<Command>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(SceneConfig::default())
    }
}

impl Scene {
    pub fn new(config: SceneConfig) -> Self {
        Self {
            shapes: Vec::new(),
            connectors: Vec::new(),
            labels: Vec::new(),
            pixmaps: Vec::new(),
            background: None,
            selected: HashSet::new(),
            listeners: Listeners::default(),
            mode: Mode::Idle,
            shift_held: false,
            gesture: None,
            active_guides: Vec::new(),
            visible: egui::Rect::EVERYTHING,
            hit_slop: 4.0,
            config,
            outbox: Vec::new(),
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SceneConfig) {
        self.config = config;
        self.refresh();
    }

    /// Scene rectangle on screen and the hit tolerance at the current zoom.
    pub fn set_view_context(&mut self, visible: egui::Rect, hit_slop: f32) {
        self.visible = visible;
        self.hit_slop = hit_slop;
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn pixmaps(&self) -> &[Pixmap] {
        &self.pixmaps
    }

    pub fn background(&self) -> Option<&Background> {
        self.background.as_ref()
    }

    pub fn selected(&self) -> &HashSet<EntityId> {
        &self.selected
    }

    pub fn is_selected(&self, id: EntityId) -> bool {
        self.selected.contains(&id)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn shift_held(&self) -> bool {
        self.shift_held
    }

    pub fn guides(&self) -> &[Guide] {
        &self.active_guides
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
            && self.connectors.is_empty()
            && self.labels.is_empty()
            && self.pixmaps.is_empty()
    }

    pub fn shape(&self, id: EntityId) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id == id)
    }

    pub fn connector(&self, id: EntityId) -> Option<&Connector> {
        self.connectors.iter().find(|c| c.id == id)
    }

    pub fn label(&self, id: EntityId) -> Option<&Label> {
        self.labels.iter().find(|l| l.id == id)
    }

    pub fn pixmap(&self, id: EntityId) -> Option<&Pixmap> {
        self.pixmaps.iter().find(|p| p.id == id)
    }

    pub fn kind_of(&self, id: EntityId) -> Option<EntityKind> {
        if self.shape(id).is_some() {
            Some(EntityKind::Shape)
        } else if self.connector(id).is_some() {
            Some(EntityKind::Connector)
        } else if self.label(id).is_some() {
            Some(EntityKind::Label)
        } else if self.pixmap(id).is_some() {
            Some(EntityKind::Pixmap)
        } else {
            None
        }
    }

    /// Owned copy of any entity.
    pub fn entity(&self, id: EntityId) -> Option<Entity> {
        self.entity_with_index(id).map(|(_, e)| e)
    }

    fn entity_with_index(&self, id: EntityId) -> Option<(usize, Entity)> {
        if let Some(i) = self.shapes.iter().position(|s| s.id == id) {
            return Some((i, Entity::Shape(self.shapes[i].clone())));
        }
        if let Some(i) = self.connectors.iter().position(|c| c.id == id) {
            return Some((i, Entity::Connector(self.connectors[i].clone())));
        }
        if let Some(i) = self.labels.iter().position(|l| l.id == id) {
            let mut label = self.labels[i].clone();
            label.state = LabelState::Display;
            return Some((i, Entity::Label(label)));
        }
        if let Some(i) = self.pixmaps.iter().position(|p| p.id == id) {
            return Some((i, Entity::Pixmap(self.pixmaps[i].clone())));
        }
        None
    }

    /// Labels listening to `anchor`.
    pub fn labels_of(&self, anchor: EntityId) -> &[EntityId] {
        self.listeners.listeners_of(anchor)
    }

    pub fn rubber_line(&self) -> Option<(egui::Pos2, egui::Pos2)> {
        match &self.gesture {
            Some(Gesture::RubberLine { start, end }) => Some((*start, *end)),
            _ => None,
        }
    }

    pub fn rubber_band(&self) -> Option<egui::Rect> {
        match &self.gesture {
            Some(Gesture::RubberBand { start, current, .. }) => {
                Some(egui::Rect::from_two_pos(*start, *current))
            }
            _ => None,
        }
    }

    /// Transform a handle drag would produce if released now.
    pub fn control_preview(&self) -> Option<(EntityId, Transform)> {
        let Some(Gesture::Control(drag)) = &self.gesture else {
            return None;
        };
        let shape = self.shape(drag.shape)?;
        let t = control_point::drag_transform(
            drag.direction,
            &shape.transform,
            shape.local_rect(),
            drag.press,
            drag.current,
            self.config.resize_margin,
        )?;
        Some((drag.shape, t))
    }

    /// Drains commands produced since the last call.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.outbox)
    }

    pub(crate) fn emit(&mut self, command: Command) {
        debug!(command = command.name(), "scene produced command");
        self.outbox.push(command);
    }

    // ---- hit testing ----

    pub fn hit_test(&self, p: egui::Pos2) -> Option<Hit> {
        for shape in self.shapes.iter().rev() {
            if self.selected.contains(&shape.id) {
                if let Some(d) = control_point::hit_test(shape, p) {
                    return Some(Hit::ControlPoint(shape.id, d));
                }
            }
        }
        for pixmap in self.pixmaps.iter().rev() {
            if self.selected.contains(&pixmap.id) {
                let bounds = pixmap.scene_bounds();
                if let Some(c) = Corner::ALL
                    .into_iter()
                    .find(|c| c.handle_rect(bounds).contains(p))
                {
                    return Some(Hit::PixmapCorner(pixmap.id, c));
                }
            }
        }
        if let Some(label) = self
            .labels
            .iter()
            .rev()
            .find(|l| l.scene_bounds().contains(p))
        {
            return Some(Hit::Label(label.id));
        }
        if let Some(c) = self.connectors.iter().rev().find(|c| {
            c.route.is_some_and(|r| {
                geometry::distance_to_segment(p, r.start, r.end) <= self.hit_slop + c.width
            })
        }) {
            return Some(Hit::Connector(c.id));
        }
        if let Some(s) = self
            .shapes
            .iter()
            .rev()
            .find(|s| s.selectable && s.contains(p))
        {
            return Some(Hit::Shape(s.id));
        }
        self.pixmaps
            .iter()
            .rev()
            .find(|px| px.scene_bounds().contains(p))
            .map(|px| Hit::Pixmap(px.id))
    }

    /// Topmost shape containing `p`, ignoring everything else.
    pub fn shape_at(&self, p: egui::Pos2) -> Option<EntityId> {
        self.shapes.iter().rev().find(|s| s.contains(p)).map(|s| s.id)
    }

    // ---- selection ----

    pub fn select_only(&mut self, id: EntityId) {
        self.selected.clear();
        self.selected.insert(id);
    }

    pub fn select_all_of(&mut self, ids: impl IntoIterator<Item = EntityId>) {
        self.selected.clear();
        self.selected.extend(ids);
    }

    pub fn toggle_selection(&mut self, id: EntityId) {
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            debug!(?mode, "mode change");
        }
        self.mode = mode;
    }

    // ---- structural mutation ----

    pub(crate) fn insert_entity(&mut self, index: usize, entity: Entity) {
        if self.kind_of(entity.id()).is_some() {
            return;
        }
        match entity {
            Entity::Shape(s) => {
                let i = index.min(self.shapes.len());
                self.shapes.insert(i, s);
            }
            Entity::Connector(c) => {
                let i = index.min(self.connectors.len());
                self.connectors.insert(i, c);
            }
            Entity::Label(l) => {
                if let Some(anchor) = l.anchor {
                    self.listeners.subscribe(anchor.id(), l.id);
                }
                let i = index.min(self.labels.len());
                self.labels.insert(i, l);
            }
            Entity::Pixmap(p) => {
                let i = index.min(self.pixmaps.len());
                self.pixmaps.insert(i, p);
            }
        }
    }

    pub(crate) fn remove_entity(&mut self, id: EntityId) -> Option<(usize, Entity)> {
        self.selected.remove(&id);
        if let Some(i) = self.shapes.iter().position(|s| s.id == id) {
            return Some((i, Entity::Shape(self.shapes.remove(i))));
        }
        if let Some(i) = self.connectors.iter().position(|c| c.id == id) {
            return Some((i, Entity::Connector(self.connectors.remove(i))));
        }
        if let Some(i) = self.labels.iter().position(|l| l.id == id) {
            let mut label = self.labels.remove(i);
            if let Some(anchor) = label.anchor {
                self.listeners.unsubscribe(anchor.id(), label.id);
            }
            label.state = LabelState::Display;
            return Some((i, Entity::Label(label)));
        }
        if let Some(i) = self.pixmaps.iter().position(|p| p.id == id) {
            return Some((i, Entity::Pixmap(self.pixmaps.remove(i))));
        }
        None
    }

    pub(crate) fn restore_batch(&mut self, batch: &EntityBatch) {
        for (index, entity) in batch.insertion_order() {
            self.insert_entity(*index, entity.clone());
        }
    }

    pub(crate) fn remove_batch(&mut self, batch: &EntityBatch) {
        for (_, entity) in batch.removal_order() {
            self.remove_entity(entity.id());
        }
    }

    /// Captures freshly pushed entities as an append batch.
    pub(crate) fn batch_of(&self, ids: &[EntityId]) -> EntityBatch {
        EntityBatch::new(
            ids.iter()
                .filter_map(|id| self.entity_with_index(*id))
                .collect(),
        )
    }

    pub(crate) fn clear(&mut self) {
        self.shapes.clear();
        self.connectors.clear();
        self.labels.clear();
        self.pixmaps.clear();
        self.background = None;
        self.selected.clear();
        self.listeners.clear();
        self.gesture = None;
        self.active_guides.clear();
        self.outbox.clear();
        self.mode = Mode::Idle;
    }

    // ---- attribute mutation, used by commands ----

    pub(crate) fn set_position(&mut self, id: EntityId, pos: egui::Pos2) {
        if let Some(s) = self.shapes.iter_mut().find(|s| s.id == id) {
            s.pos = pos;
            self.notify_position_changed(id);
        } else if let Some(l) = self.labels.iter_mut().find(|l| l.id == id) {
            if l.anchor.is_none() {
                l.pos = pos;
            }
        } else if let Some(p) = self.pixmaps.iter_mut().find(|p| p.id == id) {
            p.pos = pos;
        }
    }

    pub(crate) fn set_shape_transform(&mut self, id: EntityId, transform: Transform) {
        if let Some(s) = self.shapes.iter_mut().find(|s| s.id == id) {
            s.transform = transform;
            self.notify_position_changed(id);
        }
    }

    pub(crate) fn set_shape_colors(&mut self, id: EntityId, fill: FillColor, border: BorderColor) {
        if let Some(s) = self.shapes.iter_mut().find(|s| s.id == id) {
            s.fill = fill;
            s.border = border;
        }
    }

    pub(crate) fn set_label_text(&mut self, id: EntityId, text: String) {
        if let Some(l) = self.labels.iter_mut().find(|l| l.id == id) {
            l.text = text;
            l.state = LabelState::Display;
        }
        self.recenter_label(id);
    }

    pub(crate) fn set_label_style(&mut self, id: EntityId, font: FontSpec, color: Rgba) {
        if let Some(l) = self.labels.iter_mut().find(|l| l.id == id) {
            l.font = font;
            l.color = color;
        }
        self.recenter_label(id);
    }

    pub(crate) fn set_background(&mut self, background: Option<Background>) {
        self.background = background;
    }

    pub(crate) fn set_pixmap_size(&mut self, id: EntityId, size: egui::Vec2) {
        if let Some(p) = self.pixmaps.iter_mut().find(|p| p.id == id) {
            p.size = size;
        }
    }

    // ---- anchoring ----

    /// Scene point anchored labels center on.
    fn anchor_center(&self, anchor: EntityId) -> Option<egui::Pos2> {
        if let Some(s) = self.shape(anchor) {
            return Some(s.center());
        }
        let c = self.connector(anchor)?;
        if let Some(r) = c.route {
            return Some(r.midpoint());
        }
        let (a, b) = (self.shape(c.start)?, self.shape(c.end)?);
        Some(a.center().lerp(b.center(), 0.5))
    }

    /// Re-centers every label listening to `anchor`.
    pub fn notify_position_changed(&mut self, anchor: EntityId) {
        let Some(center) = self.anchor_center(anchor) else {
            return;
        };
        let listeners = self.listeners.listeners_of(anchor).to_vec();
        for id in listeners {
            if let Some(label) = self.labels.iter_mut().find(|l| l.id == id) {
                anchoring::recenter(label, center);
            }
        }
    }

    fn recenter_label(&mut self, id: EntityId) {
        let Some(anchor) = self.label(id).and_then(|l| l.anchor) else {
            return;
        };
        let Some(center) = self.anchor_center(anchor.id()) else {
            return;
        };
        if let Some(label) = self.labels.iter_mut().find(|l| l.id == id) {
            anchoring::recenter(label, center);
        }
    }

    /// Attaches `label` to `anchor` and centers it there.
    pub(crate) fn anchor_label(&mut self, label: EntityId, anchor: Anchor) {
        let Some(l) = self.labels.iter_mut().find(|l| l.id == label) else {
            return;
        };
        if let Some(previous) = l.anchor.replace(anchor) {
            self.listeners.unsubscribe(previous.id(), label);
        }
        self.listeners.subscribe(anchor.id(), label);
        self.recenter_label(label);
    }

    /// Recomputes connector routes. Connectors whose visible line changed
    /// notify their labels.
    pub fn refresh(&mut self) {
        let mut changed = Vec::new();
        for i in 0..self.connectors.len() {
            let c = &self.connectors[i];
            let route = match (self.shape(c.start), self.shape(c.end)) {
                (Some(a), Some(b)) => routing::route(a, b, self.config.arrow_size),
                _ => None,
            };
            if self.connectors[i].route != route {
                self.connectors[i].route = route;
                changed.push(self.connectors[i].id);
            }
        }
        for id in changed {
            self.notify_position_changed(id);
        }
    }

    // ---- entity creation ----

    /// Adds a shape with its default anchored label as one undoable step.
    pub fn add_shape(&mut self, flow_type: FlowType, pos: egui::Pos2) -> EntityId {
        let shape = Shape::new(flow_type, pos);
        let shape_id = shape.id;
        let label = Label::new(flow_type.default_text(), self.config.label_font.clone(), pos);
        let label_id = label.id;
        self.shapes.push(shape);
        self.labels.push(label);
        self.anchor_label(label_id, Anchor::Shape(shape_id));
        let batch = self.batch_of(&[shape_id, label_id]);
        self.emit(Command::Append(batch));
        debug!(%shape_id, ?flow_type, "added shape");
        shape_id
    }

    /// Adds a free-standing label whose top-left is at `pos`.
    pub fn add_label(&mut self, pos: egui::Pos2) -> EntityId {
        let label = Label::new(Label::DEFAULT_TEXT, self.config.label_font.clone(), pos);
        let id = label.id;
        self.labels.push(label);
        let batch = self.batch_of(&[id]);
        self.emit(Command::Append(batch));
        id
    }

    /// Connects two distinct existing shapes.
    pub fn connect(&mut self, start: EntityId, end: EntityId) -> Option<EntityId> {
        if start == end || self.shape(start).is_none() || self.shape(end).is_none() {
            return None;
        }
        let connector = Connector::new(start, end, self.config.connector_color);
        let id = connector.id;
        self.connectors.push(connector);
        self.refresh();
        let batch = self.batch_of(&[id]);
        self.emit(Command::Append(batch));
        debug!(%id, %start, %end, "connected shapes");
        Some(id)
    }

    pub fn add_pixmap(&mut self, pixmap: Pixmap) -> EntityId {
        let id = pixmap.id;
        self.pixmaps.push(pixmap);
        let batch = self.batch_of(&[id]);
        self.emit(Command::Append(batch));
        id
    }
}

#[cfg(test)]
mod tests;
