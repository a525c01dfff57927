//! Flat serde records for persistence and the clipboard.
//!
//! Records reference each other by id string. Rebuilding is an upsert: a
//! record whose id already exists replaces that entity in place. Malformed
//! records are logged and skipped; a batch never aborts.

use crate::command::Command;
use crate::error::Result;
use crate::geometry::Transform;
use crate::model::{
    Anchor, BorderColor, Connector, Entity, EntityId, EntityKind, FillColor, FlowType, FontSpec,
    Label, Rgba, Shape,
};
use crate::scene::Scene;
use eframe::egui;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeRecord {
    pub id: String,
    pub type_code: i64,
    pub fill_code: String,
    pub border_code: String,
    /// Nine matrix values, row-major; any other count loads as identity.
    pub transform: Vec<f32>,
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectorRecord {
    pub id: String,
    pub start_id: String,
    pub end_id: String,
    pub color_name: String,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub id: String,
    pub text: String,
    pub color_name: String,
    pub font: String,
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssociationRecord {
    pub label_id: String,
    pub target_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityRecord {
    Shape(ShapeRecord),
    Connector(ConnectorRecord),
    Label(LabelRecord),
    Association(AssociationRecord),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentRecord {
    pub shapes: Vec<ShapeRecord>,
    pub connectors: Vec<ConnectorRecord>,
    pub labels: Vec<LabelRecord>,
    pub associations: Vec<AssociationRecord>,
}

impl DocumentRecord {
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty() && self.connectors.is_empty() && self.labels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.shapes.len() + self.connectors.len() + self.labels.len() + self.associations.len()
    }

    /// Records in dependency order: shapes, labels, connectors, associations.
    pub fn into_records(self) -> impl Iterator<Item = EntityRecord> {
        self.shapes
            .into_iter()
            .map(EntityRecord::Shape)
            .chain(self.labels.into_iter().map(EntityRecord::Label))
            .chain(self.connectors.into_iter().map(EntityRecord::Connector))
            .chain(self.associations.into_iter().map(EntityRecord::Association))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Copied entities on their way through the system clipboard.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipboardPayload {
    pub records: DocumentRecord,
}

impl ClipboardPayload {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_text(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_text(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

pub fn shape_record(s: &Shape) -> ShapeRecord {
    ShapeRecord {
        id: s.id.to_string(),
        type_code: i64::from(s.flow_type.code()),
        fill_code: s.fill.code().to_string(),
        border_code: s.border.code().to_string(),
        transform: s.transform.to_values().to_vec(),
        x: s.pos.x,
        y: s.pos.y,
    }
}

pub fn connector_record(c: &Connector) -> ConnectorRecord {
    let (start, end) = c
        .route
        .map(|r| (r.start, r.end))
        .unwrap_or((egui::Pos2::ZERO, egui::Pos2::ZERO));
    ConnectorRecord {
        id: c.id.to_string(),
        start_id: c.start.to_string(),
        end_id: c.end.to_string(),
        color_name: c.color.name(),
        x1: start.x,
        y1: start.y,
        x2: end.x,
        y2: end.y,
    }
}

pub fn label_record(l: &Label) -> LabelRecord {
    LabelRecord {
        id: l.id.to_string(),
        text: l.text.clone(),
        color_name: l.color.name(),
        font: l.font.descriptor(),
        x: l.pos.x,
        y: l.pos.y,
    }
}

fn association_record(l: &Label) -> Option<AssociationRecord> {
    l.anchor.map(|a| AssociationRecord {
        label_id: l.id.to_string(),
        target_id: a.id().to_string(),
    })
}

fn parse_id(raw: &str, what: &str) -> Option<EntityId> {
    let id = EntityId::parse(raw);
    if id.is_none() {
        warn!(id = raw, "skipping {what} record with malformed id");
    }
    id
}

/// Builds a shape from its record under `id`. Unknown type codes yield `None`;
/// bad colors fall back to defaults and a bad transform to identity.
fn shape_from_record(r: &ShapeRecord, id: EntityId) -> Option<Shape> {
    let Some(flow_type) = FlowType::from_code(r.type_code) else {
        warn!(id = %r.id, code = r.type_code, "skipping shape with unknown type");
        return None;
    };
    let transform = match Transform::from_values(&r.transform) {
        Some(t) if t.is_finite() => t,
        _ => {
            warn!(id = %r.id, values = r.transform.len(), "bad shape transform, using identity");
            Transform::IDENTITY
        }
    };
    let mut shape = Shape::new(flow_type, egui::pos2(r.x, r.y));
    shape.id = id;
    shape.transform = transform;
    shape.fill = FillColor::from_code(&r.fill_code).unwrap_or_default();
    shape.border = BorderColor::from_code(&r.border_code).unwrap_or_default();
    Some(shape)
}

fn label_from_record(r: &LabelRecord, id: EntityId) -> Label {
    let font = FontSpec::parse(&r.font).unwrap_or_default();
    let mut label = Label::new(r.text.clone(), font, egui::pos2(r.x, r.y));
    label.id = id;
    label.color = Rgba::from_name(&r.color_name).unwrap_or(Rgba::BLACK);
    label
}

fn connector_color(r: &ConnectorRecord) -> Rgba {
    Rgba::from_name(&r.color_name).unwrap_or(Rgba::BLACK)
}

impl Scene {
    /// Every entity as records, associations included. Images are not part
    /// of the record format.
    pub fn enumerate_entities(&self) -> DocumentRecord {
        DocumentRecord {
            shapes: self.shapes().iter().map(shape_record).collect(),
            connectors: self.connectors().iter().map(connector_record).collect(),
            labels: self.labels().iter().map(label_record).collect(),
            associations: self.labels().iter().filter_map(association_record).collect(),
        }
    }

    /// Inserts `entity`, replacing an existing entity with the same id in place.
    fn upsert(&mut self, entity: Entity) {
        let id = entity.id();
        let index = self.remove_entity(id).map_or(usize::MAX, |(i, _)| i);
        self.insert_entity(index, entity);
        self.notify_position_changed(id);
    }

    /// Applies one record. Returns `false` when it was skipped.
    pub fn rebuild_entity(&mut self, record: &EntityRecord) -> bool {
        match record {
            EntityRecord::Shape(r) => {
                let Some(id) = parse_id(&r.id, "shape") else {
                    return false;
                };
                let Some(shape) = shape_from_record(r, id) else {
                    return false;
                };
                self.upsert(Entity::Shape(shape));
            }
            EntityRecord::Label(r) => {
                let Some(id) = parse_id(&r.id, "label") else {
                    return false;
                };
                let mut label = label_from_record(r, id);
                label.anchor = self.label(id).and_then(|l| l.anchor);
                self.upsert(Entity::Label(label));
            }
            EntityRecord::Connector(r) => {
                let (Some(id), Some(start), Some(end)) = (
                    parse_id(&r.id, "connector"),
                    parse_id(&r.start_id, "connector"),
                    parse_id(&r.end_id, "connector"),
                ) else {
                    return false;
                };
                if start == end || self.shape(start).is_none() || self.shape(end).is_none() {
                    warn!(id = %r.id, "skipping connector with missing endpoint");
                    return false;
                }
                let mut connector = Connector::new(start, end, connector_color(r));
                connector.id = id;
                self.upsert(Entity::Connector(connector));
            }
            EntityRecord::Association(r) => {
                let (Some(label), Some(target)) = (
                    parse_id(&r.label_id, "association"),
                    parse_id(&r.target_id, "association"),
                ) else {
                    return false;
                };
                let anchor = match self.kind_of(target) {
                    Some(EntityKind::Shape) => Anchor::Shape(target),
                    Some(EntityKind::Connector) => Anchor::Connector(target),
                    _ => {
                        warn!(label = %r.label_id, target = %r.target_id, "skipping dangling association");
                        return false;
                    }
                };
                if self.label(label).is_none() {
                    warn!(label = %r.label_id, "skipping association without label");
                    return false;
                }
                self.anchor_label(label, anchor);
            }
        }
        self.refresh();
        true
    }

    /// Replaces the whole scene with `doc`. Returns how many records were skipped.
    pub fn load_document(&mut self, doc: DocumentRecord) -> usize {
        self.clear();
        let total = doc.len();
        let skipped = doc
            .into_records()
            .filter(|r| !self.rebuild_entity(r))
            .count();
        info!(total, skipped, "loaded document");
        skipped
    }

    /// Selected shapes and labels, labels anchored to copied shapes, and
    /// selected connectors.
    pub fn copy_selection(&self) -> ClipboardPayload {
        let selected = self.selected();
        let shapes: Vec<&Shape> = self
            .shapes()
            .iter()
            .filter(|s| selected.contains(&s.id))
            .collect();
        let connectors: Vec<&Connector> = self
            .connectors()
            .iter()
            .filter(|c| selected.contains(&c.id))
            .collect();
        let labels: Vec<&Label> = self
            .labels()
            .iter()
            .filter(|l| {
                selected.contains(&l.id)
                    || l.anchor.is_some_and(|a| {
                        shapes.iter().any(|s| s.id == a.id())
                            || connectors.iter().any(|c| c.id == a.id())
                    })
            })
            .collect();
        ClipboardPayload {
            records: DocumentRecord {
                shapes: shapes.iter().map(|s| shape_record(s)).collect(),
                connectors: connectors.iter().map(|c| connector_record(c)).collect(),
                labels: labels.iter().map(|l| label_record(l)).collect(),
                associations: labels.iter().filter_map(|l| association_record(l)).collect(),
            },
        }
    }

    /// Inserts a copy of `payload` under fresh ids, shifted so the centroid
    /// of its shape and label positions lands on `drop`. Connectors missing an
    /// endpoint and dangling associations are dropped. Returns the new ids,
    /// which also become the selection.
    pub fn paste(&mut self, payload: &ClipboardPayload, drop: egui::Pos2) -> Vec<EntityId> {
        let records = &payload.records;
        let positions: Vec<egui::Vec2> = records
            .shapes
            .iter()
            .map(|r| egui::vec2(r.x, r.y))
            .chain(records.labels.iter().map(|r| egui::vec2(r.x, r.y)))
            .collect();
        let offset = if positions.is_empty() {
            egui::Vec2::ZERO
        } else {
            let sum = positions.iter().fold(egui::Vec2::ZERO, |acc, p| acc + *p);
            drop.to_vec2() - sum / positions.len() as f32
        };

        let mut fresh: HashMap<&str, EntityId> = HashMap::new();
        let mut added = Vec::new();
        for r in &records.shapes {
            let id = EntityId::new();
            let Some(mut shape) = shape_from_record(r, id) else {
                continue;
            };
            shape.pos += offset;
            fresh.insert(r.id.as_str(), id);
            self.insert_entity(usize::MAX, Entity::Shape(shape));
            added.push(id);
        }
        for r in &records.labels {
            let id = EntityId::new();
            let mut label = label_from_record(r, id);
            label.pos += offset;
            fresh.insert(r.id.as_str(), id);
            self.insert_entity(usize::MAX, Entity::Label(label));
            added.push(id);
        }
        for r in &records.connectors {
            let (Some(start), Some(end)) = (
                fresh.get(r.start_id.as_str()),
                fresh.get(r.end_id.as_str()),
            ) else {
                continue;
            };
            let connector = Connector::new(*start, *end, connector_color(r));
            fresh.insert(r.id.as_str(), connector.id);
            added.push(connector.id);
            self.insert_entity(usize::MAX, Entity::Connector(connector));
        }
        self.refresh();
        for r in &records.associations {
            let (Some(label), Some(target)) = (
                fresh.get(r.label_id.as_str()),
                fresh.get(r.target_id.as_str()),
            ) else {
                continue;
            };
            let anchor = match self.kind_of(*target) {
                Some(EntityKind::Shape) => Anchor::Shape(*target),
                Some(EntityKind::Connector) => Anchor::Connector(*target),
                _ => continue,
            };
            self.anchor_label(*label, anchor);
        }
        if added.is_empty() {
            return added;
        }
        let batch = self.batch_of(&added);
        self.emit(Command::Append(batch));
        self.select_all_of(added.iter().copied());
        info!(count = added.len(), "pasted entities");
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_connected(scene: &mut Scene) -> (EntityId, EntityId, EntityId) {
        let a = scene.add_shape(FlowType::Process, egui::pos2(0.0, 0.0));
        let b = scene.add_shape(FlowType::Decision, egui::pos2(400.0, 0.0));
        let c = scene.connect(a, b).expect("connector");
        scene.take_commands();
        (a, b, c)
    }

    #[test]
    fn enumerate_then_load_restores_scene() {
        let mut scene = Scene::default();
        let (a, _, c) = two_connected(&mut scene);
        let doc = scene.enumerate_entities();
        assert_eq!(doc.shapes.len(), 2);
        assert_eq!(doc.labels.len(), 2);
        assert_eq!(doc.associations.len(), 2);

        let text = doc.to_json().expect("serialize");
        let mut other = Scene::default();
        let skipped = other.load_document(DocumentRecord::from_json(&text).expect("parse"));
        assert_eq!(skipped, 0);
        assert_eq!(other.shapes(), scene.shapes());
        assert!(other.connector(c).is_some_and(|c| c.route.is_some()));
        assert_eq!(other.labels_of(a), scene.labels_of(a));
    }

    #[test]
    fn rebuild_replaces_same_id_in_place() {
        let mut scene = Scene::default();
        let (a, b, _) = two_connected(&mut scene);
        let mut record = shape_record(scene.shape(a).expect("shape"));
        record.fill_code = "y".into();
        assert!(scene.rebuild_entity(&EntityRecord::Shape(record)));
        assert_eq!(scene.shapes().len(), 2);
        assert_eq!(scene.shapes()[0].id, a);
        assert_eq!(scene.shapes()[0].fill, FillColor::Yellow);
        assert_eq!(scene.shapes()[1].id, b);
    }

    #[test]
    fn malformed_records_are_skipped() {
        let mut scene = Scene::default();
        let bad_id = EntityRecord::Label(LabelRecord {
            id: "not-an-id".into(),
            text: "x".into(),
            color_name: "#000000".into(),
            font: String::new(),
            x: 0.0,
            y: 0.0,
        });
        assert!(!scene.rebuild_entity(&bad_id));
        let unknown_type = EntityRecord::Shape(ShapeRecord {
            id: EntityId::new().to_string(),
            type_code: 42,
            fill_code: "w".into(),
            border_code: "b".into(),
            transform: vec![],
            x: 0.0,
            y: 0.0,
        });
        assert!(!scene.rebuild_entity(&unknown_type));
        assert!(scene.is_empty());
    }

    #[test]
    fn dangling_references_are_dropped_and_the_rest_loads() {
        let mut scene = Scene::default();
        let shape_id = EntityId::new();
        let label_id = EntityId::new();
        let doc = DocumentRecord {
            shapes: vec![ShapeRecord {
                id: shape_id.to_string(),
                type_code: 1,
                fill_code: "w".into(),
                border_code: "b".into(),
                transform: vec![],
                x: 0.0,
                y: 0.0,
            }],
            connectors: vec![ConnectorRecord {
                id: EntityId::new().to_string(),
                start_id: shape_id.to_string(),
                end_id: EntityId::new().to_string(),
                color_name: "#000000".into(),
                x1: 0.0,
                y1: 0.0,
                x2: 0.0,
                y2: 0.0,
            }],
            labels: vec![LabelRecord {
                id: label_id.to_string(),
                text: "start".into(),
                color_name: "#000000".into(),
                font: String::new(),
                x: 10.0,
                y: 10.0,
            }],
            associations: vec![AssociationRecord {
                label_id: label_id.to_string(),
                target_id: EntityId::new().to_string(),
            }],
        };
        assert_eq!(scene.load_document(doc), 2);
        assert!(scene.shape(shape_id).is_some());
        assert!(scene.connectors().is_empty());
        let label = scene.label(label_id).expect("label");
        assert_eq!(label.text, "start");
        assert!(label.anchor.is_none());
    }

    #[test]
    fn short_transform_loads_as_identity() {
        let mut scene = Scene::default();
        let id = EntityId::new();
        let record = EntityRecord::Shape(ShapeRecord {
            id: id.to_string(),
            type_code: 2,
            fill_code: "?".into(),
            border_code: "b".into(),
            transform: vec![1.0, 0.0, 0.0],
            x: 5.0,
            y: 5.0,
        });
        assert!(scene.rebuild_entity(&record));
        let shape = scene.shape(id).expect("shape");
        assert_eq!(shape.transform, Transform::IDENTITY);
        assert_eq!(shape.fill, FillColor::White);
    }

    #[test]
    fn paste_remaps_ids_and_offsets_to_drop_point() {
        let mut scene = Scene::default();
        let (a, b, c) = two_connected(&mut scene);
        scene.select_all_of([a, b, c]);
        let payload = scene.copy_selection();
        let text = payload.to_text().expect("serialize");
        let payload = ClipboardPayload::from_text(&text).expect("parse");

        let added = scene.paste(&payload, egui::pos2(1000.0, 1000.0));
        assert_eq!(added.len(), 5);
        assert!(added.iter().all(|id| ![a, b, c].contains(id)));
        assert_eq!(scene.shapes().len(), 4);
        assert_eq!(scene.connectors().len(), 2);
        assert_eq!(scene.selected().len(), 5);
        let commands = scene.take_commands();
        assert!(matches!(&commands[..], [Command::Append(batch)] if batch.len() == 5));
        // The pasted connector joins the pasted shapes, not the originals.
        let pasted = scene.connectors().last().expect("connector");
        assert!(added.contains(&pasted.start) && added.contains(&pasted.end));
    }

    #[test]
    fn paste_drops_connector_without_both_endpoints() {
        let mut scene = Scene::default();
        let (a, _, c) = two_connected(&mut scene);
        scene.select_all_of([a, c]);
        let payload = scene.copy_selection();
        scene.paste(&payload, egui::pos2(0.0, 500.0));
        assert_eq!(scene.connectors().len(), 1);
        assert_eq!(scene.shapes().len(), 3);
    }
}
