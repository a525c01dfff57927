//! Labels that follow a shape or connector.
//!
//! Anchors keep an explicit list of listening labels. When an anchor moves the
//! scene calls [`recenter`] for each listener.

use crate::model::{EntityId, Label};
use eframe::egui;
use std::collections::HashMap;

#[derive(Clone, Debug, Default)]
pub struct Listeners {
    by_anchor: HashMap<EntityId, Vec<EntityId>>,
}

impl Listeners {
    pub fn subscribe(&mut self, anchor: EntityId, label: EntityId) {
        let list = self.by_anchor.entry(anchor).or_default();
        if !list.contains(&label) {
            list.push(label);
        }
    }

    pub fn unsubscribe(&mut self, anchor: EntityId, label: EntityId) {
        if let Some(list) = self.by_anchor.get_mut(&anchor) {
            list.retain(|l| *l != label);
            if list.is_empty() {
                self.by_anchor.remove(&anchor);
            }
        }
    }

    pub fn listeners_of(&self, anchor: EntityId) -> &[EntityId] {
        self.by_anchor.get(&anchor).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn clear(&mut self) {
        self.by_anchor.clear();
    }
}

/// Moves `label` so its center lands on `anchor_center`.
pub fn recenter(label: &mut Label, anchor_center: egui::Pos2) {
    let delta = anchor_center - label.center();
    if delta.x.is_finite() && delta.y.is_finite() {
        label.pos += delta;
    }
}
