//! Drag handles of a selected shape and the transforms they produce.
//!
//! Corner handles scale the shape about the opposite corner; the bottom-center
//! handle rotates it about its local center. Everything here works in the
//! shape's local frame, and a drag only changes the shape on release.

use crate::geometry::{self, Transform};
use crate::model::{EntityId, Shape};
use eframe::egui;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    LeftTop,
    LeftBottom,
    RightTop,
    RightBottom,
    BottomCenter,
}

impl Direction {
    pub const ALL: [Direction; 5] = [
        Direction::LeftTop,
        Direction::LeftBottom,
        Direction::RightTop,
        Direction::RightBottom,
        Direction::BottomCenter,
    ];
}

/// Edge length of a handle, in local units.
pub const HANDLE_SIZE: f32 = 1.5;

/// Hot-spot of a handle inside the parent's local `rect`.
pub fn handle_rect(direction: Direction, rect: egui::Rect) -> egui::Rect {
    let (w, h) = (rect.width(), rect.height());
    let min = match direction {
        Direction::LeftTop => egui::pos2(0.0, 0.0),
        Direction::LeftBottom => egui::pos2(0.0, h - HANDLE_SIZE),
        Direction::RightTop => egui::pos2(w - HANDLE_SIZE, 0.0),
        Direction::RightBottom => egui::pos2(w - HANDLE_SIZE, h - HANDLE_SIZE),
        Direction::BottomCenter => egui::pos2(w / 2.0 - HANDLE_SIZE / 2.0, h - HANDLE_SIZE),
    };
    egui::Rect::from_min_size(rect.min + min.to_vec2(), egui::Vec2::splat(HANDLE_SIZE))
}

/// The handle of `shape` under a scene point, if any.
pub fn hit_test(shape: &Shape, scene: egui::Pos2) -> Option<Direction> {
    let local = shape.map_from_scene(scene)?;
    let rect = shape.local_rect();
    Direction::ALL
        .into_iter()
        .find(|d| handle_rect(*d, rect).contains(local))
}

/// Scene-space outline of every handle, for drawing.
pub fn handle_polygons(shape: &Shape) -> Vec<(Direction, [egui::Pos2; 4])> {
    let rect = shape.local_rect();
    Direction::ALL
        .into_iter()
        .map(|d| {
            let r = handle_rect(d, rect);
            let corners = [r.left_top(), r.right_top(), r.right_bottom(), r.left_bottom()]
                .map(|p| shape.map_to_scene(p));
            (d, corners)
        })
        .collect()
}

/// An in-flight handle drag. Points are in the parent's local frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControlDrag {
    pub shape: EntityId,
    pub direction: Direction,
    pub press: egui::Pos2,
    pub current: egui::Pos2,
}

/// New transform for a completed drag from `press` to `release`.
///
/// Returns `None` when the drag is rejected, changes nothing, or would
/// produce non-finite values.
pub fn drag_transform(
    direction: Direction,
    transform: &Transform,
    rect: egui::Rect,
    press: egui::Pos2,
    release: egui::Pos2,
    margin: f32,
) -> Option<Transform> {
    let mut next = *transform;
    if direction == Direction::BottomCenter {
        let center = rect.center();
        let angle = geometry::angle_to((center, release), (center, press));
        if angle == 0.0 || !angle.is_finite() {
            return None;
        }
        next.translate(center.x, center.y);
        next.rotate(angle);
        next.translate(-center.x, -center.y);
        return next.is_finite().then_some(next);
    }

    let (w, h) = (rect.width(), rect.height());
    if w <= 0.0 || h <= 0.0 {
        return None;
    }
    let mut diff = release - press;
    match direction {
        Direction::LeftTop => {
            if release.x > rect.min.x + w - margin || release.y > rect.min.y + h - margin {
                return None;
            }
            next.translate(diff.x, diff.y);
            diff = -diff;
        }
        Direction::LeftBottom => {
            if release.x > rect.min.x + w - margin || release.y < rect.min.y + margin {
                return None;
            }
            next.translate(diff.x, 0.0);
            diff.x = -diff.x;
        }
        Direction::RightTop => {
            if release.x < rect.min.x + margin || release.y > rect.min.y + h - margin {
                return None;
            }
            next.translate(0.0, diff.y);
            diff.y = -diff.y;
        }
        Direction::RightBottom => {
            if release.x < rect.min.x + margin || release.y < rect.min.y + margin {
                return None;
            }
        }
        Direction::BottomCenter => unreachable!("handled above"),
    }
    let sx = (w + diff.x) / w;
    let sy = (h + diff.y) / h;
    if sx == 1.0 && sy == 1.0 {
        return None;
    }
    next.scale(sx, sy);
    (next.is_finite() && sx > 0.0 && sy > 0.0).then_some(next)
}
