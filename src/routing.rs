//! Visible geometry of connectors.
//!
//! A connector stores only its endpoint shapes. The drawn segment runs between
//! the points where the line joining the two shape centers leaves each shape's
//! frame, and ends in an arrowhead at the target shape.

use crate::geometry::bounded_intersection;
use crate::model::{Route, Shape};
use eframe::egui;
use std::f32::consts::PI;

/// Side of the routing frame: the unscaled glyph at its default size.
const FRAME_SIZE: f32 = Shape::LOCAL_SIZE * Shape::DEFAULT_SCALE;

/// Routing frame of `shape`, translated to its position but never scaled or
/// rotated, walked as a closed polygon.
fn frame_polygon(shape: &Shape) -> [egui::Pos2; 5] {
    let r = egui::Rect::from_min_size(shape.pos, egui::Vec2::splat(FRAME_SIZE));
    [
        r.left_top(),
        r.left_bottom(),
        r.right_bottom(),
        r.right_top(),
        r.left_top(),
    ]
}

/// First frame edge of `shape` crossed by `line`, or the shape position.
pub fn frame_intersection(shape: &Shape, line: (egui::Pos2, egui::Pos2)) -> egui::Pos2 {
    frame_polygon(shape)
        .windows(2)
        .find_map(|edge| bounded_intersection(edge[0], edge[1], line.0, line.1))
        .unwrap_or(shape.pos)
}

fn frame_center(shape: &Shape) -> egui::Pos2 {
    shape.pos + egui::Vec2::splat(FRAME_SIZE / 2.0)
}

/// Two barb points of an arrowhead whose tip is `end`, pointing along `start → end`.
pub fn arrowhead(start: egui::Pos2, end: egui::Pos2, size: f32) -> [egui::Pos2; 2] {
    let d = end - start;
    let angle = (-d.y).atan2(d.x);
    let barb = |a: f32| end + egui::vec2(a.sin() * size, a.cos() * size);
    [barb(angle - PI / 3.0), barb(angle - PI + PI / 3.0)]
}

/// Route between two shapes, or `None` while their bounds overlap.
pub fn route(start: &Shape, end: &Shape, arrow_size: f32) -> Option<Route> {
    if start.scene_bounds().intersects(end.scene_bounds()) {
        return None;
    }
    let center_line = (frame_center(start), frame_center(end));
    let a = frame_intersection(start, center_line);
    let b = frame_intersection(end, center_line);
    let route = Route {
        start: a,
        end: b,
        arrow: arrowhead(a, b, arrow_size),
    };
    let finite = [route.start, route.end, route.arrow[0], route.arrow[1]]
        .iter()
        .all(|p| p.x.is_finite() && p.y.is_finite());
    finite.then_some(route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FlowType;

    fn approx(a: egui::Pos2, b: egui::Pos2) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn horizontal_neighbours_meet_at_facing_edges() {
        let a = Shape::new(FlowType::Process, egui::pos2(0.0, 0.0));
        let b = Shape::new(FlowType::Process, egui::pos2(400.0, 0.0));
        let r = route(&a, &b, 10.0).expect("separate shapes");
        assert!(approx(r.start, egui::pos2(160.0, 80.0)));
        assert!(approx(r.end, egui::pos2(400.0, 80.0)));
    }

    #[test]
    fn resized_shape_keeps_its_routing_frame() {
        let mut a = Shape::new(FlowType::Process, egui::pos2(0.0, 0.0));
        a.transform.scale(1.5, 1.0);
        let b = Shape::new(FlowType::Process, egui::pos2(600.0, 0.0));
        assert!((a.scene_bounds().width() - 240.0).abs() < 1e-3);
        let r = route(&a, &b, 10.0).expect("separate shapes");
        assert!(approx(r.start, egui::pos2(160.0, 80.0)));
        assert!(approx(r.end, egui::pos2(600.0, 80.0)));
    }

    #[test]
    fn arrowhead_legs_are_sixty_degrees_off_the_line() {
        let tip = egui::pos2(100.0, 0.0);
        let [p1, p2] = arrowhead(egui::pos2(0.0, 0.0), tip, 10.0);
        assert!(((p1 - tip).length() - 10.0).abs() < 1e-3);
        assert!(((p2 - tip).length() - 10.0).abs() < 1e-3);
        // Both barbs trail behind the tip, mirrored across the line.
        assert!(p1.x < tip.x && p2.x < tip.x);
        assert!((p1.y + p2.y).abs() < 1e-3);
        let back = egui::vec2(-1.0, 0.0);
        let cos = (p1 - tip).normalized().dot(back);
        assert!((cos - (PI / 6.0).cos()).abs() < 1e-3);
    }

    #[test]
    fn overlapping_shapes_have_no_route() {
        let a = Shape::new(FlowType::Process, egui::pos2(0.0, 0.0));
        let b = Shape::new(FlowType::Process, egui::pos2(100.0, 100.0));
        assert!(route(&a, &b, 10.0).is_none());
    }

    #[test]
    fn line_missing_the_frame_falls_back_to_position() {
        let s = Shape::new(FlowType::Process, egui::pos2(50.0, 50.0));
        let far = (egui::pos2(1000.0, 1000.0), egui::pos2(2000.0, 1000.0));
        assert_eq!(frame_intersection(&s, far), s.pos);
    }
}
