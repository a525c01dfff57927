//! Alignment guides shown while a shape is dragged.

use crate::model::Shape;
use eframe::egui;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    /// A vertical line at a left or right edge; snaps x.
    Vertical,
    /// A horizontal line at a top or bottom edge; snaps y.
    Horizontal,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Guide {
    pub axis: Axis,
    /// x for vertical guides, y for horizontal ones.
    pub coord: f32,
    /// Middle of the edge the guide came from.
    pub anchor: egui::Pos2,
}

/// Four guides per shape: its left, right, top and bottom edges.
pub fn guides_for(shape: &Shape) -> [Guide; 4] {
    let r = shape.scene_bounds();
    let mid_y = r.min.y + r.height() / 2.0;
    let mid_x = r.min.x + r.width() / 2.0;
    [
        Guide {
            axis: Axis::Vertical,
            coord: r.min.x,
            anchor: egui::pos2(r.min.x, mid_y),
        },
        Guide {
            axis: Axis::Vertical,
            coord: r.max.x,
            anchor: egui::pos2(r.max.x, mid_y),
        },
        Guide {
            axis: Axis::Horizontal,
            coord: r.min.y,
            anchor: egui::pos2(mid_x, r.min.y),
        },
        Guide {
            axis: Axis::Horizontal,
            coord: r.max.y,
            anchor: egui::pos2(mid_x, r.max.y),
        },
    ]
}

/// Result of testing a dragged shape against the candidate guides.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snap {
    pub offset: egui::Vec2,
    pub shown: Vec<Guide>,
}

/// Evaluates `candidates` against `bounds` of the dragged shape.
///
/// A guide shows when the matching edge lies within `tolerance` outside it and
/// its anchor is within half the dragged width plus `reach` of the dragged
/// center. Per axis the smallest gap wins; on equal gaps the guide examined
/// last wins.
pub fn evaluate(candidates: &[Guide], bounds: egui::Rect, tolerance: f32, reach: f32) -> Snap {
    let center = bounds.center();
    let half_w = bounds.width() / 2.0;
    let half_h = bounds.height() / 2.0;
    let mut best_x = tolerance + 1.0;
    let mut best_y = tolerance + 1.0;
    let mut shown = Vec::new();
    for g in candidates {
        let (gap, along) = match g.axis {
            Axis::Vertical => ((center.x - g.coord).abs() - half_w, center.x),
            Axis::Horizontal => ((center.y - g.coord).abs() - half_h, center.y),
        };
        if !(0.0..=tolerance).contains(&gap) || g.anchor.distance(center) >= half_w + reach {
            continue;
        }
        shown.push(*g);
        let signed = if along >= g.coord { -gap } else { gap };
        let best = match g.axis {
            Axis::Vertical => &mut best_x,
            Axis::Horizontal => &mut best_y,
        };
        if gap <= best.abs() {
            *best = signed;
        }
    }
    let pick = |v: f32| if v.abs() <= tolerance { v } else { 0.0 };
    Snap {
        offset: egui::vec2(pick(best_x), pick(best_y)),
        shown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FlowType;

    fn rect(x: f32, y: f32) -> egui::Rect {
        egui::Rect::from_min_size(egui::pos2(x, y), egui::vec2(160.0, 160.0))
    }

    #[test]
    fn shape_yields_four_edge_guides() {
        let s = Shape::new(FlowType::Process, egui::pos2(10.0, 20.0));
        let g = guides_for(&s);
        assert_eq!(g[0].coord, 10.0);
        assert_eq!(g[1].coord, 170.0);
        assert_eq!(g[2].anchor, egui::pos2(90.0, 20.0));
        assert_eq!(g[3].coord, 180.0);
    }

    #[test]
    fn near_edge_snaps_flush() {
        let other = Shape::new(FlowType::Process, egui::pos2(0.0, 0.0));
        // Dragged shape's left edge sits 6 units right of the other's right edge.
        let snap = evaluate(&guides_for(&other), rect(166.0, 0.0), 10.0, 200.0);
        assert_eq!(snap.offset.x, -6.0);
        assert!(snap.shown.iter().any(|g| g.axis == Axis::Vertical && g.coord == 160.0));
    }

    #[test]
    fn far_or_overlapping_edges_do_not_snap() {
        let other = Shape::new(FlowType::Process, egui::pos2(0.0, 0.0));
        let far = evaluate(&guides_for(&other), rect(185.0, 0.0), 10.0, 200.0);
        assert_eq!(far.offset.x, 0.0);
        // Overlapping gives a negative gap, which never shows.
        let overlap = evaluate(&guides_for(&other), rect(150.0, 0.0), 10.0, 200.0);
        assert_eq!(overlap.offset.x, 0.0);
    }

    #[test]
    fn distant_anchor_is_ignored() {
        let other = Shape::new(FlowType::Process, egui::pos2(0.0, 1000.0));
        let snap = evaluate(&guides_for(&other), rect(166.0, 0.0), 10.0, 200.0);
        assert!(snap.shown.is_empty());
        assert_eq!(snap.offset, egui::Vec2::ZERO);
    }

    #[test]
    fn equal_gaps_take_the_last_guide() {
        let a = Guide {
            axis: Axis::Vertical,
            coord: 160.0,
            anchor: egui::pos2(160.0, 80.0),
        };
        let b = Guide {
            axis: Axis::Vertical,
            coord: 332.0,
            anchor: egui::pos2(332.0, 80.0),
        };
        // Dragged 166..326: 6 units from both guides, on opposite sides.
        let snap = evaluate(&[a, b], rect(166.0, 0.0), 10.0, 400.0);
        assert_eq!(snap.shown.len(), 2);
        assert_eq!(snap.offset.x, 6.0);
    }
}
