use eframe::egui;
use serde::{Deserialize, Serialize};

/// A 3×3 matrix acting on row vectors, laid out the way retained-mode scene
/// graphs store item transforms.
///
/// `translate`, `scale` and `rotate` compose on the local side: the new
/// operation runs on the point before the existing matrix does, so
/// `t.translate(d)` followed by `t.map(p)` maps `p + d` through the old `t`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub m11: f32,
    pub m12: f32,
    pub m13: f32,
    pub m21: f32,
    pub m22: f32,
    pub m23: f32,
    pub m31: f32,
    pub m32: f32,
    pub m33: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        m11: 1.0,
        m12: 0.0,
        m13: 0.0,
        m21: 0.0,
        m22: 1.0,
        m23: 0.0,
        m31: 0.0,
        m32: 0.0,
        m33: 1.0,
    };

    pub fn from_scale(sx: f32, sy: f32) -> Self {
        let mut t = Self::IDENTITY;
        t.m11 = sx;
        t.m22 = sy;
        t
    }

    /// Builds a matrix from nine values in row order. Any other count is rejected.
    pub fn from_values(values: &[f32]) -> Option<Self> {
        let [m11, m12, m13, m21, m22, m23, m31, m32, m33] = <[f32; 9]>::try_from(values).ok()?;
        Some(Self {
            m11,
            m12,
            m13,
            m21,
            m22,
            m23,
            m31,
            m32,
            m33,
        })
    }

    pub fn to_values(self) -> [f32; 9] {
        [
            self.m11, self.m12, self.m13, self.m21, self.m22, self.m23, self.m31, self.m32,
            self.m33,
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.to_values().iter().all(|v| v.is_finite())
    }

    pub fn is_affine(&self) -> bool {
        self.m13 == 0.0 && self.m23 == 0.0 && self.m33 == 1.0
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.m31 += dx * self.m11 + dy * self.m21;
        self.m32 += dx * self.m12 + dy * self.m22;
        self.m33 += dx * self.m13 + dy * self.m23;
    }

    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.m11 *= sx;
        self.m12 *= sx;
        self.m13 *= sx;
        self.m21 *= sy;
        self.m22 *= sy;
        self.m23 *= sy;
    }

    /// Rotates by `degrees`, clockwise on a y-down canvas.
    pub fn rotate(&mut self, degrees: f32) {
        let (sin, cos) = match degrees.rem_euclid(360.0) {
            a if a == 0.0 => return,
            a if a == 90.0 => (1.0, 0.0),
            a if a == 180.0 => (0.0, -1.0),
            a if a == 270.0 => (-1.0, 0.0),
            a => a.to_radians().sin_cos(),
        };
        let (m11, m12, m13) = (self.m11, self.m12, self.m13);
        let (m21, m22, m23) = (self.m21, self.m22, self.m23);
        self.m11 = cos * m11 + sin * m21;
        self.m12 = cos * m12 + sin * m22;
        self.m13 = cos * m13 + sin * m23;
        self.m21 = -sin * m11 + cos * m21;
        self.m22 = -sin * m12 + cos * m22;
        self.m23 = -sin * m13 + cos * m23;
    }

    pub fn map(&self, p: egui::Pos2) -> egui::Pos2 {
        let x = self.m11 * p.x + self.m21 * p.y + self.m31;
        let y = self.m12 * p.x + self.m22 * p.y + self.m32;
        if self.is_affine() {
            return egui::pos2(x, y);
        }
        let w = self.m13 * p.x + self.m23 * p.y + self.m33;
        if w.abs() <= f32::EPSILON {
            return egui::pos2(x, y);
        }
        egui::pos2(x / w, y / w)
    }

    /// Axis-aligned bounds of the mapped rectangle.
    pub fn map_rect(&self, rect: egui::Rect) -> egui::Rect {
        let corners = [
            rect.left_top(),
            rect.right_top(),
            rect.right_bottom(),
            rect.left_bottom(),
        ]
        .map(|p| self.map(p));
        aabb_of_points(&corners)
    }

    pub fn determinant(&self) -> f32 {
        self.m11 * (self.m22 * self.m33 - self.m23 * self.m32)
            - self.m12 * (self.m21 * self.m33 - self.m23 * self.m31)
            + self.m13 * (self.m21 * self.m32 - self.m22 * self.m31)
    }

    pub fn inverted(&self) -> Option<Transform> {
        let det = self.determinant();
        if det.abs() <= f32::EPSILON || !det.is_finite() {
            return None;
        }
        let inv = 1.0 / det;
        Some(Transform {
            m11: (self.m22 * self.m33 - self.m23 * self.m32) * inv,
            m12: (self.m13 * self.m32 - self.m12 * self.m33) * inv,
            m13: (self.m12 * self.m23 - self.m13 * self.m22) * inv,
            m21: (self.m23 * self.m31 - self.m21 * self.m33) * inv,
            m22: (self.m11 * self.m33 - self.m13 * self.m31) * inv,
            m23: (self.m13 * self.m21 - self.m11 * self.m23) * inv,
            m31: (self.m21 * self.m32 - self.m22 * self.m31) * inv,
            m32: (self.m12 * self.m31 - self.m11 * self.m32) * inv,
            m33: (self.m11 * self.m22 - self.m12 * self.m21) * inv,
        })
    }
}

pub fn aabb_of_points(points: &[egui::Pos2]) -> egui::Rect {
    let mut it = points.iter();
    let Some(first) = it.next() else {
        return egui::Rect::NOTHING;
    };
    let mut min = *first;
    let mut max = *first;
    for p in it {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    egui::Rect::from_min_max(min, max)
}

pub fn distance_to_segment(p: egui::Pos2, a: egui::Pos2, b: egui::Pos2) -> f32 {
    let ab = b - a;
    let ap = p - a;
    let ab_len2 = ab.x * ab.x + ab.y * ab.y;
    if ab_len2 <= f32::EPSILON {
        return (p - a).length();
    }
    let t = ((ap.x * ab.x + ap.y * ab.y) / ab_len2).clamp(0.0, 1.0);
    let closest = a + ab * t;
    (p - closest).length()
}

/// Intersection of segments `a1-a2` and `b1-b2`, only when it lies on both.
pub fn bounded_intersection(
    a1: egui::Pos2,
    a2: egui::Pos2,
    b1: egui::Pos2,
    b2: egui::Pos2,
) -> Option<egui::Pos2> {
    let a = a2 - a1;
    let b = b1 - b2;
    let denom = a.y * b.x - a.x * b.y;
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    let c = a1 - b1;
    let na = (b.y * c.x - b.x * c.y) / denom;
    if !(0.0..=1.0).contains(&na) {
        return None;
    }
    let nb = (a.x * c.y - a.y * c.x) / denom;
    if !(0.0..=1.0).contains(&nb) {
        return None;
    }
    Some(a1 + a * na)
}

/// Direction of `from → to` in degrees, counter-clockwise from +x with y
/// pointing down, normalized to `[0, 360)`.
pub fn line_angle(from: egui::Pos2, to: egui::Pos2) -> f32 {
    let d = to - from;
    if d.x == 0.0 && d.y == 0.0 {
        return 0.0;
    }
    let theta = (-d.y).atan2(d.x).to_degrees();
    let angle = if theta < 0.0 { theta + 360.0 } else { theta };
    if angle >= 360.0 { 0.0 } else { angle }
}

/// Counter-clockwise angle from line `a` to line `b`, in `[0, 360)`.
pub fn angle_to(a: (egui::Pos2, egui::Pos2), b: (egui::Pos2, egui::Pos2)) -> f32 {
    let delta = line_angle(b.0, b.1) - line_angle(a.0, a.1);
    let normalized = if delta < 0.0 { delta + 360.0 } else { delta };
    if (normalized - 360.0).abs() <= 1e-4 {
        0.0
    } else {
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: egui::Pos2, b: egui::Pos2) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn translate_applies_before_existing_scale() {
        let mut t = Transform::from_scale(10.0, 10.0);
        t.translate(1.0, 2.0);
        assert!(approx(t.map(egui::pos2(0.0, 0.0)), egui::pos2(10.0, 20.0)));
    }

    #[test]
    fn rotate_quarter_turn_is_clockwise_on_screen() {
        let mut t = Transform::IDENTITY;
        t.rotate(90.0);
        assert!(approx(t.map(egui::pos2(1.0, 0.0)), egui::pos2(0.0, 1.0)));
    }

    #[test]
    fn inverse_round_trips_a_point() {
        let mut t = Transform::from_scale(10.0, 4.0);
        t.rotate(33.0);
        t.translate(3.0, -7.0);
        let inv = t.inverted().expect("invertible");
        let p = egui::pos2(12.5, -3.0);
        assert!(approx(inv.map(t.map(p)), p));
    }

    #[test]
    fn from_values_rejects_wrong_count() {
        assert!(Transform::from_values(&[1.0, 0.0, 0.0]).is_none());
        let t = Transform::from_values(&Transform::from_scale(2.0, 3.0).to_values());
        assert_eq!(t, Some(Transform::from_scale(2.0, 3.0)));
    }

    #[test]
    fn singular_transform_has_no_inverse() {
        assert!(Transform::from_scale(0.0, 1.0).inverted().is_none());
    }

    #[test]
    fn bounded_intersection_requires_overlap() {
        let hit = bounded_intersection(
            egui::pos2(0.0, 0.0),
            egui::pos2(10.0, 10.0),
            egui::pos2(0.0, 10.0),
            egui::pos2(10.0, 0.0),
        );
        assert!(approx(hit.expect("crossing"), egui::pos2(5.0, 5.0)));

        let miss = bounded_intersection(
            egui::pos2(0.0, 0.0),
            egui::pos2(1.0, 1.0),
            egui::pos2(0.0, 10.0),
            egui::pos2(10.0, 0.0),
        );
        assert!(miss.is_none());
    }

    #[test]
    fn angles_follow_screen_conventions() {
        let c = egui::pos2(0.0, 0.0);
        assert_eq!(line_angle(c, egui::pos2(1.0, 0.0)), 0.0);
        assert!((line_angle(c, egui::pos2(0.0, -1.0)) - 90.0).abs() < 1e-4);
        let a = (c, egui::pos2(1.0, 0.0));
        let b = (c, egui::pos2(0.0, -1.0));
        assert!((angle_to(a, b) - 90.0).abs() < 1e-4);
        assert!((angle_to(b, a) - 270.0).abs() < 1e-4);
    }
}
