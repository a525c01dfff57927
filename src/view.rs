use eframe::egui;

/// Pan and zoom of the canvas. `origin` arguments are the screen position of
/// the canvas' top-left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct View {
    pub pan_screen: egui::Vec2,
    pub zoom: f32,
}

impl Default for View {
    fn default() -> Self {
        Self {
            pan_screen: egui::Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl View {
    pub fn world_to_screen(&self, origin: egui::Pos2, world: egui::Pos2) -> egui::Pos2 {
        origin + self.pan_screen + world.to_vec2() * self.zoom
    }

    pub fn screen_to_world(&self, origin: egui::Pos2, screen: egui::Pos2) -> egui::Pos2 {
        ((screen - origin - self.pan_screen) / self.zoom).to_pos2()
    }

    /// Scene rectangle currently shown in `viewport`.
    pub fn visible_world_rect(&self, viewport: egui::Rect) -> egui::Rect {
        egui::Rect::from_two_pos(
            self.screen_to_world(viewport.min, viewport.min),
            self.screen_to_world(viewport.min, viewport.max),
        )
    }

    /// Scales by `factor` keeping the scene point `anchor` at the same screen position.
    pub fn zoom_about_world_point(&mut self, anchor: egui::Pos2, factor: f32) {
        let anchor_screen = self.pan_screen + anchor.to_vec2() * self.zoom;
        self.zoom *= factor;
        self.pan_screen = anchor_screen - anchor.to_vec2() * self.zoom;
    }

    /// Moves the visible content by a scene-space delta.
    pub fn pan_by_world(&mut self, delta: egui::Vec2) {
        self.pan_screen += delta * self.zoom;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_keeps_anchor_on_screen() {
        let mut view = View::default();
        let origin = egui::pos2(10.0, 20.0);
        let screen = egui::pos2(300.0, 200.0);
        let anchor = view.screen_to_world(origin, screen);
        view.zoom_about_world_point(anchor, 1.25);
        let after = view.world_to_screen(origin, anchor);
        assert!((after - screen).length() < 1e-3);
        assert!((view.zoom - 1.25).abs() < 1e-6);
    }

    #[test]
    fn zoom_in_then_out_restores_scale() {
        let mut view = View::default();
        let anchor = egui::pos2(42.0, -17.0);
        view.zoom_about_world_point(anchor, 1.25);
        view.zoom_about_world_point(anchor, 1.0 / 1.25);
        assert!((view.zoom - 1.0).abs() < 1e-5);
        assert!(view.pan_screen.length() < 1e-3);
    }

    #[test]
    fn pan_is_expressed_in_scene_units() {
        let mut view = View {
            pan_screen: egui::Vec2::ZERO,
            zoom: 2.0,
        };
        view.pan_by_world(egui::vec2(5.0, -3.0));
        assert_eq!(view.pan_screen, egui::vec2(10.0, -6.0));
        let viewport = egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(100.0, 100.0));
        let visible = view.visible_world_rect(viewport);
        assert_eq!(visible.min, egui::pos2(-5.0, 3.0));
        assert_eq!(visible.size(), egui::vec2(50.0, 50.0));
    }
}
