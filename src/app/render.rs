use eframe::egui;
use flowchart_editor::control_point::{self, Direction};
use flowchart_editor::model::{BorderColor, FillColor, FlowType, Label, Pixmap, Rgba, Shape};
use flowchart_editor::scene::{Axis, Mode};
use flowchart_editor::Editor;
use std::f32::consts::TAU;
use std::path::Path;

use super::TextureCache;

const SELECTION: egui::Color32 = egui::Color32::from_rgb(90, 160, 255);
const GUIDE: egui::Color32 = egui::Color32::from_rgb(230, 80, 160);

pub(super) fn shape_button(ui: &mut egui::Ui, flow_type: FlowType, mode: Mode) -> bool {
    let active = mode == Mode::InsertShape(flow_type);
    ui.selectable_label(active, flow_type_name(flow_type)).clicked()
}

pub(super) fn flow_type_name(flow_type: FlowType) -> &'static str {
    match flow_type {
        FlowType::StartOrEnd => "Start / End",
        FlowType::Process => "Process",
        FlowType::AltProcess => "Alternate process",
        FlowType::Decision => "Decision",
        FlowType::Document => "Document",
        FlowType::Data => "Data",
        FlowType::Subprocess => "Subprocess",
        FlowType::Junction => "Junction",
        FlowType::Remark => "Remark",
        FlowType::Annotation => "Annotation",
    }
}

pub(super) fn fill_name(fill: FillColor) -> &'static str {
    match fill {
        FillColor::White => "White",
        FillColor::Red => "Red",
        FillColor::Yellow => "Yellow",
        FillColor::Green => "Green",
    }
}

pub(super) fn border_name(border: BorderColor) -> &'static str {
    match border {
        BorderColor::Black => "Black",
        BorderColor::Red => "Red",
        BorderColor::Blue => "Blue",
    }
}

pub(super) fn color_row(ui: &mut egui::Ui, rgba: &mut Rgba) -> bool {
    let mut changed = false;
    ui.horizontal(|ui| {
        let presets = [
            egui::Color32::from_rgb(20, 20, 20),
            egui::Color32::from_rgb(200, 40, 40),
            egui::Color32::from_rgb(40, 140, 60),
            egui::Color32::from_rgb(40, 90, 200),
            egui::Color32::from_rgb(200, 140, 40),
        ];
        for c in presets {
            if ui
                .add_sized([18.0, 18.0], egui::Button::new("").fill(c))
                .clicked()
            {
                *rgba = Rgba::from_color32(c);
                changed = true;
            }
        }
        let mut arr = [rgba.r, rgba.g, rgba.b, rgba.a];
        if ui.color_edit_button_srgba_unmultiplied(&mut arr).changed() {
            *rgba = Rgba {
                r: arr[0],
                g: arr[1],
                b: arr[2],
                a: arr[3],
            };
            changed = true;
        }
    });
    changed
}

pub(super) fn draw_background(
    painter: &egui::Painter,
    rect: egui::Rect,
    editor: &Editor,
    textures: &mut TextureCache,
) {
    painter.rect_filled(rect, 0.0, egui::Color32::WHITE);
    if let Some(background) = editor.scene().background() {
        if let Some(texture) = texture_for(painter.ctx(), textures, &background.path) {
            painter.image(
                texture.id(),
                background.fitted_rect(rect),
                full_uv(),
                egui::Color32::WHITE,
            );
        }
        return;
    }
    let view = editor.view();
    let grid_color = egui::Color32::from_gray(230);
    let spacing_screen = 64.0 * view.zoom;
    if spacing_screen >= 24.0 {
        let start = rect.min + view.pan_screen;
        let x0 = ((rect.min.x - start.x) / spacing_screen).floor() * spacing_screen + start.x;
        let y0 = ((rect.min.y - start.y) / spacing_screen).floor() * spacing_screen + start.y;
        let mut x = x0;
        while x < rect.max.x {
            painter.line_segment(
                [egui::pos2(x, rect.min.y), egui::pos2(x, rect.max.y)],
                egui::Stroke::new(1.0, grid_color),
            );
            x += spacing_screen;
        }
        let mut y = y0;
        while y < rect.max.y {
            painter.line_segment(
                [egui::pos2(rect.min.x, y), egui::pos2(rect.max.x, y)],
                egui::Stroke::new(1.0, grid_color),
            );
            y += spacing_screen;
        }
    }
}

/// Paints entities back to front: images, shapes, connectors, then labels.
pub(super) fn draw_scene(painter: &egui::Painter, editor: &Editor, textures: &mut TextureCache) {
    let scene = editor.scene();
    for pixmap in scene.pixmaps() {
        draw_pixmap(painter, editor, pixmap, textures);
    }
    for shape in scene.shapes() {
        draw_shape(painter, editor, shape);
    }
    let zoom = editor.view().zoom;
    for connector in scene.connectors() {
        let Some(route) = connector.route else {
            continue;
        };
        let color = connector.color.to_color32();
        let start = editor.to_screen(route.start);
        let end = editor.to_screen(route.end);
        if scene.is_selected(connector.id) {
            painter.line_segment(
                [start, end],
                egui::Stroke::new((connector.width + 4.0) * zoom, SELECTION.gamma_multiply(0.5)),
            );
        }
        painter.line_segment([start, end], egui::Stroke::new(connector.width * zoom, color));
        let barbs = route.arrow.map(|p| editor.to_screen(p));
        painter.add(egui::Shape::convex_polygon(
            vec![end, barbs[0], barbs[1]],
            color,
            egui::Stroke::NONE,
        ));
    }
    for label in scene.labels() {
        draw_label(painter, editor, label);
    }
}

fn draw_pixmap(
    painter: &egui::Painter,
    editor: &Editor,
    pixmap: &Pixmap,
    textures: &mut TextureCache,
) {
    let bounds = pixmap.scene_bounds();
    let rect = egui::Rect::from_min_max(editor.to_screen(bounds.min), editor.to_screen(bounds.max));
    match texture_for(painter.ctx(), textures, &pixmap.path) {
        Some(texture) => {
            painter.image(texture.id(), rect, full_uv(), egui::Color32::WHITE);
        }
        None => {
            painter.rect_filled(rect, 0.0, egui::Color32::from_gray(200));
        }
    }
    if editor.scene().is_selected(pixmap.id) {
        let stroke = egui::Stroke::new(1.0, SELECTION);
        painter.rect_stroke(rect, 0.0, stroke, egui::StrokeKind::Middle);
        // Corner handles sit inside the image, matching their hot-spots.
        let h = Pixmap::HANDLE * editor.view().zoom;
        for min in [
            rect.left_top(),
            rect.right_top() - egui::vec2(h, 0.0),
            rect.left_bottom() - egui::vec2(0.0, h),
            rect.right_bottom() - egui::vec2(h, h),
        ] {
            painter.rect_filled(egui::Rect::from_min_size(min, egui::Vec2::splat(h)), 0.0, SELECTION);
        }
    }
}

fn draw_shape(painter: &egui::Painter, editor: &Editor, shape: &Shape) {
    let zoom = editor.view().zoom;
    let to_screen = |p: egui::Pos2| editor.to_screen(shape.map_to_scene(p));
    let points: Vec<egui::Pos2> = local_outline(shape.flow_type)
        .into_iter()
        .map(to_screen)
        .collect();
    let stroke = egui::Stroke::new(1.5 * zoom, shape.border.rgba().to_color32());
    if shape.flow_type == FlowType::Annotation {
        painter.add(egui::Shape::line(points, stroke));
    } else {
        painter.add(egui::Shape::convex_polygon(
            points,
            shape.fill.rgba().to_color32(),
            stroke,
        ));
    }
    for [a, b] in local_details(shape.flow_type) {
        painter.line_segment([to_screen(a), to_screen(b)], stroke);
    }

    if editor.scene().is_selected(shape.id) {
        let r = shape.local_rect();
        let frame = [r.left_top(), r.right_top(), r.right_bottom(), r.left_bottom()]
            .map(to_screen)
            .to_vec();
        painter.add(egui::Shape::closed_line(frame, egui::Stroke::new(1.0, SELECTION)));
        for (direction, corners) in control_point::handle_polygons(shape) {
            let fill = if direction == Direction::BottomCenter {
                egui::Color32::from_rgb(255, 170, 60)
            } else {
                SELECTION
            };
            painter.add(egui::Shape::convex_polygon(
                corners.map(|p| editor.to_screen(p)).to_vec(),
                fill,
                egui::Stroke::NONE,
            ));
        }
    }
}

/// Outline of a node kind inside the 16×16 local square.
fn local_outline(flow_type: FlowType) -> Vec<egui::Pos2> {
    let s = Shape::LOCAL_SIZE;
    match flow_type {
        FlowType::StartOrEnd => rounded_rect(s, 5.0),
        FlowType::AltProcess => rounded_rect(s, 2.0),
        FlowType::Process | FlowType::Subprocess => {
            vec![
                egui::pos2(0.0, 0.0),
                egui::pos2(s, 0.0),
                egui::pos2(s, s),
                egui::pos2(0.0, s),
            ]
        }
        FlowType::Decision => vec![
            egui::pos2(s / 2.0, 0.0),
            egui::pos2(s, s / 2.0),
            egui::pos2(s / 2.0, s),
            egui::pos2(0.0, s / 2.0),
        ],
        FlowType::Document => {
            let mut points = vec![egui::pos2(0.0, 0.0), egui::pos2(s, 0.0)];
            let steps = 12;
            for i in 0..=steps {
                let t = i as f32 / steps as f32;
                let y = s * 0.85 + (t * TAU).sin() * s * 0.08;
                points.push(egui::pos2(s * (1.0 - t), y));
            }
            points
        }
        FlowType::Data => vec![
            egui::pos2(s * 0.2, 0.0),
            egui::pos2(s, 0.0),
            egui::pos2(s * 0.8, s),
            egui::pos2(0.0, s),
        ],
        FlowType::Junction => (0..24)
            .map(|i| {
                let a = i as f32 / 24.0 * TAU;
                egui::pos2(s / 2.0 + a.cos() * s / 2.0, s / 2.0 + a.sin() * s / 2.0)
            })
            .collect(),
        FlowType::Remark => vec![
            egui::pos2(0.0, 0.0),
            egui::pos2(s * 0.75, 0.0),
            egui::pos2(s, s * 0.25),
            egui::pos2(s, s),
            egui::pos2(0.0, s),
        ],
        FlowType::Annotation => vec![
            egui::pos2(s * 0.35, 0.0),
            egui::pos2(0.0, 0.0),
            egui::pos2(0.0, s),
            egui::pos2(s * 0.35, s),
        ],
    }
}

fn local_details(flow_type: FlowType) -> Vec<[egui::Pos2; 2]> {
    let s = Shape::LOCAL_SIZE;
    match flow_type {
        FlowType::Subprocess => vec![
            [egui::pos2(s * 0.12, 0.0), egui::pos2(s * 0.12, s)],
            [egui::pos2(s * 0.88, 0.0), egui::pos2(s * 0.88, s)],
        ],
        FlowType::Remark => vec![
            [egui::pos2(s * 0.75, 0.0), egui::pos2(s * 0.75, s * 0.25)],
            [egui::pos2(s * 0.75, s * 0.25), egui::pos2(s, s * 0.25)],
        ],
        _ => Vec::new(),
    }
}

fn rounded_rect(s: f32, r: f32) -> Vec<egui::Pos2> {
    let corners = [
        (egui::pos2(s - r, r), -0.25),
        (egui::pos2(s - r, s - r), 0.0),
        (egui::pos2(r, s - r), 0.25),
        (egui::pos2(r, r), 0.5),
    ];
    let mut points = Vec::new();
    for (center, start) in corners {
        for i in 0..=4 {
            let a = (start + i as f32 / 16.0) * TAU;
            points.push(center + egui::vec2(a.cos(), a.sin()) * r);
        }
    }
    points
}

fn draw_label(painter: &egui::Painter, editor: &Editor, label: &Label) {
    // The inline editor paints the draft.
    if label.is_editing() {
        return;
    }
    let zoom = editor.view().zoom;
    let galley = painter.layout_job(label_job(label, label.font.size * zoom));
    let center = editor.to_screen(label.center());
    let pos = center - galley.size() * 0.5;
    if editor.scene().is_selected(label.id) {
        let rect = egui::Rect::from_min_size(pos, galley.size()).expand(2.0);
        painter.rect_stroke(rect, 0.0, egui::Stroke::new(1.0, SELECTION), egui::StrokeKind::Middle);
    }
    painter.galley(pos, galley, label.color.to_color32());
}

fn label_job(label: &Label, size: f32) -> egui::text::LayoutJob {
    let family = match label.font.family.as_str() {
        "Monospace" | "monospace" => egui::FontFamily::Monospace,
        _ => egui::FontFamily::Proportional,
    };
    let format = egui::TextFormat {
        font_id: egui::FontId::new(size.max(1.0), family),
        color: label.color.to_color32(),
        italics: label.font.italic,
        ..Default::default()
    };
    let mut job = egui::text::LayoutJob::single_section(label.text.clone(), format);
    job.halign = egui::Align::Center;
    job
}

/// Rubber line, rubber band, alignment guides and a handle-drag preview.
pub(super) fn draw_in_progress(painter: &egui::Painter, editor: &Editor, rect: egui::Rect) {
    let scene = editor.scene();
    for guide in scene.guides() {
        let (a, b) = match guide.axis {
            Axis::Vertical => {
                let x = editor.to_screen(egui::pos2(guide.coord, 0.0)).x;
                (egui::pos2(x, rect.min.y), egui::pos2(x, rect.max.y))
            }
            Axis::Horizontal => {
                let y = editor.to_screen(egui::pos2(0.0, guide.coord)).y;
                (egui::pos2(rect.min.x, y), egui::pos2(rect.max.x, y))
            }
        };
        painter.line_segment([a, b], egui::Stroke::new(1.0, GUIDE));
    }
    if let Some((start, end)) = scene.rubber_line() {
        painter.line_segment(
            [editor.to_screen(start), editor.to_screen(end)],
            egui::Stroke::new(1.5, egui::Color32::DARK_GRAY),
        );
    }
    if let Some(band) = scene.rubber_band() {
        let band = egui::Rect::from_min_max(editor.to_screen(band.min), editor.to_screen(band.max));
        painter.rect_filled(band, 0.0, SELECTION.gamma_multiply(0.15));
        painter.rect_stroke(band, 0.0, egui::Stroke::new(1.0, SELECTION), egui::StrokeKind::Middle);
    }
    if let Some((id, transform)) = scene.control_preview() {
        if let Some(shape) = scene.shape(id) {
            let r = shape.local_rect();
            let outline = [r.left_top(), r.right_top(), r.right_bottom(), r.left_bottom()]
                .map(|p| editor.to_screen(transform.map(p) + shape.pos.to_vec2()))
                .to_vec();
            painter.add(egui::Shape::closed_line(
                outline,
                egui::Stroke::new(1.0, SELECTION.gamma_multiply(0.7)),
            ));
        }
    }
}

fn texture_for<'a>(
    ctx: &egui::Context,
    textures: &'a mut TextureCache,
    path: &Path,
) -> Option<&'a egui::TextureHandle> {
    textures
        .entry(path.to_path_buf())
        .or_insert_with(|| load_texture(ctx, path))
        .as_ref()
}

fn load_texture(ctx: &egui::Context, path: &Path) -> Option<egui::TextureHandle> {
    let image = match image::open(path) {
        Ok(image) => image.to_rgba8(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "image decode failed");
            return None;
        }
    };
    let size = [image.width() as usize, image.height() as usize];
    let color = egui::ColorImage::from_rgba_unmultiplied(size, image.as_flat_samples().as_slice());
    Some(ctx.load_texture(path.display().to_string(), color, egui::TextureOptions::LINEAR))
}

fn full_uv() -> egui::Rect {
    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0))
}
