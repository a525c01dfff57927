use crate::geometry::{self, Transform};
use eframe::egui;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Stable identity of a scene entity. Survives delete/undo/recreate cycles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s.trim()).ok().map(Self)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_color32(self) -> egui::Color32 {
        egui::Color32::from_rgba_unmultiplied(self.r, self.g, self.b, self.a)
    }

    pub fn from_color32(c: egui::Color32) -> Self {
        let [r, g, b, a] = c.to_srgba_unmultiplied();
        Self { r, g, b, a }
    }

    /// `#rrggbb` name used by document records.
    pub fn name(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let hex = name.trim().strip_prefix('#')?;
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self::rgb(r, g, b))
    }
}

/// The ten flowchart node kinds, numbered 1..=10 in documents and drag payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowType {
    StartOrEnd,
    Process,
    AltProcess,
    Decision,
    Document,
    Data,
    Subprocess,
    Junction,
    Remark,
    Annotation,
}

impl FlowType {
    pub const ALL: [FlowType; 10] = [
        FlowType::StartOrEnd,
        FlowType::Process,
        FlowType::AltProcess,
        FlowType::Decision,
        FlowType::Document,
        FlowType::Data,
        FlowType::Subprocess,
        FlowType::Junction,
        FlowType::Remark,
        FlowType::Annotation,
    ];

    pub fn code(self) -> u8 {
        match self {
            FlowType::StartOrEnd => 1,
            FlowType::Process => 2,
            FlowType::AltProcess => 3,
            FlowType::Decision => 4,
            FlowType::Document => 5,
            FlowType::Data => 6,
            FlowType::Subprocess => 7,
            FlowType::Junction => 8,
            FlowType::Remark => 9,
            FlowType::Annotation => 10,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        let idx = usize::try_from(code.checked_sub(1)?).ok()?;
        Self::ALL.get(idx).copied()
    }

    /// Text given to the label created together with a new shape.
    pub fn default_text(self) -> &'static str {
        match self {
            FlowType::StartOrEnd => "Start or End",
            FlowType::Process | FlowType::AltProcess => "Process",
            FlowType::Decision => "Decision",
            FlowType::Document => "Document",
            FlowType::Data => "Data",
            FlowType::Subprocess => "Subprocess",
            FlowType::Junction => "Connector",
            FlowType::Remark => "Remark",
            FlowType::Annotation => "Annotation",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FillColor {
    #[default]
    White,
    Red,
    Yellow,
    Green,
}

impl FillColor {
    pub const ALL: [FillColor; 4] = [
        FillColor::White,
        FillColor::Red,
        FillColor::Yellow,
        FillColor::Green,
    ];

    pub fn code(self) -> char {
        match self {
            FillColor::White => 'w',
            FillColor::Red => 'r',
            FillColor::Yellow => 'y',
            FillColor::Green => 'g',
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| code.len() == 1 && code.starts_with(c.code()))
    }

    pub fn rgba(self) -> Rgba {
        match self {
            FillColor::White => Rgba::rgb(255, 255, 255),
            FillColor::Red => Rgba::rgb(246, 178, 178),
            FillColor::Yellow => Rgba::rgb(255, 236, 153),
            FillColor::Green => Rgba::rgb(186, 230, 182),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BorderColor {
    #[default]
    Black,
    Red,
    Blue,
}

impl BorderColor {
    pub const ALL: [BorderColor; 3] = [BorderColor::Black, BorderColor::Red, BorderColor::Blue];

    pub fn code(self) -> char {
        match self {
            BorderColor::Black => 'b',
            BorderColor::Red => 'r',
            BorderColor::Blue => 'l',
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| code.len() == 1 && code.starts_with(c.code()))
    }

    pub fn rgba(self) -> Rgba {
        match self {
            BorderColor::Black => Rgba::rgb(20, 20, 20),
            BorderColor::Red => Rgba::rgb(200, 40, 40),
            BorderColor::Blue => Rgba::rgb(40, 90, 200),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    pub family: String,
    pub size: f32,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "Proportional".to_string(),
            size: 12.0,
            bold: false,
            italic: false,
        }
    }
}

impl FontSpec {
    /// `family,size,bold,italic`, with the flags written as `0`/`1`.
    pub fn descriptor(&self) -> String {
        format!(
            "{},{},{},{}",
            self.family,
            self.size,
            u8::from(self.bold),
            u8::from(self.italic)
        )
    }

    pub fn parse(descriptor: &str) -> Option<Self> {
        let mut parts = descriptor.rsplitn(4, ',');
        let italic = parts.next()?.trim();
        let bold = parts.next()?.trim();
        let size = parts.next()?.trim().parse::<f32>().ok()?;
        let family = parts.next()?.trim();
        if family.is_empty() || !size.is_finite() || size <= 0.0 {
            return None;
        }
        let flag = |s: &str| match s {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        };
        Some(Self {
            family: family.to_string(),
            size,
            bold: flag(bold)?,
            italic: flag(italic)?,
        })
    }
}

/// A flowchart node. Its local frame is a `LOCAL_SIZE` square; scene
/// coordinates are `transform.map(local) + pos`.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    pub id: EntityId,
    pub flow_type: FlowType,
    pub transform: Transform,
    pub pos: egui::Pos2,
    pub fill: FillColor,
    pub border: BorderColor,
    pub movable: bool,
    /// Cleared shapes are skipped by clicks and rubber-band selection.
    pub selectable: bool,
}

impl Shape {
    pub const LOCAL_SIZE: f32 = 16.0;
    pub const DEFAULT_SCALE: f32 = 10.0;

    pub fn new(flow_type: FlowType, pos: egui::Pos2) -> Self {
        Self {
            id: EntityId::new(),
            flow_type,
            transform: Transform::from_scale(Self::DEFAULT_SCALE, Self::DEFAULT_SCALE),
            pos,
            fill: FillColor::default(),
            border: BorderColor::default(),
            movable: true,
            selectable: true,
        }
    }

    pub fn local_rect(&self) -> egui::Rect {
        egui::Rect::from_min_size(egui::Pos2::ZERO, egui::Vec2::splat(Self::LOCAL_SIZE))
    }

    pub fn map_to_scene(&self, local: egui::Pos2) -> egui::Pos2 {
        self.transform.map(local) + self.pos.to_vec2()
    }

    pub fn map_from_scene(&self, scene: egui::Pos2) -> Option<egui::Pos2> {
        let inv = self.transform.inverted()?;
        Some(inv.map(scene - self.pos.to_vec2()))
    }

    pub fn scene_bounds(&self) -> egui::Rect {
        self.transform
            .map_rect(self.local_rect())
            .translate(self.pos.to_vec2())
    }

    pub fn center(&self) -> egui::Pos2 {
        self.scene_bounds().center()
    }

    pub fn contains(&self, scene: egui::Pos2) -> bool {
        self.map_from_scene(scene)
            .is_some_and(|local| self.local_rect().contains(local))
    }

    /// Asset path of the rendered glyph, derived from type and colors.
    pub fn style_path(&self) -> String {
        format!(
            "flowchart/fc-{}-{}{}.svg",
            self.flow_type.code(),
            self.border.code(),
            self.fill.code()
        )
    }
}

/// Visible geometry of a connector for the current frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Route {
    pub start: egui::Pos2,
    pub end: egui::Pos2,
    pub arrow: [egui::Pos2; 2],
}

impl Route {
    pub fn midpoint(&self) -> egui::Pos2 {
        self.start.lerp(self.end, 0.5)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Connector {
    pub id: EntityId,
    pub start: EntityId,
    pub end: EntityId,
    pub color: Rgba,
    pub width: f32,
    /// Derived each refresh; `None` while the endpoint shapes overlap.
    pub route: Option<Route>,
}

impl Connector {
    pub fn new(start: EntityId, end: EntityId, color: Rgba) -> Self {
        Self {
            id: EntityId::new(),
            start,
            end,
            color,
            width: 2.0,
            route: None,
        }
    }

    pub fn touches(&self, shape: EntityId) -> bool {
        self.start == shape || self.end == shape
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Anchor {
    Shape(EntityId),
    Connector(EntityId),
}

impl Anchor {
    pub fn id(self) -> EntityId {
        match self {
            Anchor::Shape(id) | Anchor::Connector(id) => id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum LabelState {
    #[default]
    Display,
    Edit {
        draft: String,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub id: EntityId,
    pub text: String,
    pub font: FontSpec,
    pub color: Rgba,
    pub transform: Transform,
    pub pos: egui::Pos2,
    pub anchor: Option<Anchor>,
    pub state: LabelState,
}

impl Label {
    pub const DEFAULT_TEXT: &'static str = "Text";

    pub fn new(text: impl Into<String>, font: FontSpec, pos: egui::Pos2) -> Self {
        Self {
            id: EntityId::new(),
            text: text.into(),
            font,
            color: Rgba::BLACK,
            transform: Transform::IDENTITY,
            pos,
            anchor: None,
            state: LabelState::Display,
        }
    }

    pub fn movable(&self) -> bool {
        self.anchor.is_none()
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, LabelState::Edit { .. })
    }

    /// Text currently shown: the draft while editing.
    pub fn shown_text(&self) -> &str {
        match &self.state {
            LabelState::Display => &self.text,
            LabelState::Edit { draft } => draft,
        }
    }

    pub fn local_rect(&self) -> egui::Rect {
        let text = self.shown_text();
        let columns = text
            .lines()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0)
            .max(1);
        let rows = text.lines().count().max(1);
        let w = columns as f32 * self.font.size * 0.6;
        let h = rows as f32 * self.font.size * 1.2;
        egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(w, h))
    }

    pub fn scene_bounds(&self) -> egui::Rect {
        self.transform
            .map_rect(self.local_rect())
            .translate(self.pos.to_vec2())
    }

    pub fn center(&self) -> egui::Pos2 {
        self.scene_bounds().center()
    }
}

/// An imported raster image shown at `size`, keeping the aspect of `natural`.
#[derive(Clone, Debug, PartialEq)]
pub struct Pixmap {
    pub id: EntityId,
    pub path: PathBuf,
    pub natural: egui::Vec2,
    pub size: egui::Vec2,
    pub pos: egui::Pos2,
}

impl Pixmap {
    pub const MIN_EDGE: f32 = 50.0;
    pub const HANDLE: f32 = 10.0;

    pub fn new(path: PathBuf, natural: egui::Vec2, pos: egui::Pos2) -> Self {
        Self {
            id: EntityId::new(),
            path,
            natural,
            size: natural,
            pos,
        }
    }

    pub fn scene_bounds(&self) -> egui::Rect {
        egui::Rect::from_min_size(self.pos, self.size)
    }

    /// Largest size inside `target` with the natural aspect ratio.
    pub fn fit_size(&self, target: egui::Vec2) -> egui::Vec2 {
        fit_keep_aspect(self.natural, target)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Background {
    pub path: PathBuf,
    pub natural: egui::Vec2,
}

impl Background {
    /// Placement inside `viewport`, scaled to fit with the aspect kept.
    pub fn fitted_rect(&self, viewport: egui::Rect) -> egui::Rect {
        let size = fit_keep_aspect(self.natural, viewport.size());
        egui::Rect::from_min_size(viewport.min, size)
    }
}

pub fn fit_keep_aspect(natural: egui::Vec2, target: egui::Vec2) -> egui::Vec2 {
    if natural.x <= 0.0 || natural.y <= 0.0 {
        return target;
    }
    let k = (target.x / natural.x).min(target.y / natural.y);
    if !k.is_finite() {
        return natural;
    }
    natural * k
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Shape,
    Connector,
    Label,
    Pixmap,
}

impl EntityKind {
    pub fn noun(self) -> &'static str {
        match self {
            EntityKind::Shape => "shape",
            EntityKind::Connector => "connector",
            EntityKind::Label => "label",
            EntityKind::Pixmap => "image",
        }
    }
}

/// Owned snapshot of any scene entity.
#[derive(Clone, Debug, PartialEq)]
pub enum Entity {
    Shape(Shape),
    Connector(Connector),
    Label(Label),
    Pixmap(Pixmap),
}

impl Entity {
    pub fn id(&self) -> EntityId {
        match self {
            Entity::Shape(s) => s.id,
            Entity::Connector(c) => c.id,
            Entity::Label(l) => l.id,
            Entity::Pixmap(p) => p.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Shape(_) => EntityKind::Shape,
            Entity::Connector(_) => EntityKind::Connector,
            Entity::Label(_) => EntityKind::Label,
            Entity::Pixmap(_) => EntityKind::Pixmap,
        }
    }

    pub fn movable(&self) -> bool {
        match self {
            Entity::Shape(s) => s.movable,
            Entity::Connector(_) => false,
            Entity::Label(l) => l.movable(),
            Entity::Pixmap(_) => true,
        }
    }

    pub fn bounds(&self) -> egui::Rect {
        match self {
            Entity::Shape(s) => s.scene_bounds(),
            Entity::Connector(c) => c
                .route
                .map(|r| {
                    let mut pts = vec![r.start, r.end];
                    pts.extend(r.arrow);
                    geometry::aabb_of_points(&pts)
                })
                .unwrap_or(egui::Rect::NOTHING),
            Entity::Label(l) => l.scene_bounds(),
            Entity::Pixmap(p) => p.scene_bounds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_shape_spans_160_units() {
        let shape = Shape::new(FlowType::Decision, egui::pos2(100.0, 50.0));
        let b = shape.scene_bounds();
        assert_eq!(b.min, egui::pos2(100.0, 50.0));
        assert_eq!(b.size(), egui::vec2(160.0, 160.0));
        assert_eq!(shape.center(), egui::pos2(180.0, 130.0));
    }

    #[test]
    fn style_path_tracks_colors() {
        let mut shape = Shape::new(FlowType::StartOrEnd, egui::Pos2::ZERO);
        assert_eq!(shape.style_path(), "flowchart/fc-1-bw.svg");
        shape.fill = FillColor::Yellow;
        shape.border = BorderColor::Blue;
        assert_eq!(shape.style_path(), "flowchart/fc-1-ly.svg");
    }

    #[test]
    fn flow_type_codes_are_one_based() {
        assert_eq!(FlowType::from_code(1), Some(FlowType::StartOrEnd));
        assert_eq!(FlowType::from_code(10), Some(FlowType::Annotation));
        assert_eq!(FlowType::from_code(0), None);
        assert_eq!(FlowType::from_code(11), None);
        for t in FlowType::ALL {
            assert_eq!(FlowType::from_code(i64::from(t.code())), Some(t));
        }
    }

    #[test]
    fn color_codes_reject_unknown_values() {
        assert_eq!(FillColor::from_code("g"), Some(FillColor::Green));
        assert_eq!(FillColor::from_code("x"), None);
        assert_eq!(FillColor::from_code("gg"), None);
        assert_eq!(BorderColor::from_code("l"), Some(BorderColor::Blue));
        assert_eq!(BorderColor::from_code("w"), None);
    }

    #[test]
    fn font_descriptor_parses_back() {
        let font = FontSpec {
            family: "Noto Sans, CJK".to_string(),
            size: 14.5,
            bold: true,
            italic: false,
        };
        assert_eq!(FontSpec::parse(&font.descriptor()), Some(font));
        assert_eq!(FontSpec::parse("Sans,abc,0,0"), None);
        assert_eq!(FontSpec::parse("Sans"), None);
    }

    #[test]
    fn color_names_are_hex() {
        let c = Rgba::rgb(0x75, 0x96, 0xd7);
        assert_eq!(c.name(), "#7596d7");
        assert_eq!(Rgba::from_name("#7596D7"), Some(c));
        assert_eq!(Rgba::from_name("blue"), None);
    }

    #[test]
    fn label_extent_grows_with_text() {
        let font = FontSpec::default();
        let label = Label::new("abcd", font.clone(), egui::Pos2::ZERO);
        let r = label.local_rect();
        assert!((r.width() - 4.0 * 12.0 * 0.6).abs() < 1e-4);
        assert!((r.height() - 12.0 * 1.2).abs() < 1e-4);
        let empty = Label::new("", font, egui::Pos2::ZERO);
        assert!(empty.local_rect().width() > 0.0);
    }

    #[test]
    fn fit_keeps_aspect_ratio() {
        let s = fit_keep_aspect(egui::vec2(200.0, 100.0), egui::vec2(100.0, 100.0));
        assert_eq!(s, egui::vec2(100.0, 50.0));
    }
}
