use eframe::egui;
use flowchart_editor::Editor;
use flowchart_editor::model::{FontSpec, Rgba};
use flowchart_editor::settings;
use std::collections::HashMap;
use std::path::PathBuf;

mod actions;
mod render;
mod update;

/// Loaded image textures keyed by file path. `None` marks an image that
/// failed to decode so it is not retried every frame.
type TextureCache = HashMap<PathBuf, Option<egui::TextureHandle>>;

pub struct FlowchartApp {
    editor: Editor,
    settings_path: String,
    file_path: String,
    status: Option<String>,
    clipboard: Option<String>,
    textures: TextureCache,
    find_query: String,
    replace_text: String,
    label_font: FontSpec,
    label_color: Rgba,
    shift_down: bool,
    primary_down: bool,
    middle_down: bool,
    last_pointer: Option<egui::Pos2>,
    scroll_accum: f32,
}

impl FlowchartApp {
    fn config_path() -> Option<String> {
        if let Some(home) = std::env::var_os("HOME") {
            let path = PathBuf::from(home).join(".config").join("flowchart.toml");
            if path.exists() {
                return Some(path.display().to_string());
            }
        }
        if std::path::Path::new("flowchart.toml").exists() {
            return Some("flowchart.toml".to_string());
        }
        None
    }

    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let settings_path = Self::config_path().unwrap_or_else(|| "flowchart.toml".to_string());
        let settings = settings::load_settings(&settings_path)
            .or_else(|| settings::load_settings("flowchart.json"))
            .unwrap_or_default();
        tracing::info!(path = %settings_path, "settings resolved");

        Self {
            file_path: settings.file_path.clone(),
            label_font: settings.label_font.clone(),
            label_color: Rgba::BLACK,
            editor: Editor::new(settings),
            settings_path,
            status: None,
            clipboard: None,
            textures: TextureCache::new(),
            find_query: String::new(),
            replace_text: String::new(),
            shift_down: false,
            primary_down: false,
            middle_down: false,
            last_pointer: None,
            scroll_accum: 0.0,
        }
    }
}
