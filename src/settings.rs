use crate::error::{EditorError, Result};
use crate::model::{FontSpec, Rgba};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub file_path: String,
    /// Multiplier applied per wheel notch.
    pub zoom_step: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    /// Largest edge-to-guide gap that snaps during a move.
    pub snap_tolerance: f32,
    /// Extra distance beyond the half-width within which a guide is considered.
    pub guide_reach: f32,
    /// Closest a corner drag may bring the dragged corner to the opposite edge.
    pub resize_margin: f32,
    pub arrow_size: f32,
    pub history_limit: usize,
    pub label_font: FontSpec,
    pub connector_color: Rgba,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            file_path: "flowchart.json".to_string(),
            zoom_step: 1.25,
            min_scale: 0.05,
            max_scale: 20.0,
            snap_tolerance: 10.0,
            guide_reach: 200.0,
            resize_margin: 5.0,
            arrow_size: 10.0,
            history_limit: 200,
            label_font: FontSpec::default(),
            connector_color: Rgba::BLACK,
        }
    }
}

pub fn load_settings(path: &str) -> Option<EditorSettings> {
    let s = std::fs::read_to_string(path).ok()?;
    if path.ends_with(".toml") {
        toml::from_str::<EditorSettings>(&s)
            .ok()
            .or_else(|| serde_json::from_str::<EditorSettings>(&s).ok())
    } else {
        serde_json::from_str::<EditorSettings>(&s)
            .ok()
            .or_else(|| toml::from_str::<EditorSettings>(&s).ok())
    }
}

pub fn save_settings(path: &str, settings: &EditorSettings) -> Result<()> {
    let text = if path.ends_with(".toml") {
        toml::to_string_pretty(settings).map_err(|e| EditorError::Settings(e.to_string()))?
    } else {
        serde_json::to_string_pretty(settings)?
    };
    std::fs::write(path, text)?;
    Ok(())
}
