// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor tunables, stored as RON.

use crate::edge::EdgeType;
use crate::history::DEFAULT_HISTORY_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Interaction and history settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Pointer travel below which releasing an edge drag does not finish it
    pub edge_drag_threshold: f32,
    /// Whether ctrl-drag snaps edge ends to nearby sockets
    pub snapping_enabled: bool,
    /// Half-size of the square scanned for sockets to snap to
    pub snapping_radius: f32,
    /// Maximum number of undo steps
    pub history_limit: usize,
    /// Path style of edges created by dragging
    pub default_edge_type: EdgeType,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            edge_drag_threshold: 50.0,
            snapping_enabled: true,
            snapping_radius: 24.0,
            history_limit: DEFAULT_HISTORY_LIMIT,
            default_edge_type: EdgeType::Bezier,
        }
    }
}

impl EditorSettings {
    /// Load settings from a RON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: EditorSettings = ron::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;

        if settings.history_limit == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "history_limit must be at least 1",
            ));
        }

        tracing::info!("Loaded editor settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings to a RON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let config = ron::ser::PrettyConfig::default().struct_names(true);

        let content = ron::ser::to_string_pretty(self, config).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;

        std::fs::write(path, content)
    }
}
