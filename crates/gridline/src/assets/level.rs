use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::config::LineConfig;
use crate::api::types::GridCoord;
use crate::path::grid::GridLayout;

/// A puzzle level: the board grid and the line pieces placed on it.
/// Loaded from JSON at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDesc {
    #[serde(default)]
    pub name: String,
    pub grid: GridDesc,
    /// Settings shared by every line unless the line overrides them.
    #[serde(default)]
    pub defaults: LineConfig,
    #[serde(default)]
    pub lines: Vec<LineDesc>,
    /// Static blockers as world-space polygons.
    #[serde(default)]
    pub obstacles: Vec<Vec<[f32; 2]>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridDesc {
    pub width: i32,
    pub height: i32,
    #[serde(default = "default_cell_size")]
    pub cell_size: f32,
    /// World position of the lower-left corner of cell (0, 0).
    #[serde(default)]
    pub origin: [f32; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineDesc {
    /// Turn cells, tail first.
    pub turns: Vec<[i32; 2]>,
    /// Per-line settings; keys given here override the level defaults.
    #[serde(default)]
    pub config: Option<Map<String, Value>>,
}

fn default_cell_size() -> f32 {
    1.0
}

impl LevelDesc {
    /// Parse a level from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn layout(&self) -> GridLayout {
        GridLayout::new(self.grid.width, self.grid.height, self.grid.cell_size)
            .with_origin(Vec2::from(self.grid.origin))
    }

    /// Effective settings of line `index`: the level defaults with the
    /// line's own keys laid over them.
    pub fn config_for(&self, index: usize) -> Result<LineConfig, serde_json::Error> {
        let Some(overrides) = self.lines.get(index).and_then(|l| l.config.as_ref()) else {
            return Ok(self.defaults.clone());
        };
        let mut merged = serde_json::to_value(&self.defaults)?;
        if let Value::Object(fields) = &mut merged {
            for (key, value) in overrides {
                fields.insert(key.clone(), value.clone());
            }
        }
        serde_json::from_value(merged)
    }

    /// Effective settings of every line, in order.
    pub fn line_configs(&self) -> Result<Vec<LineConfig>, serde_json::Error> {
        (0..self.lines.len()).map(|i| self.config_for(i)).collect()
    }
}

impl LineDesc {
    pub fn turn_cells(&self) -> Vec<GridCoord> {
        self.turns.iter().copied().map(GridCoord::from).collect()
    }
}
