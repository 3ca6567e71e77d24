//! Generator configuration
//!
//! Every toggle the generators read lives here instead of on the scene.
//! All sections default to the exporter's stock values and deserialize
//! with missing fields filled from those defaults.

use geomaker_core::MAX_EXPORT_POLYGONS;
use geomaker_mesh::ProjectionMode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lod::{LodPolicy, MAX_LOD_INDEX};
use crate::memory::PointCategories;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid configuration value {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Configuration parse error: {0}")]
    Parse(String),
}

/// Collision shell settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Fire geometry subdivision levels, clamped to 1..=10
    pub fire_quality: u32,
    /// Distance kept from the source surface
    pub fire_offset: f32,
    /// Projection side
    pub projection: ProjectionMode,
    /// Vertex group spanning every shell vertex
    pub component_group: String,
    /// Per-vertex weight layer set to 1.0
    pub weight_layer: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            fire_quality: 2,
            fire_offset: 0.02,
            projection: ProjectionMode::OutsideSurface,
            component_group: String::from("Component01"),
            weight_layer: String::from("FHQWeights"),
        }
    }
}

/// Memory point settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Enabled point categories
    pub categories: PointCategories,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            categories: PointCategories::DEFAULT,
        }
    }
}

/// LOD chain settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodConfig {
    /// Enabled LOD indices, 1..=6
    pub levels: Vec<u8>,
    /// View distance per index, `view_distances[i - 1]` for LOD `i`
    pub view_distances: Vec<f32>,
    /// Simplification applied from LOD 2 on
    pub policy: LodPolicy,
    /// Face ratio kept by one collapse pass
    pub decimate_ratio: f32,
    /// Multiplier on the merge-by-distance base threshold
    pub merge_threshold_scale: f32,
    /// First index whose materials are merged into one
    pub combine_materials_from: u8,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            levels: vec![1, 2, 3, 4],
            view_distances: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            policy: LodPolicy::Collapse,
            decimate_ratio: 0.6,
            merge_threshold_scale: 1.0,
            combine_materials_from: 5,
        }
    }
}

/// Advisory export budgets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Polygon ceiling of any generated object
    pub max_polygons: usize,
    /// Polygon floor of the lowest LOD
    pub min_lowest_lod_polygons: usize,
    /// Material ceiling of the lowest LOD
    pub max_lowest_lod_materials: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_polygons: MAX_EXPORT_POLYGONS,
            min_lowest_lod_polygons: 500,
            max_lowest_lod_materials: 2,
        }
    }
}

/// Exporter properties written on generated materials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    pub texture: String,
    pub rvmat: String,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            texture: String::from("dz\\data\\data\\duha.paa"),
            rvmat: String::from("dz\\data\\data\\default.rvmat"),
        }
    }
}

/// Complete generator configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub shell: ShellConfig,
    pub memory: MemoryConfig,
    pub lod: LodConfig,
    pub budget: BudgetConfig,
    pub materials: MaterialConfig,
}

impl GeneratorConfig {
    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason: String| Err(ConfigError::Invalid { field, reason });

        if !self.shell.fire_offset.is_finite() {
            return invalid("shell.fire_offset", format!("{} is not finite", self.shell.fire_offset));
        }
        if self.shell.component_group.is_empty() {
            return invalid("shell.component_group", "must not be empty".into());
        }

        let lod = &self.lod;
        if let Some(level) = lod.levels.iter().find(|&&l| l == 0 || l > MAX_LOD_INDEX) {
            return invalid("lod.levels", format!("{level} is outside 1..={MAX_LOD_INDEX}"));
        }
        if lod.view_distances.len() < MAX_LOD_INDEX as usize {
            return invalid(
                "lod.view_distances",
                format!("{} entries, {} required", lod.view_distances.len(), MAX_LOD_INDEX),
            );
        }
        if lod.view_distances.iter().any(|d| !d.is_finite() || *d < 0.0) {
            return invalid("lod.view_distances", "distances must be finite and >= 0".into());
        }
        if !(lod.decimate_ratio > 0.0 && lod.decimate_ratio <= 1.0) {
            return invalid("lod.decimate_ratio", format!("{} is outside (0, 1]", lod.decimate_ratio));
        }
        if !(lod.merge_threshold_scale > 0.0 && lod.merge_threshold_scale.is_finite()) {
            return invalid(
                "lod.merge_threshold_scale",
                format!("{} must be positive", lod.merge_threshold_scale),
            );
        }
        if lod.combine_materials_from == 0 {
            return invalid("lod.combine_materials_from", "must be at least 1".into());
        }
        Ok(())
    }
}
