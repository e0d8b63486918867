//! Feature extraction configuration loaded from TOML

use crate::features::SelectionParams;
use crate::filtering::VoxelRepresentative;
use rangefeat_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults {
    pub fn edge_threshold() -> f32 {
        0.1
    }

    pub fn surf_threshold() -> f32 {
        0.1
    }

    pub fn surf_leaf_size() -> f32 {
        0.2
    }

    pub fn lidar_frame() -> String {
        "lidar".to_string()
    }
}

/// Feature extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureExtractionConfig {
    /// Curvature above which a point may become an edge
    #[serde(default = "defaults::edge_threshold")]
    pub edge_threshold: f32,

    /// Curvature below which a point may become planar
    #[serde(default = "defaults::surf_threshold")]
    pub surf_threshold: f32,

    /// Voxel edge length used to decimate each ring's surface points
    #[serde(default = "defaults::surf_leaf_size", alias = "odometry_surf_leaf_size")]
    pub planar_voxel_leaf_size: f32,

    #[serde(default)]
    pub voxel_representative: VoxelRepresentative,

    /// Frame id stamped on the published feature clouds
    #[serde(default = "defaults::lidar_frame")]
    pub lidar_frame: String,

    /// Optional vehicle namespace prepended to `lidar_frame`
    #[serde(default)]
    pub uav_name: Option<String>,

    #[serde(default)]
    pub selection: SelectionParams,
}

impl Default for FeatureExtractionConfig {
    fn default() -> Self {
        Self {
            edge_threshold: defaults::edge_threshold(),
            surf_threshold: defaults::surf_threshold(),
            planar_voxel_leaf_size: defaults::surf_leaf_size(),
            voxel_representative: VoxelRepresentative::default(),
            lidar_frame: defaults::lidar_frame(),
            uav_name: None,
            selection: SelectionParams::default(),
        }
    }
}

impl FeatureExtractionConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make every selection decision meaningless
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("edge_threshold", self.edge_threshold),
            ("surf_threshold", self.surf_threshold),
            ("planar_voxel_leaf_size", self.planar_voxel_leaf_size),
            ("selection.occlusion_range_gap", self.selection.occlusion_range_gap),
            ("selection.parallel_beam_ratio", self.selection.parallel_beam_ratio),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        if self.selection.sector_count == 0 {
            return Err(Error::InvalidConfig(
                "selection.sector_count must be at least 1".to_string(),
            ));
        }
        if self.selection.max_edges_per_sector == 0 {
            return Err(Error::InvalidConfig(
                "selection.max_edges_per_sector must be at least 1".to_string(),
            ));
        }
        if self.lidar_frame.is_empty() {
            return Err(Error::InvalidConfig("lidar_frame must not be empty".to_string()));
        }

        Ok(())
    }

    /// Frame id of the published clouds, namespaced by `uav_name` unless the
    /// frame is absolute or already carries the namespace
    pub fn frame_id(&self) -> String {
        match &self.uav_name {
            Some(ns) if !ns.is_empty()
                && !self.lidar_frame.starts_with('/')
                && !self.lidar_frame.starts_with(ns.as_str()) =>
            {
                format!("{}/{}", ns, self.lidar_frame)
            }
            _ => self.lidar_frame.clone(),
        }
    }
}
