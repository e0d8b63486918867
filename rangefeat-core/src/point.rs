//! Point types and related functionality

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// A point with an intensity channel, the native layout of a LIDAR return
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct PointXYZI {
    pub position: Point3f,
    pub intensity: f32,
}

impl PointXYZI {
    /// Create a new point from coordinates and intensity
    pub fn new(x: f32, y: f32, z: f32, intensity: f32) -> Self {
        Self {
            position: Point3f::new(x, y, z),
            intensity,
        }
    }
}

impl Default for PointXYZI {
    fn default() -> Self {
        Self {
            position: Point3f::origin(),
            intensity: 0.0,
        }
    }
}

impl From<PointXYZI> for Point3f {
    fn from(point: PointXYZI) -> Self {
        point.position
    }
}

impl From<Point3f> for PointXYZI {
    fn from(position: Point3f) -> Self {
        Self {
            position,
            intensity: 0.0,
        }
    }
}
