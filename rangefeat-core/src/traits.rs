//! Core traits for rangefeat

use crate::point::*;

/// Access to the spatial part of a point type
///
/// Implemented for every point type that can flow through the voxel grid and
/// rigid transforms. `centroid` defines how a group of points collapses into
/// a single representative.
pub trait Positioned: Copy {
    /// Position of the point in the sensor frame
    fn position(&self) -> Point3f;

    /// Replace the position while keeping the remaining attributes
    fn set_position(&mut self, position: Point3f);

    /// Average of a non-empty group of points
    fn centroid(points: &[Self]) -> Self;

    /// Distance from the sensor origin
    fn range(&self) -> f32 {
        self.position().coords.norm()
    }
}

impl Positioned for Point3f {
    fn position(&self) -> Point3f {
        *self
    }

    fn set_position(&mut self, position: Point3f) {
        *self = position;
    }

    fn centroid(points: &[Self]) -> Self {
        let sum = points
            .iter()
            .fold(Vector3f::zeros(), |acc, p| acc + p.coords);
        Point3f::from(sum / points.len().max(1) as f32)
    }
}

impl Positioned for PointXYZI {
    fn position(&self) -> Point3f {
        self.position
    }

    fn set_position(&mut self, position: Point3f) {
        self.position = position;
    }

    // Intensity is averaged together with the coordinates.
    fn centroid(points: &[Self]) -> Self {
        let n = points.len().max(1) as f32;
        let (sum, intensity) = points.iter().fold(
            (Vector3f::zeros(), 0.0f32),
            |(acc, i), p| (acc + p.position.coords, i + p.intensity),
        );
        Self {
            position: Point3f::from(sum / n),
            intensity: intensity / n,
        }
    }
}
