//! Filtering algorithms

use rangefeat_core::{Error, PointCloud, Positioned, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a voxel collapses the points that fall into it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoxelRepresentative {
    /// Average of all points in the cell
    #[default]
    Centroid,
    /// The first point that entered the cell
    First,
}

/// A reusable voxel grid downsampler with a fixed cubic leaf size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelGrid {
    leaf_size: f32,
    representative: VoxelRepresentative,
}

impl VoxelGrid {
    /// Create a voxel grid, rejecting non-positive or non-finite leaf sizes
    pub fn new(leaf_size: f32, representative: VoxelRepresentative) -> Result<Self> {
        if !(leaf_size.is_finite() && leaf_size > 0.0) {
            return Err(Error::InvalidData(
                "voxel leaf size must be positive".to_string()
            ));
        }
        Ok(Self { leaf_size, representative })
    }

    pub fn leaf_size(&self) -> f32 {
        self.leaf_size
    }

    pub fn representative(&self) -> VoxelRepresentative {
        self.representative
    }

    /// Integer cell coordinates of a point; the grid is anchored at the origin
    fn cell_of<T: Positioned>(&self, point: &T) -> (i64, i64, i64) {
        let p = point.position();
        (
            (p.x / self.leaf_size).floor() as i64,
            (p.y / self.leaf_size).floor() as i64,
            (p.z / self.leaf_size).floor() as i64,
        )
    }

    /// Downsample a cloud to at most one point per occupied cell.
    ///
    /// Cells are emitted in the order in which they were first occupied, so
    /// the output is deterministic for a given input order.
    pub fn filter<T: Positioned>(&self, cloud: &PointCloud<T>) -> Result<PointCloud<T>> {
        if cloud.is_empty() {
            return Ok(PointCloud::new());
        }

        let mut cell_slots: HashMap<(i64, i64, i64), usize> = HashMap::with_capacity(cloud.len());
        let mut groups: Vec<Vec<T>> = Vec::new();

        for point in cloud.iter() {
            let slot = *cell_slots.entry(self.cell_of(point)).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(*point);
        }

        let filtered = groups
            .iter()
            .map(|group| match self.representative {
                VoxelRepresentative::Centroid => T::centroid(group),
                VoxelRepresentative::First => group[0],
            })
            .collect();

        Ok(filtered)
    }
}

/// Voxel grid filtering
///
/// This algorithm reduces the density of a point cloud by grouping points into voxels
/// and keeping only one representative point (the centroid) per voxel.
///
/// # Arguments
/// * `cloud` - Input point cloud
/// * `voxel_size` - Size of each voxel cube
///
/// # Returns
/// * `Result<PointCloud<T>>` - Downsampled point cloud
///
/// # Example
/// ```rust
/// use rangefeat_core::{PointCloud, Point3f};
/// use rangefeat_algorithms::voxel_grid_filter;
///
/// fn main() -> rangefeat_core::Result<()> {
///     let cloud = PointCloud::from_points(vec![
///         Point3f::new(0.0, 0.0, 0.0),
///         Point3f::new(0.1, 0.0, 0.0),
///         Point3f::new(0.0, 0.1, 0.0),
///         Point3f::new(0.0, 0.0, 0.1),
///     ]);
///
///     let filtered = voxel_grid_filter(&cloud, 0.2)?;
///     assert_eq!(filtered.len(), 1);
///     Ok(())
/// }
/// ```
pub fn voxel_grid_filter<T: Positioned>(
    cloud: &PointCloud<T>,
    voxel_size: f32,
) -> Result<PointCloud<T>> {
    VoxelGrid::new(voxel_size, VoxelRepresentative::Centroid)?.filter(cloud)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rangefeat_core::{Point3f, PointXYZI};

    fn scattered_cloud() -> PointCloud<PointXYZI> {
        (0..200)
            .map(|i| {
                let t = i as f32 * 0.037;
                PointXYZI::new(t.sin() * 3.0, t.cos() * 2.0, t * 0.1 - 0.5, i as f32)
            })
            .collect()
    }

    #[test]
    fn test_voxel_grid_filter_empty_cloud() {
        let cloud = PointCloud::<Point3f>::new();
        let result = voxel_grid_filter(&cloud, 0.1);
        assert!(result.is_ok());
        assert_eq!(result.unwrap().len(), 0);
    }

    #[test]
    fn test_voxel_grid_filter_single_point() {
        let cloud = PointCloud::from_points(vec![Point3f::new(0.0, 0.0, 0.0)]);
        let result = voxel_grid_filter(&cloud, 0.1);
        assert!(result.is_ok());
        assert_eq!(result.unwrap().len(), 1);
    }

    #[test]
    fn test_voxel_grid_filter_with_duplicates() {
        let cloud = PointCloud::from_points(vec![
            Point3f::new(0.01, 0.01, 0.01),
            Point3f::new(0.01, 0.01, 0.01), // duplicate
            Point3f::new(0.11, 0.01, 0.01),
            Point3f::new(0.11, 0.01, 0.01), // duplicate
            Point3f::new(0.01, 0.11, 0.01),
        ]);

        let result = voxel_grid_filter(&cloud, 0.05);
        assert!(result.is_ok());
        let filtered = result.unwrap();
        assert_eq!(filtered.len(), 3); // Should remove duplicates
    }

    #[test]
    fn test_voxel_grid_filter_invalid_voxel_size() {
        let cloud = PointCloud::from_points(vec![Point3f::new(0.0, 0.0, 0.0)]);
        let result = voxel_grid_filter(&cloud, 0.0);
        assert!(result.is_err());

        let result = voxel_grid_filter(&cloud, -1.0);
        assert!(result.is_err());

        assert!(VoxelGrid::new(f32::NAN, VoxelRepresentative::First).is_err());
    }

    #[test]
    fn test_centroid_averages_cell_members() {
        let cloud = PointCloud::from_points(vec![
            PointXYZI::new(0.1, 0.1, 0.1, 10.0),
            PointXYZI::new(0.3, 0.1, 0.1, 30.0),
            PointXYZI::new(5.0, 5.0, 5.0, 1.0),
        ]);
        let grid = VoxelGrid::new(1.0, VoxelRepresentative::Centroid).unwrap();
        let filtered = grid.filter(&cloud).unwrap();

        assert_eq!(filtered.len(), 2);
        assert_relative_eq!(filtered[0].position.x, 0.2, epsilon = 1e-6);
        assert_relative_eq!(filtered[0].intensity, 20.0);
        assert_eq!(filtered[1], cloud[2]);
    }

    #[test]
    fn test_first_seen_keeps_input_points() {
        let cloud = scattered_cloud();
        let grid = VoxelGrid::new(0.5, VoxelRepresentative::First).unwrap();
        assert_eq!(grid.leaf_size(), 0.5);
        assert_eq!(grid.representative(), VoxelRepresentative::First);
        let filtered = grid.filter(&cloud).unwrap();

        assert!(filtered.len() < cloud.len());
        assert!(filtered.iter().all(|p| cloud.points.contains(p)));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let cloud = scattered_cloud();
        for representative in [VoxelRepresentative::Centroid, VoxelRepresentative::First] {
            let grid = VoxelGrid::new(0.4, representative).unwrap();
            let once = grid.filter(&cloud).unwrap();
            let twice = grid.filter(&once).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_at_most_one_point_per_cell() {
        let cloud = scattered_cloud();
        let grid = VoxelGrid::new(0.3, VoxelRepresentative::Centroid).unwrap();
        let filtered = grid.filter(&cloud).unwrap();

        let mut cells: Vec<_> = filtered.iter().map(|p| grid.cell_of(p)).collect();
        let before = cells.len();
        cells.sort_unstable();
        cells.dedup();
        assert_eq!(cells.len(), before);
    }
}
