//! Range-image scan frames and the metadata that travels with them
//!
//! A [`ScanFrame`] is one sensor sweep flattened in row-major (ring, column)
//! order together with the range-image annotations produced upstream. A
//! [`CloudInfo`] wraps a frame with the odometry priors that the feature
//! stage passes through untouched, and [`FeatureCloudInfo`] is the record
//! handed downstream once the frame has been reduced to features.

use crate::error::{Error, Result};
use crate::point::PointXYZI;
use crate::point_cloud::PointCloud;
use crate::traits::Positioned;
use crate::transform::Transform3D;
use serde::{Deserialize, Serialize};

/// Number of points reserved at each end of a ring (and of the frame) that
/// lack a full curvature neighborhood.
pub const RING_BORDER: usize = 5;

/// One sensor sweep organized as a flattened range image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanFrame<T = PointXYZI> {
    /// Valid points in row-major scan order
    pub cloud: PointCloud<T>,
    /// Measured distance of each point
    pub range: Vec<f32>,
    /// First usable flattened index of each ring
    pub ring_start_index: Vec<usize>,
    /// Last usable flattened index of each ring
    pub ring_end_index: Vec<usize>,
    /// Azimuthal bin of each point within its ring
    pub column_index: Vec<i32>,
}

impl<T> ScanFrame<T> {
    /// Number of points in the frame
    pub fn len(&self) -> usize {
        self.cloud.len()
    }

    /// Check if the frame holds no points
    pub fn is_empty(&self) -> bool {
        self.cloud.is_empty()
    }

    /// Number of rings described by the annotations
    pub fn ring_count(&self) -> usize {
        self.ring_start_index.len()
    }

    /// Check the annotations against the scan dimensions learned at startup.
    ///
    /// Every index the selector dereferences must be covered: annotation
    /// arrays as long as the cloud, one bound pair per ring, ordered bounds
    /// inside the frame, and no more points than the range image can hold.
    pub fn validate(&self, height: usize, width: usize) -> Result<()> {
        let n = self.len();

        let capacity = height.checked_mul(width).ok_or_else(|| {
            Error::MalformedFrame(format!("scan dimensions {}x{} overflow", height, width))
        })?;
        if n > capacity {
            return Err(Error::MalformedFrame(format!(
                "{} points exceed the {}x{} range image",
                n, height, width
            )));
        }
        if self.range.len() < n {
            return Err(Error::MalformedFrame(format!(
                "range array has {} entries for {} points",
                self.range.len(),
                n
            )));
        }
        if self.column_index.len() < n {
            return Err(Error::MalformedFrame(format!(
                "column index array has {} entries for {} points",
                self.column_index.len(),
                n
            )));
        }
        if self.ring_count() != height || self.ring_end_index.len() != height {
            return Err(Error::MalformedFrame(format!(
                "expected {} ring bounds, got {} starts and {} ends",
                height,
                self.ring_start_index.len(),
                self.ring_end_index.len()
            )));
        }

        for (ring, (&start, &end)) in self
            .ring_start_index
            .iter()
            .zip(&self.ring_end_index)
            .enumerate()
        {
            if start > end {
                return Err(Error::MalformedFrame(format!(
                    "ring {} starts at {} after its end {}",
                    ring, start, end
                )));
            }
            if end >= n {
                return Err(Error::MalformedFrame(format!(
                    "ring {} ends at {} outside a frame of {} points",
                    ring, end, n
                )));
            }
        }

        Ok(())
    }
}

impl<T: Positioned> ScanFrame<T> {
    /// Flatten per-ring `(point, column)` lists into a frame.
    ///
    /// Ranges are taken from the point positions and each ring's bounds are
    /// pulled in from both ends by the curvature border, the same layout a
    /// range-image projection stage emits. Rings need more than
    /// `2 * RING_BORDER` points for their bounds to be ordered.
    pub fn from_rings(rings: Vec<Vec<(T, i32)>>) -> Self {
        let total = rings.iter().map(Vec::len).sum();
        let mut cloud = PointCloud::with_capacity(total);
        let mut range = Vec::with_capacity(total);
        let mut column_index = Vec::with_capacity(total);
        let mut ring_start_index = Vec::with_capacity(rings.len());
        let mut ring_end_index = Vec::with_capacity(rings.len());

        for ring in rings {
            ring_start_index.push(cloud.len() + RING_BORDER - 1);
            for (point, column) in ring {
                range.push(point.range());
                column_index.push(column);
                cloud.push(point);
            }
            ring_end_index.push(cloud.len().saturating_sub(RING_BORDER + 1));
        }

        Self {
            cloud,
            range,
            ring_start_index,
            ring_end_index,
            column_index,
        }
    }
}

/// Message header shared by every record of one scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Acquisition time in seconds
    pub stamp: f64,
    pub frame_id: String,
}

/// Attitude prior from the IMU, radians
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AttitudePrior {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

/// Initial pose guess for scan registration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseGuess {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl PoseGuess {
    pub fn to_transform(&self) -> Transform3D {
        Transform3D::from_xyz_rpy(self.x, self.y, self.z, self.roll, self.pitch, self.yaw)
    }
}

/// A deskewed scan with its range-image annotations and odometry priors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudInfo<T = PointXYZI> {
    pub header: Header,
    pub imu_available: bool,
    pub odom_available: bool,
    pub imu_init: AttitudePrior,
    pub initial_guess: PoseGuess,
    pub frame: ScanFrame<T>,
}

impl<T> CloudInfo<T> {
    /// Replace the range-image payload with the extracted feature clouds.
    ///
    /// Header, availability flags, priors and the deskewed cloud are carried
    /// over unchanged; ranges, ring bounds and column indices are dropped.
    pub fn into_feature_info(
        self,
        cloud_corner: PointCloud<T>,
        cloud_surface: PointCloud<T>,
    ) -> FeatureCloudInfo<T> {
        FeatureCloudInfo {
            header: self.header,
            imu_available: self.imu_available,
            odom_available: self.odom_available,
            imu_init: self.imu_init,
            initial_guess: self.initial_guess,
            cloud_deskewed: self.frame.cloud,
            cloud_corner,
            cloud_surface,
        }
    }
}

/// Output record of the feature stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCloudInfo<T = PointXYZI> {
    pub header: Header,
    pub imu_available: bool,
    pub odom_available: bool,
    pub imu_init: AttitudePrior,
    pub initial_guess: PoseGuess,
    pub cloud_deskewed: PointCloud<T>,
    pub cloud_corner: PointCloud<T>,
    pub cloud_surface: PointCloud<T>,
}
