//! Edge and planar feature selection on a flattened range image
//!
//! The selection runs in three passes over a [`ScanFrame`]:
//!
//! 1. [`calculate_smoothness`] scores every point by the squared second
//!    difference of range over an 11-point window.
//! 2. [`mark_occluded_points`] excludes points next to range
//!    discontinuities and points hit by near-grazing beams.
//! 3. [`select_features`] splits each ring into sectors, picks the sharpest
//!    points as edges, marks the smoothest as planar, and voxel-decimates
//!    everything that is not an edge into the surface cloud.
//!
//! Per-point state lives in a caller-owned slice of [`PointFeature`] so the
//! allocation can be reused across frames.

use crate::filtering::VoxelGrid;
use rangefeat_core::{PointCloud, Positioned, Result, ScanFrame, RING_BORDER};
use serde::{Deserialize, Serialize};

/// Classification of a point after selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeatureLabel {
    #[default]
    None,
    Edge,
    Planar,
}

/// Per-point working state for one frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointFeature {
    /// Squared range second difference; `None` for unscored border points
    pub curvature: Option<f32>,
    /// Once set the point is excluded from further selection this frame
    pub neighbor_picked: bool,
    pub label: FeatureLabel,
}

/// A (curvature, index) pair used to rank the points of one sector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothnessEntry {
    pub value: f32,
    pub index: usize,
}

/// Tuning constants of the selection passes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionParams {
    /// Angular sectors per ring
    pub sector_count: usize,
    /// Cap on accepted edges in one sector
    pub max_edges_per_sector: usize,
    /// Points suppressed on each side of an accepted feature
    pub neighbor_radius: usize,
    /// Column distance above which two consecutive points are not adjacent
    pub column_gap_limit: u32,
    /// Range jump (meters) treated as an occlusion boundary
    pub occlusion_range_gap: f32,
    /// Relative range jump on both sides that marks a grazing beam
    pub parallel_beam_ratio: f32,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self {
            sector_count: 6,
            max_edges_per_sector: 20,
            neighbor_radius: 5,
            column_gap_limit: 10,
            occlusion_range_gap: 0.3,
            parallel_beam_ratio: 0.02,
        }
    }
}

/// Curvature thresholds, selection constants and the planar downsampler
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureSelector {
    pub edge_threshold: f32,
    pub surf_threshold: f32,
    pub params: SelectionParams,
    pub downsampler: VoxelGrid,
}

/// Feature clouds extracted from one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureClouds<T> {
    pub corner_cloud: PointCloud<T>,
    pub surface_cloud: PointCloud<T>,
}

impl<T> Default for FeatureClouds<T> {
    fn default() -> Self {
        Self {
            corner_cloud: PointCloud::new(),
            surface_cloud: PointCloud::new(),
        }
    }
}

/// Score every point with a full 11-point neighborhood.
///
/// The window runs over the flattened index and ignores ring seams, so the
/// first and last few points of a ring borrow ranges from the adjacent ring.
/// All states covering `range` are reset; the first and last
/// [`RING_BORDER`] points keep `curvature == None`.
pub fn calculate_smoothness(range: &[f32], features: &mut [PointFeature]) {
    let n = range.len().min(features.len());
    features[..n].fill(PointFeature::default());

    for i in RING_BORDER..n.saturating_sub(RING_BORDER) {
        let center = range[i];
        let diff: f32 = range[i - RING_BORDER..=i + RING_BORDER]
            .iter()
            .map(|r| r - center)
            .sum();
        features[i].curvature = Some(diff * diff);
    }
}

/// Exclude points on occlusion boundaries and grazing beams.
///
/// Only ever sets `neighbor_picked`; must run after [`calculate_smoothness`].
pub fn mark_occluded_points(
    range: &[f32],
    column_index: &[i32],
    features: &mut [PointFeature],
    params: &SelectionParams,
) {
    let n = range.len().min(column_index.len()).min(features.len());
    // occlusion marking reaches 6 points past i + 1
    let last = n.saturating_sub(RING_BORDER + 1);

    for i in RING_BORDER..last {
        let depth1 = range[i];
        let depth2 = range[i + 1];
        let column_diff = column_index[i + 1].abs_diff(column_index[i]);

        if column_diff < params.column_gap_limit {
            if depth1 - depth2 > params.occlusion_range_gap {
                for feature in &mut features[i - RING_BORDER..=i] {
                    feature.neighbor_picked = true;
                }
            } else if depth2 - depth1 > params.occlusion_range_gap {
                for feature in &mut features[i + 1..=i + RING_BORDER + 1] {
                    feature.neighbor_picked = true;
                }
            }
        }

        // parallel beam
        let diff1 = (range[i - 1] - range[i]).abs();
        let diff2 = (range[i + 1] - range[i]).abs();
        let limit = params.parallel_beam_ratio * range[i];
        if diff1 > limit && diff2 > limit {
            features[i].neighbor_picked = true;
        }
    }
}

/// Flattened index bounds `[sp, ep]` of one sector of a ring, or `None` for
/// an empty sector.
pub fn sector_bounds(
    start: usize,
    end: usize,
    sector: usize,
    sector_count: usize,
) -> Option<(usize, usize)> {
    let (s, e) = (start as i64, end as i64);
    let (j, c) = (sector as i64, sector_count as i64);
    let sp = (s * (c - j) + e * j) / c;
    let ep = (s * (c - 1 - j) + e * (j + 1)) / c - 1;
    (sp < ep).then_some((sp as usize, ep as usize))
}

/// Mark the run of angularly adjacent points on both sides of `index`,
/// stopping at the first column gap.
fn suppress_neighbors(
    index: usize,
    column_index: &[i32],
    features: &mut [PointFeature],
    params: &SelectionParams,
) {
    let n = features.len();

    for k in (index + 1..=index + params.neighbor_radius).take_while(|&k| k < n) {
        if column_index[k].abs_diff(column_index[k - 1]) > params.column_gap_limit {
            break;
        }
        features[k].neighbor_picked = true;
    }

    for k in (index.saturating_sub(params.neighbor_radius)..index).rev() {
        if column_index[k].abs_diff(column_index[k + 1]) > params.column_gap_limit {
            break;
        }
        features[k].neighbor_picked = true;
    }
}

/// Run sector selection over every ring of a scored and filtered frame.
///
/// `features` must hold the state of exactly the frame's points, as produced
/// by [`calculate_smoothness`] and [`mark_occluded_points`]. Every point of
/// a sector that is not accepted as an edge goes into the ring's surface
/// buffer, whether or not it was explicitly marked planar.
pub fn select_features<T: Positioned>(
    frame: &ScanFrame<T>,
    features: &mut [PointFeature],
    selector: &FeatureSelector,
) -> Result<FeatureClouds<T>> {
    let params = &selector.params;
    let mut clouds = FeatureClouds::default();
    let mut ring_surface = PointCloud::new();
    let mut smoothness: Vec<SmoothnessEntry> = Vec::new();

    for (&start, &end) in frame.ring_start_index.iter().zip(&frame.ring_end_index) {
        ring_surface.clear();

        for sector in 0..params.sector_count {
            let Some((sp, ep)) = sector_bounds(start, end, sector, params.sector_count) else {
                continue;
            };

            smoothness.clear();
            smoothness.extend((sp..=ep).filter_map(|index| {
                features[index]
                    .curvature
                    .map(|value| SmoothnessEntry { value, index })
            }));
            smoothness.sort_unstable_by(|a, b| a.value.total_cmp(&b.value));

            let mut edges_picked = 0;
            for entry in smoothness.iter().rev() {
                let ind = entry.index;
                if features[ind].neighbor_picked || entry.value <= selector.edge_threshold {
                    continue;
                }
                if edges_picked == params.max_edges_per_sector {
                    break;
                }
                edges_picked += 1;

                features[ind].label = FeatureLabel::Edge;
                features[ind].neighbor_picked = true;
                clouds.corner_cloud.push(frame.cloud[ind]);
                suppress_neighbors(ind, &frame.column_index, features, params);
            }

            for entry in &smoothness {
                let ind = entry.index;
                if features[ind].neighbor_picked || entry.value >= selector.surf_threshold {
                    continue;
                }

                features[ind].label = FeatureLabel::Planar;
                features[ind].neighbor_picked = true;
                suppress_neighbors(ind, &frame.column_index, features, params);
            }

            ring_surface.extend(
                (sp..=ep)
                    .filter(|&k| features[k].label != FeatureLabel::Edge)
                    .map(|k| frame.cloud[k]),
            );
        }

        clouds.surface_cloud += selector.downsampler.filter(&ring_surface)?;
    }

    Ok(clouds)
}
