//! Integration tests for rangefeat-algorithms
//!
//! These tests drive whole frames through the extractor and the node and
//! check the selection outcome on hand-built range profiles.

use approx::assert_relative_eq;
use rand::prelude::*;
use rangefeat_algorithms::*;
use rangefeat_core::{AttitudePrior, CloudInfo, Header, PointXYZI, PoseGuess, ScanFrame};
use std::collections::HashSet;
use std::path::Path;

/// One ring whose point `k` sits at `ranges[k]`; intensity carries the
/// flattened index so selected points can be traced back.
fn ring_points(ranges: &[f32], index_offset: usize) -> Vec<(PointXYZI, i32)> {
    ranges
        .iter()
        .enumerate()
        .map(|(c, &r)| {
            let angle = c as f32 * 0.01;
            let intensity = (index_offset + c) as f32;
            (PointXYZI::new(r * angle.cos(), r * angle.sin(), 0.0, intensity), c as i32)
        })
        .collect()
}

fn fine_config(edge_threshold: f32, surf_threshold: f32) -> FeatureExtractionConfig {
    FeatureExtractionConfig {
        edge_threshold,
        surf_threshold,
        planar_voxel_leaf_size: 1e-3,
        voxel_representative: VoxelRepresentative::First,
        ..Default::default()
    }
}

fn indices(points: &[PointXYZI]) -> HashSet<usize> {
    points.iter().map(|p| p.intensity as usize).collect()
}

#[test]
fn test_plateau_edges_are_detected() {
    let ranges: Vec<f32> = (0..60)
        .map(|k| if (20..=24).contains(&k) { 11.0 } else { 10.0 })
        .collect();
    let frame = ScanFrame::from_rings(vec![ring_points(&ranges, 0)]);

    let mut extractor = FeatureExtractor::new(fine_config(0.05, 0.1)).unwrap();
    extractor.observe_dimensions(1, 60).unwrap();
    let clouds = extractor.extract(&frame).unwrap();

    // the plateau rims are occlusion boundaries, so the picks land just outside them
    let corners = indices(&clouds.corner_cloud.points);
    assert_eq!(corners, HashSet::from([18, 26]));
    for interior in 21..=23 {
        assert_ne!(extractor.point_features()[interior].label, FeatureLabel::Edge);
    }
}

#[test]
fn test_flat_ring_contributes_only_surface() {
    let frame = ScanFrame::from_rings(vec![ring_points(&[10.0; 60], 0)]);
    let covered = frame.ring_end_index[0] - frame.ring_start_index[0];

    let mut extractor = FeatureExtractor::new(fine_config(0.1, 0.05)).unwrap();
    extractor.observe_dimensions(1, 60).unwrap();
    let clouds = extractor.extract(&frame).unwrap();
    assert!(clouds.corner_cloud.is_empty());
    assert_eq!(clouds.surface_cloud.len(), covered);

    let coarse = FeatureExtractionConfig { planar_voxel_leaf_size: 1.0, ..fine_config(0.1, 0.05) };
    let mut extractor = FeatureExtractor::new(coarse).unwrap();
    extractor.observe_dimensions(1, 60).unwrap();
    let decimated = extractor.extract(&frame).unwrap();
    assert!(!decimated.surface_cloud.is_empty());
    assert!(decimated.surface_cloud.len() < covered);
}

fn two_ring_frame() -> ScanFrame<PointXYZI> {
    ScanFrame::from_rings(vec![ring_points(&[12.0; 40], 0), ring_points(&[10.0; 40], 40)])
}

#[test]
fn test_ring_seam_is_not_an_occlusion() {
    let frame = two_ring_frame();
    assert!(frame.column_index[40].abs_diff(frame.column_index[39]) >= 10);

    let mut features = vec![PointFeature::default(); frame.len()];
    let params = SelectionParams::default();
    calculate_smoothness(&frame.range, &mut features);
    mark_occluded_points(&frame.range, &frame.column_index, &mut features, &params);

    assert!(features.iter().all(|f| !f.neighbor_picked));
}

#[test]
fn test_curvature_window_spans_ring_seam() {
    let frame = two_ring_frame();
    let mut features = vec![PointFeature::default(); frame.len()];
    calculate_smoothness(&frame.range, &mut features);

    // every window that reaches across index 39/40 mixes both rings
    for k in 35..=44 {
        assert!(features[k].curvature.unwrap() > 1.0, "index {}", k);
    }
    assert_relative_eq!(features[39].curvature.unwrap(), 100.0, epsilon = 1e-2);
    assert_relative_eq!(features[40].curvature.unwrap(), 100.0, epsilon = 1e-2);

    for k in (5..35).chain(45..75) {
        assert!(features[k].curvature.unwrap() < 1e-6, "index {}", k);
    }
}

#[test]
fn test_noisy_scan_respects_selection_invariants() {
    let mut rng = StdRng::seed_from_u64(7);
    let (height, width) = (4, 400);
    let rings: Vec<_> = (0..height)
        .map(|ring| {
            let ranges: Vec<f32> = (0..width)
                .map(|c| {
                    let wall = if (c / 50) % 2 == 0 { 6.0 } else { 6.2 };
                    wall + 0.15 * (c as f32 * 0.3).sin() + rng.gen_range(-0.02..0.02)
                })
                .collect();
            ring_points(&ranges, ring * width)
        })
        .collect();
    let frame = ScanFrame::from_rings(rings);

    let mut extractor = FeatureExtractor::new(fine_config(0.1, 0.1)).unwrap();
    extractor.observe_dimensions(height, width).unwrap();
    let clouds = extractor.extract(&frame).unwrap();
    assert!(!clouds.corner_cloud.is_empty());

    let corners = indices(&clouds.corner_cloud.points);
    let surfaces = indices(&clouds.surface_cloud.points);
    assert!(corners.is_disjoint(&surfaces));

    let labels = extractor.point_features();
    for (&start, &end) in frame.ring_start_index.iter().zip(&frame.ring_end_index) {
        for sector in 0..6 {
            if let Some((sp, ep)) = sector_bounds(start, end, sector, 6) {
                let sector_labels = &labels[sp..=ep];
                let edges = sector_labels.iter().filter(|f| f.label == FeatureLabel::Edge).count();
                assert!(edges <= 20);
            }
        }
    }
}

#[test]
fn test_node_handshake_and_pass_through() {
    let sink = MemorySink::<PointXYZI>::new();
    let mut node = FeatureExtractionNode::new(fine_config(0.05, 0.1), sink).unwrap();

    let mut ranges = vec![10.0f32; 60];
    ranges[30] = 10.1;
    let make_info = |stamp: f64| CloudInfo {
        header: Header { stamp, frame_id: "os_sensor".to_string() },
        imu_available: true,
        odom_available: false,
        imu_init: AttitudePrior { roll: 0.0, pitch: 0.1, yaw: 1.2 },
        initial_guess: PoseGuess { x: 3.0, y: -1.0, z: 0.2, roll: 0.0, pitch: 0.0, yaw: 1.2 },
        frame: ScanFrame::from_rings(vec![ring_points(&ranges, 0)]),
    };

    assert!(node.on_cloud_info(make_info(0.0)).is_err());

    node.on_original_cloud(1, 60).unwrap();
    node.on_original_cloud(2, 120).unwrap();
    assert_eq!(node.extractor().state(), ExtractorState::Dimensioned { height: 1, width: 60 });

    node.on_cloud_info(make_info(0.1)).unwrap();

    let sink = node.into_sink();
    assert_eq!(sink.infos.len(), 1);
    let info = &sink.infos[0];
    assert_eq!(info.header.stamp, 0.1);
    assert_eq!(info.header.frame_id, "os_sensor");
    assert!(info.imu_available);
    assert!(!info.odom_available);
    assert_eq!(info.imu_init.yaw, 1.2);
    assert_eq!(info.initial_guess.x, 3.0);
    assert_eq!(info.cloud_deskewed.len(), 60);
    assert_eq!(indices(&info.cloud_corner.points), HashSet::from([30]));
    assert_eq!(sink.corners[0].1, info.cloud_corner);
    assert_eq!(sink.corners[0].0.frame_id, "lidar");
}

#[test]
fn test_repository_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/feature_extraction.toml");
    let config = FeatureExtractionConfig::load(&path).unwrap();

    assert_eq!(config.frame_id(), "uav1/os_lidar");
    assert_eq!(config.planar_voxel_leaf_size, 0.2);
    assert_eq!(config.selection, SelectionParams::default());
    assert!(FeatureExtractor::new(config).is_ok());
}
