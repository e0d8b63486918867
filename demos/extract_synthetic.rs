//! Synthetic scan example for rangefeat
//!
//! Ray-casts a rotating multi-ring LIDAR inside a box-shaped room with a
//! pole, then runs every frame through the feature extraction node:
//! - Learning the range-image dimensions from the first organized cloud
//! - Extracting corner and surface features per frame
//! - Collecting the published records in a memory sink
//! - Stitching the corners into a room-frame map through each pose guess

use anyhow::Context;
use clap::Parser;
use rand::prelude::*;
use rangefeat_algorithms::{FeatureExtractionConfig, FeatureExtractionNode, MemorySink};
use rangefeat_core::{
    AttitudePrior, CloudInfo, Header, LidarCloud, Point3f, PointXYZI, PoseGuess, ScanFrame,
    Vector3f,
};
use std::f32::consts::PI;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Extract edge and planar features from synthetic LIDAR scans")]
struct Args {
    /// TOML configuration file; defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of sensor rings
    #[arg(long, default_value_t = 16)]
    rings: usize,

    /// Azimuthal columns per ring
    #[arg(long, default_value_t = 1800)]
    columns: usize,

    /// Number of frames to process
    #[arg(long, default_value_t = 5)]
    frames: usize,

    /// Half-width of the uniform range noise (meters)
    #[arg(long, default_value_t = 0.01)]
    noise: f32,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Room half extents, sensor height and pole placement
const ROOM_HALF_X: f32 = 10.0;
const ROOM_HALF_Y: f32 = 6.0;
const FLOOR_Z: f32 = -1.5;
const CEILING_Z: f32 = 2.5;
const POLE_CENTER: (f32, f32) = (4.0, 2.0);
const POLE_RADIUS: f32 = 0.3;

/// Distance along a unit ray from `origin` to the first surface hit
fn cast_ray(origin: &Point3f, dir: &Vector3f) -> Option<f32> {
    let mut hits = Vec::with_capacity(5);

    for (o, d, half) in [(origin.x, dir.x, ROOM_HALF_X), (origin.y, dir.y, ROOM_HALF_Y)] {
        if d.abs() > 1e-6 {
            hits.push((half.copysign(d) - o) / d);
        }
    }
    if dir.z < -1e-6 {
        hits.push((FLOOR_Z - origin.z) / dir.z);
    } else if dir.z > 1e-6 {
        hits.push((CEILING_Z - origin.z) / dir.z);
    }

    // pole: |o + t * d_xy - c|^2 = r^2
    let (cx, cy) = (POLE_CENTER.0 - origin.x, POLE_CENTER.1 - origin.y);
    let a = dir.x * dir.x + dir.y * dir.y;
    let b = -2.0 * (dir.x * cx + dir.y * cy);
    let c = cx * cx + cy * cy - POLE_RADIUS * POLE_RADIUS;
    let disc = b * b - 4.0 * a * c;
    if a > 1e-9 && disc >= 0.0 {
        let t = (-b - disc.sqrt()) / (2.0 * a);
        if t > 0.0 {
            hits.push(t);
        }
    }

    hits.into_iter().filter(|t| *t > 0.0).min_by(f32::total_cmp)
}

/// Scan the room from `pose`; points are returned in the sensor frame
fn synthetic_frame(args: &Args, pose: &PoseGuess, rng: &mut StdRng) -> ScanFrame<PointXYZI> {
    let sensor_to_world = pose.to_transform();
    let origin = sensor_to_world.transform_point(&Point3f::origin());
    let noise = args.noise.abs();

    let rings = (0..args.rings)
        .map(|ring| {
            let elevation = if args.rings > 1 {
                (-15.0 + 30.0 * ring as f32 / (args.rings - 1) as f32).to_radians()
            } else {
                0.0
            };

            (0..args.columns)
                .filter_map(|column| {
                    let azimuth = 2.0 * PI * column as f32 / args.columns as f32;
                    let local = Point3f::new(
                        elevation.cos() * azimuth.cos(),
                        elevation.cos() * azimuth.sin(),
                        elevation.sin(),
                    );
                    let dir = sensor_to_world.transform_point(&local) - origin;
                    let range = cast_ray(&origin, &dir)? + rng.gen_range(-noise..=noise);
                    let hit = local * range;
                    Some((PointXYZI::new(hit.x, hit.y, hit.z, ring as f32), column as i32))
                })
                .collect()
        })
        .collect();

    ScanFrame::from_rings(rings)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => FeatureExtractionConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => FeatureExtractionConfig::default(),
    };

    let mut node = FeatureExtractionNode::new(config, MemorySink::<PointXYZI>::new())?;
    let mut rng = StdRng::seed_from_u64(args.seed);

    node.on_original_cloud(args.rings, args.columns)?;

    for index in 0..args.frames {
        // the sensor drifts forward and turns slowly
        let yaw = 0.05 * index as f32;
        let pose = PoseGuess { x: -2.0 + 0.3 * index as f32, y: -1.0, yaw, ..Default::default() };
        let frame = synthetic_frame(&args, &pose, &mut rng);
        let info = CloudInfo {
            header: Header {
                stamp: index as f64 * 0.1,
                frame_id: "lidar".to_string(),
            },
            imu_available: true,
            odom_available: index > 0,
            imu_init: AttitudePrior { roll: 0.0, pitch: 0.0, yaw },
            initial_guess: pose,
            frame,
        };
        node.on_cloud_info(info)?;
    }

    let sink = node.into_sink();
    let mut corner_map = LidarCloud::new();
    for info in &sink.infos {
        log::info!(
            "t={:.1}s deskewed: {} corners: {} surfaces: {}",
            info.header.stamp,
            info.cloud_deskewed.len(),
            info.cloud_corner.len(),
            info.cloud_surface.len()
        );

        let mut corners = info.cloud_corner.clone();
        corners.transform(&info.initial_guess.to_transform());
        corner_map += corners;
    }
    log::info!("corner map: {} points in the room frame", corner_map.len());

    Ok(())
}
