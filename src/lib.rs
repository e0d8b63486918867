//! # rangefeat
//!
//! Edge and planar feature extraction for range-image LIDAR scans.
//!
//! This is the umbrella crate that provides convenient access to all rangefeat
//! functionality. You can use this crate to get everything in one place, or use
//! the individual crates for more granular control over dependencies.
//!
//! ## Features
//!
//! - **Core**: point types, point clouds, scan frames and scan metadata
//! - **Algorithms**: curvature scoring, occlusion filtering, sector feature
//!   selection, voxel decimation and the extraction node
//!
//! ## Quick Start
//!
//! ```rust
//! use rangefeat::prelude::*;
//!
//! let ring: Vec<(PointXYZI, i32)> = (0..120)
//!     .map(|c| {
//!         let a = c as f32 * 0.01;
//!         (PointXYZI::new(10.0 * a.cos(), 10.0 * a.sin(), 0.0, 1.0), c)
//!     })
//!     .collect();
//! let frame = ScanFrame::from_rings(vec![ring]);
//!
//! let mut extractor = FeatureExtractor::new(FeatureExtractionConfig::default()).unwrap();
//! extractor.observe_dimensions(1, 120).unwrap();
//! let clouds = extractor.extract(&frame).unwrap();
//! assert!(clouds.corner_cloud.is_empty());
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: Enables core and algorithms
//! - `algorithms`: Feature extraction algorithms

// Re-export core functionality
pub use rangefeat_core::*;

// Re-export sub-crates
#[cfg(feature = "algorithms")]
pub use rangefeat_algorithms as algorithms;

/// Convenient imports for common use cases
pub mod prelude {
    pub use rangefeat_core::*;

    #[cfg(feature = "algorithms")]
    pub use rangefeat_algorithms::*;
}
