//! # rangefeat Algorithms
//!
//! Feature extraction for range-image LIDAR scans.
//!
//! This crate scores every point of a flattened range image by local range
//! curvature, rejects occluded and grazing returns, and selects edge and
//! planar features ring by ring for downstream scan registration.

pub mod config;
pub mod extraction;
pub mod features;
pub mod filtering;

// Re-export commonly used items
pub use config::*;
pub use extraction::*;
pub use features::*;
pub use filtering::*;
