//! Core data structures and traits for rangefeat
//! 
//! This crate provides the fundamental types shared by the feature extraction
//! stage: points, point clouds, range-image scan frames, scan metadata and the
//! error type used across the workspace.

pub mod point;
pub mod point_cloud;
pub mod scan;
pub mod traits;
pub mod transform;
pub mod error;

pub use point::*;
pub use point_cloud::*;
pub use scan::*;
pub use traits::*;
pub use transform::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3};
