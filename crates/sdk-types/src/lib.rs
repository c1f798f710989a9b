//! Shared value types for storyboard generation.
//!
//! Images travel between layers as data URIs; shots are identified by
//! `ShotId` everywhere.

pub mod image;
pub mod json;
pub mod shot;

pub use image::{DataUri, DataUriError};
pub use shot::{
    AspectRatio, GenerationMode, GenerationTask, GridSize, QualityLevel, Shot, ShotId, ShotSpec,
};
