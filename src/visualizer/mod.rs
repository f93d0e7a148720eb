// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Display metadata handed to the presentation layer.

/// Color definitions and palettes.
pub mod color;

/// Skeleton definition and bone eligibility.
pub mod skeleton;

pub use color::{Color, KeypointStyle};
pub use skeleton::{Bone, COCO_SKELETON, renderable_bones};
