// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Pose Keypoint Annotator
//!
//! Session model for labeling human-pose keypoints on video frames and keeping
//! them in a COCO-keypoints dataset on disk.
//!
//! ## Features
//!
//! - **COCO Keypoints** - 17-keypoint person schema, `annotations.json` compatible with COCO tooling
//! - **Frame Identity** - `(video_file, frame_number)` is unique across the dataset and indexed
//! - **Safe Saves** - frames and annotations are written atomically; failed saves change nothing
//! - **Multiple Sources** - image directories, and video files with the `video` feature
//!
//! ## Quick Start (Library)
//!
//! ```no_run
//! use pose_annotator::{AnnotationSession, SessionConfig, Visibility};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = AnnotationSession::new(SessionConfig::default());
//!     session.open_output_dir("dataset")?;
//!     session.open_source_path("frames/squat_01")?;
//!     session.seek_frame(5)?;
//!
//!     session.set_point("nose", 100.0, 100.0, Visibility::Visible)?;
//!     session.set_point("left_eye", 92.0, 95.0, Visibility::LabeledNotVisible)?;
//!
//!     let outcome = session.save_current(|prompt| {
//!         println!("{prompt}");
//!         true
//!     })?;
//!     println!("Saved image {:?}", outcome.image_id());
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # Dataset overview
//! pose-annotator info --output dataset/
//!
//! # Label frame 5 of an image sequence
//! pose-annotator label -o dataset/ --frames squat_01/ --frame 5 \
//!     --point nose=100,100 --point left_eye=92,95,1
//!
//! # Overwrite an existing record
//! pose-annotator label -o dataset/ --video squat.mp4 --frame 5 --point nose=200,200 --yes
//!
//! # Replay a saved record
//! pose-annotator show -o dataset/ --image-id 1
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`schema`] | Keypoint names, skeleton and category ([`PoseSchema`]) |
//! | [`keypoints`] | Per-frame labels and bbox derivation ([`KeypointSet`]) |
//! | [`record`] | Persisted [`ImageRecord`] / [`AnnotationRecord`] |
//! | [`dataset`] | [`Dataset`] with identity index and save protocol |
//! | [`io`] | Output directory layout ([`DatasetStore`]) |
//! | [`source`] | Frame sources ([`FrameSource`], [`ImageDirSource`]) |
//! | [`session`] | Editing session ([`AnnotationSession`]) |
//! | [`visualizer`] | Colors and renderable bones |
//! | [`error`] | Error types ([`AnnotationError`], [`Result`]) |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `video` | Video file support through `video-rs` |
//!
//! ## License
//!
//! This project is licensed under [AGPL-3.0](https://ultralytics.com/license).

// Modules
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod io;
pub mod keypoints;
pub mod record;
pub mod schema;
pub mod session;
pub mod source;
pub mod visualizer;

// Re-export main types for convenience
pub use config::SessionConfig;
pub use dataset::{CommitRequest, Dataset, LabeledFrame, SaveOutcome, UpdatePrompt};
pub use error::{AnnotationError, Result};
pub use io::{DatasetStore, load_frame_file};
pub use keypoints::{BBox, Keypoint, KeypointSet, Visibility};
pub use record::{AnnotationRecord, FrameIdentity, ImageRecord};
pub use schema::PoseSchema;
pub use session::{AnnotationSession, FrameOrigin, FrameSummary, KeypointChange, Selection};
pub use source::{Frame, FrameSource, ImageDirSource, open_source};

#[cfg(feature = "video")]
pub use source::VideoSource;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "pose-annotator");
    }
}
