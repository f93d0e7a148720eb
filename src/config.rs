// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Session configuration.
//!
//! This module defines the [`SessionConfig`] struct, which controls where an
//! annotation session stores its dataset and frames and how frames are encoded.

/// Default name of the frames subdirectory.
pub const DEFAULT_FRAMES_DIR: &str = "frames";

/// Default name of the annotations file.
pub const DEFAULT_ANNOTATIONS_FILE: &str = "annotations.json";

/// Default dataset description written to `info.description`.
pub const DEFAULT_DESCRIPTION: &str = "Pose Keypoint Dataset";

/// Configuration for an annotation session.
///
/// It uses a builder pattern for convenient construction.
///
/// # Example
///
/// ```rust
/// use pose_annotator::SessionConfig;
///
/// let config = SessionConfig::new()
///     .with_jpeg_quality(90)
///     .with_description("Gym squats")
///     .with_default_fps(25.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Subdirectory of the output directory holding saved frames.
    pub frames_dir: String,
    /// File name of the dataset inside the output directory.
    pub annotations_file: String,
    /// JPEG quality (1-100) for saved frames.
    pub jpeg_quality: u8,
    /// Description written to a newly created dataset.
    pub description: String,
    /// Frame rate reported by sources that carry none (image directories).
    pub default_fps: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frames_dir: DEFAULT_FRAMES_DIR.to_string(),
            annotations_file: DEFAULT_ANNOTATIONS_FILE.to_string(),
            jpeg_quality: 95,
            description: DEFAULT_DESCRIPTION.to_string(),
            default_fps: 30.0,
        }
    }
}

impl SessionConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the frames subdirectory name.
    #[must_use]
    pub fn with_frames_dir(mut self, name: impl Into<String>) -> Self {
        self.frames_dir = name.into();
        self
    }

    /// Set the annotations file name.
    #[must_use]
    pub fn with_annotations_file(mut self, name: impl Into<String>) -> Self {
        self.annotations_file = name.into();
        self
    }

    /// Set the JPEG quality, clamped to 1-100.
    #[must_use]
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Set the dataset description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the fallback frame rate.
    #[must_use]
    pub const fn with_default_fps(mut self, fps: f64) -> Self {
        self.default_fps = fps;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.frames_dir, "frames");
        assert_eq!(config.annotations_file, "annotations.json");
        assert_eq!(config.jpeg_quality, 95);
        assert!((config.default_fps - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_builder() {
        let config = SessionConfig::new()
            .with_frames_dir("images")
            .with_annotations_file("person_keypoints.json")
            .with_jpeg_quality(0)
            .with_description("test")
            .with_default_fps(25.0);

        assert_eq!(config.frames_dir, "images");
        assert_eq!(config.annotations_file, "person_keypoints.json");
        assert_eq!(config.jpeg_quality, 1);
        assert_eq!(config.description, "test");
        assert!((config.default_fps - 25.0).abs() < f64::EPSILON);
    }
}
