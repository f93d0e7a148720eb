// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for the annotation library.

use std::fmt;
use std::path::PathBuf;

/// Result type alias for annotation operations.
pub type Result<T> = std::result::Result<T, AnnotationError>;

/// Main error type for the annotation library.
#[derive(Debug)]
pub enum AnnotationError {
    /// Keypoint name is not part of the pose schema.
    InvalidKeypointName(String),
    /// `Unlabeled` was passed where a labeled visibility is required.
    UnlabeledVisibility(String),
    /// A coordinate is NaN or infinite.
    NonFiniteCoordinate(String),
    /// No output directory has been configured.
    OutputNotConfigured,
    /// A saved frame image is missing from disk.
    MissingFrameFile(PathBuf),
    /// The annotations file could not be parsed or failed validation.
    CorruptAnnotationsFile(String),
    /// Writing a frame image failed.
    ImageWriteFailure(String),
    /// Writing the annotations file failed.
    JsonWriteFailure(String),
    /// The requested frame could not be read from the source.
    FrameUnavailable(String),
    /// No record exists for the given image id.
    RecordNotFound(u64),
    /// A record with the same frame identity or id already exists.
    DuplicateRecord(String),
    /// Video decoding error.
    VideoError(String),
    /// Feature not enabled.
    FeatureNotEnabled(String),
    /// Wrapped `std::io::Error`
    Io(std::io::Error),
}

impl fmt::Display for AnnotationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKeypointName(name) => write!(f, "Invalid keypoint name: {name}"),
            Self::UnlabeledVisibility(name) => {
                write!(f, "Cannot set '{name}' as unlabeled, clear it instead")
            }
            Self::NonFiniteCoordinate(msg) => write!(f, "Non-finite coordinate: {msg}"),
            Self::OutputNotConfigured => write!(f, "Output directory is not configured"),
            Self::MissingFrameFile(path) => {
                write!(f, "Frame file not found: {}", path.display())
            }
            Self::CorruptAnnotationsFile(msg) => write!(f, "Corrupt annotations file: {msg}"),
            Self::ImageWriteFailure(msg) => write!(f, "Image write failure: {msg}"),
            Self::JsonWriteFailure(msg) => write!(f, "JSON write failure: {msg}"),
            Self::FrameUnavailable(msg) => write!(f, "Frame unavailable: {msg}"),
            Self::RecordNotFound(id) => write!(f, "No record with image id {id}"),
            Self::DuplicateRecord(msg) => write!(f, "Duplicate record: {msg}"),
            Self::VideoError(msg) => write!(f, "Video error: {msg}"),
            Self::FeatureNotEnabled(msg) => write!(f, "Feature not enabled: {msg}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
        }
    }
}

impl std::error::Error for AnnotationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AnnotationError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<image::ImageError> for AnnotationError {
    fn from(err: image::ImageError) -> Self {
        Self::FrameUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AnnotationError::InvalidKeypointName("tail".to_string());
        assert_eq!(err.to_string(), "Invalid keypoint name: tail");

        let err = AnnotationError::OutputNotConfigured;
        assert_eq!(err.to_string(), "Output directory is not configured");

        let err = AnnotationError::NonFiniteCoordinate("nose x=NaN".to_string());
        assert_eq!(err.to_string(), "Non-finite coordinate: nose x=NaN");

        let err = AnnotationError::RecordNotFound(7);
        assert_eq!(err.to_string(), "No record with image id 7");
    }

    #[test]
    fn test_io_error_source() {
        use std::error::Error;

        let err = AnnotationError::from(std::io::Error::other("disk full"));
        assert!(err.source().is_some());
        assert!(AnnotationError::OutputNotConfigured.source().is_none());
    }
}
