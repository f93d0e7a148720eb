// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! On-disk layout of an output directory.
//!
//! ```text
//! <output>/
//! ├── annotations.json
//! └── frames/
//!     ├── 000000000001.jpg
//!     └── ...
//! ```
//!
//! Both the annotations file and frame images are written through a temporary
//! file in the target directory and renamed into place, so readers never see a
//! half-written file.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use tempfile::NamedTempFile;

use crate::config::SessionConfig;
use crate::dataset::Dataset;
use crate::error::{AnnotationError, Result};
use crate::schema::PoseSchema;

/// Handle to an output directory holding a dataset and its frames.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    output_dir: PathBuf,
    frames_dir: PathBuf,
    annotations_path: PathBuf,
    jpeg_quality: u8,
    description: String,
}

impl DatasetStore {
    /// Open an output directory, creating it and its frames subdirectory.
    ///
    /// # Arguments
    ///
    /// * `output_dir` - Root of the dataset.
    /// * `config` - Layout and encoding settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn open<P: AsRef<Path>>(output_dir: P, config: &SessionConfig) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        let frames_dir = output_dir.join(&config.frames_dir);
        std::fs::create_dir_all(&frames_dir)?;

        Ok(Self {
            annotations_path: output_dir.join(&config.annotations_file),
            output_dir,
            frames_dir,
            jpeg_quality: config.jpeg_quality,
            description: config.description.clone(),
        })
    }

    /// Root of the dataset.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Directory holding saved frames.
    #[must_use]
    pub fn frames_dir(&self) -> &Path {
        &self.frames_dir
    }

    /// Path of the annotations file.
    #[must_use]
    pub fn annotations_path(&self) -> &Path {
        &self.annotations_path
    }

    /// Path of a saved frame.
    #[must_use]
    pub fn frame_path(&self, file_name: &str) -> PathBuf {
        self.frames_dir.join(file_name)
    }

    /// Load the dataset, or start an empty one if no annotations file exists.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::CorruptAnnotationsFile`] if the file exists but
    /// cannot be parsed or fails validation.
    pub fn load_dataset(&self, schema: Arc<PoseSchema>) -> Result<Dataset> {
        if !self.annotations_path.exists() {
            tracing::debug!(path = %self.annotations_path.display(), "no annotations file, starting empty");
            return Ok(Dataset::new(schema, &self.description));
        }

        let dataset = Dataset::load(&self.annotations_path, schema).map_err(|e| match e {
            AnnotationError::Io(err) => AnnotationError::CorruptAnnotationsFile(err.to_string()),
            other => other,
        })?;
        tracing::info!(
            path = %self.annotations_path.display(),
            records = dataset.len(),
            "loaded annotations"
        );
        Ok(dataset)
    }

    /// Start an empty dataset with the configured description.
    #[must_use]
    pub fn empty_dataset(&self, schema: Arc<PoseSchema>) -> Dataset {
        Dataset::new(schema, &self.description)
    }

    /// Encode a frame as JPEG and write it into the frames directory.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::ImageWriteFailure`] if encoding or writing fails.
    pub fn write_frame(&self, file_name: &str, image: &DynamicImage) -> Result<PathBuf> {
        let path = self.frame_path(file_name);
        let write_failure =
            |e: &dyn std::fmt::Display| AnnotationError::ImageWriteFailure(format!("{}: {e}", path.display()));

        std::fs::create_dir_all(&self.frames_dir).map_err(|e| write_failure(&e))?;

        let mut bytes = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut bytes, self.jpeg_quality);
        DynamicImage::ImageRgb8(image.to_rgb8())
            .write_with_encoder(encoder)
            .map_err(|e| write_failure(&e))?;

        write_atomic(&path, &bytes).map_err(|e| write_failure(&e))?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote frame");
        Ok(path)
    }

    /// Read a saved frame back from the frames directory.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::MissingFrameFile`] if the file is absent.
    pub fn read_frame(&self, file_name: &str) -> Result<DynamicImage> {
        load_frame_file(self.frame_path(file_name))
    }

    /// Write the complete dataset to the annotations file.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::JsonWriteFailure`] if serialization or the
    /// write fails. The previous file is left intact in that case.
    pub fn persist(&self, dataset: &Dataset) -> Result<()> {
        let json = dataset.to_json_string()?;
        write_atomic(&self.annotations_path, json.as_bytes()).map_err(|e| {
            AnnotationError::JsonWriteFailure(format!("{}: {e}", self.annotations_path.display()))
        })?;
        tracing::info!(
            path = %self.annotations_path.display(),
            records = dataset.len(),
            "saved annotations"
        );
        Ok(())
    }
}

/// Load a saved frame image.
///
/// # Errors
///
/// Returns [`AnnotationError::MissingFrameFile`] if the file does not exist and
/// [`AnnotationError::FrameUnavailable`] if it cannot be decoded.
pub fn load_frame_file<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(AnnotationError::MissingFrameFile(path.to_path_buf()));
    }
    image::open(path).map_err(|e| {
        AnnotationError::FrameUnavailable(format!("Failed to load {}: {e}", path.display()))
    })
}

/// Replace `path` with `bytes` via a temporary file in the same directory.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut tmp = NamedTempFile::new_in(dir.unwrap_or_else(|| Path::new(".")))?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn store(dir: &Path) -> DatasetStore {
        DatasetStore::open(dir, &SessionConfig::default()).unwrap()
    }

    #[test]
    fn test_open_creates_frames_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(&tmp.path().join("out"));
        assert!(store.frames_dir().is_dir());
        assert_eq!(
            store.annotations_path(),
            tmp.path().join("out").join("annotations.json")
        );
    }

    #[test]
    fn test_missing_annotations_file_gives_empty_dataset() {
        let tmp = tempfile::tempdir().unwrap();
        let dataset = store(tmp.path()).load_dataset(PoseSchema::coco17()).unwrap();
        assert!(dataset.is_empty());
        assert_eq!(dataset.info().description, "Pose Keypoint Dataset");
    }

    #[test]
    fn test_frame_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 6, Rgb([200, 10, 10])));

        let path = store.write_frame("000000000001.jpg", &image).unwrap();
        assert!(path.is_file());

        let loaded = store.read_frame("000000000001.jpg").unwrap();
        assert_eq!((loaded.width(), loaded.height()), (8, 6));
    }

    #[test]
    fn test_missing_frame_file() {
        let tmp = tempfile::tempdir().unwrap();
        let err = store(tmp.path()).read_frame("000000000009.jpg").unwrap_err();
        assert!(matches!(err, AnnotationError::MissingFrameFile(_)));
    }

    #[test]
    fn test_persist_and_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        let dataset = store.empty_dataset(PoseSchema::coco17());
        store.persist(&dataset).unwrap();

        let text = std::fs::read_to_string(store.annotations_path()).unwrap();
        assert!(text.contains("\n  \"info\""));
        let reloaded = store.load_dataset(PoseSchema::coco17()).unwrap();
        assert_eq!(reloaded.info(), dataset.info());
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        std::fs::write(store.annotations_path(), "{\"info\": 3}").unwrap();
        assert!(matches!(
            store.load_dataset(PoseSchema::coco17()),
            Err(AnnotationError::CorruptAnnotationsFile(_))
        ));
    }
}
