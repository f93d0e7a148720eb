// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Frame sources for annotation.
//!
//! A [`FrameSource`] gives random access to the frames of one video-like
//! sequence. Two adapters are provided: [`ImageDirSource`] treats a directory
//! of stills as a frame sequence and `VideoSource` (feature `video`) decodes a
//! video file.

use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::config::SessionConfig;
use crate::error::{AnnotationError, Result};

/// Pixel data and metadata of one frame, as captured when the frame was shown.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Decoded pixels.
    pub image: DynamicImage,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Frame rate of the originating source.
    pub fps: f64,
}

impl Frame {
    /// Wrap an image with the frame rate of its source.
    #[must_use]
    pub fn new(image: DynamicImage, fps: f64) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            image,
            fps,
        }
    }
}

/// Random access to the frames of a video-like sequence.
pub trait FrameSource {
    /// Identity string stored as `video_file` (file name, not full path).
    fn name(&self) -> &str;

    /// Number of frames.
    fn frame_count(&self) -> usize;

    /// Frames per second.
    fn fps(&self) -> f64;

    /// Frame `(width, height)`.
    fn dimensions(&self) -> (u32, u32);

    /// Decode the frame at a 0-based index.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::FrameUnavailable`] if the index is out of
    /// range or the frame cannot be decoded.
    fn read_frame(&mut self, index: usize) -> Result<DynamicImage>;

    /// Decode a frame together with the source's metadata.
    ///
    /// # Errors
    ///
    /// Same as [`FrameSource::read_frame`].
    fn capture(&mut self, index: usize) -> Result<Frame> {
        let image = self.read_frame(index)?;
        Ok(Frame::new(image, self.fps()))
    }
}

/// Video file extensions recognized by [`open_source`].
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mov", "mkv", "wmv", "flv", "webm", "m4v", "mpeg", "mpg",
];

/// Check if a path is a video file based on extension.
#[must_use]
pub fn is_video_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| {
        let ext = ext.to_string_lossy().to_lowercase();
        VIDEO_EXTENSIONS.contains(&ext.as_str())
    })
}

/// Check if a path is an image file based on extension.
#[must_use]
pub fn is_image_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| {
        let ext = ext.to_string_lossy().to_lowercase();
        matches!(
            ext.as_str(),
            "jpg" | "jpeg" | "png" | "bmp" | "gif" | "webp" | "tiff" | "tif"
        )
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.to_string_lossy(), |n| n.to_string_lossy())
        .to_string()
}

/// Open a directory of images or a video file.
///
/// # Errors
///
/// Returns an error if the path does not exist, is neither a directory nor a
/// video, or video support is not compiled in.
pub fn open_source<P: AsRef<Path>>(path: P, config: &SessionConfig) -> Result<Box<dyn FrameSource>> {
    let path = path.as_ref();
    if path.is_dir() {
        return Ok(Box::new(ImageDirSource::open(path, config.default_fps)?));
    }
    if !path.exists() {
        return Err(AnnotationError::FrameUnavailable(format!(
            "Source not found: {}",
            path.display()
        )));
    }
    if is_video_file(path) {
        return open_video(path);
    }
    Err(AnnotationError::FrameUnavailable(format!(
        "Unsupported source: {}",
        path.display()
    )))
}

#[cfg(feature = "video")]
fn open_video(path: &Path) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(VideoSource::open(path)?))
}

#[cfg(not(feature = "video"))]
fn open_video(path: &Path) -> Result<Box<dyn FrameSource>> {
    Err(AnnotationError::FeatureNotEnabled(format!(
        "Video support requires 'video' feature ({})",
        path.display()
    )))
}

/// A directory of still images treated as a frame sequence, sorted by name.
#[derive(Debug, Clone)]
pub struct ImageDirSource {
    name: String,
    paths: Vec<PathBuf>,
    fps: f64,
    dimensions: (u32, u32),
}

impl ImageDirSource {
    /// Collect the images of a directory.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::FrameUnavailable`] if `dir` is not a
    /// directory or contains no images.
    pub fn open<P: AsRef<Path>>(dir: P, fps: f64) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(AnnotationError::FrameUnavailable(format!(
                "Not a directory: {}",
                dir.display()
            )));
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| is_image_file(path))
            .collect();
        paths.sort();

        let first = paths.first().ok_or_else(|| {
            AnnotationError::FrameUnavailable(format!("No images in {}", dir.display()))
        })?;
        let dimensions = image::image_dimensions(first)?;

        tracing::debug!(dir = %dir.display(), frames = paths.len(), "opened image directory");
        Ok(Self {
            name: display_name(dir),
            paths,
            fps,
            dimensions,
        })
    }

    /// Image paths in frame order.
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl FrameSource for ImageDirSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn frame_count(&self) -> usize {
        self.paths.len()
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    fn read_frame(&mut self, index: usize) -> Result<DynamicImage> {
        let path = self.paths.get(index).ok_or_else(|| {
            AnnotationError::FrameUnavailable(format!(
                "Frame {index} out of range (0..{})",
                self.paths.len()
            ))
        })?;
        image::open(path).map_err(|e| {
            AnnotationError::FrameUnavailable(format!("Failed to load {}: {e}", path.display()))
        })
    }
}

#[cfg(feature = "video")]
pub use video::VideoSource;

#[cfg(feature = "video")]
mod video {
    use std::path::{Path, PathBuf};
    use std::sync::Once;

    use image::DynamicImage;
    use video_rs::decode::Decoder;

    use super::{FrameSource, display_name};
    use crate::error::{AnnotationError, Result};

    static INIT: Once = Once::new();

    /// Initialize `video-rs` once per process.
    fn init_video() {
        INIT.call_once(|| {
            if let Err(e) = video_rs::init() {
                tracing::error!("Failed to initialize video-rs: {e}");
            }
        });
    }

    /// A video file decoded with `video-rs`.
    pub struct VideoSource {
        path: PathBuf,
        name: String,
        decoder: Decoder,
        frame_count: usize,
        fps: f64,
        dimensions: (u32, u32),
    }

    impl VideoSource {
        /// Open a video file.
        ///
        /// # Errors
        ///
        /// Returns [`AnnotationError::VideoError`] if the decoder cannot be created.
        pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
            init_video();
            let path = path.as_ref().to_path_buf();
            let decoder = Decoder::new(path.as_path()).map_err(|e| {
                AnnotationError::VideoError(format!("Failed to create decoder: {e}"))
            })?;

            let fps = f64::from(decoder.frame_rate());
            // Calculate total frames from duration and frame rate
            let frame_count = decoder.duration().map_or(0, |duration| {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                {
                    (duration.as_secs_f64() * fps).round() as usize
                }
            });
            let (width, height) = decoder.size();

            tracing::debug!(path = %path.display(), frame_count, fps, "opened video");
            Ok(Self {
                name: display_name(&path),
                path,
                decoder,
                frame_count,
                fps,
                dimensions: (width, height),
            })
        }

        /// Path of the video file.
        #[must_use]
        pub fn path(&self) -> &Path {
            &self.path
        }
    }

    impl FrameSource for VideoSource {
        fn name(&self) -> &str {
            &self.name
        }

        fn frame_count(&self) -> usize {
            self.frame_count
        }

        fn fps(&self) -> f64 {
            self.fps
        }

        fn dimensions(&self) -> (u32, u32) {
            self.dimensions
        }

        fn read_frame(&mut self, index: usize) -> Result<DynamicImage> {
            if index >= self.frame_count {
                return Err(AnnotationError::FrameUnavailable(format!(
                    "Frame {index} out of range (0..{})",
                    self.frame_count
                )));
            }
            let target = i64::try_from(index)
                .map_err(|_| AnnotationError::FrameUnavailable(format!("Frame {index} out of range")))?;
            self.decoder
                .seek_to_frame(target)
                .map_err(|e| AnnotationError::VideoError(format!("Failed to seek to frame {index}: {e}")))?;
            let (_ts, frame) = self.decoder.decode().map_err(|e| {
                AnnotationError::FrameUnavailable(format!("Failed to decode frame {index}: {e}"))
            })?;
            video_frame_to_image(&frame)
        }
    }

    /// Convert a `video_rs` frame (HWC RGB) to `DynamicImage`.
    fn video_frame_to_image(arr: &video_rs::Frame) -> Result<DynamicImage> {
        let shape = arr.shape();
        let height = u32::try_from(shape[0])
            .map_err(|_| AnnotationError::VideoError("Frame height exceeds u32::MAX".to_string()))?;
        let width = u32::try_from(shape[1])
            .map_err(|_| AnnotationError::VideoError("Frame width exceeds u32::MAX".to_string()))?;

        let rgb_data: Vec<u8> = arr.iter().copied().collect();
        let img_buffer = image::RgbImage::from_raw(width, height, rgb_data).ok_or_else(|| {
            AnnotationError::VideoError("Failed to create image from video frame".to_string())
        })?;

        Ok(DynamicImage::ImageRgb8(img_buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_stills(dir: &Path, names: &[&str]) {
        for name in names {
            RgbImage::from_pixel(4, 3, Rgb([0, 0, 0]))
                .save(dir.join(name))
                .unwrap();
        }
    }

    #[test]
    fn test_file_type_checks() {
        assert!(is_video_file(Path::new("clip.MP4")));
        assert!(!is_video_file(Path::new("frame.jpg")));
        assert!(is_image_file(Path::new("frame.PNG")));
        assert!(!is_image_file(Path::new("notes.txt")));
    }

    #[test]
    fn test_image_dir_source() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("squat");
        std::fs::create_dir(&dir).unwrap();
        write_stills(&dir, &["b.png", "a.png", "c.png"]);
        std::fs::write(dir.join("notes.txt"), "x").unwrap();

        let mut source = ImageDirSource::open(&dir, 25.0).unwrap();
        assert_eq!(source.name(), "squat");
        assert_eq!(source.frame_count(), 3);
        assert_eq!(source.dimensions(), (4, 3));
        assert!(source.paths()[0].ends_with("a.png"));

        let frame = source.capture(2).unwrap();
        assert_eq!((frame.width, frame.height), (4, 3));
        assert!((frame.fps - 25.0).abs() < f64::EPSILON);

        assert!(matches!(
            source.read_frame(3),
            Err(AnnotationError::FrameUnavailable(_))
        ));
    }

    #[test]
    fn test_empty_dir_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(ImageDirSource::open(tmp.path(), 30.0).is_err());
    }

    #[test]
    fn test_open_source_dispatch() {
        let tmp = tempfile::tempdir().unwrap();
        write_stills(tmp.path(), &["0001.png"]);
        let source = open_source(tmp.path(), &SessionConfig::default()).unwrap();
        assert_eq!(source.frame_count(), 1);
        assert!((source.fps() - 30.0).abs() < f64::EPSILON);

        let missing = tmp.path().join("missing.mp4");
        assert!(open_source(&missing, &SessionConfig::default()).is_err());

        let notes = tmp.path().join("notes.txt");
        std::fs::write(&notes, "x").unwrap();
        assert!(open_source(&notes, &SessionConfig::default()).is_err());
    }

    #[cfg(not(feature = "video"))]
    #[test]
    fn test_video_requires_feature() {
        let tmp = tempfile::tempdir().unwrap();
        let clip = tmp.path().join("clip.mp4");
        std::fs::write(&clip, b"not a video").unwrap();
        assert!(matches!(
            open_source(&clip, &SessionConfig::default()),
            Err(AnnotationError::FeatureNotEnabled(_))
        ));
    }
}
