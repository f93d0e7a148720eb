// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Interactive annotation session.
//!
//! [`AnnotationSession`] is the model a presentation layer drives: it owns the
//! dataset, the optional output directory and frame source, the selected frame
//! and its working [`KeypointSet`]. Frames are reached either live from a
//! source ([`AnnotationSession::seek_frame`]) or replayed from a saved record
//! ([`AnnotationSession::load_record`]); both resolve to the same
//! [`FrameIdentity`].

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::config::SessionConfig;
use crate::dataset::{CommitRequest, Dataset, LabeledFrame, SaveOutcome, UpdatePrompt};
use crate::error::{AnnotationError, Result};
use crate::io::DatasetStore;
use crate::keypoints::{BBox, KeypointSet, Visibility};
use crate::record::FrameIdentity;
use crate::schema::PoseSchema;
use crate::source::{Frame, FrameSource, open_source};
use crate::visualizer::{Bone, KeypointStyle, renderable_bones};

/// Where the pixels and labels of the selected frame came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOrigin {
    /// Live frame with no saved record.
    VideoOnly,
    /// Live frame with a saved record.
    VideoAndAnnotation,
    /// Saved record replayed from its JPEG.
    AnnotationOnly,
}

impl fmt::Display for FrameOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VideoOnly => write!(f, "Video only (not annotated)"),
            Self::VideoAndAnnotation => write!(f, "Annotation and Video"),
            Self::AnnotationOnly => write!(f, "Annotation only"),
        }
    }
}

/// The frame currently open for editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Identity used for save resolution.
    pub identity: FrameIdentity,
    /// Saved record for this identity, if any.
    pub image_id: Option<u64>,
    /// How the frame was reached.
    pub origin: FrameOrigin,
}

/// Labeled/unlabeled notification for one keypoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeypointChange {
    /// Keypoint name.
    pub name: String,
    /// Whether the keypoint currently has a label.
    pub labeled: bool,
}

/// Metadata shown next to the selected frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSummary {
    /// How the frame was reached.
    pub origin: FrameOrigin,
    /// Frame identity.
    pub identity: FrameIdentity,
    /// Saved record id, if any.
    pub image_id: Option<u64>,
    /// Padded bounding box of the working labels.
    pub bbox: Option<BBox>,
    /// Keypoints labeled visible.
    pub visible: usize,
    /// Keypoints labeled but occluded.
    pub occluded: usize,
    /// Keypoints without a label.
    pub unlabeled: usize,
}

impl fmt::Display for FrameSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bbox = self.bbox.unwrap_or(BBox::ZERO);
        writeln!(f, "Source: {}", self.origin)?;
        writeln!(f, "Video: {}", self.identity.video_file)?;
        writeln!(f, "Frame: {}", self.identity.frame_number)?;
        match self.image_id {
            Some(id) => writeln!(f, "Image ID: {id}")?,
            None => writeln!(f, "Image ID: N/A")?,
        }
        writeln!(
            f,
            "BBox: x={:.1}, y={:.1}, w={:.1}, h={:.1}",
            bbox.x, bbox.y, bbox.width, bbox.height
        )?;
        writeln!(f, "Visible Keypoints: {}", self.visible)?;
        writeln!(f, "Occluded Keypoints: {}", self.occluded)?;
        write!(f, "Unlabeled Keypoints: {}", self.unlabeled)
    }
}

type Listener = Box<dyn FnMut(&KeypointChange)>;

/// Editing session over one output directory and at most one frame source.
pub struct AnnotationSession {
    config: SessionConfig,
    schema: Arc<PoseSchema>,
    dataset: Dataset,
    store: Option<DatasetStore>,
    source: Option<Box<dyn FrameSource>>,
    selection: Option<Selection>,
    keypoints: KeypointSet,
    frame: Option<Frame>,
    listeners: Vec<Listener>,
}

impl fmt::Debug for AnnotationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotationSession")
            .field("output_dir", &self.output_dir())
            .field("source", &self.source.as_ref().map(|s| s.name().to_string()))
            .field("selection", &self.selection)
            .field("records", &self.dataset.len())
            .finish_non_exhaustive()
    }
}

impl AnnotationSession {
    /// Create a session for the COCO-17 schema.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self::with_schema(config, PoseSchema::coco17())
    }

    /// Create a session for a custom schema.
    #[must_use]
    pub fn with_schema(config: SessionConfig, schema: Arc<PoseSchema>) -> Self {
        let dataset = Dataset::new(Arc::clone(&schema), &config.description);
        let keypoints = KeypointSet::new(Arc::clone(&schema));
        Self {
            config,
            schema,
            dataset,
            store: None,
            source: None,
            selection: None,
            keypoints,
            frame: None,
            listeners: Vec::new(),
        }
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Pose schema.
    #[must_use]
    pub const fn schema(&self) -> &Arc<PoseSchema> {
        &self.schema
    }

    /// Current dataset.
    #[must_use]
    pub const fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Output directory, if configured.
    #[must_use]
    pub fn output_dir(&self) -> Option<&Path> {
        self.store.as_ref().map(DatasetStore::output_dir)
    }

    /// Set the output directory and load its dataset.
    ///
    /// A missing annotations file starts an empty dataset. A selected live
    /// frame is re-resolved against the new dataset; its working labels are
    /// kept. A replayed record from a previous directory is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::CorruptAnnotationsFile`] if the existing file
    /// is unreadable. The directory stays configured and the session falls
    /// back to an empty dataset, so the next save overwrites the bad file.
    pub fn open_output_dir<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        let store = DatasetStore::open(dir, &self.config)?;
        let loaded = store.load_dataset(Arc::clone(&self.schema));
        let result = match loaded {
            Ok(dataset) => {
                self.dataset = dataset;
                Ok(())
            }
            Err(e @ AnnotationError::CorruptAnnotationsFile(_)) => {
                tracing::warn!(
                    path = %store.annotations_path().display(),
                    "{e}, starting with an empty dataset"
                );
                self.dataset = store.empty_dataset(Arc::clone(&self.schema));
                Err(e)
            }
            Err(e) => return Err(e),
        };
        self.store = Some(store);
        self.refresh_selection();
        result
    }

    fn refresh_selection(&mut self) {
        let Some(selection) = self.selection.as_mut() else {
            return;
        };
        if selection.origin == FrameOrigin::AnnotationOnly {
            self.selection = None;
            self.frame = None;
            self.keypoints = KeypointSet::new(Arc::clone(&self.schema));
            self.notify_all();
            return;
        }
        selection.image_id = self.dataset.find(&selection.identity).map(|(img, _)| img.id);
        selection.origin = if selection.image_id.is_some() {
            FrameOrigin::VideoAndAnnotation
        } else {
            FrameOrigin::VideoOnly
        };
    }

    /// Active frame source.
    #[must_use]
    pub fn source(&self) -> Option<&dyn FrameSource> {
        self.source.as_deref()
    }

    /// Attach a frame source and show its first frame.
    ///
    /// # Errors
    ///
    /// Returns an error if frame 0 cannot be read; the source stays attached.
    pub fn load_source(&mut self, source: Box<dyn FrameSource>) -> Result<()> {
        tracing::info!(
            source = source.name(),
            frames = source.frame_count(),
            fps = source.fps(),
            "loaded source"
        );
        self.source = Some(source);
        self.seek_frame(0)
    }

    /// Open a directory of images or a video file and show its first frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be opened or frame 0 cannot be read.
    pub fn open_source_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let source = open_source(path, &self.config)?;
        self.load_source(source)
    }

    /// Switch to a frame of the active source.
    ///
    /// A saved record with the same identity pre-populates the labels,
    /// otherwise they start empty. The active keypoint carries over.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::FrameUnavailable`] if no source is loaded or
    /// the frame cannot be read. The previous frame stays selected.
    pub fn seek_frame(&mut self, index: usize) -> Result<()> {
        let source = self
            .source
            .as_mut()
            .ok_or_else(|| AnnotationError::FrameUnavailable("No video loaded".to_string()))?;
        let frame = source.capture(index)?;
        let identity = FrameIdentity::new(source.name(), index);

        let (keypoints, image_id) = match self.dataset.find(&identity) {
            Some((img, ann)) => (ann.keypoint_set(Arc::clone(&self.schema))?, Some(img.id)),
            None => (KeypointSet::new(Arc::clone(&self.schema)), None),
        };
        let origin = if image_id.is_some() {
            FrameOrigin::VideoAndAnnotation
        } else {
            FrameOrigin::VideoOnly
        };
        tracing::debug!(%identity, ?image_id, %origin, "resolved frame");

        self.show(
            Selection {
                identity,
                image_id,
                origin,
            },
            frame,
            keypoints,
        );
        Ok(())
    }

    /// Open a saved record for editing.
    ///
    /// If the active source is the record's video, the frame is read live;
    /// otherwise the saved JPEG is loaded from the frames directory.
    ///
    /// # Errors
    ///
    /// * [`AnnotationError::RecordNotFound`] for unknown ids.
    /// * [`AnnotationError::MissingFrameFile`] if the saved JPEG is absent.
    ///
    /// The previous frame stays selected on error.
    pub fn load_record(&mut self, image_id: u64) -> Result<()> {
        let (img, ann) = self
            .dataset
            .get(image_id)
            .ok_or(AnnotationError::RecordNotFound(image_id))?;
        let identity = img.identity();
        let keypoints = ann.keypoint_set(Arc::clone(&self.schema))?;

        let (frame, origin) = match self.source.as_mut() {
            Some(source) if source.name() == identity.video_file => (
                source.capture(identity.frame_number)?,
                FrameOrigin::VideoAndAnnotation,
            ),
            _ => {
                let store = self.store.as_ref().ok_or(AnnotationError::OutputNotConfigured)?;
                let image = store.read_frame(&img.file_name)?;
                (Frame::new(image, img.fps), FrameOrigin::AnnotationOnly)
            }
        };
        tracing::debug!(%identity, image_id, %origin, "resolved record");

        self.show(
            Selection {
                identity,
                image_id: Some(image_id),
                origin,
            },
            frame,
            keypoints,
        );
        Ok(())
    }

    fn show(&mut self, selection: Selection, frame: Frame, mut keypoints: KeypointSet) {
        keypoints.set_active_index(self.keypoints.active_index());
        self.selection = Some(selection);
        self.frame = Some(frame);
        self.keypoints = keypoints;
        self.notify_all();
    }

    /// Working labels of the selected frame.
    #[must_use]
    pub const fn current_keypoints(&self) -> &KeypointSet {
        &self.keypoints
    }

    /// The selected frame, if any.
    #[must_use]
    pub const fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Pixel data of the selected frame.
    #[must_use]
    pub const fn current_frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    /// Choose the keypoint the next click will set.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::InvalidKeypointName`] for names outside the schema.
    pub fn set_active_keypoint(&mut self, name: &str) -> Result<()> {
        self.keypoints.set_active(name)
    }

    /// Name of the keypoint the next click will set.
    #[must_use]
    pub fn active_keypoint(&self) -> Option<&str> {
        self.keypoints.active()
    }

    /// Set the active keypoint at a pointer position.
    ///
    /// Returns `false` if no keypoint is active.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::UnlabeledVisibility`] for `Unlabeled` and
    /// [`AnnotationError::NonFiniteCoordinate`] for NaN or infinite positions.
    pub fn click(&mut self, x: f64, y: f64, visibility: Visibility) -> Result<bool> {
        let Some(name) = self.keypoints.active().map(str::to_string) else {
            return Ok(false);
        };
        self.set_point(&name, x, y, visibility)?;
        Ok(true)
    }

    /// Label a keypoint.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::InvalidKeypointName`],
    /// [`AnnotationError::UnlabeledVisibility`] or
    /// [`AnnotationError::NonFiniteCoordinate`].
    pub fn set_point(&mut self, name: &str, x: f64, y: f64, visibility: Visibility) -> Result<()> {
        self.keypoints.set(name, x, y, visibility)?;
        self.notify(name);
        Ok(())
    }

    /// Remove one label. Clearing an unlabeled keypoint is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::InvalidKeypointName`] for names outside the schema.
    pub fn clear_point(&mut self, name: &str) -> Result<()> {
        self.keypoints.clear(name)?;
        self.notify(name);
        Ok(())
    }

    /// Remove every label of the selected frame.
    pub fn clear_all(&mut self) {
        self.keypoints.clear_all();
        self.notify_all();
    }

    /// Padded bounding box of the working labels.
    #[must_use]
    pub const fn derive_bbox(&self) -> Option<BBox> {
        self.keypoints.derive_bbox()
    }

    /// Bones whose endpoints are both labeled.
    #[must_use]
    pub fn renderable_bones(&self) -> Vec<Bone> {
        renderable_bones(&self.keypoints.to_flat_vector(), &self.schema)
    }

    /// Display style of a keypoint in its current state.
    #[must_use]
    pub fn keypoint_style(&self, name: &str) -> Option<KeypointStyle> {
        let index = self.schema.keypoint_index(name)?;
        let visibility = self
            .keypoints
            .get(name)
            .map_or(Visibility::Unlabeled, |kp| kp.visibility);
        let active = self.keypoints.active() == Some(name);
        Some(KeypointStyle::resolve(
            self.schema.keypoint_color(index),
            visibility,
            active,
        ))
    }

    /// Register a per-keypoint change listener.
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&KeypointChange) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&mut self, name: &str) {
        let change = KeypointChange {
            name: name.to_string(),
            labeled: self.keypoints.is_labeled(name),
        };
        for listener in &mut self.listeners {
            listener(&change);
        }
    }

    fn notify_all(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        let schema = Arc::clone(&self.schema);
        for name in schema.keypoint_names() {
            self.notify(name);
        }
    }

    /// Save the selected frame.
    ///
    /// `confirm` is asked before an existing record is overwritten; returning
    /// `false` leaves everything untouched.
    ///
    /// # Errors
    ///
    /// * [`AnnotationError::OutputNotConfigured`] before any other check.
    /// * [`AnnotationError::FrameUnavailable`] if no frame is selected.
    /// * [`AnnotationError::ImageWriteFailure`] / [`AnnotationError::JsonWriteFailure`];
    ///   the dataset is unchanged after a failure.
    pub fn save_current<F>(&mut self, confirm: F) -> Result<SaveOutcome>
    where
        F: FnOnce(&UpdatePrompt) -> bool,
    {
        if self.store.is_none() {
            return Err(AnnotationError::OutputNotConfigured);
        }
        let selection = self
            .selection
            .as_mut()
            .ok_or_else(|| AnnotationError::FrameUnavailable("No frame loaded".to_string()))?;

        let outcome = self.dataset.commit(
            self.store.as_ref(),
            CommitRequest {
                identity: &selection.identity,
                keypoints: &self.keypoints,
                frame: self.frame.as_ref(),
            },
            confirm,
        )?;

        if let Some(image_id) = outcome.image_id() {
            selection.image_id = Some(image_id);
            if selection.origin == FrameOrigin::VideoOnly {
                selection.origin = FrameOrigin::VideoAndAnnotation;
            }
        }
        Ok(outcome)
    }

    /// Metadata of the selected frame.
    #[must_use]
    pub fn frame_summary(&self) -> Option<FrameSummary> {
        let selection = self.selection.as_ref()?;
        let (visible, occluded) = self.keypoints.visibility_counts();
        Some(FrameSummary {
            origin: selection.origin,
            identity: selection.identity.clone(),
            image_id: selection.image_id,
            bbox: self.keypoints.derive_bbox(),
            visible,
            occluded,
            unlabeled: self.schema.len() - visible - occluded,
        })
    }

    /// Saved frames in creation order.
    #[must_use]
    pub fn labeled_frames(&self) -> Vec<LabeledFrame> {
        self.dataset.labeled_frames()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_display() {
        assert_eq!(FrameOrigin::VideoOnly.to_string(), "Video only (not annotated)");
        assert_eq!(
            FrameOrigin::VideoAndAnnotation.to_string(),
            "Annotation and Video"
        );
        assert_eq!(FrameOrigin::AnnotationOnly.to_string(), "Annotation only");
    }

    #[test]
    fn test_save_without_output_dir() {
        let mut session = AnnotationSession::new(SessionConfig::default());
        let err = session.save_current(|_| true).unwrap_err();
        assert!(matches!(err, AnnotationError::OutputNotConfigured));
        assert!(session.dataset().is_empty());
    }

    #[test]
    fn test_seek_without_source() {
        let mut session = AnnotationSession::new(SessionConfig::default());
        assert!(matches!(
            session.seek_frame(0),
            Err(AnnotationError::FrameUnavailable(_))
        ));
        assert!(session.selection().is_none());
    }

    #[test]
    fn test_click_requires_active_keypoint() {
        let mut session = AnnotationSession::new(SessionConfig::default());
        assert!(!session.click(10.0, 10.0, Visibility::Visible).unwrap());

        session.set_active_keypoint("left_wrist").unwrap();
        assert!(session.click(10.0, 20.0, Visibility::LabeledNotVisible).unwrap());
        let kp = session.current_keypoints().get("left_wrist").unwrap();
        assert_eq!(kp.visibility, Visibility::LabeledNotVisible);
        assert!(session.set_active_keypoint("tail").is_err());
    }

    #[test]
    fn test_summary_display() {
        let summary = FrameSummary {
            origin: FrameOrigin::VideoAndAnnotation,
            identity: FrameIdentity::new("a.mp4", 5),
            image_id: Some(1),
            bbox: Some(BBox {
                x: 70.0,
                y: 70.0,
                width: 60.0,
                height: 60.0,
            }),
            visible: 1,
            occluded: 0,
            unlabeled: 16,
        };
        let text = summary.to_string();
        assert!(text.starts_with("Source: Annotation and Video\n"));
        assert!(text.contains("Frame: 5\n"));
        assert!(text.contains("Image ID: 1\n"));
        assert!(text.contains("BBox: x=70.0, y=70.0, w=60.0, h=60.0\n"));
        assert!(text.ends_with("Unlabeled Keypoints: 16"));
    }
}
