// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! The persisted annotation dataset and its save/merge protocol.
//!
//! A [`Dataset`] keeps image and annotation records in creation order plus
//! two indices: frame identity to record position and image id to record
//! position. Every mutation goes through [`Dataset::insert`],
//! [`Dataset::update`] or [`Dataset::remove`], which keep the indices in step,
//! so no two images can ever share a `(video_file, frame_number)` identity.
//!
//! [`Dataset::commit`] implements the save protocol: resolve the frame
//! identity, ask for confirmation before overwriting an existing record,
//! write the frame image for new records, then persist the whole dataset.
//! The in-memory dataset only changes once the annotations file has been
//! written.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::error::{AnnotationError, Result};
use crate::io::DatasetStore;
use crate::keypoints::KeypointSet;
use crate::record::{AnnotationRecord, FrameIdentity, ImageRecord, frame_file_name, timestamp};
use crate::schema::{Category, PoseSchema};
use crate::source::Frame;

/// The `info` block of the dataset file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetInfo {
    /// Dataset description.
    pub description: String,
    /// Project URL.
    pub url: String,
    /// Dataset version.
    pub version: String,
    /// Creation year.
    pub year: i32,
    /// Contributor name.
    pub contributor: String,
    /// Creation time.
    pub date_created: String,
}

impl DatasetInfo {
    /// Info block for a dataset created now.
    #[must_use]
    pub fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            url: String::new(),
            version: "1.0".to_string(),
            year: chrono::Local::now().year(),
            contributor: String::new(),
            date_created: timestamp(),
        }
    }
}

/// A `licenses` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// License URL.
    pub url: String,
    /// License id.
    pub id: u32,
    /// License name.
    pub name: String,
}

impl Default for License {
    fn default() -> Self {
        Self {
            url: String::new(),
            id: 1,
            name: String::new(),
        }
    }
}

/// On-disk layout of `annotations.json`.
#[derive(Deserialize)]
struct DatasetFile {
    info: DatasetInfo,
    #[serde(default)]
    licenses: Vec<License>,
    images: Vec<ImageRecord>,
    annotations: Vec<AnnotationRecord>,
    #[serde(default)]
    categories: Vec<Category>,
}

#[derive(Serialize)]
struct DatasetFileRef<'a> {
    info: &'a DatasetInfo,
    licenses: &'a [License],
    images: &'a [ImageRecord],
    annotations: &'a [AnnotationRecord],
    categories: &'a [Category],
}

/// Confirmation request raised before an existing record is overwritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePrompt {
    /// Identity of the frame being saved.
    pub identity: FrameIdentity,
    /// Id of the record that would be overwritten.
    pub image_id: u64,
}

impl fmt::Display for UpdatePrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame {} from video \"{}\" already exists. Do you want to update it?",
            self.identity.frame_number, self.identity.video_file
        )
    }
}

/// Result of a save request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new record pair was appended.
    Created {
        /// Id of the new image.
        image_id: u64,
    },
    /// An existing record was overwritten in place.
    Updated {
        /// Id of the updated image.
        image_id: u64,
    },
    /// The update was not confirmed; nothing changed.
    Declined,
}

impl SaveOutcome {
    /// Affected image id, if anything was saved.
    #[must_use]
    pub const fn image_id(&self) -> Option<u64> {
        match self {
            Self::Created { image_id } | Self::Updated { image_id } => Some(*image_id),
            Self::Declined => None,
        }
    }
}

/// What is being saved: the active frame's identity, labels and pixels.
#[derive(Debug, Clone, Copy)]
pub struct CommitRequest<'a> {
    /// Identity of the active frame.
    pub identity: &'a FrameIdentity,
    /// Labels to store.
    pub keypoints: &'a KeypointSet,
    /// Pixel data, required only when a new record is created.
    pub frame: Option<&'a Frame>,
}

/// One row of the labeled-frames listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledFrame {
    /// Image id.
    pub image_id: u64,
    /// Frame identity.
    pub identity: FrameIdentity,
}

impl fmt::Display for LabeledFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame {} (ID: {}) [{}]",
            self.identity.frame_number, self.image_id, self.identity.video_file
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    image: usize,
    annotation: usize,
}

/// Collection of image/annotation record pairs plus COCO metadata.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Arc<PoseSchema>,
    info: DatasetInfo,
    licenses: Vec<License>,
    images: Vec<ImageRecord>,
    annotations: Vec<AnnotationRecord>,
    categories: Vec<Category>,
    by_identity: HashMap<FrameIdentity, u64>,
    by_id: HashMap<u64, Slot>,
    annotation_ids: HashSet<u64>,
    next_id: u64,
}

impl Dataset {
    /// Create an empty dataset for a schema.
    #[must_use]
    pub fn new(schema: Arc<PoseSchema>, description: &str) -> Self {
        let categories = vec![schema.category()];
        Self {
            schema,
            info: DatasetInfo::new(description),
            licenses: vec![License::default()],
            images: Vec::new(),
            annotations: Vec::new(),
            categories,
            by_identity: HashMap::new(),
            by_id: HashMap::new(),
            annotation_ids: HashSet::new(),
            next_id: 1,
        }
    }

    /// Parse and validate a dataset from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::CorruptAnnotationsFile`] if the JSON does not
    /// match the schema, an image has no annotation (or more than one), an
    /// annotation references a missing image, ids or frame identities repeat,
    /// or a keypoint vector does not have `3 * K` values.
    pub fn from_json_str(json: &str, schema: Arc<PoseSchema>) -> Result<Self> {
        let file: DatasetFile = serde_json::from_str(json)
            .map_err(|e| AnnotationError::CorruptAnnotationsFile(e.to_string()))?;

        let mut annotations: HashMap<u64, AnnotationRecord> =
            HashMap::with_capacity(file.annotations.len());
        for ann in file.annotations {
            let image_id = ann.image_id;
            if annotations.insert(image_id, ann).is_some() {
                return Err(AnnotationError::CorruptAnnotationsFile(format!(
                    "image {image_id} has more than one annotation"
                )));
            }
        }

        let mut dataset = Self::new(schema, "");
        dataset.info = file.info;
        dataset.licenses = file.licenses;
        if !file.categories.is_empty() {
            dataset.categories = file.categories;
        }

        for image in file.images {
            let ann = annotations.remove(&image.id).ok_or_else(|| {
                AnnotationError::CorruptAnnotationsFile(format!(
                    "image {} has no annotation",
                    image.id
                ))
            })?;
            // Validates the vector length and visibility flags
            ann.keypoint_set(Arc::clone(&dataset.schema))?;
            dataset
                .insert(image, ann)
                .map_err(|e| AnnotationError::CorruptAnnotationsFile(e.to_string()))?;
        }

        if let Some(orphan) = annotations.keys().min() {
            return Err(AnnotationError::CorruptAnnotationsFile(format!(
                "annotation references missing image {orphan}"
            )));
        }

        Ok(dataset)
    }

    /// Load a dataset file from disk.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read and
    /// [`AnnotationError::CorruptAnnotationsFile`] if it fails validation.
    pub fn load<P: AsRef<Path>>(path: P, schema: Arc<PoseSchema>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json, schema)
    }

    /// Serialize the complete dataset as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::JsonWriteFailure`] if any number is NaN or
    /// infinite, or if serialization fails.
    pub fn to_json_string(&self) -> Result<String> {
        self.check_finite().map_err(AnnotationError::JsonWriteFailure)?;
        let file = DatasetFileRef {
            info: &self.info,
            licenses: &self.licenses,
            images: &self.images,
            annotations: &self.annotations,
            categories: &self.categories,
        };
        serde_json::to_string_pretty(&file)
            .map_err(|e| AnnotationError::JsonWriteFailure(e.to_string()))
    }

    /// The schema records are validated against.
    #[must_use]
    pub const fn schema(&self) -> &Arc<PoseSchema> {
        &self.schema
    }

    /// Dataset info block.
    #[must_use]
    pub const fn info(&self) -> &DatasetInfo {
        &self.info
    }

    /// License entries.
    #[must_use]
    pub fn licenses(&self) -> &[License] {
        &self.licenses
    }

    /// Category entries.
    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Image records in creation order.
    #[must_use]
    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    /// Annotation records in creation order.
    #[must_use]
    pub fn annotations(&self) -> &[AnnotationRecord] {
        &self.annotations
    }

    /// Number of image records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Check if the dataset has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Id the next created record will receive.
    #[must_use]
    pub const fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Look up a record pair by image id.
    #[must_use]
    pub fn get(&self, image_id: u64) -> Option<(&ImageRecord, &AnnotationRecord)> {
        self.by_id
            .get(&image_id)
            .map(|slot| (&self.images[slot.image], &self.annotations[slot.annotation]))
    }

    /// Look up a record pair by frame identity.
    #[must_use]
    pub fn find(&self, identity: &FrameIdentity) -> Option<(&ImageRecord, &AnnotationRecord)> {
        self.by_identity
            .get(identity)
            .and_then(|&image_id| self.get(image_id))
    }

    /// Image ids and identities in creation order.
    #[must_use]
    pub fn labeled_frames(&self) -> Vec<LabeledFrame> {
        self.images
            .iter()
            .map(|img| LabeledFrame {
                image_id: img.id,
                identity: img.identity(),
            })
            .collect()
    }

    // serde_json writes non-finite floats as null, which cannot be read back.
    fn check_finite(&self) -> std::result::Result<(), String> {
        if let Some(image) = self.images.iter().find(|i| !i.fps.is_finite()) {
            return Err(format!("image {} has non-finite fps", image.id));
        }
        for ann in &self.annotations {
            let finite = ann.keypoints.iter().all(|v| v.is_finite())
                && ann.bbox.to_array().iter().all(|v| v.is_finite())
                && ann.area.is_finite()
                && ann.score.is_finite();
            if !finite {
                return Err(format!("annotation {} has a non-finite value", ann.id));
            }
        }
        Ok(())
    }

    /// Append a record pair.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::DuplicateRecord`] if the image id, the
    /// annotation id or the frame identity is already taken, or the
    /// annotation does not belong to the image.
    pub fn insert(&mut self, image: ImageRecord, annotation: AnnotationRecord) -> Result<()> {
        if annotation.image_id != image.id {
            return Err(AnnotationError::DuplicateRecord(format!(
                "annotation {} points at image {}, not {}",
                annotation.id, annotation.image_id, image.id
            )));
        }
        if self.by_id.contains_key(&image.id) {
            return Err(AnnotationError::DuplicateRecord(format!(
                "image id {} is already used",
                image.id
            )));
        }
        if self.annotation_ids.contains(&annotation.id) {
            return Err(AnnotationError::DuplicateRecord(format!(
                "annotation id {} is already used",
                annotation.id
            )));
        }
        let identity = image.identity();
        if self.by_identity.contains_key(&identity) {
            return Err(AnnotationError::DuplicateRecord(format!(
                "frame {identity} is already annotated"
            )));
        }

        self.next_id = self.next_id.max(image.id.max(annotation.id) + 1);
        self.by_identity.insert(identity, image.id);
        self.annotation_ids.insert(annotation.id);
        self.by_id.insert(
            image.id,
            Slot {
                image: self.images.len(),
                annotation: self.annotations.len(),
            },
        );
        self.images.push(image);
        self.annotations.push(annotation);
        Ok(())
    }

    /// Overwrite an existing record's labels and refresh its capture date.
    ///
    /// The id, file name and frame identity are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::RecordNotFound`] for unknown ids.
    pub fn update(&mut self, image_id: u64, keypoints: &KeypointSet) -> Result<()> {
        let slot = *self
            .by_id
            .get(&image_id)
            .ok_or(AnnotationError::RecordNotFound(image_id))?;
        self.annotations[slot.annotation].refresh(keypoints);
        self.images[slot.image].date_captured = timestamp();
        Ok(())
    }

    /// Remove a record pair. Ids are never handed out again in this session.
    pub fn remove(&mut self, image_id: u64) -> Option<(ImageRecord, AnnotationRecord)> {
        let slot = self.by_id.remove(&image_id)?;
        let image = self.images.remove(slot.image);
        let annotation = self.annotations.remove(slot.annotation);
        self.by_identity.remove(&image.identity());
        self.annotation_ids.remove(&annotation.id);
        for other in self.by_id.values_mut() {
            if other.image > slot.image {
                other.image -= 1;
            }
            if other.annotation > slot.annotation {
                other.annotation -= 1;
            }
        }
        Some((image, annotation))
    }

    /// Save the active frame into the dataset.
    ///
    /// An existing record for the same identity is only overwritten if
    /// `confirm` returns `true`; otherwise nothing happens. New records get
    /// `next_id`, and their frame is written to the store before any record is
    /// appended. Either way the full dataset is persisted before `self` changes,
    /// so a failed save leaves `self` exactly as it was.
    ///
    /// # Errors
    ///
    /// * [`AnnotationError::OutputNotConfigured`] if `store` is `None`.
    /// * [`AnnotationError::FrameUnavailable`] if a new record is needed but no
    ///   pixel data was supplied.
    /// * [`AnnotationError::ImageWriteFailure`] / [`AnnotationError::JsonWriteFailure`]
    ///   on I/O errors.
    pub fn commit<F>(
        &mut self,
        store: Option<&DatasetStore>,
        request: CommitRequest<'_>,
        confirm: F,
    ) -> Result<SaveOutcome>
    where
        F: FnOnce(&UpdatePrompt) -> bool,
    {
        let store = store.ok_or(AnnotationError::OutputNotConfigured)?;

        if let Some(&image_id) = self.by_identity.get(request.identity) {
            let prompt = UpdatePrompt {
                identity: request.identity.clone(),
                image_id,
            };
            if !confirm(&prompt) {
                tracing::debug!(image_id, identity = %request.identity, "update declined");
                return Ok(SaveOutcome::Declined);
            }

            let mut staged = self.clone();
            staged.update(image_id, request.keypoints)?;
            store.persist(&staged)?;
            *self = staged;
            tracing::info!(image_id, identity = %request.identity, "updated annotation");
            return Ok(SaveOutcome::Updated { image_id });
        }

        let frame = request.frame.ok_or_else(|| {
            AnnotationError::FrameUnavailable(format!(
                "no pixel data captured for {}",
                request.identity
            ))
        })?;

        let image_id = self.next_id;
        let file_name = frame_file_name(image_id);
        let frame_path = store.write_frame(&file_name, &frame.image)?;

        let image = ImageRecord {
            id: image_id,
            file_name,
            video_file: request.identity.video_file.clone(),
            frame_number: request.identity.frame_number,
            width: frame.width,
            height: frame.height,
            fps: frame.fps,
            date_captured: timestamp(),
        };
        let annotation = AnnotationRecord::from_keypoints(image_id, image_id, request.keypoints);

        let mut staged = self.clone();
        let persisted = staged
            .insert(image, annotation)
            .and_then(|()| store.persist(&staged));
        if let Err(e) = persisted {
            if let Err(cleanup) = std::fs::remove_file(&frame_path) {
                tracing::warn!(path = %frame_path.display(), "failed to remove orphan frame: {cleanup}");
            }
            return Err(e);
        }

        *self = staged;
        tracing::info!(image_id, identity = %request.identity, "created annotation");
        Ok(SaveOutcome::Created { image_id })
    }
}
