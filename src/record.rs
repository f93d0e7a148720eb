// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Persisted dataset records.
//!
//! An [`ImageRecord`] describes one captured frame and an
//! [`AnnotationRecord`] holds its labels. Both share the same id in datasets
//! produced by this crate and are related through `image_id`.

use std::fmt;
use std::sync::Arc;

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::Result;
use crate::keypoints::{BBox, KeypointSet};
use crate::schema::{PERSON_CATEGORY_ID, PoseSchema};

/// Timestamp format used for `date_captured` and `date_created`.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time formatted with [`DATE_FORMAT`].
#[must_use]
pub fn timestamp() -> String {
    chrono::Local::now().format(DATE_FORMAT).to_string()
}

/// Deterministic file name of a saved frame (`000000000042.jpg`).
#[must_use]
pub fn frame_file_name(image_id: u64) -> String {
    format!("{image_id:012}.jpg")
}

/// Identity of a physical frame: source video name and 0-based frame index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameIdentity {
    /// File name of the source video.
    pub video_file: String,
    /// 0-based frame index within the video.
    pub frame_number: usize,
}

impl FrameIdentity {
    /// Create a new identity.
    pub fn new(video_file: impl Into<String>, frame_number: usize) -> Self {
        Self {
            video_file: video_file.into(),
            frame_number,
        }
    }
}

impl fmt::Display for FrameIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.video_file, self.frame_number)
    }
}

/// One captured frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Image id.
    pub id: u64,
    /// Saved JPEG name inside the frames directory.
    pub file_name: String,
    /// Source video name.
    pub video_file: String,
    /// 0-based frame index in the source video.
    pub frame_number: usize,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Source frame rate.
    pub fps: f64,
    /// Last capture or edit time.
    pub date_captured: String,
}

impl ImageRecord {
    /// Frame identity of this record.
    #[must_use]
    pub fn identity(&self) -> FrameIdentity {
        FrameIdentity::new(self.video_file.clone(), self.frame_number)
    }
}

const fn default_score() -> f64 {
    1.0
}

/// Keypoint labels for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// Annotation id.
    pub id: u64,
    /// Id of the related [`ImageRecord`].
    pub image_id: u64,
    /// Category id (always 1).
    pub category_id: u32,
    /// Flattened `(x, y, v)` triples in schema order.
    #[serde(serialize_with = "serialize_compact")]
    pub keypoints: Vec<f64>,
    /// Number of labeled keypoints.
    pub num_keypoints: usize,
    /// Padded bounding box, `[0, 0, 0, 0]` when nothing is labeled.
    pub bbox: BBox,
    /// Bounding box area.
    pub area: f64,
    /// Always 0.
    #[serde(default)]
    pub iscrowd: u8,
    /// Always empty.
    #[serde(default)]
    pub segmentation: Vec<serde_json::Value>,
    /// Always 1.0 for manual labels.
    #[serde(default = "default_score")]
    pub score: f64,
}

impl AnnotationRecord {
    /// Build a record from the current labels.
    #[must_use]
    pub fn from_keypoints(id: u64, image_id: u64, keypoints: &KeypointSet) -> Self {
        let mut record = Self {
            id,
            image_id,
            category_id: PERSON_CATEGORY_ID,
            keypoints: Vec::new(),
            num_keypoints: 0,
            bbox: BBox::ZERO,
            area: 0.0,
            iscrowd: 0,
            segmentation: Vec::new(),
            score: default_score(),
        };
        record.refresh(keypoints);
        record
    }

    /// Recompute `keypoints`, `num_keypoints`, `bbox` and `area` in place.
    pub fn refresh(&mut self, keypoints: &KeypointSet) {
        let bbox = keypoints.derive_bbox().unwrap_or(BBox::ZERO);
        self.keypoints = keypoints.to_flat_vector();
        self.num_keypoints = keypoints.labeled_count();
        self.bbox = bbox;
        self.area = bbox.area();
    }

    /// Rebuild the editable keypoint set.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored vector does not match the schema.
    pub fn keypoint_set(&self, schema: Arc<PoseSchema>) -> Result<KeypointSet> {
        KeypointSet::from_flat_vector(schema, &self.keypoints)
    }
}

/// Serialize integral values as JSON integers so visibility flags stay `0/1/2`.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn serialize_compact<S>(values: &[f64], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0; // 2^53

    let mut seq = serializer.serialize_seq(Some(values.len()))?;
    for &v in values {
        if v.fract() == 0.0 && v.abs() < MAX_EXACT {
            seq.serialize_element(&(v as i64))?;
        } else {
            seq.serialize_element(&v)?;
        }
    }
    seq.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypoints::Visibility;

    #[test]
    fn test_frame_file_name() {
        assert_eq!(frame_file_name(1), "000000000001.jpg");
        assert_eq!(frame_file_name(123_456), "000000123456.jpg");
    }

    #[test]
    fn test_timestamp_format() {
        let ts = timestamp();
        assert!(chrono::NaiveDateTime::parse_from_str(&ts, DATE_FORMAT).is_ok());
    }

    #[test]
    fn test_annotation_from_keypoints() {
        let mut set = KeypointSet::new(PoseSchema::coco17());
        set.set("nose", 100.0, 100.0, Visibility::Visible).unwrap();

        let record = AnnotationRecord::from_keypoints(3, 3, &set);
        assert_eq!(record.category_id, 1);
        assert_eq!(record.keypoints.len(), 51);
        assert_eq!(&record.keypoints[0..3], &[100.0, 100.0, 2.0]);
        assert_eq!(record.num_keypoints, 1);
        assert_eq!(record.bbox.to_array(), [70.0, 70.0, 60.0, 60.0]);
        assert!((record.area - 3600.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_keypoints_give_zero_bbox() {
        let set = KeypointSet::new(PoseSchema::coco17());
        let record = AnnotationRecord::from_keypoints(1, 1, &set);
        assert_eq!(record.bbox, BBox::ZERO);
        assert!(record.area.abs() < f64::EPSILON);
        assert_eq!(record.num_keypoints, 0);
    }

    #[test]
    fn test_annotation_json_shape() {
        let mut set = KeypointSet::new(PoseSchema::coco17());
        set.set("nose", 100.5, 100.0, Visibility::Visible).unwrap();
        let record = AnnotationRecord::from_keypoints(1, 1, &set);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["keypoints"][0], serde_json::json!(100.5));
        assert_eq!(json["keypoints"][1], serde_json::json!(100));
        assert_eq!(json["keypoints"][2], serde_json::json!(2));
        assert_eq!(json["bbox"].as_array().unwrap().len(), 4);
        assert_eq!(json["iscrowd"], serde_json::json!(0));
        assert_eq!(json["segmentation"], serde_json::json!([]));
        assert_eq!(json["score"], serde_json::json!(1.0));
    }

    #[test]
    fn test_annotation_defaults_on_load() {
        let json = serde_json::json!({
            "id": 1,
            "image_id": 1,
            "category_id": 1,
            "keypoints": [0, 0, 0],
            "num_keypoints": 0,
            "bbox": [0, 0, 0, 0],
            "area": 0
        });
        let record: AnnotationRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.iscrowd, 0);
        assert!((record.score - 1.0).abs() < f64::EPSILON);
    }
}
