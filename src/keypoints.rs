// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Per-frame keypoint state.
//!
//! A [`KeypointSet`] is the editable working copy of one frame's labels. It
//! holds at most one entry per schema keypoint; an absent entry means the
//! keypoint is unlabeled. The padded bounding box is recomputed eagerly after
//! every mutation so [`KeypointSet::derive_bbox`] never observes stale state.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AnnotationError, Result};
use crate::schema::PoseSchema;

/// Padding added on every side of the keypoint extent.
pub const BBOX_PADDING: f64 = 30.0;

/// Three-way keypoint visibility state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    /// No data. Never stored as an explicit entry.
    #[default]
    Unlabeled,
    /// Position is known but the keypoint is occluded.
    LabeledNotVisible,
    /// Position is known and the keypoint is visible.
    Visible,
}

impl Visibility {
    /// COCO visibility flag (0, 1 or 2).
    #[must_use]
    pub const fn flag(self) -> u8 {
        match self {
            Self::Unlabeled => 0,
            Self::LabeledNotVisible => 1,
            Self::Visible => 2,
        }
    }

    /// Parse a serialized visibility flag.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn from_flag(v: f64) -> Option<Self> {
        if v == 0.0 {
            Some(Self::Unlabeled)
        } else if v == 1.0 {
            Some(Self::LabeledNotVisible)
        } else if v == 2.0 {
            Some(Self::Visible)
        } else {
            None
        }
    }

    /// Whether this state carries a position.
    #[must_use]
    pub const fn is_labeled(self) -> bool {
        !matches!(self, Self::Unlabeled)
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unlabeled => "unlabeled",
            Self::LabeledNotVisible => "occluded",
            Self::Visible => "visible",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "0" | "unlabeled" => Ok(Self::Unlabeled),
            "1" | "occluded" | "hidden" | "not_visible" => Ok(Self::LabeledNotVisible),
            "2" | "visible" => Ok(Self::Visible),
            _ => Err(format!(
                "invalid visibility '{s}', expected one of: 0, 1, 2, occluded, visible"
            )),
        }
    }
}

/// A labeled keypoint position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    /// X coordinate in image pixels.
    pub x: f64,
    /// Y coordinate in image pixels.
    pub y: f64,
    /// Visibility tier. Never `Unlabeled` inside a [`KeypointSet`].
    pub visibility: Visibility,
}

/// Axis-aligned box serialized as `[x, y, w, h]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl BBox {
    /// The `[0, 0, 0, 0]` box written for frames with no labels.
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    /// Box area (`w * h`).
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// `[x, y, w, h]` array form.
    #[must_use]
    pub const fn to_array(self) -> [f64; 4] {
        [self.x, self.y, self.width, self.height]
    }
}

impl From<[f64; 4]> for BBox {
    fn from([x, y, width, height]: [f64; 4]) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl From<BBox> for [f64; 4] {
    fn from(bbox: BBox) -> Self {
        bbox.to_array()
    }
}

/// Compute the padded bounding box around a set of positions.
///
/// Returns `None` for an empty input. The result is not clamped to image
/// bounds.
pub fn padded_bbox<I>(points: I) -> Option<BBox>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let mut iter = points.into_iter();
    let (x0, y0) = iter.next()?;
    let (mut x_min, mut x_max, mut y_min, mut y_max) = (x0, x0, y0, y0);
    for (x, y) in iter {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }

    x_min -= BBOX_PADDING;
    y_min -= BBOX_PADDING;
    x_max += BBOX_PADDING;
    y_max += BBOX_PADDING;

    Some(BBox {
        x: x_min,
        y: y_min,
        width: x_max - x_min,
        height: y_max - y_min,
    })
}

/// Mutable keypoint labels for a single frame.
#[derive(Debug, Clone)]
pub struct KeypointSet {
    schema: Arc<PoseSchema>,
    points: Vec<Option<Keypoint>>,
    bbox: Option<BBox>,
    active: Option<usize>,
}

impl KeypointSet {
    /// Create an empty set for a schema.
    #[must_use]
    pub fn new(schema: Arc<PoseSchema>) -> Self {
        let points = vec![None; schema.len()];
        Self {
            schema,
            points,
            bbox: None,
            active: None,
        }
    }

    /// Rebuild a set from a flattened `(x, y, v)` vector.
    ///
    /// Entries with `v == 0` are left unlabeled regardless of their coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::CorruptAnnotationsFile`] if the vector length
    /// is not `3 * K` or a visibility flag is not 0, 1 or 2.
    pub fn from_flat_vector(schema: Arc<PoseSchema>, flat: &[f64]) -> Result<Self> {
        let expected = schema.len() * 3;
        if flat.len() != expected {
            return Err(AnnotationError::CorruptAnnotationsFile(format!(
                "keypoint vector has {} values, expected {expected}",
                flat.len()
            )));
        }

        let mut set = Self::new(schema);
        for (slot, triple) in set.points.iter_mut().zip(flat.chunks_exact(3)) {
            let visibility = Visibility::from_flag(triple[2]).ok_or_else(|| {
                AnnotationError::CorruptAnnotationsFile(format!(
                    "invalid visibility flag {}",
                    triple[2]
                ))
            })?;
            if visibility.is_labeled() {
                *slot = Some(Keypoint {
                    x: triple[0],
                    y: triple[1],
                    visibility,
                });
            }
        }
        set.refresh_bbox();
        Ok(set)
    }

    /// The schema this set is bound to.
    #[must_use]
    pub fn schema(&self) -> &Arc<PoseSchema> {
        &self.schema
    }

    /// Label a keypoint, overwriting any prior entry.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::InvalidKeypointName`] for names outside the
    /// schema and [`AnnotationError::UnlabeledVisibility`] when `visibility`
    /// is `Unlabeled` (use [`Self::clear`] instead), and
    /// [`AnnotationError::NonFiniteCoordinate`] if `x` or `y` is NaN or infinite.
    pub fn set(&mut self, name: &str, x: f64, y: f64, visibility: Visibility) -> Result<()> {
        let idx = self.schema.require_index(name)?;
        if !visibility.is_labeled() {
            return Err(AnnotationError::UnlabeledVisibility(name.to_string()));
        }
        if !(x.is_finite() && y.is_finite()) {
            return Err(AnnotationError::NonFiniteCoordinate(format!(
                "{name} at ({x}, {y})"
            )));
        }
        self.points[idx] = Some(Keypoint { x, y, visibility });
        self.refresh_bbox();
        Ok(())
    }

    /// Remove a keypoint's label. Returns whether an entry was removed.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::InvalidKeypointName`] for names outside the schema.
    pub fn clear(&mut self, name: &str) -> Result<bool> {
        let idx = self.schema.require_index(name)?;
        let removed = self.points[idx].take().is_some();
        if removed {
            self.refresh_bbox();
        }
        Ok(removed)
    }

    /// Remove every label.
    pub fn clear_all(&mut self) {
        self.points.iter_mut().for_each(|p| *p = None);
        self.bbox = None;
    }

    /// Look up a labeled keypoint.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Keypoint> {
        self.schema
            .keypoint_index(name)
            .and_then(|idx| self.points[idx].as_ref())
    }

    /// Whether `name` currently has a label.
    #[must_use]
    pub fn is_labeled(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate labeled keypoints in canonical order.
    pub fn labeled(&self) -> impl Iterator<Item = (&str, &Keypoint)> {
        self.schema
            .keypoint_names()
            .iter()
            .zip(&self.points)
            .filter_map(|(name, p)| p.as_ref().map(|kp| (name.as_str(), kp)))
    }

    /// Number of labeled keypoints.
    #[must_use]
    pub fn labeled_count(&self) -> usize {
        self.points.iter().flatten().count()
    }

    /// Check if no keypoint is labeled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.iter().all(Option::is_none)
    }

    /// Counts of `(visible, labeled_not_visible)` keypoints.
    #[must_use]
    pub fn visibility_counts(&self) -> (usize, usize) {
        self.points
            .iter()
            .flatten()
            .fold((0, 0), |(vis, occ), kp| match kp.visibility {
                Visibility::Visible => (vis + 1, occ),
                Visibility::LabeledNotVisible => (vis, occ + 1),
                Visibility::Unlabeled => (vis, occ),
            })
    }

    /// Padded bounding box of all labeled keypoints, or `None` if empty.
    #[must_use]
    pub const fn derive_bbox(&self) -> Option<BBox> {
        self.bbox
    }

    /// Flatten to `3 * K` numbers in canonical order, `(0, 0, 0)` for unlabeled.
    #[must_use]
    pub fn to_flat_vector(&self) -> Vec<f64> {
        self.points
            .iter()
            .flat_map(|p| match p {
                Some(kp) => [kp.x, kp.y, f64::from(kp.visibility.flag())],
                None => [0.0; 3],
            })
            .collect()
    }

    /// Select the keypoint the next click will set.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::InvalidKeypointName`] for names outside the schema.
    pub fn set_active(&mut self, name: &str) -> Result<()> {
        self.active = Some(self.schema.require_index(name)?);
        Ok(())
    }

    /// Schema index of the active keypoint.
    #[must_use]
    pub const fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// Select the active keypoint by schema index. Out-of-range indices deselect.
    pub fn set_active_index(&mut self, index: Option<usize>) {
        self.active = index.filter(|&idx| idx < self.points.len());
    }

    /// Deselect the active keypoint.
    pub const fn clear_active(&mut self) {
        self.active = None;
    }

    /// Name of the active keypoint.
    #[must_use]
    pub fn active(&self) -> Option<&str> {
        self.active.and_then(|idx| self.schema.name_at(idx))
    }

    fn refresh_bbox(&mut self) {
        self.bbox = padded_bbox(self.points.iter().flatten().map(|kp| (kp.x, kp.y)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> KeypointSet {
        KeypointSet::new(PoseSchema::coco17())
    }

    #[test]
    fn test_empty_set_has_no_bbox() {
        let set = empty();
        assert!(set.derive_bbox().is_none());
        assert_eq!(set.labeled_count(), 0);
        assert!(set.is_empty());
    }

    #[test]
    fn test_single_point_bbox_is_padded() {
        let mut set = empty();
        set.set("nose", 100.0, 100.0, Visibility::Visible).unwrap();
        let bbox = set.derive_bbox().unwrap();
        assert_eq!(bbox.to_array(), [70.0, 70.0, 60.0, 60.0]);
        assert!((bbox.area() - 3600.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bbox_counts_occluded_points() {
        let mut set = empty();
        set.set("nose", 100.0, 50.0, Visibility::Visible).unwrap();
        set.set("left_ankle", 140.0, 300.0, Visibility::LabeledNotVisible)
            .unwrap();
        let bbox = set.derive_bbox().unwrap();
        assert_eq!(bbox.to_array(), [70.0, 20.0, 100.0, 310.0]);
    }

    #[test]
    fn test_bbox_tracks_every_mutation() {
        let mut set = empty();
        set.set("nose", 0.0, 0.0, Visibility::Visible).unwrap();
        set.set("left_eye", 50.0, 50.0, Visibility::Visible).unwrap();
        assert_eq!(set.derive_bbox().unwrap().width, 110.0);

        assert!(set.clear("left_eye").unwrap());
        assert_eq!(set.derive_bbox().unwrap().width, 60.0);

        set.clear_all();
        assert!(set.derive_bbox().is_none());
    }

    #[test]
    fn test_set_rejects_unknown_and_unlabeled() {
        let mut set = empty();
        assert!(matches!(
            set.set("tail", 1.0, 1.0, Visibility::Visible),
            Err(AnnotationError::InvalidKeypointName(_))
        ));
        assert!(matches!(
            set.set("nose", 1.0, 1.0, Visibility::Unlabeled),
            Err(AnnotationError::UnlabeledVisibility(_))
        ));
        assert!(set.is_empty());
    }

    #[test]
    fn test_set_rejects_non_finite() {
        let mut set = empty();
        set.set("nose", 10.0, 10.0, Visibility::Visible).unwrap();
        for (x, y) in [(f64::NAN, 5.0), (5.0, f64::INFINITY), (f64::NEG_INFINITY, 0.0)] {
            assert!(matches!(
                set.set("nose", x, y, Visibility::Visible),
                Err(AnnotationError::NonFiniteCoordinate(_))
            ));
        }
        let kp = set.get("nose").unwrap();
        assert_eq!((kp.x, kp.y), (10.0, 10.0));
        assert_eq!(set.derive_bbox().unwrap().to_array(), [-20.0, -20.0, 60.0, 60.0]);
    }

    #[test]
    fn test_active_index_bounds() {
        let mut set = empty();
        set.set_active_index(Some(13));
        assert_eq!(set.active(), Some("left_knee"));
        set.set_active_index(Some(17));
        assert_eq!(set.active_index(), None);
    }

    #[test]
    fn test_clear_missing_is_noop() {
        let mut set = empty();
        assert!(!set.clear("nose").unwrap());
        assert!(set.clear("tail").is_err());
    }

    #[test]
    fn test_set_overwrites() {
        let mut set = empty();
        set.set("nose", 1.0, 2.0, Visibility::LabeledNotVisible).unwrap();
        set.set("nose", 3.0, 4.0, Visibility::Visible).unwrap();
        assert_eq!(set.labeled_count(), 1);
        let kp = set.get("nose").unwrap();
        assert_eq!((kp.x, kp.y, kp.visibility), (3.0, 4.0, Visibility::Visible));
    }

    #[test]
    fn test_flat_vector_layout() {
        let mut set = empty();
        assert_eq!(set.to_flat_vector().len(), 51);

        set.set("left_eye", 10.0, 20.0, Visibility::LabeledNotVisible)
            .unwrap();
        set.set("nose", 30.0, 40.0, Visibility::Visible).unwrap();
        let flat = set.to_flat_vector();
        assert_eq!(flat.len(), 51);
        assert_eq!(&flat[0..6], &[30.0, 40.0, 2.0, 10.0, 20.0, 1.0]);
        assert!(flat[6..].iter().all(|&v| v == 0.0));
        assert_eq!(set.labeled_count(), 2);
        assert_eq!(set.visibility_counts(), (1, 1));
    }

    #[test]
    fn test_from_flat_vector() {
        let schema = PoseSchema::coco17();
        let mut flat = vec![0.0; 51];
        flat[3..6].copy_from_slice(&[5.0, 6.0, 1.0]);
        // Coordinates with v == 0 stay unlabeled
        flat[6..9].copy_from_slice(&[7.0, 8.0, 0.0]);

        let set = KeypointSet::from_flat_vector(schema.clone(), &flat).unwrap();
        assert_eq!(set.labeled_count(), 1);
        assert!(set.is_labeled("left_eye"));
        assert!(!set.is_labeled("right_eye"));
        assert_eq!(set.to_flat_vector()[6..9], [0.0, 0.0, 0.0]);

        assert!(KeypointSet::from_flat_vector(schema.clone(), &flat[..50]).is_err());
        flat[2] = 3.0;
        assert!(KeypointSet::from_flat_vector(schema, &flat).is_err());
    }

    #[test]
    fn test_active_keypoint() {
        let mut set = empty();
        assert!(set.active().is_none());
        set.set_active("left_knee").unwrap();
        assert_eq!(set.active(), Some("left_knee"));
        assert!(set.set_active("tail").is_err());
        assert_eq!(set.active(), Some("left_knee"));
        set.clear_active();
        assert!(set.active().is_none());
    }

    #[test]
    fn test_visibility_parsing() {
        assert_eq!("2".parse::<Visibility>().unwrap(), Visibility::Visible);
        assert_eq!(
            "occluded".parse::<Visibility>().unwrap(),
            Visibility::LabeledNotVisible
        );
        assert!("7".parse::<Visibility>().is_err());
        assert_eq!(Visibility::from_flag(1.0), Some(Visibility::LabeledNotVisible));
        assert_eq!(Visibility::from_flag(1.5), None);
    }
}
