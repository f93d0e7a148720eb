// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pose schema definitions.
//!
//! A [`PoseSchema`] fixes the keypoint names (whose order is the
//! serialization order), the skeleton adjacency, and the per-keypoint display
//! colors. It is immutable once built; the COCO-17 schema is constructed once
//! per process and shared through an [`Arc`].

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};

use crate::error::{AnnotationError, Result};
use crate::visualizer::color::Color;
use crate::visualizer::skeleton::COCO_SKELETON;

/// COCO keypoint names in canonical order.
pub const COCO_KEYPOINT_NAMES: [&str; 17] = [
    "nose",
    "left_eye",
    "right_eye",
    "left_ear",
    "right_ear",
    "left_shoulder",
    "right_shoulder",
    "left_elbow",
    "right_elbow",
    "left_wrist",
    "right_wrist",
    "left_hip",
    "right_hip",
    "left_knee",
    "right_knee",
    "left_ankle",
    "right_ankle",
];

/// Category id used for every annotation.
pub const PERSON_CATEGORY_ID: u32 = 1;

static COCO17: LazyLock<Arc<PoseSchema>> = LazyLock::new(|| {
    let names = COCO_KEYPOINT_NAMES.iter().map(ToString::to_string).collect();
    Arc::new(PoseSchema::build(names, COCO_SKELETON.to_vec()))
});

/// Static definition of keypoints and skeleton for one pose layout.
#[derive(Debug, Clone)]
pub struct PoseSchema {
    keypoint_names: Vec<String>,
    skeleton: Vec<[usize; 2]>,
    colors: Vec<Color>,
    index: HashMap<String, usize>,
}

impl PoseSchema {
    /// The shared COCO-17 person schema.
    #[must_use]
    pub fn coco17() -> Arc<Self> {
        Arc::clone(&COCO17)
    }

    /// Build a custom schema.
    ///
    /// # Arguments
    ///
    /// * `keypoint_names` - Unique names in serialization order.
    /// * `skeleton` - 1-based bone endpoint pairs.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::InvalidKeypointName`] for duplicate or empty
    /// names and for bones whose endpoints fall outside `[1, K]`.
    pub fn new(keypoint_names: Vec<String>, skeleton: Vec<[usize; 2]>) -> Result<Self> {
        let k = keypoint_names.len();
        let mut seen = HashMap::with_capacity(k);
        for name in &keypoint_names {
            if name.is_empty() || seen.insert(name.as_str(), ()).is_some() {
                return Err(AnnotationError::InvalidKeypointName(format!(
                    "duplicate or empty keypoint name '{name}'"
                )));
            }
        }
        if let Some(bone) = skeleton
            .iter()
            .find(|bone| bone.iter().any(|&i| i == 0 || i > k))
        {
            return Err(AnnotationError::InvalidKeypointName(format!(
                "bone {bone:?} is outside 1..={k}"
            )));
        }
        Ok(Self::build(keypoint_names, skeleton))
    }

    fn build(keypoint_names: Vec<String>, skeleton: Vec<[usize; 2]>) -> Self {
        let index = keypoint_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        let colors = (0..keypoint_names.len())
            .map(Color::from_keypoint_index)
            .collect();
        Self {
            keypoint_names,
            skeleton,
            colors,
            index,
        }
    }

    /// Number of keypoints (K).
    #[must_use]
    pub fn len(&self) -> usize {
        self.keypoint_names.len()
    }

    /// Check if the schema has no keypoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keypoint_names.is_empty()
    }

    /// Keypoint names in canonical order.
    #[must_use]
    pub fn keypoint_names(&self) -> &[String] {
        &self.keypoint_names
    }

    /// 0-based canonical index of a keypoint, if it exists.
    #[must_use]
    pub fn keypoint_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Like [`Self::keypoint_index`], failing for unknown names.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotationError::InvalidKeypointName`] if `name` is not in the schema.
    pub fn require_index(&self, name: &str) -> Result<usize> {
        self.keypoint_index(name)
            .ok_or_else(|| AnnotationError::InvalidKeypointName(name.to_string()))
    }

    /// Name at a canonical index.
    #[must_use]
    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.keypoint_names.get(index).map(String::as_str)
    }

    /// Bone endpoint pairs (1-based).
    #[must_use]
    pub fn bone_endpoints(&self) -> &[[usize; 2]] {
        &self.skeleton
    }

    /// Display color of the keypoint at a canonical index.
    #[must_use]
    pub fn keypoint_color(&self, index: usize) -> Color {
        self.colors.get(index).copied().unwrap_or(Color::GREEN)
    }

    /// COCO category descriptor for this schema.
    #[must_use]
    pub fn category(&self) -> Category {
        Category {
            id: PERSON_CATEGORY_ID,
            name: "person".to_string(),
            supercategory: "person".to_string(),
            keypoints: self.keypoint_names.clone(),
            skeleton: self.skeleton.clone(),
        }
    }
}

/// COCO category entry written to the `categories` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Category id (always 1).
    pub id: u32,
    /// Category name.
    pub name: String,
    /// Parent category name.
    pub supercategory: String,
    /// Keypoint names in canonical order.
    pub keypoints: Vec<String>,
    /// 1-based bone pairs.
    pub skeleton: Vec<[usize; 2]>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coco17_lookup() {
        let schema = PoseSchema::coco17();
        assert_eq!(schema.len(), 17);
        assert_eq!(schema.keypoint_index("nose"), Some(0));
        assert_eq!(schema.keypoint_index("right_ankle"), Some(16));
        assert_eq!(schema.keypoint_index("tail"), None);
        assert!(matches!(
            schema.require_index("tail"),
            Err(AnnotationError::InvalidKeypointName(_))
        ));
        assert_eq!(schema.name_at(1), Some("left_eye"));
    }

    #[test]
    fn test_coco17_is_shared() {
        let a = PoseSchema::coco17();
        let b = PoseSchema::coco17();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_skeleton_bounds() {
        let schema = PoseSchema::coco17();
        let k = schema.len();
        for bone in schema.bone_endpoints() {
            assert!(bone.iter().all(|&i| (1..=k).contains(&i)));
        }
    }

    #[test]
    fn test_custom_schema_validation() {
        let names = vec!["a".to_string(), "b".to_string()];
        assert!(PoseSchema::new(names.clone(), vec![[1, 2]]).is_ok());
        assert!(PoseSchema::new(names.clone(), vec![[0, 2]]).is_err());
        assert!(PoseSchema::new(names, vec![[1, 3]]).is_err());

        let dup = vec!["a".to_string(), "a".to_string()];
        assert!(PoseSchema::new(dup, vec![]).is_err());
    }

    #[test]
    fn test_category_descriptor() {
        let category = PoseSchema::coco17().category();
        assert_eq!(category.id, 1);
        assert_eq!(category.name, "person");
        assert_eq!(category.supercategory, "person");
        assert_eq!(category.keypoints.len(), 17);
        assert_eq!(category.skeleton.len(), 19);
    }
}
