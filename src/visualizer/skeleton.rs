// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use crate::keypoints::Visibility;
use crate::schema::PoseSchema;

/// COCO-Pose dataset skeleton structure (1-based pairs of keypoint indices)
/// Defines which keypoints connect to form the pose skeleton
pub const COCO_SKELETON: [[usize; 2]; 19] = [
    [16, 14], // left ankle to left knee
    [14, 12], // left knee to left hip
    [17, 15], // right ankle to right knee
    [15, 13], // right knee to right hip
    [12, 13], // left hip to right hip
    [6, 12],  // left shoulder to left hip
    [7, 13],  // right shoulder to right hip
    [6, 7],   // left shoulder to right shoulder
    [6, 8],   // left shoulder to left elbow
    [7, 9],   // right shoulder to right elbow
    [8, 10],  // left elbow to left wrist
    [9, 11],  // right elbow to right wrist
    [2, 3],   // left eye to right eye
    [1, 2],   // nose to left eye
    [1, 3],   // nose to right eye
    [2, 4],   // left eye to left ear
    [3, 5],   // right eye to right ear
    [4, 6],   // left ear to left shoulder
    [5, 7],   // right ear to right shoulder
];

/// A skeleton edge whose two endpoints are both labeled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bone {
    /// 0-based schema index of the first endpoint.
    pub from: usize,
    /// 0-based schema index of the second endpoint.
    pub to: usize,
    /// Pixel position of the first endpoint.
    pub start: (f64, f64),
    /// Pixel position of the second endpoint.
    pub end: (f64, f64),
}

/// Select the bones that may be drawn for a flattened keypoint vector.
///
/// A bone is eligible only when both endpoints have a visibility flag above
/// `Unlabeled`. Occluded endpoints count as labeled.
#[must_use]
pub fn renderable_bones(flat: &[f64], schema: &PoseSchema) -> Vec<Bone> {
    let triple = |idx: usize| -> Option<(f64, f64)> {
        let base = idx * 3;
        let v = *flat.get(base + 2)?;
        Visibility::from_flag(v)
            .filter(|vis| vis.is_labeled())
            .map(|_| (flat[base], flat[base + 1]))
    };

    schema
        .bone_endpoints()
        .iter()
        .filter_map(|&[a, b]| {
            let (from, to) = (a - 1, b - 1);
            Some(Bone {
                from,
                to,
                start: triple(from)?,
                end: triple(to)?,
            })
        })
        .collect()
}
