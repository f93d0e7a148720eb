// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use crate::keypoints::Visibility;

/// Color type for visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    /// Red color.
    pub const RED: Self = Self(255, 0, 0);
    /// Green color.
    pub const GREEN: Self = Self(0, 255, 0);
    /// Yellow, used for the keypoint the next click will set.
    pub const HIGHLIGHT: Self = Self(255, 255, 0);
    /// Orange, used for labeled-but-occluded keypoints and the bbox outline.
    pub const ORANGE: Self = Self(255, 165, 0);
    /// Light blue, used for skeleton bones.
    pub const SKELETON: Self = Self(0, 128, 255);

    /// Create a new color from RGB values.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self(r, g, b)
    }

    /// Get a color from the keypoint palette by schema index.
    #[must_use]
    pub const fn from_keypoint_index(index: usize) -> Self {
        let color = KEYPOINT_COLORS[index % KEYPOINT_COLORS.len()];
        Self(color[0], color[1], color[2])
    }
}

/// Full opacity.
pub const OPAQUE: u8 = 255;

/// Opacity for keypoints that are labeled but not visible.
pub const OCCLUDED_ALPHA: u8 = 128;

/// Keypoint Color Palette, one entry per COCO-17 keypoint in canonical order
pub const KEYPOINT_COLORS: [[u8; 3]; 17] = [
    [255, 0, 0],   // nose
    [255, 85, 0],  // left_eye
    [255, 170, 0], // right_eye
    [255, 255, 0], // left_ear
    [170, 255, 0], // right_ear
    [85, 255, 0],  // left_shoulder
    [0, 255, 0],   // right_shoulder
    [0, 255, 85],  // left_elbow
    [0, 255, 170], // right_elbow
    [0, 255, 255], // left_wrist
    [0, 170, 255], // right_wrist
    [0, 85, 255],  // left_hip
    [0, 0, 255],   // right_hip
    [85, 0, 255],  // left_knee
    [170, 0, 255], // right_knee
    [255, 0, 255], // left_ankle
    [255, 0, 170], // right_ankle
];

/// How a single keypoint marker should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeypointStyle {
    /// Fill and label color.
    pub color: Color,
    /// Opacity (0-255).
    pub alpha: u8,
}

impl KeypointStyle {
    /// Resolve the style for a keypoint.
    ///
    /// The active keypoint is highlighted; labeled-not-visible points are
    /// drawn at half opacity.
    #[must_use]
    pub const fn resolve(base: Color, visibility: Visibility, active: bool) -> Self {
        let color = if active { Color::HIGHLIGHT } else { base };
        let alpha = match visibility {
            Visibility::LabeledNotVisible => OCCLUDED_ALPHA,
            Visibility::Visible | Visibility::Unlabeled => OPAQUE,
        };
        Self { color, alpha }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_lookup() {
        assert_eq!(Color::from_keypoint_index(0), Color::RED);
        assert_eq!(Color::from_keypoint_index(6), Color::GREEN);
        // Wraps for schemas larger than the palette
        assert_eq!(Color::from_keypoint_index(17), Color::RED);
    }

    #[test]
    fn test_style_resolution() {
        let style = KeypointStyle::resolve(Color::RED, Visibility::LabeledNotVisible, false);
        assert_eq!(style.color, Color::RED);
        assert_eq!(style.alpha, OCCLUDED_ALPHA);

        let style = KeypointStyle::resolve(Color::RED, Visibility::Visible, true);
        assert_eq!(style.color, Color::HIGHLIGHT);
        assert_eq!(style.alpha, OPAQUE);
    }
}
