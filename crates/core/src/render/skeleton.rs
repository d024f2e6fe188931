use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::{ColorScheme, DrawSurface, Point};
use crate::{config::RenderConfig, results::{Joint, KeypointFrame}};

/// Landmark ordering emitted by the pose pipeline (33 body landmarks).
pub const LANDMARK_NAMES: [&str; 33] = [
    "NOSE",
    "LEFT_EYE_INNER",
    "LEFT_EYE",
    "LEFT_EYE_OUTER",
    "RIGHT_EYE_INNER",
    "RIGHT_EYE",
    "RIGHT_EYE_OUTER",
    "LEFT_EAR",
    "RIGHT_EAR",
    "MOUTH_LEFT",
    "MOUTH_RIGHT",
    "LEFT_SHOULDER",
    "RIGHT_SHOULDER",
    "LEFT_ELBOW",
    "RIGHT_ELBOW",
    "LEFT_WRIST",
    "RIGHT_WRIST",
    "LEFT_PINKY",
    "RIGHT_PINKY",
    "LEFT_INDEX",
    "RIGHT_INDEX",
    "LEFT_THUMB",
    "RIGHT_THUMB",
    "LEFT_HIP",
    "RIGHT_HIP",
    "LEFT_KNEE",
    "RIGHT_KNEE",
    "LEFT_ANKLE",
    "RIGHT_ANKLE",
    "LEFT_HEEL",
    "RIGHT_HEEL",
    "LEFT_FOOT_INDEX",
    "RIGHT_FOOT_INDEX",
];

/// Bone connections (start landmark, end landmark).
pub const CONNECTIONS: [(usize, usize); 22] = [
    // shoulders and arms
    (11, 12),
    (11, 13),
    (13, 15),
    (12, 14),
    (14, 16),
    // torso
    (11, 23),
    (12, 24),
    (23, 24),
    // legs
    (23, 25),
    (24, 26),
    (25, 27),
    (26, 28),
    (27, 29),
    (28, 30),
    (29, 31),
    (30, 32),
    // hands
    (15, 17),
    (15, 19),
    (15, 21),
    (16, 18),
    (16, 20),
    (16, 22),
];

/// Facial landmarks hidden in simplified mode.
pub const FACE_LANDMARKS: RangeInclusive<usize> = 1..=10;

/// Landmark kept as the single head marker in simplified mode.
pub const HEAD_ANCHOR: usize = 0;

/// Index of a landmark by name, ignoring case.
pub fn landmark_index(name: &str) -> Option<usize> {
    LANDMARK_NAMES
        .iter()
        .position(|candidate| candidate.eq_ignore_ascii_case(name.trim()))
}

/// How normalised keypoints map onto surface pixels. Must match the
/// normalisation applied by the pose pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoordinateMode {
    /// `(x * width, y * height)`: coordinates are fractions of the frame.
    Viewport,
    /// `center + coordinate * scale * min(width, height)`: coordinates are
    /// offsets from a body-centred origin.
    Centered { scale: f32 },
}

impl Default for CoordinateMode {
    fn default() -> Self {
        CoordinateMode::Centered { scale: 1.5 }
    }
}

impl CoordinateMode {
    pub fn to_pixel(&self, joint: &Joint, width: u32, height: u32) -> Point {
        let (w, h) = (width as f32, height as f32);
        match *self {
            CoordinateMode::Viewport => Point::new(joint.x * w, joint.y * h),
            CoordinateMode::Centered { scale } => {
                let factor = scale * w.min(h);
                Point::new(w / 2.0 + joint.x * factor, h / 2.0 + joint.y * factor)
            }
        }
    }
}

/// Draws one pose frame onto one surface. Holds no per-frame state.
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonRenderer {
    coordinates: CoordinateMode,
    simplified: bool,
    joint_radius: f32,
    line_width: f32,
}

impl SkeletonRenderer {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            coordinates: config.coordinates,
            simplified: config.simplified,
            joint_radius: config.joint_radius,
            line_width: config.line_width,
        }
    }

    pub fn coordinates(&self) -> CoordinateMode {
        self.coordinates
    }

    /// Clears the surface and draws `frame`. A missing or empty frame leaves
    /// the surface cleared.
    pub fn draw<S>(&self, surface: &mut S, frame: Option<&KeypointFrame>, colors: &ColorScheme)
    where
        S: DrawSurface + ?Sized,
    {
        self.draw_highlighted(surface, frame, colors, &[]);
    }

    /// Like [`SkeletonRenderer::draw`], painting the joints listed in
    /// `highlighted` with the scheme's highlight colour.
    pub fn draw_highlighted<S>(
        &self,
        surface: &mut S,
        frame: Option<&KeypointFrame>,
        colors: &ColorScheme,
        highlighted: &[usize],
    ) where
        S: DrawSurface + ?Sized,
    {
        surface.clear();
        let Some(frame) = frame.filter(|frame| !frame.is_empty()) else {
            return;
        };
        let (width, height) = surface.size();

        for &(start, end) in CONNECTIONS.iter() {
            if !self.is_visible(start) || !self.is_visible(end) {
                continue;
            }
            let (Some(a), Some(b)) = (drawable(frame, start), drawable(frame, end)) else {
                continue;
            };
            surface.line(
                self.coordinates.to_pixel(a, width, height),
                self.coordinates.to_pixel(b, width, height),
                colors.bone,
                self.line_width,
            );
        }

        for (index, joint) in frame.joints.iter().enumerate() {
            if !self.is_visible(index) || !is_finite(joint) {
                continue;
            }
            let color = if highlighted.contains(&index) {
                colors.highlight
            } else {
                colors.joint
            };
            surface.circle(
                self.coordinates.to_pixel(joint, width, height),
                self.joint_radius,
                color,
            );
        }
    }

    fn is_visible(&self, index: usize) -> bool {
        !(self.simplified && index != HEAD_ANCHOR && FACE_LANDMARKS.contains(&index))
    }
}

fn drawable(frame: &KeypointFrame, index: usize) -> Option<&Joint> {
    frame.get(index).filter(|joint| is_finite(joint))
}

fn is_finite(joint: &Joint) -> bool {
    joint.x.is_finite() && joint.y.is_finite()
}
