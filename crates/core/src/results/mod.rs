use std::{fs, path::Path};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::{alignment::frame_index_for, PoseSyncError, Result};

/// Normalised 2D position of a single tracked landmark.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Joint {
    pub x: f32,
    pub y: f32,
}

impl Joint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

// The pose pipeline emits `[x, y]` or `[x, y, z]`; depth is not used for
// drawing so anything past the second component is dropped.
impl<'de> Deserialize<'de> for Joint {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let components = Vec::<f32>::deserialize(deserializer)?;
        if components.len() < 2 {
            return Err(de::Error::invalid_length(
                components.len(),
                &"a keypoint with at least x and y",
            ));
        }
        Ok(Self::new(components[0], components[1]))
    }
}

impl Serialize for Joint {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        [self.x, self.y].serialize(serializer)
    }
}

/// All landmarks detected in one decoded video frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeypointFrame {
    pub joints: Vec<Joint>,
}

impl KeypointFrame {
    pub fn new(joints: Vec<Joint>) -> Self {
        Self { joints }
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Joint> {
        self.joints.get(index)
    }
}

/// Per-frame keypoints of one video together with its frame rate.
#[derive(Debug, Clone, PartialEq)]
pub struct KeypointSequence {
    frames: Vec<KeypointFrame>,
    fps: f64,
}

impl KeypointSequence {
    pub fn new(frames: Vec<KeypointFrame>, fps: f64) -> Self {
        Self { frames, fps }
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame(&self, index: usize) -> Option<&KeypointFrame> {
        self.frames.get(index)
    }

    /// Index of the frame shown at `seconds`, or `None` for an empty sequence.
    pub fn frame_index_at(&self, seconds: f64) -> Option<usize> {
        if self.frames.is_empty() {
            return None;
        }
        Some(frame_index_for(seconds, self.fps, self.frames.len()))
    }

    /// Length of the sequence in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.fps > 0.0 {
            self.frames.len() as f64 / self.fps
        } else {
            0.0
        }
    }
}

/// A matched `(reference frame, attempt frame)` pair on the alignment path.
pub type PathPair = (usize, usize);

/// Problem joints arrive either as bare names or as `{ "joint": name }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProblemJoint {
    Name(String),
    Detailed { joint: String },
}

impl ProblemJoint {
    pub fn name(&self) -> &str {
        match self {
            ProblemJoint::Name(name) => name,
            ProblemJoint::Detailed { joint } => joint,
        }
    }
}

/// Segment exactly as it appears on the wire. Every timing field is optional
/// so one damaged entry can be skipped without rejecting the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    pub user_start_time: Option<f64>,
    pub user_end_time: Option<f64>,
    pub score: Option<f64>,
    #[serde(default)]
    pub problem_joints: Vec<ProblemJoint>,
}

/// A single low-scoring joint instant reported by the scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Moment {
    pub joint: String,
    pub score: f64,
    #[serde(default)]
    pub ref_frame: Option<usize>,
}

/// The comparison output consumed by the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsDocument {
    pub overall_score: f64,
    pub ref_fps: f64,
    pub user_fps: f64,
    #[serde(default)]
    pub ref_keypoints: Vec<KeypointFrame>,
    #[serde(default)]
    pub user_keypoints: Vec<KeypointFrame>,
    #[serde(default)]
    pub dtw_path: Vec<PathPair>,
    #[serde(default)]
    pub segment_scores: Vec<SegmentRecord>,
    #[serde(default)]
    pub worst_moments: Vec<Moment>,
    #[serde(default)]
    pub extended_moments: Vec<Moment>,
}

impl ResultsDocument {
    /// Parses and validates a results document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: ResultsDocument = serde_json::from_str(json)?;
        document.validate()?;
        Ok(document)
    }

    /// Reads a results document from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let document = Self::from_json_str(&contents)?;
        tracing::debug!(
            path = %path.display(),
            ref_frames = document.ref_keypoints.len(),
            user_frames = document.user_keypoints.len(),
            path_len = document.dtw_path.len(),
            segments = document.segment_scores.len(),
            "loaded results document"
        );
        Ok(document)
    }

    pub fn reference_sequence(&self) -> KeypointSequence {
        KeypointSequence::new(self.ref_keypoints.clone(), self.ref_fps)
    }

    pub fn attempt_sequence(&self) -> KeypointSequence {
        KeypointSequence::new(self.user_keypoints.clone(), self.user_fps)
    }

    fn validate(&self) -> Result<()> {
        for (label, fps) in [("ref_fps", self.ref_fps), ("user_fps", self.user_fps)] {
            if !fps.is_finite() || fps <= 0.0 {
                return Err(PoseSyncError::InvalidDocument(format!(
                    "`{label}` must be a positive frame rate, got {fps}"
                )));
            }
        }
        Ok(())
    }
}
