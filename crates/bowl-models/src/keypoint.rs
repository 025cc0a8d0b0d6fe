//! Keypoints, pose frames and pose sequences.
//!
//! Joint indices 0-16 are a fixed contract shared with the keypoint detector.
//! A frame is expected to carry exactly [`JOINT_COUNT`] keypoints; frames that
//! do not are kept as-is so downstream stages can decide how to treat them.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Number of joints in a detector frame.
pub const JOINT_COUNT: usize = 17;

/// Dimensionality of a flattened frame (x, y per joint).
pub const FEATURE_DIM: usize = JOINT_COUNT * 2;

/// Confidence below which a keypoint is treated as not reliably detected.
pub const MIN_CONFIDENCE: f32 = 0.3;

/// A frame flattened to `[x0, y0, x1, y1, ...]`, confidence dropped.
pub type FlatPose = [f32; FEATURE_DIM];

/// A single joint position with detection confidence.
///
/// Serialized compactly as `[x, y, confidence]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    /// Whether the detector was confident enough about this joint.
    pub fn is_reliable(&self) -> bool {
        self.confidence >= MIN_CONFIDENCE
    }
}

impl JsonSchema for Keypoint {
    fn schema_name() -> String {
        "Keypoint".to_string()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        <[f32; 3]>::json_schema(gen)
    }
}

impl From<[f32; 3]> for Keypoint {
    fn from([x, y, confidence]: [f32; 3]) -> Self {
        Self { x, y, confidence }
    }
}

impl From<Keypoint> for [f32; 3] {
    fn from(kp: Keypoint) -> Self {
        [kp.x, kp.y, kp.confidence]
    }
}

/// One detector frame: an ordered set of keypoints indexed by joint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct PoseFrame {
    pub keypoints: Vec<Keypoint>,
}

impl PoseFrame {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    /// Frame with every joint at the same position and confidence.
    pub fn uniform(x: f32, y: f32, confidence: f32) -> Self {
        Self {
            keypoints: vec![Keypoint::new(x, y, confidence); JOINT_COUNT],
        }
    }

    /// Whether the frame has exactly [`JOINT_COUNT`] keypoints.
    pub fn is_well_formed(&self) -> bool {
        self.keypoints.len() == JOINT_COUNT
    }

    pub fn keypoint(&self, joint: usize) -> Option<&Keypoint> {
        self.keypoints.get(joint)
    }

    /// Flatten to x/y pairs. Missing joints flatten to zero and extra joints
    /// are ignored, so the result always has [`FEATURE_DIM`] entries.
    pub fn flatten(&self) -> FlatPose {
        let mut flat = [0.0; FEATURE_DIM];
        for (joint, kp) in self.keypoints.iter().take(JOINT_COUNT).enumerate() {
            flat[joint * 2] = kp.x;
            flat[joint * 2 + 1] = kp.y;
        }
        flat
    }
}

/// Ordered sequence of frames in capture order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct PoseSequence {
    pub frames: Vec<PoseFrame>,
}

impl PoseSequence {
    pub fn new(frames: Vec<PoseFrame>) -> Self {
        Self { frames }
    }

    /// `len` copies of the same frame.
    pub fn repeated(frame: PoseFrame, len: usize) -> Self {
        Self {
            frames: vec![frame; len],
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn push(&mut self, frame: PoseFrame) {
        self.frames.push(frame);
    }

    pub fn get(&self, index: usize) -> Option<&PoseFrame> {
        self.frames.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PoseFrame> {
        self.frames.iter()
    }

    /// Flatten every frame for alignment.
    pub fn flatten(&self) -> Vec<FlatPose> {
        self.frames.iter().map(PoseFrame::flatten).collect()
    }
}

impl FromIterator<PoseFrame> for PoseSequence {
    fn from_iter<I: IntoIterator<Item = PoseFrame>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}
