//! Keypoint sequence extraction around the external detector.
//!
//! Frames are fed in capture order. A frame the detector fails on is logged
//! and dropped; extraction only fails when no frame survives.

use bowl_models::{PoseFrame, PoseSequence};
use tracing::warn;

use crate::error::{AnalysisError, AnalysisResult};
use crate::normalize::normalize_frame;

/// Raw and normalized sequences sharing the same frame indexing.
#[derive(Debug, Clone, Default)]
pub struct KeypointSequences {
    /// Image-relative keypoints, as detected
    pub raw: PoseSequence,
    /// Torso-relative keypoints
    pub normalized: PoseSequence,
    /// Source frame indices that were dropped
    pub dropped: Vec<usize>,
}

impl KeypointSequences {
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

/// Accumulates detector results frame by frame.
#[derive(Debug, Default)]
pub struct SequenceExtractor {
    sequences: KeypointSequences,
    attempted: usize,
}

impl SequenceExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the detector outcome for source frame `frame`.
    ///
    /// Returns `true` when the frame was kept.
    pub fn record(&mut self, frame: usize, outcome: AnalysisResult<PoseFrame>) -> bool {
        self.attempted += 1;
        match outcome {
            Ok(raw) => {
                if !raw.is_well_formed() {
                    warn!(
                        frame,
                        joints = raw.keypoints.len(),
                        "Detector returned a malformed frame"
                    );
                }
                self.sequences.normalized.push(normalize_frame(&raw));
                self.sequences.raw.push(raw);
                true
            }
            Err(e) => {
                warn!(frame, error = %e, "Keypoint detection failed, dropping frame");
                self.sequences.dropped.push(frame);
                false
            }
        }
    }

    pub fn attempted(&self) -> usize {
        self.attempted
    }

    pub fn kept(&self) -> usize {
        self.sequences.len()
    }

    /// Finish extraction; at least one frame must have survived.
    pub fn finish(self) -> AnalysisResult<KeypointSequences> {
        if self.sequences.is_empty() {
            return Err(AnalysisError::NoKeypoints {
                attempted: self.attempted,
            });
        }
        Ok(self.sequences)
    }
}
