//! Adapter between variable-length deviation sequences and the fixed-length
//! frame-wise classifier.
//!
//! The classifier for each motion category was trained on one sequence
//! length. Longer inputs are truncated, shorter ones are zero-padded at the
//! end (zero deviation reads as normal motion), and the per-step
//! probabilities are cut back to the original length before labeling.

use bowl_models::{FlatPose, MotionCategory, FEATURE_DIM};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::deviation::DeviationFrame;
use crate::error::{AnalysisError, AnalysisResult};
use crate::providers::SequenceClassifier;

/// Deviation sequences shorter than this carry too little motion to judge.
pub const MIN_SEQUENCE_LEN: usize = 200;

/// Probabilities strictly above this mark a frame abnormal.
pub const ABNORMAL_PROBABILITY: f32 = 0.5;

/// Classification of one aligned step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum FrameLabel {
    Normal,
    Abnormal,
}

impl FrameLabel {
    pub fn from_probability(probability: f32) -> Self {
        if probability > ABNORMAL_PROBABILITY {
            FrameLabel::Abnormal
        } else {
            FrameLabel::Normal
        }
    }

    pub fn is_abnormal(&self) -> bool {
        matches!(self, FrameLabel::Abnormal)
    }
}

impl From<FrameLabel> for u8 {
    fn from(label: FrameLabel) -> Self {
        match label {
            FrameLabel::Normal => 0,
            FrameLabel::Abnormal => 1,
        }
    }
}

impl TryFrom<u8> for FrameLabel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FrameLabel::Normal),
            1 => Ok(FrameLabel::Abnormal),
            other => Err(format!("invalid frame label {}", other)),
        }
    }
}

/// Per-frame labels plus a sequence-level confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedSequence {
    /// One label per original (pre-padding) deviation frame
    pub labels: Vec<FrameLabel>,
    /// Mean classifier probability over the original length, in `[0, 1]`
    pub confidence: f64,
}

impl ClassifiedSequence {
    pub fn abnormal_count(&self) -> usize {
        self.labels.iter().filter(|l| l.is_abnormal()).count()
    }

    /// Share of abnormal labels; zero when there are no labels.
    pub fn abnormal_ratio(&self) -> f64 {
        if self.labels.is_empty() {
            return 0.0;
        }
        self.abnormal_count() as f64 / self.labels.len() as f64
    }
}

/// Truncate or zero-pad a sequence to exactly `expected` frames.
pub fn fit_to_length(sequence: &[DeviationFrame], expected: usize) -> Vec<FlatPose> {
    let mut fitted: Vec<FlatPose> = sequence.iter().take(expected).copied().collect();
    fitted.resize(expected, [0.0; FEATURE_DIM]);
    fitted
}

/// Turn classifier probabilities into labels and a confidence.
///
/// Only the first `original_len` probabilities count; padding steps are
/// discarded. A classifier that returns a different number of steps than
/// it was given is logged as an anomaly and used as far as it reaches.
pub fn interpret_probabilities(
    probabilities: &[f32],
    original_len: usize,
    expected_len: usize,
) -> AnalysisResult<ClassifiedSequence> {
    if probabilities.len() != expected_len {
        warn!(
            returned = probabilities.len(),
            expected = expected_len,
            "Classifier returned an unexpected number of steps"
        );
    }

    let used = &probabilities[..original_len.min(probabilities.len())];
    if used.is_empty() {
        return Err(AnalysisError::ClassifierOutput(
            "no per-step probabilities returned".to_string(),
        ));
    }
    if let Some(bad) = used.iter().find(|p| !p.is_finite()) {
        return Err(AnalysisError::ClassifierOutput(format!(
            "non-finite probability {}",
            bad
        )));
    }

    let labels = used.iter().map(|p| FrameLabel::from_probability(*p)).collect();
    let confidence = used.iter().map(|p| f64::from(*p)).sum::<f64>() / used.len() as f64;

    Ok(ClassifiedSequence {
        labels,
        confidence: confidence.clamp(0.0, 1.0),
    })
}

/// Run the classifier over a deviation sequence of any length.
///
/// Fails with [`AnalysisError::SequenceTooShort`] before invoking the
/// classifier when fewer than [`MIN_SEQUENCE_LEN`] frames are available.
pub async fn classify_deviations<C>(
    classifier: &C,
    deviations: &[DeviationFrame],
    category: &MotionCategory,
) -> AnalysisResult<ClassifiedSequence>
where
    C: SequenceClassifier + ?Sized,
{
    let original_len = deviations.len();
    let expected_len = category.expected_sequence_len();

    info!(
        category = %category,
        input_frames = original_len,
        expected_frames = expected_len,
        classifier = classifier.name(),
        "Classifying deviation sequence"
    );

    if original_len < MIN_SEQUENCE_LEN {
        return Err(AnalysisError::SequenceTooShort {
            len: original_len,
            min: MIN_SEQUENCE_LEN,
        });
    }

    if original_len > expected_len {
        debug!("Truncating deviation sequence {} -> {}", original_len, expected_len);
    } else if original_len < expected_len {
        debug!("Padding deviation sequence {} -> {}", original_len, expected_len);
    }
    let fitted = fit_to_length(deviations, expected_len);

    let probabilities = classifier.classify(&fitted, category).await?;
    let classified = interpret_probabilities(&probabilities, original_len, expected_len)?;

    info!(
        category = %category,
        frames = classified.labels.len(),
        abnormal = classified.abnormal_count(),
        confidence = classified.confidence,
        "Classification complete"
    );

    Ok(classified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Returns a fixed probability per step and records what it was given.
    struct FixedClassifier {
        probability: f32,
        calls: AtomicUsize,
        seen_len: Mutex<Option<usize>>,
    }

    impl FixedClassifier {
        fn new(probability: f32) -> Self {
            Self {
                probability,
                calls: AtomicUsize::new(0),
                seen_len: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl SequenceClassifier for FixedClassifier {
        async fn classify(
            &self,
            sequence: &[FlatPose],
            _category: &MotionCategory,
        ) -> AnalysisResult<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen_len.lock().unwrap() = Some(sequence.len());
            Ok(vec![self.probability; sequence.len()])
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn deviations(len: usize, value: f32) -> Vec<DeviationFrame> {
        vec![[value; FEATURE_DIM]; len]
    }

    #[tokio::test]
    async fn test_too_short_fails_before_classifier() {
        let classifier = FixedClassifier::new(0.1);
        let result =
            classify_deviations(&classifier, &deviations(150, 0.0), &MotionCategory::Stroker).await;

        assert!(matches!(
            result,
            Err(AnalysisError::SequenceTooShort { len: 150, min: 200 })
        ));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_padding_round_trip_keeps_original_length() {
        let classifier = FixedClassifier::new(0.2);
        let category = MotionCategory::Cranker; // expects 375
        let result = classify_deviations(&classifier, &deviations(250, 0.0), &category)
            .await
            .unwrap();

        assert_eq!(*classifier.seen_len.lock().unwrap(), Some(375));
        assert_eq!(result.labels.len(), 250);
        assert!((result.confidence - 0.2).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_truncation_to_expected_length() {
        let classifier = FixedClassifier::new(0.9);
        let category = MotionCategory::Stroker; // expects 268
        let result = classify_deviations(&classifier, &deviations(400, 0.3), &category)
            .await
            .unwrap();

        assert_eq!(*classifier.seen_len.lock().unwrap(), Some(268));
        assert_eq!(result.labels.len(), 268);
        assert!(result.labels.iter().all(|l| l.is_abnormal()));
    }

    #[tokio::test]
    async fn test_exact_length_passes_through() {
        let classifier = FixedClassifier::new(0.4);
        let category = MotionCategory::Custom("hook".to_string());
        let result = classify_deviations(&classifier, &deviations(278, 0.0), &category)
            .await
            .unwrap();

        assert_eq!(*classifier.seen_len.lock().unwrap(), Some(278));
        assert_eq!(result.labels.len(), 278);
        assert_eq!(result.abnormal_count(), 0);
    }

    #[test]
    fn test_fit_to_length_pads_with_zero() {
        let fitted = fit_to_length(&deviations(3, 1.0), 5);
        assert_eq!(fitted.len(), 5);
        assert_eq!(fitted[2], [1.0; FEATURE_DIM]);
        assert_eq!(fitted[3], [0.0; FEATURE_DIM]);
        assert_eq!(fitted[4], [0.0; FEATURE_DIM]);

        assert_eq!(fit_to_length(&deviations(8, 1.0), 5).len(), 5);
    }

    #[test]
    fn test_threshold_is_strict() {
        let probs = [0.5, 0.51, 0.49, 1.0];
        let classified = interpret_probabilities(&probs, 4, 4).unwrap();
        assert_eq!(
            classified.labels,
            vec![
                FrameLabel::Normal,
                FrameLabel::Abnormal,
                FrameLabel::Normal,
                FrameLabel::Abnormal
            ]
        );
        assert!((classified.abnormal_ratio() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_ignores_padding() {
        // Original length 2; padded tail scored high must not count.
        let probs = [0.2, 0.4, 0.9, 0.9];
        let classified = interpret_probabilities(&probs, 2, 4).unwrap();
        assert_eq!(classified.labels.len(), 2);
        assert!((classified.confidence - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_short_classifier_output_is_used_as_far_as_it_reaches() {
        let classified = interpret_probabilities(&[0.7], 250, 310).unwrap();
        assert_eq!(classified.labels, vec![FrameLabel::Abnormal]);
    }

    #[test]
    fn test_empty_or_invalid_output_rejected() {
        assert!(interpret_probabilities(&[], 250, 310).is_err());
        assert!(interpret_probabilities(&[f32::NAN, 0.1], 2, 2).is_err());
    }

    #[test]
    fn test_label_serializes_as_bit() {
        let json = serde_json::to_string(&vec![FrameLabel::Normal, FrameLabel::Abnormal]).unwrap();
        assert_eq!(json, "[0,1]");
    }
}
