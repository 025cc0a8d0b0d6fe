//! Joint error aggregation and feedback composition.

use bowl_models::JOINT_COUNT;
use serde::{Deserialize, Serialize};

use crate::classify::ClassifiedSequence;
use crate::deviation::{joint_magnitudes, DeviationFrame};
use crate::round2;

/// Number of top offending joints reported by default.
pub const DEFAULT_TOP_K: usize = 4;

/// Joint deviations at or below this magnitude are jitter, not error.
pub const JOINT_NOISE_FLOOR: f32 = 0.1;

/// One feedback sentence per joint index.
const JOINT_FEEDBACK: [&str; JOINT_COUNT] = [
    "Your head position is wobbling.",
    "Stabilize the movement of your left shoulder.",
    "Stabilize the movement of your right shoulder.",
    "Keep your left elbow more fixed.",
    "Keep your right elbow more fixed.",
    "Your left arm movement is unstable.",
    "Your right arm movement is unstable.",
    "Your left wrist is shaking a lot.",
    "Your right wrist is shaking a lot.",
    "Your left hand is shaking noticeably.",
    "Your right hand is shaking noticeably.",
    "Stabilize the movement of your left hip.",
    "Your right hip is swaying noticeably.",
    "Lock your left knee to hold a stable posture.",
    "Keep your right knee position consistent.",
    "Your left foot is shaking noticeably.",
    "Reduce the wobble in your right foot.",
];

/// Feedback sentence for a joint index, if the index is a known joint.
pub fn joint_feedback(joint: usize) -> Option<&'static str> {
    JOINT_FEEDBACK.get(joint).copied()
}

/// Accumulated deviation magnitude per joint over abnormal frames.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct JointErrorProfile {
    pub errors: [f64; JOINT_COUNT],
}

impl JointErrorProfile {
    pub fn error(&self, joint: usize) -> f64 {
        self.errors.get(joint).copied().unwrap_or(0.0)
    }

    /// Up to `k` joints with strictly positive error, largest first.
    /// Equal errors keep ascending joint order.
    pub fn top_joints(&self, k: usize) -> Vec<usize> {
        let mut ranked: Vec<usize> = (0..JOINT_COUNT).filter(|j| self.errors[*j] > 0.0).collect();
        ranked.sort_by(|a, b| self.errors[*b].total_cmp(&self.errors[*a]));
        ranked.truncate(k);
        ranked
    }
}

/// Sum per-joint magnitudes above [`JOINT_NOISE_FLOOR`] over frames
/// labeled abnormal. Frames beyond the shorter of the two inputs are ignored.
pub fn accumulate_joint_errors(
    deviations: &[DeviationFrame],
    classified: &ClassifiedSequence,
) -> JointErrorProfile {
    let mut profile = JointErrorProfile::default();

    for (deviation, label) in deviations.iter().zip(classified.labels.iter()) {
        if !label.is_abnormal() {
            continue;
        }
        for (joint, mag) in joint_magnitudes(deviation).iter().enumerate() {
            if *mag > JOINT_NOISE_FLOOR {
                profile.errors[joint] += f64::from(*mag);
            }
        }
    }

    profile
}

/// Overall verdict tier, evaluated in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryTier {
    /// Stable and consistent form
    Stable,
    /// Generally acceptable with some imbalance
    Acceptable,
    /// Significant instability, correction needed
    NeedsCorrection,
}

impl SummaryTier {
    pub fn select(stability: f64, similarity: f64, abnormal_ratio: f64) -> Self {
        if stability >= 90.0 && similarity >= 80.0 && abnormal_ratio < 0.1 {
            SummaryTier::Stable
        } else if stability >= 75.0 {
            SummaryTier::Acceptable
        } else {
            SummaryTier::NeedsCorrection
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            SummaryTier::Stable => "Your form is stable and highly consistent.",
            SummaryTier::Acceptable => {
                "Generally good, but some imbalance was detected in parts of the motion."
            }
            SummaryTier::NeedsCorrection => "Your posture wobbles a lot and needs correction.",
        }
    }
}

/// Scores and human-readable feedback for one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackReport {
    /// DTW similarity score, 0-100
    pub similarity: f64,
    /// Classifier-derived stability score, 0-100
    pub stability: f64,
    pub abnormal_ratio: f64,
    pub tier: SummaryTier,
    pub top_joints: Vec<usize>,
    pub summary: String,
    pub joint_feedback: Vec<String>,
    pub profile: JointErrorProfile,
}

impl FeedbackReport {
    /// Full multi-line feedback text.
    pub fn text(&self) -> String {
        let mut text = format!(
            "**Analysis summary**\nStability: {:.2}\nSimilarity: {:.2}\n\n**Overall:** {}\n\n",
            self.stability, self.similarity, self.summary
        );

        if self.joint_feedback.is_empty() {
            text.push_str("All joints stayed stable throughout the motion.");
        } else {
            text.push_str("**Needs attention:**\n- ");
            text.push_str(&self.joint_feedback.join("\n- "));
        }
        text
    }
}

/// Aggregate joint errors and compose the feedback report.
pub fn build_feedback(
    similarity: f64,
    deviations: &[DeviationFrame],
    classified: &ClassifiedSequence,
    top_k: usize,
) -> FeedbackReport {
    let profile = accumulate_joint_errors(deviations, classified);
    let top_joints = profile.top_joints(top_k);

    let stability = round2(classified.confidence * 100.0);
    let abnormal_ratio = classified.abnormal_ratio();
    let tier = SummaryTier::select(stability, similarity, abnormal_ratio);

    let joint_feedback = top_joints
        .iter()
        .filter_map(|j| joint_feedback(*j))
        .map(str::to_string)
        .collect();

    FeedbackReport {
        similarity,
        stability,
        abnormal_ratio,
        tier,
        top_joints,
        summary: tier.summary().to_string(),
        joint_feedback,
        profile,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::FrameLabel;
    use bowl_models::FEATURE_DIM;

    fn classified(labels: Vec<FrameLabel>, confidence: f64) -> ClassifiedSequence {
        ClassifiedSequence { labels, confidence }
    }

    fn deviation_with(joint_offsets: &[(usize, f32)]) -> DeviationFrame {
        let mut d = [0.0; FEATURE_DIM];
        for (joint, offset) in joint_offsets {
            d[joint * 2] = *offset;
        }
        d
    }

    #[test]
    fn test_only_abnormal_frames_accumulate() {
        let deviations = vec![deviation_with(&[(3, 0.5)]), deviation_with(&[(4, 0.5)])];
        let labels = classified(vec![FrameLabel::Abnormal, FrameLabel::Normal], 0.5);

        let profile = accumulate_joint_errors(&deviations, &labels);
        assert!((profile.error(3) - 0.5).abs() < 1e-6);
        assert_eq!(profile.error(4), 0.0);
    }

    #[test]
    fn test_noise_floor_excludes_jitter() {
        let deviations = vec![deviation_with(&[(1, 0.1), (2, 0.11)])];
        let labels = classified(vec![FrameLabel::Abnormal], 0.9);

        let profile = accumulate_joint_errors(&deviations, &labels);
        assert_eq!(profile.error(1), 0.0);
        assert!(profile.error(2) > 0.0);
    }

    #[test]
    fn test_top_joints_ranked_and_bounded() {
        let mut profile = JointErrorProfile::default();
        profile.errors[2] = 1.0;
        profile.errors[7] = 3.0;
        profile.errors[5] = 1.0;
        profile.errors[11] = 2.0;
        profile.errors[16] = 0.5;

        assert_eq!(profile.top_joints(4), vec![7, 11, 2, 5]);
        assert_eq!(profile.top_joints(2), vec![7, 11]);
        assert!(profile.top_joints(0).is_empty());
    }

    #[test]
    fn test_top_joints_skip_zero_error() {
        let mut profile = JointErrorProfile::default();
        profile.errors[9] = 0.4;
        assert_eq!(profile.top_joints(4), vec![9]);
        assert!(JointErrorProfile::default().top_joints(4).is_empty());
    }

    #[test]
    fn test_tier_selection_order() {
        assert_eq!(SummaryTier::select(95.0, 85.0, 0.05), SummaryTier::Stable);
        // Similarity too low for tier one falls through to the stability check.
        assert_eq!(SummaryTier::select(95.0, 70.0, 0.05), SummaryTier::Acceptable);
        assert_eq!(SummaryTier::select(95.0, 85.0, 0.1), SummaryTier::Acceptable);
        assert_eq!(SummaryTier::select(75.0, 10.0, 0.9), SummaryTier::Acceptable);
        assert_eq!(SummaryTier::select(74.99, 100.0, 0.0), SummaryTier::NeedsCorrection);
    }

    #[test]
    fn test_build_feedback_scores() {
        let deviations = vec![deviation_with(&[(9, 0.8)]); 4];
        let labels = classified(
            vec![
                FrameLabel::Abnormal,
                FrameLabel::Normal,
                FrameLabel::Normal,
                FrameLabel::Normal,
            ],
            0.87654,
        );

        let report = build_feedback(72.5, &deviations, &labels, DEFAULT_TOP_K);
        assert_eq!(report.stability, 87.65);
        assert_eq!(report.abnormal_ratio, 0.25);
        assert_eq!(report.tier, SummaryTier::Acceptable);
        assert_eq!(report.top_joints, vec![9]);
        assert_eq!(report.joint_feedback, vec![JOINT_FEEDBACK[9].to_string()]);
    }

    #[test]
    fn test_feedback_text_lists_joints() {
        let deviations = vec![deviation_with(&[(9, 0.8), (15, 0.4)])];
        let labels = classified(vec![FrameLabel::Abnormal], 0.3);

        let text = build_feedback(40.0, &deviations, &labels, DEFAULT_TOP_K).text();
        assert!(text.contains("Stability: 30.00"));
        assert!(text.contains("Similarity: 40.00"));
        assert!(text.contains(SummaryTier::NeedsCorrection.summary()));
        assert!(text.contains("- Your left hand is shaking noticeably.\n- Your left foot"));
    }

    #[test]
    fn test_feedback_text_without_joints() {
        let labels = classified(vec![FrameLabel::Normal; 3], 0.95);
        let report = build_feedback(100.0, &[[0.0; FEATURE_DIM]; 3], &labels, DEFAULT_TOP_K);

        assert_eq!(report.tier, SummaryTier::Stable);
        assert!(report.text().ends_with("All joints stayed stable throughout the motion."));
    }

    #[test]
    fn test_empty_labels_are_defined() {
        let report = build_feedback(50.0, &[], &classified(vec![], 0.0), DEFAULT_TOP_K);
        assert_eq!(report.abnormal_ratio, 0.0);
        assert!(report.top_joints.is_empty());
    }

    #[test]
    fn test_joint_feedback_lookup() {
        assert!(joint_feedback(0).is_some());
        assert!(joint_feedback(16).is_some());
        assert!(joint_feedback(17).is_none());
    }
}
