//! Per-step deviation vectors along an alignment path.

use bowl_models::{FlatPose, PoseSequence, FEATURE_DIM, JOINT_COUNT};

use crate::align::AlignmentPath;

/// `test - reference` for one aligned step, x/y per joint.
pub type DeviationFrame = FlatPose;

/// One deviation frame per alignment path step.
pub type DeviationSequence = Vec<DeviationFrame>;

/// Compute `test[j] - reference[i]` for every `(i, j)` on the path.
///
/// The path must come from aligning these same two sequences; its indices
/// are then always in bounds.
pub fn extract_deviations(
    reference: &PoseSequence,
    test: &PoseSequence,
    path: &AlignmentPath,
) -> DeviationSequence {
    let ref_flat = reference.flatten();
    let test_flat = test.flatten();

    path.iter()
        .map(|&(i, j)| {
            let mut diff = [0.0; FEATURE_DIM];
            for (d, (t, r)) in diff.iter_mut().zip(test_flat[j].iter().zip(ref_flat[i].iter())) {
                *d = t - r;
            }
            diff
        })
        .collect()
}

/// Euclidean magnitude of each joint's (dx, dy).
pub fn joint_magnitudes(deviation: &DeviationFrame) -> [f32; JOINT_COUNT] {
    let mut mags = [0.0; JOINT_COUNT];
    for (joint, mag) in mags.iter_mut().enumerate() {
        let dx = deviation[joint * 2];
        let dy = deviation[joint * 2 + 1];
        *mag = (dx * dx + dy * dy).sqrt();
    }
    mags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::align_sequences;
    use bowl_models::{Keypoint, PoseFrame};

    fn frame(offset: f32) -> PoseFrame {
        PoseFrame::new(
            (0..JOINT_COUNT)
                .map(|j| Keypoint::new(j as f32 * 0.05 + offset, 0.5 - offset, 1.0))
                .collect(),
        )
    }

    #[test]
    fn test_length_matches_path() {
        let reference: PoseSequence = [0.0, 0.2, 0.4, 0.1].iter().map(|v| frame(*v)).collect();
        let test: PoseSequence = [0.3, 0.1, 0.0, 0.2, 0.9, 0.5, 0.4]
            .iter()
            .map(|v| frame(*v))
            .collect();

        let alignment = align_sequences(&reference, &test).unwrap();
        let deviations = extract_deviations(&reference, &test, &alignment.path);
        assert_eq!(deviations.len(), alignment.path.len());
    }

    #[test]
    fn test_difference_direction() {
        let reference = PoseSequence::new(vec![frame(0.0)]);
        let test = PoseSequence::new(vec![frame(0.25)]);
        let deviations = extract_deviations(&reference, &test, &vec![(0, 0)]);

        let d = &deviations[0];
        for joint in 0..JOINT_COUNT {
            assert!((d[joint * 2] - 0.25).abs() < 1e-6);
            assert!((d[joint * 2 + 1] + 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn test_joint_magnitudes() {
        let mut deviation = [0.0; FEATURE_DIM];
        deviation[18] = 3.0;
        deviation[19] = 4.0;

        let mags = joint_magnitudes(&deviation);
        assert_eq!(mags[9], 5.0);
        assert_eq!(mags.iter().filter(|m| **m > 0.0).count(), 1);
    }
}
