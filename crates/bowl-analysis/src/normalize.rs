//! Torso-relative keypoint normalization.
//!
//! Positions are translated so the hip center sits at the origin and scaled
//! by the shoulder-to-hip distance, which makes poses comparable across
//! camera distance and framing.

use bowl_models::{Keypoint, PoseFrame, PoseSequence};

const LEFT_SHOULDER: usize = 5;
const RIGHT_SHOULDER: usize = 6;
const LEFT_HIP: usize = 11;
const RIGHT_HIP: usize = 12;

/// Torso lengths below this are treated as a degenerate pose.
const MIN_TORSO_LENGTH: f32 = 1e-5;

fn midpoint(a: &Keypoint, b: &Keypoint) -> (f32, f32) {
    ((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

/// Normalize one raw frame.
///
/// Frames without exactly 17 joints are returned unchanged. A degenerate
/// torso (detector failure, collapsed pose) scales by 1.0 so the frame is
/// only translated.
pub fn normalize_frame(frame: &PoseFrame) -> PoseFrame {
    if !frame.is_well_formed() {
        return frame.clone();
    }

    let kps = &frame.keypoints;
    let (sx, sy) = midpoint(&kps[LEFT_SHOULDER], &kps[RIGHT_SHOULDER]);
    let (hx, hy) = midpoint(&kps[LEFT_HIP], &kps[RIGHT_HIP]);

    let mut torso = ((sx - hx).powi(2) + (sy - hy).powi(2)).sqrt();
    if torso < MIN_TORSO_LENGTH {
        torso = 1.0;
    }

    PoseFrame::new(
        kps.iter()
            .map(|kp| Keypoint::new((kp.x - hx) / torso, (kp.y - hy) / torso, kp.confidence))
            .collect(),
    )
}

/// Normalize every frame of a raw sequence.
pub fn normalize_sequence(raw: &PoseSequence) -> PoseSequence {
    raw.iter().map(normalize_frame).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upright_frame() -> PoseFrame {
        let mut frame = PoseFrame::uniform(0.5, 0.5, 0.9);
        frame.keypoints[LEFT_SHOULDER] = Keypoint::new(0.4, 0.3, 0.9);
        frame.keypoints[RIGHT_SHOULDER] = Keypoint::new(0.6, 0.3, 0.9);
        frame.keypoints[LEFT_HIP] = Keypoint::new(0.4, 0.5, 0.9);
        frame.keypoints[RIGHT_HIP] = Keypoint::new(0.6, 0.5, 0.9);
        frame.keypoints[0] = Keypoint::new(0.5, 0.1, 0.8);
        frame
    }

    #[test]
    fn test_hip_center_becomes_origin() {
        let normalized = normalize_frame(&upright_frame());

        let lh = normalized.keypoints[LEFT_HIP];
        let rh = normalized.keypoints[RIGHT_HIP];
        assert!(((lh.x + rh.x) / 2.0).abs() < 1e-6);
        assert!(((lh.y + rh.y) / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_scaled_by_torso_length() {
        // Torso is 0.2 long; the head sits 0.4 above the hip center.
        let normalized = normalize_frame(&upright_frame());
        let head = normalized.keypoints[0];
        assert!((head.x - 0.0).abs() < 1e-5);
        assert!((head.y + 2.0).abs() < 1e-5);
        assert_eq!(head.confidence, 0.8);
    }

    #[test]
    fn test_scale_invariance() {
        let frame = upright_frame();
        let mut zoomed = frame.clone();
        for kp in &mut zoomed.keypoints {
            kp.x = 0.1 + kp.x * 0.5;
            kp.y = 0.2 + kp.y * 0.5;
        }

        let a = normalize_frame(&frame).flatten();
        let b = normalize_frame(&zoomed).flatten();
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-4);
        }
    }

    #[test]
    fn test_degenerate_torso_translates_only() {
        let frame = PoseFrame::uniform(0.3, 0.7, 0.5);
        let normalized = normalize_frame(&frame);
        for kp in &normalized.keypoints {
            assert_eq!(kp.x, 0.0);
            assert_eq!(kp.y, 0.0);
            assert!(kp.x.is_finite());
        }
    }

    #[test]
    fn test_malformed_frame_passes_through() {
        let frame = PoseFrame::new(vec![Keypoint::new(0.2, 0.3, 0.9); 5]);
        assert_eq!(normalize_frame(&frame), frame);
    }

    #[test]
    fn test_sequence_keeps_length() {
        let raw = PoseSequence::repeated(upright_frame(), 7);
        assert_eq!(normalize_sequence(&raw).len(), 7);
    }
}
