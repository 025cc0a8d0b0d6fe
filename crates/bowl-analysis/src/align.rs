//! Dynamic time warping between a reference and a test pose sequence.
//!
//! Frames are compared as flattened 34-dimensional vectors (x, y per joint,
//! confidence dropped) under Euclidean distance. The full cumulative-cost
//! matrix is built, so the path is the exact optimum rather than an
//! approximation.

use bowl_models::{FlatPose, PoseSequence};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalysisError, AnalysisResult};
use crate::round2;

/// Warping path as `(ref_index, test_index)` pairs from `(0, 0)` to
/// `(last_ref, last_test)`, non-decreasing in both components.
pub type AlignmentPath = Vec<(usize, usize)>;

/// Result of aligning two sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    /// Accumulated cost along the optimal path
    pub distance: f64,
    pub path: AlignmentPath,
}

impl Alignment {
    /// Similarity score in `[0, 100]` derived from the distance.
    pub fn similarity(&self) -> f64 {
        similarity_score(self.distance)
    }
}

fn euclidean(a: &FlatPose, b: &FlatPose) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Cumulative cost matrix with an infinite border row and column.
struct CostMatrix {
    cols: usize,
    cells: Vec<f64>,
}

impl CostMatrix {
    fn new(rows: usize, cols: usize) -> Self {
        let mut cells = vec![f64::INFINITY; rows * cols];
        cells[0] = 0.0;
        Self { cols, cells }
    }

    #[inline]
    fn get(&self, i: usize, j: usize) -> f64 {
        self.cells[i * self.cols + j]
    }

    #[inline]
    fn set(&mut self, i: usize, j: usize, value: f64) {
        self.cells[i * self.cols + j] = value;
    }
}

/// Align two normalized sequences.
///
/// Both sequences must be non-empty. Ties between predecessor cells resolve
/// diagonal first, then up (reference advances), then left (test advances),
/// so the path is reproducible.
pub fn align_sequences(reference: &PoseSequence, test: &PoseSequence) -> AnalysisResult<Alignment> {
    if reference.is_empty() {
        return Err(AnalysisError::EmptySequence { which: "reference" });
    }
    if test.is_empty() {
        return Err(AnalysisError::EmptySequence { which: "test" });
    }

    let ref_flat = reference.flatten();
    let test_flat = test.flatten();
    Ok(align_flat(&ref_flat, &test_flat))
}

fn align_flat(reference: &[FlatPose], test: &[FlatPose]) -> Alignment {
    let n = reference.len();
    let m = test.len();
    let mut cost = CostMatrix::new(n + 1, m + 1);

    for i in 1..=n {
        for j in 1..=m {
            let d = euclidean(&reference[i - 1], &test[j - 1]);
            let best = cost
                .get(i - 1, j - 1)
                .min(cost.get(i - 1, j))
                .min(cost.get(i, j - 1));
            cost.set(i, j, d + best);
        }
    }

    let distance = cost.get(n, m);
    let path = backtrack(&cost, n, m);

    debug!(
        ref_len = n,
        test_len = m,
        path_len = path.len(),
        distance,
        "DTW alignment complete"
    );

    Alignment { distance, path }
}

fn backtrack(cost: &CostMatrix, n: usize, m: usize) -> AlignmentPath {
    let mut path = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n, m);

    loop {
        path.push((i - 1, j - 1));
        if i == 1 && j == 1 {
            break;
        }

        let diag = cost.get(i - 1, j - 1);
        let up = cost.get(i - 1, j);
        let left = cost.get(i, j - 1);

        if diag <= up && diag <= left {
            i -= 1;
            j -= 1;
        } else if up <= left {
            i -= 1;
        } else {
            j -= 1;
        }
    }

    path.reverse();
    path
}

/// Map a DTW distance onto a `[0, 100]` similarity score.
///
/// `100 / (1 + ln(1 + d) / 5)`, rounded to two decimals: small distances
/// barely penalize, large ones approach zero asymptotically.
pub fn similarity_score(distance: f64) -> f64 {
    if distance <= 0.0 {
        return 100.0;
    }
    round2(100.0 / (1.0 + distance.ln_1p() / 5.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bowl_models::{Keypoint, PoseFrame};

    fn frame_at(offset: f32) -> PoseFrame {
        PoseFrame::new(
            (0..17)
                .map(|j| Keypoint::new(j as f32 * 0.1 + offset, offset * 2.0, 1.0))
                .collect(),
        )
    }

    fn ramp(values: &[f32]) -> PoseSequence {
        values.iter().map(|v| frame_at(*v)).collect()
    }

    fn assert_monotonic(path: &AlignmentPath, n: usize, m: usize) {
        assert_eq!(path.first(), Some(&(0, 0)));
        assert_eq!(path.last(), Some(&(n - 1, m - 1)));
        for pair in path.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert!(b.0 >= a.0 && b.1 >= a.1, "path went backwards: {:?} -> {:?}", a, b);
            assert!(b.0 - a.0 <= 1 && b.1 - a.1 <= 1, "path skipped: {:?} -> {:?}", a, b);
            assert_ne!(a, b);
        }
        assert!(path.len() >= n.max(m));
    }

    #[test]
    fn test_self_alignment_is_identity() {
        let seq = ramp(&[0.0, 0.1, 0.3, 0.2, 0.5, 0.4]);
        let alignment = align_sequences(&seq, &seq).unwrap();

        assert_eq!(alignment.distance, 0.0);
        assert_eq!(alignment.similarity(), 100.0);
        let identity: AlignmentPath = (0..seq.len()).map(|i| (i, i)).collect();
        assert_eq!(alignment.path, identity);
    }

    #[test]
    fn test_constant_sequences_prefer_diagonal() {
        let a = PoseSequence::repeated(frame_at(0.2), 300);
        let b = PoseSequence::repeated(frame_at(0.2), 300);
        let alignment = align_sequences(&a, &b).unwrap();

        assert_eq!(alignment.distance, 0.0);
        assert_eq!(alignment.path.len(), 300);
        assert!(alignment.path.iter().all(|(i, j)| i == j));
    }

    #[test]
    fn test_stretched_sequence_aligns_with_zero_cost() {
        let reference = ramp(&[0.0, 0.1, 0.2, 0.3]);
        let test = ramp(&[0.0, 0.0, 0.1, 0.1, 0.2, 0.2, 0.3, 0.3]);
        let alignment = align_sequences(&reference, &test).unwrap();

        assert!(alignment.distance.abs() < 1e-9);
        assert_monotonic(&alignment.path, reference.len(), test.len());
        assert_eq!(alignment.path.len(), test.len());
    }

    #[test]
    fn test_path_monotonic_for_unequal_lengths() {
        let reference = ramp(&[0.0, 0.4, 0.1, 0.9, 0.3, 0.3, 0.7]);
        let test = ramp(&[0.2, 0.8, 0.5]);
        let alignment = align_sequences(&reference, &test).unwrap();
        assert_monotonic(&alignment.path, reference.len(), test.len());

        let alignment = align_sequences(&test, &reference).unwrap();
        assert_monotonic(&alignment.path, test.len(), reference.len());
    }

    #[test]
    fn test_single_frame_sequences() {
        let a = ramp(&[0.0]);
        let b = ramp(&[0.5, 0.6]);
        let alignment = align_sequences(&a, &b).unwrap();

        assert_eq!(alignment.path, vec![(0, 0), (0, 1)]);
        assert!(alignment.distance > 0.0);
    }

    #[test]
    fn test_empty_sequences_rejected() {
        let seq = ramp(&[0.0, 0.1]);
        let empty = PoseSequence::default();

        assert!(matches!(
            align_sequences(&empty, &seq),
            Err(AnalysisError::EmptySequence { which: "reference" })
        ));
        assert!(matches!(
            align_sequences(&seq, &empty),
            Err(AnalysisError::EmptySequence { which: "test" })
        ));
    }

    #[test]
    fn test_similarity_score_shape() {
        assert_eq!(similarity_score(0.0), 100.0);
        assert_eq!(similarity_score(-3.0), 100.0);

        // 100 / (1 + ln(1 + e^5 - 1) / 5) = 50
        let d = 5f64.exp() - 1.0;
        assert!((similarity_score(d) - 50.0).abs() < 0.01);

        let mut previous = similarity_score(0.0);
        for d in [0.01, 0.5, 1.0, 10.0, 100.0, 1e4, 1e8] {
            let score = similarity_score(d);
            assert!(score <= previous, "score increased at distance {}", d);
            assert!(score > 0.0);
            previous = score;
        }
    }

    #[test]
    fn test_similarity_rounded_to_two_decimals() {
        let score = similarity_score(12.345);
        assert_eq!(score, (score * 100.0).round() / 100.0);
    }
}
