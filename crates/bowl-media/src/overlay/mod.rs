//! Deviation overlay rendering.
//!
//! Each output frame is the source frame on a white padded canvas with the
//! detected skeleton drawn over it. Edges whose endpoints deviate strongly
//! from the reference are drawn red and thick, the rest green and thin, and
//! the top offending joints get a filled marker.

mod renderer;

pub use renderer::{
    default_worker_count, map_ordered, OverlayPlan, OverlayRenderer, RenderConfig, RenderFn,
};

use bowl_analysis::{joint_magnitudes, DeviationFrame};
use bowl_models::{PoseFrame, JOINT_COUNT};
use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

/// Body graph: 16 joint pairs over the 17-joint layout.
pub const SKELETON_EDGES: [(usize, usize); 16] = [
    (0, 1),
    (1, 3),
    (0, 2),
    (2, 4),
    (5, 7),
    (7, 9),
    (6, 8),
    (8, 10),
    (5, 6),
    (5, 11),
    (6, 12),
    (11, 12),
    (11, 13),
    (13, 15),
    (12, 14),
    (14, 16),
];

const RED: Rgb<u8> = Rgb([255, 0, 0]);
const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Drawing parameters for one overlay frame.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    /// White rows added above and below the frame
    pub padding: u32,
    /// Mean endpoint severity above which an edge is flagged
    pub severity_threshold: f32,
    /// Keypoints below this confidence are not drawn
    pub confidence_floor: f32,
    pub flagged_thickness: u32,
    pub normal_thickness: u32,
    pub marker_radius: i32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            padding: 40,
            severity_threshold: 0.22,
            confidence_floor: 0.3,
            flagged_thickness: 4,
            normal_thickness: 2,
            marker_radius: 6,
        }
    }
}

impl OverlayStyle {
    /// Canvas size for a source frame of `width` x `height`.
    pub fn canvas_size(&self, width: u32, height: u32) -> (u32, u32) {
        (width, height + self.padding * 2)
    }
}

/// Per-joint deviation magnitudes scaled so the largest is 1.
///
/// An all-zero frame stays all zero.
pub fn joint_severity(deviation: &DeviationFrame) -> [f32; JOINT_COUNT] {
    let mut mags = joint_magnitudes(deviation);
    let max = mags.iter().copied().fold(0.0f32, f32::max);
    let scale = if max > 0.0 { max } else { 1.0 };
    for mag in mags.iter_mut() {
        *mag /= scale;
    }
    mags
}

/// Render one overlay frame. Pure: depends only on its arguments.
pub fn render_frame(
    frame: &RgbImage,
    raw: &PoseFrame,
    deviation: &DeviationFrame,
    top_joints: &[usize],
    style: &OverlayStyle,
) -> RgbImage {
    let (width, height) = (frame.width(), frame.height());
    let (canvas_w, canvas_h) = style.canvas_size(width, height);

    let mut canvas = RgbImage::from_pixel(canvas_w, canvas_h, WHITE);
    imageops::replace(&mut canvas, frame, 0, i64::from(style.padding));

    let severity = joint_severity(deviation);
    let to_canvas = |joint: usize| -> Option<(f32, f32)> {
        let kp = raw.keypoint(joint)?;
        if kp.confidence < style.confidence_floor {
            return None;
        }
        let x = (kp.x * width as f32).trunc();
        let y = (kp.y * height as f32).trunc() + style.padding as f32;
        Some((x, y))
    };

    for &(a, b) in SKELETON_EDGES.iter() {
        let (Some(start), Some(end)) = (to_canvas(a), to_canvas(b)) else {
            continue;
        };

        let flagged = (severity[a] + severity[b]) / 2.0 > style.severity_threshold;
        let (color, thickness) = if flagged {
            (RED, style.flagged_thickness)
        } else {
            (GREEN, style.normal_thickness)
        };
        draw_thick_line(&mut canvas, start, end, thickness, color);
    }

    for &joint in top_joints {
        if let Some((x, y)) = to_canvas(joint) {
            draw_filled_circle_mut(&mut canvas, (x as i32, y as i32), style.marker_radius, RED);
        }
    }

    canvas
}

/// Line of the given pixel thickness, drawn as parallel one-pixel segments.
fn draw_thick_line(
    canvas: &mut RgbImage,
    start: (f32, f32),
    end: (f32, f32),
    thickness: u32,
    color: Rgb<u8>,
) {
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let length = (dx * dx + dy * dy).sqrt();

    if thickness <= 1 || length < f32::EPSILON {
        draw_line_segment_mut(canvas, start, end, color);
        return;
    }

    let (nx, ny) = (-dy / length, dx / length);
    let center = (thickness as f32 - 1.0) / 2.0;
    for t in 0..thickness {
        let offset = t as f32 - center;
        let (ox, oy) = (nx * offset, ny * offset);
        draw_line_segment_mut(
            canvas,
            (start.0 + ox, start.1 + oy),
            (end.0 + ox, end.1 + oy),
            color,
        );
    }
}
