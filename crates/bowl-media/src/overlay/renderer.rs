//! Parallel overlay rendering with strictly ordered output.
//!
//! Frames are decoded in batches. Each batch is rendered on a bounded rayon
//! pool, gathered back by index, and only then written to the sink in
//! increasing frame order.

use bowl_analysis::{DeviationFrame, FrameLabel};
use bowl_models::PoseSequence;
use image::RgbImage;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::{render_frame, OverlayStyle};
use crate::error::{MediaError, MediaResult};
use crate::frames::{FrameSink, FrameSource};
use crate::metrics;

/// Upper bound on render workers regardless of core count.
const MAX_RENDER_WORKERS: usize = 4;

/// `min(available cores, 4)`.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_RENDER_WORKERS)
}

/// Rendering configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Size of the render pool
    pub workers: usize,
    /// Frames decoded and rendered per round
    pub batch_size: usize,
    pub style: OverlayStyle,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            workers: default_worker_count(),
            batch_size: 64,
            style: OverlayStyle::default(),
        }
    }
}

impl RenderConfig {
    /// Create config from environment variables.
    ///
    /// `BOWL_RENDER_WORKERS` is capped at the default pool size.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            workers: std::env::var("BOWL_RENDER_WORKERS")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .map(|n| n.min(defaults.workers))
                .unwrap_or(defaults.workers),
            batch_size: std::env::var("BOWL_RENDER_BATCH")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.batch_size),
            style: defaults.style,
        }
    }
}

/// Everything the overlay needs besides the video frames.
#[derive(Debug, Clone, Default)]
pub struct OverlayPlan {
    pub raw: PoseSequence,
    pub normalized: PoseSequence,
    pub labels: Vec<FrameLabel>,
    pub deviations: Vec<DeviationFrame>,
    pub top_joints: Vec<usize>,
}

impl OverlayPlan {
    /// Number of frames every per-frame input covers.
    pub fn safe_len(&self) -> usize {
        self.raw
            .len()
            .min(self.normalized.len())
            .min(self.labels.len())
            .min(self.deviations.len())
    }

    fn is_consistent(&self) -> bool {
        let len = self.raw.len();
        self.normalized.len() == len && self.labels.len() == len && self.deviations.len() == len
    }
}

/// Per-frame render function: frame index and decoded frame in, canvas out.
pub type RenderFn = dyn Fn(usize, RgbImage) -> RgbImage + Send + Sync;

/// Bounded-pool overlay renderer.
pub struct OverlayRenderer {
    pool: Arc<ThreadPool>,
    config: RenderConfig,
}

impl OverlayRenderer {
    pub fn new(config: RenderConfig) -> MediaResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers.max(1))
            .thread_name(|i| format!("overlay-render-{}", i))
            .build()
            .map_err(|e| MediaError::internal(format!("Failed to build render pool: {}", e)))?;

        Ok(Self {
            pool: Arc::new(pool),
            config,
        })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render the overlay for every frame the plan covers.
    ///
    /// Returns the number of frames written.
    pub async fn render<S, K>(
        &self,
        source: &mut S,
        plan: Arc<OverlayPlan>,
        sink: &mut K,
    ) -> MediaResult<usize>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        if !plan.is_consistent() {
            warn!(
                raw = plan.raw.len(),
                normalized = plan.normalized.len(),
                labels = plan.labels.len(),
                deviations = plan.deviations.len(),
                "Overlay inputs differ in length, clamping to the shortest"
            );
        }

        let limit = plan.safe_len();
        let style = self.config.style.clone();
        let render: Arc<RenderFn> = Arc::new(move |index: usize, frame: RgbImage| {
            render_frame(
                &frame,
                &plan.raw.frames[index],
                &plan.deviations[index],
                &plan.top_joints,
                &style,
            )
        });

        self.render_with(source, sink, limit, render).await
    }

    /// Drive `render` over up to `limit` frames from `source` into `sink`.
    pub async fn render_with<S, K>(
        &self,
        source: &mut S,
        sink: &mut K,
        limit: usize,
        render: Arc<RenderFn>,
    ) -> MediaResult<usize>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let start = Instant::now();
        let batch_size = self.config.batch_size.max(1);
        let mut written = 0usize;

        info!(
            frames = limit,
            workers = self.workers(),
            batch_size,
            "Rendering overlay"
        );

        while written < limit {
            let mut batch = Vec::with_capacity(batch_size.min(limit - written));
            let mut exhausted = false;
            while batch.len() < batch_size && written + batch.len() < limit {
                match source.next_frame().await? {
                    Some(frame) => batch.push(frame),
                    None => {
                        exhausted = true;
                        break;
                    }
                }
            }

            if batch.is_empty() {
                if written == 0 {
                    return Err(MediaError::frame_read(0, "first frame unreadable"));
                }
                break;
            }

            let base = written;
            let pool = Arc::clone(&self.pool);
            let render = Arc::clone(&render);
            let rendered = tokio::task::spawn_blocking(move || {
                map_ordered(&pool, batch, |i, frame| render(base + i, frame))
            })
            .await
            .map_err(|e| MediaError::RenderFailed {
                frame: base,
                message: format!("render task failed: {}", e),
            })?;

            for frame in rendered.iter() {
                sink.write_frame(frame).await?;
            }
            written += rendered.len();
            metrics::record_frames_rendered(rendered.len());
            debug!(written, limit, "Overlay batch written");

            if exhausted {
                break;
            }
        }

        if written < limit {
            warn!(
                written,
                expected = limit,
                "Video ended before all analyzed frames were rendered"
            );
        }

        info!(
            frames = written,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Overlay rendered"
        );
        Ok(written)
    }
}

/// Indexed map on `pool`: results come back in input order, whatever
/// order the workers finish in.
pub fn map_ordered<T, R, F>(pool: &ThreadPool, items: Vec<T>, f: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(usize, T) -> R + Sync + Send,
{
    pool.install(|| {
        items
            .into_par_iter()
            .enumerate()
            .map(|(index, item)| f(index, item))
            .collect()
    })
}
