//! End-to-end motion analysis for one request.
//!
//! Stages, in order: prepare (trim + orient), extract (detector per frame),
//! score (align, deviations, classify, feedback), render (overlay), encode.
//! The scoring path is independent of FFmpeg so it can run over any
//! `FrameSource`.

use async_trait::async_trait;
use bowl_analysis::{
    align_sequences, build_feedback, classify_deviations, extract_deviations, Alignment,
    ClassifiedSequence, DeviationSequence, FeedbackReport, KeypointDetector, KeypointSequences,
    SequenceClassifier, SequenceExtractor,
};
use bowl_media::{
    encode_for_delivery, intermediate_path, prepare_source, FfmpegRunner, FrameReader, FrameSink,
    FrameSource, MediaResult, OverlayPlan, OverlayRenderer, RawVideoWriter,
};
use bowl_models::{
    AnalysisReport, AnalysisRequest, DtwSummary, FrameRange, MotionCategory, RequestId,
    StabilitySummary,
};
use bowl_storage::ReferenceStore;
use chrono::Utc;
use image::RgbImage;
use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};

use crate::config::AnalysisConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::RequestLogger;
use crate::metrics;

/// Scores for one request, everything the report and overlay need.
#[derive(Debug, Clone)]
pub struct ScoredMotion {
    pub alignment: Alignment,
    pub similarity: f64,
    pub deviations: DeviationSequence,
    pub classified: ClassifiedSequence,
    pub feedback: FeedbackReport,
}

/// Motion analysis pipeline with its external collaborators.
pub struct AnalysisPipeline {
    config: AnalysisConfig,
    detector: Arc<dyn KeypointDetector>,
    classifier: Arc<dyn SequenceClassifier>,
    references: Arc<dyn ReferenceStore>,
    renderer: OverlayRenderer,
    runner: FfmpegRunner,
}

impl AnalysisPipeline {
    pub fn new(
        config: AnalysisConfig,
        detector: Arc<dyn KeypointDetector>,
        classifier: Arc<dyn SequenceClassifier>,
        references: Arc<dyn ReferenceStore>,
    ) -> WorkerResult<Self> {
        let renderer = OverlayRenderer::new(config.render.clone())?;
        let runner = FfmpegRunner::new().with_timeout(config.ffmpeg_timeout.as_secs());

        info!(
            detector = detector.name(),
            classifier = classifier.name(),
            render_workers = renderer.workers(),
            "Analysis pipeline ready"
        );

        Ok(Self {
            config,
            detector,
            classifier,
            references,
            renderer,
            runner,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run one request from source video to report.
    pub async fn run(&self, request: &AnalysisRequest) -> WorkerResult<AnalysisReport> {
        let logger = RequestLogger::new(&request.request_id, "motion_analysis");
        let span = logger.create_span();

        async {
            logger.log_start(&format!(
                "{} ({}) frames {}..{}",
                request.video_path.display(),
                request.category,
                request.range.start,
                request
                    .range
                    .end
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "end".to_string()),
            ));

            let result = self.run_inner(request, &logger).await;
            match &result {
                Ok(report) => {
                    metrics::record_request("success");
                    logger.log_completion(&format!(
                        "similarity {:.2}, stability {:.2}, output {}",
                        report.dtw.score,
                        report.stability.score,
                        report.comparison_video_path.display()
                    ));
                }
                Err(e) => {
                    metrics::record_request(e.stage());
                    logger.log_error(e.stage(), &e.to_string());
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_inner(
        &self,
        request: &AnalysisRequest,
        logger: &RequestLogger,
    ) -> WorkerResult<AnalysisReport> {
        request.validate().map_err(WorkerError::invalid_request)?;

        let work_dir = request_dir(&self.config.work_dir, &request.request_id)?;
        let output_dir = request_dir(&self.config.output_dir, &request.request_id)?;
        tokio::fs::create_dir_all(&work_dir).await?;
        tokio::fs::create_dir_all(&output_dir).await?;

        let result = self
            .process(request, &work_dir, &output_dir, logger)
            .await;

        if !self.config.keep_work_files {
            if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
                warn!(path = %work_dir.display(), error = %e, "Failed to clean work directory");
            }
        }
        result
    }

    async fn process(
        &self,
        request: &AnalysisRequest,
        work_dir: &Path,
        output_dir: &Path,
        logger: &RequestLogger,
    ) -> WorkerResult<AnalysisReport> {
        let prepared = timed(
            "prepare",
            prepare_source(
                &request.video_path,
                work_dir.join("source.mp4"),
                &request.range,
                &self.runner,
            ),
        )
        .await?;
        let (width, height) = (prepared.info.width, prepared.info.height);
        logger.log_progress(&format!(
            "prepared {}x{} clip{}",
            width,
            height,
            if prepared.rotated { " (rotated)" } else { "" }
        ));

        let mut reader = FrameReader::open(&prepared.path, width, height)?;
        let sequences = self.extract(&mut reader).await?;
        logger.log_progress(&format!("extracted {} keypoint frames", sequences.len()));
        if !sequences.dropped.is_empty() {
            logger.log_warning(&format!(
                "{} frames without keypoints were skipped",
                sequences.dropped.len()
            ));
        }

        let scored = self.score(&request.category, &sequences).await?;
        logger.log_progress(&format!(
            "scored: similarity {:.2}, {} abnormal of {} aligned frames",
            scored.similarity,
            scored.classified.abnormal_count(),
            scored.classified.labels.len()
        ));

        let output = output_dir.join(format!("comparison_{}.mp4", uuid::Uuid::new_v4().simple()));
        let raw_path = intermediate_path(&output);
        let (canvas_w, canvas_h) = self.config.render.style.canvas_size(width, height);

        let render_start = Instant::now();
        let mut source = FrameReader::open(&prepared.path, width, height)?;
        let mut writer = RawVideoWriter::create(&raw_path, canvas_w, canvas_h, prepared.info.fps)?;
        let rendered = self
            .render_overlay(&mut source, &sequences, &scored, &mut writer)
            .await;
        let rendered = match rendered {
            Ok(n) => n,
            Err(e) => {
                drop(writer);
                let _ = tokio::fs::remove_file(&raw_path).await;
                return Err(e);
            }
        };
        writer.finish().await?;
        metrics::record_stage("render", render_start.elapsed().as_secs_f64());
        logger.log_progress(&format!("rendered {} overlay frames", rendered));

        let output = timed(
            "encode",
            encode_for_delivery(&raw_path, &output, &self.config.encode, &self.runner),
        )
        .await?;

        Ok(build_report(
            request.request_id.clone(),
            request.category.clone(),
            &prepared.range,
            &scored,
            output,
        ))
    }

    /// Run the detector over every frame of `source` in capture order.
    pub async fn extract<S>(&self, source: &mut S) -> WorkerResult<KeypointSequences>
    where
        S: FrameSource + ?Sized,
    {
        let start = Instant::now();
        let mut extractor = SequenceExtractor::new();
        let mut index = 0usize;

        while let Some(frame) = source.next_frame().await? {
            let outcome = self.detector.detect(index, &frame).await;
            extractor.record(index, outcome);
            index += 1;
        }

        metrics::record_detection_failures(extractor.attempted() - extractor.kept());
        debug!(
            attempted = extractor.attempted(),
            kept = extractor.kept(),
            "Keypoint extraction finished"
        );

        let sequences = extractor.finish()?;
        metrics::record_stage("extract", start.elapsed().as_secs_f64());
        Ok(sequences)
    }

    /// Compare extracted keypoints against the category's reference.
    pub async fn score(
        &self,
        category: &MotionCategory,
        sequences: &KeypointSequences,
    ) -> WorkerResult<ScoredMotion> {
        let start = Instant::now();
        let reference = self.references.load(category).await?;

        let alignment = align_sequences(&reference, &sequences.normalized)?;
        let similarity = alignment.similarity();
        info!(
            category = %category,
            reference_frames = reference.len(),
            test_frames = sequences.normalized.len(),
            path_len = alignment.path.len(),
            distance = alignment.distance,
            similarity,
            "Sequences aligned"
        );

        let deviations = extract_deviations(&reference, &sequences.normalized, &alignment.path);
        let classified =
            classify_deviations(self.classifier.as_ref(), &deviations, category).await?;
        let feedback = build_feedback(similarity, &deviations, &classified, self.config.top_k);

        metrics::record_stage("score", start.elapsed().as_secs_f64());
        Ok(ScoredMotion {
            alignment,
            similarity,
            deviations,
            classified,
            feedback,
        })
    }

    /// Render the deviation overlay of `source` into `sink`.
    ///
    /// Frames the detector failed on are skipped so every rendered frame is
    /// paired with its own keypoints.
    pub async fn render_overlay<S, K>(
        &self,
        source: &mut S,
        sequences: &KeypointSequences,
        scored: &ScoredMotion,
        sink: &mut K,
    ) -> WorkerResult<usize>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let plan = OverlayPlan {
            raw: sequences.raw.clone(),
            normalized: sequences.normalized.clone(),
            labels: scored.classified.labels.clone(),
            deviations: scored.deviations.clone(),
            top_joints: scored.feedback.top_joints.clone(),
        };

        let mut kept = KeptFrames::new(source, &sequences.dropped);
        Ok(self.renderer.render(&mut kept, Arc::new(plan), sink).await?)
    }
}

/// Assemble the report for a scored request.
pub fn build_report(
    request_id: RequestId,
    category: MotionCategory,
    range: &FrameRange,
    scored: &ScoredMotion,
    comparison_video_path: PathBuf,
) -> AnalysisReport {
    let feedback = &scored.feedback;
    AnalysisReport {
        request_id,
        category,
        range: [range.start, range.end.unwrap_or(range.start)],
        dtw: DtwSummary {
            distance: round4(scored.alignment.distance),
            score: scored.similarity,
        },
        stability: StabilitySummary {
            score: feedback.stability,
            abnormal_ratio: feedback.abnormal_ratio,
        },
        top_joints: feedback.top_joints.clone(),
        summary: feedback.summary.clone(),
        joint_feedback: feedback.joint_feedback.clone(),
        feedback: feedback.text(),
        comparison_video_path,
        created_at: Utc::now(),
    }
}

/// Per-request directory directly under `root`.
fn request_dir(root: &Path, request_id: &RequestId) -> WorkerResult<PathBuf> {
    request_id.validate().map_err(WorkerError::invalid_request)?;
    let dir = root.join(request_id.as_str());
    if dir.parent() != Some(root) {
        return Err(WorkerError::invalid_request(format!(
            "request directory {} is not inside {}",
            dir.display(),
            root.display()
        )));
    }
    Ok(dir)
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

async fn timed<F, T>(stage: &'static str, fut: F) -> T
where
    F: Future<Output = T>,
{
    let start = Instant::now();
    let out = fut.await;
    metrics::record_stage(stage, start.elapsed().as_secs_f64());
    out
}

/// Frame source that skips the given capture indices.
struct KeptFrames<'a, S: ?Sized> {
    inner: &'a mut S,
    skip: HashSet<usize>,
    index: usize,
}

impl<'a, S: FrameSource + ?Sized> KeptFrames<'a, S> {
    fn new(inner: &'a mut S, skip: &[usize]) -> Self {
        Self {
            inner,
            skip: skip.iter().copied().collect(),
            index: 0,
        }
    }
}

#[async_trait]
impl<'a, S: FrameSource + ?Sized> FrameSource for KeptFrames<'a, S> {
    async fn next_frame(&mut self) -> MediaResult<Option<RgbImage>> {
        loop {
            let frame = self.inner.next_frame().await?;
            let index = self.index;
            self.index += 1;
            match frame {
                Some(_) if self.skip.contains(&index) => continue,
                other => return Ok(other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Frames(VecDeque<RgbImage>);

    #[async_trait]
    impl FrameSource for Frames {
        async fn next_frame(&mut self) -> MediaResult<Option<RgbImage>> {
            Ok(self.0.pop_front())
        }
    }

    #[tokio::test]
    async fn test_kept_frames_skips_dropped_indices() {
        let mut frames = Frames(
            (0..5u8)
                .map(|i| RgbImage::from_pixel(1, 1, image::Rgb([i, 0, 0])))
                .collect(),
        );
        let mut kept = KeptFrames::new(&mut frames, &[1, 3]);

        let mut seen = Vec::new();
        while let Some(frame) = kept.next_frame().await.unwrap() {
            seen.push(frame.get_pixel(0, 0).0[0]);
        }
        assert_eq!(seen, vec![0, 2, 4]);
    }

    #[test]
    fn test_request_dir_stays_under_root() {
        let root = Path::new("/work");
        assert_eq!(
            request_dir(root, &RequestId::from_string("abc-1")).unwrap(),
            PathBuf::from("/work/abc-1")
        );
        assert!(request_dir(root, &RequestId::from_string("")).is_err());
        assert!(request_dir(root, &RequestId::from_string("../..")).is_err());
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(1.234_567), 1.2346);
        assert_eq!(round4(0.0), 0.0);
    }
}
