//! ML service HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use bowl_analysis::{AnalysisError, AnalysisResult, KeypointDetector, SequenceClassifier};
use bowl_models::{FlatPose, MotionCategory, PoseFrame, JOINT_COUNT};
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, RgbImage};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{MlError, MlResult};
use crate::types::{ClassifyRequest, ClassifyResponse, DetectRequest, DetectResponse, HealthResponse};

/// Configuration for ML client.
#[derive(Debug, Clone)]
pub struct MlClientConfig {
    /// Base URL of ML service
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries
    pub max_retries: u32,
    /// Base delay between retries, doubled per attempt
    pub retry_backoff: Duration,
}

impl Default for MlClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl MlClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("ML_SERVICE_URL").unwrap_or(defaults.base_url),
            timeout: std::env::var("ML_SERVICE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            max_retries: std::env::var("ML_SERVICE_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            retry_backoff: defaults.retry_backoff,
        }
    }
}

/// Client for the model-serving service.
pub struct MlClient {
    http: Client,
    config: MlClientConfig,
}

impl MlClient {
    /// Create a new ML client.
    pub fn new(config: MlClientConfig) -> MlResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(MlError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> MlResult<Self> {
        Self::new(MlClientConfig::from_env())
    }

    pub fn config(&self) -> &MlClientConfig {
        &self.config
    }

    /// Check if ML service is healthy.
    pub async fn health_check(&self) -> MlResult<bool> {
        let url = self.url("/health");

        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let health: HealthResponse = response.json().await?;
                Ok(health.status == "healthy" || health.status == "ok")
            }
            Ok(response) => {
                warn!("ML service health check failed: {}", response.status());
                Ok(false)
            }
            Err(e) => {
                warn!("ML service health check error: {}", e);
                Ok(false)
            }
        }
    }

    /// Detect 17 keypoints on one RGB frame.
    pub async fn detect_pose(&self, frame: &RgbImage) -> MlResult<PoseFrame> {
        let request = DetectRequest {
            image: encode_png_base64(frame)?,
            width: frame.width(),
            height: frame.height(),
        };

        let response: DetectResponse = self.post_json("/detect", &request).await?;
        if response.keypoints.len() != JOINT_COUNT {
            return Err(MlError::InvalidResponse(format!(
                "expected {} keypoints, got {}",
                JOINT_COUNT,
                response.keypoints.len()
            )));
        }

        Ok(PoseFrame::new(response.keypoints))
    }

    /// Score a deviation sequence frame by frame with the category's model.
    pub async fn classify_sequence(
        &self,
        sequence: &[FlatPose],
        category: &MotionCategory,
    ) -> MlResult<Vec<f32>> {
        let request = ClassifyRequest {
            category: category.as_str(),
            sequence: sequence.iter().map(|step| step.as_slice()).collect(),
        };

        debug!(category = %category, steps = sequence.len(), "Sending classification request");
        let response: ClassifyResponse = self.post_json("/classify", &request).await?;
        Ok(response.probabilities)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> MlResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path);

        let response = self
            .with_retry(|| async {
                let response = self
                    .http
                    .post(&url)
                    .json(body)
                    .send()
                    .await
                    .map_err(MlError::Network)?;
                check_status(response).await
            })
            .await?;

        Ok(response.json().await?)
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> MlResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = MlResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.retry_backoff * 2u32.pow(attempt);
                    warn!(
                        "ML request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Map non-success statuses to errors; overload statuses are retryable.
async fn check_status(response: Response) -> MlResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = format!("ML service returned {}: {}", status, body);
    match status {
        StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::BAD_GATEWAY
        | StatusCode::GATEWAY_TIMEOUT
        | StatusCode::TOO_MANY_REQUESTS => Err(MlError::ServiceUnavailable(message)),
        _ => Err(MlError::RequestFailed(message)),
    }
}

fn encode_png_base64(frame: &RgbImage) -> MlResult<String> {
    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(frame.as_raw(), frame.width(), frame.height(), ColorType::Rgb8)
        .map_err(|e| MlError::ImageEncode(e.to_string()))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(png))
}

#[async_trait]
impl KeypointDetector for MlClient {
    async fn detect(&self, index: usize, frame: &RgbImage) -> AnalysisResult<PoseFrame> {
        self.detect_pose(frame)
            .await
            .map_err(|e| AnalysisError::detection(index, e.to_string()))
    }

    fn name(&self) -> &'static str {
        "ml-service"
    }
}

#[async_trait]
impl SequenceClassifier for MlClient {
    async fn classify(
        &self,
        sequence: &[FlatPose],
        category: &MotionCategory,
    ) -> AnalysisResult<Vec<f32>> {
        self.classify_sequence(sequence, category)
            .await
            .map_err(|e| AnalysisError::classifier(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "ml-service"
    }
}
