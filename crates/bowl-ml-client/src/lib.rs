//! Client for the model-serving service.
//!
//! The service hosts the per-frame pose detector and the per-category
//! frame-wise sequence classifiers. `MlClient` implements the analysis
//! crate's `KeypointDetector` and `SequenceClassifier` over HTTP.

pub mod client;
pub mod error;
pub mod types;

pub use client::{MlClient, MlClientConfig};
pub use error::{MlError, MlResult};
pub use types::{ClassifyRequest, ClassifyResponse, DetectRequest, DetectResponse, HealthResponse};
