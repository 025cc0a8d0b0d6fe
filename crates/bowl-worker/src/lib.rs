//! Bowling motion analysis worker.
//!
//! This crate provides:
//! - The end-to-end analysis pipeline (prepare, extract, score, render, encode)
//! - Environment-driven configuration
//! - Structured per-request logging and pipeline metrics

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;

pub use config::AnalysisConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::RequestLogger;
pub use pipeline::{build_report, AnalysisPipeline, ScoredMotion};
