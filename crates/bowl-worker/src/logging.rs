//! Structured request logging utilities.
//!
//! Provides consistent, structured logging for analysis requests with
//! tracing spans and contextual information.

use bowl_models::RequestId;
use tracing::{error, info, warn, Span};

/// Request logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct RequestLogger {
    request_id: String,
    operation: String,
}

impl RequestLogger {
    /// Create a new logger for a specific request and operation.
    pub fn new(request_id: &RequestId, operation: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Log the start of a request.
    pub fn log_start(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            operation = %self.operation,
            "Analysis started: {}", message
        );
    }

    /// Log a progress update.
    pub fn log_progress(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            operation = %self.operation,
            "Analysis progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            request_id = %self.request_id,
            operation = %self.operation,
            "Analysis warning: {}", message
        );
    }

    /// Log a failure together with the stage it happened in.
    pub fn log_error(&self, stage: &str, message: &str) {
        error!(
            request_id = %self.request_id,
            operation = %self.operation,
            stage,
            "Analysis failed: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            operation = %self.operation,
            "Analysis completed: {}", message
        );
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Create a tracing span for this request.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "analysis",
            request_id = %self.request_id,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_logger_creation() {
        let request_id = RequestId::new();
        let logger = RequestLogger::new(&request_id, "motion_analysis");

        assert_eq!(logger.request_id(), request_id.to_string());
        assert_eq!(logger.operation(), "motion_analysis");
    }
}
