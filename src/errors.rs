// ABOUTME: Unified error handling for the nutrition analysis pipeline
// ABOUTME: Defines error codes, the AppError type, and the transient-failure predicate used by retry logic
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! # Unified Error Handling
//!
//! This module provides the centralized error type for the analysis pipeline.
//! It defines standard error codes and convenience constructors so that every
//! stage (tool invocation, parsing, orchestration) reports failures the same way.
//!
//! The orchestrator's propagation policy depends on the distinctions made here:
//! only `InvalidInput`, `NetworkError` from the initial pass, `ToolFailure` from
//! a model-requested tool, and `Timeout` ever cross the orchestrator boundary.
//! Everything else degrades to a best-effort result.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Standard error codes used throughout the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Validation (3000-3999)
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 3000,

    // External Services (5000-5999)
    #[serde(rename = "EXTERNAL_SERVICE_ERROR")]
    ExternalServiceError = 5000,
    #[serde(rename = "NETWORK_ERROR")]
    NetworkError = 5001,
    #[serde(rename = "INVALID_RESPONSE")]
    InvalidResponse = 5002,
    #[serde(rename = "TOOL_FAILURE")]
    ToolFailure = 5003,
    #[serde(rename = "TIMEOUT")]
    Timeout = 5004,

    // Configuration (6000-6999)
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError = 6000,
    #[serde(rename = "CONFIG_MISSING")]
    ConfigMissing = 6001,

    // Internal Errors (9000-9999)
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
    #[serde(rename = "SERIALIZATION_ERROR")]
    SerializationError = 9003,
}

impl ErrorCode {
    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InvalidInput => "The provided input is invalid",
            Self::ExternalServiceError => "An external service encountered an error",
            Self::NetworkError => "A transient network failure occurred",
            Self::InvalidResponse => "The model returned no usable text",
            Self::ToolFailure => "A secondary analysis tool failed",
            Self::Timeout => "The operation exceeded its wall-clock budget",
            Self::ConfigError => "Configuration error encountered",
            Self::ConfigMissing => "Required configuration is missing",
            Self::InternalError => "An internal error occurred",
            Self::SerializationError => "Data serialization/deserialization failed",
        }
    }
}

/// Additional context that can be attached to errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Analysis request ID for tracing
    pub request_id: Option<Uuid>,
    /// Tool that was running when the error occurred
    pub tool: Option<String>,
    /// Additional key-value context
    pub details: serde_json::Value,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            request_id: None,
            tool: None,
            details: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

/// Unified error type for the pipeline
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional context
    pub context: ErrorContext,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add a request ID to the error context
    #[must_use]
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.context.request_id = Some(request_id);
        self
    }

    /// Add the failing tool name to the error context
    #[must_use]
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.context.tool = Some(tool.into());
        self
    }

    /// Add details to the error context
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.context.details = details;
        self
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Whether this failure is transient and worth retrying
    ///
    /// Only connectivity-level failures (connection lost, not connected,
    /// timeout, rate limiting mapped to `NetworkError`) qualify. Everything
    /// else surfaces immediately without retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.code, ErrorCode::NetworkError)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Convenience functions for creating common errors
impl AppError {
    /// Invalid input (neither image nor transcript supplied, bad parameters)
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Transient network failure
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkError, message)
    }

    /// Model returned no usable text
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidResponse, message)
    }

    /// A secondary analysis tool failed
    pub fn tool_failure(tool: impl Into<String>, message: impl Into<String>) -> Self {
        let tool = tool.into();
        Self::new(
            ErrorCode::ToolFailure,
            format!("{tool}: {}", message.into()),
        )
        .with_tool(tool)
    }

    /// Wall-clock budget exceeded
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, message)
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Required configuration is missing
    pub fn config_missing(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigMissing, message)
    }

    /// Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// External service error (non-retryable upstream failure)
    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExternalServiceError,
            format!("{}: {}", service.into(), message.into()),
        )
    }
}

/// Conversion from `anyhow::Error` to `AppError`
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        match error.source() {
            Some(source) => {
                Self::new(ErrorCode::InternalError, error.to_string()).with_details(
                    serde_json::json!({
                        "source": source.to_string()
                    }),
                )
            }
            None => Self::new(ErrorCode::InternalError, error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_predicate() {
        assert!(AppError::network("connection reset").is_transient());
        assert!(!AppError::invalid_response("empty body").is_transient());
        assert!(!AppError::invalid_input("no image or transcript").is_transient());
        assert!(!AppError::tool_failure("deepAnalysis", "boom").is_transient());
    }

    #[test]
    fn test_app_error_context() {
        let request_id = Uuid::new_v4();
        let error = AppError::tool_failure("brandSearch", "upstream 500").with_request_id(request_id);

        assert_eq!(error.code, ErrorCode::ToolFailure);
        assert_eq!(error.context.tool.as_deref(), Some("brandSearch"));
        assert_eq!(error.context.request_id, Some(request_id));
    }

    #[test]
    fn test_error_display_includes_description() {
        let error = AppError::network("retries exhausted");
        let rendered = error.to_string();
        assert!(rendered.contains("transient network failure"));
        assert!(rendered.contains("retries exhausted"));
    }
}
