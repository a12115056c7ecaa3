// ABOUTME: Google Gemini model client implementation with inline image support
// ABOUTME: Issues JSON-biased generateContent calls via the Generative AI API
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! # Gemini Client
//!
//! Implementation of the [`ModelClient`] trait for Google's Gemini models.
//!
//! ## Configuration
//!
//! Set the `GEMINI_API_KEY` environment variable with an API key from
//! Google AI Studio.
//!
//! ## Behavior
//!
//! - Requests set a JSON response MIME type so the model is biased toward the
//!   structured reply schema (the parser still tolerates prose and fences).
//! - A meal photo is sent as a single inline base64 part next to the text.
//! - Connectivity failures and rate limiting map to `NetworkError` so the
//!   retry layer in [`ToolInvoker`](super::ToolInvoker) can retry them; an
//!   empty candidate maps to `InvalidResponse` and is never retried.

use std::env;

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use super::prompts::{get_nutrition_system_prompt, render_user_prompt};
use super::{ModelClient, PromptVariables};
use crate::errors::AppError;

/// Environment variable for the Gemini API key
const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default model to use
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Base URL for the Gemini API
const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// MIME type assumed for meal photos (capture layer compresses to JPEG)
const IMAGE_MIME_TYPE: &str = "image/jpeg";

// ============================================================================
// API Request/Response Types
// ============================================================================

/// Gemini API request structure
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

/// Content structure for the Gemini API
#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<ContentPart>,
}

/// Part of content (text or inline image data)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum ContentPart {
    /// Text content
    Text { text: String },
    /// Inline binary content (base64)
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

/// Inline binary payload for image parts
#[derive(Debug, Clone, Serialize, Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

/// Generation configuration
#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "candidateCount")]
    candidate_count: u32,
}

/// Gemini API response structure
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

/// Response candidate
#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<GeminiContent>,
}

/// API-level error payload
#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

// ============================================================================
// Client
// ============================================================================

/// Gemini implementation of [`ModelClient`]
pub struct GeminiClient {
    api_key: String,
    client: Client,
    default_model: String,
}

impl GeminiClient {
    /// Create a client with an explicit API key
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: Client::new(),
            default_model: DEFAULT_MODEL.to_owned(),
        }
    }

    /// Create a client from the `GEMINI_API_KEY` environment variable
    ///
    /// # Errors
    ///
    /// Returns an error if the environment variable is not set.
    pub fn from_env() -> Result<Self, AppError> {
        let api_key = env::var(GEMINI_API_KEY_ENV).map_err(|_| {
            AppError::config_missing(format!("{GEMINI_API_KEY_ENV} environment variable not set"))
        })?;
        Ok(Self::new(api_key))
    }

    /// Set a custom default model
    #[must_use]
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Build the API URL for a model and method
    fn build_url(&self, model: &str, method: &str) -> String {
        format!(
            "{API_BASE_URL}/models/{model}:{method}?key={}",
            self.api_key
        )
    }

    /// Build the request body for one analysis call
    fn build_request(variables: &PromptVariables, image: Option<&[u8]>) -> GeminiRequest {
        let mut parts = vec![ContentPart::Text {
            text: render_user_prompt(variables),
        }];

        if let Some(bytes) = image {
            parts.push(ContentPart::InlineData {
                inline_data: InlineData {
                    mime_type: IMAGE_MIME_TYPE.to_owned(),
                    data: base64::engine::general_purpose::STANDARD.encode(bytes),
                },
            });
        }

        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_owned()),
                parts,
            }],
            system_instruction: Some(GeminiContent {
                role: None,
                parts: vec![ContentPart::Text {
                    text: get_nutrition_system_prompt().to_owned(),
                }],
            }),
            generation_config: Some(GenerationConfig {
                temperature: Some(0.2),
                response_mime_type: "application/json".to_owned(),
                candidate_count: 1,
            }),
        }
    }

    /// Map a transport-level failure onto the error taxonomy
    fn map_transport_error(error: &reqwest::Error) -> AppError {
        if error.is_timeout() {
            AppError::network(format!("request timed out: {error}"))
        } else if error.is_connect() || error.is_request() {
            AppError::network(format!("connection failed: {error}"))
        } else {
            AppError::external_service("Gemini", format!("HTTP request failed: {error}"))
        }
    }

    /// Map a non-success HTTP status onto the error taxonomy
    ///
    /// Rate limiting and server-side errors are transient; everything else
    /// surfaces immediately.
    fn map_api_error(status: u16, body: &str) -> AppError {
        match status {
            429 => AppError::network(format!("Gemini rate limited (429): {body}")),
            500..=599 => AppError::network(format!("Gemini server error ({status}): {body}")),
            401 | 403 => {
                AppError::config(format!("Gemini rejected the API key ({status}): {body}"))
            }
            _ => AppError::external_service("Gemini", format!("API error ({status}): {body}")),
        }
    }

    /// Extract the reply text from a parsed response
    fn extract_text(response: &GeminiResponse) -> Result<String, AppError> {
        let parts = response
            .candidates
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default();

        let text: String = parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::InlineData { .. } => None,
            })
            .collect();

        if text.trim().is_empty() {
            return Err(AppError::invalid_response(
                "Gemini returned no usable text",
            ));
        }
        Ok(text)
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    #[instrument(skip(self, variables, image), fields(model = %self.default_model, tool = ?variables.tool))]
    async fn generate(
        &self,
        variables: &PromptVariables,
        image: Option<&[u8]>,
    ) -> Result<String, AppError> {
        let url = self.build_url(&self.default_model, "generateContent");
        let body = Self::build_request(variables, image);

        debug!(has_image = image.is_some(), "Sending request to Gemini API");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::map_transport_error(&e))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| Self::map_transport_error(&e))?;

        if !status.is_success() {
            error!(status = %status, "Gemini API error");
            return Err(Self::map_api_error(status.as_u16(), &response_text));
        }

        let parsed: GeminiResponse = serde_json::from_str(&response_text).map_err(|e| {
            error!(error = %e, "Failed to parse Gemini response envelope");
            AppError::invalid_response(format!("unparseable Gemini response: {e}"))
        })?;

        if let Some(api_error) = parsed.error {
            return Err(AppError::external_service("Gemini", api_error.message));
        }

        Self::extract_text(&parsed)
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        let url = format!("{API_BASE_URL}/models?key={}", self.api_key);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Self::map_transport_error(&e))?;
        Ok(response.status().is_success())
    }
}
