// ABOUTME: Tool invocation layer issuing single model requests with retry/backoff
// ABOUTME: Explicit retry policy so backoff is unit-testable with a paused clock
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! # Tool Invoker
//!
//! One [`ToolInvoker::invoke`] call issues one model request on behalf of the
//! orchestrator, retrying transient network failures with linear backoff.
//! Retry lives here and only here; the orchestrator never retries a tool
//! call itself.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use super::{ModelClient, PromptVariables};
use crate::errors::AppError;

/// Retry behavior for transient model-call failures
///
/// Delay after attempt N is `N x base_delay`, so the default policy sleeps
/// 2s after the first failure and 4s after the second, with 3 attempts total.
/// Only errors matching [`AppError::is_transient`] are retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Backoff unit
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with explicit attempts and backoff unit
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Backoff delay to apply after a failed attempt (1-based)
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Raw model reply plus observed latency
#[derive(Debug, Clone)]
pub struct ToolReply {
    /// Raw model text, guaranteed non-empty
    pub text: String,
    /// Wall-clock latency of the successful attempt
    pub latency: Duration,
}

/// Issues single model requests with retry/backoff
///
/// No caching happens at this layer; result caching is the orchestrator's
/// responsibility.
pub struct ToolInvoker<C: ModelClient> {
    client: C,
    policy: RetryPolicy,
}

impl<C: ModelClient> ToolInvoker<C> {
    /// Create an invoker around a model client
    pub fn new(client: C, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Access the underlying client (health checks, diagnostics)
    pub const fn client(&self) -> &C {
        &self.client
    }

    /// Issue one model request, retrying transient failures
    ///
    /// Requires an image or a non-empty text prompt; rejects the call before
    /// any network activity otherwise.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` when neither image nor prompt text is present.
    /// - `NetworkError("retries exhausted")` when every attempt failed
    ///   transiently.
    /// - Any non-transient error from the client, surfaced immediately.
    pub async fn invoke(
        &self,
        variables: &PromptVariables,
        image: Option<&[u8]>,
    ) -> Result<ToolReply, AppError> {
        if image.is_none() && !variables.has_text() {
            return Err(AppError::invalid_input(
                "tool invocation needs an image or prompt text",
            ));
        }

        let mut attempt = 1;
        loop {
            let started = Instant::now();
            match self.client.generate(variables, image).await {
                Ok(text) => {
                    let latency = started.elapsed();
                    debug!(
                        client = self.client.name(),
                        tool = ?variables.tool,
                        attempt,
                        latency_ms = latency.as_millis() as u64,
                        "Model call succeeded"
                    );
                    return Ok(ToolReply { text, latency });
                }
                Err(error) if error.is_transient() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_after(attempt);
                    warn!(
                        client = self.client.name(),
                        tool = ?variables.tool,
                        attempt,
                        delay_secs = delay.as_secs(),
                        error = %error,
                        "Transient model failure, backing off"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(error) if error.is_transient() => {
                    warn!(
                        client = self.client.name(),
                        tool = ?variables.tool,
                        attempts = attempt,
                        "Retry budget exhausted"
                    );
                    return Err(AppError::network("retries exhausted").with_source(error));
                }
                Err(error) => return Err(error),
            }
        }
    }
}
