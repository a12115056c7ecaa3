// ABOUTME: Model client abstraction for pluggable generative-AI integration
// ABOUTME: Defines the ModelClient contract, prompt variables, and the tool vocabulary
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! # Model Client Service Provider Interface
//!
//! This module defines the contract a generative-AI backend must implement to
//! drive the analysis pipeline. The orchestrator only ever talks to a
//! [`ModelClient`]; the concrete Gemini implementation lives in
//! [`gemini`](self::gemini) and tests substitute fakes.
//!
//! ## Key Concepts
//!
//! - **[`ModelClient`]**: one async call, optionally with an inline image,
//!   returning raw model text.
//! - **[`PromptVariables`]**: the structured payload that parameterizes a
//!   prompt. Exact prompt wording is a rendering concern; correctness only
//!   depends on these variables and on the JSON reply schema.
//! - **[`ToolKind`]**: the closed set of secondary analysis tools the
//!   orchestrator can run.

mod gemini;
mod invoker;
pub mod prompts;

pub use gemini::GeminiClient;
pub use invoker::{RetryPolicy, ToolInvoker, ToolReply};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{MealWindowContext, NutritionGoal, UserNutritionContext};

// ============================================================================
// Tool Vocabulary
// ============================================================================

/// Secondary analysis tools the orchestrator can invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolKind {
    /// Look up a suspected restaurant/brand item
    BrandSearch,
    /// Re-analyze with ingredient-level depth
    DeepAnalysis,
    /// Cross-check against nutrition-database knowledge
    NutritionLookup,
}

impl ToolKind {
    /// Wire name, as the model reports it in `requestedTools`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BrandSearch => "brandSearch",
            Self::DeepAnalysis => "deepAnalysis",
            Self::NutritionLookup => "nutritionLookup",
        }
    }
}

// ============================================================================
// Prompt Variables
// ============================================================================

/// Structured payload that parameterizes one model request
///
/// Assembled by the orchestrator from the analysis request and the working
/// result. Prompt text construction itself is templated in
/// [`prompts`](self::prompts) and out of scope for correctness testing.
#[derive(Debug, Clone)]
pub struct PromptVariables {
    /// Free-text meal description (voice transcript or typed); may be empty
    /// when the request is image-only
    pub description: String,
    /// Which secondary tool this request is for; `None` for the initial pass
    pub tool: Option<ToolKind>,
    /// Brand already detected or suspected, passed to the brand-search tool
    pub known_brand: Option<String>,
    /// Meal name from the working result, for secondary passes
    pub prior_meal_name: Option<String>,
    /// User goal driving estimate framing
    pub goal: NutritionGoal,
    /// Daily calorie target (kcal)
    pub daily_calories: i32,
    /// Active meal window, when one is open
    pub meal_window: Option<MealWindowContext>,
}

impl PromptVariables {
    /// Variables for the initial, untagged analysis pass
    #[must_use]
    pub fn initial(description: impl Into<String>, context: &UserNutritionContext) -> Self {
        Self {
            description: description.into(),
            tool: None,
            known_brand: None,
            prior_meal_name: None,
            goal: context.goal,
            daily_calories: context.daily_calories,
            meal_window: None,
        }
    }

    /// Re-target these variables at a secondary tool
    #[must_use]
    pub fn for_tool(mut self, tool: ToolKind) -> Self {
        self.tool = Some(tool);
        self
    }

    /// Attach the brand the orchestrator suspects
    #[must_use]
    pub fn with_known_brand(mut self, brand: impl Into<String>) -> Self {
        self.known_brand = Some(brand.into());
        self
    }

    /// Attach the working result's meal name for a secondary pass
    #[must_use]
    pub fn with_prior_meal_name(mut self, name: impl Into<String>) -> Self {
        self.prior_meal_name = Some(name.into());
        self
    }

    /// Attach the active meal window
    #[must_use]
    pub fn with_meal_window(mut self, window: MealWindowContext) -> Self {
        self.meal_window = Some(window);
        self
    }

    /// Whether these variables carry any text at all
    #[must_use]
    pub fn has_text(&self) -> bool {
        !self.description.trim().is_empty()
    }
}

// ============================================================================
// Client Trait
// ============================================================================

/// Generative-AI backend for the pipeline
///
/// Implementations are expected to bias the model toward structured JSON
/// output matching the [`AnalysisResult`](crate::models::AnalysisResult)
/// schema, and to support an optional single inline image.
///
/// Error contract: transient connectivity failures must map to
/// `NetworkError` (the retry layer keys off
/// [`AppError::is_transient`](crate::errors::AppError::is_transient)); an
/// empty reply must map to `InvalidResponse`.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Unique client identifier (e.g., "gemini")
    fn name(&self) -> &'static str;

    /// Issue one model request and return the raw reply text
    async fn generate(
        &self,
        variables: &PromptVariables,
        image: Option<&[u8]>,
    ) -> Result<String, AppError>;

    /// Check that the backend is reachable and the credentials are valid
    async fn health_check(&self) -> Result<bool, AppError>;
}
