// ABOUTME: Main library entry point for the nutrilens analysis pipeline
// ABOUTME: AI-orchestrated nutrition estimation from meal photos and descriptions
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

#![deny(unsafe_code)]

//! # Nutrilens
//!
//! An AI-orchestrated nutrition analysis pipeline. Given a meal photo and/or
//! a spoken/typed description, the pipeline estimates nutritional content by
//! orchestrating multiple generative-model calls and applying deterministic
//! validation and enrichment afterward.
//!
//! ## Architecture
//!
//! - **[`llm`]**: the `ModelClient` contract, the Gemini implementation, and
//!   the retrying `ToolInvoker`
//! - **[`analysis`]**: response parsing, calorie/macro consistency repair,
//!   micronutrient enrichment, and the orchestrating state machine
//! - **[`cache`]**: TTL-bounded cache of brand-lookup results
//! - **[`models`]**: request/result value types threaded through the stages
//! - **[`storage`]**: the persistence contract the caller implements
//! - **[`config`]** / **[`logging`]** / **[`errors`]**: ambient concerns
//!
//! The pipeline is bounded-confidence by design: it produces a reproducible
//! estimate with deterministic post-processing, not ground truth. A malformed
//! model reply never fails a request; it degrades to a usable placeholder.
//!
//! ## Example
//!
//! ```rust,no_run
//! use nutrilens::analysis::{AnalysisOrchestrator, StaticMicronutrientDatabase};
//! use nutrilens::cache::ResultCache;
//! use nutrilens::config::AnalysisConfig;
//! use nutrilens::errors::AppResult;
//! use nutrilens::llm::GeminiClient;
//! use nutrilens::models::{AnalysisRequest, NutritionGoal, UserNutritionContext};
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = AnalysisConfig::from_env();
//!     let orchestrator = AnalysisOrchestrator::new(
//!         GeminiClient::from_env()?,
//!         StaticMicronutrientDatabase,
//!         ResultCache::new(config.cache_ttl, config.cache_capacity),
//!         config,
//!     );
//!
//!     let request = AnalysisRequest::new(
//!         None,
//!         Some("grilled chicken with rice and broccoli".into()),
//!         UserNutritionContext {
//!             goal: NutritionGoal::Maintenance,
//!             daily_calories: 2200,
//!             daily_protein_g: 140.0,
//!             daily_carbs_g: 250.0,
//!             daily_fat_g: 70.0,
//!         },
//!     );
//!
//!     let (result, metadata) = orchestrator.analyze(&request).await?;
//!     println!("{}: {} kcal ({:?})", result.meal_name, result.nutrition.calories, metadata.complexity);
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod cache;
pub mod config;
pub mod errors;
pub mod llm;
pub mod logging;
pub mod models;
pub mod storage;

pub use analysis::AnalysisOrchestrator;
pub use errors::{AppError, AppResult};
pub use models::{AnalysisMetadata, AnalysisRequest, AnalysisResult};
