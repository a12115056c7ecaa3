// ABOUTME: Analysis pipeline stages: parsing, validation, enrichment, orchestration
// ABOUTME: Deterministic post-processing around the model calls
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! # Analysis Pipeline
//!
//! The stages between raw model text and the final estimate:
//!
//! - [`parser`] — JSON extraction and strict/lenient/fallback decoding
//! - [`validator`] — calorie/macro consistency enforcement
//! - [`enrichment`] — micronutrient completion and goal-based prioritization
//! - [`orchestrator`] — the state machine tying the stages together

pub mod enrichment;
pub mod orchestrator;
pub mod parser;
pub mod validator;

pub use enrichment::{MicronutrientDatabase, StaticMicronutrientDatabase};
pub use orchestrator::AnalysisOrchestrator;
