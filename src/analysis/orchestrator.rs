// ABOUTME: Top-level analysis state machine deciding which tools to run and merging their results
// ABOUTME: INITIAL -> DECIDE -> SECONDARY -> ENRICH -> DONE with confidence-driven branching
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! # Analysis Orchestrator
//!
//! Runs one analysis request through the pipeline:
//!
//! ```text
//! INITIAL ──(always)──▶ model call (no tool tag) ──▶ DECIDE
//! DECIDE ──(requested tools OR confidence ≤ 0.8)──▶ SECONDARY
//! DECIDE ──(otherwise)──▶ ENRICH
//! SECONDARY: brand search (cache-checked), deep analysis, nutrition lookup
//! ENRICH: consistency repair + micronutrient enrichment ──▶ DONE
//! ```
//!
//! Stages run sequentially — brand detection informs whether deeper analysis
//! is even needed, so there is no parallel fan-out. Collaborators are
//! constructor-injected so tests drive the machine with fake clients.
//!
//! Failure policy: once a usable result exists, a secondary-tool failure
//! never aborts the request. Brand-search failures fall back silently to the
//! working result; failures of tools the model explicitly requested
//! (deep analysis, nutrition lookup) propagate as `ToolFailure`. Only the
//! initial pass, input validation, and the overall wall-clock budget can
//! otherwise fail the run.
//!
//! Cancellation: dropping the returned future stops the pipeline at the next
//! await point; an already in-flight model call completing late is simply
//! discarded with the future.

use chrono::Utc;
use tokio::time::{timeout, Instant};
use tracing::{info, instrument, warn};

use super::{enrichment, parser, validator};
use crate::cache::ResultCache;
use crate::config::AnalysisConfig;
use crate::errors::AppError;
use crate::llm::{ModelClient, PromptVariables, RetryPolicy, ToolInvoker, ToolKind};
use crate::models::{
    AnalysisMetadata, AnalysisRequest, AnalysisResult, MealComplexity,
};

/// Name recorded in metadata for the initial untagged pass
const INITIAL_PASS: &str = "initialAnalysis";

/// Known restaurant/chain keywords: (match substring, canonical brand name)
///
/// Matched case-insensitively against meal name + transcript when the model
/// did not report a brand itself.
const BRAND_KEYWORDS: &[(&str, &str)] = &[
    ("mcdonald", "McDonald's"),
    ("burger king", "Burger King"),
    ("subway", "Subway"),
    ("starbucks", "Starbucks"),
    ("chipotle", "Chipotle"),
    ("kfc", "KFC"),
    ("taco bell", "Taco Bell"),
    ("wendy", "Wendy's"),
    ("domino", "Domino's"),
    ("pizza hut", "Pizza Hut"),
    ("chick-fil-a", "Chick-fil-A"),
    ("dunkin", "Dunkin'"),
    ("five guys", "Five Guys"),
    ("panera", "Panera"),
    ("shake shack", "Shake Shack"),
];

/// Why the orchestrator suspects a brand is involved
#[derive(Debug, Clone, PartialEq, Eq)]
enum BrandSuspicion {
    /// The model reported a brand, or a keyword matched
    Known(String),
    /// Photo present with no other signal; weak suspicion, lookup still runs
    ImageOnly,
}

impl BrandSuspicion {
    fn name(&self) -> Option<&str> {
        match self {
            Self::Known(name) => Some(name),
            Self::ImageOnly => None,
        }
    }
}

/// Top-level state machine over one analysis request
pub struct AnalysisOrchestrator<C: ModelClient, D: enrichment::MicronutrientDatabase> {
    invoker: ToolInvoker<C>,
    micronutrients: D,
    cache: ResultCache,
    config: AnalysisConfig,
}

impl<C: ModelClient, D: enrichment::MicronutrientDatabase> AnalysisOrchestrator<C, D> {
    /// Create an orchestrator with injected collaborators
    ///
    /// The cache is caller-owned so embedders can share one across
    /// orchestrators or pre-seed it; see [`ResultCache::new`] for sizing.
    #[must_use]
    pub fn new(client: C, micronutrients: D, cache: ResultCache, config: AnalysisConfig) -> Self {
        let policy = RetryPolicy::new(config.max_attempts, config.retry_base_delay);
        Self {
            invoker: ToolInvoker::new(client, policy),
            micronutrients,
            cache,
            config,
        }
    }

    /// Check that the model backend is reachable and credentialed
    ///
    /// # Errors
    ///
    /// Propagates the client's connectivity or credential failure.
    pub async fn health_check(&self) -> Result<bool, AppError> {
        self.invoker.client().health_check().await
    }

    /// Analyze one meal request under the configured wall-clock budget
    ///
    /// # Errors
    ///
    /// - `InvalidInput` when the request has neither image nor transcript.
    /// - `NetworkError` when the initial pass exhausts its retries.
    /// - `ToolFailure` when a model-requested deep-analysis or
    ///   nutrition-lookup call fails outright.
    /// - `Timeout` when the run exceeds the overall budget.
    #[instrument(skip(self, request), fields(request_id = %request.id))]
    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> Result<(AnalysisResult, AnalysisMetadata), AppError> {
        request.validate()?;

        timeout(self.config.overall_budget, self.run(request))
            .await
            .map_err(|_| {
                AppError::timeout(format!(
                    "analysis exceeded {}s budget",
                    self.config.overall_budget.as_secs()
                ))
                .with_request_id(request.id)
            })?
    }

    /// Run the state machine without the outer budget
    async fn run(
        &self,
        request: &AnalysisRequest,
    ) -> Result<(AnalysisResult, AnalysisMetadata), AppError> {
        let started = Instant::now();
        let image = request.image.as_deref();
        let mut tools_ran: Vec<String> = vec![INITIAL_PASS.into()];

        // INITIAL: one untagged pass, always
        let base_vars = self.base_variables(request);
        let reply = self
            .invoker
            .invoke(&base_vars, image)
            .await
            .map_err(|e| e.with_request_id(request.id))?;
        let mut working = parser::parse(&reply.text);

        info!(
            meal = %working.meal_name,
            confidence = working.confidence,
            requested_tools = ?working.requested_tools,
            "Initial analysis complete"
        );

        // DECIDE: either condition alone is sufficient
        let needs_secondary = working.confidence <= self.config.confidence_threshold
            || !working.requested_tools.is_empty();

        let mut brand_resolved = false;
        let mut deep_ran = false;

        if needs_secondary {
            // Tool requests come from the initial pass; a later merge
            // replacing the working result does not retract them
            let requested = working.requested_tools.clone();

            if let Some(suspicion) = detect_brand(&working, request) {
                brand_resolved = self
                    .brand_stage(request, &base_vars, &suspicion, &mut working, &mut tools_ran)
                    .await;
            }

            for tool in [ToolKind::DeepAnalysis, ToolKind::NutritionLookup] {
                if requested.iter().any(|t| t == tool.as_str()) {
                    working = self
                        .required_tool_stage(request, &base_vars, tool, working)
                        .await?;
                    tools_ran.push(tool.as_str().into());
                    if tool == ToolKind::DeepAnalysis {
                        deep_ran = true;
                    }
                }
            }
        }

        // ENRICH: deterministic post-processing, never fails
        working = validator::validate(working);
        working = enrichment::enrich(working, &self.micronutrients, request.context.goal);

        let complexity = classify(&working, brand_resolved, deep_ran);
        let metadata = AnalysisMetadata {
            request_id: request.id,
            tools_ran,
            complexity,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            confidence: working.confidence,
            ingredient_count: working.ingredients.len(),
            completed_at: Utc::now(),
        };

        info!(
            meal = %working.meal_name,
            complexity = ?metadata.complexity,
            elapsed_ms = metadata.elapsed_ms,
            tools = ?metadata.tools_ran,
            "Analysis complete"
        );

        Ok((working, metadata))
    }

    /// Prompt variables shared by every pass of this request
    fn base_variables(&self, request: &AnalysisRequest) -> PromptVariables {
        let mut vars = PromptVariables::initial(request.transcript_text(), &request.context);
        if let Some(window) = &request.meal_window {
            vars = vars.with_meal_window(window.clone());
        }
        vars
    }

    /// Run the brand-search stage; returns whether a brand was resolved
    ///
    /// Cache-checked; a failure here falls back silently to the working
    /// result (retries already happened inside the invoker).
    async fn brand_stage(
        &self,
        request: &AnalysisRequest,
        base_vars: &PromptVariables,
        suspicion: &BrandSuspicion,
        working: &mut AnalysisResult,
        tools_ran: &mut Vec<String>,
    ) -> bool {
        let brand = suspicion.name();
        let key = ResultCache::key(brand.unwrap_or_default(), &working.meal_name);

        if let Some(cached) = self.cache.get(&key).await {
            info!(key = %key, "Brand lookup served from cache");
            let resolved = brand.is_some() || cached.brand_detected.is_some();
            *working = merge_brand_result(working, cached, brand);
            return resolved;
        }

        let mut vars = base_vars
            .clone()
            .for_tool(ToolKind::BrandSearch)
            .with_prior_meal_name(working.meal_name.clone());
        if let Some(name) = brand {
            vars = vars.with_known_brand(name);
        }

        match self.invoker.invoke(&vars, request.image.as_deref()).await {
            Ok(reply) => {
                let merged = parser::parse(&reply.text);
                let resolved = brand.is_some() || merged.brand_detected.is_some();
                *working = merge_brand_result(working, merged, brand);
                self.cache.put(key, working.clone()).await;
                tools_ran.push(ToolKind::BrandSearch.as_str().into());
                resolved
            }
            Err(error) => {
                warn!(
                    request_id = %request.id,
                    error = %error,
                    "Brand search failed, keeping initial result"
                );
                false
            }
        }
    }

    /// Run a model-requested tool; its failure fails the pipeline
    async fn required_tool_stage(
        &self,
        request: &AnalysisRequest,
        base_vars: &PromptVariables,
        tool: ToolKind,
        working: AnalysisResult,
    ) -> Result<AnalysisResult, AppError> {
        let vars = base_vars
            .clone()
            .for_tool(tool)
            .with_prior_meal_name(working.meal_name.clone());

        let reply = self
            .invoker
            .invoke(&vars, request.image.as_deref())
            .await
            .map_err(|error| {
                AppError::tool_failure(tool.as_str(), error.to_string())
                    .with_request_id(request.id)
                    .with_source(error)
            })?;

        // Wholesale replacement; field-level merging is not attempted
        Ok(parser::parse(&reply.text))
    }
}

/// Derive brand suspicion for the working result
///
/// Order: model-reported brand, then keyword match against meal name +
/// transcript, then image presence alone as a weak signal. The image-alone
/// rule is a blanket heuristic and over-triggers for home-cooked photos;
/// kept as-is pending a product decision.
fn detect_brand(result: &AnalysisResult, request: &AnalysisRequest) -> Option<BrandSuspicion> {
    if let Some(brand) = &result.brand_detected {
        if !brand.trim().is_empty() {
            return Some(BrandSuspicion::Known(brand.clone()));
        }
    }

    let haystack = format!("{} {}", result.meal_name, request.transcript_text()).to_lowercase();
    for (keyword, canonical) in BRAND_KEYWORDS {
        if haystack.contains(keyword) {
            return Some(BrandSuspicion::Known((*canonical).to_owned()));
        }
    }

    if request.image.is_some() {
        return Some(BrandSuspicion::ImageOnly);
    }
    None
}

/// Replace the working result with the brand-search reply, preserving brand
/// attribution in the meal name
///
/// If the initial name carried the detected brand and the merged name
/// dropped it, the merged name is overwritten with the original one.
fn merge_brand_result(
    initial: &AnalysisResult,
    mut merged: AnalysisResult,
    brand: Option<&str>,
) -> AnalysisResult {
    if let Some(brand) = brand {
        let brand_lower = brand.to_lowercase();
        let initial_has = initial.meal_name.to_lowercase().contains(&brand_lower);
        let merged_has = merged.meal_name.to_lowercase().contains(&brand_lower);
        if initial_has && !merged_has {
            merged.meal_name.clone_from(&initial.meal_name);
        }
    }
    merged
}

/// Complexity classification for metadata
fn classify(result: &AnalysisResult, brand_resolved: bool, deep_ran: bool) -> MealComplexity {
    if brand_resolved {
        MealComplexity::Restaurant
    } else if result.ingredients.len() > 8 || deep_ran {
        MealComplexity::Complex
    } else if result.ingredients.len() > 3 {
        MealComplexity::Moderate
    } else {
        MealComplexity::Simple
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ingredient, NutritionGoal, UserNutritionContext};

    fn context() -> UserNutritionContext {
        UserNutritionContext {
            goal: NutritionGoal::Maintenance,
            daily_calories: 2000,
            daily_protein_g: 120.0,
            daily_carbs_g: 220.0,
            daily_fat_g: 70.0,
        }
    }

    fn result_named(name: &str) -> AnalysisResult {
        AnalysisResult {
            meal_name: name.into(),
            ..AnalysisResult::unknown()
        }
    }

    #[test]
    fn test_brand_name_preserved_on_merge() {
        let initial = result_named("McDonald's Big Mac");
        let merged = result_named("Big Mac");
        let out = merge_brand_result(&initial, merged, Some("McDonald's"));
        assert_eq!(out.meal_name, "McDonald's Big Mac");
    }

    #[test]
    fn test_merge_keeps_name_when_brand_present() {
        let initial = result_named("McDonald's Big Mac");
        let merged = result_named("McDonald's Big Mac Meal");
        let out = merge_brand_result(&initial, merged, Some("McDonald's"));
        assert_eq!(out.meal_name, "McDonald's Big Mac Meal");
    }

    #[test]
    fn test_detect_brand_prefers_model_report() {
        let mut result = result_named("burrito bowl");
        result.brand_detected = Some("Chipotle".into());
        let request = AnalysisRequest::new(None, Some("lunch".into()), context());
        assert_eq!(
            detect_brand(&result, &request),
            Some(BrandSuspicion::Known("Chipotle".into()))
        );
    }

    #[test]
    fn test_detect_brand_from_keywords() {
        let result = result_named("Spicy Deluxe");
        let request =
            AnalysisRequest::new(None, Some("chick-fil-a sandwich no pickles".into()), context());
        assert_eq!(
            detect_brand(&result, &request),
            Some(BrandSuspicion::Known("Chick-fil-A".into()))
        );
    }

    #[test]
    fn test_image_alone_is_weak_suspicion() {
        let result = result_named("pasta");
        let with_image = AnalysisRequest::new(Some(vec![1]), None, context());
        assert_eq!(
            detect_brand(&result, &with_image),
            Some(BrandSuspicion::ImageOnly)
        );

        let text_only = AnalysisRequest::new(None, Some("homemade pasta".into()), context());
        assert_eq!(detect_brand(&result, &text_only), None);
    }

    #[test]
    fn test_complexity_classification() {
        let mut result = result_named("meal");
        result.ingredients = vec![Ingredient::default(); 2];
        assert_eq!(classify(&result, false, false), MealComplexity::Simple);

        result.ingredients = vec![Ingredient::default(); 5];
        assert_eq!(classify(&result, false, false), MealComplexity::Moderate);

        result.ingredients = vec![Ingredient::default(); 9];
        assert_eq!(classify(&result, false, false), MealComplexity::Complex);

        result.ingredients = vec![Ingredient::default(); 2];
        assert_eq!(classify(&result, false, true), MealComplexity::Complex);
        assert_eq!(classify(&result, true, false), MealComplexity::Restaurant);
    }
}
