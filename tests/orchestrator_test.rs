// ABOUTME: Integration tests for the analysis orchestrator state machine
// ABOUTME: Drives full runs with a scripted model client and checks decisions, merging, and failure policy
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nutrilens::analysis::AnalysisOrchestrator;
use nutrilens::cache::ResultCache;
use nutrilens::config::AnalysisConfig;
use nutrilens::errors::{AppError, ErrorCode};
use nutrilens::llm::{ModelClient, PromptVariables, ToolKind};
use nutrilens::models::{
    AnalysisRequest, AnalysisResult, MealComplexity, NutritionGoal, UserNutritionContext,
};

/// Model client that replays scripted replies and records what each call
/// was targeted at
struct ScriptedClient {
    outcomes: Mutex<Vec<Result<String, AppError>>>,
    seen: Arc<Mutex<Vec<CallRecord>>>,
}

#[derive(Debug, Clone)]
struct CallRecord {
    tool: Option<ToolKind>,
    known_brand: Option<String>,
}

impl ScriptedClient {
    fn new(outcomes: Vec<Result<String, AppError>>) -> (Self, Arc<Mutex<Vec<CallRecord>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                outcomes: Mutex::new(outcomes),
                seen: Arc::clone(&seen),
            },
            seen,
        )
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn generate(
        &self,
        variables: &PromptVariables,
        _image: Option<&[u8]>,
    ) -> Result<String, AppError> {
        self.seen.lock().unwrap().push(CallRecord {
            tool: variables.tool,
            known_brand: variables.known_brand.clone(),
        });
        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.is_empty() {
            return Err(AppError::internal("script exhausted"));
        }
        outcomes.remove(0)
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        Ok(true)
    }
}

fn context() -> UserNutritionContext {
    UserNutritionContext {
        goal: NutritionGoal::Maintenance,
        daily_calories: 2000,
        daily_protein_g: 120.0,
        daily_carbs_g: 220.0,
        daily_fat_g: 70.0,
    }
}

fn orchestrator(
    outcomes: Vec<Result<String, AppError>>,
) -> (
    AnalysisOrchestrator<ScriptedClient, nutrilens::analysis::StaticMicronutrientDatabase>,
    Arc<Mutex<Vec<CallRecord>>>,
) {
    orchestrator_with_cache(outcomes, default_cache())
}

fn orchestrator_with_cache(
    outcomes: Vec<Result<String, AppError>>,
    cache: ResultCache,
) -> (
    AnalysisOrchestrator<ScriptedClient, nutrilens::analysis::StaticMicronutrientDatabase>,
    Arc<Mutex<Vec<CallRecord>>>,
) {
    let (client, seen) = ScriptedClient::new(outcomes);
    let orchestrator = AnalysisOrchestrator::new(
        client,
        nutrilens::analysis::StaticMicronutrientDatabase,
        cache,
        AnalysisConfig::default(),
    );
    (orchestrator, seen)
}

fn default_cache() -> ResultCache {
    let config = AnalysisConfig::default();
    ResultCache::new(config.cache_ttl, config.cache_capacity)
}

#[tokio::test]
async fn test_confident_result_stops_after_one_call() {
    let (orchestrator, seen) = orchestrator(vec![Ok(r#"{
        "mealName": "Greek salad",
        "confidence": 0.95,
        "ingredients": [
            {"name": "romaine", "foodGroup": "Vegetable"},
            {"name": "feta", "foodGroup": "Dairy"},
            {"name": "olives", "foodGroup": "Fat"},
            {"name": "tomato", "foodGroup": "Vegetable"}
        ],
        "nutrition": {"calories": 320, "protein": 10.0, "carbs": 12.0, "fat": 25.0}
    }"#
    .into())]);

    let request = AnalysisRequest::new(None, Some("greek salad".into()), context());
    let (result, metadata) = orchestrator.analyze(&request).await.unwrap();

    assert_eq!(result.meal_name, "Greek salad");
    assert_eq!(seen.lock().unwrap().len(), 1);
    assert_eq!(metadata.tools_ran, vec!["initialAnalysis".to_owned()]);
    // 4 ingredients and no secondary tools
    assert_eq!(metadata.complexity, MealComplexity::Moderate);
}

#[tokio::test]
async fn test_low_confidence_with_image_triggers_secondary_pass() {
    let (orchestrator, seen) = orchestrator(vec![
        Ok(r#"{"mealName": "pasta dish", "confidence": 0.6}"#.into()),
        Ok(r#"{"mealName": "penne arrabbiata", "confidence": 0.85}"#.into()),
    ]);

    let request = AnalysisRequest::new(Some(vec![0xFF, 0xD8]), None, context());
    let (result, _) = orchestrator.analyze(&request).await.unwrap();

    // Image with no brand signal still gets a weak-suspicion brand lookup
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].tool, None);
    assert_eq!(seen[1].tool, Some(ToolKind::BrandSearch));
    assert_eq!(seen[1].known_brand, None);
    assert_eq!(result.meal_name, "penne arrabbiata");
}

#[tokio::test]
async fn test_brand_name_survives_the_merge() {
    let (orchestrator, seen) = orchestrator(vec![
        Ok(r#"{"mealName": "McDonald's Big Mac", "confidence": 0.6}"#.into()),
        Ok(r#"{
            "mealName": "Big Mac",
            "confidence": 0.9,
            "brandDetected": "McDonald's",
            "nutrition": {"calories": 590, "protein": 25.0, "carbs": 46.0, "fat": 34.0}
        }"#
        .into()),
    ]);

    let request = AnalysisRequest::new(None, Some("mcdonald's big mac".into()), context());
    let (result, metadata) = orchestrator.analyze(&request).await.unwrap();

    // The lookup reply dropped the brand prefix; the merged name keeps it
    assert_eq!(result.meal_name, "McDonald's Big Mac");
    assert_eq!(metadata.complexity, MealComplexity::Restaurant);
    assert!(metadata.tools_ran.contains(&"brandSearch".to_owned()));

    let seen = seen.lock().unwrap();
    assert_eq!(seen[1].known_brand.as_deref(), Some("McDonald's"));
}

#[tokio::test]
async fn test_second_identical_meal_is_served_from_cache() {
    let (orchestrator, seen) = orchestrator(vec![
        Ok(r#"{"mealName": "McDonald's Big Mac", "confidence": 0.6}"#.into()),
        Ok(r#"{"mealName": "Big Mac", "confidence": 0.9, "brandDetected": "McDonald's"}"#.into()),
        Ok(r#"{"mealName": "McDonald's Big Mac", "confidence": 0.6}"#.into()),
    ]);

    let request = AnalysisRequest::new(None, Some("mcdonald's big mac".into()), context());
    let (first, _) = orchestrator.analyze(&request).await.unwrap();

    let request = AnalysisRequest::new(None, Some("mcdonald's big mac".into()), context());
    let (second, metadata) = orchestrator.analyze(&request).await.unwrap();

    // Three model calls total: the second run's brand lookup was a cache hit
    assert_eq!(seen.lock().unwrap().len(), 3);
    assert_eq!(second.meal_name, first.meal_name);
    assert_eq!(metadata.complexity, MealComplexity::Restaurant);
    assert_eq!(metadata.tools_ran, vec!["initialAnalysis".to_owned()]);
}

#[tokio::test]
async fn test_brand_search_failure_falls_back_to_initial_result() {
    let (orchestrator, seen) = orchestrator(vec![
        Ok(r#"{"mealName": "Subway melt", "confidence": 0.6}"#.into()),
        Err(AppError::invalid_response("empty reply")),
    ]);

    let request = AnalysisRequest::new(None, Some("subway melt".into()), context());
    let (result, metadata) = orchestrator.analyze(&request).await.unwrap();

    assert_eq!(seen.lock().unwrap().len(), 2);
    assert_eq!(result.meal_name, "Subway melt");
    // The failed lookup is not recorded and does not resolve the brand
    assert_eq!(metadata.tools_ran, vec!["initialAnalysis".to_owned()]);
    assert_ne!(metadata.complexity, MealComplexity::Restaurant);
}

#[tokio::test]
async fn test_requested_tool_failure_propagates() {
    let (orchestrator, seen) = orchestrator(vec![
        Ok(r#"{
            "mealName": "layered casserole",
            "confidence": 0.9,
            "requestedTools": ["deepAnalysis"]
        }"#
        .into()),
        Err(AppError::invalid_response("empty reply")),
    ]);

    let request = AnalysisRequest::new(None, Some("homemade casserole".into()), context());
    let error = orchestrator.analyze(&request).await.unwrap_err();

    assert_eq!(error.code, ErrorCode::ToolFailure);
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_deep_analysis_result_replaces_working_result() {
    let (orchestrator, seen) = orchestrator(vec![
        Ok(r#"{
            "mealName": "layered casserole",
            "confidence": 0.9,
            "requestedTools": ["deepAnalysis"]
        }"#
        .into()),
        Ok(r#"{
            "mealName": "Tuna noodle casserole",
            "confidence": 0.85,
            "ingredients": [
                {"name": "egg noodles", "foodGroup": "Grain"},
                {"name": "tuna", "foodGroup": "Protein"},
                {"name": "cream of mushroom", "foodGroup": "Dairy"}
            ],
            "nutrition": {"calories": 540, "protein": 32.0, "carbs": 48.0, "fat": 24.0}
        }"#
        .into()),
    ]);

    let request = AnalysisRequest::new(None, Some("homemade casserole".into()), context());
    let (result, metadata) = orchestrator.analyze(&request).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[1].tool, Some(ToolKind::DeepAnalysis));
    assert_eq!(result.meal_name, "Tuna noodle casserole");
    assert_eq!(
        metadata.tools_ran,
        vec!["initialAnalysis".to_owned(), "deepAnalysis".to_owned()]
    );
    assert_eq!(metadata.complexity, MealComplexity::Complex);
}

#[tokio::test]
async fn test_garbled_initial_reply_degrades_to_placeholder() {
    let (orchestrator, _) = orchestrator(vec![Ok(
        "I could not identify this meal, sorry!".into()
    )]);

    let request = AnalysisRequest::new(None, Some("mystery leftovers".into()), context());
    let (result, _) = orchestrator.analyze(&request).await.unwrap();

    assert_eq!(result.meal_name, "Unknown food item");
    assert!((result.confidence - 0.2).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_empty_request_fails_before_any_model_call() {
    let (orchestrator, seen) = orchestrator(vec![Ok("unused".into())]);

    let request = AnalysisRequest::new(None, None, context());
    let error = orchestrator.analyze(&request).await.unwrap_err();

    assert_eq!(error.code, ErrorCode::InvalidInput);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_preseeded_cache_skips_the_brand_lookup() {
    let cache = default_cache();
    let mut known = AnalysisResult::unknown();
    known.meal_name = "McDonald's Big Mac".into();
    known.confidence = 0.9;
    known.brand_detected = Some("McDonald's".into());
    cache
        .put(ResultCache::key("McDonald's", "McDonald's Big Mac"), known)
        .await;

    // Only the initial reply is scripted; a brand-search call would fail
    // with a script-exhausted error
    let (orchestrator, seen) = orchestrator_with_cache(
        vec![Ok(
            r#"{"mealName": "McDonald's Big Mac", "confidence": 0.6}"#.into()
        )],
        cache,
    );

    let request = AnalysisRequest::new(None, Some("mcdonald's big mac".into()), context());
    let (result, metadata) = orchestrator.analyze(&request).await.unwrap();

    assert_eq!(seen.lock().unwrap().len(), 1);
    assert_eq!(result.meal_name, "McDonald's Big Mac");
    assert_eq!(metadata.complexity, MealComplexity::Restaurant);
}

/// Model client that never replies within the analysis budget
struct StalledClient;

#[async_trait]
impl ModelClient for StalledClient {
    fn name(&self) -> &'static str {
        "stalled"
    }

    async fn generate(
        &self,
        _variables: &PromptVariables,
        _image: Option<&[u8]>,
    ) -> Result<String, AppError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(r#"{"mealName": "too late"}"#.into())
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        Ok(true)
    }
}

#[tokio::test(start_paused = true)]
async fn test_run_exceeding_budget_times_out() {
    let config = AnalysisConfig::default();
    let budget = config.overall_budget;
    let orchestrator = AnalysisOrchestrator::new(
        StalledClient,
        nutrilens::analysis::StaticMicronutrientDatabase,
        ResultCache::new(config.cache_ttl, config.cache_capacity),
        config,
    );

    let request = AnalysisRequest::new(None, Some("slow cooker stew".into()), context());
    let started = tokio::time::Instant::now();
    let error = orchestrator.analyze(&request).await.unwrap_err();

    assert_eq!(error.code, ErrorCode::Timeout);
    assert_eq!(error.context.request_id, Some(request.id));
    // Fired at the budget, not when the stalled call would have returned
    assert_eq!(started.elapsed(), budget);
}

#[tokio::test]
async fn test_final_result_is_calorie_consistent() {
    // Model reply overstates carbs; the validator repairs them
    let (orchestrator, _) = orchestrator(vec![Ok(r#"{
        "mealName": "Chicken and rice",
        "confidence": 0.9,
        "ingredients": [
            {"name": "chicken breast", "foodGroup": "Protein"},
            {"name": "white rice", "foodGroup": "Grain"}
        ],
        "nutrition": {"calories": 500, "protein": 20.0, "carbs": 10.0, "fat": 10.0}
    }"#
    .into())]);

    let request = AnalysisRequest::new(None, Some("chicken and rice".into()), context());
    let (result, _) = orchestrator.analyze(&request).await.unwrap();

    assert_eq!(result.nutrition.calories, 500);
    assert!((result.nutrition.carbs - 82.5).abs() < f64::EPSILON);
}
