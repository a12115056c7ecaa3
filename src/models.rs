// ABOUTME: Core data model for the nutrition analysis pipeline
// ABOUTME: Request/result value types threaded through the orchestrator stages
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! # Analysis Data Model
//!
//! Value types for one analysis run. An [`AnalysisRequest`] is created per
//! user action and never mutated. An [`AnalysisResult`] is produced by the
//! initial model pass and threaded by value through zero or more tool stages;
//! each stage returns a new value rather than mutating shared state, so two
//! concurrent analyses never share mutable data.
//!
//! The serde surface of [`AnalysisResult`] is the wire contract the model is
//! asked to produce: camelCase keys, with the legacy aliases
//! `nutritionCalculation` (for `nutrition`) and `clarificationNeeds` (for
//! `clarifications`) still accepted on decode.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

// ============================================================================
// Goals and User Context
// ============================================================================

/// Training goal driving macro targets and micronutrient prioritization
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NutritionGoal {
    /// Weight loss (caloric deficit)
    WeightLoss,
    /// Maintenance (caloric balance)
    Maintenance,
    /// Muscle gain (caloric surplus)
    MuscleGain,
    /// Endurance performance (high carb)
    EndurancePerformance,
    /// Strength performance (high protein)
    StrengthPerformance,
}

/// User nutrition context supplied with every analysis request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNutritionContext {
    /// Active training goal
    pub goal: NutritionGoal,
    /// Daily calorie target (kcal)
    pub daily_calories: i32,
    /// Daily protein target (grams)
    pub daily_protein_g: f64,
    /// Daily carbohydrate target (grams)
    pub daily_carbs_g: f64,
    /// Daily fat target (grams)
    pub daily_fat_g: f64,
}

/// Context for an active meal window, when one is open
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealWindowContext {
    /// What this window is for ("post-workout recovery", "light dinner", ...)
    pub purpose: String,
    /// Calories remaining in the window (kcal)
    pub remaining_calories: i32,
    /// Protein remaining in the window (grams)
    pub remaining_protein_g: f64,
    /// Carbohydrates remaining in the window (grams)
    pub remaining_carbs_g: f64,
    /// Fat remaining in the window (grams)
    pub remaining_fat_g: f64,
}

// ============================================================================
// Analysis Request
// ============================================================================

/// Inputs to one analysis run
///
/// Immutable once constructed. At least one of `image` / `transcript` must be
/// present; [`AnalysisRequest::validate`] rejects the request before any
/// network call otherwise.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Unique request ID for tracing
    pub id: Uuid,
    /// Raw meal photo bytes, if the user supplied one
    pub image: Option<Vec<u8>>,
    /// Free-text or voice-transcript description, if supplied
    pub transcript: Option<String>,
    /// User goal and daily targets
    pub context: UserNutritionContext,
    /// Active meal window, if one is open
    pub meal_window: Option<MealWindowContext>,
}

impl AnalysisRequest {
    /// Create a request with a fresh ID
    #[must_use]
    pub fn new(
        image: Option<Vec<u8>>,
        transcript: Option<String>,
        context: UserNutritionContext,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            image,
            transcript,
            context,
            meal_window: None,
        }
    }

    /// Attach an active meal window
    #[must_use]
    pub fn with_meal_window(mut self, window: MealWindowContext) -> Self {
        self.meal_window = Some(window);
        self
    }

    /// Reject requests with neither image nor transcript
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when both inputs are absent (an empty or
    /// whitespace-only transcript counts as absent).
    pub fn validate(&self) -> Result<(), AppError> {
        let has_text = self
            .transcript
            .as_ref()
            .is_some_and(|t| !t.trim().is_empty());
        if self.image.is_none() && !has_text {
            return Err(
                AppError::invalid_input("analysis request needs an image or a transcript")
                    .with_request_id(self.id),
            );
        }
        Ok(())
    }

    /// Transcript text, or empty when absent
    #[must_use]
    pub fn transcript_text(&self) -> &str {
        self.transcript.as_deref().unwrap_or_default()
    }
}

// ============================================================================
// Analysis Result
// ============================================================================

/// Food group classification for an ingredient
///
/// Unrecognized values decode to [`FoodGroup::Mixed`] rather than failing,
/// since the model is free-form about this field.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum FoodGroup {
    /// Meat, fish, eggs, legumes
    Protein,
    /// Bread, rice, pasta, cereal
    Grain,
    /// Vegetables
    Vegetable,
    /// Fruit
    Fruit,
    /// Milk, cheese, yogurt
    Dairy,
    /// Oils, butter, nuts
    Fat,
    /// Composite or unclassified
    #[default]
    Mixed,
}

impl FoodGroup {
    /// Canonical string form used on the wire
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Protein => "Protein",
            Self::Grain => "Grain",
            Self::Vegetable => "Vegetable",
            Self::Fruit => "Fruit",
            Self::Dairy => "Dairy",
            Self::Fat => "Fat",
            Self::Mixed => "Mixed",
        }
    }
}

impl From<String> for FoodGroup {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "protein" => Self::Protein,
            "grain" | "grains" | "carb" | "carbs" => Self::Grain,
            "vegetable" | "vegetables" => Self::Vegetable,
            "fruit" | "fruits" => Self::Fruit,
            "dairy" => Self::Dairy,
            "fat" | "fats" => Self::Fat,
            _ => Self::Mixed,
        }
    }
}

impl From<FoodGroup> for String {
    fn from(value: FoodGroup) -> Self {
        value.as_str().into()
    }
}

/// Macro-level nutrition estimate for a meal or a single ingredient
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Nutrition {
    /// Total energy (kcal)
    pub calories: i32,
    /// Protein (grams)
    pub protein: f64,
    /// Carbohydrates (grams)
    pub carbs: f64,
    /// Fat (grams)
    pub fat: f64,
}

/// One identified ingredient
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Ingredient {
    /// Ingredient name as the model reported it
    pub name: String,
    /// Estimated amount
    pub amount: f64,
    /// Unit for `amount` ("g", "cup", "piece", ...)
    pub unit: String,
    /// Food group, defaulting to `Mixed` when absent or unrecognized
    pub food_group: FoodGroup,
    /// Per-ingredient nutrition, when the model broke it out
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<Nutrition>,
}

/// One micronutrient entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Micronutrient {
    /// Nutrient name ("Fiber", "Vitamin C", ...)
    pub name: String,
    /// Estimated amount
    pub amount: f64,
    /// Unit for `amount` ("mg", "g", "mcg")
    pub unit: String,
    /// Amount expressed as percent of the recommended daily value
    pub percent_of_daily_value: f64,
}

/// One answer option for a clarification question
///
/// Deltas are signed and relative to the assumed baseline option, so the
/// caller can adjust the estimate without another model round-trip.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClarificationOption {
    /// Option text shown to the user
    pub label: String,
    /// Calorie delta vs. the assumed baseline (kcal)
    pub calorie_delta: i32,
    /// Protein delta (grams)
    pub protein_delta: f64,
    /// Carbohydrate delta (grams)
    pub carbs_delta: f64,
    /// Fat delta (grams)
    pub fat_delta: f64,
    /// Whether this option is the baseline the estimate assumes
    pub is_assumed: bool,
}

/// A disambiguating question with enumerated options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Clarification {
    /// The question to put to the user
    pub question: String,
    /// Answer options; empty when the model supplied none
    pub options: Vec<ClarificationOption>,
}

/// The evolving nutrition estimate
///
/// Produced by the initial model pass and replaced wholesale by each
/// secondary tool stage (the brand-name-preservation rule in the orchestrator
/// is the single exception to wholesale replacement).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisResult {
    /// Display name for the meal
    pub meal_name: String,
    /// Model-reported confidence in [0, 1]
    pub confidence: f64,
    /// Identified ingredients, in model order
    pub ingredients: Vec<Ingredient>,
    /// Meal-level macro estimate
    #[serde(alias = "nutritionCalculation")]
    pub nutrition: Nutrition,
    /// Micronutrient entries, ordered by the enricher
    pub micronutrients: Vec<Micronutrient>,
    /// Up to three clarification questions
    #[serde(alias = "clarificationNeeds")]
    pub clarifications: Vec<Clarification>,
    /// Tool names the model asked the orchestrator to run
    pub requested_tools: Vec<String>,
    /// Brand or restaurant the model detected, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_detected: Option<String>,
}

impl AnalysisResult {
    /// Placeholder result used when model output cannot be parsed at all
    ///
    /// The pipeline never raises on malformed model output; it degrades to
    /// this usable low-confidence object instead.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            meal_name: "Unknown food item".into(),
            confidence: 0.2,
            ingredients: vec![Ingredient {
                name: "Unknown food item".into(),
                amount: 1.0,
                unit: "serving".into(),
                food_group: FoodGroup::Mixed,
                nutrition: None,
            }],
            nutrition: Nutrition {
                calories: 250,
                protein: 10.0,
                carbs: 30.0,
                fat: 10.0,
            },
            micronutrients: Vec::new(),
            clarifications: Vec::new(),
            requested_tools: Vec::new(),
            brand_detected: None,
        }
    }

    /// Whether the model asked for a specific secondary tool by name
    #[must_use]
    pub fn requests_tool(&self, tool: &str) -> bool {
        self.requested_tools.iter().any(|t| t == tool)
    }
}

// ============================================================================
// Analysis Metadata
// ============================================================================

/// Complexity classification for one analysis run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MealComplexity {
    /// Few ingredients, single pass
    Simple,
    /// More than three ingredients
    Moderate,
    /// More than eight ingredients, or deep analysis ran
    Complex,
    /// A brand or restaurant was resolved
    Restaurant,
}

/// Output-only record of how an analysis ran
///
/// Never persisted into the result; the caller decides what to do with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    /// Request this metadata belongs to
    pub request_id: Uuid,
    /// Tool names that ran, in order
    pub tools_ran: Vec<String>,
    /// Complexity classification
    pub complexity: MealComplexity,
    /// Wall-clock time for the whole run, in milliseconds
    pub elapsed_ms: u64,
    /// Final confidence after all stages
    pub confidence: f64,
    /// Number of ingredients in the final result
    pub ingredient_count: usize,
    /// When the run completed
    pub completed_at: chrono::DateTime<chrono::Utc>,
}
