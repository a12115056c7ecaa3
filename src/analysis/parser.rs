// ABOUTME: Extracts and decodes AnalysisResult payloads from free-form model text
// ABOUTME: Strict schema decode with lenient and fallback paths so parsing never fails
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! # Response Parser
//!
//! Model replies are rarely clean JSON: they arrive wrapped in code fences,
//! padded with explanatory prose, and sometimes shaped against a legacy
//! schema. [`parse`] turns any of that into a usable
//! [`AnalysisResult`] and never raises:
//!
//! 1. strip optional code fences;
//! 2. locate the first balanced JSON object or array with a string-aware
//!    bracket scanner (brackets inside string literals are ignored);
//! 3. strict decode against the `AnalysisResult` schema;
//! 4. on failure, lenient field-by-field extraction from a generic value
//!    (ingredients as objects or bare strings, legacy `nutritionCalculation`
//!    and `clarificationNeeds` keys, plain-string clarification options);
//! 5. on total failure, a fixed "Unknown food item" placeholder.
//!
//! Degraded decodes are logged, never surfaced as errors.

use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{
    AnalysisResult, Clarification, ClarificationOption, FoodGroup, Ingredient, Micronutrient,
    Nutrition,
};

/// Maximum clarification questions carried through the pipeline
const MAX_CLARIFICATIONS: usize = 3;

/// Parse raw model text into an [`AnalysisResult`]
///
/// Never fails; malformed input degrades to a low-confidence placeholder.
#[must_use]
pub fn parse(raw: &str) -> AnalysisResult {
    let cleaned = strip_code_fences(raw);

    let Some(payload) = extract_json_payload(cleaned) else {
        warn!("No JSON payload in model reply, using placeholder result");
        return AnalysisResult::unknown();
    };

    if let Ok(result) = serde_json::from_str::<AnalysisResult>(payload) {
        if !result.meal_name.trim().is_empty() {
            return finalize(result);
        }
    }

    debug!("Strict decode failed, attempting lenient decode");
    match serde_json::from_str::<Value>(payload).ok().and_then(|v| lenient_decode(&v)) {
        Some(result) => {
            warn!("Model reply decoded leniently");
            finalize(result)
        }
        None => {
            warn!("Model reply unusable, using placeholder result");
            AnalysisResult::unknown()
        }
    }
}

/// Clamp and cap fields that carry invariants
fn finalize(mut result: AnalysisResult) -> AnalysisResult {
    result.confidence = result.confidence.clamp(0.0, 1.0);
    result.clarifications.truncate(MAX_CLARIFICATIONS);
    result
}

// ============================================================================
// Payload Extraction
// ============================================================================

/// Strip leading/trailing fenced-code markers (``` with optional language tag)
fn strip_code_fences(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(stripped) = s.strip_prefix("```") {
        // Drop the language tag (e.g. "json") that may follow the fence
        s = stripped
            .trim_start_matches(|c: char| c.is_ascii_alphanumeric())
            .trim_start();
    }
    if let Some(stripped) = s.strip_suffix("```") {
        s = stripped.trim_end();
    }
    s
}

/// Locate the first balanced JSON object or array in free-form text
///
/// String-aware: tracks quoted strings and escape sequences so brackets
/// inside string literals (e.g. `"size [Large]"`) do not terminate the scan.
#[must_use]
pub fn extract_json_payload(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;

    let mut depth: u32 = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    // Brackets are ASCII, so +1 lands on a char boundary
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

// ============================================================================
// Lenient Decode
// ============================================================================

/// Field-by-field extraction from a loosely-typed value
///
/// Returns `None` when the payload carries nothing usable (no meal name, no
/// ingredients, no nutrition), which sends the caller to the placeholder.
fn lenient_decode(value: &Value) -> Option<AnalysisResult> {
    match value {
        Value::Object(map) => {
            let meal_name = map
                .get("mealName")
                .or_else(|| map.get("name"))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty());
            let ingredients = map
                .get("ingredients")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(lenient_ingredient).collect::<Vec<_>>())
                .unwrap_or_default();
            let nutrition = map
                .get("nutrition")
                .or_else(|| map.get("nutritionCalculation"))
                .map(lenient_nutrition);

            if meal_name.is_none() && ingredients.is_empty() && nutrition.is_none() {
                return None;
            }

            Some(AnalysisResult {
                meal_name: meal_name.unwrap_or("Unknown food item").into(),
                confidence: map.get("confidence").and_then(Value::as_f64).unwrap_or(0.0),
                ingredients,
                nutrition: nutrition.unwrap_or_default(),
                micronutrients: map
                    .get("micronutrients")
                    .and_then(Value::as_array)
                    .map(|items| items.iter().filter_map(lenient_micronutrient).collect())
                    .unwrap_or_default(),
                clarifications: map
                    .get("clarifications")
                    .or_else(|| map.get("clarificationNeeds"))
                    .and_then(Value::as_array)
                    .map(|items| items.iter().filter_map(lenient_clarification).collect())
                    .unwrap_or_default(),
                requested_tools: map
                    .get("requestedTools")
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(Into::into)
                            .collect()
                    })
                    .unwrap_or_default(),
                brand_detected: map
                    .get("brandDetected")
                    .and_then(Value::as_str)
                    .map(Into::into),
            })
        }
        // A bare array is treated as the ingredient list of an unnamed meal
        Value::Array(items) => {
            let ingredients: Vec<Ingredient> =
                items.iter().filter_map(lenient_ingredient).collect();
            if ingredients.is_empty() {
                return None;
            }
            Some(AnalysisResult {
                meal_name: ingredients[0].name.clone(),
                confidence: 0.0,
                ingredients,
                ..AnalysisResult::default()
            })
        }
        _ => None,
    }
}

/// Decode an ingredient from a structured object or a bare name string
fn lenient_ingredient(value: &Value) -> Option<Ingredient> {
    match value {
        Value::String(name) if !name.trim().is_empty() => Some(Ingredient {
            name: name.trim().into(),
            amount: 1.0,
            unit: "serving".into(),
            food_group: FoodGroup::Mixed,
            nutrition: None,
        }),
        Value::Object(map) => {
            let name = map.get("name").and_then(Value::as_str)?.trim();
            if name.is_empty() {
                return None;
            }
            Some(Ingredient {
                name: name.into(),
                amount: map.get("amount").and_then(Value::as_f64).unwrap_or(0.0),
                unit: map
                    .get("unit")
                    .and_then(Value::as_str)
                    .unwrap_or("serving")
                    .into(),
                food_group: map
                    .get("foodGroup")
                    .and_then(Value::as_str)
                    .map_or(FoodGroup::Mixed, |s| FoodGroup::from(s.to_owned())),
                nutrition: map.get("nutrition").map(lenient_nutrition),
            })
        }
        _ => None,
    }
}

/// Decode a nutrition block with zero defaults for missing numerics
#[allow(clippy::cast_possible_truncation)]
fn lenient_nutrition(value: &Value) -> Nutrition {
    Nutrition {
        calories: value
            .get("calories")
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
            .round() as i32,
        protein: value.get("protein").and_then(Value::as_f64).unwrap_or(0.0),
        carbs: value.get("carbs").and_then(Value::as_f64).unwrap_or(0.0),
        fat: value.get("fat").and_then(Value::as_f64).unwrap_or(0.0),
    }
}

/// Decode one micronutrient entry
fn lenient_micronutrient(value: &Value) -> Option<Micronutrient> {
    let map = value.as_object()?;
    let name = map.get("name").and_then(Value::as_str)?.trim();
    if name.is_empty() {
        return None;
    }
    Some(Micronutrient {
        name: name.into(),
        amount: map.get("amount").and_then(Value::as_f64).unwrap_or(0.0),
        unit: map.get("unit").and_then(Value::as_str).unwrap_or("mg").into(),
        percent_of_daily_value: map
            .get("percentOfDailyValue")
            .and_then(Value::as_f64)
            .unwrap_or(0.0),
    })
}

/// Decode a clarification, accepting structured options or legacy plain strings
#[allow(clippy::cast_possible_truncation)]
fn lenient_clarification(value: &Value) -> Option<Clarification> {
    let map = value.as_object()?;
    let question = map.get("question").and_then(Value::as_str)?.trim();
    if question.is_empty() {
        return None;
    }
    let options = map
        .get("options")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|option| match option {
                    Value::String(label) => Some(ClarificationOption {
                        label: label.clone(),
                        ..ClarificationOption::default()
                    }),
                    Value::Object(fields) => Some(ClarificationOption {
                        label: fields
                            .get("label")
                            .or_else(|| fields.get("text"))
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .into(),
                        calorie_delta: fields
                            .get("calorieDelta")
                            .and_then(Value::as_f64)
                            .unwrap_or(0.0)
                            .round() as i32,
                        protein_delta: fields
                            .get("proteinDelta")
                            .and_then(Value::as_f64)
                            .unwrap_or(0.0),
                        carbs_delta: fields
                            .get("carbsDelta")
                            .and_then(Value::as_f64)
                            .unwrap_or(0.0),
                        fat_delta: fields
                            .get("fatDelta")
                            .and_then(Value::as_f64)
                            .unwrap_or(0.0),
                        is_assumed: fields
                            .get("isAssumed")
                            .and_then(Value::as_bool)
                            .unwrap_or(false),
                    }),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    Some(Clarification {
        question: question.into(),
        options,
    })
}
