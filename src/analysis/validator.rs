// ABOUTME: Enforces the calorie/macro identity on analysis results
// ABOUTME: Repairs inconsistent estimates by recomputing carbohydrates only
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! # Consistency Validator
//!
//! Physical identity: total calories ≈ 4·protein + 4·carbs + 9·fat (kcal per
//! gram). A result is inconsistent when the reported calories deviate from
//! the macro-implied calories by more than 8%.
//!
//! The repair is deliberately asymmetric: calories, protein, and fat are kept
//! as reported (they stem from directly observed components) and carbs are
//! recomputed to close the gap. This exact rule is part of the contract, not
//! a least-squares fit.
//!
//! Pure functions, no I/O, never raises.

use tracing::debug;

use crate::models::{AnalysisResult, Nutrition};

/// Maximum tolerated relative deviation between reported and macro-implied calories
const CONSISTENCY_TOLERANCE: f64 = 0.08;

/// kcal per gram of protein
const KCAL_PER_G_PROTEIN: f64 = 4.0;
/// kcal per gram of carbohydrate
const KCAL_PER_G_CARBS: f64 = 4.0;
/// kcal per gram of fat
const KCAL_PER_G_FAT: f64 = 9.0;

/// Calories implied by the macro amounts, rounded to the nearest kcal
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn expected_calories(nutrition: &Nutrition) -> i32 {
    (KCAL_PER_G_PROTEIN * nutrition.protein
        + KCAL_PER_G_CARBS * nutrition.carbs
        + KCAL_PER_G_FAT * nutrition.fat)
        .round() as i32
}

/// Whether the reported calories agree with the macros within tolerance
#[must_use]
pub fn is_consistent(nutrition: &Nutrition) -> bool {
    let expected = expected_calories(nutrition);
    if expected == 0 {
        return nutrition.calories == 0;
    }
    let deviation = f64::from((nutrition.calories - expected).abs()) / f64::from(expected);
    deviation <= CONSISTENCY_TOLERANCE
}

/// Enforce the calorie/macro identity, repairing carbs when violated
///
/// Keeps calories, protein, and fat as reported; recomputes
/// `carbs = max(0, (calories − 4·protein − 9·fat) / 4)` rounded to one
/// decimal place.
#[must_use]
pub fn validate(mut result: AnalysisResult) -> AnalysisResult {
    if is_consistent(&result.nutrition) {
        return result;
    }

    let nutrition = &result.nutrition;
    let repaired_carbs = ((f64::from(nutrition.calories)
        - KCAL_PER_G_PROTEIN * nutrition.protein
        - KCAL_PER_G_FAT * nutrition.fat)
        / KCAL_PER_G_CARBS)
        .max(0.0);
    let repaired_carbs = (repaired_carbs * 10.0).round() / 10.0;

    debug!(
        meal = %result.meal_name,
        calories = nutrition.calories,
        reported_carbs = nutrition.carbs,
        repaired_carbs,
        "Calorie/macro inconsistency repaired"
    );

    result.nutrition.carbs = repaired_carbs;
    result
}
