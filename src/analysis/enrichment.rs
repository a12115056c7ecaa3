// ABOUTME: Fills in missing micronutrients from ingredient composition and reorders them by goal priority
// ABOUTME: Defines the MicronutrientDatabase collaborator and the per-goal priority table
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! # Micronutrient Enrichment
//!
//! Three deterministic steps over `(micronutrients, goal)`:
//!
//! 1. **Completion** — below the floor (3 entries), derive additional entries
//!    from ingredient composition via a [`MicronutrientDatabase`]; derived
//!    entries never overwrite model-provided entries with the same name.
//! 2. **Prioritization** — nutrients matching the goal's ordered priority
//!    substrings sort first in priority order; the rest follow, by percent of
//!    daily value descending. Ties within a priority rank also break by
//!    percent of daily value descending.
//! 3. **Truncation** — keep at most the top 8 entries.

use std::cmp::Ordering;

use crate::models::{AnalysisResult, FoodGroup, Ingredient, Micronutrient, NutritionGoal};

/// Minimum entries before completion kicks in
pub const MICRONUTRIENT_FLOOR: usize = 3;
/// Maximum entries kept after prioritization
pub const MICRONUTRIENT_CAP: usize = 8;

// ============================================================================
// Collaborator
// ============================================================================

/// Estimates micronutrients from ingredient composition
///
/// Keyed by ingredient name/food group; synchronous by contract — lookups are
/// table reads, not I/O.
pub trait MicronutrientDatabase: Send + Sync {
    /// Estimate micronutrient entries for a set of ingredients
    fn estimate(&self, ingredients: &[Ingredient]) -> Vec<Micronutrient>;
}

/// Per-food-group baseline entries: (nutrient, amount, unit, percent of daily value)
type NutrientRow = (&'static str, f64, &'static str, f64);

/// Baseline micronutrient profile per serving of each food group
const PROTEIN_ROWS: &[NutrientRow] = &[
    ("Iron", 2.1, "mg", 12.0),
    ("Zinc", 2.4, "mg", 22.0),
    ("Vitamin B12", 1.1, "mcg", 46.0),
];
const GRAIN_ROWS: &[NutrientRow] = &[
    ("Fiber", 3.2, "g", 11.0),
    ("Folate", 90.0, "mcg", 23.0),
    ("Magnesium", 42.0, "mg", 10.0),
];
const VEGETABLE_ROWS: &[NutrientRow] = &[
    ("Vitamin C", 28.0, "mg", 31.0),
    ("Potassium", 420.0, "mg", 9.0),
    ("Fiber", 2.8, "g", 10.0),
];
const FRUIT_ROWS: &[NutrientRow] = &[
    ("Vitamin C", 35.0, "mg", 39.0),
    ("Potassium", 320.0, "mg", 7.0),
    ("Fiber", 2.4, "g", 9.0),
];
const DAIRY_ROWS: &[NutrientRow] = &[
    ("Calcium", 280.0, "mg", 22.0),
    ("Vitamin D", 2.5, "mcg", 13.0),
    ("Vitamin B12", 1.0, "mcg", 42.0),
];
const FAT_ROWS: &[NutrientRow] = &[
    ("Vitamin E", 3.9, "mg", 26.0),
    ("Sodium", 120.0, "mg", 5.0),
];
const MIXED_ROWS: &[NutrientRow] = &[
    ("Sodium", 380.0, "mg", 17.0),
    ("Potassium", 210.0, "mg", 4.0),
    ("Iron", 1.2, "mg", 7.0),
];

/// Table-backed [`MicronutrientDatabase`] keyed by food group
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticMicronutrientDatabase;

impl StaticMicronutrientDatabase {
    const fn rows_for(group: FoodGroup) -> &'static [NutrientRow] {
        match group {
            FoodGroup::Protein => PROTEIN_ROWS,
            FoodGroup::Grain => GRAIN_ROWS,
            FoodGroup::Vegetable => VEGETABLE_ROWS,
            FoodGroup::Fruit => FRUIT_ROWS,
            FoodGroup::Dairy => DAIRY_ROWS,
            FoodGroup::Fat => FAT_ROWS,
            FoodGroup::Mixed => MIXED_ROWS,
        }
    }
}

impl MicronutrientDatabase for StaticMicronutrientDatabase {
    fn estimate(&self, ingredients: &[Ingredient]) -> Vec<Micronutrient> {
        let mut estimates: Vec<Micronutrient> = Vec::new();
        for ingredient in ingredients {
            for &(name, amount, unit, percent) in Self::rows_for(ingredient.food_group) {
                // Same nutrient from several ingredients accumulates
                if let Some(existing) = estimates
                    .iter_mut()
                    .find(|m| m.name.eq_ignore_ascii_case(name))
                {
                    existing.amount += amount;
                    existing.percent_of_daily_value += percent;
                } else {
                    estimates.push(Micronutrient {
                        name: name.into(),
                        amount,
                        unit: unit.into(),
                        percent_of_daily_value: percent,
                    });
                }
            }
        }
        estimates
    }
}

// ============================================================================
// Goal Priority Table
// ============================================================================

/// Ordered nutrient-name substrings prioritized for each goal
///
/// Matching is case-insensitive substring containment, so "fiber" matches
/// "Dietary Fiber" and "vitamin" would match any vitamin entry.
#[must_use]
pub const fn goal_priorities(goal: NutritionGoal) -> &'static [&'static str] {
    match goal {
        NutritionGoal::WeightLoss => &["fiber", "protein", "potassium", "calcium", "sodium"],
        NutritionGoal::Maintenance => &["fiber", "vitamin c", "calcium", "iron", "potassium"],
        NutritionGoal::MuscleGain => &["iron", "zinc", "magnesium", "vitamin d", "vitamin b12"],
        NutritionGoal::EndurancePerformance => {
            &["sodium", "potassium", "iron", "magnesium", "vitamin c"]
        }
        NutritionGoal::StrengthPerformance => {
            &["zinc", "magnesium", "vitamin d", "calcium", "iron"]
        }
    }
}

/// Rank of a nutrient in the goal's priority list, if it matches
fn priority_rank(name: &str, priorities: &[&str]) -> Option<usize> {
    let lowered = name.to_lowercase();
    priorities
        .iter()
        .position(|priority| lowered.contains(priority))
}

// ============================================================================
// Enrichment
// ============================================================================

/// Complete, prioritize, and truncate the result's micronutrient list
///
/// Deterministic given `(micronutrients, goal)`; the single database lookup
/// is the only collaborator call.
#[must_use]
pub fn enrich<D: MicronutrientDatabase>(
    mut result: AnalysisResult,
    database: &D,
    goal: NutritionGoal,
) -> AnalysisResult {
    if result.micronutrients.len() < MICRONUTRIENT_FLOOR {
        let derived = database.estimate(&result.ingredients);
        for entry in derived {
            let already_present = result
                .micronutrients
                .iter()
                .any(|m| m.name.eq_ignore_ascii_case(&entry.name));
            if !already_present {
                result.micronutrients.push(entry);
            }
        }
    }

    let priorities = goal_priorities(goal);
    result.micronutrients.sort_by(|a, b| {
        let rank_a = priority_rank(&a.name, priorities);
        let rank_b = priority_rank(&b.name, priorities);
        match (rank_a, rank_b) {
            (Some(ra), Some(rb)) => ra.cmp(&rb).then_with(|| {
                b.percent_of_daily_value
                    .total_cmp(&a.percent_of_daily_value)
            }),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => b
                .percent_of_daily_value
                .total_cmp(&a.percent_of_daily_value),
        }
    });

    result.micronutrients.truncate(MICRONUTRIENT_CAP);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn micronutrient(name: &str, dv: f64) -> Micronutrient {
        Micronutrient {
            name: name.into(),
            amount: 1.0,
            unit: "mg".into(),
            percent_of_daily_value: dv,
        }
    }

    #[test]
    fn test_completion_skipped_at_floor() {
        let mut result = AnalysisResult::unknown();
        result.micronutrients = vec![
            micronutrient("Iron", 10.0),
            micronutrient("Zinc", 12.0),
            micronutrient("Calcium", 8.0),
        ];
        let enriched = enrich(result, &StaticMicronutrientDatabase, NutritionGoal::Maintenance);
        // Placeholder ingredient is Mixed; none of its rows should have been added
        assert_eq!(enriched.micronutrients.len(), 3);
    }

    #[test]
    fn test_completion_never_overwrites_model_entries() {
        let mut result = AnalysisResult::unknown();
        // Placeholder ingredient is Mixed, whose rows include Sodium and Iron
        result.micronutrients = vec![micronutrient("Sodium", 99.0)];
        let enriched = enrich(result, &StaticMicronutrientDatabase, NutritionGoal::WeightLoss);

        let sodium: Vec<_> = enriched
            .micronutrients
            .iter()
            .filter(|m| m.name == "Sodium")
            .collect();
        assert_eq!(sodium.len(), 1);
        assert!((sodium[0].percent_of_daily_value - 99.0).abs() < f64::EPSILON);
        assert!(enriched.micronutrients.iter().any(|m| m.name == "Iron"));
    }

    #[test]
    fn test_priority_entries_sort_first_in_list_order() {
        let mut result = AnalysisResult::unknown();
        result.micronutrients = vec![
            micronutrient("Vitamin E", 80.0),
            micronutrient("Potassium", 5.0),
            micronutrient("Dietary Fiber", 2.0),
            micronutrient("Calcium", 40.0),
        ];
        let enriched = enrich(result, &StaticMicronutrientDatabase, NutritionGoal::WeightLoss);
        let names: Vec<&str> = enriched
            .micronutrients
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        // WeightLoss priorities: fiber, protein, potassium, calcium, sodium.
        // "Dietary Fiber" matches "fiber" by substring; Vitamin E is unmatched
        // and sorts last despite the highest daily value.
        assert_eq!(names[0], "Dietary Fiber");
        assert_eq!(names[1], "Potassium");
        assert_eq!(names[2], "Calcium");
        assert_eq!(*names.last().unwrap(), "Vitamin E");
    }

    #[test]
    fn test_truncates_to_cap() {
        let mut result = AnalysisResult::unknown();
        result.micronutrients = (0..12)
            .map(|i| micronutrient(&format!("Nutrient {i}"), f64::from(i)))
            .collect();
        let enriched = enrich(result, &StaticMicronutrientDatabase, NutritionGoal::Maintenance);
        assert_eq!(enriched.micronutrients.len(), MICRONUTRIENT_CAP);
        // Unmatched entries keep descending daily-value order
        assert_eq!(enriched.micronutrients[0].name, "Nutrient 11");
    }
}
