// ABOUTME: Prompt templates for model interactions loaded at compile time
// ABOUTME: Renders structured prompt variables into system and user messages
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! # Prompts
//!
//! The system prompt is loaded at compile time from a markdown file for easy
//! maintenance. User-message rendering is a thin template over
//! [`PromptVariables`]; the exact wording carries no correctness weight, only
//! the variables and the reply schema do.

use std::fmt::Write as _;

use super::{PromptVariables, ToolKind};

/// Nutrition analysis system prompt, including the JSON reply contract
pub const NUTRITION_SYSTEM_PROMPT: &str = include_str!("nutrition_system.md");

/// Get the system prompt for nutrition analysis
#[must_use]
pub const fn get_nutrition_system_prompt() -> &'static str {
    NUTRITION_SYSTEM_PROMPT
}

/// Render prompt variables into the user message for one model request
#[must_use]
pub fn render_user_prompt(variables: &PromptVariables) -> String {
    let mut prompt = String::new();

    match variables.tool {
        None => prompt.push_str("Analyze this meal.\n"),
        Some(ToolKind::BrandSearch) => {
            prompt.push_str("This meal looks like a restaurant or branded item. ");
            prompt.push_str("Identify the exact menu item and use published nutrition data.\n");
            if let Some(brand) = &variables.known_brand {
                let _ = writeln!(prompt, "Suspected brand: {brand}");
            }
        }
        Some(ToolKind::DeepAnalysis) => {
            prompt.push_str("Re-analyze this meal ingredient by ingredient, ");
            prompt.push_str("with per-ingredient nutrition.\n");
        }
        Some(ToolKind::NutritionLookup) => {
            prompt.push_str("Cross-check this estimate against standard nutrition-database ");
            prompt.push_str("values and correct it where it deviates.\n");
        }
    }

    if let Some(name) = &variables.prior_meal_name {
        let _ = writeln!(prompt, "Current estimate is for: {name}");
    }
    if variables.has_text() {
        let _ = writeln!(prompt, "User description: {}", variables.description);
    }

    let _ = writeln!(
        prompt,
        "User goal: {:?}; daily calorie target: {} kcal.",
        variables.goal, variables.daily_calories
    );

    if let Some(window) = &variables.meal_window {
        let _ = writeln!(
            prompt,
            "Active meal window ({}): {} kcal, {:.0} g protein, {:.0} g carbs, {:.0} g fat remaining.",
            window.purpose,
            window.remaining_calories,
            window.remaining_protein_g,
            window.remaining_carbs_g,
            window.remaining_fat_g
        );
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NutritionGoal, UserNutritionContext};

    fn variables() -> PromptVariables {
        PromptVariables::initial(
            "chicken burrito",
            &UserNutritionContext {
                goal: NutritionGoal::WeightLoss,
                daily_calories: 1800,
                daily_protein_g: 130.0,
                daily_carbs_g: 180.0,
                daily_fat_g: 60.0,
            },
        )
    }

    #[test]
    fn test_brand_search_prompt_carries_suspected_brand() {
        let vars = variables()
            .for_tool(ToolKind::BrandSearch)
            .with_known_brand("Chipotle");
        let prompt = render_user_prompt(&vars);
        assert!(prompt.contains("Suspected brand: Chipotle"));
        assert!(prompt.contains("chicken burrito"));
    }

    #[test]
    fn test_initial_prompt_omits_tool_instructions() {
        let prompt = render_user_prompt(&variables());
        assert!(prompt.starts_with("Analyze this meal."));
        assert!(!prompt.contains("Suspected brand"));
    }
}
