//! Nutrition label text
//!
//! Builds the printable label fields for a recipe: ingredient list by weight,
//! net weight, the nutrition table, and the allergen statement.

use serde::{Deserialize, Serialize};

use crate::models::{Nutrients, RecipeState};
use super::recipe_totals::{nutrition_rows, recompute};

/// Printable label fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelData {
    pub product_name: String,
    pub ingredients: String,
    pub net_weight: String,
    pub nutrition: String,
    pub allergens: String,
}

/// Ingredient names, heaviest first
pub fn ingredient_list(state: &RecipeState) -> String {
    let mut lines: Vec<_> = state.ingredients.iter().collect();
    lines.sort_by(|a, b| b.quantity_g.total_cmp(&a.quantity_g));
    lines
        .iter()
        .map(|line| line.ingredient_name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Empty when no allergens are declared
pub fn allergen_statement(allergens: &[String]) -> String {
    if allergens.is_empty() {
        return String::new();
    }
    format!(
        "Contains {} and their derivatives; not suitable for people allergic to them.",
        allergens.join(", ")
    )
}

/// Build label text for a recipe document
pub fn generate_label(state: &RecipeState) -> LabelData {
    let recomputed = recompute(state);
    let servings_count = state.servings_count.max(1);

    let (serving_weight_g, per_serving, per_100g) = match &recomputed.densities {
        Some(d) => (d.serving_weight_g, d.per_serving, d.per_100g),
        None => (0.0, Nutrients::zero(), Nutrients::zero()),
    };

    let mut table = vec![
        format!("--- Per serving {:.1} g ---", serving_weight_g),
        format!("Servings per package: {}", servings_count),
        String::new(),
        format!("{:<16}{:>14}{:>14}", "", "Per serving", "Per 100 g"),
    ];
    for row in nutrition_rows(&per_serving, &per_100g, &state.label_options) {
        let decimals = row.key.decimals();
        let name = if row.indented {
            format!("  {}", row.label)
        } else {
            row.label.to_string()
        };
        table.push(format!(
            "{:<16}{:>9.*} {:<4}{:>9.*} {}",
            name, decimals, row.per_serving, row.unit, decimals, row.per_100g, row.unit
        ));
    }

    LabelData {
        product_name: state.recipe_name.clone(),
        ingredients: ingredient_list(state),
        net_weight: format!("{:.1} g", recomputed.final_weight_g.max(0.0)),
        nutrition: table.join("\n"),
        allergens: allergen_statement(&state.label_options.allergens),
    }
}
