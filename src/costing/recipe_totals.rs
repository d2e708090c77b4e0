//! Recipe nutrition and cost recomputation
//!
//! Pure projection of a `RecipeState` into totals, per-serving and per-100 g
//! values, and the rendered nutrition rows.

use serde::Serialize;

use crate::models::{LabelOptions, NutrientKey, Nutrients, RecipeIngredientLine, RecipeState};
use super::round_to;

/// Sums over every line with a positive quantity
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RawTotals {
    pub nutrients: Nutrients,
    pub total_weight_g: f64,
    pub total_cost: f64,
}

impl RawTotals {
    pub fn from_lines(lines: &[RecipeIngredientLine]) -> Self {
        lines
            .iter()
            .filter(|line| line.quantity_g > 0.0)
            .fold(Self::default(), |acc, line| {
                let scale = line.quantity_g / 100.0;
                Self {
                    nutrients: acc.nutrients + line.details.nutrients.scale(scale),
                    total_weight_g: acc.total_weight_g + line.quantity_g,
                    total_cost: acc.total_cost + (line.details.cost_per_unit / 100.0) * line.quantity_g,
                }
            })
    }
}

/// One rendered nutrition row, values already rounded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutritionRow {
    pub key: NutrientKey,
    pub label: &'static str,
    pub unit: &'static str,
    pub indented: bool,
    pub per_serving: f64,
    pub per_100g: f64,
}

/// Visible rows in fixed order
pub fn nutrition_rows(
    per_serving: &Nutrients,
    per_100g: &Nutrients,
    options: &LabelOptions,
) -> Vec<NutritionRow> {
    NutrientKey::ALL
        .into_iter()
        .filter(|key| options.is_visible(*key))
        .map(|key| NutritionRow {
            key,
            label: key.display_name(),
            unit: key.unit(),
            indented: key.is_indented(),
            per_serving: round_to(per_serving.get(key), key.decimals() as i32),
            per_100g: round_to(per_100g.get(key), key.decimals() as i32),
        })
        .collect()
}

/// Nutrition panel contents
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NutritionPanel {
    /// No weight to compute against; ask for ingredients or a final weight
    Placeholder,
    Table {
        serving_weight_g: f64,
        servings_count: i64,
        rows: Vec<NutritionRow>,
    },
}

/// Unrounded per-weight values
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Densities {
    pub final_weight_g: f64,
    pub serving_weight_g: f64,
    pub density: Nutrients,
    pub per_serving: Nutrients,
    pub per_100g: Nutrients,
}

/// Everything the editor renders after a change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recomputation {
    pub totals: RawTotals,
    /// Raw total cost rounded to 2 decimals
    pub total_cost: f64,
    pub final_weight_g: f64,
    pub densities: Option<Densities>,
    pub panel: NutritionPanel,
    pub can_print: bool,
    pub is_empty: bool,
}

/// Recompute totals and the nutrition panel for a recipe
pub fn recompute(state: &RecipeState) -> Recomputation {
    let totals = RawTotals::from_lines(&state.ingredients);
    let final_weight_g = state.final_weight_override().unwrap_or(totals.total_weight_g);
    let total_cost = round_to(totals.total_cost, 2);
    let is_empty = state.ingredients.is_empty();

    if final_weight_g <= 0.0 {
        return Recomputation {
            totals,
            total_cost,
            final_weight_g,
            densities: None,
            panel: NutritionPanel::Placeholder,
            can_print: false,
            is_empty,
        };
    }

    let servings_count = state.servings_count.max(1);
    let serving_weight_g = final_weight_g / servings_count as f64;
    let density = totals.nutrients.map(|v| v / final_weight_g);
    let per_serving = density.scale(serving_weight_g);
    let per_100g = density.scale(100.0);

    Recomputation {
        totals,
        total_cost,
        final_weight_g,
        densities: Some(Densities {
            final_weight_g,
            serving_weight_g,
            density,
            per_serving,
            per_100g,
        }),
        panel: NutritionPanel::Table {
            serving_weight_g: round_to(serving_weight_g, 1),
            servings_count,
            rows: nutrition_rows(&per_serving, &per_100g, &state.label_options),
        },
        can_print: true,
        is_empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NutrientProfile;

    fn line(id: i64, qty: f64, calories: f64, cost: f64) -> RecipeIngredientLine {
        RecipeIngredientLine {
            ingredient_id: id,
            ingredient_name: format!("ingredient {}", id),
            quantity_g: qty,
            details: NutrientProfile {
                nutrients: Nutrients {
                    calories_kcal: calories,
                    fat_g: 10.0,
                    sodium_mg: 333.0,
                    ..Default::default()
                },
                cost_per_unit: cost,
                unit_name: "g".to_string(),
            },
        }
    }

    fn state(lines: Vec<RecipeIngredientLine>) -> RecipeState {
        let mut s = RecipeState::new("Test");
        s.ingredients = lines;
        s
    }

    #[test]
    fn test_single_line_falls_back_to_raw_weight() {
        let mut s = state(vec![line(1, 100.0, 200.0, 50.0)]);
        s.servings_count = 4;
        let r = recompute(&s);

        assert_eq!(r.totals.nutrients.calories_kcal, 200.0);
        assert_eq!(r.total_cost, 50.0);
        assert_eq!(r.final_weight_g, 100.0);
        let d = r.densities.unwrap();
        assert_eq!(d.density.calories_kcal, 2.0);
        assert_eq!(d.serving_weight_g, 25.0);
        assert!(r.can_print);
    }

    #[test]
    fn test_per_serving_matches_density_times_serving_weight() {
        let mut s = state(vec![line(1, 250.0, 364.0, 4.0), line(2, 80.0, 717.0, 30.0)]);
        s.final_weight_g = Some(290.0);
        s.servings_count = 3;
        let r = recompute(&s);

        let d = r.densities.unwrap();
        assert_eq!(d.serving_weight_g, 290.0 / 3.0);
        for key in NutrientKey::ALL {
            let expected = (r.totals.nutrients.get(key) / 290.0) * d.serving_weight_g;
            assert!((d.per_serving.get(key) - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_weight_shows_placeholder() {
        let r = recompute(&state(vec![line(1, 0.0, 200.0, 50.0)]));
        assert_eq!(r.panel, NutritionPanel::Placeholder);
        assert!(!r.can_print);
        assert!(r.densities.is_none());

        let empty = recompute(&state(Vec::new()));
        assert!(empty.is_empty);
        assert_eq!(empty.totals, RawTotals::default());
        assert_eq!(empty.total_cost, 0.0);
        assert!(!empty.can_print);
    }

    #[test]
    fn test_zero_override_uses_raw_weight() {
        let mut s = state(vec![line(1, 200.0, 100.0, 10.0)]);
        s.final_weight_g = Some(0.0);
        assert_eq!(recompute(&s).final_weight_g, 200.0);
    }

    #[test]
    fn test_negative_override_shows_placeholder() {
        let mut s = state(vec![line(1, 200.0, 100.0, 10.0)]);
        s.final_weight_g = Some(-50.0);
        let r = recompute(&s);
        assert_eq!(r.final_weight_g, -50.0);
        assert_eq!(r.panel, NutritionPanel::Placeholder);
        assert!(r.densities.is_none());
        assert!(!r.can_print);
        assert_eq!(r.total_cost, 20.0);
    }

    #[test]
    fn test_hidden_nutrient_is_omitted_only_from_rows() {
        let mut s = state(vec![line(1, 100.0, 200.0, 50.0)]);
        let before = recompute(&s);
        s.label_options.set_visible(NutrientKey::FatG, false);
        let after = recompute(&s);

        let keys = |r: &Recomputation| match &r.panel {
            NutritionPanel::Table { rows, .. } => rows.iter().map(|row| row.key).collect::<Vec<_>>(),
            NutritionPanel::Placeholder => Vec::new(),
        };
        let mut expected = keys(&before);
        expected.retain(|k| *k != NutrientKey::FatG);
        assert_eq!(keys(&after), expected);
        assert_eq!(before.totals, after.totals);
    }

    #[test]
    fn test_rounding_rules() {
        let mut s = state(vec![line(1, 100.0, 123.456, 12.346)]);
        s.servings_count = 3;
        let r = recompute(&s);
        let NutritionPanel::Table { rows, serving_weight_g, .. } = r.panel else {
            panic!("expected a table");
        };
        assert_eq!(serving_weight_g, 33.3);
        let calories = rows.iter().find(|row| row.key == NutrientKey::CaloriesKcal).unwrap();
        assert_eq!(calories.per_100g, 123.5);
        let sodium = rows.iter().find(|row| row.key == NutrientKey::SodiumMg).unwrap();
        assert_eq!(sodium.per_serving, 111.0);
        assert_eq!(sodium.per_100g, 333.0);
        assert_eq!(r.total_cost, 12.35);
        assert!(rows.iter().find(|row| row.key == NutrientKey::SugarG).unwrap().indented);
    }
}
