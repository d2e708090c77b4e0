//! Product cost breakdown
//!
//! Ingredient, electricity and labor cost of one production batch. The same
//! calculation backs the live preview and the persisted `calculated_cost`.

use serde::{Deserialize, Serialize};

use super::round_to;

/// Shop-wide cost rates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostRates {
    pub electricity_cost_per_kwh: f64,
    pub labor_cost_per_hour: f64,
}

impl Default for CostRates {
    fn default() -> Self {
        Self {
            electricity_cost_per_kwh: crate::config::DEFAULT_ELECTRICITY_COST_PER_KWH,
            labor_cost_per_hour: crate::config::DEFAULT_LABOR_COST_PER_HOUR,
        }
    }
}

/// Production parameters of a product
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductionParams {
    pub batch_size: i64,
    pub bake_power_w: f64,
    pub bake_time_min: f64,
    pub production_time_hr: f64,
}

/// What a product needs to know about its recipe
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RecipeCostSnapshot {
    pub total_ingredient_cost: f64,
    pub servings_count: i64,
}

/// Cost figures for one batch
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub ingredient_cost_per_serving: f64,
    pub batch_ingredient_cost: f64,
    pub electricity_cost: f64,
    pub labor_cost: f64,
    pub total_batch_cost: f64,
    pub avg_cost_per_product: f64,
}

impl CostBreakdown {
    /// Compute the breakdown; without a recipe every figure is zero
    pub fn compute(
        recipe: Option<&RecipeCostSnapshot>,
        params: &ProductionParams,
        rates: &CostRates,
    ) -> Self {
        let Some(recipe) = recipe else {
            return Self::default();
        };

        let ingredient_cost_per_serving =
            recipe.total_ingredient_cost / recipe.servings_count.max(1) as f64;
        let batch_ingredient_cost = ingredient_cost_per_serving * params.batch_size as f64;

        let electricity_cost = if params.bake_power_w > 0.0 && params.bake_time_min > 0.0 {
            let kwh = params.bake_power_w * (params.bake_time_min / 60.0) / 1000.0;
            kwh * rates.electricity_cost_per_kwh
        } else {
            0.0
        };

        let labor_cost = params.production_time_hr * rates.labor_cost_per_hour;
        let total_batch_cost = batch_ingredient_cost + electricity_cost + labor_cost;

        let avg_cost_per_product = if params.batch_size > 0 {
            total_batch_cost / params.batch_size as f64
        } else {
            0.0
        };

        Self {
            ingredient_cost_per_serving,
            batch_ingredient_cost,
            electricity_cost,
            labor_cost,
            total_batch_cost,
            avg_cost_per_product,
        }
    }

    /// Currency figures rounded to 2 decimals for display and storage
    pub fn rounded(&self) -> Self {
        Self {
            ingredient_cost_per_serving: round_to(self.ingredient_cost_per_serving, 2),
            batch_ingredient_cost: round_to(self.batch_ingredient_cost, 2),
            electricity_cost: round_to(self.electricity_cost, 2),
            labor_cost: round_to(self.labor_cost, 2),
            total_batch_cost: round_to(self.total_batch_cost, 2),
            avg_cost_per_product: round_to(self.avg_cost_per_product, 2),
        }
    }
}
