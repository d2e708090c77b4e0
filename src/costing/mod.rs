//! Costing core
//!
//! Pure calculations shared by the service and the editor controllers.

pub mod label;
pub mod product_cost;
pub mod recipe_totals;
pub mod units;

pub use label::{generate_label, LabelData};
pub use product_cost::{CostBreakdown, CostRates, ProductionParams, RecipeCostSnapshot};
pub use recipe_totals::{recompute, NutritionPanel, NutritionRow, RawTotals, Recomputation};
pub use units::{cost_per_100g, grams_per_unit};

/// Round half away from zero to a number of decimals
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(14.270833, 2), 14.27);
        assert_eq!(round_to(2.25, 1), 2.3);
        assert_eq!(round_to(110.6, 0), 111.0);
        assert_eq!(round_to(-1.25, 1), -1.3);
    }
}
