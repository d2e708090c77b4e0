//! Shared nutrition data structures
//!
//! Used across ingredients, recipe lines, and label rendering. All values are
//! per 100 g unless a function says otherwise.

use rmcp::schemars;
use serde::{Deserialize, Serialize};

/// Nutrient amounts
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(default)]
pub struct Nutrients {
    pub calories_kcal: f64,
    pub protein_g: f64,
    pub fat_g: f64,
    pub saturated_fat_g: f64,
    pub trans_fat_g: f64,
    pub carbohydrate_g: f64,
    pub sugar_g: f64,
    pub sodium_mg: f64,
}

impl Nutrients {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Scale every value by a multiplier
    pub fn scale(&self, multiplier: f64) -> Self {
        Self {
            calories_kcal: self.calories_kcal * multiplier,
            protein_g: self.protein_g * multiplier,
            fat_g: self.fat_g * multiplier,
            saturated_fat_g: self.saturated_fat_g * multiplier,
            trans_fat_g: self.trans_fat_g * multiplier,
            carbohydrate_g: self.carbohydrate_g * multiplier,
            sugar_g: self.sugar_g * multiplier,
            sodium_mg: self.sodium_mg * multiplier,
        }
    }

    /// Apply a function to every value
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            calories_kcal: f(self.calories_kcal),
            protein_g: f(self.protein_g),
            fat_g: f(self.fat_g),
            saturated_fat_g: f(self.saturated_fat_g),
            trans_fat_g: f(self.trans_fat_g),
            carbohydrate_g: f(self.carbohydrate_g),
            sugar_g: f(self.sugar_g),
            sodium_mg: f(self.sodium_mg),
        }
    }

    pub fn add(&self, other: &Nutrients) -> Self {
        Self {
            calories_kcal: self.calories_kcal + other.calories_kcal,
            protein_g: self.protein_g + other.protein_g,
            fat_g: self.fat_g + other.fat_g,
            saturated_fat_g: self.saturated_fat_g + other.saturated_fat_g,
            trans_fat_g: self.trans_fat_g + other.trans_fat_g,
            carbohydrate_g: self.carbohydrate_g + other.carbohydrate_g,
            sugar_g: self.sugar_g + other.sugar_g,
            sodium_mg: self.sodium_mg + other.sodium_mg,
        }
    }

    pub fn get(&self, key: NutrientKey) -> f64 {
        match key {
            NutrientKey::CaloriesKcal => self.calories_kcal,
            NutrientKey::ProteinG => self.protein_g,
            NutrientKey::FatG => self.fat_g,
            NutrientKey::SaturatedFatG => self.saturated_fat_g,
            NutrientKey::TransFatG => self.trans_fat_g,
            NutrientKey::CarbohydrateG => self.carbohydrate_g,
            NutrientKey::SugarG => self.sugar_g,
            NutrientKey::SodiumMg => self.sodium_mg,
        }
    }

    pub fn set(&mut self, key: NutrientKey, value: f64) {
        let slot = match key {
            NutrientKey::CaloriesKcal => &mut self.calories_kcal,
            NutrientKey::ProteinG => &mut self.protein_g,
            NutrientKey::FatG => &mut self.fat_g,
            NutrientKey::SaturatedFatG => &mut self.saturated_fat_g,
            NutrientKey::TransFatG => &mut self.trans_fat_g,
            NutrientKey::CarbohydrateG => &mut self.carbohydrate_g,
            NutrientKey::SugarG => &mut self.sugar_g,
            NutrientKey::SodiumMg => &mut self.sodium_mg,
        };
        *slot = value;
    }
}

impl std::ops::Add for Nutrients {
    type Output = Nutrients;

    fn add(self, other: Nutrients) -> Nutrients {
        Nutrients::add(&self, &other)
    }
}

impl std::ops::Mul<f64> for Nutrients {
    type Output = Nutrients;

    fn mul(self, multiplier: f64) -> Nutrients {
        self.scale(multiplier)
    }
}

impl std::iter::Sum for Nutrients {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Nutrients::zero(), |acc, n| acc + n)
    }
}

fn default_unit_name() -> String {
    "g".to_string()
}

/// Per-100 g nutrient profile plus cost, as carried on a recipe line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NutrientProfile {
    #[serde(flatten)]
    pub nutrients: Nutrients,
    /// Cost per 100 g
    #[serde(default)]
    pub cost_per_unit: f64,
    #[serde(default = "default_unit_name")]
    pub unit_name: String,
}

impl Default for NutrientProfile {
    fn default() -> Self {
        Self {
            nutrients: Nutrients::zero(),
            cost_per_unit: 0.0,
            unit_name: default_unit_name(),
        }
    }
}

/// Nutrient keys in fixed label order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NutrientKey {
    CaloriesKcal,
    ProteinG,
    FatG,
    SaturatedFatG,
    TransFatG,
    CarbohydrateG,
    SugarG,
    SodiumMg,
}

impl NutrientKey {
    pub const ALL: [NutrientKey; 8] = [
        NutrientKey::CaloriesKcal,
        NutrientKey::ProteinG,
        NutrientKey::FatG,
        NutrientKey::SaturatedFatG,
        NutrientKey::TransFatG,
        NutrientKey::CarbohydrateG,
        NutrientKey::SugarG,
        NutrientKey::SodiumMg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NutrientKey::CaloriesKcal => "calories_kcal",
            NutrientKey::ProteinG => "protein_g",
            NutrientKey::FatG => "fat_g",
            NutrientKey::SaturatedFatG => "saturated_fat_g",
            NutrientKey::TransFatG => "trans_fat_g",
            NutrientKey::CarbohydrateG => "carbohydrate_g",
            NutrientKey::SugarG => "sugar_g",
            NutrientKey::SodiumMg => "sodium_mg",
        }
    }

    pub fn from_key(s: &str) -> Option<Self> {
        NutrientKey::ALL.into_iter().find(|key| key.as_str() == s)
    }

    /// Label text for the nutrition table
    pub fn display_name(&self) -> &'static str {
        match self {
            NutrientKey::CaloriesKcal => "Calories",
            NutrientKey::ProteinG => "Protein",
            NutrientKey::FatG => "Fat",
            NutrientKey::SaturatedFatG => "Saturated fat",
            NutrientKey::TransFatG => "Trans fat",
            NutrientKey::CarbohydrateG => "Carbohydrate",
            NutrientKey::SugarG => "Sugar",
            NutrientKey::SodiumMg => "Sodium",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            NutrientKey::CaloriesKcal => "kcal",
            NutrientKey::SodiumMg => "mg",
            _ => "g",
        }
    }

    /// Sub-items of fat and carbohydrate
    pub fn is_indented(&self) -> bool {
        matches!(
            self,
            NutrientKey::SaturatedFatG | NutrientKey::TransFatG | NutrientKey::SugarG
        )
    }

    /// Decimal places when rendered
    pub fn decimals(&self) -> usize {
        match self {
            NutrientKey::SodiumMg => 0,
            _ => 1,
        }
    }
}
