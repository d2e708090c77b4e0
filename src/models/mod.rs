//! Data models
//!
//! Rust structs representing database entities.

mod ingredient;
mod ingredient_price;
mod nutrition;
mod product;
mod recipe;
mod recipe_item;

pub use ingredient::{Ingredient, IngredientCreate, IngredientSource, SourceFilter, TfdaUpsert};
pub use ingredient_price::{IngredientPrice, IngredientPriceData, PRICE_SOURCES};
pub use nutrition::{NutrientKey, NutrientProfile, Nutrients};
pub use product::{Product, ProductData};
pub use recipe::{
    LabelOptions, Recipe, RecipeIngredientLine, RecipeState, RecipeUpdate,
    DEFAULT_SERVING_WEIGHT_G,
};
pub use recipe_item::RecipeItem;
