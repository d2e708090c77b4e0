//! bakecost Tools module
//!
//! Service operations behind the admin pages. Each returns the standard
//! response envelope or a plain payload; database failures become `Err(String)`.

pub mod ingredients;
pub mod labels;
pub mod prices;
pub mod products;
pub mod recipes;
pub mod status;
pub mod tfda;
pub mod validation;

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::db::Database;
    use crate::models::{
        Ingredient, IngredientCreate, LabelOptions, Recipe, RecipeItem, RecipeUpdate,
        DEFAULT_SERVING_WEIGHT_G,
    };

    /// Shop ingredient with calories and cost per 100 g; other nutrients zero
    pub fn add_ingredient(db: &Database, name: &str, calories_kcal: f64, cost_per_unit: f64) -> i64 {
        let mut data = IngredientCreate::placeholder(name);
        data.profile.nutrients.calories_kcal = calories_kcal;
        data.profile.cost_per_unit = cost_per_unit;
        db.with_conn(|conn| Ingredient::create(conn, &data))
            .unwrap()
            .id
    }

    /// Stored recipe with the given servings and `(ingredient_id, grams)` lines
    pub fn add_recipe(db: &Database, name: &str, servings_count: i64, items: &[(i64, f64)]) -> i64 {
        db.with_transaction(|tx| {
            let recipe = Recipe::create(tx, name)?;
            Recipe::update(
                tx,
                recipe.id,
                &RecipeUpdate {
                    recipe_name: name.to_string(),
                    serving_weight_g: DEFAULT_SERVING_WEIGHT_G,
                    final_weight_g: None,
                    servings_count,
                    label_options: LabelOptions::default(),
                },
            )?;
            RecipeItem::replace_all(tx, recipe.id, items)?;
            Ok(recipe.id)
        })
        .unwrap()
    }
}
