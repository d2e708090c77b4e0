//! Recipe Tools
//!
//! Recipe lifecycle: create, list, load the editor document, save it as a full
//! overwrite, delete, and build label data.

use rmcp::schemars;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::api::{ApiResponse, Empty, FieldErrors};
use crate::costing::{generate_label, round_to, LabelData, RawTotals, RecipeCostSnapshot};
use crate::db::{Database, DbResult};
use crate::models::{
    Ingredient, Recipe, RecipeIngredientLine, RecipeItem, RecipeState, RecipeUpdate,
    DEFAULT_SERVING_WEIGHT_G,
};
use super::validation::Validator;

const LIST_LIMIT_MAX: i64 = 200;
const SEARCH_LIMIT: i64 = 20;

/// Payload of a newly created recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeCreated {
    pub recipe_id: i64,
    pub recipe_name: String,
}

/// Recipe list row with cost snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub total_ingredient_cost: f64,
    #[serde(default = "one")]
    pub servings_count: i64,
}

fn one() -> i64 {
    1
}

impl RecipeSummary {
    pub fn snapshot(&self) -> RecipeCostSnapshot {
        RecipeCostSnapshot {
            total_ingredient_cost: self.total_ingredient_cost,
            servings_count: self.servings_count,
        }
    }
}

/// Payload of the editor document endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDocument {
    pub recipe_id: i64,
    pub recipe: RecipeState,
}

/// Label preview payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct LabelPreview {
    pub product_name: String,
    pub ingredients: String,
    pub net_weight: String,
    pub nutrition: String,
    pub allergens: String,
}

/// Total ingredient cost of a recipe's stored lines, rounded to cents
pub(crate) fn cost_snapshot(conn: &Connection, recipe: &Recipe) -> DbResult<RecipeCostSnapshot> {
    let lines = RecipeItem::lines_for_recipe(conn, recipe.id)?;
    let totals = RawTotals::from_lines(&lines);
    Ok(RecipeCostSnapshot {
        total_ingredient_cost: round_to(totals.total_cost, 2),
        servings_count: recipe.servings_count,
    })
}

fn summary(conn: &Connection, recipe: Recipe) -> DbResult<RecipeSummary> {
    let snapshot = cost_snapshot(conn, &recipe)?;
    Ok(RecipeSummary {
        id: recipe.id,
        name: recipe.recipe_name,
        total_ingredient_cost: snapshot.total_ingredient_cost,
        servings_count: snapshot.servings_count,
    })
}

/// Create an empty recipe named after the current UTC time
pub fn create_recipe(db: &Database) -> Result<ApiResponse<RecipeCreated>, String> {
    let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S");
    let name = format!("Untitled recipe {}", timestamp);

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let recipe = Recipe::create(&conn, &name).map_err(|e| format!("Failed to create recipe: {}", e))?;
    tracing::info!(id = recipe.id, "recipe created");

    Ok(ApiResponse::success(
        "New recipe created; start editing.",
        RecipeCreated {
            recipe_id: recipe.id,
            recipe_name: recipe.recipe_name,
        },
    ))
}

/// Recipes, most recently edited first
pub fn list_recipes(db: &Database, limit: i64, offset: i64) -> Result<Vec<RecipeSummary>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let recipes = Recipe::list(&conn, limit.clamp(1, LIST_LIMIT_MAX), offset.max(0))
        .map_err(|e| format!("Failed to list recipes: {}", e))?;

    recipes
        .into_iter()
        .map(|r| summary(&conn, r))
        .collect::<DbResult<Vec<_>>>()
        .map_err(|e| format!("Failed to cost recipes: {}", e))
}

/// Name search for the product page; an empty query lists alphabetically
pub fn search_recipes(db: &Database, query: &str) -> Result<Vec<RecipeSummary>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let recipes = Recipe::search(&conn, query, SEARCH_LIMIT)
        .map_err(|e| format!("Search failed: {}", e))?;

    recipes
        .into_iter()
        .map(|r| summary(&conn, r))
        .collect::<DbResult<Vec<_>>>()
        .map_err(|e| format!("Failed to cost recipes: {}", e))
}

/// Load the editor document
pub fn get_recipe(db: &Database, id: i64) -> Result<ApiResponse<RecipeDocument>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let state = Recipe::load_state(&conn, id).map_err(|e| format!("Failed to load recipe: {}", e))?;

    Ok(match state {
        Some(recipe) => ApiResponse::success("", RecipeDocument { recipe_id: id, recipe }),
        None => ApiResponse::failure("Recipe not found."),
    })
}

fn validate_state(state: &RecipeState) -> Result<(), FieldErrors> {
    let mut v = Validator::new();
    v.length("recipe_name", &state.recipe_name, 1, 128);
    v.int_at_least("servings_count", Some(state.servings_count), 1);
    if let Some(final_weight_g) = state.final_weight_override() {
        v.at_least("final_weight_g", Some(final_weight_g), 0.0);
    }
    v.finish()
}

/// Replace a recipe with the submitted document
///
/// Lines naming an unknown ingredient or with a non-positive quantity are
/// dropped. Stored order is the order of `state.ingredients`.
pub fn save_recipe(db: &Database, id: i64, state: RecipeState) -> Result<ApiResponse<Empty>, String> {
    if let Err(errors) = validate_state(&state) {
        return Ok(ApiResponse::invalid("Validation failed.", errors));
    }

    let serving_weight_g = if state.serving_weight_g.is_finite() && state.serving_weight_g > 0.0 {
        state.serving_weight_g
    } else {
        DEFAULT_SERVING_WEIGHT_G
    };
    let update = RecipeUpdate {
        recipe_name: state.recipe_name.trim().to_string(),
        serving_weight_g,
        final_weight_g: state.final_weight_override(),
        servings_count: state.servings_count,
        label_options: state.label_options.clone(),
    };

    let saved = db
        .with_transaction(|tx| {
            if Recipe::get_by_id(tx, id)?.is_none() {
                return Ok(None);
            }
            let mut items: Vec<(i64, f64)> = Vec::with_capacity(state.ingredients.len());
            for line in &state.ingredients {
                if !(line.quantity_g > 0.0) {
                    continue;
                }
                if items.iter().any(|(ingredient_id, _)| *ingredient_id == line.ingredient_id) {
                    continue;
                }
                if Ingredient::get_by_id(tx, line.ingredient_id)?.is_some() {
                    items.push((line.ingredient_id, line.quantity_g));
                }
            }
            Recipe::update(tx, id, &update)?;
            Ok(Some(RecipeItem::replace_all(tx, id, &items)?))
        })
        .map_err(|e| format!("Failed to save recipe: {}", e))?;

    Ok(match saved {
        Some(count) => {
            tracing::info!(id, lines = count, "recipe saved");
            ApiResponse::ok("Recipe saved.")
        }
        None => ApiResponse::failure("Recipe not found."),
    })
}

/// Delete a recipe; blocked while a product is made from it
pub fn delete_recipe(db: &Database, id: i64) -> Result<ApiResponse<Empty>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let Some(recipe) = Recipe::get_by_id(&conn, id).map_err(|e| format!("Database error: {}", e))? else {
        return Ok(ApiResponse::failure("Recipe not found."));
    };

    let products = Recipe::used_by_products(&conn, id).map_err(|e| format!("Database error: {}", e))?;
    if !products.is_empty() {
        tracing::warn!(id, products = ?products, "recipe delete blocked");
        return Ok(ApiResponse::failure(format!(
            "\"{}\" is used by products: {}. Delete those products first.",
            recipe.recipe_name,
            products.join(", ")
        )));
    }

    Recipe::delete(&conn, id).map_err(|e| format!("Failed to delete recipe: {}", e))?;
    Ok(ApiResponse::ok(format!("Recipe \"{}\" deleted.", recipe.recipe_name)))
}

/// Label data of a stored recipe
pub fn get_label_data(db: &Database, id: i64) -> Result<Option<LabelData>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let state = Recipe::load_state(&conn, id).map_err(|e| format!("Failed to load recipe: {}", e))?;
    Ok(state.as_ref().map(generate_label))
}

/// Label for an unsaved document, using current ingredient records
pub fn preview_label(db: &Database, state: RecipeState) -> Result<ApiResponse<LabelPreview>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let mut lines: Vec<RecipeIngredientLine> = Vec::with_capacity(state.ingredients.len());
    for line in &state.ingredients {
        if !(line.quantity_g > 0.0) {
            continue;
        }
        let ingredient = Ingredient::get_by_id(&conn, line.ingredient_id)
            .map_err(|e| format!("Failed to load ingredient: {}", e))?;
        if let Some(ingredient) = ingredient {
            lines.push(RecipeIngredientLine {
                ingredient_id: ingredient.id,
                ingredient_name: ingredient.food_name,
                quantity_g: line.quantity_g,
                details: ingredient.profile,
            });
        }
    }

    let preview_state = RecipeState {
        recipe_name: if state.recipe_name.trim().is_empty() {
            "Preview recipe".to_string()
        } else {
            state.recipe_name.clone()
        },
        ingredients: lines,
        ..state
    };
    let label = generate_label(&preview_state);

    Ok(ApiResponse::success(
        "",
        LabelPreview {
            product_name: label.product_name,
            ingredients: format!("Ingredients: {}", label.ingredients),
            net_weight: format!("Net weight: {}", label.net_weight),
            nutrition: label.nutrition,
            allergens: label.allergens,
        },
    ))
}
