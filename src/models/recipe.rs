//! Recipe model
//!
//! A recipe row plus the editor document (`RecipeState`) that is loaded and
//! saved as one unit.

use std::collections::BTreeMap;

use rmcp::schemars;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use super::{NutrientKey, NutrientProfile, RecipeItem};

pub const DEFAULT_SERVING_WEIGHT_G: f64 = 100.0;

/// Label display options stored with a recipe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct LabelOptions {
    /// Nutrient key to visibility; missing keys are shown
    #[serde(default)]
    pub show_nutrients: BTreeMap<String, bool>,
    /// Declared allergens, insertion ordered, no duplicates
    #[serde(default)]
    pub allergens: Vec<String>,
}

impl LabelOptions {
    pub fn is_visible(&self, key: NutrientKey) -> bool {
        self.show_nutrients.get(key.as_str()).copied().unwrap_or(true)
    }

    pub fn set_visible(&mut self, key: NutrientKey, visible: bool) {
        self.show_nutrients.insert(key.as_str().to_string(), visible);
    }

    /// Add or remove an allergen; blank names are ignored
    pub fn set_allergen(&mut self, allergen: &str, present: bool) {
        let allergen = allergen.trim();
        if allergen.is_empty() {
            return;
        }
        let existing = self.allergens.iter().position(|a| a == allergen);
        match (present, existing) {
            (true, None) => self.allergens.push(allergen.to_string()),
            (false, Some(idx)) => {
                self.allergens.remove(idx);
            }
            _ => {}
        }
    }
}

/// One ingredient line of a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RecipeIngredientLine {
    pub ingredient_id: i64,
    pub ingredient_name: String,
    #[serde(default)]
    pub quantity_g: f64,
    /// Profile captured when the line was added
    #[serde(default)]
    pub details: NutrientProfile,
}

/// The full editable recipe document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RecipeState {
    pub recipe_name: String,
    #[serde(default = "default_serving_weight")]
    pub serving_weight_g: f64,
    #[serde(default = "default_servings_count")]
    pub servings_count: i64,
    #[serde(default)]
    pub final_weight_g: Option<f64>,
    #[serde(default)]
    pub ingredients: Vec<RecipeIngredientLine>,
    #[serde(default)]
    pub label_options: LabelOptions,
}

fn default_serving_weight() -> f64 {
    DEFAULT_SERVING_WEIGHT_G
}

fn default_servings_count() -> i64 {
    1
}

impl RecipeState {
    pub fn new(recipe_name: impl Into<String>) -> Self {
        Self {
            recipe_name: recipe_name.into(),
            serving_weight_g: DEFAULT_SERVING_WEIGHT_G,
            servings_count: 1,
            final_weight_g: None,
            ingredients: Vec::new(),
            label_options: LabelOptions::default(),
        }
    }

    pub fn position_of(&self, ingredient_id: i64) -> Option<usize> {
        self.ingredients
            .iter()
            .position(|line| line.ingredient_id == ingredient_id)
    }

    pub fn contains(&self, ingredient_id: i64) -> bool {
        self.position_of(ingredient_id).is_some()
    }

    /// Final weight override; unset or 0 means the raw total weight
    ///
    /// A negative override is kept so the panel shows the placeholder.
    pub fn final_weight_override(&self) -> Option<f64> {
        self.final_weight_g.filter(|w| w.is_finite() && *w != 0.0)
    }
}

/// A recipe row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub recipe_name: String,
    pub serving_weight_g: f64,
    pub final_weight_g: Option<f64>,
    pub servings_count: i64,
    pub label_options: LabelOptions,
    pub created_at: String,
    pub updated_at: String,
}

/// Metadata written on save
#[derive(Debug, Clone)]
pub struct RecipeUpdate {
    pub recipe_name: String,
    pub serving_weight_g: f64,
    pub final_weight_g: Option<f64>,
    pub servings_count: i64,
    pub label_options: LabelOptions,
}

impl Recipe {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let label_options: Option<String> = row.get("label_options")?;
        let label_options = label_options
            .and_then(|raw| match serde_json::from_str(&raw) {
                Ok(options) => Some(options),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring unreadable label options");
                    None
                }
            })
            .unwrap_or_default();

        Ok(Self {
            id: row.get("id")?,
            recipe_name: row.get("recipe_name")?,
            serving_weight_g: row.get("serving_weight_g")?,
            final_weight_g: row.get("final_weight_g")?,
            servings_count: row.get("servings_count")?,
            label_options,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert an empty recipe
    pub fn create(conn: &Connection, recipe_name: &str) -> DbResult<Self> {
        conn.execute(
            "INSERT INTO recipes (recipe_name, label_options) VALUES (?1, ?2)",
            params![recipe_name, serde_json::to_string(&LabelOptions::default())?],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or(DbError::NotFound("recipe", id))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let recipe = conn
            .query_row("SELECT * FROM recipes WHERE id = ?1", [id], Self::from_row)
            .optional()?;
        Ok(recipe)
    }

    /// Most recently edited first
    pub fn list(conn: &Connection, limit: i64, offset: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM recipes ORDER BY updated_at DESC, id DESC LIMIT ?1 OFFSET ?2",
        )?;
        let recipes = stmt
            .query_map(params![limit, offset], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(recipes)
    }

    /// Name search, alphabetical
    pub fn search(conn: &Connection, query: &str, limit: i64) -> DbResult<Vec<Self>> {
        let pattern = format!("%{}%", query.trim());
        let mut stmt = conn.prepare(
            "SELECT * FROM recipes WHERE recipe_name LIKE ?1 ORDER BY recipe_name ASC LIMIT ?2",
        )?;
        let recipes = stmt
            .query_map(params![pattern, limit], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(recipes)
    }

    pub fn update(conn: &Connection, id: i64, data: &RecipeUpdate) -> DbResult<bool> {
        let rows = conn.execute(
            r#"
            UPDATE recipes SET
                recipe_name = ?1,
                serving_weight_g = ?2,
                final_weight_g = ?3,
                servings_count = ?4,
                label_options = ?5,
                updated_at = datetime('now')
            WHERE id = ?6
            "#,
            params![
                data.recipe_name,
                data.serving_weight_g,
                data.final_weight_g,
                data.servings_count,
                serde_json::to_string(&data.label_options)?,
                id,
            ],
        )?;
        Ok(rows > 0)
    }

    /// Delete a recipe; its items cascade
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM recipes WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    /// Names of products made from this recipe
    pub fn used_by_products(conn: &Connection, id: i64) -> DbResult<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT product_name FROM products WHERE recipe_id = ?1 ORDER BY product_name",
        )?;
        let names = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// Build the editor document with lines in stored order
    pub fn load_state(conn: &Connection, id: i64) -> DbResult<Option<RecipeState>> {
        let Some(recipe) = Self::get_by_id(conn, id)? else {
            return Ok(None);
        };
        let ingredients = RecipeItem::lines_for_recipe(conn, id)?;
        Ok(Some(recipe.into_state(ingredients)))
    }

    pub fn into_state(self, ingredients: Vec<RecipeIngredientLine>) -> RecipeState {
        RecipeState {
            recipe_name: self.recipe_name,
            serving_weight_g: self.serving_weight_g,
            servings_count: self.servings_count,
            final_weight_g: self.final_weight_g,
            ingredients,
            label_options: self.label_options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_label_options_visibility_defaults_to_shown() {
        let mut options = LabelOptions::default();
        assert!(options.is_visible(NutrientKey::SugarG));
        options.set_visible(NutrientKey::SugarG, false);
        assert!(!options.is_visible(NutrientKey::SugarG));
        assert!(options.is_visible(NutrientKey::FatG));
    }

    #[test]
    fn test_allergens_behave_as_ordered_set() {
        let mut options = LabelOptions::default();
        options.set_allergen("milk", true);
        options.set_allergen("egg", true);
        options.set_allergen("milk", true);
        options.set_allergen("  ", true);
        assert_eq!(options.allergens, vec!["milk", "egg"]);
        options.set_allergen("milk", false);
        assert_eq!(options.allergens, vec!["egg"]);
    }

    #[test]
    fn test_state_deserializes_with_defaults() {
        let state: RecipeState = serde_json::from_str(r#"{"recipe_name": "Scones"}"#).unwrap();
        assert_eq!(state.servings_count, 1);
        assert_eq!(state.serving_weight_g, 100.0);
        assert!(state.final_weight_g.is_none());
        assert!(state.ingredients.is_empty());
    }

    #[test]
    fn test_create_update_roundtrip() {
        let conn = setup();
        let recipe = Recipe::create(&conn, "Sourdough").unwrap();
        assert_eq!(recipe.servings_count, 1);
        assert_eq!(recipe.serving_weight_g, 100.0);

        let mut options = LabelOptions::default();
        options.set_allergen("wheat", true);
        let updated = Recipe::update(
            &conn,
            recipe.id,
            &RecipeUpdate {
                recipe_name: "Country loaf".to_string(),
                serving_weight_g: 90.0,
                final_weight_g: Some(900.0),
                servings_count: 10,
                label_options: options.clone(),
            },
        )
        .unwrap();
        assert!(updated);

        let state = Recipe::load_state(&conn, recipe.id).unwrap().unwrap();
        assert_eq!(state.recipe_name, "Country loaf");
        assert_eq!(state.final_weight_g, Some(900.0));
        assert_eq!(state.label_options, options);
        assert!(Recipe::load_state(&conn, 9999).unwrap().is_none());
    }
}
