//! Recipe item model
//!
//! Ordered ingredient quantities of a recipe. `position` is the display and
//! print order.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;
use super::{Ingredient, RecipeIngredientLine};

/// A stored recipe item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeItem {
    pub id: i64,
    pub recipe_id: i64,
    pub ingredient_id: i64,
    pub quantity_g: f64,
    pub position: i64,
}

impl RecipeItem {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            recipe_id: row.get("recipe_id")?,
            ingredient_id: row.get("ingredient_id")?,
            quantity_g: row.get("quantity_g")?,
            position: row.get("position")?,
        })
    }

    pub fn list_for_recipe(conn: &Connection, recipe_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM recipe_items WHERE recipe_id = ?1 ORDER BY position ASC, id ASC",
        )?;
        let items = stmt
            .query_map([recipe_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Editor lines with the ingredient's current profile
    pub fn lines_for_recipe(conn: &Connection, recipe_id: i64) -> DbResult<Vec<RecipeIngredientLine>> {
        let mut lines = Vec::new();
        for item in Self::list_for_recipe(conn, recipe_id)? {
            if let Some(ingredient) = Ingredient::get_by_id(conn, item.ingredient_id)? {
                lines.push(RecipeIngredientLine {
                    ingredient_id: ingredient.id,
                    ingredient_name: ingredient.food_name,
                    quantity_g: item.quantity_g,
                    details: ingredient.profile,
                });
            }
        }
        Ok(lines)
    }

    /// Replace every item of a recipe; positions follow slice order
    pub fn replace_all(conn: &Connection, recipe_id: i64, items: &[(i64, f64)]) -> DbResult<usize> {
        conn.execute("DELETE FROM recipe_items WHERE recipe_id = ?1", [recipe_id])?;

        let mut stmt = conn.prepare(
            "INSERT INTO recipe_items (recipe_id, ingredient_id, quantity_g, position)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (position, (ingredient_id, quantity_g)) in items.iter().enumerate() {
            stmt.execute(params![recipe_id, ingredient_id, quantity_g, position as i64])?;
        }
        Ok(items.len())
    }
}
