//! Ingredient model
//!
//! A raw material with a per-100 g nutrient profile and cost. USER
//! ingredients belong to the shop; TFDA ingredients come from the national
//! food composition table and are read-only.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use super::{NutrientProfile, Nutrients};

/// Where an ingredient record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum IngredientSource {
    #[default]
    User,
    Tfda,
}

impl IngredientSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngredientSource::User => "USER",
            IngredientSource::Tfda => "TFDA",
        }
    }

    /// Unknown sources read as USER
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "TFDA" => IngredientSource::Tfda,
            _ => IngredientSource::User,
        }
    }
}

/// Source filter for ingredient search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceFilter {
    #[default]
    All,
    User,
    Tfda,
}

impl SourceFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFilter::All => "ALL",
            SourceFilter::User => "USER",
            SourceFilter::Tfda => "TFDA",
        }
    }

    /// Unknown filters search everything
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "USER" => SourceFilter::User,
            "TFDA" => SourceFilter::Tfda,
            _ => SourceFilter::All,
        }
    }
}

/// An ingredient row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: i64,
    pub food_name: String,
    pub source: IngredientSource,
    pub tfda_id: Option<String>,
    pub profile: NutrientProfile,
    pub created_at: String,
    pub updated_at: String,
}

/// Result of writing one reference record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TfdaUpsert {
    Inserted(i64),
    Updated(i64),
}

/// Data for creating an ingredient
#[derive(Debug, Clone)]
pub struct IngredientCreate {
    pub food_name: String,
    pub source: IngredientSource,
    pub tfda_id: Option<String>,
    pub profile: NutrientProfile,
}

impl IngredientCreate {
    /// A shop ingredient with every nutrient at zero
    pub fn placeholder(food_name: &str) -> Self {
        Self {
            food_name: food_name.to_string(),
            source: IngredientSource::User,
            tfda_id: None,
            profile: NutrientProfile::default(),
        }
    }
}

impl Ingredient {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            food_name: row.get("food_name")?,
            source: IngredientSource::parse(row.get::<_, String>("source")?.as_str()),
            tfda_id: row.get("tfda_id")?,
            profile: NutrientProfile {
                nutrients: Nutrients {
                    calories_kcal: row.get("calories_kcal")?,
                    protein_g: row.get("protein_g")?,
                    fat_g: row.get("fat_g")?,
                    saturated_fat_g: row.get("saturated_fat_g")?,
                    trans_fat_g: row.get("trans_fat_g")?,
                    carbohydrate_g: row.get("carbohydrate_g")?,
                    sugar_g: row.get("sugar_g")?,
                    sodium_mg: row.get("sodium_mg")?,
                },
                cost_per_unit: row.get("cost_per_unit")?,
                unit_name: row.get("unit_name")?,
            },
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn create(conn: &Connection, data: &IngredientCreate) -> DbResult<Self> {
        let n = &data.profile.nutrients;
        conn.execute(
            r#"
            INSERT INTO ingredients (
                food_name, source, tfda_id, cost_per_unit, unit_name,
                calories_kcal, protein_g, fat_g, saturated_fat_g, trans_fat_g,
                carbohydrate_g, sugar_g, sodium_mg
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                data.food_name,
                data.source.as_str(),
                data.tfda_id,
                data.profile.cost_per_unit,
                data.profile.unit_name,
                n.calories_kcal,
                n.protein_g,
                n.fat_g,
                n.saturated_fat_g,
                n.trans_fat_g,
                n.carbohydrate_g,
                n.sugar_g,
                n.sodium_mg,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or(DbError::NotFound("ingredient", id))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM ingredients WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Name search; an empty query lists everything in the filter
    pub fn search(
        conn: &Connection,
        query: &str,
        filter: SourceFilter,
        limit: i64,
    ) -> DbResult<Vec<Self>> {
        let pattern = format!("%{}%", query.trim());
        let source_clause = match filter {
            SourceFilter::All => "",
            SourceFilter::User => "AND source = 'USER'",
            SourceFilter::Tfda => "AND source = 'TFDA'",
        };
        let sql = format!(
            "SELECT * FROM ingredients WHERE food_name LIKE ?1 {} ORDER BY food_name ASC LIMIT ?2",
            source_clause
        );

        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![pattern, limit], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Exact name lookup, preferring the shop's own record over TFDA
    pub fn find_by_name(conn: &Connection, food_name: &str) -> DbResult<Option<Self>> {
        let item = conn
            .query_row(
                r#"
                SELECT * FROM ingredients
                WHERE food_name = ?1
                ORDER BY CASE source WHEN 'USER' THEN 0 ELSE 1 END, id ASC
                LIMIT 1
                "#,
                [food_name],
                Self::from_row,
            )
            .optional()?;
        Ok(item)
    }

    /// Whether another USER ingredient already has this name
    pub fn user_name_taken(conn: &Connection, food_name: &str, exclude_id: Option<i64>) -> DbResult<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM ingredients WHERE source = 'USER' AND food_name = ?1 AND id != ?2",
            params![food_name, exclude_id.unwrap_or(-1)],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Overwrite name and profile
    pub fn update(conn: &Connection, id: i64, food_name: &str, profile: &NutrientProfile) -> DbResult<Option<Self>> {
        let n = &profile.nutrients;
        let rows = conn.execute(
            r#"
            UPDATE ingredients SET
                food_name = ?1, cost_per_unit = ?2, unit_name = ?3,
                calories_kcal = ?4, protein_g = ?5, fat_g = ?6, saturated_fat_g = ?7,
                trans_fat_g = ?8, carbohydrate_g = ?9, sugar_g = ?10, sodium_mg = ?11,
                updated_at = datetime('now')
            WHERE id = ?12
            "#,
            params![
                food_name,
                profile.cost_per_unit,
                profile.unit_name,
                n.calories_kcal,
                n.protein_g,
                n.fat_g,
                n.saturated_fat_g,
                n.trans_fat_g,
                n.carbohydrate_g,
                n.sugar_g,
                n.sodium_mg,
                id,
            ],
        )?;

        if rows == 0 {
            return Ok(None);
        }
        Self::get_by_id(conn, id)
    }

    /// Insert or refresh a TFDA reference ingredient keyed by `tfda_id`
    ///
    /// Updates touch the name and nutrients only; cost and unit are kept.
    pub fn upsert_tfda(
        conn: &Connection,
        tfda_id: &str,
        food_name: &str,
        nutrients: &Nutrients,
    ) -> DbResult<TfdaUpsert> {
        let existing: Option<i64> = conn
            .query_row("SELECT id FROM ingredients WHERE tfda_id = ?1", [tfda_id], |row| row.get(0))
            .optional()?;

        let Some(id) = existing else {
            let created = Self::create(
                conn,
                &IngredientCreate {
                    food_name: food_name.to_string(),
                    source: IngredientSource::Tfda,
                    tfda_id: Some(tfda_id.to_string()),
                    profile: NutrientProfile {
                        nutrients: *nutrients,
                        ..Default::default()
                    },
                },
            )?;
            return Ok(TfdaUpsert::Inserted(created.id));
        };

        conn.execute(
            r#"
            UPDATE ingredients SET
                food_name = ?1,
                calories_kcal = ?2, protein_g = ?3, fat_g = ?4, saturated_fat_g = ?5,
                trans_fat_g = ?6, carbohydrate_g = ?7, sugar_g = ?8, sodium_mg = ?9,
                updated_at = datetime('now')
            WHERE id = ?10
            "#,
            params![
                food_name,
                nutrients.calories_kcal,
                nutrients.protein_g,
                nutrients.fat_g,
                nutrients.saturated_fat_g,
                nutrients.trans_fat_g,
                nutrients.carbohydrate_g,
                nutrients.sugar_g,
                nutrients.sodium_mg,
                id,
            ],
        )?;
        Ok(TfdaUpsert::Updated(id))
    }

    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM ingredients WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    /// Names of recipes using this ingredient
    pub fn used_in_recipes(conn: &Connection, id: i64) -> DbResult<Vec<String>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT r.recipe_name FROM recipe_items ri
            JOIN recipes r ON r.id = ri.recipe_id
            WHERE ri.ingredient_id = ?1
            ORDER BY r.recipe_name
            "#,
        )?;
        let names = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// Source of the most recent price observation, if any
    pub fn latest_price_source(conn: &Connection, id: i64) -> DbResult<Option<String>> {
        let source = conn
            .query_row(
                r#"
                SELECT source FROM ingredient_prices
                WHERE ingredient_id = ?1
                ORDER BY purchase_date DESC, id DESC
                LIMIT 1
                "#,
                [id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(source)
    }
}
