//! Ingredient price model
//!
//! Observed purchase prices for an ingredient.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};

/// Known price sources
pub const PRICE_SOURCES: [&str; 4] = ["Manual", "PX Mart", "Carrefour", "Shopee"];

/// A price observation joined with its ingredient name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientPrice {
    pub id: i64,
    pub ingredient_id: i64,
    pub ingredient_name: String,
    pub source: String,
    pub price: f64,
    pub quantity: f64,
    pub unit: String,
    pub purchase_date: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields written for a new or edited price
#[derive(Debug, Clone)]
pub struct IngredientPriceData {
    pub source: String,
    pub price: f64,
    pub quantity: f64,
    pub unit: String,
}

const SELECT_JOINED: &str = r#"
    SELECT p.*, i.food_name AS ingredient_name
    FROM ingredient_prices p
    JOIN ingredients i ON i.id = p.ingredient_id
"#;

impl IngredientPrice {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            ingredient_id: row.get("ingredient_id")?,
            ingredient_name: row.get("ingredient_name")?,
            source: row.get("source")?,
            price: row.get("price")?,
            quantity: row.get("quantity")?,
            unit: row.get("unit")?,
            purchase_date: row.get("purchase_date")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn create(conn: &Connection, ingredient_id: i64, data: &IngredientPriceData) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO ingredient_prices (ingredient_id, source, price, quantity, unit)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![ingredient_id, data.source, data.price, data.quantity, data.unit],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or(DbError::NotFound("price", id))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let sql = format!("{} WHERE p.id = ?1", SELECT_JOINED);
        let mut stmt = conn.prepare(&sql)?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(price) => Ok(Some(price)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Newest first
    pub fn list(conn: &Connection, limit: i64, offset: i64) -> DbResult<Vec<Self>> {
        let sql = format!(
            "{} ORDER BY p.purchase_date DESC, p.id DESC LIMIT ?1 OFFSET ?2",
            SELECT_JOINED
        );
        let mut stmt = conn.prepare(&sql)?;
        let prices = stmt
            .query_map(params![limit, offset], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(prices)
    }

    /// Source, price, quantity and unit are editable; the ingredient is not
    pub fn update(conn: &Connection, id: i64, data: &IngredientPriceData) -> DbResult<Option<Self>> {
        let rows = conn.execute(
            r#"
            UPDATE ingredient_prices SET
                source = ?1, price = ?2, quantity = ?3, unit = ?4,
                updated_at = datetime('now')
            WHERE id = ?5
            "#,
            params![data.source, data.price, data.quantity, data.unit, id],
        )?;

        if rows == 0 {
            return Ok(None);
        }
        Self::get_by_id(conn, id)
    }

    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM ingredient_prices WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}
