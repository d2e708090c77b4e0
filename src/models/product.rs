//! Product model
//!
//! A sellable item made from a recipe plus the production parameters its cost
//! is derived from.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::costing::ProductionParams;
use crate::db::{DbError, DbResult};

/// A product row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub product_name: String,
    pub description: Option<String>,
    pub recipe_id: i64,
    pub selling_price: f64,
    pub stock_quantity: i64,
    pub batch_size: i64,
    pub bake_power_w: f64,
    pub bake_time_min: f64,
    pub production_time_hr: f64,
    /// Average cost per product
    pub calculated_cost: f64,
    pub created_at: String,
    pub updated_at: String,
}

/// Validated product fields
#[derive(Debug, Clone)]
pub struct ProductData {
    pub product_name: String,
    pub description: Option<String>,
    pub selling_price: f64,
    pub stock_quantity: i64,
    pub batch_size: i64,
    pub bake_power_w: f64,
    pub bake_time_min: f64,
    pub production_time_hr: f64,
}

impl ProductData {
    pub fn production_params(&self) -> ProductionParams {
        ProductionParams {
            batch_size: self.batch_size,
            bake_power_w: self.bake_power_w,
            bake_time_min: self.bake_time_min,
            production_time_hr: self.production_time_hr,
        }
    }
}

impl Product {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            product_name: row.get("product_name")?,
            description: row.get("description")?,
            recipe_id: row.get("recipe_id")?,
            selling_price: row.get("selling_price")?,
            stock_quantity: row.get("stock_quantity")?,
            batch_size: row.get("batch_size")?,
            bake_power_w: row.get("bake_power_w")?,
            bake_time_min: row.get("bake_time_min")?,
            production_time_hr: row.get("production_time_hr")?,
            calculated_cost: row.get("calculated_cost")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn production_params(&self) -> ProductionParams {
        ProductionParams {
            batch_size: self.batch_size,
            bake_power_w: self.bake_power_w,
            bake_time_min: self.bake_time_min,
            production_time_hr: self.production_time_hr,
        }
    }

    pub fn create(
        conn: &Connection,
        recipe_id: i64,
        data: &ProductData,
        calculated_cost: f64,
    ) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO products (
                product_name, description, recipe_id, selling_price, stock_quantity,
                batch_size, bake_power_w, bake_time_min, production_time_hr, calculated_cost
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                data.product_name,
                data.description,
                recipe_id,
                data.selling_price,
                data.stock_quantity,
                data.batch_size,
                data.bake_power_w,
                data.bake_time_min,
                data.production_time_hr,
                calculated_cost,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or(DbError::NotFound("product", id))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM products WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(product) => Ok(Some(product)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list(conn: &Connection, limit: i64, offset: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM products ORDER BY product_name ASC, id ASC LIMIT ?1 OFFSET ?2",
        )?;
        let products = stmt
            .query_map(params![limit, offset], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(products)
    }

    /// Overwrite the editable fields; the recipe link is fixed
    pub fn update(
        conn: &Connection,
        id: i64,
        data: &ProductData,
        calculated_cost: f64,
    ) -> DbResult<Option<Self>> {
        let rows = conn.execute(
            r#"
            UPDATE products SET
                product_name = ?1, description = ?2, selling_price = ?3, stock_quantity = ?4,
                batch_size = ?5, bake_power_w = ?6, bake_time_min = ?7, production_time_hr = ?8,
                calculated_cost = ?9, updated_at = datetime('now')
            WHERE id = ?10
            "#,
            params![
                data.product_name,
                data.description,
                data.selling_price,
                data.stock_quantity,
                data.batch_size,
                data.bake_power_w,
                data.bake_time_min,
                data.production_time_hr,
                calculated_cost,
                id,
            ],
        )?;

        if rows == 0 {
            return Ok(None);
        }
        Self::get_by_id(conn, id)
    }

    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM products WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}
