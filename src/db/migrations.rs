//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 2;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        tracing::info!("applied schema migration v1");
    }

    if current_version < SCHEMA_VERSION {
        migrate_v2(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (?1)", [SCHEMA_VERSION])?;
        tracing::info!("applied schema migration v{}", SCHEMA_VERSION);
    }

    Ok(())
}

/// Migration v1: ingredients, prices, recipes, products
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- INGREDIENTS
        -- Nutrient profile and cost, all per 100 g
        -- ============================================
        CREATE TABLE ingredients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            food_name TEXT NOT NULL,
            source TEXT NOT NULL DEFAULT 'USER' CHECK(source IN ('USER', 'TFDA')),
            tfda_id TEXT UNIQUE,

            cost_per_unit REAL NOT NULL DEFAULT 0,   -- cost per 100 g
            unit_name TEXT NOT NULL DEFAULT 'g',

            calories_kcal REAL NOT NULL DEFAULT 0,
            protein_g REAL NOT NULL DEFAULT 0,
            fat_g REAL NOT NULL DEFAULT 0,
            saturated_fat_g REAL NOT NULL DEFAULT 0,
            trans_fat_g REAL NOT NULL DEFAULT 0,
            carbohydrate_g REAL NOT NULL DEFAULT 0,
            sugar_g REAL NOT NULL DEFAULT 0,
            sodium_mg REAL NOT NULL DEFAULT 0,

            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_ingredients_name ON ingredients(food_name);
        CREATE INDEX idx_ingredients_source ON ingredients(source);

        -- ============================================
        -- INGREDIENT PRICES
        -- Observed purchase prices
        -- ============================================
        CREATE TABLE ingredient_prices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ingredient_id INTEGER NOT NULL REFERENCES ingredients(id) ON DELETE CASCADE,
            source TEXT NOT NULL,
            price REAL NOT NULL,
            quantity REAL NOT NULL,
            unit TEXT NOT NULL,
            purchase_date TEXT NOT NULL DEFAULT (datetime('now')),
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_prices_ingredient ON ingredient_prices(ingredient_id);
        CREATE INDEX idx_prices_date ON ingredient_prices(purchase_date);

        -- ============================================
        -- RECIPES
        -- ============================================
        CREATE TABLE recipes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recipe_name TEXT NOT NULL,
            serving_weight_g REAL NOT NULL DEFAULT 100.0,
            final_weight_g REAL,                  -- baked weight override
            servings_count INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_recipes_name ON recipes(recipe_name);

        -- ============================================
        -- RECIPE ITEMS
        -- Ordered ingredient quantities of a recipe
        -- ============================================
        CREATE TABLE recipe_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            ingredient_id INTEGER NOT NULL REFERENCES ingredients(id) ON DELETE RESTRICT,
            quantity_g REAL NOT NULL,
            position INTEGER NOT NULL,

            UNIQUE(recipe_id, ingredient_id)
        );

        CREATE INDEX idx_recipe_items_recipe ON recipe_items(recipe_id);
        CREATE INDEX idx_recipe_items_ingredient ON recipe_items(ingredient_id);

        -- ============================================
        -- PRODUCTS
        -- Sellable items made from a recipe
        -- ============================================
        CREATE TABLE products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_name TEXT NOT NULL,
            description TEXT,
            recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE RESTRICT,
            selling_price REAL NOT NULL DEFAULT 0,
            stock_quantity INTEGER NOT NULL DEFAULT 0,

            batch_size INTEGER NOT NULL DEFAULT 1,
            bake_power_w REAL NOT NULL DEFAULT 0,
            bake_time_min REAL NOT NULL DEFAULT 0,
            production_time_hr REAL NOT NULL DEFAULT 0,

            -- Average cost per product, always computed by the service
            calculated_cost REAL NOT NULL DEFAULT 0,

            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_products_name ON products(product_name);
        CREATE INDEX idx_products_recipe ON products(recipe_id);
        "#,
    )?;

    Ok(())
}

/// Migration v2: label display options on recipes
fn migrate_v2(conn: &Connection) -> DbResult<()> {
    conn.execute_batch("ALTER TABLE recipes ADD COLUMN label_options TEXT;")?;
    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_label_options_column_exists() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO recipes (recipe_name, label_options) VALUES ('x', '{}')",
            [],
        )
        .unwrap();
    }
}
