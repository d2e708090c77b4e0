//! Product Tools
//!
//! Products made from recipes. `calculated_cost` is always derived here from
//! the recipe's current cost snapshot and the production parameters.

use rmcp::schemars;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::api::{ApiResponse, Empty, FieldErrors};
use crate::costing::{round_to, CostBreakdown, CostRates, RawTotals, RecipeCostSnapshot};
use crate::db::{Database, DbResult};
use crate::models::{Ingredient, Product, ProductData, Recipe, RecipeItem};
use super::recipes::cost_snapshot;
use super::validation::Validator;

const LIST_LIMIT_MAX: i64 = 500;

/// Product editor form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ProductForm {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Required on create, ignored on update
    #[serde(default)]
    pub recipe_id: Option<i64>,
    pub selling_price: Option<f64>,
    pub stock_quantity: Option<i64>,
    pub batch_size: Option<i64>,
    pub bake_power_w: Option<f64>,
    pub bake_time_min: Option<f64>,
    pub production_time_hr: Option<f64>,
    /// Accepted for compatibility; never persisted
    #[serde(default, skip_serializing)]
    pub calculated_cost: Option<f64>,
}

/// Per-ingredient cost row of a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeCostLine {
    pub ingredient_id: i64,
    pub ingredient_name: String,
    pub quantity_g: f64,
    pub cost_per_unit: f64,
    pub cost: f64,
    /// Source of the latest price record, if any
    #[serde(default)]
    pub cost_source: Option<String>,
}

/// Payload of `get_recipe_details`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDetails {
    pub recipe_id: i64,
    pub recipe_name: String,
    pub servings_count: i64,
    pub total_ingredient_cost: f64,
    #[serde(default)]
    pub total_weight_g: f64,
    #[serde(default)]
    pub ingredients: Vec<RecipeCostLine>,
}

impl RecipeDetails {
    pub fn snapshot(&self) -> RecipeCostSnapshot {
        RecipeCostSnapshot {
            total_ingredient_cost: self.total_ingredient_cost,
            servings_count: self.servings_count,
        }
    }
}

/// Product with its recipe's cost snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub id: i64,
    pub product_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub selling_price: f64,
    pub stock_quantity: i64,
    pub batch_size: i64,
    pub bake_power_w: f64,
    pub bake_time_min: f64,
    pub production_time_hr: f64,
    #[serde(default)]
    pub calculated_cost: f64,
    pub recipe_id: i64,
    #[serde(default)]
    pub recipe_details: Option<RecipeCostSnapshot>,
}

impl ProductDetail {
    pub fn form(&self) -> ProductForm {
        ProductForm {
            product_name: self.product_name.clone(),
            description: self.description.clone(),
            recipe_id: Some(self.recipe_id),
            selling_price: Some(self.selling_price),
            stock_quantity: Some(self.stock_quantity),
            batch_size: Some(self.batch_size),
            bake_power_w: Some(self.bake_power_w),
            bake_time_min: Some(self.bake_time_min),
            production_time_hr: Some(self.production_time_hr),
            calculated_cost: None,
        }
    }
}

/// `{product_id}` payload of create
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCreated {
    #[serde(default)]
    pub product_id: Option<i64>,
}

/// Product list row
#[derive(Debug, Clone, Serialize)]
pub struct ProductListItem {
    #[serde(flatten)]
    pub product: Product,
    pub recipe_name: Option<String>,
    /// Selling price minus average cost
    pub margin: f64,
}

fn validate(form: &ProductForm, require_recipe: bool) -> Result<ProductData, FieldErrors> {
    let mut v = Validator::new();
    if require_recipe && form.recipe_id.is_none() {
        v.push("recipe_id", "Select a recipe.");
    }
    v.length("product_name", &form.product_name, 2, 128);
    v.max_length("description", form.description.as_deref(), 500);
    let selling_price = v.at_least("selling_price", form.selling_price, 0.0);
    let stock_quantity = v.int_at_least("stock_quantity", form.stock_quantity, 0);
    let batch_size = v.int_at_least("batch_size", form.batch_size, 1);
    let bake_power_w = v.at_least("bake_power_w", form.bake_power_w, 0.0);
    let bake_time_min = v.at_least("bake_time_min", form.bake_time_min, 0.0);
    let production_time_hr = v.at_least("production_time_hr", form.production_time_hr, 0.0);
    v.finish()?;

    let description = form
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    Ok(ProductData {
        product_name: form.product_name.trim().to_string(),
        description,
        selling_price,
        stock_quantity,
        batch_size,
        bake_power_w,
        bake_time_min,
        production_time_hr,
    })
}

fn average_cost(snapshot: &RecipeCostSnapshot, data: &ProductData, rates: &CostRates) -> f64 {
    CostBreakdown::compute(Some(snapshot), &data.production_params(), rates)
        .rounded()
        .avg_cost_per_product
}

fn recipe_snapshot(conn: &Connection, recipe_id: i64) -> DbResult<Option<RecipeCostSnapshot>> {
    match Recipe::get_by_id(conn, recipe_id)? {
        Some(recipe) => Ok(Some(cost_snapshot(conn, &recipe)?)),
        None => Ok(None),
    }
}

/// Cost snapshot and per-ingredient cost rows of a recipe
pub fn get_recipe_details(db: &Database, recipe_id: i64) -> Result<ApiResponse<RecipeDetails>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let Some(recipe) = Recipe::get_by_id(&conn, recipe_id).map_err(|e| format!("Database error: {}", e))? else {
        return Ok(ApiResponse::failure("Recipe not found."));
    };

    let lines = RecipeItem::lines_for_recipe(&conn, recipe_id)
        .map_err(|e| format!("Failed to load recipe items: {}", e))?;
    let totals = RawTotals::from_lines(&lines);

    let mut ingredients = Vec::with_capacity(lines.len());
    for line in &lines {
        let cost_source = Ingredient::latest_price_source(&conn, line.ingredient_id)
            .map_err(|e| format!("Database error: {}", e))?;
        ingredients.push(RecipeCostLine {
            ingredient_id: line.ingredient_id,
            ingredient_name: line.ingredient_name.clone(),
            quantity_g: line.quantity_g,
            cost_per_unit: line.details.cost_per_unit,
            cost: round_to(line.details.cost_per_unit / 100.0 * line.quantity_g, 2),
            cost_source,
        });
    }

    Ok(ApiResponse::success(
        "",
        RecipeDetails {
            recipe_id: recipe.id,
            recipe_name: recipe.recipe_name,
            servings_count: recipe.servings_count,
            total_ingredient_cost: round_to(totals.total_cost, 2),
            total_weight_g: round_to(totals.total_weight_g, 1),
            ingredients,
        },
    ))
}

pub fn create_product(
    db: &Database,
    rates: &CostRates,
    form: ProductForm,
) -> Result<ApiResponse<ProductCreated>, String> {
    let data = match validate(&form, true) {
        Ok(data) => data,
        Err(errors) => return Ok(ApiResponse::invalid("Validation failed.", errors)),
    };
    let Some(recipe_id) = form.recipe_id else {
        return Ok(ApiResponse::failure("Select a recipe."));
    };

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let Some(snapshot) = recipe_snapshot(&conn, recipe_id).map_err(|e| format!("Database error: {}", e))? else {
        return Ok(ApiResponse::failure("The selected recipe does not exist."));
    };

    let cost = average_cost(&snapshot, &data, rates);
    let product = Product::create(&conn, recipe_id, &data, cost)
        .map_err(|e| format!("Failed to create product: {}", e))?;
    tracing::info!(id = product.id, recipe_id, calculated_cost = cost, "product created");

    Ok(ApiResponse::success(
        format!("Product \"{}\" created.", product.product_name),
        ProductCreated {
            product_id: Some(product.id),
        },
    ))
}

pub fn get_product(db: &Database, id: i64) -> Result<ApiResponse<ProductDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let Some(product) = Product::get_by_id(&conn, id).map_err(|e| format!("Database error: {}", e))? else {
        return Ok(ApiResponse::failure("Product not found."));
    };
    let recipe_details = recipe_snapshot(&conn, product.recipe_id)
        .map_err(|e| format!("Failed to cost recipe: {}", e))?;

    Ok(ApiResponse::success(
        "",
        ProductDetail {
            id: product.id,
            product_name: product.product_name,
            description: product.description,
            selling_price: product.selling_price,
            stock_quantity: product.stock_quantity,
            batch_size: product.batch_size,
            bake_power_w: product.bake_power_w,
            bake_time_min: product.bake_time_min,
            production_time_hr: product.production_time_hr,
            calculated_cost: product.calculated_cost,
            recipe_id: product.recipe_id,
            recipe_details,
        },
    ))
}

/// Update a product and recompute its cost from the current recipe
pub fn update_product(
    db: &Database,
    rates: &CostRates,
    id: i64,
    form: ProductForm,
) -> Result<ApiResponse<Empty>, String> {
    let data = match validate(&form, false) {
        Ok(data) => data,
        Err(errors) => return Ok(ApiResponse::invalid("Validation failed.", errors)),
    };

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let Some(existing) = Product::get_by_id(&conn, id).map_err(|e| format!("Database error: {}", e))? else {
        return Ok(ApiResponse::failure("Product not found."));
    };
    let snapshot = recipe_snapshot(&conn, existing.recipe_id)
        .map_err(|e| format!("Database error: {}", e))?
        .unwrap_or_default();

    let cost = average_cost(&snapshot, &data, rates);
    Product::update(&conn, id, &data, cost).map_err(|e| format!("Failed to update product: {}", e))?;
    tracing::info!(id, calculated_cost = cost, "product updated");

    Ok(ApiResponse::ok(format!("Product \"{}\" updated.", data.product_name)))
}

pub fn delete_product(db: &Database, id: i64) -> Result<ApiResponse<Empty>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let Some(product) = Product::get_by_id(&conn, id).map_err(|e| format!("Database error: {}", e))? else {
        return Ok(ApiResponse::failure("Product not found."));
    };
    Product::delete(&conn, id).map_err(|e| format!("Failed to delete product: {}", e))?;
    Ok(ApiResponse::ok(format!("Product \"{}\" deleted.", product.product_name)))
}

/// Products by name with their recipe and margin
pub fn list_products(db: &Database, limit: i64, offset: i64) -> Result<Vec<ProductListItem>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let products = Product::list(&conn, limit.clamp(1, LIST_LIMIT_MAX), offset.max(0))
        .map_err(|e| format!("Failed to list products: {}", e))?;

    let mut items = Vec::with_capacity(products.len());
    for product in products {
        let recipe_name = Recipe::get_by_id(&conn, product.recipe_id)
            .map_err(|e| format!("Database error: {}", e))?
            .map(|r| r.recipe_name);
        let margin = round_to(product.selling_price - product.calculated_cost, 2);
        items.push(ProductListItem {
            product,
            recipe_name,
            margin,
        });
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_db;
    use crate::tools::fixtures::{add_ingredient, add_recipe};

    fn rates() -> CostRates {
        CostRates {
            electricity_cost_per_kwh: 5.0,
            labor_cost_per_hour: 200.0,
        }
    }

    fn form(recipe_id: Option<i64>) -> ProductForm {
        ProductForm {
            product_name: "Sourdough loaf".to_string(),
            description: Some("  ".to_string()),
            recipe_id,
            selling_price: Some(25.0),
            stock_quantity: Some(0),
            batch_size: Some(24),
            bake_power_w: Some(1000.0),
            bake_time_min: Some(30.0),
            production_time_hr: Some(0.5),
            calculated_cost: None,
        }
    }

    /// Recipe costing exactly 120 with 12 servings
    fn reference_recipe(db: &Database) -> i64 {
        let flour = add_ingredient(db, "Flour", 364.0, 20.0);
        add_recipe(db, "Sourdough", 12, &[(flour, 600.0)])
    }

    #[test]
    fn test_cost_is_computed_server_side() {
        let (_dir, db) = temp_db();
        let recipe_id = reference_recipe(&db);

        let mut submitted = form(Some(recipe_id));
        submitted.calculated_cost = Some(1.0);
        let created = create_product(&db, &rates(), submitted).unwrap();
        assert!(created.is_success(), "{}", created.message);
        let id = created.payload.unwrap().product_id.unwrap();

        let product = get_product(&db, id).unwrap().payload.unwrap();
        assert_eq!(product.calculated_cost, 14.27);
        assert_eq!(product.description, None);
        assert_eq!(
            product.recipe_details,
            Some(RecipeCostSnapshot {
                total_ingredient_cost: 120.0,
                servings_count: 12
            })
        );
    }

    #[test]
    fn test_update_recomputes_cost() {
        let (_dir, db) = temp_db();
        let recipe_id = reference_recipe(&db);
        let id = create_product(&db, &rates(), form(Some(recipe_id)))
            .unwrap()
            .payload
            .unwrap()
            .product_id
            .unwrap();

        let mut changed = form(None);
        changed.production_time_hr = Some(0.0);
        changed.bake_power_w = Some(0.0);
        assert!(update_product(&db, &rates(), id, changed).unwrap().is_success());
        assert_eq!(get_product(&db, id).unwrap().payload.unwrap().calculated_cost, 10.0);
    }

    #[test]
    fn test_validation_messages() {
        let (_dir, db) = temp_db();
        let mut bad = form(None);
        bad.product_name = "x".to_string();
        bad.batch_size = Some(0);
        bad.selling_price = Some(-1.0);

        let resp = create_product(&db, &rates(), bad).unwrap();
        let errors = resp.errors.unwrap();
        for field in ["product_name", "batch_size", "selling_price", "recipe_id"] {
            assert!(errors.contains_key(field), "missing error for {}", field);
        }

        let missing_recipe = create_product(&db, &rates(), form(None)).unwrap();
        assert!(missing_recipe.errors.unwrap().contains_key("recipe_id"));
        assert!(!create_product(&db, &rates(), form(Some(404))).unwrap().is_success());
    }

    #[test]
    fn test_recipe_details_and_delete_guard() {
        let (_dir, db) = temp_db();
        let recipe_id = reference_recipe(&db);
        let details = get_recipe_details(&db, recipe_id).unwrap().payload.unwrap();
        assert_eq!(details.total_ingredient_cost, 120.0);
        assert_eq!(details.total_weight_g, 600.0);
        assert_eq!(details.ingredients[0].cost_source, None);

        let id = create_product(&db, &rates(), form(Some(recipe_id)))
            .unwrap()
            .payload
            .unwrap()
            .product_id
            .unwrap();
        let blocked = crate::tools::recipes::delete_recipe(&db, recipe_id).unwrap();
        assert!(!blocked.is_success());
        assert!(blocked.message.contains("Sourdough loaf"));

        assert!(delete_product(&db, id).unwrap().is_success());
        assert!(crate::tools::recipes::delete_recipe(&db, recipe_id).unwrap().is_success());
        assert!(list_products(&db, 50, 0).unwrap().is_empty());
    }
}
