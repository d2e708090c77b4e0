//! Price Tools
//!
//! Price observations for ingredients. Adding a price for an unknown
//! ingredient name creates a zero-nutrient shop ingredient.

use rmcp::schemars;
use serde::{Deserialize, Serialize};

use crate::api::{ApiResponse, Empty, FieldErrors};
use crate::costing::cost_per_100g;
use crate::db::Database;
use crate::models::{
    Ingredient, IngredientCreate, IngredientPrice, IngredientPriceData, SourceFilter, PRICE_SOURCES,
};
use super::validation::Validator;

/// Where the client goes after saving a price
pub const PRICING_INDEX_URL: &str = "/pricing/";

const SEARCH_LIMIT: i64 = 10;

/// The fixed field set of the price form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PriceForm {
    #[serde(default)]
    pub ingredient_name: String,
    #[serde(default)]
    pub source: String,
    pub price: Option<f64>,
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: String,
}

/// Payload of a saved price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSaved {
    pub redirect_url: String,
    #[serde(default)]
    pub price_id: Option<i64>,
}

/// Autocomplete entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientName {
    #[serde(default)]
    pub id: i64,
    pub name: String,
}

/// A listed price with its normalised cost
#[derive(Debug, Serialize)]
pub struct PriceListItem {
    #[serde(flatten)]
    pub price: IngredientPrice,
    /// Cost per 100 g; absent for non-weight units
    pub cost_per_100g: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ListPricesResponse {
    pub prices: Vec<PriceListItem>,
    pub total: usize,
}

fn validate_fields(v: &mut Validator, form: &PriceForm) -> IngredientPriceData {
    v.one_of("source", form.source.trim(), &PRICE_SOURCES);
    let price = v.at_least("price", form.price, 0.01);
    let quantity = v.at_least("quantity", form.quantity, 0.001);
    v.length("unit", &form.unit, 1, 16);

    IngredientPriceData {
        source: form.source.trim().to_string(),
        price,
        quantity,
        unit: form.unit.trim().to_string(),
    }
}

/// Record a price, finding or creating the ingredient by name
pub fn add_price(db: &Database, form: PriceForm) -> Result<ApiResponse<PriceSaved>, String> {
    let mut v = Validator::new();
    v.length("ingredient_name", &form.ingredient_name, 1, 128);
    let data = validate_fields(&mut v, &form);
    if let Err(errors) = v.finish() {
        return Ok(invalid(errors));
    }

    let name = form.ingredient_name.trim().to_string();
    let (price, created) = db
        .with_transaction(|tx| {
            let (ingredient, created) = match Ingredient::find_by_name(tx, &name)? {
                Some(existing) => (existing, false),
                None => (Ingredient::create(tx, &IngredientCreate::placeholder(&name))?, true),
            };
            let price = IngredientPrice::create(tx, ingredient.id, &data)?;
            Ok((price, created))
        })
        .map_err(|e| format!("Failed to add price: {}", e))?;

    let message = if created {
        tracing::info!(ingredient = %name, "created placeholder ingredient for new price");
        format!("New custom ingredient \"{}\" was created and its price recorded.", name)
    } else {
        format!("Price recorded for \"{}\".", name)
    };

    Ok(ApiResponse::success(
        message,
        PriceSaved {
            redirect_url: PRICING_INDEX_URL.to_string(),
            price_id: Some(price.id),
        },
    ))
}

/// Edit source, price, quantity and unit of a price record
pub fn edit_price(db: &Database, id: i64, form: PriceForm) -> Result<ApiResponse<PriceSaved>, String> {
    let mut v = Validator::new();
    let data = validate_fields(&mut v, &form);
    if let Err(errors) = v.finish() {
        return Ok(invalid(errors));
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let updated = IngredientPrice::update(&conn, id, &data)
        .map_err(|e| format!("Failed to update price: {}", e))?;

    Ok(match updated {
        Some(price) => ApiResponse::success(
            "Price record updated.",
            PriceSaved {
                redirect_url: PRICING_INDEX_URL.to_string(),
                price_id: Some(price.id),
            },
        ),
        None => ApiResponse::failure("Price record not found."),
    })
}

pub fn delete_price(db: &Database, id: i64) -> Result<ApiResponse<Empty>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let deleted = IngredientPrice::delete(&conn, id)
        .map_err(|e| format!("Failed to delete price: {}", e))?;

    Ok(if deleted {
        ApiResponse::ok("Price record deleted.")
    } else {
        ApiResponse::failure("Price record not found.")
    })
}

pub fn get_price(db: &Database, id: i64) -> Result<Option<PriceListItem>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let price = IngredientPrice::get_by_id(&conn, id)
        .map_err(|e| format!("Failed to get price: {}", e))?;
    Ok(price.map(list_item))
}

pub fn list_prices(db: &Database, limit: i64, offset: i64) -> Result<ListPricesResponse, String> {
    let limit = limit.clamp(1, 500);
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let prices = IngredientPrice::list(&conn, limit, offset.max(0))
        .map_err(|e| format!("Failed to list prices: {}", e))?;

    let prices: Vec<PriceListItem> = prices.into_iter().map(list_item).collect();
    let total = prices.len();
    Ok(ListPricesResponse { prices, total })
}

/// Name suggestions across shop and TFDA ingredients; empty query gives nothing
pub fn search_all_ingredients(db: &Database, query: &str) -> Result<Vec<IngredientName>, String> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let items = Ingredient::search(&conn, query, SourceFilter::All, SEARCH_LIMIT)
        .map_err(|e| format!("Search failed: {}", e))?;

    Ok(items
        .into_iter()
        .map(|item| IngredientName {
            id: item.id,
            name: item.food_name,
        })
        .collect())
}

fn list_item(price: IngredientPrice) -> PriceListItem {
    let cost_per_100g = cost_per_100g(price.price, price.quantity, &price.unit);
    PriceListItem {
        price,
        cost_per_100g,
    }
}

fn invalid(errors: FieldErrors) -> ApiResponse<PriceSaved> {
    ApiResponse::invalid("Validation failed.", errors)
}
