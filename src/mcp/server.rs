//! bakecost MCP Server Implementation
//!
//! Exposes the pricing, ingredient, recipe and product operations as MCP tools.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::db::Database;
use crate::models::{RecipeState, SourceFilter};
use crate::tools::ingredients::{self, IngredientForm};
use crate::tools::labels;
use crate::tools::prices::{self, PriceForm};
use crate::tools::products::{self, ProductForm};
use crate::tools::recipes;
use crate::tools::status::StatusTracker;

/// bakecost MCP Service
#[derive(Clone)]
pub struct BakecostService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    config: Config,
    tool_router: ToolRouter<BakecostService>,
}

impl BakecostService {
    pub fn new(config: Config, database: Database) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(&config))),
            database,
            config,
            tool_router: Self::tool_router(),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn not_found(kind: &str, id: i64) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(format!(
        r#"{{"error": "{} not found", "id": {}}}"#,
        kind, id
    ))]))
}

// ============================================================================
// Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IdParams {
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct QueryParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PageParams {
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_list_limit() -> i64 { 50 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct EditPriceParams {
    pub id: i64,
    #[serde(flatten)]
    pub form: PriceForm,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchIngredientsParams {
    #[serde(default)]
    pub q: String,
    /// ALL, USER or TFDA
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateIngredientParams {
    pub id: i64,
    #[serde(flatten)]
    pub form: IngredientForm,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SaveRecipeParams {
    pub id: i64,
    pub recipe: RecipeState,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PreviewLabelParams {
    pub recipe: RecipeState,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ExportLabelParams {
    pub recipe_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateProductParams {
    pub id: i64,
    #[serde(flatten)]
    pub form: ProductForm,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl BakecostService {
    // --- Status ---

    #[tool(description = "Get the current status of the bakecost service including build info, database status, record counts and cost rates")]
    async fn bakecost_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status(&self.database);
        to_json(&status)
    }

    // --- Prices ---

    #[tool(description = "Record a price for an ingredient by name. An unknown name creates a zero-nutrient shop ingredient.")]
    fn add_price(&self, Parameters(p): Parameters<PriceForm>) -> Result<CallToolResult, McpError> {
        let result = prices::add_price(&self.database, p).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Edit an existing price record (source, price, quantity, unit)")]
    fn edit_price(&self, Parameters(p): Parameters<EditPriceParams>) -> Result<CallToolResult, McpError> {
        let result = prices::edit_price(&self.database, p.id, p.form).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Delete a price record")]
    fn delete_price(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = prices::delete_price(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get one price record with its cost per 100 g")]
    fn get_price(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        match prices::get_price(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))? {
            Some(price) => to_json(&price),
            None => not_found("Price", p.id),
        }
    }

    #[tool(description = "List price records, newest first, with cost per 100 g for weight units")]
    fn list_prices(&self, Parameters(p): Parameters<PageParams>) -> Result<CallToolResult, McpError> {
        let result = prices::list_prices(&self.database, p.limit, p.offset).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Ingredient name autocomplete for the price form (up to 10 matches)")]
    fn search_all_ingredients(&self, Parameters(p): Parameters<QueryParams>) -> Result<CallToolResult, McpError> {
        let result = prices::search_all_ingredients(&self.database, &p.q).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    // --- Ingredients ---

    #[tool(description = "Search ingredients by name with a source filter (ALL, USER or TFDA)")]
    fn search_ingredients(&self, Parameters(p): Parameters<SearchIngredientsParams>) -> Result<CallToolResult, McpError> {
        let source = p.source.as_deref().map(SourceFilter::parse).unwrap_or_default();
        let result = ingredients::search_ingredients(&self.database, &p.q, source).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get full ingredient details including nutrients, cost and the recipes using it")]
    fn get_ingredient(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = ingredients::get_ingredient(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Create a shop ingredient. All eight nutrients per 100 g and the cost per 100 g are required.")]
    fn create_ingredient(&self, Parameters(p): Parameters<IngredientForm>) -> Result<CallToolResult, McpError> {
        let result = ingredients::create_ingredient(&self.database, p).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Update a shop ingredient (reference ingredients are read-only)")]
    fn update_ingredient(&self, Parameters(p): Parameters<UpdateIngredientParams>) -> Result<CallToolResult, McpError> {
        let result = ingredients::update_ingredient(&self.database, p.id, p.form).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Delete an ingredient (only allowed if no recipe uses it)")]
    fn delete_ingredient(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = ingredients::delete_ingredient(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    // --- Recipes ---

    #[tool(description = "Create an empty recipe and return its id")]
    fn create_recipe(&self) -> Result<CallToolResult, McpError> {
        let result = recipes::create_recipe(&self.database).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "List recipes, most recently edited first, with ingredient cost and servings")]
    fn list_recipes(&self, Parameters(p): Parameters<PageParams>) -> Result<CallToolResult, McpError> {
        let result = recipes::list_recipes(&self.database, p.limit, p.offset).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Search recipes by name for the product recipe picker")]
    fn search_recipes(&self, Parameters(p): Parameters<QueryParams>) -> Result<CallToolResult, McpError> {
        let result = recipes::search_recipes(&self.database, &p.q).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get the full editable recipe document with ordered ingredient lines and label options")]
    fn get_recipe(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = recipes::get_recipe(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Save a whole recipe document. Overwrites metadata, label options and the ordered ingredient list.")]
    fn save_recipe(&self, Parameters(p): Parameters<SaveRecipeParams>) -> Result<CallToolResult, McpError> {
        let result = recipes::save_recipe(&self.database, p.id, p.recipe).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Delete a recipe (only allowed if no product is made from it)")]
    fn delete_recipe(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = recipes::delete_recipe(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Render label text for an unsaved recipe document using current ingredient data")]
    fn preview_label(&self, Parameters(p): Parameters<PreviewLabelParams>) -> Result<CallToolResult, McpError> {
        let result = recipes::preview_label(&self.database, p.recipe).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get label text (ingredients, net weight, nutrition, allergens) for a saved recipe")]
    fn get_label_data(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        match recipes::get_label_data(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))? {
            Some(label) => to_json(&label),
            None => not_found("Recipe", p.id),
        }
    }

    #[tool(description = "Export a saved recipe's nutrition label as a PDF in the label directory")]
    fn export_label_pdf(&self, Parameters(p): Parameters<ExportLabelParams>) -> Result<CallToolResult, McpError> {
        let result = labels::export_label_pdf(&self.database, &self.config.label_dir, p.recipe_id)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    // --- Products ---

    #[tool(description = "Get a recipe's cost snapshot (total ingredient cost, servings, per-ingredient costs) for product costing")]
    fn get_recipe_details(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = products::get_recipe_details(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Create a product from a recipe. The average cost per product is calculated by the server.")]
    fn create_product(&self, Parameters(p): Parameters<ProductForm>) -> Result<CallToolResult, McpError> {
        let result = products::create_product(&self.database, &self.config.rates, p)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get a product with its stored production parameters and cost")]
    fn get_product(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = products::get_product(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Update a product and recalculate its cost from the current recipe")]
    fn update_product(&self, Parameters(p): Parameters<UpdateProductParams>) -> Result<CallToolResult, McpError> {
        let result = products::update_product(&self.database, &self.config.rates, p.id, p.form)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Delete a product")]
    fn delete_product(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = products::delete_product(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "List products with their recipe name, selling price and calculated cost")]
    fn list_products(&self, Parameters(p): Parameters<PageParams>) -> Result<CallToolResult, McpError> {
        let result = products::list_products(&self.database, p.limit, p.offset).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }
}

#[tool_handler]
impl ServerHandler for BakecostService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "bakecost".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Bakery costing".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "bakecost - ingredient prices, recipes, nutrition labels and product costs for a bakery. \
                 Prices: add/edit/delete/get/list_price(s), search_all_ingredients. \
                 Ingredients: search/get/create/update/delete_ingredient (TFDA reference ingredients are read-only). \
                 Recipes: create_recipe, then save_recipe with the whole document; get/list/search/delete_recipe. \
                 Labels: preview_label, get_label_data, export_label_pdf. \
                 Products: get_recipe_details, create/get/update/delete/list_product(s); costs are computed server-side. \
                 Responses use {status, message, errors?, ...payload}; any status other than success is a failure."
                    .into(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_db;

    #[test]
    fn test_server_info_and_tools() {
        let (_dir, db) = temp_db();
        let service = BakecostService::new(Config::default(), db);

        let info = service.get_info();
        assert_eq!(info.server_info.name, "bakecost");

        let names: Vec<String> = service
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        for expected in ["add_price", "save_recipe", "create_product", "export_label_pdf", "bakecost_status"] {
            assert!(names.iter().any(|n| n == expected), "missing tool {}", expected);
        }
    }
}
