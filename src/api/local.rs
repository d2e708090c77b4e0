//! In-process backend
//!
//! Runs the controllers directly against the service tools and database.

use async_trait::async_trait;

use crate::config::Config;
use crate::db::Database;
use crate::models::{RecipeState, SourceFilter};
use crate::tools::ingredients::{self, IngredientData, IngredientForm, IngredientSaved, IngredientSummary};
use crate::tools::prices::{self, IngredientName, PriceForm, PriceSaved};
use crate::tools::products::{self, ProductCreated, ProductDetail, ProductForm, RecipeDetails};
use crate::tools::recipes::{self, LabelPreview, RecipeSummary};
use super::{ApiResponse, Backend, ClientError, Empty, PriceTarget};

#[derive(Clone)]
pub struct LocalBackend {
    db: Database,
    config: Config,
}

impl LocalBackend {
    pub fn new(db: Database, config: Config) -> Self {
        Self { db, config }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn search_all_ingredients(&self, query: &str) -> Result<Vec<IngredientName>, ClientError> {
        prices::search_all_ingredients(&self.db, query).map_err(ClientError::Server)
    }

    async fn submit_price(
        &self,
        target: PriceTarget,
        form: &PriceForm,
    ) -> Result<ApiResponse<PriceSaved>, ClientError> {
        let result = match target {
            PriceTarget::Create => prices::add_price(&self.db, form.clone()),
            PriceTarget::Edit(id) => prices::edit_price(&self.db, id, form.clone()),
        };
        result.map_err(ClientError::Server)
    }

    async fn search_ingredients(
        &self,
        query: &str,
        source: SourceFilter,
    ) -> Result<Vec<IngredientSummary>, ClientError> {
        ingredients::search_ingredients(&self.db, query, source).map_err(ClientError::Server)
    }

    async fn get_ingredient(&self, id: i64) -> Result<ApiResponse<IngredientData>, ClientError> {
        ingredients::get_ingredient(&self.db, id).map_err(ClientError::Server)
    }

    async fn create_ingredient(
        &self,
        form: &IngredientForm,
    ) -> Result<ApiResponse<IngredientSaved>, ClientError> {
        ingredients::create_ingredient(&self.db, form.clone()).map_err(ClientError::Server)
    }

    async fn update_ingredient(
        &self,
        id: i64,
        form: &IngredientForm,
    ) -> Result<ApiResponse<IngredientSaved>, ClientError> {
        ingredients::update_ingredient(&self.db, id, form.clone()).map_err(ClientError::Server)
    }

    async fn delete_ingredient(&self, id: i64) -> Result<ApiResponse<Empty>, ClientError> {
        ingredients::delete_ingredient(&self.db, id).map_err(ClientError::Server)
    }

    async fn save_recipe(&self, id: i64, state: &RecipeState) -> Result<ApiResponse<Empty>, ClientError> {
        recipes::save_recipe(&self.db, id, state.clone()).map_err(ClientError::Server)
    }

    async fn preview_label(&self, state: &RecipeState) -> Result<ApiResponse<LabelPreview>, ClientError> {
        recipes::preview_label(&self.db, state.clone()).map_err(ClientError::Server)
    }

    async fn search_recipes(&self, query: &str) -> Result<Vec<RecipeSummary>, ClientError> {
        recipes::search_recipes(&self.db, query).map_err(ClientError::Server)
    }

    async fn get_recipe_details(&self, id: i64) -> Result<ApiResponse<RecipeDetails>, ClientError> {
        products::get_recipe_details(&self.db, id).map_err(ClientError::Server)
    }

    async fn create_product(&self, form: &ProductForm) -> Result<ApiResponse<ProductCreated>, ClientError> {
        products::create_product(&self.db, &self.config.rates, form.clone()).map_err(ClientError::Server)
    }

    async fn get_product(&self, id: i64) -> Result<ApiResponse<ProductDetail>, ClientError> {
        products::get_product(&self.db, id).map_err(ClientError::Server)
    }

    async fn update_product(&self, id: i64, form: &ProductForm) -> Result<ApiResponse<Empty>, ClientError> {
        products::update_product(&self.db, &self.config.rates, id, form.clone()).map_err(ClientError::Server)
    }

    async fn delete_product(&self, id: i64) -> Result<ApiResponse<Empty>, ClientError> {
        products::delete_product(&self.db, id).map_err(ClientError::Server)
    }
}
