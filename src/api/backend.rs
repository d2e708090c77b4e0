//! Backend trait
//!
//! One method per admin endpoint. Application failures come back as an
//! `ApiResponse` with a non-success status; only transport and decode
//! problems are `ClientError`s.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{RecipeState, SourceFilter};
use crate::tools::ingredients::{IngredientData, IngredientForm, IngredientSaved, IngredientSummary};
use crate::tools::prices::{IngredientName, PriceForm, PriceSaved};
use crate::tools::products::{ProductCreated, ProductDetail, ProductForm, RecipeDetails};
use crate::tools::recipes::{LabelPreview, RecipeSummary};
use super::{ApiResponse, Empty};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Could not read the server response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Server(String),
}

/// Which price endpoint a form posts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceTarget {
    Create,
    Edit(i64),
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn search_all_ingredients(&self, query: &str) -> Result<Vec<IngredientName>, ClientError>;

    async fn submit_price(
        &self,
        target: PriceTarget,
        form: &PriceForm,
    ) -> Result<ApiResponse<PriceSaved>, ClientError>;

    async fn search_ingredients(
        &self,
        query: &str,
        source: SourceFilter,
    ) -> Result<Vec<IngredientSummary>, ClientError>;

    async fn get_ingredient(&self, id: i64) -> Result<ApiResponse<IngredientData>, ClientError>;

    async fn create_ingredient(
        &self,
        form: &IngredientForm,
    ) -> Result<ApiResponse<IngredientSaved>, ClientError>;

    async fn update_ingredient(
        &self,
        id: i64,
        form: &IngredientForm,
    ) -> Result<ApiResponse<IngredientSaved>, ClientError>;

    async fn delete_ingredient(&self, id: i64) -> Result<ApiResponse<Empty>, ClientError>;

    /// Full-document overwrite of a recipe
    async fn save_recipe(&self, id: i64, state: &RecipeState) -> Result<ApiResponse<Empty>, ClientError>;

    async fn preview_label(&self, state: &RecipeState) -> Result<ApiResponse<LabelPreview>, ClientError>;

    async fn search_recipes(&self, query: &str) -> Result<Vec<RecipeSummary>, ClientError>;

    async fn get_recipe_details(&self, id: i64) -> Result<ApiResponse<RecipeDetails>, ClientError>;

    async fn create_product(&self, form: &ProductForm) -> Result<ApiResponse<ProductCreated>, ClientError>;

    async fn get_product(&self, id: i64) -> Result<ApiResponse<ProductDetail>, ClientError>;

    async fn update_product(&self, id: i64, form: &ProductForm) -> Result<ApiResponse<Empty>, ClientError>;

    async fn delete_product(&self, id: i64) -> Result<ApiResponse<Empty>, ClientError>;
}
