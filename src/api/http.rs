//! HTTP backend
//!
//! Talks to the admin JSON endpoints. Bodies are decoded whatever the HTTP
//! status, since failures are reported inside the envelope.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{RecipeState, SourceFilter};
use crate::tools::ingredients::{IngredientData, IngredientForm, IngredientSaved, IngredientSummary};
use crate::tools::prices::{IngredientName, PriceForm, PriceSaved};
use crate::tools::products::{ProductCreated, ProductDetail, ProductForm, RecipeDetails};
use crate::tools::recipes::{LabelPreview, RecipeSummary};
use super::{ApiResponse, Backend, ClientError, Empty, PriceTarget};

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, ClientError> {
        let response = self.client.get(self.url(path)).query(query).send().await?;
        decode(response).await
    }

    async fn post<B: Serialize + ?Sized + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        tracing::warn!(%status, error = %e, "undecodable response body");
        ClientError::Decode(e)
    })
}

fn price_path(target: PriceTarget) -> String {
    match target {
        PriceTarget::Create => "/pricing/add".to_string(),
        PriceTarget::Edit(id) => format!("/pricing/edit/{}", id),
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn search_all_ingredients(&self, query: &str) -> Result<Vec<IngredientName>, ClientError> {
        self.get("/pricing/api/search_all_ingredients", &[("q", query)]).await
    }

    async fn submit_price(
        &self,
        target: PriceTarget,
        form: &PriceForm,
    ) -> Result<ApiResponse<PriceSaved>, ClientError> {
        self.post(&price_path(target), form).await
    }

    async fn search_ingredients(
        &self,
        query: &str,
        source: SourceFilter,
    ) -> Result<Vec<IngredientSummary>, ClientError> {
        self.get(
            "/recipes/api/search_ingredients",
            &[("q", query), ("source", source.as_str())],
        )
        .await
    }

    async fn get_ingredient(&self, id: i64) -> Result<ApiResponse<IngredientData>, ClientError> {
        self.get(&format!("/recipes/api/ingredient/{}", id), &[]).await
    }

    async fn create_ingredient(
        &self,
        form: &IngredientForm,
    ) -> Result<ApiResponse<IngredientSaved>, ClientError> {
        self.post("/recipes/api/ingredient/create", form).await
    }

    async fn update_ingredient(
        &self,
        id: i64,
        form: &IngredientForm,
    ) -> Result<ApiResponse<IngredientSaved>, ClientError> {
        self.post(&format!("/recipes/api/ingredient/{}/update", id), form).await
    }

    async fn delete_ingredient(&self, id: i64) -> Result<ApiResponse<Empty>, ClientError> {
        self.post(&format!("/recipes/api/ingredient/{}/delete", id), &Empty {}).await
    }

    async fn save_recipe(&self, id: i64, state: &RecipeState) -> Result<ApiResponse<Empty>, ClientError> {
        self.post(&format!("/recipes/api/recipe/{}/save", id), state).await
    }

    async fn preview_label(&self, state: &RecipeState) -> Result<ApiResponse<LabelPreview>, ClientError> {
        self.post("/recipes/api/recipe/preview_label", state).await
    }

    async fn search_recipes(&self, query: &str) -> Result<Vec<RecipeSummary>, ClientError> {
        self.get("/products/api/search_recipes", &[("q", query)]).await
    }

    async fn get_recipe_details(&self, id: i64) -> Result<ApiResponse<RecipeDetails>, ClientError> {
        self.get(&format!("/products/api/get_recipe_details/{}", id), &[]).await
    }

    async fn create_product(&self, form: &ProductForm) -> Result<ApiResponse<ProductCreated>, ClientError> {
        self.post("/products/api/create_product", form).await
    }

    async fn get_product(&self, id: i64) -> Result<ApiResponse<ProductDetail>, ClientError> {
        self.get(&format!("/products/api/products/{}", id), &[]).await
    }

    async fn update_product(&self, id: i64, form: &ProductForm) -> Result<ApiResponse<Empty>, ClientError> {
        self.post(&format!("/products/api/products/{}/update", id), form).await
    }

    async fn delete_product(&self, id: i64) -> Result<ApiResponse<Empty>, ClientError> {
        self.post(&format!("/products/api/products/{}/delete", id), &Empty {}).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let backend = HttpBackend::new("http://shop.local/");
        assert_eq!(
            backend.url("/recipes/api/recipe/7/save"),
            "http://shop.local/recipes/api/recipe/7/save"
        );
        assert_eq!(price_path(PriceTarget::Create), "/pricing/add");
        assert_eq!(price_path(PriceTarget::Edit(12)), "/pricing/edit/12");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let backend = HttpBackend::new("http://127.0.0.1:9");
        let err = backend.search_recipes("bread").await.unwrap_err();
        assert!(matches!(err, ClientError::Http(_)));
    }
}
