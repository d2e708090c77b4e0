//! Product manager
//!
//! Master/detail CRUD for products with a live cost preview. The preview uses
//! the same `CostBreakdown` the service persists, but the figure is never
//! sent back: the service recomputes it on save.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::api::{Backend, Empty};
use crate::costing::{CostBreakdown, CostRates, ProductionParams, RecipeCostSnapshot};
use crate::tools::products::ProductForm;
use crate::tools::recipes::RecipeSummary;
use super::crud::{handle_reply, ButtonStates, CrudError, CrudState, SubmitOutcome};
use super::form::FormState;
use super::prompt::Prompter;
use super::search::{DebouncedSearch, RecipeSearch, SearchEvent, SearchPolicy};

pub const FIELD_PRODUCT_NAME: &str = "product_name";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_RECIPE_ID: &str = "recipe_id";
pub const FIELD_SELLING_PRICE: &str = "selling_price";
pub const FIELD_STOCK_QUANTITY: &str = "stock_quantity";
pub const FIELD_BATCH_SIZE: &str = "batch_size";
pub const FIELD_BAKE_POWER_W: &str = "bake_power_w";
pub const FIELD_BAKE_TIME_MIN: &str = "bake_time_min";
pub const FIELD_PRODUCTION_TIME_HR: &str = "production_time_hr";

/// Recipe chosen for the product being edited
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedRecipe {
    pub id: i64,
    /// Unknown when loaded with an existing product
    pub name: Option<String>,
    pub snapshot: RecipeCostSnapshot,
}

/// Collect the product form from raw inputs
pub fn product_form(form: &FormState) -> ProductForm {
    ProductForm {
        product_name: form.value(FIELD_PRODUCT_NAME).trim().to_string(),
        description: form.text(FIELD_DESCRIPTION),
        recipe_id: form.integer(FIELD_RECIPE_ID),
        selling_price: form.number(FIELD_SELLING_PRICE),
        stock_quantity: form.integer(FIELD_STOCK_QUANTITY),
        batch_size: form.integer(FIELD_BATCH_SIZE),
        bake_power_w: form.number(FIELD_BAKE_POWER_W),
        bake_time_min: form.number(FIELD_BAKE_TIME_MIN),
        production_time_hr: form.number(FIELD_PRODUCTION_TIME_HR),
        calculated_cost: None,
    }
}

pub struct ProductManager<B: Backend + 'static, P: Prompter> {
    backend: Arc<B>,
    prompter: P,
    rates: CostRates,
    state: CrudState<i64>,
    form: FormState,
    recipe: Option<SelectedRecipe>,
    recipe_search: DebouncedSearch<RecipeSearch<B>>,
    loading: bool,
}

impl<B: Backend + 'static, P: Prompter> ProductManager<B, P> {
    /// `initial_recipes` is what the recipe picker shows for an empty query
    pub fn new(
        backend: Arc<B>,
        prompter: P,
        rates: CostRates,
        initial_recipes: Vec<RecipeSummary>,
    ) -> (Self, mpsc::UnboundedReceiver<SearchEvent<RecipeSummary>>) {
        let (recipe_search, events) = DebouncedSearch::new(
            Arc::new(RecipeSearch(Arc::clone(&backend))),
            SearchPolicy::recipes(initial_recipes),
        );
        let manager = Self {
            backend,
            prompter,
            rates,
            state: CrudState::NoneSelected,
            form: FormState::new(),
            recipe: None,
            recipe_search,
            loading: false,
        };
        (manager, events)
    }

    pub fn state(&self) -> CrudState<i64> {
        self.state
    }

    pub fn buttons(&self) -> ButtonStates {
        ButtonStates::for_state(&self.state)
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn selected_recipe(&self) -> Option<&SelectedRecipe> {
        self.recipe.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    pub fn set_field(&mut self, field: &str, value: &str) -> Result<(), CrudError> {
        if !self.state.is_active() {
            return Err(CrudError::ActionDisabled("edit"));
        }
        self.form.set(field, value);
        Ok(())
    }

    /// Text typed into the recipe picker
    pub fn search_recipes(&mut self, text: &str) {
        self.recipe_search.on_input(text);
    }

    pub fn dismiss_recipe_results(&mut self) {
        self.recipe_search.dismiss();
    }

    /// Production parameters as currently typed; unparsable input counts as zero
    pub fn production_params(&self) -> ProductionParams {
        ProductionParams {
            batch_size: self.form.integer(FIELD_BATCH_SIZE).unwrap_or(0),
            bake_power_w: self.form.number(FIELD_BAKE_POWER_W).unwrap_or(0.0),
            bake_time_min: self.form.number(FIELD_BAKE_TIME_MIN).unwrap_or(0.0),
            production_time_hr: self.form.number(FIELD_PRODUCTION_TIME_HR).unwrap_or(0.0),
        }
    }

    /// Cost preview, rounded for display
    pub fn preview(&self) -> CostBreakdown {
        CostBreakdown::compute(
            self.recipe.as_ref().map(|r| &r.snapshot),
            &self.production_params(),
            &self.rates,
        )
        .rounded()
    }

    pub fn new_item(&mut self) -> Result<(), CrudError> {
        if self.state.is_active() {
            return Err(CrudError::ActionDisabled("new"));
        }
        self.form.reset();
        self.form.fill([
            (FIELD_SELLING_PRICE, "0"),
            (FIELD_STOCK_QUANTITY, "0"),
            (FIELD_BATCH_SIZE, "1"),
            (FIELD_BAKE_POWER_W, "0"),
            (FIELD_BAKE_TIME_MIN, "0"),
            (FIELD_PRODUCTION_TIME_HR, "0"),
        ]);
        self.recipe = None;
        self.state = CrudState::CreatingNew;
        Ok(())
    }

    /// Pick a recipe from the search results and fetch its cost snapshot
    ///
    /// A new product with an empty name is prefilled from the recipe.
    pub async fn choose_recipe(&mut self, recipe: &RecipeSummary) -> Result<SubmitOutcome, CrudError> {
        if self.state != CrudState::CreatingNew {
            return Err(CrudError::ActionDisabled("choose recipe"));
        }
        self.recipe_search.dismiss();

        self.loading = true;
        let reply = self.backend.get_recipe_details(recipe.id).await;
        self.loading = false;

        let (message, payload) = match handle_reply(&mut self.prompter, None, reply) {
            Ok(ok) => ok,
            Err(outcome) => return Ok(outcome),
        };
        let Some(details) = payload else {
            return Ok(SubmitOutcome::Rejected {
                message: "Recipe details missing from response.".to_string(),
            });
        };

        self.form.set(FIELD_RECIPE_ID, details.recipe_id.to_string());
        if self.form.value(FIELD_PRODUCT_NAME).trim().is_empty() {
            self.form.set(FIELD_PRODUCT_NAME, format!("{} (product)", details.recipe_name));
            self.form.set(FIELD_BATCH_SIZE, details.servings_count.max(1).to_string());
        }
        self.recipe = Some(SelectedRecipe {
            id: details.recipe_id,
            name: Some(details.recipe_name.clone()),
            snapshot: details.snapshot(),
        });
        Ok(SubmitOutcome::succeeded(message))
    }

    /// Load a product into the form
    pub async fn select(&mut self, id: i64) -> SubmitOutcome {
        self.loading = true;
        let reply = self.backend.get_product(id).await;
        self.loading = false;

        let (message, payload) = match handle_reply(&mut self.prompter, None, reply) {
            Ok(ok) => ok,
            Err(outcome) => return outcome,
        };
        let Some(product) = payload else {
            return SubmitOutcome::Rejected {
                message: "Product data missing from response.".to_string(),
            };
        };

        self.form.reset();
        self.form.fill([
            (FIELD_PRODUCT_NAME, product.product_name.clone()),
            (FIELD_DESCRIPTION, product.description.clone().unwrap_or_default()),
            (FIELD_RECIPE_ID, product.recipe_id.to_string()),
            (FIELD_SELLING_PRICE, product.selling_price.to_string()),
            (FIELD_STOCK_QUANTITY, product.stock_quantity.to_string()),
            (FIELD_BATCH_SIZE, product.batch_size.to_string()),
            (FIELD_BAKE_POWER_W, product.bake_power_w.to_string()),
            (FIELD_BAKE_TIME_MIN, product.bake_time_min.to_string()),
            (FIELD_PRODUCTION_TIME_HR, product.production_time_hr.to_string()),
        ]);
        self.recipe = product.recipe_details.map(|snapshot| SelectedRecipe {
            id: product.recipe_id,
            name: None,
            snapshot,
        });
        self.state = CrudState::EditingExisting(id);
        SubmitOutcome::succeeded(message)
    }

    pub fn cancel(&mut self) -> Result<(), CrudError> {
        if !self.state.is_active() {
            return Err(CrudError::ActionDisabled("cancel"));
        }
        self.back_to_list();
        Ok(())
    }

    /// Create or update; the previewed cost is not submitted
    pub async fn save(&mut self) -> Result<SubmitOutcome, CrudError> {
        if !self.buttons().save {
            return Err(CrudError::ActionDisabled("save"));
        }
        let submitted = product_form(&self.form);

        self.loading = true;
        let reply = match self.state {
            CrudState::EditingExisting(id) => self.backend.update_product(id, &submitted).await,
            _ => self
                .backend
                .create_product(&submitted)
                .await
                .map(|resp| resp.map(|_| Empty {})),
        };
        self.loading = false;

        let message = match handle_reply(&mut self.prompter, Some(&mut self.form), reply) {
            Ok((message, _)) => message,
            Err(outcome) => return Ok(outcome),
        };
        self.prompter.alert(&message);
        self.back_to_list();
        Ok(SubmitOutcome::succeeded(message))
    }

    pub async fn delete(&mut self) -> Result<SubmitOutcome, CrudError> {
        let Some(id) = self.state.selected_id() else {
            return Err(CrudError::ActionDisabled("delete"));
        };
        let name = self.form.value(FIELD_PRODUCT_NAME).to_string();
        if !self.prompter.confirm(&format!("Delete product \"{}\"?", name)) {
            return Ok(SubmitOutcome::Declined);
        }

        self.loading = true;
        let reply = self.backend.delete_product(id).await;
        self.loading = false;

        let message = match handle_reply(&mut self.prompter, None, reply) {
            Ok((message, _)) => message,
            Err(outcome) => return Ok(outcome),
        };
        self.prompter.alert(&message);
        self.back_to_list();
        Ok(SubmitOutcome::succeeded(message))
    }

    fn back_to_list(&mut self) {
        self.form.reset();
        self.recipe = None;
        self.state = CrudState::NoneSelected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::LocalBackend;
    use crate::config::Config;
    use crate::db::test_support::temp_db;
    use crate::editor::prompt::testing::RecordingPrompter;
    use crate::tools::fixtures::{add_ingredient, add_recipe};
    use crate::tools::products::list_products;

    fn config() -> Config {
        Config {
            rates: CostRates {
                electricity_cost_per_kwh: 5.0,
                labor_cost_per_hour: 200.0,
            },
            ..Config::default()
        }
    }

    fn summary(id: i64, name: &str) -> RecipeSummary {
        RecipeSummary {
            id,
            name: name.to_string(),
            total_ingredient_cost: 0.0,
            servings_count: 1,
        }
    }

    #[tokio::test]
    async fn test_preview_and_server_cost_agree() {
        let (_dir, db) = temp_db();
        let flour = add_ingredient(&db, "Flour", 364.0, 20.0);
        let recipe_id = add_recipe(&db, "Sourdough", 12, &[(flour, 600.0)]);
        let backend = Arc::new(LocalBackend::new(db, config()));
        let (mut manager, _events) =
            ProductManager::new(Arc::clone(&backend), RecordingPrompter::accepting(), config().rates, Vec::new());

        manager.new_item().unwrap();
        assert_eq!(manager.preview(), CostBreakdown::default());

        assert!(manager.choose_recipe(&summary(recipe_id, "Sourdough")).await.unwrap().is_success());
        assert_eq!(manager.form().value(FIELD_PRODUCT_NAME), "Sourdough (product)");
        assert_eq!(manager.form().value(FIELD_BATCH_SIZE), "12");

        manager.set_field(FIELD_BATCH_SIZE, "24").unwrap();
        manager.set_field(FIELD_BAKE_POWER_W, "1000").unwrap();
        manager.set_field(FIELD_BAKE_TIME_MIN, "30").unwrap();
        manager.set_field(FIELD_PRODUCTION_TIME_HR, "0.5").unwrap();
        let preview = manager.preview();
        assert_eq!(preview.ingredient_cost_per_serving, 10.0);
        assert_eq!(preview.electricity_cost, 2.5);
        assert_eq!(preview.total_batch_cost, 342.5);
        assert_eq!(preview.avg_cost_per_product, 14.27);

        assert!(manager.save().await.unwrap().is_success());
        assert_eq!(manager.state(), CrudState::NoneSelected);
        let stored = list_products(backend.database(), 10, 0).unwrap();
        assert_eq!(stored[0].product.calculated_cost, preview.avg_cost_per_product);
    }

    #[tokio::test]
    async fn test_select_loads_snapshot_and_delete_confirms() {
        let (_dir, db) = temp_db();
        let flour = add_ingredient(&db, "Flour", 364.0, 20.0);
        let recipe_id = add_recipe(&db, "Sourdough", 12, &[(flour, 600.0)]);
        let backend = Arc::new(LocalBackend::new(db, config()));
        let (mut manager, _events) =
            ProductManager::new(Arc::clone(&backend), RecordingPrompter::accepting(), config().rates, Vec::new());

        manager.new_item().unwrap();
        manager.choose_recipe(&summary(recipe_id, "Sourdough")).await.unwrap();
        manager.save().await.unwrap();
        let id = list_products(backend.database(), 10, 0).unwrap()[0].product.id;

        assert!(manager.select(id).await.is_success());
        assert_eq!(manager.state(), CrudState::EditingExisting(id));
        assert_eq!(manager.selected_recipe().unwrap().snapshot.total_ingredient_cost, 120.0);
        assert_eq!(
            manager.choose_recipe(&summary(recipe_id, "Sourdough")).await,
            Err(CrudError::ActionDisabled("choose recipe"))
        );

        assert!(manager.delete().await.unwrap().is_success());
        assert!(list_products(backend.database(), 10, 0).unwrap().is_empty());
        assert_eq!(manager.prompter().confirms.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recipe_picker_hint_and_initial_list() {
        let (_dir, db) = temp_db();
        let backend = Arc::new(LocalBackend::new(db, config()));
        let initial = vec![summary(1, "Baguette")];
        let (mut manager, mut events) =
            ProductManager::new(backend, RecordingPrompter::accepting(), config().rates, initial.clone());

        manager.search_recipes("b");
        assert!(matches!(events.recv().await.unwrap(), SearchEvent::Hint(_)));
        manager.search_recipes("");
        assert_eq!(
            events.recv().await.unwrap(),
            SearchEvent::Results {
                query: String::new(),
                items: initial
            }
        );
    }
}
