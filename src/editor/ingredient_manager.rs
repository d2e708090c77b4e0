//! Ingredient manager
//!
//! Master/detail CRUD for shop ingredients: a searchable list on the left, an
//! edit form on the right.

use std::sync::Arc;

use crate::api::Backend;
use crate::models::{IngredientSource, NutrientKey, SourceFilter};
use crate::tools::ingredients::{IngredientForm, IngredientSummary};
use super::crud::{handle_reply, ButtonStates, CrudError, CrudState, SubmitOutcome};
use super::form::FormState;
use super::prompt::Prompter;

pub const FIELD_FOOD_NAME: &str = "food_name";
pub const FIELD_COST_PER_UNIT: &str = "cost_per_unit";
pub const FIELD_UNIT_NAME: &str = "unit_name";

/// Collect the ingredient form from raw inputs
pub fn ingredient_form(form: &FormState) -> IngredientForm {
    let mut out = IngredientForm {
        food_name: form.value(FIELD_FOOD_NAME).trim().to_string(),
        cost_per_unit: form.number(FIELD_COST_PER_UNIT),
        unit_name: form.text(FIELD_UNIT_NAME),
        ..Default::default()
    };
    for key in NutrientKey::ALL {
        out.set_nutrient(key, form.number(key.as_str()));
    }
    out
}

pub struct IngredientManager<B: Backend, P: Prompter> {
    backend: Arc<B>,
    prompter: P,
    state: CrudState<i64>,
    form: FormState,
    list: Vec<IngredientSummary>,
    query: String,
    source: SourceFilter,
    /// Selected record is a read-only reference ingredient
    read_only: bool,
    loading: bool,
}

impl<B: Backend, P: Prompter> IngredientManager<B, P> {
    pub fn new(backend: Arc<B>, prompter: P) -> Self {
        Self {
            backend,
            prompter,
            state: CrudState::NoneSelected,
            form: FormState::new(),
            list: Vec::new(),
            query: String::new(),
            source: SourceFilter::User,
            read_only: false,
            loading: false,
        }
    }

    pub fn state(&self) -> CrudState<i64> {
        self.state
    }

    pub fn buttons(&self) -> ButtonStates {
        let mut buttons = ButtonStates::for_state(&self.state);
        if self.read_only {
            buttons.save = false;
            buttons.delete = false;
        }
        buttons
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn list(&self) -> &[IngredientSummary] {
        &self.list
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    /// Edit one input of the form
    pub fn set_field(&mut self, field: &str, value: &str) -> Result<(), CrudError> {
        if !self.state.is_active() || self.read_only {
            return Err(CrudError::ActionDisabled("edit"));
        }
        self.form.set(field, value);
        Ok(())
    }

    /// Change the list filter and reload
    pub async fn search(&mut self, query: &str, source: SourceFilter) -> bool {
        self.query = query.trim().to_string();
        self.source = source;
        self.reload_list().await
    }

    /// Reload the list for the current filter; false when the request failed
    pub async fn reload_list(&mut self) -> bool {
        self.loading = true;
        let result = self.backend.search_ingredients(&self.query, self.source).await;
        self.loading = false;

        match result {
            Ok(items) => {
                self.list = items;
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "ingredient list reload failed");
                self.prompter.alert(&format!("Could not load ingredients: {}", e));
                false
            }
        }
    }

    pub fn new_item(&mut self) -> Result<(), CrudError> {
        if self.state.is_active() {
            return Err(CrudError::ActionDisabled("new"));
        }
        self.form.reset();
        self.form.fill([(FIELD_UNIT_NAME, "g")]);
        self.read_only = false;
        self.state = CrudState::CreatingNew;
        Ok(())
    }

    /// Load an ingredient into the form
    pub async fn select(&mut self, id: i64) -> SubmitOutcome {
        self.loading = true;
        let reply = self.backend.get_ingredient(id).await;
        self.loading = false;

        let (message, payload) = match handle_reply(&mut self.prompter, None, reply) {
            Ok(ok) => ok,
            Err(outcome) => return outcome,
        };
        let Some(detail) = payload.map(|d| d.data) else {
            return SubmitOutcome::Rejected {
                message: "Ingredient data missing from response.".to_string(),
            };
        };

        self.form.reset();
        self.form.fill([(FIELD_FOOD_NAME, detail.food_name.clone())]);
        for key in NutrientKey::ALL {
            self.form.fill([(key.as_str(), detail.profile.nutrients.get(key).to_string())]);
        }
        self.form.fill([
            (FIELD_COST_PER_UNIT, detail.profile.cost_per_unit.to_string()),
            (FIELD_UNIT_NAME, detail.profile.unit_name.clone()),
        ]);
        self.read_only = detail.source == IngredientSource::Tfda;
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

    /// Create or update depending on state
    pub async fn save(&mut self) -> Result<SubmitOutcome, CrudError> {
        if !self.buttons().save {
            return Err(CrudError::ActionDisabled("save"));
        }
        let submitted = ingredient_form(&self.form);

        self.loading = true;
        let reply = match self.state {
            CrudState::EditingExisting(id) => self.backend.update_ingredient(id, &submitted).await,
            _ => self.backend.create_ingredient(&submitted).await,
        };
        self.loading = false;

        let message = match handle_reply(&mut self.prompter, Some(&mut self.form), reply) {
            Ok((message, _)) => message,
            Err(outcome) => return Ok(outcome),
        };
        self.prompter.alert(&message);
        self.back_to_list();
        self.reload_list().await;
        Ok(SubmitOutcome::succeeded(message))
    }

    pub async fn delete(&mut self) -> Result<SubmitOutcome, CrudError> {
        let Some(id) = self.state.selected_id().filter(|_| self.buttons().delete) else {
            return Err(CrudError::ActionDisabled("delete"));
        };
        let name = self.form.value(FIELD_FOOD_NAME).to_string();
        if !self.prompter.confirm(&format!("Delete ingredient \"{}\"?", name)) {
            return Ok(SubmitOutcome::Declined);
        }

        self.loading = true;
        let reply = self.backend.delete_ingredient(id).await;
        self.loading = false;

        let message = match handle_reply(&mut self.prompter, None, reply) {
            Ok((message, _)) => message,
            Err(outcome) => return Ok(outcome),
        };
        self.prompter.alert(&message);
        self.back_to_list();
        self.reload_list().await;
        Ok(SubmitOutcome::succeeded(message))
    }

    fn back_to_list(&mut self) {
        self.form.reset();
        self.read_only = false;
        self.state = CrudState::NoneSelected;
    }
}
