//! Price form
//!
//! Add/edit form for a price record, with ingredient-name autocomplete.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::api::{Backend, PriceTarget};
use crate::tools::prices::{IngredientName, PriceForm};
use super::crud::{handle_reply, SubmitOutcome};
use super::form::FormState;
use super::prompt::Prompter;
use super::search::{DebouncedSearch, IngredientNameSearch, SearchEvent, SearchPolicy};

pub const FIELD_INGREDIENT_NAME: &str = "ingredient_name";
pub const FIELD_SOURCE: &str = "source";
pub const FIELD_PRICE: &str = "price";
pub const FIELD_QUANTITY: &str = "quantity";
pub const FIELD_UNIT: &str = "unit";

pub struct PriceFormController<B: Backend + 'static, P: Prompter> {
    backend: Arc<B>,
    prompter: P,
    target: PriceTarget,
    form: FormState,
    name_search: DebouncedSearch<IngredientNameSearch<B>>,
    submitting: bool,
}

impl<B: Backend + 'static, P: Prompter> PriceFormController<B, P> {
    pub fn new(
        backend: Arc<B>,
        prompter: P,
        target: PriceTarget,
    ) -> (Self, mpsc::UnboundedReceiver<SearchEvent<IngredientName>>) {
        let (name_search, events) = DebouncedSearch::new(
            Arc::new(IngredientNameSearch(Arc::clone(&backend))),
            SearchPolicy::ingredient_names(),
        );
        let mut form = FormState::new();
        form.fill([(FIELD_SOURCE, "Manual"), (FIELD_UNIT, "g")]);

        let controller = Self {
            backend,
            prompter,
            target,
            form,
            name_search,
            submitting: false,
        };
        (controller, events)
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Prefill from an existing record when editing
    pub fn load(&mut self, values: &PriceForm) {
        self.form.reset();
        self.form.fill([
            (FIELD_INGREDIENT_NAME, values.ingredient_name.clone()),
            (FIELD_SOURCE, values.source.clone()),
            (FIELD_PRICE, values.price.map(|v| v.to_string()).unwrap_or_default()),
            (FIELD_QUANTITY, values.quantity.map(|v| v.to_string()).unwrap_or_default()),
            (FIELD_UNIT, values.unit.clone()),
        ]);
    }

    /// User input; the name field drives the autocomplete
    pub fn set_field(&mut self, field: &str, value: &str) {
        self.form.set(field, value);
        if field == FIELD_INGREDIENT_NAME {
            self.name_search.on_input(value);
        }
    }

    /// Autocomplete entry clicked
    pub fn choose_ingredient(&mut self, item: &IngredientName) {
        self.form.set(FIELD_INGREDIENT_NAME, item.name.clone());
        self.name_search.dismiss();
    }

    pub fn dismiss_suggestions(&mut self) {
        self.name_search.dismiss();
    }

    pub fn price_form(&self) -> PriceForm {
        PriceForm {
            ingredient_name: self.form.value(FIELD_INGREDIENT_NAME).trim().to_string(),
            source: self.form.value(FIELD_SOURCE).trim().to_string(),
            price: self.form.number(FIELD_PRICE),
            quantity: self.form.number(FIELD_QUANTITY),
            unit: self.form.value(FIELD_UNIT).trim().to_string(),
        }
    }

    /// Post the form; success carries the redirect target
    pub async fn submit(&mut self) -> SubmitOutcome {
        let submitted = self.price_form();

        self.submitting = true;
        let reply = self.backend.submit_price(self.target, &submitted).await;
        self.submitting = false;

        match handle_reply(&mut self.prompter, Some(&mut self.form), reply) {
            Ok((message, payload)) => SubmitOutcome::Succeeded {
                message,
                redirect_url: payload.map(|saved| saved.redirect_url),
            },
            Err(outcome) => outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::LocalBackend;
    use crate::config::Config;
    use crate::db::test_support::temp_db;
    use crate::editor::prompt::testing::RecordingPrompter;

    #[tokio::test]
    async fn test_submit_redirects_on_success() {
        let (_dir, db) = temp_db();
        let backend = Arc::new(LocalBackend::new(db, Config::default()));
        let (mut controller, _events) =
            PriceFormController::new(backend, RecordingPrompter::accepting(), PriceTarget::Create);

        controller.set_field(FIELD_INGREDIENT_NAME, "Cake flour");
        controller.set_field(FIELD_SOURCE, "Carrefour");
        controller.set_field(FIELD_PRICE, "55");
        controller.set_field(FIELD_QUANTITY, "1");
        controller.set_field(FIELD_UNIT, "kg");

        match controller.submit().await {
            SubmitOutcome::Succeeded { redirect_url, .. } => {
                assert_eq!(redirect_url.as_deref(), Some("/pricing/"))
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(controller.prompter().alerts.is_empty());
    }

    #[tokio::test]
    async fn test_field_errors_are_marked() {
        let (_dir, db) = temp_db();
        let backend = Arc::new(LocalBackend::new(db, Config::default()));
        let (mut controller, _events) =
            PriceFormController::new(backend, RecordingPrompter::accepting(), PriceTarget::Create);

        controller.set_field(FIELD_INGREDIENT_NAME, "Cake flour");
        controller.set_field(FIELD_PRICE, "abc");

        let outcome = controller.submit().await;
        assert!(matches!(outcome, SubmitOutcome::Rejected { .. }));
        assert!(controller.form().is_invalid(FIELD_PRICE));
        assert!(controller.form().is_invalid(FIELD_QUANTITY));
        assert!(!controller.form().is_invalid(FIELD_SOURCE));
        assert!(!controller.is_submitting());
    }

    #[tokio::test(start_paused = true)]
    async fn test_choosing_a_suggestion_fills_the_name() {
        let (_dir, db) = temp_db();
        crate::tools::fixtures::add_ingredient(&db, "Cake flour", 360.0, 5.0);
        let backend = Arc::new(LocalBackend::new(db, Config::default()));
        let (mut controller, mut events) =
            PriceFormController::new(backend, RecordingPrompter::accepting(), PriceTarget::Create);

        controller.set_field(FIELD_INGREDIENT_NAME, "cake");
        let items = match events.recv().await.unwrap() {
            SearchEvent::Results { items, .. } => items,
            other => panic!("unexpected event {:?}", other),
        };
        assert_eq!(items.len(), 1);

        controller.choose_ingredient(&items[0]);
        assert_eq!(controller.form().value(FIELD_INGREDIENT_NAME), "Cake flour");
        assert_eq!(events.recv().await.unwrap(), SearchEvent::Cleared);
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_outside_cancels_pending_lookup() {
        let (_dir, db) = temp_db();
        crate::tools::fixtures::add_ingredient(&db, "Cake flour", 360.0, 5.0);
        let backend = Arc::new(LocalBackend::new(db, Config::default()));
        let (mut controller, mut events) =
            PriceFormController::new(backend, RecordingPrompter::accepting(), PriceTarget::Create);

        controller.set_field(FIELD_INGREDIENT_NAME, "cake");
        controller.dismiss_suggestions();
        assert_eq!(events.recv().await.unwrap(), SearchEvent::Cleared);

        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        assert!(events.try_recv().is_err());
        assert_eq!(controller.form().value(FIELD_INGREDIENT_NAME), "cake");
    }
}
