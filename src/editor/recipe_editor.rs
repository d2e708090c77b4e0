//! Recipe editor
//!
//! Owns the `RecipeState` of one recipe. Every mutation goes through a named
//! method and returns the updated document; the nutrition panel and totals
//! are recomputed from the document, never read back from the view.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::api::Backend;
use crate::costing::{recompute, Recomputation};
use crate::models::{NutrientKey, RecipeIngredientLine, RecipeState, SourceFilter};
use crate::tools::ingredients::{IngredientForm, IngredientSummary};
use crate::tools::recipes::LabelPreview;
use super::crud::{handle_reply, SubmitOutcome};
use super::prompt::Prompter;
use super::search::{DebouncedSearch, IngredientSearch, SearchEvent, SearchPolicy};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    #[error("\"{0}\" is already in the recipe")]
    DuplicateIngredient(String),

    #[error("ingredient {0} is not in the recipe")]
    UnknownLine(i64),

    #[error("a save is already in progress")]
    Busy,
}

/// Grams from raw input; non-numeric or negative input is 0
pub fn parse_quantity(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

/// Final weight override; blank, invalid or 0 clears it
///
/// Negative input is kept and leaves the panel on its placeholder.
pub fn parse_final_weight(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite() && *v != 0.0)
}

/// Servings from raw input, at least 1
pub fn parse_servings(raw: &str) -> i64 {
    let raw = raw.trim();
    let parsed = raw
        .parse::<i64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v.floor() as i64));
    parsed.unwrap_or(1).max(1)
}

pub struct RecipeEditor<B: Backend + 'static, P: Prompter> {
    backend: Arc<B>,
    prompter: P,
    recipe_id: i64,
    state: RecipeState,
    search_source: SourceFilter,
    ingredient_search: DebouncedSearch<IngredientSearch<B>>,
    saving: bool,
}

impl<B: Backend + 'static, P: Prompter> RecipeEditor<B, P> {
    /// Open the editor on a loaded document
    pub fn new(
        backend: Arc<B>,
        prompter: P,
        recipe_id: i64,
        mut state: RecipeState,
    ) -> (Self, mpsc::UnboundedReceiver<SearchEvent<IngredientSummary>>) {
        let search_source = SourceFilter::All;
        let (ingredient_search, events) = DebouncedSearch::new(
            Arc::new(IngredientSearch {
                backend: Arc::clone(&backend),
                source: search_source,
            }),
            SearchPolicy::editor_ingredients(search_source),
        );
        state.servings_count = state.servings_count.max(1);

        let mut editor = Self {
            backend,
            prompter,
            recipe_id,
            state,
            search_source,
            ingredient_search,
            saving: false,
        };
        editor.sync_serving_weight();
        (editor, events)
    }

    pub fn recipe_id(&self) -> i64 {
        self.recipe_id
    }

    pub fn state(&self) -> &RecipeState {
        &self.state
    }

    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn search_source(&self) -> SourceFilter {
        self.search_source
    }

    /// Totals and nutrition panel for the current document
    pub fn recompute(&self) -> Recomputation {
        recompute(&self.state)
    }

    pub fn can_print(&self) -> bool {
        self.recompute().can_print
    }

    // Ingredient search

    pub fn search_ingredients(&mut self, text: &str) {
        self.ingredient_search.on_input(text);
    }

    /// Switch the source filter and rerun the current input
    pub fn set_search_source(&mut self, source: SourceFilter, current_text: &str) {
        self.search_source = source;
        self.ingredient_search.reconfigure(
            Arc::new(IngredientSearch {
                backend: Arc::clone(&self.backend),
                source,
            }),
            SearchPolicy::editor_ingredients(source),
        );
        self.ingredient_search.on_input(current_text);
    }

    pub fn dismiss_search(&mut self) {
        self.ingredient_search.dismiss();
    }

    // Ingredient lines

    /// Append a line at quantity 0 with a copy of the ingredient's profile
    pub fn add_ingredient(&mut self, item: &IngredientSummary) -> Result<&RecipeState, EditorError> {
        if self.state.contains(item.id) {
            self.prompter
                .alert(&format!("\"{}\" is already in this recipe.", item.name));
            return Err(EditorError::DuplicateIngredient(item.name.clone()));
        }
        self.state.ingredients.push(RecipeIngredientLine {
            ingredient_id: item.id,
            ingredient_name: item.name.clone(),
            quantity_g: 0.0,
            details: item.details.clone(),
        });
        self.ingredient_search.dismiss();
        tracing::debug!(ingredient_id = item.id, "ingredient added to recipe");
        Ok(&self.state)
    }

    /// Remove a line once the user confirms
    pub fn remove_ingredient(&mut self, ingredient_id: i64) -> Result<&RecipeState, EditorError> {
        let idx = self.line_index(ingredient_id)?;
        let name = self.state.ingredients[idx].ingredient_name.clone();
        if self.prompter.confirm(&format!("Remove \"{}\" from this recipe?", name)) {
            self.state.ingredients.remove(idx);
        }
        Ok(&self.state)
    }

    pub fn move_up(&mut self, ingredient_id: i64) -> Result<&RecipeState, EditorError> {
        let idx = self.line_index(ingredient_id)?;
        if idx > 0 {
            self.state.ingredients.swap(idx, idx - 1);
        }
        Ok(&self.state)
    }

    pub fn move_down(&mut self, ingredient_id: i64) -> Result<&RecipeState, EditorError> {
        let idx = self.line_index(ingredient_id)?;
        if idx + 1 < self.state.ingredients.len() {
            self.state.ingredients.swap(idx, idx + 1);
        }
        Ok(&self.state)
    }

    pub fn set_quantity(&mut self, ingredient_id: i64, raw: &str) -> Result<&RecipeState, EditorError> {
        let idx = self.line_index(ingredient_id)?;
        self.state.ingredients[idx].quantity_g = parse_quantity(raw);
        Ok(&self.state)
    }

    fn line_index(&self, ingredient_id: i64) -> Result<usize, EditorError> {
        self.state
            .position_of(ingredient_id)
            .ok_or(EditorError::UnknownLine(ingredient_id))
    }

    // Recipe fields

    pub fn set_recipe_name(&mut self, name: &str) -> &RecipeState {
        self.state.recipe_name = name.to_string();
        &self.state
    }

    pub fn set_final_weight(&mut self, raw: &str) -> &RecipeState {
        self.state.final_weight_g = parse_final_weight(raw);
        self.sync_serving_weight();
        &self.state
    }

    pub fn set_servings_count(&mut self, raw: &str) -> &RecipeState {
        self.state.servings_count = parse_servings(raw);
        self.sync_serving_weight();
        &self.state
    }

    pub fn set_nutrient_visible(&mut self, key: NutrientKey, visible: bool) -> &RecipeState {
        self.state.label_options.set_visible(key, visible);
        &self.state
    }

    pub fn set_allergen(&mut self, allergen: &str, present: bool) -> &RecipeState {
        self.state.label_options.set_allergen(allergen, present);
        &self.state
    }

    /// Stored serving weight follows a positive override, else it is 0
    fn sync_serving_weight(&mut self) {
        self.state.serving_weight_g = match self.state.final_weight_override() {
            Some(final_weight) if final_weight > 0.0 => {
                final_weight / self.state.servings_count.max(1) as f64
            }
            _ => 0.0,
        };
    }

    // Backend actions

    /// Send the whole document to the recipe save endpoint
    pub async fn save(&mut self) -> Result<SubmitOutcome, EditorError> {
        if self.saving {
            return Err(EditorError::Busy);
        }
        self.saving = true;
        let reply = self.backend.save_recipe(self.recipe_id, &self.state).await;
        self.saving = false;

        Ok(match handle_reply(&mut self.prompter, None, reply) {
            Ok((message, _)) => {
                tracing::info!(recipe_id = self.recipe_id, lines = self.state.ingredients.len(), "recipe saved");
                SubmitOutcome::succeeded(message)
            }
            Err(outcome) => outcome,
        })
    }

    /// Create a shop ingredient from the inline form and add it to the recipe
    pub async fn create_custom_ingredient(&mut self, form: &IngredientForm) -> SubmitOutcome {
        let reply = self.backend.create_ingredient(form).await;
        let (message, saved) = match handle_reply(&mut self.prompter, None, reply) {
            Ok(ok) => ok,
            Err(outcome) => return outcome,
        };
        let Some(saved) = saved else {
            return SubmitOutcome::succeeded(message);
        };

        let reply = self.backend.get_ingredient(saved.ingredient.id).await;
        let detail = match handle_reply(&mut self.prompter, None, reply) {
            Ok((_, Some(data))) => data.data,
            Ok((_, None)) => {
                let message = "Ingredient data missing from response.".to_string();
                self.prompter.alert(&message);
                return SubmitOutcome::Rejected { message };
            }
            Err(outcome) => return outcome,
        };

        let summary = IngredientSummary {
            id: detail.id,
            name: detail.food_name,
            source: detail.source,
            details: detail.profile,
        };
        match self.add_ingredient(&summary) {
            Ok(_) => SubmitOutcome::succeeded(message),
            Err(e) => SubmitOutcome::Rejected { message: e.to_string() },
        }
    }

    /// Server-rendered label text; refused while the panel has no weight
    pub async fn preview_label(&mut self) -> Option<LabelPreview> {
        if !self.can_print() {
            self.prompter
                .alert("Enter ingredient quantities or a final weight before previewing the label.");
            return None;
        }
        let reply = self.backend.preview_label(&self.state).await;
        match handle_reply(&mut self.prompter, None, reply) {
            Ok((_, preview)) => preview,
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::LocalBackend;
    use crate::config::Config;
    use crate::costing::{NutritionPanel, RawTotals};
    use crate::db::test_support::temp_db;
    use crate::db::Database;
    use crate::editor::prompt::testing::RecordingPrompter;
    use crate::models::{IngredientSource, NutrientProfile, Nutrients, Recipe};
    use crate::tools::fixtures::{add_ingredient, add_recipe};
    use crate::tools::recipes::get_recipe;

    type Editor = RecipeEditor<LocalBackend, RecordingPrompter>;

    fn summary(id: i64, name: &str, calories: f64, cost: f64) -> IngredientSummary {
        IngredientSummary {
            id,
            name: name.to_string(),
            source: IngredientSource::User,
            details: NutrientProfile {
                nutrients: Nutrients {
                    calories_kcal: calories,
                    protein_g: 10.0,
                    sodium_mg: 400.0,
                    ..Default::default()
                },
                cost_per_unit: cost,
                unit_name: "g".to_string(),
            },
        }
    }

    fn open(db: Database, prompter: RecordingPrompter) -> Editor {
        let recipe_id = add_recipe(&db, "Scones", 1, &[]);
        let backend = Arc::new(LocalBackend::new(db, Config::default()));
        let (editor, _events) = RecipeEditor::new(backend, prompter, recipe_id, RecipeState::new("Scones"));
        editor
    }

    fn order(editor: &Editor) -> Vec<i64> {
        editor.state().ingredients.iter().map(|l| l.ingredient_id).collect()
    }

    #[test]
    fn test_input_parsing() {
        assert_eq!(parse_quantity("12.5"), 12.5);
        assert_eq!(parse_quantity("abc"), 0.0);
        assert_eq!(parse_quantity("-3"), 0.0);
        assert_eq!(parse_final_weight(""), None);
        assert_eq!(parse_final_weight("0"), None);
        assert_eq!(parse_final_weight("-50"), Some(-50.0));
        assert_eq!(parse_final_weight("850"), Some(850.0));
        assert_eq!(parse_servings("x"), 1);
        assert_eq!(parse_servings("0"), 1);
        assert_eq!(parse_servings("12"), 12);
    }

    #[tokio::test]
    async fn test_duplicate_add_is_rejected_with_alert() {
        let (_dir, db) = temp_db();
        let mut editor = open(db, RecordingPrompter::accepting());

        editor.add_ingredient(&summary(1, "Flour", 364.0, 4.0)).unwrap();
        let err = editor.add_ingredient(&summary(1, "Flour", 364.0, 4.0)).unwrap_err();

        assert_eq!(err, EditorError::DuplicateIngredient("Flour".to_string()));
        assert_eq!(editor.state().ingredients.len(), 1);
        assert_eq!(editor.state().ingredients[0].quantity_g, 0.0);
        assert_eq!(editor.prompter().alerts.len(), 1);
    }

    #[tokio::test]
    async fn test_moves_swap_neighbours_and_stop_at_edges() {
        let (_dir, db) = temp_db();
        let mut editor = open(db, RecordingPrompter::accepting());
        for (id, name) in [(1, "Flour"), (2, "Butter"), (3, "Milk")] {
            editor.add_ingredient(&summary(id, name, 100.0, 1.0)).unwrap();
        }

        editor.move_up(1).unwrap();
        assert_eq!(order(&editor), vec![1, 2, 3]);
        editor.move_down(3).unwrap();
        assert_eq!(order(&editor), vec![1, 2, 3]);

        editor.move_up(3).unwrap();
        assert_eq!(order(&editor), vec![1, 3, 2]);
        editor.move_down(1).unwrap();
        assert_eq!(order(&editor), vec![3, 1, 2]);

        assert_eq!(editor.move_up(9).unwrap_err(), EditorError::UnknownLine(9));
    }

    #[tokio::test]
    async fn test_remove_requires_confirmation() {
        let (_dir, db) = temp_db();
        let mut editor = open(db, RecordingPrompter::declining());
        editor.add_ingredient(&summary(1, "Flour", 364.0, 4.0)).unwrap();

        editor.remove_ingredient(1).unwrap();
        assert_eq!(editor.state().ingredients.len(), 1);
        assert_eq!(editor.prompter().confirms.len(), 1);

        let (_dir, db) = temp_db();
        let mut editor = open(db, RecordingPrompter::accepting());
        editor.add_ingredient(&summary(1, "Flour", 364.0, 4.0)).unwrap();
        editor.remove_ingredient(1).unwrap();
        assert!(editor.state().ingredients.is_empty());

        let r = editor.recompute();
        assert!(r.is_empty);
        assert_eq!(r.totals, RawTotals::default());
        assert_eq!(r.total_cost, 0.0);
        assert_eq!(r.panel, NutritionPanel::Placeholder);
        assert!(!r.can_print);
    }

    #[tokio::test]
    async fn test_recompute_uses_override_and_servings() {
        let (_dir, db) = temp_db();
        let mut editor = open(db, RecordingPrompter::accepting());
        editor.add_ingredient(&summary(1, "Flour", 364.0, 4.0)).unwrap();
        editor.add_ingredient(&summary(2, "Butter", 717.0, 30.0)).unwrap();

        assert!(!editor.can_print());
        assert_eq!(editor.recompute().panel, NutritionPanel::Placeholder);

        editor.set_quantity(1, "200").unwrap();
        editor.set_quantity(2, "not a number").unwrap();
        let r = editor.recompute();
        assert_eq!(r.final_weight_g, 200.0);
        assert_eq!(r.total_cost, 8.0);
        assert!(r.can_print);

        editor.set_final_weight("160");
        editor.set_servings_count("4");
        let r = editor.recompute();
        let d = r.densities.unwrap();
        assert_eq!(d.serving_weight_g, 40.0);
        assert_eq!(d.per_serving.calories_kcal, 728.0 / 160.0 * 40.0);
        assert_eq!(r.total_cost, 8.0);
        assert_eq!(editor.state().serving_weight_g, 40.0);

        editor.set_final_weight("");
        assert_eq!(editor.recompute().final_weight_g, 200.0);
        assert_eq!(editor.state().serving_weight_g, 0.0);
    }

    #[tokio::test]
    async fn test_negative_final_weight_blocks_printing() {
        let (_dir, db) = temp_db();
        let mut editor = open(db, RecordingPrompter::accepting());
        editor.add_ingredient(&summary(1, "Flour", 364.0, 4.0)).unwrap();
        editor.set_quantity(1, "200").unwrap();

        editor.set_final_weight("-50");
        let r = editor.recompute();
        assert_eq!(r.panel, NutritionPanel::Placeholder);
        assert!(!r.can_print);
        assert!(!editor.can_print());
        assert_eq!(editor.state().serving_weight_g, 0.0);

        editor.set_final_weight("0");
        assert!(editor.recompute().can_print);
    }

    #[tokio::test]
    async fn test_hidden_nutrients_and_allergens() {
        let (_dir, db) = temp_db();
        let mut editor = open(db, RecordingPrompter::accepting());
        editor.add_ingredient(&summary(1, "Flour", 364.0, 4.0)).unwrap();
        editor.set_quantity(1, "100").unwrap();

        editor.set_nutrient_visible(NutrientKey::SodiumMg, false);
        editor.set_allergen("Gluten", true);
        editor.set_allergen("Gluten", true);
        editor.set_allergen("Milk", true);
        editor.set_allergen("Milk", false);

        let NutritionPanel::Table { rows, .. } = editor.recompute().panel else {
            panic!("expected a nutrition table");
        };
        assert!(rows.iter().all(|row| row.key != NutrientKey::SodiumMg));
        assert_eq!(rows.len(), NutrientKey::ALL.len() - 1);
        assert_eq!(editor.state().label_options.allergens, vec!["Gluten"]);
    }

    #[tokio::test]
    async fn test_save_persists_whole_document_in_order() {
        let (_dir, db) = temp_db();
        let flour = add_ingredient(&db, "Flour", 364.0, 4.0);
        let butter = add_ingredient(&db, "Butter", 717.0, 30.0);
        let recipe_id = add_recipe(&db, "Scones", 1, &[]);
        let backend = Arc::new(LocalBackend::new(db.clone(), Config::default()));
        let (mut editor, _events) =
            RecipeEditor::new(backend, RecordingPrompter::accepting(), recipe_id, RecipeState::new("Scones"));

        editor.add_ingredient(&summary(flour, "Flour", 364.0, 4.0)).unwrap();
        editor.add_ingredient(&summary(butter, "Butter", 717.0, 30.0)).unwrap();
        editor.set_quantity(flour, "250").unwrap();
        editor.set_quantity(butter, "80").unwrap();
        editor.move_up(butter).unwrap();
        editor.set_recipe_name("Butter scones");
        editor.set_servings_count("6");

        assert!(editor.save().await.unwrap().is_success());
        assert!(!editor.is_saving());

        let saved = get_recipe(&db, recipe_id).unwrap().payload.unwrap().recipe;
        assert_eq!(saved.recipe_name, "Butter scones");
        assert_eq!(saved.servings_count, 6);
        let ids: Vec<i64> = saved.ingredients.iter().map(|l| l.ingredient_id).collect();
        assert_eq!(ids, vec![butter, flour]);
        let quantities: Vec<f64> = saved.ingredients.iter().map(|l| l.quantity_g).collect();
        assert_eq!(quantities, vec![80.0, 250.0]);

        editor.remove_ingredient(butter).unwrap();
        editor.save().await.unwrap();
        let saved = get_recipe(&db, recipe_id).unwrap().payload.unwrap().recipe;
        assert_eq!(saved.ingredients.len(), 1);
        let row = db.with_conn(|conn| Recipe::get_by_id(conn, recipe_id)).unwrap().unwrap();
        assert_eq!(row.recipe_name, "Butter scones");
    }

    #[tokio::test]
    async fn test_save_rejection_is_alerted() {
        let (_dir, db) = temp_db();
        let mut editor = open(db, RecordingPrompter::accepting());
        editor.set_recipe_name("   ");

        let outcome = editor.save().await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Rejected { .. }));
        assert_eq!(editor.prompter().alerts, vec!["Validation failed."]);
    }

    #[tokio::test]
    async fn test_custom_ingredient_is_created_and_added() {
        let (_dir, db) = temp_db();
        let mut editor = open(db, RecordingPrompter::accepting());

        let mut form = IngredientForm {
            food_name: "House jam".to_string(),
            cost_per_unit: Some(18.0),
            unit_name: Some("g".to_string()),
            ..Default::default()
        };
        for key in NutrientKey::ALL {
            form.set_nutrient(key, Some(2.0));
        }

        assert!(editor.create_custom_ingredient(&form).await.is_success());
        let line = &editor.state().ingredients[0];
        assert_eq!(line.ingredient_name, "House jam");
        assert_eq!(line.details.cost_per_unit, 18.0);
        assert_eq!(line.quantity_g, 0.0);
    }

    #[tokio::test]
    async fn test_preview_needs_printable_panel() {
        let (_dir, db) = temp_db();
        let flour = add_ingredient(&db, "Flour", 364.0, 4.0);
        let recipe_id = add_recipe(&db, "Scones", 1, &[]);
        let backend = Arc::new(LocalBackend::new(db, Config::default()));
        let (mut editor, _events) =
            RecipeEditor::new(backend, RecordingPrompter::accepting(), recipe_id, RecipeState::new("Scones"));

        editor.add_ingredient(&summary(flour, "Flour", 364.0, 4.0)).unwrap();
        assert!(editor.preview_label().await.is_none());
        assert_eq!(editor.prompter().alerts.len(), 1);

        editor.set_quantity(flour, "300").unwrap();
        let preview = editor.preview_label().await.unwrap();
        assert_eq!(preview.product_name, "Scones");
        assert!(preview.ingredients.contains("Flour"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_switch_lists_that_source() {
        let (_dir, db) = temp_db();
        add_ingredient(&db, "Flour", 364.0, 4.0);
        let recipe_id = add_recipe(&db, "Scones", 1, &[]);
        let backend = Arc::new(LocalBackend::new(db, Config::default()));
        let (mut editor, mut events) =
            RecipeEditor::new(backend, RecordingPrompter::accepting(), recipe_id, RecipeState::new("Scones"));

        editor.search_ingredients("");
        assert!(matches!(events.recv().await.unwrap(), SearchEvent::Hint(_)));

        editor.set_search_source(SourceFilter::User, "");
        match events.recv().await.unwrap() {
            SearchEvent::Results { items, .. } => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].name, "Flour");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
