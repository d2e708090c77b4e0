//! Editor controllers
//!
//! UI-independent state machines for the admin pages. Each controller owns
//! its state, talks to a `Backend`, and reports through a `Prompter`.

pub mod crud;
pub mod form;
pub mod ingredient_manager;
pub mod price_form;
pub mod product_manager;
pub mod prompt;
pub mod recipe_editor;
pub mod search;

pub use crud::{ButtonStates, CrudError, CrudState, SubmitOutcome};
pub use form::FormState;
pub use ingredient_manager::IngredientManager;
pub use price_form::PriceFormController;
pub use product_manager::ProductManager;
pub use prompt::{LogPrompter, Prompter};
pub use recipe_editor::{EditorError, RecipeEditor};
pub use search::{DebouncedSearch, SearchEvent, SearchPolicy, SearchSource};
