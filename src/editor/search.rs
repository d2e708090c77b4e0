//! Debounced search
//!
//! Each keystroke cancels the pending timer; only the latest value is queried
//! once the delay elapses. A query that has been sent runs to completion on
//! its own task, so responses can arrive out of order.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::{Backend, ClientError};
use crate::models::SourceFilter;
use crate::tools::ingredients::IngredientSummary;
use crate::tools::prices::IngredientName;
use crate::tools::recipes::RecipeSummary;

pub const DEFAULT_DELAY: Duration = Duration::from_millis(300);

pub const RECIPE_HINT: &str = "Type at least 2 characters to search recipes…";
pub const INGREDIENT_HINT: &str = "Type an ingredient name to search…";

#[async_trait]
pub trait SearchSource: Send + Sync + 'static {
    type Item: Clone + Send + 'static;

    async fn search(&self, query: &str) -> Result<Vec<Self::Item>, ClientError>;
}

/// What an empty query does
#[derive(Debug, Clone, PartialEq)]
pub enum EmptyQuery<T> {
    Clear,
    Hint(String),
    /// Show a preloaded result set without querying
    Initial(Vec<T>),
    /// Query with the empty string
    Query,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchPolicy<T> {
    pub min_chars: usize,
    pub delay: Duration,
    pub empty: EmptyQuery<T>,
    /// Shown for non-empty input below `min_chars`; results clear when None
    pub short_hint: Option<String>,
}

impl<T> SearchPolicy<T> {
    /// Price form autocomplete
    pub fn ingredient_names() -> Self {
        Self {
            min_chars: 1,
            delay: DEFAULT_DELAY,
            empty: EmptyQuery::Clear,
            short_hint: None,
        }
    }

    /// Product form recipe picker
    pub fn recipes(initial: Vec<T>) -> Self {
        Self {
            min_chars: 2,
            delay: DEFAULT_DELAY,
            empty: EmptyQuery::Initial(initial),
            short_hint: Some(RECIPE_HINT.to_string()),
        }
    }

    /// Recipe editor ingredient search; a specific source lists on empty input
    pub fn editor_ingredients(source: SourceFilter) -> Self {
        let empty = match source {
            SourceFilter::All => EmptyQuery::Hint(INGREDIENT_HINT.to_string()),
            SourceFilter::User | SourceFilter::Tfda => EmptyQuery::Query,
        };
        Self {
            min_chars: 1,
            delay: DEFAULT_DELAY,
            empty,
            short_hint: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent<T> {
    Cleared,
    Hint(String),
    Results { query: String, items: Vec<T> },
    Failed { query: String, message: String },
}

pub struct DebouncedSearch<S: SearchSource> {
    source: Arc<S>,
    policy: SearchPolicy<S::Item>,
    pending: Option<JoinHandle<()>>,
    events: mpsc::UnboundedSender<SearchEvent<S::Item>>,
}

impl<S: SearchSource> DebouncedSearch<S> {
    pub fn new(
        source: Arc<S>,
        policy: SearchPolicy<S::Item>,
    ) -> (Self, mpsc::UnboundedReceiver<SearchEvent<S::Item>>) {
        let (events, rx) = mpsc::unbounded_channel();
        let search = Self {
            source,
            policy,
            pending: None,
            events,
        };
        (search, rx)
    }

    pub fn policy(&self) -> &SearchPolicy<S::Item> {
        &self.policy
    }

    /// Swap the source and policy; a pending timer is cancelled
    pub fn reconfigure(&mut self, source: Arc<S>, policy: SearchPolicy<S::Item>) {
        self.cancel_pending();
        self.source = source;
        self.policy = policy;
    }

    /// Handle a change of the input text
    pub fn on_input(&mut self, text: &str) {
        self.cancel_pending();
        let query = text.trim();

        if query.is_empty() {
            match &self.policy.empty {
                EmptyQuery::Clear => self.emit(SearchEvent::Cleared),
                EmptyQuery::Hint(hint) => self.emit(SearchEvent::Hint(hint.clone())),
                EmptyQuery::Initial(items) => self.emit(SearchEvent::Results {
                    query: String::new(),
                    items: items.clone(),
                }),
                EmptyQuery::Query => self.schedule(String::new()),
            }
            return;
        }

        if query.chars().count() < self.policy.min_chars {
            match &self.policy.short_hint {
                Some(hint) => self.emit(SearchEvent::Hint(hint.clone())),
                None => self.emit(SearchEvent::Cleared),
            }
            return;
        }

        self.schedule(query.to_string());
    }

    /// Click outside the result list
    pub fn dismiss(&mut self) {
        self.cancel_pending();
        self.emit(SearchEvent::Cleared);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    fn emit(&self, event: SearchEvent<S::Item>) {
        // Receiver gone means the controller was dropped
        let _ = self.events.send(event);
    }

    fn schedule(&mut self, query: String) {
        let source = Arc::clone(&self.source);
        let events = self.events.clone();
        let delay = self.policy.delay;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(async move {
                let event = match source.search(&query).await {
                    Ok(items) => SearchEvent::Results { query, items },
                    Err(e) => {
                        tracing::warn!(query = %query, error = %e, "search request failed");
                        SearchEvent::Failed {
                            query,
                            message: e.to_string(),
                        }
                    }
                };
                let _ = events.send(event);
            });
        }));
    }
}

impl<S: SearchSource> Drop for DebouncedSearch<S> {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

/// Name autocomplete of the price form
pub struct IngredientNameSearch<B: Backend>(pub Arc<B>);

#[async_trait]
impl<B: Backend + 'static> SearchSource for IngredientNameSearch<B> {
    type Item = IngredientName;

    async fn search(&self, query: &str) -> Result<Vec<IngredientName>, ClientError> {
        self.0.search_all_ingredients(query).await
    }
}

/// Recipe picker of the product form
pub struct RecipeSearch<B: Backend>(pub Arc<B>);

#[async_trait]
impl<B: Backend + 'static> SearchSource for RecipeSearch<B> {
    type Item = RecipeSummary;

    async fn search(&self, query: &str) -> Result<Vec<RecipeSummary>, ClientError> {
        self.0.search_recipes(query).await
    }
}

/// Ingredient search with a source filter
pub struct IngredientSearch<B: Backend> {
    pub backend: Arc<B>,
    pub source: SourceFilter,
}

#[async_trait]
impl<B: Backend + 'static> SearchSource for IngredientSearch<B> {
    type Item = IngredientSummary;

    async fn search(&self, query: &str) -> Result<Vec<IngredientSummary>, ClientError> {
        self.backend.search_ingredients(query, self.source).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Echoes the query back; "slow" queries take a second
    #[derive(Default)]
    struct EchoSource {
        calls: Mutex<Vec<String>>,
    }

    impl EchoSource {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchSource for EchoSource {
        type Item = String;

        async fn search(&self, query: &str) -> Result<Vec<String>, ClientError> {
            self.calls.lock().unwrap().push(query.to_string());
            let wait = if query.starts_with("slow") { 1000 } else { 10 };
            tokio::time::sleep(Duration::from_millis(wait)).await;
            Ok(vec![format!("{}!", query)])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_latest_keystroke_is_queried() {
        let source = Arc::new(EchoSource::default());
        let (mut search, mut rx) = DebouncedSearch::new(Arc::clone(&source), SearchPolicy::ingredient_names());

        search.on_input("f");
        tokio::time::sleep(Duration::from_millis(100)).await;
        search.on_input("fl");
        tokio::time::sleep(Duration::from_millis(250)).await;
        search.on_input("flour");

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            SearchEvent::Results {
                query: "flour".to_string(),
                items: vec!["flour!".to_string()]
            }
        );
        assert_eq!(source.calls(), vec!["flour"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sent_queries_are_not_cancelled() {
        let source = Arc::new(EchoSource::default());
        let (mut search, mut rx) = DebouncedSearch::new(Arc::clone(&source), SearchPolicy::ingredient_names());

        search.on_input("slow");
        tokio::time::sleep(Duration::from_millis(350)).await;
        search.on_input("fast");

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(matches!(first, SearchEvent::Results { ref query, .. } if query == "fast"));
        assert!(matches!(second, SearchEvent::Results { ref query, .. } if query == "slow"));
        assert_eq!(source.calls(), vec!["slow", "fast"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recipe_policy_hint_and_initial_list() {
        let source = Arc::new(EchoSource::default());
        let initial = vec!["Baguette".to_string(), "Brioche".to_string()];
        let (mut search, mut rx) = DebouncedSearch::new(Arc::clone(&source), SearchPolicy::recipes(initial.clone()));

        search.on_input("b");
        assert_eq!(rx.recv().await.unwrap(), SearchEvent::Hint(RECIPE_HINT.to_string()));

        search.on_input("  ");
        assert_eq!(
            rx.recv().await.unwrap(),
            SearchEvent::Results {
                query: String::new(),
                items: initial
            }
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(source.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_query_with_specific_source_is_sent() {
        let source = Arc::new(EchoSource::default());
        let (mut search, mut rx) =
            DebouncedSearch::new(Arc::clone(&source), SearchPolicy::editor_ingredients(SourceFilter::All));

        search.on_input("");
        assert_eq!(rx.recv().await.unwrap(), SearchEvent::Hint(INGREDIENT_HINT.to_string()));

        search.reconfigure(Arc::clone(&source), SearchPolicy::editor_ingredients(SourceFilter::User));
        search.on_input("");
        assert!(matches!(rx.recv().await.unwrap(), SearchEvent::Results { ref query, .. } if query.is_empty()));
        assert_eq!(source.calls(), vec![""]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_cancels_pending_timer() {
        let source = Arc::new(EchoSource::default());
        let (mut search, mut rx) = DebouncedSearch::new(Arc::clone(&source), SearchPolicy::ingredient_names());

        search.on_input("sugar");
        assert!(search.is_pending());
        search.dismiss();
        assert_eq!(rx.recv().await.unwrap(), SearchEvent::Cleared);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(source.calls().is_empty());
    }
}
