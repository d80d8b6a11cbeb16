use crate::llm::TextGenerator;
use crate::models::portfolio::Portfolio;
use crate::storage::GithubStore;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared state of the HTTP handlers
pub struct AppState {
    pub store: GithubStore,
    pub llm: Arc<dyn TextGenerator + Send + Sync>,
    /// Portfolio saved through the API during this process's lifetime
    pub saved_portfolio: RwLock<Option<Portfolio>>,
}

impl AppState {
    pub fn new(store: GithubStore, llm: Arc<dyn TextGenerator + Send + Sync>) -> Self {
        Self {
            store,
            llm,
            saved_portfolio: RwLock::new(None),
        }
    }
}
