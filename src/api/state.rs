use std::sync::Arc;

use crate::db::Cache;
use crate::services::providers::{ContentProvider, InteractionProvider, UserProvider};
use crate::services::{ContentService, InteractionService, RecommendationService};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub recommendations: Arc<RecommendationService>,
    pub interactions: Arc<InteractionService>,
    pub content: Arc<ContentService>,
}

impl AppState {
    /// Wires the services around one set of providers and one cache.
    ///
    /// The interaction service routes its popularity bumps through the same
    /// content service instance the read endpoints use, so the cached
    /// content snapshot stays in step with the counter.
    pub fn new(
        users: Arc<dyn UserProvider>,
        content: Arc<dyn ContentProvider>,
        interactions: Arc<dyn InteractionProvider>,
        cache: Cache,
    ) -> Self {
        let catalog = Arc::new(ContentService::new(content.clone(), cache.clone()));
        let recommendations = Arc::new(RecommendationService::new(
            users.clone(),
            content.clone(),
            interactions.clone(),
            cache.clone(),
        ));
        let interactions = Arc::new(InteractionService::new(
            users,
            content,
            interactions,
            catalog.clone(),
            cache,
        ));

        Self {
            recommendations,
            interactions,
            content: catalog,
        }
    }
}
