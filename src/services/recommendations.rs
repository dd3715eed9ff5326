use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::providers::{
    ContentProvider, ContentQuery, InteractionProvider, SortField, SortOrder, UserProvider,
};
use super::scoring::{enrich_interactions, rank_content};
use crate::db::{Cache, CacheKey, OptionToken};
use crate::error::{AppError, AppResult};
use crate::models::{Content, ContentType, User};

/// Result-set size when the caller does not ask for one.
pub const DEFAULT_LIMIT: usize = 10;

/// Knobs for a personalized recommendation request.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationOptions {
    /// Maximum number of items to return.
    pub limit: usize,
    /// Restrict candidates to one content type.
    pub content_type: Option<ContentType>,
    /// Restrict candidates to content carrying at least one of these tags.
    pub tags: Vec<String>,
    /// Content ids to leave out regardless of score.
    pub skip_content_ids: Vec<Uuid>,
}

impl Default for RecommendationOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            content_type: None,
            tags: Vec::new(),
            skip_content_ids: Vec::new(),
        }
    }
}

impl RecommendationOptions {
    /// Cache key for this option set. Equal option sets map to the same key
    /// no matter how the caller assembled them.
    pub fn cache_key(&self, user_id: Uuid) -> CacheKey {
        let token = OptionToken::new()
            .field("limit", self.limit)
            .opt_field("type", self.content_type)
            .list_field("tags", &self.tags)
            .list_field("skip", &self.skip_content_ids)
            .finish();

        CacheKey::Recommendations { user_id, token }
    }
}

/// Knobs for a non-personalized popularity/recency listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentFilterOptions {
    pub content_type: Option<ContentType>,
    pub tags: Vec<String>,
    pub limit: usize,
    pub offset: u64,
}

impl Default for ContentFilterOptions {
    fn default() -> Self {
        Self {
            content_type: None,
            tags: Vec::new(),
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl ContentFilterOptions {
    pub fn cache_key(&self) -> CacheKey {
        let token = OptionToken::new()
            .field("limit", self.limit)
            .field("offset", self.offset)
            .opt_field("type", self.content_type)
            .list_field("tags", &self.tags)
            .finish();

        CacheKey::FilteredContent(token)
    }
}

/// Read side of the recommendation core: scores unseen content against a
/// user's preferences and interaction history, behind a cache-aside layer.
pub struct RecommendationService {
    users: Arc<dyn UserProvider>,
    content: Arc<dyn ContentProvider>,
    interactions: Arc<dyn InteractionProvider>,
    cache: Cache,
}

impl RecommendationService {
    pub fn new(
        users: Arc<dyn UserProvider>,
        content: Arc<dyn ContentProvider>,
        interactions: Arc<dyn InteractionProvider>,
        cache: Cache,
    ) -> Self {
        Self {
            users,
            content,
            interactions,
            cache,
        }
    }

    /// Computes the personalized ranking for a user.
    ///
    /// Content the user has already interacted with never appears. An empty
    /// result is a valid answer (new platform, or the user has seen
    /// everything) and is never cached, so the next request gets a fresh
    /// look at the catalog.
    pub async fn get_recommendations(
        &self,
        user_id: Uuid,
        options: &RecommendationOptions,
    ) -> AppResult<Vec<Content>> {
        let cache_key = options.cache_key(user_id);

        // 1. A cached non-empty result set short-circuits everything.
        if let Some(cached) = self.cache.get_from_cache::<Vec<Content>>(&cache_key).await {
            if !cached.is_empty() {
                tracing::debug!(
                    user_id = %user_id,
                    count = cached.len(),
                    "Serving recommendations from cache"
                );
                return Ok(cached);
            }
        }

        // 2. Load the user and their full interaction history concurrently.
        let (user, interactions) = tokio::try_join!(
            self.load_user(user_id),
            self.interactions.find_by_user(user_id, None),
        )?;

        // 3. Resolve the content behind the history in one batched lookup.
        let mut seen = HashSet::new();
        let interacted_ids: Vec<Uuid> = interactions
            .iter()
            .map(|interaction| interaction.content_id)
            .filter(|id| seen.insert(*id))
            .collect();
        let interacted_content = self.interacted_content(&interacted_ids).await?;

        // 4. Candidates: everything not interacted with or explicitly skipped.
        let mut excluded = interacted_ids;
        excluded.extend(options.skip_content_ids.iter().copied());
        excluded.sort_unstable();
        excluded.dedup();

        let candidate_query = ContentQuery {
            id_not_in: excluded,
            content_type: options.content_type,
            tags_any_of: options.tags.clone(),
            ..ContentQuery::default()
        };
        let (candidates, _) = self.content.find_many(candidate_query).await?;

        if candidates.is_empty() {
            tracing::debug!(user_id = %user_id, "No unseen content left to recommend");
            return Ok(Vec::new());
        }

        // 5. Score everything against one instant and keep the top of the list.
        let history = enrich_interactions(&interactions, &interacted_content);
        let ranked = rank_content(candidates, &user, &history, Utc::now(), options.limit);

        // 6. Only non-empty result sets are worth keeping.
        if !ranked.is_empty() {
            self.cache.set_in_background(&cache_key, &ranked);
        }

        tracing::info!(
            user_id = %user_id,
            count = ranked.len(),
            history = history.len(),
            "Recommendations computed"
        );
        Ok(ranked)
    }

    /// Non-personalized content filter, sorted by popularity and recency.
    pub async fn filter_content(&self, options: &ContentFilterOptions) -> AppResult<Vec<Content>> {
        let cache_key = options.cache_key();

        if let Some(cached) = self.cache.get_from_cache::<Vec<Content>>(&cache_key).await {
            if !cached.is_empty() {
                tracing::debug!(key = %cache_key, "Serving filtered content from cache");
                return Ok(cached);
            }
        }

        let query = ContentQuery {
            content_type: options.content_type,
            tags_any_of: options.tags.clone(),
            sort: vec![
                (SortField::Popularity, SortOrder::Desc),
                (SortField::CreatedAt, SortOrder::Desc),
            ],
            skip: options.offset,
            limit: Some(options.limit as u64),
            ..ContentQuery::default()
        };
        let (content, _) = self.content.find_many(query).await?;

        if !content.is_empty() {
            self.cache.set_in_background(&cache_key, &content);
        }
        Ok(content)
    }

    async fn load_user(&self, user_id: Uuid) -> AppResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    async fn interacted_content(&self, ids: &[Uuid]) -> AppResult<HashMap<Uuid, Content>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let query = ContentQuery {
            id_in: Some(ids.to_vec()),
            ..ContentQuery::default()
        };
        let (items, _) = self.content.find_many(query).await?;

        Ok(items.into_iter().map(|item| (item.id, item)).collect())
    }
}
