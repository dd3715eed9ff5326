#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use curator_api::api::AppState;
use curator_api::db::{Cache, MemoryBackend};
use curator_api::error::AppResult;
use curator_api::models::{Content, ContentType, Interaction, InteractionType, Role, User};
use curator_api::services::providers::{
    ContentProvider, ContentQuery, InteractionProvider, SortField, SortOrder, UserProvider,
};

/// In-memory stand-in for all three provider traits, with call counters for
/// asserting how often the services reach the stores.
pub struct TestStore {
    users: Mutex<HashMap<Uuid, User>>,
    content: Mutex<HashMap<Uuid, Content>>,
    interactions: Mutex<Vec<Interaction>>,
    content_queries: AtomicUsize,
    inserts: AtomicUsize,
}

impl TestStore {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            content: Mutex::new(HashMap::new()),
            interactions: Mutex::new(Vec::new()),
            content_queries: AtomicUsize::new(0),
            inserts: AtomicUsize::new(0),
        }
    }

    pub fn add_user(&self, user: User) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn add_content(&self, content: Content) {
        self.content.lock().unwrap().insert(content.id, content);
    }

    pub fn add_interaction(&self, interaction: Interaction) {
        self.interactions.lock().unwrap().push(interaction);
    }

    /// Number of `find_many` calls the content store has served.
    pub fn content_query_count(&self) -> usize {
        self.content_queries.load(Ordering::SeqCst)
    }

    /// Number of interactions persisted through `insert`.
    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn popularity_of(&self, id: Uuid) -> i64 {
        self.content.lock().unwrap()[&id].popularity
    }

    fn interactions_matching(
        &self,
        predicate: impl Fn(&Interaction) -> bool,
        interaction_type: Option<InteractionType>,
    ) -> Vec<Interaction> {
        let mut matches: Vec<Interaction> = self
            .interactions
            .lock()
            .unwrap()
            .iter()
            .filter(|interaction| {
                predicate(interaction)
                    && interaction_type.map_or(true, |t| interaction.interaction_type == t)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matches
    }
}

#[async_trait]
impl UserProvider for TestStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }
}

#[async_trait]
impl ContentProvider for TestStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Content>> {
        Ok(self.content.lock().unwrap().get(&id).cloned())
    }

    async fn find_many(&self, query: ContentQuery) -> AppResult<(Vec<Content>, u64)> {
        self.content_queries.fetch_add(1, Ordering::SeqCst);

        let mut items: Vec<Content> = self
            .content
            .lock()
            .unwrap()
            .values()
            .filter(|content| {
                if let Some(ids) = &query.id_in {
                    if !ids.contains(&content.id) {
                        return false;
                    }
                }
                if query.id_not_in.contains(&content.id) {
                    return false;
                }
                if let Some(content_type) = query.content_type {
                    if content.content_type != content_type {
                        return false;
                    }
                }
                if !query.tags_any_of.is_empty()
                    && !content.tags.iter().any(|tag| query.tags_any_of.contains(tag))
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect();

        items.sort_by(|a, b| {
            for (field, order) in &query.sort {
                let ordering = match field {
                    SortField::Title => a.title.cmp(&b.title),
                    SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                    SortField::Popularity => a.popularity.cmp(&b.popularity),
                };
                let ordering = match order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                };
                if ordering != std::cmp::Ordering::Equal {
                    return ordering;
                }
            }
            a.id.cmp(&b.id)
        });

        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(query.skip as usize)
            .take(query.limit.map_or(usize::MAX, |limit| limit as usize))
            .collect();

        Ok((items, total))
    }

    async fn increment_popularity(&self, id: Uuid, delta: i64) -> AppResult<Option<Content>> {
        let mut content = self.content.lock().unwrap();
        Ok(content.get_mut(&id).map(|item| {
            item.popularity += delta;
            item.clone()
        }))
    }
}

#[async_trait]
impl InteractionProvider for TestStore {
    async fn find_by_user(
        &self,
        user_id: Uuid,
        interaction_type: Option<InteractionType>,
    ) -> AppResult<Vec<Interaction>> {
        Ok(self.interactions_matching(|i| i.user_id == user_id, interaction_type))
    }

    async fn find_by_content(
        &self,
        content_id: Uuid,
        interaction_type: Option<InteractionType>,
    ) -> AppResult<Vec<Interaction>> {
        Ok(self.interactions_matching(|i| i.content_id == content_id, interaction_type))
    }

    async fn insert(&self, interaction: Interaction) -> AppResult<Interaction> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.interactions.lock().unwrap().push(interaction.clone());
        Ok(interaction)
    }
}

/// Builds an [`AppState`] over one shared in-memory store and a fresh cache.
pub async fn test_state() -> (AppState, Arc<TestStore>, Cache) {
    let store = Arc::new(TestStore::new());
    let (cache, _writer) = Cache::new(Arc::new(MemoryBackend::new())).await;
    let state = AppState::new(store.clone(), store.clone(), store.clone(), cache.clone());
    (state, store, cache)
}

pub fn user_with_preferences(preferences: &[&str]) -> User {
    User {
        id: Uuid::new_v4(),
        username: format!("user-{}", Uuid::new_v4().simple()),
        role: Role::User,
        preferences: preferences.iter().map(|s| s.to_string()).collect(),
        created_at: Utc::now() - Duration::days(60),
    }
}

pub fn content_item(
    title: &str,
    content_type: ContentType,
    tags: &[&str],
    popularity: i64,
    age_days: i64,
) -> Content {
    Content {
        id: Uuid::new_v4(),
        title: title.to_string(),
        content_type,
        tags: tags.iter().map(|s| s.to_string()).collect(),
        popularity,
        created_at: Utc::now() - Duration::days(age_days),
    }
}

pub fn interaction_of(
    user_id: Uuid,
    content_id: Uuid,
    interaction_type: InteractionType,
    rating: Option<u8>,
) -> Interaction {
    Interaction {
        id: Uuid::new_v4(),
        user_id,
        content_id,
        interaction_type,
        timestamp: Utc::now() - Duration::hours(1),
        duration_secs: (interaction_type == InteractionType::View).then_some(120),
        comment: None,
        rating,
    }
}
