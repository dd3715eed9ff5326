use std::sync::Arc;

use uuid::Uuid;

use super::providers::{ContentProvider, ContentQuery, SortField, SortOrder};
use super::recommendations::DEFAULT_LIMIT;
use crate::cached;
use crate::db::{Cache, CacheKey, OptionToken};
use crate::error::{AppError, AppResult};
use crate::models::{Content, ContentPage, ContentType};

/// Knobs for a paged catalog listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentListOptions {
    pub content_type: Option<ContentType>,
    pub tags: Vec<String>,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
    pub skip: u64,
    pub limit: u64,
}

impl Default for ContentListOptions {
    fn default() -> Self {
        Self {
            content_type: None,
            tags: Vec::new(),
            sort_field: SortField::CreatedAt,
            sort_order: SortOrder::Desc,
            skip: 0,
            limit: DEFAULT_LIMIT as u64,
        }
    }
}

impl ContentListOptions {
    pub fn cache_key(&self) -> CacheKey {
        let token = OptionToken::new()
            .field("limit", self.limit)
            .field("skip", self.skip)
            .field("sort", self.sort_field)
            .field("order", self.sort_order)
            .opt_field("type", self.content_type)
            .list_field("tags", &self.tags)
            .finish();

        CacheKey::ContentList(token)
    }
}

/// Pagination for a type-filtered search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSearchOptions {
    pub skip: u64,
    pub limit: u64,
}

impl Default for TypeSearchOptions {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT as u64,
        }
    }
}

impl TypeSearchOptions {
    pub fn cache_key(&self, content_type: ContentType) -> CacheKey {
        let token = OptionToken::new()
            .field("limit", self.limit)
            .field("skip", self.skip)
            .finish();

        CacheKey::ContentFilter {
            content_type,
            token,
        }
    }
}

/// Cached read access to the content catalog, plus the popularity write used
/// by the interaction recorder. The catalog itself is owned by an external
/// writer; nothing here creates or deletes content.
pub struct ContentService {
    content: Arc<dyn ContentProvider>,
    cache: Cache,
}

impl ContentService {
    pub fn new(content: Arc<dyn ContentProvider>, cache: Cache) -> Self {
        Self { content, cache }
    }

    /// Paged catalog listing with the unpaginated total.
    pub async fn list_content(&self, options: &ContentListOptions) -> AppResult<ContentPage> {
        cached!(self.cache, options.cache_key(), async {
            let query = ContentQuery {
                content_type: options.content_type,
                tags_any_of: options.tags.clone(),
                sort: vec![(options.sort_field, options.sort_order)],
                skip: options.skip,
                limit: Some(options.limit),
                ..ContentQuery::default()
            };
            let (items, total) = self.content.find_many(query).await?;
            Ok(ContentPage { items, total })
        })
    }

    /// Content of one type, most popular first, recency as the tiebreak.
    pub async fn search_by_type(
        &self,
        content_type: ContentType,
        options: &TypeSearchOptions,
    ) -> AppResult<Vec<Content>> {
        cached!(self.cache, options.cache_key(content_type), async {
            let query = ContentQuery {
                content_type: Some(content_type),
                sort: vec![
                    (SortField::Popularity, SortOrder::Desc),
                    (SortField::CreatedAt, SortOrder::Desc),
                ],
                skip: options.skip,
                limit: Some(options.limit),
                ..ContentQuery::default()
            };
            let (items, _) = self.content.find_many(query).await?;
            Ok(items)
        })
    }

    /// Single content item, read through the `content:{id}` snapshot.
    pub async fn get_content(&self, id: Uuid) -> AppResult<Content> {
        cached!(self.cache, CacheKey::Content(id), async {
            self.content
                .find_by_id(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Content {} not found", id)))
        })
    }

    /// Atomically bumps a content item's popularity and refreshes its cached
    /// snapshot. Returns `None` when the id is unknown.
    pub async fn apply_popularity_delta(
        &self,
        id: Uuid,
        delta: i64,
    ) -> AppResult<Option<Content>> {
        let updated = self.content.increment_popularity(id, delta).await?;

        if let Some(content) = &updated {
            self.cache
                .set_in_background(&CacheKey::Content(content.id), content);
            tracing::debug!(
                content_id = %content.id,
                popularity = content.popularity,
                delta,
                "Content popularity updated"
            );
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::db::{CacheBackend, MemoryBackend};
    use crate::services::providers::MockContentProvider;

    fn make_content(title: &str, content_type: ContentType, popularity: i64) -> Content {
        Content {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content_type,
            tags: vec![],
            popularity,
            created_at: Utc::now(),
        }
    }

    async fn service_with(content: MockContentProvider) -> (ContentService, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let (cache, _handle) = Cache::new(backend.clone()).await;
        (ContentService::new(Arc::new(content), cache), backend)
    }

    #[tokio::test]
    async fn test_list_content_queries_with_the_requested_page() {
        let options = ContentListOptions {
            content_type: Some(ContentType::Article),
            sort_field: SortField::Popularity,
            sort_order: SortOrder::Asc,
            skip: 20,
            limit: 10,
            ..ContentListOptions::default()
        };

        let item = make_content("One", ContentType::Article, 5);
        let mut content = MockContentProvider::new();
        let items = vec![item.clone()];
        content.expect_find_many().returning(move |query| {
            assert_eq!(query.content_type, Some(ContentType::Article));
            assert_eq!(query.sort, vec![(SortField::Popularity, SortOrder::Asc)]);
            assert_eq!(query.skip, 20);
            assert_eq!(query.limit, Some(10));
            Ok((items.clone(), 31))
        });

        let (service, _backend) = service_with(content).await;
        let page = service.list_content(&options).await.unwrap();

        assert_eq!(page.items, vec![item]);
        assert_eq!(page.total, 31);
    }

    #[tokio::test]
    async fn test_list_content_serves_the_cache_on_repeat() {
        let options = ContentListOptions::default();

        let mut content = MockContentProvider::new();
        let items = vec![make_content("One", ContentType::Video, 2)];
        content
            .expect_find_many()
            .times(1)
            .returning(move |_| Ok((items.clone(), 1)));

        let (service, _backend) = service_with(content).await;
        let first = service.list_content(&options).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = service.list_content(&options).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_search_by_type_sorts_by_popularity_then_recency() {
        let mut content = MockContentProvider::new();
        let items = vec![make_content("Top", ContentType::Podcast, 90)];
        content.expect_find_many().returning(move |query| {
            assert_eq!(query.content_type, Some(ContentType::Podcast));
            assert_eq!(
                query.sort,
                vec![
                    (SortField::Popularity, SortOrder::Desc),
                    (SortField::CreatedAt, SortOrder::Desc),
                ]
            );
            Ok((items.clone(), 1))
        });

        let (service, _backend) = service_with(content).await;
        let results = service
            .search_by_type(ContentType::Podcast, &TypeSearchOptions::default())
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Top");
    }

    #[tokio::test]
    async fn test_get_content_reads_through_the_snapshot() {
        let item = make_content("Snap", ContentType::Article, 7);
        let id = item.id;

        let mut content = MockContentProvider::new();
        let found = item.clone();
        content
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(found.clone())));

        let (service, backend) = service_with(content).await;
        let first = service.get_content(id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let stored = backend
            .get(&CacheKey::Content(id).to_string())
            .await
            .unwrap();
        assert!(stored.is_some());

        let second = service.get_content(id).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_get_content_unknown_is_not_found() {
        let mut content = MockContentProvider::new();
        content.expect_find_by_id().returning(|_| Ok(None));

        let (service, _backend) = service_with(content).await;
        let err = service.get_content(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_apply_popularity_delta_refreshes_the_snapshot() {
        let updated = make_content("Bumped", ContentType::Video, 13);
        let id = updated.id;

        let mut content = MockContentProvider::new();
        let returned = updated.clone();
        content
            .expect_increment_popularity()
            .returning(move |_, delta| {
                assert_eq!(delta, 3);
                Ok(Some(returned.clone()))
            });

        let (service, backend) = service_with(content).await;
        let result = service.apply_popularity_delta(id, 3).await.unwrap();
        assert_eq!(result.as_ref().map(|c| c.popularity), Some(13));

        tokio::time::sleep(Duration::from_millis(50)).await;
        let raw = backend
            .get(&CacheKey::Content(id).to_string())
            .await
            .unwrap()
            .unwrap();
        let snapshot: Content = serde_json::from_str(&raw).unwrap();
        assert_eq!(snapshot.popularity, 13);
    }

    #[tokio::test]
    async fn test_apply_popularity_delta_unknown_content_is_none() {
        let mut content = MockContentProvider::new();
        content
            .expect_increment_popularity()
            .returning(|_, _| Ok(None));

        let (service, _backend) = service_with(content).await;
        let result = service
            .apply_popularity_delta(Uuid::new_v4(), 5)
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_list_options_key_is_canonical() {
        let first = ContentListOptions {
            tags: vec!["b".to_string(), "a".to_string()],
            ..ContentListOptions::default()
        };
        let second = ContentListOptions {
            tags: vec!["a".to_string(), "b".to_string()],
            ..ContentListOptions::default()
        };

        assert_eq!(
            first.cache_key().to_string(),
            second.cache_key().to_string()
        );
    }
}
