pub mod postgres;

use std::fmt::Display;
use std::str::FromStr;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Content, ContentType, Interaction, InteractionType, User};

pub use postgres::{PgContentStore, PgInteractionStore, PgUserStore};

/// Column a content query can sort on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Title,
    CreatedAt,
    Popularity,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Title => "title",
            SortField::CreatedAt => "created_at",
            SortField::Popularity => "popularity",
        }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(SortField::Title),
            "created_at" => Ok(SortField::CreatedAt),
            "popularity" => Ok(SortField::Popularity),
            other => Err(format!("unknown sort field: {}", other)),
        }
    }
}

impl Display for SortField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("unknown sort order: {}", other)),
        }
    }
}

impl Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declarative content lookup passed to [`ContentProvider::find_many`].
///
/// Empty lists mean "no constraint"; `id_in` is the exception, where
/// `Some(vec![])` matches nothing (a batch lookup of zero ids).
#[derive(Debug, Clone, PartialEq)]
pub struct ContentQuery {
    /// Restrict to these ids.
    pub id_in: Option<Vec<Uuid>>,
    /// Exclude these ids.
    pub id_not_in: Vec<Uuid>,
    /// Restrict to one content type.
    pub content_type: Option<ContentType>,
    /// Match content carrying at least one of these tags.
    pub tags_any_of: Vec<String>,
    /// Sort keys, applied in order. The provider appends the row id as a
    /// final tiebreak so equal keys keep a stable order across runs.
    pub sort: Vec<(SortField, SortOrder)>,
    pub skip: u64,
    /// `None` means unbounded.
    pub limit: Option<u64>,
}

impl Default for ContentQuery {
    fn default() -> Self {
        Self {
            id_in: None,
            id_not_in: Vec::new(),
            content_type: None,
            tags_any_of: Vec::new(),
            sort: vec![(SortField::CreatedAt, SortOrder::Desc)],
            skip: 0,
            limit: None,
        }
    }
}

/// Read access to user records.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserProvider: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
}

/// Access to the content catalog.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Content>>;

    /// Runs a content query, returning the matching page and the total
    /// match count before pagination.
    async fn find_many(&self, query: ContentQuery) -> AppResult<(Vec<Content>, u64)>;

    /// Atomically adds `delta` to a content item's popularity, returning the
    /// updated record, or `None` when the id is unknown.
    async fn increment_popularity(&self, id: Uuid, delta: i64) -> AppResult<Option<Content>>;
}

/// Access to the interaction log.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait InteractionProvider: Send + Sync {
    /// A user's interactions, newest first, optionally restricted to one type.
    async fn find_by_user(
        &self,
        user_id: Uuid,
        interaction_type: Option<InteractionType>,
    ) -> AppResult<Vec<Interaction>>;

    /// Interactions against one content item, newest first, optionally
    /// restricted to one type.
    async fn find_by_content(
        &self,
        content_id: Uuid,
        interaction_type: Option<InteractionType>,
    ) -> AppResult<Vec<Interaction>>;

    /// Persists an interaction, returning the stored record.
    async fn insert(&self, interaction: Interaction) -> AppResult<Interaction>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_field_round_trip() {
        for field in [SortField::Title, SortField::CreatedAt, SortField::Popularity] {
            assert_eq!(field.as_str().parse::<SortField>().unwrap(), field);
        }
        assert!("createdAt".parse::<SortField>().is_err());
    }

    #[test]
    fn test_sort_order_round_trip() {
        assert_eq!("asc".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert_eq!("desc".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert!("descending".parse::<SortOrder>().is_err());
    }

    #[test]
    fn test_default_query_is_unfiltered_newest_first() {
        let query = ContentQuery::default();
        assert_eq!(query.id_in, None);
        assert!(query.id_not_in.is_empty());
        assert!(query.tags_any_of.is_empty());
        assert_eq!(query.sort, vec![(SortField::CreatedAt, SortOrder::Desc)]);
        assert_eq!(query.limit, None);
    }
}
