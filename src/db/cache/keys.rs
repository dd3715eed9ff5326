use std::fmt::Display;

use uuid::Uuid;

use crate::models::ContentType;

const RECOMMENDATIONS_TTL: u64 = 30 * 60;
const FILTERED_CONTENT_TTL: u64 = 15 * 60;
const CONTENT_LIST_TTL: u64 = 15 * 60;
const CONTENT_FILTER_TTL: u64 = 10 * 60;
const CONTENT_SNAPSHOT_TTL: u64 = 30 * 60;

/// Typed cache keys, one variant per namespace.
///
/// Every key the service reads or writes is derived through this enum, so
/// the namespace layout and the TTL table live in one place.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Per-user recommendation result set for one canonical option token.
    Recommendations { user_id: Uuid, token: String },
    /// Umbrella key for a user's recommendations, carrying no option token.
    /// Never written, but deleted on invalidation so nothing keyed without
    /// options can survive an interaction.
    UserRecommendations(Uuid),
    /// Index set of every recommendation key issued for a user. Members are
    /// added by the cache writer whenever a recommendation entry is stored;
    /// invalidation walks the set to cover every option-specific variant.
    RecommendationIndex(Uuid),
    /// Popularity/recency-sorted content filter results.
    FilteredContent(String),
    /// Paged catalog listing.
    ContentList(String),
    /// Type-filtered content search.
    ContentFilter {
        content_type: ContentType,
        token: String,
    },
    /// Single-content snapshot, refreshed on every popularity increment.
    Content(Uuid),
}

impl CacheKey {
    /// Fixed TTL for this key's namespace, in seconds.
    pub fn ttl(&self) -> u64 {
        match self {
            CacheKey::Recommendations { .. }
            | CacheKey::UserRecommendations(_)
            | CacheKey::RecommendationIndex(_) => RECOMMENDATIONS_TTL,
            CacheKey::FilteredContent(_) => FILTERED_CONTENT_TTL,
            CacheKey::ContentList(_) => CONTENT_LIST_TTL,
            CacheKey::ContentFilter { .. } => CONTENT_FILTER_TTL,
            CacheKey::Content(_) => CONTENT_SNAPSHOT_TTL,
        }
    }

    /// Index set that should record this key when it is stored, if the
    /// namespace keeps one.
    pub fn index_key(&self) -> Option<CacheKey> {
        match self {
            CacheKey::Recommendations { user_id, .. } => {
                Some(CacheKey::RecommendationIndex(*user_id))
            }
            _ => None,
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Recommendations { user_id, token } => {
                write!(f, "recommendations:{}:{}", user_id, token)
            }
            CacheKey::UserRecommendations(user_id) => write!(f, "recommendations:{}", user_id),
            CacheKey::RecommendationIndex(user_id) => {
                write!(f, "recommendations:index:{}", user_id)
            }
            CacheKey::FilteredContent(token) => write!(f, "filteredContent:{}", token),
            CacheKey::ContentList(token) => write!(f, "content:list:{}", token),
            CacheKey::ContentFilter {
                content_type,
                token,
            } => write!(f, "content:filter:{}:{}", content_type, token),
            CacheKey::Content(id) => write!(f, "content:{}", id),
        }
    }
}

/// Builder for the canonical option token embedded in query-shaped keys.
///
/// Two option sets with identical fields must land on the same cache entry
/// no matter how the caller assembled them, so the token normalizes
/// everything: fields sort by name, list values sort and deduplicate, and
/// unset fields are omitted entirely.
#[derive(Debug, Default)]
pub struct OptionToken {
    parts: Vec<(&'static str, String)>,
}

impl OptionToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field that is always present.
    pub fn field(mut self, name: &'static str, value: impl Display) -> Self {
        self.parts.push((name, value.to_string()));
        self
    }

    /// Adds a field only when it is set.
    pub fn opt_field(self, name: &'static str, value: Option<impl Display>) -> Self {
        match value {
            Some(value) => self.field(name, value),
            None => self,
        }
    }

    /// Adds a list field, sorted and deduplicated; omitted when empty.
    pub fn list_field(mut self, name: &'static str, values: &[impl Display]) -> Self {
        if values.is_empty() {
            return self;
        }
        let mut rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        rendered.sort_unstable();
        rendered.dedup();
        self.parts.push((name, rendered.join(",")));
        self
    }

    /// Renders the canonical token.
    pub fn finish(mut self) -> String {
        self.parts.sort_by_key(|(name, _)| *name);
        self.parts
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendations_key_display() {
        let user_id = Uuid::nil();
        let key = CacheKey::Recommendations {
            user_id,
            token: "limit=10".to_string(),
        };
        assert_eq!(
            format!("{}", key),
            "recommendations:00000000-0000-0000-0000-000000000000:limit=10"
        );
    }

    #[test]
    fn test_umbrella_key_has_no_token() {
        let user_id = Uuid::nil();
        assert_eq!(
            format!("{}", CacheKey::UserRecommendations(user_id)),
            "recommendations:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_index_key_display() {
        let user_id = Uuid::nil();
        assert_eq!(
            format!("{}", CacheKey::RecommendationIndex(user_id)),
            "recommendations:index:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_content_filter_key_embeds_type() {
        let key = CacheKey::ContentFilter {
            content_type: ContentType::Video,
            token: "limit=10&skip=0".to_string(),
        };
        assert_eq!(format!("{}", key), "content:filter:video:limit=10&skip=0");
    }

    #[test]
    fn test_ttl_table() {
        let user_id = Uuid::nil();
        let recommendations = CacheKey::Recommendations {
            user_id,
            token: String::new(),
        };
        assert_eq!(recommendations.ttl(), 30 * 60);
        assert_eq!(CacheKey::FilteredContent(String::new()).ttl(), 15 * 60);
        assert_eq!(CacheKey::ContentList(String::new()).ttl(), 15 * 60);
        let filter = CacheKey::ContentFilter {
            content_type: ContentType::Article,
            token: String::new(),
        };
        assert_eq!(filter.ttl(), 10 * 60);
        assert_eq!(CacheKey::Content(Uuid::nil()).ttl(), 30 * 60);
    }

    #[test]
    fn test_only_recommendation_entries_are_indexed() {
        let user_id = Uuid::new_v4();
        let key = CacheKey::Recommendations {
            user_id,
            token: "limit=10".to_string(),
        };
        assert_eq!(key.index_key(), Some(CacheKey::RecommendationIndex(user_id)));
        assert_eq!(CacheKey::Content(user_id).index_key(), None);
        assert_eq!(CacheKey::FilteredContent(String::new()).index_key(), None);
    }

    #[test]
    fn test_token_field_order_is_canonical() {
        let first = OptionToken::new()
            .field("limit", 10)
            .opt_field("type", Some("article"))
            .finish();
        let second = OptionToken::new()
            .opt_field("type", Some("article"))
            .field("limit", 10)
            .finish();
        assert_eq!(first, second);
        assert_eq!(first, "limit=10&type=article");
    }

    #[test]
    fn test_token_list_values_sorted_and_deduplicated() {
        let token = OptionToken::new()
            .list_field("tags", &["web", "rust", "web", "ai"])
            .finish();
        assert_eq!(token, "tags=ai,rust,web");
    }

    #[test]
    fn test_token_omits_unset_fields() {
        let token = OptionToken::new()
            .field("limit", 10)
            .opt_field("type", None::<&str>)
            .list_field("tags", &Vec::<String>::new())
            .finish();
        assert_eq!(token, "limit=10");
    }
}
