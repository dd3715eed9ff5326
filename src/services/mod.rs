pub mod content;
pub mod interactions;
pub mod providers;
pub mod recommendations;
pub mod scoring;

pub use content::{ContentListOptions, ContentService, TypeSearchOptions};
pub use interactions::{InteractionService, RatingSummary};
pub use recommendations::{
    ContentFilterOptions, RecommendationOptions, RecommendationService, DEFAULT_LIMIT,
};
pub use scoring::{rank_content, score_content, ContentScore, EnrichedInteraction};
