use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::content::ContentService;
use super::providers::{ContentProvider, InteractionProvider, UserProvider};
use crate::db::Cache;
use crate::error::{AppError, AppResult};
use crate::models::{Interaction, InteractionType, NewInteraction};

/// Rating value assumed when a rating interaction arrives without one.
const DEFAULT_RATING: u8 = 3;

/// Aggregated rating for one content item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingSummary {
    /// Mean of the submitted ratings, rounded to one decimal.
    pub average: f64,
    pub count: u64,
}

/// How much one interaction moves the popularity counter.
fn popularity_delta(interaction_type: InteractionType, rating: Option<u8>) -> i64 {
    match interaction_type {
        InteractionType::View => 1,
        InteractionType::Like => 3,
        InteractionType::Share => 4,
        InteractionType::Comment => 5,
        InteractionType::Save => 5,
        InteractionType::Rating => i64::from(rating.unwrap_or(DEFAULT_RATING)),
    }
}

/// Write side of the recommendation core: records interaction events and
/// drives their side effects (popularity counters, cache invalidation).
pub struct InteractionService {
    users: Arc<dyn UserProvider>,
    content: Arc<dyn ContentProvider>,
    interactions: Arc<dyn InteractionProvider>,
    catalog: Arc<ContentService>,
    cache: Cache,
}

impl InteractionService {
    pub fn new(
        users: Arc<dyn UserProvider>,
        content: Arc<dyn ContentProvider>,
        interactions: Arc<dyn InteractionProvider>,
        catalog: Arc<ContentService>,
        cache: Cache,
    ) -> Self {
        Self {
            users,
            content,
            interactions,
            catalog,
            cache,
        }
    }

    /// Records an interaction event.
    ///
    /// The insert alone decides the outcome; the popularity bump and the
    /// recommendation cache invalidation run concurrently with it and are
    /// best-effort. The caller is expected to have validated the
    /// type-conditional payload already.
    pub async fn record_interaction(&self, data: NewInteraction) -> AppResult<Interaction> {
        // 1. Both referenced records must exist before anything is written.
        tokio::try_join!(
            self.ensure_user(data.user_id),
            self.ensure_content(data.content_id),
        )?;

        let delta = popularity_delta(data.interaction_type, data.rating);
        let interaction = Interaction {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            content_id: data.content_id,
            interaction_type: data.interaction_type,
            timestamp: Utc::now(),
            duration_secs: data.duration_secs,
            comment: data.comment,
            rating: data.rating,
        };

        // 2. Persist and fan out the side effects concurrently.
        let (persisted, bumped, _) = tokio::join!(
            self.interactions.insert(interaction),
            self.catalog.apply_popularity_delta(data.content_id, delta),
            self.cache.invalidate_recommendations(data.user_id),
        );

        match bumped {
            Ok(Some(_)) => {}
            Ok(None) => tracing::debug!(
                content_id = %data.content_id,
                "Content disappeared before the popularity bump"
            ),
            Err(e) => tracing::warn!(
                content_id = %data.content_id,
                error = %e,
                "Popularity increment failed"
            ),
        }

        let persisted = persisted?;
        tracing::info!(
            user_id = %persisted.user_id,
            content_id = %persisted.content_id,
            interaction_type = persisted.interaction_type.as_str(),
            "Interaction recorded"
        );
        Ok(persisted)
    }

    /// A user's interaction history, newest first.
    pub async fn user_interactions(
        &self,
        user_id: Uuid,
        interaction_type: Option<InteractionType>,
    ) -> AppResult<Vec<Interaction>> {
        self.ensure_user(user_id).await?;
        self.interactions.find_by_user(user_id, interaction_type).await
    }

    /// Interactions against one content item, newest first.
    pub async fn content_interactions(
        &self,
        content_id: Uuid,
        interaction_type: Option<InteractionType>,
    ) -> AppResult<Vec<Interaction>> {
        self.ensure_content(content_id).await?;
        self.interactions
            .find_by_content(content_id, interaction_type)
            .await
    }

    /// Average rating for a content item, or `None` when nothing has been
    /// rated. A missing rating value counts as zero toward the mean but
    /// still counts toward the denominator.
    pub async fn content_average_rating(
        &self,
        content_id: Uuid,
    ) -> AppResult<Option<RatingSummary>> {
        self.ensure_content(content_id).await?;

        let ratings = self
            .interactions
            .find_by_content(content_id, Some(InteractionType::Rating))
            .await?;
        if ratings.is_empty() {
            return Ok(None);
        }

        let sum: f64 = ratings
            .iter()
            .map(|interaction| f64::from(interaction.rating.unwrap_or(0)))
            .sum();
        let average = (sum / ratings.len() as f64 * 10.0).round() / 10.0;

        Ok(Some(RatingSummary {
            average,
            count: ratings.len() as u64,
        }))
    }

    async fn ensure_user(&self, user_id: Uuid) -> AppResult<()> {
        match self.users.find_by_id(user_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("User {} not found", user_id))),
        }
    }

    async fn ensure_content(&self, content_id: Uuid) -> AppResult<()> {
        match self.content.find_by_id(content_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!(
                "Content {} not found",
                content_id
            ))),
        }
    }
}
