//! Relevance scoring for recommendation candidates.
//!
//! Scoring is pure: every signal, including the clock, arrives as an
//! argument, so one request scores all of its candidates against the same
//! instant and equal inputs always produce equal scores.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::{Content, Interaction, InteractionType, User};

/// Points per candidate tag found in the user's stated preferences.
pub const PREFERENCE_TAG_WEIGHT: f64 = 2.0;
/// Points per candidate tag seen anywhere in the user's history.
pub const HISTORY_TAG_WEIGHT: f64 = 1.5;
/// Points per candidate tag seen in the trailing seven days.
pub const RECENT_TAG_WEIGHT: f64 = 2.0;
/// Ceiling of the freshness term; new content starts here and loses one
/// point per week of age.
pub const FRESHNESS_CEILING: f64 = 5.0;
/// Ceiling of the popularity term.
pub const POPULARITY_CEILING: f64 = 5.0;
/// Affinity weight for interaction types outside the weight table.
const DEFAULT_AFFINITY_WEIGHT: f64 = 1.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// An interaction joined with the content it touched.
///
/// The engine resolves content in one batched lookup and hands the scorer
/// borrowed pairs; interactions whose content cannot be resolved never make
/// it into a pair.
#[derive(Debug, Clone, Copy)]
pub struct EnrichedInteraction<'a> {
    pub interaction: &'a Interaction,
    pub content: &'a Content,
}

/// A candidate with its computed relevance score.
#[derive(Debug, Clone)]
pub struct ContentScore {
    pub content: Content,
    pub score: f64,
}

/// How strongly an interaction type signals engagement.
fn affinity_weight(interaction_type: InteractionType) -> f64 {
    match interaction_type {
        InteractionType::View => 1.0,
        InteractionType::Like => 3.0,
        InteractionType::Share => 4.0,
        InteractionType::Comment => 3.5,
        InteractionType::Save => 4.5,
        InteractionType::Rating => DEFAULT_AFFINITY_WEIGHT,
    }
}

/// Joins interactions with their content records, dropping any whose
/// content id is not in the map.
pub fn enrich_interactions<'a>(
    interactions: &'a [Interaction],
    content_by_id: &'a HashMap<Uuid, Content>,
) -> Vec<EnrichedInteraction<'a>> {
    interactions
        .iter()
        .filter_map(|interaction| {
            content_by_id
                .get(&interaction.content_id)
                .map(|content| EnrichedInteraction {
                    interaction,
                    content,
                })
        })
        .collect()
}

/// Scores one candidate against a user's profile and enriched history.
///
/// The score is the sum of five additive terms:
/// 1. preference match: [`PREFERENCE_TAG_WEIGHT`] per tag shared with the
///    user's preferences,
/// 2. freshness: [`FRESHNESS_CEILING`] minus one point per week of age,
///    floored at zero,
/// 3. popularity: a tenth of the popularity counter, capped at
///    [`POPULARITY_CEILING`],
/// 4. history affinity: half the type weight for every past interaction
///    whose content shares the candidate's type, plus
///    [`HISTORY_TAG_WEIGHT`] per tag the candidate shares with any
///    interacted content,
/// 5. recency boost: [`RECENT_TAG_WEIGHT`] per tag shared with content
///    interacted with in the trailing seven days.
pub fn score_content(
    content: &Content,
    user: &User,
    history: &[EnrichedInteraction<'_>],
    now: DateTime<Utc>,
) -> f64 {
    let mut score = 0.0;

    // 1. Stated preferences.
    let preference_matches = content
        .tags
        .iter()
        .filter(|tag| user.preferences.contains(tag))
        .count();
    score += preference_matches as f64 * PREFERENCE_TAG_WEIGHT;

    // 2. Freshness, decaying one point per week.
    let age_days = (now - content.created_at).num_seconds() as f64 / SECONDS_PER_DAY;
    score += (FRESHNESS_CEILING - age_days / 7.0).max(0.0);

    // 3. Popularity, capped so a viral item cannot drown the profile terms.
    score += (content.popularity as f64 / 10.0).min(POPULARITY_CEILING);

    // 4. Observed behavior: type affinity and the tag profile of everything
    // the user has touched.
    let mut history_tags: HashSet<&str> = HashSet::new();
    for item in history {
        for tag in &item.content.tags {
            history_tags.insert(tag.as_str());
        }
        if item.content.content_type == content.content_type {
            score += affinity_weight(item.interaction.interaction_type) / 2.0;
        }
    }
    let history_matches = content
        .tags
        .iter()
        .filter(|tag| history_tags.contains(tag.as_str()))
        .count();
    score += history_matches as f64 * HISTORY_TAG_WEIGHT;

    // 5. What the user touched this week counts double.
    let week_ago = now - Duration::days(7);
    let mut recent_tags: HashSet<&str> = HashSet::new();
    for item in history {
        if item.interaction.timestamp > week_ago {
            for tag in &item.content.tags {
                recent_tags.insert(tag.as_str());
            }
        }
    }
    let recent_matches = content
        .tags
        .iter()
        .filter(|tag| recent_tags.contains(tag.as_str()))
        .count();
    score += recent_matches as f64 * RECENT_TAG_WEIGHT;

    score
}

/// Scores every candidate, sorts descending and keeps the top `limit`.
///
/// The sort is stable, so candidates with equal scores keep the order they
/// arrived in; paired with a deterministic candidate query this makes the
/// whole ranking deterministic for fixed inputs.
pub fn rank_content(
    candidates: Vec<Content>,
    user: &User,
    history: &[EnrichedInteraction<'_>],
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<Content> {
    let mut scored: Vec<ContentScore> = candidates
        .into_iter()
        .map(|content| {
            let score = score_content(&content, user, history, now);
            ContentScore { content, score }
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    scored
        .into_iter()
        .take(limit)
        .map(|scored| scored.content)
        .collect()
}
