use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Content, ContentType, Interaction, InteractionType, NewInteraction};
use crate::services::providers::{SortField, SortOrder};
use crate::services::{
    ContentFilterOptions, ContentListOptions, RecommendationOptions, TypeSearchOptions,
    DEFAULT_LIMIT,
};

use super::response::ApiResponse;
use super::AppState;

/// Largest result-set size a query may name.
const MAX_LIMIT: u32 = 100;

// Query parameters

#[derive(Debug, Deserialize)]
pub struct RecommendationParams {
    limit: Option<u32>,
    #[serde(rename = "type")]
    content_type: Option<String>,
    tags: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FilterParams {
    #[serde(rename = "type")]
    content_type: Option<String>,
    tags: Option<String>,
    limit: Option<u32>,
    offset: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct InteractionTypeParams {
    #[serde(rename = "type")]
    interaction_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContentListParams {
    #[serde(rename = "type")]
    content_type: Option<String>,
    tags: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
    sort_field: Option<String>,
    sort_order: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TypeSearchParams {
    #[serde(rename = "type")]
    content_type: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

// Response bodies

#[derive(Debug, Serialize)]
pub struct ContentRatingResponse {
    pub rating: Option<f64>,
    pub rating_count: u64,
}

#[derive(Debug, Serialize)]
pub struct ContentListResponse {
    pub content: Vec<Content>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

// Parameter parsing

fn parse_content_type(raw: Option<&str>) -> AppResult<Option<ContentType>> {
    raw.map(|raw| raw.parse().map_err(AppError::InvalidInput))
        .transpose()
}

fn parse_interaction_type(raw: Option<&str>) -> AppResult<Option<InteractionType>> {
    raw.map(|raw| raw.parse().map_err(AppError::InvalidInput))
        .transpose()
}

/// Splits a comma-separated tag list, dropping empty segments.
fn parse_tags(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn validate_limit(limit: Option<u32>) -> AppResult<u32> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT as u32);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::InvalidInput(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }
    Ok(limit)
}

fn validate_page(page: Option<u32>) -> AppResult<u32> {
    let page = page.unwrap_or(1);
    if page < 1 {
        return Err(AppError::InvalidInput("page must be at least 1".to_string()));
    }
    Ok(page)
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Personalized recommendations for a user
pub async fn get_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<RecommendationParams>,
) -> AppResult<Json<ApiResponse<Vec<Content>>>> {
    let options = RecommendationOptions {
        limit: validate_limit(params.limit)? as usize,
        content_type: parse_content_type(params.content_type.as_deref())?,
        tags: parse_tags(params.tags.as_deref()),
        skip_content_ids: Vec::new(),
    };

    let recommendations = state
        .recommendations
        .get_recommendations(user_id, &options)
        .await?;
    Ok(Json(ApiResponse::success(
        recommendations,
        "Recommendations retrieved successfully",
    )))
}

/// Non-personalized content discovery by type and tags
pub async fn filter_content(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> AppResult<Json<ApiResponse<Vec<Content>>>> {
    let options = ContentFilterOptions {
        content_type: parse_content_type(params.content_type.as_deref())?,
        tags: parse_tags(params.tags.as_deref()),
        limit: validate_limit(params.limit)? as usize,
        offset: params.offset.unwrap_or(0),
    };

    let content = state.recommendations.filter_content(&options).await?;
    Ok(Json(ApiResponse::success(
        content,
        "Filtered content retrieved successfully",
    )))
}

/// Records a user interaction with content
pub async fn record_interaction(
    State(state): State<AppState>,
    Json(payload): Json<NewInteraction>,
) -> AppResult<(StatusCode, Json<ApiResponse<Interaction>>)> {
    payload.validate().map_err(AppError::InvalidInput)?;

    let interaction = state.interactions.record_interaction(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            interaction,
            "Interaction recorded successfully",
        )),
    ))
}

/// A user's interaction history, optionally filtered by type
pub async fn user_interactions(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<InteractionTypeParams>,
) -> AppResult<Json<ApiResponse<Vec<Interaction>>>> {
    let interaction_type = parse_interaction_type(params.interaction_type.as_deref())?;

    let interactions = state
        .interactions
        .user_interactions(user_id, interaction_type)
        .await?;
    Ok(Json(ApiResponse::success(
        interactions,
        "User interactions retrieved successfully",
    )))
}

/// Average rating for a content item
pub async fn content_rating(
    State(state): State<AppState>,
    Path(content_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ContentRatingResponse>>> {
    let summary = state.interactions.content_average_rating(content_id).await?;

    let (body, message) = match summary {
        Some(summary) => (
            ContentRatingResponse {
                rating: Some(summary.average),
                rating_count: summary.count,
            },
            "Content rating retrieved successfully",
        ),
        None => (
            ContentRatingResponse {
                rating: None,
                rating_count: 0,
            },
            "Content has no ratings yet",
        ),
    };
    Ok(Json(ApiResponse::success(body, message)))
}

/// Paged catalog listing with filtering and sorting
pub async fn list_content(
    State(state): State<AppState>,
    Query(params): Query<ContentListParams>,
) -> AppResult<Json<ApiResponse<ContentListResponse>>> {
    let limit = validate_limit(params.limit)?;
    let page = validate_page(params.page)?;

    let sort_field = match params.sort_field.as_deref() {
        Some(raw) => raw.parse().map_err(AppError::InvalidInput)?,
        None => SortField::CreatedAt,
    };
    let sort_order = match params.sort_order.as_deref() {
        Some(raw) => raw.parse().map_err(AppError::InvalidInput)?,
        None => SortOrder::Desc,
    };

    let options = ContentListOptions {
        content_type: parse_content_type(params.content_type.as_deref())?,
        tags: parse_tags(params.tags.as_deref()),
        sort_field,
        sort_order,
        skip: u64::from(page - 1) * u64::from(limit),
        limit: u64::from(limit),
    };

    let result = state.content.list_content(&options).await?;
    let total_pages = result.total.div_ceil(u64::from(limit));

    Ok(Json(ApiResponse::success(
        ContentListResponse {
            content: result.items,
            total: result.total,
            page,
            limit,
            total_pages,
        },
        "Content retrieved successfully",
    )))
}

/// Popularity-ordered search within one content type
pub async fn search_content(
    State(state): State<AppState>,
    Query(params): Query<TypeSearchParams>,
) -> AppResult<Json<ApiResponse<Vec<Content>>>> {
    let content_type = parse_content_type(params.content_type.as_deref())?
        .ok_or_else(|| AppError::InvalidInput("type is required".to_string()))?;
    let limit = validate_limit(params.limit)?;
    let page = validate_page(params.page)?;

    let options = TypeSearchOptions {
        skip: u64::from(page - 1) * u64::from(limit),
        limit: u64::from(limit),
    };

    let results = state.content.search_by_type(content_type, &options).await?;
    Ok(Json(ApiResponse::success(
        results,
        "Content filtered by type successfully",
    )))
}

/// Single content item by id
pub async fn get_content(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Content>>> {
    let content = state.content.get_content(id).await?;
    Ok(Json(ApiResponse::success(
        content,
        "Content retrieved successfully",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags_splits_and_trims() {
        assert_eq!(
            parse_tags(Some("tech, rust ,ai")),
            vec!["tech".to_string(), "rust".to_string(), "ai".to_string()]
        );
    }

    #[test]
    fn test_parse_tags_drops_empty_segments() {
        assert_eq!(parse_tags(Some("tech,,")), vec!["tech".to_string()]);
        assert!(parse_tags(None).is_empty());
    }

    #[test]
    fn test_validate_limit_defaults_to_ten() {
        assert_eq!(validate_limit(None).unwrap(), 10);
    }

    #[test]
    fn test_validate_limit_rejects_out_of_range() {
        assert!(validate_limit(Some(0)).is_err());
        assert!(validate_limit(Some(101)).is_err());
        assert_eq!(validate_limit(Some(1)).unwrap(), 1);
        assert_eq!(validate_limit(Some(100)).unwrap(), 100);
    }

    #[test]
    fn test_validate_page_defaults_to_one() {
        assert_eq!(validate_page(None).unwrap(), 1);
        assert!(validate_page(Some(0)).is_err());
    }

    #[test]
    fn test_parse_content_type() {
        assert_eq!(
            parse_content_type(Some("video")).unwrap(),
            Some(ContentType::Video)
        );
        assert_eq!(parse_content_type(None).unwrap(), None);
        assert!(parse_content_type(Some("movie")).is_err());
    }

    #[test]
    fn test_rating_response_shape() {
        let body = ContentRatingResponse {
            rating: None,
            rating_count: 0,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"rating":null,"rating_count":0}"#);
    }
}
