use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the application router with all routes.
///
/// The request-id middleware sits outside the trace layer so the span
/// constructor finds the id already in the extensions.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
        .with_state(state)
}

/// API routes under /api
fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/recommendations/user/:user_id",
            get(handlers::get_recommendations),
        )
        .route("/recommendations/filter", get(handlers::filter_content))
        .route("/interactions", post(handlers::record_interaction))
        .route(
            "/interactions/user/:user_id",
            get(handlers::user_interactions),
        )
        .route(
            "/interactions/content/:content_id/rating",
            get(handlers::content_rating),
        )
        .route("/content", get(handlers::list_content))
        .route("/content/filter", get(handlers::search_content))
        .route("/content/:id", get(handlers::get_content))
}
