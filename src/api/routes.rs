use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Users and their precomputed recommendations
        .route("/users", get(handlers::get_users))
        .route(
            "/users/:user_id/recommendations",
            get(handlers::get_recommendations),
        )
        // Catalog views
        .route("/books/popular", get(handlers::get_popular))
        .route("/books/search", get(handlers::search_books))
        .route("/books/lookup", get(handlers::lookup_book))
        .route("/books/:id", get(handlers::get_book))
        .route("/genres", get(handlers::get_genre_shelves))
        .route("/genres/:label", get(handlers::get_genre))
        // Client-held favorites
        .route("/favorites", post(handlers::get_favorites))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
