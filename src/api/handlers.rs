use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{BookId, BookRecord},
    services::{
        DEFAULT_GENRE_LIMIT, DEFAULT_POPULAR_LIMIT, DEFAULT_RECOMMENDATION_LIMIT,
        DEFAULT_SEARCH_LIMIT,
    },
};

use super::AppState;

/// Upper bound for any `limit` query parameter
pub const MAX_LIMIT: usize = 100;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    /// The requested limit, `default` when absent, clamped to `MAX_LIMIT`
    pub fn resolve(&self, default: usize) -> AppResult<usize> {
        match self.limit {
            Some(0) => Err(AppError::InvalidInput(
                "limit must be at least 1".to_string(),
            )),
            Some(limit) => Ok(limit.min(MAX_LIMIT)),
            None => Ok(default),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TitleQuery {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct FavoritesRequest {
    pub ids: Vec<BookId>,
}

#[derive(Debug, Serialize)]
pub struct BookResponse {
    pub id: BookId,
    pub title: String,
    pub title_long: Option<String>,
    pub author: String,
    pub subjects: Vec<String>,
    pub cover_image_url: Option<String>,
    pub detail_link: Option<String>,
    pub description: Option<String>,
    pub pages: Option<String>,
    pub publication_year: Option<String>,
    pub language: Option<String>,
    pub publisher: Option<String>,
}

impl From<&BookRecord> for BookResponse {
    fn from(book: &BookRecord) -> Self {
        Self {
            id: book.id,
            title: book.display_title().to_string(),
            title_long: book.title_long.clone(),
            author: book.display_author().to_string(),
            subjects: book.subjects.clone(),
            cover_image_url: book.cover_image_url.clone(),
            detail_link: book.detail_link.clone(),
            description: book.description.clone(),
            pages: book.pages.clone(),
            publication_year: book.publication_year.clone(),
            language: book.language.clone(),
            publisher: book.publisher.clone(),
        }
    }
}

fn to_responses(books: Vec<&BookRecord>) -> Vec<BookResponse> {
    books.into_iter().map(BookResponse::from).collect()
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub user_id: String,
    pub books: Vec<BookResponse>,
}

#[derive(Debug, Serialize)]
pub struct PopularBookResponse {
    #[serde(flatten)]
    pub book: BookResponse,
    pub popularity: u64,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub total_matches: usize,
    pub books: Vec<BookResponse>,
}

#[derive(Debug, Serialize)]
pub struct GenreShelfResponse {
    pub label: String,
    pub books: Vec<BookResponse>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ready: bool,
    pub books: Option<usize>,
    pub users: Option<usize>,
    pub interactions: Option<u64>,
    pub loaded_at: Option<DateTime<Utc>>,
}

// Handlers

/// Health check endpoint, reporting whether the book data is loaded
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let response = match state.service() {
        Ok(service) => HealthResponse {
            ready: true,
            books: Some(service.stores().catalog.len()),
            users: Some(service.stores().recommendations.len()),
            interactions: Some(service.stores().interactions.total_events()),
            loaded_at: Some(service.loaded_at()),
        },
        Err(_) => HealthResponse {
            ready: false,
            books: None,
            users: None,
            interactions: None,
            loaded_at: None,
        },
    };
    Json(response)
}

/// List every user with a recommendation entry
pub async fn get_users(State(state): State<AppState>) -> AppResult<Json<Vec<String>>> {
    let service = state.service()?;
    Ok(Json(service.users().to_vec()))
}

/// Precomputed recommendations for one user
pub async fn get_recommendations(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(user_id): Path<String>,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<RecommendationsResponse>> {
    let limit = params.resolve(DEFAULT_RECOMMENDATION_LIMIT)?;
    let service = state.service()?;

    let books = to_responses(service.recommendations_for(&user_id, limit));
    tracing::info!(
        request_id = %request_id,
        user_id = %user_id,
        limit,
        returned = books.len(),
        "Served recommendations"
    );

    Ok(Json(RecommendationsResponse { user_id, books }))
}

/// Most popular books by interaction count
pub async fn get_popular(
    State(state): State<AppState>,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<Vec<PopularBookResponse>>> {
    let limit = params.resolve(DEFAULT_POPULAR_LIMIT)?;
    let service = state.service()?;

    let books = service
        .most_popular_with_counts(limit)
        .into_iter()
        .map(|(book, popularity)| PopularBookResponse {
            book: BookResponse::from(book),
            popularity,
        })
        .collect();
    Ok(Json(books))
}

/// Substring search over title, author and subjects
pub async fn search_books(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<SearchResponse>> {
    let limit = LimitQuery {
        limit: params.limit,
    }
    .resolve(DEFAULT_SEARCH_LIMIT)?;
    let service = state.service()?;

    let total_matches = service.count_matches(&params.q);
    let books = to_responses(service.search(&params.q, limit));
    tracing::debug!(
        request_id = %request_id,
        query = %params.q,
        total_matches,
        "Search completed"
    );

    Ok(Json(SearchResponse {
        query: params.q,
        total_matches,
        books,
    }))
}

/// Books whose subjects mention one genre
pub async fn get_genre(
    State(state): State<AppState>,
    Path(label): Path<String>,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<GenreShelfResponse>> {
    let limit = params.resolve(DEFAULT_GENRE_LIMIT)?;
    let service = state.service()?;

    let books = to_responses(service.by_genre(&label, limit));
    Ok(Json(GenreShelfResponse { label, books }))
}

/// Every configured genre shelf that has at least one book
pub async fn get_genre_shelves(
    State(state): State<AppState>,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<Vec<GenreShelfResponse>>> {
    let limit = params.resolve(DEFAULT_GENRE_LIMIT)?;
    let service = state.service()?;

    let shelves = service
        .genre_shelves(limit)
        .into_iter()
        .map(|shelf| GenreShelfResponse {
            label: shelf.label.to_string(),
            books: to_responses(shelf.books),
        })
        .collect();
    Ok(Json(shelves))
}

/// Single book by id
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<BookId>,
) -> AppResult<Json<BookResponse>> {
    let service = state.service()?;
    service
        .book(id)
        .map(|book| Json(BookResponse::from(book)))
        .ok_or_else(|| AppError::NotFound(format!("book {}", id)))
}

/// Single book by its long display title
pub async fn lookup_book(
    State(state): State<AppState>,
    Query(params): Query<TitleQuery>,
) -> AppResult<Json<BookResponse>> {
    let service = state.service()?;
    service
        .book_by_title(&params.title)
        .map(|book| Json(BookResponse::from(book)))
        .ok_or_else(|| AppError::NotFound(format!("book titled {:?}", params.title)))
}

/// Hydrate a client-held favorites list
pub async fn get_favorites(
    State(state): State<AppState>,
    Json(request): Json<FavoritesRequest>,
) -> AppResult<Json<Vec<BookResponse>>> {
    let service = state.service()?;
    Ok(Json(to_responses(service.favorites(&request.ids))))
}
