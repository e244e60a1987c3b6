use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Malformed catalog: {0}")]
    MalformedCatalog(String),

    #[error("Malformed interactions: {0}")]
    MalformedInteractions(String),

    #[error("Malformed recommendations: {0}")]
    MalformedRecommendations(String),

    #[error("Malformed recommendation for user {user_id}: invalid token {token:?}")]
    MalformedRecommendation { user_id: String, token: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Book data is still loading")]
    NotReady,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotReady => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            AppError::MalformedCatalog(_)
            | AppError::MalformedInteractions(_)
            | AppError::MalformedRecommendations(_)
            | AppError::MalformedRecommendation { .. }
            | AppError::Csv(_)
            | AppError::Io(_)
            | AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::NotFound("book 9".to_string()), StatusCode::NOT_FOUND),
            (AppError::InvalidInput("limit".to_string()), StatusCode::BAD_REQUEST),
            (AppError::NotReady, StatusCode::SERVICE_UNAVAILABLE),
            (
                AppError::MalformedCatalog("duplicate id".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_malformed_recommendation_message() {
        let error = AppError::MalformedRecommendation {
            user_id: "42".to_string(),
            token: "x7".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Malformed recommendation for user 42: invalid token \"x7\""
        );
    }
}
