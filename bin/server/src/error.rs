//! Maps library errors onto HTTP responses.
//!
//! Every failure answers with `{"error": "<message>"}`. Server-side failures
//! are logged in full and answered with a generic message.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use blogmate::BlogError;
use serde_json::json;
use tracing::error;

/// Error type returned by every handler.
#[derive(Debug)]
pub struct ApiError(pub BlogError);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<BlogError> for ApiError {
    fn from(err: BlogError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(BlogError::validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(BlogError::validation(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(BlogError::validation(rejection.body_text()))
    }
}

/// Status code for each error kind.
pub fn status_for(err: &BlogError) -> StatusCode {
    match err {
        BlogError::NotFound(_) => StatusCode::NOT_FOUND,
        BlogError::Unauthorized(_)
        | BlogError::InvalidToken
        | BlogError::TokenExpired
        | BlogError::BadCredentials => StatusCode::UNAUTHORIZED,
        BlogError::SelfDemotion => StatusCode::FORBIDDEN,
        BlogError::ValidationFailed(_)
        | BlogError::InvalidId(_)
        | BlogError::InvalidAction(_)
        | BlogError::InvalidAuthor(_)
        | BlogError::InvalidUser(_)
        | BlogError::ScopeMismatch(_) => StatusCode::BAD_REQUEST,
        BlogError::Duplicate(_) => StatusCode::CONFLICT,
        BlogError::OffTopic
        | BlogError::ParseFailed(_)
        | BlogError::InsufficientResults { .. } => StatusCode::NOT_ACCEPTABLE,
        BlogError::Timeout(_)
        | BlogError::StoreUnavailable(_)
        | BlogError::Storage(_)
        | BlogError::Serialization(_)
        | BlogError::Config(_)
        | BlogError::Io(_)
        | BlogError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let message = if status.is_server_error() {
            error!("Request failed: {}", self.0);
            match &self.0 {
                BlogError::Timeout(_) | BlogError::StoreUnavailable(_) => self.0.to_string(),
                _ => "internal server error".to_string(),
            }
        } else {
            self.0.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&BlogError::not_found("Blog")), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&BlogError::TokenExpired), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(&BlogError::SelfDemotion), StatusCode::FORBIDDEN);
        assert_eq!(
            status_for(&BlogError::InvalidAction("poke".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&BlogError::duplicate("email")), StatusCode::CONFLICT);
        assert_eq!(status_for(&BlogError::OffTopic), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(
            status_for(&BlogError::InsufficientResults { got: 4, need: 5 }),
            StatusCode::NOT_ACCEPTABLE
        );
        assert_eq!(
            status_for(&BlogError::storage("disk")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
