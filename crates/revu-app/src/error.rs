use axum::{
    Json,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use serde_json::json;
use tracing::error;

pub type ApiResult<T, E = ApiError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Dal(#[from] revu_dal::Error),

    #[error("{0}")]
    InvalidQuery(String),

    #[error("Invalid confirmation code")]
    InvalidConfirmationCode,

    #[error("Not authenticated")]
    Unauthorized,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Internal error: {0}")]
    Auth(#[from] revu_auth::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use revu_dal::Error as DalError;
        match self {
            ApiError::Dal(DalError::RecordNotFound(what)) => (
                StatusCode::NOT_FOUND,
                Json(json!({"detail": format!("{what} not found")})),
            )
                .into_response(),
            ApiError::Dal(DalError::UniqueViolation(detail))
            | ApiError::Dal(DalError::InvalidReference(detail)) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"detail": detail})),
            )
                .into_response(),
            ApiError::Dal(DalError::DatabaseError(e)) => {
                error!("Database error: {e}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            ApiError::InvalidQuery(detail) => {
                (StatusCode::BAD_REQUEST, Json(json!({"detail": detail}))).into_response()
            }
            // not field-scoped, goes out as plain text
            ApiError::InvalidConfirmationCode => {
                (StatusCode::BAD_REQUEST, "Invalid confirmation code").into_response()
            }
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            ApiError::Forbidden => StatusCode::FORBIDDEN.into_response(),
            ApiError::Auth(e) => {
                error!("Token error: {e}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
