use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub enum Error {
    // Auth
    LoginFail,
    AuthFailNoToken,
    AuthFailTokenInvalid,
    AuthFailCtxNotInRequestExt,
    NotOwner,

    // Missing resources
    UserNotFound,
    PostNotFound,

    // Conflicts
    EmailTaken,
    UsernameTaken,
    AlreadyLiked,
    NotLiked,
    SelfFollow,
    AlreadyFollowing,
    NotFollowing,

    // Generic
    BadRequest(String),
    Internal(String),
}

pub type Result<T> = core::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Error::LoginFail => (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()),
            Error::AuthFailNoToken => {
                (StatusCode::UNAUTHORIZED, "No auth token found".to_string())
            }
            Error::AuthFailTokenInvalid => {
                (StatusCode::UNAUTHORIZED, "Invalid or expired token".to_string())
            }
            Error::AuthFailCtxNotInRequestExt => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Auth context missing".to_string(),
            ),
            Error::NotOwner => (StatusCode::UNAUTHORIZED, "User not authorized".to_string()),
            Error::UserNotFound => (StatusCode::NOT_FOUND, "User not found".to_string()),
            Error::PostNotFound => (StatusCode::NOT_FOUND, "Post not found".to_string()),
            Error::EmailTaken => (StatusCode::BAD_REQUEST, "User already exists".to_string()),
            Error::UsernameTaken => {
                (StatusCode::BAD_REQUEST, "Username already taken".to_string())
            }
            Error::AlreadyLiked => (StatusCode::BAD_REQUEST, "Post already liked".to_string()),
            Error::NotLiked => (
                StatusCode::BAD_REQUEST,
                "Post has not yet been liked".to_string(),
            ),
            Error::SelfFollow => (
                StatusCode::BAD_REQUEST,
                "You cannot follow yourself".to_string(),
            ),
            Error::AlreadyFollowing => (
                StatusCode::BAD_REQUEST,
                "You are already following this user".to_string(),
            ),
            Error::NotFollowing => (
                StatusCode::BAD_REQUEST,
                "You are not following this user".to_string(),
            ),
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::Internal(detail) => {
                error!("internal error: {}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Internal(err.to_string())
    }
}
