use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

/// Request-level failures and their HTTP mapping.
///
/// Bodies are plain text; the auth bodies are part of the external
/// contract and must not change.
#[derive(Debug)]
pub enum ApiError {
    /// File missing or unreadable; local to the request.
    Io(std::io::Error),
    /// `Token` header missing or empty.
    NoToken,
    /// Token unknown or not privileged.
    NotAuthed,
    /// A required request header is absent.
    MissingHeader(&'static str),
    /// A request header failed to parse; carries the full message.
    BadHeader(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Io(e) => write!(f, "could not read file: {}", e),
            ApiError::NoToken => write!(f, "no token provided"),
            ApiError::NotAuthed => write!(f, "token is not authed"),
            ApiError::MissingHeader(header) => {
                write!(f, "you must provide a {} header", header)
            }
            ApiError::BadHeader(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::Io(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Io(e) => {
                error!("file read failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Could not read file".to_string())
            }
            ApiError::NoToken => (StatusCode::UNAUTHORIZED, "no token provided".to_string()),
            ApiError::NotAuthed => (StatusCode::UNAUTHORIZED, "token is not authed".to_string()),
            ApiError::MissingHeader(header) => (
                StatusCode::BAD_REQUEST,
                format!("you must provide a {} header", header),
            ),
            ApiError::BadHeader(message) => (StatusCode::BAD_REQUEST, message),
        };
        (status, body).into_response()
    }
}
