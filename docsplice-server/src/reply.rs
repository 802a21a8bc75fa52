//! Turning wire types and errors into HTTP responses.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use docsplice::DocError;
use docsplice::wire::{
    CheckExistsResponse, DeleteResponse, ElementResponse, ElementsResponse, ErrorResponse,
    MessageResponse, NodeExistsResponse,
};
use tracing::warn;

/// A JSON body encoded with facet-json.
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

fn json_response<E: std::fmt::Debug>(status: StatusCode, encoded: Result<String, E>) -> Response {
    match encoded {
        Ok(body) => (status, [(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(err) => {
            warn!(?err, "failed to encode response body");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode response").into_response()
        }
    }
}

macro_rules! json_reply {
    ($($ty:ty),* $(,)?) => {$(
        impl IntoResponse for Json<$ty> {
            fn into_response(self) -> Response {
                json_response(StatusCode::OK, facet_json::to_string(&self.0))
            }
        }
    )*};
}

json_reply!(
    ElementResponse,
    CheckExistsResponse,
    ElementsResponse,
    MessageResponse,
    DeleteResponse,
    NodeExistsResponse,
);

impl Json<MessageResponse> {
    pub fn message(message: &str) -> Self {
        Json(MessageResponse {
            message: message.to_string(),
        })
    }
}

/// An error reply: a status plus `{"error": message}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

/// Status code for each error category.
pub fn status_for(err: &DocError) -> StatusCode {
    match err {
        DocError::NotFound { .. } => StatusCode::NOT_FOUND,
        DocError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
        DocError::NotSupported { .. } => StatusCode::NOT_IMPLEMENTED,
        DocError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<DocError> for ApiError {
    fn from(err: DocError) -> Self {
        Self::new(status_for(&err), err.message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = %self.status, error = %self.message, "request failed");
        }
        let body = ErrorResponse {
            error: self.message,
        };
        json_response(self.status, facet_json::to_string(&body))
    }
}
