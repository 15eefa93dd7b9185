// HTTP response utilities for JSON payloads and API errors
use crate::application::link_session::SendError;
use crate::application::monitor_service::MonitorError;
use crate::domain::command::CommandError;
use axum::{
    body::Body,
    http::{header, HeaderValue, Response, StatusCode},
    response::IntoResponse,
};
use serde::Serialize;

/// Serialize to JSON with an explicit content length
pub fn json_response<T: Serialize>(status: StatusCode, data: &T) -> Response<Body> {
    let bytes = match serde_json::to_vec(data) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("JSON serialization error: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    response
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Error surfaced to HTTP clients as `{"error": "..."}`
#[derive(Debug)]
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
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        json_response(self.status, &ErrorBody { error: self.message })
    }
}

impl From<CommandError> for ApiError {
    fn from(e: CommandError) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, e.to_string())
    }
}

impl From<MonitorError> for ApiError {
    fn from(e: MonitorError) -> Self {
        let status = match &e {
            MonitorError::Stopped => StatusCode::SERVICE_UNAVAILABLE,
            MonitorError::Send(SendError::NotConnected) => StatusCode::CONFLICT,
            MonitorError::Send(SendError::Transport(_)) | MonitorError::Transport(_) => {
                StatusCode::BAD_GATEWAY
            }
        };
        ApiError::new(status, e.to_string())
    }
}
