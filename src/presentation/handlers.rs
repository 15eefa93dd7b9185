// HTTP request handlers
use crate::application::monitor_service::PlotAdjust;
use crate::domain::command::{Command, CommandKind};
use crate::infrastructure::http_response::{json_response, ApiError};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use futures::stream::Stream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_stream::wrappers::WatchStream;

#[derive(Deserialize)]
pub struct CommandRequest {
    pub value: String,
}

#[derive(Deserialize)]
pub struct PortRequest {
    pub port: String,
}

#[derive(Serialize)]
struct SentCommand {
    sent: String,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Latest snapshot; answered from the published copy, never from the device
pub async fn get_snapshot(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    json_response(StatusCode::OK, &state.monitor.snapshot())
}

/// Server-sent events, one `snapshot` event per published change
pub async fn stream_snapshots(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = WatchStream::new(state.monitor.subscribe())
        .map(|snapshot| Event::default().event("snapshot").json_data(snapshot));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub async fn clear(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    state.monitor.clear_all().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /commands/:kind` with `{"value": "<digits>"}`; invalid input never reaches the device
pub async fn send_command(
    Path(kind): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CommandRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let kind: CommandKind = kind.parse()?;
    let command = Command::parse(kind, &body.value).map_err(|e| {
        tracing::warn!("{}", e);
        ApiError::from(e)
    })?;

    state.monitor.send(command).await?;
    Ok(json_response(
        StatusCode::OK,
        &SentCommand {
            sent: command.to_string(),
        },
    ))
}

pub async fn list_ports(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let ports = state.monitor.list_ports().await?;
    Ok(json_response(StatusCode::OK, &ports))
}

pub async fn select_port(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PortRequest>,
) -> Result<StatusCode, ApiError> {
    let port = body.port.trim();
    if port.is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "port must not be empty"));
    }

    state.monitor.select_port(port).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn increase_plot(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let range = state.monitor.adjust_plot(PlotAdjust::Increase).await?;
    Ok(json_response(StatusCode::OK, &range))
}

pub async fn decrease_plot(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let range = state.monitor.adjust_plot(PlotAdjust::Decrease).await?;
    Ok(json_response(StatusCode::OK, &range))
}
