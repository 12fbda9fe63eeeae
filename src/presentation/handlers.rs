// HTTP request handlers
use crate::application::surface_service::SurfaceError;
use crate::domain::surface::SurfaceKind;
use crate::domain::window::{RollingPreset, WindowMode, MAX_ROLLING_MS};
use crate::infrastructure::chunked_json::stream_from_receiver;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct OpenSurfaceRequest {
    pub kind: SurfaceKind,
    #[serde(default)]
    pub nodes: Vec<String>,
    pub window: Option<WindowRequest>,
}

#[derive(Debug, Serialize)]
pub struct OpenSurfaceResponse {
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub nodes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WindowRequest {
    Live,
    Rolling {
        preset: Option<RollingPreset>,
        duration_ms: Option<i64>,
    },
    Range {
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    },
}

impl WindowRequest {
    pub fn into_mode(self) -> Result<WindowMode, String> {
        match self {
            WindowRequest::Live => Ok(WindowMode::Live),
            WindowRequest::Rolling {
                preset: Some(preset),
                ..
            } => Ok(WindowMode::rolling(preset)),
            WindowRequest::Rolling {
                duration_ms: Some(ms),
                ..
            } if ms > 0 && ms <= MAX_ROLLING_MS => Ok(WindowMode::Rolling { duration_ms: ms }),
            WindowRequest::Rolling { .. } => Err(format!(
                "rolling window needs a preset or a duration_ms between 1 and {}",
                MAX_ROLLING_MS
            )),
            WindowRequest::Range { start, end } => match end {
                Some(end) if end < start => Err("range ends before it starts".to_string()),
                _ => Ok(WindowMode::Range { start, end }),
            },
        }
    }
}

impl IntoResponse for SurfaceError {
    fn into_response(self) -> Response {
        let status = match self {
            SurfaceError::NotFound(_) => StatusCode::NOT_FOUND,
            SurfaceError::EventsTaken(_) => StatusCode::CONFLICT,
            SurfaceError::Stopped(_) => StatusCode::GONE,
        };
        (status, self.to_string()).into_response()
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Open a surface session; its first fetch starts right away
pub async fn open_surface(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OpenSurfaceRequest>,
) -> Response {
    let window = match request.window.map(WindowRequest::into_mode).transpose() {
        Ok(window) => window.unwrap_or(WindowMode::Live),
        Err(message) => return (StatusCode::BAD_REQUEST, message).into_response(),
    };

    let id = state
        .surface_service
        .open(request.kind, &request.nodes, window);
    (StatusCode::CREATED, Json(OpenSurfaceResponse { id })).into_response()
}

/// Stream a surface's events as newline-delimited JSON
pub async fn surface_events(
    Path(id): Path<u64>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.surface_service.take_events(id) {
        Ok(rx) => stream_from_receiver(rx).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update_selection(
    Path(id): Path<u64>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectionRequest>,
) -> Result<StatusCode, SurfaceError> {
    state.surface_service.select(id, request.nodes).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_window(
    Path(id): Path<u64>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<WindowRequest>,
) -> Response {
    let mode = match request.into_mode() {
        Ok(mode) => mode,
        Err(message) => return (StatusCode::BAD_REQUEST, message).into_response(),
    };

    match state.surface_service.set_window(id, mode).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn close_surface(
    Path(id): Path<u64>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, SurfaceError> {
    state.surface_service.close(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
