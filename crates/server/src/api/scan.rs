//! Scan and event API handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use seedsort_core::{
    ScanReport, ScanTrigger, TaggerError, TorrentAddedEvent, TorrentOutcome,
};
use tracing::info;

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

/// Scan status response
#[derive(Debug, Serialize)]
pub struct ScanStatusResponse {
    /// Whether tagging is enabled in config
    pub enabled: bool,
    /// Whether a full scan is running right now
    pub scanning: bool,
    /// Download clients available for scanning
    pub clients: Vec<String>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ScanErrorResponse {
    pub error: String,
}

/// Simple message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

type ApiError = (StatusCode, Json<ScanErrorResponse>);

fn error_response(e: TaggerError) -> ApiError {
    let status = match &e {
        TaggerError::AlreadyRunning => StatusCode::CONFLICT,
        TaggerError::Disabled | TaggerError::NoClients | TaggerError::NoReachableClients(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        TaggerError::UnknownClient(_) => StatusCode::NOT_FOUND,
        TaggerError::Client(_) | TaggerError::Metadata(_) => StatusCode::BAD_GATEWAY,
        TaggerError::History(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ScanErrorResponse {
            error: e.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Get scan status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<ScanStatusResponse> {
    let scans = state.scans();
    Json(ScanStatusResponse {
        enabled: scans.tagger().config().enabled,
        scanning: scans.is_scanning(),
        clients: scans.clients().iter().map(|c| c.name().to_string()).collect(),
    })
}

/// Run a full scan now and return its report
pub async fn run_scan(State(state): State<Arc<AppState>>) -> Result<Json<ScanReport>, ApiError> {
    info!("Manual scan requested");
    state
        .scans()
        .run_scan(ScanTrigger::Manual)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Cancel the running scan
pub async fn cancel_scan(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessageResponse>, ApiError> {
    if state.scans().cancel() {
        Ok(Json(MessageResponse {
            message: "Cancellation requested".to_string(),
        }))
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(ScanErrorResponse {
                error: "No scan is running".to_string(),
            }),
        ))
    }
}

/// Classify and tag a freshly added torrent
pub async fn torrent_added(
    State(state): State<Arc<AppState>>,
    Json(event): Json<TorrentAddedEvent>,
) -> Result<Json<TorrentOutcome>, ApiError> {
    info!(
        "Torrent added on {}: {}",
        event.client, event.info_hash
    );
    state
        .scans()
        .handle_event(&event)
        .await
        .map(Json)
        .map_err(error_response)
}
