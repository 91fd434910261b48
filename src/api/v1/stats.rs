//! `/api/v1/stats` Returns stats about the server

use std::sync::Arc;
use std::time::SystemTime;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::{AppState, error::Error};

const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Response {
    uptime: u64,
    version: String,
    build_number: String,
    storage: &'static str,
}

/// `GET /api/v1/stats` Returns stats about the server
///
/// requires auth: no
///
/// ### Response Example
/// ```
/// json!({
///     "uptime": 3600,
///     "version": "0.1.0",
///     "buildNumber": "39d01bb",
///     "storage": "postgres"
/// });
/// ```
pub async fn res(State(app_state): State<Arc<AppState>>) -> Result<impl IntoResponse, Error> {
    let response = Response {
        uptime: SystemTime::now()
            .duration_since(app_state.start_time)?
            .as_secs(),
        version: String::from(VERSION.unwrap_or("UNKNOWN")),
        build_number: String::from(env!("GIT_SHORT_HASH")),
        storage: app_state.store.backend_tag(),
    };

    Ok((StatusCode::OK, Json(response)))
}
