//! `/api/versions` Lists the API versions this server answers on

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

/// Every nested router under `/api`, newest last
const SUPPORTED: &[&str] = &["1"];

#[derive(Serialize)]
struct VersionsResponse {
    service: &'static str,
    versions: &'static [&'static str],
    latest: &'static str,
}

/// `GET /api/versions` Lists the API versions this server answers on.
///
/// requires auth: no
///
/// ### Response Example
/// ```
/// json!({
///     "service": "waypoint",
///     "versions": ["1"],
///     "latest": "1"
/// });
/// ```
pub async fn versions() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(VersionsResponse {
            service: env!("CARGO_PKG_NAME"),
            versions: SUPPORTED,
            latest: SUPPORTED.last().copied().unwrap_or_default(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_v1_as_latest() {
        let response = versions().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["service"], "waypoint");
        assert_eq!(body["versions"], serde_json::json!(["1"]));
        assert_eq!(body["latest"], "1");
    }
}
