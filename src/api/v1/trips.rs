//! `/api/v1/trips` Trips the caller plans or takes part in

use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use crate::{
    AppState,
    api::{extract::JsonBody, v1::auth::CurrentUser},
    error::Error,
    objects::{Me, NewTrip},
};

/// `GET /api/v1/trips` Trips created by or shared with the caller, newest first
///
/// requires auth: yes
///
/// ### Response Example
/// ```
/// json!([
///     {
///         "uuid": "0197a3e2-5c6d-7f80-91a2-b3c4d5e6f708",
///         "creator": "0197a3b2-8b1e-7c3d-9f55-1b2f0c9d8e11",
///         "name": "Lisbon",
///         "destination": "Lisbon, Portugal",
///         "startDate": "2025-05-02",
///         "endDate": "2025-05-09",
///         "budget": 1200.0,
///         "status": "draft",
///         "participants": ["0197a3b4-02aa-71f0-b0c2-7d1e9a8b6c5d"],
///         "createdAt": "2025-04-01T18:00:00Z"
///     }
/// ]);
/// ```
pub async fn get(
    State(app_state): State<Arc<AppState>>,
    Extension(CurrentUser(uuid)): Extension<CurrentUser<Uuid>>,
) -> Result<impl IntoResponse, Error> {
    let me = Me::get(app_state.store.as_ref(), uuid).await?;

    let trips = me.fetch_trips(app_state.store.as_ref()).await?;

    Ok((StatusCode::OK, Json(trips)))
}

/// `POST /api/v1/trips` Creates a trip owned by the caller
///
/// requires auth: yes
///
/// ### Request Example
/// ```
/// json!({
///     "name": "Lisbon",
///     "destination": "Lisbon, Portugal",
///     "startDate": "2025-05-02",
///     "endDate": "2025-05-09",
///     "budget": 1200.0,
///     "participants": ["0197a3b4-02aa-71f0-b0c2-7d1e9a8b6c5d"]
/// });
/// ```
///
/// ### Responses
/// 200 Success, returns the stored trip
///
/// 400 Bad Request, missing or too long name
///
/// 404 Not Found, unknown participant
pub async fn create(
    State(app_state): State<Arc<AppState>>,
    Extension(CurrentUser(uuid)): Extension<CurrentUser<Uuid>>,
    JsonBody(new_trip): JsonBody<NewTrip>,
) -> Result<impl IntoResponse, Error> {
    let me = Me::get(app_state.store.as_ref(), uuid).await?;

    let trip = me.create_trip(app_state.store.as_ref(), new_trip).await?;

    Ok((StatusCode::OK, Json(trip)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn participant_sees_created_trip() {
        let store = MemoryStore::default();
        let alice = store.add_user("Alice", "alice@example.com").await;
        let bob = store.add_user("Bob", "bob@example.com").await;
        let app_state = AppState::for_tests(store);

        let new_trip: NewTrip = serde_json::from_value(serde_json::json!({
            "name": "Lisbon",
            "startDate": "2025-05-02",
            "participants": [bob],
        }))
        .unwrap();

        let response = create(
            State(app_state.clone()),
            Extension(CurrentUser(alice)),
            JsonBody(new_trip),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let bob_me = Me::get(app_state.store.as_ref(), bob).await.unwrap();
        let trips = bob_me.fetch_trips(app_state.store.as_ref()).await.unwrap();

        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].creator, alice);
    }

    #[tokio::test]
    async fn unnamed_trip_is_bad_request() {
        let store = MemoryStore::default();
        let alice = store.add_user("Alice", "alice@example.com").await;
        let app_state = AppState::for_tests(store);

        let response = create(
            State(app_state),
            Extension(CurrentUser(alice)),
            JsonBody(NewTrip::default()),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
