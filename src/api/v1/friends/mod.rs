//! `/api/v1/friends` Friend requests and friendships of the caller

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    api::{extract::JsonBody, v1::auth::CurrentUser},
    error::Error,
    objects::Me,
};

mod requests;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_friends))
        .route("/remove", post(remove))
        .route("/request", post(requests::send))
        .route("/accept", post(requests::accept))
        .route("/cancel", post(requests::cancel))
        .route("/decline", post(requests::decline))
        .route("/pending", get(requests::pending))
        .route("/outgoing", get(requests::outgoing))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendReq {
    friend_id: Uuid,
}

/// `GET /api/v1/friends` Returns everyone the caller is friends with
///
/// requires auth: yes
///
/// ### Response Example
/// ```
/// json!([
///     {
///         "uuid": "0197a3b2-8b1e-7c3d-9f55-1b2f0c9d8e11",
///         "name": "Alice Smith",
///         "email": "alice@example.com",
///         "image": null,
///         "friendsSince": "2025-06-14T09:12:44.120Z"
///     }
/// ]);
/// ```
pub async fn get_friends(
    State(app_state): State<Arc<AppState>>,
    Extension(CurrentUser(uuid)): Extension<CurrentUser<Uuid>>,
) -> Result<impl IntoResponse, Error> {
    let me = Me::get(app_state.store.as_ref(), uuid).await?;

    let friends = me.get_friends(app_state.store.as_ref()).await?;

    Ok((StatusCode::OK, Json(friends)))
}

/// `POST /api/v1/friends/remove` Ends a friendship, for both users
///
/// requires auth: yes
///
/// ### Request Example
/// ```
/// json!({
///     "friendId": "0197a3b2-8b1e-7c3d-9f55-1b2f0c9d8e11"
/// });
/// ```
///
/// ### Responses
/// 200 Success, also when the users were not friends
pub async fn remove(
    State(app_state): State<Arc<AppState>>,
    Extension(CurrentUser(uuid)): Extension<CurrentUser<Uuid>>,
    JsonBody(friend_req): JsonBody<FriendReq>,
) -> Result<impl IntoResponse, Error> {
    let me = Me::get(app_state.store.as_ref(), uuid).await?;

    me.remove_friend(app_state.store.as_ref(), friend_req.friend_id)
        .await?;

    Ok(StatusCode::OK)
}
