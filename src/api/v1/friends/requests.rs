use std::sync::Arc;

use axum::{
    Extension, Json, extract::State, http::StatusCode, response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use super::FriendReq;
use crate::{
    AppState,
    api::{extract::JsonBody, v1::auth::CurrentUser},
    error::Error,
    objects::Me,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestReq {
    request_id: Uuid,
}

/// `POST /api/v1/friends/request` Sends a friend request
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
/// 200 Success, returns the pending request
///
/// 400 Bad Request, request to yourself
///
/// 404 Not Found, no such user
///
/// 409 Conflict, already requested or already friends
pub async fn send(
    State(app_state): State<Arc<AppState>>,
    Extension(CurrentUser(uuid)): Extension<CurrentUser<Uuid>>,
    JsonBody(friend_req): JsonBody<FriendReq>,
) -> Result<impl IntoResponse, Error> {
    let me = Me::get(app_state.store.as_ref(), uuid).await?;

    let request = me
        .send_friend_request(app_state.store.as_ref(), friend_req.friend_id)
        .await?;

    Ok((StatusCode::OK, Json(request)))
}

/// `POST /api/v1/friends/accept` Accepts a request sent to the caller
///
/// requires auth: yes
///
/// ### Request Example
/// ```
/// json!({
///     "requestId": "0197a3c0-1d2e-7a4b-8c6d-5e4f3a2b1c0d"
/// });
/// ```
///
/// ### Response Example
/// ```
/// json!({
///     "userA": "0197a3b2-8b1e-7c3d-9f55-1b2f0c9d8e11",
///     "userB": "0197a3b4-02aa-71f0-b0c2-7d1e9a8b6c5d",
///     "acceptedAt": "2025-06-14T09:12:44.120Z"
/// });
/// ```
pub async fn accept(
    State(app_state): State<Arc<AppState>>,
    Extension(CurrentUser(uuid)): Extension<CurrentUser<Uuid>>,
    JsonBody(request_req): JsonBody<RequestReq>,
) -> Result<impl IntoResponse, Error> {
    let me = Me::get(app_state.store.as_ref(), uuid).await?;

    let friendship = me
        .accept_friend_request(app_state.store.as_ref(), request_req.request_id)
        .await?;

    Ok((StatusCode::OK, Json(friendship)))
}

/// `POST /api/v1/friends/cancel` Withdraws a request the caller sent
///
/// requires auth: yes
pub async fn cancel(
    State(app_state): State<Arc<AppState>>,
    Extension(CurrentUser(uuid)): Extension<CurrentUser<Uuid>>,
    JsonBody(request_req): JsonBody<RequestReq>,
) -> Result<impl IntoResponse, Error> {
    let me = Me::get(app_state.store.as_ref(), uuid).await?;

    me.cancel_friend_request(app_state.store.as_ref(), request_req.request_id)
        .await?;

    Ok(StatusCode::OK)
}

/// `POST /api/v1/friends/decline` Turns down a request sent to the caller
///
/// requires auth: yes
pub async fn decline(
    State(app_state): State<Arc<AppState>>,
    Extension(CurrentUser(uuid)): Extension<CurrentUser<Uuid>>,
    JsonBody(request_req): JsonBody<RequestReq>,
) -> Result<impl IntoResponse, Error> {
    let me = Me::get(app_state.store.as_ref(), uuid).await?;

    me.decline_friend_request(app_state.store.as_ref(), request_req.request_id)
        .await?;

    Ok(StatusCode::OK)
}

/// `GET /api/v1/friends/pending` Requests waiting on the caller, oldest first
///
/// requires auth: yes
pub async fn pending(
    State(app_state): State<Arc<AppState>>,
    Extension(CurrentUser(uuid)): Extension<CurrentUser<Uuid>>,
) -> Result<impl IntoResponse, Error> {
    let me = Me::get(app_state.store.as_ref(), uuid).await?;

    let requests = me.get_pending_requests(app_state.store.as_ref()).await?;

    Ok((StatusCode::OK, Json(requests)))
}

/// `GET /api/v1/friends/outgoing` Requests the caller sent that are still pending
///
/// requires auth: yes
pub async fn outgoing(
    State(app_state): State<Arc<AppState>>,
    Extension(CurrentUser(uuid)): Extension<CurrentUser<Uuid>>,
) -> Result<impl IntoResponse, Error> {
    let me = Me::get(app_state.store.as_ref(), uuid).await?;

    let requests = me.get_outgoing_requests(app_state.store.as_ref()).await?;

    Ok((StatusCode::OK, Json(requests)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    async fn state_with_users() -> (Arc<AppState>, Uuid, Uuid) {
        let store = MemoryStore::default();
        let alice = store.add_user("Alice", "alice@example.com").await;
        let bob = store.add_user("Bob", "bob@example.com").await;

        (AppState::for_tests(store), alice, bob)
    }

    async fn send_as(app_state: &Arc<AppState>, sender: Uuid, receiver: Uuid) -> StatusCode {
        send(
            State(app_state.clone()),
            Extension(CurrentUser(sender)),
            JsonBody(FriendReq {
                friend_id: receiver,
            }),
        )
        .await
        .into_response()
        .status()
    }

    #[tokio::test]
    async fn duplicate_request_is_conflict() {
        let (app_state, alice, bob) = state_with_users().await;

        assert_eq!(send_as(&app_state, alice, bob).await, StatusCode::OK);
        assert_eq!(send_as(&app_state, alice, bob).await, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn request_to_self_or_stranger() {
        let (app_state, alice, _) = state_with_users().await;

        assert_eq!(
            send_as(&app_state, alice, alice).await,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            send_as(&app_state, alice, Uuid::now_v7()).await,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn only_receiver_can_accept() {
        let (app_state, alice, bob) = state_with_users().await;
        let store = app_state.store.as_ref();

        let request = Me::get(store, alice)
            .await
            .unwrap()
            .send_friend_request(store, bob)
            .await
            .unwrap();

        let as_sender = accept(
            State(app_state.clone()),
            Extension(CurrentUser(alice)),
            JsonBody(RequestReq {
                request_id: request.uuid,
            }),
        )
        .await
        .into_response();
        assert_eq!(as_sender.status(), StatusCode::NOT_FOUND);

        let as_receiver = accept(
            State(app_state.clone()),
            Extension(CurrentUser(bob)),
            JsonBody(RequestReq {
                request_id: request.uuid,
            }),
        )
        .await
        .into_response();
        assert_eq!(as_receiver.status(), StatusCode::OK);

        let bob_me = Me::get(store, bob).await.unwrap();
        assert!(bob_me.friends_with(store, alice).await.unwrap().is_some());
    }
}
