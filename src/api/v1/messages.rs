//! `/api/v1/messages` Direct messages between users

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    api::{
        extract::{JsonBody, QueryParams},
        v1::auth::CurrentUser,
    },
    error::Error,
    objects::Me,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationQuery {
    friend_id: Option<Uuid>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReq {
    receiver_id: Uuid,
    content: String,
}

/// `GET /api/v1/messages?friendId=` Returns the conversation with a user, oldest first
///
/// requires auth: yes
///
/// ### Response Example
/// ```
/// json!([
///     {
///         "uuid": "0197a3d1-4b2c-7e8f-9a0b-1c2d3e4f5a6b",
///         "sender": "0197a3b2-8b1e-7c3d-9f55-1b2f0c9d8e11",
///         "receiver": "0197a3b4-02aa-71f0-b0c2-7d1e9a8b6c5d",
///         "content": "Lisbon in May?",
///         "createdAt": "2025-06-14T09:12:44.120Z",
///         "read": false
///     }
/// ]);
/// ```
pub async fn get(
    State(app_state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<ConversationQuery>,
    Extension(CurrentUser(uuid)): Extension<CurrentUser<Uuid>>,
) -> Result<impl IntoResponse, Error> {
    let Some(friend_id) = query.friend_id else {
        return Err(Error::BadRequest("friendId is required".to_string()));
    };

    let me = Me::get(app_state.store.as_ref(), uuid).await?;

    let messages = me
        .fetch_conversation(app_state.store.as_ref(), friend_id)
        .await?;

    Ok((StatusCode::OK, Json(messages)))
}

/// `POST /api/v1/messages` Sends a message
///
/// requires auth: yes
///
/// ### Request Example
/// ```
/// json!({
///     "receiverId": "0197a3b4-02aa-71f0-b0c2-7d1e9a8b6c5d",
///     "content": "Lisbon in May?"
/// });
/// ```
///
/// ### Responses
/// 200 Success, returns the stored message
///
/// 400 Bad Request, empty or longer than 4000 characters
///
/// 404 Not Found, no such receiver
pub async fn send(
    State(app_state): State<Arc<AppState>>,
    Extension(CurrentUser(uuid)): Extension<CurrentUser<Uuid>>,
    JsonBody(message_req): JsonBody<MessageReq>,
) -> Result<impl IntoResponse, Error> {
    let me = Me::get(app_state.store.as_ref(), uuid).await?;

    let message = me
        .send_message(
            app_state.store.as_ref(),
            message_req.receiver_id,
            message_req.content,
        )
        .await?;

    Ok((StatusCode::OK, Json(message)))
}
