use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use crate::{AppState, api::v1::auth::CurrentUser, error::Error, objects::Me};

/// `GET /api/v1/users/me` Returns the caller's own user record
///
/// requires auth: yes
pub async fn get(
    State(app_state): State<Arc<AppState>>,
    Extension(CurrentUser(uuid)): Extension<CurrentUser<Uuid>>,
) -> Result<impl IntoResponse, Error> {
    let me = Me::get(app_state.store.as_ref(), uuid).await?;

    Ok((StatusCode::OK, Json(me)))
}
