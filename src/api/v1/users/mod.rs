//! `/api/v1/users` Contains endpoints related to all users

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    api::{
        extract::{PathParam, QueryParams},
        v1::auth::CurrentUser,
    },
    error::Error,
    objects::User,
};

mod me;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/me", get(me::get))
        .route("/search", get(search))
        .route("/{uuid}", get(get_user))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
}

/// `GET /api/v1/users/search?q=` Finds users by name or email
///
/// requires auth: yes
///
/// The query must be at least 3 characters, at most 20 users are returned
/// and the caller is never part of the result.
///
/// ### Response Example
/// ```
/// json!([
///     {
///         "uuid": "0197a3b2-8b1e-7c3d-9f55-1b2f0c9d8e11",
///         "name": "Alice Smith",
///         "email": "alice@example.com",
///         "image": null
///     }
/// ]);
/// ```
pub async fn search(
    State(app_state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<SearchQuery>,
    Extension(CurrentUser(uuid)): Extension<CurrentUser<Uuid>>,
) -> Result<impl IntoResponse, Error> {
    let q = query.q.unwrap_or_default();

    let users = User::search(app_state.store.as_ref(), uuid, &q).await?;

    Ok((StatusCode::OK, Json(users)))
}

/// `GET /api/v1/users/{uuid}` Returns user with the given UUID
///
/// requires auth: yes
///
/// ### Response Example
/// ```
/// json!({
///     "uuid": "0197a3b2-8b1e-7c3d-9f55-1b2f0c9d8e11",
///     "name": "Alice Smith",
///     "email": "alice@example.com",
///     "image": "https://lh3.googleusercontent.com/a/alice"
/// });
/// ```
pub async fn get_user(
    State(app_state): State<Arc<AppState>>,
    PathParam(user_uuid): PathParam<Uuid>,
) -> Result<impl IntoResponse, Error> {
    let user = User::fetch_one(app_state.store.as_ref(), &app_state.cache_pool, user_uuid).await?;

    Ok((StatusCode::OK, Json(user)))
}
