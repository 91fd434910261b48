use std::sync::Arc;

use axum::{
    Router,
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
    routing::post,
};
use log::debug;
use uuid::Uuid;

use crate::{
    AppState,
    error::Error,
    objects::User,
    utils::{CacheFns, get_auth_header},
};

mod logout;

#[derive(Clone)]
pub struct CurrentUser<T>(pub T);

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/logout", post(logout::res))
}

/// Cache key for a bearer token, kept apart from user uuid keys
fn token_key(access_token: &str) -> String {
    format!("token:{access_token}")
}

pub async fn check_access_token(app_state: &AppState, access_token: &str) -> Result<Uuid, Error> {
    if let Ok(uuid) = app_state
        .cache_pool
        .get_cache_key::<Uuid>(token_key(access_token))
        .await
    {
        return Ok(uuid);
    }

    let user_info = app_state.identity.user_info(access_token).await?;

    let user = User::upsert(
        app_state.store.as_ref(),
        &app_state.cache_pool,
        user_info.into_new_user()?,
    )
    .await?;

    debug!("resolved access token for {}", user.uuid);

    app_state
        .cache_pool
        .set_cache_key(
            token_key(access_token),
            user.uuid,
            app_state.config.identity.token_cache_seconds,
        )
        .await?;

    Ok(user.uuid)
}

pub async fn authorize(
    State(app_state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, Error> {
    let auth_header = get_auth_header(req.headers())?.to_string();

    let uuid = check_access_token(&app_state, &auth_header).await?;

    req.extensions_mut().insert(CurrentUser(uuid));

    Ok(next.run(req).await)
}
