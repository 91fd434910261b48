use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use super::token_key;
use crate::{
    AppState,
    error::Error,
    utils::{CacheFns, get_auth_header},
};

/// `POST /api/v1/auth/logout` Forgets the presented access token
///
/// requires auth: yes
///
/// The token itself stays valid at the identity provider, the next request
/// carrying it is resolved again.
///
/// ### Responses
/// 200 Success
///
/// 401 Unauthorized
pub async fn res(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, Error> {
    let access_token = get_auth_header(&headers)?;

    app_state
        .cache_pool
        .del_cache_key(token_key(access_token))
        .await?;

    Ok(StatusCode::OK)
}
