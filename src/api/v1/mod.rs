//! `/api/v1` Contains version 1 of the api

use std::sync::Arc;

use axum::{Router, middleware::from_fn_with_state, routing::get};

use crate::AppState;

mod auth;
mod friends;
mod messages;
mod stats;
mod trips;
mod users;

pub fn router(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    let router_with_auth = Router::new()
        .nest("/users", users::router())
        .nest("/friends", friends::router())
        .route("/messages", get(messages::get).post(messages::send))
        .route("/trips", get(trips::get).post(trips::create))
        .nest("/auth", auth::router())
        .layer(from_fn_with_state(app_state, auth::authorize));

    Router::new()
        .route("/stats", get(stats::res))
        .merge(router_with_auth)
}
