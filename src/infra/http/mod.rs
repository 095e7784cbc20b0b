mod auth;
mod compose;
mod follows;
mod middleware;
mod public;

pub use auth::{CurrentUser, RequireUser, SessionSigner, Viewer};

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};

use crate::application::{
    compose::ComposeService, feed::FeedService, follows::FollowService, identity::IdentityService,
    repos::GroupsRepo,
};
use crate::infra::images::ImageStore;

use middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub compose: Arc<ComposeService>,
    pub follows: Arc<FollowService>,
    pub identity: Arc<IdentityService>,
    pub groups: Arc<dyn GroupsRepo>,
    pub images: Arc<ImageStore>,
    pub signer: SessionSigner,
    pub max_upload_bytes: usize,
}

pub fn build_router(state: HttpState) -> Router {
    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        .route("/", get(public::index))
        .route("/group/{slug}/", get(public::group_index))
        .route("/profile/{username}/", get(public::profile))
        .route("/posts/{id}/", get(public::post_detail))
        .route("/follow/", get(public::follow_index))
        .route(
            "/create/",
            get(compose::post_create_form).post(compose::post_create),
        )
        .route(
            "/posts/{id}/edit/",
            get(compose::post_edit_form).post(compose::post_edit),
        )
        .route("/posts/{id}/comment/", post(compose::add_comment))
        .route("/profile/{username}/follow/", get(follows::profile_follow))
        .route(
            "/profile/{username}/unfollow/",
            get(follows::profile_unfollow),
        )
        .route("/auth/signup/", get(auth::signup_form).post(auth::signup))
        .route("/auth/login/", get(auth::login_form).post(auth::login))
        .route("/auth/logout/", post(auth::logout))
        .route("/media/{*path}", get(public::serve_media))
        .fallback(public::not_found)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
