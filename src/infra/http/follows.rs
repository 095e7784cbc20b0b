//! Follow and unfollow handlers. Every resolved outcome lands back on the
//! author's profile.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};

use crate::application::{
    error::HttpError,
    follows::{FollowOutcome, UnfollowOutcome},
};
use crate::presentation::views::render_not_found_response;

use super::{HttpState, auth::RequireUser};

pub(crate) async fn profile_follow(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(username): Path<String>,
) -> Response {
    match state.follows.follow(user.id, &username).await {
        Ok(
            FollowOutcome::Followed(author)
            | FollowOutcome::AlreadyFollowing(author)
            | FollowOutcome::SelfFollow(author),
        ) => profile_redirect(&author.username),
        Ok(FollowOutcome::UnknownAuthor) => render_not_found_response(Some(user.view())),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(crate) async fn profile_unfollow(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(username): Path<String>,
) -> Response {
    match state.follows.unfollow(user.id, &username).await {
        Ok(UnfollowOutcome::Removed(author) | UnfollowOutcome::NotFollowing(author)) => {
            profile_redirect(&author.username)
        }
        Ok(UnfollowOutcome::UnknownAuthor) => render_not_found_response(Some(user.view())),
        Err(err) => HttpError::from(err).into_response(),
    }
}

fn profile_redirect(username: &str) -> Response {
    Redirect::to(&format!("/profile/{username}/")).into_response()
}
