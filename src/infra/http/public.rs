use std::io::ErrorKind;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use crate::{
    application::{
        error::HttpError,
        feed::FeedError,
    },
    infra::images::ImageStoreError,
    presentation::views::{
        FollowTemplate, GroupTemplate, IndexTemplate, LayoutContext, PostTemplate, ProfileTemplate,
        ViewerView, render_not_found_response, render_template_response,
    },
};

use super::{
    HttpState,
    auth::{RequireUser, Viewer},
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PageQuery {
    page: Option<String>,
}

pub(crate) async fn index(
    State(state): State<HttpState>,
    viewer: Viewer,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.feed.index_page(query.page.as_deref()).await {
        Ok(content) => {
            let view = LayoutContext::new("Latest posts", viewer.view(), content);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, viewer.view()),
    }
}

pub(crate) async fn group_index(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.feed.group_page(&slug, query.page.as_deref()).await {
        Ok(content) => {
            let title = content.group.title.clone();
            let view = LayoutContext::new(title, viewer.view(), content);
            render_template_response(GroupTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, viewer.view()),
    }
}

pub(crate) async fn profile(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    match state
        .feed
        .profile_page(&username, viewer.id(), query.page.as_deref())
        .await
    {
        Ok(content) => {
            let title = format!("Posts by {}", content.author.display_name);
            let view = LayoutContext::new(title, viewer.view(), content);
            render_template_response(ProfileTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, viewer.view()),
    }
}

pub(crate) async fn post_detail(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> Response {
    // A malformed id renders the same not-found page as a missing post.
    let Ok(id) = Uuid::parse_str(&id) else {
        return render_not_found_response(viewer.view());
    };

    match state.feed.post_detail(id).await {
        Ok(content) => {
            let title = post_title(&content.post.text);
            let view = LayoutContext::new(title, viewer.view(), content);
            render_template_response(PostTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, viewer.view()),
    }
}

pub(crate) async fn follow_index(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.feed.follow_page(user.id, query.page.as_deref()).await {
        Ok(content) => {
            let view = LayoutContext::new("Followed authors", Some(user.view()), content);
            render_template_response(FollowTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, Some(user.view())),
    }
}

pub(crate) async fn serve_media(
    State(state): State<HttpState>,
    Path(path): Path<String>,
) -> Response {
    const SOURCE: &str = "infra::http::public::serve_media";

    match state.images.read(&path).await {
        Ok(bytes) => build_media_response(&path, bytes),
        Err(ImageStoreError::InvalidPath) => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Image not found",
            "the requested image is not available",
        )
        .into_response(),
        Err(ImageStoreError::Io(err)) if err.kind() == ErrorKind::NotFound => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Image not found",
            "the requested image is not available",
        )
        .into_response(),
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read stored image"
            );
            HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read image",
                &err,
            )
            .into_response()
        }
    }
}

pub(crate) async fn not_found(viewer: Viewer) -> Response {
    render_not_found_response(viewer.view())
}

pub(crate) fn feed_error_to_response(err: FeedError, viewer: Option<ViewerView>) -> Response {
    match err {
        FeedError::NotFound => render_not_found_response(viewer),
        FeedError::Repo(err) => HttpError::from(err).into_response(),
    }
}

/// Detail pages are titled with a short prefix of the post text.
fn post_title(text: &str) -> String {
    const MAX_TITLE_CHARS: usize = 30;
    let mut title: String = text.chars().take(MAX_TITLE_CHARS).collect();
    if text.chars().count() > MAX_TITLE_CHARS {
        title.push('…');
    }
    title
}

fn build_media_response(path: &str, bytes: Bytes) -> Response {
    let mut response = Response::new(Body::from(bytes.clone()));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&bytes.len().to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}
