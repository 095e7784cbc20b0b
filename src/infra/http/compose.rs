//! Post and comment write handlers.

use axum::{
    Form,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    application::{
        compose::{CommentOutcome, CreateOutcome, EditOutcome, PostFormErrors, PostInput},
        error::HttpError,
    },
    domain::entities::{GroupRecord, PostRecord},
    infra::images::ImageStoreError,
    presentation::views::{
        GroupOptionView, LayoutContext, PostFormContext, PostFormTemplate, ViewerView,
        render_not_found_response, render_template_response,
    },
};

use super::{
    HttpState,
    auth::{RequireUser, Viewer},
};

const SOURCE: &str = "infra::http::compose";

/// Raw multipart submission before validation.
#[derive(Debug, Default)]
struct PostForm {
    text: String,
    group: Option<String>,
    image: Option<(String, Bytes)>,
}

async fn read_post_form(mut multipart: Multipart) -> Result<PostForm, HttpError> {
    let mut form = PostForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        HttpError::from_error(SOURCE, StatusCode::BAD_REQUEST, "Malformed form data", &err)
    })? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("text") => {
                form.text = field.text().await.map_err(|err| {
                    HttpError::from_error(SOURCE, StatusCode::BAD_REQUEST, "Malformed form data", &err)
                })?;
            }
            Some("group") => {
                form.group = Some(field.text().await.map_err(|err| {
                    HttpError::from_error(SOURCE, StatusCode::BAD_REQUEST, "Malformed form data", &err)
                })?);
            }
            Some("image") => {
                let filename = field.file_name().map(str::to_string).unwrap_or_default();
                let data = field.bytes().await.map_err(|err| {
                    HttpError::from_error(SOURCE, StatusCode::BAD_REQUEST, "Malformed form data", &err)
                })?;
                if !filename.is_empty() && !data.is_empty() {
                    form.image = Some((filename, data));
                }
            }
            _ => {
                // Unknown fields are drained and ignored.
                let _ = field.bytes().await;
            }
        }
    }

    Ok(form)
}

/// Store the uploaded image when one was submitted. Payloads that are not
/// images are dropped with a warning rather than failing the whole post.
async fn store_image(state: &HttpState, image: Option<(String, Bytes)>) -> Option<String> {
    let (filename, data) = image?;
    match state.images.store(&filename, data).await {
        Ok(path) => Some(path),
        Err(err @ (ImageStoreError::NotAnImage | ImageStoreError::EmptyPayload)) => {
            warn!(
                target = "tertulia::http::compose",
                filename = %filename,
                error = %err,
                "discarding rejected upload"
            );
            None
        }
        Err(err) => {
            warn!(
                target = "tertulia::http::compose",
                filename = %filename,
                error = %err,
                "failed to store upload"
            );
            None
        }
    }
}

fn group_options(groups: Vec<GroupRecord>, selected: Option<Uuid>) -> Vec<GroupOptionView> {
    groups
        .into_iter()
        .map(|group| GroupOptionView {
            selected: selected == Some(group.id),
            id: group.id,
            title: group.title,
        })
        .collect()
}

fn selected_group(raw: Option<&str>) -> Option<Uuid> {
    raw.and_then(|value| Uuid::parse_str(value.trim()).ok())
}

async fn render_post_form(
    state: &HttpState,
    viewer: Option<ViewerView>,
    is_edit: bool,
    action: String,
    text: String,
    selected: Option<Uuid>,
    errors: PostFormErrors,
) -> Response {
    let groups = match state.groups.list_all().await {
        Ok(groups) => groups,
        Err(err) => return HttpError::from(err).into_response(),
    };

    let content = PostFormContext {
        is_edit,
        action,
        text,
        groups: group_options(groups, selected),
        text_error: errors.text,
        group_error: errors.group,
    };
    let title = if is_edit { "Edit post" } else { "New post" };
    let view = LayoutContext::new(title, viewer, content);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}

pub(crate) async fn post_create_form(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
) -> Response {
    render_post_form(
        &state,
        Some(user.view()),
        false,
        "/create/".to_string(),
        String::new(),
        None,
        PostFormErrors::default(),
    )
    .await
}

pub(crate) async fn post_create(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    multipart: Multipart,
) -> Response {
    let form = match read_post_form(multipart).await {
        Ok(form) => form,
        Err(err) => return err.into_response(),
    };

    let image_path = store_image(&state, form.image).await;
    let input = PostInput {
        text: form.text.clone(),
        group: form.group.clone(),
        image_path,
    };

    match state.compose.create_post(user.id, input).await {
        Ok(CreateOutcome::Created(_)) => {
            Redirect::to(&format!("/profile/{}/", user.username)).into_response()
        }
        Ok(CreateOutcome::Invalid(errors)) => {
            render_post_form(
                &state,
                Some(user.view()),
                false,
                "/create/".to_string(),
                form.text,
                selected_group(form.group.as_deref()),
                errors,
            )
            .await
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(crate) async fn post_edit_form(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> Response {
    let Ok(id) = Uuid::parse_str(&id) else {
        return render_not_found_response(viewer.view());
    };

    match state.compose.post_for_edit(viewer.id(), id).await {
        Ok(EditOutcome::Updated(post)) => {
            let selected = post.group_id;
            render_post_form(
                &state,
                viewer.view(),
                true,
                edit_action(&post),
                post.text,
                selected,
                PostFormErrors::default(),
            )
            .await
        }
        Ok(EditOutcome::NotAuthor(post)) => detail_redirect(post.id),
        Ok(EditOutcome::NotFound) => render_not_found_response(viewer.view()),
        Ok(EditOutcome::Invalid { .. }) => unreachable!("form fetch performs no validation"),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(crate) async fn post_edit(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Response {
    let Ok(id) = Uuid::parse_str(&id) else {
        return render_not_found_response(viewer.view());
    };

    let form = match read_post_form(multipart).await {
        Ok(form) => form,
        Err(err) => return err.into_response(),
    };

    let image_path = store_image(&state, form.image).await;
    let input = PostInput {
        text: form.text.clone(),
        group: form.group.clone(),
        image_path,
    };

    match state.compose.edit_post(viewer.id(), id, input).await {
        Ok(EditOutcome::Updated(post)) => detail_redirect(post.id),
        Ok(EditOutcome::Invalid { post, errors }) => {
            render_post_form(
                &state,
                viewer.view(),
                true,
                edit_action(&post),
                form.text,
                selected_group(form.group.as_deref()),
                errors,
            )
            .await
        }
        // Only the author may edit; anonymous visitors and other users are
        // bounced to the detail page without an error.
        Ok(EditOutcome::NotAuthor(post)) => detail_redirect(post.id),
        Ok(EditOutcome::NotFound) => render_not_found_response(viewer.view()),
        Err(err) => HttpError::from(err).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentForm {
    #[serde(default)]
    text: String,
}

pub(crate) async fn add_comment(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Response {
    let Ok(id) = Uuid::parse_str(&id) else {
        return render_not_found_response(Some(user.view()));
    };

    match state.compose.add_comment(user.id, id, &form.text).await {
        // Blank comments redirect exactly like successful ones.
        Ok(CommentOutcome::Created | CommentOutcome::Dropped) => detail_redirect(id),
        Ok(CommentOutcome::NotFound) => render_not_found_response(Some(user.view())),
        Err(err) => HttpError::from(err).into_response(),
    }
}

fn detail_redirect(id: Uuid) -> Response {
    Redirect::to(&format!("/posts/{id}/")).into_response()
}

fn edit_action(post: &PostRecord) -> String {
    format!("/posts/{}/edit/", post.id)
}
