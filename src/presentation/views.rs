//! Typed view models and their askama templates. Handlers build these and
//! never format HTML themselves, so the presentation layer stays swappable.

use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use uuid::Uuid;

use crate::application::error::{ErrorReport, HttpError};
use crate::application::pagination::Page;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;
        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError {
            source: "presentation::views::render_template",
            public_message: "Template rendering failed",
            error: err,
        }
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(viewer: Option<ViewerView>) -> Response {
    let view = LayoutContext::new("Page not found", viewer, ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// The signed-in user as the layout shows them.
#[derive(Debug, Clone)]
pub struct ViewerView {
    pub username: String,
    pub display_name: String,
}

pub struct LayoutContext<T> {
    pub title: String,
    pub viewer: Option<ViewerView>,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(title: impl Into<String>, viewer: Option<ViewerView>, content: T) -> Self {
        Self {
            title: title.into(),
            viewer,
            content,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostCard {
    pub id: Uuid,
    pub text: String,
    pub author_username: String,
    pub author_display_name: String,
    pub group_slug: Option<String>,
    pub group_title: Option<String>,
    pub image_path: Option<String>,
    pub published: String,
    pub iso_date: String,
}

#[derive(Debug, Clone)]
pub struct GroupView {
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct AuthorView {
    pub username: String,
    pub display_name: String,
}

#[derive(Debug, Clone)]
pub struct CommentView {
    pub author_username: String,
    pub author_display_name: String,
    pub text: String,
    pub published: String,
}

/// Pagination controls, derived from a [`Page`].
#[derive(Debug, Clone)]
pub struct PageNav {
    pub number: usize,
    pub num_pages: usize,
    pub total_count: usize,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_number: usize,
    pub previous_number: usize,
    /// Path the page links point at, e.g. `/group/test-slug/`.
    pub base_path: String,
}

impl PageNav {
    pub fn from_page<T>(page: &Page<T>) -> Self {
        Self {
            number: page.number,
            num_pages: page.num_pages,
            total_count: page.total_count,
            has_next: page.has_next(),
            has_previous: page.has_previous(),
            next_number: page.number + 1,
            previous_number: page.number.saturating_sub(1).max(1),
            base_path: "/".to_string(),
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base_path = base.into();
        self
    }
}

pub struct FeedPageContext {
    pub posts: Vec<PostCard>,
    pub page: PageNav,
}

pub struct GroupPageContext {
    pub group: GroupView,
    pub posts: Vec<PostCard>,
    pub page: PageNav,
}

pub struct ProfilePageContext {
    pub author: AuthorView,
    pub is_self: bool,
    pub following: bool,
    pub post_count: usize,
    pub posts: Vec<PostCard>,
    pub page: PageNav,
}

pub struct PostDetailContext {
    pub post: PostCard,
    pub author_post_count: u64,
    pub comments: Vec<CommentView>,
}

#[derive(Debug, Clone)]
pub struct GroupOptionView {
    pub id: Uuid,
    pub title: String,
    pub selected: bool,
}

/// Create/edit form state: submitted values round-trip through this so a
/// failed validation re-renders what the user typed.
pub struct PostFormContext {
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupOptionView>,
    pub text_error: Option<&'static str>,
    pub group_error: Option<&'static str>,
}

pub struct LoginFormContext {
    pub username: String,
    pub next: String,
    pub failed: bool,
}

pub struct SignupFormContext {
    pub username: String,
    pub display_name: String,
    pub username_error: Option<&'static str>,
    pub password_error: Option<&'static str>,
}

pub struct ErrorPageView {
    pub heading: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            heading: "Page not found".to_string(),
            message: "The page you requested does not exist. Head back to the feed to keep reading."
                .to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<FeedPageContext>,
}

#[derive(Template)]
#[template(path = "group.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<GroupPageContext>,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfilePageContext>,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: LayoutContext<PostDetailContext>,
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormContext>,
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowTemplate {
    pub view: LayoutContext<FeedPageContext>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginFormContext>,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupTemplate {
    pub view: LayoutContext<SignupFormContext>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
