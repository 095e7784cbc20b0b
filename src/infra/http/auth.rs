//! Session cookies and the signup/login/logout surface.
//!
//! Sessions are a signed cookie carrying the user id and a keyed SHA-256 MAC.
//! There is no server-side session table; revoking a session means rotating
//! the secret.

use std::sync::Arc;

use axum::{
    Form,
    extract::{FromRequestParts, Query, State},
    http::{
        StatusCode,
        header::{COOKIE, SET_COOKIE},
        request::Parts,
    },
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::warn;
use url::Url;
use uuid::Uuid;

use crate::application::error::HttpError;
use crate::application::identity::SignupOutcome;
use crate::presentation::views::{
    LayoutContext, LoginFormContext, LoginTemplate, SignupFormContext, SignupTemplate, ViewerView,
    render_template_response,
};

use super::HttpState;

const SESSION_COOKIE: &str = "tertulia_session";
pub(crate) const LOGIN_PATH: &str = "/auth/login/";

/// Signs and verifies session cookie values of the form `<user_id>.<mac>`.
#[derive(Clone)]
pub struct SessionSigner {
    secret: Arc<str>,
}

impl SessionSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Arc::from(secret),
        }
    }

    fn mac(&self, user_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(b"\x00");
        hasher.update(user_id.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn sign(&self, user_id: Uuid) -> String {
        let id = user_id.to_string();
        let mac = self.mac(&id);
        format!("{id}.{mac}")
    }

    pub fn verify(&self, value: &str) -> Option<Uuid> {
        let (id_part, mac_part) = value.split_once('.')?;
        let user_id = Uuid::parse_str(id_part).ok()?;
        let expected = self.mac(id_part);
        bool::from(expected.as_bytes().ct_eq(mac_part.as_bytes())).then_some(user_id)
    }
}

/// The authenticated user attached to a request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
}

impl CurrentUser {
    pub fn view(&self) -> ViewerView {
        ViewerView {
            username: self.username.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// Optional authentication: resolves to `None` for anonymous requests.
pub struct Viewer(pub Option<CurrentUser>);

impl Viewer {
    pub fn view(&self) -> Option<ViewerView> {
        self.0.as_ref().map(CurrentUser::view)
    }

    pub fn id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|user| user.id)
    }
}

impl FromRequestParts<HttpState> for Viewer {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Viewer(current_user(parts, state).await))
    }
}

/// Mandatory authentication: anonymous requests are redirected to the login
/// form with the original path carried in `next`.
pub struct RequireUser(pub CurrentUser);

impl FromRequestParts<HttpState> for RequireUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        match current_user(parts, state).await {
            Some(user) => Ok(RequireUser(user)),
            None => {
                // `next` carries the full request target so the login form
                // can send the user back to the exact page, query included.
                let next = match parts.uri.query() {
                    Some(query) => format!("{}?{}", parts.uri.path(), query),
                    None => parts.uri.path().to_string(),
                };
                Err(login_redirect(&next))
            }
        }
    }
}

pub(crate) fn login_redirect(next: &str) -> Response {
    Redirect::to(&format!("{LOGIN_PATH}?next={next}")).into_response()
}

async fn current_user(parts: &Parts, state: &HttpState) -> Option<CurrentUser> {
    let header = parts.headers.get(COOKIE)?.to_str().ok()?;
    let raw = cookie_value(header, SESSION_COOKIE)?;
    let user_id = state.signer.verify(raw)?;

    match state.identity.user_by_id(user_id).await {
        Ok(Some(user)) => Some(CurrentUser {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
        }),
        // A signed cookie for a deleted user is treated as anonymous.
        Ok(None) => None,
        Err(err) => {
            warn!(
                target = "tertulia::http::auth",
                error = %err,
                "failed to load session user"
            );
            None
        }
    }
}

fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}

fn session_cookie(signer: &SessionSigner, user_id: Uuid) -> String {
    format!(
        "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax",
        signer.sign(user_id)
    )
}

fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0")
}

/// Only same-site paths are allowed as post-login targets. Anything that
/// parses as an absolute URL or protocol-relative reference falls back to
/// the index.
fn safe_next(next: &str) -> &str {
    if next.starts_with('/') && !next.starts_with("//") && Url::parse(next).is_err() {
        next
    } else {
        "/"
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct NextQuery {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginForm {
    username: String,
    password: String,
    #[serde(default)]
    next: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignupForm {
    username: String,
    #[serde(default)]
    display_name: String,
    password: String,
}

pub(crate) async fn login_form(viewer: Viewer, Query(query): Query<NextQuery>) -> Response {
    let content = LoginFormContext {
        username: String::new(),
        next: query.next.unwrap_or_default(),
        failed: false,
    };
    let view = LayoutContext::new("Log in", viewer.view(), content);
    render_template_response(LoginTemplate { view }, StatusCode::OK)
}

pub(crate) async fn login(State(state): State<HttpState>, Form(form): Form<LoginForm>) -> Response {
    match state
        .identity
        .verify_credentials(&form.username, &form.password)
        .await
    {
        Ok(Some(user)) => {
            let mut response = Redirect::to(safe_next(&form.next)).into_response();
            if let Ok(value) = session_cookie(&state.signer, user.id).parse() {
                response.headers_mut().append(SET_COOKIE, value);
            }
            response
        }
        Ok(None) => {
            let content = LoginFormContext {
                username: form.username,
                next: form.next,
                failed: true,
            };
            let view = LayoutContext::new("Log in", None, content);
            render_template_response(LoginTemplate { view }, StatusCode::OK)
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(crate) async fn signup_form(viewer: Viewer) -> Response {
    let content = SignupFormContext {
        username: String::new(),
        display_name: String::new(),
        username_error: None,
        password_error: None,
    };
    let view = LayoutContext::new("Sign up", viewer.view(), content);
    render_template_response(SignupTemplate { view }, StatusCode::OK)
}

pub(crate) async fn signup(
    State(state): State<HttpState>,
    Form(form): Form<SignupForm>,
) -> Response {
    match state
        .identity
        .signup(&form.username, &form.display_name, &form.password)
        .await
    {
        Ok(SignupOutcome::Created(user)) => {
            let mut response = Redirect::to("/").into_response();
            if let Ok(value) = session_cookie(&state.signer, user.id).parse() {
                response.headers_mut().append(SET_COOKIE, value);
            }
            response
        }
        Ok(SignupOutcome::Invalid(errors)) => {
            let content = SignupFormContext {
                username: form.username,
                display_name: form.display_name,
                username_error: errors.username,
                password_error: errors.password,
            };
            let view = LayoutContext::new("Sign up", None, content);
            render_template_response(SignupTemplate { view }, StatusCode::OK)
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(crate) async fn logout() -> Response {
    let mut response = Redirect::to("/").into_response();
    if let Ok(value) = clear_session_cookie().parse() {
        response.headers_mut().append(SET_COOKIE, value);
    }
    response
}
