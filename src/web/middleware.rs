//! Shared state, sessions and request middleware
//!
//! - `load_session` resolves the `sessionid` cookie (or a Bearer token) to
//!   a [`CurrentUser`] request extension.
//! - `login_required` redirects anonymous requests to the login page.
//! - `render_error_pages` fills 404/500 responses with their templates.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use chrono::Datelike;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tera::Context as TeraContext;

use crate::cache::Cache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxCommentRepository, SqlxFollowRepository, SqlxGroupRepository, SqlxPostRepository,
    SqlxSessionRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{Profile, User};
use crate::render::TemplateEngine;
use crate::services::{
    CommentService, FollowService, GroupService, MediaStore, PostService, UserService,
    UserServiceError,
};
use crate::web::error::{ErrorPage, WebError};

pub const SESSION_COOKIE: &str = "sessionid";

pub const LOGIN_PATH: &str = "/auth/login/";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub post_service: Arc<PostService>,
    pub group_service: Arc<GroupService>,
    pub comment_service: Arc<CommentService>,
    pub follow_service: Arc<FollowService>,
    pub media: Arc<MediaStore>,
    pub templates: Arc<TemplateEngine>,
}

impl AppState {
    /// Wire repositories and services over one pool and cache.
    pub fn new(
        pool: DynDatabasePool,
        cache: Arc<Cache>,
        config: &Config,
        templates: TemplateEngine,
    ) -> Self {
        let user_repo = SqlxUserRepository::boxed(pool.clone());

        Self {
            user_service: Arc::new(UserService::with_session_days(
                user_repo.clone(),
                SqlxSessionRepository::boxed(pool.clone()),
                config.auth.session_days,
            )),
            post_service: Arc::new(PostService::with_feed_ttl(
                SqlxPostRepository::boxed(pool.clone()),
                cache,
                Duration::from_secs(config.cache.feed_ttl_seconds),
            )),
            group_service: Arc::new(GroupService::new(SqlxGroupRepository::boxed(pool.clone()))),
            comment_service: Arc::new(CommentService::new(SqlxCommentRepository::boxed(
                pool.clone(),
            ))),
            follow_service: Arc::new(FollowService::new(
                SqlxFollowRepository::boxed(pool),
                user_repo,
            )),
            media: Arc::new(MediaStore::new(&config.media)),
            templates: Arc::new(templates),
        }
    }

    /// Render a page, adding the variables every page uses.
    pub fn render(
        &self,
        template: &str,
        mut context: TeraContext,
        viewer: Option<&User>,
    ) -> Result<Html<String>, WebError> {
        context.insert("current_user", &viewer.map(Profile::from));
        context.insert("year", &chrono::Utc::now().year());
        Ok(Html(self.templates.render(template, &context)?))
    }
}

/// The logged-in user, stored in request extensions by `load_session`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// The logged-in user, if any.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<User>);

impl Viewer {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer(
            parts.extensions.get::<CurrentUser>().map(|c| c.0.clone()),
        ))
    }
}

/// Session id from `Authorization: Bearer ..` or the session cookie.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    for cookie_header in headers.get_all(header::COOKIE) {
        let Ok(cookie_str) = cookie_header.to_str() else {
            continue;
        };
        for cookie in cookie_str.split(';') {
            if let Some((name, value)) = cookie.trim().split_once('=') {
                if name == SESSION_COOKIE && !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }

    None
}

pub fn session_cookie(session_id: &str, max_age: chrono::Duration) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        session_id,
        max_age.num_seconds().max(0)
    )
}

pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// `302 Found` to `location`, which must already be URL-safe.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Percent-encode `path` for use as a URL parameter, keeping `/` readable.
pub fn encode_path(path: &str) -> String {
    urlencoding::encode(path).replace("%2F", "/")
}

/// Login page URL that returns to `next` afterwards.
pub fn login_url(next: &str) -> String {
    format!("{}?next={}", LOGIN_PATH, encode_path(next))
}

/// Resolve the session, if any, into a `CurrentUser` extension.
pub async fn load_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_session_token(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(user) => {
                request.extensions_mut().insert(CurrentUser(user));
            }
            Err(UserServiceError::InternalError(e)) => {
                tracing::error!("Session lookup failed: {:#}", e);
            }
            Err(e) => tracing::debug!("Ignoring session: {}", e),
        }
    }
    next.run(request).await
}

/// Redirect anonymous users to the login page.
pub async fn login_required(request: Request, next: Next) -> Response {
    if request.extensions().get::<CurrentUser>().is_some() {
        return next.run(request).await;
    }

    let uri = request.uri();
    let raw = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let full_path = urlencoding::decode(raw)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    found(&login_url(&full_path))
}

/// Replace the body of 404 and 500 responses with the error templates.
pub async fn render_error_pages(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let viewer = request.extensions().get::<CurrentUser>().map(|c| c.0.clone());

    let response = next.run(request).await;
    let status = response.status();
    let tagged = response.extensions().get::<ErrorPage>().is_some();
    // Untagged 404s come from the media file service.
    let bare = !response.headers().contains_key(header::CONTENT_TYPE);

    let template = match status {
        StatusCode::NOT_FOUND if tagged || bare => "misc/404.html",
        StatusCode::INTERNAL_SERVER_ERROR if tagged => "misc/500.html",
        _ => return response,
    };

    let mut context = TeraContext::new();
    context.insert("path", &path);
    match state.render(template, context, viewer.as_ref()) {
        Ok(html) => (status, html).into_response(),
        Err(e) => {
            tracing::error!("Failed to render {}: {}", template, e);
            let fallback = format!(
                "<!DOCTYPE html><html><body><h1>{}</h1></body></html>",
                status
            );
            (status, Html(fallback)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_extract_session_token_from_cookie() {
        let map = headers(&[(header::COOKIE, "theme=dark; sessionid=abc-123")]);
        assert_eq!(extract_session_token(&map), Some("abc-123".to_string()));
    }

    #[test]
    fn test_extract_session_token_from_bearer_first() {
        let map = headers(&[
            (header::AUTHORIZATION, "Bearer bearer-token"),
            (header::COOKIE, "sessionid=cookie-token"),
        ]);
        assert_eq!(extract_session_token(&map), Some("bearer-token".to_string()));
    }

    #[test]
    fn test_extract_session_token_none() {
        assert!(extract_session_token(&HeaderMap::new()).is_none());
        let map = headers(&[
            (header::AUTHORIZATION, "Basic invalid"),
            (header::COOKIE, "session=other; sessionid="),
        ]);
        assert!(extract_session_token(&map).is_none());
    }

    #[test]
    fn test_login_url_keeps_slashes() {
        assert_eq!(login_url("/new/"), "/auth/login/?next=/new/");
        assert_eq!(
            login_url("/AndreyG/1/edit/"),
            "/auth/login/?next=/AndreyG/1/edit/"
        );
        assert_eq!(login_url("/a b/?x"), "/auth/login/?next=/a%20b/%3Fx");
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc", chrono::Duration::days(7));
        assert_eq!(
            cookie,
            "sessionid=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=604800"
        );
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }
}
