//! Handler errors and how they become responses
//!
//! A `WebError` produces a bare status response tagged with [`ErrorPage`];
//! `middleware::render_error_pages` swaps the body for the matching
//! template.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::render::RenderError;
use crate::services::{
    CommentServiceError, FollowServiceError, GroupServiceError, ImageError, PostServiceError,
    UserServiceError,
};

/// Marks a response whose body should be replaced by an error page.
#[derive(Debug, Clone, Copy)]
pub struct ErrorPage;

#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebError::NotFound => StatusCode::NOT_FOUND,
            WebError::BadRequest(_) => StatusCode::BAD_REQUEST,
            WebError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            WebError::Internal(e) => tracing::error!("Request failed: {:#}", e),
            WebError::BadRequest(msg) => tracing::warn!("Bad request: {}", msg),
            _ => {}
        }

        let mut response = match self {
            WebError::BadRequest(msg) => (status, msg).into_response(),
            _ => status.into_response(),
        };
        if matches!(status, StatusCode::NOT_FOUND | StatusCode::INTERNAL_SERVER_ERROR) {
            response.extensions_mut().insert(ErrorPage);
        }
        response
    }
}

impl From<RenderError> for WebError {
    fn from(e: RenderError) -> Self {
        WebError::Internal(e.into())
    }
}

impl From<PostServiceError> for WebError {
    fn from(e: PostServiceError) -> Self {
        match e {
            PostServiceError::NotFound => WebError::NotFound,
            // Handlers redirect non-authors before calling the service.
            PostServiceError::Forbidden => WebError::NotFound,
            PostServiceError::ValidationError(msg) => WebError::BadRequest(msg),
            PostServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

impl From<GroupServiceError> for WebError {
    fn from(e: GroupServiceError) -> Self {
        match e {
            GroupServiceError::NotFound(_) => WebError::NotFound,
            GroupServiceError::InternalError(e) => WebError::Internal(e),
            other => WebError::BadRequest(other.to_string()),
        }
    }
}

impl From<UserServiceError> for WebError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::InternalError(e) => WebError::Internal(e),
            other => WebError::BadRequest(other.to_string()),
        }
    }
}

impl From<CommentServiceError> for WebError {
    fn from(e: CommentServiceError) -> Self {
        match e {
            CommentServiceError::ValidationError(msg) => WebError::BadRequest(msg),
            CommentServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

impl From<FollowServiceError> for WebError {
    fn from(e: FollowServiceError) -> Self {
        match e {
            FollowServiceError::AuthorNotFound(_) => WebError::NotFound,
            FollowServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

impl From<ImageError> for WebError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::Io(e) => WebError::Internal(anyhow::Error::new(e).context("Failed to store image")),
            other => WebError::BadRequest(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(WebError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            WebError::from(PostServiceError::Forbidden).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            WebError::from(FollowServiceError::AuthorNotFound("x".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            WebError::from(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_pages_are_tagged() {
        let response = WebError::NotFound.into_response();
        assert!(response.extensions().get::<ErrorPage>().is_some());

        let response = WebError::BadRequest("nope".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.extensions().get::<ErrorPage>().is_none());
    }
}
