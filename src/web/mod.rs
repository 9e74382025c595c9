//! HTTP layer - handlers and routing
//!
//! Server-rendered pages over the services. Routes that need a logged-in
//! user sit behind `login_required`; everything else is public.

pub mod about;
pub mod auth;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod posts;
pub mod profiles;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::get,
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

pub use error::WebError;
pub use middleware::{AppState, CurrentUser, Viewer};

/// Room for form fields next to the largest accepted upload.
const BODY_OVERHEAD: usize = 1024 * 1024;

/// Routes that require a logged-in user.
fn gated_routes() -> Router<AppState> {
    Router::new()
        .route("/new/", get(posts::new_post_form).post(posts::create_post))
        .route("/follow/", get(posts::follow_index))
        .route(
            "/{username}/{post_id}/edit/",
            get(posts::edit_post_form).post(posts::update_post),
        )
        .route(
            "/{username}/{post_id}/comment",
            get(posts::comment_redirect).post(posts::add_comment),
        )
        .route(
            "/{username}/{post_id}/comment/",
            get(posts::comment_redirect).post(posts::add_comment),
        )
        .route("/{username}/follow", get(profiles::profile_follow))
        .route("/{username}/follow/", get(profiles::profile_follow))
        .route("/{username}/unfollow", get(profiles::profile_unfollow))
        .route("/{username}/unfollow/", get(profiles::profile_unfollow))
        .route_layer(axum_middleware::from_fn(middleware::login_required))
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(posts::index))
        .route("/group/{slug}/", get(posts::group_posts))
        .route("/about/author/", get(about::author))
        .route("/about/tech/", get(about::tech))
        .route("/auth/signup/", get(auth::signup_form).post(auth::signup))
        .route("/auth/login/", get(auth::login_form).post(auth::login))
        .route("/auth/logout/", get(auth::logout).post(auth::logout))
        .route("/{username}/", get(profiles::profile))
        .route("/{username}/{post_id}/", get(posts::post_detail))
}

async fn not_found() -> WebError {
    WebError::NotFound
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.media.max_file_size())
        .unwrap_or(usize::MAX)
        .saturating_add(BODY_OVERHEAD);

    Router::new()
        .merge(public_routes())
        .merge(gated_routes())
        .nest_service("/media", ServeDir::new(state.media.root()))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::render_error_pages,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::load_session,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
