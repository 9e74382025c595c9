//! Profile pages and follow/unfollow

use axum::{
    extract::{Path, Query, State},
    response::{Html, Response},
    Extension,
};
use tera::Context as TeraContext;

use crate::models::{profile_url, FeedFilter, Profile};
use crate::web::error::WebError;
use crate::web::middleware::{found, AppState, CurrentUser, Viewer};
use crate::web::posts::PageQuery;

/// GET /{username}/
pub async fn profile(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, WebError> {
    let author = state
        .user_service
        .get_by_username(&username)
        .await?
        .ok_or(WebError::NotFound)?;

    let page = state
        .post_service
        .feed(FeedFilter::Author(author.id), query.page.as_deref())
        .await?;
    let following = match viewer.user() {
        Some(user) if user.id != author.id => {
            state.follow_service.is_following(user.id, author.id).await?
        }
        _ => false,
    };

    let mut context = TeraContext::new();
    context.insert("author", &Profile::from(&author));
    context.insert("posts_count", &page.total);
    context.insert("page", &page);
    context.insert("following", &following);
    context.insert(
        "followers_count",
        &state.follow_service.followers_count(author.id).await?,
    );
    context.insert(
        "following_count",
        &state.follow_service.following_count(author.id).await?,
    );
    state.render("posts/profile.html", context, viewer.user())
}

/// GET /{username}/follow
pub async fn profile_follow(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> Result<Response, WebError> {
    state.follow_service.follow(&user, &username).await?;
    Ok(found(&profile_url(&username)))
}

/// GET /{username}/unfollow
pub async fn profile_unfollow(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> Result<Response, WebError> {
    state.follow_service.unfollow(&user, &username).await?;
    Ok(found(&profile_url(&username)))
}
