//! Feed, post and comment pages

use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Response},
    Extension,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::forms::{CommentForm, FormErrors, PostForm, ValidPost};
use crate::models::{FeedFilter, PostWithMeta, Profile, User};
use crate::web::error::WebError;
use crate::web::extract::FormBody;
use crate::web::middleware::{found, AppState, CurrentUser, Viewer};

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// Raw page number; anything unparsable means page 1
    pub page: Option<String>,
}

/// Post ids that are not integers name no post.
pub fn parse_post_id(raw: &str) -> Result<i64, WebError> {
    raw.parse().map_err(|_| WebError::NotFound)
}

/// GET / - main feed
pub async fn index(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, WebError> {
    let page = state.post_service.index_feed(query.page.as_deref()).await?;

    let mut context = TeraContext::new();
    context.insert("page", &page);
    state.render("posts/index.html", context, viewer.user())
}

/// GET /group/{slug}/
pub async fn group_posts(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, WebError> {
    let group = state.group_service.get_by_slug(&slug).await?;
    let page = state
        .post_service
        .feed(FeedFilter::Group(group.id), query.page.as_deref())
        .await?;

    let mut context = TeraContext::new();
    context.insert("group", &group);
    context.insert("page", &page);
    state.render("group.html", context, viewer.user())
}

/// GET /follow/ - posts by followed authors
pub async fn follow_index(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, WebError> {
    let page = state
        .post_service
        .feed(FeedFilter::FollowedBy(user.id), query.page.as_deref())
        .await?;

    let mut context = TeraContext::new();
    context.insert("page", &page);
    state.render("posts/follow.html", context, Some(&user))
}

/// GET /{username}/{post_id}/
pub async fn post_detail(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((username, post_id)): Path<(String, String)>,
) -> Result<Html<String>, WebError> {
    let post = state
        .post_service
        .get_by_author(&username, parse_post_id(&post_id)?)
        .await?;
    render_post_page(&state, viewer.user(), &post, &CommentForm::default(), &FormErrors::new()).await
}

async fn render_post_page(
    state: &AppState,
    viewer: Option<&User>,
    post: &PostWithMeta,
    form: &CommentForm,
    errors: &FormErrors,
) -> Result<Html<String>, WebError> {
    let author = state
        .user_service
        .get_by_username(&post.author_username)
        .await?
        .ok_or(WebError::NotFound)?;
    let posts_count = state.post_service.posts_count(author.id).await?;
    let comments = state.comment_service.list(post.id).await?;

    let mut context = TeraContext::new();
    context.insert("post", post);
    context.insert("author", &Profile::from(&author));
    context.insert("posts_count", &posts_count);
    context.insert("comments", &comments);
    context.insert("form", &form.view(errors));
    context.insert("is_author", &viewer.is_some_and(|u| u.id == author.id));
    state.render("posts/post.html", context, viewer)
}

async fn render_post_form(
    state: &AppState,
    user: &User,
    form: &PostForm,
    errors: &FormErrors,
    editing: Option<&PostWithMeta>,
) -> Result<Html<String>, WebError> {
    let groups = state.group_service.list().await?;

    let mut context = TeraContext::new();
    context.insert("form", &form.view(errors));
    context.insert("groups", &groups);
    context.insert("is_edit", &editing.is_some());
    context.insert("post", &editing);
    state.render("posts/new_post.html", context, Some(user))
}

async fn store_image(state: &AppState, valid: &ValidPost) -> Result<Option<String>, WebError> {
    match &valid.image {
        Some(file) => Ok(Some(state.media.save(&file.filename, &file.data).await?)),
        None => Ok(None),
    }
}

/// GET /new/
pub async fn new_post_form(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Html<String>, WebError> {
    render_post_form(&state, &user, &PostForm::default(), &FormErrors::new(), None).await
}

/// POST /new/
pub async fn create_post(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    FormBody(data): FormBody,
) -> Result<Response, WebError> {
    let form = PostForm::from_data(data);
    let groups = state.group_service.list().await?;

    let valid = match form.validate(&groups, &state.media) {
        Ok(valid) => valid,
        Err(errors) => {
            return Ok(render_post_form(&state, &user, &form, &errors, None)
                .await?
                .into_response())
        }
    };

    let stored = store_image(&state, &valid).await?;
    state
        .post_service
        .create(&user, valid.into_input(stored, None))
        .await?;
    Ok(found("/"))
}

/// GET /{username}/{post_id}/edit/
pub async fn edit_post_form(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((username, post_id)): Path<(String, String)>,
) -> Result<Response, WebError> {
    let post = state
        .post_service
        .get_by_author(&username, parse_post_id(&post_id)?)
        .await?;
    if post.author_id != user.id {
        return Ok(found(&post.url));
    }

    let form = PostForm::initial(&post);
    Ok(render_post_form(&state, &user, &form, &FormErrors::new(), Some(&post))
        .await?
        .into_response())
}

/// POST /{username}/{post_id}/edit/
pub async fn update_post(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((username, post_id)): Path<(String, String)>,
    FormBody(data): FormBody,
) -> Result<Response, WebError> {
    let post = state
        .post_service
        .get_by_author(&username, parse_post_id(&post_id)?)
        .await?;
    let detail = post.url.clone();
    if post.author_id != user.id {
        tracing::warn!(post_id = post.id, user = %user.username, "Edit by non-author refused");
        return Ok(found(&detail));
    }

    let form = PostForm::from_data(data);
    let groups = state.group_service.list().await?;
    let valid = match form.validate(&groups, &state.media) {
        Ok(valid) => valid,
        Err(errors) => {
            return Ok(render_post_form(&state, &user, &form, &errors, Some(&post))
                .await?
                .into_response())
        }
    };

    let stored = store_image(&state, &valid).await?;
    state
        .post_service
        .update(&user, post.id, valid.into_input(stored, post.image.clone()))
        .await?;
    Ok(found(&detail))
}

/// GET /{username}/{post_id}/comment - nothing to submit, back to the post
pub async fn comment_redirect(
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
) -> Result<Response, WebError> {
    let post = state
        .post_service
        .get_by_author(&username, parse_post_id(&post_id)?)
        .await?;
    Ok(found(&post.url))
}

/// POST /{username}/{post_id}/comment
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((username, post_id)): Path<(String, String)>,
    FormBody(data): FormBody,
) -> Result<Response, WebError> {
    let post = state
        .post_service
        .get_by_author(&username, parse_post_id(&post_id)?)
        .await?;

    let form = CommentForm::from_data(&data);
    match form.validate() {
        Ok(text) => {
            state.comment_service.add(post.id, &user, &text).await?;
            Ok(found(&post.url))
        }
        Err(errors) => Ok(render_post_page(&state, Some(&user), &post, &form, &errors)
            .await?
            .into_response()),
    }
}
