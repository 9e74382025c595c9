//! Signup, login and logout

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::forms::{safe_next, FormErrors, LoginForm, SignupForm, INVALID_LOGIN};
use crate::models::Session;
use crate::services::UserServiceError;
use crate::web::error::WebError;
use crate::web::extract::FormBody;
use crate::web::middleware::{
    clear_session_cookie, extract_session_token, found, session_cookie, AppState, Viewer,
};

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

fn with_cookie(mut response: Response, cookie: &str) -> Result<Response, WebError> {
    let value = HeaderValue::from_str(cookie).map_err(|e| WebError::Internal(e.into()))?;
    response.headers_mut().append(header::SET_COOKIE, value);
    Ok(response)
}

fn logged_in_redirect(state: &AppState, session: &Session, location: &str) -> Result<Response, WebError> {
    let cookie = session_cookie(&session.id, state.user_service.session_max_age());
    with_cookie(found(location), &cookie)
}

fn render_signup(
    state: &AppState,
    viewer: &Viewer,
    form: &SignupForm,
    errors: &FormErrors,
) -> Result<Html<String>, WebError> {
    let mut context = TeraContext::new();
    context.insert("form", &form.view(errors));
    state.render("registration/signup.html", context, viewer.user())
}

fn render_login(
    state: &AppState,
    viewer: &Viewer,
    form: &LoginForm,
    errors: &FormErrors,
) -> Result<Html<String>, WebError> {
    let mut context = TeraContext::new();
    context.insert("form", &form.view(errors));
    context.insert("next", &form.next);
    state.render("registration/login.html", context, viewer.user())
}

/// GET /auth/signup/
pub async fn signup_form(State(state): State<AppState>, viewer: Viewer) -> Result<Html<String>, WebError> {
    render_signup(&state, &viewer, &SignupForm::default(), &FormErrors::new())
}

/// POST /auth/signup/
pub async fn signup(
    State(state): State<AppState>,
    viewer: Viewer,
    FormBody(data): FormBody,
) -> Result<Response, WebError> {
    let form = SignupForm::from_data(&data);
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return Ok(render_signup(&state, &viewer, &form, &errors)?.into_response()),
    };

    let user = match state.user_service.register(input).await {
        Ok(user) => user,
        Err(UserServiceError::InternalError(e)) => return Err(WebError::Internal(e)),
        Err(e) => {
            let mut errors = FormErrors::new();
            match e {
                UserServiceError::UserExists(_) => errors.add("username", e.to_string()),
                other => errors.add_non_field(other.to_string()),
            }
            return Ok(render_signup(&state, &viewer, &form, &errors)?.into_response());
        }
    };

    let session = state.user_service.create_session(user.id).await?;
    logged_in_redirect(&state, &session, "/")
}

/// GET /auth/login/
pub async fn login_form(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<NextQuery>,
) -> Result<Html<String>, WebError> {
    let form = LoginForm {
        next: query.next.unwrap_or_default(),
        ..LoginForm::default()
    };
    render_login(&state, &viewer, &form, &FormErrors::new())
}

/// POST /auth/login/
pub async fn login(
    State(state): State<AppState>,
    viewer: Viewer,
    FormBody(data): FormBody,
) -> Result<Response, WebError> {
    let form = LoginForm::from_data(&data);
    let (username, password) = match form.validate() {
        Ok(credentials) => credentials,
        Err(errors) => return Ok(render_login(&state, &viewer, &form, &errors)?.into_response()),
    };

    match state.user_service.login(&username, &password).await {
        Ok((_, session)) => logged_in_redirect(&state, &session, safe_next(&form.next)),
        Err(UserServiceError::InternalError(e)) => Err(WebError::Internal(e)),
        Err(e) => {
            tracing::warn!(username = %username, "Login rejected: {}", e);
            let mut errors = FormErrors::new();
            errors.add_non_field(INVALID_LOGIN);
            Ok(render_login(&state, &viewer, &form, &errors)?.into_response())
        }
    }
}

/// GET|POST /auth/logout/
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, WebError> {
    if let Some(token) = extract_session_token(&headers) {
        match state.user_service.logout(&token).await {
            Ok(()) | Err(UserServiceError::SessionNotFound) => {}
            Err(e) => return Err(e.into()),
        }
    }

    let page = state.render("registration/logged_out.html", TeraContext::new(), None)?;
    with_cookie(page.into_response(), &clear_session_cookie())
}
