//! Static pages

use axum::{extract::State, response::Html};
use tera::Context as TeraContext;

use crate::web::error::WebError;
use crate::web::middleware::{AppState, Viewer};

pub async fn author(State(state): State<AppState>, viewer: Viewer) -> Result<Html<String>, WebError> {
    state.render("about/author.html", TeraContext::new(), viewer.user())
}

pub async fn tech(State(state): State<AppState>, viewer: Viewer) -> Result<Html<String>, WebError> {
    state.render("about/tech.html", TeraContext::new(), viewer.user())
}
