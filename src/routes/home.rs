use askama::Template;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::config::Config;
use crate::extractors::{with_session_cookie, SessionToken};
use crate::fetch::MAX_COMMENT_COUNT;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub default_count: u8,
    pub max_count: u8,
    pub extract_comments: bool,
    pub retain_results: bool,
    pub stored_results: usize,
    pub error: String,
}

impl HomeTemplate {
    pub fn new(config: &Config, stored_results: usize, error: String) -> Self {
        Self {
            default_count: config.api.default_count,
            max_count: MAX_COMMENT_COUNT,
            extract_comments: config.api.default_extract_comments,
            retain_results: config.session.retain_results,
            stored_results,
            error,
        }
    }
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

/// GET / — upload form
pub async fn index(State(state): State<AppState>, SessionToken(token): SessionToken) -> Response {
    let (token, created, stored_results) = {
        let mut sessions = state.sessions.lock().await;
        let (token, created) = sessions.touch(token.as_deref());
        let stored = sessions
            .get(&token)
            .map(|session| session.accumulated.len())
            .unwrap_or(0);
        (token, created, stored)
    };

    let page = Html(HomeTemplate::new(&state.config, stored_results, String::new()));
    respond_in_session(page.into_response(), &state, &token, created)
}

/// Set the session cookie when the request opened a new session.
pub fn respond_in_session(
    response: Response,
    state: &AppState,
    token: &str,
    created: bool,
) -> Response {
    if created {
        with_session_cookie(response, state, token)
    } else {
        response
    }
}
