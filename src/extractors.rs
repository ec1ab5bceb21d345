use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderValue};
use axum::response::Response;

use crate::state::AppState;

/// Session token carried by the request cookie, if any.
///
/// The token is not checked here; `SessionStore::touch` decides whether it
/// still names a live session.
#[derive(Debug, Clone)]
pub struct SessionToken(pub Option<String>);

impl FromRequestParts<AppState> for SessionToken {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = cookie_value(parts, &state.config.session.cookie_name).map(str::to_string);
        Ok(SessionToken(token))
    }
}

fn cookie_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name && !val.is_empty() {
                Some(val)
            } else {
                None
            }
        })
}

pub fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        name,
        token,
        max_age_hours * 3600
    )
}

/// Attach a `Set-Cookie` header for a freshly created session.
pub fn with_session_cookie(mut response: Response, state: &AppState, token: &str) -> Response {
    let session = &state.config.session;
    let cookie = session_cookie(&session.cookie_name, token, session.ttl_hours);
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::error!("Invalid session cookie header: {}", e),
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_cookie(cookie: &str) -> Parts {
        let (parts, _) = Request::builder()
            .header(header::COOKIE, cookie)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn finds_named_cookie_among_others() {
        let parts = parts_with_cookie("theme=dark; extractor_session=abc123; lang=en");
        assert_eq!(cookie_value(&parts, "extractor_session"), Some("abc123"));
    }

    #[test]
    fn missing_or_empty_cookie_is_none() {
        let parts = parts_with_cookie("theme=dark");
        assert_eq!(cookie_value(&parts, "extractor_session"), None);

        let parts = parts_with_cookie("extractor_session=");
        assert_eq!(cookie_value(&parts, "extractor_session"), None);
    }

    #[test]
    fn session_cookie_format() {
        assert_eq!(
            session_cookie("extractor_session", "tok", 12),
            "extractor_session=tok; HttpOnly; SameSite=Strict; Path=/; Max-Age=43200"
        );
    }
}
