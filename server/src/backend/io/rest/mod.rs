//! # HTTP Pages
//!
//! Axum handlers for every page of the tracker. Handlers are a thin shell:
//! they resolve the session from the session cookie, call one controller and
//! turn its [`Outcome`] into a redirect or an HTML page.
//!
//! The session cookie holds the backend access token and nothing else.

pub mod auth_apis;
pub mod child_apis;
pub mod doctor_apis;
pub mod medication_apis;
pub mod visit_apis;

use axum::{
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use shared::{Route, Session};

use crate::backend::domain::Outcome;
use crate::backend::AppState;

pub const SESSION_COOKIE: &str = "weecare_session";

/// `?confirm_delete=<id>` on the list pages
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub confirm_delete: Option<String>,
}

/// Access token from the session cookie, if any
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value that stores the access token
pub fn session_cookie(access_token: &str, secure: bool) -> String {
    let mut parts = vec![
        format!("{}={}", SESSION_COOKIE, access_token),
        "Path=/".to_string(),
        "HttpOnly".to_string(),
        "SameSite=Lax".to_string(),
    ];
    if secure {
        parts.push("Secure".to_string());
    }
    parts.join("; ")
}

/// `Set-Cookie` value that removes the session cookie
pub fn cleared_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

pub fn redirect(route: &Route) -> Response {
    Redirect::to(&route.path()).into_response()
}

/// Session of a protected page, or the redirect to `/login`
pub async fn require_session(state: &AppState, headers: &HeaderMap) -> Result<Session, Response> {
    let token = access_token(headers);
    match state.session_gate.check(token.as_deref()).await {
        Outcome::Render(session) => Ok(session),
        Outcome::Navigate(route) => Err(redirect(&route)),
    }
}

/// Session at submit time; `None` lets the controller redirect
pub async fn submit_session(state: &AppState, headers: &HeaderMap) -> Option<Session> {
    let token = access_token(headers);
    state.session_gate.current_session(token.as_deref()).await
}

/// Redirect, or render the state with `view`
pub fn respond<T>(outcome: Outcome<T>, view: impl FnOnce(&T) -> String) -> Response {
    match outcome {
        Outcome::Navigate(route) => redirect(&route),
        Outcome::Render(state) => Html(view(&state)).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_access_token_from_cookie_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(access_token(&headers), None);

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; weecare_session=abc.def; other=1"),
        );
        assert_eq!(access_token(&headers).as_deref(), Some("abc.def"));

        headers.insert(header::COOKIE, HeaderValue::from_static("weecare_session="));
        assert_eq!(access_token(&headers), None);
    }

    #[test]
    fn test_cookie_attributes() {
        assert_eq!(
            session_cookie("tok", false),
            "weecare_session=tok; Path=/; HttpOnly; SameSite=Lax"
        );
        assert!(session_cookie("tok", true).ends_with("; Secure"));
        assert!(cleared_cookie().contains("Max-Age=0"));
    }
}
