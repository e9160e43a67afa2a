//! Login, registration, sign-out and the home page.

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Response},
    Form,
};
use log::info;
use shared::{FormState, LoginForm, RegisterForm, Route};

use super::{cleared_cookie, redirect, require_session, respond, session_cookie, submit_session};
use crate::backend::domain::LoginResult;
use crate::backend::io::views;
use crate::backend::AppState;

pub async fn login_page() -> Html<String> {
    info!("GET /login");
    Html(views::login_page(&FormState::new(LoginForm::default())))
}

pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    info!("POST /login");

    match state.auth_service.login(form).await {
        LoginResult::SignedIn(session) => {
            let cookie = session_cookie(&session.access_token, state.cookie_secure);
            ([(header::SET_COOKIE, cookie)], redirect(&Route::Home)).into_response()
        }
        LoginResult::Rejected(form_state) => Html(views::login_page(&form_state)).into_response(),
    }
}

pub async fn register_page() -> Html<String> {
    info!("GET /register");
    Html(views::register_page(&FormState::new(RegisterForm::default())))
}

pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    info!("POST /register");
    respond(state.auth_service.register(form).await, views::register_page)
}

pub async fn home(State(state): State<AppState>, headers: HeaderMap) -> Response {
    info!("GET /");

    match require_session(&state, &headers).await {
        Ok(session) => Html(views::home_page(&state.auth_service.home(&session))).into_response(),
        Err(to_login) => to_login,
    }
}

/// Signs out if there is a session; the cookie is cleared either way
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    info!("POST /logout");

    let route = match submit_session(&state, &headers).await {
        Some(session) => state.auth_service.sign_out(&session).await,
        None => Route::Login,
    };
    ([(header::SET_COOKIE, cleared_cookie())], redirect(&route)).into_response()
}
