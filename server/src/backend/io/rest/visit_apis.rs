//! # Visit Pages
//!
//! The log-visit form for one child.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
    Form,
};
use log::info;
use shared::VisitForm;

use super::{require_session, respond, submit_session};
use crate::backend::io::views;
use crate::backend::AppState;

pub async fn new_visit_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(child_id): Path<String>,
) -> Response {
    info!("GET /children/{}/visits/new", child_id);

    match require_session(&state, &headers).await {
        Ok(_) => {
            let form_state = state.visit_service.open_form();
            Html(views::visit_form_page(&child_id, &form_state)).into_response()
        }
        Err(to_login) => to_login,
    }
}

pub async fn log_visit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(child_id): Path<String>,
    Form(form): Form<VisitForm>,
) -> Response {
    info!("POST /children/{}/visits/new", child_id);

    let session = submit_session(&state, &headers).await;
    let outcome = state
        .visit_service
        .log_visit(session.as_ref(), &child_id, form)
        .await;
    respond(outcome, |form_state| views::visit_form_page(&child_id, form_state))
}
