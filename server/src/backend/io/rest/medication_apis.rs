//! # Medication Pages
//!
//! The add-medication form for one child.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
    Form,
};
use log::info;
use shared::MedicationForm;

use super::{require_session, respond, submit_session};
use crate::backend::io::views;
use crate::backend::AppState;

pub async fn new_medication_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(child_id): Path<String>,
) -> Response {
    info!("GET /children/{}/medications/new", child_id);

    match require_session(&state, &headers).await {
        Ok(_) => {
            let form_state = state.medication_service.open_form();
            Html(views::medication_form_page(&child_id, &form_state)).into_response()
        }
        Err(to_login) => to_login,
    }
}

pub async fn add_medication(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(child_id): Path<String>,
    Form(form): Form<MedicationForm>,
) -> Response {
    info!("POST /children/{}/medications/new", child_id);

    let session = submit_session(&state, &headers).await;
    let outcome = state
        .medication_service
        .add_medication(session.as_ref(), &child_id, form)
        .await;
    respond(outcome, |form_state| views::medication_form_page(&child_id, form_state))
}
