//! # Doctor Pages
//!
//! Doctors list with delete confirmation and the add/edit form.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
    Form,
};
use log::info;
use shared::DoctorForm;

use super::{require_session, respond, submit_session, ListParams};
use crate::backend::io::views;
use crate::backend::AppState;

pub async fn list_doctors(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Response {
    info!("GET /doctors");

    let session = match require_session(&state, &headers).await {
        Ok(session) => session,
        Err(to_login) => return to_login,
    };

    let mut view = state.doctor_service.list_doctors(&session).await;
    if let Some(id) = params.confirm_delete.as_deref() {
        view.confirm(id);
    }
    Html(views::doctors_page(&view)).into_response()
}

pub async fn delete_doctor(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(doctor_id): Path<String>,
) -> Response {
    info!("POST /doctors/{}/delete", doctor_id);

    let session = match require_session(&state, &headers).await {
        Ok(session) => session,
        Err(to_login) => return to_login,
    };

    let mut view = state.doctor_service.list_doctors(&session).await;
    state
        .doctor_service
        .delete_doctor(&session, &mut view, &doctor_id)
        .await;
    Html(views::doctors_page(&view)).into_response()
}

pub async fn new_doctor_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    info!("GET /doctors/new");

    match require_session(&state, &headers).await {
        Ok(_) => Html(views::doctor_form_page(&state.doctor_service.open_new())).into_response(),
        Err(to_login) => to_login,
    }
}

pub async fn edit_doctor_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(doctor_id): Path<String>,
) -> Response {
    info!("GET /doctors/{}/edit", doctor_id);

    match require_session(&state, &headers).await {
        Ok(session) => {
            let view = state.doctor_service.open_edit(&session, &doctor_id).await;
            Html(views::doctor_form_page(&view)).into_response()
        }
        Err(to_login) => to_login,
    }
}

pub async fn create_doctor(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<DoctorForm>,
) -> Response {
    info!("POST /doctors/new");

    let session = submit_session(&state, &headers).await;
    let outcome = state
        .doctor_service
        .save_doctor(session.as_ref(), None, form)
        .await;
    respond(outcome, views::doctor_form_page)
}

pub async fn update_doctor(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(doctor_id): Path<String>,
    Form(form): Form<DoctorForm>,
) -> Response {
    info!("POST /doctors/{}/edit", doctor_id);

    let session = submit_session(&state, &headers).await;
    let outcome = state
        .doctor_service
        .save_doctor(session.as_ref(), Some(doctor_id), form)
        .await;
    respond(outcome, views::doctor_form_page)
}
