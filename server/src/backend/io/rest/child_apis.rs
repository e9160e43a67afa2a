//! # Child Pages
//!
//! Children list with delete confirmation, the add-child form and the child
//! dashboard.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
    Form,
};
use log::info;
use serde::Deserialize;
use shared::ChildForm;

use super::{require_session, respond, submit_session, ListParams};
use crate::backend::io::views::{self, Tab};
use crate::backend::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    pub tab: Option<String>,
}

pub async fn list_children(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Response {
    info!("GET /children");

    let session = match require_session(&state, &headers).await {
        Ok(session) => session,
        Err(to_login) => return to_login,
    };

    let mut view = state.child_service.list_children(&session).await;
    if let Some(id) = params.confirm_delete.as_deref() {
        view.confirm(id);
    }
    Html(views::children_page(&view)).into_response()
}

/// Confirmed delete. The list fetched here is the one shown afterwards.
pub async fn delete_child(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(child_id): Path<String>,
) -> Response {
    info!("POST /children/{}/delete", child_id);

    let session = match require_session(&state, &headers).await {
        Ok(session) => session,
        Err(to_login) => return to_login,
    };

    let mut view = state.child_service.list_children(&session).await;
    state
        .child_service
        .delete_child(&session, &mut view, &child_id)
        .await;
    Html(views::children_page(&view)).into_response()
}

pub async fn new_child_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    info!("GET /children/new");

    match require_session(&state, &headers).await {
        Ok(_) => Html(views::child_form_page(&state.child_service.open_form())).into_response(),
        Err(to_login) => to_login,
    }
}

pub async fn create_child(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ChildForm>,
) -> Response {
    info!("POST /children/new");

    let session = submit_session(&state, &headers).await;
    let outcome = state.child_service.create_child(session.as_ref(), form).await;
    respond(outcome, views::child_form_page)
}

pub async fn child_dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(child_id): Path<String>,
    Query(params): Query<DashboardParams>,
) -> Response {
    info!("GET /children/{}", child_id);

    let session = match require_session(&state, &headers).await {
        Ok(session) => session,
        Err(to_login) => return to_login,
    };

    let detail = state.child_dashboard.load(&session, &child_id).await;
    let tab = Tab::from_param(params.tab.as_deref());
    Html(views::child_detail_page(&detail, tab)).into_response()
}
