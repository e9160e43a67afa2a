pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use log::info;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::backend::config::AppConfig;
use crate::backend::domain::{
    AuthService, ChildDashboardService, ChildService, DoctorService, MedicationService,
    SessionGate, VisitService,
};
use crate::backend::storage::{AuthBackend, InMemoryBackend, SupabaseClient, TableStore};

#[derive(Clone)]
pub struct AppState {
    pub session_gate: SessionGate,
    pub auth_service: AuthService,
    pub child_service: ChildService,
    pub child_dashboard: ChildDashboardService,
    pub doctor_service: DoctorService,
    pub visit_service: VisitService,
    pub medication_service: MedicationService,
    pub cookie_secure: bool,
}

impl AppState {
    /// Wire every controller to one backend
    pub fn new(
        auth: Arc<dyn AuthBackend>,
        store: Arc<dyn TableStore>,
        cookie_secure: bool,
    ) -> Self {
        Self {
            session_gate: SessionGate::new(auth.clone()),
            auth_service: AuthService::new(auth),
            child_service: ChildService::new(store.clone()),
            child_dashboard: ChildDashboardService::new(store.clone()),
            doctor_service: DoctorService::new(store.clone()),
            visit_service: VisitService::new(store.clone()),
            medication_service: MedicationService::new(store),
            cookie_secure,
        }
    }
}

pub fn initialize_backend(config: &AppConfig, in_memory: bool) -> Result<AppState> {
    if in_memory {
        info!("Using the in-memory backend");
        let backend = InMemoryBackend::new();
        return Ok(AppState::new(
            Arc::new(backend.clone()),
            Arc::new(backend),
            config.cookie_secure,
        ));
    }

    info!("Connecting to Supabase at {}", config.supabase_url);
    let client = SupabaseClient::new(&config.supabase_url, &config.supabase_anon_key)?;
    let client = Arc::new(client);

    info!("Setting up application state");
    Ok(AppState::new(client.clone(), client, config.cookie_secure))
}

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(io::auth_apis::home))
        .route("/login", get(io::auth_apis::login_page).post(io::auth_apis::login))
        .route(
            "/register",
            get(io::auth_apis::register_page).post(io::auth_apis::register),
        )
        .route("/logout", post(io::auth_apis::logout))
        .route("/children", get(io::child_apis::list_children))
        .route(
            "/children/new",
            get(io::child_apis::new_child_page).post(io::child_apis::create_child),
        )
        .route("/children/:id", get(io::child_apis::child_dashboard))
        .route("/children/:id/delete", post(io::child_apis::delete_child))
        .route(
            "/children/:id/visits/new",
            get(io::visit_apis::new_visit_page).post(io::visit_apis::log_visit),
        )
        .route(
            "/children/:id/medications/new",
            get(io::medication_apis::new_medication_page).post(io::medication_apis::add_medication),
        )
        .route("/doctors", get(io::doctor_apis::list_doctors))
        .route(
            "/doctors/new",
            get(io::doctor_apis::new_doctor_page).post(io::doctor_apis::create_doctor),
        )
        .route(
            "/doctors/:id/edit",
            get(io::doctor_apis::edit_doctor_page).post(io::doctor_apis::update_doctor),
        )
        .route("/doctors/:id/delete", post(io::doctor_apis::delete_doctor))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
