//! # Domain Module
//!
//! The page controllers of the medical history tracker. Each controller
//! takes the caller's [`shared::Session`] explicitly, talks to the hosted
//! backend through the storage traits and returns a view state or a
//! navigation for the shell to act on.
//!
//! ## Module Organization
//!
//! - **session_gate**: resolves the current session or redirects to login
//! - **auth_service**: login, registration, sign-out, home page
//! - **child_service**: children list and add-child form
//! - **child_dashboard**: one child with visits and medications
//! - **doctor_service**: doctors list and add/edit form
//! - **visit_service**: log-visit form
//! - **medication_service**: add-medication form
//!
//! ## Error Handling
//!
//! Storage errors never leave a controller. A missing session is always a
//! redirect to `/login`. Failed collection fetches become an empty list with
//! a banner, a missing parent row becomes "not found", and failed mutations
//! become a message on the still-editable form or list. Validation errors
//! never reach the backend.

use chrono::{Local, NaiveDate};

pub mod auth_service;
pub mod child_dashboard;
pub mod child_service;
pub mod doctor_service;
pub mod medication_service;
pub mod outcome;
pub mod session_gate;
pub mod visit_service;

pub use auth_service::{AuthEvent, AuthService, LoginResult};
pub use child_dashboard::ChildDashboardService;
pub use child_service::ChildService;
pub use doctor_service::DoctorService;
pub use medication_service::MedicationService;
pub use outcome::Outcome;
pub use session_gate::SessionGate;
pub use visit_service::VisitService;

/// The local calendar date, used for age display and form defaults
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
