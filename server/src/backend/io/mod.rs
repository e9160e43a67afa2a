//! # IO Module
//!
//! The HTTP shell around the domain controllers: axum handlers in
//! [`rest`] and the server-rendered HTML in [`views`].
//!
//! ## Pages
//!
//! - `GET/POST /login`, `GET/POST /register`, `GET /`, `POST /logout`
//! - `GET /children`, `GET/POST /children/new`, `GET /children/:id`,
//!   `POST /children/:id/delete`
//! - `GET/POST /children/:id/visits/new`, `GET/POST /children/:id/medications/new`
//! - `GET /doctors`, `GET/POST /doctors/new`, `GET/POST /doctors/:id/edit`,
//!   `POST /doctors/:id/delete`
//!
//! Protected pages redirect to `/login` without a valid session cookie.

pub mod rest;
pub mod views;

pub use rest::*;
