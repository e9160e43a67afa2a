use log::{debug, error};
use shared::{Route, Session};
use std::sync::Arc;

use super::Outcome;
use crate::backend::storage::AuthBackend;

/// Guards every protected page: resolves the caller's session or sends them
/// to the login page.
#[derive(Clone)]
pub struct SessionGate {
    auth: Arc<dyn AuthBackend>,
}

impl SessionGate {
    pub fn new(auth: Arc<dyn AuthBackend>) -> Self {
        Self { auth }
    }

    /// Ask the backend for the session behind an access token. A failed
    /// query is treated exactly like an absent session; there is no retry.
    pub async fn current_session(&self, access_token: Option<&str>) -> Option<Session> {
        let access_token = access_token?;

        match self.auth.get_session(access_token).await {
            Ok(Some(session)) => Some(session),
            Ok(None) => {
                debug!("Access token does not map to a session");
                None
            }
            Err(e) => {
                error!("Failed to query session: {}", e);
                None
            }
        }
    }

    /// `Render(session)` when signed in, otherwise navigate to `/login`
    pub async fn check(&self, access_token: Option<&str>) -> Outcome<Session> {
        match self.current_session(access_token).await {
            Some(session) => Outcome::Render(session),
            None => Outcome::Navigate(Route::Login),
        }
    }
}
