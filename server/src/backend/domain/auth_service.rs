//! Login, registration, sign-out and the home page.
//!
//! Sign-in and sign-out are published as [`AuthEvent`]s on a broadcast
//! channel. The home controller is the one place that reacts to them: it
//! keeps the latest home state per user.

use log::{error, info, warn};
use shared::{FormState, FormValidationError, HomeView, LoginForm, RegisterForm, Route, Session};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

use super::Outcome;
use crate::backend::storage::AuthBackend;

/// Minimum password length enforced before calling sign-up
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Auth-state changes
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn(Session),
    SignedOut { user_id: String },
}

/// Result of a login attempt
#[derive(Debug, Clone, PartialEq)]
pub enum LoginResult {
    SignedIn(Session),
    Rejected(FormState<LoginForm>),
}

#[derive(Clone)]
pub struct AuthService {
    auth: Arc<dyn AuthBackend>,
    events: broadcast::Sender<AuthEvent>,
    home_states: Arc<Mutex<HashMap<String, Outcome<HomeView>>>>,
}

impl AuthService {
    pub fn new(auth: Arc<dyn AuthBackend>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            auth,
            events,
            home_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Subscribe to auth-state changes
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: AuthEvent) {
        // No subscriber is not an error
        let _ = self.events.send(event);
    }

    pub async fn login(&self, form: LoginForm) -> LoginResult {
        info!("Signing in: {}", form.email.trim());

        if let Err(e) = self.validate_login(&form) {
            return LoginResult::Rejected(FormState::with_error(form, e.to_string()));
        }

        match self
            .auth
            .sign_in_with_password(form.email.trim(), &form.password)
            .await
        {
            Ok(session) => {
                info!("Signed in user {}", session.user_id());
                self.publish(AuthEvent::SignedIn(session.clone()));
                LoginResult::SignedIn(session)
            }
            Err(e) => {
                warn!("Sign in failed for {}: {}", form.email.trim(), e);
                let message = e.user_message();
                LoginResult::Rejected(FormState::with_error(form, message))
            }
        }
    }

    pub async fn register(&self, form: RegisterForm) -> Outcome<FormState<RegisterForm>> {
        info!("Registering: {}", form.email.trim());

        if let Err(e) = self.validate_registration(&form) {
            return Outcome::Render(FormState::with_error(form, e.to_string()));
        }

        match self.auth.sign_up(form.email.trim(), &form.password).await {
            Ok(()) => {
                info!("Registered {}", form.email.trim());
                Outcome::Navigate(Route::Login)
            }
            Err(e) => {
                error!("Sign up failed for {}: {}", form.email.trim(), e);
                let message = e.user_message();
                Outcome::Render(FormState::with_error(form, message))
            }
        }
    }

    /// Sign out always ends on the login page, even if the backend call fails
    pub async fn sign_out(&self, session: &Session) -> Route {
        info!("Signing out user {}", session.user_id());

        if let Err(e) = self.auth.sign_out(session).await {
            error!("Sign out failed for user {}: {}", session.user_id(), e);
        }
        self.publish(AuthEvent::SignedOut {
            user_id: session.user_id().to_string(),
        });
        Route::Login
    }

    pub fn home(&self, session: &Session) -> HomeView {
        HomeView {
            email: session.user.email.clone(),
        }
    }

    /// React to an auth-state change on the home page
    pub fn on_auth_state_change(&self, event: &AuthEvent) -> Outcome<HomeView> {
        match event {
            AuthEvent::SignedIn(session) => Outcome::Render(self.home(session)),
            AuthEvent::SignedOut { .. } => Outcome::Navigate(Route::Login),
        }
    }

    fn lock_home_states(&self) -> MutexGuard<'_, HashMap<String, Outcome<HomeView>>> {
        self.home_states
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the home state that follows an auth-state change
    pub fn apply_auth_event(&self, event: &AuthEvent) {
        let user_id = match event {
            AuthEvent::SignedIn(session) => session.user_id(),
            AuthEvent::SignedOut { user_id } => user_id.as_str(),
        };
        let outcome = self.on_auth_state_change(event);
        match &outcome {
            Outcome::Render(view) => info!(
                "Auth state: user {} signed in as {}",
                user_id,
                view.email.as_deref().unwrap_or("unknown")
            ),
            Outcome::Navigate(route) => {
                info!("Auth state: user {} signed out, next stop {}", user_id, route)
            }
        }
        self.lock_home_states().insert(user_id.to_string(), outcome);
    }

    /// Latest home state seen for a user, if any auth event arrived for them
    pub fn home_state(&self, user_id: &str) -> Option<Outcome<HomeView>> {
        self.lock_home_states().get(user_id).cloned()
    }

    /// Consume auth events until the channel closes. Spawned once at startup.
    pub async fn watch_auth_events(self, mut events: broadcast::Receiver<AuthEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => self.apply_auth_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Auth event watcher skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    fn validate_login(&self, form: &LoginForm) -> Result<(), FormValidationError> {
        if form.email.trim().is_empty() {
            return Err(FormValidationError::EmailRequired);
        }
        if form.password.is_empty() {
            return Err(FormValidationError::PasswordRequired);
        }
        Ok(())
    }

    fn validate_registration(&self, form: &RegisterForm) -> Result<(), FormValidationError> {
        if form.email.trim().is_empty() {
            return Err(FormValidationError::EmailRequired);
        }
        if form.password.is_empty() {
            return Err(FormValidationError::PasswordRequired);
        }
        if form.password.len() < MIN_PASSWORD_LENGTH {
            return Err(FormValidationError::PasswordTooShort(MIN_PASSWORD_LENGTH));
        }
        if form.password != form.confirm_password {
            return Err(FormValidationError::PasswordMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::InMemoryBackend;

    fn setup_test() -> (InMemoryBackend, AuthService) {
        let backend = InMemoryBackend::new();
        let service = AuthService::new(Arc::new(backend.clone()));
        (backend, service)
    }

    fn login_form(email: &str, password: &str) -> LoginForm {
        LoginForm {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn register_form(email: &str, password: &str, confirm: &str) -> RegisterForm {
        RegisterForm {
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_failure_shows_backend_message() {
        let (_, service) = setup_test();

        match service.login(login_form("wrong@example.com", "wrongpassword")).await {
            LoginResult::Rejected(state) => {
                assert_eq!(state.error.as_deref(), Some("Invalid login credentials"));
                assert_eq!(state.form.email, "wrong@example.com");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_success_publishes_event() {
        let (backend, service) = setup_test();
        backend.create_user("parent@example.com", "Password123!");
        let mut events = service.subscribe();

        let result = service.login(login_form("parent@example.com", "Password123!")).await;
        let LoginResult::SignedIn(session) = result else {
            panic!("expected sign in");
        };

        assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedIn(session));
    }

    #[tokio::test]
    async fn test_login_requires_fields() {
        let (_, service) = setup_test();
        let LoginResult::Rejected(state) = service.login(login_form("  ", "x")).await else {
            panic!("expected rejection");
        };
        assert_eq!(state.error.as_deref(), Some("Email is required"));
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (_, service) = setup_test();

        let outcome = service
            .register(register_form("new@example.com", "Password123!", "Password123!"))
            .await;
        assert_eq!(outcome, Outcome::Navigate(Route::Login));

        let result = service.login(login_form("new@example.com", "Password123!")).await;
        assert!(matches!(result, LoginResult::SignedIn(_)));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let (_, service) = setup_test();

        let outcome = service
            .register(register_form("new@example.com", "Password123!", "Password321!"))
            .await;
        assert_eq!(
            outcome.rendered().and_then(|s| s.error.as_deref()),
            Some("Passwords do not match")
        );

        let outcome = service.register(register_form("new@example.com", "abc", "abc")).await;
        assert_eq!(
            outcome.rendered().and_then(|s| s.error.as_deref()),
            Some("Password must be at least 6 characters")
        );
    }

    #[tokio::test]
    async fn test_register_duplicate_shows_backend_message() {
        let (backend, service) = setup_test();
        backend.create_user("taken@example.com", "Password123!");

        let outcome = service
            .register(register_form("taken@example.com", "Password123!", "Password123!"))
            .await;
        assert_eq!(
            outcome.rendered().and_then(|s| s.error.as_deref()),
            Some("User already registered")
        );
    }

    #[tokio::test]
    async fn test_sign_out_invalidates_session() {
        let (backend, service) = setup_test();
        let session = backend.create_user("parent@example.com", "Password123!");
        let mut events = service.subscribe();

        assert_eq!(service.sign_out(&session).await, Route::Login);
        assert_eq!(
            events.recv().await.unwrap(),
            AuthEvent::SignedOut {
                user_id: session.user_id().to_string()
            }
        );

        assert!(backend.get_session(&session.access_token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_home_reacts_to_auth_changes() {
        let (backend, service) = setup_test();
        let session = backend.create_user("parent@example.com", "Password123!");

        assert_eq!(
            service.on_auth_state_change(&AuthEvent::SignedIn(session)),
            Outcome::Render(HomeView {
                email: Some("parent@example.com".to_string())
            })
        );
        assert_eq!(
            service.on_auth_state_change(&AuthEvent::SignedOut {
                user_id: "u1".to_string()
            }),
            Outcome::Navigate(Route::Login)
        );
    }

    #[tokio::test]
    async fn test_watcher_tracks_home_state_per_user() {
        let (backend, service) = setup_test();
        backend.create_user("parent@example.com", "Password123!");
        let other = backend.create_user("other@example.com", "Password123!");
        let mut events = service.subscribe();

        let LoginResult::SignedIn(session) = service
            .login(login_form("parent@example.com", "Password123!"))
            .await
        else {
            panic!("expected sign in");
        };
        service.sign_out(&other).await;

        // The service still holds a sender, so feed the watcher from its own channel
        let (sender, receiver) = broadcast::channel(4);
        sender.send(events.recv().await.unwrap()).unwrap();
        sender.send(events.recv().await.unwrap()).unwrap();
        drop(sender);
        service.clone().watch_auth_events(receiver).await;

        assert_eq!(
            service.home_state(session.user_id()),
            Some(Outcome::Render(HomeView {
                email: Some("parent@example.com".to_string())
            }))
        );
        assert_eq!(
            service.home_state(other.user_id()),
            Some(Outcome::Navigate(Route::Login))
        );

        service.apply_auth_event(&AuthEvent::SignedOut {
            user_id: session.user_id().to_string(),
        });
        assert_eq!(
            service.home_state(session.user_id()),
            Some(Outcome::Navigate(Route::Login))
        );
        assert_eq!(service.home_state("nobody"), None);
    }
}
