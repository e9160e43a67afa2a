use log::{error, info, warn};
use shared::{
    parse_allergies, parse_form_date, Child, ChildCard, ChildForm, FormState, FormValidationError,
    ListView, NewChild, Route, Session,
};
use std::sync::Arc;

use super::{today, Outcome};
use crate::backend::storage::{insert_one, select_as, Query, Table, TableStore};

/// Children list and the add-child form
#[derive(Clone)]
pub struct ChildService {
    store: Arc<dyn TableStore>,
}

impl ChildService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// All of the user's children, newest profile first
    pub async fn list_children(&self, session: &Session) -> ListView<ChildCard> {
        info!("Listing children for user {}", session.user_id());

        let query = Query::from(Table::Children).order("created_at", false);
        match select_as::<Child>(self.store.as_ref(), session, &query).await {
            Ok(children) => {
                info!("Found {} children", children.len());
                let today = today();
                ListView::loaded(
                    children
                        .into_iter()
                        .map(|child| ChildCard::from_child(child, today))
                        .collect(),
                )
            }
            Err(e) => {
                error!("Failed to load children: {}", e);
                ListView::failed("Failed to load children")
            }
        }
    }

    /// Delete one child and drop it from the list already on screen. The
    /// list is not fetched again.
    pub async fn delete_child(
        &self,
        session: &Session,
        view: &mut ListView<ChildCard>,
        child_id: &str,
    ) {
        info!("Deleting child: {}", child_id);

        match self.store.delete(session, Table::Children, child_id).await {
            Ok(()) => {
                if !view.remove(child_id) {
                    warn!("Deleted child {} was not in the list", child_id);
                }
                view.alert = None;
            }
            Err(e) => {
                error!("Failed to delete child {}: {}", child_id, e);
                view.confirm_delete = None;
                view.alert = Some("Failed to delete child profile".to_string());
            }
        }
    }

    pub fn open_form(&self) -> FormState<ChildForm> {
        FormState::new(ChildForm::default())
    }

    /// Validate and insert a child. The session is checked again right
    /// before the write; without one the user is sent to login.
    pub async fn create_child(
        &self,
        session: Option<&Session>,
        form: ChildForm,
    ) -> Outcome<FormState<ChildForm>> {
        info!("Creating child: name={}, dob={}", form.name.trim(), form.dob.trim());

        let new_child = match self.validate(&form) {
            Ok(dob) => dob,
            Err(e) => return Outcome::Render(FormState::with_error(form, e.to_string())),
        };
        let Some(session) = session else {
            warn!("No session at submit time, redirecting to login");
            return Outcome::Navigate(Route::Login);
        };

        let new_child = NewChild {
            user_id: session.user_id().to_string(),
            ..new_child
        };
        match insert_one(self.store.as_ref(), session, Table::Children, &new_child).await {
            Ok(()) => {
                info!("Created child: {}", new_child.name);
                Outcome::Navigate(Route::Children)
            }
            Err(e) => {
                error!("Failed to add child: {}", e);
                Outcome::Render(FormState::with_error(
                    form,
                    "Failed to add child. Please try again.",
                ))
            }
        }
    }

    /// Local checks. Returns the payload without its owner.
    fn validate(&self, form: &ChildForm) -> Result<NewChild, FormValidationError> {
        let name = form.name.trim();
        if name.is_empty() {
            return Err(FormValidationError::NameRequired);
        }

        let dob = match parse_form_date(&form.dob) {
            None => return Err(FormValidationError::DobRequired),
            Some(Err(_)) => return Err(FormValidationError::DobInvalid),
            Some(Ok(dob)) => dob,
        };
        if dob > today() {
            return Err(FormValidationError::DobInFuture);
        }

        Ok(NewChild {
            user_id: String::new(),
            name: name.to_string(),
            dob,
            allergies: parse_allergies(&form.allergies),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::{InMemoryBackend, Operation};
    use chrono::NaiveDate;

    fn setup_test() -> (InMemoryBackend, ChildService, Session) {
        let backend = InMemoryBackend::new();
        let service = ChildService::new(Arc::new(backend.clone()));
        let session = backend.create_user("parent@example.com", "Password123!");
        (backend, service, session)
    }

    fn form(name: &str, dob: &str, allergies: &str) -> ChildForm {
        ChildForm {
            name: name.to_string(),
            dob: dob.to_string(),
            allergies: allergies.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_list_child() {
        let (_, service, session) = setup_test();

        let outcome = service
            .create_child(Some(&session), form("Child One", "2020-01-01", "Milk"))
            .await;
        assert_eq!(outcome, Outcome::Navigate(Route::Children));

        let view = service.list_children(&session).await;
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].name, "Child One");
        assert_eq!(view.items[0].allergies, vec!["Milk"]);
        assert_eq!(view.items[0].dob, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(view.load_error, None);
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let (_, service, session) = setup_test();
        for name in ["Older", "Newer"] {
            service
                .create_child(Some(&session), form(name, "2019-05-05", ""))
                .await;
        }

        let view = service.list_children(&session).await;
        let names: Vec<&str> = view.items.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Newer", "Older"]);
    }

    #[tokio::test]
    async fn test_empty_list_is_not_an_error() {
        let (_, service, session) = setup_test();
        let view = service.list_children(&session).await;
        assert!(view.is_empty());
        assert_eq!(view.load_error, None);
    }

    #[tokio::test]
    async fn test_fetch_error_shows_empty_list_with_banner() {
        let (backend, service, session) = setup_test();
        service
            .create_child(Some(&session), form("Child One", "2020-01-01", ""))
            .await;
        backend.fail_next(Operation::Select(Table::Children));

        let view = service.list_children(&session).await;
        assert!(view.is_empty());
        assert_eq!(view.load_error.as_deref(), Some("Failed to load children"));
    }

    #[tokio::test]
    async fn test_future_dob_is_rejected_before_backend() {
        let (backend, service, session) = setup_test();

        let outcome = service
            .create_child(Some(&session), form("Baby", "2099-01-01", ""))
            .await;
        let state = outcome.rendered().expect("form should stay open");
        assert_eq!(state.error.as_deref(), Some("Date of birth cannot be in the future"));
        assert_eq!(state.form.name, "Baby");
        assert!(backend.rows(Table::Children).is_empty());
    }

    #[tokio::test]
    async fn test_validation_messages() {
        let (_, service, session) = setup_test();

        let outcome = service.create_child(Some(&session), form("   ", "2020-01-01", "")).await;
        assert_eq!(outcome.rendered().and_then(|s| s.error.as_deref()), Some("Name is required"));

        let outcome = service.create_child(Some(&session), form("Ada", "", "")).await;
        assert_eq!(
            outcome.rendered().and_then(|s| s.error.as_deref()),
            Some("Date of birth is required")
        );
    }

    #[tokio::test]
    async fn test_submit_without_session_redirects() {
        let (backend, service, _) = setup_test();

        let outcome = service.create_child(None, form("Ada", "2020-01-01", "")).await;
        assert_eq!(outcome, Outcome::Navigate(Route::Login));
        assert!(backend.rows(Table::Children).is_empty());
    }

    #[tokio::test]
    async fn test_insert_failure_keeps_form() {
        let (backend, service, session) = setup_test();
        backend.fail_next(Operation::Insert(Table::Children));

        let outcome = service
            .create_child(Some(&session), form("Ada", "2020-01-01", "Peanuts"))
            .await;
        let state = outcome.rendered().expect("form should stay open");
        assert_eq!(state.error.as_deref(), Some("Failed to add child. Please try again."));
        assert_eq!(state.form.allergies, "Peanuts");
    }

    #[tokio::test]
    async fn test_delete_removes_locally_without_refetch() {
        let (backend, service, session) = setup_test();
        for name in ["Ada", "Grace"] {
            service
                .create_child(Some(&session), form(name, "2020-01-01", ""))
                .await;
        }
        let mut view = service.list_children(&session).await;
        let ada = view.items.iter().find(|c| c.name == "Ada").unwrap().id.clone();
        let calls = backend.select_calls(Table::Children);

        service.delete_child(&session, &mut view, &ada).await;

        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].name, "Grace");
        assert_eq!(backend.select_calls(Table::Children), calls);
        assert_eq!(backend.rows(Table::Children).len(), 1);
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_row_and_alerts() {
        let (backend, service, session) = setup_test();
        service
            .create_child(Some(&session), form("Ada", "2020-01-01", ""))
            .await;
        let mut view = service.list_children(&session).await;
        let id = view.items[0].id.clone();
        view.confirm(&id);
        backend.fail_next(Operation::Delete(Table::Children));

        service.delete_child(&session, &mut view, &id).await;

        assert_eq!(view.items.len(), 1);
        assert_eq!(view.alert.as_deref(), Some("Failed to delete child profile"));
        assert_eq!(view.confirm_delete, None);
    }

    #[tokio::test]
    async fn test_other_users_children_are_hidden() {
        let (backend, service, session) = setup_test();
        service
            .create_child(Some(&session), form("Secret Child A", "2020-01-01", ""))
            .await;
        let other = backend.create_user("other@example.com", "Password123!");

        assert!(service.list_children(&other).await.is_empty());
    }
}
