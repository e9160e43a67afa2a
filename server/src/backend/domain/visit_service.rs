use log::{error, info, warn};
use shared::{parse_form_date, FormState, FormValidationError, NewVisit, Route, Session, VisitForm};
use std::sync::Arc;

use super::{today, Outcome};
use crate::backend::storage::{insert_one, Table, TableStore};

/// Log-visit form for one child
#[derive(Clone)]
pub struct VisitService {
    store: Arc<dyn TableStore>,
}

impl VisitService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// A fresh form dated today
    pub fn open_form(&self) -> FormState<VisitForm> {
        FormState::new(VisitForm::opened(today()))
    }

    pub async fn log_visit(
        &self,
        session: Option<&Session>,
        child_id: &str,
        form: VisitForm,
    ) -> Outcome<FormState<VisitForm>> {
        info!("Logging visit for child {}: date={}", child_id, form.date.trim());

        let date = match self.validate(&form) {
            Ok(date) => date,
            Err(e) => return Outcome::Render(FormState::with_error(form, e.to_string())),
        };
        let Some(session) = session else {
            warn!("No session at submit time, redirecting to login");
            return Outcome::Navigate(Route::Login);
        };

        let visit = NewVisit {
            user_id: session.user_id().to_string(),
            child_id: child_id.to_string(),
            date,
            reason: form.reason.trim().to_string(),
            diagnosis: form.diagnosis.trim().to_string(),
            notes: form.notes.trim().to_string(),
        };
        match insert_one(self.store.as_ref(), session, Table::Visits, &visit).await {
            Ok(()) => {
                info!("Logged visit for child {}", child_id);
                Outcome::Navigate(Route::Child(child_id.to_string()))
            }
            Err(e) => {
                error!("Failed to log visit for child {}: {}", child_id, e);
                Outcome::Render(FormState::with_error(
                    form,
                    "Failed to log visit. Please try again.",
                ))
            }
        }
    }

    fn validate(&self, form: &VisitForm) -> Result<chrono::NaiveDate, FormValidationError> {
        let date = match parse_form_date(&form.date) {
            None => return Err(FormValidationError::VisitDateRequired),
            Some(Err(_)) => return Err(FormValidationError::VisitDateInvalid),
            Some(Ok(date)) => date,
        };
        if form.reason.trim().is_empty() {
            return Err(FormValidationError::ReasonRequired);
        }
        Ok(date)
    }
}
