use chrono::NaiveDate;
use log::{error, info, warn};
use shared::{
    parse_form_date, FormState, FormValidationError, MedicationForm, NewMedication, Route, Session,
};
use std::sync::Arc;

use super::{today, Outcome};
use crate::backend::storage::{insert_one, Table, TableStore};

/// Add-medication form for one child
#[derive(Clone)]
pub struct MedicationService {
    store: Arc<dyn TableStore>,
}

impl MedicationService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// A fresh form starting today, marked active
    pub fn open_form(&self) -> FormState<MedicationForm> {
        FormState::new(MedicationForm::opened(today()))
    }

    pub async fn add_medication(
        &self,
        session: Option<&Session>,
        child_id: &str,
        form: MedicationForm,
    ) -> Outcome<FormState<MedicationForm>> {
        info!("Adding medication for child {}: {}", child_id, form.name.trim());

        let (start_date, end_date) = match self.validate(&form) {
            Ok(dates) => dates,
            Err(e) => return Outcome::Render(FormState::with_error(form, e.to_string())),
        };
        let Some(session) = session else {
            warn!("No session at submit time, redirecting to login");
            return Outcome::Navigate(Route::Login);
        };

        // `active` is stored as entered; it is not derived from end_date
        let medication = NewMedication {
            user_id: session.user_id().to_string(),
            child_id: child_id.to_string(),
            name: form.name.trim().to_string(),
            dosage: form.dosage.trim().to_string(),
            frequency: form.frequency.trim().to_string(),
            start_date,
            end_date,
            active: form.active,
        };
        match insert_one(self.store.as_ref(), session, Table::Medications, &medication).await {
            Ok(()) => {
                info!("Added medication {} for child {}", medication.name, child_id);
                Outcome::Navigate(Route::Child(child_id.to_string()))
            }
            Err(e) => {
                error!("Failed to save medication for child {}: {}", child_id, e);
                Outcome::Render(FormState::with_error(
                    form,
                    "Failed to save medication. Please try again.",
                ))
            }
        }
    }

    fn validate(
        &self,
        form: &MedicationForm,
    ) -> Result<(NaiveDate, Option<NaiveDate>), FormValidationError> {
        if form.name.trim().is_empty() {
            return Err(FormValidationError::MedicationNameRequired);
        }
        let start_date = match parse_form_date(&form.start_date) {
            None => return Err(FormValidationError::StartDateRequired),
            Some(Err(_)) => return Err(FormValidationError::StartDateInvalid),
            Some(Ok(date)) => date,
        };
        let end_date = match parse_form_date(&form.end_date) {
            None => None,
            Some(Err(_)) => return Err(FormValidationError::EndDateInvalid),
            Some(Ok(date)) => Some(date),
        };
        Ok((start_date, end_date))
    }
}
