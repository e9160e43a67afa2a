use log::{error, info, warn};
use shared::{
    Doctor, DoctorForm, DoctorFormView, FormState, FormValidationError, ListView, NewDoctor, Route,
    Session,
};
use std::sync::Arc;

use super::Outcome;
use crate::backend::storage::{
    insert_one, select_as, single_as, update_by_id, Query, StorageResult, Table, TableStore,
};

/// Doctors list and the add/edit doctor form
#[derive(Clone)]
pub struct DoctorService {
    store: Arc<dyn TableStore>,
}

impl DoctorService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// The user's doctors in name order
    pub async fn list_doctors(&self, session: &Session) -> ListView<Doctor> {
        info!("Listing doctors for user {}", session.user_id());

        let query = Query::from(Table::Doctors).order("name", true);
        match select_as::<Doctor>(self.store.as_ref(), session, &query).await {
            Ok(doctors) => {
                info!("Found {} doctors", doctors.len());
                ListView::loaded(doctors)
            }
            Err(e) => {
                error!("Failed to load doctors: {}", e);
                ListView::failed("Failed to load doctors")
            }
        }
    }

    /// Delete one doctor and drop it from the list already on screen
    pub async fn delete_doctor(
        &self,
        session: &Session,
        view: &mut ListView<Doctor>,
        doctor_id: &str,
    ) {
        info!("Deleting doctor: {}", doctor_id);

        match self.store.delete(session, Table::Doctors, doctor_id).await {
            Ok(()) => {
                if !view.remove(doctor_id) {
                    warn!("Deleted doctor {} was not in the list", doctor_id);
                }
                view.alert = None;
            }
            Err(e) => {
                error!("Failed to delete doctor {}: {}", doctor_id, e);
                view.confirm_delete = None;
                view.alert = Some("Failed to delete doctor".to_string());
            }
        }
    }

    pub fn open_new(&self) -> DoctorFormView {
        DoctorFormView::default()
    }

    /// Edit mode: prefill from the stored row
    pub async fn open_edit(&self, session: &Session, doctor_id: &str) -> DoctorFormView {
        info!("Loading doctor {} for editing", doctor_id);

        let query = Query::from(Table::Doctors).eq("id", doctor_id);
        let state = match single_as::<Doctor>(self.store.as_ref(), session, &query).await {
            Ok(doctor) => FormState::new(DoctorForm::from_doctor(&doctor)),
            Err(e) => {
                error!("Failed to load doctor {}: {}", doctor_id, e);
                FormState::with_error(DoctorForm::default(), "Failed to load doctor details.")
            }
        };

        DoctorFormView {
            doctor_id: Some(doctor_id.to_string()),
            state,
        }
    }

    /// Update when `doctor_id` is set, insert otherwise
    pub async fn save_doctor(
        &self,
        session: Option<&Session>,
        doctor_id: Option<String>,
        form: DoctorForm,
    ) -> Outcome<DoctorFormView> {
        info!("Saving doctor: name={}, id={:?}", form.name.trim(), doctor_id);

        if let Err(e) = self.validate(&form) {
            return Outcome::Render(DoctorFormView {
                doctor_id,
                state: FormState::with_error(form, e.to_string()),
            });
        }
        let Some(session) = session else {
            warn!("No session at submit time, redirecting to login");
            return Outcome::Navigate(Route::Login);
        };

        match self.write(session, doctor_id.as_deref(), &form).await {
            Ok(()) => Outcome::Navigate(Route::Doctors),
            Err(e) => {
                error!("Failed to save doctor: {}", e);
                Outcome::Render(DoctorFormView {
                    doctor_id,
                    state: FormState::with_error(
                        form,
                        "Failed to save doctor details. Please try again.",
                    ),
                })
            }
        }
    }

    async fn write(
        &self,
        session: &Session,
        doctor_id: Option<&str>,
        form: &DoctorForm,
    ) -> StorageResult<()> {
        let doctor = NewDoctor {
            user_id: session.user_id().to_string(),
            name: form.name.trim().to_string(),
            specialty: form.specialty.trim().to_string(),
            phone: form.phone.trim().to_string(),
            email: form.email.trim().to_string(),
            address: form.address.trim().to_string(),
            notes: form.notes.trim().to_string(),
        };

        match doctor_id {
            Some(id) => {
                update_by_id(self.store.as_ref(), session, Table::Doctors, id, &doctor).await?;
                info!("Updated doctor {}", id);
            }
            None => {
                insert_one(self.store.as_ref(), session, Table::Doctors, &doctor).await?;
                info!("Created doctor {}", doctor.name);
            }
        }
        Ok(())
    }

    fn validate(&self, form: &DoctorForm) -> Result<(), FormValidationError> {
        if form.name.trim().is_empty() {
            return Err(FormValidationError::DoctorNameRequired);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::{InMemoryBackend, Operation};

    fn setup_test() -> (InMemoryBackend, DoctorService, Session) {
        let backend = InMemoryBackend::new();
        let service = DoctorService::new(Arc::new(backend.clone()));
        let session = backend.create_user("parent@example.com", "Password123!");
        (backend, service, session)
    }

    fn form(name: &str, specialty: &str) -> DoctorForm {
        DoctorForm {
            name: name.to_string(),
            specialty: specialty.to_string(),
            phone: " 555-0100 ".to_string(),
            ..DoctorForm::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_list_in_name_order() {
        let (_, service, session) = setup_test();
        for name in ["Dr. Zhou", "Dr. Adams"] {
            let outcome = service.save_doctor(Some(&session), None, form(name, "Pediatrics")).await;
            assert_eq!(outcome, Outcome::Navigate(Route::Doctors));
        }

        let view = service.list_doctors(&session).await;
        let names: Vec<&str> = view.items.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Dr. Adams", "Dr. Zhou"]);
        assert_eq!(view.items[0].phone.as_deref(), Some("555-0100"));
    }

    #[tokio::test]
    async fn test_edit_prefills_and_updates() {
        let (backend, service, session) = setup_test();
        service.save_doctor(Some(&session), None, form("Dr. Adams", "Pediatrics")).await;
        let id = service.list_doctors(&session).await.items[0].id.clone();

        let view = service.open_edit(&session, &id).await;
        assert_eq!(view.doctor_id.as_deref(), Some(id.as_str()));
        assert_eq!(view.state.form.specialty, "Pediatrics");
        assert_eq!(view.state.error, None);

        let mut edited = view.state.form;
        edited.specialty = "Allergy".to_string();
        let outcome = service.save_doctor(Some(&session), Some(id.clone()), edited).await;
        assert_eq!(outcome, Outcome::Navigate(Route::Doctors));

        let doctors = service.list_doctors(&session).await;
        assert_eq!(doctors.items.len(), 1);
        assert_eq!(doctors.items[0].specialty.as_deref(), Some("Allergy"));
        assert_eq!(backend.rows(Table::Doctors).len(), 1);
    }

    #[tokio::test]
    async fn test_edit_load_failure() {
        let (_, service, session) = setup_test();

        let view = service.open_edit(&session, "missing").await;
        assert_eq!(view.state.error.as_deref(), Some("Failed to load doctor details."));
        assert_eq!(view.doctor_id.as_deref(), Some("missing"));
    }

    #[tokio::test]
    async fn test_name_required() {
        let (backend, service, session) = setup_test();

        let outcome = service.save_doctor(Some(&session), None, form("  ", "Pediatrics")).await;
        let view = outcome.rendered().expect("form should stay open");
        assert_eq!(view.state.error.as_deref(), Some("Doctor name is required"));
        assert_eq!(view.state.form.specialty, "Pediatrics");
        assert!(backend.rows(Table::Doctors).is_empty());
    }

    #[tokio::test]
    async fn test_save_failure_keeps_form() {
        let (backend, service, session) = setup_test();
        backend.fail_next(Operation::Insert(Table::Doctors));

        let outcome = service.save_doctor(Some(&session), None, form("Dr. Adams", "")).await;
        assert_eq!(
            outcome.rendered().and_then(|v| v.state.error.as_deref()),
            Some("Failed to save doctor details. Please try again.")
        );
    }

    #[tokio::test]
    async fn test_submit_without_session_redirects() {
        let (_, service, _) = setup_test();
        let outcome = service.save_doctor(None, None, form("Dr. Adams", "")).await;
        assert_eq!(outcome, Outcome::Navigate(Route::Login));
    }

    #[tokio::test]
    async fn test_delete_without_refetch_and_failure_alert() {
        let (backend, service, session) = setup_test();
        for name in ["Dr. Adams", "Dr. Zhou"] {
            service.save_doctor(Some(&session), None, form(name, "")).await;
        }
        let mut view = service.list_doctors(&session).await;
        let adams = view.items[0].id.clone();
        let zhou = view.items[1].id.clone();
        let calls = backend.select_calls(Table::Doctors);

        service.delete_doctor(&session, &mut view, &adams).await;
        assert_eq!(view.items.len(), 1);
        assert_eq!(backend.select_calls(Table::Doctors), calls);

        backend.fail_next(Operation::Delete(Table::Doctors));
        service.delete_doctor(&session, &mut view, &zhou).await;
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.alert.as_deref(), Some("Failed to delete doctor"));
    }

    #[tokio::test]
    async fn test_fetch_error_banner() {
        let (backend, service, session) = setup_test();
        backend.fail_next(Operation::Select(Table::Doctors));

        let view = service.list_doctors(&session).await;
        assert!(view.is_empty());
        assert_eq!(view.load_error.as_deref(), Some("Failed to load doctors"));
    }
}
