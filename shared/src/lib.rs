use chrono::{Datelike, Local, NaiveDate};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Authenticated user as reported by the hosted auth service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// An active login. Threaded explicitly into every controller call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: User,
}

impl Session {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

/// A child profile row (`children` table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Child {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub name: String,
    pub dob: NaiveDate, // ISO 8601 date format (YYYY-MM-DD)
    #[serde(default, deserialize_with = "null_as_default")]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>, // RFC 3339 timestamp, set by the backend
}

/// Insert payload for `children`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChild {
    pub user_id: String,
    pub name: String,
    pub dob: NaiveDate,
    pub allergies: Vec<String>,
}

/// A doctor / medical contact row (`doctors` table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Insert and update payload for `doctors`. Optional fields are sent trimmed,
/// possibly empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDoctor {
    pub user_id: String,
    pub name: String,
    pub specialty: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub notes: String,
}

/// A doctor visit row (`visits` table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub child_id: String,
    pub date: NaiveDate,
    pub reason: String,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Insert payload for `visits`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVisit {
    pub user_id: String,
    pub child_id: String,
    pub date: NaiveDate,
    pub reason: String,
    pub diagnosis: String,
    pub notes: String,
}

/// A medication row (`medications` table). `active` is explicit and is not
/// derived from `end_date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub child_id: String,
    pub name: String,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub active: bool,
}

/// Insert payload for `medications`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMedication {
    pub user_id: String,
    pub child_id: String,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub active: bool,
}

/// Raw input of the add-child form, exactly as typed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChildForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dob: String,
    /// Comma separated free text
    #[serde(default)]
    pub allergies: String,
}

/// Raw input of the add/edit doctor form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DoctorForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub specialty: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub notes: String,
}

impl DoctorForm {
    /// Prefill the form from a stored doctor (edit mode)
    pub fn from_doctor(doctor: &Doctor) -> Self {
        Self {
            name: doctor.name.clone(),
            specialty: doctor.specialty.clone().unwrap_or_default(),
            phone: doctor.phone.clone().unwrap_or_default(),
            email: doctor.email.clone().unwrap_or_default(),
            address: doctor.address.clone().unwrap_or_default(),
            notes: doctor.notes.clone().unwrap_or_default(),
        }
    }
}

/// Raw input of the log-visit form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitForm {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub notes: String,
}

impl VisitForm {
    /// A fresh form; the visit date defaults to today
    pub fn opened(today: NaiveDate) -> Self {
        Self {
            date: today.format("%Y-%m-%d").to_string(),
            ..Self::default()
        }
    }
}

/// Raw input of the add-medication form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MedicationForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    /// HTML checkboxes are omitted from the body when unchecked
    #[serde(default, deserialize_with = "checkbox")]
    pub active: bool,
}

impl MedicationForm {
    /// A fresh form; starts today and is active
    pub fn opened(today: NaiveDate) -> Self {
        Self {
            start_date: today.format("%Y-%m-%d").to_string(),
            active: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// A form plus the single error line shown under it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormState<F> {
    pub form: F,
    pub error: Option<String>,
}

impl<F> FormState<F> {
    pub fn new(form: F) -> Self {
        Self { form, error: None }
    }

    /// Keep the user's input and attach an error message
    pub fn with_error(form: F, error: impl Into<String>) -> Self {
        Self {
            form,
            error: Some(error.into()),
        }
    }
}

/// The doctor form knows whether it edits an existing row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DoctorFormView {
    pub doctor_id: Option<String>,
    pub state: FormState<DoctorForm>,
}

/// Rows that can be removed from a rendered list by id
pub trait Identified {
    fn id(&self) -> &str;
}

impl Identified for Doctor {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Card shown for each child on the children list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildCard {
    pub id: String,
    pub name: String,
    pub dob: NaiveDate,
    pub age: i32,
    pub allergies: Vec<String>,
}

impl ChildCard {
    pub fn from_child(child: Child, today: NaiveDate) -> Self {
        Self {
            age: calculate_age(child.dob, today),
            id: child.id,
            name: child.name,
            dob: child.dob,
            allergies: child.allergies,
        }
    }
}

impl Identified for ChildCard {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Rendered state of a list page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListView<T> {
    pub items: Vec<T>,
    /// Non-blocking banner when the fetch failed (the list is then empty)
    pub load_error: Option<String>,
    /// Blocking alert, e.g. a failed delete
    pub alert: Option<String>,
    /// Row id whose delete confirmation dialog is open
    pub confirm_delete: Option<String>,
}

impl<T: Identified> ListView<T> {
    pub fn loaded(items: Vec<T>) -> Self {
        Self {
            items,
            load_error: None,
            alert: None,
            confirm_delete: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            load_error: Some(message.into()),
            alert: None,
            confirm_delete: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Open the confirmation dialog, only for a row that is actually shown
    pub fn confirm(&mut self, id: &str) {
        self.confirm_delete = self.find(id).map(|item| item.id().to_string());
    }

    pub fn find(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Drop one row from local state. Returns whether it was present.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id() != id);
        self.confirm_delete = None;
        self.items.len() != before
    }
}

/// Everything the child dashboard renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildDashboard {
    pub child: ChildCard,
    /// Ordered by date, most recent first
    pub visits: Vec<Visit>,
    /// Ordered by start date, most recent first
    pub medications: Vec<Medication>,
    pub visits_error: Option<String>,
    pub medications_error: Option<String>,
}

impl ChildDashboard {
    /// Number of visits on the overview tab
    pub const RECENT_VISITS: usize = 3;

    pub fn recent_visits(&self) -> &[Visit] {
        let end = self.visits.len().min(Self::RECENT_VISITS);
        &self.visits[..end]
    }

    pub fn active_medications(&self) -> Vec<&Medication> {
        self.medications.iter().filter(|m| m.active).collect()
    }
}

/// Result of loading the child detail page. "Not found" covers both a
/// missing row and a row hidden by row-level isolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChildDetail {
    NotFound,
    Found(Box<ChildDashboard>),
}

/// Home page state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeView {
    pub email: Option<String>,
}

/// Every user-facing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    Login,
    Register,
    Home,
    Children,
    NewChild,
    Child(String),
    NewVisit(String),
    NewMedication(String),
    Doctors,
    NewDoctor,
    EditDoctor(String),
}

/// Characters escaped inside one path segment or query value
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'/')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encode an id for use as a single URL path segment or query value
pub fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Home => "/".to_string(),
            Route::Children => "/children".to_string(),
            Route::NewChild => "/children/new".to_string(),
            Route::Child(id) => format!("/children/{}", encode_segment(id)),
            Route::NewVisit(child_id) => {
                format!("/children/{}/visits/new", encode_segment(child_id))
            }
            Route::NewMedication(child_id) => format!(
                "/children/{}/medications/new",
                encode_segment(child_id)
            ),
            Route::Doctors => "/doctors".to_string(),
            Route::NewDoctor => "/doctors/new".to_string(),
            Route::EditDoctor(id) => format!("/doctors/{}/edit", encode_segment(id)),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Local validation failures. The Display text is what the form shows.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValidationError {
    NameRequired,
    DobRequired,
    DobInvalid,
    DobInFuture,
    DoctorNameRequired,
    VisitDateRequired,
    VisitDateInvalid,
    ReasonRequired,
    MedicationNameRequired,
    StartDateRequired,
    StartDateInvalid,
    EndDateInvalid,
    EmailRequired,
    PasswordRequired,
    PasswordTooShort(usize),
    PasswordMismatch,
}

impl fmt::Display for FormValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormValidationError::NameRequired => write!(f, "Name is required"),
            FormValidationError::DobRequired => write!(f, "Date of birth is required"),
            FormValidationError::DobInvalid => write!(f, "Date of birth must be a valid date"),
            FormValidationError::DobInFuture => write!(f, "Date of birth cannot be in the future"),
            FormValidationError::DoctorNameRequired => write!(f, "Doctor name is required"),
            FormValidationError::VisitDateRequired => write!(f, "Date is required"),
            FormValidationError::VisitDateInvalid => write!(f, "Date must be a valid date"),
            FormValidationError::ReasonRequired => write!(f, "Reason for visit is required"),
            FormValidationError::MedicationNameRequired => write!(f, "Medication name is required"),
            FormValidationError::StartDateRequired => write!(f, "Start date is required"),
            FormValidationError::StartDateInvalid => write!(f, "Start date must be a valid date"),
            FormValidationError::EndDateInvalid => write!(f, "End date must be a valid date"),
            FormValidationError::EmailRequired => write!(f, "Email is required"),
            FormValidationError::PasswordRequired => write!(f, "Password is required"),
            FormValidationError::PasswordTooShort(min) => {
                write!(f, "Password must be at least {} characters", min)
            }
            FormValidationError::PasswordMismatch => write!(f, "Passwords do not match"),
        }
    }
}

impl std::error::Error for FormValidationError {}

/// Age in whole years on `today`: the year difference, minus one when this
/// year's birthday has not come yet. Birth dates after `today` give negative
/// ages instead of an error.
pub fn calculate_age(dob: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    age
}

/// [`calculate_age`] against the local calendar date
pub fn calculate_age_today(dob: NaiveDate) -> i32 {
    calculate_age(dob, Local::now().date_naive())
}

/// Split comma separated allergies, trimming and dropping empty entries
pub fn parse_allergies(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|allergy| !allergy.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a `YYYY-MM-DD` form value. `None` when blank.
pub fn parse_form_date(value: &str) -> Option<Result<NaiveDate, chrono::ParseError>> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(NaiveDate::parse_from_str(value, "%Y-%m-%d"))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn checkbox<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Bool(value) => value,
        Raw::Text(value) => matches!(value.as_str(), "on" | "true" | "1" | "yes"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_on_anniversary() {
        let today = date(2026, 10, 18);
        assert_eq!(calculate_age(date(2021, 10, 18), today), 5);
        assert_eq!(calculate_age(date(2016, 9, 18), today), 10);
    }

    #[test]
    fn test_age_before_birthday() {
        let today = date(2026, 10, 18);
        // One day short of the anniversary
        assert_eq!(calculate_age(date(2021, 10, 19), today), 4);
        // Later month
        assert_eq!(calculate_age(date(2021, 11, 18), today), 4);
    }

    #[test]
    fn test_age_born_today() {
        let today = date(2026, 10, 18);
        assert_eq!(calculate_age(today, today), 0);
    }

    #[test]
    fn test_age_future_dob_is_negative() {
        let today = date(2026, 10, 18);
        assert_eq!(calculate_age(date(2027, 10, 18), today), -1);
        assert_eq!(calculate_age(date(2027, 10, 19), today), -2);
        assert_eq!(calculate_age(date(2026, 10, 19), today), -1);
    }

    #[test]
    fn test_age_leap_day_birthday() {
        let dob = date(2020, 2, 29);
        assert_eq!(calculate_age(dob, date(2025, 2, 28)), 4);
        assert_eq!(calculate_age(dob, date(2025, 3, 1)), 5);
        assert_eq!(calculate_age(dob, date(2024, 2, 29)), 4);
    }

    #[test]
    fn test_age_today_uses_local_date() {
        let today = Local::now().date_naive();
        assert_eq!(calculate_age_today(today), 0);
    }

    #[test]
    fn test_parse_allergies() {
        assert_eq!(
            parse_allergies("Peanuts, Strawberries"),
            vec!["Peanuts".to_string(), "Strawberries".to_string()]
        );
        assert_eq!(parse_allergies(" Milk ,, ,Eggs,"), vec!["Milk", "Eggs"]);
        assert!(parse_allergies("").is_empty());
        assert!(parse_allergies(" , ").is_empty());
    }

    #[test]
    fn test_parse_form_date() {
        assert!(parse_form_date("").is_none());
        assert!(parse_form_date("   ").is_none());
        assert_eq!(parse_form_date("2020-05-20"), Some(Ok(date(2020, 5, 20))));
        assert!(matches!(parse_form_date("2020-13-01"), Some(Err(_))));
        assert!(matches!(parse_form_date("20/05/2020"), Some(Err(_))));
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::Home.path(), "/");
        assert_eq!(Route::Login.to_string(), "/login");
        assert_eq!(Route::Child("abc".to_string()).path(), "/children/abc");
        assert_eq!(
            Route::NewVisit("abc".to_string()).path(),
            "/children/abc/visits/new"
        );
        assert_eq!(
            Route::NewMedication("abc".to_string()).path(),
            "/children/abc/medications/new"
        );
        assert_eq!(Route::EditDoctor("d1".to_string()).path(), "/doctors/d1/edit");
    }

    #[test]
    fn test_route_ids_are_encoded() {
        assert_eq!(Route::Child("\n".to_string()).path(), "/children/%0A");
        assert_eq!(
            Route::NewVisit("a?b".to_string()).path(),
            "/children/a%3Fb/visits/new"
        );
        assert_eq!(
            Route::EditDoctor("x/y z".to_string()).path(),
            "/doctors/x%2Fy%20z/edit"
        );
        assert_eq!(encode_segment("a&b=c+d"), "a%26b%3Dc%2Bd");
        assert_eq!(
            encode_segment("6f1c2d3e-0000-4000-8000-000000000001"),
            "6f1c2d3e-0000-4000-8000-000000000001"
        );
    }

    #[test]
    fn test_child_row_tolerates_missing_columns() {
        let child: Child = serde_json::from_str(
            r#"{"id":"1","name":"Child One","dob":"2020-01-01","allergies":null}"#,
        )
        .unwrap();
        assert_eq!(child.dob, date(2020, 1, 1));
        assert!(child.allergies.is_empty());
        assert!(child.user_id.is_empty());
    }

    #[test]
    fn test_medication_checkbox_values() {
        let form: MedicationForm =
            serde_json::from_str(r#"{"name":"Amoxicillin","active":"on"}"#).unwrap();
        assert!(form.active);

        let form: MedicationForm = serde_json::from_str(r#"{"name":"Amoxicillin"}"#).unwrap();
        assert!(!form.active);

        assert!(MedicationForm::opened(date(2026, 10, 18)).active);
        assert_eq!(MedicationForm::opened(date(2026, 10, 18)).start_date, "2026-10-18");
    }

    #[test]
    fn test_list_view_remove_and_confirm() {
        let card = |id: &str| ChildCard {
            id: id.to_string(),
            name: format!("Child {}", id),
            dob: date(2020, 1, 1),
            age: 6,
            allergies: vec![],
        };
        let mut view = ListView::loaded(vec![card("a"), card("b")]);

        view.confirm("missing");
        assert_eq!(view.confirm_delete, None);
        view.confirm("a");
        assert_eq!(view.confirm_delete.as_deref(), Some("a"));

        assert!(view.remove("a"));
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.confirm_delete, None);
        assert!(!view.remove("a"));
    }

    #[test]
    fn test_dashboard_derived_views() {
        let visit = |id: &str, d: u32| Visit {
            id: id.to_string(),
            user_id: "u".to_string(),
            child_id: "c".to_string(),
            date: date(2026, 1, d),
            reason: "Checkup".to_string(),
            diagnosis: None,
            notes: None,
        };
        let medication = |id: &str, active: bool| Medication {
            id: id.to_string(),
            user_id: "u".to_string(),
            child_id: "c".to_string(),
            name: "Ibuprofen".to_string(),
            dosage: None,
            frequency: None,
            start_date: date(2026, 1, 1),
            end_date: Some(date(2025, 1, 1)),
            active,
        };
        let dashboard = ChildDashboard {
            child: ChildCard::from_child(
                Child {
                    id: "c".to_string(),
                    user_id: "u".to_string(),
                    name: "Ada".to_string(),
                    dob: date(2020, 1, 1),
                    allergies: vec![],
                    created_at: None,
                },
                date(2026, 10, 18),
            ),
            visits: vec![visit("v4", 4), visit("v3", 3), visit("v2", 2), visit("v1", 1)],
            medications: vec![medication("m1", true), medication("m2", false)],
            visits_error: None,
            medications_error: None,
        };

        let recent: Vec<&str> = dashboard.recent_visits().iter().map(|v| v.id.as_str()).collect();
        assert_eq!(recent, vec!["v4", "v3", "v2"]);
        // Active flag wins over a past end date
        let active: Vec<&str> = dashboard
            .active_medications()
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(active, vec!["m1"]);
        assert_eq!(dashboard.child.age, 6);
    }
}
