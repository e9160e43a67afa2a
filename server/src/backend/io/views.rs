//! Server-side HTML for every page. Every user-supplied value goes through
//! `html_escape` before it reaches the markup.

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use shared::{
    encode_segment, ChildCard, ChildDashboard, ChildDetail, ChildForm, Doctor, DoctorFormView,
    FormState, HomeView, ListView, LoginForm, Medication, MedicationForm, RegisterForm, Route,
    Visit, VisitForm,
};
use std::fmt::Write;

/// Tabs of the child dashboard, chosen with `?tab=`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Overview,
    Visits,
    Medications,
}

impl Tab {
    const ALL: [Tab; 3] = [Tab::Overview, Tab::Visits, Tab::Medications];

    /// Unknown or missing values fall back to the overview
    pub fn from_param(value: Option<&str>) -> Self {
        Self::ALL
            .into_iter()
            .find(|tab| Some(tab.slug()) == value)
            .unwrap_or_default()
    }

    fn slug(self) -> &'static str {
        match self {
            Tab::Overview => "overview",
            Tab::Visits => "visits",
            Tab::Medications => "medications",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Visits => "Visits",
            Tab::Medications => "Medications",
        }
    }
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{} - WeeCare</title>\n</head>\n<body>\n<main>\n{}</main>\n</body>\n</html>\n",
        text(title),
        body
    )
}

fn link(route: &Route, label: &str) -> String {
    format!("<a href=\"{}\">{}</a>", attr(&route.path()), text(label))
}

fn error_line(error: &Option<String>) -> String {
    match error {
        Some(message) => format!("<p class=\"error\" role=\"alert\">{}</p>\n", text(message)),
        None => String::new(),
    }
}

fn input(kind: &str, name: &str, label: &str, value: &str, required: bool) -> String {
    format!(
        "<label for=\"{name}\">{label}</label>\n\
         <input type=\"{kind}\" id=\"{name}\" name=\"{name}\" value=\"{value}\"{required}>\n",
        kind = kind,
        name = name,
        label = text(label),
        value = attr(value),
        required = if required { " required" } else { "" },
    )
}

fn textarea(name: &str, label: &str, value: &str) -> String {
    format!(
        "<label for=\"{name}\">{label}</label>\n\
         <textarea id=\"{name}\" name=\"{name}\">{value}</textarea>\n",
        name = name,
        label = text(label),
        value = text(value),
    )
}

fn form(action: &Route, fields: &str, submit: &str, cancel: &Route) -> String {
    format!(
        "<form method=\"post\" action=\"{}\">\n\
         {}<button type=\"submit\">{}</button>\n{}\n</form>\n",
        attr(&action.path()),
        fields,
        text(submit),
        link(cancel, "Cancel"),
    )
}

pub fn login_page(state: &FormState<LoginForm>) -> String {
    let mut fields = error_line(&state.error);
    fields.push_str(&input("email", "email", "Email", &state.form.email, true));
    fields.push_str(&input("password", "password", "Password", "", true));

    let body = format!(
        "<h1>Sign In</h1>\n<form method=\"post\" action=\"/login\">\n\
         {}<button type=\"submit\">Sign In</button>\n</form>\n\
         <p>Don't have an account? {}</p>\n",
        fields,
        link(&Route::Register, "Sign up")
    );
    page("Sign In", &body)
}

pub fn register_page(state: &FormState<RegisterForm>) -> String {
    let mut fields = error_line(&state.error);
    fields.push_str(&input("email", "email", "Email", &state.form.email, true));
    fields.push_str(&input("password", "password", "Password", "", true));
    fields.push_str(&input("password", "confirm_password", "Confirm Password", "", true));

    let body = format!(
        "<h1>Create Account</h1>\n<form method=\"post\" action=\"/register\">\n\
         {}<button type=\"submit\">Sign Up</button>\n</form>\n\
         <p>Already have an account? {}</p>\n",
        fields,
        link(&Route::Login, "Sign in")
    );
    page("Create Account", &body)
}

pub fn home_page(view: &HomeView) -> String {
    let email = view.email.as_deref().unwrap_or("unknown");
    let body = format!(
        "<h1>WeeCare</h1>\n<p>Child Medical History Tracker</p>\n<p>Logged in as: {}</p>\n\
         <nav>\n{}\n{}\n</nav>\n\
         <form method=\"post\" action=\"/logout\">\
         <button type=\"submit\">Sign Out</button></form>\n",
        text(email),
        link(&Route::Children, "Manage Children"),
        link(&Route::Doctors, "Doctors & Contacts"),
    );
    page("Home", &body)
}

fn banners<T>(view: &ListView<T>) -> String {
    let mut html = String::new();
    if let Some(message) = &view.load_error {
        let _ = writeln!(html, "<p class=\"banner\">{}</p>", text(message));
    }
    if let Some(message) = &view.alert {
        let _ = writeln!(html, "<p class=\"alert\" role=\"alert\">{}</p>", text(message));
    }
    html
}

fn confirm_dialog(list: &Route, delete_action: &str, description: &str) -> String {
    format!(
        "<dialog open>\n<h2>Are you absolutely sure?</h2>\n<p>{}</p>\n\
         <form method=\"post\" action=\"{}\"><button type=\"submit\">Delete</button></form>\n\
         {}\n</dialog>\n",
        text(description),
        attr(delete_action),
        link(list, "Cancel"),
    )
}

fn delete_link(list: &Route, id: &str) -> String {
    format!(
        "<a href=\"{}?confirm_delete={}\">Delete</a>",
        attr(&list.path()),
        attr(&encode_segment(id))
    )
}

pub fn children_page(view: &ListView<ChildCard>) -> String {
    let mut body = format!(
        "<h1>Children</h1>\n{}\n{}\n",
        link(&Route::Home, "Back to Home"),
        link(&Route::NewChild, "Add Child")
    );
    body.push_str(&banners(view));

    if view.is_empty() {
        let _ = writeln!(
            body,
            "<p>No children added yet</p>\n{}",
            link(&Route::NewChild, "Add Your First Child")
        );
    } else {
        body.push_str("<ul class=\"cards\">\n");
        for child in &view.items {
            let _ = write!(
                body,
                "<li>\n<h2>{}</h2>\n<p>{} years old</p>\n<p>Born: {}</p>\n",
                text(&child.name),
                child.age,
                child.dob
            );
            if !child.allergies.is_empty() {
                body.push_str("<p>Allergies:</p>\n<ul class=\"badges\">\n");
                for allergy in &child.allergies {
                    let _ = writeln!(body, "<li>{}</li>", text(allergy));
                }
                body.push_str("</ul>\n");
            }
            let _ = writeln!(
                body,
                "{}\n{}\n</li>",
                link(&Route::Child(child.id.clone()), "View Details"),
                delete_link(&Route::Children, &child.id)
            );
        }
        body.push_str("</ul>\n");
    }

    if let Some(child) = view.confirm_delete.as_deref().and_then(|id| view.find(id)) {
        body.push_str(&confirm_dialog(
            &Route::Children,
            &format!("/children/{}/delete", encode_segment(&child.id)),
            &format!(
                "This action cannot be undone. This will permanently delete the profile for {}.",
                child.name
            ),
        ));
    }

    page("Children", &body)
}

pub fn child_form_page(state: &FormState<ChildForm>) -> String {
    let mut fields = error_line(&state.error);
    fields.push_str(&input("text", "name", "Name", &state.form.name, true));
    fields.push_str(&input("date", "dob", "Date of Birth", &state.form.dob, true));
    fields.push_str(&input(
        "text",
        "allergies",
        "Allergies (comma separated)",
        &state.form.allergies,
        false,
    ));

    let body = format!(
        "<h1>Add Child</h1>\n{}",
        form(&Route::NewChild, &fields, "Add Child", &Route::Children)
    );
    page("Add Child", &body)
}

fn visit_item(visit: &Visit) -> String {
    let mut html = format!(
        "<li>\n<strong>{}</strong> {}\n",
        text(&visit.reason),
        visit.date
    );
    if let Some(diagnosis) = visit.diagnosis.as_deref().filter(|d| !d.is_empty()) {
        let _ = writeln!(html, "<p>Diagnosis: {}</p>", text(diagnosis));
    }
    if let Some(notes) = visit.notes.as_deref().filter(|n| !n.is_empty()) {
        let _ = writeln!(html, "<p>{}</p>", text(notes));
    }
    html.push_str("</li>\n");
    html
}

fn medication_item(medication: &Medication) -> String {
    let mut html = format!("<li>\n<strong>{}</strong>", text(&medication.name));
    if medication.active {
        html.push_str(" <span class=\"badge\">Active</span>");
    }
    let details: Vec<&str> = [medication.dosage.as_deref(), medication.frequency.as_deref()]
        .into_iter()
        .flatten()
        .filter(|d| !d.is_empty())
        .collect();
    if !details.is_empty() {
        let _ = write!(html, "\n<p>{}</p>", text(&details.join(" - ")));
    }
    let _ = write!(html, "\n<p>Started: {}", medication.start_date);
    if let Some(end) = medication.end_date {
        let _ = write!(html, ", ended: {}", end);
    }
    html.push_str("</p>\n</li>\n");
    html
}

fn section(title: &str, error: &Option<String>, empty: &str, items: Vec<String>) -> String {
    let mut html = format!("<section>\n<h2>{}</h2>\n", text(title));
    if let Some(message) = error {
        let _ = writeln!(html, "<p class=\"banner\">{}</p>", text(message));
    }
    if items.is_empty() {
        let _ = writeln!(html, "<p>{}</p>", text(empty));
    } else {
        let _ = writeln!(html, "<ul>\n{}</ul>", items.concat());
    }
    html.push_str("</section>\n");
    html
}

pub fn child_detail_page(detail: &ChildDetail, tab: Tab) -> String {
    let dashboard = match detail {
        ChildDetail::Found(dashboard) => dashboard,
        ChildDetail::NotFound => {
            let body = format!(
                "<p>Child not found</p>\n{}\n",
                link(&Route::Children, "Back to List")
            );
            return page("Child not found", &body);
        }
    };
    page(&dashboard.child.name, &dashboard_body(dashboard, tab))
}

fn dashboard_body(dashboard: &ChildDashboard, tab: Tab) -> String {
    let child = &dashboard.child;
    let child_route = Route::Child(child.id.clone());

    let mut body = format!(
        "{}\n<h1>{}</h1>\n<p>{} years old</p>\n<p>Born: {}</p>\n",
        link(&Route::Children, "Back to Children"),
        text(&child.name),
        child.age,
        child.dob
    );
    if !child.allergies.is_empty() {
        let _ = writeln!(
            body,
            "<p>Allergies: {}</p>",
            text(&child.allergies.join(", "))
        );
    }

    body.push_str("<nav class=\"tabs\">\n");
    for candidate in Tab::ALL {
        let current = if candidate == tab { " aria-current=\"page\"" } else { "" };
        let _ = writeln!(
            body,
            "<a href=\"{}?tab={}\"{}>{}</a>",
            attr(&child_route.path()),
            candidate.slug(),
            current,
            candidate.label()
        );
    }
    body.push_str("</nav>\n");

    match tab {
        Tab::Overview => {
            body.push_str(&section(
                "Recent Visits",
                &dashboard.visits_error,
                "No visits recorded",
                dashboard.recent_visits().iter().map(visit_item).collect(),
            ));
            body.push_str(&section(
                "Active Medications",
                &dashboard.medications_error,
                "No active medications",
                dashboard
                    .active_medications()
                    .into_iter()
                    .map(medication_item)
                    .collect(),
            ));
        }
        Tab::Visits => {
            let _ = writeln!(body, "{}", link(&Route::NewVisit(child.id.clone()), "Log Visit"));
            body.push_str(&section(
                "Visit History",
                &dashboard.visits_error,
                "No visits recorded",
                dashboard.visits.iter().map(visit_item).collect(),
            ));
        }
        Tab::Medications => {
            let _ = writeln!(
                body,
                "{}",
                link(&Route::NewMedication(child.id.clone()), "Add Medication")
            );
            body.push_str(&section(
                "Medications",
                &dashboard.medications_error,
                "No medications recorded",
                dashboard.medications.iter().map(medication_item).collect(),
            ));
        }
    }
    body
}

pub fn doctors_page(view: &ListView<Doctor>) -> String {
    let mut body = format!(
        "<h1>Doctors &amp; Contacts</h1>\n<p>Manage your medical directory</p>\n{}\n{}\n",
        link(&Route::Home, "Back to Home"),
        link(&Route::NewDoctor, "Add Doctor")
    );
    body.push_str(&banners(view));

    if view.is_empty() {
        let _ = writeln!(
            body,
            "<p>No doctors added yet</p>\n{}",
            link(&Route::NewDoctor, "Add Your First Doctor")
        );
    } else {
        body.push_str("<ul class=\"cards\">\n");
        for doctor in &view.items {
            let _ = writeln!(body, "<li>\n<h2>{}</h2>", text(&doctor.name));
            for value in [
                &doctor.specialty,
                &doctor.phone,
                &doctor.email,
                &doctor.address,
                &doctor.notes,
            ]
            .into_iter()
            .flatten()
            .filter(|v| !v.is_empty())
            {
                let _ = writeln!(body, "<p>{}</p>", text(value));
            }
            let _ = writeln!(
                body,
                "{}\n{}\n</li>",
                link(&Route::EditDoctor(doctor.id.clone()), "Edit"),
                delete_link(&Route::Doctors, &doctor.id)
            );
        }
        body.push_str("</ul>\n");
    }

    if let Some(doctor) = view.confirm_delete.as_deref().and_then(|id| view.find(id)) {
        body.push_str(&confirm_dialog(
            &Route::Doctors,
            &format!("/doctors/{}/delete", encode_segment(&doctor.id)),
            &format!(
                "This action cannot be undone. This will permanently delete {} from your contacts.",
                doctor.name
            ),
        ));
    }

    page("Doctors", &body)
}

pub fn doctor_form_page(view: &DoctorFormView) -> String {
    let (title, action) = match &view.doctor_id {
        Some(id) => ("Edit Doctor", Route::EditDoctor(id.clone())),
        None => ("Add Doctor", Route::NewDoctor),
    };
    let doctor = &view.state.form;

    let mut fields = error_line(&view.state.error);
    fields.push_str(&input("text", "name", "Name", &doctor.name, true));
    fields.push_str(&input("text", "specialty", "Specialty", &doctor.specialty, false));
    fields.push_str(&input("tel", "phone", "Phone", &doctor.phone, false));
    fields.push_str(&input("email", "email", "Email", &doctor.email, false));
    fields.push_str(&input("text", "address", "Address", &doctor.address, false));
    fields.push_str(&textarea("notes", "Notes", &doctor.notes));

    let body = format!(
        "<h1>{}</h1>\n{}",
        title,
        form(&action, &fields, "Save Doctor", &Route::Doctors)
    );
    page(title, &body)
}

pub fn visit_form_page(child_id: &str, state: &FormState<VisitForm>) -> String {
    let visit = &state.form;
    let mut fields = error_line(&state.error);
    fields.push_str(&input("date", "date", "Date", &visit.date, true));
    fields.push_str(&input("text", "reason", "Reason for Visit", &visit.reason, true));
    fields.push_str(&input("text", "diagnosis", "Diagnosis", &visit.diagnosis, false));
    fields.push_str(&textarea("notes", "Notes", &visit.notes));

    let body = format!(
        "<h1>Log Visit</h1>\n{}",
        form(
            &Route::NewVisit(child_id.to_string()),
            &fields,
            "Log Visit",
            &Route::Child(child_id.to_string())
        )
    );
    page("Log Visit", &body)
}

pub fn medication_form_page(child_id: &str, state: &FormState<MedicationForm>) -> String {
    let medication = &state.form;
    let mut fields = error_line(&state.error);
    fields.push_str(&input("text", "name", "Medication Name", &medication.name, true));
    fields.push_str(&input("text", "dosage", "Dosage", &medication.dosage, false));
    fields.push_str(&input("text", "frequency", "Frequency", &medication.frequency, false));
    fields.push_str(&input("date", "start_date", "Start Date", &medication.start_date, true));
    fields.push_str(&input("date", "end_date", "End Date", &medication.end_date, false));
    let _ = writeln!(
        fields,
        "<label><input type=\"checkbox\" name=\"active\" value=\"on\"{}> Currently active</label>",
        if medication.active { " checked" } else { "" }
    );

    let body = format!(
        "<h1>Add Medication</h1>\n{}",
        form(
            &Route::NewMedication(child_id.to_string()),
            &fields,
            "Save Medication",
            &Route::Child(child_id.to_string())
        )
    );
    page("Add Medication", &body)
}
