//! # In-Memory Backend
//!
//! A process-local stand-in for the hosted backend. It keeps users, tokens and
//! table rows in memory and applies the same row-level isolation the hosted
//! project enforces: a session only sees, changes and creates rows whose
//! `user_id` is its own.
//!
//! Used by the unit tests and by `--in-memory` local runs. Tests can inspect
//! how many list queries ran and make the next call of a given kind fail.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::info;
use serde_json::{Map, Value};
use shared::{Session, User};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use super::error::{AuthError, StorageError, StorageResult};
use super::traits::{AuthBackend, Query, Table, TableStore};

/// Minimum password length accepted by sign-up (the hosted default)
const MIN_PASSWORD_LENGTH: usize = 6;

/// Kinds of backend call a test can make fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select(Table),
    Single(Table),
    Insert(Table),
    Update(Table),
    Delete(Table),
    GetSession,
}

struct Account {
    user: User,
    password: String,
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, Account>,
    tokens: HashMap<String, String>,
    rows: HashMap<Table, Vec<Map<String, Value>>>,
    select_calls: HashMap<Table, usize>,
    failures: HashSet<Operation>,
    last_created_at: Option<DateTime<Utc>>,
}

impl State {
    fn user(&self, user_id: &str) -> Option<&User> {
        self.accounts
            .values()
            .map(|account| &account.user)
            .find(|user| user.id == user_id)
    }

    /// Injected failure for this call, consumed on use
    fn take_failure(&mut self, operation: Operation) -> StorageResult<()> {
        if self.failures.remove(&operation) {
            return Err(StorageError::Status {
                status: 500,
                message: format!("injected failure for {:?}", operation),
            });
        }
        Ok(())
    }

    /// Strictly increasing creation timestamps keep `created_at` ordering
    /// deterministic for rows inserted within the same clock tick.
    fn next_created_at(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_created_at {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_created_at = Some(now);
        now
    }

    fn is_valid_token(&self, session: &Session) -> bool {
        self.tokens.get(&session.access_token) == Some(&session.user.id)
    }
}

/// Shared, cloneable in-memory backend
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<State>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking test must not poison the backend for the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register an account and sign it in, returning its session
    pub fn create_user(&self, email: &str, password: &str) -> Session {
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: Some(email.to_string()),
        };
        let mut state = self.lock();
        state.accounts.insert(
            email.to_string(),
            Account {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        issue_session(&mut state, user)
    }

    /// Number of list (non-single) selects issued against a table
    pub fn select_calls(&self, table: Table) -> usize {
        self.lock().select_calls.get(&table).copied().unwrap_or(0)
    }

    /// Make the next call of this kind fail with a backend error
    pub fn fail_next(&self, operation: Operation) {
        self.lock().failures.insert(operation);
    }

    /// All rows of a table regardless of owner
    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.lock()
            .rows
            .get(&table)
            .map(|rows| rows.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    fn visible_rows(state: &State, session: &Session, query: &Query) -> Vec<Value> {
        let mut rows: Vec<&Map<String, Value>> = state
            .rows
            .get(&query.table)
            .into_iter()
            .flatten()
            .filter(|row| owned_by(row, session))
            .filter(|row| {
                query
                    .filters
                    .iter()
                    .all(|(column, value)| column_matches(row.get(column), value))
            })
            .collect();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        rows.into_iter().cloned().map(Value::Object).collect()
    }
}

fn issue_session(state: &mut State, user: User) -> Session {
    let access_token = Uuid::new_v4().to_string();
    state.tokens.insert(access_token.clone(), user.id.clone());
    Session {
        access_token,
        refresh_token: Some(Uuid::new_v4().to_string()),
        user,
    }
}

fn owned_by(row: &Map<String, Value>, session: &Session) -> bool {
    row.get("user_id").and_then(Value::as_str) == Some(session.user.id.as_str())
}

fn column_matches(cell: Option<&Value>, expected: &str) -> bool {
    match cell {
        Some(Value::String(text)) => text == expected,
        Some(Value::Null) | None => expected == "null",
        Some(other) => other.to_string() == expected,
    }
}

/// Ordering used for `order(..)`. ISO dates and RFC 3339 timestamps sort
/// correctly as strings; nulls sort last.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.to_lowercase().cmp(&b.to_lowercase()),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        (a, b) => a.map(Value::to_string).cmp(&b.map(Value::to_string)),
    }
}

fn rls_violation(table: Table) -> StorageError {
    StorageError::Status {
        status: 403,
        message: format!(
            "new row violates row-level security policy for table \"{}\"",
            table.name()
        ),
    }
}

#[async_trait]
impl TableStore for InMemoryBackend {
    async fn select(&self, session: &Session, query: &Query) -> StorageResult<Vec<Value>> {
        let mut state = self.lock();
        *state.select_calls.entry(query.table).or_insert(0) += 1;
        state.take_failure(Operation::Select(query.table))?;
        if !state.is_valid_token(session) {
            return Err(StorageError::Unauthorized);
        }

        Ok(Self::visible_rows(&state, session, query))
    }

    async fn select_single(&self, session: &Session, query: &Query) -> StorageResult<Value> {
        let mut state = self.lock();
        state.take_failure(Operation::Single(query.table))?;
        if !state.is_valid_token(session) {
            return Err(StorageError::Unauthorized);
        }

        let mut rows = Self::visible_rows(&state, session, query);
        if rows.len() == 1 {
            Ok(rows.remove(0))
        } else {
            Err(StorageError::NotFound)
        }
    }

    async fn insert(&self, session: &Session, table: Table, rows: Vec<Value>) -> StorageResult<()> {
        let mut state = self.lock();
        state.take_failure(Operation::Insert(table))?;
        if !state.is_valid_token(session) {
            return Err(StorageError::Unauthorized);
        }

        let mut prepared = Vec::with_capacity(rows.len());
        for row in rows {
            let Value::Object(mut fields) = row else {
                return Err(StorageError::Status {
                    status: 400,
                    message: "rows must be JSON objects".to_string(),
                });
            };
            if !owned_by(&fields, session) {
                return Err(rls_violation(table));
            }
            fields
                .entry("id")
                .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
            let created_at = state.next_created_at().to_rfc3339();
            fields
                .entry("created_at")
                .or_insert(Value::String(created_at));
            prepared.push(fields);
        }

        state.rows.entry(table).or_default().extend(prepared);
        Ok(())
    }

    async fn update(
        &self,
        session: &Session,
        table: Table,
        id: &str,
        fields: Value,
    ) -> StorageResult<()> {
        let mut state = self.lock();
        state.take_failure(Operation::Update(table))?;
        if !state.is_valid_token(session) {
            return Err(StorageError::Unauthorized);
        }

        let Value::Object(fields) = fields else {
            return Err(StorageError::Status {
                status: 400,
                message: "update fields must be a JSON object".to_string(),
            });
        };
        if fields
            .get("user_id")
            .is_some_and(|owner| owner.as_str() != Some(session.user.id.as_str()))
        {
            return Err(rls_violation(table));
        }

        // Rows hidden by isolation are silently untouched, as with PostgREST
        for row in state.rows.entry(table).or_default().iter_mut() {
            if owned_by(row, session) && column_matches(row.get("id"), id) {
                for (column, value) in &fields {
                    row.insert(column.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, session: &Session, table: Table, id: &str) -> StorageResult<()> {
        let mut state = self.lock();
        state.take_failure(Operation::Delete(table))?;
        if !state.is_valid_token(session) {
            return Err(StorageError::Unauthorized);
        }

        let rows = state.rows.entry(table).or_default();
        rows.retain(|row| !(owned_by(row, session) && column_matches(row.get("id"), id)));

        // children cascade to their visits and medications
        if table == Table::Children {
            for dependent in [Table::Visits, Table::Medications] {
                if let Some(rows) = state.rows.get_mut(&dependent) {
                    rows.retain(|row| {
                        !(owned_by(row, session) && column_matches(row.get("child_id"), id))
                    });
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AuthBackend for InMemoryBackend {
    async fn get_session(&self, access_token: &str) -> StorageResult<Option<Session>> {
        let mut state = self.lock();
        state.take_failure(Operation::GetSession)?;

        let session = state
            .tokens
            .get(access_token)
            .and_then(|user_id| state.user(user_id))
            .map(|user| Session {
                access_token: access_token.to_string(),
                refresh_token: None,
                user: user.clone(),
            });
        Ok(session)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let mut state = self.lock();
        let user = match state.accounts.get(email) {
            Some(account) if account.password == password => account.user.clone(),
            _ => return Err(AuthError::Rejected("Invalid login credentials".to_string())),
        };
        info!("In-memory sign in for {}", email);
        Ok(issue_session(&mut state, user))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<(), AuthError> {
        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::Rejected(format!(
                "Password should be at least {} characters.",
                MIN_PASSWORD_LENGTH
            )));
        }

        let mut state = self.lock();
        if state.accounts.contains_key(email) {
            return Err(AuthError::Rejected("User already registered".to_string()));
        }
        state.accounts.insert(
            email.to_string(),
            Account {
                user: User {
                    id: Uuid::new_v4().to_string(),
                    email: Some(email.to_string()),
                },
                password: password.to_string(),
            },
        );
        Ok(())
    }

    async fn sign_out(&self, session: &Session) -> StorageResult<()> {
        self.lock().tokens.remove(&session.access_token);
        Ok(())
    }
}
