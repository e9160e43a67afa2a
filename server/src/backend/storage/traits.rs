//! # Storage Traits
//!
//! The hosted backend is consumed through two traits so the domain layer can
//! run against the real REST service or the in-memory stand-in without
//! modification. Every call carries the caller's [`Session`]; row-level
//! isolation is the backend's job, not the caller's.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use shared::Session;

use super::error::{AuthError, StorageError, StorageResult};

/// Tables consumed by the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Children,
    Doctors,
    Visits,
    Medications,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Children => "children",
            Table::Doctors => "doctors",
            Table::Visits => "visits",
            Table::Medications => "medications",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// A `select` request: `table(name).select(columns).eq(..).order(..)`
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: Table,
    pub columns: String,
    pub filters: Vec<(String, String)>,
    pub order: Option<Order>,
}

impl Query {
    pub fn from(table: Table) -> Self {
        Self {
            table,
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.columns = columns.to_string();
        self
    }

    /// Equality filter on one column
    pub fn eq(mut self, column: &str, value: impl Into<String>) -> Self {
        self.filters.push((column.to_string(), value.into()));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }
}

/// Table storage of the hosted backend
#[async_trait]
pub trait TableStore: Send + Sync {
    /// All rows visible to the session that match the query
    async fn select(&self, session: &Session, query: &Query) -> StorageResult<Vec<Value>>;

    /// Exactly one row. Zero visible rows is [`StorageError::NotFound`].
    async fn select_single(&self, session: &Session, query: &Query) -> StorageResult<Value>;

    async fn insert(&self, session: &Session, table: Table, rows: Vec<Value>) -> StorageResult<()>;

    /// Update the row with the given id
    async fn update(
        &self,
        session: &Session,
        table: Table,
        id: &str,
        fields: Value,
    ) -> StorageResult<()>;

    /// Delete the row with the given id
    async fn delete(&self, session: &Session, table: Table, id: &str) -> StorageResult<()>;
}

/// Authentication service of the hosted backend
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Resolve an access token into a session. `Ok(None)` when the token is
    /// not (or no longer) valid.
    async fn get_session(&self, access_token: &str) -> StorageResult<Option<Session>>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<(), AuthError>;

    async fn sign_out(&self, session: &Session) -> StorageResult<()>;
}

/// Typed `select`
pub async fn select_as<T: DeserializeOwned>(
    store: &dyn TableStore,
    session: &Session,
    query: &Query,
) -> StorageResult<Vec<T>> {
    store
        .select(session, query)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(StorageError::from))
        .collect()
}

/// Typed `select(..).single()`
pub async fn single_as<T: DeserializeOwned>(
    store: &dyn TableStore,
    session: &Session,
    query: &Query,
) -> StorageResult<T> {
    let row = store.select_single(session, query).await?;
    Ok(serde_json::from_value(row)?)
}

/// Typed single-row insert
pub async fn insert_one<T: Serialize>(
    store: &dyn TableStore,
    session: &Session,
    table: Table,
    row: &T,
) -> StorageResult<()> {
    let row = serde_json::to_value(row)?;
    store.insert(session, table, vec![row]).await
}

/// Typed update by id
pub async fn update_by_id<T: Serialize>(
    store: &dyn TableStore,
    session: &Session,
    table: Table,
    id: &str,
    fields: &T,
) -> StorageResult<()> {
    let fields = serde_json::to_value(fields)?;
    store.update(session, table, id, fields).await
}
