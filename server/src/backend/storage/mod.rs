//! # Storage Module
//!
//! The hosted backend-as-a-service, seen from the application. All
//! persistence, authentication and row-level isolation live there; this
//! module only speaks to it.
//!
//! ## Implementations
//!
//! - **supabase**: REST client for a hosted Supabase project (GoTrue auth,
//!   PostgREST tables)
//! - **memory**: in-process stand-in with the same isolation rules, for tests
//!   and offline runs
//!
//! The domain layer only sees the [`TableStore`] and [`AuthBackend`] traits.

pub mod error;
pub mod memory;
pub mod supabase;
pub mod traits;

pub use error::{AuthError, StorageError, StorageResult};
pub use memory::{InMemoryBackend, Operation};
pub use supabase::SupabaseClient;
pub use traits::{
    insert_one, select_as, single_as, update_by_id, AuthBackend, Query, Table, TableStore,
};
