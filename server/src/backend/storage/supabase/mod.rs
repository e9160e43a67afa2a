//! # Supabase REST Storage
//!
//! Talks to a hosted Supabase project: GoTrue under `/auth/v1` for
//! authentication and PostgREST under `/rest/v1` for the tables. Requests are
//! made with the project's anon key plus the user's access token, so the
//! project's row-level security policies decide what each user can see.

mod auth;
mod tables;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::Value;
use shared::Session;

use super::error::{StorageError, StorageResult};
use super::traits::Table;

/// HTTP client for one Supabase project
#[derive(Clone)]
pub struct SupabaseClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    /// Create a client for the project at `base_url`. No timeout is set; the
    /// reqwest defaults apply.
    pub fn new(base_url: &str, anon_key: &str) -> StorageResult<Self> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    fn rest_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.name())
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    /// Anonymous request (sign-in, sign-up)
    fn anonymous(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.anon_key)
    }

    /// Request on behalf of a signed-in user
    fn authorized(&self, builder: RequestBuilder, access_token: &str) -> RequestBuilder {
        builder
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
    }

    fn authorized_for(&self, builder: RequestBuilder, session: &Session) -> RequestBuilder {
        self.authorized(builder, &session.access_token)
    }

    /// Turn a non-success response into a [`StorageError`]
    async fn check(response: Response) -> StorageResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(StorageError::Unauthorized);
        }

        let body = response.text().await.unwrap_or_default();
        Err(StorageError::Status {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }
}

/// Pull the human readable message out of a GoTrue / PostgREST error body
fn error_message(body: &str) -> String {
    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(body) {
        for key in ["error_description", "msg", "message", "error"] {
            if let Some(Value::String(message)) = fields.get(key) {
                return message.clone();
            }
        }
    }

    if body.trim().is_empty() {
        "unknown error".to_string()
    } else {
        body.trim().to_string()
    }
}
