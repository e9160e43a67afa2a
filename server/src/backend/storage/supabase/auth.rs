use async_trait::async_trait;
use log::{debug, warn};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use shared::{Session, User};

use super::{error_message, SupabaseClient};
use crate::backend::storage::error::{AuthError, StorageError, StorageResult};
use crate::backend::storage::traits::AuthBackend;

/// Body of a successful password grant
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    user: User,
}

impl SupabaseClient {
    /// Map an auth endpoint failure: client errors are credential problems
    /// the user can fix, anything else is a backend failure.
    async fn auth_failure(response: reqwest::Response) -> AuthError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);

        if status.is_client_error() {
            AuthError::Rejected(message)
        } else {
            AuthError::Storage(StorageError::Status {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl AuthBackend for SupabaseClient {
    async fn get_session(&self, access_token: &str) -> StorageResult<Option<Session>> {
        let request = self.client.get(self.auth_url("user"));
        let response = self.authorized(request, access_token).send().await?;

        if matches!(response.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            debug!("Access token rejected by auth service");
            return Ok(None);
        }

        let body = Self::check(response).await?.bytes().await?;
        let user: User = serde_json::from_slice(&body)?;

        Ok(Some(Session {
            access_token: access_token.to_string(),
            refresh_token: None,
            user,
        }))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let request = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        let response = self
            .anonymous(request)
            .send()
            .await
            .map_err(StorageError::from)?;

        if !response.status().is_success() {
            return Err(Self::auth_failure(response).await);
        }

        let body = response.bytes().await.map_err(StorageError::from)?;
        let token: TokenResponse = serde_json::from_slice(&body).map_err(StorageError::from)?;

        Ok(Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            user: token.user,
        })
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let request = self
            .client
            .post(self.auth_url("signup"))
            .json(&json!({ "email": email, "password": password }));
        let response = self
            .anonymous(request)
            .send()
            .await
            .map_err(StorageError::from)?;

        if !response.status().is_success() {
            return Err(Self::auth_failure(response).await);
        }

        Ok(())
    }

    async fn sign_out(&self, session: &Session) -> StorageResult<()> {
        let request = self.client.post(self.auth_url("logout"));
        let response = self.authorized_for(request, session).send().await?;

        // An already expired token is as good as signed out
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("Sign out with an expired token for user {}", session.user.id);
            return Ok(());
        }

        Self::check(response).await?;
        Ok(())
    }
}
