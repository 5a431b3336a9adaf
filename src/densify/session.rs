use chrono::{DateTime, Duration, Utc};

use super::api::DensifyApi;
use super::client::RecommendationClient;
use super::connection::ConnectionInfo;
use super::error::ServiceError;
use crate::config::types::ServiceSettings;

/// Minutes a session token is reused before it is reissued.
pub const TOKEN_LIFETIME_MINUTES: i64 = 5;

/// Result of [`SessionManager::ensure_session`].
#[derive(Debug, Clone)]
pub enum SessionOutcome {
    /// Health check or authorization failed; no session is available.
    Unreachable(ServiceError),
    /// The held token is still current.
    Reused,
    /// A new token was issued; the stored connection info is now stale.
    Reissued,
}

impl SessionOutcome {
    /// Whether the caller must write the connection info back to the store.
    pub fn needs_persist(&self) -> bool {
        matches!(self, SessionOutcome::Reissued)
    }
}

/// A token issued at `issued_at` may be reused strictly before the lifetime ends.
pub fn token_is_current(issued_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now < issued_at + Duration::minutes(TOKEN_LIFETIME_MINUTES)
}

/// Owns the connection info and decides when the session token is reissued.
///
/// The manager never writes to the parameter store; it reports through
/// [`SessionOutcome`] whether the caller has to.
pub struct SessionManager {
    api: DensifyApi,
    connection: ConnectionInfo,
}

impl SessionManager {
    pub fn new(connection: ConnectionInfo, settings: &ServiceSettings) -> Result<Self, ServiceError> {
        let api = DensifyApi::new(&connection.base_url(), settings)?;
        Ok(Self { api, connection })
    }

    pub fn connection(&self) -> &ConnectionInfo {
        &self.connection
    }

    /// Health-check the service, then reuse or reissue the token.
    pub async fn ensure_session(&mut self, now: DateTime<Utc>) -> SessionOutcome {
        if let Err(e) = self.api.ping().await {
            tracing::warn!(url = %self.api.base_url(), error = %e, "Failed to ping Densify");
            return SessionOutcome::Unreachable(e);
        }

        let current = self
            .connection
            .session
            .as_ref()
            .map(|s| token_is_current(s.issued_at, now))
            .unwrap_or(false);
        if current {
            tracing::debug!(url = %self.api.base_url(), "Reusing Densify session token");
            return SessionOutcome::Reused;
        }

        match self
            .api
            .authorize(&self.connection.username, &self.connection.password)
            .await
        {
            Ok(token) => {
                self.connection.set_token(token, now);
                tracing::info!(url = %self.api.base_url(), "Issued new Densify session token");
                SessionOutcome::Reissued
            }
            Err(e) => {
                tracing::warn!(url = %self.api.base_url(), error = %e, "Failed to perform authorization");
                SessionOutcome::Unreachable(e)
            }
        }
    }

    /// Client for recommendation calls, authenticated with the current token.
    pub fn client(&self) -> RecommendationClient<'_> {
        RecommendationClient::new(&self.api, self.connection.token().unwrap_or_default())
    }
}
