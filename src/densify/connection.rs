use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::ConnectionError;
use crate::store::{ParameterStore, StoreError};

/// Credentials and session state for the optimization service.
///
/// Persisted as JSON under the connection parameter. The token and its issue
/// time travel together or not at all.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    #[serde(rename = "DensifyUrl")]
    pub service_url: String,
    #[serde(rename = "DensifyUsername")]
    pub username: String,
    #[serde(rename = "DensifyPassword")]
    pub password: String,
    #[serde(flatten, default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionToken>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionToken {
    #[serde(rename = "apiToken")]
    pub token: String,
    #[serde(rename = "timestamp")]
    pub issued_at: DateTime<Utc>,
}

impl ConnectionInfo {
    pub fn new(service_url: &str, username: &str, password: &str) -> Self {
        Self {
            service_url: service_url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            session: None,
        }
    }

    /// Service root with a scheme; bare hosts are assumed to be HTTPS.
    pub fn base_url(&self) -> String {
        let url = self.service_url.trim().trim_end_matches('/');
        if url.contains("://") {
            url.to_string()
        } else {
            format!("https://{}", url)
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.token.as_str())
    }

    pub fn set_token(&mut self, token: String, issued_at: DateTime<Utc>) {
        self.session = Some(SessionToken { token, issued_at });
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(key: &str, raw: &str) -> Result<Self, ConnectionError> {
        serde_json::from_str(raw).map_err(|e| ConnectionError::Parse {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }
}

impl fmt::Debug for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionInfo")
            .field("service_url", &self.service_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("session", &self.session)
            .finish()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("token", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Read and parse the connection info stored under `key`.
pub async fn load_connection(
    store: &dyn ParameterStore,
    key: &str,
) -> Result<ConnectionInfo, ConnectionError> {
    let raw = match store.get(key).await {
        Ok(raw) => raw,
        Err(StoreError::NotFound(_)) => return Err(ConnectionError::Missing(key.to_string())),
        Err(e) => return Err(e.into()),
    };
    ConnectionInfo::from_json(key, &raw).inspect_err(|e| {
        tracing::warn!(key = %key, error = %e, "Stored connection info has incorrect format");
    })
}
