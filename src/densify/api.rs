use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde_json::Value;

use super::error::ServiceError;
use super::models::AuthorizeResponse;
use crate::config::types::ServiceSettings;

/// Low-level REST access to the optimization service.
///
/// Every call returns a [`ServiceError`] instead of a raw transport error so
/// callers can fold failures into their own outcomes.
pub struct DensifyApi {
    http: reqwest::Client,
    base_url: String,
    settings: ServiceSettings,
}

impl DensifyApi {
    pub fn new(base_url: &str, settings: &ServiceSettings) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| ServiceError::Unreachable(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            settings: settings.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Versioned API path, e.g. `/systems/abc` -> `{base}/CIRBA/api/v2/systems/abc`.
    pub fn api_url(&self, path: &str) -> String {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        format!(
            "{}{}/{}{}",
            self.base_url, self.settings.api_root, self.settings.api_version, path
        )
    }

    /// Health check against the unversioned service root.
    pub async fn ping(&self) -> Result<(), ServiceError> {
        let url = format!("{}{}/ping", self.base_url, self.settings.api_root);
        let res = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ServiceError::Unreachable(format!("{}: {}", url, e)))?;

        if res.status() != StatusCode::OK {
            return Err(ServiceError::Unreachable(format!(
                "health check {} returned {}",
                url,
                res.status().as_u16()
            )));
        }
        Ok(())
    }

    /// Exchange credentials for an API token.
    pub async fn authorize(&self, username: &str, password: &str) -> Result<String, ServiceError> {
        let url = self.api_url("/authorize");
        let body = serde_json::json!({ "userName": username, "pwd": password });

        let res = self
            .http
            .post(&url)
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::Unreachable(format!("{}: {}", url, e)))?;

        if res.status() != StatusCode::OK {
            return Err(ServiceError::AuthFailure(format!(
                "authorize returned {}",
                res.status().as_u16()
            )));
        }

        let auth: AuthorizeResponse = res
            .json()
            .await
            .map_err(|e| ServiceError::AuthFailure(format!("malformed authorize response: {}", e)))?;

        if let Some(status) = auth.status {
            if status != 200 {
                return Err(ServiceError::AuthFailure(
                    auth.message
                        .unwrap_or_else(|| format!("authorize reported status {}", status)),
                ));
            }
        }

        auth.api_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ServiceError::AuthFailure("response carried no apiToken".to_string()))
    }

    /// Authenticated GET of a versioned path, normalised to a list of records.
    ///
    /// A single JSON object is returned as a one-element list. A list whose first
    /// record is error-flagged is a [`ServiceError::RetrievalFailure`].
    pub async fn get_records(
        &self,
        path: &str,
        query: &[(&str, &str)],
        token: &str,
    ) -> Result<Vec<Value>, ServiceError> {
        let url = self.api_url(path);
        let res = self
            .http
            .get(&url)
            .query(query)
            .header(ACCEPT, "application/json")
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ServiceError::RetrievalFailure(format!("{}: {}", url, e)))?;

        if res.status() != StatusCode::OK {
            return Err(ServiceError::RetrievalFailure(format!(
                "{} returned {}",
                url,
                res.status().as_u16()
            )));
        }

        let body: Value = res
            .json()
            .await
            .map_err(|e| ServiceError::Parse(format!("{}: {}", url, e)))?;

        let records = match body {
            Value::Array(items) => items,
            other => vec![other],
        };

        if let Some(message) = records.first().and_then(error_flag) {
            return Err(ServiceError::RetrievalFailure(message));
        }
        Ok(records)
    }
}

/// Message of an error-flagged record, if it is one.
pub(crate) fn error_flag(record: &Value) -> Option<String> {
    if let Some(msg) = record.get("ErrorMessage") {
        return Some(value_to_string(msg));
    }
    let status = record.get("status").and_then(Value::as_i64)?;
    if status != 200 && record.get("message").is_some() {
        let msg = record.get("message").map(value_to_string).unwrap_or_default();
        return Some(format!("status {}: {}", status, msg));
    }
    None
}

pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_message_records_are_flagged() {
        let record = json!({ "ErrorMessage": "connection reset" });
        assert_eq!(error_flag(&record).as_deref(), Some("connection reset"));
    }

    #[test]
    fn status_message_pairs_are_flagged() {
        let record = json!({ "status": 404, "message": "analysis not found" });
        assert_eq!(
            error_flag(&record).as_deref(),
            Some("status 404: analysis not found")
        );
    }

    #[test]
    fn ordinary_records_are_not_flagged() {
        assert!(error_flag(&json!({ "name": "vm-42", "status": 200 })).is_none());
        assert!(error_flag(&json!({ "analysisResults": "/x" })).is_none());
    }

    #[test]
    fn api_url_joins_root_version_and_path() {
        let api = DensifyApi::new("https://densify.example.com/", &ServiceSettings::default())
            .unwrap();
        assert_eq!(
            api.api_url("/systems/abc"),
            "https://densify.example.com/CIRBA/api/v2/systems/abc"
        );
        assert_eq!(
            api.api_url("authorize"),
            "https://densify.example.com/CIRBA/api/v2/authorize"
        );
    }
}
