use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::engine::models::ResourceState;

// ─── Top-Level Settings ─────────────────────────────────────────────────────

/// Runtime configuration threaded into every lifecycle operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub parameters: ParameterNames,
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub identity: IdentitySettings,
}

impl Settings {
    /// Store key holding the connection info for this resource, honouring the
    /// per-resource override.
    pub fn connection_key_for(&self, resource: &ResourceState) -> String {
        resource
            .connection_parameter_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.parameters.connection.clone())
    }

    /// Store key holding the cached recommendation for a provisioning ID.
    pub fn recommendation_key(&self, provisioning_id: &str) -> String {
        format!("{}{}", self.parameters.recommendation_prefix, provisioning_id)
    }
}

// ─── Parameter Store ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_path")]
    pub path: String,
    #[serde(default = "default_max_versions")]
    pub max_versions: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            max_versions: default_max_versions(),
        }
    }
}

fn default_store_path() -> String {
    ".densify/parameters.db".to_string()
}

fn default_max_versions() -> u64 {
    crate::store::sqlite::DEFAULT_MAX_VERSIONS
}

/// Well-known parameter names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterNames {
    #[serde(default = "default_connection")]
    pub connection: String,
    #[serde(default = "default_recommendation_prefix")]
    pub recommendation_prefix: String,
    #[serde(default = "default_refresh_marker")]
    pub refresh_marker: String,
}

impl Default for ParameterNames {
    fn default() -> Self {
        Self {
            connection: default_connection(),
            recommendation_prefix: default_recommendation_prefix(),
            refresh_marker: default_refresh_marker(),
        }
    }
}

fn default_connection() -> String {
    "DensifyConnection".to_string()
}

fn default_recommendation_prefix() -> String {
    "Densify_Recommendation_".to_string()
}

fn default_refresh_marker() -> String {
    "DensifyRefreshTime".to_string()
}

// ─── Optimization Service ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Cloud provider segment of the analysis lookup path.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_api_root")]
    pub api_root: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Attribute id whose values are collected as resource tags.
    #[serde(default = "default_tag_attribute")]
    pub tag_attribute: String,
}

impl ServiceSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_root: default_api_root(),
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
            tag_attribute: default_tag_attribute(),
        }
    }
}

fn default_provider() -> String {
    "aws".to_string()
}

fn default_api_root() -> String {
    "/CIRBA/api".to_string()
}

fn default_api_version() -> String {
    "v2".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_tag_attribute() -> String {
    "attr_resource_tags".to_string()
}

// ─── Account Identity ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentitySettings {
    #[serde(default)]
    pub account_id: Option<String>,
}
