use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::densify::Recommendation;

// ─── Resource Descriptor ────────────────────────────────────────────────────

/// The caller's description of one resource, plus the outputs the engine fills in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceState {
    #[serde(rename = "ProvisioningID", default, skip_serializing_if = "Option::is_none")]
    pub provisioning_id: Option<String>,
    /// Fallback type on input; the decided type on output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_uptime: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub savings_estimate: Option<f64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub force_update: bool,
    #[serde(rename = "TestAWSAccount", default, skip_serializing_if = "Option::is_none")]
    pub test_account_override: Option<String>,
    #[serde(
        rename = "DensifyConnectionParameterName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub connection_parameter_name: Option<String>,
}

impl ResourceState {
    pub fn new(provisioning_id: &str) -> Self {
        Self {
            provisioning_id: Some(provisioning_id.to_string()),
            ..Default::default()
        }
    }

    pub fn with_fallback(mut self, instance_type: &str) -> Self {
        self.instance_type = Some(instance_type.to_string());
        self
    }

    /// The fallback type, ignoring empty strings.
    pub fn fallback_type(&self) -> Option<&str> {
        self.instance_type.as_deref().filter(|t| !t.is_empty())
    }
}

// ─── Resolution Outcome ─────────────────────────────────────────────────────

/// Outcome of resolving one resource against the recommendation feed.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A recommendation to cache and return. Always timestamped.
    Resolved {
        recommendation: Recommendation,
        message: String,
    },
    /// Nothing should be cached; the event must fail.
    Failed { message: String },
}

impl Resolution {
    pub fn resolved(
        mut recommendation: Recommendation,
        now: DateTime<Utc>,
        message: impl Into<String>,
    ) -> Self {
        recommendation.timestamp = Some(now);
        Resolution::Resolved {
            recommendation,
            message: message.into(),
        }
    }

    pub fn fallback(fallback_type: &str, now: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self::resolved(Recommendation::fallback(fallback_type), now, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Resolution::Failed {
            message: message.into(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Resolution::Failed { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Resolution::Resolved { message, .. } | Resolution::Failed { message } => message,
        }
    }

    pub fn recommendation(&self) -> Option<&Recommendation> {
        match self {
            Resolution::Resolved { recommendation, .. } => Some(recommendation),
            Resolution::Failed { .. } => None,
        }
    }

    /// Record the test account on a resolved recommendation so later reads
    /// resolve against the same account.
    pub(crate) fn with_test_account(mut self, account: Option<&str>) -> Self {
        if let (Resolution::Resolved { recommendation, .. }, Some(account)) = (&mut self, account) {
            recommendation.test_account = Some(account.to_string());
        }
        self
    }
}

// ─── Lifecycle Events ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Success,
    Failed,
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationStatus::Success => write!(f, "SUCCESS"),
            OperationStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// What a lifecycle handler reports back to the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub status: OperationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_model: Option<ResourceState>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resource_models: Vec<ResourceState>,
}

impl ProgressEvent {
    pub fn success(model: ResourceState) -> Self {
        Self {
            status: OperationStatus::Success,
            message: None,
            resource_model: Some(model),
            resource_models: Vec::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: OperationStatus::Failed,
            message: Some(message.into()),
            resource_model: None,
            resource_models: Vec::new(),
        }
    }

    pub fn listed(models: Vec<ResourceState>) -> Self {
        Self {
            status: OperationStatus::Success,
            message: None,
            resource_model: None,
            resource_models: models,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_model(mut self, model: ResourceState) -> Self {
        self.resource_model = Some(model);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == OperationStatus::Success
    }
}
