use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Implementation method under which approved changes are applied automatically.
pub const SELF_OPTIMIZATION: &str = "Self Optimization";

/// Approval type that approves any recommended type.
pub const APPROVE_ALL: &str = "all";

/// Placeholder for fields a locally built fallback cannot know.
pub const NOT_APPLICABLE: &str = "N/A";

/// Uptime and savings value of a fallback recommendation.
pub const UNKNOWN_METRIC: f64 = -1.0;

/// A sizing recommendation for one system, as cached in the parameter store.
///
/// Fields the service returns beyond the modelled ones are kept in `extra` so
/// a cached entry round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub entity_id: Option<String>,
    /// Matched against the resource's provisioning ID.
    #[serde(
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub current_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub recommended_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub implementation_method: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub approval_type: String,
    #[serde(default = "unknown_metric", deserialize_with = "lenient_metric")]
    pub predicted_uptime: f64,
    #[serde(default = "unknown_metric", deserialize_with = "lenient_metric")]
    pub savings_estimate: f64,
    /// Freshness anchor, set whenever the recommendation is cached or served.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: Vec<String>,
    #[serde(
        default,
        rename = "awsAccount",
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub test_account: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Recommendation {
    /// A locally built recommendation that keeps the caller's fallback type.
    pub fn fallback(fallback_type: &str) -> Self {
        Self {
            entity_id: None,
            name: None,
            current_type: fallback_type.to_string(),
            recommended_type: NOT_APPLICABLE.to_string(),
            implementation_method: NOT_APPLICABLE.to_string(),
            approval_type: String::new(),
            predicted_uptime: UNKNOWN_METRIC,
            savings_estimate: UNKNOWN_METRIC,
            timestamp: None,
            tags: Vec::new(),
            test_account: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.implementation_method == NOT_APPLICABLE && self.recommended_type == NOT_APPLICABLE
    }
}

fn unknown_metric() -> f64 {
    UNKNOWN_METRIC
}

/// Accepts numbers, numeric strings and null.
fn lenient_metric<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64().unwrap_or(UNKNOWN_METRIC),
        Value::String(s) => s.trim().parse().unwrap_or(UNKNOWN_METRIC),
        _ => UNKNOWN_METRIC,
    })
}

/// Scalar as text; null and structured values become absent.
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Accepts strings, numbers and booleans; anything else is empty.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?))
}

/// A list of scalars, or a single scalar as a one-element list.
fn lenient_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    })
}

// ─── Wire types ─────────────────────────────────────────────────────────────

/// Body returned by the authorize endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct AuthorizeResponse {
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "apiToken")]
    pub api_token: Option<String>,
}

/// One attribute of a system's detail record.
#[derive(Debug, Deserialize)]
pub(crate) struct SystemAttribute {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SystemDetail {
    #[serde(default)]
    pub attributes: Vec<SystemAttribute>,
}
