use chrono::{DateTime, Duration, Utc};

use crate::densify::models::{Recommendation, APPROVE_ALL, SELF_OPTIMIZATION};

/// Minutes a cached recommendation is served before it is refreshed.
pub const STALENESS_WINDOW_MINUTES: i64 = 2;

/// Fresh iff `now` is strictly before `timestamp` + the staleness window.
pub fn is_fresh(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now < timestamp + Duration::minutes(STALENESS_WINDOW_MINUTES)
}

/// A recommendation without a timestamp is never fresh.
pub fn recommendation_is_fresh(recommendation: &Recommendation, now: DateTime<Utc>) -> bool {
    recommendation
        .timestamp
        .map(|ts| is_fresh(ts, now))
        .unwrap_or(false)
}

/// The instance type that should actually be applied.
///
/// Only self-optimizing systems move to the recommended type, and only when the
/// approval covers it (`all`, or exactly the recommended type).
pub fn decide_type(recommendation: &Recommendation) -> &str {
    let approved = recommendation.approval_type == APPROVE_ALL
        || recommendation.approval_type == recommendation.recommended_type;
    if recommendation.implementation_method == SELF_OPTIMIZATION && approved {
        &recommendation.recommended_type
    } else {
        &recommendation.current_type
    }
}

/// First recommendation whose name equals the provisioning ID exactly.
pub fn match_recommendation<'a>(
    provisioning_id: &str,
    recommendations: &'a [Recommendation],
) -> Option<&'a Recommendation> {
    recommendations
        .iter()
        .find(|r| r.name.as_deref() == Some(provisioning_id))
}
