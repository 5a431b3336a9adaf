use crate::densify::{
    load_connection, ConnectionError, ConnectionInfo, FetchOutcome, Recommendation,
    SessionManager, SessionOutcome,
};
use crate::store::{put_parameter, PutOutcome, StoreResult};

use super::models::{Resolution, ResourceState};
use super::policy::match_recommendation;
use super::RecommendationEngine;

impl RecommendationEngine {
    /// Resolve one resource to a recommendation, falling back to the caller's
    /// instance type when the service or the match fails.
    ///
    /// Call order: health check, optional authorize, account lookup, analysis
    /// lookup, recommendation fetch, tag lookups. A reissued session token is
    /// written back to the connection parameter before the fetch.
    pub async fn resolve(&self, state: &ResourceState, connection: ConnectionInfo) -> Resolution {
        let now = self.clock.now();
        let provisioning_id = state.provisioning_id.as_deref().unwrap_or_default();
        let fallback = state.fallback_type();
        let service_url = connection.base_url();

        let mut session = match SessionManager::new(connection, &self.settings.service) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(url = %service_url, error = %e, "Failed to set up Densify session");
                return unreachable(&service_url, fallback, now)
                    .with_test_account(state.test_account_override.as_deref());
            }
        };

        match session.ensure_session(now).await {
            SessionOutcome::Unreachable(_) => {
                return unreachable(&service_url, fallback, now)
                    .with_test_account(state.test_account_override.as_deref());
            }
            SessionOutcome::Reissued => {
                self.persist_connection(state, session.connection()).await;
            }
            SessionOutcome::Reused => {}
        }

        let account = match state.test_account_override.as_deref() {
            Some(account) => Ok(account.to_string()),
            None => self.identity.account_id().await,
        };

        let fetched = match account {
            Ok(account) => session.client().fetch_recommendations(&account).await,
            Err(e) => FetchOutcome::NotAvailable(e.to_string()),
        };

        let resolution = match fetched {
            FetchOutcome::NotAvailable(reason) => match fallback {
                Some(fallback) => {
                    tracing::info!(
                        provisioning_id = %provisioning_id,
                        reason = %reason,
                        fallback = %fallback,
                        "Recommendations not available, using fallback"
                    );
                    Resolution::fallback(
                        fallback,
                        now,
                        "Was not able to retrieve recommendations, used fallback instance type",
                    )
                }
                None => Resolution::failed(format!(
                    "Could not retrieve recommendations ({}) and no fallback instance type was specified",
                    reason
                )),
            },
            FetchOutcome::Available(recommendations) => {
                match match_recommendation(provisioning_id, &recommendations) {
                    Some(found) => {
                        tracing::info!(
                            provisioning_id = %provisioning_id,
                            current = %found.current_type,
                            recommended = %found.recommended_type,
                            "Matched recommendation"
                        );
                        Resolution::resolved(found.clone(), now, "Successfully found matching instance")
                    }
                    None => match fallback {
                        Some(fallback) => {
                            tracing::info!(
                                provisioning_id = %provisioning_id,
                                fallback = %fallback,
                                "No matching recommendation, using fallback"
                            );
                            Resolution::fallback(
                                fallback,
                                now,
                                format!(
                                    "Could not find a recommendation for {}, used fallback instance type",
                                    provisioning_id
                                ),
                            )
                        }
                        None => Resolution::failed(format!(
                            "Could not find a recommendation for {} and no fallback instance type was specified",
                            provisioning_id
                        )),
                    },
                }
            }
        };

        resolution.with_test_account(state.test_account_override.as_deref())
    }

    /// Connection info for a resource, honouring its connection parameter override.
    pub async fn load_connection_for(
        &self,
        state: &ResourceState,
    ) -> Result<ConnectionInfo, ConnectionError> {
        let key = self.settings.connection_key_for(state);
        load_connection(self.store.as_ref(), &key).await
    }

    /// Write a recommendation to its cache entry.
    pub async fn persist_recommendation(
        &self,
        provisioning_id: &str,
        recommendation: &Recommendation,
    ) -> StoreResult<PutOutcome> {
        let key = self.settings.recommendation_key(provisioning_id);
        let value = serde_json::to_string(recommendation)
            .map_err(|e| crate::store::StoreError::Backend(format!("{}: {}", key, e)))?;
        put_parameter(self.store.as_ref(), &key, &value, false).await
    }

    /// Best-effort write of a reissued session token.
    async fn persist_connection(&self, state: &ResourceState, connection: &ConnectionInfo) {
        let key = self.settings.connection_key_for(state);
        let value = match connection.to_json() {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to serialize connection info");
                return;
            }
        };
        match put_parameter(self.store.as_ref(), &key, &value, true).await {
            Ok(_) => tracing::debug!(key = %key, "Updated Densify connection info"),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to update Densify connection info")
            }
        }
    }
}

fn unreachable(
    service_url: &str,
    fallback: Option<&str>,
    now: chrono::DateTime<chrono::Utc>,
) -> Resolution {
    match fallback {
        Some(fallback) => {
            tracing::info!(url = %service_url, fallback = %fallback, "Densify unreachable, using fallback");
            Resolution::fallback(
                fallback,
                now,
                format!(
                    "Could not establish connection with Densify at {}, used fallback instance type",
                    service_url
                ),
            )
        }
        None => Resolution::failed(format!(
            "Could not establish connection with Densify at {} and no fallback instance type was specified",
            service_url
        )),
    }
}
