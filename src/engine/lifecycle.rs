use crate::densify::{ConnectionInfo, Recommendation};
use crate::store::{PutOutcome, StoreError};

use super::models::{ProgressEvent, Resolution, ResourceState};
use super::policy::{decide_type, recommendation_is_fresh};
use super::refresh::update_refresh_marker;
use super::RecommendationEngine;

/// Copy a recommendation's outputs onto the model; `instance_type` becomes the
/// decided type.
pub fn apply_recommendation(model: &mut ResourceState, recommendation: &Recommendation) {
    model.current_type = Some(recommendation.current_type.clone());
    model.recommended_type = Some(recommendation.recommended_type.clone());
    model.predicted_uptime = Some(recommendation.predicted_uptime);
    model.savings_estimate = Some(recommendation.savings_estimate);
    model.instance_type = Some(decide_type(recommendation).to_string());
}

impl RecommendationEngine {
    // ─── Create ─────────────────────────────────────────────────────────────

    pub async fn create(&self, model: ResourceState) -> ProgressEvent {
        let Some(id) = model.provisioning_id.clone() else {
            return ProgressEvent::success(model);
        };
        tracing::info!(provisioning_id = %id, "Creating recommendation resource");

        let connection = match self.load_connection_for(&model).await {
            Ok(connection) => connection,
            Err(e) => return ProgressEvent::failed(e.to_string()),
        };

        let key = self.settings.recommendation_key(&id);
        match self.store.get(&key).await {
            Ok(_) => return ProgressEvent::failed(format!("Parameter {} already exists!", key)),
            Err(StoreError::NotFound(_)) => {}
            Err(e) => {
                return ProgressEvent::failed(format!("Could not check parameter {}: {}", key, e))
            }
        }

        self.resolve_and_store(model, &id, connection).await
    }

    // ─── Read ───────────────────────────────────────────────────────────────

    pub async fn read(&self, mut model: ResourceState) -> ProgressEvent {
        let Some(id) = model.provisioning_id.clone() else {
            return ProgressEvent::success(model);
        };
        tracing::info!(provisioning_id = %id, "Reading recommendation");

        let key = self.settings.recommendation_key(&id);
        let raw = match self.store.get(&key).await {
            Ok(raw) => raw,
            Err(StoreError::NotFound(_)) => {
                return ProgressEvent::failed(format!("Could not find recommendation for {}", id))
            }
            Err(e) => {
                return ProgressEvent::failed(format!(
                    "Could not read recommendation for {}: {}",
                    id, e
                ))
            }
        };

        let mut recommendation = match serde_json::from_str::<Recommendation>(&raw) {
            Ok(rec) => rec,
            Err(e) => {
                tracing::warn!(provisioning_id = %id, error = %e, "Stored recommendation has incorrect format");
                return match self.refresh(&model, &id).await {
                    Ok(rec) => {
                        apply_recommendation(&mut model, &rec);
                        ProgressEvent::success(model)
                            .with_message("Replaced unreadable cached recommendation")
                    }
                    Err(message) => ProgressEvent::failed(format!(
                        "Could not parse recommendation from parameter store: {}",
                        message
                    )),
                };
            }
        };

        if let Some(account) = &recommendation.test_account {
            model.test_account_override = Some(account.clone());
        }

        let mut message = None;
        if !recommendation_is_fresh(&recommendation, self.clock.now()) {
            tracing::info!(provisioning_id = %id, "Stored recommendation is stale, refreshing");
            model.instance_type = Some(recommendation.current_type.clone());
            match self.refresh(&model, &id).await {
                Ok(refreshed) => {
                    recommendation = refreshed;
                    message = Some("Successfully read the value".to_string());
                }
                Err(reason) => {
                    tracing::warn!(provisioning_id = %id, reason = %reason, "Refresh failed, serving cached value");
                    message = Some(format!("Refresh failed, served cached value: {}", reason));
                }
            }
        }

        apply_recommendation(&mut model, &recommendation);
        let event = ProgressEvent::success(model);
        match message {
            Some(message) => event.with_message(message),
            None => event,
        }
    }

    // ─── Update ─────────────────────────────────────────────────────────────

    pub async fn update(
        &self,
        mut model: ResourceState,
        previous: Option<ResourceState>,
    ) -> ProgressEvent {
        let Some(id) = model.provisioning_id.clone() else {
            return ProgressEvent::success(model);
        };
        tracing::info!(provisioning_id = %id, "Updating recommendation resource");

        let mut previous_recommendation = None;
        if let Some(previous_id) = previous.and_then(|p| p.provisioning_id) {
            let previous_key = self.settings.recommendation_key(&previous_id);
            let raw = self.store.get(&previous_key).await.ok();
            match self.store.delete(&previous_key).await {
                Ok(()) => tracing::info!(provisioning_id = %previous_id, "Deleted previous recommendation"),
                Err(StoreError::NotFound(_)) => {}
                Err(e) => {
                    tracing::warn!(provisioning_id = %previous_id, error = %e, "Failed to delete previous recommendation")
                }
            }
            previous_recommendation =
                raw.and_then(|r| serde_json::from_str::<Recommendation>(&r).ok());
        }

        let connection = match self.load_connection_for(&model).await {
            Ok(connection) => connection,
            Err(e) => return ProgressEvent::failed(e.to_string()),
        };

        if model.fallback_type().is_none() {
            if let Some(previous) = previous_recommendation.filter(|r| !r.current_type.is_empty()) {
                tracing::info!(provisioning_id = %id, "No fallback specified, using previous recommendation");
                model.instance_type = Some(previous.current_type);
            }
        }

        self.resolve_and_store(model, &id, connection).await
    }

    // ─── Delete ─────────────────────────────────────────────────────────────

    pub async fn delete(&self, model: ResourceState) -> ProgressEvent {
        let Some(id) = model.provisioning_id.clone() else {
            return ProgressEvent::success(model);
        };
        tracing::info!(provisioning_id = %id, "Deleting recommendation");

        let key = self.settings.recommendation_key(&id);
        match self.store.delete(&key).await {
            Ok(()) => ProgressEvent::success(model),
            Err(StoreError::NotFound(_)) => {
                ProgressEvent::failed(format!("Already deleted parameter for {}", id))
                    .with_model(model)
            }
            Err(e) => ProgressEvent::failed(format!("Could not delete parameter {}: {}", key, e))
                .with_model(model),
        }
    }

    // ─── List ───────────────────────────────────────────────────────────────

    pub async fn list(&self, model: ResourceState) -> ProgressEvent {
        if model.provisioning_id.is_none() {
            return ProgressEvent::listed(Vec::new());
        }
        ProgressEvent::listed(vec![model])
    }

    // ─── Shared steps ───────────────────────────────────────────────────────

    async fn resolve_and_store(
        &self,
        mut model: ResourceState,
        id: &str,
        connection: ConnectionInfo,
    ) -> ProgressEvent {
        match self.resolve(&model, connection).await {
            Resolution::Failed { message } => {
                tracing::warn!(provisioning_id = %id, reason = %message, "Failed to resolve instance type");
                ProgressEvent::failed(message)
            }
            Resolution::Resolved {
                recommendation,
                message,
            } => {
                if let Err(e) = self.persist_recommendation(id, &recommendation).await {
                    return ProgressEvent::failed(format!(
                        "Could not store recommendation for {}: {}",
                        id, e
                    ));
                }
                apply_recommendation(&mut model, &recommendation);
                if model.force_update {
                    update_refresh_marker(
                        self.store.as_ref(),
                        &self.settings.parameters.refresh_marker,
                        self.clock.now(),
                    )
                    .await;
                }
                ProgressEvent::success(model).with_message(message)
            }
        }
    }

    /// Resolve afresh and replace the cache entry. Errors carry the reason the
    /// refresh could not produce a recommendation.
    async fn refresh(&self, model: &ResourceState, id: &str) -> Result<Recommendation, String> {
        let connection = self
            .load_connection_for(model)
            .await
            .map_err(|e| e.to_string())?;

        match self.resolve(model, connection).await {
            Resolution::Failed { message } => Err(message),
            Resolution::Resolved { recommendation, .. } => {
                match self.persist_recommendation(id, &recommendation).await {
                    Ok(PutOutcome::Written { .. }) => {}
                    Ok(PutOutcome::Dropped) => {
                        tracing::warn!(provisioning_id = %id, "Refreshed recommendation was not cached")
                    }
                    Err(e) => {
                        tracing::warn!(provisioning_id = %id, error = %e, "Failed to cache refreshed recommendation")
                    }
                }
                Ok(recommendation)
            }
        }
    }
}
