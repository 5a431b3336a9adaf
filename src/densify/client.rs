use serde_json::Value;

use super::api::{value_to_string, DensifyApi};
use super::models::{Recommendation, SystemDetail};

/// Result of [`RecommendationClient::fetch_recommendations`].
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Available(Vec<Recommendation>),
    /// The account has no usable analysis or recommendation list.
    NotAvailable(String),
}

/// Fetches an account's recommendations and enriches them with resource tags.
pub struct RecommendationClient<'a> {
    api: &'a DensifyApi,
    token: &'a str,
}

impl<'a> RecommendationClient<'a> {
    pub fn new(api: &'a DensifyApi, token: &'a str) -> Self {
        Self { api, token }
    }

    /// Resolve the account's analysis, follow it to the recommendation list and
    /// attach tags to every entry.
    pub async fn fetch_recommendations(&self, account: &str) -> FetchOutcome {
        let results_path = match self.analysis_results_path(account).await {
            Ok(path) => path,
            Err(reason) => {
                tracing::warn!(account = %account, reason = %reason, "Could not retrieve analysis information");
                return FetchOutcome::NotAvailable(reason);
            }
        };

        let records = match self.api.get_records(&results_path, &[], self.token).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(account = %account, error = %e, "Could not retrieve recommendations");
                return FetchOutcome::NotAvailable(e.to_string());
            }
        };

        let mut recommendations: Vec<Recommendation> = Vec::with_capacity(records.len());
        for record in records {
            match serde_json::from_value::<Recommendation>(record) {
                Ok(rec) => recommendations.push(rec),
                Err(e) => {
                    tracing::warn!(account = %account, error = %e, "Skipping malformed recommendation");
                }
            }
        }

        if recommendations.is_empty() {
            return FetchOutcome::NotAvailable(format!(
                "no recommendations available for account {}",
                account
            ));
        }

        for rec in recommendations.iter_mut() {
            if let Some(entity_id) = rec.entity_id.as_deref() {
                rec.tags = self.fetch_tags(entity_id).await;
            }
        }

        tracing::debug!(account = %account, count = recommendations.len(), "Fetched recommendations");
        FetchOutcome::Available(recommendations)
    }

    async fn analysis_results_path(&self, account: &str) -> Result<String, String> {
        let path = format!("/analysis/cloud/{}", self.api.settings().provider);
        let analyses = self
            .api
            .get_records(&path, &[("analysisName", account)], self.token)
            .await
            .map_err(|e| e.to_string())?;

        analyses
            .first()
            .and_then(|a| a.get("analysisResults"))
            .filter(|v| !v.is_null())
            .map(value_to_string)
            .ok_or_else(|| format!("no analysis found for account {}", account))
    }

    /// Values of the tag attribute for one system. A failed lookup yields no tags.
    async fn fetch_tags(&self, entity_id: &str) -> Vec<String> {
        let path = format!("/systems/{}", entity_id);
        let records = match self.api.get_records(&path, &[], self.token).await {
            Ok(records) => records,
            Err(e) => {
                tracing::debug!(entity_id = %entity_id, error = %e, "Tag lookup failed");
                return Vec::new();
            }
        };

        let Some(detail) = records
            .into_iter()
            .next()
            .and_then(|r| serde_json::from_value::<SystemDetail>(r).ok())
        else {
            return Vec::new();
        };

        let tag_attribute = &self.api.settings().tag_attribute;
        detail
            .attributes
            .iter()
            .filter(|attr| &attr.id == tag_attribute)
            .flat_map(|attr| match &attr.value {
                Value::Array(items) => items.iter().map(value_to_string).collect(),
                other => vec![value_to_string(other)],
            })
            .collect()
    }
}
