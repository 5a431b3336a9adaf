use async_trait::async_trait;

use crate::densify::ServiceError;

/// Reports the caller's own account identifier.
#[async_trait]
pub trait AccountIdentity: Send + Sync {
    async fn account_id(&self) -> Result<String, ServiceError>;
}

/// Identity taken from configuration (or the `--account` flag).
#[derive(Debug, Clone, Default)]
pub struct ConfiguredIdentity {
    account: Option<String>,
}

impl ConfiguredIdentity {
    pub fn new(account: Option<String>) -> Self {
        Self {
            account: account.filter(|a| !a.trim().is_empty()),
        }
    }
}

#[async_trait]
impl AccountIdentity for ConfiguredIdentity {
    async fn account_id(&self) -> Result<String, ServiceError> {
        self.account.clone().ok_or_else(|| {
            ServiceError::RetrievalFailure("no account identity configured".to_string())
        })
    }
}
