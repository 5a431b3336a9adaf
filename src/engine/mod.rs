//! Recommendation resolution and the lifecycle choreography that keeps the
//! parameter store cache consistent.

pub mod clock;
pub mod lifecycle;
pub mod models;
pub mod policy;
pub mod refresh;
pub mod resolver;

use std::sync::Arc;

use crate::config::Settings;
use crate::identity::AccountIdentity;
use crate::store::ParameterStore;

use clock::{Clock, SystemClock};

pub use models::{OperationStatus, ProgressEvent, Resolution, ResourceState};

/// Resolves recommendations for resources and serves them from the cache.
///
/// Invocations are expected to be serial per provisioning ID; the engine does no
/// locking of its own.
pub struct RecommendationEngine {
    store: Arc<dyn ParameterStore>,
    identity: Arc<dyn AccountIdentity>,
    settings: Settings,
    clock: Arc<dyn Clock>,
}

impl RecommendationEngine {
    pub fn new(
        store: Arc<dyn ParameterStore>,
        identity: Arc<dyn AccountIdentity>,
        settings: Settings,
    ) -> Self {
        Self {
            store,
            identity,
            settings,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
