use serde::{Deserialize, Serialize};

/// A parameter as held by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
    /// Stored as an encrypted (secure) parameter.
    pub secure: bool,
    pub version: u64,
    pub updated_at: String,
}

/// Result of a best-effort write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Written { version: u64 },
    /// The store was busy and the write was dropped.
    Dropped,
}
