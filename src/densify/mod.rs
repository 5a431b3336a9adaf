//! Integration with the Densify optimization service: connection info, session
//! tokens and the recommendation feed.

pub mod api;
pub mod client;
pub mod connection;
pub mod error;
pub mod models;
pub mod session;

pub use client::{FetchOutcome, RecommendationClient};
pub use connection::{load_connection, ConnectionInfo, SessionToken};
pub use error::{ConnectionError, ServiceError};
pub use models::Recommendation;
pub use session::{SessionManager, SessionOutcome};
