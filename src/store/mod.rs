pub mod backend;
pub mod error;
pub mod models;
pub mod schema;
pub mod sqlite;
pub mod writer;

pub use backend::ParameterStore;
pub use error::{StoreError, StoreResult};
pub use models::{Parameter, PutOutcome};
pub use sqlite::SqliteParameterStore;
pub use writer::put_parameter;
