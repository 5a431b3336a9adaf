pub mod loader;
pub mod types;

pub use loader::{load_settings, parse_settings};
pub use types::Settings;
