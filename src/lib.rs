pub mod config;
pub mod densify;
pub mod engine;
pub mod identity;
pub mod output;
pub mod store;
