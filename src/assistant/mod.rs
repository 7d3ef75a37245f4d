pub mod actions;
pub mod chat;
pub mod error;
pub mod prompt;
pub mod provider_factory;
pub mod providers;
pub mod reports;
pub mod types;

pub use error::ProviderError;
pub use provider_factory::{ConnectionTestResult, ProviderFactory};
pub use types::{ChatRole, TokenUsage};
