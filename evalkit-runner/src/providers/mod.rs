//! LLM Provider implementations

pub mod openai;
pub mod traits;

pub use openai::OpenAIClient;
pub use traits::{
    CompletionRequest, CompletionResponse, LLMProvider, Message, ProviderError, ProviderResult,
};

use crate::config::Config;
use std::sync::Arc;

/// Create the configured provider, reading its API key from the environment
pub fn create_provider(config: &Config) -> ProviderResult<Arc<dyn LLMProvider>> {
    match config.provider.name.to_lowercase().as_str() {
        "openai" | "openai-compatible" => {
            let client = OpenAIClient::from_config(&config.provider)?;
            tracing::debug!(
                "Using {} at {} (model {})",
                client.name(),
                client.base_url(),
                config.model()
            );
            Ok(Arc::new(client))
        }
        other => Err(ProviderError::Config(format!("Unknown provider: {}", other))),
    }
}
