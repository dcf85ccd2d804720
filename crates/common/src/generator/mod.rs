//! Proposal generator abstraction
//!
//! The generator turns source text into candidate flashcards. Providers:
//! - OpenRouter (any chat-completions model reachable through it)
//! - Mock (deterministic, sentence based; for development and tests)
//!
//! Generators never retry. A call is billed and may be slow, so retry policy
//! belongs to whoever invokes the generation endpoint.

mod mock;
mod openrouter;

pub use mock::MockGenerator;
pub use openrouter::{parse_proposals, OpenRouterGenerator};

use crate::config::GeneratorConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// A front/back pair suggested by the generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub front: String,
    pub back: String,
}

impl Proposal {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
        }
    }
}

/// Error codes recorded in generation error logs
pub mod codes {
    /// The call did not finish within the configured timeout
    pub const TIMEOUT: &str = "TIMEOUT";
    /// The provider could not be reached
    pub const PROVIDER_UNAVAILABLE: &str = "PROVIDER_UNAVAILABLE";
    /// The provider answered with an error
    pub const PROVIDER_ERROR: &str = "PROVIDER_ERROR";
    /// The provider answered, but not with usable proposals
    pub const MALFORMED_OUTPUT: &str = "MALFORMED_OUTPUT";
    /// The generation task died before reporting a result
    pub const INTERNAL: &str = "INTERNAL";
}

/// Failure reported by a generator, mapped 1:1 into an error log entry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct GeneratorError {
    pub code: String,
    pub message: String,
}

impl GeneratorError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(codes::MALFORMED_OUTPUT, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(codes::PROVIDER_UNAVAILABLE, message)
    }
}

/// Trait for proposal generation
#[async_trait]
pub trait ProposalGenerator: Send + Sync {
    /// Produce proposals for the given source text
    async fn generate(&self, source_text: &str) -> std::result::Result<Vec<Proposal>, GeneratorError>;

    /// Identifier of the model behind this generator
    fn model_name(&self) -> &str;
}

/// Create a generator based on configuration
pub fn create_generator(config: &GeneratorConfig) -> Result<Arc<dyn ProposalGenerator>> {
    match config.provider.as_str() {
        "openrouter" => {
            let key = config.api_key.clone().ok_or_else(|| AppError::Configuration {
                message: "generator.api_key is required for the openrouter provider".to_string(),
            })?;
            Ok(Arc::new(OpenRouterGenerator::new(
                key,
                config.model.clone(),
                config.api_base.clone(),
                config.temperature,
                config.max_proposals,
            )?))
        }
        "mock" => Ok(Arc::new(MockGenerator::new(config.max_proposals))),
        other => Err(AppError::Configuration {
            message: format!("Unknown generator provider: {}", other),
        }),
    }
}
