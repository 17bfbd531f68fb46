//! Backend abstraction for LLM generation.
//!
//! Provides a unified interface for invoking a language model backend with a
//! fully assembled prompt, plus the Ollama implementation used by default.

mod ollama;

pub use ollama::OllamaProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Unified interface for LLM backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Generate a completion for an assembled prompt.
    async fn generate(&self, request: GenerateRequest) -> Result<String, ProviderError>;
}

/// A single generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model to use
    pub model: String,
    /// Fully assembled prompt text
    pub prompt: String,
    /// Sampling temperature
    pub temperature: f64,
}

/// Error from a backend call.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub provider: String,
    pub model: String,
    pub message: String,
    pub status_code: Option<u16>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}:{}] {}", self.provider, self.model, self.message)
    }
}

impl std::error::Error for ProviderError {}
