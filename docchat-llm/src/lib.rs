//! docchat-llm - Language model orchestration for docchat.
//!
//! This crate provides:
//! - [`provider::LlmProvider`]: unified backend interface with an Ollama
//!   implementation
//! - [`PromptBuilder`]: pure, bounded prompt assembly from query, retrieved
//!   context, and conversation history
//! - [`Orchestrator`]: bounded-concurrency, retrying caller of the backend

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod orchestrator;
pub mod prompt;
pub mod provider;

pub use orchestrator::{Orchestrator, RetryConfig};
pub use prompt::PromptBuilder;
pub use provider::{GenerateRequest, LlmProvider, OllamaProvider, ProviderError};
