//! Bounded-concurrency, retrying caller of the LLM backend.
//!
//! One orchestrator is shared process-wide; its semaphore is the single
//! admission gate protecting the model backend from overload. tokio's
//! semaphore queues waiters FIFO, which gives the fairness the gate needs.
//! The permit is acquired around the backend call only: prompt construction
//! and backoff sleeps happen without it, so a retrying caller never starves
//! the callers behind it.

use crate::prompt::PromptBuilder;
use crate::provider::{GenerateRequest, LlmProvider, ProviderError};
use docchat_common::{Config, Error, Result};
use docchat_session::ChatTurn;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Retry policy for backend calls.
///
/// Every backend failure is retried identically; there is no error-class
/// distinction at this layer.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts before the generation fails.
    pub attempts: u32,
    /// Smallest backoff between attempts.
    pub min_wait: Duration,
    /// Backoff ceiling.
    pub max_wait: Duration,
}

impl RetryConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            attempts: config.retry_attempts,
            min_wait: Duration::from_secs(config.min_retry_wait_secs),
            max_wait: Duration::from_secs(config.max_retry_wait_secs),
        }
    }

    /// Backoff before the retry following failed attempt `attempt` (0-based):
    /// doubles from `min_wait`, capped at `max_wait`.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let millis = (self.min_wait.as_millis() as u64)
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.max_wait.as_millis() as u64);
        Duration::from_millis(millis)
    }
}

/// Shared, gate-protected entry point for generation.
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    prompt_builder: PromptBuilder,
    retry: RetryConfig,
    gate: Arc<Semaphore>,
    max_in_flight: usize,
    model: String,
    temperature: f64,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        prompt_builder: PromptBuilder,
        retry: RetryConfig,
        concurrent_requests: usize,
        model: impl Into<String>,
        temperature: f64,
    ) -> Self {
        Self {
            provider,
            prompt_builder,
            retry,
            gate: Arc::new(Semaphore::new(concurrent_requests)),
            max_in_flight: concurrent_requests,
            model: model.into(),
            temperature,
        }
    }

    /// Backend calls currently holding the gate.
    pub fn in_flight(&self) -> usize {
        self.max_in_flight
            .saturating_sub(self.gate.available_permits())
    }

    /// Build the prompt and call the backend, retrying with exponential
    /// backoff. Fails with [`Error::Generation`] once all attempts are spent.
    pub async fn generate(
        &self,
        query: &str,
        fragments: &[String],
        history: &[ChatTurn],
    ) -> Result<String> {
        let prompt = self.prompt_builder.build(query, fragments, history);
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt,
            temperature: self.temperature,
        };

        let mut last_error: Option<ProviderError> = None;

        for attempt in 0..self.retry.attempts {
            if attempt > 0 {
                let delay = self.retry.backoff_delay(attempt - 1);
                tracing::warn!(
                    provider = self.provider.name(),
                    attempt = attempt + 1,
                    max_attempts = self.retry.attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Backend call failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }

            // Permit scope covers the backend call only.
            let result = {
                let _permit = self
                    .gate
                    .acquire()
                    .await
                    .map_err(|_| Error::Internal("concurrency gate closed".into()))?;
                self.provider.generate(request.clone()).await
            };

            match result {
                Ok(answer) => {
                    if attempt > 0 {
                        tracing::info!(
                            provider = self.provider.name(),
                            attempt = attempt + 1,
                            "Backend recovered after retries"
                        );
                    }
                    return Ok(answer);
                }
                Err(e) => {
                    last_error = Some(e);
                }
            }
        }

        let detail = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempts made".to_string());
        Err(Error::Generation(format!(
            "backend failed after {} attempts: {}",
            self.retry.attempts, detail
        )))
    }
}
