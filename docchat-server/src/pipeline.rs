//! Request-scoped query pipeline.
//!
//! One pipeline run per inbound query: resolve the session, retrieve
//! context, generate an answer under the orchestrator's gate, then persist
//! the turn. Nothing is persisted on error, so a failed generation never
//! leaves a half-appended history.

use docchat_common::{Error, Result};
use docchat_llm::Orchestrator;
use docchat_session::{SessionStore, VectorStore};
use std::sync::Arc;

/// Progress of a single query through the pipeline, logged per transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    SessionResolved,
    ContextRetrieved,
    PromptBuilt,
    AnswerGenerated,
    HistoryAppended,
    Done,
    Error,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::SessionResolved => "session_resolved",
            Self::ContextRetrieved => "context_retrieved",
            Self::PromptBuilt => "prompt_built",
            Self::AnswerGenerated => "answer_generated",
            Self::HistoryAppended => "history_appended",
            Self::Done => "done",
            Self::Error => "error",
        };
        write!(f, "{name}")
    }
}

/// Composes the session store, retrieval collaborator, and orchestrator
/// into one request-scoped flow.
pub struct QueryPipeline {
    store: Arc<SessionStore>,
    vector_store: Arc<dyn VectorStore>,
    orchestrator: Arc<Orchestrator>,
}

impl QueryPipeline {
    pub fn new(
        store: Arc<SessionStore>,
        vector_store: Arc<dyn VectorStore>,
        orchestrator: Arc<Orchestrator>,
    ) -> Self {
        Self {
            store,
            vector_store,
            orchestrator,
        }
    }

    /// Run one query to completion and return the generated answer.
    pub async fn run(&self, session_id: &str, query: &str) -> Result<String> {
        let result = self.run_inner(session_id, query).await;
        if let Err(ref e) = result {
            tracing::debug!(session_id = %session_id, state = %PipelineState::Error, error = %e, "Pipeline failed");
        }
        result
    }

    async fn run_inner(&self, session_id: &str, query: &str) -> Result<String> {
        let mut state = PipelineState::Start;

        // Query before upload is valid: an unknown session resolves to an
        // implicit empty one, created on the history append below.
        let session = self.store.get(session_id).await;
        state = self.transition(session_id, state, PipelineState::SessionResolved);
        tracing::debug!(
            session_id = %session_id,
            known = session.is_some(),
            files = session.as_ref().map(|s| s.files.len()).unwrap_or(0),
            "Session resolved"
        );

        let fragments = self
            .vector_store
            .retrieve(session_id, query)
            .await
            .map_err(|e| Error::StoreUnavailable(format!("retrieval failed: {e}")))?;
        state = self.transition(session_id, state, PipelineState::ContextRetrieved);

        let history = self.store.history(session_id).await;

        // The orchestrator assembles the prompt before touching the gate;
        // an empty fragment list falls back to the default context sentence.
        state = self.transition(session_id, state, PipelineState::PromptBuilt);
        let answer = self
            .orchestrator
            .generate(query, &fragments, &history)
            .await?;
        state = self.transition(session_id, state, PipelineState::AnswerGenerated);

        // History is part of the interaction contract, not best-effort
        // telemetry: append before responding.
        self.store.append_history(session_id, query, &answer).await;
        state = self.transition(session_id, state, PipelineState::HistoryAppended);

        self.transition(session_id, state, PipelineState::Done);
        Ok(answer)
    }

    fn transition(
        &self,
        session_id: &str,
        from: PipelineState,
        to: PipelineState,
    ) -> PipelineState {
        tracing::debug!(session_id = %session_id, from = %from, to = %to, "Pipeline transition");
        to
    }
}
