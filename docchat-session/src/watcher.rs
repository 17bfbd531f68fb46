//! Background watcher that keeps the vector store consistent with expiry.
//!
//! Every session that lapses in the [`crate::SessionStore`] must have its
//! embeddings deleted from the external vector store. The watcher is the
//! single subscriber on the store's expiry channel; a failed deletion is
//! logged and the loop continues, so one unreachable store call never stops
//! future cleanups. An orphaned embedding is a bounded-lifetime leak, not a
//! correctness catastrophe, but it must show up in logs.

use crate::traits::VectorStore;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Supervised subscriber task for session expiry events.
pub struct ExpiryWatcher;

impl ExpiryWatcher {
    /// Spawn the watcher loop.
    ///
    /// Runs until the expiry channel closes (store dropped), then exits
    /// cleanly. The returned handle is the shutdown/supervision hook.
    pub fn spawn(
        mut expiry_rx: mpsc::UnboundedReceiver<String>,
        vector_store: Arc<dyn VectorStore>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::debug!("Expiry watcher started");
            while let Some(session_id) = expiry_rx.recv().await {
                match vector_store.delete_session(&session_id).await {
                    Ok(()) => {
                        tracing::info!(session_id = %session_id, "Cleaned up embeddings for expired session");
                    }
                    Err(e) => {
                        tracing::error!(
                            session_id = %session_id,
                            error = %e,
                            "Failed to delete embeddings for expired session"
                        );
                    }
                }
            }
            tracing::debug!("Expiry watcher stopped: event channel closed");
        })
    }
}
