//! Collaborator traits for the external stores docchat talks to.
//!
//! The embedding/vector store and document text extraction live outside this
//! system; these traits are the only surface the core depends on.

use async_trait::async_trait;

/// External embedding/vector similarity store, keyed by session id.
///
/// The core never inspects index contents; it only instructs creation on
/// upload and deletion on session destruction.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Index extracted document text under a session.
    async fn index(&self, session_id: &str, text: &str) -> anyhow::Result<()>;

    /// Retrieve the fragments most relevant to a query within a session.
    async fn retrieve(&self, session_id: &str, query: &str) -> anyhow::Result<Vec<String>>;

    /// Delete every vector indexed under a session. Idempotent.
    async fn delete_session(&self, session_id: &str) -> anyhow::Result<()>;
}

/// External document text extraction.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Extract plain text from raw file bytes.
    async fn extract_text(&self, content: &[u8], filename: &str) -> anyhow::Result<String>;
}

/// Naive loader that treats every file as UTF-8 text.
///
/// Real deployments substitute a loader that understands PDF and DOCX; the
/// allow-list on the upload path is enforced before extraction either way.
pub struct PlainTextLoader;

#[async_trait]
impl DocumentLoader for PlainTextLoader {
    async fn extract_text(&self, content: &[u8], _filename: &str) -> anyhow::Result<String> {
        Ok(String::from_utf8_lossy(content).into_owned())
    }
}
