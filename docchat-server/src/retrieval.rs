//! In-process retrieval backend.
//!
//! The real embedding store is an external collaborator behind the
//! [`VectorStore`] trait. This backend keeps document chunks in memory and
//! ranks them by keyword overlap, which is enough to run the service
//! end-to-end without an embedding provider; deployments swap in a real
//! store through the same trait.

use async_trait::async_trait;
use docchat_session::VectorStore;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Fragments returned per query.
const TOP_K: usize = 4;

/// Keyword-overlap retrieval over in-memory chunks, keyed by session id.
pub struct KeywordVectorStore {
    chunks: RwLock<HashMap<String, Vec<String>>>,
    chunk_length: usize,
}

impl KeywordVectorStore {
    /// `chunk_length` is the character size documents are split into on index.
    pub fn new(chunk_length: usize) -> Self {
        Self {
            chunks: RwLock::new(HashMap::new()),
            chunk_length: chunk_length.max(1),
        }
    }

    /// Split text into whitespace-respecting chunks of roughly `chunk_length`
    /// characters.
    fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for word in text.split_whitespace() {
            if !current.is_empty() && current.chars().count() + word.chars().count() + 1 > self.chunk_length {
                chunks.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }

    fn score(query_terms: &[String], chunk: &str) -> usize {
        let haystack = chunk.to_lowercase();
        query_terms
            .iter()
            .filter(|term| haystack.contains(term.as_str()))
            .count()
    }
}

#[async_trait]
impl VectorStore for KeywordVectorStore {
    async fn index(&self, session_id: &str, text: &str) -> anyhow::Result<()> {
        let new_chunks = self.chunk(text);
        let mut chunks = self.chunks.write().await;
        chunks
            .entry(session_id.to_string())
            .or_default()
            .extend(new_chunks);
        Ok(())
    }

    async fn retrieve(&self, session_id: &str, query: &str) -> anyhow::Result<Vec<String>> {
        let query_terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let chunks = self.chunks.read().await;
        let Some(session_chunks) = chunks.get(session_id) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<(usize, &String)> = session_chunks
            .iter()
            .map(|chunk| (Self::score(&query_terms, chunk), chunk))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(TOP_K)
            .map(|(_, chunk)| chunk.clone())
            .collect())
    }

    async fn delete_session(&self, session_id: &str) -> anyhow::Result<()> {
        self.chunks.write().await.remove(session_id);
        Ok(())
    }
}
