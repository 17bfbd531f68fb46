//! Bounded prompt assembly.
//!
//! Pure string building: fixed instruction preamble, a window of recent chat
//! turns, retrieved context truncated to a character ceiling, then the live
//! question, each under a labeled section so the model can tell them apart.
//! No I/O, deterministic for given inputs.

use docchat_session::ChatTurn;

/// Fixed instruction preamble at the top of every prompt.
const PREAMBLE: &str = "You are a helpful assistant. Using the conversation history and the \
retrieved document context below, answer the question.";

/// Rendered when a session has no prior turns.
const NO_HISTORY_MARKER: &str = "No prior conversation.";

/// Substituted when retrieval yields no fragments.
const FALLBACK_CONTEXT: &str =
    "No relevant documents found, but answering based on general knowledge.";

/// Assembles bounded prompts from query, context fragments, and history.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    history_limit: usize,
    max_context_length: usize,
}

impl PromptBuilder {
    pub fn new(history_limit: usize, max_context_length: usize) -> Self {
        Self {
            history_limit,
            max_context_length,
        }
    }

    /// Build the final prompt text.
    ///
    /// History keeps only the most recent `history_limit` turns, oldest of
    /// that window first. Context fragments are joined with newlines and the
    /// joined text is truncated once to `max_context_length` characters.
    pub fn build(&self, query: &str, fragments: &[String], history: &[ChatTurn]) -> String {
        format!(
            "{PREAMBLE}\n\n## Conversation history\n{}\n\n## Context\n{}\n\n## Question\n{}",
            self.format_history(history),
            self.format_context(fragments),
            query,
        )
    }

    fn format_history(&self, history: &[ChatTurn]) -> String {
        if history.is_empty() {
            return NO_HISTORY_MARKER.to_string();
        }

        let start = history.len().saturating_sub(self.history_limit);
        history[start..]
            .iter()
            .map(|turn| format!("Q: {}\nA: {}", turn.question, turn.answer))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn format_context(&self, fragments: &[String]) -> String {
        let joined = if fragments.is_empty() {
            FALLBACK_CONTEXT.to_string()
        } else {
            fragments.join("\n")
        };
        truncate_chars(&joined, self.max_context_length)
    }
}

/// Truncate to at most `max` characters, respecting char boundaries.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turns(n: usize) -> Vec<ChatTurn> {
        (0..n)
            .map(|i| ChatTurn::new(format!("q{i}"), format!("a{i}")))
            .collect()
    }

    #[test]
    fn sections_appear_in_order() {
        let builder = PromptBuilder::new(5, 100);
        let prompt = builder.build("what is X?", &["X is 42".to_string()], &[]);

        let history_pos = prompt.find("## Conversation history").unwrap();
        let context_pos = prompt.find("## Context").unwrap();
        let question_pos = prompt.find("## Question").unwrap();
        assert!(history_pos < context_pos);
        assert!(context_pos < question_pos);
        assert!(prompt.ends_with("what is X?"));
    }

    #[test]
    fn history_window_keeps_most_recent_oldest_first() {
        let builder = PromptBuilder::new(3, 1000);
        let prompt = builder.build("next", &[], &turns(7));

        // Only the last three turns, in original order.
        assert!(!prompt.contains("q3"));
        assert!(prompt.contains("q4"));
        assert!(prompt.contains("q6"));
        let pos4 = prompt.find("q4").unwrap();
        let pos5 = prompt.find("q5").unwrap();
        let pos6 = prompt.find("q6").unwrap();
        assert!(pos4 < pos5 && pos5 < pos6);
    }

    #[test]
    fn empty_history_renders_marker() {
        let builder = PromptBuilder::new(3, 1000);
        let prompt = builder.build("q", &["ctx".to_string()], &[]);
        assert!(prompt.contains("No prior conversation."));
    }

    #[test]
    fn fragments_join_with_newlines() {
        let builder = PromptBuilder::new(3, 1000);
        let prompt = builder.build(
            "q",
            &["first fragment".to_string(), "second fragment".to_string()],
            &[],
        );
        assert!(prompt.contains("first fragment\nsecond fragment"));
    }

    #[test]
    fn empty_context_uses_fallback_sentence_verbatim() {
        let builder = PromptBuilder::new(3, 1000);
        let prompt = builder.build("q", &[], &[]);
        assert!(prompt.contains(
            "No relevant documents found, but answering based on general knowledge."
        ));
    }

    #[test]
    fn context_truncates_to_exact_char_count() {
        let builder = PromptBuilder::new(3, 10);
        let long = "x".repeat(50);
        let prompt = builder.build("q", &[long], &[]);

        let context = prompt
            .split("## Context\n")
            .nth(1)
            .unwrap()
            .split("\n\n## Question")
            .next()
            .unwrap();
        assert_eq!(context.chars().count(), 10);
    }

    #[test]
    fn truncation_respects_multibyte_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 6), "héllo ");
        assert_eq!(truncate_chars("短い文", 2), "短い");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn build_is_deterministic() {
        let builder = PromptBuilder::new(3, 100);
        let fragments = vec!["ctx".to_string()];
        let history = turns(2);
        let a = builder.build("q", &fragments, &history);
        let b = builder.build("q", &fragments, &history);
        assert_eq!(a, b);
    }
}
