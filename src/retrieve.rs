//! Context retrieval for the answer gate.
//!
//! The gate only sees the [`ContextRetriever`] trait, so the built-in
//! [`NaiveRetriever`] can be swapped for a ranked search backend without
//! touching the gate.

use anyhow::Result;
use async_trait::async_trait;

use crate::config::RetrievalConfig;
use crate::corpus::Corpus;
use crate::text::take_chars;

/// Produces the context bundle handed to the model for one question.
///
/// An empty (or whitespace-only) string means nothing usable was found;
/// the gate deflects with `no_context` and does not call the model.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn retrieve(&self, question: &str, teacher_id: &str) -> Result<String>;
}

/// Concatenates the corpus text documents regardless of the question.
/// FAQ rows are left out.
///
/// Each document is capped at `per_source_chars` before joining with a
/// blank line; the joined text is capped at `max_context_chars`.
pub struct NaiveRetriever {
    corpus: Corpus,
    per_source_chars: usize,
    max_context_chars: usize,
}

impl NaiveRetriever {
    pub fn new(corpus: Corpus, config: &RetrievalConfig) -> Self {
        Self {
            corpus,
            per_source_chars: config.per_source_chars,
            max_context_chars: config.max_context_chars,
        }
    }
}

#[async_trait]
impl ContextRetriever for NaiveRetriever {
    async fn retrieve(&self, _question: &str, _teacher_id: &str) -> Result<String> {
        let corpus = self.corpus.clone();
        let docs = tokio::task::spawn_blocking(move || corpus.text_documents()).await??;
        let snippets: Vec<&str> = docs
            .iter()
            .map(|d| take_chars(&d.text, self.per_source_chars))
            .collect();
        let joined = snippets.join("\n\n");
        Ok(take_chars(&joined, self.max_context_chars).to_string())
    }
}
