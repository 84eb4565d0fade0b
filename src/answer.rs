//! Prompt assembly and answer generation.
//!
//! The answer policy (refuse without context, refuse off-topic questions,
//! recommend only MongoDB) lives in the instruction text and is a request to
//! the model, not something this module enforces.

use std::sync::Arc;

use anyhow::Result;

use crate::llm::ChatProvider;
use crate::models::ScoredRecord;
use crate::retriever::Retriever;

pub const PROMPT_TEMPLATE: &str = "
    Use the following pieces of context to answer the question at the end.
    If you don't know the answer, just say that you don't know, don't try to make up an answer.
    Do not answer the question if there is no given context.
    Do not answer the question if it is not related to the context.
    Do not give recommendations to anything other than MongoDB.
    Context:
    {context}
    Question: {question}
    ";

/// Retrieved chunk texts joined by blank lines.
pub fn format_context(records: &[ScoredRecord]) -> String {
    records
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Fill the template. Context is substituted first so a question containing
/// `{context}` is kept verbatim.
pub fn build_prompt(context: &str, question: &str) -> String {
    match PROMPT_TEMPLATE.split_once("{question}") {
        Some((head, tail)) => {
            let mut prompt = head.replace("{context}", context);
            prompt.push_str(question);
            prompt.push_str(tail);
            prompt
        }
        None => PROMPT_TEMPLATE.replace("{context}", context),
    }
}

/// A generated answer with the chunks it was conditioned on.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<ScoredRecord>,
}

pub struct Answerer {
    retriever: Retriever,
    llm: Arc<dyn ChatProvider>,
}

impl Answerer {
    pub fn new(retriever: Retriever, llm: Arc<dyn ChatProvider>) -> Self {
        Self { retriever, llm }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Retrieve context for `question` and return the model's text unmodified.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let sources = self.retriever.retrieve(question).await?;
        let prompt = build_prompt(&format_context(&sources), question);
        log::debug!(
            "prompting {} with {} context chunks ({} chars)",
            self.llm.model_name(),
            sources.len(),
            prompt.len()
        );
        let text = self.llm.generate(&prompt).await?;
        Ok(Answer { text, sources })
    }
}
