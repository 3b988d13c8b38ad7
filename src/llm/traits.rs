use std::sync::Arc;
use crate::message::Message;
use crate::llm::{LLMResult, GenerateResult};
use futures::future::BoxFuture;

/// Convert a concrete L into an `Arc<dyn LLM>`.
/// Convenience so callers can do `llm_to_arc_dyn(MyLlm::new(...))`.
pub fn llm_to_arc_dyn<L>(llm: L) -> Arc<dyn LLM>
where
    L: 'static + LLM,
{
    Arc::new(llm)
}

/// Core LLM trait. This version uses BoxFuture with explicit lifetimes
/// so implementations can borrow the input `&[Message]` and avoid cloning large messages.
///
/// Note:
/// - We intentionally do not use `async_trait` here so that returned futures
///   can be annotated with the input lifetime `'a`.
pub trait LLM: Send + Sync {
    /// Produce a generation result. The returned future may borrow from `messages`.
    fn generate<'a>(&'a self, messages: &'a [Message]) -> BoxFuture<'a, LLMResult<GenerateResult>>;
}

/// Text embedding model used to index and query a vector store.
///
/// Same borrowing convention as [`LLM`]: the future may borrow `texts`.
pub trait Embedder: Send + Sync {
    /// Embed every text, returning one vector per input in the same order.
    fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, LLMResult<Vec<Vec<f32>>>>;
}
