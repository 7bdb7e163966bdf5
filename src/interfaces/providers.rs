use async_trait::async_trait;

use crate::domains::answer::ChunkHit;
use crate::error::Result;

/// Text generation against an external model endpoint. Implementations must
/// bound the wait and report it as `UpstreamTimeout` rather than hanging.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String>;
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Nearest-neighbour search over stored document chunks. An empty result set
/// means "no relevant content", not an error.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn search(&self, vector: Vec<f32>, top_k: usize) -> Result<Vec<ChunkHit>>;

    async fn add_chunks(
        &self,
        document: &str,
        pdf_id: i64,
        chunks: Vec<(String, Vec<f32>)>,
    ) -> Result<()>;
}
