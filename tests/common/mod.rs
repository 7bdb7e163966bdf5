#![allow(dead_code)]

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use arbor_bot::domains::answer::ChunkHit;
use arbor_bot::error::{ArborBotError, Result};
use arbor_bot::interfaces::providers::{EmbeddingProvider, LlmProvider, VectorStore};

/// LLM fake that pops queued outcomes and falls back to a fixed reply.
pub struct QueueLlmProvider {
    queue: Mutex<VecDeque<Result<String>>>,
    pub text: String,
}

impl QueueLlmProvider {
    pub fn new(queue: Vec<Result<String>>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::from(queue)),
            text: "mock answer".to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for QueueLlmProvider {
    async fn generate(
        &self,
        _prompt: &str,
        _system_prompt: &str,
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<String> {
        let mut guard = self.queue.lock().await;
        guard.pop_front().unwrap_or(Ok(self.text.clone()))
    }
}

/// LLM fake that always times out, for fallback-safety tests.
pub struct TimeoutLlmProvider;

#[async_trait]
impl LlmProvider for TimeoutLlmProvider {
    async fn generate(
        &self,
        _prompt: &str,
        _system_prompt: &str,
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<String> {
        Err(ArborBotError::UpstreamTimeout(120))
    }
}

pub struct StaticEmbedder {
    pub vector: Vec<f32>,
}

impl StaticEmbedder {
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector }
    }
}

#[async_trait]
impl EmbeddingProvider for StaticEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(self.vector.clone())
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(ArborBotError::Embedding("embedding service down".to_string()))
    }
}

/// Vector-store fake returning a fixed hit list.
pub struct StaticVectorStore {
    pub hits: Vec<ChunkHit>,
}

impl StaticVectorStore {
    pub fn new(hits: Vec<ChunkHit>) -> Self {
        Self { hits }
    }

    pub fn empty() -> Self {
        Self { hits: Vec::new() }
    }
}

#[async_trait]
impl VectorStore for StaticVectorStore {
    async fn search(&self, _vector: Vec<f32>, top_k: usize) -> Result<Vec<ChunkHit>> {
        Ok(self.hits.iter().take(top_k.max(1)).cloned().collect())
    }

    async fn add_chunks(
        &self,
        _document: &str,
        _pdf_id: i64,
        _chunks: Vec<(String, Vec<f32>)>,
    ) -> Result<()> {
        Ok(())
    }
}

pub struct FailingVectorStore;

#[async_trait]
impl VectorStore for FailingVectorStore {
    async fn search(&self, _vector: Vec<f32>, _top_k: usize) -> Result<Vec<ChunkHit>> {
        Err(ArborBotError::Runtime("vector store unreachable".to_string()))
    }

    async fn add_chunks(
        &self,
        _document: &str,
        _pdf_id: i64,
        _chunks: Vec<(String, Vec<f32>)>,
    ) -> Result<()> {
        Err(ArborBotError::Runtime("vector store unreachable".to_string()))
    }
}

pub fn chunk(text: &str, document: &str, pdf_id: i64, score: f32) -> ChunkHit {
    ChunkHit {
        text: text.to_string(),
        document: document.to_string(),
        pdf_id,
        score,
    }
}

/// Fresh on-disk sqlite path that lives as long as the returned tempdir.
pub fn temp_db() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir
        .path()
        .join("arbor-bot.db")
        .to_string_lossy()
        .into_owned();
    (dir, path)
}
