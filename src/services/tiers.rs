use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;

use crate::domains::answer::{Answer, AnswerRequest, ChunkHit, SourceDocument};
use crate::error::{ArborBotError, Result};
use crate::interfaces::providers::{EmbeddingProvider, LlmProvider, VectorStore};
use crate::interfaces::tiers::AnswerTier;
use crate::services::context::ContextBuilder;
use crate::stores::faq::FaqStore;
use crate::stores::graph::GraphStore;

/// First tier: exact/partial node-text matching against the knowledge graph.
pub struct GraphTier {
    store: Arc<GraphStore>,
}

impl GraphTier {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AnswerTier for GraphTier {
    fn name(&self) -> &'static str {
        "knowledge_graph"
    }

    async fn attempt(&self, request: &AnswerRequest) -> Result<Option<Answer>> {
        let matched = self
            .store
            .match_question(&request.question, request.workflow_id)
            .await?;
        Ok(matched.map(|m| Answer::KnowledgeGraph {
            answers: m.answers,
            target_nodes: m.target_nodes,
        }))
    }
}

/// Second tier: curated FAQ lookup.
pub struct FaqTier {
    store: Arc<FaqStore>,
}

impl FaqTier {
    pub fn new(store: Arc<FaqStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AnswerTier for FaqTier {
    fn name(&self) -> &'static str {
        "faq"
    }

    async fn attempt(&self, request: &AnswerRequest) -> Result<Option<Answer>> {
        let matched = self.store.match_question(&request.question).await?;
        Ok(matched.map(|m| Answer::Faq {
            answer: m.answer,
            faq_id: m.faq_id,
            category: m.category,
            match_type: m.match_type,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct RagSettings {
    pub top_k: usize,
    pub context_char_budget: usize,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            top_k: crate::services::context::DEFAULT_TOP_K,
            context_char_budget: crate::services::context::DEFAULT_CHAR_BUDGET,
            max_tokens: 512,
            temperature: 0.7,
        }
    }
}

const RAG_SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer using only the provided \
context chunks. Start with a direct one or two sentence answer, use markdown bullet points for \
lists, and cite the source documents you relied on.";

const FALLBACK_CHUNKS: usize = 3;
const FALLBACK_SNIPPET_CHARS: usize = 300;
const EMBEDDING_CACHE_SIZE: usize = 256;

/// Final tier: embed the question, retrieve nearest chunks, generate an answer
/// with the LLM. When generation fails or returns nothing, degrades to a
/// deterministic answer assembled from the retrieved chunks; it only errors
/// when there are no chunks to fall back on.
pub struct RagTier {
    embedder: Arc<dyn EmbeddingProvider>,
    vectors: Arc<dyn VectorStore>,
    llm: Arc<dyn LlmProvider>,
    context: ContextBuilder,
    settings: RagSettings,
    embedding_cache: tokio::sync::Mutex<LruCache<String, Vec<f32>>>,
}

impl RagTier {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        vectors: Arc<dyn VectorStore>,
        llm: Arc<dyn LlmProvider>,
        settings: RagSettings,
    ) -> Self {
        let context = ContextBuilder::new(settings.top_k, settings.context_char_budget);
        Self {
            embedder,
            vectors,
            llm,
            context,
            settings,
            embedding_cache: tokio::sync::Mutex::new(LruCache::new(
                NonZeroUsize::new(EMBEDDING_CACHE_SIZE).unwrap(),
            )),
        }
    }

    async fn embed_cached(&self, question: &str) -> Result<Vec<f32>> {
        {
            let mut cache = self.embedding_cache.lock().await;
            if let Some(vector) = cache.get(question) {
                return Ok(vector.clone());
            }
        }
        let vector = self.embedder.embed(question).await?;
        let mut cache = self.embedding_cache.lock().await;
        cache.put(question.to_string(), vector.clone());
        Ok(vector)
    }

    fn simple_answer(&self, chunks: &[ChunkHit]) -> Option<Answer> {
        if chunks.is_empty() {
            return None;
        }
        let mut parts = Vec::new();
        for chunk in chunks.iter().take(FALLBACK_CHUNKS) {
            let snippet: String = chunk.text.chars().take(FALLBACK_SNIPPET_CHARS).collect();
            if !snippet.is_empty() {
                parts.push(format!("[{}]: {}", chunk.document, snippet));
            }
        }
        if parts.is_empty() {
            return None;
        }
        Some(Answer::Rag {
            answer: format!("Based on the available documents:\n\n{}", parts.join("\n")),
            chunks_used: chunks.len(),
            source_documents: dedup_documents(chunks),
            degraded: true,
        })
    }
}

#[async_trait]
impl AnswerTier for RagTier {
    fn name(&self) -> &'static str {
        "rag"
    }

    async fn attempt(&self, request: &AnswerRequest) -> Result<Option<Answer>> {
        let question = request.question.trim();
        let vector = self.embed_cached(question).await?;
        let chunks = self.vectors.search(vector, self.settings.top_k).await?;

        let context = self.context.build(&chunks);
        let prompt = format!(
            "Based on the following context chunks from documents, answer the user's question \
precisely and thoroughly.\n\nCONTEXT CHUNKS:\n{context}\n\nUSER QUESTION: {question}"
        );

        match self
            .llm
            .generate(
                &prompt,
                RAG_SYSTEM_PROMPT,
                self.settings.max_tokens,
                self.settings.temperature,
            )
            .await
        {
            Ok(text) if !text.trim().is_empty() => Ok(Some(Answer::Rag {
                answer: text.trim().to_string(),
                chunks_used: chunks.len(),
                source_documents: dedup_documents(&chunks),
                degraded: false,
            })),
            Ok(_) => match self.simple_answer(&chunks) {
                Some(answer) => Ok(Some(answer)),
                None => Err(ArborBotError::Upstream(
                    "model returned an empty answer and no context was retrieved".to_string(),
                )),
            },
            Err(err @ (ArborBotError::UpstreamTimeout(_) | ArborBotError::Upstream(_))) => {
                tracing::warn!(error = %err, "generation failed, building simple answer from chunks");
                match self.simple_answer(&chunks) {
                    Some(answer) => Ok(Some(answer)),
                    None => Err(err),
                }
            }
            Err(other) => Err(other),
        }
    }
}

fn dedup_documents(chunks: &[ChunkHit]) -> Vec<SourceDocument> {
    let mut seen = HashSet::new();
    let mut documents = Vec::new();
    for chunk in chunks {
        if seen.insert(chunk.pdf_id) {
            documents.push(SourceDocument {
                document: chunk.document.clone(),
                pdf_id: chunk.pdf_id,
            });
        }
    }
    documents
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_first_seen_document_per_pdf() {
        let chunks = vec![
            ChunkHit {
                text: "a".into(),
                document: "doc.pdf".into(),
                pdf_id: 1,
                score: 0.9,
            },
            ChunkHit {
                text: "b".into(),
                document: "doc.pdf".into(),
                pdf_id: 1,
                score: 0.8,
            },
            ChunkHit {
                text: "c".into(),
                document: "other.pdf".into(),
                pdf_id: 2,
                score: 0.7,
            },
        ];
        let documents = dedup_documents(&chunks);
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].pdf_id, 1);
        assert_eq!(documents[1].document, "other.pdf");
    }
}
