use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::domains::answer::{AnswerEnvelope, AnswerRequest, AnswerSource, Resolution};
use crate::domains::session::{ChatMessage, ChatSession};
use crate::error::{ArborBotError, Result};
use crate::factories::bot_factory::{BotFactory, BotServices};
use crate::interfaces::providers::{EmbeddingProvider, VectorStore};
use crate::services::pipeline::AnswerPipeline;
use crate::stores::faq::FaqStore;
use crate::stores::graph::GraphStore;
use crate::stores::sessions::SessionStore;

/// Facade over the answer pipeline and the backing stores.
pub struct ArborBot {
    pipeline: AnswerPipeline,
    graph: Arc<GraphStore>,
    faq: Arc<FaqStore>,
    sessions: Arc<SessionStore>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    vectors: Option<Arc<dyn VectorStore>>,
}

impl ArborBot {
    pub async fn from_config(config: Config) -> Result<Self> {
        let services = BotFactory::create_from_config(config).await?;
        Ok(Self::from_services(services))
    }

    pub async fn from_config_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::from_file(path)?;
        Self::from_config(config).await
    }

    pub fn from_services(services: BotServices) -> Self {
        Self {
            pipeline: services.pipeline,
            graph: services.graph,
            faq: services.faq,
            sessions: services.sessions,
            embedder: services.embedder,
            vectors: services.vectors,
        }
    }

    /// Resolves a question through the cascade and records the exchange when a
    /// session is supplied. Validation problems are returned as errors; every
    /// other failure mode yields a structured `success: false` envelope. A
    /// failed exchange write is logged and does not fail the request.
    pub async fn ask(&self, request: AnswerRequest) -> Result<AnswerEnvelope> {
        let resolution = self.pipeline.resolve(&request).await?;

        if let Some(session_id) = request.session_id.as_deref() {
            let user_id = request.user_id.as_deref().unwrap_or("anonymous");
            let (answer, source) = match &resolution {
                Resolution::Answered(answer) => {
                    (Some(answer.display_text()), Some(answer.source()))
                }
                Resolution::Failed { .. } => (None, None),
            };
            if let Err(err) = self
                .sessions
                .append_message(
                    session_id,
                    user_id,
                    &request.question,
                    answer.as_deref(),
                    source,
                )
                .await
            {
                tracing::warn!(session_id, error = %err, "failed to record exchange");
            }
        }

        Ok(resolution.into())
    }

    /// Embeds document chunks and adds them to the vector store. Returns the
    /// number of chunks indexed.
    pub async fn ingest_chunks(
        &self,
        document: &str,
        pdf_id: i64,
        texts: Vec<String>,
    ) -> Result<usize> {
        let embedder = self.embedder.as_ref().ok_or_else(|| {
            ArborBotError::Config("no embedding provider configured".to_string())
        })?;
        let vectors = self.vectors.as_ref().ok_or_else(|| {
            ArborBotError::Config("no vector store configured".to_string())
        })?;

        let mut pairs = Vec::with_capacity(texts.len());
        for text in texts {
            if text.trim().is_empty() {
                continue;
            }
            let vector = embedder.embed(&text).await?;
            pairs.push((text, vector));
        }
        let indexed = pairs.len();
        vectors.add_chunks(document, pdf_id, pairs).await?;
        Ok(indexed)
    }

    // Session surface.

    pub async fn create_session(
        &self,
        user_id: &str,
        title: &str,
        category: &str,
    ) -> Result<ChatSession> {
        self.sessions.create_session(user_id, title, category).await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<ChatSession> {
        self.sessions.get_session(session_id).await
    }

    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<ChatSession>> {
        self.sessions.list_sessions(user_id).await
    }

    pub async fn get_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        self.sessions.get_messages(session_id).await
    }

    pub async fn append_message(
        &self,
        session_id: &str,
        user_id: &str,
        question: &str,
        answer: Option<&str>,
        source: Option<AnswerSource>,
    ) -> Result<ChatMessage> {
        self.sessions
            .append_message(session_id, user_id, question, answer, source)
            .await
    }

    pub async fn update_session(
        &self,
        session_id: &str,
        title: &str,
        category: Option<&str>,
    ) -> Result<ChatSession> {
        self.sessions.update_session(session_id, title, category).await
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        self.sessions.delete_session(session_id).await
    }

    pub async fn clear_messages(&self, session_id: &str) -> Result<usize> {
        self.sessions.clear_messages(session_id).await
    }

    // Knowledge surface, used by the (out-of-scope) editing UI.

    pub fn graph_store(&self) -> Arc<GraphStore> {
        self.graph.clone()
    }

    pub fn faq_store(&self) -> Arc<FaqStore> {
        self.faq.clone()
    }

    pub fn session_store(&self) -> Arc<SessionStore> {
        self.sessions.clone()
    }

    pub fn tier_names(&self) -> Vec<&'static str> {
        self.pipeline.tier_names()
    }
}
