use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::interfaces::providers::{EmbeddingProvider, VectorStore};
use crate::interfaces::tiers::AnswerTier;
use crate::providers::lancedb::LanceDbVectorStore;
use crate::providers::memory::InMemoryVectorStore;
use crate::providers::openai::{OpenAiProvider, DEFAULT_TIMEOUT_SECS};
use crate::services::pipeline::AnswerPipeline;
use crate::services::tiers::{FaqTier, GraphTier, RagSettings, RagTier};
use crate::stores::faq::FaqStore;
use crate::stores::graph::GraphStore;
use crate::stores::sessions::SessionStore;

/// Everything the facade needs, wired from configuration. All collaborators
/// are passed in explicitly so tests can substitute fakes at any seam.
pub struct BotServices {
    pub pipeline: AnswerPipeline,
    pub graph: Arc<GraphStore>,
    pub faq: Arc<FaqStore>,
    pub sessions: Arc<SessionStore>,
    pub embedder: Option<Arc<dyn EmbeddingProvider>>,
    pub vectors: Option<Arc<dyn VectorStore>>,
}

pub struct BotFactory;

impl BotFactory {
    pub async fn create_from_config(config: Config) -> Result<BotServices> {
        let sqlite_path = config.sqlite_path();
        let graph = Arc::new(GraphStore::new(&sqlite_path).await?);
        let faq = Arc::new(FaqStore::new(&sqlite_path).await?);
        let sessions = Arc::new(SessionStore::new(&sqlite_path).await?);

        let mut tiers: Vec<Arc<dyn AnswerTier>> = vec![
            Arc::new(GraphTier::new(graph.clone())),
            Arc::new(FaqTier::new(faq.clone())),
        ];

        let mut embedder: Option<Arc<dyn EmbeddingProvider>> = None;
        let mut vectors: Option<Arc<dyn VectorStore>> = None;

        let api_key = config
            .openai
            .as_ref()
            .and_then(|o| o.api_key.clone())
            .filter(|k| !k.trim().is_empty());
        match api_key {
            Some(api_key) => {
                let openai = config.openai.clone().unwrap_or_default();
                let pipeline_config = config.pipeline.clone().unwrap_or_default();
                let timeout = pipeline_config
                    .llm_timeout_secs
                    .unwrap_or(DEFAULT_TIMEOUT_SECS);
                let provider = Arc::new(
                    OpenAiProvider::new(
                        api_key,
                        openai.model,
                        openai.embedding_model,
                        openai.base_url,
                    )
                    .with_timeout(Duration::from_secs(timeout)),
                );

                let store: Arc<dyn VectorStore> = match config.lancedb_path() {
                    Some(path) => Arc::new(LanceDbVectorStore::new(&path).await?),
                    None => Arc::new(InMemoryVectorStore::new()),
                };

                let defaults = RagSettings::default();
                let settings = RagSettings {
                    top_k: pipeline_config.top_k.unwrap_or(defaults.top_k),
                    context_char_budget: pipeline_config
                        .context_char_budget
                        .unwrap_or(defaults.context_char_budget),
                    max_tokens: pipeline_config.max_tokens.unwrap_or(defaults.max_tokens),
                    temperature: pipeline_config.temperature.unwrap_or(defaults.temperature),
                };

                tiers.push(Arc::new(RagTier::new(
                    provider.clone(),
                    store.clone(),
                    provider.clone(),
                    settings,
                )));
                embedder = Some(provider);
                vectors = Some(store);
            }
            None => {
                tracing::info!("no llm api key configured, rag tier disabled");
            }
        }

        Ok(BotServices {
            pipeline: AnswerPipeline::new(tiers),
            graph,
            faq,
            sessions,
            embedder,
            vectors,
        })
    }
}
