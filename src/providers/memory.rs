use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domains::answer::ChunkHit;
use crate::error::Result;
use crate::interfaces::providers::VectorStore;

struct StoredChunk {
    text: String,
    document: String,
    pdf_id: i64,
    vector: Vec<f32>,
}

/// Cosine-similarity vector store held entirely in memory. Used by tests and
/// by configurations that run without an on-disk vector index.
#[derive(Default)]
pub struct InMemoryVectorStore {
    chunks: RwLock<Vec<StoredChunk>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn search(&self, vector: Vec<f32>, top_k: usize) -> Result<Vec<ChunkHit>> {
        let guard = self.chunks.read().await;
        let mut hits: Vec<ChunkHit> = guard
            .iter()
            .map(|chunk| ChunkHit {
                text: chunk.text.clone(),
                document: chunk.document.clone(),
                pdf_id: chunk.pdf_id,
                score: cosine_similarity(&vector, &chunk.vector),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k.max(1));
        Ok(hits)
    }

    async fn add_chunks(
        &self,
        document: &str,
        pdf_id: i64,
        chunks: Vec<(String, Vec<f32>)>,
    ) -> Result<()> {
        let mut guard = self.chunks.write().await;
        for (text, vector) in chunks {
            guard.push(StoredChunk {
                text,
                document: document.to_string(),
                pdf_id,
                vector,
            });
        }
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_orders_by_cosine_similarity() {
        let store = InMemoryVectorStore::new();
        store
            .add_chunks(
                "doc.pdf",
                1,
                vec![
                    ("aligned".to_string(), vec![1.0, 0.0]),
                    ("orthogonal".to_string(), vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let hits = store.search(vec![1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "aligned");
        assert!(hits[0].score > hits[1].score);

        let hits = store.search(vec![1.0, 0.0], 1).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn empty_store_returns_no_hits() {
        let store = InMemoryVectorStore::new();
        assert!(store.search(vec![1.0], 3).await.unwrap().is_empty());
    }
}
