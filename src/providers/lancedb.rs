use std::path::Path;
use std::sync::Arc;

use arrow_array::{Array, Float32Array, Int64Array, RecordBatch, RecordBatchIterator, StringArray};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use futures::TryStreamExt;

use crate::domains::answer::ChunkHit;
use crate::error::{ArborBotError, Result};
use crate::interfaces::providers::VectorStore;

const TABLE_NAME: &str = "chunk_vectors";

/// Document-chunk vector index on lancedb. Scores are derived from the
/// reported `_distance` as `1 / (1 + distance)` so callers always see a
/// descending similarity ordering.
#[derive(Clone)]
pub struct LanceDbVectorStore {
    db: lancedb::Connection,
    table: Arc<tokio::sync::Mutex<Option<lancedb::Table>>>,
}

impl LanceDbVectorStore {
    pub async fn new(path: &str) -> Result<Self> {
        ensure_parent_dir(path)?;
        let db = lancedb::connect(path)
            .execute()
            .await
            .map_err(|e| ArborBotError::Runtime(e.to_string()))?;
        Ok(Self {
            db,
            table: Arc::new(tokio::sync::Mutex::new(None)),
        })
    }

    async fn table_exists(&self) -> Result<bool> {
        let tables = self
            .db
            .table_names()
            .execute()
            .await
            .map_err(|e| ArborBotError::Runtime(e.to_string()))?;
        Ok(tables.iter().any(|t| t == TABLE_NAME))
    }

    async fn open_table_if_exists(&self) -> Result<Option<lancedb::Table>> {
        let mut guard = self.table.lock().await;
        if let Some(table) = guard.clone() {
            return Ok(Some(table));
        }
        if !self.table_exists().await? {
            return Ok(None);
        }
        let table = self
            .db
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| ArborBotError::Runtime(e.to_string()))?;
        *guard = Some(table.clone());
        Ok(Some(table))
    }
}

#[async_trait]
impl VectorStore for LanceDbVectorStore {
    async fn search(&self, vector: Vec<f32>, top_k: usize) -> Result<Vec<ChunkHit>> {
        let Some(table) = self.open_table_if_exists().await? else {
            return Ok(Vec::new());
        };

        use lancedb::query::QueryBase;
        let query = table
            .query()
            .nearest_to(vector)
            .map_err(|e| ArborBotError::Runtime(e.to_string()))?
            .limit(top_k.max(1));
        let stream = lancedb::query::ExecutableQuery::execute(&query)
            .await
            .map_err(|e| ArborBotError::Runtime(e.to_string()))?;

        let batches: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .map_err(|e| ArborBotError::Runtime(e.to_string()))?;

        let mut hits = Vec::new();
        for batch in batches {
            let text_array = batch
                .column_by_name("text")
                .and_then(|array| array.as_any().downcast_ref::<StringArray>());
            let document_array = batch
                .column_by_name("document")
                .and_then(|array| array.as_any().downcast_ref::<StringArray>());
            let pdf_id_array = batch
                .column_by_name("pdf_id")
                .and_then(|array| array.as_any().downcast_ref::<Int64Array>());
            let distance_array = batch
                .column_by_name("_distance")
                .and_then(|array| array.as_any().downcast_ref::<Float32Array>());

            let (Some(texts), Some(documents), Some(pdf_ids)) =
                (text_array, document_array, pdf_id_array)
            else {
                continue;
            };
            for i in 0..texts.len() {
                if texts.is_null(i) || documents.is_null(i) || pdf_ids.is_null(i) {
                    continue;
                }
                let score = match distance_array {
                    Some(distances) if !distances.is_null(i) => {
                        1.0 / (1.0 + distances.value(i).max(0.0))
                    }
                    _ => 0.0,
                };
                hits.push(ChunkHit {
                    text: texts.value(i).to_string(),
                    document: documents.value(i).to_string(),
                    pdf_id: pdf_ids.value(i),
                    score,
                });
            }
        }
        Ok(hits)
    }

    async fn add_chunks(
        &self,
        document: &str,
        pdf_id: i64,
        chunks: Vec<(String, Vec<f32>)>,
    ) -> Result<()> {
        let Some((_, first_vector)) = chunks.first() else {
            return Ok(());
        };
        let dim = first_vector.len() as i32;
        if dim == 0 {
            return Err(ArborBotError::Embedding(
                "cannot index zero-length vectors".to_string(),
            ));
        }
        for (_, vector) in &chunks {
            if vector.len() as i32 != dim {
                return Err(ArborBotError::Embedding(
                    "all chunk vectors must share one dimension".to_string(),
                ));
            }
        }

        let batch = build_chunk_batch(document, pdf_id, &chunks, dim)?;
        let schema = batch.schema();
        let batches = RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema);

        let mut guard = self.table.lock().await;
        if guard.is_none() && self.table_exists().await? {
            let table = self
                .db
                .open_table(TABLE_NAME)
                .execute()
                .await
                .map_err(|e| ArborBotError::Runtime(e.to_string()))?;
            *guard = Some(table);
        }

        match guard.clone() {
            Some(table) => {
                table
                    .add(batches)
                    .execute()
                    .await
                    .map_err(|e| ArborBotError::Runtime(e.to_string()))?;
            }
            None => {
                let table = self
                    .db
                    .create_table(TABLE_NAME, batches)
                    .execute()
                    .await
                    .map_err(|e| ArborBotError::Runtime(e.to_string()))?;
                *guard = Some(table);
            }
        }
        Ok(())
    }
}

fn chunk_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("pdf_id", DataType::Int64, false),
        Field::new("document", DataType::Utf8, false),
        Field::new("text", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim),
            true,
        ),
    ]))
}

fn build_chunk_batch(
    document: &str,
    pdf_id: i64,
    chunks: &[(String, Vec<f32>)],
    dim: i32,
) -> Result<RecordBatch> {
    let schema = chunk_schema(dim);

    let pdf_ids = Int64Array::from_iter_values(chunks.iter().map(|_| pdf_id));
    let documents = StringArray::from_iter_values(chunks.iter().map(|_| document));
    let texts = StringArray::from_iter_values(chunks.iter().map(|(text, _)| text.as_str()));
    let vectors = arrow_array::FixedSizeListArray::from_iter_primitive::<
        arrow_array::types::Float32Type,
        _,
        _,
    >(
        chunks
            .iter()
            .map(|(_, vector)| Some(vector.iter().copied().map(Some).collect::<Vec<_>>())),
        dim,
    );

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(pdf_ids),
            Arc::new(documents),
            Arc::new(texts),
            Arc::new(vectors),
        ],
    )
    .map_err(|e| ArborBotError::Runtime(e.to_string()))
}

fn ensure_parent_dir(path: &str) -> Result<()> {
    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ArborBotError::Runtime(e.to_string()))?;
    }
    Ok(())
}
