mod common;

use std::sync::Arc;

use arbor_bot::domains::answer::{Answer, AnswerRequest, MatchType, Resolution};
use arbor_bot::error::ArborBotError;
use arbor_bot::interfaces::providers::{EmbeddingProvider, LlmProvider, VectorStore};
use arbor_bot::interfaces::tiers::AnswerTier;
use arbor_bot::services::pipeline::AnswerPipeline;
use arbor_bot::services::tiers::{FaqTier, GraphTier, RagSettings, RagTier};
use arbor_bot::stores::faq::FaqStore;
use arbor_bot::stores::graph::GraphStore;

use common::{
    chunk, temp_db, FailingEmbedder, FailingVectorStore, QueueLlmProvider, StaticEmbedder,
    StaticVectorStore, TimeoutLlmProvider,
};

async fn knowledge_stores(path: &str) -> (Arc<GraphStore>, Arc<FaqStore>) {
    let graph = Arc::new(GraphStore::new(path).await.unwrap());
    let faq = Arc::new(FaqStore::new(path).await.unwrap());
    (graph, faq)
}

fn rag_tier(
    llm: Arc<dyn LlmProvider>,
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
) -> Arc<RagTier> {
    Arc::new(RagTier::new(embedder, vectors, llm, RagSettings::default()))
}

fn pipeline_of(tiers: Vec<Arc<dyn AnswerTier>>) -> AnswerPipeline {
    AnswerPipeline::new(tiers)
}

async fn seed_password_graph(graph: &GraphStore) -> i32 {
    let workflow = graph.create_workflow("support", None).await.unwrap();
    let source = graph
        .create_node(workflow.id, "reset password")
        .await
        .unwrap();
    let first = graph
        .create_node(workflow.id, "click forgot password")
        .await
        .unwrap();
    let second = graph
        .create_node(workflow.id, "check email")
        .await
        .unwrap();
    graph
        .create_edge(workflow.id, source.id, first.id)
        .await
        .unwrap();
    graph
        .create_edge(workflow.id, source.id, second.id)
        .await
        .unwrap();
    workflow.id
}

#[tokio::test]
async fn graph_hit_returns_target_answers() {
    let (_dir, path) = temp_db();
    let (graph, faq) = knowledge_stores(&path).await;
    seed_password_graph(&graph).await;

    let pipeline = pipeline_of(vec![
        Arc::new(GraphTier::new(graph)),
        Arc::new(FaqTier::new(faq)),
    ]);

    let resolution = pipeline
        .resolve(&AnswerRequest::new("reset password"))
        .await
        .unwrap();
    let Resolution::Answered(Answer::KnowledgeGraph {
        answers,
        target_nodes,
    }) = resolution
    else {
        panic!("expected knowledge_graph answer");
    };
    assert_eq!(answers, vec!["click forgot password", "check email"]);
    assert!(target_nodes.iter().all(|n| !n.is_source));
}

#[tokio::test]
async fn graph_tier_wins_over_matching_faq() {
    let (_dir, path) = temp_db();
    let (graph, faq) = knowledge_stores(&path).await;
    seed_password_graph(&graph).await;
    faq.create_faq("reset password", "See the manual.", None)
        .await
        .unwrap();

    let pipeline = pipeline_of(vec![
        Arc::new(GraphTier::new(graph)),
        Arc::new(FaqTier::new(faq)),
    ]);

    let resolution = pipeline
        .resolve(&AnswerRequest::new("Reset Password"))
        .await
        .unwrap();
    let Resolution::Answered(answer) = resolution else {
        panic!("expected an answer");
    };
    assert!(matches!(answer, Answer::KnowledgeGraph { .. }));
}

#[tokio::test]
async fn faq_exact_hit_is_case_insensitive() {
    let (_dir, path) = temp_db();
    let (graph, faq) = knowledge_stores(&path).await;
    faq.create_faq(
        "what is your pricing?",
        "Free tier available.",
        Some("billing"),
    )
    .await
    .unwrap();

    let pipeline = pipeline_of(vec![
        Arc::new(GraphTier::new(graph)),
        Arc::new(FaqTier::new(faq)),
    ]);

    let resolution = pipeline
        .resolve(&AnswerRequest::new("What is your pricing?"))
        .await
        .unwrap();
    let Resolution::Answered(Answer::Faq {
        answer,
        category,
        match_type,
        ..
    }) = resolution
    else {
        panic!("expected faq answer");
    };
    assert_eq!(answer, "Free tier available.");
    assert_eq!(category.as_deref(), Some("billing"));
    assert_eq!(match_type, MatchType::Exact);
}

#[tokio::test]
async fn faq_partial_hit_carries_match_type() {
    let (_dir, path) = temp_db();
    let (graph, faq) = knowledge_stores(&path).await;
    faq.create_faq("what is your pricing?", "Free tier available.", None)
        .await
        .unwrap();

    let pipeline = pipeline_of(vec![
        Arc::new(GraphTier::new(graph)),
        Arc::new(FaqTier::new(faq)),
    ]);

    let resolution = pipeline
        .resolve(&AnswerRequest::new("tell me about what is your pricing?"))
        .await
        .unwrap();
    let Resolution::Answered(Answer::Faq {
        answer, match_type, ..
    }) = resolution
    else {
        panic!("expected faq answer");
    };
    assert_eq!(answer, "Free tier available.");
    assert_eq!(match_type, MatchType::Partial);
}

#[tokio::test]
async fn rag_path_counts_chunks_and_dedups_documents() {
    let (_dir, path) = temp_db();
    let (graph, faq) = knowledge_stores(&path).await;

    let hits = vec![
        chunk("clause text one", "document.pdf", 42, 0.91),
        chunk("clause text two", "document.pdf", 42, 0.87),
        chunk("clause text three", "document.pdf", 42, 0.71),
    ];
    let llm = Arc::new(QueueLlmProvider::new(vec![Ok(
        "The termination clause allows either party to exit with 30 days notice.".to_string(),
    )]));
    let pipeline = pipeline_of(vec![
        Arc::new(GraphTier::new(graph)),
        Arc::new(FaqTier::new(faq)),
        rag_tier(
            llm,
            Arc::new(StaticVectorStore::new(hits)),
            Arc::new(StaticEmbedder::new(vec![0.1, 0.2])),
        ),
    ]);

    let resolution = pipeline
        .resolve(&AnswerRequest::new("explain the termination clause"))
        .await
        .unwrap();
    let Resolution::Answered(Answer::Rag {
        answer,
        chunks_used,
        source_documents,
        degraded,
    }) = resolution
    else {
        panic!("expected rag answer");
    };
    assert!(answer.contains("termination clause"));
    assert_eq!(chunks_used, 3);
    assert_eq!(source_documents.len(), 1);
    assert_eq!(source_documents[0].document, "document.pdf");
    assert_eq!(source_documents[0].pdf_id, 42);
    assert!(!degraded);
}

#[tokio::test]
async fn llm_timeout_degrades_to_simple_answer() {
    let (_dir, path) = temp_db();
    let (graph, faq) = knowledge_stores(&path).await;

    let hits = vec![chunk("the relevant paragraph", "document.pdf", 7, 0.8)];
    let pipeline = pipeline_of(vec![
        Arc::new(GraphTier::new(graph)),
        Arc::new(FaqTier::new(faq)),
        rag_tier(
            Arc::new(TimeoutLlmProvider),
            Arc::new(StaticVectorStore::new(hits)),
            Arc::new(StaticEmbedder::new(vec![0.5])),
        ),
    ]);

    let resolution = pipeline
        .resolve(&AnswerRequest::new("anything at all"))
        .await
        .unwrap();
    let Resolution::Answered(Answer::Rag {
        answer, degraded, ..
    }) = resolution
    else {
        panic!("expected degraded rag answer");
    };
    assert!(degraded);
    assert!(!answer.is_empty());
    assert!(answer.contains("the relevant paragraph"));
}

#[tokio::test]
async fn empty_llm_output_also_degrades() {
    let (_dir, path) = temp_db();
    let (graph, faq) = knowledge_stores(&path).await;

    let hits = vec![chunk("fallback content", "notes.pdf", 3, 0.6)];
    let pipeline = pipeline_of(vec![
        Arc::new(GraphTier::new(graph)),
        Arc::new(FaqTier::new(faq)),
        rag_tier(
            Arc::new(QueueLlmProvider::new(vec![Ok("   ".to_string())])),
            Arc::new(StaticVectorStore::new(hits)),
            Arc::new(StaticEmbedder::new(vec![0.5])),
        ),
    ]);

    let resolution = pipeline
        .resolve(&AnswerRequest::new("anything"))
        .await
        .unwrap();
    let Resolution::Answered(Answer::Rag { degraded, .. }) = resolution else {
        panic!("expected degraded rag answer");
    };
    assert!(degraded);
}

#[tokio::test]
async fn zero_chunks_and_dead_llm_fails_gracefully() {
    let (_dir, path) = temp_db();
    let (graph, faq) = knowledge_stores(&path).await;

    let pipeline = pipeline_of(vec![
        Arc::new(GraphTier::new(graph)),
        Arc::new(FaqTier::new(faq)),
        rag_tier(
            Arc::new(TimeoutLlmProvider),
            Arc::new(StaticVectorStore::empty()),
            Arc::new(StaticEmbedder::new(vec![0.5])),
        ),
    ]);

    let resolution = pipeline
        .resolve(&AnswerRequest::new("unanswerable"))
        .await
        .unwrap();
    let Resolution::Failed { message } = resolution else {
        panic!("expected structured failure");
    };
    assert!(!message.is_empty());
}

#[tokio::test]
async fn vector_store_outage_fails_gracefully() {
    let (_dir, path) = temp_db();
    let (graph, faq) = knowledge_stores(&path).await;

    let pipeline = pipeline_of(vec![
        Arc::new(GraphTier::new(graph)),
        Arc::new(FaqTier::new(faq)),
        rag_tier(
            Arc::new(QueueLlmProvider::new(vec![])),
            Arc::new(FailingVectorStore),
            Arc::new(StaticEmbedder::new(vec![0.5])),
        ),
    ]);

    let resolution = pipeline
        .resolve(&AnswerRequest::new("anything"))
        .await
        .unwrap();
    assert!(matches!(resolution, Resolution::Failed { .. }));
}

#[tokio::test]
async fn embedding_outage_fails_gracefully() {
    let (_dir, path) = temp_db();
    let (graph, faq) = knowledge_stores(&path).await;

    let pipeline = pipeline_of(vec![
        Arc::new(GraphTier::new(graph)),
        Arc::new(FaqTier::new(faq)),
        rag_tier(
            Arc::new(QueueLlmProvider::new(vec![])),
            Arc::new(StaticVectorStore::empty()),
            Arc::new(FailingEmbedder),
        ),
    ]);

    let resolution = pipeline
        .resolve(&AnswerRequest::new("anything"))
        .await
        .unwrap();
    assert!(matches!(resolution, Resolution::Failed { .. }));
}

#[tokio::test]
async fn empty_question_is_rejected_before_tiers_run() {
    let (_dir, path) = temp_db();
    let (graph, faq) = knowledge_stores(&path).await;

    let pipeline = pipeline_of(vec![
        Arc::new(GraphTier::new(graph)),
        Arc::new(FaqTier::new(faq)),
    ]);

    let err = pipeline
        .resolve(&AnswerRequest::new("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, ArborBotError::Validation(_)));
}

#[tokio::test]
async fn no_match_without_rag_reports_no_information() {
    let (_dir, path) = temp_db();
    let (graph, faq) = knowledge_stores(&path).await;

    let pipeline = pipeline_of(vec![
        Arc::new(GraphTier::new(graph)),
        Arc::new(FaqTier::new(faq)),
    ]);

    let resolution = pipeline
        .resolve(&AnswerRequest::new("completely unknown"))
        .await
        .unwrap();
    let Resolution::Failed { message } = resolution else {
        panic!("expected failure");
    };
    assert!(message.contains("No relevant information"));
}
