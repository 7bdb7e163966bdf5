use serde::{Deserialize, Serialize};

/// Incoming question plus optional session/user context.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnswerRequest {
    pub question: String,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub workflow_id: Option<i32>,
}

impl AnswerRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            session_id: None,
            user_id: None,
            workflow_id: None,
        }
    }
}

/// A retrieved document chunk with similarity score and provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkHit {
    pub text: String,
    pub document: String,
    pub pdf_id: i64,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetNode {
    pub text: String,
    pub is_source: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub document: String,
    pub pdf_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Partial,
}

/// Which tier produced a stored answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    KnowledgeGraph,
    Faq,
    Rag,
    Unknown,
}

impl AnswerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerSource::KnowledgeGraph => "knowledge_graph",
            AnswerSource::Faq => "faq",
            AnswerSource::Rag => "rag",
            AnswerSource::Unknown => "unknown",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "knowledge_graph" => AnswerSource::KnowledgeGraph,
            "faq" => AnswerSource::Faq,
            "rag" => AnswerSource::Rag,
            _ => AnswerSource::Unknown,
        }
    }
}

/// A resolved answer, tagged by the tier that produced it.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Answer {
    KnowledgeGraph {
        answers: Vec<String>,
        target_nodes: Vec<TargetNode>,
    },
    Faq {
        answer: String,
        faq_id: i32,
        #[serde(skip_serializing_if = "Option::is_none")]
        category: Option<String>,
        match_type: MatchType,
    },
    Rag {
        answer: String,
        chunks_used: usize,
        source_documents: Vec<SourceDocument>,
        degraded: bool,
    },
}

impl Answer {
    pub fn source(&self) -> AnswerSource {
        match self {
            Answer::KnowledgeGraph { .. } => AnswerSource::KnowledgeGraph,
            Answer::Faq { .. } => AnswerSource::Faq,
            Answer::Rag { .. } => AnswerSource::Rag,
        }
    }

    /// Flat text form persisted as the message answer.
    pub fn display_text(&self) -> String {
        match self {
            Answer::KnowledgeGraph { answers, .. } => answers.join("\n"),
            Answer::Faq { answer, .. } => answer.clone(),
            Answer::Rag { answer, .. } => answer.clone(),
        }
    }
}

/// Terminal outcome of one pipeline run.
#[derive(Debug, Clone)]
pub enum Resolution {
    Answered(Answer),
    Failed { message: String },
}

/// Wire shape returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerEnvelope {
    pub success: bool,
    #[serde(flatten)]
    pub answer: Option<Answer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AnswerEnvelope {
    pub fn answered(answer: Answer) -> Self {
        Self {
            success: true,
            answer: Some(answer),
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            answer: None,
            message: Some(message.into()),
        }
    }
}

impl From<Resolution> for AnswerEnvelope {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Answered(answer) => AnswerEnvelope::answered(answer),
            Resolution::Failed { message } => AnswerEnvelope::failed(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serializes_source_tagged_shapes() {
        let envelope = AnswerEnvelope::answered(Answer::Faq {
            answer: "Free tier available.".to_string(),
            faq_id: 7,
            category: None,
            match_type: MatchType::Exact,
        });
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["source"], "faq");
        assert_eq!(value["faq_id"], 7);
        assert_eq!(value["match_type"], "exact");
        assert!(value.get("category").is_none());

        let envelope = AnswerEnvelope::failed("no answer available");
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["success"], false);
        assert!(value.get("source").is_none());
    }

    #[test]
    fn source_round_trips_through_storage_form() {
        for source in [
            AnswerSource::KnowledgeGraph,
            AnswerSource::Faq,
            AnswerSource::Rag,
            AnswerSource::Unknown,
        ] {
            assert_eq!(AnswerSource::parse(source.as_str()), source);
        }
        assert_eq!(AnswerSource::parse("garbage"), AnswerSource::Unknown);
    }
}
