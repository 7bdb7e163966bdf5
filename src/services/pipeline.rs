use std::sync::Arc;

use crate::domains::answer::{AnswerRequest, Resolution};
use crate::error::{ArborBotError, Result};
use crate::interfaces::tiers::AnswerTier;

const NO_MATCH_MESSAGE: &str =
    "No relevant information found. Please try another question or upload documents.";
const DEGRADED_MESSAGE: &str =
    "Unable to answer the question right now. Please try again later.";

/// The answer-resolution cascade. Tiers are tried strictly in order and the
/// first match wins; later tiers never run once an earlier tier answers. A
/// tier that errors is logged and skipped, and when no tier can produce even a
/// degraded answer the pipeline resolves to a structured failure instead of
/// propagating the error.
pub struct AnswerPipeline {
    tiers: Vec<Arc<dyn AnswerTier>>,
}

impl AnswerPipeline {
    pub fn new(tiers: Vec<Arc<dyn AnswerTier>>) -> Self {
        Self { tiers }
    }

    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    /// Resolves one question. Fails only on validation; every other failure
    /// mode ends in `Resolution::Failed` with a human-readable message.
    pub async fn resolve(&self, request: &AnswerRequest) -> Result<Resolution> {
        if request.question.trim().is_empty() {
            return Err(ArborBotError::Validation(
                "question must not be empty".to_string(),
            ));
        }

        let mut tier_failed = false;
        for tier in &self.tiers {
            match tier.attempt(request).await {
                Ok(Some(answer)) => {
                    tracing::info!(
                        tier = tier.name(),
                        source = answer.source().as_str(),
                        "question answered"
                    );
                    return Ok(Resolution::Answered(answer));
                }
                Ok(None) => {
                    tracing::debug!(tier = tier.name(), "no match, trying next tier");
                }
                Err(err) => {
                    tracing::warn!(tier = tier.name(), error = %err, "tier failed, degrading");
                    tier_failed = true;
                }
            }
        }

        let message = if tier_failed {
            DEGRADED_MESSAGE
        } else {
            NO_MATCH_MESSAGE
        };
        Ok(Resolution::Failed {
            message: message.to_string(),
        })
    }
}
