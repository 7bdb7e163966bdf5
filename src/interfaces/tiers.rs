use async_trait::async_trait;

use crate::domains::answer::{Answer, AnswerRequest};
use crate::error::Result;

/// One answer source in the cascade. `Ok(None)` means "no match, try the next
/// tier"; an error means the tier could not run at all and the pipeline
/// degrades without surfacing it raw.
#[async_trait]
pub trait AnswerTier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(&self, request: &AnswerRequest) -> Result<Option<Answer>>;
}
