use crate::domains::answer::ChunkHit;

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_CHAR_BUDGET: usize = 4000;

/// Formats retrieved chunks into a bounded prompt context, best match first,
/// each chunk tagged with its originating document so generated answers can
/// cite sources. Deterministic and side-effect free.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    top_k: usize,
    char_budget: usize,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_K, DEFAULT_CHAR_BUDGET)
    }
}

impl ContextBuilder {
    pub fn new(top_k: usize, char_budget: usize) -> Self {
        Self {
            top_k: top_k.max(1),
            char_budget: char_budget.max(1),
        }
    }

    pub fn build(&self, chunks: &[ChunkHit]) -> String {
        if chunks.is_empty() {
            return "No context available.".to_string();
        }

        let mut ordered: Vec<&ChunkHit> = chunks.iter().collect();
        ordered.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut out = String::new();
        for (i, chunk) in ordered.iter().take(self.top_k).enumerate() {
            let remaining = self.char_budget.saturating_sub(out.chars().count());
            if remaining == 0 {
                break;
            }
            let block = format!(
                "CHUNK {}: [Source: {}, Relevance: {:.4}]\n{}\n---\n",
                i + 1,
                chunk.document,
                chunk.score,
                chunk.text
            );
            if block.chars().count() > remaining {
                out.extend(block.chars().take(remaining));
                break;
            }
            out.push_str(&block);
        }
        out.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, document: &str, score: f32) -> ChunkHit {
        ChunkHit {
            text: text.to_string(),
            document: document.to_string(),
            pdf_id: 1,
            score,
        }
    }

    #[test]
    fn orders_by_descending_score_and_tags_sources() {
        let builder = ContextBuilder::default();
        let context = builder.build(&[
            chunk("second", "b.pdf", 0.5),
            chunk("first", "a.pdf", 0.9),
        ]);
        let first_pos = context.find("first").unwrap();
        let second_pos = context.find("second").unwrap();
        assert!(first_pos < second_pos);
        assert!(context.contains("[Source: a.pdf"));
        assert!(context.starts_with("CHUNK 1:"));
    }

    #[test]
    fn respects_top_k_and_char_budget() {
        let builder = ContextBuilder::new(2, 80);
        let chunks = vec![
            chunk(&"x".repeat(200), "a.pdf", 0.9),
            chunk("never included", "b.pdf", 0.8),
            chunk("dropped by top_k", "c.pdf", 0.7),
        ];
        let context = builder.build(&chunks);
        assert!(context.chars().count() <= 80);
        assert!(!context.contains("dropped by top_k"));
    }

    #[test]
    fn empty_input_yields_placeholder() {
        let builder = ContextBuilder::default();
        assert_eq!(builder.build(&[]), "No context available.");
    }
}
