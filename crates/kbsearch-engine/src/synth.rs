use anyhow::Result;
use kbsearch_core::traits::Synthesizer;

pub const NO_CONTEXT_ANSWER: &str = "I couldn't find relevant information to answer your question.";

/// Answers with the retrieved context itself, best match first.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContextSynthesizer;

impl Synthesizer for ContextSynthesizer {
    fn synthesize(&self, _query: &str, chunks: &[&str]) -> Result<String> {
        if chunks.is_empty() {
            return Ok(NO_CONTEXT_ANSWER.to_string());
        }
        Ok(format!("Based on the available documents:\n\n{}", chunks.join("\n\n---\n\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_chunks_in_rank_order() {
        let answer = ContextSynthesizer.synthesize("q", &["first", "second"]).unwrap();
        assert_eq!(answer, "Based on the available documents:\n\nfirst\n\n---\n\nsecond");
    }

    #[test]
    fn no_chunks_gives_fallback() {
        assert_eq!(ContextSynthesizer.synthesize("q", &[]).unwrap(), NO_CONTEXT_ANSWER);
    }
}
