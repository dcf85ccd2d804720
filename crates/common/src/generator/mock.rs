//! Deterministic generator for development and tests

use super::{GeneratorError, Proposal, ProposalGenerator};
use async_trait::async_trait;

const FRONT_WORDS: usize = 8;
const BACK_MAX_CHARS: usize = 480;

/// Builds one proposal per sentence of the source text
pub struct MockGenerator {
    max_proposals: usize,
}

impl MockGenerator {
    pub fn new(max_proposals: usize) -> Self {
        Self { max_proposals }
    }
}

#[async_trait]
impl ProposalGenerator for MockGenerator {
    async fn generate(&self, source_text: &str) -> Result<Vec<Proposal>, GeneratorError> {
        let proposals = source_text
            .split(|c| matches!(c, '.' | '!' | '?'))
            .map(str::trim)
            .filter(|sentence| sentence.split_whitespace().count() >= 3)
            .take(self.max_proposals)
            .map(sentence_to_proposal)
            .collect();

        Ok(proposals)
    }

    fn model_name(&self) -> &str {
        "mock-generator"
    }
}

fn sentence_to_proposal(sentence: &str) -> Proposal {
    let words: Vec<&str> = sentence.split_whitespace().collect();
    let lead = words[..words.len().min(FRONT_WORDS)].join(" ");
    let front = format!("How does this continue: \"{}...\"?", lead);
    let back: String = words.join(" ").chars().take(BACK_MAX_CHARS).collect();

    Proposal::new(front, back)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_one_proposal_per_sentence() {
        let generator = MockGenerator::new(10);
        let proposals = generator
            .generate("Rust has no garbage collector. Ownership rules are checked at compile time! Ok.")
            .await
            .unwrap();

        assert_eq!(proposals.len(), 2);
        assert_eq!(proposals[0].back, "Rust has no garbage collector");
        assert!(proposals[1].front.starts_with("How does this continue"));
    }

    #[tokio::test]
    async fn test_respects_cap() {
        let generator = MockGenerator::new(1);
        let text = "First sentence is here. Second sentence is here. Third sentence is here.";
        assert_eq!(generator.generate(text).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deterministic() {
        let generator = MockGenerator::new(10);
        let text = "Tokio drives async tasks to completion. Futures are lazy by default.";
        assert_eq!(
            generator.generate(text).await.unwrap(),
            generator.generate(text).await.unwrap()
        );
    }
}
