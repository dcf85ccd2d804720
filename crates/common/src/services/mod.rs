//! Application services
//!
//! Each service owns one slice of the domain and talks to persistence only
//! through [`FlashcardStore`]. Handlers hold an [`AppServices`] bundle.

mod acceptance;
mod flashcards;
mod generation;
mod history;

#[cfg(test)]
pub(crate) mod testing;

pub use acceptance::AcceptanceService;
pub use flashcards::FlashcardService;
pub use generation::{hash_source_text, GenerationService};
pub use history::HistoryService;

use crate::config::{AppConfig, PolicyConfig};
use crate::db::{FlashcardStore, NewFlashcard};
use crate::errors::{AppError, Result};
use crate::generator::{Proposal, ProposalGenerator};
use std::sync::Arc;

/// Length limits on source text and flashcard sides
#[derive(Debug, Clone)]
pub struct ContentPolicy {
    config: PolicyConfig,
}

impl ContentPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    /// Validate source text and return its length in characters
    pub fn check_source_text(&self, source_text: &str) -> Result<usize> {
        let length = source_text.chars().count();
        let (min, max) = (
            self.config.source_text_min_chars,
            self.config.source_text_max_chars,
        );

        if length < min || length > max {
            return Err(AppError::validation(
                "source_text",
                format!(
                    "source_text must be between {} and {} characters, got {}",
                    min, max, length
                ),
            ));
        }

        Ok(length)
    }

    /// Trim and bound-check a front/back pair
    pub fn check_card(&self, front: &str, back: &str) -> Result<NewFlashcard> {
        let front = front.trim();
        let back = back.trim();

        check_side("front", front, self.config.front_max_chars)?;
        check_side("back", back, self.config.back_max_chars)?;

        Ok(NewFlashcard {
            front: front.to_string(),
            back: back.to_string(),
        })
    }

    /// Whether a generated proposal could become a flashcard unchanged
    pub fn accepts_proposal(&self, proposal: &Proposal) -> bool {
        self.check_card(&proposal.front, &proposal.back).is_ok()
    }

    pub fn allow_editing_generated(&self) -> bool {
        self.config.allow_editing_generated_flashcards
    }
}

fn check_side(field: &str, value: &str, max: usize) -> Result<()> {
    if value.is_empty() {
        return Err(AppError::validation(field, format!("{} must not be empty", field)));
    }

    let length = value.chars().count();
    if length > max {
        return Err(AppError::validation(
            field,
            format!("{} must be at most {} characters, got {}", field, max, length),
        ));
    }

    Ok(())
}

/// Every service, wired to one store and one generator
#[derive(Clone)]
pub struct AppServices {
    pub generations: GenerationService,
    pub acceptance: AcceptanceService,
    pub history: HistoryService,
    pub flashcards: FlashcardService,
    store: Arc<dyn FlashcardStore>,
}

impl AppServices {
    pub fn new(
        store: Arc<dyn FlashcardStore>,
        generator: Arc<dyn ProposalGenerator>,
        config: &AppConfig,
    ) -> Self {
        let policy = ContentPolicy::new(config.policy.clone());

        Self {
            generations: GenerationService::new(
                store.clone(),
                generator,
                policy.clone(),
                config.generator_timeout(),
            ),
            acceptance: AcceptanceService::new(store.clone(), policy.clone()),
            history: HistoryService::new(store.clone(), config.pagination.clone()),
            flashcards: FlashcardService::new(store.clone(), policy, config.pagination.clone()),
            store,
        }
    }

    /// Check that the store is reachable
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }
}
