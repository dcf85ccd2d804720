//! Persistence contract used by the services
//!
//! Two implementations exist: [`Repository`](super::Repository) over Postgres
//! and [`MemoryStore`](super::MemoryStore) for development and tests. Both
//! scope every query to the owning user; a record owned by someone else is
//! reported exactly like a missing one.

use crate::db::models::{
    DecisionOutcome, Flashcard, FlashcardSource, Generation, GenerationErrorLog,
};
use crate::errors::Result;
use crate::generator::Proposal;
use async_trait::async_trait;
use uuid::Uuid;

/// Fields of a generation row known at insert time
#[derive(Debug, Clone)]
pub struct NewGeneration {
    pub user_id: Uuid,
    pub model: String,
    pub source_text_hash: String,
    pub source_text_length: i32,
    pub generation_duration: i64,
    pub proposals: Vec<Proposal>,
}

/// Fields of an error log row
#[derive(Debug, Clone)]
pub struct NewErrorLog {
    pub user_id: Uuid,
    pub model: String,
    pub source_text_hash: String,
    pub source_text_length: i32,
    pub error_code: String,
    pub error_message: String,
}

/// Content of a flashcard written by hand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFlashcard {
    pub front: String,
    pub back: String,
}

/// A validated decision ready to be applied.
///
/// `card` is present exactly when the outcome accepts the proposal and holds
/// the final front/back of the flashcard to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub proposal_index: u32,
    pub outcome: DecisionOutcome,
    pub card: Option<NewFlashcard>,
}

/// Optional filters for flashcard listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlashcardFilter {
    pub source: Option<FlashcardSource>,
    pub generation_id: Option<i64>,
}

/// Sums over every generation of one user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationTotals {
    pub generations: u64,
    pub generated: i64,
    pub accepted_unedited: i64,
    pub accepted_edited: i64,
}

#[async_trait]
pub trait FlashcardStore: Send + Sync {
    /// Check connectivity
    async fn ping(&self) -> Result<()>;

    // ------------------------------------------------------------------
    // Generations
    // ------------------------------------------------------------------

    /// Insert a generation with both acceptance counters at zero
    async fn insert_generation(&self, generation: NewGeneration) -> Result<Generation>;

    async fn find_generation(&self, user_id: Uuid, id: i64) -> Result<Option<Generation>>;

    /// Like [`find_generation`](Self::find_generation) but never served by a
    /// read replica. Used right after a generation may have been written.
    async fn find_generation_on_primary(&self, user_id: Uuid, id: i64) -> Result<Option<Generation>> {
        self.find_generation(user_id, id).await
    }

    /// Page of generations, newest first, ties by id descending, plus the
    /// total count
    async fn list_generations(
        &self,
        user_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Generation>, u64)>;

    async fn generation_totals(&self, user_id: Uuid) -> Result<GenerationTotals>;

    /// Apply a batch of decisions to one generation, all or nothing.
    ///
    /// For every resolution a `(generation_id, proposal_index)` marker is
    /// written; accepting resolutions also create their flashcard and bump
    /// the matching counter. Fails with `GenerationNotFound` when the
    /// generation is absent or not owned, with `ProposalAlreadyResolved` when
    /// any index was decided before or repeats inside the batch, and with
    /// `Conflict` when the counters would exceed `generated_count`. Returns
    /// the created flashcards in decision order.
    async fn resolve_proposals(
        &self,
        user_id: Uuid,
        generation_id: i64,
        resolutions: Vec<Resolution>,
    ) -> Result<Vec<Flashcard>>;

    // ------------------------------------------------------------------
    // Error logs
    // ------------------------------------------------------------------

    async fn insert_error_log(&self, log: NewErrorLog) -> Result<GenerationErrorLog>;

    async fn list_error_logs(
        &self,
        user_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<GenerationErrorLog>, u64)>;

    // ------------------------------------------------------------------
    // Flashcards
    // ------------------------------------------------------------------

    /// Insert manual flashcards (no generation, no counters)
    async fn insert_manual_flashcards(
        &self,
        user_id: Uuid,
        cards: Vec<NewFlashcard>,
    ) -> Result<Vec<Flashcard>>;

    async fn find_flashcard(&self, user_id: Uuid, id: i64) -> Result<Option<Flashcard>>;

    /// Page of flashcards, newest first, ties by id descending
    async fn list_flashcards(
        &self,
        user_id: Uuid,
        filter: &FlashcardFilter,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Flashcard>, u64)>;

    /// All flashcards of one generation, oldest first
    async fn list_generation_flashcards(
        &self,
        user_id: Uuid,
        generation_id: i64,
    ) -> Result<Vec<Flashcard>>;

    /// Replace front and back; `None` when the card does not exist
    async fn update_flashcard(
        &self,
        user_id: Uuid,
        id: i64,
        content: NewFlashcard,
    ) -> Result<Option<Flashcard>>;

    /// Returns whether a row was removed
    async fn delete_flashcard(&self, user_id: Uuid, id: i64) -> Result<bool>;
}
