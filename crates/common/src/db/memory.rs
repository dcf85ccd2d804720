//! In-process store for development and tests
//!
//! Holds everything behind one mutex, so every operation is trivially
//! atomic. Not shared between processes.

use super::store::{
    FlashcardFilter, FlashcardStore, GenerationTotals, NewErrorLog, NewFlashcard, NewGeneration,
    Resolution,
};
use crate::db::models::{DecisionOutcome, Flashcard, FlashcardSource, Generation, GenerationErrorLog};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    generations: BTreeMap<i64, Generation>,
    error_logs: BTreeMap<i64, GenerationErrorLog>,
    flashcards: BTreeMap<i64, Flashcard>,
    resolutions: BTreeMap<(i64, u32), DecisionOutcome>,
    next_generation_id: i64,
    next_error_log_id: i64,
    next_flashcard_id: i64,
}

impl MemoryState {
    fn next_flashcard_id(&mut self) -> i64 {
        self.next_flashcard_id += 1;
        self.next_flashcard_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(|_| AppError::Internal {
            message: "memory store lock poisoned".to_string(),
        })
    }

    /// Number of error log rows across all users
    pub fn error_log_count(&self) -> Result<usize> {
        Ok(self.state()?.error_logs.len())
    }

    /// Number of generation rows across all users
    pub fn generation_count(&self) -> Result<usize> {
        Ok(self.state()?.generations.len())
    }

    /// Number of flashcard rows across all users
    pub fn flashcard_count(&self) -> Result<usize> {
        Ok(self.state()?.flashcards.len())
    }
}

/// Newest first, ties by id descending, then slice the window
fn window<T: Clone>(
    mut rows: Vec<T>,
    key: impl Fn(&T) -> (chrono::DateTime<Utc>, i64),
    offset: u64,
    limit: u64,
) -> (Vec<T>, u64) {
    let total = rows.len() as u64;
    rows.sort_by_key(|row| Reverse(key(row)));
    let page = rows
        .into_iter()
        .skip(offset.min(usize::MAX as u64) as usize)
        .take(limit.min(usize::MAX as u64) as usize)
        .collect();
    (page, total)
}

#[async_trait]
impl FlashcardStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        self.state().map(|_| ())
    }

    async fn insert_generation(&self, generation: NewGeneration) -> Result<Generation> {
        let proposals = serde_json::to_value(&generation.proposals)?;
        let mut state = self.state()?;
        state.next_generation_id += 1;
        let now = Utc::now();

        let row = Generation {
            id: state.next_generation_id,
            user_id: generation.user_id,
            model: generation.model,
            generated_count: generation.proposals.len() as i32,
            accepted_unedited_count: 0,
            accepted_edited_count: 0,
            source_text_hash: generation.source_text_hash,
            source_text_length: generation.source_text_length,
            generation_duration: generation.generation_duration,
            proposals,
            created_at: now,
            updated_at: now,
        };

        state.generations.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_generation(&self, user_id: Uuid, id: i64) -> Result<Option<Generation>> {
        Ok(self
            .state()?
            .generations
            .get(&id)
            .filter(|g| g.user_id == user_id)
            .cloned())
    }

    async fn list_generations(
        &self,
        user_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Generation>, u64)> {
        let rows: Vec<Generation> = self
            .state()?
            .generations
            .values()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect();
        Ok(window(rows, |g: &Generation| (g.created_at, g.id), offset, limit))
    }

    async fn generation_totals(&self, user_id: Uuid) -> Result<GenerationTotals> {
        Ok(self
            .state()?
            .generations
            .values()
            .filter(|g| g.user_id == user_id)
            .fold(GenerationTotals::default(), |mut totals, g| {
                totals.generations += 1;
                totals.generated += g.generated_count as i64;
                totals.accepted_unedited += g.accepted_unedited_count as i64;
                totals.accepted_edited += g.accepted_edited_count as i64;
                totals
            }))
    }

    async fn resolve_proposals(
        &self,
        user_id: Uuid,
        generation_id: i64,
        resolutions: Vec<Resolution>,
    ) -> Result<Vec<Flashcard>> {
        let mut state = self.state()?;

        let generation = state
            .generations
            .get(&generation_id)
            .filter(|g| g.user_id == user_id)
            .cloned()
            .ok_or(AppError::GenerationNotFound { id: generation_id })?;

        let mut seen = HashSet::new();
        let mut duplicates: Vec<u32> = resolutions
            .iter()
            .map(|r| r.proposal_index)
            .filter(|&index| {
                !seen.insert(index) || state.resolutions.contains_key(&(generation_id, index))
            })
            .collect();
        if !duplicates.is_empty() {
            duplicates.sort_unstable();
            duplicates.dedup();
            return Err(AppError::ProposalAlreadyResolved {
                generation_id,
                proposal_indices: duplicates,
            });
        }

        let unedited = resolutions
            .iter()
            .filter(|r| r.outcome == DecisionOutcome::AcceptedUnedited)
            .count() as i64;
        let edited = resolutions
            .iter()
            .filter(|r| r.outcome == DecisionOutcome::AcceptedEdited)
            .count() as i64;
        if generation.accepted_total() + unedited + edited > generation.generated_count as i64 {
            return Err(AppError::Conflict {
                message: format!(
                    "Generation {} cannot accept more than {} proposals",
                    generation_id, generation.generated_count
                ),
            });
        }

        let now = Utc::now();
        let mut created = Vec::new();
        for resolution in resolutions {
            state
                .resolutions
                .insert((generation_id, resolution.proposal_index), resolution.outcome);

            let (Some(source), Some(card)) = (resolution.outcome.flashcard_source(), resolution.card)
            else {
                continue;
            };

            let flashcard = Flashcard {
                id: state.next_flashcard_id(),
                user_id,
                front: card.front,
                back: card.back,
                source,
                generation_id: Some(generation_id),
                created_at: now,
                updated_at: now,
            };
            state.flashcards.insert(flashcard.id, flashcard.clone());
            created.push(flashcard);
        }

        if let Some(row) = state.generations.get_mut(&generation_id) {
            row.accepted_unedited_count += unedited as i32;
            row.accepted_edited_count += edited as i32;
            row.updated_at = now;
        }

        Ok(created)
    }

    async fn insert_error_log(&self, log: NewErrorLog) -> Result<GenerationErrorLog> {
        let mut state = self.state()?;
        state.next_error_log_id += 1;

        let row = GenerationErrorLog {
            id: state.next_error_log_id,
            user_id: log.user_id,
            model: log.model,
            source_text_hash: log.source_text_hash,
            source_text_length: log.source_text_length,
            error_code: log.error_code,
            error_message: log.error_message,
            created_at: Utc::now(),
        };

        state.error_logs.insert(row.id, row.clone());
        Ok(row)
    }

    async fn list_error_logs(
        &self,
        user_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<GenerationErrorLog>, u64)> {
        let rows: Vec<GenerationErrorLog> = self
            .state()?
            .error_logs
            .values()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        Ok(window(rows, |l: &GenerationErrorLog| (l.created_at, l.id), offset, limit))
    }

    async fn insert_manual_flashcards(
        &self,
        user_id: Uuid,
        cards: Vec<NewFlashcard>,
    ) -> Result<Vec<Flashcard>> {
        let mut state = self.state()?;
        let now = Utc::now();

        let mut created = Vec::with_capacity(cards.len());
        for card in cards {
            let flashcard = Flashcard {
                id: state.next_flashcard_id(),
                user_id,
                front: card.front,
                back: card.back,
                source: FlashcardSource::Manual,
                generation_id: None,
                created_at: now,
                updated_at: now,
            };
            state.flashcards.insert(flashcard.id, flashcard.clone());
            created.push(flashcard);
        }

        Ok(created)
    }

    async fn find_flashcard(&self, user_id: Uuid, id: i64) -> Result<Option<Flashcard>> {
        Ok(self
            .state()?
            .flashcards
            .get(&id)
            .filter(|c| c.user_id == user_id)
            .cloned())
    }

    async fn list_flashcards(
        &self,
        user_id: Uuid,
        filter: &FlashcardFilter,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Flashcard>, u64)> {
        let rows: Vec<Flashcard> = self
            .state()?
            .flashcards
            .values()
            .filter(|c| c.user_id == user_id)
            .filter(|c| filter.source.map_or(true, |s| c.source == s))
            .filter(|c| filter.generation_id.map_or(true, |g| c.generation_id == Some(g)))
            .cloned()
            .collect();
        Ok(window(rows, |c: &Flashcard| (c.created_at, c.id), offset, limit))
    }

    async fn list_generation_flashcards(
        &self,
        user_id: Uuid,
        generation_id: i64,
    ) -> Result<Vec<Flashcard>> {
        let mut rows: Vec<Flashcard> = self
            .state()?
            .flashcards
            .values()
            .filter(|c| c.user_id == user_id && c.generation_id == Some(generation_id))
            .cloned()
            .collect();
        rows.sort_by_key(|c| (c.created_at, c.id));
        Ok(rows)
    }

    async fn update_flashcard(
        &self,
        user_id: Uuid,
        id: i64,
        content: NewFlashcard,
    ) -> Result<Option<Flashcard>> {
        let mut state = self.state()?;
        let Some(card) = state.flashcards.get_mut(&id).filter(|c| c.user_id == user_id) else {
            return Ok(None);
        };

        card.front = content.front;
        card.back = content.back;
        card.updated_at = Utc::now();
        Ok(Some(card.clone()))
    }

    async fn delete_flashcard(&self, user_id: Uuid, id: i64) -> Result<bool> {
        let mut state = self.state()?;
        let owned = state
            .flashcards
            .get(&id)
            .is_some_and(|c| c.user_id == user_id);
        if owned {
            state.flashcards.remove(&id);
        }
        Ok(owned)
    }
}
