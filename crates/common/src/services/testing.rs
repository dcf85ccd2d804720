//! Test doubles shared by the service tests

use crate::config::AppConfig;
use crate::db::models::{Flashcard, Generation, GenerationErrorLog};
use crate::db::{
    FlashcardFilter, FlashcardStore, GenerationTotals, MemoryStore, NewErrorLog, NewFlashcard,
    NewGeneration, Resolution,
};
use crate::errors::AppError;
use crate::generator::{GeneratorError, Proposal, ProposalGenerator};
use crate::services::AppServices;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Returns a fixed proposal list and counts calls
pub struct ScriptedGenerator {
    proposals: Vec<Proposal>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(proposals: Vec<Proposal>) -> Self {
        Self {
            proposals,
            calls: AtomicUsize::new(0),
        }
    }

    /// `n` distinct valid proposals
    pub fn with_count(n: usize) -> Self {
        Self::new(
            (0..n)
                .map(|i| Proposal::new(format!("Question {}", i), format!("Answer {}", i)))
                .collect(),
        )
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProposalGenerator for ScriptedGenerator {
    async fn generate(&self, _source_text: &str) -> Result<Vec<Proposal>, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.proposals.clone())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Always fails with the given error
pub struct FailingGenerator {
    error: GeneratorError,
}

impl FailingGenerator {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            error: GeneratorError::new(code, message),
        }
    }
}

#[async_trait]
impl ProposalGenerator for FailingGenerator {
    async fn generate(&self, _source_text: &str) -> Result<Vec<Proposal>, GeneratorError> {
        Err(self.error.clone())
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Sleeps before answering
pub struct SlowGenerator {
    delay: Duration,
}

impl SlowGenerator {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl ProposalGenerator for SlowGenerator {
    async fn generate(&self, _source_text: &str) -> Result<Vec<Proposal>, GeneratorError> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![Proposal::new("Late question", "Late answer")])
    }

    fn model_name(&self) -> &str {
        "slow"
    }
}

/// Panics inside the generation task
pub struct PanickingGenerator;

#[async_trait]
impl ProposalGenerator for PanickingGenerator {
    async fn generate(&self, _source_text: &str) -> Result<Vec<Proposal>, GeneratorError> {
        panic!("generator crashed")
    }

    fn model_name(&self) -> &str {
        "panicking"
    }
}

/// In-memory store with injectable faults
#[derive(Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    fail_generation_writes: bool,
    stale_reads: bool,
}

impl FaultyStore {
    /// Every `insert_generation` fails
    pub fn failing_generation_writes() -> Self {
        Self {
            fail_generation_writes: true,
            ..Self::default()
        }
    }

    /// `find_generation` behaves like a replica that has not caught up
    pub fn stale_reads() -> Self {
        Self {
            stale_reads: true,
            ..Self::default()
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl FlashcardStore for FaultyStore {
    async fn ping(&self) -> crate::Result<()> {
        self.inner.ping().await
    }

    async fn insert_generation(&self, generation: NewGeneration) -> crate::Result<Generation> {
        if self.fail_generation_writes {
            return Err(AppError::Internal {
                message: "write failed".into(),
            });
        }
        self.inner.insert_generation(generation).await
    }

    async fn find_generation(&self, user_id: Uuid, id: i64) -> crate::Result<Option<Generation>> {
        if self.stale_reads {
            return Ok(None);
        }
        self.inner.find_generation(user_id, id).await
    }

    async fn find_generation_on_primary(&self, user_id: Uuid, id: i64) -> crate::Result<Option<Generation>> {
        self.inner.find_generation_on_primary(user_id, id).await
    }

    async fn list_generations(
        &self,
        user_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> crate::Result<(Vec<Generation>, u64)> {
        self.inner.list_generations(user_id, offset, limit).await
    }

    async fn generation_totals(&self, user_id: Uuid) -> crate::Result<GenerationTotals> {
        self.inner.generation_totals(user_id).await
    }

    async fn resolve_proposals(
        &self,
        user_id: Uuid,
        generation_id: i64,
        resolutions: Vec<Resolution>,
    ) -> crate::Result<Vec<Flashcard>> {
        self.inner.resolve_proposals(user_id, generation_id, resolutions).await
    }

    async fn insert_error_log(&self, log: NewErrorLog) -> crate::Result<GenerationErrorLog> {
        self.inner.insert_error_log(log).await
    }

    async fn list_error_logs(
        &self,
        user_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> crate::Result<(Vec<GenerationErrorLog>, u64)> {
        self.inner.list_error_logs(user_id, offset, limit).await
    }

    async fn insert_manual_flashcards(
        &self,
        user_id: Uuid,
        cards: Vec<NewFlashcard>,
    ) -> crate::Result<Vec<Flashcard>> {
        self.inner.insert_manual_flashcards(user_id, cards).await
    }

    async fn find_flashcard(&self, user_id: Uuid, id: i64) -> crate::Result<Option<Flashcard>> {
        self.inner.find_flashcard(user_id, id).await
    }

    async fn list_flashcards(
        &self,
        user_id: Uuid,
        filter: &FlashcardFilter,
        offset: u64,
        limit: u64,
    ) -> crate::Result<(Vec<Flashcard>, u64)> {
        self.inner.list_flashcards(user_id, filter, offset, limit).await
    }

    async fn list_generation_flashcards(
        &self,
        user_id: Uuid,
        generation_id: i64,
    ) -> crate::Result<Vec<Flashcard>> {
        self.inner.list_generation_flashcards(user_id, generation_id).await
    }

    async fn update_flashcard(
        &self,
        user_id: Uuid,
        id: i64,
        content: NewFlashcard,
    ) -> crate::Result<Option<Flashcard>> {
        self.inner.update_flashcard(user_id, id, content).await
    }

    async fn delete_flashcard(&self, user_id: Uuid, id: i64) -> crate::Result<bool> {
        self.inner.delete_flashcard(user_id, id).await
    }
}

/// Source text of exactly `chars` characters
pub fn source_text(chars: usize) -> String {
    "Ownership moves values. ".chars().cycle().take(chars).collect()
}

pub fn user() -> Uuid {
    Uuid::new_v4()
}

/// Services over a fresh in-memory store with default configuration
pub fn services_with(generator: Arc<dyn ProposalGenerator>) -> (AppServices, Arc<MemoryStore>) {
    services_with_config(generator, &AppConfig::default())
}

pub fn services_with_config(
    generator: Arc<dyn ProposalGenerator>,
    config: &AppConfig,
) -> (AppServices, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let services = AppServices::new(store.clone(), generator, config);
    (services, store)
}
