//! Generation session manager
//!
//! Runs one generation attempt: validates the source text, calls the
//! generator under a timeout, and records exactly one outcome. A success
//! becomes a generation row; any failure becomes an error log row.
//!
//! The attempt runs on its own task so that the outcome is still recorded
//! when the caller goes away mid-request.

use super::ContentPolicy;
use crate::db::{FlashcardStore, NewErrorLog, NewGeneration};
use crate::dto::{GenerationProposalDto, GenerationResponseDto};
use crate::errors::{AppError, Result};
use crate::generator::{codes, GeneratorError, Proposal, ProposalGenerator};
use crate::metrics;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// SHA-256 of the source text, hex encoded
pub fn hash_source_text(source_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_text.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Clone)]
pub struct GenerationService {
    store: Arc<dyn FlashcardStore>,
    generator: Arc<dyn ProposalGenerator>,
    policy: ContentPolicy,
    timeout: Duration,
}

/// Everything the detached attempt needs
struct Attempt {
    store: Arc<dyn FlashcardStore>,
    generator: Arc<dyn ProposalGenerator>,
    policy: ContentPolicy,
    timeout: Duration,
    user_id: Uuid,
    source_text: String,
    source_text_hash: String,
    source_text_length: i32,
}

impl GenerationService {
    pub fn new(
        store: Arc<dyn FlashcardStore>,
        generator: Arc<dyn ProposalGenerator>,
        policy: ContentPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            generator,
            policy,
            timeout,
        }
    }

    /// Override the generator timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run one generation attempt for `user_id`.
    ///
    /// Invalid source text is rejected before anything is recorded. Otherwise
    /// exactly one of a generation or an error log is written, and a failure
    /// is reported as `AppError::Generation` carrying the log id.
    #[instrument(skip(self, source_text), fields(model = %self.generator.model_name()))]
    pub async fn generate(&self, user_id: Uuid, source_text: String) -> Result<GenerationResponseDto> {
        let length = self.policy.check_source_text(&source_text)?;
        let source_text_hash = hash_source_text(&source_text);

        let attempt = Attempt {
            store: self.store.clone(),
            generator: self.generator.clone(),
            policy: self.policy.clone(),
            timeout: self.timeout,
            user_id,
            source_text,
            source_text_hash: source_text_hash.clone(),
            source_text_length: length as i32,
        };

        match tokio::spawn(attempt.run()).await {
            Ok(result) => result,
            Err(join_error) => {
                // The attempt died before recording anything
                warn!(error = %join_error, "Generation task failed");
                let error = GeneratorError::new(codes::INTERNAL, "Generation task failed");
                let log = self
                    .store
                    .insert_error_log(NewErrorLog {
                        user_id,
                        model: self.generator.model_name().to_string(),
                        source_text_hash,
                        source_text_length: length as i32,
                        error_code: error.code.clone(),
                        error_message: error.message.clone(),
                    })
                    .await?;

                Err(AppError::Generation {
                    error_log_id: log.id,
                    error_code: error.code,
                    message: error.message,
                })
            }
        }
    }
}

impl Attempt {
    async fn run(self) -> Result<GenerationResponseDto> {
        let model = self.generator.model_name().to_string();
        let started = Instant::now();

        let outcome = match tokio::time::timeout(self.timeout, self.generator.generate(&self.source_text)).await {
            Ok(Ok(proposals)) => self.sanitize(proposals),
            Ok(Err(error)) => Err(error),
            Err(_) => Err(GeneratorError::new(
                codes::TIMEOUT,
                format!("Generator did not respond within {} ms", self.timeout.as_millis()),
            )),
        };
        let elapsed = started.elapsed();

        let error = match outcome {
            Ok(proposals) => {
                let inserted = self
                    .store
                    .insert_generation(NewGeneration {
                        user_id: self.user_id,
                        model: model.clone(),
                        source_text_hash: self.source_text_hash.clone(),
                        source_text_length: self.source_text_length,
                        generation_duration: elapsed.as_millis() as i64,
                        proposals: proposals.clone(),
                    })
                    .await;

                match inserted {
                    Ok(generation) => {
                        metrics::record_generation(elapsed, &model, proposals.len(), None);
                        info!(
                            generation_id = generation.id,
                            generated_count = generation.generated_count,
                            duration_ms = generation.generation_duration,
                            "Generation recorded"
                        );

                        return Ok(GenerationResponseDto {
                            generation_id: generation.id,
                            flashcards_proposals: proposals
                                .into_iter()
                                .map(GenerationProposalDto::from)
                                .collect(),
                            generated_count: generation.generated_count,
                            source_text_length: generation.source_text_length,
                            generation_duration: generation.generation_duration,
                            created_at: generation.created_at,
                        });
                    }
                    // No row means no outcome yet; log it as a failure
                    Err(e) => {
                        error!(error = %e, "Failed to record generation");
                        GeneratorError::new(codes::INTERNAL, format!("Failed to record generation: {}", e))
                    }
                }
            }
            Err(error) => error,
        };

        metrics::record_generation(elapsed, &model, 0, Some(&error.code));

        let log = self
            .store
            .insert_error_log(NewErrorLog {
                user_id: self.user_id,
                model,
                source_text_hash: self.source_text_hash,
                source_text_length: self.source_text_length,
                error_code: error.code.clone(),
                error_message: error.message.clone(),
            })
            .await?;

        warn!(
            error_log_id = log.id,
            error_code = %error.code,
            error = %error.message,
            "Generation failed"
        );

        Err(AppError::Generation {
            error_log_id: log.id,
            error_code: error.code,
            message: error.message,
        })
    }

    /// Drop proposals that could not become flashcards as-is
    fn sanitize(&self, proposals: Vec<Proposal>) -> std::result::Result<Vec<Proposal>, GeneratorError> {
        let received = proposals.len();
        let kept: Vec<Proposal> = proposals
            .into_iter()
            .map(|p| Proposal::new(p.front.trim(), p.back.trim()))
            .filter(|p| self.policy.accepts_proposal(p))
            .collect();

        if kept.len() < received {
            warn!(received, kept = kept.len(), "Dropped invalid proposals");
        }
        if received > 0 && kept.is_empty() {
            return Err(GeneratorError::malformed(format!(
                "None of the {} proposals fit the flashcard limits",
                received
            )));
        }

        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::dto::GenerationErrorLogDto;
    use crate::services::testing::*;

    #[test]
    fn test_hash_is_stable_hex() {
        let a = hash_source_text("hello");
        assert_eq!(a, hash_source_text("hello"));
        assert_ne!(a, hash_source_text("hello!"));
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_short_text_rejected_without_side_effects() {
        let generator = Arc::new(ScriptedGenerator::with_count(3));
        let (services, store) = services_with(generator.clone());

        let err = services.generations.generate(user(), "short".into()).await.unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(generator.calls(), 0);
        assert_eq!(store.error_log_count().unwrap(), 0);
        assert_eq!(store.generation_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_success_records_generation() {
        let (services, store) = services_with(Arc::new(ScriptedGenerator::with_count(5)));
        let owner = user();

        let response = services.generations.generate(owner, source_text(1500)).await.unwrap();

        assert_eq!(response.generated_count, 5);
        assert_eq!(response.flashcards_proposals.len(), 5);
        assert_eq!(response.source_text_length, 1500);
        assert!(response
            .flashcards_proposals
            .iter()
            .all(|p| p.source == crate::db::models::FlashcardSource::AiFull));

        let generation = store.find_generation(owner, response.generation_id).await.unwrap().unwrap();
        assert_eq!(generation.accepted_unedited_count, 0);
        assert_eq!(generation.accepted_edited_count, 0);
        assert_eq!(generation.source_text_hash, hash_source_text(&source_text(1500)));
        assert_eq!(generation.model, "scripted");
        assert_eq!(store.error_log_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_zero_proposals_is_a_success() {
        let (services, store) = services_with(Arc::new(ScriptedGenerator::new(vec![])));

        let response = services.generations.generate(user(), source_text(1000)).await.unwrap();

        assert_eq!(response.generated_count, 0);
        assert_eq!(store.generation_count().unwrap(), 1);
        assert_eq!(store.error_log_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_writes_one_log() {
        let generator = Arc::new(FailingGenerator::new("PROVIDER_ERROR_503", "upstream down"));
        let (services, store) = services_with(generator);
        let owner = user();

        let err = services.generations.generate(owner, source_text(2000)).await.unwrap_err();

        let AppError::Generation { error_log_id, error_code, .. } = err else {
            panic!("expected generation error, got {:?}", err);
        };
        assert_eq!(error_code, "PROVIDER_ERROR_503");
        assert_eq!(store.generation_count().unwrap(), 0);

        let (logs, total) = store.list_error_logs(owner, 0, 10).await.unwrap();
        assert_eq!(total, 1);
        let log = GenerationErrorLogDto::from(logs[0].clone());
        assert_eq!(log.id, error_log_id);
        assert_eq!(log.source_text_length, 2000);
        assert_eq!(log.model, "failing");
    }

    #[tokio::test]
    async fn test_timeout_writes_log() {
        let (services, store) = services_with(Arc::new(SlowGenerator::new(Duration::from_secs(5))));
        let generations = services.generations.with_timeout(Duration::from_millis(50));

        let err = generations.generate(user(), source_text(1000)).await.unwrap_err();

        assert!(matches!(err, AppError::Generation { ref error_code, .. } if error_code == codes::TIMEOUT));
        assert_eq!(store.error_log_count().unwrap(), 1);
        assert_eq!(store.generation_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_proposals_filtered() {
        let generator = ScriptedGenerator::new(vec![
            Proposal::new("Q1", "A1"),
            Proposal::new("   ", "A2"),
            Proposal::new("Q3", "x".repeat(501)),
            Proposal::new("  Q4 ", " A4 "),
        ]);
        let (services, _store) = services_with(Arc::new(generator));

        let response = services.generations.generate(user(), source_text(1000)).await.unwrap();

        assert_eq!(response.generated_count, 2);
        assert_eq!(response.flashcards_proposals[1].front, "Q4");
        assert_eq!(response.flashcards_proposals[1].back, "A4");
    }

    #[tokio::test]
    async fn test_all_invalid_proposals_is_malformed() {
        let generator = ScriptedGenerator::new(vec![Proposal::new("", ""), Proposal::new("Q", "")]);
        let (services, store) = services_with(Arc::new(generator));

        let err = services.generations.generate(user(), source_text(1000)).await.unwrap_err();

        assert!(
            matches!(err, AppError::Generation { ref error_code, .. } if error_code == codes::MALFORMED_OUTPUT)
        );
        assert_eq!(store.error_log_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_panicking_generator_is_logged_as_internal() {
        let (services, store) = services_with(Arc::new(PanickingGenerator));

        let err = services.generations.generate(user(), source_text(1000)).await.unwrap_err();

        assert!(matches!(err, AppError::Generation { ref error_code, .. } if error_code == codes::INTERNAL));
        assert_eq!(store.error_log_count().unwrap(), 1);
        assert_eq!(store.generation_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_outcome_recorded_after_caller_drops() {
        let (services, store) = services_with(Arc::new(SlowGenerator::new(Duration::from_millis(100))));
        let owner = user();

        let pending = services.generations.generate(owner, source_text(1000));
        let dropped = tokio::time::timeout(Duration::from_millis(10), pending).await;
        assert!(dropped.is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(store.generation_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_generation_write_is_logged() {
        let store = Arc::new(FaultyStore::failing_generation_writes());
        let services = crate::services::AppServices::new(
            store.clone(),
            Arc::new(ScriptedGenerator::with_count(3)),
            &crate::config::AppConfig::default(),
        );
        let owner = user();

        let err = services.generations.generate(owner, source_text(1000)).await.unwrap_err();

        let AppError::Generation { error_log_id, error_code, .. } = err else {
            panic!("expected generation error, got {:?}", err);
        };
        assert_eq!(error_code, codes::INTERNAL);
        assert_eq!(store.inner().generation_count().unwrap(), 0);

        let (logs, total) = store.list_error_logs(owner, 0, 10).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(logs[0].id, error_log_id);
        assert!(logs[0].error_message.contains("write failed"));
    }

    #[tokio::test]
    async fn test_exactly_one_outcome_per_attempt() {
        let store = Arc::new(MemoryStore::new());
        let config = crate::config::AppConfig::default();
        let ok = crate::services::AppServices::new(
            store.clone(),
            Arc::new(ScriptedGenerator::with_count(2)),
            &config,
        );
        let failing = crate::services::AppServices::new(
            store.clone(),
            Arc::new(FailingGenerator::new(codes::PROVIDER_UNAVAILABLE, "refused")),
            &config,
        );
        let owner = user();

        for i in 0..6 {
            let services = if i % 2 == 0 { &ok } else { &failing };
            let _ = services.generations.generate(owner, source_text(1000)).await;
            assert_eq!(
                store.generation_count().unwrap() + store.error_log_count().unwrap(),
                i + 1
            );
        }
    }
}
