//! Acceptance tracker
//!
//! Turns the user's decisions on a generation's proposals into flashcards
//! and counter updates. A batch is applied all or nothing, and every
//! proposal index can be decided at most once.

use super::ContentPolicy;
use crate::db::models::DecisionOutcome;
use crate::db::{FlashcardStore, NewFlashcard, Resolution};
use crate::dto::{CreateFlashcardsResponseDto, FlashcardDto, RecordAcceptanceCommand};
use crate::errors::{AppError, Result};
use crate::metrics;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct AcceptanceService {
    store: Arc<dyn FlashcardStore>,
    policy: ContentPolicy,
}

impl AcceptanceService {
    pub fn new(store: Arc<dyn FlashcardStore>, policy: ContentPolicy) -> Self {
        Self { store, policy }
    }

    /// Apply a batch of decisions to one of the caller's generations.
    ///
    /// Returns the flashcards created by accepting decisions, in request
    /// order.
    #[instrument(skip(self, command), fields(decisions = command.decisions.len()))]
    pub async fn record(
        &self,
        user_id: Uuid,
        generation_id: i64,
        command: RecordAcceptanceCommand,
    ) -> Result<CreateFlashcardsResponseDto> {
        command.validate()?;

        // Decisions usually follow the generation within seconds
        let generation = self
            .store
            .find_generation_on_primary(user_id, generation_id)
            .await?
            .ok_or(AppError::GenerationNotFound { id: generation_id })?;
        let proposals = generation.proposal_list()?;

        let mut seen = HashSet::new();
        let mut repeated = Vec::new();
        let mut resolutions = Vec::with_capacity(command.decisions.len());

        for decision in command.decisions {
            let index = decision.proposal_index;
            if index as i64 >= generation.generated_count as i64 {
                return Err(AppError::validation(
                    "proposal_index",
                    format!(
                        "proposal_index {} is out of range for {} proposals",
                        index, generation.generated_count
                    ),
                ));
            }
            if !seen.insert(index) {
                repeated.push(index);
                continue;
            }

            let card = match decision.outcome {
                DecisionOutcome::AcceptedUnedited => {
                    let proposal = proposals.get(index as usize).ok_or_else(|| AppError::Internal {
                        message: format!(
                            "Generation {} has no stored proposal {}",
                            generation_id, index
                        ),
                    })?;
                    Some(NewFlashcard {
                        front: proposal.front.clone(),
                        back: proposal.back.clone(),
                    })
                }
                DecisionOutcome::AcceptedEdited => {
                    let (Some(front), Some(back)) = (decision.front, decision.back) else {
                        return Err(AppError::validation(
                            "decisions",
                            format!("accepted-edited decision for proposal {} needs front and back", index),
                        ));
                    };
                    Some(self.policy.check_card(&front, &back)?)
                }
                DecisionOutcome::Rejected => None,
            };

            resolutions.push(Resolution {
                proposal_index: index,
                outcome: decision.outcome,
                card,
            });
        }

        if !repeated.is_empty() {
            repeated.sort_unstable();
            repeated.dedup();
            return Err(AppError::ProposalAlreadyResolved {
                generation_id,
                proposal_indices: repeated,
            });
        }

        let count = |outcome: DecisionOutcome| resolutions.iter().filter(|r| r.outcome == outcome).count();
        let unedited = count(DecisionOutcome::AcceptedUnedited);
        let edited = count(DecisionOutcome::AcceptedEdited);
        let rejected = count(DecisionOutcome::Rejected);

        let created = self
            .store
            .resolve_proposals(user_id, generation_id, resolutions)
            .await?;

        metrics::record_decisions(unedited, edited, rejected);
        metrics::record_flashcards_created("ai-full", unedited);
        metrics::record_flashcards_created("ai-edited", edited);

        info!(
            generation_id,
            unedited, edited, rejected, "Proposal decisions recorded"
        );

        Ok(CreateFlashcardsResponseDto {
            flashcards: created.into_iter().map(FlashcardDto::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::FlashcardSource;
    use crate::dto::AcceptanceDecision;
    use crate::services::testing::*;
    use crate::services::AppServices;

    fn decision(index: u32, outcome: DecisionOutcome) -> AcceptanceDecision {
        AcceptanceDecision {
            proposal_index: index,
            outcome,
            front: None,
            back: None,
        }
    }

    fn edited(index: u32, front: &str, back: &str) -> AcceptanceDecision {
        AcceptanceDecision {
            proposal_index: index,
            outcome: DecisionOutcome::AcceptedEdited,
            front: Some(front.into()),
            back: Some(back.into()),
        }
    }

    fn batch(decisions: Vec<AcceptanceDecision>) -> RecordAcceptanceCommand {
        RecordAcceptanceCommand { decisions }
    }

    async fn generated(n: usize) -> (AppServices, std::sync::Arc<crate::db::MemoryStore>, Uuid, i64) {
        let (services, store) = services_with(Arc::new(ScriptedGenerator::with_count(n)));
        let owner = user();
        let response = services.generations.generate(owner, source_text(1200)).await.unwrap();
        (services, store, owner, response.generation_id)
    }

    #[tokio::test]
    async fn test_mixed_batch_updates_counters() {
        let (services, store, owner, id) = generated(5).await;

        let response = services
            .acceptance
            .record(
                owner,
                id,
                batch(vec![
                    decision(0, DecisionOutcome::AcceptedUnedited),
                    decision(1, DecisionOutcome::AcceptedUnedited),
                    edited(2, " Edited question ", "Edited answer"),
                    decision(3, DecisionOutcome::Rejected),
                ]),
            )
            .await
            .unwrap();

        let sources: Vec<_> = response.flashcards.iter().map(|f| f.source).collect();
        assert_eq!(
            sources,
            vec![FlashcardSource::AiFull, FlashcardSource::AiFull, FlashcardSource::AiEdited]
        );
        assert_eq!(response.flashcards[0].front, "Question 0");
        assert_eq!(response.flashcards[2].front, "Edited question");
        assert!(response.flashcards.iter().all(|f| f.generation_id == Some(id)));

        let generation = store.find_generation(owner, id).await.unwrap().unwrap();
        assert_eq!(generation.accepted_unedited_count, 2);
        assert_eq!(generation.accepted_edited_count, 1);
        assert_eq!(generation.acceptance_rate(), 0.6);
    }

    #[tokio::test]
    async fn test_decisions_do_not_depend_on_replica_reads() {
        let store = Arc::new(FaultyStore::stale_reads());
        let services = AppServices::new(
            store.clone(),
            Arc::new(ScriptedGenerator::with_count(2)),
            &crate::config::AppConfig::default(),
        );
        let owner = user();
        let id = services.generations.generate(owner, source_text(1200)).await.unwrap().generation_id;
        assert!(store.find_generation(owner, id).await.unwrap().is_none());

        let response = services
            .acceptance
            .record(owner, id, batch(vec![decision(0, DecisionOutcome::AcceptedUnedited)]))
            .await
            .unwrap();

        assert_eq!(response.flashcards.len(), 1);
        assert_eq!(response.flashcards[0].front, "Question 0");
    }

    #[tokio::test]
    async fn test_second_decision_on_same_index_conflicts() {
        let (services, store, owner, id) = generated(3).await;

        services
            .acceptance
            .record(owner, id, batch(vec![decision(0, DecisionOutcome::AcceptedUnedited)]))
            .await
            .unwrap();
        let err = services
            .acceptance
            .record(owner, id, batch(vec![decision(0, DecisionOutcome::AcceptedUnedited)]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ProposalAlreadyResolved { ref proposal_indices, .. } if proposal_indices == &vec![0]));
        assert_eq!(store.flashcard_count().unwrap(), 1);

        let generation = store.find_generation(owner, id).await.unwrap().unwrap();
        assert_eq!(generation.accepted_unedited_count, 1);
    }

    #[tokio::test]
    async fn test_rejected_index_cannot_be_accepted_later() {
        let (services, store, owner, id) = generated(2).await;

        services
            .acceptance
            .record(owner, id, batch(vec![decision(1, DecisionOutcome::Rejected)]))
            .await
            .unwrap();
        let err = services
            .acceptance
            .record(owner, id, batch(vec![decision(1, DecisionOutcome::AcceptedUnedited)]))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
        assert_eq!(store.flashcard_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_inside_batch_applies_nothing() {
        let (services, store, owner, id) = generated(3).await;

        let err = services
            .acceptance
            .record(
                owner,
                id,
                batch(vec![
                    decision(0, DecisionOutcome::AcceptedUnedited),
                    decision(1, DecisionOutcome::AcceptedUnedited),
                    decision(0, DecisionOutcome::Rejected),
                ]),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ProposalAlreadyResolved { .. }));
        assert_eq!(store.flashcard_count().unwrap(), 0);
        let generation = store.find_generation(owner, id).await.unwrap().unwrap();
        assert_eq!(generation.accepted_total(), 0);
    }

    #[tokio::test]
    async fn test_index_out_of_range() {
        let (services, _store, owner, id) = generated(2).await;

        let err = services
            .acceptance
            .record(owner, id, batch(vec![decision(2, DecisionOutcome::AcceptedUnedited)]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_edited_requires_both_sides() {
        let (services, _store, owner, id) = generated(2).await;

        let mut missing_back = edited(0, "Q", "A");
        missing_back.back = None;
        let err = services
            .acceptance
            .record(owner, id, batch(vec![missing_back]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let err = services
            .acceptance
            .record(owner, id, batch(vec![edited(0, "Q", &"a".repeat(501))]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_unknown_or_foreign_generation() {
        let (services, _store, _owner, id) = generated(2).await;

        let err = services
            .acceptance
            .record(user(), id, batch(vec![decision(0, DecisionOutcome::Rejected)]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::GenerationNotFound { .. }));

        let err = services
            .acceptance
            .record(user(), 999, batch(vec![decision(0, DecisionOutcome::Rejected)]))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let (services, _store, owner, id) = generated(2).await;

        let err = services.acceptance.record(owner, id, batch(vec![])).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_counters_never_exceed_generated() {
        let (services, store, owner, id) = generated(4).await;

        for index in 0..4 {
            let _ = services
                .acceptance
                .record(owner, id, batch(vec![decision(index, DecisionOutcome::AcceptedUnedited)]))
                .await;
            let _ = services
                .acceptance
                .record(owner, id, batch(vec![edited(index, "Q", "A")]))
                .await;
        }

        let generation = store.find_generation(owner, id).await.unwrap().unwrap();
        assert_eq!(generation.accepted_total(), 4);
        assert!(generation.accepted_total() <= generation.generated_count as i64);
    }

    #[tokio::test]
    async fn test_concurrent_batches_accept_once() {
        let (services, store, owner, id) = generated(1).await;

        let a = services.acceptance.clone();
        let b = services.acceptance.clone();
        let (first, second) = tokio::join!(
            a.record(owner, id, batch(vec![decision(0, DecisionOutcome::AcceptedUnedited)])),
            b.record(owner, id, batch(vec![edited(0, "Q", "A")])),
        );

        assert!(first.is_ok() != second.is_ok());
        assert_eq!(store.flashcard_count().unwrap(), 1);
    }
}
