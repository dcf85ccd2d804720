//! Outward data transfer objects
//!
//! Every response type is built from a store record through an explicit
//! `From` projection. Owner ids, source-text hashes and stored proposals never
//! cross this boundary.

use crate::db::models::{
    DecisionOutcome, Flashcard, FlashcardSource, Generation, GenerationErrorLog,
};
use crate::errors::ErrorCode;
use crate::generator::Proposal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

// ============================================================================
// Flashcards
// ============================================================================

/// Single flashcard as exposed by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashcardDto {
    pub id: i64,
    pub front: String,
    pub back: String,
    pub source: FlashcardSource,
    pub generation_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Flashcard> for FlashcardDto {
    fn from(card: Flashcard) -> Self {
        Self {
            id: card.id,
            front: card.front,
            back: card.back,
            source: card.source,
            generation_id: card.generation_id,
            created_at: card.created_at,
            updated_at: card.updated_at,
        }
    }
}

/// Pagination metadata for list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationDto {
    pub page: u64,
    pub limit: u64,
    pub total_items: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Paginated list of flashcards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashcardListDto {
    pub data: Vec<FlashcardDto>,
    pub pagination: PaginationDto,
}

/// One flashcard inside a batch create request
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateFlashcardCommand {
    #[validate(length(min = 1))]
    pub front: String,

    #[validate(length(min = 1))]
    pub back: String,

    pub source: FlashcardSource,

    #[serde(default)]
    pub generation_id: Option<i64>,
}

/// Batch create request
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateFlashcardsCommand {
    #[validate(length(min = 1, max = 100), nested)]
    pub flashcards: Vec<CreateFlashcardCommand>,
}

/// Flashcards created by a batch or by accepted proposals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFlashcardsResponseDto {
    pub flashcards: Vec<FlashcardDto>,
}

/// Only front and back may change after creation
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct UpdateFlashcardCommand {
    #[validate(length(min = 1))]
    pub front: String,

    #[validate(length(min = 1))]
    pub back: String,
}

// ============================================================================
// Generations
// ============================================================================

/// Proposal returned to the caller; not persisted as a flashcard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationProposalDto {
    pub front: String,
    pub back: String,
    /// Always `ai-full`
    pub source: FlashcardSource,
}

impl From<Proposal> for GenerationProposalDto {
    fn from(proposal: Proposal) -> Self {
        Self {
            front: proposal.front,
            back: proposal.back,
            source: FlashcardSource::AiFull,
        }
    }
}

/// Request to generate proposals from source text
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerateFlashcardsCommand {
    pub source_text: String,
}

/// Result of a successful generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponseDto {
    pub generation_id: i64,
    pub flashcards_proposals: Vec<GenerationProposalDto>,
    pub generated_count: i32,
    pub source_text_length: i32,
    pub generation_duration: i64,
    pub created_at: DateTime<Utc>,
}

/// Generation without owner id, source hash or stored proposals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationDto {
    pub id: i64,
    pub model: String,
    pub generated_count: i32,
    pub generation_duration: i64,
    pub source_text_length: i32,
    pub accepted_unedited_count: i32,
    pub accepted_edited_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Generation> for GenerationDto {
    fn from(generation: Generation) -> Self {
        Self {
            id: generation.id,
            model: generation.model,
            generated_count: generation.generated_count,
            generation_duration: generation.generation_duration,
            source_text_length: generation.source_text_length,
            accepted_unedited_count: generation.accepted_unedited_count,
            accepted_edited_count: generation.accepted_edited_count,
            created_at: generation.created_at,
            updated_at: generation.updated_at,
        }
    }
}

/// Generation together with the flashcards derived from it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationDetailsDto {
    #[serde(flatten)]
    pub generation: GenerationDto,
    pub flashcards: Vec<FlashcardDto>,
}

/// History row with its acceptance rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationHistoryItemDto {
    #[serde(flatten)]
    pub generation: GenerationDto,
    pub acceptance_rate: f64,
}

impl From<Generation> for GenerationHistoryItemDto {
    fn from(generation: Generation) -> Self {
        let acceptance_rate = generation.acceptance_rate();
        Self {
            generation: generation.into(),
            acceptance_rate,
        }
    }
}

/// Totals across all of a user's generations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummaryDto {
    pub total_generations: u64,
    pub total_candidates_generated: i64,
    pub total_accepted_unedited: i64,
    pub total_accepted_edited: i64,
    pub overall_acceptance_rate: f64,
}

/// Paginated generation history with summary statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationHistoryDto {
    pub data: Vec<GenerationHistoryItemDto>,
    pub pagination: PaginationDto,
    pub summary: GenerationSummaryDto,
}

// ============================================================================
// Acceptance
// ============================================================================

/// The user's decision on one proposal
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AcceptanceDecision {
    /// Position of the proposal in the generation response
    pub proposal_index: u32,

    pub outcome: DecisionOutcome,

    /// Required for `accepted-edited`, ignored otherwise
    #[serde(default)]
    pub front: Option<String>,

    /// Required for `accepted-edited`, ignored otherwise
    #[serde(default)]
    pub back: Option<String>,
}

/// Batch of decisions for one generation
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct RecordAcceptanceCommand {
    #[validate(length(min = 1, max = 100))]
    pub decisions: Vec<AcceptanceDecision>,
}

// ============================================================================
// Error logs
// ============================================================================

/// Error log entry without owner id or source hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationErrorLogDto {
    pub id: i64,
    pub model: String,
    pub source_text_length: i32,
    pub error_code: String,
    pub error_message: String,
    pub created_at: DateTime<Utc>,
}

impl From<GenerationErrorLog> for GenerationErrorLogDto {
    fn from(log: GenerationErrorLog) -> Self {
        Self {
            id: log.id,
            model: log.model,
            source_text_length: log.source_text_length,
            error_code: log.error_code,
            error_message: log.error_message,
            created_at: log.created_at,
        }
    }
}

/// Paginated list of error log entries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationErrorLogListDto {
    pub data: Vec<GenerationErrorLogDto>,
    pub pagination: PaginationDto,
}

// ============================================================================
// Errors
// ============================================================================

/// Standard error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponseDto {
    pub error: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error body for a failed generation, pointing at its log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationErrorResponseDto {
    #[serde(flatten)]
    pub base: ErrorResponseDto,
    pub error_log_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn generation(generated: i32, unedited: i32, edited: i32) -> Generation {
        let now = Utc::now();
        Generation {
            id: 1,
            user_id: Uuid::new_v4(),
            model: "mock-generator".into(),
            generated_count: generated,
            accepted_unedited_count: unedited,
            accepted_edited_count: edited,
            source_text_hash: "abc".into(),
            source_text_length: 1200,
            generation_duration: 850,
            proposals: serde_json::json!([]),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_generation_projection_hides_internal_fields() {
        let json = serde_json::to_value(GenerationDto::from(generation(5, 1, 1))).unwrap();
        assert!(json.get("user_id").is_none());
        assert!(json.get("source_text_hash").is_none());
        assert!(json.get("proposals").is_none());
        assert_eq!(json["generated_count"], 5);
    }

    #[test]
    fn test_history_item_is_flat() {
        let item = GenerationHistoryItemDto::from(generation(5, 2, 1));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["acceptance_rate"], 0.6);
        assert_eq!(json["accepted_unedited_count"], 2);
    }

    #[test]
    fn test_zero_generated_rate() {
        let item = GenerationHistoryItemDto::from(generation(0, 0, 0));
        assert_eq!(item.acceptance_rate, 0.0);
        assert!(!item.acceptance_rate.is_nan());
    }

    #[test]
    fn test_flashcard_source_wire_format() {
        let json = serde_json::to_value(FlashcardSource::AiEdited).unwrap();
        assert_eq!(json, "ai-edited");

        let cmd: CreateFlashcardCommand =
            serde_json::from_str(r#"{"front":"Q","back":"A","source":"manual"}"#).unwrap();
        assert_eq!(cmd.source, FlashcardSource::Manual);
        assert_eq!(cmd.generation_id, None);
    }

    #[test]
    fn test_batch_size_validation() {
        let empty = CreateFlashcardsCommand { flashcards: vec![] };
        assert!(empty.validate().is_err());

        let blank_front = CreateFlashcardsCommand {
            flashcards: vec![CreateFlashcardCommand {
                front: String::new(),
                back: "A".into(),
                source: FlashcardSource::Manual,
                generation_id: None,
            }],
        };
        assert!(blank_front.validate().is_err());
    }

    #[test]
    fn test_decision_wire_format() {
        let cmd: RecordAcceptanceCommand = serde_json::from_str(
            r#"{"decisions":[{"proposal_index":0,"outcome":"accepted-unedited"},
                             {"proposal_index":1,"outcome":"accepted-edited","front":"Q","back":"A"},
                             {"proposal_index":2,"outcome":"rejected"}]}"#,
        )
        .unwrap();
        assert_eq!(cmd.decisions.len(), 3);
        assert_eq!(cmd.decisions[1].outcome, DecisionOutcome::AcceptedEdited);
        assert_eq!(cmd.decisions[1].front.as_deref(), Some("Q"));
    }

    #[test]
    fn test_generation_error_body_is_flat() {
        let body = GenerationErrorResponseDto {
            base: ErrorResponseDto {
                error: ErrorCode::GenerationError,
                message: "boom".into(),
                details: None,
            },
            error_log_id: 9,
        };
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(json["error"], "GENERATION_ERROR");
        assert_eq!(json["error_log_id"], 9);
        assert!(json.get("details").is_none());
    }
}
