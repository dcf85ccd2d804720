//! Generation history and statistics

use crate::config::PaginationConfig;
use crate::db::FlashcardStore;
use crate::dto::{
    FlashcardDto, GenerationDetailsDto, GenerationErrorLogDto, GenerationErrorLogListDto,
    GenerationHistoryDto, GenerationHistoryItemDto, GenerationSummaryDto,
};
use crate::errors::{AppError, Result};
use crate::pagination::{PageQuery, PageRequest};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct HistoryService {
    store: Arc<dyn FlashcardStore>,
    pagination: PaginationConfig,
}

impl HistoryService {
    pub fn new(store: Arc<dyn FlashcardStore>, pagination: PaginationConfig) -> Self {
        Self { store, pagination }
    }

    /// One page of the caller's generations, newest first, plus totals over
    /// all of them
    pub async fn list_history(&self, user_id: Uuid, query: PageQuery) -> Result<GenerationHistoryDto> {
        let request = PageRequest::from_query(query, &self.pagination)?;

        let (rows, total) = self
            .store
            .list_generations(user_id, request.offset(), request.limit())
            .await?;
        let totals = self.store.generation_totals(user_id).await?;

        let accepted = totals.accepted_unedited + totals.accepted_edited;
        let overall_acceptance_rate = if totals.generated > 0 {
            accepted as f64 / totals.generated as f64
        } else {
            0.0
        };

        Ok(GenerationHistoryDto {
            data: rows.into_iter().map(GenerationHistoryItemDto::from).collect(),
            pagination: request.metadata(total),
            summary: GenerationSummaryDto {
                total_generations: totals.generations,
                total_candidates_generated: totals.generated,
                total_accepted_unedited: totals.accepted_unedited,
                total_accepted_edited: totals.accepted_edited,
                overall_acceptance_rate,
            },
        })
    }

    /// A single generation with the flashcards accepted from it
    pub async fn get_generation(&self, user_id: Uuid, id: i64) -> Result<GenerationDetailsDto> {
        let generation = self
            .store
            .find_generation(user_id, id)
            .await?
            .ok_or(AppError::GenerationNotFound { id })?;
        let flashcards = self.store.list_generation_flashcards(user_id, id).await?;

        Ok(GenerationDetailsDto {
            generation: generation.into(),
            flashcards: flashcards.into_iter().map(FlashcardDto::from).collect(),
        })
    }

    /// The caller's failed generation attempts, newest first
    pub async fn list_error_logs(&self, user_id: Uuid, query: PageQuery) -> Result<GenerationErrorLogListDto> {
        let request = PageRequest::from_query(query, &self.pagination)?;

        let (rows, total) = self
            .store
            .list_error_logs(user_id, request.offset(), request.limit())
            .await?;

        Ok(GenerationErrorLogListDto {
            data: rows.into_iter().map(GenerationErrorLogDto::from).collect(),
            pagination: request.metadata(total),
        })
    }
}
