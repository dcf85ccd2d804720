//! Flashcard CRUD

use super::ContentPolicy;
use crate::config::PaginationConfig;
use crate::db::models::FlashcardSource;
use crate::db::{FlashcardFilter, FlashcardStore};
use crate::dto::{
    CreateFlashcardsCommand, CreateFlashcardsResponseDto, FlashcardDto, FlashcardListDto,
    UpdateFlashcardCommand,
};
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::pagination::{PageQuery, PageRequest};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct FlashcardService {
    store: Arc<dyn FlashcardStore>,
    policy: ContentPolicy,
    pagination: PaginationConfig,
}

impl FlashcardService {
    pub fn new(store: Arc<dyn FlashcardStore>, policy: ContentPolicy, pagination: PaginationConfig) -> Self {
        Self {
            store,
            policy,
            pagination,
        }
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        query: PageQuery,
        filter: FlashcardFilter,
    ) -> Result<FlashcardListDto> {
        let request = PageRequest::from_query(query, &self.pagination)?;

        let (rows, total) = self
            .store
            .list_flashcards(user_id, &filter, request.offset(), request.limit())
            .await?;

        Ok(FlashcardListDto {
            data: rows.into_iter().map(FlashcardDto::from).collect(),
            pagination: request.metadata(total),
        })
    }

    pub async fn get(&self, user_id: Uuid, id: i64) -> Result<FlashcardDto> {
        self.store
            .find_flashcard(user_id, id)
            .await?
            .map(FlashcardDto::from)
            .ok_or(AppError::FlashcardNotFound { id })
    }

    /// Create hand-written flashcards. AI provenance only comes from
    /// accepting proposals, so every entry must be `manual` without a
    /// generation.
    pub async fn create(
        &self,
        user_id: Uuid,
        command: CreateFlashcardsCommand,
    ) -> Result<CreateFlashcardsResponseDto> {
        command.validate()?;

        let mut cards = Vec::with_capacity(command.flashcards.len());
        for (i, entry) in command.flashcards.iter().enumerate() {
            if entry.source != FlashcardSource::Manual {
                return Err(AppError::validation(
                    format!("flashcards[{}].source", i),
                    "flashcards with AI provenance are created by accepting proposals",
                ));
            }
            if entry.generation_id.is_some() {
                return Err(AppError::validation(
                    format!("flashcards[{}].generation_id", i),
                    "manual flashcards cannot reference a generation",
                ));
            }
            cards.push(self.policy.check_card(&entry.front, &entry.back)?);
        }

        let created = self.store.insert_manual_flashcards(user_id, cards).await?;
        metrics::record_flashcards_created(FlashcardSource::Manual.as_str(), created.len());
        info!(count = created.len(), "Manual flashcards created");

        Ok(CreateFlashcardsResponseDto {
            flashcards: created.into_iter().map(FlashcardDto::from).collect(),
        })
    }

    /// Replace front and back. Source and generation link never change.
    pub async fn update(
        &self,
        user_id: Uuid,
        id: i64,
        command: UpdateFlashcardCommand,
    ) -> Result<FlashcardDto> {
        command.validate()?;

        let existing = self
            .store
            .find_flashcard(user_id, id)
            .await?
            .ok_or(AppError::FlashcardNotFound { id })?;
        if existing.source.is_generated() && !self.policy.allow_editing_generated() {
            return Err(AppError::Conflict {
                message: format!("Flashcard {} came from a generation and cannot be edited", id),
            });
        }

        let content = self.policy.check_card(&command.front, &command.back)?;
        self.store
            .update_flashcard(user_id, id, content)
            .await?
            .map(FlashcardDto::from)
            .ok_or(AppError::FlashcardNotFound { id })
    }

    /// Remove a flashcard. Generation counters keep counting it.
    pub async fn delete(&self, user_id: Uuid, id: i64) -> Result<()> {
        if self.store.delete_flashcard(user_id, id).await? {
            info!(flashcard_id = id, "Flashcard deleted");
            Ok(())
        } else {
            Err(AppError::FlashcardNotFound { id })
        }
    }
}
