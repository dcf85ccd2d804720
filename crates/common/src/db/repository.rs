//! Repository pattern for database operations
//!
//! Postgres implementation of [`FlashcardStore`]. Proposal resolution runs in
//! one transaction that locks the generation row, relies on the
//! `proposal_resolutions` primary key to reject duplicates, and bumps the
//! counters with a conditional UPDATE.

use super::store::{
    FlashcardFilter, FlashcardStore, GenerationTotals, NewErrorLog, NewFlashcard, NewGeneration,
    Resolution,
};
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DbBackend, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    SqlErr, Statement, TransactionTrait,
};
use uuid::Uuid;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }
}

/// Map a unique-key violation on `proposal_resolutions` to a conflict
fn resolution_conflict(err: DbErr, generation_id: i64, proposal_index: u32) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::ProposalAlreadyResolved {
            generation_id,
            proposal_indices: vec![proposal_index],
        },
        _ => err.into(),
    }
}

#[async_trait]
impl FlashcardStore for Repository {
    // ========================================================================
    // Health Check
    // ========================================================================

    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Generation Operations
    // ========================================================================

    async fn insert_generation(&self, generation: NewGeneration) -> Result<Generation> {
        let now = chrono::Utc::now();

        let row = GenerationActiveModel {
            id: NotSet,
            user_id: Set(generation.user_id),
            model: Set(generation.model),
            generated_count: Set(generation.proposals.len() as i32),
            accepted_unedited_count: Set(0),
            accepted_edited_count: Set(0),
            source_text_hash: Set(generation.source_text_hash),
            source_text_length: Set(generation.source_text_length),
            generation_duration: Set(generation.generation_duration),
            proposals: Set(serde_json::to_value(&generation.proposals)?),
            created_at: Set(now),
            updated_at: Set(now),
        };

        row.insert(self.write_conn()).await.map_err(Into::into)
    }

    async fn find_generation(&self, user_id: Uuid, id: i64) -> Result<Option<Generation>> {
        GenerationEntity::find_by_id(id)
            .filter(GenerationColumn::UserId.eq(user_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn find_generation_on_primary(&self, user_id: Uuid, id: i64) -> Result<Option<Generation>> {
        GenerationEntity::find_by_id(id)
            .filter(GenerationColumn::UserId.eq(user_id))
            .one(self.write_conn())
            .await
            .map_err(Into::into)
    }

    async fn list_generations(
        &self,
        user_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Generation>, u64)> {
        let query = GenerationEntity::find().filter(GenerationColumn::UserId.eq(user_id));

        let total = query.clone().count(self.read_conn()).await?;
        let rows = query
            .order_by_desc(GenerationColumn::CreatedAt)
            .order_by_desc(GenerationColumn::Id)
            .offset(offset)
            .limit(limit)
            .all(self.read_conn())
            .await?;

        Ok((rows, total))
    }

    async fn generation_totals(&self, user_id: Uuid) -> Result<GenerationTotals> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT
                COUNT(*)::BIGINT,
                COALESCE(SUM(generated_count), 0)::BIGINT,
                COALESCE(SUM(accepted_unedited_count), 0)::BIGINT,
                COALESCE(SUM(accepted_edited_count), 0)::BIGINT
            FROM generations
            WHERE user_id = $1
            "#,
            vec![user_id.into()],
        );

        let Some(row) = self.read_conn().query_one(stmt).await? else {
            return Ok(GenerationTotals::default());
        };

        Ok(GenerationTotals {
            generations: row.try_get_by_index::<i64>(0)?.max(0) as u64,
            generated: row.try_get_by_index::<i64>(1)?,
            accepted_unedited: row.try_get_by_index::<i64>(2)?,
            accepted_edited: row.try_get_by_index::<i64>(3)?,
        })
    }

    async fn resolve_proposals(
        &self,
        user_id: Uuid,
        generation_id: i64,
        resolutions: Vec<Resolution>,
    ) -> Result<Vec<Flashcard>> {
        let txn = self.write_conn().begin().await?;

        // Serializes concurrent batches for the same generation
        GenerationEntity::find_by_id(generation_id)
            .filter(GenerationColumn::UserId.eq(user_id))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(AppError::GenerationNotFound { id: generation_id })?;

        let indices: Vec<i32> = resolutions.iter().map(|r| r.proposal_index as i32).collect();
        let mut already: Vec<u32> = ProposalResolutionEntity::find()
            .filter(ProposalResolutionColumn::GenerationId.eq(generation_id))
            .filter(ProposalResolutionColumn::ProposalIndex.is_in(indices.clone()))
            .all(&txn)
            .await?
            .into_iter()
            .map(|r| r.proposal_index as u32)
            .collect();
        if !already.is_empty() {
            already.sort_unstable();
            return Err(AppError::ProposalAlreadyResolved {
                generation_id,
                proposal_indices: already,
            });
        }

        let now = chrono::Utc::now();
        let mut unedited = 0i32;
        let mut edited = 0i32;
        let mut created = Vec::new();

        for resolution in resolutions {
            let flashcard = match (resolution.outcome.flashcard_source(), resolution.card) {
                (Some(source), Some(card)) => {
                    let row = FlashcardActiveModel {
                        id: NotSet,
                        user_id: Set(user_id),
                        front: Set(card.front),
                        back: Set(card.back),
                        source: Set(source),
                        generation_id: Set(Some(generation_id)),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(&txn)
                    .await?;
                    Some(row)
                }
                _ => None,
            };

            ProposalResolutionActiveModel {
                generation_id: Set(generation_id),
                proposal_index: Set(resolution.proposal_index as i32),
                outcome: Set(resolution.outcome),
                flashcard_id: Set(flashcard.as_ref().map(|f| f.id)),
                created_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(|e| resolution_conflict(e, generation_id, resolution.proposal_index))?;

            match resolution.outcome {
                DecisionOutcome::AcceptedUnedited => unedited += 1,
                DecisionOutcome::AcceptedEdited => edited += 1,
                DecisionOutcome::Rejected => {}
            }
            created.extend(flashcard);
        }

        if unedited + edited > 0 {
            let stmt = Statement::from_sql_and_values(
                DbBackend::Postgres,
                r#"
                UPDATE generations
                SET accepted_unedited_count = accepted_unedited_count + $1,
                    accepted_edited_count = accepted_edited_count + $2,
                    updated_at = $3
                WHERE id = $4
                  AND accepted_unedited_count + accepted_edited_count + $1 + $2 <= generated_count
                "#,
                vec![unedited.into(), edited.into(), now.into(), generation_id.into()],
            );

            let result = txn.execute(stmt).await?;
            if result.rows_affected() == 0 {
                return Err(AppError::Conflict {
                    message: format!(
                        "Generation {} cannot accept more proposals than it generated",
                        generation_id
                    ),
                });
            }
        }

        txn.commit().await?;
        Ok(created)
    }

    // ========================================================================
    // Error Log Operations
    // ========================================================================

    async fn insert_error_log(&self, log: NewErrorLog) -> Result<GenerationErrorLog> {
        let row = GenerationErrorLogActiveModel {
            id: NotSet,
            user_id: Set(log.user_id),
            model: Set(log.model),
            source_text_hash: Set(log.source_text_hash),
            source_text_length: Set(log.source_text_length),
            error_code: Set(log.error_code),
            error_message: Set(log.error_message),
            created_at: Set(chrono::Utc::now()),
        };

        row.insert(self.write_conn()).await.map_err(Into::into)
    }

    async fn list_error_logs(
        &self,
        user_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<GenerationErrorLog>, u64)> {
        let query = GenerationErrorLogEntity::find()
            .filter(GenerationErrorLogColumn::UserId.eq(user_id));

        let total = query.clone().count(self.read_conn()).await?;
        let rows = query
            .order_by_desc(GenerationErrorLogColumn::CreatedAt)
            .order_by_desc(GenerationErrorLogColumn::Id)
            .offset(offset)
            .limit(limit)
            .all(self.read_conn())
            .await?;

        Ok((rows, total))
    }

    // ========================================================================
    // Flashcard Operations
    // ========================================================================

    async fn insert_manual_flashcards(
        &self,
        user_id: Uuid,
        cards: Vec<NewFlashcard>,
    ) -> Result<Vec<Flashcard>> {
        let now = chrono::Utc::now();
        let txn = self.write_conn().begin().await?;

        let mut created = Vec::with_capacity(cards.len());
        for card in cards {
            let row = FlashcardActiveModel {
                id: NotSet,
                user_id: Set(user_id),
                front: Set(card.front),
                back: Set(card.back),
                source: Set(FlashcardSource::Manual),
                generation_id: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
            created.push(row);
        }

        txn.commit().await?;
        Ok(created)
    }

    async fn find_flashcard(&self, user_id: Uuid, id: i64) -> Result<Option<Flashcard>> {
        FlashcardEntity::find_by_id(id)
            .filter(FlashcardColumn::UserId.eq(user_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn list_flashcards(
        &self,
        user_id: Uuid,
        filter: &FlashcardFilter,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Flashcard>, u64)> {
        let mut query = FlashcardEntity::find().filter(FlashcardColumn::UserId.eq(user_id));
        if let Some(source) = filter.source {
            query = query.filter(FlashcardColumn::Source.eq(source));
        }
        if let Some(generation_id) = filter.generation_id {
            query = query.filter(FlashcardColumn::GenerationId.eq(generation_id));
        }

        let total = query.clone().count(self.read_conn()).await?;
        let rows = query
            .order_by_desc(FlashcardColumn::CreatedAt)
            .order_by_desc(FlashcardColumn::Id)
            .offset(offset)
            .limit(limit)
            .all(self.read_conn())
            .await?;

        Ok((rows, total))
    }

    async fn list_generation_flashcards(
        &self,
        user_id: Uuid,
        generation_id: i64,
    ) -> Result<Vec<Flashcard>> {
        FlashcardEntity::find()
            .filter(FlashcardColumn::UserId.eq(user_id))
            .filter(FlashcardColumn::GenerationId.eq(generation_id))
            .order_by_asc(FlashcardColumn::CreatedAt)
            .order_by_asc(FlashcardColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn update_flashcard(
        &self,
        user_id: Uuid,
        id: i64,
        content: NewFlashcard,
    ) -> Result<Option<Flashcard>> {
        let Some(existing) = FlashcardEntity::find_by_id(id)
            .filter(FlashcardColumn::UserId.eq(user_id))
            .one(self.write_conn())
            .await?
        else {
            return Ok(None);
        };

        let mut card: FlashcardActiveModel = existing.into();
        card.front = Set(content.front);
        card.back = Set(content.back);
        card.updated_at = Set(chrono::Utc::now());

        card.update(self.write_conn()).await.map(Some).map_err(Into::into)
    }

    async fn delete_flashcard(&self, user_id: Uuid, id: i64) -> Result<bool> {
        let result = FlashcardEntity::delete_many()
            .filter(FlashcardColumn::Id.eq(id))
            .filter(FlashcardColumn::UserId.eq(user_id))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }
}
