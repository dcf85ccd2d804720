//! Flashcard handlers

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::AppState;
use cardforge_common::{
    auth::AuthContext,
    db::{models::FlashcardSource, FlashcardFilter},
    dto::{
        CreateFlashcardsCommand, CreateFlashcardsResponseDto, FlashcardDto, FlashcardListDto,
        UpdateFlashcardCommand,
    },
    errors::Result,
    extract::{ApiJson, ApiPath, ApiQuery},
    pagination::PageQuery,
};

/// Query parameters for flashcard listing
#[derive(Debug, Default, Deserialize)]
pub struct ListFlashcardsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub source: Option<FlashcardSource>,
    pub generation_id: Option<i64>,
}

pub async fn list_flashcards(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<ListFlashcardsQuery>,
) -> Result<Json<FlashcardListDto>> {
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    };
    let filter = FlashcardFilter {
        source: query.source,
        generation_id: query.generation_id,
    };

    let list = state.services.flashcards.list(auth.user_id, page, filter).await?;
    Ok(Json(list))
}

/// Create manual flashcards in one batch
pub async fn create_flashcards(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(command): ApiJson<CreateFlashcardsCommand>,
) -> Result<(StatusCode, Json<CreateFlashcardsResponseDto>)> {
    let response = state.services.flashcards.create(auth.user_id, command).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_flashcard(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<FlashcardDto>> {
    let card = state.services.flashcards.get(auth.user_id, id).await?;
    Ok(Json(card))
}

pub async fn update_flashcard(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
    ApiJson(command): ApiJson<UpdateFlashcardCommand>,
) -> Result<Json<FlashcardDto>> {
    let card = state.services.flashcards.update(auth.user_id, id, command).await?;
    Ok(Json(card))
}

pub async fn delete_flashcard(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode> {
    state.services.flashcards.delete(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
