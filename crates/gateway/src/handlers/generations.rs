//! Generation handlers: create, history, details, decisions

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::AppState;
use cardforge_common::{
    auth::AuthContext,
    dto::{
        CreateFlashcardsResponseDto, GenerateFlashcardsCommand, GenerationDetailsDto,
        GenerationHistoryDto, GenerationResponseDto, RecordAcceptanceCommand,
    },
    errors::Result,
    extract::{ApiJson, ApiPath, ApiQuery},
    pagination::PageQuery,
};

/// Generate flashcard proposals from source text
pub async fn create_generation(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(command): ApiJson<GenerateFlashcardsCommand>,
) -> Result<(StatusCode, Json<GenerationResponseDto>)> {
    tracing::info!(
        user_id = %auth.user_id,
        request_id = %auth.request_id,
        "Generation requested"
    );

    let response = state
        .services
        .generations
        .generate(auth.user_id, command.source_text)
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Paginated generation history with summary statistics
pub async fn list_generations(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<GenerationHistoryDto>> {
    let history = state.services.history.list_history(auth.user_id, query).await?;
    Ok(Json(history))
}

/// A single generation with its accepted flashcards
pub async fn get_generation(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<GenerationDetailsDto>> {
    let details = state.services.history.get_generation(auth.user_id, id).await?;
    Ok(Json(details))
}

/// Record accept/edit/reject decisions for a generation's proposals
pub async fn record_decisions(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
    ApiJson(command): ApiJson<RecordAcceptanceCommand>,
) -> Result<(StatusCode, Json<CreateFlashcardsResponseDto>)> {
    let response = state.services.acceptance.record(auth.user_id, id, command).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
