//! Generation error log handlers

use axum::{
    extract::State,
    Json,
};

use crate::AppState;
use cardforge_common::{
    auth::AuthContext, dto::GenerationErrorLogListDto, errors::Result, extract::ApiQuery,
    pagination::PageQuery,
};

/// The caller's failed generation attempts, newest first
pub async fn list_error_logs(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<GenerationErrorLogListDto>> {
    let logs = state.services.history.list_error_logs(auth.user_id, query).await?;
    Ok(Json(logs))
}
