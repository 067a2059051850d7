// src/handlers/progress.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{error::AppError, state::AppState};

const MAX_CONTENT_ID_LEN: usize = 64;

pub async fn get_progress(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.progress.snapshot(&state.history).await))
}

/// Marks a theory lesson as finished. Marking it twice is harmless.
pub async fn complete_lesson(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    validate_content_id(&lesson_id)?;
    state.progress.mark_lesson_complete(&lesson_id).await;
    Ok(Json(state.progress.snapshot(&state.history).await))
}

pub async fn complete_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    validate_content_id(&video_id)?;
    state.progress.mark_video_complete(&video_id).await;
    Ok(Json(state.progress.snapshot(&state.history).await))
}

pub async fn reset_progress(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.progress.reset().await;
    Ok(StatusCode::NO_CONTENT)
}

fn validate_content_id(id: &str) -> Result<(), AppError> {
    if id.trim().is_empty() || id.len() > MAX_CONTENT_ID_LEN {
        return Err(AppError::BadRequest(format!(
            "Content id must be between 1 and {} characters",
            MAX_CONTENT_ID_LEN
        )));
    }
    Ok(())
}
