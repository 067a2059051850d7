// src/handlers/exam.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::DEFAULT_EXAM_TYPE,
    error::AppError,
    models::exam_record::{OpenExamRequest, SelectAnswerRequest},
    services::{exam::ExamDesk, history::ExamHistory},
};

/// Opens a new practice exam, discarding any previous one.
///
/// Only reachable through the exam access gate.
pub async fn open_exam(
    State(desk): State<Arc<ExamDesk>>,
    payload: Option<Json<OpenExamRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let exam_type = payload.exam_type.as_deref().unwrap_or(DEFAULT_EXAM_TYPE);
    let view = desk.open(exam_type).await;

    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_exam(
    State(desk): State<Arc<ExamDesk>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(desk.view(id).await?))
}

pub async fn start_exam(
    State(desk): State<Arc<ExamDesk>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(desk.start(id).await?))
}

pub async fn select_answer(
    State(desk): State<Arc<ExamDesk>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SelectAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let view = desk
        .select_answer(id, payload.question_id, payload.option_index)
        .await?;
    Ok(Json(view))
}

pub async fn advance(
    State(desk): State<Arc<ExamDesk>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(desk.advance(id).await?))
}

pub async fn retreat(
    State(desk): State<Arc<ExamDesk>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(desk.retreat(id).await?))
}

/// Submits the exam. Submitting an already completed exam returns it unchanged.
pub async fn submit_exam(
    State(desk): State<Arc<ExamDesk>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(desk.submit(id).await?))
}

/// Replaces a completed exam with a fresh, reshuffled one.
pub async fn retry_exam(
    State(desk): State<Arc<ExamDesk>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok((StatusCode::CREATED, Json(desk.retry(id).await?)))
}

/// Abandons the session without recording a result.
pub async fn close_exam(
    State(desk): State<Arc<ExamDesk>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    desk.close(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn explain_question(
    State(desk): State<Arc<ExamDesk>>,
    Path((id, question_id)): Path<(Uuid, u32)>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(desk.explanation(id, question_id).await?))
}

pub async fn list_history(
    State(history): State<Arc<ExamHistory>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(history.list().await))
}

pub async fn history_summary(
    State(history): State<Arc<ExamHistory>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(history.summary().await))
}
