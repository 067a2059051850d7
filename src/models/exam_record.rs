// src/models/exam_record.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::question::{PublicQuestion, QuestionExplanation};

/// Outcome of one completed exam session.
/// Appended to the history once and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamResult {
    pub id: Uuid,
    pub session_id: Uuid,
    pub exam_type: String,
    pub correct_count: u32,
    pub total_count: u32,
    /// `round(100 * correct_count / total_count)`.
    pub percentage: u8,
    pub time_spent_seconds: u32,
    pub passed: bool,
    pub completed_at: DateTime<Utc>,
}

/// Aggregated numbers over the exam history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistorySummary {
    pub total_attempts: u32,
    pub passed_attempts: u32,
    pub average_percentage: u8,
    pub best_percentage: u8,
    pub average_seconds_per_question: u32,
}

/// Lifecycle of an exam session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamState {
    NotStarted,
    Active,
    Completed,
}

impl std::fmt::Display for ExamState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExamState::NotStarted => "not_started",
            ExamState::Active => "active",
            ExamState::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// DTO for opening a new session.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct OpenExamRequest {
    #[validate(length(min = 1, max = 50))]
    pub exam_type: Option<String>,
}

/// DTO for answering a question.
#[derive(Debug, Deserialize, Validate)]
pub struct SelectAnswerRequest {
    pub question_id: u32,
    #[validate(range(max = 3, message = "Option index must be between 0 and 3."))]
    pub option_index: u8,
}

/// What the client sees of a session.
/// Correct answers are only revealed through `review` once completed.
#[derive(Debug, Clone, Serialize)]
pub struct ExamView {
    pub id: Uuid,
    pub exam_type: String,
    pub state: ExamState,
    pub current_index: usize,
    pub total_questions: usize,
    pub current_question: Option<PublicQuestion>,
    pub answers: HashMap<u32, u8>,
    pub remaining_seconds: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub result: Option<ExamResult>,
    pub review: Option<Vec<QuestionExplanation>>,
}
