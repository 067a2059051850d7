// src/services/exam/session.rs

//! The practice exam state machine.
//!
//! `NotStarted -> Active -> Completed`. There is no way back: a retry is a
//! brand-new session. Operations called in the wrong state are rejected with
//! `ExamError::InvalidTransition`, except `submit` on a completed session,
//! which is a no-op so the result is recorded exactly once.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use rand::{Rng, seq::SliceRandom};
use thiserror::Error;
use uuid::Uuid;

use super::bank::QuestionBank;
use crate::{
    config::{ExamSettings, OPTIONS_PER_QUESTION},
    models::{
        exam_record::{ExamResult, ExamState, ExamView},
        question::{ExamQuestion, PublicQuestion, QuestionExplanation},
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExamError {
    #[error("cannot {operation} while the exam is {state}")]
    InvalidTransition {
        operation: &'static str,
        state: ExamState,
    },

    #[error("question {0} is not part of this exam")]
    UnknownQuestion(u32),

    #[error("option index {0} is out of range")]
    InvalidOption(u8),

    #[error("question {0} has not been answered yet")]
    NotAnswered(u32),

    #[error("exam session {0} not found")]
    SessionNotFound(Uuid),
}

/// Correct answers out of the whole paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub correct: u32,
    pub total: u32,
    pub percentage: u8,
}

/// Scores `answers` against `questions`. Unanswered questions count as wrong.
pub fn score(questions: &[ExamQuestion], answers: &HashMap<u32, u8>) -> Score {
    let total = u32::try_from(questions.len()).unwrap_or(u32::MAX);
    let correct = questions
        .iter()
        .filter(|q| answers.get(&q.id).is_some_and(|&a| q.is_correct(a)))
        .count() as u32;

    Score {
        correct,
        total,
        percentage: rounded_percentage(correct, total),
    }
}

/// `round(100 * part / whole)`, halves rounding up.
fn rounded_percentage(part: u32, whole: u32) -> u8 {
    if whole == 0 {
        return 0;
    }
    let (part, whole) = (u64::from(part), u64::from(whole));
    let pct = (200 * part + whole) / (2 * whole);
    u8::try_from(pct.min(100)).unwrap_or(100)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Running { remaining_seconds: u32 },
    /// The clock ran out and the session submitted itself.
    TimedOut(ExamResult),
}

#[derive(Debug, Clone)]
pub struct ExamSession {
    id: Uuid,
    exam_type: String,
    settings: ExamSettings,
    bank: Arc<QuestionBank>,
    state: ExamState,
    questions: Vec<ExamQuestion>,
    current_index: usize,
    answers: HashMap<u32, u8>,
    remaining_seconds: u32,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    result: Option<ExamResult>,
}

impl ExamSession {
    pub fn new(
        bank: Arc<QuestionBank>,
        settings: ExamSettings,
        exam_type: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            exam_type: exam_type.into(),
            settings,
            bank,
            state: ExamState::NotStarted,
            questions: Vec::new(),
            current_index: 0,
            answers: HashMap::new(),
            remaining_seconds: settings.time_limit_secs,
            started_at: None,
            finished_at: None,
            result: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> ExamState {
        self.state
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Questions in the order drawn at `start`. Empty before that.
    pub fn questions(&self) -> &[ExamQuestion] {
        &self.questions
    }

    pub fn current_question(&self) -> Option<&ExamQuestion> {
        self.questions.get(self.current_index)
    }

    pub fn answers(&self) -> &HashMap<u32, u8> {
        &self.answers
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), ExamError> {
        self.start_with_rng(&mut rand::rng(), now)
    }

    /// Draws a uniform permutation of the whole bank and starts the countdown.
    pub fn start_with_rng<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<(), ExamError> {
        self.require(ExamState::NotStarted, "start")?;

        let mut questions = self.bank.questions().to_vec();
        questions.shuffle(rng);

        self.questions = questions;
        self.current_index = 0;
        self.answers.clear();
        self.remaining_seconds = self.settings.time_limit_secs;
        self.started_at = Some(now);
        self.state = ExamState::Active;
        Ok(())
    }

    /// Records an answer. A later answer to the same question replaces the earlier one.
    pub fn select_answer(&mut self, question_id: u32, option_index: u8) -> Result<(), ExamError> {
        self.require(ExamState::Active, "answer a question")?;

        if usize::from(option_index) >= OPTIONS_PER_QUESTION {
            return Err(ExamError::InvalidOption(option_index));
        }
        if !self.questions.iter().any(|q| q.id == question_id) {
            return Err(ExamError::UnknownQuestion(question_id));
        }

        self.answers.insert(question_id, option_index);
        Ok(())
    }

    /// Moves to the next question. Stays put on the last one.
    pub fn advance(&mut self) -> Result<usize, ExamError> {
        self.require(ExamState::Active, "move to the next question")?;
        if self.current_index + 1 < self.questions.len() {
            self.current_index += 1;
        }
        Ok(self.current_index)
    }

    /// Moves to the previous question. Stays put on the first one.
    pub fn retreat(&mut self) -> Result<usize, ExamError> {
        self.require(ExamState::Active, "move to the previous question")?;
        self.current_index = self.current_index.saturating_sub(1);
        Ok(self.current_index)
    }

    /// One second of the countdown. Reaching zero submits the session.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<TickOutcome, ExamError> {
        self.require(ExamState::Active, "count down")?;

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds > 0 {
            return Ok(TickOutcome::Running {
                remaining_seconds: self.remaining_seconds,
            });
        }

        match self.submit(now)? {
            Some(result) => Ok(TickOutcome::TimedOut(result)),
            None => Err(self.invalid("count down")),
        }
    }

    /// Scores and freezes the session.
    ///
    /// Returns the result on the first call and `None` on any later call.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<Option<ExamResult>, ExamError> {
        match self.state {
            ExamState::NotStarted => Err(self.invalid("submit")),
            ExamState::Completed => Ok(None),
            ExamState::Active => {
                let score = score(&self.questions, &self.answers);
                let result = ExamResult {
                    id: Uuid::new_v4(),
                    session_id: self.id,
                    exam_type: self.exam_type.clone(),
                    correct_count: score.correct,
                    total_count: score.total,
                    percentage: score.percentage,
                    time_spent_seconds: self
                        .settings
                        .time_limit_secs
                        .saturating_sub(self.remaining_seconds),
                    passed: score.percentage >= self.settings.passing_percentage,
                    completed_at: now,
                };

                self.finished_at = Some(now);
                self.state = ExamState::Completed;
                self.result = Some(result.clone());
                Ok(Some(result))
            }
        }
    }

    /// A fresh, unstarted session over the same bank. The current one is left as is.
    pub fn retry(&self) -> Result<ExamSession, ExamError> {
        if self.state == ExamState::Active {
            return Err(self.invalid("retry"));
        }
        Ok(ExamSession::new(
            self.bank.clone(),
            self.settings,
            self.exam_type.clone(),
        ))
    }

    /// Feedback for one question. While active, only answered questions are explained.
    pub fn explanation(&self, question_id: u32) -> Result<QuestionExplanation, ExamError> {
        if self.state == ExamState::NotStarted {
            return Err(self.invalid("explain a question"));
        }

        let question = self
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or(ExamError::UnknownQuestion(question_id))?;
        let selected = self.answers.get(&question_id).copied();

        if self.state == ExamState::Active && selected.is_none() {
            return Err(ExamError::NotAnswered(question_id));
        }

        Ok(QuestionExplanation::new(question, selected))
    }

    pub fn view(&self) -> ExamView {
        let total_questions = if self.questions.is_empty() {
            self.bank.len()
        } else {
            self.questions.len()
        };

        let review = (self.state == ExamState::Completed).then(|| {
            self.questions
                .iter()
                .map(|q| QuestionExplanation::new(q, self.answers.get(&q.id).copied()))
                .collect()
        });

        ExamView {
            id: self.id,
            exam_type: self.exam_type.clone(),
            state: self.state,
            current_index: self.current_index,
            total_questions,
            current_question: self.current_question().map(PublicQuestion::from),
            answers: self.answers.clone(),
            remaining_seconds: self.remaining_seconds,
            started_at: self.started_at,
            finished_at: self.finished_at,
            result: self.result.clone(),
            review,
        }
    }

    fn require(&self, expected: ExamState, operation: &'static str) -> Result<(), ExamError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn invalid(&self, operation: &'static str) -> ExamError {
        ExamError::InvalidTransition {
            operation,
            state: self.state,
        }
    }
}
