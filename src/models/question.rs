// src/models/question.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::OPTIONS_PER_QUESTION;

/// One multiple-choice question of the practice exam bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ExamQuestion {
    pub id: u32,

    /// The text shown to the learner.
    #[validate(length(min = 1, max = 1000))]
    pub prompt: String,

    /// Exactly four options, in display order.
    #[validate(custom(function = validate_options))]
    pub options: [String; OPTIONS_PER_QUESTION],

    /// Index into `options` of the right answer.
    #[validate(range(max = 3))]
    pub correct_option: u8,

    #[validate(length(max = 2000))]
    pub explanation: String,
}

impl ExamQuestion {
    pub fn is_correct(&self, option_index: u8) -> bool {
        self.correct_option == option_index
    }
}

fn validate_options(
    options: &[String; OPTIONS_PER_QUESTION],
) -> Result<(), validator::ValidationError> {
    for opt in options {
        if opt.trim().is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

/// DTO for sending a question to the client (excludes answer and explanation).
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: u32,
    pub prompt: String,
    pub options: [String; OPTIONS_PER_QUESTION],
}

impl From<&ExamQuestion> for PublicQuestion {
    fn from(q: &ExamQuestion) -> Self {
        Self {
            id: q.id,
            prompt: q.prompt.clone(),
            options: q.options.clone(),
        }
    }
}

/// Feedback on an answered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionExplanation {
    pub question_id: u32,
    pub selected_option: Option<u8>,
    pub correct_option: u8,
    pub correct_text: String,
    pub is_correct: bool,
    pub explanation: String,
}

impl QuestionExplanation {
    pub fn new(question: &ExamQuestion, selected_option: Option<u8>) -> Self {
        Self {
            question_id: question.id,
            selected_option,
            correct_option: question.correct_option,
            correct_text: question.options[usize::from(question.correct_option)].clone(),
            is_correct: selected_option.is_some_and(|o| question.is_correct(o)),
            explanation: question.explanation.clone(),
        }
    }
}
