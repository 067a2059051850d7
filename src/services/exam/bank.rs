// src/services/exam/bank.rs

use std::{collections::HashSet, path::Path};

use thiserror::Error;
use validator::Validate;

use crate::models::question::ExamQuestion;

#[derive(Debug, Error)]
pub enum QuestionBankError {
    #[error("could not read question bank: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse question bank: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid question {id}: {reason}")]
    Invalid { id: u32, reason: String },

    #[error("duplicate question id {0}")]
    DuplicateId(u32),

    #[error("question bank is empty")]
    Empty,
}

/// Static, validated set of questions every session draws from.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<ExamQuestion>,
}

impl QuestionBank {
    pub fn new(questions: Vec<ExamQuestion>) -> Result<Self, QuestionBankError> {
        if questions.is_empty() {
            return Err(QuestionBankError::Empty);
        }

        let mut seen = HashSet::new();
        for q in &questions {
            if let Err(e) = q.validate() {
                return Err(QuestionBankError::Invalid {
                    id: q.id,
                    reason: e.to_string(),
                });
            }
            if !seen.insert(q.id) {
                return Err(QuestionBankError::DuplicateId(q.id));
            }
        }

        Ok(Self { questions })
    }

    pub fn from_json_file(path: &Path) -> Result<Self, QuestionBankError> {
        let raw = std::fs::read_to_string(path)?;
        let questions: Vec<ExamQuestion> = serde_json::from_str(&raw)?;
        Self::new(questions)
    }

    pub fn questions(&self) -> &[ExamQuestion] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// The ten road-rules questions shipped with the platform.
    pub fn builtin() -> Self {
        let q = |id: u32, prompt: &str, options: [&str; 4], correct: u8, explanation: &str| {
            ExamQuestion {
                id,
                prompt: prompt.to_string(),
                options: options.map(str::to_string),
                correct_option: correct,
                explanation: explanation.to_string(),
            }
        };

        Self {
            questions: vec![
                q(
                    1,
                    "What is the maximum speed limit in urban areas in Rwanda?",
                    ["30 km/h", "50 km/h", "60 km/h", "70 km/h"],
                    1,
                    "The maximum speed limit in urban areas in Rwanda is 50 km/h.",
                ),
                q(
                    2,
                    "When should you use hazard lights?",
                    ["When parking", "During emergency stops", "When turning", "When overtaking"],
                    1,
                    "Hazard lights should be used during emergency stops to warn other drivers.",
                ),
                q(
                    3,
                    "What does a red traffic light mean?",
                    ["Slow down", "Stop completely", "Proceed with caution", "Yield to traffic"],
                    1,
                    "A red traffic light means you must stop completely and wait.",
                ),
                q(
                    4,
                    "What is the minimum following distance on highways?",
                    ["1 second", "2 seconds", "3 seconds", "4 seconds"],
                    2,
                    "The minimum following distance on highways should be 3 seconds to ensure safe stopping distance.",
                ),
                q(
                    5,
                    "When is it mandatory to wear a seatbelt?",
                    [
                        "Only on highways",
                        "Only in the front seat",
                        "Always when driving",
                        "Only during long trips",
                    ],
                    2,
                    "It is mandatory to wear a seatbelt always when driving or riding in a vehicle.",
                ),
                q(
                    6,
                    "What should you do at a STOP sign?",
                    [
                        "Slow down and proceed",
                        "Stop completely then proceed",
                        "Yield to traffic",
                        "Stop only if cars are coming",
                    ],
                    1,
                    "At a STOP sign, you must come to a complete stop before proceeding.",
                ),
                q(
                    7,
                    "What is the legal blood alcohol limit for drivers in Rwanda?",
                    ["0.05%", "0.08%", "0.02%", "0.00%"],
                    3,
                    "Rwanda has a zero-tolerance policy for drinking and driving (0.00% BAC).",
                ),
                q(
                    8,
                    "When should you use your turn signals?",
                    [
                        "Only when turning left",
                        "Only when changing lanes",
                        "Before any directional change",
                        "Only on highways",
                    ],
                    2,
                    "You should use turn signals before any directional change, including turns and lane changes.",
                ),
                q(
                    9,
                    "What should you do when an emergency vehicle approaches with sirens?",
                    ["Speed up", "Pull over and stop", "Continue normally", "Flash your lights"],
                    1,
                    "When an emergency vehicle approaches with sirens, pull over to the right and stop.",
                ),
                q(
                    10,
                    "What is the purpose of ABS brakes?",
                    ["To brake faster", "To prevent wheel lockup", "To increase speed", "To save fuel"],
                    1,
                    "ABS (Anti-lock Braking System) prevents wheel lockup during emergency braking, maintaining steering control.",
                ),
            ],
        }
    }
}
