// src/services/exam/mod.rs

pub mod bank;
pub mod countdown;
pub mod desk;
pub mod session;

pub use bank::{QuestionBank, QuestionBankError};
pub use desk::ExamDesk;
pub use session::{ExamError, ExamSession, TickOutcome};
