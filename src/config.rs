// src/config.rs

use std::{env, path::PathBuf, str::FromStr};

use dotenvy::dotenv;

/// Price of one month of basic (theory only) access.
pub const BASIC_PRICE_RWF: u64 = 15_000;

/// Price of one month of premium (theory, exams and videos) access.
pub const PREMIUM_PRICE_RWF: u64 = 35_000;

pub const CURRENCY: &str = "RWF";

/// Every exam question offers exactly this many options.
pub const OPTIONS_PER_QUESTION: usize = 4;

pub const DEFAULT_EXAM_TYPE: &str = "general";

// Storage keys shared with the web client.
pub const EXAM_HISTORY_KEY: &str = "examHistory";
pub const COMPLETED_LESSONS_KEY: &str = "completedLessons";
pub const COMPLETED_VIDEOS_KEY: &str = "completedVideos";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    pub bind_addr: String,
    pub exam: ExamSettings,
    /// Interval of the background grant re-validation sweep.
    pub expiry_poll_secs: u64,
    /// Artificial latency of the mocked payment processor.
    pub payment_delay_ms: u64,
    /// Optional JSON question bank. The built-in bank is used when unset.
    pub question_bank_path: Option<PathBuf>,
}

/// Knobs of a single practice exam attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamSettings {
    pub time_limit_secs: u32,
    pub passing_percentage: u8,
}

impl Default for ExamSettings {
    fn default() -> Self {
        Self {
            time_limit_secs: 20 * 60,
            passing_percentage: 70,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://drivers-ed.db?mode=rwc".to_string(),
            rust_log: "info".to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            exam: ExamSettings::default(),
            expiry_poll_secs: 60,
            payment_delay_ms: 2_000,
            question_bank_path: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let defaults = Self::default();

        let database_url = env::var("DATABASE_URL").unwrap_or(defaults.database_url);

        let rust_log = env::var("RUST_LOG").unwrap_or(defaults.rust_log);

        let bind_addr = env::var("BIND_ADDR").unwrap_or(defaults.bind_addr);

        let exam = ExamSettings {
            time_limit_secs: parse_var("EXAM_TIME_LIMIT_SECS", defaults.exam.time_limit_secs),
            passing_percentage: parse_var("PASSING_PERCENTAGE", defaults.exam.passing_percentage)
                .min(100),
        };

        Self {
            database_url,
            rust_log,
            bind_addr,
            exam,
            expiry_poll_secs: parse_var("EXPIRY_POLL_SECS", defaults.expiry_poll_secs).max(1),
            payment_delay_ms: parse_var("PAYMENT_DELAY_MS", defaults.payment_delay_ms),
            question_bank_path: env::var("QUESTION_BANK_PATH").ok().map(PathBuf::from),
        }
    }
}

/// Reads a numeric variable, falling back to `default` when it is missing or malformed.
fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}, using {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}
