// src/models/entitlement.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{payment::PaymentMethod, tier::Tier};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// A time-limited grant of one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub tier: Tier,
    pub granted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Grant {
    /// A grant is gone once its expiry instant is reached, not only after it.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whole days left, rounded up. Zero once expired.
    pub fn remaining_days(&self, now: DateTime<Utc>) -> u32 {
        let diff_ms = (self.expires_at - now).num_milliseconds();
        if diff_ms <= 0 {
            return 0;
        }
        let days = (diff_ms + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY;
        u32::try_from(days).unwrap_or(u32::MAX)
    }
}

/// DTO for buying a tier.
#[derive(Debug, Deserialize, Validate)]
pub struct PurchaseRequest {
    pub tier: Tier,
    pub method: PaymentMethod,
    #[validate(length(
        min = 9,
        max = 15,
        message = "Phone number must be between 9 and 15 characters."
    ))]
    pub phone_number: Option<String>,
}

/// Result of a purchase attempt. Payment failures are reported here, not as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOutcome {
    pub success: bool,
    pub message: String,
    pub transaction_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl PurchaseOutcome {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            transaction_id: None,
            expires_at: None,
        }
    }
}

/// Snapshot of the learner's entitlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessStatus {
    pub tier: Tier,
    pub basic_remaining_days: u32,
    pub premium_remaining_days: u32,
    pub basic_expires_at: Option<DateTime<Utc>>,
    pub premium_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct AccessCheckResponse {
    pub category: super::tier::ContentCategory,
    pub allowed: bool,
}

#[derive(Debug, Serialize)]
pub struct RemainingDaysResponse {
    pub tier: Tier,
    pub remaining_days: u32,
}
