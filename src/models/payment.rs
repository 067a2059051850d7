// src/models/payment.rs

use serde::{Deserialize, Serialize};

use super::tier::Tier;

/// Supported ways to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// MTN Mobile Money.
    Mtn,
    /// Airtel Money.
    Airtel,
    /// Card payments through Flutterwave.
    Flutterwave,
}

impl PaymentMethod {
    /// Mobile-money methods charge a phone number.
    pub fn requires_phone_number(self) -> bool {
        matches!(self, PaymentMethod::Mtn | PaymentMethod::Airtel)
    }

    pub fn transaction_prefix(self) -> &'static str {
        match self {
            PaymentMethod::Mtn => "MTN",
            PaymentMethod::Airtel => "AIRTEL",
            PaymentMethod::Flutterwave => "FLW",
        }
    }
}

/// A single charge sent to the payment processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChargeRequest {
    pub amount: u64,
    pub currency: String,
    pub tier: Tier,
    pub method: PaymentMethod,
    pub phone_number: Option<String>,
    /// Replaying a key returns the original receipt instead of charging twice.
    pub idempotency_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChargeReceipt {
    pub transaction_id: String,
    pub amount: u64,
    pub currency: String,
}
