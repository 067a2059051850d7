// src/services/payment.rs

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::payment::{ChargeReceipt, ChargeRequest};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("payment declined: {0}")]
    Declined(String),

    #[error("a phone number is required for mobile money payments")]
    MissingPhoneNumber,

    #[error("payment processor unavailable: {0}")]
    Unavailable(String),
}

/// Collaborator that moves money.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn initiate_charge(&self, request: &ChargeRequest)
    -> Result<ChargeReceipt, PaymentError>;
}

/// Stand-in processor that approves every well-formed charge after a fixed delay.
#[derive(Debug)]
pub struct MockPaymentProcessor {
    delay: Duration,
    decline_reason: Option<String>,
    lost_responses: AtomicUsize,
    receipts: Mutex<HashMap<String, ChargeReceipt>>,
}

impl MockPaymentProcessor {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            decline_reason: None,
            lost_responses: AtomicUsize::new(0),
            receipts: Mutex::new(HashMap::new()),
        }
    }

    /// A processor that declines every charge with `reason`.
    pub fn declining(reason: impl Into<String>) -> Self {
        Self {
            delay: Duration::ZERO,
            decline_reason: Some(reason.into()),
            lost_responses: AtomicUsize::new(0),
            receipts: Mutex::new(HashMap::new()),
        }
    }

    /// A processor that captures every charge but loses the first `count`
    /// responses, the way a call timing out after the money moved would.
    pub fn losing_responses(count: usize) -> Self {
        let processor = Self::new(Duration::ZERO);
        processor.lost_responses.store(count, Ordering::SeqCst);
        processor
    }

    /// Number of distinct charges captured so far.
    pub fn captured(&self) -> usize {
        self.receipts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl PaymentProcessor for MockPaymentProcessor {
    async fn initiate_charge(
        &self,
        request: &ChargeRequest,
    ) -> Result<ChargeReceipt, PaymentError> {
        let has_phone = request
            .phone_number
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty());
        if request.method.requires_phone_number() && !has_phone {
            return Err(PaymentError::MissingPhoneNumber);
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if let Some(reason) = &self.decline_reason {
            return Err(PaymentError::Declined(reason.clone()));
        }

        let receipt = self
            .receipts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(request.idempotency_key.clone())
            .or_insert_with(|| ChargeReceipt {
                transaction_id: format!(
                    "{}_{}",
                    request.method.transaction_prefix(),
                    Uuid::new_v4().simple()
                ),
                amount: request.amount,
                currency: request.currency.clone(),
            })
            .clone();

        let lost = self
            .lost_responses
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lost {
            return Err(PaymentError::Unavailable("response timed out".to_string()));
        }

        tracing::info!(
            "Charged {} {} via {:?} ({})",
            receipt.amount,
            receipt.currency,
            request.method,
            receipt.transaction_id
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{payment::PaymentMethod, tier::Tier};

    fn charge(method: PaymentMethod, phone: Option<&str>, key: &str) -> ChargeRequest {
        ChargeRequest {
            amount: 15_000,
            currency: "RWF".to_string(),
            tier: Tier::Basic,
            method,
            phone_number: phone.map(str::to_string),
            idempotency_key: key.to_string(),
        }
    }

    #[tokio::test]
    async fn test_mobile_money_requires_phone() {
        let processor = MockPaymentProcessor::new(Duration::ZERO);

        let err = processor
            .initiate_charge(&charge(PaymentMethod::Mtn, None, "k1"))
            .await
            .unwrap_err();
        assert_eq!(err, PaymentError::MissingPhoneNumber);

        let receipt = processor
            .initiate_charge(&charge(PaymentMethod::Flutterwave, None, "k2"))
            .await
            .unwrap();
        assert!(receipt.transaction_id.starts_with("FLW_"));
    }

    #[tokio::test]
    async fn test_replayed_idempotency_key_returns_same_receipt() {
        let processor = MockPaymentProcessor::new(Duration::ZERO);
        let request = charge(PaymentMethod::Airtel, Some("0788123456"), "same-key");

        let first = processor.initiate_charge(&request).await.unwrap();
        let second = processor.initiate_charge(&request).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(processor.captured(), 1);
    }

    #[tokio::test]
    async fn test_lost_response_still_captures_charge() {
        let processor = MockPaymentProcessor::losing_responses(1);
        let request = charge(PaymentMethod::Flutterwave, None, "retry-key");

        let err = processor.initiate_charge(&request).await.unwrap_err();
        assert!(matches!(err, PaymentError::Unavailable(_)));
        assert_eq!(processor.captured(), 1);

        let receipt = processor.initiate_charge(&request).await.unwrap();
        assert!(receipt.transaction_id.starts_with("FLW_"));
        assert_eq!(processor.captured(), 1);
    }

    #[tokio::test]
    async fn test_declining_processor() {
        let processor = MockPaymentProcessor::declining("insufficient funds");
        let err = processor
            .initiate_charge(&charge(PaymentMethod::Flutterwave, None, "k"))
            .await
            .unwrap_err();
        assert_eq!(err, PaymentError::Declined("insufficient funds".to_string()));
    }
}
