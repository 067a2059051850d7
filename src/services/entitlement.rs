// src/services/entitlement.rs

//! Payment-gated access to content tiers.
//!
//! Grants live in memory and are written through to the key-value store.
//! Expiry is lazy: every read re-validates against the clock, and a
//! background sweep does the same on a fixed interval. When the store
//! cannot be written the in-memory state stays authoritative.
//!
//! Every grant change is applied to memory and persisted while holding the
//! `writes` lock, so a sweep clearing an expired grant can never remove the
//! keys of a grant bought after it made its decision.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, RwLock},
    time::Duration,
};

use chrono::{DateTime, Months, Utc};
use thiserror::Error;
use tokio::{sync::Mutex as AsyncMutex, task::JoinHandle};
use uuid::Uuid;

use crate::{
    config::CURRENCY,
    models::{
        entitlement::{AccessStatus, Grant, PurchaseOutcome},
        payment::{ChargeRequest, PaymentMethod},
        tier::{ContentCategory, Tier},
    },
    services::payment::{PaymentError, PaymentProcessor},
    storage::KeyValueStore,
    utils::clock::Clock,
};

/// Charge attempts per purchase when the processor is unreachable.
const CHARGE_ATTEMPTS: u32 = 3;
const CHARGE_RETRY_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntitlementError {
    #[error("tier '{0}' cannot be purchased")]
    NotPurchasable(Tier),

    #[error("a purchase of the {0} tier is already in progress")]
    PurchaseInProgress(Tier),
}

#[derive(Debug, Default, Clone, Copy)]
struct Grants {
    basic: Option<Grant>,
    premium: Option<Grant>,
}

impl Grants {
    fn slot(&mut self, tier: Tier) -> Option<&mut Option<Grant>> {
        match tier {
            Tier::Basic => Some(&mut self.basic),
            Tier::Premium => Some(&mut self.premium),
            Tier::None => None,
        }
    }

    fn has_expired(&self, now: DateTime<Utc>) -> bool {
        [self.basic, self.premium]
            .iter()
            .flatten()
            .any(|g| g.is_expired(now))
    }

    fn effective_tier(&self) -> Tier {
        if self.premium.is_some() {
            Tier::Premium
        } else if self.basic.is_some() {
            Tier::Basic
        } else {
            Tier::None
        }
    }

    /// Premium carries an implicit basic grant, so basic reports whichever lasts longer.
    fn grant_for(&self, tier: Tier) -> Option<Grant> {
        match tier {
            Tier::None => None,
            Tier::Premium => self.premium,
            Tier::Basic => match (self.basic, self.premium) {
                (Some(b), Some(p)) if p.expires_at > b.expires_at => Some(p),
                (Some(b), _) => Some(b),
                (None, p) => p,
            },
        }
    }
}

pub struct EntitlementStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    payments: Arc<dyn PaymentProcessor>,
    grants: RwLock<Grants>,
    writes: AsyncMutex<()>,
    in_flight: Mutex<HashSet<Tier>>,
}

impl EntitlementStore {
    /// Builds the store from whatever grants the key-value store holds.
    ///
    /// Missing, corrupt or expired entries count as "no grant" and are cleared.
    pub async fn load(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        payments: Arc<dyn PaymentProcessor>,
    ) -> Self {
        let now = clock.now();
        let mut grants = Grants::default();
        let mut stale = Vec::new();

        for tier in Tier::PURCHASABLE {
            match read_grant(store.as_ref(), tier).await {
                StoredGrant::Valid(grant) if !grant.is_expired(now) => {
                    if let Some(slot) = grants.slot(tier) {
                        *slot = Some(grant);
                    }
                }
                StoredGrant::Absent => {}
                StoredGrant::Valid(_) | StoredGrant::Corrupt => stale.push(tier),
            }
        }

        let this = Self {
            store,
            clock,
            payments,
            grants: RwLock::new(grants),
            writes: AsyncMutex::new(()),
            in_flight: Mutex::new(HashSet::new()),
        };

        if !stale.is_empty() {
            tracing::info!("Clearing stale grants on startup: {:?}", stale);
            this.clear_persisted(&stale).await;
        }

        this
    }

    /// Whether the learner may open `category` right now.
    pub async fn check_access(&self, category: ContentCategory) -> bool {
        category.is_unlocked_by(self.current_tier().await)
    }

    pub async fn current_tier(&self) -> Tier {
        self.revalidate().await;
        self.read_grants().effective_tier()
    }

    /// Whole days left on `tier`, rounded up. Zero when there is no valid grant.
    pub async fn remaining_days(&self, tier: Tier) -> u32 {
        self.revalidate().await;
        let now = self.clock.now();
        self.read_grants()
            .grant_for(tier)
            .map_or(0, |grant| grant.remaining_days(now))
    }

    pub async fn status(&self) -> AccessStatus {
        self.revalidate().await;
        let now = self.clock.now();
        let grants = self.read_grants();
        let basic = grants.grant_for(Tier::Basic);
        let premium = grants.grant_for(Tier::Premium);

        AccessStatus {
            tier: grants.effective_tier(),
            basic_remaining_days: basic.map_or(0, |g| g.remaining_days(now)),
            premium_remaining_days: premium.map_or(0, |g| g.remaining_days(now)),
            basic_expires_at: basic.map(|g| g.expires_at),
            premium_expires_at: premium.map(|g| g.expires_at),
        }
    }

    /// Drops every grant whose expiry has been reached. Returns the cleared tiers.
    pub async fn revalidate(&self) -> Vec<Tier> {
        if !self.read_grants().has_expired(self.clock.now()) {
            return Vec::new();
        }

        let _writing = self.writes.lock().await;
        let now = self.clock.now();
        let expired: Vec<Tier> = {
            let mut grants = self.grants.write().unwrap_or_else(|e| e.into_inner());
            let mut expired = Vec::new();
            for tier in Tier::PURCHASABLE {
                if let Some(slot) = grants.slot(tier) {
                    if slot.is_some_and(|g| g.is_expired(now)) {
                        *slot = None;
                        expired.push(tier);
                    }
                }
            }
            expired
        };

        if !expired.is_empty() {
            tracing::info!("Access expired for tiers {:?}", expired);
            self.clear_persisted(&expired).await;
        }
        expired
    }

    /// Buys one month of `tier`.
    ///
    /// Re-purchasing resets the window to a month from now; it never stacks.
    /// A premium purchase also grants basic with the same expiry. Payment
    /// failures come back as an unsuccessful outcome and leave grants untouched.
    ///
    /// One idempotency key covers the whole purchase: when the processor is
    /// unreachable the charge is retried with the same key, so a charge that
    /// went through before the connection dropped is not taken twice.
    pub async fn purchase(
        &self,
        tier: Tier,
        method: PaymentMethod,
        phone_number: Option<String>,
    ) -> Result<PurchaseOutcome, EntitlementError> {
        let amount = tier.price().ok_or(EntitlementError::NotPurchasable(tier))?;
        let _in_flight = InFlight::acquire(&self.in_flight, tier)?;

        let request = ChargeRequest {
            amount,
            currency: CURRENCY.to_string(),
            tier,
            method,
            phone_number,
            idempotency_key: Uuid::new_v4().to_string(),
        };

        let mut attempt = 1;
        let receipt = loop {
            match self.payments.initiate_charge(&request).await {
                Ok(receipt) => break receipt,
                Err(PaymentError::Unavailable(reason)) if attempt < CHARGE_ATTEMPTS => {
                    tracing::warn!(
                        "Payment processor unavailable ({}), retrying {} charge (attempt {})",
                        reason,
                        tier,
                        attempt + 1
                    );
                    attempt += 1;
                    tokio::time::sleep(CHARGE_RETRY_DELAY).await;
                }
                Err(e) => {
                    tracing::warn!("Purchase of {} failed: {}", tier, e);
                    return Ok(PurchaseOutcome::failed(format!(
                        "Payment failed: {}. Please try again.",
                        e
                    )));
                }
            }
        };

        let _writing = self.writes.lock().await;
        let now = self.clock.now();
        let expires_at = one_month_after(now);
        let granted: Vec<Grant> = match tier {
            Tier::Premium => vec![Tier::Premium, Tier::Basic],
            _ => vec![tier],
        }
        .into_iter()
        .map(|tier| Grant {
            tier,
            granted_at: now,
            expires_at,
        })
        .collect();

        {
            let mut grants = self.grants.write().unwrap_or_else(|e| e.into_inner());
            for grant in &granted {
                if let Some(slot) = grants.slot(grant.tier) {
                    *slot = Some(*grant);
                }
            }
        }

        let entries: Vec<(String, String)> = granted.iter().flat_map(grant_entries).collect();
        if let Err(e) = self.store.set_many(&entries).await {
            tracing::warn!("Failed to persist {} grant, keeping it in memory: {}", tier, e);
        }

        tracing::info!("Granted {} access until {}", tier, expires_at);

        let label = match tier {
            Tier::Premium => "Premium",
            _ => "Basic",
        };
        Ok(PurchaseOutcome {
            success: true,
            message: format!(
                "{} access purchased successfully! Access valid for 1 month.",
                label
            ),
            transaction_id: Some(receipt.transaction_id),
            expires_at: Some(expires_at),
        })
    }

    /// Runs `revalidate` every `period` until the returned task is aborted.
    pub fn spawn_expiry_sweep(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let cleared = self.revalidate().await;
                if !cleared.is_empty() {
                    tracing::debug!("Expiry sweep cleared {:?}", cleared);
                }
            }
        })
    }

    fn read_grants(&self) -> Grants {
        *self.grants.read().unwrap_or_else(|e| e.into_inner())
    }

    async fn clear_persisted(&self, tiers: &[Tier]) {
        let keys: Vec<String> = tiers
            .iter()
            .flat_map(|t| [t.granted_key(), t.expiry_key(), t.granted_at_key()])
            .collect();
        if let Err(e) = self.store.remove_many(&keys).await {
            tracing::warn!("Failed to clear expired grants {:?}: {}", tiers, e);
        }
    }
}

/// Marks a tier as having a purchase outstanding for as long as it lives.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<Tier>>,
    tier: Tier,
}

impl<'a> InFlight<'a> {
    fn acquire(set: &'a Mutex<HashSet<Tier>>, tier: Tier) -> Result<Self, EntitlementError> {
        let mut guard = set.lock().unwrap_or_else(|e| e.into_inner());
        if !guard.insert(tier) {
            return Err(EntitlementError::PurchaseInProgress(tier));
        }
        Ok(Self { set, tier })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.tier);
    }
}

enum StoredGrant {
    Absent,
    Corrupt,
    Valid(Grant),
}

async fn read_grant(store: &dyn KeyValueStore, tier: Tier) -> StoredGrant {
    let read = |key: String| async move {
        store.get(&key).await.unwrap_or_else(|e| {
            tracing::warn!("Failed to read '{}': {}", key, e);
            None
        })
    };

    let granted = read(tier.granted_key()).await;
    let expiry = read(tier.expiry_key()).await;
    let granted_at = read(tier.granted_at_key()).await;

    match (granted.as_deref(), expiry) {
        (None, None) => StoredGrant::Absent,
        (Some("true"), Some(raw)) => match parse_millis(&raw) {
            Some(expires_at) => {
                let granted_at = granted_at
                    .as_deref()
                    .and_then(parse_millis)
                    .or_else(|| expires_at.checked_sub_months(Months::new(1)))
                    .unwrap_or(expires_at);
                StoredGrant::Valid(Grant {
                    tier,
                    granted_at,
                    expires_at,
                })
            }
            None => {
                tracing::warn!("Corrupt expiry {:?} for {} grant", raw, tier);
                StoredGrant::Corrupt
            }
        },
        _ => StoredGrant::Corrupt,
    }
}

fn grant_entries(grant: &Grant) -> [(String, String); 3] {
    [
        (grant.tier.granted_key(), "true".to_string()),
        (
            grant.tier.expiry_key(),
            grant.expires_at.timestamp_millis().to_string(),
        ),
        (
            grant.tier.granted_at_key(),
            grant.granted_at.timestamp_millis().to_string(),
        ),
    ]
}

fn parse_millis(raw: &str) -> Option<DateTime<Utc>> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
}

/// Same day of the next calendar month, clamped to the month's last day.
fn one_month_after(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_add_months(Months::new(1))
        .unwrap_or(now + chrono::Duration::days(30))
}
