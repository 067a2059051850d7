// src/models/tier.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::config::{BASIC_PRICE_RWF, PREMIUM_PRICE_RWF};

/// Access level of the learner. Ordered: `None < Basic < Premium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    None,
    Basic,
    Premium,
}

impl Tier {
    /// Tiers that can be bought and carry their own grant.
    pub const PURCHASABLE: [Tier; 2] = [Tier::Basic, Tier::Premium];

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::None => "none",
            Tier::Basic => "basic",
            Tier::Premium => "premium",
        }
    }

    /// Monthly price in RWF, `None` for the free tier.
    pub fn price(self) -> Option<u64> {
        match self {
            Tier::None => None,
            Tier::Basic => Some(BASIC_PRICE_RWF),
            Tier::Premium => Some(PREMIUM_PRICE_RWF),
        }
    }

    /// Storage key of the `true` flag for this tier's grant.
    pub fn granted_key(self) -> String {
        format!("{}AccessGranted", self.as_str())
    }

    /// Storage key of the grant's expiry, stored as epoch millis.
    pub fn expiry_key(self) -> String {
        format!("{}AccessExpiry", self.as_str())
    }

    /// Storage key of the grant's purchase time, stored as epoch millis.
    pub fn granted_at_key(self) -> String {
        format!("{}AccessGrantedAt", self.as_str())
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Tier::None),
            "basic" => Ok(Tier::Basic),
            "premium" => Ok(Tier::Premium),
            other => Err(format!("Unknown tier '{}'", other)),
        }
    }
}

/// Gated content areas of the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentCategory {
    Theory,
    Exams,
    Videos,
}

impl ContentCategory {
    /// Lowest tier that unlocks this category.
    pub fn required_tier(self) -> Tier {
        match self {
            ContentCategory::Theory => Tier::Basic,
            ContentCategory::Exams | ContentCategory::Videos => Tier::Premium,
        }
    }

    pub fn is_unlocked_by(self, tier: Tier) -> bool {
        tier >= self.required_tier()
    }
}

impl FromStr for ContentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "theory" => Ok(ContentCategory::Theory),
            "exams" => Ok(ContentCategory::Exams),
            "videos" => Ok(ContentCategory::Videos),
            other => Err(format!("Unknown content category '{}'", other)),
        }
    }
}
