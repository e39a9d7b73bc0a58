//! Game catalog model and pricing policy

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Minutes in the fixed quarter-hour billing block
pub const QUARTER_HOUR_MINUTES: u32 = 15;

/// Pricing policy for a game.
///
/// Closed set: exactly one variant is active per game at billing time.
/// Unknown tags fail deserialization, there is no silent fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PricingPolicy {
    /// Fixed 15-minute blocks, priced per block
    PerGameMinutes { price_per_block: Decimal },
    /// Custom block size, per-block cost derived from an hourly rate
    CustomDuration { block_minutes: u32, hourly_rate: Decimal },
    /// 60-minute blocks, priced per hour
    PerHour { hourly_rate: Decimal },
    /// Fixed 15-minute blocks, priced per block
    PerFifteenMinutes { price_per_block: Decimal },
}

impl PricingPolicy {
    /// Billing block size in minutes for this policy
    pub fn block_minutes(&self) -> u32 {
        match self {
            Self::PerGameMinutes { .. } | Self::PerFifteenMinutes { .. } => QUARTER_HOUR_MINUTES,
            Self::CustomDuration { block_minutes, .. } => *block_minutes,
            Self::PerHour { .. } => 60,
        }
    }
}

/// Game catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub name: String,
    pub policy: PricingPolicy,
}

/// Create game payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameCreate {
    pub name: String,
    pub policy: PricingPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_policy_tag_is_rejected() {
        let raw = r#"{"kind":"per_credit","price_per_block":5.0}"#;
        let parsed: Result<PricingPolicy, _> = serde_json::from_str(raw);
        assert!(parsed.is_err());
    }

    #[test]
    fn policy_round_trip() {
        let policy = PricingPolicy::CustomDuration {
            block_minutes: 45,
            hourly_rate: Decimal::from(100),
        };
        let json = serde_json::to_string(&policy).unwrap();
        let back: PricingPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, policy);
        assert_eq!(back.block_minutes(), 45);
    }
}
