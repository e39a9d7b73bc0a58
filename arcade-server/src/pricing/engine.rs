//! Session Pricing Engine
//!
//! Pure function over (duration, policy). One governing rule across all
//! policy variants: `increments = ceil(minutes / block_minutes)`. Any
//! positive remainder bills a full block; there is no proration. Only the
//! block size and the per-block rate differ per variant.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use shared::models::PricingPolicy;
use shared::money::round_money;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    #[error("invalid duration: {0} seconds (must be non-negative)")]
    InvalidDuration(i64),
    #[error("invalid policy: block size must be positive, got {0} minutes")]
    InvalidPolicy(u32),
}

/// Priced session duration
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    /// Number of billing blocks charged
    pub increments: u32,
    /// Price of one block
    pub unit_rate: Decimal,
    /// increments * unit_rate, 2dp
    pub amount: Decimal,
}

/// Price a session duration under a policy.
///
/// Zero duration yields zero increments; everything else rounds up to a
/// whole number of blocks. Errors on negative duration or a non-positive
/// block size.
pub fn price(duration_secs: i64, policy: &PricingPolicy) -> Result<Quote, PricingError> {
    if duration_secs < 0 {
        return Err(PricingError::InvalidDuration(duration_secs));
    }

    let block_minutes = policy.block_minutes();
    if block_minutes == 0 {
        return Err(PricingError::InvalidPolicy(block_minutes));
    }

    let unit_rate = unit_rate(policy);

    // Fractional minutes: 14m59s must still round up to one block
    let minutes = Decimal::from(duration_secs) / Decimal::from(60);
    let increments = (minutes / Decimal::from(block_minutes))
        .ceil()
        .to_u32()
        // duration is bounded by i64 seconds / 60 / block, always fits
        .unwrap_or(u32::MAX);

    let amount = round_money(Decimal::from(increments) * unit_rate);

    Ok(Quote {
        increments,
        unit_rate,
        amount,
    })
}

/// Per-block rate for a policy.
///
/// Flat-rate variants use the configured rate directly; CustomDuration
/// pro-rates an hourly rate down to the custom block size.
fn unit_rate(policy: &PricingPolicy) -> Decimal {
    match policy {
        PricingPolicy::PerGameMinutes { price_per_block } => *price_per_block,
        PricingPolicy::PerFifteenMinutes { price_per_block } => *price_per_block,
        PricingPolicy::PerHour { hourly_rate } => *hourly_rate,
        PricingPolicy::CustomDuration {
            block_minutes,
            hourly_rate,
        } => round_money(*hourly_rate * Decimal::from(*block_minutes) / Decimal::from(60)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn per_fifteen(rate: i64) -> PricingPolicy {
        PricingPolicy::PerFifteenMinutes {
            price_per_block: Decimal::from(rate),
        }
    }

    #[test]
    fn test_zero_duration_zero_increments() {
        let quote = price(0, &per_fifteen(50)).unwrap();
        assert_eq!(quote.increments, 0);
        assert_eq!(quote.amount, Decimal::ZERO);
    }

    #[test]
    fn test_one_second_bills_full_block() {
        // No proration: any positive remainder is a full block
        let quote = price(1, &per_fifteen(50)).unwrap();
        assert_eq!(quote.increments, 1);
        assert_eq!(quote.amount, Decimal::from(50));
    }

    #[test]
    fn test_fourteen_min_fifty_nine_sec_is_one_block() {
        let quote = price(14 * 60 + 59, &per_fifteen(50)).unwrap();
        assert_eq!(quote.increments, 1);
    }

    #[test]
    fn test_exact_block_boundary() {
        let quote = price(15 * 60, &per_fifteen(50)).unwrap();
        assert_eq!(quote.increments, 1);

        let quote = price(15 * 60 + 1, &per_fifteen(50)).unwrap();
        assert_eq!(quote.increments, 2);
    }

    #[test]
    fn test_per_game_minutes_uses_quarter_hour_blocks() {
        let policy = PricingPolicy::PerGameMinutes {
            price_per_block: Decimal::from(30),
        };
        // 50 minutes -> 4 blocks of 15
        let quote = price(50 * 60, &policy).unwrap();
        assert_eq!(quote.increments, 4);
        assert_eq!(quote.amount, Decimal::from(120));
    }

    #[test]
    fn test_per_hour() {
        let policy = PricingPolicy::PerHour {
            hourly_rate: Decimal::from(200),
        };
        // 61 minutes -> 2 hours
        let quote = price(61 * 60, &policy).unwrap();
        assert_eq!(quote.increments, 2);
        assert_eq!(quote.unit_rate, Decimal::from(200));
        assert_eq!(quote.amount, Decimal::from(400));
    }

    #[test]
    fn test_custom_duration_pro_rates_hourly() {
        let policy = PricingPolicy::CustomDuration {
            block_minutes: 45,
            hourly_rate: Decimal::from(100),
        };
        // unit rate = 100 * 45/60 = 75
        let quote = price(40 * 60, &policy).unwrap();
        assert_eq!(quote.increments, 1);
        assert_eq!(quote.unit_rate, Decimal::from(75));
        assert_eq!(quote.amount, Decimal::from(75));

        // 46 minutes crosses into the second block
        let quote = price(46 * 60, &policy).unwrap();
        assert_eq!(quote.increments, 2);
        assert_eq!(quote.amount, Decimal::from(150));
    }

    #[test]
    fn test_custom_duration_fractional_rate_rounds() {
        let policy = PricingPolicy::CustomDuration {
            block_minutes: 7,
            hourly_rate: Decimal::new(9999, 2), // 99.99
        };
        // 99.99 * 7/60 = 11.6655 -> 11.67
        let quote = price(60, &policy).unwrap();
        assert_eq!(quote.unit_rate, Decimal::new(1167, 2));
    }

    #[test]
    fn test_negative_duration_rejected() {
        let err = price(-1, &per_fifteen(50)).unwrap_err();
        assert_eq!(err, PricingError::InvalidDuration(-1));
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let policy = PricingPolicy::CustomDuration {
            block_minutes: 0,
            hourly_rate: Decimal::from(100),
        };
        let err = price(600, &policy).unwrap_err();
        assert_eq!(err, PricingError::InvalidPolicy(0));
    }

    #[test]
    fn test_pricing_is_pure() {
        let policy = PricingPolicy::CustomDuration {
            block_minutes: 20,
            hourly_rate: Decimal::new(12345, 2),
        };
        let a = price(3599, &policy).unwrap();
        let b = price(3599, &policy).unwrap();
        assert_eq!(a, b);
    }
}
