//! Monetary rounding rules.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! All monetary values are `rust_decimal::Decimal` rounded to 2 decimal
//! places, half away from zero, at every write. Equality checks compare the
//! rounded forms.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places kept for every monetary value.
pub const MONEY_SCALE: u32 = 2;

/// Rounds a monetary amount to 2 decimal places, half away from zero.
///
/// This is applied to every amount before it is recorded on a journal line,
/// posting, or account aggregate.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Compares two monetary amounts after rounding both to 2 decimal places.
#[must_use]
pub fn money_eq(a: Decimal, b: Decimal) -> bool {
    round_money(a) == round_money(b)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use rust_decimal_macros::dec;

    use super::*;

    #[rstest]
    #[case(dec!(10.005), dec!(10.01))]
    #[case(dec!(-10.005), dec!(-10.01))]
    #[case(dec!(10.004), dec!(10.00))]
    #[case(dec!(10.995), dec!(11.00))]
    #[case(dec!(0.125), dec!(0.13))]
    #[case(dec!(100), dec!(100.00))]
    fn test_round_half_away_from_zero(#[case] input: Decimal, #[case] expected: Decimal) {
        assert_eq!(round_money(input), expected);
    }

    #[test]
    fn test_round_is_idempotent() {
        let rounded = round_money(dec!(42.425));
        assert_eq!(round_money(rounded), rounded);
    }

    #[test]
    fn test_money_eq_uses_rounded_form() {
        assert!(money_eq(dec!(10.004), dec!(10.001)));
        assert!(money_eq(dec!(10.005), dec!(10.01)));
        assert!(!money_eq(dec!(10.00), dec!(10.01)));
    }
}
