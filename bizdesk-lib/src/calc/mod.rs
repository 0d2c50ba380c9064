//! Derived-field calculations
//!
//! Pure functions shared by the create and edit paths of each entity. Money is
//! [`rust_decimal::Decimal`] rounded to cents; stock quantities are whole units.

pub mod bill;
pub mod inventory;
pub mod payroll;

use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

/// Rounds to two decimal places, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(d("1.005")), d("1.01"));
        assert_eq!(round_money(d("-1.005")), d("-1.01"));
        assert_eq!(round_money(d("2.344")), d("2.34"));
    }
}
