//! Fee policy: front-loading fees, late fees, minimum principal and interest.
//!
//! Every function is a pure calculation over a [`FeeConfig`] snapshot. Division
//! rounds down; the truncated remainder is never billed.

use crate::error::CreditError;
use crate::period::{DAYS_IN_A_YEAR, SECONDS_IN_A_YEAR};
use crate::types::FeeConfig;

/// 100% in basis points.
pub const BPS_DENOMINATOR: u128 = 10_000;
/// Upper bound for any rate expressed in basis points.
pub const MAX_RATE_BPS: u32 = 10_000;
/// Upper bound for `min_principal_rate_bps` (50%).
pub const MAX_MIN_PRINCIPAL_RATE_BPS: u32 = 5_000;

/// `amount * numerator / denominator`, rounded down.
pub(crate) fn mul_div(
    amount: u128,
    numerator: u128,
    denominator: u128,
) -> Result<u128, CreditError> {
    amount
        .checked_mul(numerator)
        .and_then(|scaled| scaled.checked_div(denominator))
        .ok_or(CreditError::Overflow)
}

pub(crate) fn bps_of(amount: u128, rate_bps: u32) -> Result<u128, CreditError> {
    mul_div(amount, u128::from(rate_bps), BPS_DENOMINATOR)
}

pub(crate) fn check_rate(rate_bps: u32, cap_bps: u32) -> Result<(), CreditError> {
    if rate_bps > cap_bps {
        return Err(CreditError::RateTooHigh { rate_bps, cap_bps });
    }
    Ok(())
}

impl FeeConfig {
    pub fn validate(&self) -> Result<(), CreditError> {
        check_rate(self.front_loading_fee_bps, MAX_RATE_BPS)?;
        check_rate(self.late_fee_bps, MAX_RATE_BPS)?;
        check_rate(self.min_principal_rate_bps, MAX_MIN_PRINCIPAL_RATE_BPS)
    }

    /// Fee withheld from a drawdown of `principal`.
    pub fn front_loading_fee(&self, principal: u128) -> Result<u128, CreditError> {
        self.front_loading_fee_flat
            .checked_add(bps_of(principal, self.front_loading_fee_bps)?)
            .ok_or(CreditError::Overflow)
    }

    /// Fee for one missed statement on an `outstanding` balance.
    pub fn late_fee(&self, outstanding: u128) -> Result<u128, CreditError> {
        self.late_fee_flat
            .checked_add(bps_of(outstanding, self.late_fee_bps)?)
            .ok_or(CreditError::Overflow)
    }

    /// Principal billed in a period on top of interest.
    pub fn min_principal_payment(&self, outstanding: u128) -> Result<u128, CreditError> {
        if self.min_principal_rate_bps == 0 {
            return Ok(0);
        }
        bps_of(outstanding, self.min_principal_rate_bps)
    }

    /// Splits a drawdown into `(amount_to_borrower, front_loading_fee)`.
    pub fn borrowing_split(&self, amount: u128) -> Result<(u128, u128), CreditError> {
        let fee = self.front_loading_fee(amount)?;
        if amount < fee {
            return Err(CreditError::AmountOutOfRange {
                amount,
                min: fee,
                max: u128::MAX,
            });
        }
        Ok((amount - fee, fee))
    }
}

/// Interest for one full billing period on `base`.
pub fn interest_for_period(
    base: u128,
    apr_in_bps: u32,
    interval_in_days: u32,
) -> Result<u128, CreditError> {
    let rate = u128::from(apr_in_bps)
        .checked_mul(u128::from(interval_in_days))
        .ok_or(CreditError::Overflow)?;
    mul_div(base, rate, u128::from(DAYS_IN_A_YEAR) * BPS_DENOMINATOR)
}

/// Interest on `amount` from `now` until `due_date`. Used to bill a mid-period
/// drawdown, or to credit a mid-period principal prepayment, on the next statement.
pub fn interest_correction(
    due_date: u64,
    now: u64,
    apr_in_bps: u32,
    amount: u128,
) -> Result<u128, CreditError> {
    let remaining = u128::from(due_date.saturating_sub(now));
    let rate = u128::from(apr_in_bps)
        .checked_mul(remaining)
        .ok_or(CreditError::Overflow)?;
    mul_div(amount, rate, u128::from(SECONDS_IN_A_YEAR) * BPS_DENOMINATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::SECONDS_IN_A_DAY;

    fn config() -> FeeConfig {
        FeeConfig {
            front_loading_fee_flat: 10,
            front_loading_fee_bps: 100,
            late_fee_flat: 20,
            late_fee_bps: 20,
            min_principal_rate_bps: 0,
        }
    }

    #[test]
    fn front_loading_fee_is_flat_plus_bps_rounded_down() {
        let fees = config();
        assert_eq!(fees.front_loading_fee(0), Ok(10));
        assert_eq!(fees.front_loading_fee(1_000), Ok(20));
        assert_eq!(fees.front_loading_fee(1_099), Ok(20));
    }

    #[test]
    fn late_fee_on_small_balance_is_flat() {
        let fees = config();
        assert_eq!(fees.late_fee(404), Ok(20));
        assert_eq!(fees.late_fee(100_000), Ok(220));
    }

    #[test]
    fn min_principal_is_zero_without_rate() {
        let mut fees = config();
        assert_eq!(fees.min_principal_payment(1_000_000), Ok(0));
        fees.min_principal_rate_bps = 500;
        assert_eq!(fees.min_principal_payment(1_000_000), Ok(50_000));
        assert_eq!(fees.min_principal_payment(19), Ok(0));
    }

    #[test]
    fn min_principal_rate_cap_is_inclusive() {
        let mut fees = config();
        fees.min_principal_rate_bps = MAX_MIN_PRINCIPAL_RATE_BPS;
        assert_eq!(fees.validate(), Ok(()));
        fees.min_principal_rate_bps = MAX_MIN_PRINCIPAL_RATE_BPS + 1;
        assert_eq!(
            fees.validate(),
            Err(CreditError::RateTooHigh {
                rate_bps: 5_001,
                cap_bps: 5_000
            })
        );
    }

    #[test]
    fn late_fee_rate_above_full_is_rejected() {
        let mut fees = config();
        fees.late_fee_bps = 10_001;
        assert!(matches!(
            fees.validate(),
            Err(CreditError::RateTooHigh { rate_bps: 10_001, .. })
        ));
    }

    #[test]
    fn borrowing_split_withholds_fee() {
        let fees = config();
        assert_eq!(fees.borrowing_split(1_000), Ok((980, 20)));
        assert_eq!(
            fees.borrowing_split(5),
            Err(CreditError::AmountOutOfRange {
                amount: 5,
                min: 10,
                max: u128::MAX
            })
        );
    }

    #[test]
    fn monthly_interest_on_reference_line() {
        assert_eq!(interest_for_period(400, 1_217, 30), Ok(4));
        assert_eq!(interest_for_period(1_000_000, 1_217, 30), Ok(10_002));
        assert_eq!(interest_for_period(1_000_000, 0, 30), Ok(0));
    }

    #[test]
    fn correction_covers_remaining_days_only() {
        let due = 30 * SECONDS_IN_A_DAY;
        let full = interest_correction(due, 0, 1_217, 1_000_000).unwrap();
        let half = interest_correction(due, 15 * SECONDS_IN_A_DAY, 1_217, 1_000_000).unwrap();
        assert_eq!(full, 10_002);
        assert_eq!(half, 5_001);
        assert_eq!(interest_correction(due, due + 1, 1_217, 1_000_000), Ok(0));
    }

    #[test]
    fn overflow_is_reported() {
        let fees = FeeConfig {
            front_loading_fee_flat: u128::MAX,
            front_loading_fee_bps: 1,
            ..config()
        };
        assert_eq!(fees.front_loading_fee(10_000), Err(CreditError::Overflow));
        assert_eq!(bps_of(u128::MAX, 2), Err(CreditError::Overflow));
    }
}
