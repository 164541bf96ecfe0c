//! Conversion of elapsed ledger time into whole billing periods.

use crate::error::CreditError;

pub const SECONDS_IN_A_DAY: u64 = 86_400;
pub const DAYS_IN_A_YEAR: u64 = 365;
pub const SECONDS_IN_A_YEAR: u64 = DAYS_IN_A_YEAR * SECONDS_IN_A_DAY;

/// Length of a billing period in seconds.
pub fn interval_seconds(interval_in_days: u32) -> Result<u64, CreditError> {
    if interval_in_days == 0 {
        return Err(CreditError::InvalidInterval);
    }
    Ok(u64::from(interval_in_days) * SECONDS_IN_A_DAY)
}

/// Whole periods fully elapsed between `last_due_date` and `now`.
/// Zero when `now` is before `last_due_date`.
pub fn periods_elapsed(
    last_due_date: u64,
    now: u64,
    interval_in_days: u32,
) -> Result<u32, CreditError> {
    let interval = interval_seconds(interval_in_days)?;
    if now < last_due_date {
        return Ok(0);
    }
    Ok(saturate((now - last_due_date) / interval))
}

/// Number of due dates strictly passed, counting `due_date` itself and every
/// period boundary after it. A statement is still current on its due date.
pub fn statements_due(due_date: u64, now: u64, interval_in_days: u32) -> Result<u32, CreditError> {
    let interval = interval_seconds(interval_in_days)?;
    if now <= due_date {
        return Ok(0);
    }
    Ok(saturate((now - due_date).div_ceil(interval)))
}

fn saturate(periods: u64) -> u32 {
    u32::try_from(periods).unwrap_or(u32::MAX)
}
