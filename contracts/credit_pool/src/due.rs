//! Due calculation: statements, interest, late fees and payoff as of a given
//! instant.
//!
//! A statement bills the interest of a period when the period opens and falls
//! due when it ends. Once a due date has passed, the next statement is issued:
//! an unpaid statement is charged a late fee, its principal and interest roll
//! back into the unbilled base, and its late fees are carried forward without
//! bearing interest.
//!
//! Nothing here mutates a record. Callers apply the returned [`DueInfo`].

use crate::error::CreditError;
use crate::fees::interest_for_period;
use crate::period::{interval_seconds, periods_elapsed, statements_due};
use crate::state::Operation;
use crate::types::{CreditRecord, CreditState, DueInfo, FeeConfig};

/// Obligations of `record` at `now` under `fees`.
///
/// # Errors
/// * `InvalidRecordState` – the record is `Deleted` or `Requested`.
/// * `InvalidInterval` – the record has a zero-length billing period.
/// * `Overflow` – an amount does not fit.
pub fn get_due_info(
    record: &CreditRecord,
    now: u64,
    fees: &FeeConfig,
) -> Result<DueInfo, CreditError> {
    match record.state {
        CreditState::Deleted | CreditState::Requested => {
            return Err(CreditError::InvalidRecordState {
                state: record.state,
                operation: Operation::QueryDue,
            })
        }
        CreditState::Approved | CreditState::Defaulted => return snapshot(record, 0),
        CreditState::GoodStanding | CreditState::Delinquent => {}
    }

    let interval = interval_seconds(record.interval_in_days)?;
    let period_start = record.due_date.saturating_sub(interval);
    let periods_passed = periods_elapsed(period_start, now, record.interval_in_days)?;
    let statements = statements_due(record.due_date, now, record.interval_in_days)?;
    if statements == 0 {
        return snapshot(record, periods_passed);
    }

    let mut bill = Bill::of(record);
    for _ in 0..statements {
        bill.close(fees)?;
        bill.issue(fees, record.apr_in_bps, record.interval_in_days)?;
    }
    let due_date = u64::from(statements)
        .checked_mul(interval)
        .and_then(|span| record.due_date.checked_add(span))
        .ok_or(CreditError::Overflow)?;
    bill.into_due_info(periods_passed, statements, due_date)
}

/// First statement of a freshly drawn line: interest on
/// `record.unbilled_principal` for the period opening at `now`.
pub fn first_statement(
    record: &CreditRecord,
    now: u64,
    fees: &FeeConfig,
) -> Result<DueInfo, CreditError> {
    let interval = interval_seconds(record.interval_in_days)?;
    let mut bill = Bill::of(record);
    bill.issue(fees, record.apr_in_bps, record.interval_in_days)?;
    let due_date = now.checked_add(interval).ok_or(CreditError::Overflow)?;
    bill.into_due_info(0, 1, due_date)
}

impl DueInfo {
    /// Copy the computed obligations onto `record`. State is left to the caller.
    pub fn apply_to(&self, record: &mut CreditRecord) {
        record.unbilled_principal = self.unbilled_principal;
        record.total_due = self.total_due;
        record.fees_and_interest_due = self.fees_and_interest_due;
        record.late_fee_due = self.late_fee_due;
        record.correction = self.correction;
        record.missed_periods = self.missed_periods;
        record.remaining_periods = self.remaining_periods;
        record.due_date = self.due_date;
    }
}

fn snapshot(record: &CreditRecord, periods_passed: u32) -> Result<DueInfo, CreditError> {
    Ok(DueInfo {
        periods_passed,
        statements: 0,
        fees_and_interest_due: record.fees_and_interest_due,
        total_due: record.total_due,
        unbilled_principal: record.unbilled_principal,
        late_fee_due: record.late_fee_due,
        correction: record.correction,
        missed_periods: record.missed_periods,
        remaining_periods: record.remaining_periods,
        due_date: record.due_date,
        new_charges: 0,
        payoff_amount: record.payoff_amount()?,
    })
}

impl CreditRecord {
    /// Amount that settles the line now: principal, billed dues and the
    /// pending interest correction, never below zero.
    pub fn payoff_amount(&self) -> Result<u128, CreditError> {
        payoff(self.unbilled_principal, self.total_due, self.correction)
    }
}

fn payoff(
    unbilled_principal: u128,
    total_due: u128,
    correction: i128,
) -> Result<u128, CreditError> {
    let owed = add(unbilled_principal, total_due)?;
    if correction < 0 {
        Ok(owed.saturating_sub(correction.unsigned_abs()))
    } else {
        add(owed, correction.unsigned_abs())
    }
}

fn add(a: u128, b: u128) -> Result<u128, CreditError> {
    a.checked_add(b).ok_or(CreditError::Overflow)
}

/// Working copy of the billable fields of a record.
struct Bill {
    unbilled_principal: u128,
    total_due: u128,
    fees_and_interest_due: u128,
    late_fee_due: u128,
    correction: i128,
    missed_periods: u32,
    remaining_periods: u32,
    new_charges: u128,
}

impl Bill {
    fn of(record: &CreditRecord) -> Self {
        Bill {
            unbilled_principal: record.unbilled_principal,
            total_due: record.total_due,
            fees_and_interest_due: record.fees_and_interest_due,
            late_fee_due: record.late_fee_due,
            correction: record.correction,
            missed_periods: record.missed_periods,
            remaining_periods: record.remaining_periods,
            new_charges: 0,
        }
    }

    /// Close a statement whose due date has passed.
    fn close(&mut self, fees: &FeeConfig) -> Result<(), CreditError> {
        let carried = self.total_due.saturating_sub(self.late_fee_due);
        if self.total_due > 0 {
            let late_fee = fees.late_fee(add(self.unbilled_principal, carried)?)?;
            self.late_fee_due = add(self.late_fee_due, late_fee)?;
            self.new_charges = add(self.new_charges, late_fee)?;
            self.missed_periods = self.missed_periods.saturating_add(1);
        } else {
            self.missed_periods = 0;
        }
        self.unbilled_principal = add(self.unbilled_principal, carried)?;
        self.total_due = 0;
        self.fees_and_interest_due = 0;
        Ok(())
    }

    /// Issue the statement for the next period.
    fn issue(
        &mut self,
        fees: &FeeConfig,
        apr_in_bps: u32,
        interval_in_days: u32,
    ) -> Result<(), CreditError> {
        if self.remaining_periods == 0 {
            // Past maturity: everything owed is due and no interest accrues.
            let principal_due = core::mem::take(&mut self.unbilled_principal);
            return self.set_due(0, principal_due);
        }

        let interest = interest_for_period(self.unbilled_principal, apr_in_bps, interval_in_days)?;
        let charges = i128::try_from(interest)
            .ok()
            .and_then(|interest| interest.checked_add(self.correction))
            .ok_or(CreditError::Overflow)?;
        let interest_due = if charges < 0 {
            self.correction = charges;
            0
        } else {
            self.correction = 0;
            charges.unsigned_abs()
        };

        self.remaining_periods -= 1;
        let mut principal_due = if self.remaining_periods == 0 {
            self.unbilled_principal
        } else {
            fees.min_principal_payment(self.unbilled_principal)?
        };
        self.unbilled_principal -= principal_due;
        if self.remaining_periods == 0 && self.correction < 0 {
            // Unused prepayment credit settles against the final principal.
            principal_due = principal_due.saturating_sub(self.correction.unsigned_abs());
            self.correction = 0;
        }

        self.new_charges = add(self.new_charges, interest_due)?;
        self.set_due(interest_due, principal_due)
    }

    fn set_due(&mut self, interest_due: u128, principal_due: u128) -> Result<(), CreditError> {
        self.fees_and_interest_due = add(self.late_fee_due, interest_due)?;
        self.total_due = add(self.fees_and_interest_due, principal_due)?;
        Ok(())
    }

    fn into_due_info(
        self,
        periods_passed: u32,
        statements: u32,
        due_date: u64,
    ) -> Result<DueInfo, CreditError> {
        Ok(DueInfo {
            periods_passed,
            statements,
            fees_and_interest_due: self.fees_and_interest_due,
            total_due: self.total_due,
            unbilled_principal: self.unbilled_principal,
            late_fee_due: self.late_fee_due,
            correction: self.correction,
            missed_periods: self.missed_periods,
            remaining_periods: self.remaining_periods,
            due_date,
            new_charges: self.new_charges,
            payoff_amount: payoff(self.unbilled_principal, self.total_due, self.correction)?,
        })
    }
}
