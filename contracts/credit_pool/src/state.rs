//! Credit-line state machine.
//!
//! [`apply_transition`] is the only place a [`CreditRecord`] changes state. It
//! takes the stored record, an event and a [`TransitionContext`], and returns
//! the next record together with a [`Receipt`] of the amounts involved. The
//! input record is never modified, so a failed transition leaves nothing to
//! undo.

use soroban_sdk::Address;

use crate::due::{first_statement, get_due_info};
use crate::error::CreditError;
use crate::fees::{check_rate, interest_correction, MAX_RATE_BPS};
use crate::types::{CreditRecord, CreditState, FeeConfig, PoolSettings, Receipt};

/// Operation names used in errors and logs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operation {
    RequestCredit,
    Approve,
    Invalidate,
    Drawdown,
    Payment,
    Refresh,
    TriggerDefault,
    ChangeLimit,
    ExtendDuration,
    QueryDue,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::RequestCredit => "request_credit",
            Operation::Approve => "approve",
            Operation::Invalidate => "invalidate",
            Operation::Drawdown => "drawdown",
            Operation::Payment => "payment",
            Operation::Refresh => "refresh",
            Operation::TriggerDefault => "trigger_default",
            Operation::ChangeLimit => "change_limit",
            Operation::ExtendDuration => "extend_duration",
            Operation::QueryDue => "query_due",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CreditEvent {
    RequestCredit {
        credit_limit: u128,
        interval_in_days: u32,
        periods: u32,
    },
    Approve {
        credit_limit: u128,
        apr_in_bps: u32,
    },
    Invalidate,
    Drawdown {
        amount: u128,
    },
    Payment {
        amount: u128,
    },
    Refresh,
    TriggerDefault,
    ChangeLimit {
        credit_limit: u128,
    },
    ExtendDuration {
        periods: u32,
    },
}

impl CreditEvent {
    pub fn operation(&self) -> Operation {
        match self {
            CreditEvent::RequestCredit { .. } => Operation::RequestCredit,
            CreditEvent::Approve { .. } => Operation::Approve,
            CreditEvent::Invalidate => Operation::Invalidate,
            CreditEvent::Drawdown { .. } => Operation::Drawdown,
            CreditEvent::Payment { .. } => Operation::Payment,
            CreditEvent::Refresh => Operation::Refresh,
            CreditEvent::TriggerDefault => Operation::TriggerDefault,
            CreditEvent::ChangeLimit { .. } => Operation::ChangeLimit,
            CreditEvent::ExtendDuration { .. } => Operation::ExtendDuration,
        }
    }
}

/// Role and switch lookups consulted by guarded transitions.
pub trait Permissions {
    fn is_evaluation_agent(&self, account: &Address) -> bool;
    fn is_pool_owner(&self, account: &Address) -> bool;
    fn is_protocol_paused(&self) -> bool;
    fn is_pool_enabled(&self) -> bool;
}

/// Everything a transition may read besides the record itself.
pub struct TransitionContext<'a, P: Permissions> {
    /// Account that authorized the call.
    pub caller: &'a Address,
    /// Owner of the record.
    pub borrower: &'a Address,
    pub now: u64,
    pub fees: &'a FeeConfig,
    pub settings: &'a PoolSettings,
    pub permissions: &'a P,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transition {
    pub record: CreditRecord,
    pub receipt: Receipt,
}

impl Transition {
    fn unchanged(record: CreditRecord) -> Self {
        Transition {
            record,
            receipt: Receipt::default(),
        }
    }
}

impl PoolSettings {
    pub fn validate(&self) -> Result<(), CreditError> {
        if self.min_credit_line > self.max_credit_line {
            return Err(CreditError::AmountOutOfRange {
                amount: self.min_credit_line,
                min: 0,
                max: self.max_credit_line,
            });
        }
        check_rate(self.pool_apr_bps, MAX_RATE_BPS)?;
        self.splits.validate()
    }

    pub fn check_credit_limit(&self, credit_limit: u128) -> Result<(), CreditError> {
        if credit_limit < self.min_credit_line || credit_limit > self.max_credit_line {
            return Err(CreditError::AmountOutOfRange {
                amount: credit_limit,
                min: self.min_credit_line,
                max: self.max_credit_line,
            });
        }
        Ok(())
    }
}

/// Apply `event` to `record`.
///
/// `Deleted` records accept only `RequestCredit`; anything else is an
/// `InvalidRecordState`. Other disallowed pairs fail with
/// `InvalidStateTransition`.
pub fn apply_transition<P: Permissions>(
    record: &CreditRecord,
    event: CreditEvent,
    ctx: &TransitionContext<'_, P>,
) -> Result<Transition, CreditError> {
    use CreditState::{Approved, Defaulted, Deleted, Delinquent, GoodStanding, Requested};

    match (record.state, event) {
        (
            Deleted,
            CreditEvent::RequestCredit {
                credit_limit,
                interval_in_days,
                periods,
            },
        ) => request_credit(ctx, credit_limit, interval_in_days, periods),
        (Deleted, event) | (Requested, event @ CreditEvent::Refresh) => {
            Err(CreditError::InvalidRecordState {
                state: record.state,
                operation: event.operation(),
            })
        }
        (
            Requested,
            CreditEvent::Approve {
                credit_limit,
                apr_in_bps,
            },
        ) => approve(record, ctx, credit_limit, apr_in_bps),
        (Requested | Approved, CreditEvent::Invalidate) => invalidate(ctx),
        (Approved | GoodStanding, CreditEvent::Drawdown { amount }) => {
            drawdown(record, ctx, amount)
        }
        (GoodStanding | Delinquent, CreditEvent::Payment { amount }) => {
            make_payment(record, ctx, amount)
        }
        (Approved | GoodStanding | Delinquent | Defaulted, CreditEvent::Refresh) => {
            let (record, income) = refresh(record, ctx.now, ctx.fees)?;
            Ok(Transition {
                record,
                receipt: Receipt {
                    income,
                    ..Receipt::default()
                },
            })
        }
        (GoodStanding | Delinquent, CreditEvent::TriggerDefault) => trigger_default(record, ctx),
        (Approved | GoodStanding | Delinquent, CreditEvent::ChangeLimit { credit_limit }) => {
            change_limit(record, ctx, credit_limit)
        }
        (Approved | GoodStanding | Delinquent, CreditEvent::ExtendDuration { periods }) => {
            extend_duration(record, ctx, periods)
        }
        (state, event) => Err(CreditError::InvalidStateTransition {
            state,
            operation: event.operation(),
        }),
    }
}

fn require_pool_on<P: Permissions>(permissions: &P) -> Result<(), CreditError> {
    if permissions.is_protocol_paused() {
        return Err(CreditError::ProtocolPaused);
    }
    if !permissions.is_pool_enabled() {
        return Err(CreditError::PoolNotOn);
    }
    Ok(())
}

fn require_evaluation_agent<P: Permissions>(
    ctx: &TransitionContext<'_, P>,
    operation: Operation,
) -> Result<(), CreditError> {
    if !ctx.permissions.is_evaluation_agent(ctx.caller) {
        return Err(CreditError::PermissionDenied { operation });
    }
    Ok(())
}

fn require_borrower<P: Permissions>(
    ctx: &TransitionContext<'_, P>,
    operation: Operation,
) -> Result<(), CreditError> {
    if ctx.caller != ctx.borrower {
        return Err(CreditError::PermissionDenied { operation });
    }
    Ok(())
}

/// Bring a drawn line up to `now`. Returns the refreshed record and the
/// charges billed on the way. Other states are returned as they are.
fn refresh(
    record: &CreditRecord,
    now: u64,
    fees: &FeeConfig,
) -> Result<(CreditRecord, u128), CreditError> {
    let mut next = record.clone();
    if !matches!(
        record.state,
        CreditState::GoodStanding | CreditState::Delinquent
    ) {
        return Ok((next, 0));
    }
    let due = get_due_info(record, now, fees)?;
    due.apply_to(&mut next);
    next.state = if next.missed_periods > 0 {
        CreditState::Delinquent
    } else {
        CreditState::GoodStanding
    };
    Ok((next, due.new_charges))
}

fn request_credit<P: Permissions>(
    ctx: &TransitionContext<'_, P>,
    credit_limit: u128,
    interval_in_days: u32,
    periods: u32,
) -> Result<Transition, CreditError> {
    require_borrower(ctx, Operation::RequestCredit)?;
    require_pool_on(ctx.permissions)?;
    ctx.settings.check_credit_limit(credit_limit)?;
    if interval_in_days == 0 {
        return Err(CreditError::InvalidInterval);
    }
    if periods == 0 {
        return Err(CreditError::CreditLineExpired);
    }

    Ok(Transition::unchanged(CreditRecord {
        credit_limit,
        remaining_periods: periods,
        apr_in_bps: ctx.settings.pool_apr_bps,
        interval_in_days,
        state: CreditState::Requested,
        ..CreditRecord::default()
    }))
}

fn approve<P: Permissions>(
    record: &CreditRecord,
    ctx: &TransitionContext<'_, P>,
    credit_limit: u128,
    apr_in_bps: u32,
) -> Result<Transition, CreditError> {
    if !ctx.permissions.is_evaluation_agent(ctx.caller) {
        return Err(CreditError::ApproverRequired);
    }
    require_pool_on(ctx.permissions)?;
    ctx.settings.check_credit_limit(credit_limit)?;
    check_rate(apr_in_bps, MAX_RATE_BPS)?;

    Ok(Transition::unchanged(CreditRecord {
        credit_limit,
        apr_in_bps,
        state: CreditState::Approved,
        ..record.clone()
    }))
}

fn invalidate<P: Permissions>(ctx: &TransitionContext<'_, P>) -> Result<Transition, CreditError> {
    require_evaluation_agent(ctx, Operation::Invalidate)?;
    Ok(Transition::unchanged(CreditRecord::default()))
}

/// Draws against the line. The statement for the last period is issued with
/// the whole remaining principal, so once it is out the line is
/// `CreditLineExpired` for further draws until the term is extended.
fn drawdown<P: Permissions>(
    record: &CreditRecord,
    ctx: &TransitionContext<'_, P>,
    amount: u128,
) -> Result<Transition, CreditError> {
    require_borrower(ctx, Operation::Drawdown)?;
    require_pool_on(ctx.permissions)?;

    let (mut next, charges) = refresh(record, ctx.now, ctx.fees)?;
    if next.state == CreditState::Delinquent {
        return Err(CreditError::InvalidStateTransition {
            state: next.state,
            operation: Operation::Drawdown,
        });
    }
    if next.remaining_periods == 0 {
        return Err(CreditError::CreditLineExpired);
    }
    let available = next
        .credit_limit
        .saturating_sub(next.principal_outstanding());
    if amount == 0 || amount > available {
        return Err(CreditError::AmountOutOfRange {
            amount,
            min: 1,
            max: available,
        });
    }
    let (borrower_amount, fee) = ctx.fees.borrowing_split(amount)?;

    next.unbilled_principal = next
        .unbilled_principal
        .checked_add(amount)
        .ok_or(CreditError::Overflow)?;
    let interest = if next.state == CreditState::Approved {
        let statement = first_statement(&next, ctx.now, ctx.fees)?;
        statement.apply_to(&mut next);
        next.state = CreditState::GoodStanding;
        statement.new_charges
    } else {
        // Mid-period draw: the rest of this period's interest is billed next statement.
        let owed = interest_correction(next.due_date, ctx.now, next.apr_in_bps, amount)?;
        next.correction = i128::try_from(owed)
            .ok()
            .and_then(|owed| next.correction.checked_add(owed))
            .ok_or(CreditError::Overflow)?;
        0
    };

    let income = fee
        .checked_add(charges)
        .and_then(|income| income.checked_add(interest))
        .ok_or(CreditError::Overflow)?;
    Ok(Transition {
        record: next,
        receipt: Receipt {
            borrower_amount,
            income,
            ..Receipt::default()
        },
    })
}

/// Payments settle late fees, then interest, then billed principal. Anything
/// left prepays unbilled principal and earns an interest credit for the rest
/// of the period. Paying the full payoff amount, pending correction included,
/// deletes the line.
fn make_payment<P: Permissions>(
    record: &CreditRecord,
    ctx: &TransitionContext<'_, P>,
    amount: u128,
) -> Result<Transition, CreditError> {
    require_pool_on(ctx.permissions)?;
    if amount == 0 {
        return Err(CreditError::AmountOutOfRange {
            amount,
            min: 1,
            max: u128::MAX,
        });
    }

    let (mut next, income) = refresh(record, ctx.now, ctx.fees)?;
    let payoff = next.payoff_amount()?;
    if amount >= payoff {
        let owed = next
            .unbilled_principal
            .checked_add(next.total_due)
            .ok_or(CreditError::Overflow)?;
        // A pending charge is income now; a pending credit is handed back.
        let income = income
            .checked_add(payoff.saturating_sub(owed))
            .ok_or(CreditError::Overflow)?;
        return Ok(Transition {
            record: CreditRecord::default(),
            receipt: Receipt {
                amount_collected: payoff,
                principal_paid: next.principal_outstanding(),
                income,
                rebate: owed.saturating_sub(payoff),
                paid_off: true,
                ..Receipt::default()
            },
        });
    }

    let to_fees = amount.min(next.fees_and_interest_due);
    next.late_fee_due = next.late_fee_due.saturating_sub(to_fees);
    next.fees_and_interest_due -= to_fees;
    next.total_due -= to_fees;
    let mut left = amount - to_fees;

    let billed_principal = left.min(next.total_due);
    next.total_due -= billed_principal;
    left -= billed_principal;

    let prepaid = left.min(next.unbilled_principal);
    if prepaid > 0 {
        next.unbilled_principal -= prepaid;
        let credit = interest_correction(next.due_date, ctx.now, next.apr_in_bps, prepaid)?;
        next.correction = i128::try_from(credit)
            .ok()
            .and_then(|credit| next.correction.checked_sub(credit))
            .ok_or(CreditError::Overflow)?;
    }

    if next.total_due == 0 {
        next.missed_periods = 0;
        next.state = CreditState::GoodStanding;
    }

    Ok(Transition {
        record: next,
        receipt: Receipt {
            amount_collected: amount,
            principal_paid: billed_principal + prepaid,
            income,
            ..Receipt::default()
        },
    })
}

fn trigger_default<P: Permissions>(
    record: &CreditRecord,
    ctx: &TransitionContext<'_, P>,
) -> Result<Transition, CreditError> {
    require_evaluation_agent(ctx, Operation::TriggerDefault)?;
    require_pool_on(ctx.permissions)?;

    let (mut next, income) = refresh(record, ctx.now, ctx.fees)?;
    let grace_periods = ctx.settings.default_grace_periods;
    if next.missed_periods <= grace_periods {
        return Err(CreditError::DefaultTriggeredTooEarly {
            missed_periods: next.missed_periods,
            grace_periods,
        });
    }

    let loss = next
        .unbilled_principal
        .checked_add(next.total_due)
        .ok_or(CreditError::Overflow)?;
    next.default_amount = loss;
    next.state = CreditState::Defaulted;
    Ok(Transition {
        record: next,
        receipt: Receipt {
            income,
            loss,
            ..Receipt::default()
        },
    })
}

/// The evaluation agent may set any limit; the borrower may only lower it.
fn change_limit<P: Permissions>(
    record: &CreditRecord,
    ctx: &TransitionContext<'_, P>,
    credit_limit: u128,
) -> Result<Transition, CreditError> {
    let lowering = ctx.caller == ctx.borrower && credit_limit <= record.credit_limit;
    if !lowering {
        require_evaluation_agent(ctx, Operation::ChangeLimit)?;
    }

    let outstanding = record.principal_outstanding();
    let max = ctx.settings.max_credit_line;
    if credit_limit < outstanding || credit_limit > max {
        return Err(CreditError::AmountOutOfRange {
            amount: credit_limit,
            min: outstanding,
            max,
        });
    }

    if credit_limit == 0 && !record.has_balance() {
        return Ok(Transition::unchanged(CreditRecord::default()));
    }
    Ok(Transition::unchanged(CreditRecord {
        credit_limit,
        ..record.clone()
    }))
}

fn extend_duration<P: Permissions>(
    record: &CreditRecord,
    ctx: &TransitionContext<'_, P>,
    periods: u32,
) -> Result<Transition, CreditError> {
    require_evaluation_agent(ctx, Operation::ExtendDuration)?;
    let remaining_periods = record
        .remaining_periods
        .checked_add(periods)
        .ok_or(CreditError::Overflow)?;
    Ok(Transition::unchanged(CreditRecord {
        remaining_periods,
        ..record.clone()
    }))
}
