//! Core data types for the credit pool contract.

use soroban_sdk::contracttype;

/// Lifecycle state of a borrower's credit line.
#[contracttype]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CreditState {
    #[default]
    Deleted = 0,
    Requested = 1,
    Approved = 2,
    GoodStanding = 3,
    Delinquent = 4,
    Defaulted = 5,
}

#[soroban_sdk::contracterror]
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum ContractError {
    InvalidRecordState = 1,
    InvalidStateTransition = 2,
    AmountOutOfRange = 3,
    ApproverRequired = 4,
    PermissionDenied = 5,
    ProtocolPaused = 6,
    PoolNotOn = 7,
    DefaultTriggeredTooEarly = 8,
    InvalidInterval = 9,
    RateTooHigh = 10,
    CreditLineExpired = 11,
    Overflow = 12,
    NotInitialized = 13,
    AlreadyInitialized = 14,
}

/// Stored credit record for a borrower. All amounts are in the pool asset's
/// smallest unit, timestamps are ledger seconds.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CreditRecord {
    pub credit_limit: u128,
    /// Principal not yet placed on a statement. Unpaid interest rolled over
    /// from a missed statement is capitalized here.
    pub unbilled_principal: u128,
    /// Amount owed on the current statement, principal portion included.
    pub total_due: u128,
    /// Interest and fee component of `total_due`.
    pub fees_and_interest_due: u128,
    /// Late fees carried inside `fees_and_interest_due`. They accumulate
    /// across missed statements but never bear interest.
    pub late_fee_due: u128,
    pub missed_periods: u32,
    /// Statements left in the term. Zero once the final statement is issued.
    pub remaining_periods: u32,
    /// Due date of the current statement.
    pub due_date: u64,
    /// Signed interest carry from mid-period drawdowns and prepayments,
    /// settled on the next statement.
    pub correction: i128,
    pub apr_in_bps: u32,
    pub interval_in_days: u32,
    /// Principal written off when the line defaulted.
    pub default_amount: u128,
    pub state: CreditState,
}

impl CreditRecord {
    /// Principal still owed: unbilled plus the principal portion of the statement.
    pub fn principal_outstanding(&self) -> u128 {
        self.unbilled_principal
            .saturating_add(self.total_due.saturating_sub(self.fees_and_interest_due))
    }

    pub fn has_balance(&self) -> bool {
        self.unbilled_principal > 0 || self.total_due > 0
    }
}

/// Fee parameters set by the pool owner. Read on every calculation.
///
/// * `front_loading_fee_flat` / `front_loading_fee_bps` – charged on each drawdown.
/// * `late_fee_flat` / `late_fee_bps` – charged once per missed statement.
/// * `min_principal_rate_bps` – share of unbilled principal billed each period,
///   capped at 5000 bps.
#[contracttype]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FeeConfig {
    pub front_loading_fee_flat: u128,
    pub front_loading_fee_bps: u32,
    pub late_fee_flat: u128,
    pub late_fee_bps: u32,
    pub min_principal_rate_bps: u32,
}

/// Income shares, each in basis points of the gross amount. The remainder
/// goes to pool liquidity.
#[contracttype]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct IncomeSplits {
    pub protocol_bps: u32,
    pub ea_bps: u32,
    pub pool_owner_bps: u32,
}

/// Pool-level lending policy.
#[contracttype]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PoolSettings {
    /// APR given to new credit requests until the evaluation agent sets one.
    pub pool_apr_bps: u32,
    pub min_credit_line: u128,
    pub max_credit_line: u128,
    /// Missed statements tolerated before a default may be triggered.
    pub default_grace_periods: u32,
    pub splits: IncomeSplits,
}

/// Obligations of a credit record as of a given instant.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DueInfo {
    /// Whole billing periods elapsed since the current statement's period began.
    pub periods_passed: u32,
    /// Statements generated by this calculation (due dates strictly passed).
    pub statements: u32,
    pub fees_and_interest_due: u128,
    pub total_due: u128,
    pub unbilled_principal: u128,
    pub late_fee_due: u128,
    pub correction: i128,
    pub missed_periods: u32,
    pub remaining_periods: u32,
    pub due_date: u64,
    /// Charges billed by the generated statements (interest and late fees).
    pub new_charges: u128,
    pub payoff_amount: u128,
}

/// Amounts produced by a credit transition, handed to the income ledger and
/// to the custody layer.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Receipt {
    /// Amount the borrower receives on drawdown, net of the front-loading fee.
    pub borrower_amount: u128,
    pub amount_collected: u128,
    pub principal_paid: u128,
    /// Income recognized by the transition.
    pub income: u128,
    /// Balance written off by a default.
    pub loss: u128,
    /// Interest credit returned on payoff, reversing income already recognized.
    pub rebate: u128,
    pub paid_off: bool,
}
