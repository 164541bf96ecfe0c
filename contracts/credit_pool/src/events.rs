//! Event types and topic constants for the credit pool contract.
//! Stable event schemas for indexing and analytics.

use soroban_sdk::{contracttype, symbol_short, Address, Env, Symbol};

use crate::income::{IncomeAllocation, IncomeParty, LossAllocation};
use crate::types::{CreditState, FeeConfig, PoolSettings};

/// Event emitted when a credit line changes outside of drawdowns and payments
/// (requested, approved, invalid, limit, extended, deleted).
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CreditLineEvent {
    pub event_type: Symbol,
    pub borrower: Address,
    pub state: CreditState,
    pub credit_limit: u128,
    pub apr_in_bps: u32,
    pub remaining_periods: u32,
}

/// Event emitted on a drawdown.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DrawdownEvent {
    pub borrower: Address,
    pub amount: u128,
    /// Amount owed to the borrower after the front-loading fee.
    pub borrower_amount: u128,
    pub total_due: u128,
    pub due_date: u64,
    pub timestamp: u64,
}

/// Event emitted when a payment is applied.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PaymentEvent {
    pub borrower: Address,
    pub amount: u128,
    pub amount_collected: u128,
    pub principal_paid: u128,
    pub total_due: u128,
    pub paid_off: bool,
    pub timestamp: u64,
}

/// Event emitted when a refresh issues new statements.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StatementEvent {
    pub borrower: Address,
    pub state: CreditState,
    pub total_due: u128,
    pub fees_and_interest_due: u128,
    pub missed_periods: u32,
    pub due_date: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DefaultEvent {
    pub borrower: Address,
    pub loss: u128,
    pub missed_periods: u32,
    pub allocation: LossAllocation,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClaimEvent {
    pub party: IncomeParty,
    pub recipient: Address,
    pub amount: u128,
}

/// Publish a credit line lifecycle event.
pub fn publish_credit_line_event(env: &Env, topic: (Symbol, Symbol), event: CreditLineEvent) {
    env.events().publish(topic, event);
}

pub fn publish_drawdown_event(env: &Env, event: DrawdownEvent) {
    env.events()
        .publish((symbol_short!("credit"), symbol_short!("drawdown")), event);
}

pub fn publish_payment_event(env: &Env, event: PaymentEvent) {
    env.events()
        .publish((symbol_short!("credit"), symbol_short!("payment")), event);
}

pub fn publish_statement_event(env: &Env, event: StatementEvent) {
    env.events()
        .publish((symbol_short!("credit"), symbol_short!("statement")), event);
}

pub fn publish_default_event(env: &Env, event: DefaultEvent) {
    env.events()
        .publish((symbol_short!("credit"), symbol_short!("default")), event);
}

/// Publish how a piece of income was split.
pub fn publish_income_event(env: &Env, allocation: IncomeAllocation) {
    env.events()
        .publish((symbol_short!("pool"), symbol_short!("income")), allocation);
}

pub fn publish_claim_event(env: &Env, event: ClaimEvent) {
    env.events()
        .publish((symbol_short!("pool"), symbol_short!("claim")), event);
}

pub fn publish_deposit_event(env: &Env, lender: Address, amount: u128) {
    env.events()
        .publish((symbol_short!("pool"), symbol_short!("deposit")), (lender, amount));
}

pub fn publish_fee_config_updated(env: &Env, config: FeeConfig) {
    env.events()
        .publish((symbol_short!("pool"), symbol_short!("fees")), config);
}

pub fn publish_pool_settings_updated(env: &Env, settings: PoolSettings) {
    env.events()
        .publish((symbol_short!("pool"), symbol_short!("settings")), settings);
}

/// Publish a pause or enable switch change.
pub fn publish_switch_event(env: &Env, switch: Symbol, on: bool) {
    env.events().publish((symbol_short!("pool"), switch), on);
}
