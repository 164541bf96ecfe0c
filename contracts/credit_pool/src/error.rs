//! Errors raised by the credit engine.
//!
//! Engine functions return [`CreditError`], which carries the offending
//! values. Contract entry points log those values and surface the matching
//! [`ContractError`] code.

use soroban_sdk::{log, Env, Symbol};

use crate::state::Operation;
use crate::types::{ContractError, CreditState};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CreditError {
    /// The operation is undefined for a record in this state.
    InvalidRecordState {
        state: CreditState,
        operation: Operation,
    },
    /// The state does not permit the attempted operation.
    InvalidStateTransition {
        state: CreditState,
        operation: Operation,
    },
    AmountOutOfRange {
        amount: u128,
        min: u128,
        max: u128,
    },
    ApproverRequired,
    PermissionDenied {
        operation: Operation,
    },
    ProtocolPaused,
    PoolNotOn,
    DefaultTriggeredTooEarly {
        missed_periods: u32,
        grace_periods: u32,
    },
    InvalidInterval,
    RateTooHigh {
        rate_bps: u32,
        cap_bps: u32,
    },
    CreditLineExpired,
    Overflow,
}

impl From<CreditError> for ContractError {
    fn from(err: CreditError) -> Self {
        match err {
            CreditError::InvalidRecordState { .. } => ContractError::InvalidRecordState,
            CreditError::InvalidStateTransition { .. } => ContractError::InvalidStateTransition,
            CreditError::AmountOutOfRange { .. } => ContractError::AmountOutOfRange,
            CreditError::ApproverRequired => ContractError::ApproverRequired,
            CreditError::PermissionDenied { .. } => ContractError::PermissionDenied,
            CreditError::ProtocolPaused => ContractError::ProtocolPaused,
            CreditError::PoolNotOn => ContractError::PoolNotOn,
            CreditError::DefaultTriggeredTooEarly { .. } => {
                ContractError::DefaultTriggeredTooEarly
            }
            CreditError::InvalidInterval => ContractError::InvalidInterval,
            CreditError::RateTooHigh { .. } => ContractError::RateTooHigh,
            CreditError::CreditLineExpired => ContractError::CreditLineExpired,
            CreditError::Overflow => ContractError::Overflow,
        }
    }
}

impl CreditError {
    /// Write the error kind and its offending values to the debug log.
    pub fn log(&self, env: &Env) {
        match *self {
            CreditError::InvalidRecordState { state, operation } => log!(
                env,
                "invalid record state",
                state as u32,
                Symbol::new(env, operation.name())
            ),
            CreditError::InvalidStateTransition { state, operation } => log!(
                env,
                "invalid state transition",
                state as u32,
                Symbol::new(env, operation.name())
            ),
            CreditError::AmountOutOfRange { amount, min, max } => {
                log!(env, "amount out of range", amount, min, max)
            }
            CreditError::ApproverRequired => log!(env, "evaluation agent approval required"),
            CreditError::PermissionDenied { operation } => {
                log!(env, "permission denied", Symbol::new(env, operation.name()))
            }
            CreditError::ProtocolPaused => log!(env, "protocol paused"),
            CreditError::PoolNotOn => log!(env, "pool not on"),
            CreditError::DefaultTriggeredTooEarly {
                missed_periods,
                grace_periods,
            } => log!(
                env,
                "default triggered too early",
                missed_periods,
                grace_periods
            ),
            CreditError::InvalidInterval => log!(env, "billing interval must be non-zero"),
            CreditError::RateTooHigh { rate_bps, cap_bps } => {
                log!(env, "rate too high", rate_bps, cap_bps)
            }
            CreditError::CreditLineExpired => log!(env, "credit line reached maturity"),
            CreditError::Overflow => log!(env, "arithmetic overflow"),
        }
    }
}
