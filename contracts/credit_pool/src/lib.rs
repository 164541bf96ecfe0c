#![no_std]

//! Creditra credit pool contract: credit-line lifecycle, due calculation and
//! income distribution for a pooled lending market.
//!
//! The pool does not hold or move tokens. Drawdowns, payments, deposits and
//! income claims are recorded in contract state and published as events; a
//! custody layer settles the transfers.
//!
//! The calculation engine lives in plain modules ([`period`], [`fees`], [`due`],
//! [`state`], [`income`]) that never touch storage. The contract loads the
//! record and configuration, runs one transition and writes the result back.

pub mod due;
pub mod error;
mod events;
pub mod fees;
pub mod income;
pub mod period;
pub mod state;
pub mod types;

use soroban_sdk::{contract, contractimpl, log, symbol_short, Address, Env, Symbol};

use error::CreditError;
use events::{
    publish_claim_event, publish_credit_line_event, publish_default_event,
    publish_deposit_event, publish_drawdown_event, publish_fee_config_updated,
    publish_income_event, publish_payment_event, publish_pool_settings_updated,
    publish_statement_event, publish_switch_event, ClaimEvent, CreditLineEvent, DefaultEvent,
    DrawdownEvent, PaymentEvent, StatementEvent,
};
use income::{distribute_income, distribute_loss, IncomeParty, LossAllocation, PoolLedger};
use state::{apply_transition, CreditEvent, Permissions, Transition, TransitionContext};
use types::{ContractError, CreditRecord, CreditState, DueInfo, FeeConfig, PoolSettings, Receipt};

/// Instance storage key for the protocol admin.
fn admin_key(env: &Env) -> Symbol {
    Symbol::new(env, "admin")
}

/// Instance storage key for the pool owner.
fn pool_owner_key(env: &Env) -> Symbol {
    Symbol::new(env, "pool_owner")
}

/// Instance storage key for the evaluation agent.
fn ea_key(env: &Env) -> Symbol {
    Symbol::new(env, "ea")
}

fn fee_config_key(env: &Env) -> Symbol {
    Symbol::new(env, "fee_config")
}

fn pool_settings_key(env: &Env) -> Symbol {
    Symbol::new(env, "settings")
}

fn paused_key(env: &Env) -> Symbol {
    Symbol::new(env, "paused")
}

fn enabled_key(env: &Env) -> Symbol {
    Symbol::new(env, "enabled")
}

fn ledger_key(env: &Env) -> Symbol {
    Symbol::new(env, "ledger")
}

fn require_role(env: &Env, key: &Symbol) -> Result<Address, ContractError> {
    env.storage()
        .instance()
        .get(key)
        .ok_or(ContractError::NotInitialized)
}

fn require_admin_auth(env: &Env) -> Result<Address, ContractError> {
    let admin = require_role(env, &admin_key(env))?;
    admin.require_auth();
    Ok(admin)
}

fn require_pool_owner_auth(env: &Env) -> Result<Address, ContractError> {
    let owner = require_role(env, &pool_owner_key(env))?;
    owner.require_auth();
    Ok(owner)
}

fn load_fee_config(env: &Env) -> Result<FeeConfig, ContractError> {
    env.storage()
        .instance()
        .get(&fee_config_key(env))
        .ok_or(ContractError::NotInitialized)
}

fn load_pool_settings(env: &Env) -> Result<PoolSettings, ContractError> {
    env.storage()
        .instance()
        .get(&pool_settings_key(env))
        .ok_or(ContractError::NotInitialized)
}

fn load_ledger(env: &Env) -> PoolLedger {
    env.storage()
        .instance()
        .get(&ledger_key(env))
        .unwrap_or_default()
}

fn save_ledger(env: &Env, ledger: &PoolLedger) {
    env.storage().instance().set(&ledger_key(env), ledger);
}

fn load_record(env: &Env, borrower: &Address) -> CreditRecord {
    env.storage()
        .persistent()
        .get(borrower)
        .unwrap_or_default()
}

/// Deleted records are dropped from storage; reads fall back to the zeroed default.
fn store_record(env: &Env, borrower: &Address, record: &CreditRecord) {
    if record.state == CreditState::Deleted {
        env.storage().persistent().remove(borrower);
    } else {
        env.storage().persistent().set(borrower, record);
    }
}

/// Log a rejected operation and convert it to its contract error code.
fn reject(env: &Env, err: CreditError) -> ContractError {
    err.log(env);
    err.into()
}

/// Roles and switches as stored in instance storage.
struct StoredRoles<'a> {
    env: &'a Env,
}

impl StoredRoles<'_> {
    fn holds(&self, key: &Symbol, account: &Address) -> bool {
        self.env
            .storage()
            .instance()
            .get::<Symbol, Address>(key)
            .is_some_and(|holder| holder == *account)
    }

    fn is_admin(&self, account: &Address) -> bool {
        self.holds(&admin_key(self.env), account)
    }
}

impl Permissions for StoredRoles<'_> {
    fn is_evaluation_agent(&self, account: &Address) -> bool {
        self.holds(&ea_key(self.env), account)
    }

    fn is_pool_owner(&self, account: &Address) -> bool {
        self.holds(&pool_owner_key(self.env), account)
    }

    fn is_protocol_paused(&self) -> bool {
        self.env
            .storage()
            .instance()
            .get(&paused_key(self.env))
            .unwrap_or(false)
    }

    fn is_pool_enabled(&self) -> bool {
        self.env
            .storage()
            .instance()
            .get(&enabled_key(self.env))
            .unwrap_or(false)
    }
}

/// Outcome of one persisted transition.
struct Settled {
    before: CreditRecord,
    transition: Transition,
    loss: LossAllocation,
}

/// Run `event` against the borrower's record, book income and losses on the
/// pool ledger, then persist both. Nothing is written on error.
fn execute(
    env: &Env,
    caller: &Address,
    borrower: &Address,
    event: CreditEvent,
) -> Result<Settled, ContractError> {
    let fees = load_fee_config(env)?;
    let settings = load_pool_settings(env)?;
    let before = load_record(env, borrower);
    let roles = StoredRoles { env };
    let ctx = TransitionContext {
        caller,
        borrower,
        now: env.ledger().timestamp(),
        fees: &fees,
        settings: &settings,
        permissions: &roles,
    };
    let transition = apply_transition(&before, event, &ctx).map_err(|err| reject(env, err))?;

    let mut ledger = load_ledger(env);
    let receipt = &transition.receipt;
    let income = if receipt.income > 0 {
        let allocation =
            distribute_income(receipt.income, &settings.splits).map_err(|err| reject(env, err))?;
        ledger
            .record_income(&allocation)
            .map_err(|err| reject(env, err))?;
        Some(allocation)
    } else {
        None
    };
    let loss = if receipt.loss > 0 {
        let allocation = distribute_loss(receipt.loss, &settings.splits, &ledger)
            .map_err(|err| reject(env, err))?;
        ledger
            .record_loss(&allocation)
            .map_err(|err| reject(env, err))?;
        allocation
    } else {
        LossAllocation::default()
    };
    if receipt.rebate > 0 {
        let allocation = distribute_loss(receipt.rebate, &settings.splits, &ledger)
            .map_err(|err| reject(env, err))?;
        ledger.record_rebate(&allocation);
    }

    store_record(env, borrower, &transition.record);
    save_ledger(env, &ledger);
    if let Some(allocation) = income {
        publish_income_event(env, allocation);
    }
    Ok(Settled {
        before,
        transition,
        loss,
    })
}

fn publish_line(env: &Env, action: Symbol, borrower: &Address, record: &CreditRecord) {
    publish_credit_line_event(
        env,
        (symbol_short!("credit"), action.clone()),
        CreditLineEvent {
            event_type: action,
            borrower: borrower.clone(),
            state: record.state,
            credit_limit: record.credit_limit,
            apr_in_bps: record.apr_in_bps,
            remaining_periods: record.remaining_periods,
        },
    );
}

#[contract]
pub struct CreditPool;

#[contractimpl]
impl CreditPool {
    /// Initialize roles and pool configuration. The pool starts enabled and unpaused.
    ///
    /// # Errors
    /// * `AlreadyInitialized` – called twice.
    /// * `RateTooHigh` / `AmountOutOfRange` – invalid `fees` or `settings`.
    pub fn init(
        env: Env,
        admin: Address,
        pool_owner: Address,
        evaluation_agent: Address,
        fees: FeeConfig,
        settings: PoolSettings,
    ) -> Result<(), ContractError> {
        let instance = env.storage().instance();
        if instance.has(&admin_key(&env)) {
            return Err(ContractError::AlreadyInitialized);
        }
        fees.validate().map_err(|err| reject(&env, err))?;
        settings.validate().map_err(|err| reject(&env, err))?;

        instance.set(&admin_key(&env), &admin);
        instance.set(&pool_owner_key(&env), &pool_owner);
        instance.set(&ea_key(&env), &evaluation_agent);
        instance.set(&fee_config_key(&env), &fees);
        instance.set(&pool_settings_key(&env), &settings);
        instance.set(&paused_key(&env), &false);
        instance.set(&enabled_key(&env), &true);
        instance.set(&ledger_key(&env), &PoolLedger::default());
        Ok(())
    }

    /// Replace the fee configuration (pool owner). Applies to every later calculation.
    pub fn set_fee_config(env: Env, fees: FeeConfig) -> Result<(), ContractError> {
        require_pool_owner_auth(&env)?;
        fees.validate().map_err(|err| reject(&env, err))?;
        env.storage().instance().set(&fee_config_key(&env), &fees);
        publish_fee_config_updated(&env, fees);
        Ok(())
    }

    /// Replace the pool settings (pool owner).
    pub fn set_pool_settings(env: Env, settings: PoolSettings) -> Result<(), ContractError> {
        require_pool_owner_auth(&env)?;
        settings.validate().map_err(|err| reject(&env, err))?;
        env.storage()
            .instance()
            .set(&pool_settings_key(&env), &settings);
        publish_pool_settings_updated(&env, settings);
        Ok(())
    }

    /// Appoint a new evaluation agent (pool owner).
    pub fn set_evaluation_agent(env: Env, evaluation_agent: Address) -> Result<(), ContractError> {
        require_pool_owner_auth(&env)?;
        env.storage()
            .instance()
            .set(&ea_key(&env), &evaluation_agent);
        Ok(())
    }

    /// Pause or resume the protocol (admin).
    pub fn set_protocol_paused(env: Env, paused: bool) -> Result<(), ContractError> {
        require_admin_auth(&env)?;
        env.storage().instance().set(&paused_key(&env), &paused);
        publish_switch_event(&env, symbol_short!("paused"), paused);
        Ok(())
    }

    /// Turn the pool on or off (pool owner).
    pub fn set_pool_enabled(env: Env, enabled: bool) -> Result<(), ContractError> {
        require_pool_owner_auth(&env)?;
        env.storage().instance().set(&enabled_key(&env), &enabled);
        publish_switch_event(&env, symbol_short!("enabled"), enabled);
        Ok(())
    }

    /// Record lender liquidity.
    pub fn deposit(env: Env, lender: Address, amount: u128) -> Result<(), ContractError> {
        lender.require_auth();
        if amount == 0 {
            return Err(reject(
                &env,
                CreditError::AmountOutOfRange {
                    amount,
                    min: 1,
                    max: u128::MAX,
                },
            ));
        }
        let mut ledger = load_ledger(&env);
        ledger.deposit(amount).map_err(|err| reject(&env, err))?;
        save_ledger(&env, &ledger);
        publish_deposit_event(&env, lender, amount);
        Ok(())
    }

    /// Request a credit line. The line starts at the pool APR until approved.
    pub fn request_credit(
        env: Env,
        borrower: Address,
        credit_limit: u128,
        interval_in_days: u32,
        periods: u32,
    ) -> Result<CreditRecord, ContractError> {
        borrower.require_auth();
        let settled = execute(
            &env,
            &borrower,
            &borrower,
            CreditEvent::RequestCredit {
                credit_limit,
                interval_in_days,
                periods,
            },
        )?;
        let record = settled.transition.record;
        publish_line(&env, symbol_short!("requested"), &borrower, &record);
        Ok(record)
    }

    /// Approve a requested line with its final limit and APR (evaluation agent).
    pub fn approve_credit(
        env: Env,
        evaluation_agent: Address,
        borrower: Address,
        credit_limit: u128,
        apr_in_bps: u32,
    ) -> Result<CreditRecord, ContractError> {
        evaluation_agent.require_auth();
        let settled = execute(
            &env,
            &evaluation_agent,
            &borrower,
            CreditEvent::Approve {
                credit_limit,
                apr_in_bps,
            },
        )?;
        let record = settled.transition.record;
        publish_line(&env, symbol_short!("approved"), &borrower, &record);
        Ok(record)
    }

    /// Drop a line that has not been drawn (evaluation agent).
    pub fn invalidate_credit(
        env: Env,
        evaluation_agent: Address,
        borrower: Address,
    ) -> Result<(), ContractError> {
        evaluation_agent.require_auth();
        let settled = execute(&env, &evaluation_agent, &borrower, CreditEvent::Invalidate)?;
        publish_line(&env, symbol_short!("invalid"), &borrower, &settled.before);
        Ok(())
    }

    /// Change a credit limit. The evaluation agent may raise or lower it, the
    /// borrower may only lower it. Lowering an unused line to zero deletes it.
    pub fn change_credit_limit(
        env: Env,
        caller: Address,
        borrower: Address,
        credit_limit: u128,
    ) -> Result<CreditRecord, ContractError> {
        caller.require_auth();
        let settled = execute(
            &env,
            &caller,
            &borrower,
            CreditEvent::ChangeLimit { credit_limit },
        )?;
        let record = settled.transition.record;
        let action = if record.state == CreditState::Deleted {
            symbol_short!("deleted")
        } else {
            symbol_short!("limit")
        };
        publish_line(&env, action, &borrower, &record);
        Ok(record)
    }

    /// Add billing periods to a line's term (evaluation agent).
    pub fn extend_credit_duration(
        env: Env,
        evaluation_agent: Address,
        borrower: Address,
        periods: u32,
    ) -> Result<CreditRecord, ContractError> {
        evaluation_agent.require_auth();
        let settled = execute(
            &env,
            &evaluation_agent,
            &borrower,
            CreditEvent::ExtendDuration { periods },
        )?;
        let record = settled.transition.record;
        publish_line(&env, symbol_short!("extended"), &borrower, &record);
        Ok(record)
    }

    /// Draw `amount` against the line. Returns the amount owed to the borrower
    /// after the front-loading fee.
    pub fn drawdown(env: Env, borrower: Address, amount: u128) -> Result<u128, ContractError> {
        borrower.require_auth();
        let settled = execute(&env, &borrower, &borrower, CreditEvent::Drawdown { amount })?;
        let record = &settled.transition.record;
        let borrower_amount = settled.transition.receipt.borrower_amount;
        publish_drawdown_event(
            &env,
            DrawdownEvent {
                borrower: borrower.clone(),
                amount,
                borrower_amount,
                total_due: record.total_due,
                due_date: record.due_date,
                timestamp: env.ledger().timestamp(),
            },
        );
        Ok(borrower_amount)
    }

    /// Apply a payment from `payer` to the borrower's line. Paying at least the
    /// payoff amount closes the line; only the payoff amount is collected.
    pub fn make_payment(
        env: Env,
        payer: Address,
        borrower: Address,
        amount: u128,
    ) -> Result<Receipt, ContractError> {
        payer.require_auth();
        let settled = execute(&env, &payer, &borrower, CreditEvent::Payment { amount })?;
        let receipt = settled.transition.receipt;
        publish_payment_event(
            &env,
            PaymentEvent {
                borrower: borrower.clone(),
                amount,
                amount_collected: receipt.amount_collected,
                principal_paid: receipt.principal_paid,
                total_due: settled.transition.record.total_due,
                paid_off: receipt.paid_off,
                timestamp: env.ledger().timestamp(),
            },
        );
        Ok(receipt)
    }

    /// Issue any statements that have come due and update the line's standing.
    /// Callable by anyone.
    pub fn refresh_account(env: Env, borrower: Address) -> Result<CreditRecord, ContractError> {
        let settled = execute(&env, &borrower, &borrower, CreditEvent::Refresh)?;
        let record = settled.transition.record;
        if record.due_date != settled.before.due_date || record.state != settled.before.state {
            publish_statement_event(
                &env,
                StatementEvent {
                    borrower: borrower.clone(),
                    state: record.state,
                    total_due: record.total_due,
                    fees_and_interest_due: record.fees_and_interest_due,
                    missed_periods: record.missed_periods,
                    due_date: record.due_date,
                },
            );
        }
        Ok(record)
    }

    /// Default a line whose missed statements exceed the grace periods
    /// (evaluation agent). Returns the amount written off.
    pub fn trigger_default(
        env: Env,
        evaluation_agent: Address,
        borrower: Address,
    ) -> Result<u128, ContractError> {
        evaluation_agent.require_auth();
        let settled = execute(&env, &evaluation_agent, &borrower, CreditEvent::TriggerDefault)?;
        let loss = settled.transition.receipt.loss;
        publish_default_event(
            &env,
            DefaultEvent {
                borrower: borrower.clone(),
                loss,
                missed_periods: settled.transition.record.missed_periods,
                allocation: settled.loss,
                timestamp: env.ledger().timestamp(),
            },
        );
        Ok(loss)
    }

    /// Withdraw the income accrued to `party`. The recipient must hold the
    /// matching role: admin for the protocol share.
    /// A claim with nothing accrued returns 0 and publishes no event.
    pub fn claim_income(
        env: Env,
        party: IncomeParty,
        recipient: Address,
    ) -> Result<u128, ContractError> {
        recipient.require_auth();
        let roles = StoredRoles { env: &env };
        let entitled = match party {
            IncomeParty::Protocol => roles.is_admin(&recipient),
            IncomeParty::EvaluationAgent => roles.is_evaluation_agent(&recipient),
            IncomeParty::PoolOwner => roles.is_pool_owner(&recipient),
        };
        if !entitled {
            log!(&env, "income claim not permitted", party as u32, recipient);
            return Err(ContractError::PermissionDenied);
        }

        let mut ledger = load_ledger(&env);
        if ledger.accrued(party) == 0 {
            return Ok(0);
        }
        let amount = ledger.claim(party);
        save_ledger(&env, &ledger);
        publish_claim_event(
            &env,
            ClaimEvent {
                party,
                recipient,
                amount,
            },
        );
        Ok(amount)
    }

    /// Stored record for a borrower; the zeroed `Deleted` record if there is none.
    pub fn get_credit_record(env: Env, borrower: Address) -> CreditRecord {
        load_record(&env, &borrower)
    }

    /// Obligations as of the current ledger time. Read-only.
    pub fn get_due_info(env: Env, borrower: Address) -> Result<DueInfo, ContractError> {
        let fees = load_fee_config(&env)?;
        let record = load_record(&env, &borrower);
        due::get_due_info(&record, env.ledger().timestamp(), &fees).map_err(|err| reject(&env, err))
    }

    pub fn payoff_amount(env: Env, borrower: Address) -> Result<u128, ContractError> {
        Ok(Self::get_due_info(env, borrower)?.payoff_amount)
    }

    pub fn get_ledger(env: Env) -> PoolLedger {
        load_ledger(&env)
    }

    pub fn get_fee_config(env: Env) -> Result<FeeConfig, ContractError> {
        load_fee_config(&env)
    }

    pub fn get_pool_settings(env: Env) -> Result<PoolSettings, ContractError> {
        load_pool_settings(&env)
    }
}
