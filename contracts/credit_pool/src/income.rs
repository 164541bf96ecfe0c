//! Income and loss distribution between the protocol, the evaluation agent,
//! the pool owner and pool liquidity.

use soroban_sdk::contracttype;

use crate::error::CreditError;
use crate::fees::{bps_of, MAX_RATE_BPS};
use crate::types::IncomeSplits;

/// Shares of a gross income amount. The parts always sum to the gross.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IncomeAllocation {
    pub protocol: u128,
    pub ea: u128,
    pub pool_owner: u128,
    pub pool: u128,
}

/// How a loss was absorbed. The parts always sum to the loss.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LossAllocation {
    pub protocol_clawback: u128,
    pub ea_clawback: u128,
    pub pool_owner_clawback: u128,
    /// Taken from pool liquidity.
    pub liquidity: u128,
    /// Left over once liquidity reached zero.
    pub unabsorbed: u128,
}

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IncomeParty {
    Protocol = 0,
    EvaluationAgent = 1,
    PoolOwner = 2,
}

/// Pool-wide bookkeeping: accrued but unclaimed income per party, lender
/// liquidity and the running total written off.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PoolLedger {
    pub protocol_income: u128,
    pub ea_income: u128,
    pub pool_owner_income: u128,
    pub liquidity: u128,
    pub written_off: u128,
}

impl IncomeSplits {
    pub fn validate(&self) -> Result<(), CreditError> {
        let total = self
            .protocol_bps
            .saturating_add(self.ea_bps)
            .saturating_add(self.pool_owner_bps);
        if total > MAX_RATE_BPS {
            return Err(CreditError::RateTooHigh {
                rate_bps: total,
                cap_bps: MAX_RATE_BPS,
            });
        }
        Ok(())
    }
}

/// Split `amount` by `splits`; the pool receives what the parties do not.
pub fn distribute_income(
    amount: u128,
    splits: &IncomeSplits,
) -> Result<IncomeAllocation, CreditError> {
    splits.validate()?;
    let protocol = bps_of(amount, splits.protocol_bps)?;
    let ea = bps_of(amount, splits.ea_bps)?;
    let pool_owner = bps_of(amount, splits.pool_owner_bps)?;
    let pool = amount - protocol - ea - pool_owner;
    Ok(IncomeAllocation {
        protocol,
        ea,
        pool_owner,
        pool,
    })
}

/// Charge `loss` first against each party's accrued income, up to its split
/// share, then against pool liquidity down to zero.
pub fn distribute_loss(
    loss: u128,
    splits: &IncomeSplits,
    ledger: &PoolLedger,
) -> Result<LossAllocation, CreditError> {
    splits.validate()?;
    let protocol_clawback = bps_of(loss, splits.protocol_bps)?.min(ledger.protocol_income);
    let ea_clawback = bps_of(loss, splits.ea_bps)?.min(ledger.ea_income);
    let pool_owner_clawback = bps_of(loss, splits.pool_owner_bps)?.min(ledger.pool_owner_income);

    let uncovered = loss - protocol_clawback - ea_clawback - pool_owner_clawback;
    let liquidity = uncovered.min(ledger.liquidity);
    Ok(LossAllocation {
        protocol_clawback,
        ea_clawback,
        pool_owner_clawback,
        liquidity,
        unabsorbed: uncovered - liquidity,
    })
}

impl PoolLedger {
    pub fn deposit(&mut self, amount: u128) -> Result<(), CreditError> {
        self.liquidity = add(self.liquidity, amount)?;
        Ok(())
    }

    pub fn record_income(&mut self, allocation: &IncomeAllocation) -> Result<(), CreditError> {
        self.protocol_income = add(self.protocol_income, allocation.protocol)?;
        self.ea_income = add(self.ea_income, allocation.ea)?;
        self.pool_owner_income = add(self.pool_owner_income, allocation.pool_owner)?;
        self.liquidity = add(self.liquidity, allocation.pool)?;
        Ok(())
    }

    pub fn record_loss(&mut self, allocation: &LossAllocation) -> Result<(), CreditError> {
        self.protocol_income -= allocation.protocol_clawback;
        self.ea_income -= allocation.ea_clawback;
        self.pool_owner_income -= allocation.pool_owner_clawback;
        self.liquidity -= allocation.liquidity;
        let loss = allocation.protocol_clawback
            + allocation.ea_clawback
            + allocation.pool_owner_clawback
            + allocation.liquidity
            + allocation.unabsorbed;
        self.written_off = add(self.written_off, loss)?;
        Ok(())
    }

    /// Take back income that was recognized and later refunded to a borrower.
    /// Nothing is written off.
    pub fn record_rebate(&mut self, allocation: &LossAllocation) {
        self.protocol_income -= allocation.protocol_clawback;
        self.ea_income -= allocation.ea_clawback;
        self.pool_owner_income -= allocation.pool_owner_clawback;
        self.liquidity -= allocation.liquidity;
    }

    pub fn accrued(&self, party: IncomeParty) -> u128 {
        match party {
            IncomeParty::Protocol => self.protocol_income,
            IncomeParty::EvaluationAgent => self.ea_income,
            IncomeParty::PoolOwner => self.pool_owner_income,
        }
    }

    /// Withdraw everything accrued to `party`.
    pub fn claim(&mut self, party: IncomeParty) -> u128 {
        let slot = match party {
            IncomeParty::Protocol => &mut self.protocol_income,
            IncomeParty::EvaluationAgent => &mut self.ea_income,
            IncomeParty::PoolOwner => &mut self.pool_owner_income,
        };
        core::mem::take(slot)
    }
}

fn add(a: u128, b: u128) -> Result<u128, CreditError> {
    a.checked_add(b).ok_or(CreditError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splits(protocol_bps: u32, ea_bps: u32, pool_owner_bps: u32) -> IncomeSplits {
        IncomeSplits {
            protocol_bps,
            ea_bps,
            pool_owner_bps,
        }
    }

    fn total(a: &IncomeAllocation) -> u128 {
        a.protocol + a.ea + a.pool_owner + a.pool
    }

    #[test]
    fn income_parts_sum_to_gross() {
        let configs = [
            splits(0, 0, 0),
            splits(1_000, 500, 500),
            splits(3_333, 3_333, 3_334),
            splits(10_000, 0, 0),
            splits(1, 1, 1),
            splits(9_999, 0, 1),
        ];
        let amounts = [0u128, 1, 7, 99, 452, 10_001, 123_456_789, u128::MAX / 10_000];
        for config in configs {
            for amount in amounts {
                let allocation = distribute_income(amount, &config).unwrap();
                assert_eq!(total(&allocation), amount);
            }
        }
    }

    #[test]
    fn pool_receives_rounding_remainder() {
        let allocation = distribute_income(99, &splits(1_000, 500, 500)).unwrap();
        assert_eq!(
            allocation,
            IncomeAllocation {
                protocol: 9,
                ea: 4,
                pool_owner: 4,
                pool: 82
            }
        );
    }

    #[test]
    fn splits_over_full_are_rejected() {
        assert_eq!(
            distribute_income(100, &splits(5_000, 5_000, 1)),
            Err(CreditError::RateTooHigh {
                rate_bps: 10_001,
                cap_bps: 10_000
            })
        );
        assert_eq!(splits(5_000, 5_000, 0).validate(), Ok(()));
    }

    #[test]
    fn loss_claws_back_accrued_income_first() {
        let ledger = PoolLedger {
            protocol_income: 50,
            ea_income: 2,
            pool_owner_income: 30,
            liquidity: 1_000,
            written_off: 0,
        };
        let allocation = distribute_loss(400, &splits(1_000, 500, 500), &ledger).unwrap();
        assert_eq!(allocation.protocol_clawback, 40);
        assert_eq!(allocation.ea_clawback, 2);
        assert_eq!(allocation.pool_owner_clawback, 20);
        assert_eq!(allocation.liquidity, 338);
        assert_eq!(allocation.unabsorbed, 0);
    }

    #[test]
    fn loss_never_drives_liquidity_negative() {
        let mut ledger = PoolLedger {
            protocol_income: 7,
            ea_income: 3,
            pool_owner_income: 3,
            liquidity: 363,
            written_off: 0,
        };
        let allocation = distribute_loss(476, &splits(1_000, 500, 500), &ledger).unwrap();
        assert_eq!(allocation.liquidity, 363);
        assert_eq!(allocation.unabsorbed, 100);

        ledger.record_loss(&allocation).unwrap();
        assert_eq!(ledger.liquidity, 0);
        assert_eq!(ledger.protocol_income, 0);
        assert_eq!(ledger.ea_income, 0);
        assert_eq!(ledger.pool_owner_income, 0);
        assert_eq!(ledger.written_off, 476);
    }

    #[test]
    fn rebate_reverses_income_without_a_write_off() {
        let mut ledger = PoolLedger::default();
        let split = splits(1_000, 500, 500);
        ledger.deposit(1_000).unwrap();
        ledger
            .record_income(&distribute_income(200, &split).unwrap())
            .unwrap();

        let allocation = distribute_loss(100, &split, &ledger).unwrap();
        ledger.record_rebate(&allocation);
        assert_eq!(ledger.protocol_income, 10);
        assert_eq!(ledger.ea_income, 5);
        assert_eq!(ledger.pool_owner_income, 5);
        assert_eq!(ledger.liquidity, 1_080);
        assert_eq!(ledger.written_off, 0);
    }

    #[test]
    fn claim_drains_one_party() {
        let mut ledger = PoolLedger::default();
        ledger.deposit(1_000).unwrap();
        ledger
            .record_income(&distribute_income(200, &splits(1_000, 500, 500)).unwrap())
            .unwrap();
        assert_eq!(ledger.liquidity, 1_160);
        assert_eq!(ledger.accrued(IncomeParty::EvaluationAgent), 10);

        assert_eq!(ledger.claim(IncomeParty::Protocol), 20);
        assert_eq!(ledger.claim(IncomeParty::Protocol), 0);
        assert_eq!(ledger.accrued(IncomeParty::PoolOwner), 10);
    }
}
