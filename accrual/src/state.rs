//! Global and per-account accrual state.

use crate::error::AccrualError;
use revshare_types::{mul_div, Timestamp, SCALE};
use serde::{Deserialize, Serialize};

/// How newly deposited revenue is folded into the accumulator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccrualFormula {
    /// Each deposit is distributed once, pro rata to the supply at the time
    /// it is folded in: `pending = deposited − accounted`.
    #[default]
    Undistributed,
    /// Legacy on-chain formula: `pending = deposited − last_update_time`.
    ///
    /// The two operands are a value total and a timestamp, so the result is
    /// dimensionally meaningless: every settlement re-adds almost the whole
    /// deposit total, and any settlement with `deposited < last_update_time`
    /// fails with [`AccrualError::LiteralUnderflow`]. Only for ledgers that
    /// must match legacy balances.
    Literal,
}

/// Global accumulator state, shared by all accounts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalAccrualState {
    /// Cumulative revenue ever deposited. Never decreases.
    pub total_revenue_deposited: u128,
    /// Revenue per unit of balance (scaled by 1e18) as of `last_update_time`.
    pub revenue_per_token_stored: u128,
    /// When the accumulator was last stored.
    pub last_update_time: Timestamp,
    /// Portion of `total_revenue_deposited` already folded into
    /// `revenue_per_token_stored`. Only advanced by the `Undistributed` formula.
    pub revenue_accounted: u128,
    /// Cumulative revenue paid out through claims.
    pub total_claimed: u128,
}

impl GlobalAccrualState {
    pub fn new(genesis: Timestamp) -> Self {
        Self {
            last_update_time: genesis,
            ..Self::default()
        }
    }

    /// Current revenue-per-token value for a given total supply.
    ///
    /// With zero supply there is nobody to distribute to, so the stored value
    /// is returned unchanged.
    pub fn revenue_per_token(&self, formula: AccrualFormula, total_supply: u128) -> Result<u128, AccrualError> {
        if total_supply == 0 {
            return Ok(self.revenue_per_token_stored);
        }
        let pending = match formula {
            AccrualFormula::Undistributed => self
                .total_revenue_deposited
                .checked_sub(self.revenue_accounted)
                .ok_or(AccrualError::Overflow)?,
            AccrualFormula::Literal => self
                .total_revenue_deposited
                .checked_sub(self.last_update_time.as_secs() as u128)
                .ok_or(AccrualError::LiteralUnderflow {
                    deposited: self.total_revenue_deposited,
                    last_update: self.last_update_time.as_secs(),
                })?,
        };
        let increment = mul_div(pending, SCALE, total_supply)?;
        self.revenue_per_token_stored
            .checked_add(increment)
            .ok_or(AccrualError::Overflow)
    }

    /// Revenue deposited but not yet paid out to claimants.
    pub fn outstanding_liabilities(&self) -> u128 {
        self.total_revenue_deposited.saturating_sub(self.total_claimed)
    }
}

/// Accrual checkpoint for a single account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAccrualState {
    /// Accumulator value at this account's last settlement.
    pub revenue_per_token_paid: u128,
    /// Settled but unclaimed revenue.
    pub accrued_rewards: u128,
    /// Informational.
    pub last_claimed_at: Option<Timestamp>,
    /// Informational.
    pub cumulative_claimed: u128,
}

impl AccountAccrualState {
    /// Revenue owed at accumulator value `revenue_per_token` for `balance`.
    pub fn earned_at(&self, balance: u128, revenue_per_token: u128) -> Result<u128, AccrualError> {
        let delta = revenue_per_token
            .checked_sub(self.revenue_per_token_paid)
            .ok_or(AccrualError::Overflow)?;
        mul_div(balance, delta, SCALE)?
            .checked_add(self.accrued_rewards)
            .ok_or(AccrualError::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_supply_returns_stored_value() {
        let mut g = GlobalAccrualState::new(Timestamp::new(0));
        g.revenue_per_token_stored = 42;
        g.total_revenue_deposited = 1_000;
        assert_eq!(g.revenue_per_token(AccrualFormula::Undistributed, 0).unwrap(), 42);
        assert_eq!(g.revenue_per_token(AccrualFormula::Literal, 0).unwrap(), 42);
    }

    #[test]
    fn undistributed_folds_pending_deposits() {
        let mut g = GlobalAccrualState::new(Timestamp::new(500));
        g.total_revenue_deposited = 10;
        // 10 * 1e18 / 1_000_000
        assert_eq!(
            g.revenue_per_token(AccrualFormula::Undistributed, 1_000_000).unwrap(),
            10_000_000_000_000
        );
        g.revenue_accounted = 10;
        assert_eq!(g.revenue_per_token(AccrualFormula::Undistributed, 1_000_000).unwrap(), 0);
    }

    #[test]
    fn literal_subtracts_the_timestamp() {
        let mut g = GlobalAccrualState::new(Timestamp::new(100));
        g.total_revenue_deposited = 1_100;
        // (1_100 - 100) * 1e18 / 1_000
        assert_eq!(g.revenue_per_token(AccrualFormula::Literal, 1_000).unwrap(), SCALE);
    }

    #[test]
    fn literal_underflows_when_time_exceeds_deposits() {
        let mut g = GlobalAccrualState::new(Timestamp::new(1_000));
        g.total_revenue_deposited = 10;
        assert_eq!(
            g.revenue_per_token(AccrualFormula::Literal, 1_000),
            Err(AccrualError::LiteralUnderflow {
                deposited: 10,
                last_update: 1_000
            })
        );
    }

    #[test]
    fn earned_at_adds_settled_rewards() {
        let state = AccountAccrualState {
            revenue_per_token_paid: SCALE,
            accrued_rewards: 7,
            ..Default::default()
        };
        assert_eq!(state.earned_at(100, 3 * SCALE).unwrap(), 207);
    }

    #[test]
    fn earned_at_rejects_accumulator_below_checkpoint() {
        let state = AccountAccrualState {
            revenue_per_token_paid: 10,
            ..Default::default()
        };
        assert_eq!(state.earned_at(1, 5), Err(AccrualError::Overflow));
    }

    #[test]
    fn liabilities_are_deposits_minus_claims() {
        let g = GlobalAccrualState {
            total_revenue_deposited: 100,
            total_claimed: 30,
            ..Default::default()
        };
        assert_eq!(g.outstanding_liabilities(), 70);
    }
}
