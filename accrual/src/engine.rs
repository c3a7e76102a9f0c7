//! Core accrual engine.

use crate::error::AccrualError;
use crate::state::{AccountAccrualState, AccrualFormula, GlobalAccrualState};
use revshare_store::BalanceStore;
use revshare_types::{Address, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The accrual engine: global accumulator plus lazily created per-account
/// checkpoints.
///
/// Balances are never stored here; every computation reads them from the
/// [`BalanceStore`] passed in, so the caller must settle *before* mutating
/// the store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccrualEngine {
    formula: AccrualFormula,
    global: GlobalAccrualState,
    accounts: HashMap<Address, AccountAccrualState>,
}

/// Saved copy of the global state and a set of account entries, used to
/// undo a failed operation.
#[derive(Clone, Debug)]
pub struct AccrualCheckpoint {
    global: GlobalAccrualState,
    accounts: Vec<(Address, Option<AccountAccrualState>)>,
}

impl AccrualEngine {
    pub fn new(formula: AccrualFormula, genesis: Timestamp) -> Self {
        Self {
            formula,
            global: GlobalAccrualState::new(genesis),
            accounts: HashMap::new(),
        }
    }

    pub fn formula(&self) -> AccrualFormula {
        self.formula
    }

    pub fn global(&self) -> &GlobalAccrualState {
        &self.global
    }

    /// Accrual state of an account; the default for accounts never touched.
    pub fn account(&self, account: &Address) -> AccountAccrualState {
        self.accounts.get(account).copied().unwrap_or_default()
    }

    /// Current revenue-per-token value (1e18-scaled).
    pub fn revenue_per_token(&self, store: &dyn BalanceStore) -> Result<u128, AccrualError> {
        self.global.revenue_per_token(self.formula, store.total_supply())
    }

    /// Revenue claimable by `account` right now.
    pub fn earned(&self, account: &Address, store: &dyn BalanceStore) -> Result<u128, AccrualError> {
        let rpt = self.revenue_per_token(store)?;
        self.account(account).earned_at(store.balance_of(account), rpt)
    }

    /// Store the current accumulator and, for a real account, snapshot what it
    /// has earned so far.
    ///
    /// Pass [`Address::ZERO`] for a global-only update. All values are
    /// computed before anything is written, so an error leaves the engine
    /// untouched.
    pub fn settle(&mut self, account: &Address, store: &dyn BalanceStore, now: Timestamp) -> Result<(), AccrualError> {
        let supply = store.total_supply();
        let mut next = self.global;
        next.revenue_per_token_stored = next.revenue_per_token(self.formula, supply)?;
        next.last_update_time = now;
        if self.formula == AccrualFormula::Undistributed && supply > 0 {
            next.revenue_accounted = next.total_revenue_deposited;
        }

        let account_update = if account.is_zero() {
            None
        } else {
            let current = self.account(account);
            // Under `Literal` the accumulator is re-evaluated against the
            // updated global state, so it differs from the stored value.
            let rpt = next.revenue_per_token(self.formula, supply)?;
            let accrued_rewards = current.earned_at(store.balance_of(account), rpt)?;
            Some(AccountAccrualState {
                revenue_per_token_paid: next.revenue_per_token_stored,
                accrued_rewards,
                ..current
            })
        };

        self.global = next;
        if let Some(update) = account_update {
            self.accounts.insert(*account, update);
        }
        tracing::debug!(
            account = %account,
            revenue_per_token = self.global.revenue_per_token_stored,
            "accrual settled"
        );
        Ok(())
    }

    /// Settle globally, then add `amount` to the deposit total.
    pub fn record_deposit(&mut self, amount: u128, store: &dyn BalanceStore, now: Timestamp) -> Result<(), AccrualError> {
        if amount == 0 {
            return Err(AccrualError::InvalidAmount);
        }
        let total = self
            .global
            .total_revenue_deposited
            .checked_add(amount)
            .ok_or(AccrualError::Overflow)?;
        self.settle(&Address::ZERO, store, now)?;
        self.global.total_revenue_deposited = total;
        Ok(())
    }

    /// Settle `account` and take its accrued revenue for payout.
    ///
    /// Returns the amount taken, or 0 when nothing is owed. The accrued
    /// balance is zeroed and the claim history recorded *before* the caller
    /// sends value out; if the send fails the caller must
    /// [`restore`](Self::restore) a checkpoint taken beforehand.
    pub fn take_claim(&mut self, account: &Address, store: &dyn BalanceStore, now: Timestamp) -> Result<u128, AccrualError> {
        self.settle(account, store, now)?;
        let mut state = self.account(account);
        let amount = state.accrued_rewards;
        if amount == 0 {
            return Ok(0);
        }
        let total_claimed = self
            .global
            .total_claimed
            .checked_add(amount)
            .ok_or(AccrualError::Overflow)?;
        state.accrued_rewards = 0;
        state.last_claimed_at = Some(now);
        state.cumulative_claimed = state.cumulative_claimed.saturating_add(amount);
        self.accounts.insert(*account, state);
        self.global.total_claimed = total_claimed;
        Ok(amount)
    }

    /// Save the global state and the given accounts' entries.
    pub fn checkpoint(&self, accounts: &[Address]) -> AccrualCheckpoint {
        AccrualCheckpoint {
            global: self.global,
            accounts: accounts
                .iter()
                .map(|a| (*a, self.accounts.get(a).copied()))
                .collect(),
        }
    }

    /// Roll back to a checkpoint taken with [`checkpoint`](Self::checkpoint).
    pub fn restore(&mut self, checkpoint: AccrualCheckpoint) {
        self.global = checkpoint.global;
        for (account, state) in checkpoint.accounts {
            match state {
                Some(state) => {
                    self.accounts.insert(account, state);
                }
                None => {
                    self.accounts.remove(&account);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revshare_store::MemoryBalanceStore;
    use revshare_types::SCALE;

    fn addr(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    fn ts(secs: u64) -> Timestamp {
        Timestamp::new(secs)
    }

    fn scenario_store() -> MemoryBalanceStore {
        let mut store = MemoryBalanceStore::new();
        store.mint(&addr(0xA), 100_000).unwrap();
        store.mint(&addr(0xB), 50_000).unwrap();
        store.mint(&addr(0xC), 25_000).unwrap();
        store.mint(&addr(0xD), 825_000).unwrap();
        store
    }

    #[test]
    fn deposit_is_shared_pro_rata() {
        let store = scenario_store();
        let mut engine = AccrualEngine::new(AccrualFormula::Undistributed, ts(0));
        engine.record_deposit(10, &store, ts(100)).unwrap();

        assert_eq!(engine.earned(&addr(0xA), &store).unwrap(), 1);
        assert_eq!(engine.earned(&addr(0xD), &store).unwrap(), 8);
        // 10 * 1e18 / 1e6
        assert_eq!(engine.revenue_per_token(&store).unwrap(), 10_000_000_000_000);
    }

    #[test]
    fn zero_deposit_is_rejected() {
        let store = scenario_store();
        let mut engine = AccrualEngine::new(AccrualFormula::Undistributed, ts(0));
        assert_eq!(engine.record_deposit(0, &store, ts(1)), Err(AccrualError::InvalidAmount));
        assert_eq!(engine.global().last_update_time, ts(0));
    }

    #[test]
    fn settle_is_idempotent() {
        let store = scenario_store();
        let mut engine = AccrualEngine::new(AccrualFormula::Undistributed, ts(0));
        engine.record_deposit(1_000, &store, ts(10)).unwrap();

        engine.settle(&addr(0xA), &store, ts(20)).unwrap();
        let first = engine.account(&addr(0xA));
        engine.settle(&addr(0xA), &store, ts(30)).unwrap();
        assert_eq!(engine.account(&addr(0xA)), first);
        assert_eq!(first.accrued_rewards, 100);
        assert_eq!(first.revenue_per_token_paid, engine.global().revenue_per_token_stored);
    }

    #[test]
    fn settlement_before_balance_change_preserves_history() {
        let mut store = scenario_store();
        let mut engine = AccrualEngine::new(AccrualFormula::Undistributed, ts(0));
        engine.record_deposit(1_000, &store, ts(10)).unwrap();

        engine.settle(&addr(0xA), &store, ts(20)).unwrap();
        engine.settle(&addr(0xB), &store, ts(20)).unwrap();
        store.move_balance(&addr(0xA), &addr(0xB), 100_000).unwrap();

        // A keeps what it earned while holding; B does not earn retroactively.
        assert_eq!(engine.earned(&addr(0xA), &store).unwrap(), 100);
        assert_eq!(engine.earned(&addr(0xB), &store).unwrap(), 50);

        engine.record_deposit(1_000, &store, ts(30)).unwrap();
        assert_eq!(engine.earned(&addr(0xA), &store).unwrap(), 100);
        assert_eq!(engine.earned(&addr(0xB), &store).unwrap(), 200);
    }

    #[test]
    fn deposit_with_zero_supply_waits_for_holders() {
        let mut store = MemoryBalanceStore::new();
        let mut engine = AccrualEngine::new(AccrualFormula::Undistributed, ts(0));
        engine.record_deposit(500, &store, ts(1)).unwrap();
        assert_eq!(engine.global().revenue_per_token_stored, 0);

        engine.settle(&addr(1), &store, ts(2)).unwrap();
        store.mint(&addr(1), 1_000).unwrap();
        assert_eq!(engine.earned(&addr(1), &store).unwrap(), 500);
    }

    #[test]
    fn take_claim_zeroes_and_records_history() {
        let store = scenario_store();
        let mut engine = AccrualEngine::new(AccrualFormula::Undistributed, ts(0));
        engine.record_deposit(1_000, &store, ts(10)).unwrap();

        let amount = engine.take_claim(&addr(0xA), &store, ts(50)).unwrap();
        assert_eq!(amount, 100);
        let state = engine.account(&addr(0xA));
        assert_eq!(state.accrued_rewards, 0);
        assert_eq!(state.cumulative_claimed, 100);
        assert_eq!(state.last_claimed_at, Some(ts(50)));
        assert_eq!(engine.global().total_claimed, 100);

        // A second claim finds nothing left.
        assert_eq!(engine.take_claim(&addr(0xA), &store, ts(60)).unwrap(), 0);
    }

    #[test]
    fn restore_undoes_a_claim() {
        let store = scenario_store();
        let mut engine = AccrualEngine::new(AccrualFormula::Undistributed, ts(0));
        engine.record_deposit(1_000, &store, ts(10)).unwrap();

        let checkpoint = engine.checkpoint(&[addr(0xA)]);
        engine.take_claim(&addr(0xA), &store, ts(50)).unwrap();
        engine.restore(checkpoint);

        assert_eq!(engine.account(&addr(0xA)), AccountAccrualState::default());
        assert_eq!(engine.global().total_claimed, 0);
        assert_eq!(engine.global().last_update_time, ts(10));
        assert_eq!(engine.earned(&addr(0xA), &store).unwrap(), 100);
    }

    #[test]
    fn literal_formula_fails_once_time_exceeds_deposits() {
        let store = scenario_store();
        let mut engine = AccrualEngine::new(AccrualFormula::Literal, ts(0));
        // First deposit: last_update_time is still 0, so the fold succeeds.
        engine.record_deposit(10, &store, ts(1_000)).unwrap();
        assert_eq!(engine.global().revenue_per_token_stored, 0);
        // Now deposited (10) < last_update_time (1_000).
        assert!(matches!(
            engine.settle(&addr(0xA), &store, ts(1_001)),
            Err(AccrualError::LiteralUnderflow { deposited: 10, last_update: 1_000 })
        ));
        assert_eq!(engine.global().last_update_time, ts(1_000));
    }

    #[test]
    fn literal_formula_re_adds_deposits_on_every_settle() {
        let mut store = MemoryBalanceStore::new();
        store.mint(&addr(1), 1_000).unwrap();
        let mut engine = AccrualEngine::new(AccrualFormula::Literal, ts(0));
        engine.record_deposit(10_000, &store, ts(0)).unwrap();

        engine.settle(&Address::ZERO, &store, ts(0)).unwrap();
        let after_one = engine.global().revenue_per_token_stored;
        engine.settle(&Address::ZERO, &store, ts(0)).unwrap();
        let after_two = engine.global().revenue_per_token_stored;
        // (10_000 - 0) * 1e18 / 1_000 added each time.
        assert_eq!(after_one, 10 * SCALE);
        assert_eq!(after_two, 20 * SCALE);
    }
}
