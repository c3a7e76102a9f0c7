//! Ledger state and the settle → gate → mutate → propagate ordering.
//!
//! Every balance mutation in the crate goes through the methods here, which
//! apply the four steps in a fixed order:
//! 1. settle accrual for every affected account,
//! 2. check the lock gate (transfers only),
//! 3. mutate the balance store,
//! 4. push the balance deltas into the voting ledger.
//!
//! Each method validates before it writes anything except accrual
//! settlement; the caller rolls settlement back from an
//! [`AccrualCheckpoint`](revshare_accrual::AccrualCheckpoint) on error.

use revshare_accrual::AccrualEngine;
use revshare_delegation::{VotesChanged, VotingLedger};
use revshare_store::BalanceStore;
use revshare_types::{Address, Timestamp};
use serde::{Deserialize, Serialize};

use crate::events::TokenEvent;
use crate::lock::LockGate;
use crate::TokenError;

/// All mutable ledger state. Lives behind the facade's single lock.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerState<S> {
    pub(crate) store: S,
    pub(crate) accrual: AccrualEngine,
    pub(crate) lock: LockGate,
    pub(crate) votes: VotingLedger,
    /// Value in the ledger's custody: deposits and untracked inflows minus
    /// payouts.
    pub(crate) held_value: u128,
}

impl<S: BalanceStore> LedgerState<S> {
    pub(crate) fn new(store: S, accrual: AccrualEngine, mut votes: VotingLedger) -> Self {
        votes.rebuild_from_balances(store.accounts().into_iter());
        Self {
            store,
            accrual,
            lock: LockGate::new(),
            votes,
            held_value: 0,
        }
    }

    /// Move `amount` from `from` to `to`, spending `spender`'s allowance when
    /// given.
    pub(crate) fn transfer(
        &mut self,
        spender: Option<&Address>,
        from: &Address,
        to: &Address,
        amount: u128,
        now: Timestamp,
        events: &mut Vec<TokenEvent>,
    ) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::InvalidAddress("cannot transfer to the zero address".into()));
        }

        self.accrual.settle(from, &self.store, now)?;
        self.accrual.settle(to, &self.store, now)?;

        if !self.lock.is_transfer_allowed(from) {
            return Err(TokenError::TransfersLocked(*from));
        }

        if let Some(spender) = spender {
            let available = self.store.allowance(from, spender);
            if available < amount {
                return Err(TokenError::InsufficientAllowance {
                    needed: amount,
                    available,
                });
            }
        }

        let from_before = self.store.balance_of(from);
        let to_before = self.store.balance_of(to);
        self.store.move_balance(from, to, amount)?;
        if let Some(spender) = spender {
            // Checked above; cannot fail.
            self.store.spend_allowance(from, spender, amount)?;
        }

        let from_votes = self
            .votes
            .on_balance_change(from, from_before, self.store.balance_of(from));
        let to_votes = self
            .votes
            .on_balance_change(to, to_before, self.store.balance_of(to));

        events.push(TokenEvent::Transfer {
            from: *from,
            to: *to,
            amount,
        });
        push_votes(events, from_votes);
        push_votes(events, to_votes);
        tracing::debug!(from = %from, to = %to, amount, "transfer");
        Ok(())
    }

    /// Issue `amount` new units to `to`. Not gated by the lock.
    pub(crate) fn mint(
        &mut self,
        to: &Address,
        amount: u128,
        now: Timestamp,
        events: &mut Vec<TokenEvent>,
    ) -> Result<(), TokenError> {
        self.accrual.settle(to, &self.store, now)?;
        let before = self.store.balance_of(to);
        self.store.mint(to, amount)?;
        let votes = self
            .votes
            .on_balance_change(to, before, self.store.balance_of(to));

        events.push(TokenEvent::Transfer {
            from: Address::ZERO,
            to: *to,
            amount,
        });
        push_votes(events, votes);
        tracing::debug!(to = %to, amount, "mint");
        Ok(())
    }

    /// Destroy `amount` units held by `from`. Not gated by the lock.
    pub(crate) fn burn(
        &mut self,
        from: &Address,
        amount: u128,
        now: Timestamp,
        events: &mut Vec<TokenEvent>,
    ) -> Result<(), TokenError> {
        self.accrual.settle(from, &self.store, now)?;
        let before = self.store.balance_of(from);
        self.store.burn(from, amount)?;
        let votes = self
            .votes
            .on_balance_change(from, before, self.store.balance_of(from));

        events.push(TokenEvent::Transfer {
            from: *from,
            to: Address::ZERO,
            amount,
        });
        push_votes(events, votes);
        tracing::debug!(from = %from, amount, "burn");
        Ok(())
    }

    /// Point `account`'s voting weight at `target`.
    pub(crate) fn delegate(
        &mut self,
        account: &Address,
        target: &Address,
        events: &mut Vec<TokenEvent>,
    ) -> Result<(), TokenError> {
        let balance = self.store.balance_of(account);
        let change = self.votes.delegate(account, target, balance)?;
        events.push(TokenEvent::DelegateChanged {
            delegator: *account,
            from: change.previous,
            to: change.current,
        });
        push_votes(events, change.votes);
        tracing::info!(delegator = %account, to = %target, weight = balance, "delegate changed");
        Ok(())
    }

    /// Record a revenue deposit and take custody of its value.
    pub(crate) fn deposit_revenue(
        &mut self,
        depositor: &Address,
        amount: u128,
        now: Timestamp,
        events: &mut Vec<TokenEvent>,
    ) -> Result<(), TokenError> {
        if amount == 0 {
            return Err(TokenError::InvalidAmount);
        }
        let held = self
            .held_value
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        self.accrual.record_deposit(amount, &self.store, now)?;
        self.held_value = held;

        events.push(TokenEvent::RevenueDeposited {
            depositor: *depositor,
            amount,
        });
        tracing::info!(
            depositor = %depositor,
            amount,
            total_deposited = self.accrual.global().total_revenue_deposited,
            "revenue deposited"
        );
        Ok(())
    }

    /// Take custody of value that is not a revenue deposit.
    pub(crate) fn receive_value(
        &mut self,
        from: &Address,
        amount: u128,
        events: &mut Vec<TokenEvent>,
    ) -> Result<(), TokenError> {
        if amount == 0 {
            return Err(TokenError::InvalidAmount);
        }
        self.held_value = self
            .held_value
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        events.push(TokenEvent::ValueReceived {
            from: *from,
            amount,
        });
        Ok(())
    }

    /// Held value not owed to holders.
    pub(crate) fn excess_value(&self) -> u128 {
        self.held_value
            .saturating_sub(self.accrual.global().outstanding_liabilities())
    }

    /// Check the cross-component invariants.
    ///
    /// - Σ balances == total supply
    /// - Σ voting power + unassigned weight == total supply
    /// - held value covers every unclaimed deposit
    pub(crate) fn verify_consistency(&self) -> Result<(), TokenError> {
        let supply = self.store.total_supply();
        let balances = self
            .store
            .accounts()
            .iter()
            .try_fold(0u128, |acc, (_, b)| acc.checked_add(*b))
            .ok_or(TokenError::Overflow)?;
        if balances != supply {
            return Err(TokenError::Snapshot(format!(
                "balances sum to {balances}, total supply is {supply}"
            )));
        }
        let weight = self
            .votes
            .total_voting_power()
            .checked_add(self.votes.unassigned_weight())
            .ok_or(TokenError::Overflow)?;
        if weight != supply {
            return Err(TokenError::Snapshot(format!(
                "voting weight sums to {weight}, total supply is {supply}"
            )));
        }
        let liabilities = self.accrual.global().outstanding_liabilities();
        if self.held_value < liabilities {
            return Err(TokenError::Snapshot(format!(
                "held value {} below outstanding revenue {liabilities}",
                self.held_value
            )));
        }
        Ok(())
    }
}

fn push_votes(events: &mut Vec<TokenEvent>, votes: Vec<VotesChanged>) {
    events.extend(votes.into_iter().map(|v| TokenEvent::DelegateVotesChanged {
        delegate: v.delegate,
        previous: v.previous,
        current: v.current,
    }));
}
