//! Voting power ledger, updated incrementally on balance and delegation changes.

use crate::error::DelegationError;
use revshare_types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where an account's weight goes before it ever delegates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationDefault {
    /// Undelegated accounts vote with their own balance.
    /// Σ voting power always equals total supply.
    #[default]
    SelfDelegate,
    /// Undelegated weight is counted nowhere until the first delegation,
    /// as in ERC20Votes-style tokens where no delegate means no votes.
    /// Σ voting power + unassigned weight equals total supply.
    Unassigned,
}

/// A delegate's voting power changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VotesChanged {
    pub delegate: Address,
    pub previous: u128,
    pub current: u128,
}

/// Outcome of a [`VotingLedger::delegate`] call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelegationChange {
    /// Effective delegate before the call (`None` if weight was unassigned).
    pub previous: Option<Address>,
    pub current: Address,
    pub votes: Vec<VotesChanged>,
}

/// Per-account delegate targets and per-delegate voting power.
///
/// Weight moves use saturating arithmetic: the conservation invariant bounds
/// every delegate's power by total supply, which the balance store already
/// keeps within `u128`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VotingLedger {
    policy: DelegationDefault,
    /// delegator → explicitly chosen delegate.
    delegates: HashMap<Address, Address>,
    /// delegate → total weight delegated to it.
    voting_power: HashMap<Address, u128>,
    /// Σ voting_power.
    total_power: u128,
    /// Weight of balances with no effective delegate.
    unassigned: u128,
}

impl VotingLedger {
    pub fn new(policy: DelegationDefault) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> DelegationDefault {
        self.policy
    }

    /// The explicitly recorded delegate of `account`, if any.
    pub fn delegate_of(&self, account: &Address) -> Option<Address> {
        self.delegates.get(account).copied()
    }

    /// The delegate that currently receives `account`'s weight.
    pub fn effective_delegate(&self, account: &Address) -> Option<Address> {
        match self.delegates.get(account) {
            Some(target) => Some(*target),
            None => match self.policy {
                DelegationDefault::SelfDelegate => Some(*account),
                DelegationDefault::Unassigned => None,
            },
        }
    }

    /// Voting power currently held by `delegate`. 0 if unknown.
    pub fn voting_power(&self, delegate: &Address) -> u128 {
        self.voting_power.get(delegate).copied().unwrap_or(0)
    }

    /// Σ voting power across all delegates.
    pub fn total_voting_power(&self) -> u128 {
        self.total_power
    }

    /// Weight not counted toward any delegate.
    pub fn unassigned_weight(&self) -> u128 {
        self.unassigned
    }

    /// All delegates with their voting power.
    pub fn all_voting_power(&self) -> &HashMap<Address, u128> {
        &self.voting_power
    }

    /// Point `account`'s weight at `target`, moving its full `balance` from
    /// the previous effective delegate.
    ///
    /// Re-delegating to the current target updates the record but leaves
    /// every total unchanged.
    pub fn delegate(
        &mut self,
        account: &Address,
        target: &Address,
        balance: u128,
    ) -> Result<DelegationChange, DelegationError> {
        if account.is_zero() {
            return Err(DelegationError::ZeroDelegator);
        }
        if target.is_zero() {
            return Err(DelegationError::ZeroTarget);
        }
        let previous = self.effective_delegate(account);
        self.delegates.insert(*account, *target);
        let mut votes = Vec::new();
        if previous != Some(*target) && balance > 0 {
            match previous {
                Some(old) => votes.push(self.remove_power(&old, balance)),
                None => self.unassigned = self.unassigned.saturating_sub(balance),
            }
            votes.push(self.add_power(target, balance));
        }
        tracing::debug!(
            delegator = %account,
            to = %target,
            weight = balance,
            "delegation changed"
        );
        Ok(DelegationChange {
            previous,
            current: *target,
            votes,
        })
    }

    /// Propagate a balance change of `account` from `old_balance` to
    /// `new_balance` into its effective delegate's voting power.
    ///
    /// Must be called once per affected account after every mint, burn and
    /// each leg of a transfer. The zero address is ignored.
    pub fn on_balance_change(
        &mut self,
        account: &Address,
        old_balance: u128,
        new_balance: u128,
    ) -> Vec<VotesChanged> {
        if account.is_zero() || old_balance == new_balance {
            return Vec::new();
        }
        let delegate = self.effective_delegate(account);
        let mut votes = Vec::new();
        if new_balance > old_balance {
            let delta = new_balance - old_balance;
            match delegate {
                Some(d) => votes.push(self.add_power(&d, delta)),
                None => self.unassigned = self.unassigned.saturating_add(delta),
            }
        } else {
            let delta = old_balance - new_balance;
            match delegate {
                Some(d) => votes.push(self.remove_power(&d, delta)),
                None => self.unassigned = self.unassigned.saturating_sub(delta),
            }
        }
        votes
    }

    /// Rebuild all voting power from scratch.
    ///
    /// Used when attaching the ledger to a store that already holds balances.
    /// Each item yields `(account, balance)`.
    pub fn rebuild_from_balances(&mut self, balances: impl Iterator<Item = (Address, u128)>) {
        self.voting_power.clear();
        self.total_power = 0;
        self.unassigned = 0;
        for (account, balance) in balances {
            if account.is_zero() {
                continue;
            }
            match self.effective_delegate(&account) {
                Some(delegate) => {
                    let entry = self.voting_power.entry(delegate).or_insert(0);
                    *entry = entry.saturating_add(balance);
                    self.total_power = self.total_power.saturating_add(balance);
                }
                None => self.unassigned = self.unassigned.saturating_add(balance),
            }
        }
    }

    fn add_power(&mut self, delegate: &Address, amount: u128) -> VotesChanged {
        let entry = self.voting_power.entry(*delegate).or_insert(0);
        let previous = *entry;
        *entry = entry.saturating_add(amount);
        self.total_power = self.total_power.saturating_add(amount);
        VotesChanged {
            delegate: *delegate,
            previous,
            current: *entry,
        }
    }

    fn remove_power(&mut self, delegate: &Address, amount: u128) -> VotesChanged {
        let entry = self.voting_power.entry(*delegate).or_insert(0);
        let previous = *entry;
        let removed = amount.min(previous);
        *entry -= removed;
        self.total_power = self.total_power.saturating_sub(removed);
        VotesChanged {
            delegate: *delegate,
            previous,
            current: *entry,
        }
    }
}
