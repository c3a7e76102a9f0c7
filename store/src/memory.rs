//! In-memory balance store.

use crate::{BalanceStore, StoreError};
use revshare_types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A `HashMap`-backed [`BalanceStore`].
///
/// Entries are created on first touch and never removed, so an account whose
/// balance drops to zero keeps its entry.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MemoryBalanceStore {
    balances: HashMap<Address, u128>,
    allowances: HashMap<(Address, Address), u128>,
    total_supply: u128,
}

impl MemoryBalanceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BalanceStore for MemoryBalanceStore {
    fn balance_of(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn total_supply(&self) -> u128 {
        self.total_supply
    }

    fn move_balance(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), StoreError> {
        if from.is_zero() {
            return Err(StoreError::ZeroAddress("send"));
        }
        if to.is_zero() {
            return Err(StoreError::ZeroAddress("receive"));
        }
        let available = self.balance_of(from);
        if available < amount {
            return Err(StoreError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        if from == to {
            self.balances.entry(*from).or_insert(0);
            return Ok(());
        }
        // Cannot overflow: the receiver's balance plus `amount` is bounded by
        // total supply.
        *self.balances.entry(*from).or_insert(0) -= amount;
        *self.balances.entry(*to).or_insert(0) += amount;
        Ok(())
    }

    fn mint(&mut self, to: &Address, amount: u128) -> Result<(), StoreError> {
        if to.is_zero() {
            return Err(StoreError::ZeroAddress("receive"));
        }
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(StoreError::SupplyOverflow)?;
        self.total_supply = supply;
        *self.balances.entry(*to).or_insert(0) += amount;
        Ok(())
    }

    fn burn(&mut self, from: &Address, amount: u128) -> Result<(), StoreError> {
        if from.is_zero() {
            return Err(StoreError::ZeroAddress("send"));
        }
        let available = self.balance_of(from);
        if available < amount {
            return Err(StoreError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        *self.balances.entry(*from).or_insert(0) -= amount;
        self.total_supply -= amount;
        Ok(())
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    fn approve(&mut self, owner: &Address, spender: &Address, amount: u128) -> Result<(), StoreError> {
        if owner.is_zero() {
            return Err(StoreError::ZeroAddress("approve"));
        }
        if spender.is_zero() {
            return Err(StoreError::ZeroAddress("be approved"));
        }
        self.allowances.insert((*owner, *spender), amount);
        Ok(())
    }

    fn spend_allowance(&mut self, owner: &Address, spender: &Address, amount: u128) -> Result<(), StoreError> {
        let available = self.allowance(owner, spender);
        if available == u128::MAX {
            return Ok(());
        }
        if available < amount {
            return Err(StoreError::InsufficientAllowance {
                needed: amount,
                available,
            });
        }
        self.allowances.insert((*owner, *spender), available - amount);
        Ok(())
    }

    fn accounts(&self) -> Vec<(Address, u128)> {
        self.balances.iter().map(|(k, v)| (*k, *v)).collect()
    }
}
