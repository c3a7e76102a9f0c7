//! Balance store trait.

use crate::StoreError;
use revshare_types::Address;

/// Per-account balances and total supply with atomic mutation primitives.
///
/// Every mutating method either applies completely or returns an error and
/// leaves the store untouched. Implementations must conserve supply:
/// `move_balance` never changes `total_supply`, and `mint`/`burn` change it by
/// exactly `amount`.
pub trait BalanceStore {
    fn balance_of(&self, account: &Address) -> u128;

    fn total_supply(&self) -> u128;

    /// Move `amount` from `from` to `to`.
    fn move_balance(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), StoreError>;

    /// Create `amount` new units owned by `to`.
    fn mint(&mut self, to: &Address, amount: u128) -> Result<(), StoreError>;

    /// Destroy `amount` units owned by `from`.
    fn burn(&mut self, from: &Address, amount: u128) -> Result<(), StoreError>;

    fn allowance(&self, owner: &Address, spender: &Address) -> u128;

    fn approve(&mut self, owner: &Address, spender: &Address, amount: u128) -> Result<(), StoreError>;

    /// Consume `amount` of the allowance `owner` granted to `spender`.
    ///
    /// A `u128::MAX` allowance is treated as infinite and never decreases.
    fn spend_allowance(&mut self, owner: &Address, spender: &Address, amount: u128) -> Result<(), StoreError>;

    /// All accounts that have ever held a balance, with their current balance.
    fn accounts(&self) -> Vec<(Address, u128)>;
}
