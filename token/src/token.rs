//! The token ledger facade.
//!
//! [`RevenueToken`] owns the balance store, accrual engine, lock gate and
//! voting ledger behind a single mutex, so every operation is atomic and all
//! operations are totally ordered. The clock, value-transfer and access
//! control capabilities are injected at construction.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};

use revshare_accrual::{AccountAccrualState, AccrualEngine, GlobalAccrualState};
use revshare_delegation::VotingLedger;
use revshare_store::{BalanceStore, MemoryBalanceStore};
use revshare_types::{
    AccessControl, Address, Clock, SingleAdministrator, SystemClock, Timestamp, ValueTransfer,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::LedgerConfig;
use crate::events::{EventBus, TokenEvent};
use crate::state::LedgerState;
use crate::TokenError;

/// Capabilities the ledger needs from its host.
#[derive(Clone)]
pub struct Environment {
    pub clock: Arc<dyn Clock>,
    pub value_transfer: Arc<dyn ValueTransfer>,
    /// `None` grants administrator rights to `LedgerConfig::administrator`.
    pub access: Option<Arc<dyn AccessControl>>,
}

impl Environment {
    pub fn new(clock: Arc<dyn Clock>, value_transfer: Arc<dyn ValueTransfer>) -> Self {
        Self {
            clock,
            value_transfer,
            access: None,
        }
    }

    /// Wall clock time with the given value rail.
    pub fn system(value_transfer: Arc<dyn ValueTransfer>) -> Self {
        Self::new(Arc::new(SystemClock), value_transfer)
    }

    pub fn with_access_control(mut self, access: Arc<dyn AccessControl>) -> Self {
        self.access = Some(access);
        self
    }
}

/// Revenue-sharing token ledger.
pub struct RevenueToken<S = MemoryBalanceStore> {
    config: LedgerConfig,
    state: Mutex<LedgerState<S>>,
    /// Thread currently inside an operation.
    active: Mutex<Option<ThreadId>>,
    clock: Arc<dyn Clock>,
    value_transfer: Arc<dyn ValueTransfer>,
    access: Arc<dyn AccessControl>,
    events: EventBus,
}

/// Exclusive access to ledger state for the duration of one operation.
struct Operation<'a, S> {
    state: MutexGuard<'a, LedgerState<S>>,
    active: &'a Mutex<Option<ThreadId>>,
}

impl<S> Drop for Operation<'_, S> {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            *active = None;
        }
    }
}

impl RevenueToken<MemoryBalanceStore> {
    /// Create a ledger with an in-memory store and the configured genesis
    /// allocations.
    pub fn new(config: LedgerConfig, env: Environment) -> Result<Self, TokenError> {
        Self::with_store(config, env, MemoryBalanceStore::new())
    }
}

impl<S: BalanceStore> RevenueToken<S> {
    /// Create a ledger over an existing store. Voting power is rebuilt from
    /// the store's balances before genesis allocations are minted.
    pub fn with_store(config: LedgerConfig, env: Environment, store: S) -> Result<Self, TokenError> {
        config.validate()?;
        let now = env.clock.now();
        let mut state = LedgerState::new(
            store,
            AccrualEngine::new(config.accrual_formula, now),
            VotingLedger::new(config.delegation_default),
        );

        // Nobody can be subscribed yet, so genesis events are dropped.
        let mut discarded = Vec::new();
        for allocation in &config.genesis {
            state.mint(&allocation.account, allocation.amount, now, &mut discarded)?;
        }

        tracing::info!(
            name = %config.name,
            symbol = %config.symbol,
            administrator = %config.administrator,
            supply = state.store.total_supply(),
            formula = ?config.accrual_formula,
            delegation = ?config.delegation_default,
            "ledger created"
        );
        Ok(Self::assemble(config, env, state))
    }

    fn assemble(config: LedgerConfig, env: Environment, state: LedgerState<S>) -> Self {
        let access = env
            .access
            .unwrap_or_else(|| Arc::new(SingleAdministrator(config.administrator)));
        Self {
            config,
            state: Mutex::new(state),
            active: Mutex::new(None),
            clock: env.clock,
            value_transfer: env.value_transfer,
            access,
            events: EventBus::new(),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Register a listener for committed events.
    pub fn subscribe(&mut self, listener: Box<dyn Fn(&TokenEvent) + Send + Sync>) {
        self.events.subscribe(listener);
    }

    // ── Operation plumbing ─────────────────────────────────────────────

    fn enter(&self) -> Result<Operation<'_, S>, TokenError> {
        let me = thread::current().id();
        {
            let active = self.active.lock().map_err(|_| TokenError::Poisoned)?;
            if *active == Some(me) {
                return Err(TokenError::Reentrant);
            }
        }
        let state = self.state.lock().map_err(|_| TokenError::Poisoned)?;
        *self.active.lock().map_err(|_| TokenError::Poisoned)? = Some(me);
        Ok(Operation {
            state,
            active: &self.active,
        })
    }

    /// Run a read against a consistent view of the state.
    fn read<T>(&self, f: impl FnOnce(&LedgerState<S>) -> T) -> Result<T, TokenError> {
        let op = self.enter()?;
        Ok(f(&*op.state))
    }

    /// Run a mutation. On error, accrual settlement for `touched` is rolled
    /// back and no events are emitted; on success, events are published
    /// before the lock is released.
    fn execute<T>(
        &self,
        touched: &[Address],
        f: impl FnOnce(&mut LedgerState<S>, Timestamp, &mut Vec<TokenEvent>) -> Result<T, TokenError>,
    ) -> Result<T, TokenError> {
        let mut op = self.enter()?;
        let now = self.clock.now();
        let checkpoint = op.state.accrual.checkpoint(touched);
        let mut events = Vec::new();

        match f(&mut *op.state, now, &mut events) {
            Ok(value) => {
                for event in &events {
                    self.events.emit(event);
                }
                Ok(value)
            }
            Err(e) => {
                op.state.accrual.restore(checkpoint);
                tracing::debug!(error = %e, "operation rejected");
                Err(e)
            }
        }
    }

    /// Send value out through the rail. A panicking rail counts as a failed
    /// send, so the caller rolls back instead of poisoning the state lock.
    fn pay(&self, to: &Address, amount: u128) -> bool {
        panic::catch_unwind(AssertUnwindSafe(|| self.value_transfer.send(to, amount)))
            .unwrap_or_else(|_| {
                tracing::error!(to = %to, amount, "value rail panicked");
                false
            })
    }

    fn require_administrator(&self, caller: &Address) -> Result<(), TokenError> {
        if self.access.is_administrator(caller) {
            Ok(())
        } else {
            tracing::warn!(caller = %caller, "administrator operation refused");
            Err(TokenError::Unauthorized(*caller))
        }
    }

    // ── Token operations ───────────────────────────────────────────────

    /// Move `amount` of `caller`'s tokens to `to`.
    pub fn transfer(&self, caller: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
        self.execute(&[*caller, *to], |state, now, events| {
            state.transfer(None, caller, to, amount, now, events)
        })
    }

    /// Move `amount` of `from`'s tokens to `to` on `spender`'s allowance.
    /// The lock gate applies to `from`, not the spender.
    pub fn transfer_from(
        &self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), TokenError> {
        self.execute(&[*from, *to], |state, now, events| {
            state.transfer(Some(spender), from, to, amount, now, events)
        })
    }

    /// Set `spender`'s allowance over `owner`'s tokens. `u128::MAX` never
    /// decreases.
    pub fn approve(&self, owner: &Address, spender: &Address, amount: u128) -> Result<(), TokenError> {
        self.execute(&[], |state, _, events| {
            state.store.approve(owner, spender, amount)?;
            events.push(TokenEvent::Approval {
                owner: *owner,
                spender: *spender,
                amount,
            });
            Ok(())
        })
    }

    /// Issue new tokens. Administrator only; ignores the lock gate.
    pub fn mint(&self, caller: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
        self.require_administrator(caller)?;
        self.execute(&[*to], |state, now, events| state.mint(to, amount, now, events))
    }

    /// Destroy tokens held by `from`. Administrator only; ignores the lock
    /// gate.
    pub fn burn(&self, caller: &Address, from: &Address, amount: u128) -> Result<(), TokenError> {
        self.require_administrator(caller)?;
        self.execute(&[*from], |state, now, events| state.burn(from, amount, now, events))
    }

    // ── Lock gate ──────────────────────────────────────────────────────

    /// Permanently allow every holder to transfer.
    pub fn enable_global_transfers(&self, caller: &Address) -> Result<(), TokenError> {
        self.require_administrator(caller)?;
        self.execute(&[], |state, _, events| {
            let changed = state.lock.enable_global();
            events.push(TokenEvent::GlobalTransfersEnabled);
            tracing::info!(changed, "global transfers enabled");
            Ok(())
        })
    }

    /// Permanently allow `account` to send tokens.
    pub fn enable_account_transfers(&self, caller: &Address, account: &Address) -> Result<(), TokenError> {
        self.require_administrator(caller)?;
        if account.is_zero() {
            return Err(TokenError::InvalidAddress("cannot unlock the zero address".into()));
        }
        self.execute(&[], |state, _, events| {
            let changed = state.lock.enable_account(*account);
            events.push(TokenEvent::AccountTransfersEnabled { account: *account });
            tracing::info!(account = %account, changed, "account transfers enabled");
            Ok(())
        })
    }

    // ── Revenue ────────────────────────────────────────────────────────

    /// Accept `amount` of revenue into custody and distribute it pro rata
    /// over the current supply.
    pub fn deposit_revenue(&self, depositor: &Address, amount: u128) -> Result<(), TokenError> {
        self.execute(&[], |state, now, events| {
            state.deposit_revenue(depositor, amount, now, events)
        })
    }

    /// Pay out everything `caller` has earned. Returns the amount paid; a
    /// zero result sends nothing.
    ///
    /// If the value transfer fails the claim is undone and the amount stays
    /// claimable.
    pub fn claim_revenue(&self, caller: &Address) -> Result<u128, TokenError> {
        self.execute(&[*caller], |state, now, events| {
            let amount = state.accrual.take_claim(caller, &state.store, now)?;
            if amount == 0 {
                return Ok(0);
            }
            let held = state
                .held_value
                .checked_sub(amount)
                .ok_or(TokenError::Overflow)?;
            if !self.pay(caller, amount) {
                tracing::warn!(account = %caller, amount, "revenue payout failed");
                return Err(TokenError::TransferFailed { to: *caller, amount });
            }
            state.held_value = held;
            events.push(TokenEvent::RevenueDistributed {
                account: *caller,
                amount,
            });
            tracing::info!(account = %caller, amount, "revenue claimed");
            Ok(amount)
        })
    }

    /// Record value sent to the ledger outside of a revenue deposit. It is
    /// held but owed to nobody until the administrator withdraws it.
    pub fn receive_value(&self, from: &Address, amount: u128) -> Result<(), TokenError> {
        self.execute(&[], |state, _, events| state.receive_value(from, amount, events))
    }

    /// Send every unit of held value not owed to holders to the
    /// administrator. Returns the amount withdrawn.
    pub fn withdraw_excess(&self, caller: &Address) -> Result<u128, TokenError> {
        self.require_administrator(caller)?;
        self.execute(&[], |state, _, events| {
            let excess = state.excess_value();
            if excess == 0 {
                return Err(TokenError::NothingToWithdraw);
            }
            if !self.pay(caller, excess) {
                tracing::warn!(to = %caller, amount = excess, "excess withdrawal failed");
                return Err(TokenError::TransferFailed {
                    to: *caller,
                    amount: excess,
                });
            }
            state.held_value -= excess;
            events.push(TokenEvent::ExcessWithdrawn {
                to: *caller,
                amount: excess,
            });
            tracing::info!(to = %caller, amount = excess, "excess withdrawn");
            Ok(excess)
        })
    }

    // ── Delegation ─────────────────────────────────────────────────────

    /// Point `caller`'s voting weight at `target`. Works while transfers are
    /// locked.
    pub fn delegate(&self, caller: &Address, target: &Address) -> Result<(), TokenError> {
        self.execute(&[], |state, _, events| state.delegate(caller, target, events))
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn balance_of(&self, account: &Address) -> Result<u128, TokenError> {
        self.read(|s| s.store.balance_of(account))
    }

    pub fn total_supply(&self) -> Result<u128, TokenError> {
        self.read(|s| s.store.total_supply())
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Result<u128, TokenError> {
        self.read(|s| s.store.allowance(owner, spender))
    }

    /// Revenue `account` could claim right now.
    pub fn earned(&self, account: &Address) -> Result<u128, TokenError> {
        self.read(|s| s.accrual.earned(account, &s.store))?
            .map_err(TokenError::from)
    }

    /// Current value of the revenue-per-token accumulator, scaled by 1e18.
    pub fn revenue_per_token(&self) -> Result<u128, TokenError> {
        self.read(|s| s.accrual.revenue_per_token(&s.store))?
            .map_err(TokenError::from)
    }

    pub fn account_accrual(&self, account: &Address) -> Result<AccountAccrualState, TokenError> {
        self.read(|s| s.accrual.account(account))
    }

    pub fn global_accrual(&self) -> Result<GlobalAccrualState, TokenError> {
        self.read(|s| *s.accrual.global())
    }

    pub fn voting_power(&self, delegate: &Address) -> Result<u128, TokenError> {
        self.read(|s| s.votes.voting_power(delegate))
    }

    /// Explicit delegation target, if `account` has ever delegated.
    pub fn delegate_of(&self, account: &Address) -> Result<Option<Address>, TokenError> {
        self.read(|s| s.votes.delegate_of(account))
    }

    pub fn total_voting_power(&self) -> Result<u128, TokenError> {
        self.read(|s| s.votes.total_voting_power())
    }

    pub fn is_transfer_allowed(&self, from: &Address) -> Result<bool, TokenError> {
        self.read(|s| s.lock.is_transfer_allowed(from))
    }

    pub fn is_globally_unlocked(&self) -> Result<bool, TokenError> {
        self.read(|s| s.lock.is_globally_unlocked())
    }

    /// Value currently in the ledger's custody.
    pub fn held_value(&self) -> Result<u128, TokenError> {
        self.read(|s| s.held_value)
    }

    /// Held value that `withdraw_excess` would release.
    pub fn excess_value(&self) -> Result<u128, TokenError> {
        self.read(|s| s.excess_value())
    }

    /// Check supply, voting weight and custody invariants.
    pub fn verify_consistency(&self) -> Result<(), TokenError> {
        self.read(|s| s.verify_consistency())?
    }
}

// ── Snapshots ──────────────────────────────────────────────────────────

impl<S: BalanceStore + Serialize> RevenueToken<S> {
    /// Serialize the full ledger state with bincode.
    pub fn save_state(&self) -> Result<Vec<u8>, TokenError> {
        self.read(|s| bincode::serialize(s))?
            .map_err(|e| TokenError::Snapshot(e.to_string()))
    }
}

impl<S: BalanceStore + DeserializeOwned> RevenueToken<S> {
    /// Restore a ledger from [`save_state`](Self::save_state) output. Genesis
    /// allocations in `config` are not applied again.
    pub fn from_snapshot(config: LedgerConfig, env: Environment, bytes: &[u8]) -> Result<Self, TokenError> {
        config.validate()?;
        let state: LedgerState<S> =
            bincode::deserialize(bytes).map_err(|e| TokenError::Snapshot(e.to_string()))?;
        state.verify_consistency()?;
        if state.accrual.formula() != config.accrual_formula
            || state.votes.policy() != config.delegation_default
        {
            return Err(TokenError::Snapshot(
                "snapshot was taken under a different accrual or delegation setting".into(),
            ));
        }
        tracing::info!(
            supply = state.store.total_supply(),
            held = state.held_value,
            "ledger restored from snapshot"
        );
        Ok(Self::assemble(config, env, state))
    }
}

impl<S> std::fmt::Debug for RevenueToken<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevenueToken")
            .field("symbol", &self.config.symbol)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}
