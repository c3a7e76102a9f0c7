use proptest::prelude::*;

use revshare_accrual::{AccrualEngine, AccrualFormula};
use revshare_store::{BalanceStore, MemoryBalanceStore};
use revshare_types::{Address, Timestamp};

fn holders(balances: &[u128]) -> (MemoryBalanceStore, Vec<Address>) {
    let mut store = MemoryBalanceStore::new();
    let mut addrs = Vec::new();
    for (i, b) in balances.iter().enumerate() {
        let a = Address::repeat_byte(i as u8 + 1);
        store.mint(&a, *b).unwrap();
        addrs.push(a);
    }
    (store, addrs)
}

proptest! {
    /// The stored accumulator never decreases across deposits and settlements.
    #[test]
    fn accumulator_is_monotonic(
        balances in prop::collection::vec(1u128..1_000_000_000, 1..8),
        deposits in prop::collection::vec(1u128..1_000_000_000_000, 1..16),
    ) {
        let (store, addrs) = holders(&balances);
        let mut engine = AccrualEngine::new(AccrualFormula::Undistributed, Timestamp::new(0));
        let mut last = 0u128;
        for (i, d) in deposits.iter().enumerate() {
            let now = Timestamp::new(i as u64 + 1);
            engine.record_deposit(*d, &store, now).unwrap();
            engine.settle(&addrs[i % addrs.len()], &store, now).unwrap();
            let stored = engine.global().revenue_per_token_stored;
            prop_assert!(stored >= last, "accumulator decreased: {} -> {}", last, stored);
            last = stored;
        }
    }

    /// Settling twice with nothing in between changes nothing.
    #[test]
    fn settlement_is_idempotent(
        balances in prop::collection::vec(1u128..1_000_000_000, 1..8),
        deposit in 1u128..1_000_000_000_000,
        who in 0usize..8,
    ) {
        let (store, addrs) = holders(&balances);
        let account = addrs[who % addrs.len()];
        let mut engine = AccrualEngine::new(AccrualFormula::Undistributed, Timestamp::new(0));
        engine.record_deposit(deposit, &store, Timestamp::new(1)).unwrap();

        engine.settle(&account, &store, Timestamp::new(2)).unwrap();
        let first = engine.account(&account);
        engine.settle(&account, &store, Timestamp::new(3)).unwrap();
        prop_assert_eq!(engine.account(&account), first);
    }

    /// Total earned never exceeds total deposited (rounding only loses dust).
    #[test]
    fn earned_never_exceeds_deposits(
        balances in prop::collection::vec(1u128..1_000_000_000, 1..8),
        deposits in prop::collection::vec(1u128..1_000_000_000_000, 1..8),
    ) {
        let (store, addrs) = holders(&balances);
        let mut engine = AccrualEngine::new(AccrualFormula::Undistributed, Timestamp::new(0));
        let mut total = 0u128;
        for (i, d) in deposits.iter().enumerate() {
            engine.record_deposit(*d, &store, Timestamp::new(i as u64)).unwrap();
            total += d;
        }
        let earned: u128 = addrs.iter().map(|a| engine.earned(a, &store).unwrap()).sum();
        prop_assert!(earned <= total, "earned {} > deposited {}", earned, total);
        // At most one unit of dust per holder per deposit.
        let dust_bound = (addrs.len() * deposits.len()) as u128;
        prop_assert!(total - earned <= dust_bound, "dust {} exceeds {}", total - earned, dust_bound);
    }

    /// A claim pays exactly what `earned` reported, and a second claim pays nothing.
    #[test]
    fn claim_pays_earned_once(
        balances in prop::collection::vec(1u128..1_000_000_000, 1..8),
        deposit in 1u128..1_000_000_000_000,
    ) {
        let (store, addrs) = holders(&balances);
        let mut engine = AccrualEngine::new(AccrualFormula::Undistributed, Timestamp::new(0));
        engine.record_deposit(deposit, &store, Timestamp::new(1)).unwrap();
        let expected = engine.earned(&addrs[0], &store).unwrap();
        let first = engine.take_claim(&addrs[0], &store, Timestamp::new(2)).unwrap();
        let second = engine.take_claim(&addrs[0], &store, Timestamp::new(2)).unwrap();
        prop_assert_eq!(first, expected);
        prop_assert_eq!(second, 0);
        prop_assert_eq!(store.balance_of(&addrs[0]), balances[0]);
    }
}
