use std::cell::RefCell;
use std::collections::HashMap;

use tracing::debug;

use super::{normalize_ticker, FinancialDataProvider, FinancialSnapshot};

/// Per-ticker memo in front of another provider.
///
/// Scoped to a single interactive session; it never outlives the session
/// that created it and is not shared across threads.
#[derive(Debug)]
pub struct CachedProvider<P> {
    inner: P,
    snapshots: RefCell<HashMap<String, FinancialSnapshot>>,
}

impl<P: FinancialDataProvider> CachedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            snapshots: RefCell::new(HashMap::new()),
        }
    }

    /// Drop the cached snapshot for `ticker`, forcing the next fetch through.
    pub fn invalidate(&self, ticker: &str) -> bool {
        self.snapshots
            .borrow_mut()
            .remove(&normalize_ticker(ticker))
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.snapshots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.borrow().is_empty()
    }
}

impl<P: FinancialDataProvider> FinancialDataProvider for CachedProvider<P> {
    fn fetch(&self, ticker: &str) -> FinancialSnapshot {
        let key = normalize_ticker(ticker);
        if let Some(hit) = self.snapshots.borrow().get(&key) {
            debug!(ticker = %key, "snapshot cache hit");
            return hit.clone();
        }
        let snapshot = self.inner.fetch(&key);
        self.snapshots.borrow_mut().insert(key, snapshot.clone());
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::cell::Cell;

    struct CountingProvider {
        calls: Cell<u32>,
    }

    impl FinancialDataProvider for CountingProvider {
        fn fetch(&self, ticker: &str) -> FinancialSnapshot {
            self.calls.set(self.calls.get() + 1);
            let mut snapshot = FinancialSnapshot::new(ticker);
            snapshot.free_cash_flow = dec!(1000);
            snapshot
        }
    }

    #[test]
    fn test_repeated_fetch_hits_cache() {
        let cached = CachedProvider::new(CountingProvider { calls: Cell::new(0) });

        let first = cached.fetch("unh");
        let second = cached.fetch("UNH ");

        assert_eq!(first, second);
        assert_eq!(cached.inner.calls.get(), 1);
        assert_eq!(cached.len(), 1);
    }

    #[test]
    fn test_invalidate_forces_refetch() {
        let cached = CachedProvider::new(CountingProvider { calls: Cell::new(0) });

        cached.fetch("UNH");
        assert!(cached.invalidate("unh"));
        assert!(!cached.invalidate("unh"));
        cached.fetch("UNH");

        assert_eq!(cached.inner.calls.get(), 2);
    }

    #[test]
    fn test_distinct_tickers_cached_separately() {
        let cached = CachedProvider::new(CountingProvider { calls: Cell::new(0) });
        assert!(cached.is_empty());

        cached.fetch("UNH");
        cached.fetch("MSFT");

        assert_eq!(cached.len(), 2);
        assert_eq!(cached.inner.calls.get(), 2);
    }
}
