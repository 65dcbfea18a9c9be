//! Debug-only reentrancy guard.
//!
//! User callbacks (hashers, predicates, element destructors) run while a table
//! is in the middle of a mutation. A callback that reaches back into the same
//! table through some aliasing path would observe or corrupt half-updated
//! state, so in debug builds the table marks these sections and every public
//! mutator checks the mark. In release builds this compiles to nothing.

#[cfg(debug_assertions)]
use core::sync::atomic::AtomicU32;
#[cfg(debug_assertions)]
use core::sync::atomic::Ordering;

const MODIFIED_UNEXPECTEDLY: &str = "hash table was modified unexpectedly";

/// Per-table reentrancy tracker.
///
/// Uses an atomic counter rather than a `Cell` so that tables stay `Sync`.
#[derive(Debug, Default)]
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    depth: AtomicU32,
}

impl DebugReentrancy {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            depth: AtomicU32::new(0),
        }
    }

    /// Enters a section in which user code runs against a table that is
    /// mid-mutation. Panics in debug builds if a section is already active.
    #[inline]
    pub(crate) fn enter(&self) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            let depth = self.depth.fetch_add(1, Ordering::Relaxed);
            if depth != 0 {
                self.depth.fetch_sub(1, Ordering::Relaxed);
                panic!("{MODIFIED_UNEXPECTEDLY}");
            }
            return ReentrancyGuard { owner: self };
        }

        #[cfg(not(debug_assertions))]
        {
            return ReentrancyGuard {
                _owner: core::marker::PhantomData,
            };
        }
    }

    /// Panics in debug builds if called from inside an active section.
    #[inline(always)]
    pub(crate) fn check(&self) {
        #[cfg(debug_assertions)]
        assert!(
            self.depth.load(Ordering::Relaxed) == 0,
            "{MODIFIED_UNEXPECTEDLY}"
        );
    }
}

/// RAII guard returned by [`DebugReentrancy::enter`].
pub(crate) struct ReentrancyGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _owner: core::marker::PhantomData<&'a DebugReentrancy>,
}

impl Drop for ReentrancyGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            let depth = self.owner.depth.fetch_sub(1, Ordering::Relaxed);
            debug_assert!(depth > 0);
        }
    }
}
