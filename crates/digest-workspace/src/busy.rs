//! In-flight flags for user-triggered actions
//!
//! Each action owns one [`BusyFlag`]. Acquiring it yields a guard that clears
//! the flag on drop, so the flag is released on success, on failure and when
//! the action's future is dropped mid-flight.

use std::sync::atomic::{AtomicBool, Ordering};

/// Single-holder in-flight flag
#[derive(Debug, Default)]
pub struct BusyFlag {
    busy: AtomicBool,
}

impl BusyFlag {
    /// Idle flag
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the flag busy, or `None` if it already is
    #[must_use]
    pub fn try_acquire(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard { flag: self })
    }

    /// Whether an action currently holds the flag
    #[inline]
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases its [`BusyFlag`] when dropped
#[derive(Debug)]
pub struct BusyGuard<'a> {
    flag: &'a BusyFlag,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.busy.store(false, Ordering::Release);
    }
}
