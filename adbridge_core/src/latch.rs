use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Single-writer-wins flag. The first `try_fire` returns true, every later
/// call returns false until `reset`.
#[derive(Debug, Default)]
pub struct OneShot {
    fired: AtomicBool,
}

impl OneShot {
    pub const fn new() -> Self {
        Self { fired: AtomicBool::new(false) }
    }

    #[inline]
    pub fn try_fire(&self) -> bool {
        self.fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[inline]
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    #[inline]
    pub fn reset(&self) {
        self.fired.store(false, Ordering::Release);
    }
}

/// One-shot delivery scoped to a cycle.
///
/// `begin` opens a new cycle and invalidates older ones. `try_deliver(cycle)`
/// succeeds at most once per cycle, and never for a cycle that is no longer
/// current, so a late timer from an earlier cycle cannot steal the delivery
/// of the running one.
#[derive(Debug, Default)]
pub struct CycleLatch {
    current: AtomicU64,
    delivered: AtomicU64,
}

impl CycleLatch {
    pub const fn new() -> Self {
        Self {
            current: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
        }
    }

    /// Open a new cycle and return its id (ids start at 1).
    pub fn begin(&self) -> u64 {
        self.current.fetch_add(1, Ordering::AcqRel) + 1
    }

    #[inline]
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_current(&self, cycle: u64) -> bool {
        cycle != 0 && self.current() == cycle
    }

    pub fn is_delivered(&self, cycle: u64) -> bool {
        self.delivered.load(Ordering::Acquire) >= cycle
    }

    pub fn try_deliver(&self, cycle: u64) -> bool {
        if !self.is_current(cycle) {
            return false;
        }
        self.delivered
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |d| (d < cycle).then_some(cycle))
            .is_ok()
    }
}
