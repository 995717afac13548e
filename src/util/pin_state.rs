//! Coarse, heap-wide pinning.
//!
//! A thread that hands a raw heap address to native code brackets that region with `pin` and
//! `unpin`. While any thread is inside such a region, no sliding cycle may start, because moving
//! any object could move the one the native code is looking at. Pinning is per thread and nests:
//! only the outermost `pin`/`unpin` pair of a thread changes the active count.
//!
//! After an implicit collection, the allocating thread retries its allocation with new pin
//! entries [blocked](PinCoordinator::block). Threads that are already pinned may nest further.

use crate::util::VMThread;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};

#[derive(Default)]
struct PinSync {
    /// Nesting depth of each thread currently inside a pinned region.
    depth: HashMap<VMThread, usize>,
    /// New entries wait while this is non-zero.
    blocked: usize,
}

#[derive(Default)]
pub struct PinCoordinator {
    sync: Mutex<PinSync>,
    unblocked: Condvar,
    /// Number of threads inside a pinned region.
    active: AtomicUsize,
}

impl PinCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a pinned region on thread `tls`.
    pub fn pin(&self, tls: VMThread) {
        let mut sync = self.sync.lock().unwrap();
        if !sync.depth.contains_key(&tls) {
            while sync.blocked > 0 {
                sync = self.unblocked.wait(sync).unwrap();
            }
        }
        let depth = sync.depth.entry(tls).or_insert(0);
        *depth += 1;
        if *depth == 1 {
            let active = self.active.fetch_add(1, Ordering::AcqRel) + 1;
            trace!("{:?} entered a pinned region, {} active", tls, active);
        }
    }

    /// Leave a pinned region on thread `tls`. Panics if `tls` is not inside one.
    pub fn unpin(&self, tls: VMThread) {
        let mut sync = self.sync.lock().unwrap();
        let Some(depth) = sync.depth.get_mut(&tls) else {
            panic!("{:?} unpinned without a matching pin", tls);
        };
        *depth -= 1;
        if *depth == 0 {
            sync.depth.remove(&tls);
            let active = self.active.fetch_sub(1, Ordering::AcqRel) - 1;
            trace!("{:?} left its pinned region, {} active", tls, active);
        }
    }

    /// Is any thread inside a pinned region?
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire) != 0
    }

    /// Number of threads inside a pinned region.
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Hold off new pinned regions until the returned guard is dropped. Several threads may
    /// block at once; entries resume when the last guard is gone.
    pub fn block(&self) -> PinBlockGuard<'_> {
        let mut sync = self.sync.lock().unwrap();
        sync.blocked += 1;
        PinBlockGuard { coordinator: self }
    }

    fn unblock(&self) {
        let mut sync = self.sync.lock().unwrap();
        sync.blocked -= 1;
        if sync.blocked == 0 {
            self.unblocked.notify_all();
        }
    }
}

#[must_use]
pub struct PinBlockGuard<'a> {
    coordinator: &'a PinCoordinator,
}

impl Drop for PinBlockGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.unblock();
    }
}
