use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::MutexGuard;

/// Serializes collection requests and drops the ones made redundant by a cycle that ran while
/// they were waiting.
///
/// A requester reads the request id before it queues up on the heap lock. Every serviced request
/// bumps the id. If the id has moved by the time the lock is acquired, another thread collected in
/// the meantime, and the heap this request wanted to improve is gone already. Under a storm of
/// concurrent failures a request can be dropped over and over; each drop does imply that some
/// cycle completed.
#[derive(Default)]
pub struct GCRequester {
    req_id: AtomicUsize,
}

impl GCRequester {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock with `lock` and run `op` with it held, unless a request was serviced while
    /// this one was waiting for the lock. Returns `None` for a dropped request.
    pub fn request<'a, T: 'a, R>(
        &self,
        lock: impl FnOnce() -> MutexGuard<'a, T>,
        op: impl FnOnce(&mut MutexGuard<'a, T>) -> R,
    ) -> Option<R> {
        let id = self.req_id.load(Ordering::Acquire);
        self.service(id, lock, op)
    }

    fn service<'a, T: 'a, R>(
        &self,
        id: usize,
        lock: impl FnOnce() -> MutexGuard<'a, T>,
        op: impl FnOnce(&mut MutexGuard<'a, T>) -> R,
    ) -> Option<R> {
        let mut guard = lock();
        if id < self.req_id.load(Ordering::Acquire) {
            debug!("Collection request {} was serviced by another thread", id);
            return None;
        }
        // Only one thread can hold the lock, so a plain bump is enough.
        self.req_id.fetch_add(1, Ordering::Release);
        Some(op(&mut guard))
    }

    /// Number of serviced requests.
    pub fn serviced(&self) -> usize {
        self.req_id.load(Ordering::Acquire)
    }
}
