use std::time::{Duration, Instant};

/// Times one phase of a collection. The duration is logged when the timer is dropped, tagged with
/// the collection id, e.g. `GC(3) Step 1: Mark 0.412ms`.
#[must_use]
pub struct PhaseTimer {
    gc_id: usize,
    name: &'static str,
    start: Instant,
}

impl PhaseTimer {
    pub fn start(gc_id: usize, name: &'static str) -> Self {
        debug!("GC({}) {}", gc_id, name);
        PhaseTimer {
            gc_id,
            name,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for PhaseTimer {
    fn drop(&mut self) {
        debug!(
            "GC({}) {} {:.3}ms",
            self.gc_id,
            self.name,
            self.elapsed().as_secs_f64() * 1000.0
        );
    }
}
