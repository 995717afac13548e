//! Elastic TLAB sizing.
//!
//! Each mutator keeps an ergonomic TLAB size. A refill that asks for more than the ergonomic size
//! gets the ergonomic size grown by `tlab_elasticity` instead, so a thread that allocates a lot
//! ramps up its TLABs geometrically while a thread that allocates little keeps small ones. A thread
//! that has not refilled for `tlab_decay_time` starts again from zero.

use crate::util::conversions::{raw_align_down, raw_align_up};
use crate::util::options::Options;
use std::time::{Duration, Instant};

/// Per-mutator sizing state. Only the owning mutator reads or writes it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TlabErgonomics {
    /// Current ergonomic TLAB size in bytes. Zero means "start small".
    pub size: usize,
    /// When the last TLAB was handed out.
    pub last_refill: Option<Instant>,
}

/// The size picked for a refill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlabSize {
    pub size: usize,
    /// The request did not fit the ergonomic size, which grows to `size` if the refill succeeds.
    pub grew: bool,
}

#[derive(Debug, Clone)]
pub struct TlabSizingPolicy {
    elastic: bool,
    decay: bool,
    elasticity: f64,
    decay_time: Duration,
    max_tlab_size: usize,
    alignment: usize,
}

impl TlabSizingPolicy {
    /// `max_tlab_size` is rounded down to `alignment`, but is at least `alignment`.
    pub fn new(options: &Options, alignment: usize) -> Self {
        TlabSizingPolicy {
            elastic: options.elastic_tlab,
            decay: options.elastic_tlab && options.elastic_tlab_decay,
            elasticity: options.tlab_elasticity,
            decay_time: Duration::from_millis(options.tlab_decay_time),
            max_tlab_size: raw_align_down(options.max_tlab_size, alignment).max(alignment),
            alignment,
        }
    }

    pub fn max_tlab_size(&self) -> usize {
        self.max_tlab_size
    }

    /// Pick the size of the next TLAB for a thread that needs at least `min_size` bytes and would
    /// like `requested_size`. The result is in `[min_size, max_tlab_size]` and a multiple of the
    /// alignment. `min_size` must not exceed `max_tlab_size`.
    ///
    /// A decay, if due, is applied to `ergo` right away. Growth is only recorded by
    /// [`TlabSizingPolicy::on_refilled`], once the caller knows the allocation succeeded.
    pub fn next_tlab_size(
        &self,
        ergo: &mut TlabErgonomics,
        min_size: usize,
        requested_size: usize,
        now: Instant,
    ) -> TlabSize {
        debug_assert!(
            min_size <= self.max_tlab_size,
            "min_size {} > max TLAB size {}",
            min_size,
            self.max_tlab_size
        );
        let mut size = requested_size;
        let mut grew = false;

        if self.elastic {
            if self.decay {
                if let Some(last) = ergo.last_refill {
                    if now.saturating_duration_since(last) > self.decay_time {
                        trace!("TLAB ergonomic size decayed from {}", ergo.size);
                        ergo.size = 0;
                    }
                }
            }
            if requested_size > ergo.size {
                size = (ergo.size as f64 * self.elasticity) as usize;
                grew = true;
            }
        }

        let min_size = min_size.min(self.max_tlab_size);
        let size = raw_align_up(size.clamp(min_size, self.max_tlab_size), self.alignment);
        TlabSize { size, grew }
    }

    /// The TLAB of `chosen.size` bytes was allocated.
    pub fn on_refilled(&self, ergo: &mut TlabErgonomics, chosen: TlabSize, now: Instant) {
        if self.elastic {
            ergo.last_refill = Some(now);
            if chosen.grew {
                ergo.size = chosen.size;
            }
        }
    }

    /// The TLAB could not be allocated. Start conservative next time.
    pub fn on_refill_failed(&self, ergo: &mut TlabErgonomics) {
        if self.elastic {
            ergo.size = 0;
        }
    }
}
