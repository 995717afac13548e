//! Periodic heap reporting while allocating.
//!
//! Allocation is lock-free, so many threads can cross a reporting step at once. Each step has a
//! watermark, and only the thread that moves the watermark with a CAS reports.

use crate::util::conversions::{bytes_to_formatted_string, percent_of};
use crate::util::options::Options;
use crate::vm::{Collection, VMBinding};
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct HeapReporter {
    step_counter_update: usize,
    step_heap_print: usize,
    last_counter_update: AtomicUsize,
    last_heap_print: AtomicUsize,
}

impl HeapReporter {
    pub fn new(options: &Options) -> Self {
        let max = options.max_heap_size;
        HeapReporter {
            step_counter_update: (max / 16).min(options.update_counters_step).max(1),
            step_heap_print: if options.print_heap_steps == 0 {
                usize::MAX
            } else {
                (max / options.print_heap_steps).max(1)
            },
            last_counter_update: AtomicUsize::new(0),
            last_heap_print: AtomicUsize::new(0),
        }
    }

    pub fn step_counter_update(&self) -> usize {
        self.step_counter_update
    }

    pub fn step_heap_print(&self) -> usize {
        self.step_heap_print
    }

    /// Called after an allocation. Updates the monitoring counters and prints the heap occupancy
    /// if `used` crossed the next step.
    pub fn after_allocation<VM: VMBinding>(&self, used: usize, committed: usize, max: usize) {
        if Self::try_claim_step(&self.last_counter_update, used, self.step_counter_update) {
            VM::VMCollection::update_counters(used, committed, max);
        }
        if Self::try_claim_step(&self.last_heap_print, used, self.step_heap_print) {
            print_heap_info(used, committed, max);
        }
    }

    /// Called after a collection. `used` went down, so the watermarks follow it.
    pub fn reset(&self, used: usize) {
        self.last_counter_update.store(used, Ordering::Release);
        self.last_heap_print.store(used, Ordering::Release);
    }

    fn try_claim_step(watermark: &AtomicUsize, used: usize, step: usize) -> bool {
        let last = watermark.load(Ordering::Relaxed);
        used.saturating_sub(last) >= step
            && watermark
                .compare_exchange(last, used, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
    }
}

pub fn print_heap_info(used: usize, committed: usize, max: usize) {
    info!(
        "Heap: {} reserved, {} ({:.2}%) committed, {} ({:.2}%) used",
        bytes_to_formatted_string(max),
        bytes_to_formatted_string(committed),
        percent_of(committed, max),
        bytes_to_formatted_string(used),
        percent_of(used, max)
    );
}
