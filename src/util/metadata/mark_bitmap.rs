//! A side mark bitmap with one bit per allocation granule of the heap.
//!
//! The bitmap memory is reserved once for the whole heap and only committed for the duration of a
//! collection. Uncommitting drops its pages, so each cycle starts with a clear bitmap without
//! having to zero it, and no memory is held for it between cycles.

use crate::util::constants::{BITS_IN_WORD, BYTES_IN_WORD, LOG_BITS_IN_WORD};
use crate::util::conversions::{bitmap_bytes_for, raw_align_up};
use crate::util::heap::VirtualSpace;
use crate::util::memory;
use crate::util::Address;
use std::io::Result;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub struct MarkBitmap {
    /// Start of the covered heap range.
    base: Address,
    /// End of the covered heap range.
    limit: Address,
    log_granule: usize,
    storage: VirtualSpace,
    committed: AtomicBool,
    /// Make the next `commit` fail, as if the OS refused the memory.
    #[cfg(test)]
    fail_next_commit: bool,
}

impl MarkBitmap {
    /// Reserve (but do not commit) a bitmap that covers `[base, base + heap_bytes)` with one bit
    /// per `granule` bytes.
    pub fn new(base: Address, heap_bytes: usize, granule: usize) -> Result<Self> {
        debug_assert!(granule.is_power_of_two());
        debug_assert!(base.is_aligned_to(granule));
        let bytes = raw_align_up(bitmap_bytes_for(heap_bytes, granule), BYTES_IN_WORD);
        Ok(MarkBitmap {
            base,
            limit: base + heap_bytes,
            log_granule: granule.trailing_zeros() as usize,
            storage: VirtualSpace::new("mark bitmap", bytes, 0)?,
            committed: AtomicBool::new(false),
            #[cfg(test)]
            fail_next_commit: false,
        })
    }

    pub fn is_committed(&self) -> bool {
        self.committed.load(Ordering::Acquire)
    }

    /// The number of bytes the bitmap occupies when committed.
    pub fn reserved_bytes(&self) -> usize {
        self.storage.reserved_size()
    }

    /// Commit the bitmap memory. The bitmap reads as all clear afterwards.
    pub fn commit(&mut self) -> Result<()> {
        #[cfg(test)]
        {
            if std::mem::take(&mut self.fail_next_commit) {
                return Err(std::io::Error::from_raw_os_error(libc::ENOMEM));
            }
        }
        if !self.is_committed() {
            self.storage.commit_all()?;
            self.committed.store(true, Ordering::Release);
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn fail_next_commit(&mut self) {
        self.fail_next_commit = true;
    }

    /// Give the bitmap memory back to the OS.
    pub fn uncommit(&mut self) -> Result<()> {
        if self.is_committed() {
            self.committed.store(false, Ordering::Release);
            self.storage.uncommit_all()?;
        }
        Ok(())
    }

    /// Clear every bit. The bitmap must be committed.
    pub fn clear(&self) {
        debug_assert!(self.is_committed());
        memory::zero(self.storage.low(), self.storage.committed_size());
    }

    fn bit_index(&self, addr: Address) -> usize {
        debug_assert!(
            addr >= self.base && addr <= self.limit,
            "{} is outside [{}, {}]",
            addr,
            self.base,
            self.limit
        );
        (addr - self.base) >> self.log_granule
    }

    fn address_of_bit(&self, bit: usize) -> Address {
        self.base + (bit << self.log_granule)
    }

    fn word(&self, word_index: usize) -> &AtomicUsize {
        debug_assert!(self.is_committed());
        let addr = self.storage.low() + (word_index << crate::util::constants::LOG_BYTES_IN_WORD);
        unsafe { &*addr.to_ptr::<AtomicUsize>() }
    }

    /// Set the bit for `addr`. Returns true if this call set it, false if it was already set.
    pub fn mark(&self, addr: Address) -> bool {
        let bit = self.bit_index(addr);
        let mask = 1usize << (bit & (BITS_IN_WORD - 1));
        let old = self.word(bit >> LOG_BITS_IN_WORD).fetch_or(mask, Ordering::Relaxed);
        old & mask == 0
    }

    pub fn is_marked(&self, addr: Address) -> bool {
        let bit = self.bit_index(addr);
        let mask = 1usize << (bit & (BITS_IN_WORD - 1));
        self.word(bit >> LOG_BITS_IN_WORD).load(Ordering::Relaxed) & mask != 0
    }

    /// The lowest marked address in `[from, limit)`.
    pub fn find_next_marked(&self, from: Address, limit: Address) -> Option<Address> {
        if from >= limit {
            return None;
        }
        let end_bit = self.bit_index(limit);
        let mut bit = self.bit_index(from);
        while bit < end_bit {
            let word_index = bit >> LOG_BITS_IN_WORD;
            let word = self.word(word_index).load(Ordering::Relaxed)
                & (!0usize << (bit & (BITS_IN_WORD - 1)));
            if word != 0 {
                let found = (word_index << LOG_BITS_IN_WORD) + word.trailing_zeros() as usize;
                return if found < end_bit {
                    Some(self.address_of_bit(found))
                } else {
                    None
                };
            }
            bit = (word_index + 1) << LOG_BITS_IN_WORD;
        }
        None
    }

    /// Call `f` on every marked address in `[start, limit)`, in ascending order. Bits may be set
    /// or cleared behind the cursor while walking, but not ahead of it.
    pub fn iterate_marked<F: FnMut(Address)>(&self, start: Address, limit: Address, mut f: F) {
        let mut cursor = start;
        while let Some(addr) = self.find_next_marked(cursor, limit) {
            f(addr);
            cursor = addr + (1 << self.log_granule);
        }
    }
}
