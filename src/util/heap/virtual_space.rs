use crate::util::conversions::raw_align_up;
use crate::util::memory;
use crate::util::Address;
use std::io::Result;

/// A reserved address range `[low, reserved_end)` whose prefix `[low, high)` is committed.
///
/// The committed part only moves at page granularity: it grows with
/// [`VirtualSpace::expand_by`] and shrinks with [`VirtualSpace::shrink_by`]. Dropping a
/// `VirtualSpace` releases the reservation.
#[derive(Debug)]
pub struct VirtualSpace {
    low: Address,
    high: Address,
    reserved_end: Address,
    name: &'static str,
}

impl VirtualSpace {
    /// Reserve `reserved` bytes and commit the first `committed` of them. Both are rounded up to
    /// the page size.
    pub fn new(name: &'static str, reserved: usize, committed: usize) -> Result<Self> {
        let page = memory::page_size();
        let reserved = raw_align_up(reserved, page);
        let committed = raw_align_up(committed, page).min(reserved);

        let low = memory::reserve(reserved)?;
        let mut space = VirtualSpace {
            low,
            high: low,
            reserved_end: low + reserved,
            name,
        };
        if committed > 0 {
            memory::commit(low, committed)?;
            space.high = low + committed;
        }
        debug!(
            "{}: reserved [{}, {}), committed {} bytes",
            name, space.low, space.reserved_end, committed
        );
        Ok(space)
    }

    pub fn low(&self) -> Address {
        self.low
    }

    /// End of the committed prefix.
    pub fn high(&self) -> Address {
        self.high
    }

    pub fn reserved_end(&self) -> Address {
        self.reserved_end
    }

    pub fn reserved_size(&self) -> usize {
        self.reserved_end - self.low
    }

    pub fn committed_size(&self) -> usize {
        self.high - self.low
    }

    pub fn uncommitted_size(&self) -> usize {
        self.reserved_end - self.high
    }

    /// Commit `bytes` more, rounded up to the page size. Fails without side effects if that
    /// does not fit in the reservation or the OS refuses.
    pub fn expand_by(&mut self, bytes: usize) -> Result<()> {
        let bytes = raw_align_up(bytes, memory::page_size());
        if bytes > self.uncommitted_size() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::OutOfMemory,
                format!(
                    "{}: cannot expand by {} bytes, only {} uncommitted",
                    self.name,
                    bytes,
                    self.uncommitted_size()
                ),
            ));
        }
        if bytes == 0 {
            return Ok(());
        }
        memory::commit(self.high, bytes)?;
        self.high += bytes;
        Ok(())
    }

    /// Uncommit `bytes` from the top, rounded down to the page size so that nothing below
    /// `high - bytes` is dropped.
    pub fn shrink_by(&mut self, bytes: usize) -> Result<()> {
        let bytes = bytes.min(self.committed_size()) & !(memory::page_size() - 1);
        if bytes == 0 {
            return Ok(());
        }
        let new_high = self.high - bytes;
        memory::uncommit(new_high, bytes)?;
        self.high = new_high;
        Ok(())
    }

    /// Commit the whole reservation.
    pub fn commit_all(&mut self) -> Result<()> {
        self.expand_by(self.uncommitted_size())
    }

    /// Uncommit the whole reservation.
    pub fn uncommit_all(&mut self) -> Result<()> {
        self.shrink_by(self.committed_size())
    }
}

impl Drop for VirtualSpace {
    fn drop(&mut self) {
        if let Err(e) = memory::release(self.low, self.reserved_size()) {
            warn!("{}: failed to release [{}, {}): {}", self.name, self.low, self.reserved_end, e);
        }
    }
}
