//! Thin wrappers over the OS virtual memory calls. A region is first *reserved* (address space
//! only, inaccessible), then parts of it are *committed* (readable, writable, zero-filled on first
//! touch) and later *uncommitted* (pages dropped, inaccessible again). Released regions are
//! unmapped entirely.

use crate::util::constants::BYTES_IN_PAGE;
use crate::util::Address;
use std::io::{Error, ErrorKind, Result};

lazy_static! {
    static ref PAGE_SIZE: usize = {
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 {
            size as usize
        } else {
            BYTES_IN_PAGE
        }
    };
}

/// The OS page size. Every commit and uncommit works at this granularity.
pub fn page_size() -> usize {
    *PAGE_SIZE
}

/// Set a range of memory to 0.
pub fn zero(start: Address, len: usize) {
    set(start, 0, len);
}

/// Set a range of memory to the given value. Similar to memset.
pub fn set(start: Address, val: u8, len: usize) {
    unsafe {
        std::ptr::write_bytes::<u8>(start.to_mut_ptr(), val, len);
    }
}

/// Reserve `size` bytes of address space anywhere. Nothing in the range is accessible until it is
/// committed, and no swap space is accounted for it.
pub fn reserve(size: usize) -> Result<Address> {
    let prot = libc::PROT_NONE;
    let flags = libc::MAP_ANON | libc::MAP_PRIVATE | libc::MAP_NORESERVE;
    let ptr = unsafe { libc::mmap(std::ptr::null_mut(), size, prot, flags, -1, 0) };
    if ptr == libc::MAP_FAILED {
        Err(Error::last_os_error())
    } else {
        Ok(Address::from_mut_ptr(ptr))
    }
}

/// Demand-zero commit: map `[start, start + size)` readable and writable, replacing whatever was
/// there. Fresh pages read as zero.
pub fn commit(start: Address, size: usize) -> Result<()> {
    check_page_aligned(start, size)?;
    let prot = libc::PROT_READ | libc::PROT_WRITE;
    let flags = libc::MAP_ANON | libc::MAP_PRIVATE | libc::MAP_FIXED;
    mmap_fixed(start, size, prot, flags)
}

/// Drop the pages of `[start, start + size)` and make the range inaccessible again, keeping the
/// reservation.
pub fn uncommit(start: Address, size: usize) -> Result<()> {
    check_page_aligned(start, size)?;
    let prot = libc::PROT_NONE;
    let flags = libc::MAP_ANON | libc::MAP_PRIVATE | libc::MAP_FIXED | libc::MAP_NORESERVE;
    mmap_fixed(start, size, prot, flags)
}

/// Unmap a reserved range.
pub fn release(start: Address, size: usize) -> Result<()> {
    wrap_libc_call(&|| unsafe { libc::munmap(start.to_mut_ptr(), size) }, 0)
}

fn mmap_fixed(start: Address, size: usize, prot: libc::c_int, flags: libc::c_int) -> Result<()> {
    let ptr = start.to_mut_ptr();
    wrap_libc_call(
        &|| unsafe { libc::mmap(start.to_mut_ptr(), size, prot, flags, -1, 0) },
        ptr,
    )
}

fn check_page_aligned(start: Address, size: usize) -> Result<()> {
    let page = page_size();
    if start.is_aligned_to(page) && size % page == 0 {
        Ok(())
    } else {
        Err(Error::new(
            ErrorKind::InvalidInput,
            format!("range {} + {} is not page aligned", start, size),
        ))
    }
}

fn wrap_libc_call<T: PartialEq>(f: &dyn Fn() -> T, expect: T) -> Result<()> {
    let ret = f();
    if ret == expect {
        Ok(())
    } else {
        Err(Error::last_os_error())
    }
}
