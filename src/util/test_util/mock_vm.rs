//! A runtime for tests. Objects have a two-word header followed by their reference fields and
//! then their payload words:
//!
//! ```text
//! +0   mark word     PROTOTYPE_MARK_WORD, or an identity hash shifted left by 8 with the low bit set
//! +8   type word     size in bytes (bits 0..32), number of references (bits 32..48), dummy (bit 63)
//! +16  references    one word each, 0 for null
//! ...  payload       plain words
//! ```
//!
//! Roots live in boxed words owned by the mock, so they keep their addresses while tests add
//! more. The collection hooks are [`MockMethod`]s that record their calls.

use crate::memory_manager;
use crate::plan::Mutator;
use crate::util::alloc::AllocationError;
use crate::util::constants::BYTES_IN_WORD;
use crate::util::conversions::raw_align_up;
use crate::util::opaque_pointer::*;
use crate::util::{Address, ObjectReference};
use crate::vm::{Collection, ObjectModel, Scanning, SimpleSlot, SlotVisitor, VMBinding};

use super::mock_method::*;

use atomic::{Atomic, Ordering};
use std::default::Default;
use std::sync::Mutex;

lazy_static! {
    // The mutex may get poisoned any time. Accessing this mutex needs to deal with the poisoned case.
    // One can use read/write_mockvm to access mock vm.
    static ref MOCK_VM_INSTANCE: Mutex<MockVM> = Mutex::new(MockVM::default());
}

// The closure runs after the mock VM is unlocked, so it may block on other threads that call
// into the mock.
macro_rules! mock {
    ($fn: ident($($arg:expr),*)) => {{
        #[allow(unused_parens)]
        let args = ($($arg),*);
        let closure = write_mockvm(|mock| mock.$fn.record(&args));
        closure(args)
    }};
}

pub fn read_mockvm<F, R>(func: F) -> R
where
    F: FnOnce(&MockVM) -> R,
{
    let lock = MOCK_VM_INSTANCE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    func(&lock)
}

pub fn write_mockvm<F, R>(func: F) -> R
where
    F: FnOnce(&mut MockVM) -> R,
{
    let mut lock = MOCK_VM_INSTANCE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    func(&mut lock)
}

pub fn with_mockvm<S, T, C>(setup: S, test: T, cleanup: C)
where
    S: FnOnce() -> MockVM,
    T: FnOnce() + std::panic::UnwindSafe,
    C: FnOnce(),
{
    super::serial_test(|| {
        // Setup
        {
            write_mockvm(|mock| *mock = setup());
        }
        super::with_cleanup(test, cleanup);
    })
}

pub fn default_setup() -> MockVM {
    MockVM::default()
}

pub fn no_cleanup() {}

pub const HEADER_BYTES: usize = 2 * BYTES_IN_WORD;
pub const PROTOTYPE: usize = 0b01;
const HASH_SHIFT: usize = 8;
const SIZE_MASK: usize = 0xffff_ffff;
const NUM_REFS_SHIFT: usize = 32;
const NUM_REFS_MASK: usize = 0xffff;
const DUMMY_BIT: usize = 1 << 63;

pub struct MockVM {
    // collection
    pub stop_all_mutators: MockMethod<VMThread, ()>,
    pub resume_mutators: MockMethod<VMThread, ()>,
    pub enter_heap_lock_wait: MockMethod<VMThread, ()>,
    pub leave_heap_lock_wait: MockMethod<VMThread, ()>,
    pub out_of_memory: MockMethod<(VMThread, AllocationError), ()>,
    pub resize_metadata: MockMethod<VMThread, ()>,
    pub update_counters: MockMethod<(usize, usize, usize), ()>,
    // scanning
    pub roots: Vec<Box<Atomic<Address>>>,
    /// The `update` argument of each root scan.
    pub root_scans: Vec<bool>,
}

impl Default for MockVM {
    fn default() -> Self {
        Self {
            stop_all_mutators: MockMethod::new_default(),
            resume_mutators: MockMethod::new_default(),
            enter_heap_lock_wait: MockMethod::new_default(),
            leave_heap_lock_wait: MockMethod::new_default(),
            out_of_memory: MockMethod::new_fixed(Box::new(|(_, err)| {
                panic!("Out of memory with {:?}!", err)
            })),
            resize_metadata: MockMethod::new_default(),
            update_counters: MockMethod::new_default(),
            roots: vec![],
            root_scans: vec![],
        }
    }
}

impl VMBinding for MockVM {
    type VMObjectModel = MockVM;
    type VMScanning = MockVM;
    type VMCollection = MockVM;
    type VMSlot = SimpleSlot;

    const MIN_ALIGNMENT: usize = 16;
}

impl ObjectModel<MockVM> for MockVM {
    const PROTOTYPE_MARK_WORD: usize = PROTOTYPE;

    fn get_current_size(object: ObjectReference) -> usize {
        type_word(object) & SIZE_MASK
    }

    fn load_mark_word(object: ObjectReference) -> usize {
        unsafe { object.to_raw_address().load::<usize>() }
    }

    fn store_mark_word(object: ObjectReference, value: usize) {
        unsafe { object.to_raw_address().store::<usize>(value) }
    }

    fn fill_with_dummy_object(start: Address, bytes: usize) {
        debug_assert!(bytes >= HEADER_BYTES);
        unsafe {
            start.store::<usize>(PROTOTYPE);
            (start + BYTES_IN_WORD).store::<usize>(bytes | DUMMY_BIT);
        }
    }

    fn is_dummy_object(object: ObjectReference) -> bool {
        type_word(object) & DUMMY_BIT != 0
    }
}

impl Scanning<MockVM> for MockVM {
    fn scan_object<SV: SlotVisitor<SimpleSlot>>(object: ObjectReference, slot_visitor: &mut SV) {
        for i in 0..num_refs(object) {
            slot_visitor.visit_slot(field_slot(object, i));
        }
    }

    fn scan_roots<SV: SlotVisitor<SimpleSlot>>(update: bool, slot_visitor: &mut SV) {
        write_mockvm(|mock| {
            mock.root_scans.push(update);
            for root in mock.roots.iter() {
                slot_visitor.visit_slot(SimpleSlot::from_address(Address::from_ref(&**root)));
            }
        })
    }
}

impl Collection<MockVM> for MockVM {
    fn stop_all_mutators(tls: VMThread) {
        mock!(stop_all_mutators(tls))
    }

    fn resume_mutators(tls: VMThread) {
        mock!(resume_mutators(tls))
    }

    fn enter_heap_lock_wait(tls: VMThread) {
        mock!(enter_heap_lock_wait(tls))
    }

    fn leave_heap_lock_wait(tls: VMThread) {
        mock!(leave_heap_lock_wait(tls))
    }

    fn out_of_memory(tls: VMThread, err_kind: AllocationError) {
        mock!(out_of_memory(tls, err_kind))
    }

    fn resize_metadata(tls: VMThread) {
        mock!(resize_metadata(tls))
    }

    fn update_counters(used: usize, committed: usize, max: usize) {
        mock!(update_counters(used, committed, max))
    }
}

fn type_word(object: ObjectReference) -> usize {
    unsafe { (object.to_raw_address() + BYTES_IN_WORD).load::<usize>() }
}

fn field_slot(object: ObjectReference, i: usize) -> SimpleSlot {
    SimpleSlot::from_address(object.to_raw_address() + HEADER_BYTES + i * BYTES_IN_WORD)
}

fn payload_address(object: ObjectReference, i: usize) -> Address {
    object.to_raw_address() + HEADER_BYTES + (num_refs(object) + i) * BYTES_IN_WORD
}

/// The allocation size of an object with `num_refs` references and `payload_words` payload words.
pub fn object_size(num_refs: usize, payload_words: usize) -> usize {
    raw_align_up(
        HEADER_BYTES + (num_refs + payload_words) * BYTES_IN_WORD,
        MockVM::MIN_ALIGNMENT,
    )
}

/// Allocate and initialize an object. Returns `None` if the allocation failed, after the
/// `out_of_memory` hook ran.
pub fn try_alloc_object(
    mutator: &mut Mutator<MockVM>,
    num_refs: usize,
    payload_words: usize,
) -> Option<ObjectReference> {
    let addr = memory_manager::alloc(mutator, object_size(num_refs, payload_words));
    if addr.is_zero() {
        return None;
    }
    Some(init_object(addr, num_refs, payload_words))
}

/// Write the header of an object at `addr`, which must have `object_size(num_refs,
/// payload_words)` bytes, and zero its fields.
pub fn init_object(addr: Address, num_refs: usize, payload_words: usize) -> ObjectReference {
    assert!(num_refs <= NUM_REFS_MASK);
    let size = object_size(num_refs, payload_words);
    crate::util::memory::zero(addr, size);
    unsafe {
        addr.store::<usize>(PROTOTYPE);
        (addr + BYTES_IN_WORD).store::<usize>(size | (num_refs << NUM_REFS_SHIFT));
        ObjectReference::from_raw_address_unchecked(addr)
    }
}

pub fn alloc_object(
    mutator: &mut Mutator<MockVM>,
    num_refs: usize,
    payload_words: usize,
) -> ObjectReference {
    try_alloc_object(mutator, num_refs, payload_words)
        .unwrap_or_else(|| panic!("Failed to allocate an object with {} refs", num_refs))
}

pub fn num_refs(object: ObjectReference) -> usize {
    (type_word(object) >> NUM_REFS_SHIFT) & NUM_REFS_MASK
}

pub fn set_field(object: ObjectReference, i: usize, value: Option<ObjectReference>) {
    assert!(i < num_refs(object));
    let raw = value.map_or(Address::ZERO, |o| o.to_raw_address());
    unsafe { field_slot(object, i).as_address().store::<Address>(raw) }
}

pub fn get_field(object: ObjectReference, i: usize) -> Option<ObjectReference> {
    assert!(i < num_refs(object));
    ObjectReference::from_raw_address(unsafe { field_slot(object, i).as_address().load::<Address>() })
}

pub fn set_payload(object: ObjectReference, i: usize, value: usize) {
    unsafe { payload_address(object, i).store::<usize>(value) }
}

pub fn get_payload(object: ObjectReference, i: usize) -> usize {
    unsafe { payload_address(object, i).load::<usize>() }
}

/// Install an identity hash in the mark word, which makes the mark word worth preserving.
pub fn set_hash(object: ObjectReference, hash: usize) {
    MockVM::store_mark_word(object, (hash << HASH_SHIFT) | PROTOTYPE);
}

pub fn get_hash(object: ObjectReference) -> Option<usize> {
    let mark_word = MockVM::load_mark_word(object);
    if mark_word == PROTOTYPE {
        None
    } else {
        Some(mark_word >> HASH_SHIFT)
    }
}

/// Add a root holding `object`, and return its index.
pub fn add_root(object: Option<ObjectReference>) -> usize {
    let raw = object.map_or(Address::ZERO, |o| o.to_raw_address());
    write_mockvm(|mock| {
        mock.roots.push(Box::new(Atomic::new(raw)));
        mock.roots.len() - 1
    })
}

pub fn get_root(i: usize) -> Option<ObjectReference> {
    read_mockvm(|mock| ObjectReference::from_raw_address(mock.roots[i].load(Ordering::Relaxed)))
}

pub fn set_root(i: usize, object: Option<ObjectReference>) {
    let raw = object.map_or(Address::ZERO, |o| o.to_raw_address());
    read_mockvm(|mock| mock.roots[i].store(raw, Ordering::Relaxed))
}

pub fn clear_roots() {
    write_mockvm(|mock| mock.roots.clear())
}
