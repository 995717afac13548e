//! Utilities used by the collector: addresses, memory management, options, metadata, and the
//! allocation buffers.

pub mod address;
pub mod alloc;
pub mod constants;
pub mod conversions;
pub mod heap;
pub mod logger;
pub mod memory;
pub mod metadata;
pub mod object_forwarding;
pub mod opaque_pointer;
pub mod options;
pub mod pin_state;
pub mod statistics;

/// Test utilities and the mock VM, for unit tests and for benchmarks with the `mock_test` feature.
#[cfg(any(test, feature = "mock_test"))]
pub mod test_util;

pub use self::address::Address;
pub use self::address::ObjectReference;
pub use self::opaque_pointer::*;
