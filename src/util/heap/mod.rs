pub mod inspection;
pub mod reporting;
mod virtual_space;

pub use self::reporting::HeapReporter;
pub use self::virtual_space::VirtualSpace;
