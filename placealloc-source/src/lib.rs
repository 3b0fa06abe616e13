use std::alloc::Layout;

mod global;
mod mi;
mod options;
mod traced;
mod tracking;

pub mod prelude {
    pub use super::MemSource;
    pub use super::global::Global;
    pub use super::mi::MiMalloc;
    pub use super::options::TrackingOptions;
    pub use super::traced::Traced;
    pub use super::tracking::{CallKind, SourceCall, Tracking};
}

/// Where raw bytes come from. Typed allocators sit on top of a source and
/// never talk to the platform allocator directly.
///
/// # Safety
///
/// A non-null pointer returned by `allocate` must be valid for reads and
/// writes of `layout.size()` bytes, aligned to `layout.align()`, and must stay
/// valid until it is handed back to `deallocate` of this source (or of any
/// source for which `same_source` returns true).
pub unsafe trait MemSource: Clone + Send + Sync {
    /// Returns null when the request cannot be satisfied. Zero-size layouts
    /// are legal and must not touch the underlying heap.
    fn allocate(&self, layout: Layout) -> *mut u8;

    /// # Safety
    ///
    /// `ptr` must come from `allocate` on an equivalent source with the same
    /// `layout`, and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: *mut u8, layout: Layout);

    /// Whether a block allocated through `self` may be released through
    /// `other`.
    fn same_source(&self, other: &Self) -> bool;
}

/// Aligned, non-null address for zero-size requests.
pub(crate) fn dangling(layout: Layout) -> *mut u8 {
    std::ptr::without_provenance_mut(layout.align())
}
