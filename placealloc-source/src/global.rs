use std::alloc::Layout;

use super::{MemSource, dangling};

/// The platform allocator. There is one per process, so every handle is
/// interchangeable with every other.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Global;

unsafe impl MemSource for Global {
    fn allocate(&self, layout: Layout) -> *mut u8 {
        if layout.size() == 0 {
            return dangling(layout);
        }
        unsafe { std::alloc::alloc(layout) }
    }

    unsafe fn deallocate(&self, ptr: *mut u8, layout: Layout) {
        if layout.size() != 0 {
            unsafe { std::alloc::dealloc(ptr, layout) }
        }
    }

    fn same_source(&self, _other: &Self) -> bool {
        true
    }
}
