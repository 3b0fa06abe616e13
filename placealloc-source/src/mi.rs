use std::alloc::{GlobalAlloc, Layout};

use super::{MemSource, dangling};

/// Sources memory from mimalloc instead of the platform allocator. Like
/// [`Global`](crate::prelude::Global) it is process-wide and stateless.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MiMalloc;

unsafe impl MemSource for MiMalloc {
    fn allocate(&self, layout: Layout) -> *mut u8 {
        if layout.size() == 0 {
            return dangling(layout);
        }
        unsafe { mimalloc::MiMalloc.alloc(layout) }
    }

    unsafe fn deallocate(&self, ptr: *mut u8, layout: Layout) {
        if layout.size() != 0 {
            unsafe { mimalloc::MiMalloc.dealloc(ptr, layout) }
        }
    }

    fn same_source(&self, _other: &Self) -> bool {
        true
    }
}
