use std::{alloc::Layout, sync::Arc};

use super::MemSource;

/// Emits a `tracing` event for every request before handing it to `S`.
/// Events go out at `trace` level, refusals at `warn`, so the hook is
/// switched on and off through the subscriber filter.
#[derive(Debug, Clone)]
pub struct Traced<S> {
    source: S,
    label: Arc<str>,
}

impl<S: MemSource> Traced<S> {
    pub fn new(source: S, label: impl Into<Arc<str>>) -> Self {
        Self {
            source,
            label: label.into(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.source
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

unsafe impl<S: MemSource> MemSource for Traced<S> {
    fn allocate(&self, layout: Layout) -> *mut u8 {
        let ptr = self.source.allocate(layout);
        if ptr.is_null() {
            tracing::warn!(
                label = %self.label,
                size = layout.size(),
                align = layout.align(),
                "allocation refused"
            );
        } else {
            tracing::trace!(
                label = %self.label,
                size = layout.size(),
                align = layout.align(),
                ?ptr,
                "allocate"
            );
        }
        ptr
    }

    unsafe fn deallocate(&self, ptr: *mut u8, layout: Layout) {
        tracing::trace!(
            label = %self.label,
            size = layout.size(),
            align = layout.align(),
            ?ptr,
            "deallocate"
        );
        unsafe { self.source.deallocate(ptr, layout) }
    }

    fn same_source(&self, other: &Self) -> bool {
        self.source.same_source(&other.source)
    }
}
