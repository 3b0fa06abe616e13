use std::{
    alloc::Layout,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering::*},
    },
};

use parking_lot::Mutex;

use super::{MemSource, global::Global, options::TrackingOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Allocate,
    Deallocate,
}

/// One request that reached the wrapped source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceCall {
    pub kind: CallKind,
    pub size: usize,
    pub align: usize,
}

impl SourceCall {
    fn new(kind: CallKind, layout: Layout) -> Self {
        Self {
            kind,
            size: layout.size(),
            align: layout.align(),
        }
    }
}

/// Records every request forwarded to `S` and keeps byte counters. Clones
/// share one record, so two handles are the same source only when they
/// come from the same `Tracking`.
///
/// An optional byte budget makes requests that would push the live total
/// past the limit fail, which is how tests provoke exhaustion.
#[derive(Debug, Clone)]
pub struct Tracking<S = Global>(Arc<TrackingInner<S>>);

#[derive(Debug)]
struct TrackingInner<S> {
    source: S,
    label: String,
    byte_limit: Option<usize>,
    calls: Mutex<Vec<SourceCall>>,
    live: AtomicUsize,
    peak: AtomicUsize,
    failed: AtomicUsize,
}

impl Default for Tracking<Global> {
    fn default() -> Self {
        TrackingOptions::default().build()
    }
}

impl<S: MemSource> Tracking<S> {
    pub fn new(source: S) -> Self {
        TrackingOptions::default().build_on(source)
    }

    pub(crate) fn from_parts(source: S, label: String, byte_limit: Option<usize>) -> Self {
        Self(Arc::new(TrackingInner {
            source,
            label,
            byte_limit,
            calls: Mutex::new(Vec::new()),
            live: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }))
    }

    pub fn label(&self) -> &str {
        &self.0.label
    }

    pub fn byte_limit(&self) -> Option<usize> {
        self.0.byte_limit
    }

    /// Requests the source satisfied, in the order they happened.
    pub fn calls(&self) -> Vec<SourceCall> {
        self.0.calls.lock().clone()
    }

    pub fn alloc_calls(&self) -> Vec<SourceCall> {
        self.calls_of(CallKind::Allocate)
    }

    pub fn dealloc_calls(&self) -> Vec<SourceCall> {
        self.calls_of(CallKind::Deallocate)
    }

    fn calls_of(&self, kind: CallKind) -> Vec<SourceCall> {
        self.0
            .calls
            .lock()
            .iter()
            .filter(|call| call.kind == kind)
            .copied()
            .collect()
    }

    pub fn live_bytes(&self) -> usize {
        self.0.live.load(SeqCst)
    }

    pub fn peak_bytes(&self) -> usize {
        self.0.peak.load(SeqCst)
    }

    pub fn failed_allocations(&self) -> usize {
        self.0.failed.load(SeqCst)
    }

    /// Forgets the call log and failure count. Live bytes are kept, since
    /// blocks handed out earlier are still owned by someone.
    pub fn clear(&self) {
        self.0.calls.lock().clear();
        self.0.failed.store(0, SeqCst);
    }

    fn refuse(&self, layout: Layout) -> *mut u8 {
        self.0.failed.fetch_add(1, SeqCst);
        tracing::debug!(
            label = %self.0.label,
            size = layout.size(),
            live = self.live_bytes(),
            limit = ?self.0.byte_limit,
            "tracking source refused allocation"
        );
        std::ptr::null_mut()
    }
}

unsafe impl<S: MemSource> MemSource for Tracking<S> {
    fn allocate(&self, layout: Layout) -> *mut u8 {
        let inner = &self.0;
        let size = layout.size();

        let reserved = inner.live.fetch_update(SeqCst, SeqCst, |live| {
            let next = live.checked_add(size)?;
            match inner.byte_limit {
                Some(limit) if next > limit => None,
                _ => Some(next),
            }
        });
        let live = match reserved {
            Ok(prev) => prev + size,
            Err(_) => return self.refuse(layout),
        };

        let ptr = inner.source.allocate(layout);
        if ptr.is_null() {
            inner.live.fetch_sub(size, SeqCst);
            return self.refuse(layout);
        }

        inner.peak.fetch_max(live, SeqCst);
        inner
            .calls
            .lock()
            .push(SourceCall::new(CallKind::Allocate, layout));
        ptr
    }

    unsafe fn deallocate(&self, ptr: *mut u8, layout: Layout) {
        let inner = &self.0;
        inner
            .calls
            .lock()
            .push(SourceCall::new(CallKind::Deallocate, layout));
        inner.live.fetch_sub(layout.size(), SeqCst);
        unsafe { inner.source.deallocate(ptr, layout) }
    }

    fn same_source(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
