use std::{alloc::Layout, fmt, marker::PhantomData, mem, ptr::NonNull};

use placealloc_source::prelude::*;

use crate::error::{Error, Result};

/// A memory-sourcing policy for values of one element type.
///
/// Containers hold an allocator and drive the block lifecycle themselves:
/// `allocate` first, any number of properly nested `construct`/`destroy`
/// pairs, `deallocate` last. The allocator keeps no record of any of it.
pub trait Allocator: Clone + Send + Sync {
    type Value;

    /// The same policy, retargeted to element type `U`.
    type Rebind<U>: Allocator<Value = U>;

    fn rebind<U>(&self) -> Self::Rebind<U>;

    /// Reserves uninitialized storage for exactly `count` values, aligned for
    /// `Self::Value`. `hint` may point at a related block and is only a
    /// placement suggestion.
    ///
    /// Fails with [`Error::Exhausted`] when the byte size is not
    /// representable or the source cannot provide it.
    fn allocate(
        &self,
        count: usize,
        hint: Option<NonNull<Self::Value>>,
    ) -> Result<NonNull<Self::Value>>;

    /// # Safety
    ///
    /// `block` must come from `allocate` on this allocator, or on one that is
    /// interchangeable with it, with the same `count`. No live values may
    /// remain in it and it must not be touched afterwards.
    unsafe fn deallocate(&self, block: NonNull<Self::Value>, count: usize);

    /// Largest `count` that could ever be requested.
    fn max_size(&self) -> usize;

    /// Moves `value` into an uninitialized slot.
    ///
    /// # Safety
    ///
    /// `location` must be an aligned slot inside a live block that holds no
    /// live value.
    unsafe fn construct(&self, location: NonNull<Self::Value>, value: Self::Value) {
        unsafe { location.write(value) }
    }

    /// Ends the lifetime of the value at `location`, leaving the slot
    /// uninitialized but still part of its block.
    ///
    /// # Safety
    ///
    /// `location` must hold a live value, previously put there by
    /// `construct`.
    unsafe fn destroy(&self, location: NonNull<Self::Value>) {
        unsafe { location.drop_in_place() }
    }

    /// Whether blocks from `self` may be released through `other` and the
    /// other way around.
    fn interchangeable_with<U>(&self, other: &Self::Rebind<U>) -> bool;
}

/// Allocator that forwards every request to a [`MemSource`], by default the
/// process-wide [`Global`] heap.
///
/// It carries no state besides the source handle. Two instances compare
/// equal whenever their sources are the same, whatever their element
/// types, so for `Global` every instance equals every other.
pub struct StdAllocator<T, S: MemSource = Global> {
    source: S,
    _marker: PhantomData<fn() -> T>,
}

/// Untyped handle that only exists to be rebound.
pub type UntypedAllocator<S = Global> = StdAllocator<(), S>;

impl<T> StdAllocator<T, Global> {
    pub const fn new() -> Self {
        Self {
            source: Global,
            _marker: PhantomData,
        }
    }
}

impl<T, S: MemSource> StdAllocator<T, S> {
    pub fn with_source(source: S) -> Self {
        Self {
            source,
            _marker: PhantomData,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<T, S: MemSource> Allocator for StdAllocator<T, S> {
    type Value = T;
    type Rebind<U> = StdAllocator<U, S>;

    fn rebind<U>(&self) -> StdAllocator<U, S> {
        StdAllocator::with_source(self.source.clone())
    }

    fn allocate(&self, count: usize, hint: Option<NonNull<T>>) -> Result<NonNull<T>> {
        let Ok(layout) = Layout::array::<T>(count) else {
            tracing::debug!(count, elem_size = mem::size_of::<T>(), "size overflow");
            return Err(Error::exhausted::<T>(count));
        };

        match NonNull::new(self.source.allocate(layout)) {
            Some(block) => Ok(block.cast()),
            None => {
                tracing::debug!(
                    count,
                    bytes = layout.size(),
                    ?hint,
                    "memory source exhausted"
                );
                Err(Error::exhausted::<T>(count))
            }
        }
    }

    unsafe fn deallocate(&self, block: NonNull<T>, count: usize) {
        // `count` already passed `Layout::array` when the block was made.
        let layout = unsafe {
            Layout::from_size_align_unchecked(mem::size_of::<T>() * count, mem::align_of::<T>())
        };
        unsafe { self.source.deallocate(block.as_ptr().cast(), layout) }
    }

    fn max_size(&self) -> usize {
        match mem::size_of::<T>() {
            0 => usize::MAX,
            size => isize::MAX as usize / size,
        }
    }

    fn interchangeable_with<U>(&self, other: &StdAllocator<U, S>) -> bool {
        self.source.same_source(&other.source)
    }
}

impl<T, U, S: MemSource> PartialEq<StdAllocator<U, S>> for StdAllocator<T, S> {
    fn eq(&self, other: &StdAllocator<U, S>) -> bool {
        self.interchangeable_with::<U>(other)
    }
}

impl<T, S: MemSource> Eq for StdAllocator<T, S> {}

impl<T, S: MemSource> Clone for StdAllocator<T, S> {
    fn clone(&self) -> Self {
        Self::with_source(self.source.clone())
    }
}

impl<T, S: MemSource + Copy> Copy for StdAllocator<T, S> {}

impl<T, S: MemSource + Default> Default for StdAllocator<T, S> {
    fn default() -> Self {
        Self::with_source(S::default())
    }
}

impl<T, S: MemSource + fmt::Debug> fmt::Debug for StdAllocator<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdAllocator")
            .field("value", &std::any::type_name::<T>())
            .field("source", &self.source)
            .finish()
    }
}
