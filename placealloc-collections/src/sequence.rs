use std::{
    cmp, fmt,
    marker::PhantomData,
    ops::{Deref, DerefMut},
    ptr::{self, NonNull},
    slice,
};

use placealloc::{
    Allocator, StdAllocator,
    error::{Error, Result},
};

const MIN_CAPACITY: usize = 4;

/// Growable contiguous buffer on top of an [`Allocator`].
///
/// Growing asks for a new block, passing the old one as the locality hint,
/// moves the elements over and only then gives the old block back. A failed
/// grow leaves the sequence untouched.
pub struct Sequence<T, A: Allocator<Value = T> = StdAllocator<T>> {
    ptr: NonNull<T>,
    cap: usize,
    len: usize,
    alloc: A,
    _marker: PhantomData<T>,
}

unsafe impl<T, A> Send for Sequence<T, A>
where
    T: Send,
    A: Allocator<Value = T>,
{
}

unsafe impl<T, A> Sync for Sequence<T, A>
where
    T: Sync,
    A: Allocator<Value = T>,
{
}

impl<T> Sequence<T> {
    pub fn new() -> Self {
        Self::new_in(StdAllocator::new())
    }
}

impl<T> Default for Sequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: Allocator<Value = T>> Sequence<T, A> {
    /// Does not allocate.
    pub fn new_in(alloc: A) -> Self {
        Self {
            ptr: NonNull::dangling(),
            cap: 0,
            len: 0,
            alloc,
            _marker: PhantomData,
        }
    }

    pub fn with_capacity_in(capacity: usize, alloc: A) -> Result<Self> {
        let mut seq = Self::new_in(alloc);
        if capacity > 0 {
            seq.grow_to(capacity)?;
        }
        Ok(seq)
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Makes room for at least `additional` more elements.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let Some(required) = self.len.checked_add(additional) else {
            return Err(Error::Exhausted {
                count: usize::MAX,
                elem_size: size_of::<T>(),
            });
        };
        if required <= self.cap {
            return Ok(());
        }

        let doubled = cmp::min(self.cap.saturating_mul(2), self.alloc.max_size());
        let new_cap = cmp::max(required, cmp::max(doubled, MIN_CAPACITY));
        self.grow_to(new_cap)
    }

    fn grow_to(&mut self, new_cap: usize) -> Result<()> {
        let hint = (self.cap > 0).then_some(self.ptr);
        let new_ptr = self.alloc.allocate(new_cap, hint)?;

        unsafe {
            ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), self.len);
            if self.cap > 0 {
                self.alloc.deallocate(self.ptr, self.cap);
            }
        }
        tracing::trace!(from = self.cap, to = new_cap, len = self.len, "sequence grown");

        self.ptr = new_ptr;
        self.cap = new_cap;
        Ok(())
    }

    /// On exhaustion the sequence is left as it was and `value` is dropped.
    pub fn push(&mut self, value: T) -> Result<()> {
        if self.len == self.cap {
            self.reserve(1)?;
        }
        unsafe { self.alloc.construct(self.ptr.add(self.len), value) };
        self.len += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        unsafe { Some(self.ptr.add(self.len).read()) }
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.as_slice().get(index)
    }

    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Destroys every element but keeps the block.
    pub fn clear(&mut self) {
        let len = self.len;
        self.len = 0;
        for i in 0..len {
            unsafe { self.alloc.destroy(self.ptr.add(i)) };
        }
    }
}

impl<T, A: Allocator<Value = T>> Drop for Sequence<T, A> {
    fn drop(&mut self) {
        self.clear();
        if self.cap > 0 {
            unsafe { self.alloc.deallocate(self.ptr, self.cap) };
        }
    }
}

impl<T, A: Allocator<Value = T>> Deref for Sequence<T, A> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator<Value = T>> DerefMut for Sequence<T, A> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: fmt::Debug, A: Allocator<Value = T>> fmt::Debug for Sequence<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use placealloc::prelude::*;

    use crate::prelude::*;

    #[test]
    fn test_push_pop() -> anyhow::Result<()> {
        let mut seq = Sequence::new();
        assert_eq!(seq.capacity(), 0);
        assert_eq!(seq.pop(), None);

        for i in 0..1_000u32 {
            seq.push(i)?;
        }
        assert_eq!(seq.len(), 1_000);
        assert!(seq.capacity() >= 1_000);
        assert_eq!(seq.get(999), Some(&999));
        assert_eq!(seq.get(1_000), None);
        assert!(seq.iter().copied().eq(0..1_000));

        seq[10] = 77;
        assert_eq!(seq[10], 77);

        for i in (0..1_000).rev() {
            let expected = if i == 10 { 77 } else { i };
            assert_eq!(seq.pop(), Some(expected));
        }
        assert!(seq.is_empty());
        Ok(())
    }

    #[test]
    fn test_growth_pairs_blocks() -> anyhow::Result<()> {
        let tracking = Tracking::default();
        let mut seq = Sequence::new_in(StdAllocator::<u64, _>::with_source(tracking.clone()));

        for i in 0..20 {
            seq.push(i)?;
        }
        let sizes: Vec<_> = tracking.alloc_calls().iter().map(|c| c.size).collect();
        assert_eq!(sizes, vec![4 * 8, 8 * 8, 16 * 8, 32 * 8]);

        let released: Vec<_> = tracking.dealloc_calls().iter().map(|c| c.size).collect();
        assert_eq!(released, vec![4 * 8, 8 * 8, 16 * 8]);
        assert_eq!(tracking.live_bytes(), 32 * 8);

        drop(seq);
        assert_eq!(tracking.live_bytes(), 0);
        Ok(())
    }

    #[test]
    fn test_with_capacity() -> anyhow::Result<()> {
        let tracking = Tracking::default();
        let alloc = StdAllocator::<u16, _>::with_source(tracking.clone());

        let mut seq = Sequence::with_capacity_in(10, alloc.clone())?;
        assert_eq!(seq.capacity(), 10);
        for i in 0..10 {
            seq.push(i)?;
        }
        assert_eq!(tracking.alloc_calls().len(), 1);
        assert!(seq.allocator() == &alloc);

        let empty = Sequence::with_capacity_in(0, alloc)?;
        assert_eq!(empty.capacity(), 0);
        assert_eq!(tracking.alloc_calls().len(), 1);
        Ok(())
    }

    #[test]
    fn test_failed_grow_keeps_contents() -> anyhow::Result<()> {
        let tracking = TrackingOptions::new().byte_limit(64).build();
        let mut seq = Sequence::new_in(StdAllocator::<u32, _>::with_source(tracking.clone()));

        for i in 0..4 {
            seq.push(i)?;
        }
        seq.push(4)?;
        assert_eq!(seq.capacity(), 8);

        for i in 5..8 {
            seq.push(i)?;
        }
        let err = seq.push(8).unwrap_err();
        assert_eq!(
            err,
            Error::Exhausted {
                count: 16,
                elem_size: 4
            }
        );
        assert_eq!(seq.as_slice(), &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(seq.capacity(), 8);
        assert_eq!(tracking.failed_allocations(), 1);
        Ok(())
    }

    #[test]
    fn test_reserve_overflow() {
        let mut seq: Sequence<u8> = Sequence::new();
        seq.push(1).unwrap();
        assert!(matches!(
            seq.reserve(usize::MAX),
            Err(Error::Exhausted { .. })
        ));
        assert!(seq.reserve(isize::MAX as usize).is_err());
        assert_eq!(seq.as_slice(), &[1]);
    }

    #[test]
    fn test_clear_destroys_in_place() -> anyhow::Result<()> {
        static DROP_COUNTER: AtomicUsize = AtomicUsize::new(0);

        struct DropItem;

        impl Drop for DropItem {
            fn drop(&mut self) {
                DROP_COUNTER.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mut seq = Sequence::new();
        for _ in 0..6 {
            seq.push(DropItem)?;
        }
        let cap = seq.capacity();

        seq.clear();
        assert_eq!(DROP_COUNTER.load(Ordering::SeqCst), 6);
        assert_eq!(seq.capacity(), cap);

        seq.push(DropItem)?;
        drop(seq);
        assert_eq!(DROP_COUNTER.load(Ordering::SeqCst), 7);
        Ok(())
    }

    #[test]
    fn test_zero_sized_elements() -> anyhow::Result<()> {
        let tracking = Tracking::default();
        let mut seq = Sequence::new_in(StdAllocator::<(), _>::with_source(tracking.clone()));
        for _ in 0..100 {
            seq.push(())?;
        }
        assert_eq!(seq.len(), 100);
        assert!(tracking.alloc_calls().iter().all(|c| c.size == 0));
        Ok(())
    }

    #[test]
    fn test_containers_share_one_source() -> anyhow::Result<()> {
        let tracking = Tracking::default();
        let untyped = UntypedAllocator::<Tracking>::with_source(tracking.clone());

        let mut words = Sequence::new_in(untyped.rebind::<String>());
        let mut list = LinkedList::new_in(untyped.rebind::<usize>());
        for i in 0..rand::random_range(1..64) {
            words.push(i.to_string())?;
            list.push_front(i)?;
        }
        assert!(words.allocator() == list.allocator());
        assert_eq!(words.len(), list.len());

        drop(words);
        drop(list);
        assert_eq!(tracking.live_bytes(), 0);

        let sum = |calls: Vec<SourceCall>| calls.iter().map(|c| c.size).sum::<usize>();
        assert_eq!(sum(tracking.alloc_calls()), sum(tracking.dealloc_calls()));
        Ok(())
    }

    #[test]
    fn test_concurrent_sequences() {
        const THREADS: usize = 4;

        let tracking = Tracking::default();
        let alloc = StdAllocator::<usize, _>::with_source(tracking.clone());

        crossbeam::thread::scope(|s| {
            for t in 0..THREADS {
                let alloc = alloc.clone();
                s.spawn(move |_| {
                    let mut seq = Sequence::new_in(alloc);
                    for i in 0..1_000 {
                        seq.push(t * 1_000 + i).unwrap();
                    }
                    assert_eq!(seq.iter().sum::<usize>(), (t * 1_000..(t + 1) * 1_000).sum::<usize>());
                });
            }
        })
        .unwrap();

        assert_eq!(tracking.live_bytes(), 0);
    }
}
