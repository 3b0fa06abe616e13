use std::{fmt, marker::PhantomData, ptr::NonNull};

use placealloc::{Allocator, StdAllocator, error::Result};

struct Node<T> {
    value: T,
    next: Option<NonNull<Node<T>>>,
}

/// Singly linked stack. The list is generic over an allocator for `T`, but
/// what it actually stores are nodes, so it rebinds the allocator to
/// `Node<T>` and never allocates a bare `T`.
pub struct LinkedList<T, A: Allocator<Value = T> = StdAllocator<T>> {
    head: Option<NonNull<Node<T>>>,
    len: usize,
    alloc: A,
    nodes: A::Rebind<Node<T>>,
    _marker: PhantomData<Box<Node<T>>>,
}

unsafe impl<T, A> Send for LinkedList<T, A>
where
    T: Send,
    A: Allocator<Value = T>,
{
}

unsafe impl<T, A> Sync for LinkedList<T, A>
where
    T: Sync,
    A: Allocator<Value = T>,
{
}

impl<T> LinkedList<T> {
    pub fn new() -> Self {
        Self::new_in(StdAllocator::new())
    }
}

impl<T> Default for LinkedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: Allocator<Value = T>> LinkedList<T, A> {
    pub fn new_in(alloc: A) -> Self {
        let nodes = alloc.rebind();
        Self {
            head: None,
            len: 0,
            alloc,
            nodes,
            _marker: PhantomData,
        }
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// On exhaustion the list is left as it was and `value` is dropped.
    pub fn push_front(&mut self, value: T) -> Result<()> {
        // new nodes go next to the current head
        let node = self.nodes.allocate(1, self.head)?;
        unsafe {
            self.nodes.construct(
                node,
                Node {
                    value,
                    next: self.head,
                },
            );
        }
        self.head = Some(node);
        self.len += 1;
        Ok(())
    }

    pub fn pop_front(&mut self) -> Option<T> {
        let node = self.head?;
        unsafe {
            let Node { value, next } = node.read();
            self.nodes.deallocate(node, 1);
            self.head = next;
            self.len -= 1;
            Some(value)
        }
    }

    pub fn front(&self) -> Option<&T> {
        self.head.map(|node| unsafe { &(*node.as_ptr()).value })
    }

    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.head.map(|node| unsafe { &mut (*node.as_ptr()).value })
    }

    pub fn iter(&self) -> ListIter<'_, T> {
        ListIter {
            cur: self.head,
            remaining: self.len,
            _marker: PhantomData,
        }
    }

    pub fn clear(&mut self) {
        let mut cur = self.head.take();
        while let Some(node) = cur {
            unsafe {
                cur = node.as_ref().next;
                self.nodes.destroy(node);
                self.nodes.deallocate(node, 1);
            }
        }
        self.len = 0;
    }
}

impl<T, A: Allocator<Value = T>> Drop for LinkedList<T, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: fmt::Debug, A: Allocator<Value = T>> fmt::Debug for LinkedList<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

pub struct ListIter<'a, T> {
    cur: Option<NonNull<Node<T>>>,
    remaining: usize,
    _marker: PhantomData<&'a T>,
}

impl<'a, T> Iterator for ListIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cur?;
        unsafe {
            let node = &*node.as_ptr();
            self.cur = node.next;
            self.remaining -= 1;
            Some(&node.value)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for ListIter<'_, T> {}
