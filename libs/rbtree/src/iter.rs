use crate::links::links;
use crate::traverse::{next, next_postorder, prev};
use crate::{Link, Linked, Root};
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::ptr::NonNull;

/// An iterator over references to the entries of a [`Root`], in ascending order.
pub struct Iter<'a, T: Linked> {
    pub(crate) head: Link<T>,
    pub(crate) tail: Link<T>,
    pub(crate) _tree: &'a Root<T>,
}

impl<'a, T: Linked> Clone for Iter<'a, T> {
    #[inline]
    fn clone(&self) -> Iter<'a, T> {
        Iter {
            head: self.head,
            tail: self.tail,
            _tree: self._tree,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T>
where
    T: Linked + 'a,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let head = self.head?;

        if Some(head) == self.tail {
            self.head = None;
            self.tail = None;
        } else {
            // Safety: the tree is borrowed, so `head` is a live, linked node
            self.head = unsafe { next(head) };
        }

        // Safety: the tree is borrowed, so `head` is a live, linked node
        Some(unsafe { head.as_ref() })
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T>
where
    T: Linked + 'a,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        let tail = self.tail?;

        if Some(tail) == self.head {
            self.head = None;
            self.tail = None;
        } else {
            // Safety: the tree is borrowed, so `tail` is a live, linked node
            self.tail = unsafe { prev(tail) };
        }

        // Safety: the tree is borrowed, so `tail` is a live, linked node
        Some(unsafe { tail.as_ref() })
    }
}

impl<'a, T> FusedIterator for Iter<'a, T> where T: Linked + 'a {}

/// An iterator over references to the entries of a [`Root`] in postorder: every entry is yielded
/// after both of its children.
pub struct Postorder<'a, T: Linked> {
    pub(crate) next: Link<T>,
    pub(crate) _tree: &'a Root<T>,
}

impl<'a, T> Iterator for Postorder<'a, T>
where
    T: Linked + 'a,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let curr = self.next?;
        // Safety: the tree is borrowed, so `curr` is a live, linked node
        unsafe {
            self.next = next_postorder(curr);
            Some(curr.as_ref())
        }
    }
}

impl<'a, T> FusedIterator for Postorder<'a, T> where T: Linked + 'a {}

/// A draining iterator returned by [`Root::drain`].
///
/// Yields every node of the tree exactly once, in postorder. A node is returned to the empty state
/// before it is yielded and the iterator never touches it again, so the caller may free the backing
/// record right away. Dropping the iterator early unlinks the remaining nodes.
pub struct Drain<'a, T: Linked> {
    pub(crate) next: Link<T>,
    pub(crate) _marker: PhantomData<&'a mut Root<T>>,
}

impl<T: Linked> Iterator for Drain<'_, T> {
    type Item = NonNull<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let curr = self.next?;
        // Safety: every node not yet yielded is still live and linked, and the successor is
        // determined before `curr` is cleared
        unsafe {
            self.next = next_postorder(curr);
            links(curr).clear();
        }
        Some(curr)
    }
}

impl<T: Linked> FusedIterator for Drain<'_, T> {}

impl<T: Linked> Drop for Drain<'_, T> {
    fn drop(&mut self) {
        self.for_each(drop);
    }
}
