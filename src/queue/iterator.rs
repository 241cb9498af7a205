use crate::alloc::Alloc;
use crate::element::DebugPayload;
use crate::queue::{Entry, Link, Queue};
use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ptr::NonNull;

/// An iterator over the payloads of a `Queue`.
///
/// It uses a pair of nodes `start..end` to represent a half-open subrange
/// of the queue, where `start` is inclusive and `end` is not.
///
/// Though the `Iter` does not hold a reference from the queue,
/// it actually *borrows* (immutably) from the queue, so a phantom
/// marker is added to protect the queue from being written.
///
/// # Examples
///
/// ```compile_fail
/// use cyclic_queue::Queue;
///
/// let mut queue = Queue::new();
/// queue.insert_tail("a").unwrap();
/// let mut iter = queue.iter();
///
/// // Won't compile, because queue is already borrowed immutably.
/// queue.insert_tail("b").unwrap();
/// println!("{:?}", iter.next());
/// ```
#[derive(Clone)]
pub struct Iter<'a> {
    start: NonNull<Link>,
    end: NonNull<Link>,
    _marker: PhantomData<&'a Entry>,
}

impl<'a> Iter<'a> {
    pub(crate) fn new(start: NonNull<Link>, end: NonNull<Link>) -> Self {
        Self {
            start,
            end,
            _marker: PhantomData,
        }
    }
}

impl<'a> fmt::Debug for Iter<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Iter")
            .field(&self.clone().map(DebugPayload).collect::<Vec<_>>())
            .finish()
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a [u8];

    /// Return `*start` and reset the iterating range to `(start.next)..end`,
    /// or return `None` if `start..end` is already empty.
    fn next(&mut self) -> Option<Self::Item> {
        if self.start == self.end {
            return None;
        }
        // SAFETY: `start..end` is always a valid range of a queue,
        // and it is not empty here, so `start` is an element.
        let current = self.start;
        unsafe {
            self.start = current.as_ref().next;
            Some(Entry::value(current))
        }
    }

    fn last(mut self) -> Option<Self::Item>
    where
        Self: Sized,
    {
        self.next_back()
    }
}

impl<'a> DoubleEndedIterator for Iter<'a> {
    /// Reset the iterating range to `start..(end.prev)` and return `*end`,
    /// or return `None` if `start..end` is already empty.
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.start == self.end {
            return None;
        }
        // SAFETY: `start..end` is always a valid range of a queue,
        // and it is not empty here, so `end.prev` is an element.
        unsafe {
            self.end = self.end.as_ref().prev;
            Some(Entry::value(self.end))
        }
    }
}

impl<'a> FusedIterator for Iter<'a> {}

impl<'a, A: Alloc> IntoIterator for &'a Queue<A> {
    type Item = &'a [u8];
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use crate::Queue;

    #[test]
    fn iter_both_ends() {
        let mut queue = Queue::new();
        for value in ["1", "2", "3", "4"].iter() {
            queue.insert_tail(value).unwrap();
        }
        let mut iter = queue.iter();
        assert_eq!(iter.next(), Some(&b"1"[..]));
        assert_eq!(iter.next_back(), Some(&b"4"[..]));
        assert_eq!(iter.next(), Some(&b"2"[..]));
        assert_eq!(iter.next_back(), Some(&b"3"[..]));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);
        // fused
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn iter_rev_and_last() {
        let mut queue = Queue::new();
        queue.insert_tail("x").unwrap();
        queue.insert_tail("y").unwrap();
        queue.insert_tail("z").unwrap();
        let reversed: Vec<&[u8]> = queue.iter().rev().collect();
        assert_eq!(reversed, vec![&b"z"[..], &b"y"[..], &b"x"[..]]);
        assert_eq!(queue.iter().last(), Some(&b"z"[..]));
        assert_eq!((&queue).into_iter().count(), 3);
    }

    #[test]
    fn iter_empty() {
        let queue = Queue::new();
        assert_eq!(queue.iter().next(), None);
        assert_eq!(queue.iter().next_back(), None);
        assert_eq!(format!("{:?}", queue.iter()), "Iter([])");
    }
}
