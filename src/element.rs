use std::alloc::Layout;
use std::fmt;
use std::mem::ManuallyDrop;
use std::ptr::{self, NonNull};

use crate::alloc::{Alloc, Global};
use crate::error::Allocation;
use crate::queue::{Entry, Link};

/// An element detached from a [`Queue`](crate::Queue).
///
/// Removing an element from a queue only unlinks it: the container and its
/// payload stay allocated and their ownership moves to the returned
/// `Element`. It is released by [`Element::release`], or when dropped.
///
/// An `Element` can never be linked into a queue again. Queues only grow by
/// copying a payload into a fresh container.
///
/// # Examples
///
/// ```
/// use cyclic_queue::Queue;
///
/// let mut queue = Queue::new();
/// queue.insert_tail("lynx").unwrap();
///
/// let element = queue.remove_tail(None).unwrap();
/// assert!(queue.is_empty());
/// assert_eq!(element.as_str(), Some("lynx"));
/// element.release();
/// ```
pub struct Element<A: Alloc = Global> {
    entry: Box<Entry>,
    alloc: A,
}

impl<A: Alloc> Element<A> {
    /// Take ownership of the entry embedding `link`.
    ///
    /// It is unsafe because `link` must be embedded in an entry created by
    /// `Entry::new_detached` that has already been unlinked, and whose grants
    /// were obtained from `alloc`.
    pub(crate) unsafe fn from_link(link: NonNull<Link>, alloc: A) -> Self {
        let entry = Box::from_raw(link.cast::<Entry>().as_ptr());
        Self { entry, alloc }
    }

    /// The payload bytes.
    #[inline]
    pub fn value(&self) -> &[u8] {
        &self.entry.value
    }

    /// The payload as a string, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.value()).ok()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entry.value.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entry.value.is_empty()
    }

    /// Copies the payload into `buf`, truncating it so that a terminating
    /// zero byte always fits. The rest of `buf` is zero-filled.
    ///
    /// Returns the number of payload bytes copied. An empty `buf` is left
    /// untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use cyclic_queue::Queue;
    ///
    /// let mut queue = Queue::new();
    /// queue.insert_tail("giraffe").unwrap();
    /// let element = queue.remove_head(None).unwrap();
    ///
    /// let mut buf = [0xff; 5];
    /// assert_eq!(element.copy_to(&mut buf), 4);
    /// assert_eq!(&buf, b"gira\0");
    /// ```
    pub fn copy_to(&self, buf: &mut [u8]) -> usize {
        let cap = match buf.len().checked_sub(1) {
            Some(cap) => cap,
            None => return 0,
        };
        let n = self.len().min(cap);
        for byte in buf.iter_mut() {
            *byte = 0;
        }
        buf[..n].copy_from_slice(&self.value()[..n]);
        n
    }

    /// Releases the payload, then the container.
    #[inline]
    pub fn release(self) {
        drop(self)
    }

    /// Releases the container and keeps the payload.
    ///
    /// The returned bytes are no longer accounted by the queue's allocator.
    ///
    /// # Examples
    ///
    /// ```
    /// use cyclic_queue::alloc::Tracking;
    /// use cyclic_queue::Queue;
    ///
    /// let tracking = Tracking::new();
    /// let mut queue = Queue::try_new_in(tracking.clone()).unwrap();
    /// queue.insert_tail("panda").unwrap();
    ///
    /// let value = queue.remove_head(None).unwrap().into_value();
    /// assert_eq!(&*value, b"panda");
    /// assert_eq!(tracking.live(), 1);
    /// ```
    pub fn into_value(self) -> Box<[u8]> {
        let this = ManuallyDrop::new(self);
        this.report_release();
        // SAFETY: `this` is never dropped, so both fields are read out
        // exactly once.
        let (entry, alloc) = unsafe { (ptr::read(&this.entry), ptr::read(&this.alloc)) };
        drop(alloc);
        let Entry { value, .. } = *entry;
        value
    }

    fn report_release(&self) {
        self.alloc
            .release(Allocation::Payload, Layout::for_value(&*self.entry.value));
        self.alloc
            .release(Allocation::Element, Layout::new::<Entry>());
    }
}

impl<A: Alloc> Drop for Element<A> {
    fn drop(&mut self) {
        self.report_release();
    }
}

impl<A: Alloc> fmt::Debug for Element<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Element")
            .field(&DebugPayload(self.value()))
            .finish()
    }
}

impl<A: Alloc> PartialEq for Element<A> {
    fn eq(&self, other: &Self) -> bool {
        self.value() == other.value()
    }
}

impl<A: Alloc> Eq for Element<A> {}

// The links of a detached entry are stale and never read.
unsafe impl<A: Alloc + Send> Send for Element<A> {}

unsafe impl<A: Alloc + Sync> Sync for Element<A> {}

/// Formats a payload as a string when it is valid UTF-8, as bytes otherwise.
pub(crate) struct DebugPayload<'a>(pub(crate) &'a [u8]);

impl fmt::Debug for DebugPayload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(self.0) {
            Ok(s) => fmt::Debug::fmt(s, f),
            Err(_) => fmt::Debug::fmt(self.0, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::alloc::Tracking;
    use crate::Queue;

    #[test]
    fn element_release_order_and_accounting() {
        let tracking = Tracking::new();
        let mut queue = Queue::try_new_in(tracking.clone()).unwrap();
        queue.insert_tail("koala").unwrap();
        queue.insert_tail("emu").unwrap();

        let first = queue.remove_head(None).unwrap();
        let second = queue.remove_head(None).unwrap();
        drop(queue);
        // the detached elements outlive their queue
        assert_eq!(tracking.live(), 4);
        assert_eq!(first.value(), b"koala");

        first.release();
        assert_eq!(tracking.live(), 2);
        drop(second);
        assert_eq!(tracking.live(), 0);
        assert_eq!(tracking.live_bytes(), 0);
    }

    #[test]
    fn element_copy_to() {
        let mut queue = Queue::new();
        queue.insert_tail("abc").unwrap();
        let element = queue.remove_head(None).unwrap();

        let mut exact = [0xff; 4];
        assert_eq!(element.copy_to(&mut exact), 3);
        assert_eq!(&exact, b"abc\0");

        let mut roomy = [0xff; 8];
        assert_eq!(element.copy_to(&mut roomy), 3);
        assert_eq!(&roomy, b"abc\0\0\0\0\0");

        let mut empty: [u8; 0] = [];
        assert_eq!(element.copy_to(&mut empty), 0);
    }

    #[test]
    fn element_accessors() {
        let mut queue = Queue::new();
        queue.insert_tail("").unwrap();
        queue.insert_tail([0xc3_u8, 0x28]).unwrap();

        let empty = queue.remove_head(None).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.as_str(), Some(""));

        let invalid = queue.remove_head(None).unwrap();
        assert_eq!(invalid.len(), 2);
        assert_eq!(invalid.as_str(), None);
        assert_eq!(format!("{:?}", invalid), "Element([195, 40])");
        assert_ne!(empty, invalid);
    }
}
