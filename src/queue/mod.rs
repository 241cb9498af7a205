use std::alloc::Layout;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::alloc::{Alloc, Global};
use crate::element::{DebugPayload, Element};
use crate::error::{Allocation, QueueError};
use crate::Iter;

pub mod iterator;

mod algorithms;

/// A queue of byte-string payloads, kept in a doubly-linked cyclic list with
/// a ghost (sentinel) node.
///
/// Each element is a separately allocated container that embeds its links
/// and owns an exact-length copy of the payload it was inserted with.
/// Inserting and removing at either end takes *O*(1) time; [`len`] walks the
/// list and takes *O*(*n*) time.
///
/// The queue is not synchronized. Every mutation takes `&mut self`, so it
/// can be moved to another thread but never mutated from two at once.
///
/// [`len`]: Queue::len
///
/// # Examples
///
/// ```
/// use cyclic_queue::Queue;
///
/// let mut queue = Queue::new();
/// queue.insert_tail("b").unwrap();
/// queue.insert_head("a").unwrap();
/// queue.insert_tail("c").unwrap();
/// assert_eq!(queue, ["a", "b", "c"]);
///
/// let element = queue.remove_head(None).unwrap();
/// assert_eq!(element.value(), b"a");
/// element.release();
/// ```
pub struct Queue<A: Alloc = Global> {
    ghost: NonNull<Link>,
    alloc: A,
    _marker: PhantomData<Box<Entry>>,
}

/// The links embedded in every node, including the ghost node.
///
/// In a linked queue, `next` and `prev` always point to live nodes of the
/// same queue (the ghost node itself when the queue is empty).
#[repr(C)]
pub(crate) struct Link {
    pub(crate) next: NonNull<Link>,
    pub(crate) prev: NonNull<Link>,
}

/// An element container. `link` is the first field so a pointer to an
/// `Entry` and to its `Link` are interchangeable.
#[repr(C)]
pub(crate) struct Entry {
    pub(crate) link: Link,
    pub(crate) value: Box<[u8]>,
}

impl Entry {
    /// Create a detached entry owning `value`.
    ///
    /// The links are dangling until the entry is attached to a queue.
    pub(crate) fn new_detached(value: Box<[u8]>) -> NonNull<Link> {
        let entry = Box::new(Entry {
            link: Link {
                next: NonNull::dangling(),
                prev: NonNull::dangling(),
            },
            value,
        });
        NonNull::from(Box::leak(entry)).cast()
    }

    /// Borrow the payload of the entry that embeds `link`.
    ///
    /// It is unsafe because `link` must be embedded in a live entry, i.e. it
    /// must not be the ghost node, and the payload must outlive `'a`.
    pub(crate) unsafe fn value<'a>(link: NonNull<Link>) -> &'a [u8] {
        &(*link.cast::<Entry>().as_ptr()).value
    }
}

pub(crate) unsafe fn connect(mut prev: NonNull<Link>, mut next: NonNull<Link>) {
    prev.as_mut().next = next;
    next.as_mut().prev = prev;
}

// private methods
impl<A: Alloc> Queue<A> {
    pub(crate) fn ghost_node(&self) -> NonNull<Link> {
        self.ghost
    }
    pub(crate) fn front_node(&self) -> NonNull<Link> {
        // SAFETY: `ghost.next` is always valid (either `ghost` itself, or the
        // first element in the queue).
        unsafe { self.ghost.as_ref().next }
    }
    pub(crate) fn back_node(&self) -> NonNull<Link> {
        // SAFETY: `ghost.prev` is always valid (either `ghost` itself, or the
        // last element in the queue).
        unsafe { self.ghost.as_ref().prev }
    }

    /// Attach a single detached node `node` to the queue, between `prev` and
    /// `next`.
    ///
    /// It is unsafe because it does not check whether `prev` and `next` belong
    /// to the queue, or whether they are adjacent (only in
    /// `#[cfg(debug_assertions)]`).
    pub(crate) unsafe fn attach_node(
        &mut self,
        prev: NonNull<Link>,
        next: NonNull<Link>,
        node: NonNull<Link>,
    ) {
        #[cfg(debug_assertions)]
        assert_adjacent(prev, next);
        connect(prev, node);
        connect(node, next);
    }

    /// Detach a single node `node` from the queue, and hand its ownership
    /// over as an [`Element`].
    ///
    /// It is unsafe because it does not check whether `node` is an element
    /// of this queue. Passing the ghost node, or a node of another queue,
    /// makes the queue ill-formed.
    pub(crate) unsafe fn detach_node(&mut self, node: NonNull<Link>) -> Element<A> {
        connect(node.as_ref().prev, node.as_ref().next);
        Element::from_link(node, self.alloc.clone())
    }

    pub(crate) fn alloc(&self) -> &A {
        &self.alloc
    }

    /// Allocate a detached entry holding a copy of `value`.
    ///
    /// Grants are asked for the container first and the payload second. If
    /// anything fails, the grants already obtained are given back before the
    /// error is returned.
    fn new_entry(&self, value: &[u8]) -> Result<NonNull<Link>, QueueError> {
        let entry_layout = Layout::new::<Entry>();
        let payload_layout = Layout::for_value(value);

        if self.alloc.acquire(Allocation::Element, entry_layout).is_err() {
            return Err(refused(Allocation::Element, entry_layout));
        }
        if self.alloc.acquire(Allocation::Payload, payload_layout).is_err() {
            self.alloc.release(Allocation::Element, entry_layout);
            return Err(refused(Allocation::Payload, payload_layout));
        }

        let mut buf = Vec::new();
        if let Err(source) = buf.try_reserve_exact(value.len()) {
            self.alloc.release(Allocation::Payload, payload_layout);
            self.alloc.release(Allocation::Element, entry_layout);
            #[cfg(feature = "logging")]
            log::debug!(
                "Cannot copy a payload of {} bytes ({}); rolled back the element",
                value.len(),
                source
            );
            return Err(QueueError::PayloadCopy {
                len: value.len(),
                source,
            });
        }
        buf.extend_from_slice(value);
        Ok(Entry::new_detached(buf.into_boxed_slice()))
    }
}

impl Queue<Global> {
    /// Create an empty `Queue` backed by the [`Global`] allocator.
    ///
    /// # Examples
    /// ```
    /// use cyclic_queue::Queue;
    /// let queue = Queue::new();
    /// assert!(queue.is_empty());
    /// ```
    #[inline]
    pub fn new() -> Self {
        Self::with_ghost(Global)
    }
}

impl<A: Alloc> Queue<A> {
    /// Create an empty `Queue` whose allocations are granted by `alloc`.
    ///
    /// Returns an error if `alloc` refuses the ghost node.
    ///
    /// # Examples
    /// ```
    /// use cyclic_queue::alloc::Tracking;
    /// use cyclic_queue::Queue;
    ///
    /// let tracking = Tracking::new();
    /// tracking.fail_after(0);
    /// assert!(Queue::try_new_in(tracking.clone()).is_err());
    ///
    /// tracking.allow_all();
    /// let queue = Queue::try_new_in(tracking).unwrap();
    /// assert!(queue.is_empty());
    /// ```
    pub fn try_new_in(alloc: A) -> Result<Self, QueueError> {
        let layout = Layout::new::<Link>();
        if alloc.acquire(Allocation::Sentinel, layout).is_err() {
            return Err(refused(Allocation::Sentinel, layout));
        }
        Ok(Self::with_ghost(alloc))
    }

    fn with_ghost(alloc: A) -> Self {
        Self {
            ghost: new_ghost(),
            alloc,
            _marker: PhantomData,
        }
    }

    /// Returns `true` if the `Queue` is empty.
    ///
    /// # Complexity
    ///
    /// This operation should compute in *O*(1) time.
    ///
    /// # Examples
    ///
    /// ```
    /// use cyclic_queue::Queue;
    ///
    /// let mut queue = Queue::new();
    /// assert!(queue.is_empty());
    ///
    /// queue.insert_head("foo").unwrap();
    /// assert!(!queue.is_empty());
    /// ```
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.front_node() == self.ghost_node()
    }

    /// Returns the number of elements, counted by walking the list.
    ///
    /// # Complexity
    ///
    /// This operation should compute in *O*(*n*) time.
    ///
    /// # Examples
    ///
    /// ```
    /// use cyclic_queue::Queue;
    ///
    /// let mut queue = Queue::new();
    /// queue.insert_tail("a").unwrap();
    /// queue.insert_tail("b").unwrap();
    /// assert_eq!(queue.len(), 2);
    /// ```
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Releases every element of the `Queue`, keeping the queue itself.
    #[inline]
    pub fn clear(&mut self) {
        while self.remove_head(None).is_some() {}
    }

    /// Provides the payload of the first element, or `None` if the queue is
    /// empty.
    #[inline]
    pub fn front(&self) -> Option<&[u8]> {
        self.iter().next()
    }

    /// Provides the payload of the last element, or `None` if the queue is
    /// empty.
    #[inline]
    pub fn back(&self) -> Option<&[u8]> {
        self.iter().next_back()
    }

    /// Copies `value` into a new element and links it first in the queue.
    ///
    /// The copy has exactly the length of `value` and does not borrow from
    /// it. On error nothing is linked and nothing stays allocated.
    ///
    /// # Complexity
    ///
    /// This operation should compute in *O*(1) time, plus the copy.
    ///
    /// # Examples
    ///
    /// ```
    /// use cyclic_queue::Queue;
    ///
    /// let mut queue = Queue::new();
    /// queue.insert_head("two").unwrap();
    /// queue.insert_head("one").unwrap();
    /// assert_eq!(queue.front(), Some(&b"one"[..]));
    /// ```
    pub fn insert_head(&mut self, value: impl AsRef<[u8]>) -> Result<(), QueueError> {
        let node = self.new_entry(value.as_ref())?;
        // SAFETY: the ghost node and the front node are adjacent nodes of
        // this queue, and `node` is detached.
        unsafe { self.attach_node(self.ghost_node(), self.front_node(), node) };
        Ok(())
    }

    /// Copies `value` into a new element and links it last in the queue.
    ///
    /// # Examples
    ///
    /// ```
    /// use cyclic_queue::Queue;
    ///
    /// let mut queue = Queue::new();
    /// queue.insert_tail("one").unwrap();
    /// queue.insert_tail("two").unwrap();
    /// assert_eq!(queue.back(), Some(&b"two"[..]));
    /// ```
    pub fn insert_tail(&mut self, value: impl AsRef<[u8]>) -> Result<(), QueueError> {
        let node = self.new_entry(value.as_ref())?;
        // SAFETY: the back node and the ghost node are adjacent nodes of
        // this queue, and `node` is detached.
        unsafe { self.attach_node(self.back_node(), self.ghost_node(), node) };
        Ok(())
    }

    /// Unlinks the first element and returns it, or `None` if the queue is
    /// empty.
    ///
    /// Removing does not release: the element and its payload stay
    /// allocated until the returned [`Element`] is released or dropped.
    ///
    /// If `out` is given, it is zero-filled and receives as many leading
    /// payload bytes as fit while keeping a terminating zero byte.
    ///
    /// # Examples
    ///
    /// ```
    /// use cyclic_queue::Queue;
    ///
    /// let mut queue = Queue::new();
    /// queue.insert_tail("hamster").unwrap();
    ///
    /// let mut buf = [0xff; 4];
    /// let element = queue.remove_head(Some(&mut buf)).unwrap();
    /// assert_eq!(&buf, b"ham\0");
    /// assert_eq!(element.value(), b"hamster");
    /// assert!(queue.remove_head(None).is_none());
    /// ```
    pub fn remove_head(&mut self, out: Option<&mut [u8]>) -> Option<Element<A>> {
        if self.is_empty() {
            return None;
        }
        // SAFETY: the queue is not empty, so the front node is an element.
        let element = unsafe { self.detach_node(self.front_node()) };
        if let Some(buf) = out {
            element.copy_to(buf);
        }
        Some(element)
    }

    /// Unlinks the last element and returns it, or `None` if the queue is
    /// empty. See [`Queue::remove_head`].
    ///
    /// # Examples
    ///
    /// ```
    /// use cyclic_queue::Queue;
    ///
    /// let mut queue = Queue::new();
    /// queue.insert_tail("first").unwrap();
    /// queue.insert_tail("last").unwrap();
    ///
    /// let mut buf = [0; 16];
    /// queue.remove_tail(Some(&mut buf)).unwrap().release();
    /// assert_eq!(&buf[..5], b"last\0");
    /// assert_eq!(queue, ["first"]);
    /// ```
    pub fn remove_tail(&mut self, out: Option<&mut [u8]>) -> Option<Element<A>> {
        if self.is_empty() {
            return None;
        }
        // SAFETY: the queue is not empty, so the back node is an element.
        let element = unsafe { self.detach_node(self.back_node()) };
        if let Some(buf) = out {
            element.copy_to(buf);
        }
        Some(element)
    }

    /// Provides a forward iterator over the payloads.
    ///
    /// # Examples
    ///
    /// ```
    /// use cyclic_queue::Queue;
    ///
    /// let mut queue = Queue::new();
    /// queue.insert_tail("x").unwrap();
    /// queue.insert_tail("y").unwrap();
    ///
    /// let mut iter = queue.iter();
    /// assert_eq!(iter.next(), Some(&b"x"[..]));
    /// assert_eq!(iter.next(), Some(&b"y"[..]));
    /// assert_eq!(iter.next(), None);
    /// ```
    #[inline]
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self.front_node(), self.ghost_node())
    }

    /// Checks that the list is one closed cycle through the ghost node, with
    /// `next.prev == self` and `prev.next == self` at every node.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let ghost = self.ghost_node();
        let (mut forward, mut node) = (0_usize, ghost);
        loop {
            unsafe {
                let next = node.as_ref().next;
                assert_eq!(next.as_ref().prev, node, "broken `prev` after node {}", forward);
                assert_eq!(node.as_ref().prev.as_ref().next, node);
                node = next;
            }
            if node == ghost {
                break;
            }
            forward += 1;
        }
        let (mut backward, mut node) = (0_usize, unsafe { ghost.as_ref().prev });
        while node != ghost {
            backward += 1;
            node = unsafe { node.as_ref().prev };
        }
        assert_eq!(forward, backward);
        assert_eq!(forward, self.len());
    }
}

impl<A: Alloc> Debug for Queue<A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.iter().map(DebugPayload))
            .finish()
    }
}

impl Default for Queue<Global> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Alloc> Drop for Queue<A> {
    fn drop(&mut self) {
        self.clear();
        self.alloc
            .release(Allocation::Sentinel, Layout::new::<Link>());
        // SAFETY: the ghost node was leaked from a box in `new_ghost`, and
        // no element points to it anymore.
        drop(unsafe { Box::from_raw(self.ghost.as_ptr()) });
    }
}

fn new_ghost() -> NonNull<Link> {
    let ghost = NonNull::from(Box::leak(Box::new(Link {
        next: NonNull::dangling(),
        prev: NonNull::dangling(),
    })));
    // SAFETY: `ghost` was just leaked, nothing else refers to it.
    unsafe { connect(ghost, ghost) };
    ghost
}

fn refused(what: Allocation, layout: Layout) -> QueueError {
    #[cfg(feature = "logging")]
    log::debug!(
        "Allocation of {} ({} bytes) refused; rolled back",
        what,
        layout.size()
    );
    QueueError::refused(what, layout.size())
}

#[cfg(debug_assertions)]
fn assert_adjacent(prev: NonNull<Link>, next: NonNull<Link>) {
    unsafe {
        assert_eq!(prev.as_ref().next, next);
        assert_eq!(next.as_ref().prev, prev);
    }
}

unsafe impl<A: Alloc + Send> Send for Queue<A> {}

unsafe impl<A: Alloc + Sync> Sync for Queue<A> {}

#[cfg(test)]
pub(crate) mod tests {
    use crate::alloc::{Alloc, Tracking};
    use crate::error::{Allocation, QueueError};
    use crate::Queue;

    pub(crate) fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    pub(crate) fn queue_of<A: Alloc>(alloc: A, values: &[&str]) -> Queue<A> {
        let mut queue = Queue::try_new_in(alloc).unwrap();
        for value in values {
            queue.insert_tail(value).unwrap();
        }
        queue.assert_consistent();
        queue
    }

    #[test]
    fn queue_create() {
        let mut queue = Queue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
        queue.assert_consistent();
        queue.insert_tail("1").unwrap();
        assert!(!queue.is_empty());
        assert_eq!(queue.remove_tail(None).unwrap().value(), b"1");
        assert!(queue.is_empty());
        queue.assert_consistent();
    }

    #[test]
    fn queue_insert_and_remove() {
        let mut queue = Queue::new();
        assert!(queue.remove_head(None).is_none());
        assert!(queue.remove_tail(None).is_none());
        assert_eq!(queue.front(), None);
        assert_eq!(queue.back(), None);

        queue.insert_head("b").unwrap();
        queue.assert_consistent();
        queue.insert_head("a").unwrap();
        queue.assert_consistent();
        queue.insert_tail("c").unwrap();
        queue.assert_consistent();
        assert_eq!(queue, ["a", "b", "c"]);
        assert_eq!(queue.front(), Some(&b"a"[..]));
        assert_eq!(queue.back(), Some(&b"c"[..]));

        assert_eq!(queue.remove_tail(None).unwrap().value(), b"c");
        queue.assert_consistent();
        assert_eq!(queue.remove_head(None).unwrap().value(), b"a");
        queue.assert_consistent();
        assert_eq!(queue.remove_head(None).unwrap().value(), b"b");
        queue.assert_consistent();
        assert!(queue.is_empty());
        assert!(queue.remove_head(None).is_none());
    }

    #[test]
    fn queue_size_after_mixed_operations() {
        let mut queue = Queue::new();
        for i in 0..10 {
            if i % 2 == 0 {
                queue.insert_head(i.to_string()).unwrap();
            } else {
                queue.insert_tail(i.to_string()).unwrap();
            }
        }
        for j in 0..4 {
            let removed = if j % 2 == 0 {
                queue.remove_head(None)
            } else {
                queue.remove_tail(None)
            };
            assert!(removed.is_some());
            queue.assert_consistent();
        }
        assert_eq!(queue.len(), 10 - 4);
    }

    #[test]
    fn queue_round_trip_exact_bytes() {
        let payloads: [&[u8]; 4] = [b"", b"a", b"with\0nul", &[0xff, 0xfe, 0x00, 0x7f]];
        let mut queue = Queue::new();
        for payload in payloads.iter() {
            queue.insert_head(payload).unwrap();
            let element = queue.remove_head(None).unwrap();
            assert_eq!(element.value(), *payload);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn queue_copy_out_truncates() {
        let mut queue = Queue::new();
        queue.insert_tail("elephant").unwrap();
        queue.insert_tail("cat").unwrap();
        queue.insert_tail("ox").unwrap();

        let mut buf = [0xaa_u8; 6];
        queue.remove_head(Some(&mut buf)).unwrap();
        assert_eq!(&buf, b"eleph\0");

        let mut buf = [0xaa_u8; 6];
        queue.remove_head(Some(&mut buf)).unwrap();
        assert_eq!(&buf, b"cat\0\0\0");

        // no room for anything but the terminator
        let mut buf = [0xaa_u8; 1];
        queue.remove_tail(Some(&mut buf)).unwrap();
        assert_eq!(&buf, b"\0");
        assert!(queue.is_empty());
    }

    #[test]
    fn queue_copy_out_into_empty_buffer() {
        let mut queue = Queue::new();
        queue.insert_tail("cow").unwrap();
        let mut buf: [u8; 0] = [];
        let element = queue.remove_head(Some(&mut buf)).unwrap();
        assert_eq!(element.value(), b"cow");
    }

    #[test]
    fn queue_value_is_independent_copy() {
        let mut queue = Queue::new();
        let mut source = String::from("owl");
        queue.insert_tail(&source).unwrap();
        source.push_str("bear");
        drop(source);
        assert_eq!(queue, ["owl"]);
    }

    #[test]
    fn queue_drop_releases_everything() {
        let tracking = Tracking::new();
        let mut queue = queue_of(tracking.clone(), &["a", "bb", "ccc"]);
        assert_eq!(tracking.live(), 1 + 3 * 2);

        let removed = queue.remove_tail(None).unwrap();
        // removing does not release
        assert_eq!(tracking.live(), 1 + 3 * 2);
        removed.release();
        assert_eq!(tracking.live(), 1 + 2 * 2);

        drop(queue);
        assert_eq!(tracking.live(), 0);
        assert_eq!(tracking.live_bytes(), 0);
        assert_eq!(tracking.acquired(), tracking.released());
    }

    #[test]
    fn queue_clear_keeps_sentinel() {
        let tracking = Tracking::new();
        let mut queue = queue_of(tracking.clone(), &["a", "b"]);
        queue.clear();
        queue.assert_consistent();
        assert!(queue.is_empty());
        assert_eq!(tracking.live(), 1);
        queue.clear();
        assert_eq!(tracking.live(), 1);
    }

    #[test]
    fn queue_insert_rolls_back_on_refusal() {
        init_logger();
        let tracking = Tracking::new();
        let mut queue = queue_of(tracking.clone(), &["kept"]);
        let live = tracking.live();

        // container refused
        tracking.fail_after(0);
        let err = queue.insert_head("lost").unwrap_err();
        assert!(matches!(
            err,
            QueueError::AllocRefused {
                what: Allocation::Element,
                ..
            }
        ));
        assert_eq!(tracking.live(), live);

        // container granted, payload refused
        tracking.fail_after(1);
        let err = queue.insert_tail("lost").unwrap_err();
        assert_eq!(err, QueueError::refused(Allocation::Payload, 4));
        assert_eq!(tracking.live(), live);
        assert_eq!(queue, ["kept"]);
        queue.assert_consistent();

        tracking.allow_all();
        queue.insert_tail("more").unwrap();
        assert_eq!(queue, ["kept", "more"]);
        drop(queue);
        assert_eq!(tracking.live(), 0);
    }

    #[test]
    fn queue_sentinel_refused() {
        let tracking = Tracking::new();
        tracking.fail_after(0);
        let err = Queue::try_new_in(tracking.clone()).unwrap_err();
        assert!(matches!(
            err,
            QueueError::AllocRefused {
                what: Allocation::Sentinel,
                ..
            }
        ));
        assert_eq!(tracking.live(), 0);
    }

    #[test]
    fn queue_debug() {
        let mut queue = Queue::new();
        queue.insert_tail("a").unwrap();
        queue.insert_tail([0xff_u8]).unwrap();
        assert_eq!(format!("{:?}", queue), r#"["a", [255]]"#);
    }
}
