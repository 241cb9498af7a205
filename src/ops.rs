//! Free-function entry points for drivers that sequence queue operations.
//!
//! Each function mirrors a method of [`Queue`], but takes the queue as an
//! `Option` so that a driver can pass "no queue" the way a command
//! interpreter does before `new` has been issued. A missing queue is never
//! an error: queries answer as for an empty queue, mutations report failure
//! or do nothing.
//!
//! ```
//! use cyclic_queue::{ops, Queue};
//!
//! let mut queue = ops::new();
//! assert!(ops::insert_tail(queue.as_mut(), "a"));
//! assert!(ops::insert_tail(queue.as_mut(), "b"));
//! assert_eq!(ops::size(queue.as_ref()), 2);
//! ops::free(queue);
//!
//! // without a queue
//! assert!(!ops::insert_head(None::<&mut Queue>, "c"));
//! assert_eq!(ops::size(None::<&Queue>), 0);
//! ```

use crate::alloc::{Alloc, Global};
use crate::{Element, Queue};

/// Creates an empty queue. Returns `None` if it cannot be allocated.
pub fn new() -> Option<Queue<Global>> {
    Some(Queue::new())
}

/// Creates an empty queue whose allocations are granted by `alloc`.
pub fn new_in<A: Alloc>(alloc: A) -> Option<Queue<A>> {
    Queue::try_new_in(alloc).ok()
}

/// Releases every element of `queue`, then `queue` itself.
pub fn free<A: Alloc>(queue: Option<Queue<A>>) {
    drop(queue)
}

pub fn is_empty<A: Alloc>(queue: Option<&Queue<A>>) -> bool {
    queue.map_or(true, Queue::is_empty)
}

pub fn size<A: Alloc>(queue: Option<&Queue<A>>) -> usize {
    queue.map_or(0, Queue::len)
}

/// Returns `false` if there is no queue or the insertion failed.
pub fn insert_head<A: Alloc>(queue: Option<&mut Queue<A>>, value: impl AsRef<[u8]>) -> bool {
    queue.map_or(false, |queue| queue.insert_head(value).is_ok())
}

/// Returns `false` if there is no queue or the insertion failed.
pub fn insert_tail<A: Alloc>(queue: Option<&mut Queue<A>>, value: impl AsRef<[u8]>) -> bool {
    queue.map_or(false, |queue| queue.insert_tail(value).is_ok())
}

pub fn remove_head<A: Alloc>(
    queue: Option<&mut Queue<A>>,
    out: Option<&mut [u8]>,
) -> Option<Element<A>> {
    queue?.remove_head(out)
}

pub fn remove_tail<A: Alloc>(
    queue: Option<&mut Queue<A>>,
    out: Option<&mut [u8]>,
) -> Option<Element<A>> {
    queue?.remove_tail(out)
}

pub fn release_element<A: Alloc>(element: Element<A>) {
    element.release()
}

/// Returns `false` if there is no queue or it is empty.
pub fn delete_middle<A: Alloc>(queue: Option<&mut Queue<A>>) -> bool {
    queue.map_or(false, Queue::delete_middle)
}

/// Returns `false` only if there is no queue.
pub fn delete_duplicates<A: Alloc>(queue: Option<&mut Queue<A>>) -> bool {
    queue.map_or(false, Queue::delete_duplicates)
}

pub fn swap_pairs<A: Alloc>(queue: Option<&mut Queue<A>>) {
    if let Some(queue) = queue {
        queue.swap_pairs();
    }
}

pub fn reverse<A: Alloc>(queue: Option<&mut Queue<A>>) {
    if let Some(queue) = queue {
        queue.reverse();
    }
}

pub fn sort<A: Alloc>(queue: Option<&mut Queue<A>>) {
    if let Some(queue) = queue {
        queue.sort();
    }
}
