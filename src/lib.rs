//! This crate provides a queue of byte-string payloads, implemented as an
//! intrusive doubly-linked cyclic list with a ghost node.
//!
//! The [`Queue`] allows inserting and removing elements at both ends in
//! constant time, and rearranges its elements in place: deleting the middle
//! element, deleting every value that occurs more than once, swapping
//! adjacent pairs, reversing, and a stable merge sort. None of the
//! rearrangements allocate.
//!
//! Here is a quick example showing how the queue works.
//!
//! ```
//! use cyclic_queue::Queue;
//!
//! let mut queue = Queue::new();
//! for value in ["gnu", "bear", "gnu", "dolphin"].iter() {
//!     queue.insert_tail(value).unwrap();
//! }
//!
//! queue.sort();
//! assert_eq!(queue, ["bear", "dolphin", "gnu", "gnu"]);
//!
//! queue.delete_duplicates();
//! assert_eq!(queue, ["bear", "dolphin"]);
//!
//! let mut buf = [0; 5];
//! let element = queue.remove_tail(Some(&mut buf)).unwrap();
//! assert_eq!(&buf, b"dolp\0"); // truncated to leave room for the zero byte
//! assert_eq!(element.value(), b"dolphin");
//! element.release();
//! ```
//!
//! # Memory Layout
//!
//! The memory layout of the queue is like the following graph:
//! ```text
//!          ┌─────────────────────────────────────────────────────────────────────┐
//!          ↓                                                     (Ghost) Node N  │
//!    ╔═══════════╗           ╔═══════════╗                        ┌───────────┐  │
//!    ║   next    ║ ────────→ ║   next    ║ ────────→ ┄┄ ────────→ │   next    │ ─┘
//!    ╟───────────╢           ╟───────────╢     Node 2, 3, ...     ├───────────┤
//! ┌─ ║   prev    ║ ←──────── ║   prev    ║ ←──────── ┄┄ ←──────── │   prev    │
//! │  ╟───────────╢           ╟───────────╢                        ├───────────┤
//! │  ║  value ───╫→ bytes    ║  value ───╫→ bytes                 ┊No payload ┊
//! │  ╚═══════════╝           ╚═══════════╝                        └╌╌╌╌╌╌╌╌╌╌╌┘
//! │      Node 0                  Node 1                               ↑   ↑
//! └───────────────────────────────────────────────────────────────────┘   │
//! ╔═══════════╗                                                           │
//! ║   ghost   ║ ──────────────────────────────────────────────────────────┘
//! ╟───────────╢
//! ║   alloc   ║
//! ╚═══════════╝
//!     Queue
//! ```
//! The `Queue` contains:
//! - a pointer `ghost` that points to the ghost node;
//! - the allocator `alloc` that grants or refuses every allocation of the
//!   queue (see [`alloc`]).
//!
//! The queue keeps no length field, so [`Queue::len`] walks the list.
//!
//! Each element is allocated on heap as a container, which contains:
//! - the `next` pointer that points to the next element (or the ghost node if it
//!   is the last element in the queue);
//! - the `prev` pointer that points to the previous element (or the ghost node if
//!   it is the first element in the queue);
//! - the payload, a separately allocated copy of exactly the bytes inserted.
//!
//! The ghost node has *NO* payload. In an empty queue its `next` and `prev`
//! pointers point to itself.
//!
//! # Detached Elements
//!
//! Removing an element unlinks it without releasing anything: the caller
//! receives an [`Element`] that owns the container and its payload, and
//! releases both with [`Element::release`] (or by dropping it).
//!
//! # Drivers
//!
//! The [`ops`] module exposes every operation as a free function taking an
//! `Option` of the queue, for drivers that may issue commands before a queue
//! exists.

#[doc(inline)]
pub use element::Element;
#[doc(inline)]
pub use error::{AllocError, Allocation, QueueError};
#[doc(inline)]
pub use queue::iterator::Iter;
#[doc(inline)]
pub use queue::Queue;

pub mod alloc;
pub mod error;
pub mod ops;
pub mod queue;

mod element;
