//! The allocation capability injected into a [`Queue`](crate::Queue).
//!
//! A queue never decides on its own whether memory is available. Before each
//! allocation it performs (the sentinel, an element container or a payload
//! copy) it asks its allocator with [`Alloc::acquire`], and after each
//! destruction it reports the layout back with [`Alloc::release`]. Every
//! successful `acquire` is matched by exactly one `release`.
//!
//! [`Global`] grants everything and leaves the actual allocation to the
//! standard library. [`Tracking`] keeps a ledger of live allocations and can
//! be told to refuse a grant, which is how allocation failures and leaks are
//! tested.

use std::alloc::Layout;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::error::{AllocError, Allocation};

/// An allocation capability.
///
/// Allocators are cloned into every detached [`Element`](crate::Element), so
/// that an element released outside its queue still reports to the same
/// ledger. Implementations should be cheap to clone.
pub trait Alloc: Clone {
    /// Asks for permission to allocate `layout` for `kind`.
    fn acquire(&self, kind: Allocation, layout: Layout) -> Result<(), AllocError>;

    /// Reports that an allocation granted by [`Alloc::acquire`] has been freed.
    fn release(&self, kind: Allocation, layout: Layout);
}

/// The default allocator: every grant succeeds and memory comes from the
/// global allocator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Global;

impl Alloc for Global {
    #[inline]
    fn acquire(&self, _kind: Allocation, _layout: Layout) -> Result<(), AllocError> {
        Ok(())
    }

    #[inline]
    fn release(&self, _kind: Allocation, _layout: Layout) {}
}

/// An allocator that keeps a ledger of grants and releases.
///
/// Clones share the same ledger. It is single-threaded, like the queue it
/// is meant to observe.
///
/// # Examples
///
/// ```
/// use cyclic_queue::alloc::Tracking;
/// use cyclic_queue::Queue;
///
/// let tracking = Tracking::new();
/// let mut queue = Queue::try_new_in(tracking.clone()).unwrap();
/// queue.insert_tail("gerbil").unwrap();
/// // the sentinel, one container and one payload
/// assert_eq!(tracking.live(), 3);
///
/// drop(queue);
/// assert_eq!(tracking.live(), 0);
/// assert_eq!(tracking.acquired(), tracking.released());
/// ```
#[derive(Clone, Default)]
pub struct Tracking {
    ledger: Rc<Ledger>,
}

#[derive(Default)]
struct Ledger {
    acquired: Cell<usize>,
    released: Cell<usize>,
    live_bytes: Cell<usize>,
    refused: Cell<usize>,
    /// Number of grants still allowed, or `None` for no limit.
    budget: Cell<Option<usize>>,
}

impl Tracking {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants the next `grants` requests, then refuses every request until
    /// [`Tracking::allow_all`] is called.
    ///
    /// ```
    /// use cyclic_queue::alloc::Tracking;
    /// use cyclic_queue::Queue;
    ///
    /// let tracking = Tracking::new();
    /// let mut queue = Queue::try_new_in(tracking.clone()).unwrap();
    ///
    /// // the container is granted but the payload is not
    /// tracking.fail_after(1);
    /// assert!(queue.insert_head("dolphin").is_err());
    /// assert!(queue.is_empty());
    /// assert_eq!(tracking.live(), 1);
    /// ```
    pub fn fail_after(&self, grants: usize) {
        self.ledger.budget.set(Some(grants));
    }

    /// Removes any limit set by [`Tracking::fail_after`].
    pub fn allow_all(&self) {
        self.ledger.budget.set(None);
    }

    /// Number of allocations granted and not yet released.
    pub fn live(&self) -> usize {
        self.ledger.acquired.get() - self.ledger.released.get()
    }

    /// Bytes granted and not yet released.
    pub fn live_bytes(&self) -> usize {
        self.ledger.live_bytes.get()
    }

    /// Total number of granted allocations.
    pub fn acquired(&self) -> usize {
        self.ledger.acquired.get()
    }

    /// Total number of released allocations.
    pub fn released(&self) -> usize {
        self.ledger.released.get()
    }

    /// Total number of refused requests.
    pub fn refused(&self) -> usize {
        self.ledger.refused.get()
    }
}

impl Alloc for Tracking {
    fn acquire(&self, _kind: Allocation, layout: Layout) -> Result<(), AllocError> {
        let ledger = &*self.ledger;
        match ledger.budget.get() {
            Some(0) => {
                ledger.refused.set(ledger.refused.get() + 1);
                return Err(AllocError);
            }
            Some(n) => ledger.budget.set(Some(n - 1)),
            None => {}
        }
        ledger.acquired.set(ledger.acquired.get() + 1);
        ledger.live_bytes.set(ledger.live_bytes.get() + layout.size());
        Ok(())
    }

    fn release(&self, _kind: Allocation, layout: Layout) {
        let ledger = &*self.ledger;
        debug_assert!(
            ledger.released.get() < ledger.acquired.get(),
            "released more allocations than were granted"
        );
        ledger.released.set(ledger.released.get() + 1);
        ledger.live_bytes.set(ledger.live_bytes.get() - layout.size());
    }
}

impl fmt::Debug for Tracking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracking")
            .field("live", &self.live())
            .field("live_bytes", &self.live_bytes())
            .field("acquired", &self.acquired())
            .field("released", &self.released())
            .field("refused", &self.refused())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{Alloc, Tracking};
    use crate::error::{AllocError, Allocation};
    use std::alloc::Layout;

    #[test]
    fn tracking_ledger() {
        let tracking = Tracking::new();
        let layout = Layout::array::<u8>(10).unwrap();
        assert_eq!(tracking.acquire(Allocation::Payload, layout), Ok(()));
        assert_eq!(tracking.live(), 1);
        assert_eq!(tracking.live_bytes(), 10);

        let shared = tracking.clone();
        shared.release(Allocation::Payload, layout);
        assert_eq!(tracking.live(), 0);
        assert_eq!(tracking.live_bytes(), 0);
        assert_eq!(tracking.acquired(), 1);
        assert_eq!(tracking.released(), 1);
    }

    #[test]
    fn tracking_budget() {
        let tracking = Tracking::new();
        let layout = Layout::new::<u64>();
        tracking.fail_after(2);
        assert!(tracking.acquire(Allocation::Element, layout).is_ok());
        assert!(tracking.acquire(Allocation::Element, layout).is_ok());
        assert_eq!(tracking.acquire(Allocation::Element, layout), Err(AllocError));
        assert_eq!(tracking.acquire(Allocation::Element, layout), Err(AllocError));
        assert_eq!(tracking.refused(), 2);
        assert_eq!(tracking.live(), 2);

        tracking.allow_all();
        assert!(tracking.acquire(Allocation::Element, layout).is_ok());
        assert_eq!(tracking.live(), 3);
    }
}
