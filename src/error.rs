use std::collections::TryReserveError;
use std::fmt;

/// What a single allocation made by a [`Queue`](crate::Queue) is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Allocation {
    /// The ghost node of a queue, allocated once by the constructor.
    Sentinel,
    /// The container of one element, holding its links.
    Element,
    /// The owned copy of an element's payload bytes.
    Payload,
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Allocation::Sentinel => "sentinel",
            Allocation::Element => "element container",
            Allocation::Payload => "payload",
        };
        f.write_str(name)
    }
}

/// The error returned by [`Alloc::acquire`](crate::alloc::Alloc::acquire)
/// when an allocator refuses a grant.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("memory allocation refused")]
pub struct AllocError;

/// The error type for the fallible operations of a [`Queue`](crate::Queue).
///
/// Every error leaves the queue exactly as it was before the call.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The injected allocator refused to grant an allocation.
    #[error("cannot allocate {what} ({size} bytes)")]
    AllocRefused { what: Allocation, size: usize },

    /// The system allocator could not provide room for the payload copy.
    #[error("cannot copy a payload of {len} bytes")]
    PayloadCopy {
        len: usize,
        #[source]
        source: TryReserveError,
    },
}

impl QueueError {
    pub(crate) fn refused(what: Allocation, size: usize) -> Self {
        QueueError::AllocRefused { what, size }
    }
}
