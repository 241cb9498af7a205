use crate::alloc::Alloc;
use crate::queue::{Entry, Link, Queue};
use std::ptr::NonNull;

// While sorting, the nodes form a singly-linked chain threaded by `next` and
// terminated by the ghost node `end`, which plays the role of a null pointer.
// `prev` pointers are stale until `relink` restores them.

pub(crate) fn merge_sort<A, F>(queue: &mut Queue<A>, mut less: F)
where
    A: Alloc,
    F: FnMut(&[u8], &[u8]) -> bool,
{
    let (front, end) = (queue.front_node(), queue.ghost_node());
    // SAFETY: `front` is either the ghost node or an element, so reading its
    // `next` is valid.
    if front == end || unsafe { front.as_ref().next } == end {
        return;
    }
    // SAFETY: the back node already points to the ghost node, so
    // `front..end` is a well-formed chain covering every element.
    unsafe {
        if run_back(front, end, &mut less) == queue.back_node() {
            #[cfg(feature = "logging")]
            log::trace!("sort: already sorted");
            return;
        }
        let front = sort_chain(front, end, &mut less);
        relink(end, front);
    }
}

/// Sort the chain starting at `head`, and return its new head.
///
/// Sorted prefixes are peeled off in a loop and folded into an accumulator;
/// only the two halves of a midpoint split recurse, so the recursion depth
/// stays logarithmic.
unsafe fn sort_chain<F>(head: NonNull<Link>, end: NonNull<Link>, less: &mut F) -> NonNull<Link>
where
    F: FnMut(&[u8], &[u8]) -> bool,
{
    let (mut sorted, mut rest) = (end, head);
    while rest != end {
        let back = run_back(rest, end, less);
        let after = back.as_ref().next;
        if after == end {
            // The whole remainder is sorted.
            return merge(sorted, rest, end, less);
        }
        if back != rest {
            // Cut the sorted prefix `rest..=back` and fold it in.
            (*back.as_ptr()).next = end;
            sorted = merge(sorted, rest, end, less);
            rest = after;
            continue;
        }
        // The first two nodes are out of order: sort both halves.
        let (left, right) = split_middle(rest, end);
        let left = sort_chain(left, end, less);
        let right = sort_chain(right, end, less);
        return merge(sorted, merge(left, right, end, less), end, less);
    }
    sorted
}

/// Find the last node of the non-descending run starting at `node`.
unsafe fn run_back<F>(mut node: NonNull<Link>, end: NonNull<Link>, less: &mut F) -> NonNull<Link>
where
    F: FnMut(&[u8], &[u8]) -> bool,
{
    loop {
        let next = node.as_ref().next;
        if next == end || less(Entry::value(next), Entry::value(node)) {
            return node;
        }
        node = next;
    }
}

/// Split a chain of at least two nodes into two halves, the first one being
/// the longer on odd lengths.
unsafe fn split_middle(
    head: NonNull<Link>,
    end: NonNull<Link>,
) -> (NonNull<Link>, NonNull<Link>) {
    let (mut slow, mut fast) = (head, head.as_ref().next);
    while fast != end && fast.as_ref().next != end {
        slow = slow.as_ref().next;
        fast = fast.as_ref().next.as_ref().next;
    }
    let right = slow.as_ref().next;
    (*slow.as_ptr()).next = end;
    (head, right)
}

/// Merge two sorted chains into one. On ties the node from `left` is taken
/// first, which keeps the sort stable.
unsafe fn merge<F>(
    mut left: NonNull<Link>,
    mut right: NonNull<Link>,
    end: NonNull<Link>,
    less: &mut F,
) -> NonNull<Link>
where
    F: FnMut(&[u8], &[u8]) -> bool,
{
    if left == end {
        return right;
    }
    if right == end {
        return left;
    }
    let mut head = end;
    let mut tail: *mut NonNull<Link> = &mut head;
    loop {
        if less(Entry::value(right), Entry::value(left)) {
            *tail = right;
            tail = &mut (*right.as_ptr()).next;
            right = right.as_ref().next;
            if right == end {
                *tail = left;
                break;
            }
        } else {
            *tail = left;
            tail = &mut (*left.as_ptr()).next;
            left = left.as_ref().next;
            if left == end {
                *tail = right;
                break;
            }
        }
    }
    head
}

/// Restore every `prev` pointer along the chain starting at `front`, and
/// close the cycle through the ghost node.
unsafe fn relink(ghost: NonNull<Link>, front: NonNull<Link>) {
    let (mut prev, mut node) = (ghost, front);
    while node != ghost {
        (*node.as_ptr()).prev = prev;
        prev = node;
        node = node.as_ref().next;
    }
    (*ghost.as_ptr()).next = front;
    (*ghost.as_ptr()).prev = prev;
}
