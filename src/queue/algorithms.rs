use crate::alloc::Alloc;
use crate::error::QueueError;
use crate::queue::{connect, Entry, Queue};
use crate::Element;
use std::cmp::Ordering;
use std::mem;

mod sort;

impl<A: Alloc, B: Alloc> PartialEq<Queue<B>> for Queue<A> {
    fn eq(&self, other: &Queue<B>) -> bool {
        self.iter().eq(other.iter())
    }
}

impl<A: Alloc> Eq for Queue<A> {}

impl<A: Alloc, V: AsRef<[u8]>> PartialEq<[V]> for Queue<A> {
    fn eq(&self, other: &[V]) -> bool {
        self.iter().eq(other.iter().map(AsRef::<[u8]>::as_ref))
    }
}

impl<A: Alloc, V: AsRef<[u8]>, const N: usize> PartialEq<[V; N]> for Queue<A> {
    fn eq(&self, other: &[V; N]) -> bool {
        *self == other[..]
    }
}

impl<A: Alloc, V: AsRef<[u8]>> PartialEq<Vec<V>> for Queue<A> {
    fn eq(&self, other: &Vec<V>) -> bool {
        *self == other[..]
    }
}

impl<A: Alloc> Queue<A> {
    /// Copies every payload into a new queue sharing the same allocator.
    ///
    /// If an allocation fails, the partial copy is released before the
    /// error is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use cyclic_queue::Queue;
    ///
    /// let mut queue = Queue::new();
    /// queue.insert_tail("a").unwrap();
    /// let copy = queue.try_clone().unwrap();
    /// assert_eq!(queue, copy);
    /// ```
    pub fn try_clone(&self) -> Result<Self, QueueError> {
        let mut copy = Queue::try_new_in(self.alloc().clone())?;
        for value in self.iter() {
            copy.insert_tail(value)?;
        }
        Ok(copy)
    }

    /// Returns `true` if some element's payload equals `value`.
    pub fn contains(&self, value: impl AsRef<[u8]>) -> bool {
        let value = value.as_ref();
        self.iter().any(|e| e == value)
    }

    /// Releases the middle element, the one at index ⌊*n* / 2⌋ counting
    /// from 0 at the front.
    ///
    /// Returns `false` if the queue is empty.
    ///
    /// # Complexity
    ///
    /// This operation should compute in *O*(*n*) time with a single walk.
    ///
    /// # Examples
    ///
    /// ```
    /// use cyclic_queue::Queue;
    ///
    /// let mut queue = Queue::new();
    /// for value in ["a", "b", "c", "d"].iter() {
    ///     queue.insert_tail(value).unwrap();
    /// }
    /// assert!(queue.delete_middle());
    /// assert_eq!(queue, ["a", "b", "d"]);
    /// assert!(queue.delete_middle());
    /// assert_eq!(queue, ["a", "d"]);
    /// ```
    pub fn delete_middle(&mut self) -> bool {
        if self.is_empty() {
            return false;
        }
        let ghost = self.ghost_node();
        let (mut slow, mut fast) = (self.front_node(), self.front_node());
        // SAFETY: `fast` only moves two steps when neither of them reaches
        // the ghost node, so `slow` stays an element.
        unsafe {
            while fast != ghost && fast.as_ref().next != ghost {
                slow = slow.as_ref().next;
                fast = fast.as_ref().next.as_ref().next;
            }
            let middle = self.detach_node(slow);
            #[cfg(feature = "logging")]
            log::trace!("delete_middle: releasing {} bytes", middle.len());
            middle.release();
        }
        true
    }

    /// Releases every element whose payload is equal to a neighbour's,
    /// leaving only the values that appeared exactly once.
    ///
    /// The queue must already be sorted (see [`Queue::sort`]); equal
    /// payloads that are not adjacent are left alone. Survivors keep their
    /// relative order. Always returns `true`.
    ///
    /// # Examples
    ///
    /// ```
    /// use cyclic_queue::Queue;
    ///
    /// let mut queue = Queue::new();
    /// for value in ["a", "a", "b", "c", "c", "c", "d"].iter() {
    ///     queue.insert_tail(value).unwrap();
    /// }
    /// assert!(queue.delete_duplicates());
    /// assert_eq!(queue, ["b", "d"]);
    /// ```
    pub fn delete_duplicates(&mut self) -> bool {
        let ghost = self.ghost_node();
        // Unlinked duplicates are chained by `next` and terminated by the
        // ghost node, then released together once the walk is over.
        let mut duplicates = ghost;
        let mut in_run = false;
        // SAFETY: every node visited is an element of this queue; it is
        // unlinked before being pushed on the duplicate chain.
        unsafe {
            let mut node = self.front_node();
            while node != ghost {
                let next = node.as_ref().next;
                let same = next != ghost && Entry::value(node) == Entry::value(next);
                if same || in_run {
                    connect(node.as_ref().prev, next);
                    (*node.as_ptr()).next = duplicates;
                    duplicates = node;
                }
                in_run = same;
                node = next;
            }

            let mut released = 0_usize;
            while duplicates != ghost {
                let next = duplicates.as_ref().next;
                Element::from_link(duplicates, self.alloc().clone()).release();
                duplicates = next;
                released += 1;
            }
            #[cfg(feature = "logging")]
            log::trace!("delete_duplicates: released {} elements", released);
            #[cfg(not(feature = "logging"))]
            let _ = released;
        }
        true
    }

    /// Swaps every two adjacent elements. With an odd number of elements,
    /// the last one stays in place.
    ///
    /// Only links are rewired; no payload moves and nothing is allocated.
    ///
    /// # Examples
    ///
    /// ```
    /// use cyclic_queue::Queue;
    ///
    /// let mut queue = Queue::new();
    /// for value in ["1", "2", "3", "4", "5"].iter() {
    ///     queue.insert_tail(value).unwrap();
    /// }
    /// queue.swap_pairs();
    /// assert_eq!(queue, ["2", "1", "4", "3", "5"]);
    /// ```
    pub fn swap_pairs(&mut self) {
        let ghost = self.ghost_node();
        let mut pairs = 0_usize;
        // SAFETY: `left` and `right` are two adjacent elements of this queue,
        // and `before`, `after` their (possibly ghost) neighbours. Each step
        // leaves the list well-formed.
        unsafe {
            let mut left = self.front_node();
            while left != ghost && left.as_ref().next != ghost {
                let right = left.as_ref().next;
                let (before, after) = (left.as_ref().prev, right.as_ref().next);
                connect(before, right);
                connect(right, left);
                connect(left, after);
                left = after;
                pairs += 1;
            }
        }
        #[cfg(feature = "logging")]
        log::trace!("swap_pairs: swapped {} pairs", pairs);
        #[cfg(not(feature = "logging"))]
        let _ = pairs;
    }

    /// Reverses the order of the elements in place, by swapping `next` and
    /// `prev` at every node, the ghost node included.
    ///
    /// # Examples
    ///
    /// ```
    /// use cyclic_queue::Queue;
    ///
    /// let mut queue = Queue::new();
    /// for value in ["1", "2", "3"].iter() {
    ///     queue.insert_tail(value).unwrap();
    /// }
    /// queue.reverse();
    /// assert_eq!(queue, ["3", "2", "1"]);
    /// ```
    pub fn reverse(&mut self) {
        let ghost = self.ghost_node();
        let mut node = ghost;
        // SAFETY: the walk follows the old `next` pointers (now stored in
        // `prev`) once around the cycle.
        unsafe {
            loop {
                let link = &mut *node.as_ptr();
                mem::swap(&mut link.next, &mut link.prev);
                node = link.prev;
                if node == ghost {
                    break;
                }
            }
        }
    }

    /// Sort the queue in ascending byte-wise order of the payloads.
    ///
    /// This sort is stable (i.e., does not reorder equal elements).
    ///
    /// # Complexity
    ///
    /// This operation should compute in *O*(*n*) time when the queue is
    /// already sorted, and uses no extra memory beyond a recursion depth of
    /// *O*(log(*n*)).
    ///
    /// # Current Implementation
    ///
    /// A natural merge sort over the links. Sorted prefixes are detected and
    /// merged as they are; the remainder is split at its middle when it
    /// starts with two out-of-order elements.
    ///
    /// # Examples
    ///
    /// ```
    /// use cyclic_queue::Queue;
    ///
    /// let mut queue = Queue::new();
    /// for value in ["pear", "apple", "fig", "apple"].iter() {
    ///     queue.insert_tail(value).unwrap();
    /// }
    /// queue.sort();
    /// assert_eq!(queue, ["apple", "apple", "fig", "pear"]);
    /// ```
    pub fn sort(&mut self) {
        sort::merge_sort(self, |a, b| a < b);
    }

    /// Sort the queue with a comparator function.
    ///
    /// This sort is stable (i.e., does not reorder equal elements).
    ///
    /// The comparator function must define a total ordering for the
    /// payloads. If the ordering is not total, the order of the elements
    /// is unspecified.
    ///
    /// # Examples
    ///
    /// ```
    /// use cyclic_queue::Queue;
    ///
    /// let mut queue = Queue::new();
    /// for value in ["b", "c", "a"].iter() {
    ///     queue.insert_tail(value).unwrap();
    /// }
    /// // reverse sorting
    /// queue.sort_by(|a, b| b.cmp(a));
    /// assert_eq!(queue, ["c", "b", "a"]);
    /// ```
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&[u8], &[u8]) -> Ordering,
    {
        sort::merge_sort(self, |a, b| compare(a, b) == Ordering::Less);
    }
}
