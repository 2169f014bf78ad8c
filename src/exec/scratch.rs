//! Reusable search buffers owned by a compiled pattern.
//!
//! A `Scratch` holds the Pike matcher's thread lists, sized to the program.
//! The compiled pattern keeps one behind a mutex; an uncontended match call
//! borrows it, a contended call allocates a private one instead of blocking.
//!
//! Release is guarded by an explicit two-state field: releasing an already
//! released scratch is a no-op, and `Drop` routes through the same guard, so
//! a double release cannot happen by construction.

use smallvec::SmallVec;

use super::sparse_set::SparseSet;
use crate::program::{InstIdx, SLOT_NONE};

/// Capture-slot storage carried per thread.
pub(crate) type Slots = SmallVec<[usize; 8]>;

pub(crate) fn fresh_slots(nslots: usize) -> Slots {
    let mut slots = Slots::new();
    slots.resize(nslots, SLOT_NONE);
    slots
}

/// One generation of Pike threads. `seen` marks every instruction reached
/// during closure (consuming or not) so epsilon cycles terminate; `threads`
/// keeps only the runnable ones, in priority order.
#[derive(Clone, Debug)]
pub(crate) struct ThreadList {
    seen: SparseSet,
    threads: Vec<(InstIdx, Slots)>,
}

impl ThreadList {
    fn new(capacity: usize) -> Self {
        ThreadList {
            seen: SparseSet::new(capacity),
            threads: Vec::new(),
        }
    }

    /// Mark an instruction as reached; false if it already was (an earlier,
    /// higher-priority path got there first).
    #[inline]
    pub(crate) fn mark(&mut self, pc: InstIdx) -> bool {
        self.seen.insert(pc)
    }

    /// Append a runnable thread. Callers mark first.
    #[inline]
    pub(crate) fn push_thread(&mut self, pc: InstIdx, slots: Slots) {
        self.threads.push((pc, slots));
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.threads.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    #[inline]
    pub(crate) fn thread(&self, i: usize) -> (InstIdx, &Slots) {
        let (pc, ref slots) = self.threads[i];
        (pc, slots)
    }

    #[inline]
    pub(crate) fn clear(&mut self) {
        self.seen.clear();
        self.threads.clear();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScratchState {
    Live,
    Released,
}

/// Reusable buffers for one match call at a time.
#[derive(Debug)]
pub(crate) struct Scratch {
    state: ScratchState,
    capacity: usize,
    pub(crate) clist: ThreadList,
    pub(crate) nlist: ThreadList,
}

impl Scratch {
    pub(crate) fn new(capacity: usize) -> Self {
        Scratch {
            state: ScratchState::Live,
            capacity,
            clist: ThreadList::new(capacity),
            nlist: ThreadList::new(capacity),
        }
    }

    /// Make the buffers usable for a new call, reviving a released scratch.
    pub(crate) fn reset(&mut self) {
        if self.state == ScratchState::Released {
            self.clist = ThreadList::new(self.capacity);
            self.nlist = ThreadList::new(self.capacity);
            self.state = ScratchState::Live;
        } else {
            self.clist.clear();
            self.nlist.clear();
        }
    }

    /// Drop the buffer storage. Releasing twice is a no-op.
    pub(crate) fn release(&mut self) {
        if self.state == ScratchState::Released {
            return;
        }
        self.state = ScratchState::Released;
        self.clist = ThreadList::new(0);
        self.nlist = ThreadList::new(0);
    }

    #[cfg(test)]
    fn is_released(&self) -> bool {
        self.state == ScratchState::Released
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marking_is_first_wins() {
        let mut list = ThreadList::new(8);
        assert!(list.mark(4));
        list.push_thread(4, fresh_slots(2));
        assert!(list.mark(1));
        list.push_thread(1, fresh_slots(2));
        assert!(!list.mark(4));
        assert_eq!(list.len(), 2);
        assert_eq!(list.thread(0).0, 4);
        assert_eq!(list.thread(1).0, 1);
    }

    #[test]
    fn double_release_is_a_noop() {
        let mut scratch = Scratch::new(8);
        scratch.release();
        assert!(scratch.is_released());
        // second release must be a guarded no-op
        scratch.release();
        assert!(scratch.is_released());
    }

    #[test]
    fn reset_revives_released_scratch() {
        let mut scratch = Scratch::new(8);
        scratch.release();
        scratch.reset();
        assert!(!scratch.is_released());
        assert!(scratch.clist.mark(3));
    }
}
