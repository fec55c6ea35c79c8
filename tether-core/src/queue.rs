//! Priority-ordered frame queue
//!
//! A singly-linked list threaded through [`SlotPool`] slots, kept sorted
//! by [`Frame::compare_priority`]: immediate frames first, then scheduled
//! frames by ascending execution time. Frames of equal priority keep
//! their insertion order.
//!
//! A queue holds no storage of its own. Every operation takes the pool
//! the queue was first used with; several queues may share one pool,
//! which bounds their combined size.
//!
//! A queue must always be given that same pool. Slot ids mean nothing to
//! any other pool; freeing one there panics (see [`SlotPool::free`]), but
//! pushes through the wrong pool are not detected.

use core::cmp::Ordering;

use tether_protocol::Frame;

use crate::pool::{SlotId, SlotPool};

/// Sorted list of frames living in a shared slot pool
#[derive(Debug, Default)]
pub struct PriorityQueue {
    head: Option<SlotId>,
    size: u8,
    max_size: u8,
}

impl PriorityQueue {
    /// Create an empty queue
    pub const fn new() -> Self {
        Self {
            head: None,
            size: 0,
            max_size: 0,
        }
    }

    /// Insert a copy of `frame` at its priority position
    ///
    /// The frame goes behind every queued frame of equal priority. When
    /// the pool has no free slot the frame is handed back and the queue
    /// is left untouched.
    pub fn push<const N: usize>(
        &mut self,
        pool: &mut SlotPool<N>,
        frame: &Frame,
    ) -> Result<(), Frame> {
        let Some(node) = pool.alloc() else {
            return Err(*frame);
        };

        let mut prev = None;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            if pool.frame(id).compare_priority(frame) == Ordering::Greater {
                break;
            }
            prev = Some(id);
            cursor = pool.next(id);
        }

        *pool.frame_mut(node) = *frame;
        pool.set_next(node, cursor);
        match prev {
            Some(p) => pool.set_next(p, Some(node)),
            None => self.head = Some(node),
        }

        self.size += 1;
        if self.size > self.max_size {
            self.max_size = self.size;
        }
        Ok(())
    }

    /// Remove the head frame if it is due at `now`
    ///
    /// Immediate frames are always due; scheduled frames once their time
    /// is at or before `now`. Only the head is inspected: nothing behind
    /// a frame that is not yet due can be due either.
    pub fn pop<const N: usize>(&mut self, pool: &mut SlotPool<N>, now: u32) -> Option<Frame> {
        let head = self.head?;
        let frame = *pool.frame(head);
        if !frame.is_due(now) {
            return None;
        }

        self.head = pool.next(head);
        pool.free(head);
        self.size -= 1;
        Some(frame)
    }

    /// Head frame, due or not
    pub fn peek<'p, const N: usize>(&self, pool: &'p SlotPool<N>) -> Option<&'p Frame> {
        self.head.map(|id| pool.frame(id))
    }

    /// Return every queued slot to the pool
    ///
    /// The recorded maximum size is kept.
    pub fn clear<const N: usize>(&mut self, pool: &mut SlotPool<N>) {
        let mut cursor = self.head.take();
        while let Some(id) = cursor {
            cursor = pool.next(id);
            pool.free(id);
        }
        self.size = 0;
    }

    /// Frames in priority order
    pub fn iter<'p, const N: usize>(&self, pool: &'p SlotPool<N>) -> Iter<'p, N> {
        Iter {
            pool,
            cursor: self.head,
        }
    }

    /// Number of queued frames
    pub fn size(&self) -> u8 {
        self.size
    }

    /// Largest size reached so far
    pub fn max_size(&self) -> u8 {
        self.max_size
    }

    /// Whether the queue holds no frames
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }
}

/// Iterator over a queue's frames, head first
pub struct Iter<'p, const N: usize> {
    pool: &'p SlotPool<N>,
    cursor: Option<SlotId>,
}

impl<'p, const N: usize> Iterator for Iter<'p, N> {
    type Item = &'p Frame;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        self.cursor = self.pool.next(id);
        Some(self.pool.frame(id))
    }
}
