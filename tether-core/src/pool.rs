//! Static frame slot pool
//!
//! A fixed array of slots, each holding one [`Frame`] and a link to the
//! next slot of whatever list currently owns it. Free slots form a LIFO
//! list threaded through the same links. Slots are addressed by index,
//! so the pool never hands out references that could outlive it.

use tether_protocol::Frame;

/// Default number of slots, shared by the inbound and outbound queues
pub const SLOT_COUNT: usize = 32;

/// Index of a slot inside its pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotId(u8);

impl SlotId {
    /// Position of the slot in the pool
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    frame: Frame,
    next: Option<SlotId>,
    allocated: bool,
}

impl Slot {
    const EMPTY: Slot = Slot {
        frame: Frame::new(),
        next: None,
        allocated: false,
    };
}

/// Fixed-capacity frame allocator
///
/// Every slot is always either on the free list or owned by exactly one
/// queue. The pool itself does not know which queue; it trusts callers to
/// free a slot once and only after unlinking it.
#[derive(Debug)]
pub struct SlotPool<const N: usize = SLOT_COUNT> {
    slots: [Slot; N],
    free_head: Option<SlotId>,
    free_count: u8,
    min_free_count: u8,
}

impl<const N: usize> Default for SlotPool<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SlotPool<N> {
    const CAPACITY_FITS: () = assert!(N > 0 && N <= u8::MAX as usize, "pool size must be 1-255");

    /// Create a pool with every slot free
    pub fn new() -> Self {
        let () = Self::CAPACITY_FITS;

        let mut slots = [Slot::EMPTY; N];
        for i in 1..N {
            slots[i - 1].next = Some(SlotId(i as u8));
        }

        Self {
            slots,
            free_head: Some(SlotId(0)),
            free_count: N as u8,
            min_free_count: N as u8,
        }
    }

    /// Total number of slots
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Take a slot off the free list
    ///
    /// Returns `None` when every slot is in use.
    pub fn alloc(&mut self) -> Option<SlotId> {
        let id = self.free_head?;
        let slot = &mut self.slots[id.index()];
        self.free_head = slot.next;
        slot.next = None;
        slot.allocated = true;

        self.free_count -= 1;
        if self.free_count < self.min_free_count {
            self.min_free_count = self.free_count;
        }
        Some(id)
    }

    /// Return a slot to the free list
    ///
    /// The slot must have been allocated and unlinked from its queue.
    ///
    /// # Panics
    /// If the slot is not allocated: freed twice, or handed to a pool it
    /// did not come from.
    pub fn free(&mut self, id: SlotId) {
        let slot = &mut self.slots[id.index()];
        assert!(slot.allocated, "slot is not allocated");
        slot.allocated = false;
        slot.next = self.free_head;
        self.free_head = Some(id);
        self.free_count += 1;
    }

    /// Slots currently free
    pub fn free_count(&self) -> u8 {
        self.free_count
    }

    /// Lowest free count since the pool was created
    pub fn min_free_count(&self) -> u8 {
        self.min_free_count
    }

    /// Frame stored in a slot
    pub fn frame(&self, id: SlotId) -> &Frame {
        &self.slots[id.index()].frame
    }

    /// Mutable frame stored in a slot
    pub fn frame_mut(&mut self, id: SlotId) -> &mut Frame {
        &mut self.slots[id.index()].frame
    }

    pub(crate) fn next(&self, id: SlotId) -> Option<SlotId> {
        self.slots[id.index()].next
    }

    pub(crate) fn set_next(&mut self, id: SlotId, next: Option<SlotId>) {
        self.slots[id.index()].next = next;
    }
}
