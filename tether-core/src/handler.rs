//! Application hooks
//!
//! Application logic plugs into the [`Server`](crate::server::Server) by
//! implementing [`Handler`]. Each hook receives an [`Outbox`] through
//! which it can queue responses and read the device clock.

use tether_hal::Clock;
use tether_protocol::Frame;

use crate::pool::{SlotPool, SLOT_COUNT};
use crate::queue::PriorityQueue;

/// Callbacks invoked by the server loop
///
/// Every method defaults to doing nothing.
pub trait Handler<const N: usize = SLOT_COUNT> {
    /// Called after a RESET request has emptied both queues
    ///
    /// Stop actuators, forget subscriptions and the like here. No reply
    /// is sent on the application's behalf.
    fn on_reset(&mut self, _outbox: &mut Outbox<'_, N>, _request: &Frame) {}

    /// Called when an application frame becomes due
    fn on_message(&mut self, _outbox: &mut Outbox<'_, N>, _frame: &Frame) {}

    /// Called once per loop iteration, and once per frame sent by a FLUSH
    ///
    /// Responses queued here during a FLUSH go out in the same FLUSH if
    /// they are already due, up to the pool capacity. Keep the hook short:
    /// it runs inside the drain loop.
    fn on_tick(&mut self, _outbox: &mut Outbox<'_, N>) {}
}

impl<const N: usize> Handler<N> for () {}

/// Handle given to hooks for queueing responses
pub struct Outbox<'a, const N: usize = SLOT_COUNT> {
    pub(crate) pool: &'a mut SlotPool<N>,
    pub(crate) queue: &'a mut PriorityQueue,
    pub(crate) clock: &'a dyn Clock,
    pub(crate) dropped: &'a mut u16,
}

impl<'a, const N: usize> Outbox<'a, N> {
    /// Queue a response for the next FLUSH
    ///
    /// Scheduled responses are held back until their time passes. When
    /// no slot is free the response is dropped; the loss shows up in the
    /// server's diagnostics.
    pub fn add_response(&mut self, frame: &Frame) {
        if self.queue.push(self.pool, frame).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "outbound queue full, dropping response type={} task={}",
                frame.message_type(),
                frame.task_id()
            );
            *self.dropped = self.dropped.wrapping_add(1);
        }
    }

    /// Device time in milliseconds
    pub fn now_millis(&self) -> u32 {
        self.clock.now_millis()
    }

    /// Device time in microseconds
    pub fn now_micros(&self) -> u32 {
        self.clock.now_micros()
    }

    /// Slots still free in the shared pool
    pub fn free_slots(&self) -> u8 {
        self.pool.free_count()
    }
}
