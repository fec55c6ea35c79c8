//! Polling message server
//!
//! The server owns the slot pool, an inbound and an outbound queue, the
//! stream framer and a clock. [`Server::poll`] performs one loop
//! iteration and never waits for bytes:
//!
//! 1. Try to read one frame. Control frames are handled on the spot;
//!    anything else is queued inbound.
//! 2. Otherwise pop one due inbound frame and pass it to
//!    [`Handler::on_message`].
//! 3. Call [`Handler::on_tick`].
//!
//! Reading always wins over dispatching, so a host that never stops
//! sending will starve queued work. That sheds load at the device rather
//! than overrunning the pool.
//!
//! Responses queued by the application only leave the device when the
//! host sends FLUSH. One FLUSH sends at most `N` queued frames; anything
//! still due afterwards waits for the next one.

use tether_hal::{ByteStream, Clock};
use tether_protocol::{ControlMessage, FlushResponse, Frame, StreamFramer};

use crate::handler::{Handler, Outbox};
use crate::pool::{SlotPool, SLOT_COUNT};
use crate::queue::PriorityQueue;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Snapshot of the server's queue counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Diagnostics {
    /// Lowest free slot count ever observed
    pub min_free_slots: u8,
    /// Free slots right now
    pub free_slots: u8,
    /// Inbound queue size right now
    pub inbound_size: u8,
    /// Largest inbound queue size observed
    pub inbound_max_size: u8,
    /// Outbound queue size right now
    pub outbound_size: u8,
    /// Largest outbound queue size observed
    pub outbound_max_size: u8,
    /// Frames the framer discarded as malformed (wrapping)
    pub rejected_frames: u16,
    /// Frames dropped because the pool was exhausted (wrapping)
    pub dropped_frames: u16,
}

impl Diagnostics {
    /// The part of the snapshot reported to the host after a FLUSH
    pub fn flush_response(&self) -> FlushResponse {
        FlushResponse {
            min_free_slots: self.min_free_slots,
            free_slots: self.free_slots,
            input_queue_max_size: self.inbound_max_size,
            input_queue_size: self.inbound_size,
            output_queue_max_size: self.outbound_max_size,
            output_queue_size: self.outbound_size,
        }
    }
}

/// Message server driving one byte stream
pub struct Server<S, C, H, const N: usize = SLOT_COUNT> {
    pool: SlotPool<N>,
    inbound: PriorityQueue,
    outbound: PriorityQueue,
    framer: StreamFramer<S>,
    clock: C,
    handler: H,
    dropped: u16,
}

impl<S, C, H, const N: usize> Server<S, C, H, N>
where
    S: ByteStream,
    C: Clock,
    H: Handler<N>,
{
    /// Create a server with empty queues
    pub fn new(stream: S, clock: C, handler: H) -> Self {
        Self {
            pool: SlotPool::new(),
            inbound: PriorityQueue::new(),
            outbound: PriorityQueue::new(),
            framer: StreamFramer::new(stream),
            clock,
            handler,
            dropped: 0,
        }
    }

    /// Run one loop iteration
    pub fn poll(&mut self) {
        if let Some(frame) = self.framer.read() {
            self.dispatch(&frame);
        } else if let Some(frame) = self.inbound.pop(&mut self.pool, self.clock.now_millis()) {
            let (handler, mut outbox) = self.split();
            handler.on_message(&mut outbox, &frame);
        }

        let (handler, mut outbox) = self.split();
        handler.on_tick(&mut outbox);
    }

    /// Queue a response for the next FLUSH
    ///
    /// Dropped, with a diagnostic, when the pool is exhausted.
    pub fn add_response(&mut self, frame: &Frame) {
        self.split().1.add_response(frame);
    }

    /// Device time in milliseconds
    pub fn now_millis(&self) -> u32 {
        self.clock.now_millis()
    }

    /// Device time in microseconds
    pub fn now_micros(&self) -> u32 {
        self.clock.now_micros()
    }

    /// Current queue counters
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            min_free_slots: self.pool.min_free_count(),
            free_slots: self.pool.free_count(),
            inbound_size: self.inbound.size(),
            inbound_max_size: self.inbound.max_size(),
            outbound_size: self.outbound.size(),
            outbound_max_size: self.outbound.max_size(),
            rejected_frames: self.framer.rejected(),
            dropped_frames: self.dropped,
        }
    }

    /// The application handler
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// The application handler, mutably
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// The clock
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The underlying stream
    pub fn stream(&self) -> &S {
        self.framer.stream()
    }

    /// The underlying stream, mutably
    pub fn stream_mut(&mut self) -> &mut S {
        self.framer.stream_mut()
    }

    /// Borrow the handler and an outbox at the same time
    fn split(&mut self) -> (&mut H, Outbox<'_, N>) {
        (
            &mut self.handler,
            Outbox {
                pool: &mut self.pool,
                queue: &mut self.outbound,
                clock: &self.clock,
                dropped: &mut self.dropped,
            },
        )
    }

    fn dispatch(&mut self, frame: &Frame) {
        match ControlMessage::from_frame(frame) {
            Some(ControlMessage::Noop) => {}
            Some(ControlMessage::Echo) => self.send(frame),
            Some(ControlMessage::Reset) => self.reset(frame),
            Some(ControlMessage::Flush) => self.flush(frame),
            None => {
                if self.inbound.push(&mut self.pool, frame).is_err() {
                    #[cfg(feature = "defmt")]
                    defmt::warn!(
                        "inbound queue full, dropping type={} task={}",
                        frame.message_type(),
                        frame.task_id()
                    );
                    self.dropped = self.dropped.wrapping_add(1);
                }
            }
        }
    }

    fn reset(&mut self, request: &Frame) {
        #[cfg(feature = "defmt")]
        defmt::debug!("reset requested, task={}", request.task_id());

        self.inbound.clear(&mut self.pool);
        self.outbound.clear(&mut self.pool);

        let (handler, mut outbox) = self.split();
        handler.on_reset(&mut outbox, request);
    }

    fn flush(&mut self, request: &Frame) {
        // At most N frames per FLUSH, so the drain ends even when on_tick
        // keeps queueing due responses
        for _ in 0..N {
            let Some(frame) = self.outbound.pop(&mut self.pool, self.clock.now_millis()) else {
                break;
            };
            self.send(&frame);

            // Let the application catch up between writes so state changes
            // observed during a long flush still make it out
            let (handler, mut outbox) = self.split();
            handler.on_tick(&mut outbox);
        }

        let response = self
            .diagnostics()
            .flush_response()
            .to_frame(request.task_id(), self.clock.now_millis());
        self.send(&response);
    }

    fn send(&mut self, frame: &Frame) {
        if self.framer.write(frame).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "stream write failed, dropping type={} task={}",
                frame.message_type(),
                frame.task_id()
            );
        }
    }
}
