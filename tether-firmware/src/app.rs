//! Demo application
//!
//! Answers uptime queries and, once armed by the host, queues a
//! heartbeat every [`HEARTBEAT_PERIOD_MS`]. Heartbeats carry their due
//! time, so a late FLUSH still reports when each one was produced.

use defmt::*;

use tether_core::{Handler, Outbox};
use tether_protocol::{Frame, FIRST_APPLICATION_TYPE};

/// Request: empty payload. Response: u32 milliseconds then u32 microseconds
pub const MSG_UPTIME: u8 = FIRST_APPLICATION_TYPE;

/// Request: one byte, nonzero to start heartbeats, zero to stop them
pub const MSG_HEARTBEAT_ARM: u8 = FIRST_APPLICATION_TYPE + 1;

/// Scheduled response carrying a u32 sequence number
pub const MSG_HEARTBEAT: u8 = FIRST_APPLICATION_TYPE + 2;

/// Milliseconds between heartbeats
pub const HEARTBEAT_PERIOD_MS: u32 = 1000;

/// State of the demo application
#[derive(Debug, Default)]
pub struct Demo {
    heartbeat: Option<Heartbeat>,
}

#[derive(Debug, Clone, Copy)]
struct Heartbeat {
    task_id: u16,
    next_at: u32,
    sequence: u32,
}

impl Demo {
    pub const fn new() -> Self {
        Self { heartbeat: None }
    }

    fn uptime(&mut self, outbox: &mut Outbox<'_>, request: &Frame) {
        let mut reply = Frame::immediate(MSG_UPTIME, request.task_id());
        reply.set_data_size(8);
        reply.set_u32(0, outbox.now_millis());
        reply.set_u32(4, outbox.now_micros());
        outbox.add_response(&reply);
    }

    fn arm(&mut self, outbox: &mut Outbox<'_>, request: &Frame) {
        let enable = request.payload().first().is_some_and(|&b| b != 0);
        if enable {
            info!("heartbeat armed, task={}", request.task_id());
            self.heartbeat = Some(Heartbeat {
                task_id: request.task_id(),
                next_at: outbox.now_millis(),
                sequence: 0,
            });
        } else {
            info!("heartbeat stopped");
            self.heartbeat = None;
        }
    }
}

impl Handler for Demo {
    fn on_reset(&mut self, _outbox: &mut Outbox<'_>, _request: &Frame) {
        info!("reset: heartbeat stopped");
        self.heartbeat = None;
    }

    fn on_message(&mut self, outbox: &mut Outbox<'_>, frame: &Frame) {
        match frame.message_type() {
            MSG_UPTIME => self.uptime(outbox, frame),
            MSG_HEARTBEAT_ARM => self.arm(outbox, frame),
            other => warn!("unknown message type {}", other),
        }
    }

    fn on_tick(&mut self, outbox: &mut Outbox<'_>) {
        let Some(beat) = self.heartbeat.as_mut() else {
            return;
        };
        if outbox.now_millis() < beat.next_at {
            return;
        }

        let mut frame = Frame::scheduled(MSG_HEARTBEAT, beat.task_id, beat.next_at);
        frame.set_data_size(4);
        frame.set_u32(0, beat.sequence);
        outbox.add_response(&frame);
        trace!("heartbeat {} queued", beat.sequence);

        beat.sequence = beat.sequence.wrapping_add(1);
        beat.next_at = beat.next_at.wrapping_add(HEARTBEAT_PERIOD_MS);
    }
}
