//! Tether Message Protocol
//!
//! This crate defines the binary protocol a memory-constrained
//! microcontroller uses to exchange commands and telemetry with a host
//! over a single byte stream (typically a UART). Everything is statically
//! sized; nothing here allocates.
//!
//! # Protocol Overview
//!
//! Every message travels in one marker-delimited frame:
//! ```text
//! ┌───────┬────────┬──────────┬─────────┬──────────────┬─────┐
//! │ START │ LENGTH │ TYPE|IMM │ TASK ID │ PAYLOAD      │ END │
//! │ '>'   │ 1B     │ 1B       │ 2B (BE) │ 0–16B        │ '<' │
//! └───────┴────────┴──────────┴─────────┴──────────────┴─────┘
//! ```
//!
//! Frames without the IMM bit carry a big-endian execution time in the
//! first four payload bytes, leaving twelve bytes for data. There is no
//! checksum: a frame is accepted when its length byte is plausible and
//! its end marker lands where the length says it should.

#![no_std]
#![deny(unsafe_code)]

pub mod frame;
pub mod framer;
pub mod messages;

pub use frame::{
    Frame, FrameError, HEADER_SIZE, IMMEDIATE_FLAG, MAX_DATA_SIZE, MAX_FRAME_SIZE,
    MAX_MESSAGE_TYPE, SCHEDULED_TIME_SIZE,
};
pub use framer::{StreamFramer, WriteError, END_MARKER, MAX_WIRE_SIZE, START_MARKER};
pub use messages::{
    check_shape, ControlMessage, FlushResponse, MessageStatus, FIRST_APPLICATION_TYPE,
    MSG_ECHO, MSG_FLUSH, MSG_NOOP, MSG_RESET,
};
