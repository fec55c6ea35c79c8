//! Tether Hardware Abstraction Layer
//!
//! The message engine in `tether-core` never touches a peripheral
//! directly. It consumes two capabilities, both defined here:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  tether-core (Server, queues, pool)     │
//! └─────────────────────────────────────────┘
//!            │                    │
//!            ▼                    ▼
//! ┌────────────────────┐ ┌────────────────────┐
//! │ stream::ByteStream │ │ clock::Clock       │
//! └────────────────────┘ └────────────────────┘
//!            │                    │
//!            ▼                    ▼
//!   UART adapter / BufferStream   timer / ManualClock
//! ```
//!
//! # Traits
//!
//! - [`stream::ByteStream`] - Non-blocking byte source with a write path
//! - [`clock::Clock`] - Free-running millisecond/microsecond counters
//!
//! # Reference implementations
//!
//! - [`buffer::BufferStream`] - Fixed-capacity in-memory stream, used for
//!   host tests and for bridging interrupt-fed receive buffers
//! - [`clock::ManualClock`] - Clock advanced explicitly by the caller

#![no_std]
#![deny(unsafe_code)]

pub mod buffer;
pub mod clock;
pub mod stream;

pub use buffer::{BufferStream, BufferStreamError};
pub use clock::{Clock, ManualClock};
pub use stream::ByteStream;
