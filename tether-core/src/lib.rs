//! Message engine for the tether protocol
//!
//! This crate contains the parts of the device side that do not depend
//! on any particular board:
//!
//! - Static slot pool shared by all queues
//! - Priority queue ordered by immediacy and execution time
//! - Polling server handling the control protocol
//! - Application hook trait
//!
//! Memory use is fixed at compile time and no call blocks waiting for
//! input, so one [`server::Server::poll`] has bounded latency.

#![no_std]
#![deny(unsafe_code)]

pub mod handler;
pub mod pool;
pub mod queue;
pub mod server;

pub use handler::{Handler, Outbox};
pub use pool::{SlotId, SlotPool, SLOT_COUNT};
pub use queue::PriorityQueue;
pub use server::{Diagnostics, Server};
