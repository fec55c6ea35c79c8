//! In-memory byte stream
//!
//! A [`BufferStream`] holds a receive ring and a transmit buffer, both
//! statically sized. Tests push inbound bytes with [`BufferStream::feed`]
//! and inspect whatever the engine wrote with [`BufferStream::written`].

use heapless::{Deque, Vec};

use crate::stream::ByteStream;

/// Errors from the in-memory stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BufferStreamError {
    /// Transmit buffer has no room for the data
    TxFull,
}

/// Fixed-capacity stream backed by a receive ring and a transmit buffer
#[derive(Debug, Default)]
pub struct BufferStream<const RX: usize, const TX: usize> {
    rx: Deque<u8, RX>,
    tx: Vec<u8, TX>,
}

impl<const RX: usize, const TX: usize> BufferStream<RX, TX> {
    /// Create an empty stream
    pub const fn new() -> Self {
        Self {
            rx: Deque::new(),
            tx: Vec::new(),
        }
    }

    /// Append received bytes
    ///
    /// Returns how many bytes fit; the rest are dropped, as a UART
    /// overrun would drop them.
    pub fn feed(&mut self, bytes: &[u8]) -> usize {
        let mut accepted = 0;
        for &byte in bytes {
            if self.rx.push_back(byte).is_err() {
                break;
            }
            accepted += 1;
        }
        accepted
    }

    /// Bytes written so far
    pub fn written(&self) -> &[u8] {
        &self.tx
    }

    /// Discard written bytes
    pub fn clear_written(&mut self) {
        self.tx.clear();
    }

    /// Move written bytes into another stream's receive side
    ///
    /// Lets two engines (or an engine and a test client) talk through a
    /// pair of buffers.
    pub fn transfer_to<const RX2: usize, const TX2: usize>(
        &mut self,
        peer: &mut BufferStream<RX2, TX2>,
    ) -> usize {
        let moved = peer.feed(&self.tx);
        self.tx.clear();
        moved
    }
}

impl<const RX: usize, const TX: usize> ByteStream for BufferStream<RX, TX> {
    type Error = BufferStreamError;

    fn available(&mut self) -> usize {
        self.rx.len()
    }

    fn peek(&mut self) -> Option<u8> {
        self.rx.front().copied()
    }

    fn read(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        self.tx
            .extend_from_slice(data)
            .map_err(|_| BufferStreamError::TxFull)?;
        Ok(data.len())
    }
}
