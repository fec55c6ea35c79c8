//! UART byte stream
//!
//! Adapts a blocking `embedded-io` serial port to the engine's
//! [`ByteStream`]. The engine wants to know how many bytes are waiting and
//! to peek at the next one, which a UART cannot tell it, so received bytes
//! are drained into a small look-ahead buffer first.

use defmt::*;
use embedded_io::{Read, ReadReady, Write};
use heapless::Deque;

use tether_hal::ByteStream;
use tether_protocol::MAX_WIRE_SIZE;

/// Look-ahead capacity; two frames lets the framer see a whole frame
/// behind a partial one
pub const LOOKAHEAD_SIZE: usize = 2 * MAX_WIRE_SIZE;

/// Serial port with a look-ahead buffer
pub struct SerialStream<T, const N: usize = LOOKAHEAD_SIZE> {
    port: T,
    pending: Deque<u8, N>,
}

impl<T, const N: usize> SerialStream<T, N>
where
    T: Read + ReadReady + Write,
{
    pub fn new(port: T) -> Self {
        Self {
            port,
            pending: Deque::new(),
        }
    }

    /// Move whatever the port already holds into the look-ahead buffer
    ///
    /// Never blocks: the port is only read while it reports data ready.
    fn fill(&mut self) {
        let mut chunk = [0u8; 16];
        while !self.pending.is_full() {
            match self.port.read_ready() {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    warn!("UART read error: {:?}", defmt::Debug2Format(&e));
                    break;
                }
            }

            let room = (N - self.pending.len()).min(chunk.len());
            match self.port.read(&mut chunk[..room]) {
                Ok(0) => break,
                Ok(n) => {
                    trace!("RX: {} bytes", n);
                    for &byte in &chunk[..n] {
                        // Room was checked above
                        let _ = self.pending.push_back(byte);
                    }
                }
                Err(e) => {
                    warn!("UART read error: {:?}", defmt::Debug2Format(&e));
                    break;
                }
            }
        }
    }
}

impl<T, const N: usize> ByteStream for SerialStream<T, N>
where
    T: Read + ReadReady + Write,
{
    type Error = T::Error;

    fn available(&mut self) -> usize {
        self.fill();
        self.pending.len()
    }

    fn peek(&mut self) -> Option<u8> {
        if self.pending.is_empty() {
            self.fill();
        }
        self.pending.front().copied()
    }

    fn read(&mut self) -> Option<u8> {
        if self.pending.is_empty() {
            self.fill();
        }
        self.pending.pop_front()
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        self.port.write_all(data)?;
        Ok(data.len())
    }
}
