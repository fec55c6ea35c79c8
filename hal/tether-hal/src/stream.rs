//! Byte stream abstraction
//!
//! Mirrors the subset of a serial port the message engine relies on:
//! a receive side that can be inspected without blocking, and a transmit
//! side that may block inside the implementation.

/// Bidirectional byte stream
///
/// Receive operations must never block: they only hand out bytes that
/// have already arrived. Write operations may block internally (a host
/// serial driver, a full UART FIFO) but the engine never requires it.
pub trait ByteStream {
    /// Error type for write operations
    type Error;

    /// Number of received bytes ready to be read
    fn available(&mut self) -> usize;

    /// Next received byte without consuming it
    ///
    /// Successive calls return the same byte, as does the next `read`.
    fn peek(&mut self) -> Option<u8>;

    /// Consume the next received byte
    fn read(&mut self) -> Option<u8>;

    /// Read up to `buf.len()` already-received bytes
    ///
    /// Returns the number of bytes placed in `buf`, which may be fewer
    /// than requested.
    fn read_bytes(&mut self, buf: &mut [u8]) -> usize {
        let mut count = 0;
        for slot in buf.iter_mut() {
            match self.read() {
                Some(byte) => {
                    *slot = byte;
                    count += 1;
                }
                None => break,
            }
        }
        count
    }

    /// Write data to the stream
    ///
    /// Returns the number of bytes written.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Write a single byte
    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.write(&[byte]).map(|_| ())
    }
}

impl<T: ByteStream + ?Sized> ByteStream for &mut T {
    type Error = T::Error;

    fn available(&mut self) -> usize {
        (**self).available()
    }

    fn peek(&mut self) -> Option<u8> {
        (**self).peek()
    }

    fn read(&mut self) -> Option<u8> {
        (**self).read()
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> usize {
        (**self).read_bytes(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        (**self).write(data)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        (**self).write_byte(byte)
    }
}
