//! Stream framing for the tether protocol.
//!
//! On the wire every frame is wrapped in markers:
//! ```text
//! '>' LENGTH TYPE TASK_ID(2) PAYLOAD(LENGTH-4) '<'
//! ```
//!
//! The reader never blocks. It scans for a start marker, sanity checks
//! the length byte before committing to it, and only consumes the frame
//! once every byte (end marker included) has arrived. A bad length byte
//! is left in the stream so it is rescanned as ordinary traffic, which
//! lets the reader lock back on to the next real frame after noise.

use tether_hal::ByteStream;

use crate::frame::{is_valid_length, Frame, MAX_FRAME_SIZE};

/// Byte opening every frame on the wire
pub const START_MARKER: u8 = b'>';

/// Byte closing every frame on the wire
pub const END_MARKER: u8 = b'<';

/// Largest number of bytes one framed message occupies on the wire
pub const MAX_WIRE_SIZE: usize = MAX_FRAME_SIZE + 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum ReadState {
    /// Discarding bytes until a start marker shows up
    NeedStart,
    /// Start marker consumed, whole frame not yet buffered
    NeedData,
    /// Whole frame including end marker is available
    HaveData,
}

/// Failure to put a whole frame on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteError<E> {
    /// The stream reported an error
    Stream(E),
    /// The stream stopped accepting bytes part way through the frame
    WriteZero,
}

/// Reads and writes framed messages over a [`ByteStream`]
#[derive(Debug)]
pub struct StreamFramer<S> {
    stream: S,
    state: ReadState,
    rejected: u16,
}

impl<S: ByteStream> StreamFramer<S> {
    /// Create a framer that owns `stream`
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            state: ReadState::NeedStart,
            rejected: 0,
        }
    }

    /// Borrow the underlying stream
    pub fn stream(&self) -> &S {
        &self.stream
    }

    /// Mutably borrow the underlying stream
    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Give back the underlying stream
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Frames abandoned so far (bad length, bad end marker, undecodable)
    ///
    /// Wraps on overflow; only useful for spotting line noise.
    pub fn rejected(&self) -> u16 {
        self.rejected
    }

    /// Try to read one frame from bytes that have already arrived
    ///
    /// Returns `None` whenever a full, well-formed frame is not yet
    /// available; malformed frames are dropped silently.
    pub fn read(&mut self) -> Option<Frame> {
        if self.state == ReadState::NeedStart && !self.find_start() {
            return None;
        }

        if self.state == ReadState::NeedData && !self.wait_for_data() {
            return None;
        }

        self.read_data()
    }

    /// Write one frame, markers included
    ///
    /// Blocks for as long as the stream's write blocks. Short writes are
    /// retried until the whole frame is out; a write that accepts nothing
    /// fails with [`WriteError::WriteZero`], leaving a truncated frame on
    /// the wire for the peer's framer to reject.
    pub fn write(&mut self, frame: &Frame) -> Result<(), WriteError<S::Error>> {
        let mut body = [0u8; MAX_FRAME_SIZE];
        let len = frame.encode_into(&mut body);

        let mut wire = [0u8; MAX_WIRE_SIZE];
        wire[0] = START_MARKER;
        wire[1..=len].copy_from_slice(&body[..len]);
        wire[len + 1] = END_MARKER;

        let wire = &wire[..len + 2];
        let mut sent = 0;
        while sent < wire.len() {
            match self.stream.write(&wire[sent..]).map_err(WriteError::Stream)? {
                0 => return Err(WriteError::WriteZero),
                n => sent += n,
            }
        }
        Ok(())
    }

    fn find_start(&mut self) -> bool {
        while let Some(byte) = self.stream.read() {
            if byte == START_MARKER {
                self.state = ReadState::NeedData;
                return true;
            }
        }
        false
    }

    fn wait_for_data(&mut self) -> bool {
        let Some(len) = self.stream.peek() else {
            return false;
        };
        let len = len as usize;

        if !is_valid_length(len) {
            // Leave the byte in place; it may be the start of the next frame
            #[cfg(feature = "defmt")]
            defmt::debug!("framer: bad length byte {}, resyncing", len);
            self.reject();
            self.state = ReadState::NeedStart;
            return false;
        }

        // The length byte does not count the end marker
        if self.stream.available() <= len {
            return false;
        }

        self.state = ReadState::HaveData;
        true
    }

    fn read_data(&mut self) -> Option<Frame> {
        self.state = ReadState::NeedStart;

        let peeked = self.stream.peek().map_or(0, usize::from);
        let len = peeked.min(MAX_FRAME_SIZE);
        let mut body = [0u8; MAX_FRAME_SIZE];
        let got = self.stream.read_bytes(&mut body[..len]);
        let decoded = Frame::decode(&body[..got]);

        let end = self.stream.read();
        if end != Some(END_MARKER) {
            #[cfg(feature = "defmt")]
            defmt::debug!("framer: missing end marker");
            self.reject();
            return None;
        }

        match decoded {
            Ok(frame) => Some(frame),
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::debug!("framer: undecodable frame: {:?}", _e);
                self.reject();
                None
            }
        }
    }

    fn reject(&mut self) {
        self.rejected = self.rejected.wrapping_add(1);
    }
}
