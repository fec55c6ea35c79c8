//! Frame representation and byte layout.
//!
//! Serialized frame (markers are added by the framer, not here):
//! - LENGTH (1 byte): bytes from LENGTH through the last payload byte (4-20)
//! - TYPE (1 byte): message type in the low 7 bits, IMMEDIATE flag in bit 7
//! - TASK ID (2 bytes): big-endian correlation token, 0 = no task
//! - PAYLOAD (0-16 bytes): for scheduled frames the first 4 bytes are the
//!   big-endian execution time in device milliseconds
//!
//! The in-memory layout matches the serialized one, so shifting between
//! immediate and scheduled moves the payload bytes by 4.

use core::cmp::Ordering;
use core::ops::Range;

use heapless::Vec;

/// Size of the fixed header (length, type, task id)
pub const HEADER_SIZE: usize = 4;

/// Maximum payload carried by an immediate frame
pub const MAX_DATA_SIZE: usize = 16;

/// Bytes of payload used by the execution time of a scheduled frame
pub const SCHEDULED_TIME_SIZE: usize = 4;

/// Largest valid message type identifier
pub const MAX_MESSAGE_TYPE: u8 = 0x7F;

/// Bit of the type byte marking an immediate frame
pub const IMMEDIATE_FLAG: u8 = 0x80;

/// Maximum serialized frame size, markers excluded
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_DATA_SIZE;

/// Errors that can occur while encoding or decoding a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds the room left by the frame's timing mode
    PayloadTooLarge,
    /// Length byte outside the valid range or disagreeing with the input
    InvalidLength,
    /// Input ends before the length byte says it should
    Incomplete,
    /// Scheduled frame too short to hold its execution time
    MissingTime,
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// One protocol message
///
/// A plain value: copying a `Frame` copies the whole message. A freshly
/// created frame is scheduled for time 0 with type 0, task 0 and no
/// payload.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    data_size: u8,
    type_byte: u8,
    task_id: u16,
    data: [u8; MAX_DATA_SIZE],
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    /// Create a cleared frame
    pub const fn new() -> Self {
        Self {
            data_size: 0,
            type_byte: 0,
            task_id: 0,
            data: [0; MAX_DATA_SIZE],
        }
    }

    /// Create an immediate frame with no payload
    pub fn immediate(message_type: u8, task_id: u16) -> Self {
        let mut frame = Self::new();
        frame.set_message_type(message_type);
        frame.set_task_id(task_id);
        frame.set_immediate();
        frame
    }

    /// Create a frame scheduled for `at_millis` with no payload
    pub fn scheduled(message_type: u8, task_id: u16, at_millis: u32) -> Self {
        let mut frame = Self::new();
        frame.set_message_type(message_type);
        frame.set_task_id(task_id);
        frame.set_scheduled_time(at_millis);
        frame
    }

    /// Reset to the freshly created state
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Payload bytes in use (not counting the execution time)
    pub fn data_size(&self) -> u8 {
        self.data_size
    }

    /// Largest payload this frame can carry in its current timing mode
    pub fn max_data_size(&self) -> u8 {
        if self.is_immediate() {
            MAX_DATA_SIZE as u8
        } else {
            (MAX_DATA_SIZE - SCHEDULED_TIME_SIZE) as u8
        }
    }

    /// Set the payload size
    ///
    /// # Panics
    /// If `size` exceeds [`Frame::max_data_size`].
    pub fn set_data_size(&mut self, size: u8) {
        assert!(
            size <= self.max_data_size(),
            "data size exceeds frame capacity"
        );
        self.data_size = size;
    }

    /// Message type, 0-127
    pub fn message_type(&self) -> u8 {
        self.type_byte & !IMMEDIATE_FLAG
    }

    /// Set the message type, keeping the immediate flag
    ///
    /// # Panics
    /// If `message_type` exceeds [`MAX_MESSAGE_TYPE`].
    pub fn set_message_type(&mut self, message_type: u8) {
        assert!(
            message_type <= MAX_MESSAGE_TYPE,
            "message type out of range"
        );
        self.type_byte = message_type | (self.type_byte & IMMEDIATE_FLAG);
    }

    /// Task correlation token, 0 when the frame belongs to no task
    pub fn task_id(&self) -> u16 {
        self.task_id
    }

    /// Set the task correlation token
    pub fn set_task_id(&mut self, task_id: u16) {
        self.task_id = task_id;
    }

    /// Whether the frame skips scheduling
    pub fn is_immediate(&self) -> bool {
        self.type_byte & IMMEDIATE_FLAG != 0
    }

    /// Mark the frame immediate
    ///
    /// Drops the execution time and moves the payload into the freed
    /// space; payload contents are preserved.
    pub fn set_immediate(&mut self) {
        if self.is_immediate() {
            return;
        }
        self.type_byte |= IMMEDIATE_FLAG;
        let size = self.data_size as usize;
        self.data
            .copy_within(SCHEDULED_TIME_SIZE..SCHEDULED_TIME_SIZE + size, 0);
    }

    /// Execution time in device milliseconds, 0 for immediate frames
    pub fn scheduled_time(&self) -> u32 {
        if self.is_immediate() {
            return 0;
        }
        u32::from_be_bytes([self.data[0], self.data[1], self.data[2], self.data[3]])
    }

    /// Schedule the frame for `ms`, clearing the immediate flag
    ///
    /// An immediate frame's payload is moved up to make room for the
    /// time field; payload contents are preserved.
    ///
    /// # Panics
    /// If the payload is too large to share the frame with a time field.
    pub fn set_scheduled_time(&mut self, ms: u32) {
        assert!(
            self.data_size as usize <= MAX_DATA_SIZE - SCHEDULED_TIME_SIZE,
            "payload too large for a scheduled frame"
        );
        if self.is_immediate() {
            self.type_byte &= !IMMEDIATE_FLAG;
            let size = self.data_size as usize;
            self.data.copy_within(0..size, SCHEDULED_TIME_SIZE);
        }
        self.data[..SCHEDULED_TIME_SIZE].copy_from_slice(&ms.to_be_bytes());
    }

    fn payload_start(&self) -> usize {
        if self.is_immediate() {
            0
        } else {
            SCHEDULED_TIME_SIZE
        }
    }

    /// Range of `data` backing a `width`-byte field at payload `offset`
    fn field(&self, offset: usize, width: usize) -> Range<usize> {
        assert!(
            offset + width <= self.data_size as usize,
            "payload offset out of range"
        );
        let start = self.payload_start() + offset;
        start..start + width
    }

    /// Payload bytes in use
    pub fn payload(&self) -> &[u8] {
        let start = self.payload_start();
        &self.data[start..start + self.data_size as usize]
    }

    /// Mutable view of the payload bytes in use
    pub fn payload_mut(&mut self) -> &mut [u8] {
        let start = self.payload_start();
        let end = start + self.data_size as usize;
        &mut self.data[start..end]
    }

    /// Replace the payload, resizing it to `bytes.len()`
    pub fn set_payload(&mut self, bytes: &[u8]) -> Result<(), FrameError> {
        if bytes.len() > self.max_data_size() as usize {
            return Err(FrameError::PayloadTooLarge);
        }
        self.data_size = bytes.len() as u8;
        self.payload_mut().copy_from_slice(bytes);
        Ok(())
    }

    /// Read a byte at payload `offset`
    ///
    /// # Panics
    /// If the byte lies beyond the payload.
    pub fn get_u8(&self, offset: usize) -> u8 {
        self.data[self.field(offset, 1).start]
    }

    /// Read a big-endian u16 at payload `offset`
    ///
    /// # Panics
    /// If the field extends beyond the payload.
    pub fn get_u16(&self, offset: usize) -> u16 {
        let r = self.field(offset, 2);
        u16::from_be_bytes([self.data[r.start], self.data[r.start + 1]])
    }

    /// Read a big-endian u32 at payload `offset`
    ///
    /// # Panics
    /// If the field extends beyond the payload.
    pub fn get_u32(&self, offset: usize) -> u32 {
        let r = self.field(offset, 4);
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[r]);
        u32::from_be_bytes(bytes)
    }

    /// Store a byte at payload `offset`
    ///
    /// # Panics
    /// If the byte lies beyond the payload.
    pub fn set_u8(&mut self, offset: usize, value: u8) {
        let r = self.field(offset, 1);
        self.data[r.start] = value;
    }

    /// Store a big-endian u16 at payload `offset`
    ///
    /// # Panics
    /// If the field extends beyond the payload.
    pub fn set_u16(&mut self, offset: usize, value: u16) {
        let r = self.field(offset, 2);
        self.data[r].copy_from_slice(&value.to_be_bytes());
    }

    /// Store a big-endian u32 at payload `offset`
    ///
    /// # Panics
    /// If the field extends beyond the payload.
    pub fn set_u32(&mut self, offset: usize, value: u32) {
        let r = self.field(offset, 4);
        self.data[r].copy_from_slice(&value.to_be_bytes());
    }

    /// Dequeue priority relative to `other`
    ///
    /// `Less` means this frame goes first. Immediate frames precede all
    /// scheduled ones; scheduled frames order by execution time. Times
    /// compare as plain integers, so a schedule crossing the 32-bit
    /// millisecond wrap sorts before earlier, unwrapped times.
    pub fn compare_priority(&self, other: &Frame) -> Ordering {
        match (self.is_immediate(), other.is_immediate()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.scheduled_time().cmp(&other.scheduled_time()),
        }
    }

    /// Whether the frame may be processed at time `now`
    pub fn is_due(&self, now: u32) -> bool {
        self.is_immediate() || self.scheduled_time() <= now
    }

    /// Payload bytes on the wire, including the execution time
    fn wire_data_len(&self) -> usize {
        self.payload_start() + self.data_size as usize
    }

    /// Serialized size, markers excluded
    pub fn wire_len(&self) -> usize {
        HEADER_SIZE + self.wire_data_len()
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let len = self.wire_len();
        if buffer.len() < len {
            return Err(FrameError::BufferTooSmall);
        }

        let mut full = [0u8; MAX_FRAME_SIZE];
        self.encode_into(&mut full);
        buffer[..len].copy_from_slice(&full[..len]);

        Ok(len)
    }

    /// Encode into a buffer that always fits
    ///
    /// Returns the number of bytes written
    pub fn encode_into(&self, buffer: &mut [u8; MAX_FRAME_SIZE]) -> usize {
        let len = self.wire_len();
        buffer[0] = len as u8;
        buffer[1] = self.type_byte;
        buffer[2..HEADER_SIZE].copy_from_slice(&self.task_id.to_be_bytes());
        buffer[HEADER_SIZE..len].copy_from_slice(&self.data[..self.wire_data_len()]);
        len
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }

    /// Decode one serialized frame
    ///
    /// `bytes` must hold exactly the number of bytes its length byte
    /// announces.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        let len = *bytes.first().ok_or(FrameError::Incomplete)? as usize;
        if !is_valid_length(len) {
            return Err(FrameError::InvalidLength);
        }
        if bytes.len() < len {
            return Err(FrameError::Incomplete);
        }
        if bytes.len() > len {
            return Err(FrameError::InvalidLength);
        }

        let mut frame = Self::new();
        frame.type_byte = bytes[1];
        frame.task_id = u16::from_be_bytes([bytes[2], bytes[3]]);

        let wire_data = &bytes[HEADER_SIZE..len];
        frame.data[..wire_data.len()].copy_from_slice(wire_data);

        let time_len = frame.payload_start();
        if wire_data.len() < time_len {
            return Err(FrameError::MissingTime);
        }
        frame.data_size = (wire_data.len() - time_len) as u8;

        Ok(frame)
    }
}

/// Whether `len` is an acceptable LENGTH byte
pub fn is_valid_length(len: usize) -> bool {
    (HEADER_SIZE..=MAX_FRAME_SIZE).contains(&len)
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.data_size == other.data_size
            && self.type_byte == other.type_byte
            && self.task_id == other.task_id
            && self.data[..self.wire_data_len()] == other.data[..other.wire_data_len()]
    }
}

impl Eq for Frame {}
