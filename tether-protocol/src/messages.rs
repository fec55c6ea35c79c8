//! Reserved message types shared by every tether application
//!
//! Type IDs 0-3 are control messages handled by the engine itself:
//! - NOOP: ignored, useful as line filler
//! - ECHO: written straight back, used as a liveness probe
//! - RESET: drops every queued message
//! - FLUSH: drains queued responses, then reports queue diagnostics
//!
//! Application message types start at [`FIRST_APPLICATION_TYPE`].

use crate::frame::Frame;

// Control message type IDs
pub const MSG_NOOP: u8 = 0x00;
pub const MSG_ECHO: u8 = 0x01;
pub const MSG_RESET: u8 = 0x02;
pub const MSG_FLUSH: u8 = 0x03;

/// First message type free for application use
pub const FIRST_APPLICATION_TYPE: u8 = 0x04;

/// Reasons a frame fails validation against its expected shape
///
/// Each variant has a stable numeric code (see [`MessageStatus::code`])
/// so status can be reported inside application payloads; code 0 is
/// reserved for "valid".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageStatus {
    /// Message type does not match
    MessageType,
    /// Payload size is wrong
    DataSize,
    /// Frame is immediate but must be scheduled
    Immediate,
    /// Frame is scheduled but must be immediate
    NotImmediate,
    /// Minimum free slot count exceeds the current free count
    FreeSlots,
    /// Input queue size exceeds its recorded maximum
    InputQueueSize,
    /// Output queue size exceeds its recorded maximum
    OutputQueueSize,
}

impl MessageStatus {
    /// Numeric code of this status
    pub fn code(self) -> u8 {
        match self {
            MessageStatus::MessageType => 1,
            MessageStatus::DataSize => 2,
            MessageStatus::Immediate => 3,
            MessageStatus::NotImmediate => 4,
            MessageStatus::FreeSlots => 5,
            MessageStatus::InputQueueSize => 6,
            MessageStatus::OutputQueueSize => 7,
        }
    }

    /// Status for a numeric code, `None` for 0 and unknown codes
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(MessageStatus::MessageType),
            2 => Some(MessageStatus::DataSize),
            3 => Some(MessageStatus::Immediate),
            4 => Some(MessageStatus::NotImmediate),
            5 => Some(MessageStatus::FreeSlots),
            6 => Some(MessageStatus::InputQueueSize),
            7 => Some(MessageStatus::OutputQueueSize),
            _ => None,
        }
    }
}

/// Check the parts of a frame every message validator checks
///
/// Application validators call this first, then check their own fields
/// through the frame accessors.
pub fn check_shape(
    frame: &Frame,
    message_type: u8,
    data_size: u8,
) -> Result<(), MessageStatus> {
    if frame.message_type() != message_type {
        return Err(MessageStatus::MessageType);
    }
    if frame.data_size() != data_size {
        return Err(MessageStatus::DataSize);
    }
    Ok(())
}

/// Control messages intercepted by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlMessage {
    Noop,
    Echo,
    Reset,
    Flush,
}

impl ControlMessage {
    /// Classify a message type, `None` for application types
    pub fn from_type(message_type: u8) -> Option<Self> {
        match message_type {
            MSG_NOOP => Some(ControlMessage::Noop),
            MSG_ECHO => Some(ControlMessage::Echo),
            MSG_RESET => Some(ControlMessage::Reset),
            MSG_FLUSH => Some(ControlMessage::Flush),
            _ => None,
        }
    }

    /// Classify a frame, `None` for application traffic
    pub fn from_frame(frame: &Frame) -> Option<Self> {
        Self::from_type(frame.message_type())
    }

    /// Reserved type ID of this message
    pub fn message_type(self) -> u8 {
        match self {
            ControlMessage::Noop => MSG_NOOP,
            ControlMessage::Echo => MSG_ECHO,
            ControlMessage::Reset => MSG_RESET,
            ControlMessage::Flush => MSG_FLUSH,
        }
    }

    /// Build the request frame: immediate, no payload
    pub fn request(self, task_id: u16) -> Frame {
        Frame::immediate(self.message_type(), task_id)
    }

    /// Check that `frame` is a well-formed request of this kind
    pub fn validate(self, frame: &Frame) -> Result<(), MessageStatus> {
        check_shape(frame, self.message_type(), 0)?;
        if !frame.is_immediate() {
            return Err(MessageStatus::NotImmediate);
        }
        Ok(())
    }
}

/// Queue diagnostics sent after the responses drained by a FLUSH
///
/// Travels as a scheduled FLUSH frame: the time field holds the device
/// clock when the flush ran, the six payload bytes hold the counters
/// in field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlushResponse {
    /// Lowest free slot count ever observed
    pub min_free_slots: u8,
    /// Free slots right now
    pub free_slots: u8,
    /// Largest input queue size ever observed
    pub input_queue_max_size: u8,
    /// Input queue size right now
    pub input_queue_size: u8,
    /// Largest output queue size ever observed
    pub output_queue_max_size: u8,
    /// Output queue size right now
    pub output_queue_size: u8,
}

impl FlushResponse {
    const OFFSET_MIN_FREE_SLOTS: usize = 0;
    const OFFSET_FREE_SLOTS: usize = 1;
    const OFFSET_INPUT_QUEUE_MAX_SIZE: usize = 2;
    const OFFSET_INPUT_QUEUE_SIZE: usize = 3;
    const OFFSET_OUTPUT_QUEUE_MAX_SIZE: usize = 4;
    const OFFSET_OUTPUT_QUEUE_SIZE: usize = 5;

    /// Payload size of a flush response
    pub const DATA_SIZE: u8 = 6;

    /// Encode as the reply to the FLUSH request tagged `task_id`
    pub fn to_frame(&self, task_id: u16, now_millis: u32) -> Frame {
        let mut frame = Frame::scheduled(MSG_FLUSH, task_id, now_millis);
        frame.set_data_size(Self::DATA_SIZE);
        frame.set_u8(Self::OFFSET_MIN_FREE_SLOTS, self.min_free_slots);
        frame.set_u8(Self::OFFSET_FREE_SLOTS, self.free_slots);
        frame.set_u8(Self::OFFSET_INPUT_QUEUE_MAX_SIZE, self.input_queue_max_size);
        frame.set_u8(Self::OFFSET_INPUT_QUEUE_SIZE, self.input_queue_size);
        frame.set_u8(Self::OFFSET_OUTPUT_QUEUE_MAX_SIZE, self.output_queue_max_size);
        frame.set_u8(Self::OFFSET_OUTPUT_QUEUE_SIZE, self.output_queue_size);
        frame
    }

    /// Parse and validate a flush response frame
    pub fn from_frame(frame: &Frame) -> Result<Self, MessageStatus> {
        check_shape(frame, MSG_FLUSH, Self::DATA_SIZE)?;
        if frame.is_immediate() {
            return Err(MessageStatus::Immediate);
        }

        let response = Self {
            min_free_slots: frame.get_u8(Self::OFFSET_MIN_FREE_SLOTS),
            free_slots: frame.get_u8(Self::OFFSET_FREE_SLOTS),
            input_queue_max_size: frame.get_u8(Self::OFFSET_INPUT_QUEUE_MAX_SIZE),
            input_queue_size: frame.get_u8(Self::OFFSET_INPUT_QUEUE_SIZE),
            output_queue_max_size: frame.get_u8(Self::OFFSET_OUTPUT_QUEUE_MAX_SIZE),
            output_queue_size: frame.get_u8(Self::OFFSET_OUTPUT_QUEUE_SIZE),
        };
        response.validate()?;
        Ok(response)
    }

    /// Check that the counters are mutually consistent
    pub fn validate(&self) -> Result<(), MessageStatus> {
        if self.min_free_slots > self.free_slots {
            return Err(MessageStatus::FreeSlots);
        }
        if self.input_queue_size > self.input_queue_max_size {
            return Err(MessageStatus::InputQueueSize);
        }
        if self.output_queue_size > self.output_queue_max_size {
            return Err(MessageStatus::OutputQueueSize);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FlushResponse {
        FlushResponse {
            min_free_slots: 3,
            free_slots: 5,
            input_queue_max_size: 7,
            input_queue_size: 6,
            output_queue_max_size: 4,
            output_queue_size: 2,
        }
    }

    #[test]
    fn test_control_classification() {
        assert_eq!(ControlMessage::from_type(MSG_NOOP), Some(ControlMessage::Noop));
        assert_eq!(ControlMessage::from_type(MSG_ECHO), Some(ControlMessage::Echo));
        assert_eq!(ControlMessage::from_type(MSG_RESET), Some(ControlMessage::Reset));
        assert_eq!(ControlMessage::from_type(MSG_FLUSH), Some(ControlMessage::Flush));
        assert_eq!(ControlMessage::from_type(FIRST_APPLICATION_TYPE), None);
        assert_eq!(ControlMessage::from_type(0x7F), None);
    }

    #[test]
    fn test_control_request_shape() {
        let frame = ControlMessage::Flush.request(99);
        assert_eq!(frame.message_type(), MSG_FLUSH);
        assert_eq!(frame.task_id(), 99);
        assert!(frame.is_immediate());
        assert_eq!(frame.data_size(), 0);
        assert_eq!(ControlMessage::Flush.validate(&frame), Ok(()));
        assert_eq!(ControlMessage::from_frame(&frame), Some(ControlMessage::Flush));
    }

    #[test]
    fn test_control_validate_errors() {
        let reset = ControlMessage::Reset.request(1);
        assert_eq!(
            ControlMessage::Echo.validate(&reset),
            Err(MessageStatus::MessageType)
        );

        let mut sized = ControlMessage::Noop.request(0);
        sized.set_data_size(1);
        assert_eq!(
            ControlMessage::Noop.validate(&sized),
            Err(MessageStatus::DataSize)
        );

        let scheduled = Frame::scheduled(MSG_ECHO, 0, 10);
        assert_eq!(
            ControlMessage::Echo.validate(&scheduled),
            Err(MessageStatus::NotImmediate)
        );
    }

    #[test]
    fn test_flush_response_layout() {
        let frame = sample().to_frame(99, 123);
        assert_eq!(frame.message_type(), MSG_FLUSH);
        assert_eq!(frame.task_id(), 99);
        assert!(!frame.is_immediate());
        assert_eq!(frame.scheduled_time(), 123);
        assert_eq!(frame.payload(), &[3, 5, 7, 6, 4, 2]);
    }

    #[test]
    fn test_flush_response_roundtrip() {
        let frame = sample().to_frame(1, 0);
        assert_eq!(FlushResponse::from_frame(&frame), Ok(sample()));
    }

    #[test]
    fn test_flush_response_rejects_immediate() {
        let mut frame = sample().to_frame(1, 0);
        frame.set_immediate();
        assert_eq!(
            FlushResponse::from_frame(&frame),
            Err(MessageStatus::Immediate)
        );
    }

    #[test]
    fn test_flush_response_consistency() {
        let bad_free = FlushResponse {
            min_free_slots: 6,
            ..sample()
        };
        assert_eq!(bad_free.validate(), Err(MessageStatus::FreeSlots));

        let bad_input = FlushResponse {
            input_queue_size: 8,
            ..sample()
        };
        assert_eq!(bad_input.validate(), Err(MessageStatus::InputQueueSize));

        let bad_output = FlushResponse {
            output_queue_size: 5,
            ..sample()
        };
        assert_eq!(
            FlushResponse::from_frame(&bad_output.to_frame(0, 0)),
            Err(MessageStatus::OutputQueueSize)
        );
    }

    #[test]
    fn test_status_codes_roundtrip() {
        for code in 1..=7 {
            let status = MessageStatus::from_code(code).unwrap();
            assert_eq!(status.code(), code);
        }
        assert_eq!(MessageStatus::from_code(0), None);
        assert_eq!(MessageStatus::from_code(8), None);
    }
}
