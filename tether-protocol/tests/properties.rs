//! Property tests for the frame codec and the stream framer

use proptest::prelude::*;
use tether_hal::BufferStream;
use tether_protocol::{Frame, StreamFramer, MAX_DATA_SIZE, MAX_MESSAGE_TYPE};

/// Any frame the accessors can build
fn any_frame() -> impl Strategy<Value = Frame> {
    (
        0..=MAX_MESSAGE_TYPE,
        any::<u16>(),
        proptest::option::of(any::<u32>()),
        proptest::collection::vec(any::<u8>(), 0..=MAX_DATA_SIZE),
    )
        .prop_map(|(message_type, task_id, time, payload)| {
            let mut frame = match time {
                Some(at) => Frame::scheduled(message_type, task_id, at),
                None => Frame::immediate(message_type, task_id),
            };
            let len = payload.len().min(frame.max_data_size() as usize);
            frame.set_payload(&payload[..len]).unwrap();
            frame
        })
}

proptest! {
    #[test]
    fn encode_decode_roundtrip(frame in any_frame()) {
        let encoded = frame.encode_to_vec().unwrap();
        prop_assert_eq!(encoded.len(), frame.wire_len());

        let decoded = Frame::decode(&encoded).unwrap();
        prop_assert_eq!(decoded.data_size(), frame.data_size());
        prop_assert_eq!(decoded.message_type(), frame.message_type());
        prop_assert_eq!(decoded.is_immediate(), frame.is_immediate());
        prop_assert_eq!(decoded.task_id(), frame.task_id());
        prop_assert_eq!(decoded.scheduled_time(), frame.scheduled_time());
        prop_assert_eq!(decoded.payload(), frame.payload());
    }

    #[test]
    fn immediate_then_scheduled_keeps_payload(
        payload in proptest::collection::vec(any::<u8>(), 0..=12),
        first in any::<u32>(),
        second in any::<u32>(),
    ) {
        let mut frame = Frame::scheduled(10, 1, first);
        frame.set_payload(&payload).unwrap();

        frame.set_immediate();
        prop_assert_eq!(frame.payload(), payload.as_slice());

        frame.set_scheduled_time(second);
        prop_assert_eq!(frame.payload(), payload.as_slice());
        prop_assert_eq!(frame.scheduled_time(), second);
    }

    #[test]
    fn framer_recovers_after_noise(
        noise in proptest::collection::vec(any::<u8>().prop_filter("no markers", |b| *b != b'>'), 0..32),
        frame in any_frame(),
    ) {
        let mut stream = BufferStream::<128, 128>::new();
        stream.feed(&noise);

        let mut writer_side = BufferStream::<8, 64>::new();
        StreamFramer::new(&mut writer_side).write(&frame).unwrap();
        writer_side.transfer_to(&mut stream);

        let mut framer = StreamFramer::new(stream);
        let mut decoded = None;
        for _ in 0..4 {
            if let Some(f) = framer.read() {
                decoded = Some(f);
                break;
            }
        }
        prop_assert_eq!(decoded, Some(frame));
    }
}
