//! Server loop tests driven through an in-memory stream and a manual clock

use heapless::Vec;
use tether_core::{Handler, Outbox, Server, SLOT_COUNT};
use tether_hal::{BufferStream, ManualClock};
use tether_protocol::{
    ControlMessage, FlushResponse, Frame, StreamFramer, FIRST_APPLICATION_TYPE, MAX_WIRE_SIZE,
    MSG_FLUSH,
};

const MSG_PING: u8 = FIRST_APPLICATION_TYPE;
const MSG_PONG: u8 = FIRST_APPLICATION_TYPE + 1;
const MSG_REPORT: u8 = FIRST_APPLICATION_TYPE + 2;

type TestStream = BufferStream<512, 1024>;
type TestServer = Server<TestStream, ManualClock, Recorder>;

/// Records every hook call; answers PING with PONG
#[derive(Default)]
struct Recorder {
    messages: Vec<Frame, 64>,
    resets: Vec<u16, 4>,
    ticks: u32,
    /// Number of upcoming ticks that each queue one REPORT
    pending_reports: u8,
}

impl Handler for Recorder {
    fn on_reset(&mut self, _outbox: &mut Outbox<'_>, request: &Frame) {
        self.resets.push(request.task_id()).unwrap();
    }

    fn on_message(&mut self, outbox: &mut Outbox<'_>, frame: &Frame) {
        self.messages.push(*frame).unwrap();
        if frame.message_type() == MSG_PING {
            let mut reply = Frame::immediate(MSG_PONG, frame.task_id());
            reply.set_payload(frame.payload()).unwrap();
            outbox.add_response(&reply);
        }
    }

    fn on_tick(&mut self, outbox: &mut Outbox<'_>) {
        self.ticks += 1;
        if self.pending_reports > 0 {
            self.pending_reports -= 1;
            let report = Frame::scheduled(MSG_REPORT, 0, outbox.now_millis());
            outbox.add_response(&report);
        }
    }
}

fn server() -> TestServer {
    Server::new(TestStream::new(), ManualClock::new(), Recorder::default())
}

fn wire(frame: &Frame) -> Vec<u8, MAX_WIRE_SIZE> {
    let mut stream = BufferStream::<8, MAX_WIRE_SIZE>::new();
    StreamFramer::new(&mut stream).write(frame).unwrap();
    Vec::from_slice(stream.written()).unwrap()
}

fn send(server: &mut TestServer, frame: &Frame) {
    let bytes = wire(frame);
    assert_eq!(server.stream_mut().feed(&bytes), bytes.len());
}

/// Decode everything the server has written so far
fn take_sent(server: &mut TestServer) -> Vec<Frame, 64> {
    let mut host = BufferStream::<1024, 8>::new();
    server.stream_mut().transfer_to(&mut host);
    let mut framer = StreamFramer::new(host);
    let mut frames = Vec::new();
    while let Some(frame) = framer.read() {
        frames.push(frame).unwrap();
    }
    frames
}

fn ping(task_id: u16) -> Frame {
    let mut frame = Frame::immediate(MSG_PING, task_id);
    frame.set_payload(&[task_id as u8]).unwrap();
    frame
}

fn poll_n(server: &mut TestServer, n: usize) {
    for _ in 0..n {
        server.poll();
    }
}

#[test]
fn echo_is_written_back_immediately() {
    let mut server = server();
    let mut request = ControlMessage::Echo.request(7);
    request.set_payload(&[1, 2, 3]).unwrap();
    send(&mut server, &request);

    server.poll();

    assert_eq!(take_sent(&mut server).as_slice(), &[request]);
    assert_eq!(server.diagnostics().inbound_size, 0);
    assert_eq!(server.diagnostics().outbound_size, 0);
    assert!(server.handler().messages.is_empty());
}

#[test]
fn noop_is_discarded() {
    let mut server = server();
    send(&mut server, &ControlMessage::Noop.request(1));

    server.poll();

    assert!(take_sent(&mut server).is_empty());
    assert_eq!(server.diagnostics().inbound_size, 0);
    assert!(server.handler().messages.is_empty());
    assert_eq!(server.handler().ticks, 1);
}

#[test]
fn tick_runs_every_iteration() {
    let mut server = server();
    poll_n(&mut server, 5);
    assert_eq!(server.handler().ticks, 5);
}

#[test]
fn application_frame_is_queued_then_dispatched() {
    let mut server = server();
    send(&mut server, &ping(3));

    server.poll();
    assert!(server.handler().messages.is_empty());
    assert_eq!(server.diagnostics().inbound_size, 1);

    server.poll();
    assert_eq!(server.handler().messages.as_slice(), &[ping(3)]);
    assert_eq!(server.diagnostics().inbound_size, 0);
    assert_eq!(server.diagnostics().outbound_size, 1);
    assert_eq!(server.handler().ticks, 2);
}

#[test]
fn scheduled_frame_waits_for_its_time() {
    let mut server = server();
    send(&mut server, &Frame::scheduled(MSG_REPORT, 1, 100));

    poll_n(&mut server, 3);
    assert!(server.handler().messages.is_empty());
    assert_eq!(server.diagnostics().inbound_size, 1);

    server.clock().set_millis(99);
    server.poll();
    assert!(server.handler().messages.is_empty());

    server.clock().set_millis(100);
    server.poll();
    assert_eq!(server.handler().messages.len(), 1);
}

#[test]
fn stream_traffic_starves_inbound_dispatch() {
    let mut server = server();
    for task in 1..=3 {
        send(&mut server, &ping(task));
    }

    // Every poll finds a frame to read, so nothing is dispatched yet
    poll_n(&mut server, 3);
    assert!(server.handler().messages.is_empty());
    assert_eq!(server.diagnostics().inbound_size, 3);

    poll_n(&mut server, 3);
    let tasks: Vec<u16, 3> = server
        .handler()
        .messages
        .iter()
        .map(|f| f.task_id())
        .collect();
    assert_eq!(tasks.as_slice(), &[1, 2, 3]);
}

#[test]
fn flush_drains_responses_then_reports() {
    let mut server = server();
    for task in 1..=3 {
        send(&mut server, &ping(task));
    }
    poll_n(&mut server, 6);
    assert_eq!(server.diagnostics().outbound_size, 3);

    let ticks_before = server.handler().ticks;
    server.clock().set_millis(500);
    send(&mut server, &ControlMessage::Flush.request(42));
    server.poll();

    let sent = take_sent(&mut server);
    assert_eq!(sent.len(), 4);
    for (i, frame) in sent[..3].iter().enumerate() {
        assert_eq!(frame.message_type(), MSG_PONG);
        assert_eq!(frame.task_id(), i as u16 + 1);
    }

    let report = sent[3];
    assert_eq!(report.message_type(), MSG_FLUSH);
    assert_eq!(report.task_id(), 42);
    assert_eq!(report.scheduled_time(), 500);

    let stats = FlushResponse::from_frame(&report).unwrap();
    assert!(stats.min_free_slots <= stats.free_slots);
    assert!(stats.input_queue_size <= stats.input_queue_max_size);
    assert!(stats.output_queue_size <= stats.output_queue_max_size);
    assert_eq!(stats.free_slots, SLOT_COUNT as u8);
    assert_eq!(stats.output_queue_size, 0);
    assert_eq!(stats.output_queue_max_size, 3);
    assert_eq!(stats.input_queue_max_size, 3);

    // One tick per drained frame plus the regular end-of-iteration tick
    assert_eq!(server.handler().ticks, ticks_before + 4);
}

#[test]
fn flush_on_empty_queue_sends_only_the_report() {
    let mut server = server();
    send(&mut server, &ControlMessage::Flush.request(9));
    server.poll();

    let sent = take_sent(&mut server);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].task_id(), 9);
    assert!(FlushResponse::from_frame(&sent[0]).is_ok());
}

#[test]
fn flush_interleaves_ticks_with_writes() {
    let mut server = server();
    send(&mut server, &ping(1));
    poll_n(&mut server, 2);

    server.handler_mut().pending_reports = 2;
    send(&mut server, &ControlMessage::Flush.request(5));
    server.poll();

    let types: Vec<u8, 8> = take_sent(&mut server)
        .iter()
        .map(|f| f.message_type())
        .collect();
    assert_eq!(types.as_slice(), &[MSG_PONG, MSG_REPORT, MSG_REPORT, MSG_FLUSH]);
}

#[test]
fn flush_keeps_future_responses() {
    let mut server = server();
    server.add_response(&Frame::scheduled(MSG_REPORT, 1, 1000));
    server.add_response(&Frame::immediate(MSG_REPORT, 2));

    send(&mut server, &ControlMessage::Flush.request(3));
    server.poll();

    let sent = take_sent(&mut server);
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].task_id(), 2);
    let stats = FlushResponse::from_frame(&sent[1]).unwrap();
    assert_eq!(stats.output_queue_size, 1);

    server.clock().set_millis(1000);
    send(&mut server, &ControlMessage::Flush.request(4));
    server.poll();
    let sent = take_sent(&mut server);
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].task_id(), 1);
}

#[test]
fn reset_clears_both_queues_and_notifies() {
    let mut server = server();
    send(&mut server, &Frame::scheduled(MSG_REPORT, 1, 10_000));
    send(&mut server, &Frame::scheduled(MSG_REPORT, 2, 20_000));
    poll_n(&mut server, 2);
    server.add_response(&Frame::immediate(MSG_PONG, 3));
    assert_eq!(server.diagnostics().inbound_size, 2);
    assert_eq!(server.diagnostics().outbound_size, 1);

    send(&mut server, &ControlMessage::Reset.request(77));
    server.poll();

    let diag = server.diagnostics();
    assert_eq!(diag.inbound_size, 0);
    assert_eq!(diag.outbound_size, 0);
    assert_eq!(diag.free_slots, SLOT_COUNT as u8);
    assert_eq!(server.handler().resets.as_slice(), &[77]);
    assert!(take_sent(&mut server).is_empty());
}

#[test]
fn inbound_overflow_drops_and_counts() {
    let mut server = server();
    for task in 0..=SLOT_COUNT as u16 {
        send(&mut server, &Frame::scheduled(MSG_REPORT, task, 60_000));
    }
    poll_n(&mut server, SLOT_COUNT + 1);

    let diag = server.diagnostics();
    assert_eq!(diag.inbound_size, SLOT_COUNT as u8);
    assert_eq!(diag.free_slots, 0);
    assert_eq!(diag.min_free_slots, 0);
    assert_eq!(diag.dropped_frames, 1);
}

#[test]
fn response_overflow_drops_and_counts() {
    let mut server = server();
    for task in 0..SLOT_COUNT as u16 + 2 {
        server.add_response(&Frame::immediate(MSG_PONG, task));
    }

    let diag = server.diagnostics();
    assert_eq!(diag.outbound_size, SLOT_COUNT as u8);
    assert_eq!(diag.dropped_frames, 2);
}

#[test]
fn noise_is_skipped_and_counted() {
    let mut server = server();
    server.stream_mut().feed(b"\x00\x13>\xFFjunk");
    send(&mut server, &ControlMessage::Echo.request(11));

    poll_n(&mut server, 4);

    let sent = take_sent(&mut server);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].task_id(), 11);
    assert_eq!(server.diagnostics().rejected_frames, 1);
}

#[test]
fn handler_sees_clock() {
    struct Stamp(u32);

    impl Handler for Stamp {
        fn on_tick(&mut self, outbox: &mut Outbox<'_>) {
            self.0 = outbox.now_millis();
        }
    }

    let mut server: Server<_, _, _> =
        Server::new(TestStream::new(), ManualClock::starting_at(1234), Stamp(0));
    server.poll();
    assert_eq!(server.handler().0, 1234);
    assert_eq!(server.now_micros(), 1_234_000);
}

#[test]
fn flush_sends_at_most_one_pool_of_frames() {
    let mut server = server();
    server.add_response(&Frame::immediate(MSG_PONG, 1));

    // Every tick during the drain queues another due report
    server.handler_mut().pending_reports = u8::MAX;
    send(&mut server, &ControlMessage::Flush.request(8));
    server.poll();

    let sent = take_sent(&mut server);
    assert_eq!(sent.len(), SLOT_COUNT + 1);
    assert_eq!(sent[0].message_type(), MSG_PONG);
    assert!(sent[1..SLOT_COUNT]
        .iter()
        .all(|f| f.message_type() == MSG_REPORT));

    let stats = FlushResponse::from_frame(&sent[SLOT_COUNT]).unwrap();
    assert_eq!(stats.output_queue_size, 1);
}

#[cfg(feature = "serde")]
#[test]
fn diagnostics_serde_roundtrip() {
    use tether_core::Diagnostics;

    let mut server = server();
    server.add_response(&Frame::immediate(MSG_PONG, 1));
    server.stream_mut().feed(b">\xFF");
    server.poll();

    let diag = server.diagnostics();
    assert_eq!(diag.rejected_frames, 1);

    let mut buf = [0u8; 32];
    let bytes = postcard::to_slice(&diag, &mut buf).unwrap();
    let decoded: Diagnostics = postcard::from_bytes(bytes).unwrap();
    assert_eq!(decoded, diag);
}
