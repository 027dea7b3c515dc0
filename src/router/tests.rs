//! Tests for Router module

use super::*;
use crate::input::{ButtonClassifier, EncoderDecoder};
use crate::midi::ChannelMessage;
use crate::ports::{MemoryPort, MidiSink};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Display that remembers every frame it was asked to draw
#[derive(Clone, Default)]
struct RecordingDisplay {
    frames: Arc<Mutex<Vec<(RoutingMatrix, SelectionCursor)>>>,
}

impl RecordingDisplay {
    fn count(&self) -> usize {
        self.frames.lock().len()
    }
}

impl MatrixDisplay for RecordingDisplay {
    fn render_matrix(&mut self, matrix: &RoutingMatrix, cursor: &SelectionCursor) {
        self.frames.lock().push((matrix.clone(), *cursor));
    }
}

/// Replays (clock, data, button) samples, holding the last one
struct ScriptedSampler {
    samples: VecDeque<(bool, bool, bool)>,
    current: (bool, bool, bool),
}

impl ScriptedSampler {
    fn new(samples: &[(bool, bool, bool)]) -> Self {
        Self {
            samples: samples.iter().copied().collect(),
            current: (true, true, false),
        }
    }
}

impl HardwareSampler for ScriptedSampler {
    fn sample_encoder_lines(&mut self) -> (bool, bool) {
        if let Some(next) = self.samples.pop_front() {
            self.current = next;
        }
        (self.current.0, self.current.1)
    }

    fn sample_button_line(&mut self) -> bool {
        self.current.2
    }
}

struct Rig {
    router: Router,
    /// Matrix rows 0..=2
    din_in: Vec<MemoryPort>,
    /// Matrix rows 3 and 4
    transport_in: Vec<MemoryPort>,
    outputs: Vec<MemoryPort>,
    mirror: MemoryPort,
    display: RecordingDisplay,
}

/// Five inputs (three byte streams, two message transports), three outputs, one mirror
fn make_rig() -> Rig {
    build_rig(InputSource::bytes)
}

/// Same layout with the three byte-stream rows forwarding raw bytes
fn make_passthrough_rig() -> Rig {
    build_rig(InputSource::passthrough)
}

fn build_rig(byte_source: fn(Box<dyn BytePort>) -> InputSource) -> Rig {
    let din_in: Vec<MemoryPort> = (0..3).map(|_| MemoryPort::new()).collect();
    let transport_in: Vec<MemoryPort> = (0..2).map(|_| MemoryPort::new()).collect();
    let outputs: Vec<MemoryPort> = (0..3).map(|_| MemoryPort::new()).collect();
    let mirror = MemoryPort::new();
    let display = RecordingDisplay::default();

    let mut inputs: Vec<InputSource> = din_in
        .iter()
        .map(|p| byte_source(Box::new(p.clone())))
        .collect();
    inputs.extend(
        transport_in
            .iter()
            .map(|p| InputSource::messages(Box::new(p.clone()))),
    );

    let sinks: Vec<Box<dyn MidiSink>> = outputs
        .iter()
        .map(|p| Box::new(p.clone()) as Box<dyn MidiSink>)
        .collect();
    let engine = RoutingEngine::new(sinks).with_mirrors(vec![Box::new(mirror.clone())]);

    Rig {
        router: Router::new(inputs, engine, Box::new(display.clone())),
        din_in,
        transport_in,
        outputs,
        mirror,
        display,
    }
}

#[test]
fn test_default_matrix_sized_from_ports() {
    let rig = make_rig();
    assert_eq!(rig.router.matrix(), &RoutingMatrix::default());
    assert_eq!(rig.router.cursor(), &SelectionCursor::default());
}

#[test]
fn test_din_bytes_follow_diagonal() {
    let mut rig = make_rig();
    rig.din_in[1].push_bytes(&[0x90, 0x40, 0x7F]);

    rig.router.poll_cycle(0);

    assert!(rig.outputs[0].written().is_empty());
    assert_eq!(rig.outputs[1].frames(), vec![vec![0x90, 0x40, 0x7F]]);
    assert!(rig.outputs[2].written().is_empty());
}

#[test]
fn test_message_split_across_cycles_is_delivered_whole() {
    let mut rig = make_rig();
    rig.din_in[0].push_bytes(&[0xB0, 0x07]);
    rig.router.poll_cycle(0);
    assert!(rig.outputs[0].written().is_empty());

    rig.din_in[0].push_bytes(&[0x64, 0x08, 0x20]);
    rig.router.poll_cycle(1);
    assert_eq!(
        rig.outputs[0].frames(),
        vec![vec![0xB0, 0x07, 0x64], vec![0xB0, 0x08, 0x20]]
    );
}

#[test]
fn test_program_change_has_no_third_byte() {
    let mut rig = make_rig();
    rig.din_in[2].push_bytes(&[0xC2, 0x05, 0x06]);

    rig.router.poll_cycle(0);

    // Running status: the second data byte is a second program change
    assert_eq!(rig.outputs[2].frames(), vec![vec![0xC2, 0x05], vec![0xC2, 0x06]]);
}

#[test]
fn test_real_time_passes_through_mid_message() {
    let mut rig = make_rig();
    rig.din_in[0].push_bytes(&[0x90, 0xF8, 0x40, 0x7F]);

    rig.router.poll_cycle(0);

    assert_eq!(rig.outputs[0].frames(), vec![vec![0xF8], vec![0x90, 0x40, 0x7F]]);
}

#[test]
fn test_fan_out_in_output_order() {
    let mut rig = make_rig();
    rig.router.apply_remote(RemoteCommand::SetRoute { input: 0, output: 2, enable: 1 });
    rig.din_in[0].push_bytes(&[0x80, 0x3C, 0x00]);

    rig.router.poll_cycle(0);

    assert_eq!(rig.outputs[0].frames(), vec![vec![0x80, 0x3C, 0x00]]);
    assert!(rig.outputs[1].written().is_empty());
    assert_eq!(rig.outputs[2].frames(), vec![vec![0x80, 0x3C, 0x00]]);
}

#[test]
fn test_disabled_input_reaches_nothing() {
    let mut rig = make_rig();
    rig.router.apply_remote(RemoteCommand::SetRoute { input: 1, output: 1, enable: 1 });
    rig.din_in[1].push_bytes(&[0x90, 0x40, 0x7F]);

    rig.router.poll_cycle(0);

    for output in &rig.outputs {
        assert!(output.written().is_empty());
    }
}

#[test]
fn test_transport_messages_route_without_mirroring() {
    let mut rig = make_rig();
    rig.transport_in[0].push_event(MidiEvent::Channel(ChannelMessage::new(0xE0, 0x00, 0x40)));
    rig.transport_in[1].push_event(MidiEvent::RealTime(0xFA));

    rig.router.poll_cycle(0);

    // Both transports default to output 0
    assert_eq!(rig.outputs[0].frames(), vec![vec![0xE0, 0x00, 0x40], vec![0xFA]]);
    assert!(rig.mirror.written().is_empty());
}

#[test]
fn test_decoded_din_events_are_mirrored() {
    let mut rig = make_rig();
    // Row 2 disabled entirely; the mirror still sees the traffic
    rig.router.apply_remote(RemoteCommand::SetRoute { input: 2, output: 2, enable: 1 });
    rig.din_in[2].push_bytes(&[0x92, 0x30, 0x40, 0xF8]);

    rig.router.poll_cycle(0);

    assert!(rig.outputs[2].written().is_empty());
    assert_eq!(rig.mirror.frames(), vec![vec![0x92, 0x30, 0x40], vec![0xF8]]);
}

#[test]
fn test_inputs_are_drained_round_robin() {
    let mut rig = make_rig();
    // Both rows merge onto output 0
    rig.router.apply_remote(RemoteCommand::SetRoute { input: 1, output: 0, enable: 1 });
    rig.router.apply_remote(RemoteCommand::SetRoute { input: 1, output: 1, enable: 1 });

    rig.din_in[0].push_bytes(&[0xF8, 0xF8, 0xF8]);
    rig.din_in[1].push_bytes(&[0xFA, 0xFB, 0xFC]);

    rig.router.poll_cycle(0);

    assert_eq!(
        rig.outputs[0].written(),
        vec![0xF8, 0xFA, 0xF8, 0xFB, 0xF8, 0xFC]
    );
}

#[test]
fn test_routing_does_not_render() {
    let mut rig = make_rig();
    rig.din_in[0].push_bytes(&[0x90, 0x40, 0x7F]);
    assert!(!rig.router.poll_cycle(0));
    assert_eq!(rig.display.count(), 0);
}

#[test]
fn test_remote_note_uses_virtual_input() {
    let mut rig = make_rig();
    rig.router.apply_remote(RemoteCommand::Note { input: 1, note: 64, velocity: 90 });

    assert!(rig.outputs[0].written().is_empty());
    assert_eq!(rig.outputs[1].frames(), vec![vec![0x90, 64, 90]]);
}

#[test]
fn test_panel_step_and_click_render_once() {
    let rig = make_rig();
    let sampler = ScriptedSampler::new(&[(true, true, true), (false, true, false)]);
    let selection = SelectionController::new(EncoderDecoder::new(1), ButtonClassifier::default());
    let mut router = rig.router.with_panel(Box::new(sampler), selection);

    // Press
    assert!(!router.poll_cycle(1000));
    // One clockwise edge and the release land in the same cycle
    assert!(router.poll_cycle(1100));
    assert_eq!(rig.display.count(), 1);

    assert_eq!(router.cursor().selected_output, 1);
    assert!(router.matrix().get(0, 1));

    let frames = rig.display.frames.lock();
    assert_eq!(frames[0].1.selected_output, 1);
    assert!(frames[0].0.get(0, 1));
    drop(frames);

    // New routing applies to traffic in the next cycle
    rig.din_in[0].push_bytes(&[0x90, 0x40, 0x7F]);
    router.poll_cycle(1200);
    assert_eq!(rig.outputs[1].frames(), vec![vec![0x90, 0x40, 0x7F]]);
}

#[test]
fn test_reconfigure_panel_keeps_cursor() {
    let rig = make_rig();
    let sampler = ScriptedSampler::new(&[(false, true, false), (true, false, false)]);
    let mut router = rig
        .router
        .with_panel(Box::new(sampler), SelectionController::new(EncoderDecoder::new(1), ButtonClassifier::default()));

    assert!(router.poll_cycle(0));
    assert_eq!(router.cursor().selected_output, 1);

    router.reconfigure_panel(2, 20, 600);
    // A single edge is no longer enough
    assert!(!router.poll_cycle(10));
    assert_eq!(router.cursor().selected_output, 1);
}

#[test]
fn test_remote_listener_changes_render() {
    let rig = make_rig();
    let listener = RemoteListener::bind("127.0.0.1:0", None).unwrap();
    let addr = listener.local_addr().unwrap();
    let mut router = rig.router.with_remote(listener);

    let packet = rosc::OscPacket::Message(rosc::OscMessage {
        addr: crate::remote::ROUTE_ADDRESS.to_string(),
        args: vec![rosc::OscType::Int(4), rosc::OscType::Int(2), rosc::OscType::Int(1)],
    });
    let bytes = rosc::encoder::encode(&packet).unwrap();
    std::net::UdpSocket::bind("127.0.0.1:0")
        .unwrap()
        .send_to(&bytes, addr)
        .unwrap();

    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
    let mut rendered = false;
    while !rendered && std::time::Instant::now() < deadline {
        rendered = router.poll_cycle(0);
        std::thread::sleep(std::time::Duration::from_millis(5));
    }

    assert!(rendered);
    assert!(router.matrix().get(4, 2));
    assert_eq!(rig.display.count(), 1);
}

#[test]
fn test_route_toggled_mid_message_keeps_message_whole() {
    let mut rig = make_rig();
    rig.din_in[0].push_bytes(&[0x90, 0x40]);
    rig.router.poll_cycle(0);

    let off = RemoteCommand::SetRoute { input: 0, output: 0, enable: 1 };
    assert!(rig.router.apply_remote(off));
    rig.din_in[0].push_bytes(&[0x7F]);
    rig.router.poll_cycle(1);
    assert!(rig.outputs[0].written().is_empty());

    let on = RemoteCommand::SetRoute { input: 0, output: 0, enable: 1 };
    assert!(rig.router.apply_remote(on));
    rig.din_in[0].push_bytes(&[0x41, 0x50]);
    rig.router.poll_cycle(2);
    assert_eq!(rig.outputs[0].frames(), vec![vec![0x90, 0x41, 0x50]]);
}

#[test]
fn test_passthrough_forwards_system_common_and_sysex() {
    let mut rig = make_passthrough_rig();
    let raw = [0xF2, 0x10, 0x20, 0xF0, 0x7E, 0x01, 0xF7];
    rig.din_in[0].push_bytes(&raw);

    rig.router.poll_cycle(0);

    let expected: Vec<Vec<u8>> = raw.iter().map(|&b| vec![b]).collect();
    assert_eq!(rig.outputs[0].frames(), expected);
    assert!(rig.outputs[1].written().is_empty());
    assert!(rig.mirror.written().is_empty());
}

#[test]
fn test_passthrough_mirrors_decoded_messages() {
    let mut rig = make_passthrough_rig();
    rig.din_in[2].push_bytes(&[0x90, 0x40, 0x7F, 0xF8]);

    rig.router.poll_cycle(0);

    assert_eq!(
        rig.outputs[2].frames(),
        vec![vec![0x90], vec![0x40], vec![0x7F], vec![0xF8]]
    );
    assert_eq!(rig.mirror.frames(), vec![vec![0x90, 0x40, 0x7F], vec![0xF8]]);
}

#[test]
fn test_passthrough_follows_matrix() {
    let mut rig = make_passthrough_rig();
    rig.router.apply_remote(RemoteCommand::SetRoute { input: 1, output: 1, enable: 1 });
    rig.router.apply_remote(RemoteCommand::SetRoute { input: 1, output: 2, enable: 1 });
    rig.din_in[1].push_bytes(&[0xF0, 0x01, 0xF7]);

    rig.router.poll_cycle(0);

    assert!(rig.outputs[1].written().is_empty());
    assert_eq!(rig.outputs[2].written(), vec![0xF0, 0x01, 0xF7]);
}
