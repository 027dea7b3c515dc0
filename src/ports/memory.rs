//! In-memory port used for loopback wiring and tests
//!
//! Clones share the same buffers, so one handle can be given to the router
//! while another inspects what was written.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use super::{BytePort, MessagePort, MidiSink};
use crate::midi::{ChannelMessage, MidiEvent};

#[derive(Debug, Default)]
struct Buffers {
    incoming_bytes: VecDeque<u8>,
    incoming_events: VecDeque<MidiEvent>,
    /// One entry per sink call, so message atomicity stays visible
    frames: Vec<Vec<u8>>,
}

/// Shared in-memory MIDI port
#[derive(Debug, Clone, Default)]
pub struct MemoryPort {
    buffers: Arc<Mutex<Buffers>>,
}

impl MemoryPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes to be read through [`BytePort`]
    pub fn push_bytes(&self, bytes: &[u8]) {
        self.buffers.lock().incoming_bytes.extend(bytes);
    }

    /// Queue an event to be read through [`MessagePort`]
    pub fn push_event(&self, event: MidiEvent) {
        self.buffers.lock().incoming_events.push_back(event);
    }

    /// Everything written so far, flattened
    pub fn written(&self) -> Vec<u8> {
        self.buffers.lock().frames.concat()
    }

    /// Everything written so far, one entry per write call
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.buffers.lock().frames.clone()
    }

    pub fn clear_written(&self) {
        self.buffers.lock().frames.clear();
    }
}

impl BytePort for MemoryPort {
    fn try_read_byte(&mut self) -> Option<u8> {
        self.buffers.lock().incoming_bytes.pop_front()
    }
}

impl MessagePort for MemoryPort {
    fn try_read_message(&mut self) -> Option<MidiEvent> {
        self.buffers.lock().incoming_events.pop_front()
    }
}

impl MidiSink for MemoryPort {
    fn write_byte(&mut self, byte: u8) {
        self.buffers.lock().frames.push(vec![byte]);
    }

    fn send_message(&mut self, message: &ChannelMessage) {
        let bytes = message.to_bytes();
        self.buffers
            .lock()
            .frames
            .push(bytes[..message.wire_len()].to_vec());
    }
}
