//! Routing fan-out
//!
//! Applies the routing matrix to every byte and every decoded message. The
//! matrix is read once per output per message, so an output receives a
//! message whole or not at all.

use tracing::trace;

use crate::matrix::RoutingMatrix;
use crate::midi::{ChannelMessage, MidiEvent};
use crate::ports::MidiSink;

/// Fans MIDI from a logical input out to the enabled outputs
pub struct RoutingEngine {
    /// Matrix columns, in output-index order
    outputs: Vec<Box<dyn MidiSink>>,
    /// Transports that see every event decoded from a byte-stream input
    mirrors: Vec<Box<dyn MidiSink>>,
}

impl RoutingEngine {
    pub fn new(outputs: Vec<Box<dyn MidiSink>>) -> Self {
        Self {
            outputs,
            mirrors: Vec::new(),
        }
    }

    pub fn with_mirrors(mut self, mirrors: Vec<Box<dyn MidiSink>>) -> Self {
        self.mirrors = mirrors;
        self
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Forward a single byte to every output enabled for `input`
    pub fn route_byte(&mut self, matrix: &RoutingMatrix, input: usize, byte: u8) {
        for (output, sink) in self.outputs.iter_mut().enumerate() {
            if matrix.get(input, output) {
                trace!(input, output, byte, "Route byte");
                sink.write_byte(byte);
            }
        }
    }

    /// Forward a channel message to every output enabled for `input`
    pub fn route_message(&mut self, matrix: &RoutingMatrix, input: usize, message: &ChannelMessage) {
        for (output, sink) in self.outputs.iter_mut().enumerate() {
            if matrix.get(input, output) {
                trace!(input, output, "Route {}", message);
                sink.send_message(message);
            }
        }
    }

    /// Route a decoded event
    pub fn route_event(&mut self, matrix: &RoutingMatrix, input: usize, event: MidiEvent) {
        match event {
            MidiEvent::Channel(message) => self.route_message(matrix, input, &message),
            MidiEvent::RealTime(byte) => self.route_byte(matrix, input, byte),
        }
    }

    /// Copy an event to every mirror transport, bypassing the matrix
    pub fn mirror_event(&mut self, event: MidiEvent) {
        for sink in &mut self.mirrors {
            match event {
                MidiEvent::Channel(message) => sink.send_message(&message),
                MidiEvent::RealTime(byte) => sink.send_real_time(byte),
            }
        }
    }
}
