//! Port abstractions between the router core and the MIDI transports
//!
//! The core only needs non-blocking reads and fire-and-forget writes. Byte
//! streams (DIN serial lines) and message-framed transports (BLE, USB) both
//! write through the same [`MidiSink`] capability.

pub mod memory;
pub mod midi_io;

pub use memory::MemoryPort;
pub use midi_io::{MidirByteInput, MidirMessageInput, MidirOutput, PortError};

use crate::midi::{ChannelMessage, MidiEvent};

/// Raw byte-stream input
pub trait BytePort {
    /// Next byte if one is available, never blocks
    fn try_read_byte(&mut self) -> Option<u8>;
}

/// Input of a transport that delivers already-framed messages
pub trait MessagePort {
    /// Next event if one is available, never blocks
    fn try_read_message(&mut self) -> Option<MidiEvent>;
}

/// Anything the router can write MIDI to
pub trait MidiSink {
    fn write_byte(&mut self, byte: u8);

    /// Write a whole channel message; data2 is only written when meaningful
    fn send_message(&mut self, message: &ChannelMessage) {
        let bytes = message.to_bytes();
        for &b in &bytes[..message.wire_len()] {
            self.write_byte(b);
        }
    }

    fn send_real_time(&mut self, byte: u8) {
        self.write_byte(byte);
    }
}
