//! Running-status MIDI byte stream decoder
//!
//! One decoder per byte-stream input. Bytes may be split across calls in any
//! way; the decoder keeps just enough state to finish the message in flight.

use tracing::trace;

use super::{is_real_time, ChannelMessage, MessageKind, MidiEvent, SYSTEM_COMMON_MIN};

/// Reconstructs channel messages from a raw MIDI byte stream.
///
/// Real-time bytes are returned immediately without touching the decoder
/// state, so they may appear anywhere, including between the data bytes of a
/// channel message.
#[derive(Debug, Clone, Default)]
pub struct MidiStreamDecoder {
    /// Running status byte, 0 when none is active
    status: u8,
    /// First data byte of the message in flight
    data1: u8,
    /// Bytes collected for the message in flight, status included
    byte_count: u8,
}

impl MidiStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current running status (0 = none)
    pub fn status(&self) -> u8 {
        self.status
    }

    /// Feed one byte, returning the event it completes (if any)
    pub fn feed(&mut self, byte: u8) -> Option<MidiEvent> {
        if is_real_time(byte) {
            return Some(MidiEvent::RealTime(byte));
        }

        if byte & 0x80 != 0 {
            let flushed = self.flush_pending();
            if byte >= SYSTEM_COMMON_MIN {
                // System common cancels running status; its payload is not routed
                self.status = 0;
                self.byte_count = 0;
            } else {
                self.status = byte;
                self.byte_count = 1;
            }
            self.data1 = 0;
            return flushed;
        }

        if self.status == 0 {
            trace!(byte = byte, "Discarding data byte without running status");
            return None;
        }

        let data_len = MessageKind::from_status(self.status)
            .map(MessageKind::data_len)
            .unwrap_or(2);

        if self.byte_count <= 1 {
            self.data1 = byte;
            if data_len == 1 {
                self.byte_count = 1;
                return Some(self.emit(0));
            }
            self.byte_count = 2;
            None
        } else {
            // Back to expecting data1 under the same status
            self.byte_count = 1;
            Some(self.emit(byte))
        }
    }

    /// Feed a slice, collecting every completed event in order
    pub fn feed_all(&mut self, bytes: &[u8]) -> Vec<MidiEvent> {
        bytes.iter().filter_map(|&b| self.feed(b)).collect()
    }

    /// A two-data-byte message interrupted after data1 is completed with data2 = 0
    fn flush_pending(&mut self) -> Option<MidiEvent> {
        if self.status != 0 && self.byte_count == 2 {
            trace!(status = self.status, data1 = self.data1, "Flushing interrupted message");
            self.byte_count = 0;
            Some(self.emit(0))
        } else {
            None
        }
    }

    fn emit(&self, data2: u8) -> MidiEvent {
        MidiEvent::Channel(ChannelMessage::new(self.status, self.data1, data2))
    }
}
