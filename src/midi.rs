//! MIDI utilities and message types
//!
//! Provides the channel/real-time event model shared by the stream decoder,
//! the routing engine and the port implementations.

mod decoder;

pub use decoder::MidiStreamDecoder;

use std::fmt;

/// Lowest status byte of the system real-time range (clock, start, stop, ...)
pub const REAL_TIME_MIN: u8 = 0xF8;

/// Lowest status byte of the system common range (SysEx, MTC, song position, ...)
pub const SYSTEM_COMMON_MIN: u8 = 0xF0;

/// Channel message types, keyed by the high nibble of the status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    NoteOff,
    NoteOn,
    PolyPressure,
    ControlChange,
    ProgramChange,
    ChannelPressure,
    PitchBend,
}

impl MessageKind {
    /// Classify a status byte, None outside the channel range (0x80-0xEF)
    pub fn from_status(status: u8) -> Option<Self> {
        match status & 0xF0 {
            0x80 => Some(Self::NoteOff),
            0x90 => Some(Self::NoteOn),
            0xA0 => Some(Self::PolyPressure),
            0xB0 => Some(Self::ControlChange),
            0xC0 => Some(Self::ProgramChange),
            0xD0 => Some(Self::ChannelPressure),
            0xE0 => Some(Self::PitchBend),
            _ => None,
        }
    }

    /// Number of data bytes following the status byte
    pub fn data_len(self) -> usize {
        match self {
            Self::ProgramChange | Self::ChannelPressure => 1,
            _ => 2,
        }
    }
}

/// A channel message as it travels through the router.
///
/// `data2` only carries meaning for kinds with two data bytes; for Program
/// Change and Channel Pressure it is zero and never put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMessage {
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
}

impl ChannelMessage {
    pub fn new(status: u8, data1: u8, data2: u8) -> Self {
        Self {
            status,
            data1,
            data2,
        }
    }

    /// Note On for channel 0-15
    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self::new(0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F)
    }

    pub fn kind(&self) -> Option<MessageKind> {
        MessageKind::from_status(self.status)
    }

    /// Channel (0-15)
    pub fn channel(&self) -> u8 {
        self.status & 0x0F
    }

    /// Whether `data2` belongs on the wire
    pub fn has_data2(&self) -> bool {
        self.kind().is_some_and(|kind| kind.data_len() == 2)
    }

    /// Number of wire bytes, status included
    pub fn wire_len(&self) -> usize {
        if self.has_data2() {
            3
        } else {
            2
        }
    }

    /// Wire representation; only the first `wire_len()` bytes are meaningful
    pub fn to_bytes(&self) -> [u8; 3] {
        [self.status, self.data1, self.data2]
    }
}

impl fmt::Display for ChannelMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ch = self.channel() + 1;
        match self.kind() {
            Some(MessageKind::NoteOff) => {
                write!(f, "NoteOff ch:{} n:{} v:{}", ch, self.data1, self.data2)
            }
            Some(MessageKind::NoteOn) => {
                write!(f, "NoteOn ch:{} n:{} v:{}", ch, self.data1, self.data2)
            }
            Some(MessageKind::PolyPressure) => {
                write!(f, "PolyPressure ch:{} n:{} p:{}", ch, self.data1, self.data2)
            }
            Some(MessageKind::ControlChange) => {
                write!(f, "CC ch:{} cc:{} v:{}", ch, self.data1, self.data2)
            }
            Some(MessageKind::ProgramChange) => write!(f, "ProgramChange ch:{} p:{}", ch, self.data1),
            Some(MessageKind::ChannelPressure) => {
                write!(f, "ChannelPressure ch:{} p:{}", ch, self.data1)
            }
            Some(MessageKind::PitchBend) => {
                let value = ((self.data2 as u16 & 0x7F) << 7) | (self.data1 as u16 & 0x7F);
                write!(f, "PitchBend ch:{} v:{}", ch, value)
            }
            None => write!(f, "Unknown {}", format_hex(&self.to_bytes())),
        }
    }
}

/// A decoded unit of MIDI traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    /// Completed channel message
    Channel(ChannelMessage),
    /// Single-byte system real-time message (0xF8-0xFF)
    RealTime(u8),
}

impl fmt::Display for MidiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MidiEvent::Channel(msg) => write!(f, "{}", msg),
            MidiEvent::RealTime(byte) => write!(f, "RealTime {:02X}", byte),
        }
    }
}

/// Check whether a byte is a system real-time message
pub fn is_real_time(byte: u8) -> bool {
    byte >= REAL_TIME_MIN
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
