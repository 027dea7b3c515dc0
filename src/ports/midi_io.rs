//! midir-backed ports
//!
//! midir delivers input on its own callback thread. Callbacks only push into a
//! crossbeam channel; the poll cycle drains it with `try_recv`, so reads never
//! block and the routing state stays single-threaded.

use colored::*;
use crossbeam::channel::{unbounded, Receiver};
use midir::{Ignore, MidiIO, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use super::{BytePort, MessagePort, MidiSink};
use crate::midi::{format_hex, ChannelMessage, MidiEvent, MidiStreamDecoder};

const CLIENT_NAME: &str = "MIDI-Matrix";

/// Errors opening a midir port
#[derive(Debug, Error)]
pub enum PortError {
    #[error("no MIDI port matches '{0}'")]
    NotFound(String),

    #[error("failed to initialize MIDI client: {0}")]
    Init(#[from] midir::InitError),

    #[error("failed to connect to '{port}': {reason}")]
    Connect { port: String, reason: String },
}

/// Find a port by case-insensitive substring match
pub fn find_port_by_substring<T: MidiIO>(io: &T, pattern: &str) -> Option<(T::Port, String)> {
    let pattern = pattern.to_lowercase();
    for port in io.ports() {
        if let Ok(name) = io.port_name(&port) {
            if name.to_lowercase().contains(&pattern) {
                debug!("Found port '{}' matching pattern '{}'", name, pattern);
                return Some((port, name));
            }
        }
    }
    None
}

fn port_names<T: MidiIO>(io: &T) -> Vec<String> {
    io.ports()
        .iter()
        .filter_map(|port| io.port_name(port).ok())
        .collect()
}

/// List available MIDI input ports
pub fn list_input_ports() -> Result<Vec<String>, PortError> {
    let midi_in = MidiInput::new(&format!("{}-Scanner", CLIENT_NAME))?;
    Ok(port_names(&midi_in))
}

/// List available MIDI output ports
pub fn list_output_ports() -> Result<Vec<String>, PortError> {
    let midi_out = MidiOutput::new(&format!("{}-Scanner", CLIENT_NAME))?;
    Ok(port_names(&midi_out))
}

/// Print all ports in a readable format
pub fn print_ports() {
    println!("\n{}", "=== MIDI Ports ===".bold().cyan());

    println!("\n{}", "Inputs:".bold());
    match list_input_ports() {
        Ok(ports) if ports.is_empty() => println!("  {}", "(none)".dimmed()),
        Ok(ports) => {
            for (idx, name) in ports.iter().enumerate() {
                println!("  [{}] {}", idx.to_string().yellow(), name.green());
            }
        }
        Err(e) => println!("  {}", e.to_string().red()),
    }

    println!("\n{}", "Outputs:".bold());
    match list_output_ports() {
        Ok(ports) if ports.is_empty() => println!("  {}", "(none)".dimmed()),
        Ok(ports) => {
            for (idx, name) in ports.iter().enumerate() {
                println!("  [{}] {}", idx.to_string().yellow(), name.green());
            }
        }
        Err(e) => println!("  {}", e.to_string().red()),
    }
    println!();
}

fn open_input<F>(
    pattern: &str,
    ignore: Ignore,
    callback: F,
) -> Result<(MidiInputConnection<()>, String), PortError>
where
    F: FnMut(u64, &[u8], &mut ()) + Send + 'static,
{
    let mut midi_in = MidiInput::new(&format!("{}-In", CLIENT_NAME))?;
    // Real-time must always pass through
    midi_in.ignore(ignore);

    let (port, name) = find_port_by_substring(&midi_in, pattern)
        .ok_or_else(|| PortError::NotFound(pattern.to_string()))?;

    let connection = midi_in
        .connect(&port, &format!("midi-matrix-{}", name), callback, ())
        .map_err(|e| PortError::Connect {
            port: name.clone(),
            reason: e.to_string(),
        })?;

    Ok((connection, name))
}

/// Byte-stream input: every byte is handed to the router's own decoder
pub struct MidirByteInput {
    _connection: MidiInputConnection<()>,
    rx: Receiver<u8>,
}

impl MidirByteInput {
    /// Open with SysEx filtered out by the backend
    pub fn open(pattern: &str) -> Result<Self, PortError> {
        Self::open_with(pattern, Ignore::Sysex)
    }

    /// Open with nothing filtered, for raw pass-through inputs
    pub fn open_raw(pattern: &str) -> Result<Self, PortError> {
        Self::open_with(pattern, Ignore::None)
    }

    fn open_with(pattern: &str, ignore: Ignore) -> Result<Self, PortError> {
        let (tx, rx) = unbounded();
        let (connection, name) = open_input(pattern, ignore, move |_ts, data, _| {
            trace!("RX {}", format_hex(data));
            for &b in data {
                // Receiver gone means the router is shutting down
                let _ = tx.send(b);
            }
        })?;

        info!("Byte-stream input opened: '{}'", name);
        Ok(Self {
            _connection: connection,
            rx,
        })
    }
}

impl BytePort for MidirByteInput {
    fn try_read_byte(&mut self) -> Option<u8> {
        self.rx.try_recv().ok()
    }
}

/// Message-framed input (BLE/USB transports)
pub struct MidirMessageInput {
    _connection: MidiInputConnection<()>,
    rx: Receiver<MidiEvent>,
}

impl MidirMessageInput {
    pub fn open(pattern: &str) -> Result<Self, PortError> {
        let (tx, rx) = unbounded();
        let mut framer = MidiStreamDecoder::new();
        let (connection, name) = open_input(pattern, Ignore::Sysex, move |_ts, data, _| {
            trace!("RX {}", format_hex(data));
            for &b in data {
                if let Some(event) = framer.feed(b) {
                    let _ = tx.send(event);
                }
            }
        })?;

        info!("Message input opened: '{}'", name);
        Ok(Self {
            _connection: connection,
            rx,
        })
    }
}

impl MessagePort for MidirMessageInput {
    fn try_read_message(&mut self) -> Option<MidiEvent> {
        self.rx.try_recv().ok()
    }
}

/// Output port; whole messages go out in a single send
pub struct MidirOutput {
    connection: MidiOutputConnection,
    name: String,
}

impl MidirOutput {
    pub fn open(pattern: &str) -> Result<Self, PortError> {
        let midi_out = MidiOutput::new(&format!("{}-Out", CLIENT_NAME))?;

        let (port, name) = find_port_by_substring(&midi_out, pattern)
            .ok_or_else(|| PortError::NotFound(pattern.to_string()))?;

        let connection = midi_out
            .connect(&port, &format!("midi-matrix-{}", name))
            .map_err(|e| PortError::Connect {
                port: name.clone(),
                reason: e.to_string(),
            })?;

        info!("Output opened: '{}'", name);
        Ok(Self { connection, name })
    }

    fn send(&mut self, bytes: &[u8]) {
        if let Err(e) = self.connection.send(bytes) {
            warn!("Failed to send {} to '{}': {}", format_hex(bytes), self.name, e);
        }
    }
}

impl MidiSink for MidirOutput {
    fn write_byte(&mut self, byte: u8) {
        self.send(&[byte]);
    }

    fn send_message(&mut self, message: &ChannelMessage) {
        let bytes = message.to_bytes();
        self.send(&bytes[..message.wire_len()]);
    }
}
