//! OSC remote control
//!
//! Two addresses are understood:
//! - `/matrix/route input output enable` toggles a cell when `enable` is non-zero
//! - `/midi/note input note velocity` injects a Note On as if it arrived on `input`;
//!   note and velocity outside 0-127 drop the command
//!
//! Malformed datagrams are dropped with a debug log; a router keeps running
//! whatever the remote sends.

use rosc::{OscMessage, OscPacket, OscType};
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::matrix::RoutingMatrix;
use crate::midi::ChannelMessage;
use crate::router::RoutingEngine;

pub const ROUTE_ADDRESS: &str = "/matrix/route";
pub const NOTE_ADDRESS: &str = "/midi/note";

/// Largest datagram accepted
const MAX_DATAGRAM: usize = 1536;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("undecodable OSC packet: {0}")]
    Decode(String),

    #[error("unknown OSC address '{0}'")]
    UnknownAddress(String),

    #[error("'{address}' expects 3 numeric arguments, got {got}")]
    BadArguments { address: String, got: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCommand {
    SetRoute { input: i32, output: i32, enable: i32 },
    Note { input: i32, note: i32, velocity: i32 },
}

fn int_arg(arg: &OscType) -> Option<i32> {
    match arg {
        OscType::Int(v) => Some(*v),
        OscType::Long(v) => i32::try_from(*v).ok(),
        OscType::Float(v) => Some(*v as i32),
        OscType::Double(v) => Some(*v as i32),
        OscType::Bool(v) => Some(*v as i32),
        _ => None,
    }
}

fn three_ints(msg: &OscMessage) -> Result<(i32, i32, i32), RemoteError> {
    let ints: Vec<i32> = msg.args.iter().take(3).filter_map(int_arg).collect();
    match ints[..] {
        [a, b, c] => Ok((a, b, c)),
        _ => Err(RemoteError::BadArguments {
            address: msg.addr.clone(),
            got: ints.len(),
        }),
    }
}

impl RemoteCommand {
    pub fn from_message(msg: &OscMessage) -> Result<Self, RemoteError> {
        match msg.addr.as_str() {
            ROUTE_ADDRESS => {
                let (input, output, enable) = three_ints(msg)?;
                Ok(Self::SetRoute {
                    input,
                    output,
                    enable,
                })
            }
            NOTE_ADDRESS => {
                let (input, note, velocity) = three_ints(msg)?;
                Ok(Self::Note {
                    input,
                    note,
                    velocity,
                })
            }
            other => Err(RemoteError::UnknownAddress(other.to_string())),
        }
    }

    /// Every command in a packet, bundles flattened in order
    pub fn from_packet(packet: &OscPacket) -> Vec<Result<Self, RemoteError>> {
        match packet {
            OscPacket::Message(msg) => vec![Self::from_message(msg)],
            OscPacket::Bundle(bundle) => bundle.content.iter().flat_map(Self::from_packet).collect(),
        }
    }

    /// Decode a raw datagram
    pub fn decode(datagram: &[u8]) -> Vec<Result<Self, RemoteError>> {
        match rosc::decoder::decode_udp(datagram) {
            Ok((_, packet)) => Self::from_packet(&packet),
            Err(e) => vec![Err(RemoteError::Decode(format!("{:?}", e)))],
        }
    }

    /// Execute against the matrix and engine. Returns true when the matrix changed.
    pub fn apply(&self, matrix: &mut RoutingMatrix, engine: &mut RoutingEngine) -> bool {
        match *self {
            Self::SetRoute {
                input,
                output,
                enable,
            } => {
                if enable == 0 {
                    return false;
                }
                match (usize::try_from(input), usize::try_from(output)) {
                    (Ok(input), Ok(output)) => matrix.toggle(input, output),
                    _ => {
                        debug!(input, output, "Ignoring negative route indices");
                        false
                    }
                }
            }
            Self::Note {
                input,
                note,
                velocity,
            } => {
                let data = |value: i32| u8::try_from(value).ok().filter(|v| *v <= 0x7F);
                match (usize::try_from(input), data(note), data(velocity)) {
                    (Ok(input), Some(note), Some(velocity)) => {
                        let message = ChannelMessage::note_on(0, note, velocity);
                        engine.route_message(matrix, input, &message);
                    }
                    _ => debug!(input, note, velocity, "Ignoring out-of-range note"),
                }
                false
            }
        }
    }
}

/// Non-blocking UDP listener for remote commands
pub struct RemoteListener {
    socket: UdpSocket,
    forward_to: Option<SocketAddr>,
    buf: Vec<u8>,
}

impl RemoteListener {
    pub fn bind(addr: &str, forward_to: Option<SocketAddr>) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;
        info!("Remote control listening on {}", socket.local_addr()?);
        if let Some(target) = forward_to {
            info!("Relaying remote datagrams to {}", target);
        }

        Ok(Self {
            socket,
            forward_to,
            buf: vec![0; MAX_DATAGRAM],
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Drain every pending datagram and return the commands they carry
    pub fn poll(&mut self) -> Vec<RemoteCommand> {
        let mut commands = Vec::new();

        loop {
            let (len, from) = match self.socket.recv_from(&mut self.buf) {
                Ok(received) => received,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("Remote socket receive failed: {}", e);
                    break;
                }
            };
            let datagram = &self.buf[..len];
            trace!(%from, len, "Remote datagram");

            if let Some(target) = self.forward_to {
                if let Err(e) = self.socket.send_to(datagram, target) {
                    warn!("Failed to relay datagram to {}: {}", target, e);
                }
            }

            for result in RemoteCommand::decode(datagram) {
                match result {
                    Ok(command) => commands.push(command),
                    Err(e) => debug!(%from, "Dropping remote message: {}", e),
                }
            }
        }

        commands
    }
}
