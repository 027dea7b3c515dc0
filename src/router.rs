//! Router module - the polling cycle tying ports, matrix, panel and remote together
//!
//! The Router owns every piece of mutable state:
//! - The routing matrix, the only state shared by the MIDI and UI paths
//! - One decoder per byte-stream input
//! - The selection controller and its hardware sampler
//! - The optional OSC remote listener
//!
//! Nothing here blocks; `poll_cycle` is meant to be called on a short interval.

mod engine;

pub use engine::RoutingEngine;

use tracing::{debug, info, trace};

use crate::display::MatrixDisplay;
use crate::input::HardwareSampler;
use crate::matrix::RoutingMatrix;
use crate::midi::{MidiEvent, MidiStreamDecoder};
use crate::ports::{BytePort, MessagePort};
use crate::remote::{RemoteCommand, RemoteListener};
use crate::selection::{SelectionController, SelectionCursor};

/// Upper bound on round-robin passes over the inputs per cycle
const MAX_ROUNDS_PER_CYCLE: usize = 256;

/// A logical matrix row
pub enum InputSource {
    /// Raw byte stream decoded locally (DIN serial lines)
    Bytes {
        port: Box<dyn BytePort>,
        decoder: MidiStreamDecoder,
    },
    /// Raw byte stream forwarded byte by byte; the decoder only feeds the mirrors
    Passthrough {
        port: Box<dyn BytePort>,
        decoder: MidiStreamDecoder,
    },
    /// Transport delivering framed messages (BLE, USB)
    Messages(Box<dyn MessagePort>),
}

impl InputSource {
    pub fn bytes(port: Box<dyn BytePort>) -> Self {
        Self::Bytes {
            port,
            decoder: MidiStreamDecoder::new(),
        }
    }

    pub fn passthrough(port: Box<dyn BytePort>) -> Self {
        Self::Passthrough {
            port,
            decoder: MidiStreamDecoder::new(),
        }
    }

    pub fn messages(port: Box<dyn MessagePort>) -> Self {
        Self::Messages(port)
    }
}

/// What one read from an input produced
enum Pulled {
    Nothing,
    /// A byte was consumed; it may or may not have completed an event
    Byte(Option<MidiEvent>),
    /// A raw byte to forward, plus whatever it completed for the mirrors
    Raw(u8, Option<MidiEvent>),
    Message(MidiEvent),
}

impl InputSource {
    fn pull(&mut self) -> Pulled {
        match self {
            Self::Bytes { port, decoder } => match port.try_read_byte() {
                Some(byte) => Pulled::Byte(decoder.feed(byte)),
                None => Pulled::Nothing,
            },
            Self::Passthrough { port, decoder } => match port.try_read_byte() {
                Some(byte) => Pulled::Raw(byte, decoder.feed(byte)),
                None => Pulled::Nothing,
            },
            Self::Messages(port) => match port.try_read_message() {
                Some(event) => Pulled::Message(event),
                None => Pulled::Nothing,
            },
        }
    }
}

/// Front panel: a sampler and the controller it drives
struct Panel {
    sampler: Box<dyn HardwareSampler>,
    selection: SelectionController,
}

pub struct Router {
    matrix: RoutingMatrix,
    inputs: Vec<InputSource>,
    engine: RoutingEngine,
    panel: Option<Panel>,
    /// Cursor shown when no panel is attached
    idle_cursor: SelectionCursor,
    display: Box<dyn MatrixDisplay>,
    remote: Option<RemoteListener>,
}

impl Router {
    /// Create a router with a default-mapped matrix sized to the given ports
    pub fn new(inputs: Vec<InputSource>, engine: RoutingEngine, display: Box<dyn MatrixDisplay>) -> Self {
        let matrix = RoutingMatrix::new(inputs.len(), engine.output_count());
        info!(
            inputs = matrix.inputs(),
            outputs = matrix.outputs(),
            "Router created"
        );

        Self {
            matrix,
            inputs,
            engine,
            panel: None,
            idle_cursor: SelectionCursor::default(),
            display,
            remote: None,
        }
    }

    pub fn with_panel(mut self, sampler: Box<dyn HardwareSampler>, selection: SelectionController) -> Self {
        self.panel = Some(Panel { sampler, selection });
        self
    }

    pub fn with_remote(mut self, remote: RemoteListener) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn matrix(&self) -> &RoutingMatrix {
        &self.matrix
    }

    pub fn cursor(&self) -> &SelectionCursor {
        match &self.panel {
            Some(panel) => panel.selection.cursor(),
            None => &self.idle_cursor,
        }
    }

    /// Apply new panel tunables without losing the cursor
    pub fn reconfigure_panel(&mut self, encoder_threshold: u32, debounce_ms: u64, long_press_ms: u64) {
        if let Some(panel) = &mut self.panel {
            panel.selection.encoder_mut().set_threshold(encoder_threshold);
            panel.selection.button_mut().set_timings(debounce_ms, long_press_ms);
            debug!(encoder_threshold, debounce_ms, long_press_ms, "Panel reconfigured");
        }
    }

    /// Draw the current state
    pub fn render(&mut self) {
        let cursor = *self.cursor();
        self.display.render_matrix(&self.matrix, &cursor);
    }

    /// Execute one remote command. Returns true when the matrix changed.
    pub fn apply_remote(&mut self, command: RemoteCommand) -> bool {
        trace!(?command, "Remote command");
        command.apply(&mut self.matrix, &mut self.engine)
    }

    /// Drain the inputs round-robin, one byte or message per input per round
    fn drain_inputs(&mut self) -> usize {
        let mut processed = 0;

        for _ in 0..MAX_ROUNDS_PER_CYCLE {
            let mut progressed = false;

            for (index, input) in self.inputs.iter_mut().enumerate() {
                match input.pull() {
                    Pulled::Nothing => {}
                    Pulled::Byte(event) => {
                        progressed = true;
                        if let Some(event) = event {
                            processed += 1;
                            self.engine.route_event(&self.matrix, index, event);
                            self.engine.mirror_event(event);
                        }
                    }
                    Pulled::Raw(byte, event) => {
                        progressed = true;
                        processed += 1;
                        self.engine.route_byte(&self.matrix, index, byte);
                        if let Some(event) = event {
                            self.engine.mirror_event(event);
                        }
                    }
                    Pulled::Message(event) => {
                        progressed = true;
                        processed += 1;
                        self.engine.route_event(&self.matrix, index, event);
                    }
                }
            }

            if !progressed {
                break;
            }
        }

        processed
    }

    /// Run one polling cycle at `now_ms`. Returns true when a render was issued.
    pub fn poll_cycle(&mut self, now_ms: u64) -> bool {
        let processed = self.drain_inputs();
        if processed > 0 {
            trace!(processed, "Routed events");
        }

        let mut changed = false;

        let commands = self.remote.as_mut().map(RemoteListener::poll).unwrap_or_default();
        for command in commands {
            changed |= self.apply_remote(command);
        }

        if let Some(panel) = &mut self.panel {
            changed |= panel
                .selection
                .poll(panel.sampler.as_mut(), &mut self.matrix, now_ms);
        }

        if changed {
            self.render();
        }
        changed
    }
}

#[cfg(test)]
mod tests;
