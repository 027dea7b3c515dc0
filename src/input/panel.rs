//! Virtual front panel
//!
//! Turns high-level panel commands (from the interactive console) into the
//! raw line levels a physical encoder and button would produce, so they go
//! through exactly the same decoding as real hardware.

use crossbeam::channel::Receiver;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::encoder::{DEFAULT_STEP_THRESHOLD, MAX_STEP_THRESHOLD};
use super::HardwareSampler;

/// Largest rotation a single `Turn` may request, in detents
pub const MAX_TURN_DETENTS: u32 = 64;

/// Hold time used for a synthesized click
const CLICK_HOLD: Duration = Duration::from_millis(120);

/// Hold time used for a synthesized long press
const LONG_PRESS_HOLD: Duration = Duration::from_millis(900);

/// Released gap between two queued presses, well above the debounce window
const RELEASE_GAP: Duration = Duration::from_millis(80);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelCommand {
    /// Rotate by a number of detents; positive is clockwise
    Turn(i32),
    Click,
    LongPress,
    /// Quadrature edges synthesized per detent, tracks the encoder threshold
    SetDetentEdges(u32),
}

/// [`HardwareSampler`] fed by [`PanelCommand`]s
pub struct PanelSampler {
    rx: Receiver<PanelCommand>,
    edges_per_detent: u32,
    clock: bool,
    data: bool,
    /// Encoder line states still to be played, one per sample
    pending_edges: VecDeque<(bool, bool)>,
    /// Button holds still to be played
    pending_holds: VecDeque<Duration>,
    pressed_until: Option<Instant>,
    released_at: Option<Instant>,
}

impl PanelSampler {
    pub fn new(rx: Receiver<PanelCommand>) -> Self {
        Self {
            rx,
            edges_per_detent: DEFAULT_STEP_THRESHOLD,
            clock: true,
            data: true,
            pending_edges: VecDeque::new(),
            pending_holds: VecDeque::new(),
            pressed_until: None,
            released_at: None,
        }
    }

    /// Match the encoder threshold so one `Turn(1)` is one logical step
    pub fn set_edges_per_detent(&mut self, edges: u32) {
        self.edges_per_detent = edges.clamp(1, MAX_STEP_THRESHOLD);
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.rx.try_recv() {
            trace!(?command, "Panel command");
            match command {
                PanelCommand::Turn(detents) => self.queue_turn(detents),
                PanelCommand::Click => self.pending_holds.push_back(CLICK_HOLD),
                PanelCommand::LongPress => self.pending_holds.push_back(LONG_PRESS_HOLD),
                PanelCommand::SetDetentEdges(edges) => self.set_edges_per_detent(edges),
            }
        }
    }

    fn queue_turn(&mut self, detents: i32) {
        let clockwise = detents > 0;
        let detents = detents.unsigned_abs();
        if detents > MAX_TURN_DETENTS {
            debug!(detents, "Turn clamped to {} detents", MAX_TURN_DETENTS);
        }
        let edges = detents
            .min(MAX_TURN_DETENTS)
            .saturating_mul(self.edges_per_detent);

        // Continue from the last queued line state
        let mut clock = self
            .pending_edges
            .back()
            .map(|&(c, _)| c)
            .unwrap_or(self.clock);

        for _ in 0..edges {
            clock = !clock;
            let data = if clockwise { !clock } else { clock };
            self.pending_edges.push_back((clock, data));
        }
    }

    fn button_level(&mut self, now: Instant) -> bool {
        if let Some(until) = self.pressed_until {
            if now < until {
                return true;
            }
            self.pressed_until = None;
            self.released_at = Some(now);
            return false;
        }

        let rested = self
            .released_at
            .map_or(true, |at| now.duration_since(at) >= RELEASE_GAP);

        if rested {
            if let Some(hold) = self.pending_holds.pop_front() {
                self.pressed_until = Some(now + hold);
                return true;
            }
        }
        false
    }
}

impl HardwareSampler for PanelSampler {
    fn sample_encoder_lines(&mut self) -> (bool, bool) {
        self.drain_commands();
        if let Some((clock, data)) = self.pending_edges.pop_front() {
            self.clock = clock;
            self.data = data;
        }
        (self.clock, self.data)
    }

    fn sample_button_line(&mut self) -> bool {
        self.drain_commands();
        self.button_level(Instant::now())
    }
}
