//! Selection cursor state machine
//!
//! Rotation moves the cursor along the active axis (wrapping), a click toggles
//! the selected cell and a long press switches the active axis.

use tracing::debug;

use crate::input::{ButtonClassifier, ButtonEvent, EncoderDecoder, HardwareSampler};
use crate::matrix::RoutingMatrix;

/// Axis currently steered by rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectMode {
    /// Rotation picks the output
    #[default]
    ColumnSelect,
    /// Rotation picks the input
    RowSelect,
}

impl SelectMode {
    fn flipped(self) -> Self {
        match self {
            Self::ColumnSelect => Self::RowSelect,
            Self::RowSelect => Self::ColumnSelect,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionCursor {
    pub selected_input: usize,
    pub selected_output: usize,
    pub mode: SelectMode,
}

impl SelectionCursor {
    pub fn is_input_select(&self) -> bool {
        self.mode == SelectMode::RowSelect
    }
}

fn wrap(position: usize, step: i32, len: usize) -> usize {
    if len == 0 {
        return position;
    }
    (position as i64 + step as i64).rem_euclid(len as i64) as usize
}

/// Drives the cursor from encoder steps and button events
#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    cursor: SelectionCursor,
    encoder: EncoderDecoder,
    button: ButtonClassifier,
}

impl SelectionController {
    pub fn new(encoder: EncoderDecoder, button: ButtonClassifier) -> Self {
        Self {
            cursor: SelectionCursor::default(),
            encoder,
            button,
        }
    }

    pub fn cursor(&self) -> &SelectionCursor {
        &self.cursor
    }

    pub fn encoder_mut(&mut self) -> &mut EncoderDecoder {
        &mut self.encoder
    }

    pub fn button_mut(&mut self) -> &mut ButtonClassifier {
        &mut self.button
    }

    /// Move along the active axis. Returns true when the cursor moved.
    pub fn apply_step(&mut self, step: i32, matrix: &RoutingMatrix) -> bool {
        if step == 0 {
            return false;
        }

        match self.cursor.mode {
            SelectMode::ColumnSelect => {
                self.cursor.selected_output = wrap(self.cursor.selected_output, step, matrix.outputs());
            }
            SelectMode::RowSelect => {
                self.cursor.selected_input = wrap(self.cursor.selected_input, step, matrix.inputs());
            }
        }
        debug!(
            input = self.cursor.selected_input,
            output = self.cursor.selected_output,
            "Cursor moved"
        );
        true
    }

    /// Apply a button event. Returns true when cursor or matrix changed.
    pub fn apply_button(&mut self, event: ButtonEvent, matrix: &mut RoutingMatrix) -> bool {
        match event {
            ButtonEvent::Click => matrix.toggle(self.cursor.selected_input, self.cursor.selected_output),
            ButtonEvent::LongPress => {
                self.cursor.mode = self.cursor.mode.flipped();
                debug!(mode = ?self.cursor.mode, "Selection axis switched");
                true
            }
        }
    }

    /// Sample the panel once. Returns true when a render is due; both a step
    /// and a button event in the same poll still yield a single render.
    pub fn poll(
        &mut self,
        sampler: &mut dyn HardwareSampler,
        matrix: &mut RoutingMatrix,
        now_ms: u64,
    ) -> bool {
        let (clock, data) = sampler.sample_encoder_lines();
        let step = self.encoder.sample(clock, data);
        let mut changed = self.apply_step(step, matrix);

        if let Some(event) = self.button.sample(sampler.sample_button_line(), now_ms) {
            changed |= self.apply_button(event, matrix);
        }
        changed
    }
}
