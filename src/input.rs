//! Front-panel input: rotary encoder and push button
//!
//! Raw line samples are turned into logical steps and button events here;
//! [`crate::selection`] decides what they mean for the matrix.

pub mod button;
pub mod encoder;
pub mod panel;

pub use button::{ButtonClassifier, ButtonEvent};
pub use encoder::EncoderDecoder;
pub use panel::{PanelCommand, PanelSampler};

/// Source of raw front-panel line levels, polled once per cycle
pub trait HardwareSampler {
    /// Current (clock, data) levels of the encoder
    fn sample_encoder_lines(&mut self) -> (bool, bool);

    /// Current button level, true while pressed
    fn sample_button_line(&mut self) -> bool;
}
