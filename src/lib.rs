//! MIDI Matrix - multi-port MIDI router
//!
//! Routes MIDI from several byte-stream and message-oriented inputs to several
//! outputs through a live-editable boolean matrix. The matrix is edited from a
//! rotary encoder + button front panel or over OSC.

pub mod cli;
pub mod config;
pub mod display;
pub mod input;
pub mod matrix;
pub mod midi;
pub mod paths;
pub mod ports;
pub mod remote;
pub mod router;
pub mod selection;
