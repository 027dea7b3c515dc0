//! Push-button click / long-press classification
//!
//! Classification happens on release, so long presses are detected without
//! polling a held state.

/// Level changes closer than this to the last accepted one are contact bounce
pub const DEFAULT_DEBOUNCE_MS: u64 = 20;

/// Minimum hold duration for a long press
pub const DEFAULT_LONG_PRESS_MS: u64 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Click,
    LongPress,
}

#[derive(Debug, Clone)]
pub struct ButtonClassifier {
    pressed: bool,
    pressed_at: u64,
    last_change: Option<u64>,
    debounce_ms: u64,
    long_press_ms: u64,
}

impl ButtonClassifier {
    pub fn new(debounce_ms: u64, long_press_ms: u64) -> Self {
        Self {
            pressed: false,
            pressed_at: 0,
            last_change: None,
            debounce_ms,
            long_press_ms,
        }
    }

    /// Change timings; the current press (if any) is kept
    pub fn set_timings(&mut self, debounce_ms: u64, long_press_ms: u64) {
        self.debounce_ms = debounce_ms;
        self.long_press_ms = long_press_ms;
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Feed one sample taken at `now` (milliseconds)
    pub fn sample(&mut self, pressed: bool, now: u64) -> Option<ButtonEvent> {
        if pressed == self.pressed {
            return None;
        }

        if let Some(last) = self.last_change {
            if now.saturating_sub(last) < self.debounce_ms {
                return None;
            }
        }

        self.last_change = Some(now);
        self.pressed = pressed;

        if pressed {
            self.pressed_at = now;
            return None;
        }

        let held = now.saturating_sub(self.pressed_at);
        if held >= self.long_press_ms {
            Some(ButtonEvent::LongPress)
        } else {
            Some(ButtonEvent::Click)
        }
    }
}

impl Default for ButtonClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_MS, DEFAULT_LONG_PRESS_MS)
    }
}
