use crate::evdev::InputEvent;

/// The single (type, code) pair a daemon instance reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvdevFilter {
    event_type: u16,
    event_code: u16,
}

impl EvdevFilter {
    pub fn new(event_type: u16, event_code: u16) -> Self {
        EvdevFilter {
            event_type,
            event_code,
        }
    }

    pub fn event_type(&self) -> u16 {
        self.event_type
    }

    pub fn event_code(&self) -> u16 {
        self.event_code
    }

    /// Exact match on type and code; the value is never considered.
    pub fn matches(&self, event: &InputEvent) -> bool {
        event.event_type() == self.event_type && event.event_code() == self.event_code
    }
}
