/// Board input, in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// A touch/click began at world coordinates (x, y).
    PointerDown { x: f32, y: f32 },
    /// Toggle erase mode: taps remove pieces instead of moving them.
    SetEraseMode { on: bool },
    /// Pause or resume tap handling (menus, win/lose screens).
    SetAcceptingInput { on: bool },
    /// Show or hide the preview paths of every piece.
    SetPreview { on: bool },
    /// Highlight one piece's path as a hint.
    Hint { line: u32 },
    /// Erase every piece.
    Reset,
}

impl InputEvent {
    /// Decode a flat `(kind, a, b)` record written by the host.
    pub fn from_raw(kind: u32, a: f32, b: f32) -> Option<Self> {
        match kind {
            1 => Some(Self::PointerDown { x: a, y: b }),
            2 => Some(Self::SetEraseMode { on: a != 0.0 }),
            3 => Some(Self::SetAcceptingInput { on: a != 0.0 }),
            4 => Some(Self::SetPreview { on: a != 0.0 }),
            5 if a >= 0.0 => Some(Self::Hint { line: a as u32 }),
            6 => Some(Self::Reset),
            _ => None,
        }
    }
}

/// Events gathered between ticks.
/// The host pushes into the queue; the board drains it once per frame.
pub struct InputQueue {
    events: Vec<InputEvent>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(16),
        }
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    /// Push a raw record. Unknown kinds are dropped with a warning.
    pub fn push_raw(&mut self, kind: u32, a: f32, b: f32) {
        match InputEvent::from_raw(kind, a, b) {
            Some(event) => self.push(event),
            None => log::warn!("dropping unknown input kind {}", kind),
        }
    }

    pub fn drain(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}
