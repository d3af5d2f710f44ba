use std::cell::RefCell;
use std::rc::Rc;

use crate::api::types::{LineEvent, LineId};

/// Game-state collaborator notified by line pieces.
///
/// `on_registered`/`on_unregistered` bracket a piece's life (the host counts
/// them to detect a cleared board); `on_blocked` is the lose-a-life trigger.
pub trait LineListener {
    fn on_registered(&mut self, line: LineId);
    fn on_unregistered(&mut self, line: LineId);
    fn on_blocked(&mut self, line: LineId, offset: f32);
    fn on_started(&mut self, _line: LineId) {}
}

/// Shared handle given to every piece's motion controller.
pub type ListenerHandle = Rc<RefCell<dyn LineListener>>;

/// Listener that records events as flat `LineEvent`s for the host to read.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<LineEvent>,
    active: u32,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(32),
            active: 0,
        }
    }

    /// Shared queue; clones coerce to a `ListenerHandle` for the pieces.
    pub fn shared() -> Rc<RefCell<EventQueue>> {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn events(&self) -> &[LineEvent] {
        &self.events
    }

    /// Pieces registered and not yet unregistered.
    pub fn active_lines(&self) -> u32 {
        self.active
    }

    pub fn count(&self, kind: f32) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    /// Clear per-frame events. The active count survives.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn drain(&mut self) -> Vec<LineEvent> {
        std::mem::take(&mut self.events)
    }
}

impl LineListener for EventQueue {
    fn on_registered(&mut self, line: LineId) {
        self.active += 1;
        self.events.push(LineEvent::new(LineEvent::REGISTERED, line));
    }

    fn on_unregistered(&mut self, line: LineId) {
        self.active = self.active.saturating_sub(1);
        self.events.push(LineEvent::new(LineEvent::UNREGISTERED, line));
    }

    fn on_blocked(&mut self, line: LineId, offset: f32) {
        self.events
            .push(LineEvent::new(LineEvent::BLOCKED, line).with_offset(offset));
    }

    fn on_started(&mut self, line: LineId) {
        self.events.push(LineEvent::new(LineEvent::STARTED, line));
    }
}
