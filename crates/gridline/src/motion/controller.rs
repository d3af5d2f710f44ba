//! Per-piece motion state machine.
//!
//! ```text
//! Idle --start_move--> Moving --blocked--> Blocked --> Returning --> Idle
//!                        |                    \--(no return)--> Idle
//!                        \--exit condition--> Exited
//! any --force_exit--> Exited
//! ```
//!
//! The controller owns the piece's moving offset and is advanced by an
//! explicit `step(dt, env)` once per simulation tick. Everything it needs to
//! know about the outside world (obstruction, play-area bounds) comes through
//! `MotionEnv`, and everything it reports goes to the shared `LineListener`.

use crate::api::listener::ListenerHandle;
use crate::api::types::LineId;
use crate::geometry::vec2::move_towards;

/// Motion tunables in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionParams {
    pub speed: f32,
    pub move_forever: bool,
    /// Distance past the path end before a finite move exits.
    pub overrun: f32,
    pub block_check: bool,
    pub return_to_start_on_block: bool,
    pub return_speed: f32,
    pub return_epsilon: f32,
    pub destroy_after_move: bool,
    pub destroy_delay: f32,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            speed: 6.0,
            move_forever: true,
            overrun: 6.0,
            block_check: true,
            return_to_start_on_block: true,
            return_speed: 12.0,
            return_epsilon: 0.02,
            destroy_after_move: false,
            destroy_delay: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Idle,
    Moving,
    /// Held for exactly one tick after a block is detected.
    Blocked,
    Returning,
    Exited,
}

/// World access for one controller step.
pub trait MotionEnv {
    /// Would advancing from offset `from` to `to` hit another object?
    fn is_blocked(&mut self, from: f32, to: f32) -> bool;

    /// `Some(true)` once the whole ribbon has left the play area. `None`
    /// when no play area is known, which selects the overrun exit rule.
    fn has_left_bounds(&mut self, _offset: f32) -> Option<bool> {
        None
    }
}

pub struct MotionController {
    line: LineId,
    params: MotionParams,
    state: MotionState,
    offset: f32,
    total_length: Option<f32>,
    listener: ListenerHandle,
    registered: bool,
    ended_by_block: bool,
    linger: f32,
}

impl MotionController {
    /// `total_length` is `None` for a piece without a valid path; such a
    /// piece is never registered and never moves.
    pub fn new(
        line: LineId,
        total_length: Option<f32>,
        params: MotionParams,
        listener: ListenerHandle,
    ) -> Self {
        let mut ctl = Self {
            line,
            params,
            state: MotionState::Idle,
            offset: 0.0,
            total_length,
            listener,
            registered: false,
            ended_by_block: false,
            linger: 0.0,
        };
        if total_length.is_some() {
            ctl.listener.borrow_mut().on_registered(line);
            ctl.registered = true;
        }
        ctl
    }

    pub fn line(&self) -> LineId {
        self.line
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn params(&self) -> &MotionParams {
        &self.params
    }

    pub fn has_path(&self) -> bool {
        self.total_length.is_some()
    }

    pub fn ended_by_block(&self) -> bool {
        self.ended_by_block
    }

    /// Whether the piece's hull should be published in this state.
    pub fn hull_enabled(&self) -> bool {
        match self.state {
            MotionState::Idle => self.has_path(),
            MotionState::Moving | MotionState::Blocked | MotionState::Returning => {
                !self.params.destroy_after_move
            }
            MotionState::Exited => false,
        }
    }

    /// Exited and done lingering; the owner may drop the piece.
    pub fn is_finished(&self) -> bool {
        self.state == MotionState::Exited && self.linger <= 0.0
    }

    /// Begin moving. No-op unless Idle with a valid path.
    pub fn start_move(&mut self) -> bool {
        if self.state != MotionState::Idle || !self.has_path() {
            return false;
        }
        self.state = MotionState::Moving;
        self.ended_by_block = false;
        self.listener.borrow_mut().on_started(self.line);
        log::debug!("line {:?}: moving from offset {:.3}", self.line, self.offset);
        true
    }

    /// A tap that could not start a move costs a life.
    pub fn report_blocked_tap(&self) {
        self.listener.borrow_mut().on_blocked(self.line, self.offset);
    }

    /// Drive the piece straight to Exited (erase/reset), skipping any
    /// return animation and the destroy delay.
    pub fn force_exit(&mut self) {
        if self.state == MotionState::Exited {
            self.linger = 0.0;
            return;
        }
        self.exit(0.0);
    }

    fn exit(&mut self, linger: f32) {
        self.state = MotionState::Exited;
        self.linger = linger;
        if self.registered {
            self.registered = false;
            self.listener.borrow_mut().on_unregistered(self.line);
        }
        log::debug!("line {:?}: exited at offset {:.3}", self.line, self.offset);
    }

    fn exit_reached(&self, env: &mut dyn MotionEnv) -> bool {
        let Some(total) = self.total_length else {
            return false;
        };
        let past_overrun = self.offset >= total + self.params.overrun;
        if !self.params.move_forever {
            return past_overrun;
        }
        env.has_left_bounds(self.offset).unwrap_or(past_overrun)
    }

    /// Advance one tick. Returns whether the moving offset changed.
    pub fn step(&mut self, dt: f32, env: &mut dyn MotionEnv) -> bool {
        match self.state {
            MotionState::Idle => false,
            MotionState::Moving => {
                let next = self.offset + self.params.speed * dt;
                if self.params.block_check && env.is_blocked(self.offset, next) {
                    self.ended_by_block = true;
                    self.state = MotionState::Blocked;
                    self.listener.borrow_mut().on_blocked(self.line, self.offset);
                    log::debug!("line {:?}: blocked at offset {:.3}", self.line, self.offset);
                    return false;
                }
                self.offset = next;
                if self.exit_reached(env) {
                    let linger = if self.params.destroy_after_move {
                        self.params.destroy_delay.max(0.0)
                    } else {
                        0.0
                    };
                    self.exit(linger);
                }
                true
            }
            MotionState::Blocked => {
                if self.params.return_to_start_on_block {
                    self.state = MotionState::Returning;
                    self.return_step(dt)
                } else {
                    self.state = MotionState::Idle;
                    false
                }
            }
            MotionState::Returning => self.return_step(dt),
            MotionState::Exited => {
                self.linger = (self.linger - dt).max(0.0);
                false
            }
        }
    }

    fn return_step(&mut self, dt: f32) -> bool {
        let before = self.offset;
        let speed = self.params.return_speed.max(0.01);
        self.offset = move_towards(self.offset, 0.0, speed * dt);
        if self.offset.abs() <= self.params.return_epsilon.max(1e-4) {
            self.offset = 0.0;
            self.state = MotionState::Idle;
            log::debug!("line {:?}: returned to start", self.line);
        }
        self.offset != before
    }
}

impl Drop for MotionController {
    fn drop(&mut self) {
        // A piece torn down with its level still leaves the active count.
        if self.registered {
            match self.listener.try_borrow_mut() {
                Ok(mut l) => l.on_unregistered(self.line),
                Err(_) => log::warn!(
                    "line {:?}: listener busy at drop, unregister skipped",
                    self.line
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::listener::EventQueue;
    use crate::api::types::LineEvent;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Blocks every step after `block_after` clear steps.
    struct Scripted {
        clear_steps: usize,
        calls: usize,
        bounds: Option<f32>,
    }

    impl Scripted {
        fn open() -> Self {
            Self { clear_steps: usize::MAX, calls: 0, bounds: None }
        }

        fn block_after(n: usize) -> Self {
            Self { clear_steps: n, calls: 0, bounds: None }
        }
    }

    impl MotionEnv for Scripted {
        fn is_blocked(&mut self, _from: f32, _to: f32) -> bool {
            self.calls += 1;
            self.calls > self.clear_steps
        }

        fn has_left_bounds(&mut self, offset: f32) -> Option<bool> {
            self.bounds.map(|limit| offset >= limit)
        }
    }

    fn controller(total: Option<f32>, params: MotionParams) -> (MotionController, Rc<RefCell<EventQueue>>) {
        let q = EventQueue::shared();
        let ctl = MotionController::new(LineId(1), total, params, q.clone());
        (ctl, q)
    }

    fn finite(speed: f32) -> MotionParams {
        MotionParams {
            speed,
            move_forever: false,
            overrun: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn straight_run_exits_once() {
        let (mut ctl, q) = controller(Some(3.0), finite(4.0));
        let mut env = Scripted::open();
        assert_eq!(q.borrow().count(LineEvent::REGISTERED), 1);
        assert!(ctl.start_move());
        for _ in 0..6 {
            ctl.step(0.125, &mut env);
        }
        assert_eq!(ctl.state(), MotionState::Exited);
        assert!(ctl.is_finished());
        for _ in 0..5 {
            ctl.step(0.125, &mut env);
        }
        assert_eq!(q.borrow().count(LineEvent::UNREGISTERED), 1);
        drop(ctl);
        assert_eq!(q.borrow().count(LineEvent::UNREGISTERED), 1);
    }

    #[test]
    fn does_not_exit_early() {
        let (mut ctl, _q) = controller(Some(3.0), finite(4.0));
        let mut env = Scripted::open();
        ctl.start_move();
        for _ in 0..5 {
            ctl.step(0.125, &mut env);
        }
        assert_eq!(ctl.state(), MotionState::Moving);
        assert_eq!(ctl.offset(), 2.5);
    }

    #[test]
    fn block_returns_monotonically_and_reports_once() {
        let params = MotionParams {
            speed: 4.0,
            return_speed: 1.0,
            return_epsilon: 0.01,
            ..Default::default()
        };
        let (mut ctl, q) = controller(Some(3.0), params);
        let mut env = Scripted::block_after(1);
        ctl.start_move();

        assert!(ctl.step(0.25, &mut env));
        assert_eq!(ctl.offset(), 1.0);
        assert!(!ctl.step(0.25, &mut env));
        assert_eq!(ctl.state(), MotionState::Blocked);
        assert_eq!(ctl.offset(), 1.0);

        let mut last = ctl.offset();
        let mut seen_returning = false;
        for _ in 0..40 {
            ctl.step(0.1, &mut env);
            if ctl.state() == MotionState::Returning {
                seen_returning = true;
            }
            assert!(ctl.offset() <= last && ctl.offset() >= 0.0);
            last = ctl.offset();
        }
        assert!(seen_returning);
        assert_eq!(ctl.state(), MotionState::Idle);
        assert_eq!(ctl.offset(), 0.0);
        assert_eq!(q.borrow().count(LineEvent::BLOCKED), 1);
        assert!(ctl.ended_by_block());
    }

    #[test]
    fn block_without_return_stays_put() {
        let params = MotionParams {
            return_to_start_on_block: false,
            ..finite(4.0)
        };
        let (mut ctl, _q) = controller(Some(3.0), params);
        let mut env = Scripted::block_after(1);
        ctl.start_move();
        ctl.step(0.25, &mut env);
        ctl.step(0.25, &mut env);
        ctl.step(0.25, &mut env);
        assert_eq!(ctl.state(), MotionState::Idle);
        assert_eq!(ctl.offset(), 1.0);
    }

    #[test]
    fn start_move_is_idempotent() {
        let (mut ctl, q) = controller(Some(3.0), finite(4.0));
        let mut env = Scripted::open();
        assert!(ctl.start_move());
        ctl.step(0.125, &mut env);
        let offset = ctl.offset();
        assert!(!ctl.start_move());
        assert_eq!(ctl.offset(), offset);
        assert_eq!(ctl.state(), MotionState::Moving);
        assert_eq!(q.borrow().count(LineEvent::STARTED), 1);
        assert_eq!(q.borrow().count(LineEvent::REGISTERED), 1);
    }

    #[test]
    fn inert_piece_never_moves_or_registers() {
        let (mut ctl, q) = controller(None, finite(4.0));
        assert!(!ctl.start_move());
        assert!(!ctl.step(1.0, &mut Scripted::open()));
        assert!(!ctl.hull_enabled());
        assert!(q.borrow().events().is_empty());
    }

    #[test]
    fn move_forever_exits_when_off_screen() {
        let params = MotionParams {
            speed: 1.0,
            ..Default::default()
        };
        let (mut ctl, _q) = controller(Some(2.0), params);
        let mut env = Scripted { clear_steps: usize::MAX, calls: 0, bounds: Some(3.0) };
        ctl.start_move();
        for _ in 0..2 {
            ctl.step(1.0, &mut env);
        }
        assert_eq!(ctl.state(), MotionState::Moving);
        ctl.step(1.0, &mut env);
        assert_eq!(ctl.state(), MotionState::Exited);
    }

    #[test]
    fn move_forever_without_bounds_uses_overrun() {
        let params = MotionParams {
            speed: 1.0,
            overrun: 1.0,
            ..Default::default()
        };
        let (mut ctl, _q) = controller(Some(2.0), params);
        let mut env = Scripted::open();
        ctl.start_move();
        ctl.step(1.0, &mut env);
        ctl.step(1.0, &mut env);
        assert_eq!(ctl.state(), MotionState::Moving);
        ctl.step(1.0, &mut env);
        assert_eq!(ctl.state(), MotionState::Exited);
    }

    #[test]
    fn destroy_delay_lingers_after_exit() {
        let params = MotionParams {
            destroy_after_move: true,
            destroy_delay: 0.5,
            ..finite(4.0)
        };
        let (mut ctl, _q) = controller(Some(1.0), params);
        let mut env = Scripted::open();
        ctl.start_move();
        assert!(!ctl.hull_enabled());
        ctl.step(0.25, &mut env);
        assert_eq!(ctl.state(), MotionState::Exited);
        assert!(!ctl.is_finished());
        ctl.step(0.25, &mut env);
        assert!(!ctl.is_finished());
        ctl.step(0.25, &mut env);
        assert!(ctl.is_finished());
    }

    #[test]
    fn force_exit_cancels_return() {
        let params = MotionParams {
            return_speed: 0.1,
            ..finite(4.0)
        };
        let (mut ctl, q) = controller(Some(3.0), params);
        let mut env = Scripted::block_after(2);
        ctl.start_move();
        for _ in 0..4 {
            ctl.step(0.25, &mut env);
        }
        assert_eq!(ctl.state(), MotionState::Returning);
        ctl.force_exit();
        assert_eq!(ctl.state(), MotionState::Exited);
        assert!(ctl.is_finished());
        assert!(!ctl.hull_enabled());
        assert_eq!(q.borrow().count(LineEvent::UNREGISTERED), 1);
    }

    #[test]
    fn drop_with_listener_borrowed_does_not_panic() {
        let (ctl, q) = controller(Some(3.0), MotionParams::default());
        {
            let held = q.borrow();
            drop(ctl);
            assert_eq!(held.active_lines(), 1);
        }
        assert_eq!(q.borrow().count(LineEvent::UNREGISTERED), 0);
    }
}
