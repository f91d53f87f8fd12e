//! Do-not-disturb gate driven by motion transitions.
//!
//! The gate decides `enabled && in_motion && !passenger_mode` and pushes the
//! decision to a [`DndController`] only when it flips. Passenger mode is a
//! per-trip override: it is cleared on every motion change.

use crate::engine::TransitionSink;
use crate::error::{Error, Result};
use parking_lot::Mutex;

/// Applies the do-not-disturb decision to the host platform
pub trait DndController: Send {
    /// Enable or disable do-not-disturb.
    ///
    /// Implementations restore whatever policy was active before enabling
    /// when called with `false`.
    fn apply(&mut self, enable: bool) -> Result<()>;
}

/// Controller that only logs decisions
#[derive(Debug, Default)]
pub struct LoggingController {
    changes: u64,
}

impl LoggingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of decisions applied so far
    pub fn changes(&self) -> u64 {
        self.changes
    }
}

impl DndController for LoggingController {
    fn apply(&mut self, enable: bool) -> Result<()> {
        self.changes += 1;
        if enable {
            log::info!("Do-not-disturb enabled");
        } else {
            log::info!("Do-not-disturb disabled, previous policy restored");
        }
        Ok(())
    }
}

#[derive(Debug)]
struct GateState<C> {
    controller: C,
    enabled: bool,
    passenger_mode: bool,
    in_motion: bool,
    applied: bool,
}

impl<C: DndController> GateState<C> {
    fn decision(&self) -> bool {
        self.enabled && self.in_motion && !self.passenger_mode
    }

    fn reconcile(&mut self) -> Result<()> {
        let desired = self.decision();
        if desired == self.applied {
            return Ok(());
        }
        self.controller
            .apply(desired)
            .map_err(|e| Error::Sink(format!("do-not-disturb controller: {}", e)))?;
        self.applied = desired;
        Ok(())
    }
}

/// Transition sink gating do-not-disturb on motion
#[derive(Debug)]
pub struct DndGate<C: DndController> {
    state: Mutex<GateState<C>>,
}

impl<C: DndController> DndGate<C> {
    /// Create a gate; `enabled` is the user's master switch
    pub fn new(controller: C, enabled: bool) -> Self {
        Self {
            state: Mutex::new(GateState {
                controller,
                enabled,
                passenger_mode: false,
                in_motion: false,
                applied: false,
            }),
        }
    }

    /// Master switch. Turning it off while driving disables DND immediately.
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        let mut state = self.state.lock();
        state.enabled = enabled;
        log::info!("DND gate {}", if enabled { "enabled" } else { "disabled" });
        state.reconcile()
    }

    /// Passenger override for the current trip
    pub fn set_passenger_mode(&self, passenger: bool) -> Result<()> {
        let mut state = self.state.lock();
        state.passenger_mode = passenger;
        log::info!("Passenger mode {}", if passenger { "on" } else { "off" });
        state.reconcile()
    }

    /// Flip passenger mode, returning the new value
    pub fn toggle_passenger_mode(&self) -> Result<bool> {
        let mut state = self.state.lock();
        state.passenger_mode = !state.passenger_mode;
        let passenger = state.passenger_mode;
        log::info!("Passenger mode {}", if passenger { "on" } else { "off" });
        state.reconcile()?;
        Ok(passenger)
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    pub fn is_passenger_mode(&self) -> bool {
        self.state.lock().passenger_mode
    }

    /// Last decision successfully applied to the controller
    pub fn is_dnd_active(&self) -> bool {
        self.state.lock().applied
    }

    /// Run `f` against the controller
    pub fn with_controller<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        f(&self.state.lock().controller)
    }
}

impl<C: DndController> TransitionSink for DndGate<C> {
    fn on_transition(&self, in_motion: bool) -> Result<()> {
        let mut state = self.state.lock();
        state.in_motion = in_motion;
        state.passenger_mode = false;
        state.reconcile()
    }
}
