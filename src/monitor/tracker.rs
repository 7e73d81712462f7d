use super::debounce::DebounceTimer;
use serde::Serialize;
use tokio::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PowerState {
    Absent,
    PresentPowerOffDebounce,
    PresentPoweredOn,
}

/// Tracks whether a monitored device is present and has been powered long
/// enough for its status registers to mean something.
#[derive(Debug, Clone)]
pub struct PowerTracker {
    present: bool,
    system_power_on: bool,
    powered_on: bool,
    debounce: Duration,
    timer: DebounceTimer,
}

impl PowerTracker {
    pub fn new(debounce: Duration) -> Self {
        Self {
            present: false,
            system_power_on: false,
            powered_on: false,
            debounce,
            timer: DebounceTimer::new(),
        }
    }

    /// Tracker for a device that cannot be removed.
    pub fn always_present(debounce: Duration) -> Self {
        Self {
            present: true,
            ..Self::new(debounce)
        }
    }

    pub fn present(&self) -> bool {
        self.present
    }

    pub fn system_power_on(&self) -> bool {
        self.system_power_on
    }

    pub fn powered_on(&self) -> bool {
        self.powered_on
    }

    pub fn state(&self) -> PowerState {
        match (self.present, self.powered_on) {
            (false, _) => PowerState::Absent,
            (true, false) => PowerState::PresentPowerOffDebounce,
            (true, true) => PowerState::PresentPoweredOn,
        }
    }

    /// Returns false if `present` matches the current state.
    pub fn set_present(&mut self, present: bool, now: Instant) -> bool {
        if present == self.present {
            return false;
        }
        self.present = present;
        if present {
            if self.system_power_on {
                self.timer.arm(now, self.debounce);
            }
        } else {
            self.timer.cancel();
            self.powered_on = false;
        }
        true
    }

    pub fn set_system_power(&mut self, on: bool, now: Instant) {
        self.system_power_on = on;
        if on {
            if self.present {
                self.timer.arm(now, self.debounce);
            }
        } else {
            self.timer.cancel();
            self.powered_on = false;
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Completes the power-on debounce if it is due.
    pub fn timer_expired(&mut self, now: Instant) -> bool {
        if self.timer.fire_if_due(now) {
            self.powered_on = true;
            true
        } else {
            false
        }
    }
}
