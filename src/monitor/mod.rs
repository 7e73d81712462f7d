//! Fault detection for power supplies and power sequencers.
//!
//! Monitors are driven entirely by the [`crate::manager::Manager`]: presence
//! and power events, debounce deadlines and periodic `analyze` calls all
//! arrive with the current time, so a monitor never reads a clock itself.

mod debounce;
mod latch;
mod power_supply;
mod sequencer;
mod status;
mod tracker;

pub use debounce::DebounceTimer;
pub use latch::FaultLatches;
pub use power_supply::PowerSupply;
pub use sequencer::{SequencerMonitor, SequencerRail};
pub use tracker::{PowerState, PowerTracker};

use crate::error::MonitorError;
use crate::fault::EventSink;
use tokio::time::{Duration, Instant};

/// Timing and hardware settings shared by every monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub power_on_debounce: Duration,
    pub pgood_deglitch_limit: u8,
    pub on_off_config: u8,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            power_on_debounce: Duration::from_secs(3),
            pgood_deglitch_limit: 3,
            on_off_config: crate::pmbus::ON_OFF_CONFIG_CONTROL_PIN_ONLY,
        }
    }
}

pub trait FaultMonitor {
    /// Name used to route presence events.
    fn name(&self) -> &str;

    fn state(&self) -> PowerState;

    fn presence_changed(&mut self, present: bool, now: Instant, sink: &mut dyn EventSink);

    fn power_state_changed(&mut self, on: bool, now: Instant);

    fn timer_deadline(&self) -> Option<Instant>;

    fn timer_expired(&mut self, now: Instant);

    /// One poll. Transport failures the monitor reports itself are not
    /// returned as errors.
    fn analyze(&mut self, sink: &mut dyn EventSink) -> Result<(), MonitorError>;

    /// Forgets every reported fault; presence and power state are kept.
    fn clear_faults(&mut self);
}
