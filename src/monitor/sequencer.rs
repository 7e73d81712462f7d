use super::latch::FaultLatches;
use super::status::{Deglitch, StatusPoller};
use super::tracker::{PowerState, PowerTracker};
use super::{FaultMonitor, MonitorSettings};
use crate::error::MonitorError;
use crate::fault::{EventSink, FaultClass, FaultRecord, RegisterReading, MAX_SNAPSHOT_REGISTERS};
use crate::pmbus::{status_vout_page, Encoding, RegisterAccess};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::Instant;
use tracing::{debug, error};

/// A rail supervised by a sequencer, identified by its PMBus page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencerRail {
    pub name: String,
    pub page: u8,
}

/// Soldered-down power sequencer. It is always present; when its PGOOD
/// output drops, the per-page STATUS_VOUT registers name the rail at fault.
pub struct SequencerMonitor {
    name: String,
    registers: Box<dyn RegisterAccess>,
    rails: Vec<SequencerRail>,
    tracker: PowerTracker,
    latches: FaultLatches,
    poller: StatusPoller,
    pgood: Deglitch,
}

impl SequencerMonitor {
    pub fn new(
        name: impl Into<String>,
        registers: Box<dyn RegisterAccess>,
        rails: Vec<SequencerRail>,
        settings: &MonitorSettings,
    ) -> Self {
        Self {
            name: name.into(),
            registers,
            rails,
            tracker: PowerTracker::always_present(settings.power_on_debounce),
            latches: FaultLatches::new(),
            poller: StatusPoller::default(),
            pgood: Deglitch::new(settings.pgood_deglitch_limit),
        }
    }

    pub fn rails(&self) -> &[SequencerRail] {
        &self.rails
    }

    pub fn fault_reported(&self) -> bool {
        self.latches.is_latched(FaultClass::PowerGood)
    }

    pub fn read_failure_logged(&self) -> bool {
        self.poller.failure_logged()
    }

    /// Reads STATUS_VOUT of every configured rail, keyed by rail index.
    /// Pages that fail to read are skipped.
    fn scan_rail_status(&self) -> Vec<(usize, RegisterReading)> {
        self.rails
            .iter()
            .enumerate()
            .filter_map(|(index, rail)| {
                let command = status_vout_page(rail.page);
                match self.registers.read(&command, Encoding::Byte) {
                    Ok(value) => Some((index, RegisterReading { command, value })),
                    Err(e) => {
                        debug!(sequencer = %self.name, page = rail.page, error = %e, "STATUS_VOUT unreadable");
                        None
                    }
                }
            })
            .collect()
    }
}

/// Faulted pages first, then clean ones, up to the snapshot capacity.
fn fault_snapshot(readings: &[(usize, RegisterReading)]) -> heapless::Vec<RegisterReading, MAX_SNAPSHOT_REGISTERS> {
    let faulted = readings.iter().filter(|(_, reading)| reading.value != 0);
    let clean = readings.iter().filter(|(_, reading)| reading.value == 0);
    let mut snapshot = heapless::Vec::new();
    for (_, reading) in faulted.chain(clean) {
        if snapshot.push(reading.clone()).is_err() {
            break;
        }
    }
    snapshot
}

impl FaultMonitor for SequencerMonitor {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> PowerState {
        self.tracker.state()
    }

    fn presence_changed(&mut self, present: bool, _now: Instant, _sink: &mut dyn EventSink) {
        debug!(sequencer = %self.name, present, "ignoring presence event");
    }

    fn power_state_changed(&mut self, on: bool, now: Instant) {
        self.tracker.set_system_power(on, now);
    }

    fn timer_deadline(&self) -> Option<Instant> {
        self.tracker.deadline()
    }

    fn timer_expired(&mut self, now: Instant) {
        self.tracker.timer_expired(now);
    }

    fn analyze(&mut self, sink: &mut dyn EventSink) -> Result<(), MonitorError> {
        if self.tracker.state() != PowerState::PresentPoweredOn {
            return Ok(());
        }
        let Some(status) = self.poller.poll(&self.name, self.registers.as_ref(), sink) else {
            return Ok(());
        };
        if !self.pgood.update(status.power_good_negated()) || self.latches.is_latched(FaultClass::PowerGood) {
            return Ok(());
        }
        self.latches.latch(FaultClass::PowerGood);

        let readings = self.scan_rail_status();
        let failing = readings
            .iter()
            .find(|(_, reading)| reading.value != 0)
            .map(|(index, _)| &self.rails[*index]);
        let snapshot = fault_snapshot(&readings);

        let mut record = FaultRecord::new(&self.name, FaultClass::PowerGood)
            .with_status_word(status.raw())
            .with_snapshot(&snapshot);
        match failing {
            Some(rail) => {
                error!(sequencer = %self.name, rail = %rail.name, page = rail.page, "PGOOD negated");
                record = record.with_rail(&rail.name);
            }
            None => {
                error!(sequencer = %self.name, "PGOOD negated, no failing rail found");
                record = record.with_message("no rail reported a STATUS_VOUT fault");
            }
        }
        sink.fault_detected(&record);
        Ok(())
    }

    fn clear_faults(&mut self) {
        self.latches.clear();
        self.poller.reset();
        self.pgood.reset();
    }
}

impl fmt::Debug for SequencerMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequencerMonitor")
            .field("name", &self.name)
            .field("rails", &self.rails)
            .field("tracker", &self.tracker)
            .finish()
    }
}
