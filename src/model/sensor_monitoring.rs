use crate::action::{execute_sequence, Action, ActionEnvironment};
use crate::fault::{EventSink, FaultClass, FaultRecord};
use crate::model::{Chassis, Device, Rail, System};
use std::cell::Cell;
use tracing::error;

/// Consecutive failures written to the journal before going quiet.
const MAX_JOURNAL_ERRORS: u32 = 3;

/// Periodic sensor reads for one rail.
///
/// Runs on every poll, so failures are journaled a bounded number of times
/// and published as a fault only once until [`Self::clear_error_history`].
#[derive(Debug, Default)]
pub struct SensorMonitoring {
    actions: Vec<Action>,
    fault_logged: Cell<bool>,
    error_count: Cell<u32>,
}

impl SensorMonitoring {
    pub fn new(actions: Vec<Action>) -> Self {
        Self {
            actions,
            fault_logged: Cell::new(false),
            error_count: Cell::new(0),
        }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn error_count(&self) -> u32 {
        self.error_count.get()
    }

    pub fn clear_error_history(&self) {
        self.fault_logged.set(false);
        self.error_count.set(0);
    }

    pub fn execute(
        &self,
        system: &System,
        chassis: &Chassis,
        device: &Device,
        rail: &Rail,
        sink: &mut dyn EventSink,
    ) {
        let mut env = ActionEnvironment::for_rail(system, chassis, device, rail);
        match execute_sequence(&self.actions, &mut env) {
            Ok(_) => {
                for reading in env.take_readings() {
                    sink.sensor_reading(&reading);
                }
                self.error_count.set(0);
            }
            Err(e) => {
                let count = self.error_count.get().saturating_add(1);
                self.error_count.set(count);
                if count <= MAX_JOURNAL_ERRORS {
                    error!(rail = rail.id(), error = %e, "unable to monitor sensors");
                }
                if !self.fault_logged.get() {
                    self.fault_logged.set(true);
                    let record = FaultRecord::new(device.id(), FaultClass::SensorMonitoring)
                        .with_rail(rail.id())
                        .with_message(e.to_string());
                    sink.fault_detected(&record);
                }
            }
        }
    }
}
