use super::latch::FaultLatches;
use super::status::{read_snapshot, Deglitch, StatusPoller};
use super::tracker::{PowerState, PowerTracker};
use super::{FaultMonitor, MonitorSettings};
use crate::error::MonitorError;
use crate::fault::{EventSink, FaultClass, FaultRecord, FAULT_CLASS_COUNT};
use crate::pmbus::{Encoding, RegisterAccess, ON_OFF_CONFIG, READ_VIN, SECONDARY_STATUS};
use heapless::Vec;
use std::fmt;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Hot-pluggable PMBus power supply.
pub struct PowerSupply {
    name: String,
    inventory_path: String,
    registers: Box<dyn RegisterAccess>,
    tracker: PowerTracker,
    latches: FaultLatches,
    poller: StatusPoller,
    pgood: Deglitch,
    on_off_config: u8,
}

impl PowerSupply {
    pub fn new(
        name: impl Into<String>,
        inventory_path: impl Into<String>,
        registers: Box<dyn RegisterAccess>,
        settings: &MonitorSettings,
    ) -> Self {
        Self {
            name: name.into(),
            inventory_path: inventory_path.into(),
            registers,
            tracker: PowerTracker::new(settings.power_on_debounce),
            latches: FaultLatches::new(),
            poller: StatusPoller::default(),
            pgood: Deglitch::new(settings.pgood_deglitch_limit),
            on_off_config: settings.on_off_config,
        }
    }

    pub fn inventory_path(&self) -> &str {
        &self.inventory_path
    }

    pub fn present(&self) -> bool {
        self.tracker.present()
    }

    pub fn powered_on(&self) -> bool {
        self.tracker.powered_on()
    }

    pub fn latches(&self) -> FaultLatches {
        self.latches
    }

    pub fn is_latched(&self, class: FaultClass) -> bool {
        self.latches.is_latched(class)
    }

    pub fn power_on_fault_reported(&self) -> bool {
        self.latches.is_latched(FaultClass::PowerGood)
    }

    pub fn read_failure_logged(&self) -> bool {
        self.poller.failure_logged()
    }

    fn callout(&self, class: FaultClass) -> Option<&str> {
        class.calls_out_device().then_some(self.inventory_path.as_str())
    }
}

impl FaultMonitor for PowerSupply {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> PowerState {
        self.tracker.state()
    }

    fn presence_changed(&mut self, present: bool, now: Instant, sink: &mut dyn EventSink) {
        if !self.tracker.set_present(present, now) {
            return;
        }
        info!(power_supply = %self.name, present, "presence changed");
        sink.presence_changed(&self.inventory_path, present);

        if present {
            let value = u16::from(self.on_off_config);
            if let Err(e) = self.registers.write(ON_OFF_CONFIG, Encoding::Byte, value) {
                warn!(power_supply = %self.name, error = %e, "unable to write ON_OFF_CONFIG");
            }
        }
        self.clear_faults();
    }

    fn power_state_changed(&mut self, on: bool, now: Instant) {
        self.tracker.set_system_power(on, now);
    }

    fn timer_deadline(&self) -> Option<Instant> {
        self.tracker.deadline()
    }

    fn timer_expired(&mut self, now: Instant) {
        if self.tracker.timer_expired(now) {
            debug!(power_supply = %self.name, "power-on debounce complete");
        }
    }

    fn analyze(&mut self, sink: &mut dyn EventSink) -> Result<(), MonitorError> {
        if self.tracker.state() != PowerState::PresentPoweredOn {
            return Ok(());
        }
        let Some(status) = self.poller.poll(&self.name, self.registers.as_ref(), sink) else {
            return Ok(());
        };

        let mut reported: Vec<FaultClass, FAULT_CLASS_COUNT> = Vec::new();

        // PGOOD is evaluated before the individual fault bits
        if self.pgood.update(status.pgood_or_unit_off()) && self.latches.latch(FaultClass::PowerGood) {
            let _ = reported.push(FaultClass::PowerGood);
        }

        let checks = [
            (status.vin_uv_fault(), FaultClass::InputUndervoltage),
            (status.input_fault(), FaultClass::Input),
            (status.iout_oc_fault(), FaultClass::OutputOvercurrent),
            (status.vout_ov_fault(), FaultClass::OutputOvervoltage),
            (status.fan_fault(), FaultClass::Fan),
            (status.temperature_fault(), FaultClass::Temperature),
            (status.cml_fault(), FaultClass::Communication),
            (status.mfr_fault(), FaultClass::Manufacturer),
        ];
        // output faults wait until a pending PGOOD fault is confirmed or gone
        let pgood_pending = self.pgood.pending();
        for (asserted, class) in checks {
            if pgood_pending && matches!(class, FaultClass::OutputOvercurrent | FaultClass::OutputOvervoltage) {
                continue;
            }
            if asserted && self.latches.latch(class) {
                let _ = reported.push(class);
            }
        }

        if reported.is_empty() {
            return Ok(());
        }

        let snapshot = read_snapshot(self.registers.as_ref(), SECONDARY_STATUS);
        for class in reported {
            let record = FaultRecord::new(&self.name, class)
                .with_status_word(status.raw())
                .with_snapshot(&snapshot)
                .with_callout(self.callout(class));
            sink.fault_detected(&record);
        }
        Ok(())
    }

    fn clear_faults(&mut self) {
        self.latches.clear();
        self.poller.reset();
        self.pgood.reset();

        if self.tracker.present() {
            // the driver issues CLEAR_FAULTS after reading an input sensor
            if let Err(e) = self.registers.read(READ_VIN, Encoding::Linear11) {
                debug!(power_supply = %self.name, error = %e, "READ_VIN failed while clearing faults");
            }
        }
    }
}

impl fmt::Debug for PowerSupply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PowerSupply")
            .field("name", &self.name)
            .field("inventory_path", &self.inventory_path)
            .field("tracker", &self.tracker)
            .field("latches", &self.latches)
            .finish()
    }
}
