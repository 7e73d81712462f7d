#![allow(dead_code)]

use pwrmgr::fault::{EventSink, FaultClass, FaultRecord, SensorReading};
use pwrmgr::monitor::{FaultMonitor, MonitorSettings, PowerSupply};
use pwrmgr::pmbus::RegisterAccess;
use pwrmgr::sim::SimulatedBus;
use tokio::time::{Duration, Instant};

pub const DEBOUNCE: Duration = Duration::from_secs(3);
pub const INVENTORY_PATH: &str = "/system/chassis/motherboard/powersupply0";

/// Sink that keeps everything it is handed.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub presence: Vec<(String, bool)>,
    pub faults: Vec<FaultRecord>,
    pub readings: Vec<SensorReading>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classes(&self) -> Vec<FaultClass> {
        self.faults.iter().map(|record| record.class).collect()
    }

    pub fn count(&self, class: FaultClass) -> usize {
        self.faults.iter().filter(|record| record.class == class).count()
    }
}

impl EventSink for RecordingSink {
    fn presence_changed(&mut self, device: &str, present: bool) {
        self.presence.push((device.to_string(), present));
    }

    fn fault_detected(&mut self, record: &FaultRecord) {
        self.faults.push(record.clone());
    }

    fn sensor_reading(&mut self, reading: &SensorReading) {
        self.readings.push(reading.clone());
    }
}

pub fn settings() -> MonitorSettings {
    MonitorSettings::default()
}

pub fn boxed(bus: &SimulatedBus, name: &str) -> Box<dyn RegisterAccess> {
    Box::new(bus.device(name))
}

/// Power supply that is present, powered on and past its debounce.
pub fn powered_psu(bus: &SimulatedBus, name: &str) -> (PowerSupply, RecordingSink) {
    let mut psu = PowerSupply::new(name, INVENTORY_PATH, boxed(bus, name), &settings());
    let mut sink = RecordingSink::new();
    let start = Instant::now();
    psu.presence_changed(true, start, &mut sink);
    psu.power_state_changed(true, start);
    psu.timer_expired(start + DEBOUNCE);
    assert!(psu.powered_on());
    (psu, RecordingSink::new())
}

pub fn set_status(bus: &SimulatedBus, device: &str, status: u16) {
    bus.set_register(device, pwrmgr::pmbus::STATUS_WORD, status);
}

