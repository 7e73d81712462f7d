use heapless::Vec;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;
use tracing::{error, info};

pub const MAX_SNAPSHOT_REGISTERS: usize = 8;
pub const FAULT_CLASS_COUNT: usize = FaultClass::ALL.len();

// latches are kept in a u16
const_assert!(FAULT_CLASS_COUNT <= u16::BITS as usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultClass {
    InputUndervoltage,
    Input,
    OutputOvercurrent,
    OutputOvervoltage,
    Fan,
    Temperature,
    PowerGood,
    Communication,
    Manufacturer,
    ReadFailure,
    SensorMonitoring,
}

impl FaultClass {
    pub const ALL: [FaultClass; 11] = [
        FaultClass::InputUndervoltage,
        FaultClass::Input,
        FaultClass::OutputOvercurrent,
        FaultClass::OutputOvervoltage,
        FaultClass::Fan,
        FaultClass::Temperature,
        FaultClass::PowerGood,
        FaultClass::Communication,
        FaultClass::Manufacturer,
        FaultClass::ReadFailure,
        FaultClass::SensorMonitoring,
    ];

    pub(crate) fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Faults caused by the supply itself, as opposed to its input feed or
    /// the path used to reach it.
    pub fn calls_out_device(self) -> bool {
        !matches!(
            self,
            FaultClass::InputUndervoltage | FaultClass::Input | FaultClass::ReadFailure
        )
    }

    pub fn description(self) -> &'static str {
        match self {
            FaultClass::InputUndervoltage => "VIN_UV fault",
            FaultClass::Input => "INPUT fault",
            FaultClass::OutputOvercurrent => "IOUT_OC fault",
            FaultClass::OutputOvervoltage => "VOUT_OV fault",
            FaultClass::Fan => "FANS fault",
            FaultClass::Temperature => "TEMPERATURE fault",
            FaultClass::PowerGood => "PGOOD or OFF fault",
            FaultClass::Communication => "CML fault",
            FaultClass::Manufacturer => "MFR_SPECIFIC fault",
            FaultClass::ReadFailure => "register read failure",
            FaultClass::SensorMonitoring => "sensor monitoring failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterReading {
    pub command: String,
    pub value: u16,
}

/// One detected fault, handed to the fault-logging service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultRecord {
    pub device: String,
    pub rail: Option<String>,
    pub class: FaultClass,
    pub status_word: Option<u16>,
    pub snapshot: Vec<RegisterReading, MAX_SNAPSHOT_REGISTERS>,
    pub callout: Option<String>,
    pub message: Option<String>,
}

impl FaultRecord {
    pub fn new(device: &str, class: FaultClass) -> Self {
        Self {
            device: device.to_string(),
            rail: None,
            class,
            status_word: None,
            snapshot: Vec::new(),
            callout: None,
            message: None,
        }
    }

    pub fn with_status_word(mut self, status_word: u16) -> Self {
        self.status_word = Some(status_word);
        self
    }

    pub fn with_rail(mut self, rail: &str) -> Self {
        self.rail = Some(rail.to_string());
        self
    }

    pub fn with_callout(mut self, callout: Option<&str>) -> Self {
        self.callout = callout.map(str::to_string);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_snapshot(mut self, snapshot: &[RegisterReading]) -> Self {
        for reading in snapshot {
            if self.snapshot.push(reading.clone()).is_err() {
                break;
            }
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub device: String,
    pub rail: Option<String>,
    pub sensor: String,
    pub value: f64,
}

/// Outbound side: inventory presence, fault logging, sensor values.
pub trait EventSink {
    fn presence_changed(&mut self, device: &str, present: bool);
    fn fault_detected(&mut self, record: &FaultRecord);

    fn sensor_reading(&mut self, _reading: &SensorReading) {}
}

/// Sink that only writes to the log.
#[derive(Debug, Default)]
pub struct TracingSink {
    faults_logged: u32,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults_logged(&self) -> u32 {
        self.faults_logged
    }
}

impl EventSink for TracingSink {
    fn presence_changed(&mut self, device: &str, present: bool) {
        info!(device, present, "presence changed");
    }

    fn fault_detected(&mut self, record: &FaultRecord) {
        self.faults_logged = self.faults_logged.saturating_add(1);
        let snapshot = serde_json::to_string(&record.snapshot).unwrap_or_default();
        error!(
            device = %record.device,
            rail = record.rail.as_deref().unwrap_or(""),
            status_word = record.status_word.unwrap_or(0),
            callout = record.callout.as_deref().unwrap_or(""),
            snapshot = %snapshot,
            "{}",
            record.class.description()
        );
    }

    fn sensor_reading(&mut self, reading: &SensorReading) {
        tracing::debug!(
            device = %reading.device,
            sensor = %reading.sensor,
            value = reading.value,
            "sensor reading"
        );
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn presence_changed(&mut self, device: &str, present: bool) {
        (**self).presence_changed(device, present);
    }

    fn fault_detected(&mut self, record: &FaultRecord) {
        (**self).fault_detected(record);
    }

    fn sensor_reading(&mut self, reading: &SensorReading) {
        (**self).sensor_reading(reading);
    }
}
