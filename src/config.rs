//! JSON configuration input.
//!
//! One document describes the manager timing, the regulator hierarchy with
//! its rules, and the power supplies and sequencers to monitor. Register
//! access for every device comes from a caller-supplied factory, so the same
//! document drives real hardware and [`crate::sim`].

use crate::action::Action;
use crate::error::{ConfigurationError, Error};
use crate::model::{Chassis, Configuration, Device, Rail, Rule, SensorMonitoring, System};
use crate::monitor::{FaultMonitor, MonitorSettings, PowerSupply, SequencerMonitor, SequencerRail};
use crate::pmbus::RegisterAccess;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tokio::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    pub poll_interval_ms: u64,
    pub power_on_debounce_ms: u64,
    pub pgood_deglitch_limit: u8,
    pub on_off_config: u8,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        let settings = MonitorSettings::default();
        Self {
            poll_interval_ms: 1000,
            power_on_debounce_ms: settings.power_on_debounce.as_millis() as u64,
            pgood_deglitch_limit: settings.pgood_deglitch_limit,
            on_off_config: settings.on_off_config,
        }
    }
}

impl ManagerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn power_on_debounce(&self) -> Duration {
        Duration::from_millis(self.power_on_debounce_ms)
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            power_on_debounce: self.power_on_debounce(),
            pgood_deglitch_limit: self.pgood_deglitch_limit,
            on_off_config: self.on_off_config,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    pub manager: ManagerConfig,
    pub rules: Vec<Rule>,
    pub chassis: Vec<ChassisConfig>,
    pub power_supplies: Vec<PowerSupplyConfig>,
    pub sequencers: Vec<SequencerConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChassisConfig {
    pub number: u32,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub id: String,
    #[serde(default = "default_true")]
    pub is_regulator: bool,
    #[serde(default)]
    pub bus: u8,
    #[serde(default)]
    pub address: u16,
    #[serde(default)]
    pub configuration: Option<Configuration>,
    #[serde(default)]
    pub rails: Vec<RailConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RailConfig {
    pub id: String,
    #[serde(default)]
    pub configuration: Option<Configuration>,
    #[serde(default)]
    pub sensor_monitoring: Option<SensorMonitoringConfig>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorMonitoringConfig {
    #[serde(default)]
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerSupplyConfig {
    pub id: String,
    #[serde(default)]
    pub bus: u8,
    #[serde(default)]
    pub address: u16,
    pub inventory_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencerConfig {
    pub id: String,
    #[serde(default)]
    pub bus: u8,
    #[serde(default)]
    pub address: u16,
    #[serde(default)]
    pub rails: Vec<SequencerRail>,
}

impl Document {
    pub fn from_json(text: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&text)?)
    }

    /// Builds the regulator hierarchy. Id and reference problems are
    /// reported here, before any action has run.
    pub fn build_system<F>(&self, mut factory: F) -> Result<System, ConfigurationError>
    where
        F: FnMut(&str, u8, u16) -> Box<dyn RegisterAccess>,
    {
        let mut chassis = Vec::with_capacity(self.chassis.len());
        for entry in &self.chassis {
            let devices = entry
                .devices
                .iter()
                .map(|device| device.build(&mut factory))
                .collect();
            chassis.push(Chassis::new(entry.number, devices)?);
        }
        System::new(self.rules.clone(), chassis)
    }

    /// Builds power supply monitors followed by sequencer monitors.
    pub fn build_monitors<F>(&self, mut factory: F) -> Result<Vec<Box<dyn FaultMonitor>>, ConfigurationError>
    where
        F: FnMut(&str, u8, u16) -> Box<dyn RegisterAccess>,
    {
        let settings = self.manager.monitor_settings();
        let mut names = HashSet::new();
        let mut monitors: Vec<Box<dyn FaultMonitor>> = Vec::new();

        for psu in &self.power_supplies {
            if !names.insert(psu.id.as_str()) {
                return Err(ConfigurationError::DuplicateId(psu.id.clone()));
            }
            let registers = factory(&psu.id, psu.bus, psu.address);
            monitors.push(Box::new(PowerSupply::new(
                psu.id.as_str(),
                psu.inventory_path.as_str(),
                registers,
                &settings,
            )));
        }
        for sequencer in &self.sequencers {
            if !names.insert(sequencer.id.as_str()) {
                return Err(ConfigurationError::DuplicateId(sequencer.id.clone()));
            }
            let registers = factory(&sequencer.id, sequencer.bus, sequencer.address);
            monitors.push(Box::new(SequencerMonitor::new(
                sequencer.id.as_str(),
                registers,
                sequencer.rails.clone(),
                &settings,
            )));
        }
        Ok(monitors)
    }
}

impl DeviceConfig {
    fn build<F>(&self, factory: &mut F) -> Device
    where
        F: FnMut(&str, u8, u16) -> Box<dyn RegisterAccess>,
    {
        let rails = self.rails.iter().map(RailConfig::build).collect();
        let mut device = Device::new(self.id.as_str(), factory(&self.id, self.bus, self.address), rails)
            .with_address(self.bus, self.address)
            .with_regulator(self.is_regulator);
        if let Some(configuration) = &self.configuration {
            device = device.with_configuration(configuration.clone());
        }
        device
    }
}

impl RailConfig {
    fn build(&self) -> Rail {
        let mut rail = Rail::new(self.id.as_str());
        if let Some(configuration) = &self.configuration {
            rail = rail.with_configuration(configuration.clone());
        }
        if let Some(sensor_monitoring) = &self.sensor_monitoring {
            rail = rail.with_sensor_monitoring(SensorMonitoring::new(sensor_monitoring.actions.clone()));
        }
        rail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.power_on_debounce(), Duration::from_secs(3));
        assert_eq!(config.pgood_deglitch_limit, 3);
        assert_eq!(config.on_off_config, 0x18);
    }

    #[test]
    fn test_partial_manager_section() {
        let document = Document::from_json(r#"{ "manager": { "poll_interval_ms": 250 } }"#).unwrap();
        assert_eq!(document.manager.poll_interval_ms, 250);
        assert_eq!(document.manager.power_on_debounce_ms, 3000);
        assert!(document.chassis.is_empty());
    }

    #[test]
    fn test_malformed_document() {
        let result = Document::from_json("{ \"chassis\": 7 }");
        assert!(matches!(result, Err(ConfigurationError::Document(_))));
    }
}
