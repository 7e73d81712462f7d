use crate::error::{ConfigurationError, Error};
use crate::fault::EventSink;
use crate::model::id_map::IdMap;
use crate::model::{Device, DeviceHandle, System};
use tracing::info;

/// One chassis of the system. Chassis numbers start at 1.
#[derive(Debug)]
pub struct Chassis {
    number: u32,
    devices: Vec<Device>,
}

impl Chassis {
    pub fn new(number: u32, devices: Vec<Device>) -> Result<Self, ConfigurationError> {
        if number < 1 {
            return Err(ConfigurationError::InvalidChassisNumber(number));
        }
        Ok(Self { number, devices })
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn add_to_id_map(&self, id_map: &mut IdMap, index: usize) -> Result<(), ConfigurationError> {
        for (device, entry) in self.devices.iter().enumerate() {
            entry.add_to_id_map(id_map, DeviceHandle { chassis: index, device })?;
        }
        Ok(())
    }

    /// Configures devices in order, stopping at the first failure.
    pub fn configure(&self, system: &System) -> Result<(), Error> {
        info!(chassis = self.number, devices = self.devices.len(), "configuring chassis");
        for device in &self.devices {
            device.configure(system, self)?;
        }
        Ok(())
    }

    pub fn monitor_sensors(&self, system: &System, sink: &mut dyn EventSink) {
        for device in &self.devices {
            device.monitor_sensors(system, self, sink);
        }
    }

    pub fn clear_error_history(&self) {
        for device in &self.devices {
            device.clear_error_history();
        }
    }
}
